use crate::geometry::PageGeometry;
use crate::line::LineBox;
use crate::paragraph::ParagraphBox;
use crate::table::TableBox;
use crate::trace::TraceLog;
use crate::types::Px;
use std::sync::Arc;

/// The lines of one paragraph that landed on one page, with the resolved gap
/// above them. Spacing collapse is computed here once and stored; previously
/// placed boxes are never rewritten.
#[derive(Debug, Clone)]
pub struct ParagraphFragment {
    gap_before: Px,
    lines: Vec<LineBox>,
    left_indent: Px,
    right_indent: Px,
    available_width: Px,
    continued: bool,
    continues: bool,
}

impl ParagraphFragment {
    pub fn gap_before(&self) -> Px {
        self.gap_before
    }

    pub fn lines(&self) -> &[LineBox] {
        &self.lines
    }

    pub fn left_indent(&self) -> Px {
        self.left_indent
    }

    pub fn right_indent(&self) -> Px {
        self.right_indent
    }

    pub fn available_width(&self) -> Px {
        self.available_width
    }

    /// True when this fragment resumes a paragraph split from the previous
    /// page.
    pub fn continued(&self) -> bool {
        self.continued
    }

    /// True when the paragraph continues on the next page.
    pub fn continues(&self) -> bool {
        self.continues
    }

    pub fn height(&self) -> Px {
        self.lines.iter().map(LineBox::height).sum()
    }
}

#[derive(Debug, Clone)]
pub enum PageBlock {
    Paragraph(ParagraphFragment),
    Table(TableBox),
}

/// One filled page: geometry plus the ordered blocks that fit on it.
#[derive(Debug, Clone)]
pub struct PageBox {
    geometry: PageGeometry,
    blocks: Vec<PageBlock>,
    used_height: Px,
}

impl PageBox {
    fn new(geometry: PageGeometry) -> Self {
        Self {
            geometry,
            blocks: Vec::new(),
            used_height: Px::ZERO,
        }
    }

    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    pub fn blocks(&self) -> &[PageBlock] {
        &self.blocks
    }

    pub fn used_height(&self) -> Px {
        self.used_height
    }

    pub fn remaining_height(&self) -> Px {
        (self.geometry.content_height() - self.used_height).max(Px::ZERO)
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// Sequential page-filling state machine for one section. Blocks arrive in
/// document order; a paragraph may split across pages via a persistent line
/// cursor.
pub(crate) struct PageFiller {
    geometry: PageGeometry,
    pages: Vec<PageBox>,
    current: PageBox,
    prev_space_after: Px,
    trace: Option<Arc<TraceLog>>,
}

impl PageFiller {
    pub(crate) fn new(geometry: PageGeometry, trace: Option<Arc<TraceLog>>) -> Self {
        Self {
            geometry,
            pages: Vec::new(),
            current: PageBox::new(geometry),
            prev_space_after: Px::ZERO,
            trace,
        }
    }

    fn close_page(&mut self) {
        let fresh = PageBox::new(self.geometry);
        self.pages.push(std::mem::replace(&mut self.current, fresh));
        self.prev_space_after = Px::ZERO;
    }

    /// Gap above the next block: collapsed against the previous block's
    /// after-spacing on the same page, the declared before-spacing alone at
    /// the top of a page.
    fn resolved_gap(&self, space_before: Px) -> Px {
        if self.current.is_empty() {
            space_before
        } else {
            self.prev_space_after.max(space_before)
        }
    }

    fn count(&self, key: &str) {
        if let Some(trace) = &self.trace {
            trace.count(key, 1);
        }
    }

    pub(crate) fn push_paragraph(&mut self, paragraph: &ParagraphBox) {
        if paragraph.page_break_before() && !self.current.is_empty() {
            self.close_page();
        }
        let total = paragraph.lines().len();
        if total == 0 {
            return;
        }
        let mut cursor = 0usize;
        let mut started = false;
        loop {
            let gap = if started {
                Px::ZERO
            } else {
                self.resolved_gap(paragraph.space_before())
            };
            if !self.current.is_empty() && gap > self.current.remaining_height() {
                // The collapsed gap alone does not fit; the paragraph does
                // not start on this page.
                self.close_page();
                continue;
            }

            let mut placed: Vec<LineBox> = Vec::new();
            let mut room = self.current.remaining_height() - gap;
            let mut hard_break = false;
            while cursor < total {
                let line = &paragraph.lines()[cursor];
                let force = self.current.is_empty() && placed.is_empty();
                if line.height() > room && !force {
                    break;
                }
                if line.height() > room {
                    self.count("layout.forced_placement");
                }
                room = (room - line.height()).max(Px::ZERO);
                placed.push(line.clone());
                cursor += 1;
                if line.ends_with_page_break() {
                    hard_break = true;
                    break;
                }
            }

            if placed.is_empty() {
                // Nothing fit; retry from the same cursor on a fresh page.
                self.close_page();
                continue;
            }

            let height: Px = placed.iter().map(LineBox::height).sum();
            let exhausted = cursor >= total;
            self.current.used_height += gap + height;
            self.current.blocks.push(PageBlock::Paragraph(ParagraphFragment {
                gap_before: gap,
                lines: placed,
                left_indent: paragraph.left_indent(),
                right_indent: paragraph.right_indent(),
                available_width: paragraph.available_width(),
                continued: started,
                continues: !exhausted,
            }));
            started = true;

            if exhausted {
                if hard_break {
                    self.close_page();
                } else {
                    self.prev_space_after = paragraph.space_after();
                }
                return;
            }
            self.close_page();
        }
    }

    /// Tables are opaque blocks: placed whole, never split across pages.
    pub(crate) fn push_table(&mut self, table: TableBox) {
        loop {
            let gap = self.resolved_gap(Px::ZERO);
            let need = gap + table.height();
            if need > self.current.remaining_height() && !self.current.is_empty() {
                self.close_page();
                continue;
            }
            if need > self.current.remaining_height() {
                self.count("layout.forced_placement");
            }
            self.current.used_height += need;
            self.current.blocks.push(PageBlock::Table(table));
            self.prev_space_after = Px::ZERO;
            return;
        }
    }

    /// Ends the section. An empty section still yields one (blank) page.
    pub(crate) fn finish(mut self) -> Vec<PageBox> {
        if !self.current.is_empty() || self.pages.is_empty() {
            let last = std::mem::replace(&mut self.current, PageBox::new(self.geometry));
            self.pages.push(last);
        }
        self.pages
    }
}
