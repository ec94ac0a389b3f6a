use crate::geometry::GridType;
use crate::measure::{CharBox, HorizontalAlignment};
use crate::model::{Justification, LineSpacing, LineSpacingRule};
use crate::types::Px;

/// Grid rows are sized with a tolerance factor because typical glyph metrics
/// overshoot the nominal em box; characters get the tighter tolerance.
/// Compatibility constants, kept verbatim.
pub(crate) const CHAR_GRID_FACTOR: f32 = 0.90;
pub(crate) const ITEM_GRID_FACTOR: f32 = 0.99;

#[derive(Debug, Clone)]
pub struct PictureBox {
    pub name: String,
    pub width: Px,
    pub height: Px,
}

/// Closed set of things a line packs.
#[derive(Debug, Clone)]
pub enum LineItem {
    Char(CharBox),
    Picture(PictureBox),
}

impl LineItem {
    pub fn width(&self) -> Px {
        match self {
            LineItem::Char(c) => c.width,
            LineItem::Picture(p) => p.width,
        }
    }

    pub fn height(&self) -> Px {
        match self {
            LineItem::Char(c) => c.height,
            LineItem::Picture(p) => p.height,
        }
    }

    fn grid_factor(&self) -> f32 {
        match self {
            LineItem::Char(_) => CHAR_GRID_FACTOR,
            LineItem::Picture(_) => ITEM_GRID_FACTOR,
        }
    }

    fn set_alignment(&mut self, alignment: HorizontalAlignment) {
        if let LineItem::Char(c) = self {
            c.alignment = alignment;
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineAlignment {
    Left,
    Center,
    Right,
    /// Distribute justification: first item left, last item right, interior
    /// items centered.
    Stretch,
}

/// Per-paragraph packing parameters a line needs.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LineContext {
    pub available_width: Px,
    pub grid: GridType,
    pub line_pitch: Px,
    pub snap_to_grid: bool,
    pub line_spacing: LineSpacing,
}

impl LineContext {
    fn grid_snap_active(&self) -> bool {
        self.snap_to_grid && self.grid != GridType::None && self.line_pitch > Px::ZERO
    }
}

pub(crate) enum LineAdd {
    Placed,
    Rejected(LineItem),
}

/// One packed line: an ordered run of items that fit the available width,
/// plus its resolved height. Closed (immutable) once an item is rejected.
#[derive(Debug, Clone)]
pub struct LineBox {
    items: Vec<LineItem>,
    ctx: LineContext,
    indent: Px,
    content_width: Px,
    tallest: Px,
    grid_rows: i32,
    height: Px,
    padding_bottom: Px,
    alignment: LineAlignment,
    ends_with_page_break: bool,
}

impl LineBox {
    pub(crate) fn new(ctx: LineContext, indent: Px) -> Self {
        let mut line = Self {
            items: Vec::new(),
            ctx,
            indent,
            content_width: Px::ZERO,
            tallest: Px::ZERO,
            grid_rows: 0,
            height: Px::ZERO,
            padding_bottom: Px::ZERO,
            alignment: LineAlignment::Left,
            ends_with_page_break: false,
        };
        line.resolve_height();
        line
    }

    /// Greedy accept: an item fits while indent + content + item stays within
    /// the available width plus one pixel of slack. The first item is always
    /// accepted so degenerate widths cannot produce an empty-line loop.
    pub(crate) fn try_append(&mut self, item: LineItem) -> LineAdd {
        let fits = self.indent + self.content_width + item.width()
            <= self.ctx.available_width + Px::from_i32(1);
        if !fits && !self.items.is_empty() {
            return LineAdd::Rejected(item);
        }
        self.content_width += item.width();
        if self.ctx.grid_snap_active() {
            let rows = grid_rows_for(item.height(), self.ctx.line_pitch, item.grid_factor());
            self.grid_rows = self.grid_rows.max(rows);
        }
        self.tallest = self.tallest.max(item.height());
        self.items.push(item);
        self.resolve_height();
        LineAdd::Placed
    }

    fn resolve_height(&mut self) {
        let base = if self.items.is_empty() {
            // A blank line (consecutive breaks) measures as one default line.
            if self.ctx.grid_snap_active() {
                self.ctx.line_pitch
            } else {
                Px::from_pt(12.0)
            }
        } else if self.ctx.grid_snap_active() {
            self.ctx.line_pitch * self.grid_rows.max(1)
        } else {
            self.tallest
        };
        let spacing = self.ctx.line_spacing;
        let height = match spacing.rule {
            LineSpacingRule::Multiple => {
                if self.ctx.grid_snap_active() {
                    let rows = base.ratio_to(self.ctx.line_pitch);
                    let effective = if spacing.value > rows {
                        spacing.value
                    } else {
                        rows
                    };
                    self.ctx.line_pitch * effective
                } else {
                    base * spacing.value
                }
            }
            LineSpacingRule::Exactly => Px::from_pt(spacing.value),
            LineSpacingRule::AtLeast => base.max(Px::from_pt(spacing.value)),
        };
        self.height = height.max(Px::ZERO);
        self.padding_bottom = (self.height - self.tallest).max(Px::ZERO) / 2;
    }

    /// Resolves the line's horizontal alignment from the paragraph's
    /// justification. Under `SnapToChars` the grid wins and the paragraph's
    /// justification is ignored; `Both` approximates to left.
    pub(crate) fn close(&mut self, justification: Justification) {
        self.alignment = if self.ctx.grid == GridType::SnapToChars {
            LineAlignment::Left
        } else {
            match justification {
                Justification::Left | Justification::Both => LineAlignment::Left,
                Justification::Center => LineAlignment::Center,
                Justification::Right => LineAlignment::Right,
                Justification::Distribute => LineAlignment::Stretch,
            }
        };
        if self.alignment != LineAlignment::Stretch {
            return;
        }
        let count = self.items.len();
        if count >= 2 {
            for (index, item) in self.items.iter_mut().enumerate() {
                let alignment = if index == 0 {
                    HorizontalAlignment::Left
                } else if index == count - 1 {
                    HorizontalAlignment::Right
                } else {
                    HorizontalAlignment::Center
                };
                item.set_alignment(alignment);
            }
        } else if let Some(item) = self.items.first_mut() {
            item.set_alignment(HorizontalAlignment::Center);
        }
    }

    pub(crate) fn set_page_break(&mut self, ends_with_page_break: bool) {
        self.ends_with_page_break = ends_with_page_break;
    }

    pub fn items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn indent(&self) -> Px {
        self.indent
    }

    pub fn content_width(&self) -> Px {
        self.content_width
    }

    pub fn available_width(&self) -> Px {
        self.ctx.available_width
    }

    pub fn height(&self) -> Px {
        self.height
    }

    pub fn padding_bottom(&self) -> Px {
        self.padding_bottom
    }

    pub fn alignment(&self) -> LineAlignment {
        self.alignment
    }

    pub fn ends_with_page_break(&self) -> bool {
        self.ends_with_page_break
    }
}

/// Smallest row count n with `height <= pitch * n * factor`.
fn grid_rows_for(height: Px, pitch: Px, factor: f32) -> i32 {
    if pitch <= Px::ZERO {
        return 1;
    }
    let mut rows = 1;
    while (pitch * rows) * factor < height && rows < 1000 {
        rows += 1;
    }
    rows
}
