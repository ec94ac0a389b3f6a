mod error;
mod font;
mod geometry;
mod line;
mod measure;
mod metrics;
mod model;
mod page;
mod paragraph;
mod table;
mod trace;
mod types;

pub use error::GalleyError;
pub use geometry::{GridType, PageGeometry};
pub use line::{LineAlignment, LineBox, LineItem, PictureBox};
pub use measure::{CharBox, HorizontalAlignment};
pub use metrics::{DocumentMetrics, PageMetrics};
pub use model::{
    Block, BorderSpec, CellBorders, CellSource, CellVerticalAlignment, CharacterFormat,
    DocumentSource, FontHint, Indent, IndentUnit, InlineItem, Justification, LineSpacing,
    LineSpacingRule, ParagraphFormat, ParagraphSource, PictureSource, RowHeightRule, RowSource,
    Section, SpacingUnit, Spacing, SpecialIndent, SpecialIndentKind, TableSource, TextRun,
};
pub use page::{PageBlock, PageBox, ParagraphFragment};
pub use paragraph::ParagraphBox;
pub use table::{CellBox, TableBox};
pub use trace::TraceLog;
pub use types::{Color, Margins, Px, Size};

use crate::font::FontRegistry;
use crate::page::PageFiller;
use crate::paragraph::layout_paragraph;
use crate::table::layout_table;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// The finished layout: every page of every section in document order, ready
/// for a renderer to walk without further layout decisions.
#[derive(Debug, Clone)]
pub struct DocumentLayout {
    pub pages: Vec<PageBox>,
    pub metrics: DocumentMetrics,
}

/// The layout engine. Holds the font registry and diagnostics sinks; one
/// engine lays out any number of documents, each run owning its own box tree.
pub struct Galley {
    fonts: Arc<FontRegistry>,
    trace: Option<Arc<TraceLog>>,
    parallel_sections: bool,
}

#[derive(Default)]
pub struct GalleyBuilder {
    font_dirs: Vec<PathBuf>,
    font_files: Vec<PathBuf>,
    font_data: Vec<(Option<String>, Vec<u8>)>,
    trace_path: Option<PathBuf>,
    parallel_sections: bool,
}

impl GalleyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every .ttf/.otf file in `path`, skipping unreadable or
    /// unparsable entries.
    pub fn font_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.font_dirs.push(path.into());
        self
    }

    pub fn font_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.font_files.push(path.into());
        self
    }

    pub fn font_bytes(mut self, name: Option<&str>, data: Vec<u8>) -> Self {
        self.font_data.push((name.map(str::to_string), data));
        self
    }

    /// Enables JSON-lines diagnostics written to `path`.
    pub fn trace_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.trace_path = Some(path.into());
        self
    }

    /// Sections share no page-filling state, so their layout passes may run
    /// concurrently; pages are still concatenated in document order.
    pub fn parallel_sections(mut self, enabled: bool) -> Self {
        self.parallel_sections = enabled;
        self
    }

    pub fn build(self) -> Result<Galley, GalleyError> {
        let mut fonts = FontRegistry::new();
        for dir in &self.font_dirs {
            fonts.register_dir(dir);
        }
        for file in &self.font_files {
            fonts.register_file(file)?;
        }
        for (name, data) in self.font_data {
            fonts.register_bytes(data, name.as_deref())?;
        }
        let trace = match self.trace_path {
            Some(path) => Some(Arc::new(TraceLog::new(path)?)),
            None => None,
        };
        Ok(Galley {
            fonts: Arc::new(fonts),
            trace,
            parallel_sections: self.parallel_sections,
        })
    }
}

impl Galley {
    pub fn builder() -> GalleyBuilder {
        GalleyBuilder::new()
    }

    /// Family names of every registered font, in registration order.
    pub fn registered_font_names(&self) -> Vec<String> {
        self.fonts.font_names()
    }

    pub fn registered_font_count(&self) -> usize {
        self.fonts.font_count()
    }

    /// Lays out the whole document: every section's paragraph/table stream is
    /// measured, packed into lines, and filled into pages.
    pub fn layout(&self, source: &DocumentSource) -> Result<DocumentLayout, GalleyError> {
        for section in &source.sections {
            section.geometry.validate()?;
        }
        let started = Instant::now();
        let per_section: Vec<Vec<PageBox>> =
            if self.parallel_sections && source.sections.len() > 1 {
                use rayon::prelude::*;
                source
                    .sections
                    .par_iter()
                    .map(|section| self.layout_section(section))
                    .collect()
            } else {
                source
                    .sections
                    .iter()
                    .map(|section| self.layout_section(section))
                    .collect()
            };
        let mut pages = Vec::new();
        for section_pages in per_section {
            pages.extend(section_pages);
        }
        let total_layout_ms = started.elapsed().as_secs_f64() * 1000.0;
        let metrics = collect_metrics(&pages, source.sections.len(), total_layout_ms);
        if let Some(trace) = &self.trace {
            trace.span_ms("layout.document", total_layout_ms);
            trace.finish("layout");
        }
        Ok(DocumentLayout { pages, metrics })
    }

    fn layout_section(&self, section: &Section) -> Vec<PageBox> {
        let started = Instant::now();
        let mut filler = PageFiller::new(section.geometry, self.trace.clone());
        for block in &section.blocks {
            match block {
                Block::Paragraph(paragraph) => {
                    let laid = layout_paragraph(paragraph, &section.geometry, &self.fonts);
                    filler.push_paragraph(&laid);
                }
                Block::Table(table) => {
                    let laid = layout_table(
                        table,
                        &section.geometry,
                        &self.fonts,
                        self.trace.as_deref(),
                    );
                    filler.push_table(laid);
                }
            }
        }
        let pages = filler.finish();
        if let Some(trace) = &self.trace {
            trace.span_ms("layout.section", started.elapsed().as_secs_f64() * 1000.0);
            trace.count("layout.pages", pages.len() as u64);
        }
        pages
    }
}

fn collect_metrics(pages: &[PageBox], section_count: usize, total_layout_ms: f64) -> DocumentMetrics {
    let mut metrics = DocumentMetrics {
        pages: Vec::with_capacity(pages.len()),
        section_count,
        total_layout_ms,
    };
    for (index, page) in pages.iter().enumerate() {
        let mut page_metrics = PageMetrics {
            page_number: index + 1,
            ..PageMetrics::default()
        };
        for block in page.blocks() {
            match block {
                PageBlock::Paragraph(fragment) => {
                    page_metrics.paragraph_count += 1;
                    page_metrics.line_count += fragment.lines().len();
                }
                PageBlock::Table(_) => {
                    page_metrics.table_count += 1;
                }
            }
        }
        page_metrics.used_height = page.used_height().to_f32();
        metrics.pages.push(page_metrics);
    }
    metrics
}
