use crate::error::GalleyError;
use crate::geometry::PageGeometry;
use crate::types::{Color, Margins, Px};
use image::GenericImageView;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Justification {
    Left,
    Center,
    Right,
    Both,
    Distribute,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndentUnit {
    Chars,
    Points,
}

#[derive(Debug, Clone, Copy)]
pub struct Indent {
    pub value: f32,
    pub unit: IndentUnit,
}

impl Indent {
    pub fn zero() -> Self {
        Self::points(0.0)
    }

    pub fn chars(value: f32) -> Self {
        Self {
            value,
            unit: IndentUnit::Chars,
        }
    }

    pub fn points(value: f32) -> Self {
        Self {
            value,
            unit: IndentUnit::Points,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialIndentKind {
    None,
    FirstLine,
    Hanging,
}

#[derive(Debug, Clone, Copy)]
pub struct SpecialIndent {
    pub kind: SpecialIndentKind,
    pub value: f32,
    pub unit: IndentUnit,
}

impl SpecialIndent {
    pub fn none() -> Self {
        Self {
            kind: SpecialIndentKind::None,
            value: 0.0,
            unit: IndentUnit::Points,
        }
    }

    pub fn first_line(value: f32, unit: IndentUnit) -> Self {
        Self {
            kind: SpecialIndentKind::FirstLine,
            value,
            unit,
        }
    }

    pub fn hanging(value: f32, unit: IndentUnit) -> Self {
        Self {
            kind: SpecialIndentKind::Hanging,
            value,
            unit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpacingUnit {
    Lines,
    Points,
}

#[derive(Debug, Clone, Copy)]
pub struct Spacing {
    pub value: f32,
    pub unit: SpacingUnit,
}

impl Spacing {
    pub fn zero() -> Self {
        Self::points(0.0)
    }

    pub fn lines(value: f32) -> Self {
        Self {
            value,
            unit: SpacingUnit::Lines,
        }
    }

    pub fn points(value: f32) -> Self {
        Self {
            value,
            unit: SpacingUnit::Points,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineSpacingRule {
    AtLeast,
    Exactly,
    Multiple,
}

#[derive(Debug, Clone, Copy)]
pub struct LineSpacing {
    pub value: f32,
    pub rule: LineSpacingRule,
}

impl LineSpacing {
    pub fn single() -> Self {
        Self::multiple(1.0)
    }

    pub fn multiple(value: f32) -> Self {
        Self {
            value,
            rule: LineSpacingRule::Multiple,
        }
    }

    pub fn at_least(points: f32) -> Self {
        Self {
            value: points,
            rule: LineSpacingRule::AtLeast,
        }
    }

    pub fn exactly(points: f32) -> Self {
        Self {
            value: points,
            rule: LineSpacingRule::Exactly,
        }
    }
}

impl Default for LineSpacing {
    fn default() -> Self {
        Self::single()
    }
}

/// Run-level font hint: an `EastAsia` hint routes ambiguous code points
/// (Latin-1 Supplement) to the East-Asian font.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FontHint {
    Default,
    EastAsia,
}

#[derive(Debug, Clone)]
pub struct CharacterFormat {
    pub ascii_font: String,
    pub east_asian_font: String,
    pub hint: FontHint,
    pub size_pt: f32,
    pub bold: bool,
    pub italic: bool,
    pub color: Color,
    pub snap_to_grid: bool,
}

impl Default for CharacterFormat {
    fn default() -> Self {
        Self {
            ascii_font: String::new(),
            east_asian_font: String::new(),
            hint: FontHint::Default,
            size_pt: 12.0,
            bold: false,
            italic: false,
            color: Color::BLACK,
            snap_to_grid: true,
        }
    }
}

impl CharacterFormat {
    pub fn with_fonts(
        mut self,
        ascii_font: impl Into<String>,
        east_asian_font: impl Into<String>,
    ) -> Self {
        self.ascii_font = ascii_font.into();
        self.east_asian_font = east_asian_font.into();
        self
    }

    pub fn with_hint(mut self, hint: FontHint) -> Self {
        self.hint = hint;
        self
    }

    pub fn with_size(mut self, size_pt: f32) -> Self {
        self.size_pt = size_pt;
        self
    }

    pub fn with_style(mut self, bold: bool, italic: bool) -> Self {
        self.bold = bold;
        self.italic = italic;
        self
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.color = color;
        self
    }

    pub fn with_snap_to_grid(mut self, snap: bool) -> Self {
        self.snap_to_grid = snap;
        self
    }
}

#[derive(Debug, Clone)]
pub struct ParagraphFormat {
    pub justification: Justification,
    pub left_indent: Indent,
    pub right_indent: Indent,
    pub special_indent: SpecialIndent,
    pub space_before: Spacing,
    pub space_after: Spacing,
    pub line_spacing: LineSpacing,
    pub snap_to_grid: bool,
    pub page_break_before: bool,
    /// Base font size of the paragraph style; grid cell widening for
    /// oversized characters is measured against this.
    pub base_font_size_pt: f32,
    /// Character format of the paragraph mark. An empty paragraph lays out a
    /// synthetic space in this format.
    pub mark: CharacterFormat,
}

impl Default for ParagraphFormat {
    fn default() -> Self {
        Self {
            justification: Justification::Left,
            left_indent: Indent::zero(),
            right_indent: Indent::zero(),
            special_indent: SpecialIndent::none(),
            space_before: Spacing::zero(),
            space_after: Spacing::zero(),
            line_spacing: LineSpacing::default(),
            snap_to_grid: true,
            page_break_before: false,
            base_font_size_pt: 12.0,
            mark: CharacterFormat::default(),
        }
    }
}

impl ParagraphFormat {
    pub fn with_justification(mut self, justification: Justification) -> Self {
        self.justification = justification;
        self
    }

    pub fn with_indents(mut self, left: Indent, right: Indent) -> Self {
        self.left_indent = left;
        self.right_indent = right;
        self
    }

    pub fn with_special_indent(mut self, special: SpecialIndent) -> Self {
        self.special_indent = special;
        self
    }

    pub fn with_spacing(mut self, before: Spacing, after: Spacing) -> Self {
        self.space_before = before;
        self.space_after = after;
        self
    }

    pub fn with_line_spacing(mut self, line_spacing: LineSpacing) -> Self {
        self.line_spacing = line_spacing;
        self
    }

    pub fn with_snap_to_grid(mut self, snap: bool) -> Self {
        self.snap_to_grid = snap;
        self
    }

    pub fn with_page_break_before(mut self, page_break_before: bool) -> Self {
        self.page_break_before = page_break_before;
        self
    }

    pub fn with_base_font_size(mut self, size_pt: f32) -> Self {
        self.base_font_size_pt = size_pt;
        self
    }

    pub fn with_mark(mut self, mark: CharacterFormat) -> Self {
        self.mark = mark;
        self
    }
}

#[derive(Debug, Clone)]
pub struct TextRun {
    pub text: String,
    pub format: CharacterFormat,
}

impl TextRun {
    pub fn new(text: impl Into<String>, format: CharacterFormat) -> Self {
        Self {
            text: text.into(),
            format,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PictureSource {
    pub name: String,
    pub width: Px,
    pub height: Px,
}

impl PictureSource {
    pub fn new(name: impl Into<String>, width: Px, height: Px) -> Self {
        Self {
            name: name.into(),
            width: width.max(Px::ZERO),
            height: height.max(Px::ZERO),
        }
    }

    /// Derives the extent from encoded image data (png or jpeg); one image
    /// pixel maps to one device pixel.
    pub fn from_bytes(name: impl Into<String>, bytes: &[u8]) -> Result<Self, GalleyError> {
        let image =
            image::load_from_memory(bytes).map_err(|err| GalleyError::Image(err.to_string()))?;
        let (width, height) = image.dimensions();
        Ok(Self::new(
            name,
            Px::from_i32(width.min(i32::MAX as u32) as i32),
            Px::from_i32(height.min(i32::MAX as u32) as i32),
        ))
    }
}

/// Closed set of paragraph children the layout engine distinguishes.
#[derive(Debug, Clone)]
pub enum InlineItem {
    Run(TextRun),
    Picture(PictureSource),
    LineBreak,
    PageBreak,
}

#[derive(Debug, Clone)]
pub struct ParagraphSource {
    pub format: ParagraphFormat,
    pub items: Vec<InlineItem>,
}

impl ParagraphSource {
    pub fn new(format: ParagraphFormat) -> Self {
        Self {
            format,
            items: Vec::new(),
        }
    }

    pub fn with_item(mut self, item: InlineItem) -> Self {
        self.items.push(item);
        self
    }

    pub fn with_text(self, text: impl Into<String>, format: CharacterFormat) -> Self {
        self.with_item(InlineItem::Run(TextRun::new(text, format)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowHeightRule {
    Auto,
    AtLeast,
    Exactly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellVerticalAlignment {
    Top,
    Center,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BorderSpec {
    pub visible: bool,
    pub width: Px,
    pub color: Color,
}

impl BorderSpec {
    pub fn none() -> Self {
        Self {
            visible: false,
            width: Px::ZERO,
            color: Color::BLACK,
        }
    }

    pub fn line(width: Px, color: Color) -> Self {
        Self {
            visible: true,
            width: width.max(Px::ZERO),
            color,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellBorders {
    pub left: BorderSpec,
    pub right: BorderSpec,
    pub top: BorderSpec,
    pub bottom: BorderSpec,
}

impl CellBorders {
    pub fn none() -> Self {
        Self {
            left: BorderSpec::none(),
            right: BorderSpec::none(),
            top: BorderSpec::none(),
            bottom: BorderSpec::none(),
        }
    }

    pub fn uniform(spec: BorderSpec) -> Self {
        Self {
            left: spec,
            right: spec,
            top: spec,
            bottom: spec,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CellSource {
    pub col_span: usize,
    /// Marks this cell as merged into the cell directly above; it contributes
    /// height to the anchor and produces no box of its own.
    pub merge_continue: bool,
    pub borders: CellBorders,
    pub background: Option<Color>,
    pub vertical_alignment: CellVerticalAlignment,
    pub padding: Margins,
    pub paragraphs: Vec<ParagraphSource>,
}

impl Default for CellSource {
    fn default() -> Self {
        Self {
            col_span: 1,
            merge_continue: false,
            borders: CellBorders::none(),
            background: None,
            vertical_alignment: CellVerticalAlignment::Top,
            padding: Margins::zero(),
            paragraphs: Vec::new(),
        }
    }
}

impl CellSource {
    pub fn with_col_span(mut self, col_span: usize) -> Self {
        self.col_span = col_span.max(1);
        self
    }

    pub fn with_merge_continue(mut self, merge_continue: bool) -> Self {
        self.merge_continue = merge_continue;
        self
    }

    pub fn with_borders(mut self, borders: CellBorders) -> Self {
        self.borders = borders;
        self
    }

    pub fn with_background(mut self, background: Option<Color>) -> Self {
        self.background = background;
        self
    }

    pub fn with_vertical_alignment(mut self, alignment: CellVerticalAlignment) -> Self {
        self.vertical_alignment = alignment;
        self
    }

    pub fn with_padding(mut self, padding: Margins) -> Self {
        self.padding = padding;
        self
    }

    pub fn with_paragraph(mut self, paragraph: ParagraphSource) -> Self {
        self.paragraphs.push(paragraph);
        self
    }
}

#[derive(Debug, Clone)]
pub struct RowSource {
    pub height_pt: f32,
    pub rule: RowHeightRule,
    pub cells: Vec<CellSource>,
}

impl RowSource {
    pub fn new() -> Self {
        Self {
            height_pt: 0.0,
            rule: RowHeightRule::Auto,
            cells: Vec::new(),
        }
    }

    pub fn with_height(mut self, height_pt: f32, rule: RowHeightRule) -> Self {
        self.height_pt = height_pt;
        self.rule = rule;
        self
    }

    pub fn with_cell(mut self, cell: CellSource) -> Self {
        self.cells.push(cell);
        self
    }
}

impl Default for RowSource {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct TableSource {
    pub column_widths: Vec<Px>,
    pub rows: Vec<RowSource>,
}

impl TableSource {
    pub fn new(column_widths: Vec<Px>) -> Self {
        Self {
            column_widths,
            rows: Vec::new(),
        }
    }

    pub fn with_row(mut self, row: RowSource) -> Self {
        self.rows.push(row);
        self
    }
}

#[derive(Debug, Clone)]
pub enum Block {
    Paragraph(ParagraphSource),
    Table(TableSource),
}

#[derive(Debug, Clone)]
pub struct Section {
    pub geometry: PageGeometry,
    pub blocks: Vec<Block>,
}

impl Section {
    pub fn new(geometry: PageGeometry) -> Self {
        Self {
            geometry,
            blocks: Vec::new(),
        }
    }

    pub fn with_paragraph(mut self, paragraph: ParagraphSource) -> Self {
        self.blocks.push(Block::Paragraph(paragraph));
        self
    }

    pub fn with_table(mut self, table: TableSource) -> Self {
        self.blocks.push(Block::Table(table));
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct DocumentSource {
    pub sections: Vec<Section>,
}

impl DocumentSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_section(mut self, section: Section) -> Self {
        self.sections.push(section);
        self
    }
}
