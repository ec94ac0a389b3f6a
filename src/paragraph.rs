use crate::font::FontRegistry;
use crate::geometry::{GridType, PageGeometry};
use crate::line::{LineAdd, LineBox, LineContext, LineItem, PictureBox};
use crate::measure::CharBox;
use crate::model::{
    Indent, IndentUnit, InlineItem, ParagraphSource, Spacing, SpacingUnit, SpecialIndent,
    SpecialIndentKind, TextRun,
};
use crate::types::Px;

/// A fully laid-out paragraph: its packed lines plus resolved indentation and
/// declared spacing. The page filler decides how many lines land on which
/// page; spacing collapse happens there.
#[derive(Debug, Clone)]
pub struct ParagraphBox {
    lines: Vec<LineBox>,
    left_indent: Px,
    right_indent: Px,
    special_kind: SpecialIndentKind,
    special_offset: Px,
    space_before: Px,
    space_after: Px,
    available_width: Px,
    page_break_before: bool,
}

impl ParagraphBox {
    pub fn lines(&self) -> &[LineBox] {
        &self.lines
    }

    pub fn height(&self) -> Px {
        self.lines.iter().map(LineBox::height).sum()
    }

    pub fn left_indent(&self) -> Px {
        self.left_indent
    }

    pub fn right_indent(&self) -> Px {
        self.right_indent
    }

    pub fn special_kind(&self) -> SpecialIndentKind {
        self.special_kind
    }

    pub fn special_offset(&self) -> Px {
        self.special_offset
    }

    pub fn space_before(&self) -> Px {
        self.space_before
    }

    pub fn space_after(&self) -> Px {
        self.space_after
    }

    pub fn available_width(&self) -> Px {
        self.available_width
    }

    pub fn page_break_before(&self) -> bool {
        self.page_break_before
    }
}

pub(crate) fn layout_paragraph(
    source: &ParagraphSource,
    geometry: &PageGeometry,
    fonts: &FontRegistry,
) -> ParagraphBox {
    layout_paragraph_with_width(source, geometry, fonts, geometry.content_width())
}

/// Lays a paragraph out against an explicit width budget (table cells hand in
/// their content width instead of the page's).
pub(crate) fn layout_paragraph_with_width(
    source: &ParagraphSource,
    geometry: &PageGeometry,
    fonts: &FontRegistry,
    width_budget: Px,
) -> ParagraphBox {
    let format = &source.format;

    // An empty paragraph still owns a paragraph mark; lay out a synthetic
    // space in the mark's format so indents and heights stay well-defined.
    let synthetic = [InlineItem::Run(TextRun::new(" ", format.mark.clone()))];
    let has_content = source.items.iter().any(|item| match item {
        InlineItem::Run(run) => !run.text.is_empty(),
        InlineItem::Picture(_) => true,
        InlineItem::LineBreak | InlineItem::PageBreak => false,
    });
    let items: Vec<&InlineItem> = if has_content {
        source.items.iter().collect()
    } else {
        synthetic.iter().chain(source.items.iter()).collect()
    };

    let first_char_size_pt = items
        .iter()
        .find_map(|item| match item {
            InlineItem::Run(run) if !run.text.is_empty() => Some(run.format.size_pt),
            _ => None,
        })
        .unwrap_or(format.mark.size_pt);

    let left_indent = resolve_indent(format.left_indent, geometry);
    let right_indent = resolve_indent(format.right_indent, geometry);
    let special_offset = resolve_special_indent(
        format.special_indent,
        geometry,
        first_char_size_pt,
        format.base_font_size_pt,
    );
    let space_before = resolve_spacing(format.space_before, geometry);
    let space_after = resolve_spacing(format.space_after, geometry);

    let available_width = (width_budget - left_indent - right_indent).max(Px::ZERO);
    let ctx = LineContext {
        available_width,
        grid: geometry.grid,
        line_pitch: geometry.line_pitch,
        snap_to_grid: format.snap_to_grid,
        line_spacing: format.line_spacing,
    };
    let first_indent = match format.special_indent.kind {
        SpecialIndentKind::FirstLine => special_offset,
        _ => Px::ZERO,
    };
    let follow_indent = match format.special_indent.kind {
        SpecialIndentKind::Hanging => special_offset,
        _ => Px::ZERO,
    };

    let mut lines: Vec<LineBox> = Vec::new();
    let mut current = LineBox::new(ctx, first_indent);

    let close_line =
        |lines: &mut Vec<LineBox>, current: &mut LineBox, page_break: bool| {
            current.close(format.justification);
            current.set_page_break(page_break);
            let next = LineBox::new(ctx, follow_indent);
            lines.push(std::mem::replace(current, next));
        };

    for item in items {
        match item {
            InlineItem::Run(run) => {
                for ch in run.text.chars() {
                    let char_box =
                        CharBox::measure(ch, &run.format, format.base_font_size_pt, geometry, fonts);
                    let mut candidate = LineItem::Char(char_box);
                    loop {
                        match current.try_append(candidate) {
                            LineAdd::Placed => break,
                            LineAdd::Rejected(rejected) => {
                                close_line(&mut lines, &mut current, false);
                                candidate = rejected;
                            }
                        }
                    }
                }
            }
            InlineItem::Picture(picture) => {
                let mut candidate = LineItem::Picture(PictureBox {
                    name: picture.name.clone(),
                    width: picture.width,
                    height: picture.height,
                });
                loop {
                    match current.try_append(candidate) {
                        LineAdd::Placed => break,
                        LineAdd::Rejected(rejected) => {
                            close_line(&mut lines, &mut current, false);
                            candidate = rejected;
                        }
                    }
                }
            }
            InlineItem::LineBreak | InlineItem::PageBreak => {
                // A break before any content does not consume a line.
                if lines.is_empty() && current.is_empty() {
                    continue;
                }
                let page_break = matches!(item, InlineItem::PageBreak);
                close_line(&mut lines, &mut current, page_break);
            }
        }
    }

    // A trailing break already closed its line; don't emit the empty tail.
    if !current.is_empty() || lines.is_empty() {
        current.close(format.justification);
        lines.push(current);
    }

    ParagraphBox {
        lines,
        left_indent,
        right_indent,
        special_kind: format.special_indent.kind,
        special_offset,
        space_before,
        space_after,
        available_width,
        page_break_before: format.page_break_before,
    }
}

fn resolve_indent(indent: Indent, geometry: &PageGeometry) -> Px {
    let raw = match indent.unit {
        IndentUnit::Chars => geometry.char_pitch * indent.value,
        IndentUnit::Points => Px::from_pt(indent.value),
    };
    snap_up_for_char_grid(raw, geometry)
}

/// First-line/hanging offset. Character units scale by the grid cell widened
/// for the first character's font size; without a character grid the first
/// character's em size alone is the unit.
fn resolve_special_indent(
    special: SpecialIndent,
    geometry: &PageGeometry,
    first_char_size_pt: f32,
    base_font_size_pt: f32,
) -> Px {
    if special.kind == SpecialIndentKind::None {
        return Px::ZERO;
    }
    let raw = match special.unit {
        IndentUnit::Chars => match geometry.grid {
            GridType::LinesAndChars | GridType::SnapToChars if geometry.char_grid_active() => {
                (geometry.char_pitch + Px::from_pt(first_char_size_pt - base_font_size_pt))
                    * special.value
            }
            _ => Px::from_pt(first_char_size_pt) * special.value,
        },
        IndentUnit::Points => Px::from_pt(special.value),
    };
    snap_up_for_char_grid(raw, geometry)
}

fn snap_up_for_char_grid(value: Px, geometry: &PageGeometry) -> Px {
    if geometry.grid == GridType::SnapToChars && geometry.char_pitch > Px::ZERO {
        value.ceil_to_multiple(geometry.char_pitch)
    } else {
        value
    }
}

/// Line-unit spacing scales by the line pitch when a grid is active, else by
/// a 12pt default line.
fn resolve_spacing(spacing: Spacing, geometry: &PageGeometry) -> Px {
    match spacing.unit {
        SpacingUnit::Lines => {
            if geometry.line_grid_active() {
                geometry.line_pitch * spacing.value
            } else {
                Px::from_pt(12.0) * spacing.value
            }
        }
        SpacingUnit::Points => Px::from_pt(spacing.value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CharacterFormat, ParagraphFormat};
    use crate::types::{Margins, Size};

    fn registry() -> FontRegistry {
        FontRegistry::new()
    }

    fn plain_geometry(width: i32, height: i32) -> PageGeometry {
        PageGeometry::new(
            Size::new(Px::from_i32(width), Px::from_i32(height)),
            Margins::zero(),
        )
    }

    fn snap_geometry(pitch: i32) -> PageGeometry {
        plain_geometry(600, 800).with_grid(
            GridType::SnapToChars,
            Px::from_i32(pitch),
            Px::from_i32(16),
        )
    }

    #[test]
    fn char_unit_indent_multiplies_pitch() {
        let geometry = plain_geometry(600, 800).with_grid(
            GridType::LinesAndChars,
            Px::from_i32(20),
            Px::from_i32(16),
        );
        assert_eq!(resolve_indent(Indent::chars(2.0), &geometry), Px::from_i32(40));
    }

    #[test]
    fn snap_to_chars_rounds_indents_up() {
        let geometry = snap_geometry(20);
        // 1.5 chars -> 30px -> next multiple of pitch.
        assert_eq!(resolve_indent(Indent::chars(1.5), &geometry), Px::from_i32(40));
        // 18.75pt -> 25px -> 40px.
        assert_eq!(
            resolve_indent(Indent::points(18.75), &geometry),
            Px::from_i32(40)
        );
    }

    #[test]
    fn point_unit_indent_converts_directly() {
        let geometry = plain_geometry(600, 800);
        assert_eq!(resolve_indent(Indent::points(18.0), &geometry), Px::from_i32(24));
    }

    #[test]
    fn special_indent_tracks_first_character_size() {
        let geometry = plain_geometry(600, 800).with_grid(
            GridType::LinesAndChars,
            Px::from_i32(20),
            Px::from_i32(16),
        );
        // 18pt first char in a 12pt paragraph: cell widens by 8px.
        let offset = resolve_special_indent(
            SpecialIndent::first_line(2.0, IndentUnit::Chars),
            &geometry,
            18.0,
            12.0,
        );
        assert_eq!(offset, Px::from_i32(56));

        // Without a character grid the first character's em size is the unit.
        let offset = resolve_special_indent(
            SpecialIndent::first_line(2.0, IndentUnit::Chars),
            &plain_geometry(600, 800),
            18.0,
            12.0,
        );
        assert_eq!(offset, Px::from_i32(48));
    }

    #[test]
    fn line_unit_spacing_uses_pitch_or_default() {
        let grid = plain_geometry(600, 800).with_grid(
            GridType::Lines,
            Px::ZERO,
            Px::from_i32(18),
        );
        assert_eq!(resolve_spacing(Spacing::lines(2.0), &grid), Px::from_i32(36));
        assert_eq!(
            resolve_spacing(Spacing::lines(2.0), &plain_geometry(600, 800)),
            Px::from_i32(32)
        );
        assert_eq!(
            resolve_spacing(Spacing::points(7.5), &plain_geometry(600, 800)),
            Px::from_i32(10)
        );
    }

    #[test]
    fn text_wraps_into_multiple_lines() {
        // Fallback metrics: 12pt -> 16px em, char width 9.6px.
        let geometry = plain_geometry(100, 800);
        let source = ParagraphSource::new(ParagraphFormat::default())
            .with_text("aaaaaaaaaaaaaaaaaaaa", CharacterFormat::default());
        let paragraph = layout_paragraph(&source, &geometry, &registry());
        assert!(paragraph.lines().len() >= 2);
        for line in paragraph.lines() {
            assert!(
                line.indent() + line.content_width()
                    <= line.available_width() + Px::from_i32(1)
            );
            assert!(!line.is_empty());
        }
        let total: usize = paragraph.lines().iter().map(|l| l.items().len()).sum();
        assert_eq!(total, 20);
    }

    #[test]
    fn empty_paragraph_lays_out_synthetic_space() {
        let geometry = plain_geometry(200, 800);
        let source = ParagraphSource::new(ParagraphFormat::default());
        let paragraph = layout_paragraph(&source, &geometry, &registry());
        assert_eq!(paragraph.lines().len(), 1);
        assert_eq!(paragraph.lines()[0].items().len(), 1);
        match &paragraph.lines()[0].items()[0] {
            LineItem::Char(c) => assert_eq!(c.ch, ' '),
            LineItem::Picture(_) => panic!("expected the synthetic space"),
        }
    }

    #[test]
    fn line_breaks_split_lines() {
        let geometry = plain_geometry(400, 800);
        let source = ParagraphSource::new(ParagraphFormat::default())
            .with_text("ab", CharacterFormat::default())
            .with_item(InlineItem::LineBreak)
            .with_text("cd", CharacterFormat::default());
        let paragraph = layout_paragraph(&source, &geometry, &registry());
        assert_eq!(paragraph.lines().len(), 2);
        assert_eq!(paragraph.lines()[0].items().len(), 2);
        assert_eq!(paragraph.lines()[1].items().len(), 2);
        assert!(!paragraph.lines()[0].ends_with_page_break());
    }

    #[test]
    fn leading_break_consumes_no_line() {
        let geometry = plain_geometry(400, 800);
        let source = ParagraphSource::new(ParagraphFormat::default())
            .with_item(InlineItem::LineBreak)
            .with_text("ab", CharacterFormat::default());
        let paragraph = layout_paragraph(&source, &geometry, &registry());
        assert_eq!(paragraph.lines().len(), 1);
    }

    #[test]
    fn trailing_page_break_flags_last_line_without_tail() {
        let geometry = plain_geometry(400, 800);
        let source = ParagraphSource::new(ParagraphFormat::default())
            .with_text("ab", CharacterFormat::default())
            .with_item(InlineItem::PageBreak);
        let paragraph = layout_paragraph(&source, &geometry, &registry());
        assert_eq!(paragraph.lines().len(), 1);
        assert!(paragraph.lines()[0].ends_with_page_break());
    }

    #[test]
    fn consecutive_breaks_leave_a_blank_line() {
        let geometry = plain_geometry(400, 800);
        let source = ParagraphSource::new(ParagraphFormat::default())
            .with_text("ab", CharacterFormat::default())
            .with_item(InlineItem::LineBreak)
            .with_item(InlineItem::LineBreak)
            .with_text("cd", CharacterFormat::default());
        let paragraph = layout_paragraph(&source, &geometry, &registry());
        assert_eq!(paragraph.lines().len(), 3);
        assert!(paragraph.lines()[1].is_empty());
        assert!(paragraph.lines()[1].height() > Px::ZERO);
    }

    #[test]
    fn hanging_indent_applies_to_follow_lines() {
        let geometry = plain_geometry(100, 800);
        let format = ParagraphFormat::default()
            .with_special_indent(SpecialIndent::hanging(18.0, IndentUnit::Points));
        let source = ParagraphSource::new(format)
            .with_text("aaaaaaaaaaaaaaaaaaaa", CharacterFormat::default());
        let paragraph = layout_paragraph(&source, &geometry, &registry());
        assert!(paragraph.lines().len() >= 2);
        assert_eq!(paragraph.lines()[0].indent(), Px::ZERO);
        assert_eq!(paragraph.lines()[1].indent(), Px::from_i32(24));
    }

    #[test]
    fn first_line_indent_applies_to_first_line_only() {
        let geometry = plain_geometry(100, 800);
        let format = ParagraphFormat::default()
            .with_special_indent(SpecialIndent::first_line(18.0, IndentUnit::Points));
        let source = ParagraphSource::new(format)
            .with_text("aaaaaaaaaaaaaaaaaaaa", CharacterFormat::default());
        let paragraph = layout_paragraph(&source, &geometry, &registry());
        assert!(paragraph.lines().len() >= 2);
        assert_eq!(paragraph.lines()[0].indent(), Px::from_i32(24));
        assert_eq!(paragraph.lines()[1].indent(), Px::ZERO);
    }

    #[test]
    fn indents_reduce_width_budget() {
        let geometry = plain_geometry(300, 800);
        let format = ParagraphFormat::default()
            .with_indents(Indent::points(18.0), Indent::points(36.0));
        let source =
            ParagraphSource::new(format).with_text("a", CharacterFormat::default());
        let paragraph = layout_paragraph(&source, &geometry, &registry());
        assert_eq!(paragraph.left_indent(), Px::from_i32(24));
        assert_eq!(paragraph.right_indent(), Px::from_i32(48));
        assert_eq!(paragraph.available_width(), Px::from_i32(228));
    }

    #[test]
    fn paragraph_height_sums_lines() {
        let geometry = plain_geometry(400, 800);
        let format =
            ParagraphFormat::default().with_line_spacing(crate::model::LineSpacing::exactly(15.0));
        let source = ParagraphSource::new(format)
            .with_text("ab", CharacterFormat::default())
            .with_item(InlineItem::LineBreak)
            .with_text("cd", CharacterFormat::default());
        let paragraph = layout_paragraph(&source, &geometry, &registry());
        assert_eq!(paragraph.height(), Px::from_i32(40));
    }
}
