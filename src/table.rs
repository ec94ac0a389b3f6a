use crate::font::FontRegistry;
use crate::geometry::PageGeometry;
use crate::model::{
    BorderSpec, CellBorders, CellVerticalAlignment, RowHeightRule, TableSource,
};
use crate::paragraph::{ParagraphBox, layout_paragraph_with_width};
use crate::trace::TraceLog;
use crate::types::{Color, Margins, Px};
use std::collections::HashMap;

/// One rendered table cell. Border fields are rewritten once by the conflict
/// resolution pass; everything else is fixed at construction.
#[derive(Debug, Clone)]
pub struct CellBox {
    row: usize,
    col: usize,
    row_span: usize,
    col_span: usize,
    width: Px,
    height: Px,
    padding: Margins,
    borders: CellBorders,
    background: Option<Color>,
    vertical_alignment: CellVerticalAlignment,
    paragraphs: Vec<ParagraphBox>,
    content_height: Px,
}

impl CellBox {
    pub fn row(&self) -> usize {
        self.row
    }

    pub fn col(&self) -> usize {
        self.col
    }

    pub fn row_span(&self) -> usize {
        self.row_span
    }

    pub fn col_span(&self) -> usize {
        self.col_span
    }

    pub fn width(&self) -> Px {
        self.width
    }

    pub fn height(&self) -> Px {
        self.height
    }

    pub fn padding(&self) -> Margins {
        self.padding
    }

    pub fn borders(&self) -> &CellBorders {
        &self.borders
    }

    pub fn background(&self) -> Option<Color> {
        self.background
    }

    pub fn vertical_alignment(&self) -> CellVerticalAlignment {
        self.vertical_alignment
    }

    pub fn paragraphs(&self) -> &[ParagraphBox] {
        &self.paragraphs
    }

    pub fn content_height(&self) -> Px {
        self.content_height
    }
}

#[derive(Debug, Clone)]
pub struct TableBox {
    column_widths: Vec<Px>,
    row_heights: Vec<Px>,
    cells: Vec<CellBox>,
}

impl TableBox {
    pub fn column_widths(&self) -> &[Px] {
        &self.column_widths
    }

    pub fn row_heights(&self) -> &[Px] {
        &self.row_heights
    }

    pub fn cells(&self) -> &[CellBox] {
        &self.cells
    }

    pub fn width(&self) -> Px {
        self.column_widths.iter().copied().sum()
    }

    pub fn height(&self) -> Px {
        self.row_heights.iter().copied().sum()
    }
}

pub(crate) fn layout_table(
    source: &TableSource,
    geometry: &PageGeometry,
    fonts: &FontRegistry,
    trace: Option<&TraceLog>,
) -> TableBox {
    let column_widths = source.column_widths.clone();
    let column_count = column_widths.len();

    let mut cells: Vec<CellBox> = Vec::new();
    // Column start -> index of the latest anchor box in that column, for
    // vertical-merge continuation lookups.
    let mut anchors: HashMap<usize, usize> = HashMap::new();

    for (row_index, row) in source.rows.iter().enumerate() {
        let mut cursor_col = 0usize;
        for cell in &row.cells {
            let col_span = cell.col_span.max(1).min(column_count.saturating_sub(cursor_col).max(1));
            if cell.merge_continue {
                match anchors.get(&cursor_col).copied() {
                    Some(anchor_index)
                        if cells[anchor_index].row + cells[anchor_index].row_span == row_index =>
                    {
                        cells[anchor_index].row_span += 1;
                    }
                    _ => {
                        // Malformed merge metadata degrades to a no-op.
                        if let Some(trace) = trace {
                            trace.count("table.orphan_merge", 1);
                        }
                    }
                }
                cursor_col += col_span;
                continue;
            }

            let width = span_width(&column_widths, cursor_col, col_span);
            let content_width = (width - cell.padding.left - cell.padding.right).max(Px::ZERO);
            let mut paragraphs = Vec::with_capacity(cell.paragraphs.len());
            let mut content_height = Px::ZERO;
            let mut prev_after = Px::ZERO;
            for (index, paragraph) in cell.paragraphs.iter().enumerate() {
                let laid = layout_paragraph_with_width(paragraph, geometry, fonts, content_width);
                let gap = if index == 0 {
                    laid.space_before()
                } else {
                    prev_after.max(laid.space_before())
                };
                content_height += gap + laid.height();
                prev_after = laid.space_after();
                paragraphs.push(laid);
            }

            let index = cells.len();
            anchors.insert(cursor_col, index);
            cells.push(CellBox {
                row: row_index,
                col: cursor_col,
                row_span: 1,
                col_span,
                width,
                height: Px::ZERO,
                padding: cell.padding,
                borders: cell.borders,
                background: cell.background,
                vertical_alignment: cell.vertical_alignment,
                paragraphs,
                content_height,
            });
            cursor_col += col_span;
        }
    }

    let mut row_heights = Vec::with_capacity(source.rows.len());
    for (row_index, row) in source.rows.iter().enumerate() {
        let declared = Px::from_pt(row.height_pt);
        let content = cells
            .iter()
            .filter(|cell| cell.row == row_index)
            .map(|cell| cell.content_height + cell.padding.top + cell.padding.bottom)
            .fold(Px::ZERO, Px::max);
        let height = match row.rule {
            RowHeightRule::Exactly => declared,
            RowHeightRule::AtLeast => declared.max(content),
            RowHeightRule::Auto => content,
        };
        row_heights.push(height);
    }

    for cell in &mut cells {
        let end = (cell.row + cell.row_span).min(row_heights.len());
        cell.height = row_heights[cell.row..end].iter().copied().sum();
    }

    resolve_border_conflicts(&mut cells);

    TableBox {
        column_widths,
        row_heights,
        cells,
    }
}

fn span_width(column_widths: &[Px], col_start: usize, col_span: usize) -> Px {
    let mut width = Px::ZERO;
    for col in col_start..col_start.saturating_add(col_span) {
        width += column_widths.get(col).copied().unwrap_or(Px::ZERO);
    }
    width
}

/// Reconciles each shared edge once: every cell examines its right and bottom
/// neighbor. Left/right edges split the winning width between both cells;
/// top/bottom edges hand the full winning width to the lower cell and zero
/// the upper cell's bottom border.
fn resolve_border_conflicts(cells: &mut [CellBox]) {
    for index in 0..cells.len() {
        let (row, col, row_span, col_span) = {
            let cell = &cells[index];
            (cell.row, cell.col, cell.row_span, cell.col_span)
        };
        let right = cells
            .iter()
            .position(|other| other.row == row && other.col == col + col_span);
        if let Some(right) = right {
            let (a, b) = pair_mut(cells, index, right);
            resolve_side_edge(a, b);
        }
        let below = cells
            .iter()
            .position(|other| other.col == col && other.row == row + row_span);
        if let Some(below) = below {
            let (a, b) = pair_mut(cells, index, below);
            resolve_stacked_edge(a, b);
        }
    }
}

fn pair_mut(cells: &mut [CellBox], first: usize, second: usize) -> (&mut CellBox, &mut CellBox) {
    // Cells are stored row-major, so a right or below neighbor always sits
    // later in the list.
    let (head, tail) = cells.split_at_mut(second);
    (&mut head[first], &mut tail[0])
}

fn resolve_side_edge(left: &mut CellBox, right: &mut CellBox) {
    let a = left.borders.right;
    let b = right.borders.left;
    match (a.visible, b.visible) {
        (true, true) => {
            let (width, color) = if a.width > b.width {
                (a.width, a.color)
            } else if b.width > a.width {
                (b.width, b.color)
            } else {
                (a.width, darker_color(a.color, b.color))
            };
            let shared = BorderSpec::line(width / 2, color);
            left.borders.right = shared;
            right.borders.left = shared;
        }
        (true, false) => {
            let shared = BorderSpec::line(a.width / 2, a.color);
            left.borders.right = shared;
            right.borders.left = shared;
        }
        (false, true) => {
            let shared = BorderSpec::line(b.width / 2, b.color);
            left.borders.right = shared;
            right.borders.left = shared;
        }
        (false, false) => {
            left.borders.right = BorderSpec::none();
            right.borders.left = BorderSpec::none();
        }
    }
}

fn resolve_stacked_edge(top: &mut CellBox, bottom: &mut CellBox) {
    let a = top.borders.bottom;
    let b = bottom.borders.top;
    match (a.visible, b.visible) {
        (true, true) => {
            let (width, color) = if a.width > b.width {
                (a.width, a.color)
            } else if b.width > a.width {
                (b.width, b.color)
            } else {
                (a.width, darker_color(a.color, b.color))
            };
            bottom.borders.top = BorderSpec::line(width, color);
        }
        (true, false) => {
            bottom.borders.top = BorderSpec::line(a.width, a.color);
        }
        (false, true) => {}
        (false, false) => {
            bottom.borders.top = BorderSpec::none();
        }
    }
    // Ownership of the shared edge transfers entirely to the cell below.
    top.borders.bottom = BorderSpec::none();
}

/// Brightness tie-break: compare `r + b + 2g`, then `b + 2g`, then `2g`; the
/// first strict difference picks the darker side. A full tie means the colors
/// are identical and the second cell's color stands.
fn darker_color(a: Color, b: Color) -> Color {
    let keys = |c: Color| {
        let (r, g, bl) = (c.r as u32, c.g as u32, c.b as u32);
        [r + bl + 2 * g, bl + 2 * g, 2 * g]
    };
    let ka = keys(a);
    let kb = keys(b);
    for (ka, kb) in ka.iter().zip(kb.iter()) {
        if ka < kb {
            return a;
        }
        if kb < ka {
            return b;
        }
    }
    b
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        CellSource, CharacterFormat, LineSpacing, ParagraphFormat, ParagraphSource, RowSource,
    };
    use crate::types::{Margins, Size};

    fn geometry() -> PageGeometry {
        PageGeometry::new(
            Size::new(Px::from_i32(600), Px::from_i32(800)),
            Margins::zero(),
        )
    }

    fn fonts() -> FontRegistry {
        FontRegistry::new()
    }

    /// A cell whose single paragraph lays out as one 20px line.
    fn ruled_cell() -> CellSource {
        CellSource::default().with_paragraph(
            ParagraphSource::new(
                ParagraphFormat::default().with_line_spacing(LineSpacing::exactly(15.0)),
            )
            .with_text("a", CharacterFormat::default()),
        )
    }

    fn two_cell_row(left: CellSource, right: CellSource) -> TableSource {
        TableSource::new(vec![Px::from_i32(100), Px::from_i32(100)])
            .with_row(RowSource::new().with_cell(left).with_cell(right))
    }

    #[test]
    fn column_spans_sum_widths() {
        let table = TableSource::new(vec![
            Px::from_i32(100),
            Px::from_i32(50),
            Px::from_i32(50),
        ])
        .with_row(
            RowSource::new()
                .with_cell(ruled_cell())
                .with_cell(ruled_cell().with_col_span(2)),
        );
        let laid = layout_table(&table, &geometry(), &fonts(), None);
        assert_eq!(laid.cells().len(), 2);
        assert_eq!(laid.cells()[0].width(), Px::from_i32(100));
        assert_eq!(laid.cells()[1].col(), 1);
        assert_eq!(laid.cells()[1].width(), Px::from_i32(100));
        assert_eq!(laid.width(), Px::from_i32(200));
    }

    #[test]
    fn auto_row_height_tracks_content() {
        let table = two_cell_row(ruled_cell(), ruled_cell());
        let laid = layout_table(&table, &geometry(), &fonts(), None);
        assert_eq!(laid.row_heights(), &[Px::from_i32(20)]);
        assert_eq!(laid.height(), Px::from_i32(20));
    }

    #[test]
    fn exact_row_height_ignores_content() {
        let table = TableSource::new(vec![Px::from_i32(100)]).with_row(
            RowSource::new()
                .with_height(7.5, RowHeightRule::Exactly)
                .with_cell(ruled_cell()),
        );
        let laid = layout_table(&table, &geometry(), &fonts(), None);
        assert_eq!(laid.row_heights(), &[Px::from_i32(10)]);
    }

    #[test]
    fn at_least_row_height_is_a_floor() {
        let table = TableSource::new(vec![Px::from_i32(100)]).with_row(
            RowSource::new()
                .with_height(37.5, RowHeightRule::AtLeast)
                .with_cell(ruled_cell()),
        );
        let laid = layout_table(&table, &geometry(), &fonts(), None);
        assert_eq!(laid.row_heights(), &[Px::from_i32(50)]);
    }

    #[test]
    fn cell_padding_counts_into_row_height() {
        let padded = ruled_cell().with_padding(Margins {
            top: Px::from_i32(3),
            right: Px::ZERO,
            bottom: Px::from_i32(5),
            left: Px::ZERO,
        });
        let table = TableSource::new(vec![Px::from_i32(100)])
            .with_row(RowSource::new().with_cell(padded));
        let laid = layout_table(&table, &geometry(), &fonts(), None);
        assert_eq!(laid.row_heights(), &[Px::from_i32(28)]);
    }

    #[test]
    fn merge_continuation_extends_the_anchor() {
        let table = TableSource::new(vec![Px::from_i32(100)])
            .with_row(
                RowSource::new()
                    .with_height(15.0, RowHeightRule::Exactly)
                    .with_cell(ruled_cell()),
            )
            .with_row(
                RowSource::new()
                    .with_height(15.0, RowHeightRule::Exactly)
                    .with_cell(ruled_cell().with_merge_continue(true)),
            );
        let laid = layout_table(&table, &geometry(), &fonts(), None);
        assert_eq!(laid.cells().len(), 1);
        assert_eq!(laid.cells()[0].row_span(), 2);
        assert_eq!(laid.cells()[0].height(), Px::from_i32(40));
    }

    #[test]
    fn orphan_continuation_is_a_no_op() {
        let table = TableSource::new(vec![Px::from_i32(100)]).with_row(
            RowSource::new().with_cell(ruled_cell().with_merge_continue(true)),
        );
        let laid = layout_table(&table, &geometry(), &fonts(), None);
        assert!(laid.cells().is_empty());
    }

    #[test]
    fn visible_border_halves_and_copies_to_blank_neighbor() {
        let left = ruled_cell().with_borders(CellBorders {
            right: BorderSpec::line(Px::from_i32(4), Color::BLACK),
            ..CellBorders::none()
        });
        let right = ruled_cell();
        let laid = layout_table(&two_cell_row(left, right), &geometry(), &fonts(), None);
        let left = &laid.cells()[0];
        let right = &laid.cells()[1];
        assert_eq!(left.borders().right.width, Px::from_i32(2));
        assert!(right.borders().left.visible);
        assert_eq!(right.borders().left.width, Px::from_i32(2));
        assert_eq!(right.borders().left.color, Color::BLACK);
    }

    #[test]
    fn wider_side_border_wins_and_is_halved() {
        let left = ruled_cell().with_borders(CellBorders {
            right: BorderSpec::line(Px::from_i32(4), Color::rgb(200, 0, 0)),
            ..CellBorders::none()
        });
        let right = ruled_cell().with_borders(CellBorders {
            left: BorderSpec::line(Px::from_i32(2), Color::rgb(0, 0, 200)),
            ..CellBorders::none()
        });
        let laid = layout_table(&two_cell_row(left, right), &geometry(), &fonts(), None);
        let left = &laid.cells()[0];
        let right = &laid.cells()[1];
        assert_eq!(left.borders().right.width, Px::from_i32(2));
        assert_eq!(right.borders().left.width, Px::from_i32(2));
        assert_eq!(left.borders().right.color, Color::rgb(200, 0, 0));
        assert_eq!(right.borders().left.color, Color::rgb(200, 0, 0));
    }

    #[test]
    fn equal_width_side_borders_pick_the_darker_color() {
        // Equal first keys (r+b+2g = 255); blue's second key (b+2g) is
        // larger, so red is the darker side.
        let left = ruled_cell().with_borders(CellBorders {
            right: BorderSpec::line(Px::from_i32(4), Color::rgb(255, 0, 0)),
            ..CellBorders::none()
        });
        let right = ruled_cell().with_borders(CellBorders {
            left: BorderSpec::line(Px::from_i32(4), Color::rgb(0, 0, 255)),
            ..CellBorders::none()
        });
        let laid = layout_table(&two_cell_row(left, right), &geometry(), &fonts(), None);
        assert_eq!(laid.cells()[0].borders().right.color, Color::rgb(255, 0, 0));
        assert_eq!(laid.cells()[1].borders().left.color, Color::rgb(255, 0, 0));
        assert_eq!(laid.cells()[0].borders().right.width, Px::from_i32(2));
    }

    #[test]
    fn invisible_side_borders_zero_both_cells() {
        let laid = layout_table(
            &two_cell_row(ruled_cell(), ruled_cell()),
            &geometry(),
            &fonts(),
            None,
        );
        assert!(!laid.cells()[0].borders().right.visible);
        assert_eq!(laid.cells()[0].borders().right.width, Px::ZERO);
        assert!(!laid.cells()[1].borders().left.visible);
    }

    #[test]
    fn bottom_edge_transfers_fully_downward() {
        let top = ruled_cell().with_borders(CellBorders {
            bottom: BorderSpec::line(Px::from_i32(4), Color::BLACK),
            ..CellBorders::none()
        });
        let bottom = ruled_cell().with_borders(CellBorders {
            top: BorderSpec::line(Px::from_i32(1), Color::rgb(200, 200, 200)),
            ..CellBorders::none()
        });
        let table = TableSource::new(vec![Px::from_i32(100)])
            .with_row(RowSource::new().with_cell(top))
            .with_row(RowSource::new().with_cell(bottom));
        let laid = layout_table(&table, &geometry(), &fonts(), None);
        let top = &laid.cells()[0];
        let bottom = &laid.cells()[1];
        assert!(!top.borders().bottom.visible);
        assert_eq!(top.borders().bottom.width, Px::ZERO);
        assert!(bottom.borders().top.visible);
        assert_eq!(bottom.borders().top.width, Px::from_i32(4));
        assert_eq!(bottom.borders().top.color, Color::BLACK);
    }

    #[test]
    fn side_borders_stay_mirrored_after_resolution() {
        let left = ruled_cell().with_borders(CellBorders::uniform(BorderSpec::line(
            Px::from_i32(3),
            Color::BLACK,
        )));
        let right = ruled_cell().with_borders(CellBorders::uniform(BorderSpec::line(
            Px::from_i32(5),
            Color::rgb(80, 80, 80),
        )));
        let laid = layout_table(&two_cell_row(left, right), &geometry(), &fonts(), None);
        let left = &laid.cells()[0];
        let right = &laid.cells()[1];
        assert_eq!(left.borders().right.width, right.borders().left.width);
        assert_eq!(left.borders().right.color, right.borders().left.color);
    }
}
