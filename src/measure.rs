use crate::font::{FontRegistry, wants_east_asian_font};
use crate::geometry::{GridType, PageGeometry};
use crate::model::{CharacterFormat, FontHint};
use crate::types::{Color, Px};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HorizontalAlignment {
    Left,
    Center,
    Right,
}

/// One measured glyph. Immutable after measurement except for the alignment
/// tag, which the owning line rewrites for distribute justification.
#[derive(Debug, Clone)]
pub struct CharBox {
    pub ch: char,
    pub font_name: String,
    pub font_size: Px,
    pub bold: bool,
    pub italic: bool,
    pub color: Color,
    pub width: Px,
    pub height: Px,
    pub alignment: HorizontalAlignment,
    pub snap_to_grid: bool,
}

impl CharBox {
    pub(crate) fn measure(
        ch: char,
        format: &CharacterFormat,
        base_font_size_pt: f32,
        geometry: &PageGeometry,
        fonts: &FontRegistry,
    ) -> CharBox {
        let family = select_family(ch, format);
        let font_name = fonts.resolve_variant(family, format.bold, format.italic);
        let font_size = Px::from_pt(format.size_pt);
        // A space's own advance is unreliable (often zero in shaped output);
        // measure a period in the same font instead.
        let probe = if ch == ' ' { '.' } else { ch };
        let measured = fonts.char_width(&font_name, font_size, probe);
        let height = fonts.line_height(&font_name, font_size);
        let width = snap_char_width(
            measured,
            format.snap_to_grid,
            geometry,
            format.size_pt,
            base_font_size_pt,
        );
        CharBox {
            ch,
            font_name,
            font_size,
            bold: format.bold,
            italic: format.italic,
            color: format.color,
            width,
            height,
            alignment: HorizontalAlignment::Left,
            snap_to_grid: format.snap_to_grid,
        }
    }
}

/// Grid width rule. Under `LinesAndChars` a character occupies one grid cell,
/// widened by the amount its font size exceeds the paragraph's base size.
/// Under `SnapToChars` the measured width rounds up to whole cells with a
/// floor of one cell.
pub(crate) fn snap_char_width(
    measured: Px,
    snap_to_grid: bool,
    geometry: &PageGeometry,
    font_size_pt: f32,
    base_font_size_pt: f32,
) -> Px {
    if !snap_to_grid || !geometry.char_grid_active() {
        return measured;
    }
    match geometry.grid {
        GridType::LinesAndChars => {
            geometry.char_pitch + Px::from_pt(font_size_pt - base_font_size_pt)
        }
        GridType::SnapToChars => measured
            .ceil_to_multiple(geometry.char_pitch)
            .max(geometry.char_pitch),
        _ => measured,
    }
}

fn select_family<'a>(ch: char, format: &'a CharacterFormat) -> &'a str {
    let east_asian = wants_east_asian_font(ch, format.hint == FontHint::EastAsia);
    if east_asian {
        if format.east_asian_font.is_empty() {
            &format.ascii_font
        } else {
            &format.east_asian_font
        }
    } else if format.ascii_font.is_empty() {
        &format.east_asian_font
    } else {
        &format.ascii_font
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Margins, Size};

    fn snap_to_chars_geometry(pitch: i32) -> PageGeometry {
        PageGeometry::new(
            Size::new(Px::from_i32(600), Px::from_i32(800)),
            Margins::zero(),
        )
        .with_grid(GridType::SnapToChars, Px::from_i32(pitch), Px::from_i32(16))
    }

    #[test]
    fn snap_to_chars_rounds_up_to_pitch() {
        let geometry = snap_to_chars_geometry(20);
        assert_eq!(
            snap_char_width(Px::from_i32(15), true, &geometry, 12.0, 12.0),
            Px::from_i32(20)
        );
        assert_eq!(
            snap_char_width(Px::from_i32(45), true, &geometry, 12.0, 12.0),
            Px::from_i32(60)
        );
    }

    #[test]
    fn snap_to_chars_floors_at_one_pitch() {
        let geometry = snap_to_chars_geometry(20);
        assert_eq!(
            snap_char_width(Px::ZERO, true, &geometry, 12.0, 12.0),
            Px::from_i32(20)
        );
    }

    #[test]
    fn lines_and_chars_widens_oversized_characters() {
        let geometry = PageGeometry::new(
            Size::new(Px::from_i32(600), Px::from_i32(800)),
            Margins::zero(),
        )
        .with_grid(GridType::LinesAndChars, Px::from_i32(20), Px::from_i32(16));
        // 18pt character in a 12pt paragraph widens its cell by 8px.
        assert_eq!(
            snap_char_width(Px::from_i32(10), true, &geometry, 18.0, 12.0),
            Px::from_i32(28)
        );
        // Base-size characters occupy exactly one cell.
        assert_eq!(
            snap_char_width(Px::from_i32(10), true, &geometry, 12.0, 12.0),
            Px::from_i32(20)
        );
    }

    #[test]
    fn unsnapped_characters_keep_measured_width() {
        let geometry = snap_to_chars_geometry(20);
        assert_eq!(
            snap_char_width(Px::from_i32(15), false, &geometry, 12.0, 12.0),
            Px::from_i32(15)
        );
        let no_grid = PageGeometry::new(
            Size::new(Px::from_i32(600), Px::from_i32(800)),
            Margins::zero(),
        );
        assert_eq!(
            snap_char_width(Px::from_i32(15), true, &no_grid, 12.0, 12.0),
            Px::from_i32(15)
        );
    }

    #[test]
    fn space_measures_as_period() {
        let fonts = FontRegistry::new();
        let geometry = PageGeometry::new(
            Size::new(Px::from_i32(600), Px::from_i32(800)),
            Margins::zero(),
        );
        let format = CharacterFormat::default();
        let space = CharBox::measure(' ', &format, 12.0, &geometry, &fonts);
        let period = CharBox::measure('.', &format, 12.0, &geometry, &fonts);
        assert_eq!(space.width, period.width);
        assert_eq!(space.ch, ' ');
    }

    #[test]
    fn east_asian_characters_use_east_asian_font() {
        let fonts = FontRegistry::new();
        let geometry = PageGeometry::new(
            Size::new(Px::from_i32(600), Px::from_i32(800)),
            Margins::zero(),
        );
        let format = CharacterFormat::default().with_fonts("Latin Face", "CJK Face");
        let latin = CharBox::measure('a', &format, 12.0, &geometry, &fonts);
        let han = CharBox::measure('中', &format, 12.0, &geometry, &fonts);
        assert_eq!(latin.font_name, "Latin Face");
        assert_eq!(han.font_name, "CJK Face");

        let hinted = format.clone().with_hint(FontHint::EastAsia);
        let accented = CharBox::measure('é', &hinted, 12.0, &geometry, &fonts);
        assert_eq!(accented.font_name, "CJK Face");
    }
}
