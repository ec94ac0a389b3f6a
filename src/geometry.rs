use crate::error::GalleyError;
use crate::types::{Margins, Px, Size};

/// Document-grid mode for a section. An East-Asian word-processor convention:
/// text may snap to a fixed character/line lattice instead of flowing freely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GridType {
    None,
    Lines,
    LinesAndChars,
    SnapToChars,
}

/// Per-section page setup: extent, margins, and the character/line pitch of
/// the document grid. Immutable once a section's layout begins.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub size: Size,
    pub margins: Margins,
    pub char_pitch: Px,
    pub line_pitch: Px,
    pub grid: GridType,
}

impl PageGeometry {
    pub fn new(size: Size, margins: Margins) -> Self {
        Self {
            size,
            margins,
            char_pitch: Px::ZERO,
            line_pitch: Px::ZERO,
            grid: GridType::None,
        }
    }

    pub fn a4() -> Self {
        Self::new(Size::a4(), Margins::all(Px::from_pt(72.0)))
    }

    pub fn with_grid(mut self, grid: GridType, char_pitch: Px, line_pitch: Px) -> Self {
        self.grid = grid;
        self.char_pitch = char_pitch;
        self.line_pitch = line_pitch;
        self
    }

    pub fn content_width(&self) -> Px {
        (self.size.width - self.margins.left - self.margins.right).max(Px::ZERO)
    }

    pub fn content_height(&self) -> Px {
        (self.size.height - self.margins.top - self.margins.bottom).max(Px::ZERO)
    }

    pub(crate) fn char_grid_active(&self) -> bool {
        matches!(self.grid, GridType::LinesAndChars | GridType::SnapToChars)
            && self.char_pitch > Px::ZERO
    }

    pub(crate) fn line_grid_active(&self) -> bool {
        self.grid != GridType::None && self.line_pitch > Px::ZERO
    }

    pub(crate) fn validate(&self) -> Result<(), GalleyError> {
        if self.size.width <= Px::ZERO || self.size.height <= Px::ZERO {
            return Err(GalleyError::InvalidGeometry(format!(
                "page extent {}x{} is empty",
                self.size.width.to_f32(),
                self.size.height.to_f32()
            )));
        }
        if self.content_width() <= Px::ZERO || self.content_height() <= Px::ZERO {
            return Err(GalleyError::InvalidGeometry(
                "margins leave no content area".to_string(),
            ));
        }
        Ok(())
    }
}
