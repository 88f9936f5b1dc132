use globewatch_core::Severity;

pub const MARKER_PIXEL_SIZE: u32 = 64;
pub const MARKER_PADDING: u32 = 2;
pub const MARKER_CELL_STRIDE: u32 = MARKER_PIXEL_SIZE + MARKER_PADDING * 2;

/// Atlas rows, top to bottom.
pub const SEVERITY_ROWS: [Severity; 4] = [
    Severity::Critical,
    Severity::High,
    Severity::Medium,
    Severity::Low,
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MarkerStyle {
    Normal,
    Selected,
}

impl MarkerStyle {
    pub const ALL: [MarkerStyle; 2] = [MarkerStyle::Normal, MarkerStyle::Selected];

    pub fn column(self) -> u32 {
        match self {
            MarkerStyle::Normal => 0,
            MarkerStyle::Selected => 1,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CellPosition {
    pub column: u32,
    pub row: u32,
}

pub fn severity_row(severity: Severity) -> u32 {
    SEVERITY_ROWS
        .iter()
        .position(|&candidate| candidate == severity)
        .map(|idx| idx as u32)
        .unwrap_or_default()
}

pub const fn grid_size() -> (u32, u32) {
    (MarkerStyle::ALL.len() as u32, SEVERITY_ROWS.len() as u32)
}

pub const fn atlas_pixel_size() -> (u32, u32) {
    let (columns, rows) = grid_size();
    (columns * MARKER_CELL_STRIDE, rows * MARKER_CELL_STRIDE)
}

pub fn marker_cell(severity: Severity, style: MarkerStyle) -> CellPosition {
    CellPosition {
        column: style.column(),
        row: severity_row(severity),
    }
}

/// Top-left pixel of the cell including its padding.
pub fn cell_origin(cell: CellPosition) -> (u32, u32) {
    (cell.column * MARKER_CELL_STRIDE, cell.row * MARKER_CELL_STRIDE)
}

/// Pixel rectangle `(x, y, size)` of the sprite inside its padded cell.
pub fn sprite_rect(severity: Severity, style: MarkerStyle) -> (u32, u32, u32) {
    let (x, y) = cell_origin(marker_cell(severity, style));
    (x + MARKER_PADDING, y + MARKER_PADDING, MARKER_PIXEL_SIZE)
}
