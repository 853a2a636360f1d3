use crate::{
  domain::CellLabel,
  grid::{Cell, Grid},
};

/// Bijection between solvable cells and unknown indices.
///
/// Unknowns are numbered in flat (row-major) cell order, so the numbering is
/// deterministic for a given label grid.
#[derive(Debug, Clone)]
pub struct SolvableIndexMap {
  cell_to_unknown: Grid<Option<usize>>,
  unknown_to_cell: Vec<Cell>,
}

impl SolvableIndexMap {
  pub fn new(labels: &Grid<CellLabel>) -> Self {
    let mut unknown_to_cell = Vec::new();
    let mut cell_to_unknown = labels.map(|_| None);
    for cell in labels.cells() {
      if labels[cell].is_solvable() {
        cell_to_unknown[cell] = Some(unknown_to_cell.len());
        unknown_to_cell.push(cell);
      }
    }
    Self {
      cell_to_unknown,
      unknown_to_cell,
    }
  }

  pub fn nunknowns(&self) -> usize {
    self.unknown_to_cell.len()
  }

  /// Unknown index of `cell`, `None` for non-solvable or out-of-grid cells.
  pub fn unknown(&self, cell: Cell) -> Option<usize> {
    self.cell_to_unknown.get(cell).copied().flatten()
  }
  pub fn cell(&self, unknown: usize) -> Cell {
    self.unknown_to_cell[unknown]
  }
  pub fn cells(&self) -> &[Cell] {
    &self.unknown_to_cell
  }
}
