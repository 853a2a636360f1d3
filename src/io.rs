use crate::{domain::CellLabel, error::Result, grid::Grid};

use std::{fs::File, io::BufWriter, path::Path};

/// Writes one `x y value` line per cell center, optionally only for solvable cells.
pub fn save_grid_to_file(
  grid: &Grid<f64>,
  labels: Option<&Grid<CellLabel>>,
  path: impl AsRef<Path>,
) -> Result<()> {
  let file = File::create(path)?;
  let writer = BufWriter::new(file);
  write_grid(writer, grid, labels)
}

pub fn write_grid<W: std::io::Write>(
  mut writer: W,
  grid: &Grid<f64>,
  labels: Option<&Grid<CellLabel>>,
) -> Result<()> {
  if let Some(labels) = labels {
    assert_eq!(labels.size(), grid.size());
  }
  for cell in grid.cells() {
    if labels.is_some_and(|l| !l[cell].is_solvable()) {
      continue;
    }
    let pos = grid.cell_center(cell);
    writeln!(writer, "{:.6} {:.6} {:.6e}", pos.x, pos.y, grid[cell])?;
  }
  writer.flush()?;
  Ok(())
}
