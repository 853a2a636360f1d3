//! Norms of grid values restricted to solvable cells.

use crate::{domain::CellLabel, grid::Grid, grid::GRAIN_SIZE};

use rayon::prelude::*;

fn solvable_values<'a>(
  values: &'a Grid<f64>,
  labels: &'a Grid<CellLabel>,
) -> impl ParallelIterator<Item = f64> + 'a {
  assert_eq!(values.size(), labels.size());
  values
    .data()
    .par_iter()
    .zip(labels.data().par_iter())
    .with_min_len(GRAIN_SIZE)
    .filter(|(_, l)| l.is_solvable())
    .map(|(&v, _)| v)
}

/// Maximum absolute value over solvable cells, zero if there are none.
pub fn l_infinity_norm(values: &Grid<f64>, labels: &Grid<CellLabel>) -> f64 {
  solvable_values(values, labels)
    .map(f64::abs)
    .reduce(|| 0.0, f64::max)
}

/// Sum of squares over solvable cells, not normalized by the cell count.
pub fn squared_l2_norm(values: &Grid<f64>, labels: &Grid<CellLabel>) -> f64 {
  solvable_values(values, labels).map(|v| v * v).sum()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResidualNorms {
  pub l_infinity: f64,
  pub squared_l2: f64,
}

impl ResidualNorms {
  pub fn compute(residual: &Grid<f64>, labels: &Grid<CellLabel>) -> Self {
    Self {
      l_infinity: l_infinity_norm(residual, labels),
      squared_l2: squared_l2_norm(residual, labels),
    }
  }
  pub fn l2(&self) -> f64 {
    self.squared_l2.sqrt()
  }
}
