//! Jacobi relaxation over the weighted Poisson stencil.
//!
//! Every sweep reads neighbour values from the iterate as it was before the
//! sweep: the full pass writes into a scratch grid that is swapped in, the
//! boundary pass evaluates all updates before writing any of them.

use crate::{
  error::{Error, Result},
  grid::{Cell, Grid, GRAIN_SIZE},
  operators::Stencil,
};

use rayon::prelude::*;

#[derive(Debug, Default)]
pub struct Smoother {
  scratch: Option<Grid<f64>>,
  updates: Vec<f64>,
}

impl Smoother {
  pub fn new() -> Self {
    Self::default()
  }

  /// One Jacobi sweep over all solvable cells.
  pub fn interior_jacobi(
    &mut self,
    solution: &mut Grid<f64>,
    rhs: &Grid<f64>,
    stencil: &Stencil,
  ) -> Result<()> {
    check_sizes(solution, rhs, stencil)?;
    let labels = stencil.labels();
    let nx = labels.nx();

    let mut scratch = match self.scratch.take() {
      Some(scratch) if scratch.same_layout(solution) => scratch,
      _ => solution.clone(),
    };
    {
      let current = &*solution;
      scratch
        .data_mut()
        .par_chunks_mut(nx)
        .with_min_len(GRAIN_SIZE / nx + 1)
        .enumerate()
        .for_each(|(j, row)| {
          for (i, value) in row.iter_mut().enumerate() {
            let cell = [i, j];
            *value = if labels[cell].is_solvable() {
              stencil.jacobi_value(current, rhs, cell)
            } else {
              current[cell]
            };
          }
        });
    }
    std::mem::swap(solution, &mut scratch);
    self.scratch = Some(scratch);
    Ok(())
  }

  /// One Jacobi sweep restricted to `cells`, which must be solvable.
  pub fn boundary_jacobi(
    &mut self,
    solution: &mut Grid<f64>,
    rhs: &Grid<f64>,
    stencil: &Stencil,
    cells: &[Cell],
  ) -> Result<()> {
    check_sizes(solution, rhs, stencil)?;
    debug_assert!(cells.iter().all(|&c| stencil.labels()[c].is_solvable()));

    self.updates.clear();
    let current = &*solution;
    self.updates.par_extend(
      cells
        .par_iter()
        .with_min_len(GRAIN_SIZE)
        .map(|&cell| stencil.jacobi_value(current, rhs, cell)),
    );
    for (&cell, &value) in cells.iter().zip(&self.updates) {
      solution[cell] = value;
    }
    Ok(())
  }

  /// Boundary sweep, full sweep, boundary sweep.
  pub fn iterate(
    &mut self,
    solution: &mut Grid<f64>,
    rhs: &Grid<f64>,
    stencil: &Stencil,
    boundary_cells: &[Cell],
  ) -> Result<()> {
    self.boundary_jacobi(solution, rhs, stencil, boundary_cells)?;
    self.interior_jacobi(solution, rhs, stencil)?;
    self.boundary_jacobi(solution, rhs, stencil, boundary_cells)
  }
}

fn check_sizes(solution: &Grid<f64>, rhs: &Grid<f64>, stencil: &Stencil) -> Result<()> {
  let size = stencil.labels().size();
  Error::check_size(size, solution.size())?;
  Error::check_size(size, rhs.size())
}
