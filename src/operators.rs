//! The weighted five-point Poisson stencil and the residual built on it.
//!
//! The operator is `(A u)_c = sum_k w_k (u_c - u_k) / h^2`, the negative
//! discrete Laplacian, and the residual is `r = f - A u`.

use crate::{
  domain::{CellLabel, Domain},
  error::{Error, Result},
  grid::{Cell, Direction, FaceGrid, Grid, GRAIN_SIZE},
};

use rayon::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NeighborKind {
  /// An unknown of the system.
  Solvable(Cell),
  /// An in-grid cell with a prescribed value.
  Dirichlet(Cell),
  /// Contributes nothing.
  Exterior,
  /// Outside the grid array; treated as a prescribed value.
  Ghost,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StencilNeighbor {
  pub dir: Direction,
  pub kind: NeighborKind,
  pub weight: f64,
}

/// Labels and optional face weights of a discretization.
///
/// Without face weights every in-grid non-exterior neighbour and every ghost
/// has weight one.
#[derive(Debug, Clone, Copy)]
pub struct Stencil<'a> {
  labels: &'a Grid<CellLabel>,
  weights: Option<&'a FaceGrid<f64>>,
}

impl<'a> Stencil<'a> {
  pub fn new(labels: &'a Grid<CellLabel>, weights: Option<&'a FaceGrid<f64>>) -> Self {
    if let Some(weights) = weights {
      assert_eq!(labels.size(), weights.cell_size());
    }
    Self { labels, weights }
  }
  pub fn from_domain(domain: &'a Domain) -> Self {
    Self::new(domain.labels(), Some(domain.weights()))
  }

  pub fn labels(&self) -> &'a Grid<CellLabel> {
    self.labels
  }
  pub fn dx(&self) -> f64 {
    self.labels.dx()
  }
  pub fn inv_dx2(&self) -> f64 {
    self.labels.dx().powi(-2)
  }

  pub fn neighbors(&self, cell: Cell) -> [StencilNeighbor; 4] {
    Direction::ALL.map(|dir| {
      let kind = match self.labels.neighbor(cell, dir) {
        None => NeighborKind::Ghost,
        Some(n) => match self.labels[n] {
          CellLabel::Exterior => NeighborKind::Exterior,
          CellLabel::Dirichlet => NeighborKind::Dirichlet(n),
          CellLabel::Interior | CellLabel::Boundary => NeighborKind::Solvable(n),
        },
      };
      let weight = match (kind, self.weights) {
        (NeighborKind::Exterior, _) => 0.0,
        (_, Some(weights)) => *weights.face(cell, dir),
        (_, None) => 1.0,
      };
      StencilNeighbor { dir, kind, weight }
    })
  }

  /// Value a neighbour contributes in the relaxation path: the stored value
  /// for in-grid cells, zero for ghosts.
  fn neighbor_value(u: &Grid<f64>, neighbor: &StencilNeighbor) -> f64 {
    match neighbor.kind {
      NeighborKind::Solvable(n) | NeighborKind::Dirichlet(n) => u[n],
      NeighborKind::Exterior | NeighborKind::Ghost => 0.0,
    }
  }

  /// `(A u)_c`
  pub fn apply(&self, u: &Grid<f64>, cell: Cell) -> f64 {
    let center = u[cell];
    let sum: f64 = self
      .neighbors(cell)
      .iter()
      .map(|n| n.weight * (center - Self::neighbor_value(u, n)))
      .sum();
    sum * self.inv_dx2()
  }

  /// Center value solving the stencil equation with neighbours held fixed.
  /// Cells without any open face keep their value.
  pub fn jacobi_value(&self, u: &Grid<f64>, rhs: &Grid<f64>, cell: Cell) -> f64 {
    let neighbors = self.neighbors(cell);
    let diag: f64 = neighbors.iter().map(|n| n.weight).sum();
    if diag == 0.0 {
      return u[cell];
    }
    let offdiag: f64 = neighbors
      .iter()
      .map(|n| n.weight * Self::neighbor_value(u, n))
      .sum();
    (rhs[cell] * self.dx().powi(2) + offdiag) / diag
  }
}

/// Writes `f - A u` into `residual` on solvable cells and zero elsewhere.
pub fn compute_poisson_residual(
  residual: &mut Grid<f64>,
  solution: &Grid<f64>,
  rhs: &Grid<f64>,
  stencil: &Stencil,
) -> Result<()> {
  let labels = stencil.labels();
  for grid in [&*residual, solution, rhs] {
    Error::check_size(labels.size(), grid.size())?;
  }
  let nx = labels.nx();
  residual
    .data_mut()
    .par_chunks_mut(nx)
    .with_min_len(GRAIN_SIZE / nx + 1)
    .enumerate()
    .for_each(|(j, row)| {
      for (i, r) in row.iter_mut().enumerate() {
        let cell = [i, j];
        *r = if labels[cell].is_solvable() {
          rhs[cell] - stencil.apply(solution, cell)
        } else {
          0.0
        };
      }
    });
  Ok(())
}

#[cfg(test)]
mod test {
  use super::{compute_poisson_residual, NeighborKind, Stencil};
  use crate::{
    domain::{build_complex_domain, CellLabel},
    grid::{Grid, Transform},
  };

  use approx::assert_relative_eq;

  #[test]
  fn unweighted_stencil_is_five_point_laplacian() {
    let xform = Transform::unit(8);
    let labels = Grid::new(xform, [8, 8], CellLabel::Interior);
    let u = Grid::from_par_fn(xform, [8, 8], |c| ((c[0] * 7 + c[1] * 3) % 5) as f64);
    let stencil = Stencil::new(&labels, None);
    let h2 = xform.dx().powi(2);
    let c = [3, 4];
    let expected =
      (4.0 * u[c] - u[[2, 4]] - u[[4, 4]] - u[[3, 3]] - u[[3, 5]]) / h2;
    assert_relative_eq!(stencil.apply(&u, c), expected, max_relative = 1e-12);

    let corner = stencil.neighbors([0, 0]);
    assert_eq!(corner[0].kind, NeighborKind::Ghost);
    assert_eq!(corner[2].kind, NeighborKind::Ghost);
    assert!(corner.iter().all(|n| n.weight == 1.0));
  }

  #[test]
  fn jacobi_value_zeroes_residual() {
    let domain = build_complex_domain(32, true).unwrap();
    let stencil = Stencil::from_domain(&domain);
    let xform = *domain.transform();
    let u = Grid::from_par_fn(xform, domain.size(), |c| (c[0] as f64 * 0.3).sin() + c[1] as f64);
    let rhs = Grid::new(xform, domain.size(), 2.0);
    for cell in domain.labels().cells() {
      if !domain.labels()[cell].is_solvable() {
        continue;
      }
      let mut relaxed = u.clone();
      relaxed[cell] = stencil.jacobi_value(&u, &rhs, cell);
      let residual = rhs[cell] - stencil.apply(&relaxed, cell);
      assert!(residual.abs() < 1e-8 * stencil.inv_dx2(), "residual {residual} at {cell:?}");
    }
  }

  #[test]
  fn residual_ignores_non_solvable_cells() {
    let domain = build_complex_domain(16, false).unwrap();
    let stencil = Stencil::from_domain(&domain);
    let xform = *domain.transform();
    let solution = Grid::new(xform, domain.size(), 0.0);
    let rhs = Grid::from_par_fn(xform, domain.size(), |c| c[0] as f64);
    let mut residual = Grid::new(xform, domain.size(), f64::NAN);
    compute_poisson_residual(&mut residual, &solution, &rhs, &stencil).unwrap();
    for cell in domain.labels().cells() {
      let expected = if domain.labels()[cell].is_solvable() {
        rhs[cell]
      } else {
        0.0
      };
      assert_eq!(residual[cell], expected);
    }

    let mut wrong = Grid::new(Transform::unit(4), [4, 4], 0.0);
    assert!(compute_poisson_residual(&mut wrong, &solution, &rhs, &stencil).is_err());
  }
}
