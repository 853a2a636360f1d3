//! Direct solve of the discrete Poisson problem against a known solution.
//!
//! One equation is assembled per solvable cell. Dirichlet cells and ghost
//! cells outside the grid take their value from the analytical solution, so
//! the discretization error can be measured in isolation.

use crate::{
  domain::{CellLabel, Domain},
  error::Result,
  grid::{FaceGrid, Grid, Transform, Vec2},
  indexing::SolvableIndexMap,
  lse::{FaerLu, LinearSolver},
  operators::{NeighborKind, Stencil},
  sparse::SparseSystem,
};

use rayon::prelude::*;

pub struct AnalyticalPoissonSolver {
  labels: Grid<CellLabel>,
  weights: Option<FaceGrid<f64>>,
  solution: Grid<f64>,
  solver: Box<dyn LinearSolver + Send + Sync>,
}

struct Row {
  entries: Vec<(usize, f64)>,
  rhs: f64,
}

// constructors
impl AnalyticalPoissonSolver {
  /// Every cell of the grid is an unknown and all faces are open.
  pub fn new(transform: Transform, size: [usize; 2]) -> Self {
    let labels = Grid::new(transform, size, CellLabel::Interior);
    Self::from_parts(labels, None)
  }

  pub fn with_domain(domain: &Domain) -> Self {
    Self::from_parts(domain.labels().clone(), Some(domain.weights().clone()))
  }

  fn from_parts(labels: Grid<CellLabel>, weights: Option<FaceGrid<f64>>) -> Self {
    let solution = Grid::new(*labels.transform(), labels.size(), 0.0);
    Self {
      labels,
      weights,
      solution,
      solver: Box::new(FaerLu),
    }
  }

  pub fn with_solver(mut self, solver: impl LinearSolver + Send + Sync + 'static) -> Self {
    self.solver = Box::new(solver);
    self
  }
}

impl AnalyticalPoissonSolver {
  pub fn labels(&self) -> &Grid<CellLabel> {
    &self.labels
  }
  /// Values of the last solve. Dirichlet cells hold the analytical solution.
  pub fn solution(&self) -> &Grid<f64> {
    &self.solution
  }

  fn stencil(&self) -> Stencil<'_> {
    Stencil::new(&self.labels, self.weights.as_ref())
  }

  /// Assembles `A u = f` for `f = initial` with boundary values from `solution`.
  pub fn assemble<I, S>(&self, index_map: &SolvableIndexMap, initial: I, solution: S) -> SparseSystem
  where
    I: Fn(Vec2) -> f64 + Sync,
    S: Fn(Vec2) -> f64 + Sync,
  {
    let stencil = self.stencil();
    let transform = *self.labels.transform();
    let inv_dx2 = stencil.inv_dx2();

    let rows: Vec<Row> = index_map
      .cells()
      .par_iter()
      .enumerate()
      .map(|(irow, &cell)| {
        let mut entries = Vec::with_capacity(5);
        let mut rhs = initial(transform.cell_center(cell));
        let mut diag = 0.0;
        for neighbor in stencil.neighbors(cell) {
          let coeff = neighbor.weight * inv_dx2;
          match neighbor.kind {
            NeighborKind::Solvable(n) => {
              if let Some(col) = index_map.unknown(n) {
                entries.push((col, -coeff));
              }
              diag += coeff;
            }
            NeighborKind::Dirichlet(n) => {
              rhs += coeff * solution(transform.cell_center(n));
              diag += coeff;
            }
            NeighborKind::Ghost => {
              rhs += coeff * solution(transform.neighbor_center(cell, neighbor.dir));
              diag += coeff;
            }
            NeighborKind::Exterior => {}
          }
        }
        if diag == 0.0 {
          diag = 1.0;
        }
        entries.push((irow, diag));
        Row { entries, rhs }
      })
      .collect();

    let nunknowns = index_map.nunknowns();
    let mut system = SparseSystem::new(nunknowns, 5 * nunknowns);
    for (irow, row) in rows.into_iter().enumerate() {
      for (col, coeff) in row.entries {
        system.add_coefficient(irow, col, coeff);
      }
      system.add_rhs(irow, row.rhs);
    }
    system
  }

  /// Solves with right-hand side `initial` and Dirichlet data `solution`,
  /// returning the largest deviation from `solution` over all unknowns.
  pub fn solve<I, S>(&mut self, initial: I, solution: S) -> Result<f64>
  where
    I: Fn(Vec2) -> f64 + Sync,
    S: Fn(Vec2) -> f64 + Sync,
  {
    let index_map = SolvableIndexMap::new(&self.labels);
    let system = self.assemble(&index_map, &initial, &solution);
    tracing::debug!(
      "assembled {} unknowns with {} nonzeros",
      system.nunknowns(),
      system.matrix().ntriplets()
    );

    let values = self.solver.solve(&system)?;

    let transform = *self.labels.transform();
    let max_error = index_map
      .cells()
      .iter()
      .zip(values.iter())
      .map(|(&cell, &value)| (value - solution(transform.cell_center(cell))).abs())
      .fold(0.0, f64::max);

    self.store_solution(&index_map, &values, &solution);
    tracing::info!(
      "solved {} unknowns, max error {:.3e}",
      index_map.nunknowns(),
      max_error
    );
    Ok(max_error)
  }

  fn store_solution<S>(&mut self, index_map: &SolvableIndexMap, values: &na::DVector<f64>, solution: &S)
  where
    S: Fn(Vec2) -> f64,
  {
    let labels = &self.labels;
    for cell in labels.cells() {
      self.solution[cell] = match (labels[cell], index_map.unknown(cell)) {
        (_, Some(unknown)) => values[unknown],
        (CellLabel::Dirichlet, None) => solution(labels.cell_center(cell)),
        _ => 0.0,
      };
    }
  }
}
