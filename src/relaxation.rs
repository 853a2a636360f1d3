//! The smoother validation run: a delta source relaxed on an expanded domain
//! while the residual history is monitored.

use crate::{
  config::{DomainConfig, RelaxationConfig},
  convergence::ConvergenceMonitor,
  domain::{CellLabel, Domain, ExpandedDomain},
  error::Result,
  grid::{Cell, Grid, GRAIN_SIZE},
  norms::ResidualNorms,
  operators::{compute_poisson_residual, Stencil},
  smoother::Smoother,
};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;

/// Fills solvable cells with uniform values in `[0, 1)`.
///
/// Every chunk of [`GRAIN_SIZE`] cells draws from its own generator seeded
/// with `seed + chunk_index`, so the result is independent of scheduling.
pub fn random_initial_guess(solution: &mut Grid<f64>, labels: &Grid<CellLabel>, seed: u64) {
  assert!(solution.same_layout(labels));
  let labels = labels.data();
  solution
    .data_mut()
    .par_chunks_mut(GRAIN_SIZE)
    .enumerate()
    .for_each(|(ichunk, chunk)| {
      let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(ichunk as u64));
      let offset = ichunk * GRAIN_SIZE;
      for (k, value) in chunk.iter_mut().enumerate() {
        if labels[offset + k].is_solvable() {
          *value = rng.gen_range(0.0..1.0);
        }
      }
    });
}

/// Sets `amplitude` on the solvable cells of the 3x3 block centered at `center`.
pub fn place_delta(rhs: &mut Grid<f64>, labels: &Grid<CellLabel>, center: Cell, amplitude: f64) {
  for (di, dj) in itertools::iproduct!(-1isize..=1, -1isize..=1) {
    let Some(i) = center[0].checked_add_signed(di) else {
      continue;
    };
    let Some(j) = center[1].checked_add_signed(dj) else {
      continue;
    };
    if labels.get([i, j]).is_some_and(|l| l.is_solvable()) {
      rhs[[i, j]] = amplitude;
    }
  }
}

pub struct RelaxationProblem {
  expanded: ExpandedDomain,
  config: RelaxationConfig,
  rhs: Grid<f64>,
  solution: Grid<f64>,
  residual: Grid<f64>,
  boundary_cells: Vec<Cell>,
}

impl RelaxationProblem {
  pub fn new(domain_config: &DomainConfig, config: RelaxationConfig) -> Result<Self> {
    let domain = domain_config.build()?;
    Ok(Self::from_domain(&domain, config))
  }

  pub fn from_domain(domain: &Domain, config: RelaxationConfig) -> Self {
    let expanded = domain.expand();
    let labels = expanded.domain.labels();
    let xform = *labels.transform();
    let size = labels.size();

    let mut rhs = Grid::new(xform, size, 0.0);
    let mut solution = Grid::new(xform, size, 0.0);
    let residual = Grid::new(xform, size, 0.0);

    if config.random_guess {
      random_initial_guess(&mut solution, labels, config.seed);
    }

    let [ox, oy] = expanded.exterior_offset;
    let base = domain.size();
    let delta_point = [
      (config.delta_percent * base[0] as f64) as usize + ox,
      (config.delta_percent * base[1] as f64) as usize + oy,
    ];
    place_delta(&mut rhs, labels, delta_point, config.delta_amplitude);
    if !labels.get(delta_point).is_some_and(|l| l.is_solvable()) {
      tracing::warn!("delta source at {delta_point:?} is not centered on a solvable cell");
    }

    let boundary_cells = expanded.domain.boundary_cells(config.boundary_width);
    tracing::info!(
      "relaxation on {:?} cells ({} levels), {} boundary cells",
      size,
      expanded.mg_levels,
      boundary_cells.len()
    );

    Self {
      expanded,
      config,
      rhs,
      solution,
      residual,
      boundary_cells,
    }
  }

  pub fn expanded(&self) -> &ExpandedDomain {
    &self.expanded
  }
  pub fn domain(&self) -> &Domain {
    &self.expanded.domain
  }
  pub fn config(&self) -> &RelaxationConfig {
    &self.config
  }
  pub fn rhs(&self) -> &Grid<f64> {
    &self.rhs
  }
  pub fn solution(&self) -> &Grid<f64> {
    &self.solution
  }
  pub fn residual(&self) -> &Grid<f64> {
    &self.residual
  }
  pub fn boundary_cells(&self) -> &[Cell] {
    &self.boundary_cells
  }

  /// Recomputes the residual of the current iterate and returns its norms.
  pub fn residual_norms(&mut self) -> Result<ResidualNorms> {
    let stencil = Stencil::from_domain(&self.expanded.domain);
    compute_poisson_residual(&mut self.residual, &self.solution, &self.rhs, &stencil)?;
    Ok(ResidualNorms::compute(&self.residual, stencil.labels()))
  }

  /// Runs the configured number of boundary, full, boundary iterations.
  pub fn run(&mut self) -> Result<ConvergenceMonitor> {
    let mut monitor = ConvergenceMonitor::with_initial(self.residual_norms()?);
    let mut smoother = Smoother::new();
    for _ in 0..self.config.max_iterations {
      let stencil = Stencil::from_domain(&self.expanded.domain);
      smoother.iterate(&mut self.solution, &self.rhs, &stencil, &self.boundary_cells)?;
      monitor.record(self.residual_norms()?);
    }

    if let Some(last) = monitor.last() {
      tracing::info!(
        "after {} iterations: L-infinity {:.6e}, L2 {:.6e}, {} regressions, {:.1}% non-increasing",
        self.config.max_iterations,
        last.norms.l_infinity,
        last.norms.l2(),
        monitor.nregressions(),
        100.0 * monitor.non_increasing_fraction(self.config.transient)
      );
    }
    Ok(monitor)
  }
}

#[cfg(test)]
mod test {
  use super::{place_delta, random_initial_guess};
  use crate::{
    domain::{build_complex_domain, CellLabel},
    grid::{Grid, Transform},
  };

  #[test]
  fn random_guess_is_reproducible() {
    let domain = build_complex_domain(48, true).unwrap();
    let labels = domain.labels();
    let mut a = Grid::new(*labels.transform(), labels.size(), 0.0);
    let mut b = a.clone();
    random_initial_guess(&mut a, labels, 3);
    random_initial_guess(&mut b, labels, 3);
    assert_eq!(a, b);
    for cell in labels.cells() {
      let v = a[cell];
      if labels[cell].is_solvable() {
        assert!((0.0..1.0).contains(&v));
      } else {
        assert_eq!(v, 0.0);
      }
    }
    random_initial_guess(&mut b, labels, 4);
    assert_ne!(a, b);
  }

  #[test]
  fn delta_skips_non_solvable_cells() {
    let xform = Transform::unit(4);
    let labels = Grid::from_par_fn(xform, [4, 4], |c| {
      if c[0] == 0 {
        CellLabel::Dirichlet
      } else {
        CellLabel::Interior
      }
    });
    let mut rhs = Grid::new(xform, [4, 4], 0.0);
    place_delta(&mut rhs, &labels, [0, 0], 5.0);
    let total: f64 = rhs.data().iter().sum();
    assert_eq!(total, 10.0);
    assert_eq!(rhs[[1, 1]], 5.0);
    assert_eq!(rhs[[0, 1]], 0.0);
  }
}
