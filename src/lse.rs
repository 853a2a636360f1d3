//! Direct solvers for assembled [`SparseSystem`]s.

use crate::{
  error::{Error, Result},
  sparse::SparseSystem,
};

use faer::solvers::SpSolver as _;

pub trait LinearSolver {
  fn solve(&self, system: &SparseSystem) -> Result<na::DVector<f64>>;
}

/// Largest residual accepted, relative to the largest right-hand side entry.
pub const RESIDUAL_TOLERANCE: f64 = 1e-6;

/// Rejects non-finite solutions and solutions that do not satisfy the system,
/// which is how a factorization of a singular matrix shows up.
fn check_solution(system: &SparseSystem, x: na::DVector<f64>) -> Result<na::DVector<f64>> {
  let nunknowns = x.len();
  if !x.iter().all(|v| v.is_finite()) {
    return Err(Error::SingularSystem { nunknowns });
  }
  let residual = system.residual(&x).amax();
  let scale = system.rhs().amax();
  if residual > RESIDUAL_TOLERANCE * scale {
    tracing::warn!("rejecting solution with residual {residual:.3e} for rhs of size {scale:.3e}");
    return Err(Error::SingularSystem { nunknowns });
  }
  Ok(x)
}

/// Sparse LU factorization from faer.
#[derive(Debug, Default, Clone, Copy)]
pub struct FaerLu;

impl LinearSolver for FaerLu {
  fn solve(&self, system: &SparseSystem) -> Result<na::DVector<f64>> {
    if system.nunknowns() == 0 {
      return Ok(na::DVector::zeros(0));
    }
    let lu = system
      .matrix()
      .to_faer_csc()?
      .sp_lu()
      .map_err(|err| Error::SolveFailure(format!("sparse LU factorization failed: {err:?}")))?;
    let b = faer::col::from_slice(system.rhs().as_slice());
    let x = na::DVector::from_vec(lu.solve(b).as_slice().to_vec());
    check_solution(system, x)
  }
}

/// Dense LU from nalgebra, for small systems and cross-checking.
#[derive(Debug, Default, Clone, Copy)]
pub struct DenseLu;

impl LinearSolver for DenseLu {
  fn solve(&self, system: &SparseSystem) -> Result<na::DVector<f64>> {
    let nunknowns = system.nunknowns();
    let x = system
      .matrix()
      .to_nalgebra_dense()
      .lu()
      .solve(system.rhs())
      .ok_or(Error::SingularSystem { nunknowns })?;
    check_solution(system, x)
  }
}
