//! Poisson equation on two-dimensional grids with embedded boundaries.
//!
//! Domains are built from implicit shapes into cell labels and fractional
//! face weights. The same weighted five-point stencil drives a Jacobi
//! smoother, the residual evaluation and a sparse direct solve against an
//! analytical solution.

extern crate nalgebra as na;
extern crate nalgebra_sparse as nas;

pub mod analytical;
pub mod config;
pub mod convergence;
pub mod domain;
pub mod error;
pub mod grid;
pub mod indexing;
pub mod io;
pub mod lse;
pub mod norms;
pub mod operators;
pub mod relaxation;
pub mod smoother;
pub mod sparse;
pub mod util;

pub use error::{Error, Result};
