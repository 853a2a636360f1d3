//! Jacobi smoothing of a delta source on the configured domain.
//!
//! Configure with `POISSON_*` environment variables, e.g.
//! `POISSON_GRID_SIZE=128 POISSON_COMPLEX_DOMAIN=0 cargo run --release --example smoother`.

use poisson_cutcell::{
  config::{DomainConfig, RelaxationConfig},
  io,
  relaxation::RelaxationProblem,
};

fn main() {
  tracing_subscriber::fmt::init();

  let domain_config = DomainConfig::from_env();
  let relaxation_config = RelaxationConfig::from_env();
  println!("{domain_config:?}");
  println!("{relaxation_config:?}");

  let mut problem = RelaxationProblem::new(&domain_config, relaxation_config).unwrap();
  let monitor = problem.run().unwrap();

  let transient = problem.config().transient;
  println!(
    "non-increasing L-infinity pairs after {transient} iterations: {:.1}%",
    100.0 * monitor.non_increasing_fraction(transient)
  );
  if let Some(rate) = monitor.mean_convergence_rate() {
    println!("mean convergence rate: {rate:.4} bits/iteration");
  }

  std::fs::create_dir_all("out").unwrap();
  let labels = problem.domain().labels();
  io::save_grid_to_file(problem.solution(), Some(labels), "out/smoother_solution.txt").unwrap();
  io::save_grid_to_file(problem.residual(), Some(labels), "out/smoother_residual.txt").unwrap();
}
