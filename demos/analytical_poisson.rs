//! Direct solve against harmonic analytical solutions on a sequence of grids.

use poisson_cutcell::{
  analytical::AnalyticalPoissonSolver,
  config::DomainConfig,
  grid::{Transform, Vec2},
  io,
  util::algebraic_convergence_rate,
};

use std::f64::consts::PI;

fn main() {
  tracing_subscriber::fmt::init();

  // harmonic, so the right-hand side vanishes
  let solution = |p: Vec2| (PI * p.x).sin() * (PI * p.y).sinh() / PI.sinh();
  let initial = |_: Vec2| 0.0;

  println!("| grid | max error | rate |");
  let mut prev_error: Option<f64> = None;
  for k in 3..9 {
    let grid_size = 1 << k;
    let mut solver = AnalyticalPoissonSolver::new(Transform::unit(grid_size), [grid_size; 2]);
    let error = solver.solve(initial, solution).unwrap();
    let rate = prev_error.map(|prev| algebraic_convergence_rate(error, prev));
    match rate {
      Some(rate) => println!("| {grid_size:>4} | {error:.3e} | {rate:.2} |"),
      None => println!("| {grid_size:>4} | {error:.3e} |   -  |"),
    }
    prev_error = Some(error);
  }

  let domain_config = DomainConfig::from_env();
  let domain = domain_config.build().unwrap();
  let mut solver = AnalyticalPoissonSolver::with_domain(&domain);
  let error = solver.solve(initial, solution).unwrap();
  println!("embedded domain {}: max error {error:.3e}", domain_config.grid_size);

  std::fs::create_dir_all("out").unwrap();
  io::save_grid_to_file(solver.solution(), Some(domain.labels()), "out/analytical_solution.txt")
    .unwrap();
}
