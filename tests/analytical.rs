extern crate nalgebra as na;

use poisson_cutcell::{
  analytical::AnalyticalPoissonSolver,
  domain::{
    build_complex_domain, build_simple_domain, CellLabel, Difference, Disk, Domain, DomainBuilder,
    Rect, Union,
  },
  grid::{Direction, FaceGrid, Grid, Transform, Vec2},
  lse::{DenseLu, LinearSolver},
  sparse::SparseSystem,
  Error, Result,
};

use approx::assert_abs_diff_eq;

#[test]
fn recovers_linear_solution_on_unit_spacing() {
  let transform = Transform::new(1.0, Vec2::zeros());
  let mut solver = AnalyticalPoissonSolver::new(transform, [4, 4]);
  let solution = |p: Vec2| p.x + p.y;
  let error = solver.solve(|_| 0.0, solution).unwrap();
  assert!(error < 1e-10, "error {error}");

  let grid = solver.solution();
  for cell in grid.cells() {
    let expected = cell[0] as f64 + cell[1] as f64 + 1.0;
    assert_abs_diff_eq!(grid[cell], expected, epsilon = 1e-10);
  }
}

#[test]
fn linear_solution_is_exact_on_any_resolution() {
  for grid_size in [3, 8, 17, 64, 128] {
    let mut solver = AnalyticalPoissonSolver::new(Transform::unit(grid_size), [grid_size; 2]);
    let error = solver.solve(|_| 0.0, |p: Vec2| p.x).unwrap();
    assert!(error < 1e-8, "grid {grid_size}: error {error}");
  }
}

#[test]
fn rectangular_grid_with_offset_origin() {
  let transform = Transform::new(0.1, Vec2::new(-1.0, 2.0));
  let mut solver = AnalyticalPoissonSolver::new(transform, [12, 5]);
  let error = solver.solve(|_| 0.0, |p: Vec2| 3.0 * p.x - p.y).unwrap();
  assert!(error < 1e-8, "error {error}");
}

#[test]
fn quadratic_solution_with_consistent_source() {
  // -laplace(x^2 + y^2) = -4
  let solution = |p: Vec2| p.x * p.x + p.y * p.y;
  let mut solver = AnalyticalPoissonSolver::new(Transform::unit(32), [32, 32]);
  let error = solver.solve(|_| -4.0, solution).unwrap();
  assert!(error < 1e-8, "error {error}");
}

#[test]
fn domain_with_dirichlet_cells() {
  let solution = |p: Vec2| 2.0 * p.x - 0.5 * p.y + 1.0;

  let domain = build_simple_domain(32, 2).unwrap();
  let mut solver = AnalyticalPoissonSolver::with_domain(&domain);
  let error = solver.solve(|_| 0.0, solution).unwrap();
  assert!(error < 1e-8, "simple domain error {error}");

  let domain = build_complex_domain(48, false).unwrap();
  let mut solver = AnalyticalPoissonSolver::with_domain(&domain);
  let error = solver.solve(|_| 0.0, solution).unwrap();
  assert!(error < 1e-8, "complex domain error {error}");
}

#[test]
fn cut_faces_stay_within_boundary_data() {
  // Dirichlet data lies in [-0.16, 0.16] on the fluid disk of radius 0.4
  let solution = |p: Vec2| (p.x - 0.5) * (p.y - 0.5);
  for grid_size in [32, 64] {
    let domain = build_complex_domain(grid_size, true).unwrap();
    let mut solver = AnalyticalPoissonSolver::with_domain(&domain);
    let error = solver.solve(|_| 0.0, solution).unwrap();
    assert!(error.is_finite() && error < 0.32, "grid {grid_size}: error {error}");
    let labels = domain.labels();
    for cell in labels.cells().filter(|&c| labels[c].is_solvable()) {
      let value = solver.solution()[cell];
      assert!(value.abs() <= 0.16 + 1e-9, "grid {grid_size}: {cell:?} = {value}");
    }
  }
}

#[test]
fn annular_obstacle_in_channel_solves() {
  let solution = |p: Vec2| p.x;
  for grid_size in [50, 64, 80, 100] {
    let channel = Union(
      Rect::new_horizontal_band(0.3, 0.7),
      Disk::new(Vec2::new(0.5, 0.5), 0.35),
    );
    let obstacle = Difference(
      Disk::new(Vec2::new(0.5, 0.5), 0.12),
      Disk::new(Vec2::new(0.5, 0.5), 0.05),
    );
    let domain = DomainBuilder::new(grid_size)
      .fluid(channel)
      .solid(obstacle)
      .build()
      .unwrap();
    let labels = domain.labels();
    let center = grid_size / 2;
    assert_eq!(labels[[center, center]], CellLabel::Exterior);

    let mut solver = AnalyticalPoissonSolver::with_domain(&domain);
    let error = solver.solve(|_| 1.0, solution).unwrap();
    assert!(error.is_finite() && error < 1.0, "grid {grid_size}: error {error}");

    let error = solver.solve(|_| 0.0, solution).unwrap();
    assert!(error < 1.0, "grid {grid_size}: error {error}");
    for cell in labels.cells().filter(|&c| labels[c].is_solvable()) {
      let value = solver.solution()[cell];
      assert!((-1e-9..=1.0 + 1e-9).contains(&value), "grid {grid_size}: {cell:?} = {value}");
    }
  }
}

#[test]
fn pure_neumann_pocket_is_singular() {
  // two solvable cells joined by one open face, every other face closed
  let transform = Transform::unit(2);
  let labels = Grid::new(transform, [2, 1], CellLabel::Boundary);
  let mut weights = FaceGrid::new(transform, [2, 1], 0.0);
  *weights.face_mut([0, 0], Direction::Right) = 1.0;
  let domain = Domain::new(labels, weights).unwrap();

  let sparse = AnalyticalPoissonSolver::with_domain(&domain).solve(|_| 1.0, |p: Vec2| p.x);
  let dense = AnalyticalPoissonSolver::with_domain(&domain)
    .with_solver(DenseLu)
    .solve(|_| 1.0, |p: Vec2| p.x);
  for result in [sparse, dense] {
    assert!(
      matches!(
        result,
        Err(Error::SingularSystem { .. } | Error::SolveFailure(_))
      ),
      "{result:?}"
    );
  }
}

#[test]
fn backends_give_same_error() {
  let domain = build_complex_domain(24, true).unwrap();
  let solution = |p: Vec2| (3.0 * p.x).sin() * (3.0 * p.y).sinh();
  let sparse = AnalyticalPoissonSolver::with_domain(&domain)
    .solve(|_| 0.0, solution)
    .unwrap();
  let dense = AnalyticalPoissonSolver::with_domain(&domain)
    .with_solver(DenseLu)
    .solve(|_| 0.0, solution)
    .unwrap();
  assert_abs_diff_eq!(sparse, dense, epsilon = 1e-9);
}

struct FailingSolver;
impl LinearSolver for FailingSolver {
  fn solve(&self, _system: &SparseSystem) -> Result<na::DVector<f64>> {
    Err(Error::SolveFailure("no factorization".to_string()))
  }
}

#[test]
fn failed_solve_is_an_error() {
  let mut solver =
    AnalyticalPoissonSolver::new(Transform::unit(4), [4, 4]).with_solver(FailingSolver);
  let result = solver.solve(|_| 0.0, |p: Vec2| p.x);
  assert!(matches!(result, Err(Error::SolveFailure(_))));
}
