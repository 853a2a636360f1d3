//! Uniform cell grids with a world-space transform, and the staggered face
//! grids that carry one value per cell face.

use rayon::prelude::*;

use std::ops::{Index, IndexMut};

pub type Vec2 = na::Vector2<f64>;

/// Integer cell index `[i, j]`, `i` along x.
pub type Cell = [usize; 2];

/// Minimum number of cells handed to one rayon task for light per-cell work.
pub const GRAIN_SIZE: usize = 1000;

/// Maps index-space coordinates to world space: `origin + dx * index`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
  dx: f64,
  origin: Vec2,
}

impl Transform {
  pub fn new(dx: f64, origin: Vec2) -> Self {
    assert!(dx > 0.0 && dx.is_finite(), "cell spacing must be positive, got {dx}");
    Self { dx, origin }
  }

  /// Transform of a `grid_size`-cell discretization of the unit square.
  pub fn unit(grid_size: usize) -> Self {
    Self::new((grid_size as f64).recip(), Vec2::zeros())
  }

  pub fn dx(&self) -> f64 {
    self.dx
  }
  pub fn origin(&self) -> Vec2 {
    self.origin
  }

  pub fn index_to_world(&self, index: Vec2) -> Vec2 {
    self.origin + index * self.dx
  }
  pub fn world_to_index(&self, world: Vec2) -> Vec2 {
    (world - self.origin) / self.dx
  }

  pub fn cell_center(&self, cell: Cell) -> Vec2 {
    self.index_to_world(Vec2::new(cell[0] as f64 + 0.5, cell[1] as f64 + 0.5))
  }

  /// Center of the neighbour of `cell` in direction `dir`, which may lie outside any grid.
  pub fn neighbor_center(&self, cell: Cell, dir: Direction) -> Vec2 {
    let [di, dj] = dir.offset();
    self.index_to_world(Vec2::new(
      cell[0] as f64 + di as f64 + 0.5,
      cell[1] as f64 + dj as f64 + 0.5,
    ))
  }

  /// World-space end points of the segment of face `face` on the `axis` face grid.
  pub fn face_endpoints(&self, axis: Axis, face: Cell) -> (Vec2, Vec2) {
    let start = Vec2::new(face[0] as f64, face[1] as f64);
    let end = match axis {
      Axis::X => start + Vec2::new(0.0, 1.0),
      Axis::Y => start + Vec2::new(1.0, 0.0),
    };
    (self.index_to_world(start), self.index_to_world(end))
  }

  /// Transform of a grid padded by `offset` cells on the low side, such that
  /// cell `c + offset` of the padded grid sits where `c` sat before.
  pub fn padded(&self, offset: [usize; 2]) -> Self {
    let shift = Vec2::new(offset[0] as f64, offset[1] as f64) * self.dx;
    Self::new(self.dx, self.origin - shift)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
  X,
  Y,
}

/// The four grid-aligned neighbour directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
  Left,
  Right,
  Down,
  Up,
}

impl Direction {
  pub const ALL: [Direction; 4] = [Self::Left, Self::Right, Self::Down, Self::Up];

  pub fn offset(self) -> [isize; 2] {
    match self {
      Self::Left => [-1, 0],
      Self::Right => [1, 0],
      Self::Down => [0, -1],
      Self::Up => [0, 1],
    }
  }

  pub fn axis(self) -> Axis {
    match self {
      Self::Left | Self::Right => Axis::X,
      Self::Down | Self::Up => Axis::Y,
    }
  }

  pub fn opposite(self) -> Self {
    match self {
      Self::Left => Self::Right,
      Self::Right => Self::Left,
      Self::Down => Self::Up,
      Self::Up => Self::Down,
    }
  }

  /// Index of the face shared by `cell` and its neighbour in this direction,
  /// within the face grid of `self.axis()`.
  pub fn face(self, cell: Cell) -> Cell {
    match self {
      Self::Left | Self::Down => cell,
      Self::Right => [cell[0] + 1, cell[1]],
      Self::Up => [cell[0], cell[1] + 1],
    }
  }
}

/// Offsets `cell` and returns it if it stays inside `size`.
pub fn offset_cell(cell: Cell, offset: [isize; 2], size: [usize; 2]) -> Option<Cell> {
  let i = cell[0].checked_add_signed(offset[0])?;
  let j = cell[1].checked_add_signed(offset[1])?;
  (i < size[0] && j < size[1]).then_some([i, j])
}

/// A rectangular array of values with an associated world-space transform.
///
/// Values are stored row-major with `i` running fastest.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T> {
  transform: Transform,
  size: [usize; 2],
  data: Vec<T>,
}

// constructors
impl<T: Clone> Grid<T> {
  pub fn new(transform: Transform, size: [usize; 2], value: T) -> Self {
    let data = vec![value; size[0] * size[1]];
    Self {
      transform,
      size,
      data,
    }
  }
}
impl<T> Grid<T> {
  pub fn from_vec(transform: Transform, size: [usize; 2], data: Vec<T>) -> Self {
    assert_eq!(data.len(), size[0] * size[1], "data does not match grid size");
    Self {
      transform,
      size,
      data,
    }
  }

  /// Evaluates `f` on every cell in parallel.
  pub fn from_par_fn<F>(transform: Transform, size: [usize; 2], f: F) -> Self
  where
    T: Send,
    F: Fn(Cell) -> T + Sync,
  {
    let nx = size[0];
    let data = (0..size[0] * size[1])
      .into_par_iter()
      .with_min_len(GRAIN_SIZE)
      .map(|idx| f([idx % nx, idx / nx]))
      .collect();
    Self {
      transform,
      size,
      data,
    }
  }
}

// getters
impl<T> Grid<T> {
  pub fn transform(&self) -> &Transform {
    &self.transform
  }
  pub fn dx(&self) -> f64 {
    self.transform.dx
  }
  pub fn size(&self) -> [usize; 2] {
    self.size
  }
  pub fn nx(&self) -> usize {
    self.size[0]
  }
  pub fn ny(&self) -> usize {
    self.size[1]
  }
  pub fn ncells(&self) -> usize {
    self.data.len()
  }
  pub fn data(&self) -> &[T] {
    &self.data
  }
  pub fn data_mut(&mut self) -> &mut [T] {
    &mut self.data
  }

  pub fn flatten(&self, cell: Cell) -> usize {
    debug_assert!(self.contains(cell), "cell {cell:?} outside grid {:?}", self.size);
    cell[0] + cell[1] * self.size[0]
  }
  pub fn unflatten(&self, idx: usize) -> Cell {
    [idx % self.size[0], idx / self.size[0]]
  }

  pub fn contains(&self, cell: Cell) -> bool {
    cell[0] < self.size[0] && cell[1] < self.size[1]
  }
  pub fn get(&self, cell: Cell) -> Option<&T> {
    self.contains(cell).then(|| &self.data[self.flatten(cell)])
  }

  pub fn neighbor(&self, cell: Cell, dir: Direction) -> Option<Cell> {
    offset_cell(cell, dir.offset(), self.size)
  }

  pub fn cell_center(&self, cell: Cell) -> Vec2 {
    self.transform.cell_center(cell)
  }

  pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
    (0..self.data.len()).map(|idx| self.unflatten(idx))
  }

  /// Whether `other` covers the same cells with the same transform.
  pub fn same_layout<S>(&self, other: &Grid<S>) -> bool {
    self.size == other.size && self.transform == other.transform
  }

  pub fn map<S, F: FnMut(&T) -> S>(&self, f: F) -> Grid<S> {
    Grid {
      transform: self.transform,
      size: self.size,
      data: self.data.iter().map(f).collect(),
    }
  }
}

impl<T: Clone> Grid<T> {
  /// Copies this grid into a larger grid filled with `background`, placing
  /// cell `c` at `c + offset`.
  pub fn padded(&self, offset: [usize; 2], size: [usize; 2], background: T) -> Self {
    assert!(offset[0] + self.size[0] <= size[0] && offset[1] + self.size[1] <= size[1]);
    let mut padded = Self::new(self.transform.padded(offset), size, background);
    for j in 0..self.size[1] {
      let src = j * self.size[0];
      let dst = offset[0] + (j + offset[1]) * size[0];
      padded.data[dst..dst + self.size[0]].clone_from_slice(&self.data[src..src + self.size[0]]);
    }
    padded
  }
}

impl<T> Index<Cell> for Grid<T> {
  type Output = T;
  fn index(&self, cell: Cell) -> &T {
    &self.data[self.flatten(cell)]
  }
}
impl<T> IndexMut<Cell> for Grid<T> {
  fn index_mut(&mut self, cell: Cell) -> &mut T {
    let idx = self.flatten(cell);
    &mut self.data[idx]
  }
}

/// One value per cell face, on a staggered layout.
///
/// The x-face grid has `(nx + 1, ny)` entries, x-face `(i, j)` separating
/// cells `(i - 1, j)` and `(i, j)`. The y-face grid has `(nx, ny + 1)`
/// entries, y-face `(i, j)` separating cells `(i, j - 1)` and `(i, j)`.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceGrid<T> {
  x: Grid<T>,
  y: Grid<T>,
}

impl<T: Clone> FaceGrid<T> {
  pub fn new(transform: Transform, cell_size: [usize; 2], value: T) -> Self {
    let [nx, ny] = cell_size;
    Self {
      x: Grid::new(transform, [nx + 1, ny], value.clone()),
      y: Grid::new(transform, [nx, ny + 1], value),
    }
  }

  /// Counterpart of [`Grid::padded`] for the faces of the padded cell grid.
  pub fn padded(&self, offset: [usize; 2], cell_size: [usize; 2], background: T) -> Self {
    let [nx, ny] = cell_size;
    Self {
      x: self.x.padded(offset, [nx + 1, ny], background.clone()),
      y: self.y.padded(offset, [nx, ny + 1], background),
    }
  }
}

impl<T> FaceGrid<T> {
  pub fn from_par_fn<F>(transform: Transform, cell_size: [usize; 2], f: F) -> Self
  where
    T: Send,
    F: Fn(Axis, Cell) -> T + Sync,
  {
    let [nx, ny] = cell_size;
    Self {
      x: Grid::from_par_fn(transform, [nx + 1, ny], |face| f(Axis::X, face)),
      y: Grid::from_par_fn(transform, [nx, ny + 1], |face| f(Axis::Y, face)),
    }
  }

  pub fn transform(&self) -> &Transform {
    self.x.transform()
  }
  pub fn cell_size(&self) -> [usize; 2] {
    [self.y.nx(), self.x.ny()]
  }
  pub fn x(&self) -> &Grid<T> {
    &self.x
  }
  pub fn y(&self) -> &Grid<T> {
    &self.y
  }
  pub fn axis(&self, axis: Axis) -> &Grid<T> {
    match axis {
      Axis::X => &self.x,
      Axis::Y => &self.y,
    }
  }
  pub fn axis_mut(&mut self, axis: Axis) -> &mut Grid<T> {
    match axis {
      Axis::X => &mut self.x,
      Axis::Y => &mut self.y,
    }
  }

  /// Value on the face between `cell` and its neighbour in direction `dir`.
  pub fn face(&self, cell: Cell, dir: Direction) -> &T {
    &self.axis(dir.axis())[dir.face(cell)]
  }
  pub fn face_mut(&mut self, cell: Cell, dir: Direction) -> &mut T {
    let face = dir.face(cell);
    &mut self.axis_mut(dir.axis())[face]
  }

  /// World-space end points of a face segment.
  pub fn face_endpoints(&self, axis: Axis, face: Cell) -> (Vec2, Vec2) {
    self.transform().face_endpoints(axis, face)
  }

  pub fn iter(&self) -> impl Iterator<Item = &T> {
    self.x.data().iter().chain(self.y.data())
  }
}
