//! Construction of solvable domains on a uniform grid.
//!
//! A [`Domain`] is a cell-label grid together with per-face boundary weights.
//! Labels decide which cells are unknowns; weights give the open fraction of
//! every face, so embedded solids that do not align with the grid still cut
//! the stencil consistently.

pub mod shape;

pub use shape::{Complement, Difference, Disk, Implicit, Intersection, Predicate, Rect, Shape, Union};

use crate::{
  error::{Error, Result},
  grid::{Axis, Cell, Direction, FaceGrid, Grid, Transform, Vec2},
  util,
};

/// Radius of the fluid disk of [`build_complex_domain`], in unit-square coordinates.
pub const COMPLEX_DOMAIN_RADIUS: f64 = 0.4;
/// Radius of the embedded solid disk of [`build_complex_domain`].
pub const SOLID_SPHERE_RADIUS: f64 = 0.15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CellLabel {
  /// Outside the problem. Never an unknown, contributes nothing to neighbours.
  #[default]
  Exterior,
  /// Solvable, with four solvable neighbours behind fully open faces.
  Interior,
  /// Solvable, next to a non-interior neighbour or a partially blocked face.
  Boundary,
  /// Prescribed value. Read by neighbouring stencils, never updated.
  Dirichlet,
}

impl CellLabel {
  pub fn is_solvable(self) -> bool {
    matches!(self, Self::Interior | Self::Boundary)
  }
  pub fn is_exterior(self) -> bool {
    self == Self::Exterior
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Domain {
  labels: Grid<CellLabel>,
  weights: FaceGrid<f64>,
}

impl Domain {
  pub fn new(labels: Grid<CellLabel>, weights: FaceGrid<f64>) -> Result<Self> {
    Error::check_size(labels.size(), weights.cell_size())?;
    assert_eq!(labels.transform(), weights.transform());
    Ok(Self { labels, weights })
  }

  pub fn labels(&self) -> &Grid<CellLabel> {
    &self.labels
  }
  pub fn weights(&self) -> &FaceGrid<f64> {
    &self.weights
  }
  pub fn transform(&self) -> &Transform {
    self.labels.transform()
  }
  pub fn size(&self) -> [usize; 2] {
    self.labels.size()
  }
  pub fn dx(&self) -> f64 {
    self.labels.dx()
  }

  pub fn count(&self, label: CellLabel) -> usize {
    self.labels.data().iter().filter(|&&l| l == label).count()
  }
  pub fn nsolvable(&self) -> usize {
    self.labels.data().iter().filter(|l| l.is_solvable()).count()
  }

  pub fn boundary_cells(&self, width: usize) -> Vec<Cell> {
    build_boundary_cells(&self.labels, width)
  }

  /// Pads the domain with exterior cells up to a size that coarsens cleanly
  /// `mg_levels - 1` times.
  ///
  /// Border faces of the unpadded grid that were open keep their Dirichlet
  /// behaviour: the padding cell across such a face is labelled Dirichlet.
  pub fn expand(&self) -> ExpandedDomain {
    let size = self.size();
    let min_len = size[0].min(size[1]);
    let mg_levels = (min_len.max(1).ilog2() as usize).saturating_sub(1).max(1);
    let block = 1usize << (mg_levels - 1);

    let expanded_size = size.map(|n| (n + 2).div_ceil(block) * block);
    let exterior_offset = [0, 1].map(|a| (expanded_size[a] - size[a]) / 2);

    let mut labels = self
      .labels
      .padded(exterior_offset, expanded_size, CellLabel::Exterior);
    let weights = self.weights.padded(exterior_offset, expanded_size, 0.0);

    for cell in self.labels.cells() {
      if !self.labels[cell].is_solvable() {
        continue;
      }
      for dir in Direction::ALL {
        if self.labels.neighbor(cell, dir).is_none() && *self.weights.face(cell, dir) > 0.0 {
          let [di, dj] = dir.offset();
          let padding_cell = [
            (cell[0] + exterior_offset[0]).wrapping_add_signed(di),
            (cell[1] + exterior_offset[1]).wrapping_add_signed(dj),
          ];
          labels[padding_cell] = CellLabel::Dirichlet;
        }
      }
    }

    tracing::debug!(
      "expanded domain {:?} -> {:?}, offset {:?}, {} levels",
      size,
      expanded_size,
      exterior_offset,
      mg_levels
    );

    ExpandedDomain {
      domain: Self { labels, weights },
      exterior_offset,
      mg_levels,
    }
  }
}

/// A domain padded for multi-level use, and how it relates to the unpadded one.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpandedDomain {
  pub domain: Domain,
  /// Cell `c` of the unpadded domain is cell `c + exterior_offset` here.
  pub exterior_offset: [usize; 2],
  pub mg_levels: usize,
}

/// Classifies cells and computes face weights from implicit shapes.
///
/// Cells whose centers lie outside the `fluid` shape become Dirichlet cells.
/// The `solid` shape is an embedded obstacle: it never changes labels directly,
/// but the fraction of every face covered by it is removed from the face weight.
pub struct DomainBuilder {
  size: [usize; 2],
  dx: f64,
  origin: Vec2,
  fluid: Option<Box<dyn Shape>>,
  solid: Option<Box<dyn Shape>>,
  dirichlet_band: usize,
  solvable_edges: bool,
}

// constructors
impl DomainBuilder {
  /// Square grid covering the unit square with `grid_size` cells per axis.
  pub fn new(grid_size: usize) -> Self {
    Self::with_transform([grid_size; 2], (grid_size as f64).recip(), Vec2::zeros())
  }

  pub fn with_transform(size: [usize; 2], dx: f64, origin: Vec2) -> Self {
    Self {
      size,
      dx,
      origin,
      fluid: None,
      solid: None,
      dirichlet_band: 0,
      solvable_edges: false,
    }
  }
}

// options
impl DomainBuilder {
  pub fn fluid(mut self, shape: impl Shape + 'static) -> Self {
    self.fluid = Some(Box::new(shape));
    self
  }
  pub fn solid(mut self, shape: impl Shape + 'static) -> Self {
    self.solid = Some(Box::new(shape));
    self
  }
  /// Number of Dirichlet rings directly inside the outer edge.
  pub fn dirichlet_band(mut self, width: usize) -> Self {
    self.dirichlet_band = width;
    self
  }
  /// Lets cells on the array border be solvable. Their out-of-grid
  /// neighbours then act as Dirichlet cells.
  pub fn solvable_edges(mut self, solvable: bool) -> Self {
    self.solvable_edges = solvable;
    self
  }
}

impl DomainBuilder {
  pub fn build(&self) -> Result<Domain> {
    let [nx, ny] = self.size;
    if nx == 0 || ny == 0 || !(self.dx > 0.0 && self.dx.is_finite()) {
      return Err(Error::InvalidResolution { nx, ny, dx: self.dx });
    }
    let transform = Transform::new(self.dx, self.origin);

    let mut labels = Grid::from_par_fn(transform, self.size, |cell| self.initial_label(cell));
    let mut weights = FaceGrid::from_par_fn(transform, self.size, |axis, face| {
      self.face_weight(&labels, axis, face)
    });
    isolate_closed_cells(&mut labels, &weights);
    remove_floating_cells(&mut labels, &weights);
    classify_solvable_cells(&mut labels, &weights);
    zero_exterior_faces(&labels, &mut weights);

    let domain = Domain { labels, weights };
    let ninterior = domain.count(CellLabel::Interior);
    tracing::info!(
      "built {nx}x{ny} domain: {} interior, {} boundary, {} dirichlet, {} exterior",
      ninterior,
      domain.count(CellLabel::Boundary),
      domain.count(CellLabel::Dirichlet),
      domain.count(CellLabel::Exterior),
    );
    if ninterior == 0 {
      return Err(Error::DegenerateDomain);
    }
    Ok(domain)
  }

  fn initial_label(&self, cell: Cell) -> CellLabel {
    let [nx, ny] = self.size;
    let ring = cell[0].min(cell[1]).min(nx - 1 - cell[0]).min(ny - 1 - cell[1]);
    let band_end = if self.solvable_edges {
      self.dirichlet_band
    } else if ring == 0 {
      return CellLabel::Exterior;
    } else {
      self.dirichlet_band + 1
    };
    if ring < band_end {
      return CellLabel::Dirichlet;
    }

    let center = Transform::new(self.dx, self.origin).cell_center(cell);
    match &self.fluid {
      Some(fluid) if !fluid.contains(center) => CellLabel::Dirichlet,
      _ => CellLabel::Interior,
    }
  }

  fn face_weight(&self, labels: &Grid<CellLabel>, axis: Axis, face: Cell) -> f64 {
    let (low, high) = face_cells(labels, axis, face);
    let sides = [low, high].map(|cell| cell.map(|c| labels[c]));
    if sides.iter().flatten().any(|l| l.is_exterior()) {
      return 0.0;
    }
    if sides.iter().any(Option::is_none) && !self.solvable_edges {
      return 0.0;
    }
    match &self.solid {
      Some(solid) => {
        let (a, b) = labels.transform().face_endpoints(axis, face);
        (1.0 - solid.segment_fraction(a, b)).clamp(0.0, 1.0)
      }
      None => 1.0,
    }
  }
}

/// The cells below and above a face; `None` outside the grid.
fn face_cells(labels: &Grid<CellLabel>, axis: Axis, face: Cell) -> (Option<Cell>, Option<Cell>) {
  let low_dir = match axis {
    Axis::X => Direction::Left,
    Axis::Y => Direction::Down,
  };
  (
    labels.neighbor(face, low_dir),
    labels.contains(face).then_some(face),
  )
}

fn isolate_closed_cells(labels: &mut Grid<CellLabel>, weights: &FaceGrid<f64>) {
  let closed: Vec<Cell> = labels
    .cells()
    .filter(|&cell| {
      !labels[cell].is_exterior()
        && Direction::ALL
          .iter()
          .all(|&dir| *weights.face(cell, dir) == 0.0)
    })
    .collect();
  for cell in closed {
    labels[cell] = CellLabel::Exterior;
  }
}

/// Solvable cells not connected through open faces to a Dirichlet cell or to
/// the outside of the grid become exterior. Such pockets only see zero-flux
/// faces and would leave the discrete problem singular.
fn remove_floating_cells(labels: &mut Grid<CellLabel>, weights: &FaceGrid<f64>) {
  let is_anchor = |cell: Cell| {
    Direction::ALL.iter().any(|&dir| {
      *weights.face(cell, dir) > 0.0
        && labels
          .neighbor(cell, dir)
          .map_or(true, |n| labels[n] == CellLabel::Dirichlet)
    })
  };
  let mut reached = vec![false; labels.ncells()];
  let mut stack: Vec<Cell> = labels
    .cells()
    .filter(|&cell| labels[cell].is_solvable() && is_anchor(cell))
    .collect();
  for &cell in &stack {
    reached[labels.flatten(cell)] = true;
  }
  while let Some(cell) = stack.pop() {
    for dir in Direction::ALL {
      if *weights.face(cell, dir) == 0.0 {
        continue;
      }
      let Some(neighbor) = labels.neighbor(cell, dir) else {
        continue;
      };
      let idx = labels.flatten(neighbor);
      if !reached[idx] && labels[neighbor].is_solvable() {
        reached[idx] = true;
        stack.push(neighbor);
      }
    }
  }

  let floating: Vec<Cell> = labels
    .cells()
    .filter(|&cell| labels[cell].is_solvable() && !reached[labels.flatten(cell)])
    .collect();
  if !floating.is_empty() {
    tracing::debug!("removing {} solvable cells without boundary data", floating.len());
  }
  for cell in floating {
    labels[cell] = CellLabel::Exterior;
  }
}

fn classify_solvable_cells(labels: &mut Grid<CellLabel>, weights: &FaceGrid<f64>) {
  let classified = Grid::from_par_fn(*labels.transform(), labels.size(), |cell| {
    let label = labels[cell];
    if !label.is_solvable() {
      return label;
    }
    let interior = Direction::ALL.iter().all(|&dir| {
      let neighbor_solvable = labels
        .neighbor(cell, dir)
        .is_some_and(|n| labels[n].is_solvable());
      neighbor_solvable && *weights.face(cell, dir) == 1.0
    });
    if interior {
      CellLabel::Interior
    } else {
      CellLabel::Boundary
    }
  });
  *labels = classified;
}

fn zero_exterior_faces(labels: &Grid<CellLabel>, weights: &mut FaceGrid<f64>) {
  for cell in labels.cells() {
    if labels[cell].is_exterior() {
      for dir in Direction::ALL {
        *weights.face_mut(cell, dir) = 0.0;
      }
    }
  }
}

/// Solvable cells within `width - 1` steps of a boundary cell, in flat order.
///
/// Steps walk through solvable cells only. A width of zero gives no cells.
pub fn build_boundary_cells(labels: &Grid<CellLabel>, width: usize) -> Vec<Cell> {
  if width == 0 {
    return Vec::new();
  }
  let mut marked: Vec<bool> = labels
    .data()
    .iter()
    .map(|&l| l == CellLabel::Boundary)
    .collect();
  let mut frontier: Vec<Cell> = util::flags_to_indicies(&marked)
    .into_iter()
    .map(|idx| labels.unflatten(idx))
    .collect();

  for _ in 1..width {
    let mut next = Vec::new();
    for cell in frontier {
      for dir in Direction::ALL {
        let Some(neighbor) = labels.neighbor(cell, dir) else {
          continue;
        };
        let idx = labels.flatten(neighbor);
        if !marked[idx] && labels[neighbor].is_solvable() {
          marked[idx] = true;
          next.push(neighbor);
        }
      }
    }
    frontier = next;
  }

  util::flags_to_indicies(&marked)
    .into_iter()
    .map(|idx| labels.unflatten(idx))
    .collect()
}

/// Square domain whose outer ring is exterior, followed by `dirichlet_band`
/// rings of Dirichlet cells around a solvable core.
///
/// Without a band the core has no boundary data and the domain is degenerate.
pub fn build_simple_domain(grid_size: usize, dirichlet_band: usize) -> Result<Domain> {
  DomainBuilder::new(grid_size)
    .dirichlet_band(dirichlet_band)
    .build()
}

/// Fluid disk in the unit square surrounded by Dirichlet cells, optionally
/// with an off-center solid disk cutting the faces inside it.
pub fn build_complex_domain(grid_size: usize, solid_sphere: bool) -> Result<Domain> {
  let fluid = Disk::new(Vec2::new(0.5, 0.5), COMPLEX_DOMAIN_RADIUS);
  let mut builder = DomainBuilder::new(grid_size).fluid(fluid);
  if solid_sphere {
    builder = builder.solid(Disk::new(Vec2::new(0.35, 0.5), SOLID_SPHERE_RADIUS));
  }
  builder.build()
}
