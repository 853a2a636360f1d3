//! Implicit shapes used to carve solvable regions and embedded solids out of a grid.
//!
//! Shapes are described by a signed distance (negative inside). Besides point
//! containment the domain builder needs the fraction of a face segment that
//! lies inside a shape; simple analytic shapes compute it exactly, everything
//! else falls back to [`sampled_segment_fraction`].

use crate::grid::Vec2;

/// Number of sub-intervals a segment is split into when sampling a shape.
pub const SEGMENT_SAMPLES: usize = 8;
const BISECTION_STEPS: usize = 48;

pub trait Shape: Send + Sync {
  /// Signed distance to the boundary, negative inside.
  fn signed_distance(&self, pos: Vec2) -> f64;

  fn contains(&self, pos: Vec2) -> bool {
    self.signed_distance(pos) <= 0.0
  }

  /// Fraction of the segment `a..b` inside the shape, in `[0, 1]`.
  fn segment_fraction(&self, a: Vec2, b: Vec2) -> f64 {
    sampled_segment_fraction(self, a, b)
  }
}

impl<S: Shape + ?Sized> Shape for Box<S> {
  fn signed_distance(&self, pos: Vec2) -> f64 {
    (**self).signed_distance(pos)
  }
  fn contains(&self, pos: Vec2) -> bool {
    (**self).contains(pos)
  }
  fn segment_fraction(&self, a: Vec2, b: Vec2) -> f64 {
    (**self).segment_fraction(a, b)
  }
}

/// Splits the segment into [`SEGMENT_SAMPLES`] pieces and locates the inside/outside
/// transition of every piece whose end points disagree by bisection.
///
/// Exact up to bisection tolerance as long as the boundary crosses every piece at most once.
pub fn sampled_segment_fraction<S: Shape + ?Sized>(shape: &S, a: Vec2, b: Vec2) -> f64 {
  let point = |t: f64| a + (b - a) * t;
  let inside = |t: f64| shape.contains(point(t));

  let mut fraction = 0.0;
  let mut t0 = 0.0;
  let mut in0 = inside(t0);
  for k in 1..=SEGMENT_SAMPLES {
    let t1 = k as f64 / SEGMENT_SAMPLES as f64;
    let in1 = inside(t1);
    fraction += match (in0, in1) {
      (true, true) => t1 - t0,
      (false, false) => 0.0,
      _ => {
        let tc = bisect_transition(&inside, t0, t1, in0);
        if in0 {
          tc - t0
        } else {
          t1 - tc
        }
      }
    };
    t0 = t1;
    in0 = in1;
  }
  fraction.clamp(0.0, 1.0)
}

fn bisect_transition<F: Fn(f64) -> bool>(inside: &F, mut lo: f64, mut hi: f64, in_lo: bool) -> f64 {
  for _ in 0..BISECTION_STEPS {
    let mid = 0.5 * (lo + hi);
    if inside(mid) == in_lo {
      lo = mid;
    } else {
      hi = mid;
    }
  }
  0.5 * (lo + hi)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Disk {
  center: Vec2,
  radius: f64,
}
impl Disk {
  pub fn new(center: Vec2, radius: f64) -> Self {
    assert!(radius >= 0.0);
    Self { center, radius }
  }
  pub fn center(&self) -> Vec2 {
    self.center
  }
  pub fn radius(&self) -> f64 {
    self.radius
  }
}
impl Shape for Disk {
  fn signed_distance(&self, pos: Vec2) -> f64 {
    (pos - self.center).norm() - self.radius
  }

  /// Exact chord length through intersection of the segment's line with the circle.
  fn segment_fraction(&self, a: Vec2, b: Vec2) -> f64 {
    let d = b - a;
    let f = a - self.center;
    let qa = d.norm_squared();
    if qa == 0.0 {
      return if self.contains(a) { 1.0 } else { 0.0 };
    }
    let qb = 2.0 * f.dot(&d);
    let qc = f.norm_squared() - self.radius.powi(2);
    let disc = qb * qb - 4.0 * qa * qc;
    if disc <= 0.0 {
      return 0.0;
    }
    let sqrt_disc = disc.sqrt();
    let t_enter = (-qb - sqrt_disc) / (2.0 * qa);
    let t_exit = (-qb + sqrt_disc) / (2.0 * qa);
    (t_exit.min(1.0) - t_enter.max(0.0)).clamp(0.0, 1.0)
  }
}

/// Axis-aligned rectangle, e.g. a band spanning the domain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
  min: Vec2,
  max: Vec2,
}
impl Rect {
  pub fn new_min_max(min: Vec2, max: Vec2) -> Self {
    assert!(min.x <= max.x && min.y <= max.y);
    Self { min, max }
  }
  /// Horizontal band `y0 <= y <= y1` over all x.
  pub fn new_horizontal_band(y0: f64, y1: f64) -> Self {
    Self::new_min_max(
      Vec2::new(f64::NEG_INFINITY, y0),
      Vec2::new(f64::INFINITY, y1),
    )
  }
  pub fn min(&self) -> Vec2 {
    self.min
  }
  pub fn max(&self) -> Vec2 {
    self.max
  }
}
impl Shape for Rect {
  fn signed_distance(&self, pos: Vec2) -> f64 {
    let below = self.min - pos;
    let above = pos - self.max;
    let q = below.sup(&above);
    let outside = q.sup(&Vec2::zeros()).norm();
    let inside = q.x.max(q.y).min(0.0);
    outside + inside
  }

  /// Slab clipping of the segment against both axes.
  fn segment_fraction(&self, a: Vec2, b: Vec2) -> f64 {
    let d = b - a;
    let mut t_enter: f64 = 0.0;
    let mut t_exit: f64 = 1.0;
    for axis in 0..2 {
      if d[axis] == 0.0 {
        if a[axis] < self.min[axis] || a[axis] > self.max[axis] {
          return 0.0;
        }
      } else {
        let t0 = (self.min[axis] - a[axis]) / d[axis];
        let t1 = (self.max[axis] - a[axis]) / d[axis];
        t_enter = t_enter.max(t0.min(t1));
        t_exit = t_exit.min(t0.max(t1));
      }
    }
    (t_exit - t_enter).clamp(0.0, 1.0)
  }
}

/// Shape given by an arbitrary signed distance function.
pub struct Implicit<F>(pub F);
impl<F> Shape for Implicit<F>
where
  F: Fn(Vec2) -> f64 + Send + Sync,
{
  fn signed_distance(&self, pos: Vec2) -> f64 {
    (self.0)(pos)
  }
}

/// Shape given by an inside/outside predicate only.
///
/// The signed distance is a sign, so only containment and sampled fractions are meaningful.
pub struct Predicate<F>(pub F);
impl<F> Shape for Predicate<F>
where
  F: Fn(Vec2) -> bool + Send + Sync,
{
  fn signed_distance(&self, pos: Vec2) -> f64 {
    if (self.0)(pos) {
      -1.0
    } else {
      1.0
    }
  }
  fn contains(&self, pos: Vec2) -> bool {
    (self.0)(pos)
  }
}

/// A ∪ B
pub struct Union<A, B>(pub A, pub B);
impl<A: Shape, B: Shape> Shape for Union<A, B> {
  fn signed_distance(&self, pos: Vec2) -> f64 {
    self.0.signed_distance(pos).min(self.1.signed_distance(pos))
  }
}

/// A ∩ B
pub struct Intersection<A, B>(pub A, pub B);
impl<A: Shape, B: Shape> Shape for Intersection<A, B> {
  fn signed_distance(&self, pos: Vec2) -> f64 {
    self.0.signed_distance(pos).max(self.1.signed_distance(pos))
  }
}

/// A \ B
pub struct Difference<A, B>(pub A, pub B);
impl<A: Shape, B: Shape> Shape for Difference<A, B> {
  fn signed_distance(&self, pos: Vec2) -> f64 {
    self.0.signed_distance(pos).max(-self.1.signed_distance(pos))
  }
}

/// ~A
pub struct Complement<A>(pub A);
impl<A: Shape> Shape for Complement<A> {
  fn signed_distance(&self, pos: Vec2) -> f64 {
    -self.0.signed_distance(pos)
  }
  fn segment_fraction(&self, a: Vec2, b: Vec2) -> f64 {
    1.0 - self.0.segment_fraction(a, b)
  }
}

#[cfg(test)]
mod test {
  use super::{sampled_segment_fraction, Complement, Difference, Disk, Rect, Shape, Vec2};

  use approx::assert_abs_diff_eq;

  #[test]
  fn disk_fraction_matches_chord() {
    let disk = Disk::new(Vec2::new(0.0, 0.0), 1.0);
    // vertical segment x = 0.6 from y = 0 to y = 1 leaves the circle at y = 0.8
    let a = Vec2::new(0.6, 0.0);
    let b = Vec2::new(0.6, 1.0);
    assert_abs_diff_eq!(disk.segment_fraction(a, b), 0.8, epsilon = 1e-12);
    assert_abs_diff_eq!(disk.segment_fraction(b, a), 0.8, epsilon = 1e-12);

    let outside = disk.segment_fraction(Vec2::new(2.0, 0.0), Vec2::new(2.0, 1.0));
    assert_eq!(outside, 0.0);
    let inside = disk.segment_fraction(Vec2::new(0.1, 0.0), Vec2::new(0.1, 0.2));
    assert_eq!(inside, 1.0);
  }

  #[test]
  fn sampled_fraction_agrees_with_exact() {
    let disk = Disk::new(Vec2::new(0.5, 0.5), 0.3);
    for k in 0..20 {
      let x = 0.15 + 0.035 * k as f64;
      let a = Vec2::new(x, 0.1);
      let b = Vec2::new(x, 0.6);
      let exact = disk.segment_fraction(a, b);
      let sampled = sampled_segment_fraction(&disk, a, b);
      assert_abs_diff_eq!(exact, sampled, epsilon = 1e-9);
    }
  }

  #[test]
  fn rect_distance_and_clipping() {
    let rect = Rect::new_min_max(Vec2::new(0.0, 0.0), Vec2::new(2.0, 1.0));
    assert_abs_diff_eq!(rect.signed_distance(Vec2::new(1.0, 0.5)), -0.5);
    assert_abs_diff_eq!(rect.signed_distance(Vec2::new(3.0, 0.5)), 1.0);
    assert_abs_diff_eq!(rect.signed_distance(Vec2::new(3.0, 2.0)), 2f64.sqrt());

    let frac = rect.segment_fraction(Vec2::new(-1.0, 0.5), Vec2::new(1.0, 0.5));
    assert_abs_diff_eq!(frac, 0.5, epsilon = 1e-12);

    let band = Rect::new_horizontal_band(0.25, 0.75);
    assert!(band.contains(Vec2::new(1e6, 0.5)));
    let frac = band.segment_fraction(Vec2::new(0.3, 0.0), Vec2::new(0.3, 1.0));
    assert_abs_diff_eq!(frac, 0.5, epsilon = 1e-12);
  }

  #[test]
  fn csg_combinators() {
    let outer = Disk::new(Vec2::new(0.0, 0.0), 1.0);
    let hole = Disk::new(Vec2::new(0.0, 0.0), 0.5);
    let ring = Difference(outer, hole);
    assert!(ring.contains(Vec2::new(0.75, 0.0)));
    assert!(!ring.contains(Vec2::new(0.25, 0.0)));
    assert!(!ring.contains(Vec2::new(1.5, 0.0)));

    let a = Vec2::new(0.0, 0.0);
    let b = Vec2::new(0.0, 1.0);
    assert_abs_diff_eq!(ring.segment_fraction(a, b), 0.5, epsilon = 1e-9);

    let outside = Complement(Disk::new(Vec2::new(0.0, 0.0), 0.5));
    assert_abs_diff_eq!(outside.segment_fraction(a, b), 0.5, epsilon = 1e-12);
  }
}
