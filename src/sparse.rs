use crate::error::{Error, Result};

/// Sparse matrix in triplet form. Duplicate entries are summed on conversion.
#[derive(Debug, Default, Clone)]
pub struct SparseMatrix {
  nrows: usize,
  ncols: usize,
  triplets: Vec<(usize, usize, f64)>,
}

impl SparseMatrix {
  pub fn new(nrows: usize, ncols: usize) -> Self {
    Self::with_capacity(nrows, ncols, 0)
  }
  pub fn with_capacity(nrows: usize, ncols: usize, capacity: usize) -> Self {
    Self {
      nrows,
      ncols,
      triplets: Vec::with_capacity(capacity),
    }
  }
  pub fn from_triplets(nrows: usize, ncols: usize, triplets: Vec<(usize, usize, f64)>) -> Self {
    assert!(triplets.iter().all(|&(r, c, _)| r < nrows && c < ncols));
    Self {
      nrows,
      ncols,
      triplets,
    }
  }

  pub fn nrows(&self) -> usize {
    self.nrows
  }
  pub fn ncols(&self) -> usize {
    self.ncols
  }
  pub fn ntriplets(&self) -> usize {
    self.triplets.len()
  }
  pub fn triplets(&self) -> &[(usize, usize, f64)] {
    &self.triplets
  }

  pub fn push(&mut self, r: usize, c: usize, v: f64) {
    assert!(r < self.nrows && c < self.ncols, "entry ({r},{c}) out of bounds");
    if v != 0.0 {
      self.triplets.push((r, c, v));
    }
  }

  /// Summed entry at `(r, c)`.
  pub fn get(&self, r: usize, c: usize) -> f64 {
    self
      .triplets
      .iter()
      .filter(|t| t.0 == r && t.1 == c)
      .map(|t| t.2)
      .sum()
  }

  pub fn mul_vec(&self, x: &na::DVector<f64>) -> na::DVector<f64> {
    assert_eq!(x.len(), self.ncols);
    &self.to_nalgebra_csr() * x
  }

  pub fn to_nalgebra_coo(&self) -> nas::CooMatrix<f64> {
    let mut coo = nas::CooMatrix::new(self.nrows, self.ncols);
    for &(r, c, v) in &self.triplets {
      coo.push(r, c, v);
    }
    coo
  }

  pub fn to_nalgebra_csr(&self) -> nas::CsrMatrix<f64> {
    (&self.to_nalgebra_coo()).into()
  }

  pub fn to_nalgebra_csc(&self) -> nas::CscMatrix<f64> {
    (&self.to_nalgebra_coo()).into()
  }

  pub fn to_nalgebra_dense(&self) -> na::DMatrix<f64> {
    (&self.to_nalgebra_coo()).into()
  }

  pub fn to_faer_csc(&self) -> Result<faer::sparse::SparseColMat<usize, f64>> {
    faer::sparse::SparseColMat::try_new_from_triplets(self.nrows, self.ncols, &self.triplets)
      .map_err(|err| Error::SolveFailure(format!("invalid sparse matrix: {err:?}")))
  }
}

/// Square linear system `A x = b` assembled row by row.
#[derive(Debug, Clone)]
pub struct SparseSystem {
  matrix: SparseMatrix,
  rhs: na::DVector<f64>,
}

impl SparseSystem {
  pub fn new(nunknowns: usize, nnz_estimate: usize) -> Self {
    Self {
      matrix: SparseMatrix::with_capacity(nunknowns, nunknowns, nnz_estimate),
      rhs: na::DVector::zeros(nunknowns),
    }
  }

  pub fn from_parts(matrix: SparseMatrix, rhs: na::DVector<f64>) -> Self {
    assert_eq!(matrix.nrows(), matrix.ncols());
    assert_eq!(matrix.nrows(), rhs.len());
    Self { matrix, rhs }
  }

  pub fn nunknowns(&self) -> usize {
    self.rhs.len()
  }
  pub fn matrix(&self) -> &SparseMatrix {
    &self.matrix
  }
  pub fn rhs(&self) -> &na::DVector<f64> {
    &self.rhs
  }

  pub fn add_coefficient(&mut self, row: usize, col: usize, value: f64) {
    self.matrix.push(row, col, value);
  }
  pub fn add_rhs(&mut self, row: usize, value: f64) {
    self.rhs[row] += value;
  }

  /// `b - A x`
  pub fn residual(&self, x: &na::DVector<f64>) -> na::DVector<f64> {
    &self.rhs - self.matrix.mul_vec(x)
  }
}

#[cfg(test)]
mod test {
  use super::{SparseMatrix, SparseSystem};

  #[test]
  fn duplicates_are_summed() {
    let mut mat = SparseMatrix::new(2, 2);
    mat.push(0, 0, 1.0);
    mat.push(0, 0, 2.0);
    mat.push(1, 0, 0.0);
    mat.push(1, 1, -1.0);
    assert_eq!(mat.ntriplets(), 3);
    assert_eq!(mat.get(0, 0), 3.0);

    let dense = mat.to_nalgebra_dense();
    assert_eq!(dense, na::DMatrix::from_row_slice(2, 2, &[3.0, 0.0, 0.0, -1.0]));
    assert_eq!(mat.to_nalgebra_csc().nnz(), 2);
  }

  #[test]
  fn system_residual() {
    let mut system = SparseSystem::new(2, 4);
    system.add_coefficient(0, 0, 2.0);
    system.add_coefficient(0, 1, -1.0);
    system.add_coefficient(1, 1, 2.0);
    system.add_rhs(0, 1.0);
    system.add_rhs(1, 2.0);
    system.add_rhs(1, 2.0);
    let x = na::DVector::from_column_slice(&[1.0, 1.0]);
    let r = system.residual(&x);
    assert_eq!(r, na::DVector::from_column_slice(&[0.0, 2.0]));
  }
}
