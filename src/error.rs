pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("invalid grid resolution {nx}x{ny} with spacing {dx}")]
  InvalidResolution { nx: usize, ny: usize, dx: f64 },

  #[error("domain contains no interior cells")]
  DegenerateDomain,

  #[error("grid size mismatch: expected {expected:?}, found {found:?}")]
  SizeMismatch {
    expected: [usize; 2],
    found: [usize; 2],
  },

  #[error("linear solve failed: {0}")]
  SolveFailure(String),

  #[error("linear system is singular ({nunknowns} unknowns)")]
  SingularSystem { nunknowns: usize },

  #[error(transparent)]
  Io(#[from] std::io::Error),
}

impl Error {
  pub fn check_size(expected: [usize; 2], found: [usize; 2]) -> Result<()> {
    if expected == found {
      Ok(())
    } else {
      Err(Self::SizeMismatch { expected, found })
    }
  }
}
