//! Run configuration with defaults and `POISSON_*` environment overrides.

use crate::{
  domain::{build_complex_domain, build_simple_domain, Domain},
  error::Result,
};

fn parse<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<T> {
  let value = lookup(name)?;
  let parsed = value.trim().parse::<T>().ok();
  if parsed.is_none() {
    tracing::warn!("ignoring unparsable {name}={value:?}");
  }
  parsed
}

fn parse_bool(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<bool> {
  let value = lookup(name)?;
  match value.trim().to_ascii_lowercase().as_str() {
    "1" | "true" | "yes" | "on" => Some(true),
    "0" | "false" | "no" | "off" => Some(false),
    _ => {
      tracing::warn!("ignoring unparsable {name}={value:?}");
      None
    }
  }
}

fn env_lookup(name: &str) -> Option<String> {
  std::env::var(name).ok()
}

#[derive(Debug, Clone, PartialEq)]
pub struct DomainConfig {
  pub grid_size: usize,
  pub complex_domain: bool,
  pub solid_sphere: bool,
  /// Dirichlet rings of the simple domain.
  pub dirichlet_band: usize,
}

impl Default for DomainConfig {
  fn default() -> Self {
    Self {
      grid_size: 256,
      complex_domain: true,
      solid_sphere: true,
      dirichlet_band: 1,
    }
  }
}

impl DomainConfig {
  pub fn from_env() -> Self {
    Self::from_lookup(env_lookup)
  }

  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
    let mut cfg = Self::default();
    if let Some(v) = parse::<usize>(&lookup, "POISSON_GRID_SIZE") {
      cfg.grid_size = v;
    }
    if let Some(v) = parse_bool(&lookup, "POISSON_COMPLEX_DOMAIN") {
      cfg.complex_domain = v;
    }
    if let Some(v) = parse_bool(&lookup, "POISSON_SOLID_SPHERE") {
      cfg.solid_sphere = v;
    }
    if let Some(v) = parse::<usize>(&lookup, "POISSON_DIRICHLET_BAND") {
      cfg.dirichlet_band = v;
    }
    cfg
  }

  pub fn build(&self) -> Result<Domain> {
    if self.complex_domain {
      build_complex_domain(self.grid_size, self.solid_sphere)
    } else {
      build_simple_domain(self.grid_size, self.dirichlet_band)
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelaxationConfig {
  pub max_iterations: usize,
  /// Width of the band of cells relaxed by the boundary passes.
  pub boundary_width: usize,
  pub delta_amplitude: f64,
  /// Position of the delta source as a fraction of the grid size.
  pub delta_percent: f64,
  pub random_guess: bool,
  pub seed: u64,
  /// Iterations excluded from the monotonicity statistic.
  pub transient: usize,
}

impl Default for RelaxationConfig {
  fn default() -> Self {
    Self {
      max_iterations: 1000,
      boundary_width: 3,
      delta_amplitude: 1000.0,
      delta_percent: 0.1,
      random_guess: true,
      seed: 0,
      transient: 10,
    }
  }
}

impl RelaxationConfig {
  pub fn from_env() -> Self {
    Self::from_lookup(env_lookup)
  }

  pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
    let mut cfg = Self::default();
    if let Some(v) = parse::<usize>(&lookup, "POISSON_MAX_ITERATIONS") {
      cfg.max_iterations = v;
    }
    if let Some(v) = parse::<usize>(&lookup, "POISSON_BOUNDARY_WIDTH") {
      cfg.boundary_width = v;
    }
    if let Some(v) = parse::<f64>(&lookup, "POISSON_DELTA_AMPLITUDE") {
      cfg.delta_amplitude = v;
    }
    if let Some(v) = parse::<f64>(&lookup, "POISSON_DELTA_PERCENT") {
      cfg.delta_percent = v.clamp(0.0, 1.0);
    }
    if let Some(v) = parse_bool(&lookup, "POISSON_RANDOM_GUESS") {
      cfg.random_guess = v;
    }
    if let Some(v) = parse::<u64>(&lookup, "POISSON_SEED") {
      cfg.seed = v;
    }
    cfg
  }
}

#[cfg(test)]
mod test {
  use super::{DomainConfig, RelaxationConfig};

  use std::collections::HashMap;

  #[test]
  fn lookup_overrides_defaults() {
    let vars = HashMap::from([
      ("POISSON_GRID_SIZE", "64"),
      ("POISSON_COMPLEX_DOMAIN", "false"),
      ("POISSON_DELTA_PERCENT", " 0.5 "),
      ("POISSON_RANDOM_GUESS", "0"),
      ("POISSON_MAX_ITERATIONS", "many"),
    ]);
    let lookup = |name: &str| vars.get(name).map(|v| v.to_string());

    let domain = DomainConfig::from_lookup(lookup);
    assert_eq!(domain.grid_size, 64);
    assert!(!domain.complex_domain);
    assert!(domain.solid_sphere);

    let relaxation = RelaxationConfig::from_lookup(lookup);
    assert_eq!(relaxation.delta_percent, 0.5);
    assert!(!relaxation.random_guess);
    assert_eq!(relaxation.max_iterations, 1000);
  }
}
