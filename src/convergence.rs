use crate::{norms::ResidualNorms, util::algebraic_convergence_rate};

/// Residual norms of one smoothing iteration and whether they regressed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationRecord {
  pub iteration: usize,
  pub norms: ResidualNorms,
  pub l_infinity_regressed: bool,
  pub l2_regressed: bool,
}

/// Records the residual history of a smoothing loop.
///
/// A norm that does not strictly decrease is reported with a warning but
/// never stops the loop.
#[derive(Debug, Clone, Default)]
pub struct ConvergenceMonitor {
  history: Vec<IterationRecord>,
  initial: Option<ResidualNorms>,
}

impl ConvergenceMonitor {
  pub fn new() -> Self {
    Self::default()
  }

  /// Norms before the first iteration; the first record is compared to them.
  pub fn with_initial(initial: ResidualNorms) -> Self {
    Self {
      history: Vec::new(),
      initial: Some(initial),
    }
  }

  pub fn history(&self) -> &[IterationRecord] {
    &self.history
  }
  pub fn last(&self) -> Option<&IterationRecord> {
    self.history.last()
  }

  pub fn record(&mut self, norms: ResidualNorms) -> &IterationRecord {
    let iteration = self.history.len();
    let prev = self.history.last().map(|r| r.norms).or(self.initial);

    let (l_infinity_regressed, l2_regressed) = match prev {
      Some(prev) => (
        norms.l_infinity >= prev.l_infinity,
        norms.squared_l2 >= prev.squared_l2,
      ),
      None => (false, false),
    };
    if l_infinity_regressed {
      tracing::warn!(
        "iteration {iteration}: L-infinity residual did not decrease ({:.6e})",
        norms.l_infinity
      );
    }
    if l2_regressed {
      tracing::warn!(
        "iteration {iteration}: L2 residual did not decrease ({:.6e})",
        norms.l2()
      );
    }
    tracing::debug!(
      "iteration {iteration}: L-infinity {:.6e}, L2 {:.6e}",
      norms.l_infinity,
      norms.l2()
    );

    self.history.push(IterationRecord {
      iteration,
      norms,
      l_infinity_regressed,
      l2_regressed,
    });
    &self.history[iteration]
  }

  pub fn nregressions(&self) -> usize {
    self
      .history
      .iter()
      .filter(|r| r.l_infinity_regressed || r.l2_regressed)
      .count()
  }

  /// Fraction of consecutive pairs after `transient` iterations in which the
  /// L-infinity norm did not increase. One if there are no such pairs.
  pub fn non_increasing_fraction(&self, transient: usize) -> f64 {
    let norms: Vec<f64> = self
      .history
      .iter()
      .skip(transient)
      .map(|r| r.norms.l_infinity)
      .collect();
    if norms.len() < 2 {
      return 1.0;
    }
    let npairs = norms.len() - 1;
    let nok = norms.windows(2).filter(|w| w[1] <= w[0]).count();
    nok as f64 / npairs as f64
  }

  /// Mean reduction of the L-infinity norm per iteration, in bits.
  pub fn mean_convergence_rate(&self) -> Option<f64> {
    let first = self.initial.or(self.history.first().map(|r| r.norms))?;
    let last = self.history.last()?.norms;
    let niterations = if self.initial.is_some() {
      self.history.len()
    } else {
      self.history.len() - 1
    };
    if niterations == 0 || first.l_infinity == 0.0 {
      return None;
    }
    Some(algebraic_convergence_rate(last.l_infinity, first.l_infinity) / niterations as f64)
  }
}

#[cfg(test)]
mod test {
  use super::ConvergenceMonitor;
  use crate::norms::ResidualNorms;

  fn norms(l_infinity: f64) -> ResidualNorms {
    ResidualNorms {
      l_infinity,
      squared_l2: l_infinity * l_infinity,
    }
  }

  #[test]
  fn regressions_are_flagged() {
    let mut monitor = ConvergenceMonitor::with_initial(norms(16.0));
    for value in [8.0, 4.0, 4.0, 2.0, 3.0, 1.0] {
      monitor.record(norms(value));
    }
    let flags: Vec<bool> = monitor.history().iter().map(|r| r.l_infinity_regressed).collect();
    assert_eq!(flags, [false, false, true, false, true, false]);
    assert_eq!(monitor.nregressions(), 2);
    assert_eq!(monitor.non_increasing_fraction(0), 4.0 / 5.0);
    assert_eq!(monitor.non_increasing_fraction(4), 1.0);
    assert_eq!(monitor.mean_convergence_rate(), Some(4.0 / 6.0));
  }

  #[test]
  fn first_record_without_initial_norms() {
    let mut monitor = ConvergenceMonitor::new();
    assert_eq!(monitor.mean_convergence_rate(), None);
    let first = *monitor.record(norms(4.0));
    assert!(!first.l_infinity_regressed && !first.l2_regressed);
    monitor.record(norms(1.0));
    assert_eq!(monitor.nregressions(), 0);
    assert_eq!(monitor.mean_convergence_rate(), Some(2.0));
  }
}
