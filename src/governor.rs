//! Time and memory budgets for a search.
//!
//! The search cannot be preempted in the middle of a subproblem without leaving
//! half-built memo entries behind, so the budget is polled cooperatively: the
//! search calls [`ResourceGovernor::check`] whenever it starts a new sub-span.
//! The clock is only read every [`CLOCK_INTERVAL`] polls, so a search overruns
//! its time budget by at most that many sub-span evaluations. Once a budget is
//! breached the status stays breached.

use std::time::{Duration, Instant};

use crate::options::{ParseOptions, Resources};

pub const CLOCK_INTERVAL: u64 = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
  Continue,
  TimeExpired,
  MemoryExhausted,
}

impl Status {
  pub fn is_exhausted(self) -> bool {
    self != Self::Continue
  }
}

#[derive(Debug)]
pub struct ResourceGovernor {
  started: Instant,
  max_time: Option<Duration>,
  max_memory: Option<usize>,
  polls: u64,
  status: Status,
}

impl ResourceGovernor {
  pub fn new(max_time: Option<Duration>, max_memory: Option<usize>) -> Self {
    Self {
      started: Instant::now(),
      max_time,
      max_memory,
      polls: 0,
      status: Status::Continue,
    }
  }

  pub fn from_options(opts: &ParseOptions) -> Self {
    Self::new(opts.max_parse_time, opts.max_memory)
  }

  /// Polled by the search with the number of bytes its tables currently hold
  pub fn check(&mut self, memory_in_use: usize) -> Status {
    if self.status.is_exhausted() {
      return self.status;
    }

    if let Some(max) = self.max_memory {
      if memory_in_use > max {
        self.status = Status::MemoryExhausted;
        return self.status;
      }
    }

    if let Some(max) = self.max_time {
      if self.polls % CLOCK_INTERVAL == 0 && self.started.elapsed() >= max {
        self.status = Status::TimeExpired;
      }
    }
    self.polls += 1;

    self.status
  }

  pub fn status(&self) -> Status {
    self.status
  }

  pub fn elapsed(&self) -> Duration {
    self.started.elapsed()
  }

  pub fn resources(&self) -> Resources {
    Resources {
      timer_expired: self.status == Status::TimeExpired,
      memory_exhausted: self.status == Status::MemoryExhausted,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_unlimited_never_expires() {
    let mut gov = ResourceGovernor::new(None, None);
    for _ in 0..1000 {
      assert_eq!(gov.check(usize::MAX), Status::Continue);
    }
  }

  #[test]
  fn test_zero_time_expires_on_first_poll() {
    let mut gov = ResourceGovernor::new(Some(Duration::ZERO), None);
    assert_eq!(gov.check(0), Status::TimeExpired);
    assert!(gov.resources().timer_expired);
    assert!(!gov.resources().memory_exhausted);
  }

  #[test]
  fn test_memory_breach_is_sticky() {
    let mut gov = ResourceGovernor::new(None, Some(100));
    assert_eq!(gov.check(50), Status::Continue);
    assert_eq!(gov.check(101), Status::MemoryExhausted);
    assert_eq!(gov.check(0), Status::MemoryExhausted);
    assert!(gov.resources().memory_exhausted);
  }
}
