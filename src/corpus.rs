//! Disjunct frequency tables for the corpus cost model.
//!
//! A table file has one count per line, then the headword and the disjunct it used,
//! written in formula order:
//!
//! ```text
//! % counts from a hand-checked treebank
//! 12 runs.v: Ss-
//! 3  runs.v: Sp- Op+
//! ```

use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::error::LinkError;
use crate::utils::Err;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct WordCounts {
  total: u64,
  by_disjunct: HashMap<String, u64>,
}

/// How often each headword was seen with each disjunct
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorpusStats {
  words: HashMap<String, WordCounts>,
}

impl CorpusStats {
  pub fn new() -> Self {
    Default::default()
  }

  pub fn read_from_file(path: impl AsRef<Path>) -> Result<Self, Err> {
    let src = fs::read_to_string(path)?;
    Ok(src.parse()?)
  }

  pub fn add(&mut self, word: &str, disjunct: &str, count: u64) {
    let counts = self.words.entry(word.to_string()).or_default();
    counts.total += count;
    *counts
      .by_disjunct
      .entry(normalize(disjunct))
      .or_default() += count;
  }

  pub fn count(&self, word: &str, disjunct: &str) -> u64 {
    self
      .words
      .get(word)
      .and_then(|c| c.by_disjunct.get(&normalize(disjunct)))
      .copied()
      .unwrap_or(0)
  }

  /// `-ln p(disjunct | word)`, add-one smoothed so unseen pairs get a finite cost
  pub fn cost(&self, word: &str, disjunct: &str) -> f64 {
    let (seen, total, types) = match self.words.get(word) {
      Some(c) => (
        c.by_disjunct.get(&normalize(disjunct)).copied().unwrap_or(0),
        c.total,
        c.by_disjunct.len() as u64,
      ),
      None => (0, 0, 0),
    };
    let p = (seen + 1) as f64 / (total + types + 1) as f64;
    -p.ln()
  }
}

fn normalize(disjunct: &str) -> String {
  disjunct.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl FromStr for CorpusStats {
  type Err = LinkError;

  fn from_str(src: &str) -> Result<Self, LinkError> {
    regex_static!(LINE, r"^(\d+)\s+(\S+):\s*(.*)$");

    let mut stats = CorpusStats::new();
    for (idx, line) in src.lines().enumerate() {
      let line = line.split('%').next().unwrap_or("").trim();
      if line.is_empty() {
        continue;
      }

      let bad = |message: &str| LinkError::Dictionary {
        line: idx + 1,
        message: message.to_string(),
      };
      let caps = LINE
        .captures(line)
        .ok_or_else(|| bad("expected `<count> <word>: <disjunct>`"))?;
      let count = caps[1].parse().map_err(|_| bad("count is too large"))?;
      stats.add(&caps[2], &caps[3], count);
    }
    Ok(stats)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_parse_and_cost() {
    let stats: CorpusStats = r#"
      % toy counts
      8 runs.v: Ss-
      1 runs.v: Sp-   Op+
    "#
    .parse()
    .unwrap();

    assert_eq!(stats.count("runs.v", "Ss-"), 8);
    assert_eq!(stats.count("runs.v", "Sp- Op+"), 1);
    assert_eq!(stats.count("runs.n", "Ss-"), 0);

    // (8 + 1) / (9 + 2 + 1)
    assert!((stats.cost("runs.v", "Ss-") - -(0.75f64).ln()).abs() < 1e-9);
    assert!(stats.cost("runs.v", "Ss-") < stats.cost("runs.v", "Sp- Op+"));
    assert!(stats.cost("runs.v", "Sp- Op+") < stats.cost("runs.v", "Dmu-"));
    assert_eq!(stats.cost("never.seen", "A+"), 0.0);
  }

  #[test]
  fn test_bad_line() {
    let err = "4 runs.v: S-\nlots runs.v: S-".parse::<CorpusStats>().unwrap_err();
    assert!(matches!(err, LinkError::Dictionary { line: 2, .. }));
  }
}
