use std::fmt;
use std::ops::Index;

use crate::connector::{Connector, Direction};
use crate::error::LinkError;

/// One way a word can be used: the connectors it must satisfy, plus a cost.
///
/// Both connector lists are stored farthest word first, the order the search
/// consumes them in. `left` holds the `-` connectors, `right` the `+` ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Disjunct {
  /// The dictionary headword this disjunct came from, with its subscript ("runs.v")
  pub word: String,
  pub cost: u32,
  pub left: Vec<Connector>,
  pub right: Vec<Connector>,
}

impl Disjunct {
  pub fn new(word: impl Into<String>, cost: u32) -> Self {
    Self {
      word: word.into(),
      cost,
      left: Vec::new(),
      right: Vec::new(),
    }
  }

  /// Builds a disjunct from connectors written in formula order: `-` connectors
  /// farthest first, then `+` connectors nearest first.
  pub fn from_formula<I>(word: impl Into<String>, cost: u32, connectors: I) -> Self
  where
    I: IntoIterator<Item = Connector>,
  {
    let mut d = Self::new(word, cost);
    for c in connectors {
      match c.direction {
        Direction::Left => d.left.push(c),
        Direction::Right => d.right.insert(0, c),
      }
    }
    d
  }

  /// Parses a whitespace separated formula like `"A- D- S+"`
  pub fn parse(word: impl Into<String>, cost: u32, formula: &str) -> Result<Self, LinkError> {
    let connectors = formula
      .split_whitespace()
      .map(str::parse)
      .collect::<Result<Vec<Connector>, _>>()?;
    Ok(Self::from_formula(word, cost, connectors))
  }

  pub fn is_empty(&self) -> bool {
    self.left.is_empty() && self.right.is_empty()
  }

  /// Rejects disjuncts the search cannot use: untyped connectors, or connectors
  /// filed under the wrong direction
  pub fn check(&self) -> Result<(), LinkError> {
    let malformed = |reason: String| LinkError::MalformedDisjunct {
      word: self.word.clone(),
      reason,
    };

    for (list, direction) in [(&self.left, Direction::Left), (&self.right, Direction::Right)] {
      for c in list {
        c.check().map_err(malformed)?;
        if c.direction != direction {
          return Err(malformed(format!(
            "connector {} is in the {:?} list",
            c, direction
          )));
        }
      }
    }
    Ok(())
  }
}

impl fmt::Display for Disjunct {
  /// Formula order, the way the disjunct would be written in a dictionary
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut first = true;
    for c in self.left.iter().chain(self.right.iter().rev()) {
      if !first {
        write!(f, " ")?;
      }
      write!(f, "{}", c)?;
      first = false;
    }
    Ok(())
  }
}

/// The alternatives for one word, in dictionary order. Immutable once attached to a word.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisjunctSet(Vec<Disjunct>);

impl DisjunctSet {
  pub fn new(disjuncts: Vec<Disjunct>) -> Self {
    Self(disjuncts)
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn iter(&self) -> std::slice::Iter<'_, Disjunct> {
    self.0.iter()
  }

  pub fn get(&self, idx: usize) -> Option<&Disjunct> {
    self.0.get(idx)
  }

  pub fn check(&self) -> Result<(), LinkError> {
    self.0.iter().try_for_each(Disjunct::check)
  }
}

impl Index<usize> for DisjunctSet {
  type Output = Disjunct;

  fn index(&self, idx: usize) -> &Disjunct {
    &self.0[idx]
  }
}

impl From<Vec<Disjunct>> for DisjunctSet {
  fn from(v: Vec<Disjunct>) -> Self {
    Self(v)
  }
}

impl FromIterator<Disjunct> for DisjunctSet {
  fn from_iter<I: IntoIterator<Item = Disjunct>>(iter: I) -> Self {
    Self(iter.into_iter().collect())
  }
}

impl<'a> IntoIterator for &'a DisjunctSet {
  type Item = &'a Disjunct;
  type IntoIter = std::slice::Iter<'a, Disjunct>;

  fn into_iter(self) -> Self::IntoIter {
    self.0.iter()
  }
}

#[test]
fn test_formula_order() {
  let d = Disjunct::parse("dog.n", 0, "A- D- S+ O+").unwrap();
  // farthest first on both sides
  assert_eq!(d.left[0].label, "A");
  assert_eq!(d.left[1].label, "D");
  assert_eq!(d.right[0].label, "O");
  assert_eq!(d.to_string(), "A- D- S+ O+");
}

#[test]
fn test_check_rejects_misfiled_connector() {
  let mut d = Disjunct::parse("x", 0, "S+").unwrap();
  d.left.push(Connector::new("O", Direction::Right));
  assert!(matches!(d.check(), Err(LinkError::MalformedDisjunct { .. })));

  let mut d = Disjunct::new("y", 0);
  d.right.push(Connector::new("", Direction::Right));
  assert!(d.check().is_err());
}
