use std::fmt;
use std::str::FromStr;

use crate::error::LinkError;

pub const WILDCARD: &str = "*";

/// Which way a connector points: `-` links to a word on the left, `+` to a word on the right
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
  Left,
  Right,
}

impl Direction {
  pub fn opposite(self) -> Self {
    match self {
      Self::Left => Self::Right,
      Self::Right => Self::Left,
    }
  }

  pub fn as_char(self) -> char {
    match self {
      Self::Left => '-',
      Self::Right => '+',
    }
  }
}

/// A typed, directed request for a link, such as `Ss+` or `@A-`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Connector {
  /// Type string, without the multi flag and direction
  pub label: String,
  pub direction: Direction,
  /// `@` connectors may link to more than one word
  pub multi: bool,
  /// Limited to `short_length` words when the dictionary declares unlimited connectors
  pub short: bool,
}

impl Connector {
  pub fn new(label: impl Into<String>, direction: Direction) -> Self {
    Self {
      label: label.into(),
      direction,
      multi: false,
      short: false,
    }
  }

  pub fn multi(mut self) -> Self {
    self.multi = true;
    self
  }

  pub fn segments(&self) -> Segments<'_> {
    Segments::new(&self.label)
  }

  /// The upper-case head of the type, `S` for `Ss*b`
  pub fn head(&self) -> &str {
    self.segments().next().unwrap_or("")
  }

  /// Checks the connector is something the search can use
  pub fn check(&self) -> Result<(), String> {
    let mut chars = self.label.chars();
    match chars.next() {
      None => Err("connector with no type".to_string()),
      Some(c) if !c.is_ascii_uppercase() => Err(format!(
        "connector type {:?} must start with an upper-case letter",
        self.label
      )),
      _ => {
        if let Some(bad) = self
          .label
          .chars()
          .find(|c| !(c.is_ascii_alphanumeric() || *c == '*' || *c == '.'))
        {
          Err(format!("bad character {:?} in connector type {:?}", bad, self.label))
        } else {
          Ok(())
        }
      }
    }
  }
}

impl fmt::Display for Connector {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.multi {
      write!(f, "@")?;
    }
    write!(f, "{}{}", self.label, self.direction.as_char())
  }
}

impl FromStr for Connector {
  type Err = LinkError;

  /// Parses `Ds+`, `@A-`, `S.s.p+`
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let malformed = |reason: String| LinkError::MalformedDisjunct {
      word: s.to_string(),
      reason,
    };

    let (multi, rest) = match s.strip_prefix('@') {
      Some(rest) => (true, rest),
      None => (false, s),
    };
    let direction = match rest.chars().last() {
      Some('+') => Direction::Right,
      Some('-') => Direction::Left,
      _ => return Err(malformed("connector has no direction".to_string())),
    };

    let connector = Self {
      label: rest[..rest.len() - 1].to_string(),
      direction,
      multi,
      short: false,
    };
    connector.check().map_err(malformed)?;
    Ok(connector)
  }
}

/// Iterates over the segments of a connector type without allocating.
///
/// Dotted types split on `.`; otherwise the upper-case head is one segment and every
/// following character is another, so `Ds*c` and `D.s.*.c` are the same type.
#[derive(Debug, Clone)]
pub struct Segments<'a> {
  rest: &'a str,
  dotted: bool,
  at_head: bool,
}

impl<'a> Segments<'a> {
  pub fn new(label: &'a str) -> Self {
    Self {
      rest: label,
      dotted: label.contains('.'),
      at_head: true,
    }
  }
}

impl<'a> Iterator for Segments<'a> {
  type Item = &'a str;

  fn next(&mut self) -> Option<&'a str> {
    if self.rest.is_empty() {
      return None;
    }

    let end = if self.dotted {
      self.rest.find('.').unwrap_or(self.rest.len())
    } else if self.at_head {
      match self.rest.find(|c: char| !c.is_ascii_uppercase()) {
        Some(0) => self.rest.chars().next().map_or(0, char::len_utf8),
        Some(idx) => idx,
        None => self.rest.len(),
      }
    } else {
      self.rest.chars().next().map_or(0, char::len_utf8)
    };
    self.at_head = false;

    let (segment, rest) = self.rest.split_at(end);
    self.rest = rest.strip_prefix('.').unwrap_or(rest);
    Some(segment)
  }
}

/// Whether two connector types are compatible: the heads are equal, and every position
/// both types have is equal or a `*`. A shorter type matches any longer one sharing
/// its prefix.
pub fn types_match(a: &str, b: &str) -> bool {
  let mut sa = Segments::new(a);
  let mut sb = Segments::new(b);

  match (sa.next(), sb.next()) {
    (Some(ha), Some(hb)) if ha == hb => {}
    _ => return false,
  }

  loop {
    match (sa.next(), sb.next()) {
      (Some(x), Some(y)) => {
        if x != y && x != WILDCARD && y != WILDCARD {
          return false;
        }
      }
      _ => return true,
    }
  }
}

/// Whether the connector emitted rightward by the left word (`upper`) can link with the
/// one emitted leftward by the right word (`lower`).
pub fn matches(upper: &Connector, lower: &Connector) -> bool {
  upper.direction == Direction::Right
    && lower.direction == Direction::Left
    && types_match(&upper.label, &lower.label)
}

/// Whether a post-processing pattern such as `S` or `Ss*` describes a link label
pub fn label_matches(pattern: &str, label: &str) -> bool {
  types_match(pattern, label)
}

/// The label shown on a link: per position the more specific of the two segments,
/// then whatever remains of the longer type.
pub fn intersect_label(a: &str, b: &str) -> String {
  let dotted = a.contains('.') || b.contains('.');
  let mut sa = Segments::new(a);
  let mut sb = Segments::new(b);
  let mut out = String::with_capacity(a.len().max(b.len()));

  let mut first = true;
  loop {
    let segment = match (sa.next(), sb.next()) {
      (Some(x), Some(y)) => {
        if x == WILDCARD {
          y
        } else {
          x
        }
      }
      (Some(x), None) | (None, Some(x)) => x,
      (None, None) => break,
    };
    if dotted && !first {
      out.push('.');
    }
    out.push_str(segment);
    first = false;
  }

  out
}
