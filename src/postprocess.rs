//! Post-processing: grouping links into domains and checking rules against them.
//!
//! The search only guarantees that connectors pair up. Many constraints a grammar
//! wants are easier to state over the finished link set, so every candidate linkage
//! is handed to a [`PostProcessor`], which assigns domains and may reject it by
//! naming the rule it breaks.
//!
//! [`RuleSet`] reads a small rule file:
//!
//! ```text
//! % a clause domain opens on every subject link
//! domain s: S SI;
//! % if a domain holds a Wd link it must also hold a subject link
//! contains_one Wd: S SI "Wd without a subject";
//! contains_none S: Op "no plural objects in a clause";
//! ```

use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::connector::label_matches;
use crate::error::LinkError;
use crate::linkage::Link;
use crate::parse_dict::{
  line_of, needed_char, needed_re, optional_re, parse_name, skip_whitespace,
  Failure, ParseResult,
};
use crate::utils::Err;

/// A named group of links, started by one link and holding everything reachable from it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Domain {
  pub name: String,
  /// Index of the link that opened the domain
  pub start: usize,
  /// Indices into the link list, sorted, including `start`
  pub links: Vec<usize>,
}

impl Domain {
  /// The words the domain covers, from its leftmost to its rightmost link end
  pub fn span(&self, links: &[Link]) -> Option<(usize, usize)> {
    let lo = self.links.iter().map(|&i| links[i].lword).min()?;
    let hi = self.links.iter().map(|&i| links[i].rword).max()?;
    Some((lo, hi))
  }

  pub fn contains(&self, link: usize) -> bool {
    self.links.binary_search(&link).is_ok()
  }
}

/// Why a linkage was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
  pub rule: String,
}

impl Violation {
  pub fn new(rule: impl Into<String>) -> Self {
    Self { rule: rule.into() }
  }
}

impl fmt::Display for Violation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.rule)
  }
}

/// Validates candidate linkages. Implementations are shared between sentences, so
/// they must not keep per-linkage state.
pub trait PostProcessor {
  fn domains(&self, _words: &[String], _links: &[Link]) -> Vec<Domain> {
    Vec::new()
  }

  fn validate(&self, words: &[String], links: &[Link], domains: &[Domain]) -> Result<(), Violation>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
  /// Every domain holding the trigger must also hold one of the types
  ContainsOne,
  /// No domain holding the trigger may hold any of the types
  ContainsNone,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
  pub kind: RuleKind,
  pub trigger: String,
  pub types: Vec<String>,
  pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainRule {
  pub name: String,
  /// Link types that open this domain
  pub starts: Vec<String>,
}

/// A rule file's domains and rules
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuleSet {
  pub domains: Vec<DomainRule>,
  pub rules: Vec<Rule>,
}

fn any_matches(patterns: &[String], label: &str) -> bool {
  patterns.iter().any(|p| label_matches(p, label))
}

/// The links reachable from `start`'s right word without passing through its left word
fn reachable(start: usize, links: &[Link]) -> Vec<usize> {
  let root = links[start].lword;
  let mut found: HashSet<usize> = HashSet::new();
  found.insert(start);

  let mut visited: HashSet<usize> = HashSet::new();
  let mut stack = vec![links[start].rword];
  while let Some(word) = stack.pop() {
    if !visited.insert(word) {
      continue;
    }
    for (idx, link) in links.iter().enumerate() {
      let other = if link.lword == word {
        link.rword
      } else if link.rword == word {
        link.lword
      } else {
        continue;
      };
      if other == root {
        continue;
      }
      found.insert(idx);
      stack.push(other);
    }
  }

  let mut found = found.into_iter().collect::<Vec<_>>();
  found.sort_unstable();
  found
}

impl RuleSet {
  pub fn new() -> Self {
    Default::default()
  }

  pub fn read_from_file(path: impl AsRef<Path>) -> Result<Self, Err> {
    let src = fs::read_to_string(path)?;
    Ok(src.parse()?)
  }

  pub fn is_empty(&self) -> bool {
    self.domains.is_empty() && self.rules.is_empty()
  }

  fn check_rule(&self, rule: &Rule, links: &[Link], domains: &[Domain]) -> Result<(), Violation> {
    let everything: Vec<usize> = (0..links.len()).collect();

    for (idx, link) in links.iter().enumerate() {
      if !label_matches(&rule.trigger, &link.label) {
        continue;
      }

      let mut scopes = domains
        .iter()
        .filter(|d| d.contains(idx))
        .map(|d| d.links.as_slice())
        .peekable();
      let scopes: Vec<&[usize]> = if scopes.peek().is_none() {
        vec![everything.as_slice()]
      } else {
        scopes.collect()
      };

      for scope in scopes {
        let found = scope
          .iter()
          .any(|&i| i != idx && any_matches(&rule.types, &links[i].label));
        let ok = match rule.kind {
          RuleKind::ContainsOne => found,
          RuleKind::ContainsNone => !found,
        };
        if !ok {
          return Err(Violation::new(rule.message.clone()));
        }
      }
    }

    Ok(())
  }
}

impl PostProcessor for RuleSet {
  fn domains(&self, _words: &[String], links: &[Link]) -> Vec<Domain> {
    let mut domains = Vec::new();
    for (idx, link) in links.iter().enumerate() {
      for rule in self.domains.iter() {
        if any_matches(&rule.starts, &link.label) {
          domains.push(Domain {
            name: rule.name.clone(),
            start: idx,
            links: reachable(idx, links),
          });
        }
      }
    }
    domains
  }

  fn validate(&self, _words: &[String], links: &[Link], domains: &[Domain]) -> Result<(), Violation> {
    self
      .rules
      .iter()
      .try_for_each(|rule| self.check_rule(rule, links, domains))
  }
}

enum Statement {
  Domain(DomainRule),
  Rule(Rule),
}

fn parse_types(s: &str) -> ParseResult<'_, Vec<String>> {
  regex_static!(LINK_TYPE, r"^[A-Z][A-Za-z0-9*.]*");

  let mut types = Vec::new();
  let mut rem = skip_whitespace(s);
  while let (Some(t), rest) = optional_re(&LINK_TYPE, rem) {
    types.push(t.to_string());
    rem = skip_whitespace(rest);
  }

  if types.is_empty() {
    Err(Failure::new(s, "expected at least one link type"))
  } else {
    Ok((types, rem))
  }
}

fn parse_statement(s: &str) -> ParseResult<'_, Statement> {
  regex_static!(KEYWORD, r"^(domain|contains_one|contains_none)\b");
  regex_static!(MESSAGE, r#"^"[^"\n]*""#);

  let (keyword, rest) = needed_re(&KEYWORD, s, "domain, contains_one or contains_none")?;
  let (name, rest) = parse_name(skip_whitespace(rest))?;
  let (_, rest) = needed_char(':', skip_whitespace(rest))?;
  let (types, rest) = parse_types(rest)?;

  let (statement, rest) = if keyword == "domain" {
    let rule = DomainRule {
      name: name.to_string(),
      starts: types,
    };
    (Statement::Domain(rule), rest)
  } else {
    let (message, rest) = needed_re(&MESSAGE, rest, "a quoted message")?;
    let kind = if keyword == "contains_one" {
      RuleKind::ContainsOne
    } else {
      RuleKind::ContainsNone
    };
    let rule = Rule {
      kind,
      trigger: name.to_string(),
      types,
      message: message.trim_matches('"').to_string(),
    };
    (Statement::Rule(rule), rest)
  };

  let (_, rest) = needed_char(';', skip_whitespace(rest))?;
  Ok((statement, rest))
}

impl FromStr for RuleSet {
  type Err = LinkError;

  fn from_str(src: &str) -> Result<Self, LinkError> {
    let mut set = RuleSet::new();
    let mut rem = skip_whitespace(src);
    while !rem.is_empty() {
      let (statement, rest) = parse_statement(rem).map_err(|f| LinkError::Rules {
        line: line_of(src, f.at),
        message: f.message,
      })?;
      match statement {
        Statement::Domain(d) => set.domains.push(d),
        Statement::Rule(r) => set.rules.push(r),
      }
      rem = skip_whitespace(rest);
    }
    Ok(set)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn link(lword: usize, rword: usize, label: &str) -> Link {
    Link::new(lword, rword, label, label, label)
  }

  const RULES: &str = r#"
    % clause domains
    domain s: S;
    contains_one Wd: S "Wd without a subject";
    contains_none S: Op "no plural objects in a clause";
  "#;

  #[test]
  fn test_parse_rules() {
    let rules: RuleSet = RULES.parse().unwrap();
    assert_eq!(rules.domains.len(), 1);
    assert_eq!(rules.domains[0].starts, vec!["S"]);
    assert_eq!(rules.rules.len(), 2);
    assert_eq!(rules.rules[0].kind, RuleKind::ContainsOne);
    assert_eq!(rules.rules[0].message, "Wd without a subject");
    assert_eq!(rules.rules[1].types, vec!["Op"]);

    let err = "domain s S;".parse::<RuleSet>().unwrap_err();
    assert!(matches!(err, LinkError::Rules { line: 1, .. }));
    let err = "\n\ncontains_one Wd: S;".parse::<RuleSet>().unwrap_err();
    assert!(matches!(err, LinkError::Rules { line: 3, .. }));
  }

  #[test]
  fn test_domains_stop_at_the_left_word() {
    let rules: RuleSet = RULES.parse().unwrap();
    let words = Vec::new();
    // LEFT-WALL(0) -Wd- boy(1) -S- runs(2) -O- home(3)
    let links = vec![link(0, 1, "Wd"), link(1, 2, "Ss"), link(2, 3, "Ox")];

    let domains = rules.domains(&words, &links);
    assert_eq!(domains.len(), 1);
    assert_eq!(domains[0].name, "s");
    assert_eq!(domains[0].links, vec![1, 2]);
    assert_eq!(domains[0].span(&links), Some((1, 3)));
  }

  #[test]
  fn test_validate() {
    let rules: RuleSet = RULES.parse().unwrap();
    let words = Vec::new();

    let links = vec![link(0, 1, "Wd"), link(1, 2, "Ss")];
    let domains = rules.domains(&words, &links);
    assert_eq!(rules.validate(&words, &links, &domains), Ok(()));

    let links = vec![link(0, 1, "Wd"), link(1, 2, "D")];
    let domains = rules.domains(&words, &links);
    assert_eq!(
      rules.validate(&words, &links, &domains),
      Err(Violation::new("Wd without a subject"))
    );

    let links = vec![link(0, 1, "Wd"), link(1, 2, "Ss"), link(2, 3, "Op")];
    let domains = rules.domains(&words, &links);
    assert_eq!(
      rules.validate(&words, &links, &domains).unwrap_err().rule,
      "no plural objects in a clause"
    );
  }
}
