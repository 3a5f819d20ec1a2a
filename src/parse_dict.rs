//! Simple recursive-descent parsing of link grammar dictionary files
use regex::Regex;
use std::collections::HashMap;

use crate::connector::Connector;
use crate::error::LinkError;

/// A dictionary formula before it is expanded into disjuncts
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
  /// `()`, a use of the word with no connectors
  Empty,
  Connector(Connector),
  /// `<name>`, a reference to an earlier macro definition
  Macro(String),
  /// `a & b`, all of them, in order
  And(Vec<Expr>),
  /// `a or b`, exactly one of them
  Or(Vec<Expr>),
  /// `{a}`, a or nothing
  Optional(Box<Expr>),
  /// `[a]`, a with one more unit of cost
  Cost(Box<Expr>),
}

/// One `names: formula;` definition
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
  pub names: Vec<String>,
  pub expr: Expr,
  pub line: usize,
}

impl Entry {
  pub fn is_macro(&self) -> bool {
    self.names.len() == 1 && self.names[0].starts_with('<')
  }
}

/// A disjunct in formula order with its accumulated cost
pub type Clause = (u32, Vec<Connector>);

pub(crate) struct Failure<'a> {
  pub(crate) at: &'a str,
  pub(crate) message: String,
}

impl<'a> Failure<'a> {
  pub(crate) fn new(at: &'a str, message: impl Into<String>) -> Self {
    Self {
      at,
      message: message.into(),
    }
  }
}

pub(crate) type Infallible<'a, T> = (T, &'a str);
pub(crate) type ParseResult<'a, T> = Result<(T, &'a str), Failure<'a>>;

/// Try to consume a regex, returning None if it doesn't match. Patterns are anchored.
pub(crate) fn optional_re<'a>(re: &'static Regex, s: &'a str) -> Infallible<'a, Option<&'a str>> {
  match re.find(s) {
    Some(m) if m.start() == 0 && m.end() > 0 => {
      let (matched, rest) = s.split_at(m.end());
      (Some(matched), rest)
    }
    _ => (None, s),
  }
}

/// Try to consume a regex, failing if it doesn't match
pub(crate) fn needed_re<'a>(re: &'static Regex, s: &'a str, what: &str) -> ParseResult<'a, &'a str> {
  if let (Some(c), rest) = optional_re(re, s) {
    Ok((c, rest))
  } else {
    Err(Failure::new(s, format!("expected {} at {}", what, snippet(s))))
  }
}

/// Try to consume a char, returning None if it doesn't match
pub(crate) fn optional_char(c: char, s: &str) -> Infallible<'_, Option<char>> {
  match s.strip_prefix(c) {
    Some(rest) => (Some(c), rest),
    None => (None, s),
  }
}

/// Try to consume a char, failing if it doesn't match
pub(crate) fn needed_char(c: char, s: &str) -> ParseResult<'_, char> {
  if let (Some(c), rest) = optional_char(c, s) {
    Ok((c, rest))
  } else {
    Err(Failure::new(s, format!("expected {:?} at {}", c, snippet(s))))
  }
}

/// Skips whitespace and `%` comments
pub(crate) fn skip_whitespace(s: &str) -> &str {
  regex_static!(WHITESPACE_OR_COMMENT, r"^(?:\s+|%[^\n]*)+");
  optional_re(&WHITESPACE_OR_COMMENT, s).1
}

pub(crate) fn snippet(s: &str) -> &str {
  let end = s
    .char_indices()
    .nth(24)
    .map_or(s.len(), |(idx, _)| idx);
  let end = s[..end].find('\n').unwrap_or(end);
  &s[..end]
}

/// Words, subscripted words ("runs.v"), punctuation and `<macro>` names
pub(crate) fn parse_name(s: &str) -> ParseResult<'_, &str> {
  regex_static!(NAME, r"^[^\s:;%]+");
  needed_re(&NAME, s, "a word")
}

fn parse_connector(s: &str) -> ParseResult<'_, Connector> {
  regex_static!(CONNECTOR, r"^@?[A-Z][A-Za-z0-9*.]*[+-]");
  let (text, rest) = needed_re(&CONNECTOR, s, "a connector")?;
  let connector = text
    .parse::<Connector>()
    .map_err(|e| Failure::new(s, e.to_string()))?;
  Ok((connector, rest))
}

fn parse_bracketed(
  s: &str,
  close: char,
  wrap: fn(Box<Expr>) -> Expr,
) -> ParseResult<'_, Expr> {
  let rest = skip_whitespace(s);
  let (expr, rest) = parse_or(rest)?;
  let rest = skip_whitespace(rest);
  let (_, rest) = needed_char(close, rest)?;
  Ok((wrap(Box::new(expr)), rest))
}

fn parse_unary(s: &str) -> ParseResult<'_, Expr> {
  regex_static!(MACRO, r"^<[^<>\s]+>");

  if let (Some(_), rest) = optional_char('(', s) {
    let rest = skip_whitespace(rest);
    if let (Some(_), rest) = optional_char(')', rest) {
      return Ok((Expr::Empty, rest));
    }
    let (expr, rest) = parse_or(rest)?;
    let rest = skip_whitespace(rest);
    let (_, rest) = needed_char(')', rest)?;
    Ok((expr, rest))
  } else if let (Some(_), rest) = optional_char('{', s) {
    parse_bracketed(rest, '}', Expr::Optional)
  } else if let (Some(_), rest) = optional_char('[', s) {
    parse_bracketed(rest, ']', Expr::Cost)
  } else if let (Some(name), rest) = optional_re(&MACRO, s) {
    Ok((Expr::Macro(name.to_string()), rest))
  } else {
    let (c, rest) = parse_connector(s)?;
    Ok((Expr::Connector(c), rest))
  }
}

fn parse_and(s: &str) -> ParseResult<'_, Expr> {
  let (first, mut rem) = parse_unary(s)?;
  let mut items = vec![first];
  loop {
    let rest = skip_whitespace(rem);
    if let (Some(_), rest) = optional_char('&', rest) {
      let (item, rest) = parse_unary(skip_whitespace(rest))?;
      items.push(item);
      rem = rest;
    } else {
      break;
    }
  }

  if items.len() == 1 {
    Ok((items.remove(0), rem))
  } else {
    Ok((Expr::And(items), rem))
  }
}

fn parse_or(s: &str) -> ParseResult<'_, Expr> {
  regex_static!(OR, r"^or\b");

  let (first, mut rem) = parse_and(s)?;
  let mut items = vec![first];
  loop {
    let rest = skip_whitespace(rem);
    if let (Some(_), rest) = optional_re(&OR, rest) {
      let (item, rest) = parse_and(skip_whitespace(rest))?;
      items.push(item);
      rem = rest;
    } else {
      break;
    }
  }

  if items.len() == 1 {
    Ok((items.remove(0), rem))
  } else {
    Ok((Expr::Or(items), rem))
  }
}

/// Names, colon, formula, terminated by a semicolon
fn parse_entry(s: &str) -> ParseResult<'_, (Vec<String>, Expr)> {
  let mut names = Vec::new();
  let mut rem = s;
  loop {
    rem = skip_whitespace(rem);
    if let (Some(_), rest) = optional_char(':', rem) {
      rem = rest;
      break;
    }
    let (name, rest) = parse_name(rem)?;
    names.push(name.to_string());
    rem = rest;
  }

  if names.is_empty() {
    return Err(Failure::new(s, "definition with no words"));
  }
  if names.len() > 1 && names.iter().any(|n| n.starts_with('<')) {
    return Err(Failure::new(s, "a macro must be defined on its own"));
  }

  let rem = skip_whitespace(rem);
  let (expr, rem) = parse_or(rem)?;
  let rem = skip_whitespace(rem);
  let (_, rem) = needed_char(';', rem)?;
  Ok(((names, expr), rem))
}

pub(crate) fn line_of(src: &str, at: &str) -> usize {
  let offset = src.len() - at.len();
  src[..offset].matches('\n').count() + 1
}

/// Parses every definition in a dictionary source
pub fn parse_entries(src: &str) -> Result<Vec<Entry>, LinkError> {
  let mut entries = Vec::new();
  let mut rem = src;
  loop {
    rem = skip_whitespace(rem);
    if rem.is_empty() {
      return Ok(entries);
    }
    let line = line_of(src, rem);
    let ((names, expr), rest) = parse_entry(rem).map_err(|f| LinkError::Dictionary {
      line: line_of(src, f.at),
      message: f.message,
    })?;
    entries.push(Entry { names, expr, line });
    rem = rest;
  }
}

/// Expands a formula into its disjuncts, in formula order. `{a}` lists `a` before the
/// empty alternative, so the dictionary's order is the order the search sees.
pub fn expand(expr: &Expr, macros: &HashMap<String, Vec<Clause>>) -> Result<Vec<Clause>, String> {
  match expr {
    Expr::Empty => Ok(vec![(0, Vec::new())]),
    Expr::Connector(c) => Ok(vec![(0, vec![c.clone()])]),
    Expr::Macro(name) => macros
      .get(name)
      .cloned()
      .ok_or_else(|| format!("macro {} is used before it is defined", name)),
    Expr::Optional(inner) => {
      let mut clauses = expand(inner, macros)?;
      clauses.push((0, Vec::new()));
      Ok(clauses)
    }
    Expr::Cost(inner) => Ok(
      expand(inner, macros)?
        .into_iter()
        .map(|(cost, conns)| (cost + 1, conns))
        .collect(),
    ),
    Expr::Or(items) => {
      let mut clauses = Vec::new();
      for item in items {
        clauses.extend(expand(item, macros)?);
      }
      Ok(clauses)
    }
    Expr::And(items) => {
      let mut acc: Vec<Clause> = vec![(0, Vec::new())];
      for item in items {
        let rhs = expand(item, macros)?;
        acc = acc
          .iter()
          .flat_map(|(lcost, lconns)| {
            rhs.iter().map(move |(rcost, rconns)| {
              let mut conns = lconns.clone();
              conns.extend(rconns.iter().cloned());
              (lcost + rcost, conns)
            })
          })
          .collect();
      }
      Ok(acc)
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn labels(clause: &Clause) -> Vec<String> {
    clause.1.iter().map(|c| c.to_string()).collect()
  }

  #[test]
  fn test_parse_entries() {
    let entries = parse_entries(
      r#"
      % determiners
      the a: D+;
      dog.n cat.n: {@A-} & D- & (S+ or O-);
      <noun>: D- & S+;
    "#,
    )
    .unwrap_or_else(|e| panic!("{}", e));

    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].names, vec!["the", "a"]);
    assert_eq!(entries[0].line, 3);
    assert_eq!(entries[1].names, vec!["dog.n", "cat.n"]);
    assert!(entries[2].is_macro());
  }

  #[test]
  fn test_expand() {
    let entries = parse_entries("x: {@A-} & D- & ([S+] or O-);").unwrap();
    let clauses = expand(&entries[0].expr, &HashMap::new()).unwrap();
    let rendered = clauses
      .iter()
      .map(|c| (c.0, labels(c).join(" ")))
      .collect::<Vec<_>>();

    assert_eq!(
      rendered,
      vec![
        (1, "@A- D- S+".to_string()),
        (0, "@A- D- O-".to_string()),
        (1, "D- S+".to_string()),
        (0, "D- O-".to_string()),
      ]
    );
  }

  #[test]
  fn test_empty_and_macros() {
    let entries = parse_entries("<n>: D- or (); y: <n> & S+;").unwrap();
    let mut macros = HashMap::new();
    macros.insert(
      "<n>".to_string(),
      expand(&entries[0].expr, &macros).unwrap(),
    );
    let clauses = expand(&entries[1].expr, &macros).unwrap();
    assert_eq!(clauses.len(), 2);
    assert_eq!(labels(&clauses[0]), vec!["D-", "S+"]);
    assert_eq!(labels(&clauses[1]), vec!["S+"]);

    assert!(expand(&Expr::Macro("<nope>".to_string()), &macros).is_err());
  }

  #[test]
  fn test_errors_report_line() {
    let err = parse_entries("the: D+;\n\nboy: D- & ;\n").unwrap_err();
    match err {
      LinkError::Dictionary { line, .. } => assert_eq!(line, 3),
      other => panic!("unexpected error {:?}", other),
    }

    assert!(parse_entries("word D+;").is_err());
    assert!(parse_entries("word: D+").is_err());
  }
}
