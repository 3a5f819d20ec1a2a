use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::connector::{types_match, Connector};
use crate::disjunct::{Disjunct, DisjunctSet};
use crate::error::{LinkError, Result};
use crate::parse_dict::{expand, parse_entries, Clause};
use crate::postprocess::PostProcessor;
use crate::utils::Err;

#[cfg(feature = "corpus")]
use crate::corpus::CorpusStats;

pub const LEFT_WALL: &str = "LEFT-WALL";
pub const RIGHT_WALL: &str = "RIGHT-WALL";
pub const UNKNOWN_WORD: &str = "UNKNOWN-WORD";
pub const UNLIMITED_CONNECTORS: &str = "UNLIMITED-CONNECTORS";

/// What the parser needs from a dictionary: the disjuncts for each spelling, the walls,
/// and optionally a spell guesser, a post-processor, and corpus statistics.
pub trait Lexicon {
  /// All the disjuncts a spelling may use, possibly none
  fn lookup(&self, word: &str) -> DisjunctSet;

  fn left_wall(&self) -> Option<DisjunctSet>;

  fn right_wall(&self) -> Option<DisjunctSet>;

  fn spell_guessing_available(&self) -> bool {
    false
  }

  /// Guesses disjuncts for a word the dictionary doesn't know
  fn guess(&self, _word: &str) -> Result<DisjunctSet> {
    Err(LinkError::SpellGuessingUnavailable)
  }

  fn post_processor(&self) -> Option<&dyn PostProcessor> {
    None
  }

  #[cfg(feature = "corpus")]
  fn corpus(&self) -> Option<&CorpusStats> {
    None
  }
}

/// A lexicon read from link grammar style dictionary text.
///
/// ```text
/// LEFT-WALL: Wd+;
/// the a: D+;
/// dog.n cat.n: {@A-} & D- & (S+ or O-);
/// ```
///
/// `-` connectors are written farthest word first and `+` connectors nearest word
/// first. `{x}` is optional, `[x]` costs one more, `()` is the empty formula and
/// `<name>: ...;` defines a macro usable in later formulas.
#[derive(Default)]
pub struct Dictionary {
  /// Headword ("runs.v") to disjuncts
  entries: HashMap<String, Vec<Disjunct>>,
  /// Bare spelling ("runs") to headwords, in definition order
  spellings: HashMap<String, Vec<String>>,
  max_cost: u32,
  post_processor: Option<Box<dyn PostProcessor + Send + Sync>>,
  #[cfg(feature = "corpus")]
  corpus: Option<CorpusStats>,
}

impl std::fmt::Debug for Dictionary {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Dictionary")
      .field("words", &self.entries.len())
      .field("max_cost", &self.max_cost)
      .field("post_processor", &self.post_processor.is_some())
      .finish()
  }
}

/// "runs.v" -> ("runs", Some("v")). A lone "." or a trailing dot is not a subscript.
pub fn split_subscript(word: &str) -> (&str, Option<&str>) {
  match word.rsplit_once('.') {
    Some((base, sub)) if !base.is_empty() && !sub.is_empty() => (base, Some(sub)),
    _ => (word, None),
  }
}

impl Dictionary {
  pub fn new() -> Self {
    Default::default()
  }

  pub fn read_from_file(path: impl AsRef<Path>) -> std::result::Result<Self, Err> {
    let src = fs::read_to_string(path)?;
    Ok(src.parse()?)
  }

  pub fn with_post_processor(mut self, pp: impl PostProcessor + Send + Sync + 'static) -> Self {
    self.post_processor = Some(Box::new(pp));
    self
  }

  #[cfg(feature = "corpus")]
  pub fn with_corpus(mut self, corpus: CorpusStats) -> Self {
    self.corpus = Some(corpus);
    self
  }

  /// Adds disjuncts for a headword, after any it already has
  pub fn add(&mut self, headword: &str, disjuncts: impl IntoIterator<Item = Disjunct>) {
    let list = self.entries.entry(headword.to_string()).or_default();
    let was_new = list.is_empty();
    for d in disjuncts {
      self.max_cost = self.max_cost.max(d.cost);
      list.push(d);
    }

    if was_new {
      let (base, _) = split_subscript(headword);
      self
        .spellings
        .entry(base.to_string())
        .or_default()
        .push(headword.to_string());
    }
  }

  /// The most expensive disjunct in the dictionary
  pub fn max_cost(&self) -> u32 {
    self.max_cost
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn contains(&self, word: &str) -> bool {
    self.spellings.contains_key(word) || self.entries.contains_key(word)
  }

  fn collect(&self, word: &str) -> Vec<Disjunct> {
    if let Some(exact) = self.entries.get(word) {
      if split_subscript(word).1.is_some() {
        return exact.clone();
      }
    }

    self
      .spellings
      .get(word)
      .into_iter()
      .flatten()
      .filter_map(|headword| self.entries.get(headword))
      .flatten()
      .cloned()
      .collect()
  }

  fn entry_set(&self, headword: &str) -> Option<DisjunctSet> {
    self
      .entries
      .get(headword)
      .map(|ds| ds.iter().cloned().collect())
  }

  /// Marks every connector not covered by `UNLIMITED-CONNECTORS` as short
  fn apply_unlimited(&mut self, unlimited: &HashSet<String>) {
    for disjuncts in self.entries.values_mut() {
      for d in disjuncts.iter_mut() {
        for c in d.left.iter_mut().chain(d.right.iter_mut()) {
          c.short = !unlimited.iter().any(|u| types_match(u, &c.label));
        }
      }
    }
  }
}

impl Lexicon for Dictionary {
  /// Tries the spelling, then its lower-case form, then the `UNKNOWN-WORD` entry
  fn lookup(&self, word: &str) -> DisjunctSet {
    let found = self.collect(word);
    if !found.is_empty() {
      return found.into();
    }

    let lower = word.to_lowercase();
    if lower != word {
      let found = self.collect(&lower);
      if !found.is_empty() {
        return found.into();
      }
    }

    match self.entries.get(UNKNOWN_WORD) {
      Some(unknown) => unknown
        .iter()
        .map(|d| Disjunct {
          word: format!("{}[?]", word),
          ..d.clone()
        })
        .collect(),
      None => DisjunctSet::default(),
    }
  }

  fn left_wall(&self) -> Option<DisjunctSet> {
    self.entry_set(LEFT_WALL)
  }

  fn right_wall(&self) -> Option<DisjunctSet> {
    self.entry_set(RIGHT_WALL)
  }

  fn post_processor(&self) -> Option<&dyn PostProcessor> {
    match &self.post_processor {
      Some(pp) => Some(pp.as_ref()),
      None => None,
    }
  }

  #[cfg(feature = "corpus")]
  fn corpus(&self) -> Option<&CorpusStats> {
    self.corpus.as_ref()
  }
}

impl FromStr for Dictionary {
  type Err = LinkError;

  fn from_str(s: &str) -> Result<Self> {
    let mut dict = Dictionary::new();
    let mut macros: HashMap<String, Vec<Clause>> = HashMap::new();
    let mut unlimited: Option<HashSet<String>> = None;

    for entry in parse_entries(s)? {
      let clauses = expand(&entry.expr, &macros).map_err(|message| LinkError::Dictionary {
        line: entry.line,
        message,
      })?;

      if entry.is_macro() {
        macros.insert(entry.names[0].clone(), clauses);
        continue;
      }

      for name in entry.names.iter() {
        if name == UNLIMITED_CONNECTORS {
          let set = unlimited.get_or_insert_with(HashSet::new);
          set.extend(
            clauses
              .iter()
              .flat_map(|(_, conns)| conns.iter().map(|c: &Connector| c.label.clone())),
          );
          continue;
        }

        dict.add(
          name,
          clauses
            .iter()
            .map(|(cost, conns)| Disjunct::from_formula(name.as_str(), *cost, conns.iter().cloned())),
        );
      }
    }

    if let Some(unlimited) = unlimited {
      dict.apply_unlimited(&unlimited);
    }

    Ok(dict)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const TOY: &str = r#"
    LEFT-WALL: Wd+;
    RIGHT-WALL: RW-;
    UNKNOWN-WORD: D- & S+;
    the: D+;
    runs.v: S-;
    runs.n: D- & [S+];
    Mr.: G+;
  "#;

  #[test]
  fn test_lookup() {
    let dict: Dictionary = TOY.parse().unwrap();

    let runs = dict.lookup("runs");
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].word, "runs.v");
    assert_eq!(runs[1].word, "runs.n");
    assert_eq!(runs[1].cost, 1);

    assert_eq!(dict.lookup("runs.n").len(), 1);
    assert_eq!(dict.lookup("The").len(), 1);
    assert_eq!(dict.lookup("Mr.").len(), 1);

    let unknown = dict.lookup("blorp");
    assert_eq!(unknown.len(), 1);
    assert_eq!(unknown[0].word, "blorp[?]");

    assert_eq!(dict.max_cost(), 1);
    assert!(dict.left_wall().is_some());
    assert!(!dict.spell_guessing_available());
    assert_eq!(dict.guess("blorp"), Err(LinkError::SpellGuessingUnavailable));
  }

  #[test]
  fn test_no_unknown_word_entry() {
    let dict: Dictionary = "the: D+;".parse().unwrap();
    assert!(dict.lookup("blorp").is_empty());
    assert!(dict.left_wall().is_none());
  }

  #[test]
  fn test_unlimited_connectors() {
    let dict: Dictionary = r#"
      UNLIMITED-CONNECTORS: S+ & Xp+;
      a: S+ & D+;
    "#
    .parse()
    .unwrap();

    let a = dict.lookup("a");
    // farthest first: D+ then S+
    assert!(a[0].right[0].short);
    assert!(!a[0].right[1].short);
    assert!(!dict.contains(UNLIMITED_CONNECTORS));
  }

  #[test]
  fn test_split_subscript() {
    assert_eq!(split_subscript("runs.v"), ("runs", Some("v")));
    assert_eq!(split_subscript("."), (".", None));
    assert_eq!(split_subscript("Mr."), ("Mr.", None));
    assert_eq!(split_subscript("LEFT-WALL"), ("LEFT-WALL", None));
  }
}
