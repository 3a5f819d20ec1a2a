use regex::Regex;
use std::collections::HashSet;
use std::fmt;

use crate::connector::{intersect_label, Segments};
use crate::constituents::ConstituentTree;
use crate::cost::{link_cost, LinkageCost};
use crate::error::{LinkError, Result};
use crate::postprocess::{Domain, PostProcessor};
use crate::search::Candidate;
use crate::utils::combinations;

/// An edge between two words of a linkage
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Link {
  /// Always less than `rword`. Word indices count the walls.
  pub lword: usize,
  pub rword: usize,
  /// The label shown to users, the more specific of the two connector types
  pub label: String,
  /// Type of the connector the left word emitted
  pub llabel: String,
  pub rlabel: String,
  /// Names of the domains this link belongs to, in the order they were found
  pub domains: Vec<String>,
}

impl Link {
  pub fn new(
    lword: usize,
    rword: usize,
    label: impl Into<String>,
    llabel: impl Into<String>,
    rlabel: impl Into<String>,
  ) -> Self {
    Self {
      lword,
      rword,
      label: label.into(),
      llabel: llabel.into(),
      rlabel: rlabel.into(),
      domains: Vec::new(),
    }
  }

  pub fn length(&self) -> usize {
    self.rword - self.lword
  }

  fn same_edge(&self, other: &Link) -> bool {
    self.lword == other.lword && self.rword == other.rword && self.label == other.label
  }
}

impl fmt::Display for Link {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{}-{}: {} ({} {})",
      self.lword, self.rword, self.label, self.llabel, self.rlabel
    )
  }
}

/// Left word ascending, then right word descending, so enclosing links come first
fn sort_links(links: &mut [Link]) {
  links.sort_by(|a, b| a.lword.cmp(&b.lword).then(b.rword.cmp(&a.rword)));
}

/// One simultaneous link set of a linkage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sublinkage {
  pub links: Vec<Link>,
  pub domains: Vec<Domain>,
}

impl Sublinkage {
  fn new(mut links: Vec<Link>) -> Self {
    sort_links(&mut links);
    links.dedup_by(|a, b| a.same_edge(b));
    Self {
      links,
      domains: Vec::new(),
    }
  }

  /// Runs the post-processor's domain pass and records domain names on the links
  fn assign_domains(&mut self, words: &[String], pp: &dyn PostProcessor) {
    self.domains = pp.domains(words, &self.links);
    for domain in self.domains.iter() {
      for &idx in domain.links.iter() {
        let names = &mut self.links[idx].domains;
        if !names.contains(&domain.name) {
          names.push(domain.name.clone());
        }
      }
    }
  }

  /// Two domains whose word spans overlap without one containing the other
  fn has_crossing_domains(&self) -> bool {
    let spans = self
      .domains
      .iter()
      .filter_map(|d| d.span(&self.links))
      .collect::<Vec<_>>();
    spans.iter().enumerate().any(|(i, a)| {
      spans[i + 1..]
        .iter()
        .any(|b| (a.0 < b.0 && b.0 < a.1 && a.1 < b.1) || (b.0 < a.0 && a.0 < b.1 && b.1 < a.1))
    })
  }
}

/// A conjunction word with the links to its left and right conjuncts
#[derive(Debug, Clone, Copy)]
struct Conjunction {
  word: usize,
  left: usize,
  right: usize,
}

/// `SJl`, `MJr` and friends: the head ends in `J` and the first subscript names the side
fn is_conjunct(label: &str, side: &str) -> bool {
  let mut segments = Segments::new(label);
  matches!(
    (segments.next(), segments.next()),
    (Some(head), Some(sub)) if head.ends_with('J') && sub == side
  )
}

fn find_conjunctions(links: &[Link]) -> Vec<Conjunction> {
  let mut found: Vec<Conjunction> = Vec::new();
  for (left, l) in links.iter().enumerate() {
    let word = l.rword;
    if !is_conjunct(&l.label, "l") || found.iter().any(|c| c.word == word) {
      continue;
    }
    if let Some(right) = links
      .iter()
      .position(|r| r.lword == word && is_conjunct(&r.label, "r"))
    {
      found.push(Conjunction { word, left, right });
    }
  }
  found
}

/// Splits a conjoined link set into one link set per choice of conjunct. In each, the
/// conjunction's other links are moved onto the chosen conjunct. Returns whether a
/// link had to be dropped because moving it left nothing sensible.
fn split_conjunctions(links: &[Link], conjunctions: &[Conjunction]) -> (Vec<Vec<Link>>, bool) {
  if conjunctions.is_empty() {
    return (vec![links.to_vec()], false);
  }

  let conjunct_links: HashSet<usize> = conjunctions
    .iter()
    .flat_map(|c| [c.left, c.right])
    .collect();
  let choices = conjunctions
    .iter()
    .map(|c| vec![links[c.left].lword, links[c.right].rword])
    .collect::<Vec<_>>();

  let mut improper = false;
  let mut sets = Vec::new();
  for targets in combinations(&choices) {
    let mut set = Vec::with_capacity(links.len());
    for (idx, link) in links.iter().enumerate() {
      if conjunct_links.contains(&idx) {
        continue;
      }
      let mut link = link.clone();
      for (c, &target) in conjunctions.iter().zip(targets.iter()) {
        if link.lword == c.word {
          link.lword = target;
        }
        if link.rword == c.word {
          link.rword = target;
        }
      }
      if link.lword < link.rword {
        set.push(link);
      } else {
        improper = true;
      }
    }
    sets.push(set);
  }

  (sets, improper)
}

/// One complete parse of a sentence.
///
/// Most linkages have a single sublinkage. Each conjunction doubles the count: one
/// sublinkage per choice of conjunct.
#[derive(Debug, Clone)]
pub struct Linkage {
  words: Vec<String>,
  disjuncts: Vec<Option<String>>,
  sublinkages: Vec<Sublinkage>,
  current: usize,
  conjunctions: usize,
  unioned: bool,
  cost: LinkageCost,
  violation: Option<String>,
  canonical: bool,
  improper: bool,
  inconsistent_domains: bool,
}

impl Linkage {
  /// Builds a linkage from a search candidate, splitting conjunctions and running the
  /// post-processor over every sublinkage
  pub(crate) fn from_candidate(
    spellings: &[String],
    candidate: &Candidate<'_>,
    pp: Option<&dyn PostProcessor>,
  ) -> Self {
    let words = spellings
      .iter()
      .enumerate()
      .map(|(i, spelling)| match candidate.chosen[i] {
        _ if candidate.null[i] => format!("[{}]", spelling),
        Some(d) => d.word.clone(),
        None => spelling.clone(),
      })
      .collect::<Vec<_>>();
    let disjuncts = candidate
      .chosen
      .iter()
      .map(|d| d.map(|d| d.to_string()))
      .collect();

    let links = candidate
      .links
      .iter()
      .map(|p| {
        Link::new(
          p.lword,
          p.rword,
          intersect_label(&p.left.label, &p.right.label),
          p.left.label.as_str(),
          p.right.label.as_str(),
        )
      })
      .collect::<Vec<_>>();

    let conjunctions = find_conjunctions(&links);
    let and_cost = conjunctions
      .iter()
      .map(|c| links[c.left].length().abs_diff(links[c.right].length()))
      .sum();
    let (sets, improper) = split_conjunctions(&links, &conjunctions);

    let mut sublinkages = sets.into_iter().map(Sublinkage::new).collect::<Vec<_>>();
    let mut violation = None;
    if let Some(pp) = pp {
      for sub in sublinkages.iter_mut() {
        sub.assign_domains(&words, pp);
        if violation.is_none() {
          if let Err(v) = pp.validate(&words, &sub.links, &sub.domains) {
            violation = Some(v.rule);
          }
        }
      }
    }
    let inconsistent_domains = sublinkages.iter().any(Sublinkage::has_crossing_domains);

    let cost = LinkageCost {
      unused_word_cost: candidate.null.iter().filter(|&&n| n).count(),
      disjunct_cost: candidate.disjunct_cost(),
      and_cost,
      link_cost: link_cost(words.len(), &links),
      ..Default::default()
    };

    Self {
      words,
      disjuncts,
      sublinkages,
      current: 0,
      conjunctions: conjunctions.len(),
      unioned: false,
      cost,
      violation,
      canonical: true,
      improper,
      inconsistent_domains,
    }
  }

  pub fn num_words(&self) -> usize {
    self.words.len()
  }

  /// The words as used: headwords with subscripts ("runs.v"), null words in brackets
  pub fn words(&self) -> &[String] {
    &self.words
  }

  pub fn word(&self, idx: usize) -> Result<&str> {
    self
      .words
      .get(idx)
      .map(String::as_str)
      .ok_or_else(|| LinkError::out_of_range("word", idx, self.words.len()))
  }

  /// The disjunct a word used, in formula order, or `None` for a null word
  pub fn disjunct(&self, idx: usize) -> Result<Option<&str>> {
    self
      .disjuncts
      .get(idx)
      .map(Option::as_deref)
      .ok_or_else(|| LinkError::out_of_range("word", idx, self.disjuncts.len()))
  }

  pub fn num_sublinkages(&self) -> usize {
    self.sublinkages.len()
  }

  pub fn current_sublinkage(&self) -> usize {
    self.current
  }

  pub fn set_current_sublinkage(&mut self, idx: usize) -> Result<()> {
    if idx >= self.sublinkages.len() {
      return Err(LinkError::out_of_range(
        "sublinkage",
        idx,
        self.sublinkages.len(),
      ));
    }
    self.current = idx;
    Ok(())
  }

  pub fn sublinkage(&self) -> &Sublinkage {
    &self.sublinkages[self.current]
  }

  /// Links of the current sublinkage
  pub fn links(&self) -> &[Link] {
    &self.sublinkage().links
  }

  pub fn num_links(&self) -> usize {
    self.links().len()
  }

  pub fn link(&self, idx: usize) -> Result<&Link> {
    let links = self.links();
    links
      .get(idx)
      .ok_or_else(|| LinkError::out_of_range("link", idx, links.len()))
  }

  pub fn domains(&self) -> &[Domain] {
    &self.sublinkage().domains
  }

  /// Adds a sublinkage holding every link of the others. Returns false, changing
  /// nothing, when there is no conjunction or the union was already added.
  pub fn compute_union(&mut self) -> bool {
    if self.conjunctions == 0 || self.unioned {
      return false;
    }

    let mut links: Vec<Link> = Vec::new();
    for link in self.sublinkages.iter().flat_map(|s| s.links.iter()) {
      match links.iter_mut().find(|l| l.same_edge(link)) {
        Some(existing) => {
          for name in link.domains.iter() {
            if !existing.domains.contains(name) {
              existing.domains.push(name.clone());
            }
          }
        }
        None => links.push(link.clone()),
      }
    }

    self.sublinkages.push(Sublinkage::new(links));
    self.unioned = true;
    true
  }

  pub fn costs(&self) -> &LinkageCost {
    &self.cost
  }

  #[cfg(feature = "corpus")]
  pub(crate) fn costs_mut(&mut self) -> &mut LinkageCost {
    &mut self.cost
  }

  pub fn unused_word_cost(&self) -> usize {
    self.cost.unused_word_cost
  }

  pub fn disjunct_cost(&self) -> u32 {
    self.cost.disjunct_cost
  }

  pub fn and_cost(&self) -> usize {
    self.cost.and_cost
  }

  pub fn link_cost(&self) -> usize {
    self.cost.link_cost
  }

  /// The message of the first post-processing rule the linkage breaks
  pub fn violation_name(&self) -> Option<&str> {
    self.violation.as_deref()
  }

  pub fn is_valid(&self) -> bool {
    self.violation.is_none()
  }

  /// False when an earlier linkage of the same sentence has exactly the same links
  pub fn is_canonical(&self) -> bool {
    self.canonical
  }

  pub(crate) fn set_canonical(&mut self, canonical: bool) {
    self.canonical = canonical;
  }

  /// A conjunction could not be split cleanly and some link was dropped
  pub fn is_improper(&self) -> bool {
    self.improper
  }

  pub fn has_inconsistent_domains(&self) -> bool {
    self.inconsistent_domains
  }

  /// Every link of every sublinkage, for comparing linkages with each other
  pub(crate) fn link_set(&self) -> HashSet<(usize, usize, &str)> {
    self
      .sublinkages
      .iter()
      .flat_map(|s| s.links.iter())
      .map(|l| (l.lword, l.rword, l.label.as_str()))
      .collect()
  }

  /// The current sublinkage's domains as a tree of constituents
  pub fn constituent_tree(&self) -> ConstituentTree {
    let sub = self.sublinkage();
    let spans = sub
      .domains
      .iter()
      .filter_map(|d| Some((d.name.to_uppercase(), d.span(&sub.links)?)))
      .collect::<Vec<_>>();
    ConstituentTree::build(&self.words, &spans)
  }

  /// The main verb: the left end of an object-like link, else the right end of a subject link
  pub fn verb(&self) -> Option<&str> {
    self.verb_with_subscript().map(strip_subscript)
  }

  /// [`Linkage::verb`] as the dictionary spells it, "runs.v"
  pub fn verb_with_subscript(&self) -> Option<&str> {
    regex_static!(OBJECT_LIKE, r"^(O([DFNTX]?)|P|BI|K|LI|MV|Q)[a-z*]*");
    regex_static!(SUBJECT_LIKE, r"^(SI|S|AF)[a-z*]*");

    let links = self.links();
    let word = if let Some(link) = links.iter().find(|l| OBJECT_LIKE.is_match(&l.llabel)) {
      link.lword
    } else {
      links.iter().find(|l| SUBJECT_LIKE.is_match(&l.rlabel))?.rword
    };
    Some(self.words[word].as_str())
  }

  pub fn subject(&self) -> Option<&str> {
    self.subject_with_subscript().map(strip_subscript)
  }

  pub fn subject_with_subscript(&self) -> Option<&str> {
    let link = self.links().iter().find(|l| l.llabel.starts_with('S'))?;
    Some(self.words[link.lword].as_str())
  }

  pub fn object(&self) -> Option<&str> {
    self.object_with_subscript().map(strip_subscript)
  }

  pub fn object_with_subscript(&self) -> Option<&str> {
    let link = self.links().iter().find(|l| l.rlabel.starts_with('O'))?;
    Some(self.words[link.rword].as_str())
  }

  /// Every linked word with a `.n` subscript, once each, in link order
  pub fn nouns(&self) -> Vec<&str> {
    regex_static!(NOUN, r"^(.*)\.n(?:-\w)?$");

    let mut nouns: Vec<&str> = Vec::new();
    for link in self.links() {
      for &idx in [link.lword, link.rword].iter() {
        if let Some(noun) = NOUN.captures(&self.words[idx]).and_then(|c| c.get(1)) {
          if !nouns.contains(&noun.as_str()) {
            nouns.push(noun.as_str());
          }
        }
      }
    }
    nouns
  }

  /// A `Wi` link to a verb marks an imperative
  pub fn is_imperative(&self) -> bool {
    self
      .links()
      .iter()
      .any(|l| l.label == "Wi" && self.words[l.rword].ends_with(".v"))
  }
}

/// "runs.v" -> "runs"
fn strip_subscript(word: &str) -> &str {
  regex_static!(SUBSCRIPT, r"\.[\p{Alphabetic}\-]+$");
  match SUBSCRIPT.find(word) {
    Some(m) if m.start() > 0 => &word[..m.start()],
    _ => word,
  }
}

impl fmt::Display for Linkage {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "{}", self.words.join(" "))?;
    for link in self.links() {
      write!(
        f,
        "  {} -{}- {}",
        self.words[link.lword], link.label, self.words[link.rword]
      )?;
      if !link.domains.is_empty() {
        write!(f, "  ({})", link.domains.join(" "))?;
      }
      writeln!(f)?;
    }
    write!(f, "{}", self.cost)?;
    if let Some(v) = &self.violation {
      write!(f, " violation: {}", v)?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::disjunct::Disjunct;
  use crate::postprocess::RuleSet;
  use crate::search::Pairing;

  fn candidate<'a>(
    disjuncts: &'a [Disjunct],
    pairs: &[(usize, usize, usize, usize)],
  ) -> Candidate<'a> {
    // (lword, rword, connector offset on the left word, on the right word)
    let links = pairs
      .iter()
      .map(|&(l, r, lc, rc)| Pairing {
        lword: l,
        rword: r,
        left: &disjuncts[l].right[lc],
        right: &disjuncts[r].left[rc],
      })
      .collect();
    Candidate {
      chosen: disjuncts.iter().map(Some).collect(),
      null: vec![false; disjuncts.len()],
      links,
    }
  }

  fn spellings(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
  }

  /// LEFT-WALL cats and dogs run.v
  fn conjoined() -> Vec<Disjunct> {
    vec![
      Disjunct::parse("LEFT-WALL", 0, "Wd+").unwrap(),
      Disjunct::parse("cats.n", 0, "SJl+").unwrap(),
      Disjunct::parse("and", 0, "Wd- SJl- SJr+ Sp+").unwrap(),
      Disjunct::parse("dogs.n", 0, "SJr-").unwrap(),
      Disjunct::parse("run.v", 0, "Sp-").unwrap(),
    ]
  }

  fn conjoined_linkage(disjuncts: &[Disjunct]) -> Linkage {
    // and's right list is farthest first: Sp (to run), then SJr (to dogs)
    let c = candidate(
      disjuncts,
      &[(0, 2, 0, 0), (1, 2, 0, 1), (2, 4, 0, 0), (2, 3, 1, 0)],
    );
    let words = spellings(&["LEFT-WALL", "cats", "and", "dogs", "run"]);
    Linkage::from_candidate(&words, &c, None)
  }

  #[test]
  fn test_single_sublinkage() {
    let disjuncts = vec![
      Disjunct::parse("LEFT-WALL", 0, "Wd+").unwrap(),
      Disjunct::parse("dog.n", 1, "Wd- Ss+").unwrap(),
      Disjunct::parse("runs.v", 0, "Ss-").unwrap(),
    ];
    let c = candidate(&disjuncts, &[(0, 1, 0, 0), (1, 2, 0, 0)]);
    let mut linkage = Linkage::from_candidate(&spellings(&["LEFT-WALL", "dog", "runs"]), &c, None);

    assert_eq!(linkage.words(), &["LEFT-WALL", "dog.n", "runs.v"]);
    assert_eq!(linkage.num_sublinkages(), 1);
    assert_eq!(linkage.num_links(), 2);
    assert_eq!(linkage.link(1).unwrap().label, "Ss");
    assert_eq!(linkage.disjunct(1).unwrap(), Some("Wd- Ss+"));
    assert_eq!(linkage.disjunct_cost(), 1);
    assert_eq!(linkage.and_cost(), 0);
    assert_eq!(linkage.link_cost(), 0);
    assert!(!linkage.compute_union());
    assert_eq!(linkage.num_sublinkages(), 1);

    assert_eq!(linkage.subject(), Some("dog"));
    assert_eq!(linkage.verb(), Some("runs"));
    assert_eq!(linkage.object(), None);
    assert_eq!(linkage.verb_with_subscript(), Some("runs.v"));
    assert_eq!(linkage.subject_with_subscript(), Some("dog.n"));
    assert_eq!(linkage.object_with_subscript(), None);
    assert_eq!(linkage.nouns(), vec!["dog"]);
    assert!(!linkage.is_imperative());
    assert!(!linkage.is_improper());
    assert!(!linkage.has_inconsistent_domains());

    assert!(matches!(
      linkage.link(2),
      Err(LinkError::IndexOutOfRange { index: 2, bound: 2, .. })
    ));
    assert!(linkage.set_current_sublinkage(1).is_err());
  }

  #[test]
  fn test_conjunction_sublinkages() {
    let disjuncts = conjoined();
    let mut linkage = conjoined_linkage(&disjuncts);

    assert_eq!(linkage.num_sublinkages(), 2);
    assert!(!linkage.is_improper());
    // SJl spans 1, SJr spans 1
    assert_eq!(linkage.and_cost(), 0);

    let edges = |l: &Linkage| l.links().iter().map(|l| (l.lword, l.rword)).collect::<Vec<_>>();
    assert_eq!(edges(&linkage), vec![(0, 1), (1, 4)]);
    linkage.set_current_sublinkage(1).unwrap();
    assert_eq!(edges(&linkage), vec![(0, 3), (3, 4)]);

    assert!(linkage.compute_union());
    assert_eq!(linkage.num_sublinkages(), 3);
    linkage.set_current_sublinkage(2).unwrap();
    assert_eq!(edges(&linkage), vec![(0, 3), (0, 1), (1, 4), (3, 4)]);

    assert!(!linkage.compute_union());
    assert_eq!(linkage.num_sublinkages(), 3);
  }

  #[test]
  fn test_improper_conjunction() {
    // cats also links straight to and, which collapses when and becomes cats
    let disjuncts = vec![
      Disjunct::parse("LEFT-WALL", 0, "Wd+").unwrap(),
      Disjunct::parse("cats.n", 0, "SJl+ X+").unwrap(),
      Disjunct::parse("and", 0, "Wd- X- SJl- SJr+ Sp+").unwrap(),
      Disjunct::parse("dogs.n", 0, "SJr-").unwrap(),
      Disjunct::parse("run.v", 0, "Sp-").unwrap(),
    ];
    let c = candidate(
      &disjuncts,
      &[(0, 2, 0, 0), (1, 2, 1, 2), (1, 2, 0, 1), (2, 4, 0, 0), (2, 3, 1, 0)],
    );
    let words = spellings(&["LEFT-WALL", "cats", "and", "dogs", "run"]);
    let mut linkage = Linkage::from_candidate(&words, &c, None);

    assert!(linkage.is_improper());
    assert_eq!(linkage.num_sublinkages(), 2);
    let edges = |l: &Linkage| l.links().iter().map(|l| (l.lword, l.rword)).collect::<Vec<_>>();
    assert_eq!(edges(&linkage), vec![(0, 1), (1, 4)]);
    linkage.set_current_sublinkage(1).unwrap();
    assert_eq!(edges(&linkage), vec![(0, 3), (1, 3), (3, 4)]);
  }

  #[test]
  fn test_crossing_domains() {
    let rules: RuleSet = "domain a: A; domain b: B;".parse().unwrap();
    let disjuncts = vec![
      Disjunct::parse("w0", 0, "A+").unwrap(),
      Disjunct::parse("w1", 0, "B+").unwrap(),
      Disjunct::parse("w2", 0, "A-").unwrap(),
      Disjunct::parse("w3", 0, "B-").unwrap(),
    ];
    // A and B cross, so the domains they open overlap without nesting
    let c = candidate(&disjuncts, &[(0, 2, 0, 0), (1, 3, 0, 0)]);
    let words = spellings(&["w0", "w1", "w2", "w3"]);
    let linkage = Linkage::from_candidate(&words, &c, Some(&rules));

    assert_eq!(linkage.domains().len(), 2);
    assert!(linkage.has_inconsistent_domains());
    assert!(linkage.is_valid());

    // one link alone gives one domain and nothing to cross
    let c = candidate(&disjuncts, &[(0, 2, 0, 0)]);
    let linkage = Linkage::from_candidate(&words, &c, Some(&rules));
    assert!(!linkage.has_inconsistent_domains());
  }

  #[test]
  fn test_null_words_are_bracketed() {
    let disjuncts = vec![
      Disjunct::parse("LEFT-WALL", 0, "Wd+").unwrap(),
      Disjunct::parse("dog.n", 0, "Wd-").unwrap(),
    ];
    let mut c = candidate(&disjuncts, &[(0, 1, 0, 0)]);
    c.chosen.push(None);
    c.null.push(true);

    let linkage = Linkage::from_candidate(&spellings(&["LEFT-WALL", "dog", "um"]), &c, None);
    assert_eq!(linkage.word(2).unwrap(), "[um]");
    assert_eq!(linkage.disjunct(2).unwrap(), None);
    assert_eq!(linkage.unused_word_cost(), 1);
    assert!(linkage.word(3).is_err());
  }

  #[test]
  fn test_strip_subscript() {
    assert_eq!(strip_subscript("runs.v"), "runs");
    assert_eq!(strip_subscript("runs"), "runs");
    assert_eq!(strip_subscript("Mr."), "Mr.");
    assert_eq!(strip_subscript(".x"), ".x");
  }
}
