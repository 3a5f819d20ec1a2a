use std::cmp::Ordering;
use std::fmt;

use crate::dictionary::Lexicon;
use crate::error::{LinkError, Result};
use crate::linkage::{Link, Linkage};
use crate::options::CostModelType;

/// The cost components of one linkage. Lower is better everywhere.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkageCost {
  /// Number of null words
  pub unused_word_cost: usize,
  /// Sum of the chosen disjuncts' costs
  pub disjunct_cost: u32,
  /// How unevenly conjunctions' two conjuncts sit around them
  pub and_cost: usize,
  /// Total link length beyond what the connected words need
  pub link_cost: usize,
  /// Negative log likelihood of the chosen disjuncts, filled in by the corpus model
  #[cfg(feature = "corpus")]
  pub corpus_cost: f64,
}

impl fmt::Display for LinkageCost {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "(UNUSED={} DIS={} AND={} LEN={}",
      self.unused_word_cost, self.disjunct_cost, self.and_cost, self.link_cost
    )?;
    #[cfg(feature = "corpus")]
    write!(f, " CORPUS={:.2}", self.corpus_cost)?;
    write!(f, ")")
  }
}

/// Total link length minus the smallest total a link set joining the same words
/// could have. Every connected group of k words needs at least k - 1 length, so the
/// result is never negative, and it is 0 when every link joins neighbours.
pub fn link_cost(num_words: usize, links: &[Link]) -> usize {
  let mut parent = (0..num_words).collect::<Vec<_>>();

  fn find(parent: &mut [usize], mut x: usize) -> usize {
    while parent[x] != x {
      parent[x] = parent[parent[x]];
      x = parent[x];
    }
    x
  }

  let mut total = 0;
  let mut merges = 0;
  for link in links {
    total += link.length();
    let (a, b) = (find(&mut parent, link.lword), find(&mut parent, link.rword));
    if a != b {
      parent[a] = b;
      merges += 1;
    }
  }

  // merges == linked words - components
  total - merges
}

/// A ranking strategy, checked against the lexicon it will score with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostModel {
  /// And-cost, disjunct cost, unused words, then link cost
  Vdal,
  /// As `Vdal`, with the corpus score standing in for disjunct cost
  #[cfg(feature = "corpus")]
  Corpus,
}

impl CostModel {
  /// Picks the model for a parse. The corpus model needs both the `corpus` feature and
  /// a lexicon that carries frequency tables.
  #[cfg_attr(not(feature = "corpus"), allow(unused_variables))]
  pub fn new(kind: CostModelType, lexicon: &dyn Lexicon) -> Result<Self> {
    match kind {
      CostModelType::Vdal => Ok(Self::Vdal),
      #[cfg(feature = "corpus")]
      CostModelType::Corpus if lexicon.corpus().is_some() => Ok(Self::Corpus),
      CostModelType::Corpus => Err(LinkError::UnsupportedCostModel(format!(
        "{} (no frequency tables)",
        kind
      ))),
    }
  }

  /// Fills in whatever cost components the model computes itself
  #[cfg_attr(not(feature = "corpus"), allow(unused_variables))]
  pub fn score(&self, linkage: &mut Linkage, lexicon: &dyn Lexicon) {
    match self {
      Self::Vdal => {}
      #[cfg(feature = "corpus")]
      Self::Corpus => {
        let Some(stats) = lexicon.corpus() else {
          return;
        };
        let score = (0..linkage.num_words())
          .filter_map(|i| {
            let disjunct = linkage.disjunct(i).ok()??;
            Some(stats.cost(&linkage.words()[i], disjunct))
          })
          .sum();
        linkage.costs_mut().corpus_cost = score;
      }
    }
  }

  /// Lexicographic comparison under the model's key. Validity is not considered.
  pub fn compare(&self, a: &LinkageCost, b: &LinkageCost) -> Ordering {
    let middle = match self {
      Self::Vdal => a.disjunct_cost.cmp(&b.disjunct_cost),
      #[cfg(feature = "corpus")]
      Self::Corpus => a.corpus_cost.total_cmp(&b.corpus_cost),
    };

    a.and_cost
      .cmp(&b.and_cost)
      .then(middle)
      .then(a.unused_word_cost.cmp(&b.unused_word_cost))
      .then(a.link_cost.cmp(&b.link_cost))
  }

  /// Sorts linkages best first: valid before violating, then by cost. The sort is
  /// stable, so equal linkages keep the order the search found them in.
  pub fn rank(&self, linkages: &mut [Linkage], lexicon: &dyn Lexicon) {
    for linkage in linkages.iter_mut() {
      self.score(linkage, lexicon);
    }
    linkages.sort_by(|a, b| {
      b.is_valid()
        .cmp(&a.is_valid())
        .then_with(|| self.compare(a.costs(), b.costs()))
    });
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn link(l: usize, r: usize) -> Link {
    Link::new(l, r, "X", "X", "X")
  }

  #[test]
  fn test_link_cost() {
    // adjacent chain
    assert_eq!(link_cost(4, &[link(0, 1), link(1, 2), link(2, 3)]), 0);
    // one link skipping a word that is itself linked
    assert_eq!(link_cost(3, &[link(0, 2), link(1, 2)]), 1);
    // a cycle: total 4, three words joined by two merges
    assert_eq!(link_cost(3, &[link(0, 1), link(1, 2), link(0, 2)]), 2);
    // two islands
    assert_eq!(link_cost(5, &[link(0, 1), link(3, 4)]), 0);
    assert_eq!(link_cost(2, &[]), 0);
  }

  #[test]
  fn test_vdal_order() {
    let model = CostModel::Vdal;
    let cheap = LinkageCost {
      disjunct_cost: 0,
      link_cost: 5,
      ..Default::default()
    };
    let dear = LinkageCost {
      disjunct_cost: 1,
      ..Default::default()
    };
    let unbalanced = LinkageCost {
      and_cost: 1,
      ..Default::default()
    };
    assert_eq!(model.compare(&cheap, &dear), Ordering::Less);
    assert_eq!(model.compare(&dear, &unbalanced), Ordering::Less);
    assert_eq!(model.compare(&cheap, &cheap.clone()), Ordering::Equal);

    let nulls = LinkageCost {
      unused_word_cost: 1,
      ..Default::default()
    };
    assert_eq!(model.compare(&cheap, &nulls), Ordering::Less);
  }

  #[test]
  fn test_corpus_model_needs_support() {
    let dict = crate::dictionary::Dictionary::new();
    assert!(CostModel::new(CostModelType::Vdal, &dict).is_ok());
    assert!(matches!(
      CostModel::new(CostModelType::Corpus, &dict),
      Err(LinkError::UnsupportedCostModel(_))
    ));
  }

  #[cfg(feature = "corpus")]
  #[test]
  fn test_corpus_reorders_equal_costs() {
    use crate::corpus::CorpusStats;
    use crate::dictionary::Dictionary;
    use crate::options::ParseOptions;
    use crate::sentence::Sentence;

    const DICT: &str = r#"
      LEFT-WALL: Wd+;
      RIGHT-WALL: RW-;
      saw.v: (Wd- & O+) or (Wd- & S+);
      it: (O- or S-) & RW+;
    "#;

    // the label between saw and it in the best linkage
    let best = |counts: &str| -> String {
      let stats: CorpusStats = counts.parse().unwrap();
      let dict = DICT.parse::<Dictionary>().unwrap().with_corpus(stats);
      let mut opts = ParseOptions::default();
      opts.set_cost_model_type(CostModelType::Corpus).unwrap();

      let mut sentence = Sentence::new("saw it", &dict).unwrap();
      assert_eq!(sentence.parse(&mut opts).unwrap(), 2);
      let linkages = sentence.linkages().unwrap();
      assert_eq!(linkages[0].disjunct_cost(), linkages[1].disjunct_cost());
      assert!(linkages[0].costs().corpus_cost < linkages[1].costs().corpus_cost);
      linkages[0].link(1).unwrap().label.clone()
    };

    assert_eq!(best("9 saw.v: Wd- O+\n1 saw.v: Wd- S+"), "O");
    assert_eq!(best("1 saw.v: Wd- O+\n9 saw.v: Wd- S+"), "S");
  }
}
