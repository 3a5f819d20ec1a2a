use std::fmt;

use tracing::{debug, info};

use crate::cost::CostModel;
use crate::dictionary::{Lexicon, LEFT_WALL, RIGHT_WALL};
use crate::disjunct::DisjunctSet;
use crate::error::{LinkError, Result};
use crate::linkage::Linkage;
use crate::options::{ParseOptions, ReparsePolicy};
use crate::search::search;

/// A token of the sentence together with every way it may be used
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
  pub spelling: String,
  pub disjuncts: DisjunctSet,
}

impl Word {
  pub fn new(spelling: impl Into<String>, disjuncts: DisjunctSet) -> Self {
    Self {
      spelling: spelling.into(),
      disjuncts,
    }
  }
}

/// What a parse left behind
#[derive(Debug)]
struct Parsed {
  null_count: usize,
  found: u64,
  post_processed: usize,
  valid: usize,
  /// Ranked, valid ones first
  linkages: Vec<Linkage>,
  options: ParseOptions,
}

/// A sentence to parse. Holds its words, walls included, and once parsed, its linkages.
///
/// The lexicon is borrowed, so any number of sentences may share one dictionary.
pub struct Sentence<'d> {
  lexicon: &'d dyn Lexicon,
  words: Vec<Word>,
  parsed: Option<Parsed>,
}

impl fmt::Debug for Sentence<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Sentence")
      .field("words", &self.words)
      .field("parsed", &self.parsed)
      .finish()
  }
}

impl<'d> Sentence<'d> {
  /// Splits `text` on whitespace, looks every token up and puts the walls around it
  pub fn new(text: &str, lexicon: &'d dyn Lexicon) -> Result<Self> {
    let tokens = text.split_whitespace().collect::<Vec<_>>();
    Self::from_words(&tokens, lexicon)
  }

  /// Builds a sentence from tokens that were already split. The walls are added here.
  pub fn from_words(tokens: &[&str], lexicon: &'d dyn Lexicon) -> Result<Self> {
    let left = lexicon.left_wall().ok_or(LinkError::MissingWall(LEFT_WALL))?;
    let right = lexicon
      .right_wall()
      .ok_or(LinkError::MissingWall(RIGHT_WALL))?;

    let mut words = Vec::with_capacity(tokens.len() + 2);
    words.push(Word::new(LEFT_WALL, left));
    words.extend(tokens.iter().map(|t| Word::new(*t, lexicon.lookup(t))));
    words.push(Word::new(RIGHT_WALL, right));

    Ok(Self {
      lexicon,
      words,
      parsed: None,
    })
  }

  /// Runs the search and post-processing, returning the number of valid linkages.
  ///
  /// Bad options fail before any search work. Running out of time or memory is not an
  /// error: whatever was found is kept and the flags on `opts` say what happened.
  pub fn parse(&mut self, opts: &mut ParseOptions) -> Result<usize> {
    if self.parsed.is_some() && opts.reparse_policy == ReparsePolicy::Reject {
      return Err(LinkError::AlreadyParsed);
    }

    opts.validate()?;
    let model = CostModel::new(opts.cost_model_type(), self.lexicon)?;
    if opts.spell_guess && !self.lexicon.spell_guessing_available() {
      return Err(LinkError::SpellGuessingUnavailable);
    }

    let length = self.len();
    if length > opts.max_sentence_length {
      return Err(LinkError::SentenceTooLong {
        length,
        limit: opts.max_sentence_length,
      });
    }

    // nothing is changed until every word has passed its checks
    let guessed = if opts.spell_guess {
      self.guess_unknown_words()?
    } else {
      Vec::new()
    };
    for (idx, word) in self.words.iter().enumerate() {
      match guessed.iter().find(|(g, _)| *g == idx) {
        Some((_, disjuncts)) => disjuncts.check()?,
        None => word.disjuncts.check()?,
      }
    }
    for (idx, disjuncts) in guessed {
      self.words[idx].disjuncts = disjuncts;
    }

    let parsed = match opts.logger.clone() {
      Some(dispatch) => tracing::dispatcher::with_default(&dispatch, || self.run(opts, model)),
      None => self.run(opts, model),
    };
    let valid = parsed.valid;
    self.parsed = Some(parsed);
    Ok(valid)
  }

  /// Guesses for the words the lexicon has nothing for, by word index
  fn guess_unknown_words(&self) -> Result<Vec<(usize, DisjunctSet)>> {
    let last = self.words.len() - 1;
    let mut guessed = Vec::new();
    for (idx, word) in self.words.iter().enumerate().take(last).skip(1) {
      if word.disjuncts.is_empty() {
        guessed.push((idx, self.lexicon.guess(&word.spelling)?));
      }
    }
    Ok(guessed)
  }

  fn run(&self, opts: &mut ParseOptions, model: CostModel) -> Parsed {
    let disjuncts = self.words.iter().map(|w| &w.disjuncts).collect::<Vec<_>>();
    let spellings = self
      .words
      .iter()
      .map(|w| w.spelling.clone())
      .collect::<Vec<_>>();

    let result = search(&disjuncts, opts);
    opts.record_resources(result.resources);

    let pp = self.lexicon.post_processor();
    let mut linkages = result
      .candidates
      .iter()
      .map(|c| Linkage::from_candidate(&spellings, c, pp))
      .collect::<Vec<_>>();
    model.rank(&mut linkages, self.lexicon);

    for i in 1..linkages.len() {
      let canonical = {
        let links = linkages[i].link_set();
        !linkages[..i].iter().any(|l| l.link_set() == links)
      };
      linkages[i].set_canonical(canonical);
    }

    let valid = linkages.iter().filter(|l| l.is_valid()).count();
    if opts.verbosity >= 1 {
      info!(
        words = self.len(),
        found = result.found,
        valid,
        nulls = result.null_count,
        panicked = result.panicked,
        "parsed sentence"
      );
    }
    if opts.verbosity >= 3 {
      for (i, l) in linkages.iter().enumerate() {
        debug!(linkage = i, cost = %l.costs(), violation = ?l.violation_name(), "ranked");
      }
    }

    Parsed {
      null_count: result.null_count,
      found: result.found,
      post_processed: linkages.len(),
      valid,
      linkages,
      options: opts.clone(),
    }
  }

  fn parsed(&self) -> Result<&Parsed> {
    self.parsed.as_ref().ok_or(LinkError::NotParsed)
  }

  pub fn is_parsed(&self) -> bool {
    self.parsed.is_some()
  }

  /// Number of words between the walls
  pub fn len(&self) -> usize {
    self.words.len() - 2
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Every word, walls included
  pub fn words(&self) -> &[Word] {
    &self.words
  }

  pub fn word(&self, idx: usize) -> Result<&Word> {
    self
      .words
      .get(idx)
      .ok_or_else(|| LinkError::out_of_range("word", idx, self.words.len()))
  }

  /// Null words in the linkages found, 0 if nothing was found
  pub fn null_count(&self) -> Result<usize> {
    Ok(self.parsed()?.null_count)
  }

  /// Every linkage the search counted at `null_count`, including ones never built
  pub fn num_linkages_found(&self) -> Result<u64> {
    Ok(self.parsed()?.found)
  }

  pub fn num_valid_linkages(&self) -> Result<usize> {
    Ok(self.parsed()?.valid)
  }

  /// How many linkages were built and handed to the post-processor, at most `linkage_limit`
  pub fn num_linkages_post_processed(&self) -> Result<usize> {
    Ok(self.parsed()?.post_processed)
  }

  fn built(&self, idx: usize) -> Result<&Linkage> {
    let linkages = &self.parsed()?.linkages;
    linkages
      .get(idx)
      .ok_or_else(|| LinkError::out_of_range("linkage", idx, linkages.len()))
  }

  /// Rules broken by the `idx`th built linkage, 0 or 1. Indexes [`Sentence::all_linkages`],
  /// so `idx` runs up to `num_linkages_post_processed`, not `num_valid_linkages`.
  pub fn num_violations(&self, idx: usize) -> Result<usize> {
    Ok(usize::from(!self.built(idx)?.is_valid()))
  }

  /// Disjunct cost of the `idx`th built linkage. Indexes [`Sentence::all_linkages`],
  /// like [`Sentence::num_violations`].
  pub fn disjunct_cost(&self, idx: usize) -> Result<u32> {
    Ok(self.built(idx)?.disjunct_cost())
  }

  /// The valid linkages, best first
  pub fn linkages(&self) -> Result<&[Linkage]> {
    let parsed = self.parsed()?;
    Ok(&parsed.linkages[..parsed.valid])
  }

  /// Every built linkage, valid ones first, then those a rule rejected
  pub fn all_linkages(&self) -> Result<&[Linkage]> {
    Ok(&self.parsed()?.linkages)
  }

  /// The `idx`th valid linkage. Bounded by `num_valid_linkages`.
  pub fn linkage(&self, idx: usize) -> Result<&Linkage> {
    let valid = self.linkages()?;
    valid
      .get(idx)
      .ok_or_else(|| LinkError::out_of_range("linkage", idx, valid.len()))
  }

  pub fn linkage_mut(&mut self, idx: usize) -> Result<&mut Linkage> {
    let parsed = self.parsed.as_mut().ok_or(LinkError::NotParsed)?;
    let valid = parsed.valid;
    parsed.linkages[..valid]
      .get_mut(idx)
      .ok_or_else(|| LinkError::out_of_range("linkage", idx, valid))
  }

  /// The best linkage, if there is a valid one
  pub fn best(&self) -> Option<&Linkage> {
    self.linkages().ok()?.first()
  }

  /// The names of the rules the rejected linkages broke, in rank order
  pub fn violations(&self) -> Result<Vec<&str>> {
    Ok(
      self
        .parsed()?
        .linkages
        .iter()
        .filter_map(Linkage::violation_name)
        .collect(),
    )
  }

  /// The options as they stood at the end of the last parse, resource flags included
  pub fn options(&self) -> Result<&ParseOptions> {
    Ok(&self.parsed()?.options)
  }
}

impl fmt::Display for Sentence<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let last = self.words.len() - 1;
    let words = self.words[1..last]
      .iter()
      .map(|w| w.spelling.as_str())
      .collect::<Vec<_>>();
    write!(f, "{}", words.join(" "))
  }
}
