//! Error types for the parsing core.
//!
//! Errors fall into four groups. Configuration errors (bad option values,
//! unavailable cost models or spell guessing) are raised before any search
//! work. Structural errors mean a lexicon handed the search malformed
//! disjuncts; they abort the current parse only. Protocol errors are misuse of
//! the sentence/linkage API, such as reparsing or asking for an index past the
//! end. Dictionary and rule errors come from the text formats.
//!
//! Running out of time or memory is deliberately *not* an error: it is
//! recorded on [`ParseOptions`](crate::options::ParseOptions) and queried
//! afterwards.

/// Result type with [`LinkError`] as the default error.
pub type Result<T, E = LinkError> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LinkError {
  /// The cost model exists but was not compiled into this build.
  #[error("unsupported cost model: {0} (build without the `corpus` feature)")]
  UnsupportedCostModel(String),

  #[error("unknown cost model: {0}")]
  UnknownCostModel(String),

  #[error("invalid value for option {name}: {reason}")]
  InvalidOption { name: String, reason: String },

  #[error("spell guessing is not available for this dictionary")]
  SpellGuessingUnavailable,

  /// A lexicon produced a disjunct the search cannot use.
  #[error("malformed disjunct for word {word:?}: {reason}")]
  MalformedDisjunct { word: String, reason: String },

  #[error("the dictionary does not define the {0} word")]
  MissingWall(&'static str),

  #[error("can't reparse a sentence")]
  AlreadyParsed,

  #[error("the sentence has not been parsed")]
  NotParsed,

  #[error("sentence has {length} words, the limit is {limit}")]
  SentenceTooLong { length: usize, limit: usize },

  #[error("{what} index {index} is out of range (valid indices are below {bound})")]
  IndexOutOfRange {
    what: &'static str,
    index: usize,
    bound: usize,
  },

  #[error("dictionary, line {line}: {message}")]
  Dictionary { line: usize, message: String },

  #[error("post-processing rules, line {line}: {message}")]
  Rules { line: usize, message: String },
}

impl LinkError {
  pub(crate) fn invalid_option(name: &str, reason: impl Into<String>) -> Self {
    Self::InvalidOption {
      name: name.to_string(),
      reason: reason.into(),
    }
  }

  pub(crate) fn out_of_range(what: &'static str, index: usize, bound: usize) -> Self {
    Self::IndexOutOfRange { what, index, bound }
  }

  /// True for errors raised before the search started because of bad configuration.
  pub fn is_configuration(&self) -> bool {
    matches!(
      self,
      Self::UnsupportedCostModel(_)
        | Self::UnknownCostModel(_)
        | Self::InvalidOption { .. }
        | Self::SpellGuessingUnavailable
    )
  }
}

#[test]
fn test_out_of_range_names_index_and_bound() {
  let msg = LinkError::out_of_range("linkage", 3, 3).to_string();
  assert!(msg.contains("index 3"), "{}", msg);
  assert!(msg.contains("below 3"), "{}", msg);
}
