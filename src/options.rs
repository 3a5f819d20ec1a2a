use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;
use std::time::Duration;

use tracing::Dispatch;

use crate::error::{LinkError, Result};

/// How linkages are ranked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CostModelType {
  /// And-cost, Disjunct-cost, unused-word cost, then Link-cost
  #[default]
  Vdal,
  /// Re-weights by disjunct frequencies; needs the `corpus` feature
  Corpus,
}

impl CostModelType {
  pub fn is_available(self) -> bool {
    match self {
      Self::Vdal => true,
      Self::Corpus => cfg!(feature = "corpus"),
    }
  }
}

impl fmt::Display for CostModelType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Vdal => write!(f, "vdal"),
      Self::Corpus => write!(f, "corpus"),
    }
  }
}

impl FromStr for CostModelType {
  type Err = LinkError;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "vdal" => Ok(Self::Vdal),
      "corpus" => Ok(Self::Corpus),
      _ => Err(LinkError::UnknownCostModel(s.to_string())),
    }
  }
}

/// What `Sentence::parse` does when called on a sentence that was already parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReparsePolicy {
  /// Fail with `LinkError::AlreadyParsed`
  #[default]
  Reject,
  /// Throw away the previous results and parse again
  Replace,
}

impl FromStr for ReparsePolicy {
  type Err = LinkError;

  fn from_str(s: &str) -> Result<Self> {
    match s.trim().to_ascii_lowercase().as_str() {
      "reject" => Ok(Self::Reject),
      "replace" => Ok(Self::Replace),
      _ => Err(LinkError::invalid_option(
        "reparse_policy",
        format!("expected reject or replace, got {:?}", s),
      )),
    }
  }
}

/// Resource flags recorded by the last parse that used these options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Resources {
  pub timer_expired: bool,
  pub memory_exhausted: bool,
}

/// Knobs consulted at the start of, and during, a parse.
#[derive(Debug, Clone)]
pub struct ParseOptions {
  /// Diagnostic detail; never changes results
  pub verbosity: u8,
  /// Cap on candidates retained before post-processing
  pub linkage_limit: usize,
  /// Disjuncts costing more than this are never considered
  pub disjunct_cost: u32,
  pub min_null_count: usize,
  pub max_null_count: usize,
  /// Runs of this many consecutive null words count as one null
  pub null_block: usize,
  /// Permit disconnected pieces of linkage
  pub islands_ok: bool,
  pub short_length: usize,
  /// Limit every connector to `short_length`
  pub all_short_connectors: bool,
  pub max_parse_time: Option<Duration>,
  /// Bytes of search state
  pub max_memory: Option<usize>,
  /// When false no word may be left unlinked
  pub allow_null: bool,
  pub max_sentence_length: usize,
  /// Retry a search that ran out of resources with all connectors short
  pub panic_mode: bool,
  /// Time budget for that retry. `None` reuses `max_parse_time`.
  pub panic_max_parse_time: Option<Duration>,
  /// Ask the lexicon to guess disjuncts for unknown words
  pub spell_guess: bool,
  pub reparse_policy: ReparsePolicy,
  /// Where the parse sends its tracing events. `None` uses the caller's default.
  pub logger: Option<Dispatch>,
  cost_model: CostModelType,
  resources: Resources,
}

impl Default for ParseOptions {
  fn default() -> Self {
    Self {
      verbosity: 1,
      linkage_limit: 100,
      disjunct_cost: 2,
      min_null_count: 0,
      max_null_count: 0,
      null_block: 1,
      islands_ok: false,
      short_length: 16,
      all_short_connectors: false,
      max_parse_time: None,
      max_memory: None,
      allow_null: true,
      max_sentence_length: 170,
      panic_mode: false,
      panic_max_parse_time: None,
      spell_guess: false,
      reparse_policy: ReparsePolicy::Reject,
      logger: None,
      cost_model: CostModelType::Vdal,
      resources: Resources::default(),
    }
  }
}

impl ParseOptions {
  pub fn new() -> Self {
    Default::default()
  }

  pub fn cost_model_type(&self) -> CostModelType {
    self.cost_model
  }

  /// Selecting a cost model this build cannot provide fails here, never later
  pub fn set_cost_model_type(&mut self, model: CostModelType) -> Result<()> {
    if !model.is_available() {
      return Err(LinkError::UnsupportedCostModel(model.to_string()));
    }
    self.cost_model = model;
    Ok(())
  }

  pub fn with_verbosity(mut self, verbosity: u8) -> Self {
    self.verbosity = verbosity;
    self
  }

  pub fn with_linkage_limit(mut self, limit: usize) -> Self {
    self.linkage_limit = limit;
    self
  }

  pub fn with_null_counts(mut self, min: usize, max: usize) -> Self {
    self.min_null_count = min;
    self.max_null_count = max;
    self
  }

  pub fn with_islands_ok(mut self, islands_ok: bool) -> Self {
    self.islands_ok = islands_ok;
    self
  }

  pub fn with_max_parse_time(mut self, time: Duration) -> Self {
    self.max_parse_time = Some(time);
    self
  }

  pub fn with_max_memory(mut self, bytes: usize) -> Self {
    self.max_memory = Some(bytes);
    self
  }

  pub fn with_reparse_policy(mut self, policy: ReparsePolicy) -> Self {
    self.reparse_policy = policy;
    self
  }

  pub fn with_logger(mut self, logger: Dispatch) -> Self {
    self.logger = Some(logger);
    self
  }

  pub fn timer_expired(&self) -> bool {
    self.resources.timer_expired
  }

  pub fn memory_exhausted(&self) -> bool {
    self.resources.memory_exhausted
  }

  pub fn resources_exhausted(&self) -> bool {
    self.timer_expired() || self.memory_exhausted()
  }

  /// Clears the exhaustion flags. Call before reparsing with a fresh budget.
  pub fn reset_resources(&mut self) {
    self.resources = Resources::default();
  }

  pub fn resources(&self) -> Resources {
    self.resources
  }

  pub(crate) fn record_resources(&mut self, resources: Resources) {
    self.resources.timer_expired |= resources.timer_expired;
    self.resources.memory_exhausted |= resources.memory_exhausted;
  }

  pub fn spell_guessing_enabled(&self) -> bool {
    self.spell_guess
  }

  /// The null counts a parse will try, smallest first
  pub fn null_range(&self) -> RangeInclusive<usize> {
    if self.allow_null {
      self.min_null_count..=self.max_null_count
    } else {
      0..=0
    }
  }

  /// Fails fast on values no search could run with
  pub fn validate(&self) -> Result<()> {
    if self.linkage_limit == 0 {
      return Err(LinkError::invalid_option("linkage_limit", "must be at least 1"));
    }
    if self.null_block == 0 {
      return Err(LinkError::invalid_option("null_block", "must be at least 1"));
    }
    if self.short_length == 0 {
      return Err(LinkError::invalid_option("short_length", "must be at least 1"));
    }
    if self.allow_null && self.min_null_count > self.max_null_count {
      return Err(LinkError::invalid_option(
        "min_null_count",
        format!(
          "{} is larger than max_null_count {}",
          self.min_null_count, self.max_null_count
        ),
      ));
    }
    if !self.cost_model.is_available() {
      return Err(LinkError::UnsupportedCostModel(self.cost_model.to_string()));
    }
    Ok(())
  }

  /// Sets an option by name from its string form, as in `!max_null_count=3`
  pub fn set(&mut self, name: &str, value: &str) -> Result<()> {
    let value = value.trim();
    match name.trim() {
      "verbosity" => self.verbosity = parse_num(name, value)?,
      "linkage_limit" => self.linkage_limit = parse_num(name, value)?,
      "disjunct_cost" => self.disjunct_cost = parse_num(name, value)?,
      "min_null_count" => self.min_null_count = parse_num(name, value)?,
      "max_null_count" => self.max_null_count = parse_num(name, value)?,
      "null_block" => self.null_block = parse_num(name, value)?,
      "islands_ok" => self.islands_ok = parse_bool(name, value)?,
      "short_length" => self.short_length = parse_num(name, value)?,
      "all_short_connectors" => self.all_short_connectors = parse_bool(name, value)?,
      "max_parse_time" => {
        self.max_parse_time = parse_limit::<u64>(name, value)?.map(Duration::from_secs)
      }
      "max_memory" => self.max_memory = parse_limit(name, value)?,
      "allow_null" => self.allow_null = parse_bool(name, value)?,
      "max_sentence_length" => self.max_sentence_length = parse_num(name, value)?,
      "panic_mode" => self.panic_mode = parse_bool(name, value)?,
      "panic_max_parse_time" => {
        self.panic_max_parse_time = parse_limit::<u64>(name, value)?.map(Duration::from_secs)
      }
      "spell_guess" => self.spell_guess = parse_bool(name, value)?,
      "reparse_policy" => self.reparse_policy = value.parse()?,
      "cost_model_type" => self.set_cost_model_type(value.parse()?)?,
      _ => return Err(LinkError::invalid_option(name, "unknown option")),
    }
    Ok(())
  }
}

fn parse_num<T: FromStr>(name: &str, value: &str) -> Result<T> {
  value
    .parse()
    .map_err(|_| LinkError::invalid_option(name, format!("{:?} is not a valid number", value)))
}

/// `-1` and `none` mean unlimited
fn parse_limit<T: FromStr>(name: &str, value: &str) -> Result<Option<T>> {
  if value == "-1" || value.eq_ignore_ascii_case("none") {
    Ok(None)
  } else {
    parse_num(name, value).map(Some)
  }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
  match value.to_ascii_lowercase().as_str() {
    "true" | "1" | "yes" | "on" => Ok(true),
    "false" | "0" | "no" | "off" => Ok(false),
    _ => Err(LinkError::invalid_option(
      name,
      format!("{:?} is not a boolean", value),
    )),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_defaults() {
    let opts = ParseOptions::default();
    assert_eq!(opts.verbosity, 1);
    assert_eq!(opts.linkage_limit, 100);
    assert_eq!(opts.disjunct_cost, 2);
    assert_eq!(opts.min_null_count, 0);
    assert_eq!(opts.max_null_count, 0);
    assert!(!opts.islands_ok);
    assert_eq!(opts.short_length, 16);
    assert_eq!(opts.max_memory, None);
    assert_eq!(opts.max_parse_time, None);
    assert_eq!(opts.panic_max_parse_time, None);
    assert!(!opts.all_short_connectors);
    assert_eq!(opts.cost_model_type(), CostModelType::Vdal);
    assert!(!opts.resources_exhausted());
    assert!(opts.validate().is_ok());
  }

  #[test]
  fn test_set_by_name() {
    let mut opts = ParseOptions::default();
    opts.set("max_null_count", "3").unwrap();
    opts.set("islands_ok", "true").unwrap();
    opts.set("max_parse_time", "-1").unwrap();
    opts.set("max_memory", "4096").unwrap();
    opts.set("reparse_policy", "replace").unwrap();
    opts.set("panic_max_parse_time", "30").unwrap();
    assert_eq!(opts.max_null_count, 3);
    assert_eq!(opts.panic_max_parse_time, Some(Duration::from_secs(30)));
    assert!(opts.islands_ok);
    assert_eq!(opts.max_parse_time, None);
    assert_eq!(opts.max_memory, Some(4096));
    assert_eq!(opts.reparse_policy, ReparsePolicy::Replace);

    let err = opts.set("linkage_limit", "lots").unwrap_err();
    assert!(err.is_configuration());
    assert!(opts.set("no_such_option", "1").is_err());
    assert!(opts.set("islands_ok", "perhaps").is_err());
  }

  #[test]
  fn test_cost_model_selection() {
    let mut opts = ParseOptions::default();
    opts.set_cost_model_type(CostModelType::Vdal).unwrap();

    let err = opts.set("cost_model_type", "rafferty").unwrap_err();
    assert!(err.to_string().contains("unknown cost model"));

    let corpus = opts.set_cost_model_type(CostModelType::Corpus);
    if cfg!(feature = "corpus") {
      assert!(corpus.is_ok());
    } else {
      assert!(matches!(corpus, Err(LinkError::UnsupportedCostModel(_))));
      assert_eq!(opts.cost_model_type(), CostModelType::Vdal);
    }
  }

  #[test]
  fn test_validate() {
    let opts = ParseOptions::default().with_linkage_limit(0);
    assert!(opts.validate().is_err());

    let opts = ParseOptions::default().with_null_counts(3, 1);
    assert!(opts.validate().is_err());

    let mut opts = ParseOptions::default().with_null_counts(3, 1);
    opts.allow_null = false;
    assert!(opts.validate().is_ok());
    assert_eq!(opts.null_range(), 0..=0);
  }

  #[test]
  fn test_resource_flags() {
    let mut opts = ParseOptions::default();
    opts.record_resources(Resources {
      timer_expired: true,
      memory_exhausted: false,
    });
    assert!(opts.timer_expired());
    assert!(opts.resources_exhausted());
    opts.reset_resources();
    assert!(!opts.resources_exhausted());
  }
}
