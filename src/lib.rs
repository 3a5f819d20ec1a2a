//! A link grammar parsing core.
//!
//! A [`Sentence`] is built from text and a [`Lexicon`], which supplies the disjuncts
//! (ways of being used) for every word. Parsing searches for every planar way of
//! pairing the words' connectors, ranks what it finds by cost, and checks each
//! linkage against the lexicon's post-processing rules.
//!
//! ```
//! use linkgram::{Dictionary, ParseOptions, Sentence};
//!
//! let dict: Dictionary = r#"
//!   LEFT-WALL: Wd+;
//!   RIGHT-WALL: RW-;
//!   the: D+;
//!   dog.n: Wd- & D- & S+;
//!   runs.v: S- & RW+;
//! "#
//! .parse()
//! .unwrap();
//!
//! let mut sentence = Sentence::new("the dog runs", &dict).unwrap();
//! let found = sentence.parse(&mut ParseOptions::default()).unwrap();
//! assert_eq!(found, 1);
//!
//! let linkage = sentence.linkage(0).unwrap();
//! assert_eq!(linkage.subject(), Some("dog"));
//! assert_eq!(linkage.verb(), Some("runs"));
//! ```

#[macro_use]
extern crate lazy_static;

#[macro_use]
pub mod utils;

pub mod connector;
pub mod constituents;
#[cfg(feature = "corpus")]
pub mod corpus;
pub mod cost;
pub mod dictionary;
pub mod disjunct;
pub mod error;
pub mod governor;
pub mod linkage;
pub mod options;
pub mod parse_dict;
pub mod postprocess;
pub mod search;
pub mod sentence;

pub use crate::connector::{Connector, Direction};
pub use crate::constituents::{ConstituentIdx, ConstituentNode, ConstituentTree};
#[cfg(feature = "corpus")]
pub use crate::corpus::CorpusStats;
pub use crate::cost::{CostModel, LinkageCost};
pub use crate::dictionary::{Dictionary, Lexicon};
pub use crate::disjunct::{Disjunct, DisjunctSet};
pub use crate::error::{LinkError, Result};
pub use crate::governor::{ResourceGovernor, Status};
pub use crate::linkage::{Link, Linkage, Sublinkage};
pub use crate::options::{CostModelType, ParseOptions, ReparsePolicy, Resources};
pub use crate::postprocess::{Domain, PostProcessor, RuleSet, Violation};
pub use crate::sentence::{Sentence, Word};
pub use crate::utils::Err;
