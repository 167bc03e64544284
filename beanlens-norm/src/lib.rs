//! beanlens-norm library
//!
//! Maps free-text coffee bean attributes (process, variety, roast level,
//! country, flavor notes) onto a versioned canonical dictionary, and reports
//! values it cannot resolve to an unknown queue for curation.

pub mod dictionary;
pub mod engine;
pub mod matcher;
pub mod text;
pub mod types;
pub mod unknown_queue;

pub use beanlens_common::{Error, FlavorNoteMode, NormalizationConfig, Result};
pub use dictionary::{validate_dictionary, DictionaryIssue, DictionaryRepository};
pub use engine::{normalize_bean_info, NormalizationEngine};
pub use types::{
    Alias, AliasKind, BeanRecord, Domain, MatchType, Method, NormalizedBeanInfo, NormalizedItem, Origin, Term,
};
pub use unknown_queue::{UnknownQueueEvent, UnknownQueueReporter, UnknownQueueSink};
