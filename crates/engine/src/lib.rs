pub mod category;
pub mod classify;
pub mod error;
pub mod link;
pub mod matcher;
pub mod ruleset;
pub mod tags;

pub use category::{default_category, resolve_category, CategoryResolver};
pub use classify::{
    classify_all, classify_statement, CategoryUpdate, Classification, Classifier, TagUpdate,
};
pub use error::{ClassifyError, ConfigurationError, PatternError};
pub use link::{link_all, TransferLinker};
pub use matcher::{matches, CompiledPattern};
pub use ruleset::RuleSet;
pub use tags::{resolve_tags, TagResolver};
