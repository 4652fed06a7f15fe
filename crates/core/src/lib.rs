pub mod category;
pub mod hash;
pub mod ids;
pub mod link;
pub mod money;
pub mod pattern;
pub mod period;
pub mod statement;

pub use category::{Category, Tag};
pub use ids::{AccountId, CategoryId, PatternId, StatementId, TagId};
pub use link::StatementLink;
pub use money::Amount;
pub use pattern::{CategoryPattern, MatchMode, MatchTarget, Pattern, TagPattern};
pub use period::CalendarPeriod;
pub use statement::{Statement, StatementRecord, StatementState, NULL_PLACEHOLDER};
