use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! define_id {
    ($($(#[$meta:meta])* $name:ident),+ $(,)?) => {
        $(
            $(#[$meta])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
            #[serde(transparent)]
            pub struct $name(pub i64);

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}", self.0)
                }
            }

            impl From<i64> for $name {
                fn from(value: i64) -> Self {
                    $name(value)
                }
            }
        )+
    };
}

define_id!(
    /// Bank account a statement was booked on.
    AccountId,
    StatementId,
    CategoryId,
    TagId,
    /// Shared by category and tag patterns; unique per pattern kind.
    PatternId,
);
