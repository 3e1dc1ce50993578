use serde::{Deserialize, Serialize};

use crate::Record;
use crate::utils::config::Collections;

/// Where a classified item ends up. Exactly one per item.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    /// Exactly one search hit.
    Resolved,
    /// More than one hit; needs a closer look.
    Ambiguous,
    /// No hit, or (by default) a failed query.
    Unresolved,
}

impl Outcome {
    pub const ALL: [Outcome; 3] = [Outcome::Resolved, Outcome::Ambiguous, Outcome::Unresolved];

    /// Route by result count: 1 → Resolved, >1 → Ambiguous, anything else → Unresolved.
    pub fn from_count(count: i64) -> Self {
        match count {
            1 => Outcome::Resolved,
            n if n > 1 => Outcome::Ambiguous,
            _ => Outcome::Unresolved,
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Outcome::Resolved => 0,
            Outcome::Ambiguous => 1,
            Outcome::Unresolved => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Outcome::Resolved => "resolved",
            Outcome::Ambiguous => "ambiguous",
            Outcome::Unresolved => "unresolved",
        }
    }
}

/// What a failed external query turns into.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum QueryFailurePolicy {
    /// Treat like a zero-hit result.
    #[default]
    Unresolved,
    /// Report the error on the error channel and write nothing for the item.
    Report,
}

/// Collection each outcome is written to. Also the three cache-hit predicates.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutcomeSinks {
    pub resolved: String,
    pub ambiguous: String,
    pub unresolved: String,
}

impl Default for OutcomeSinks {
    fn default() -> Self {
        Self {
            resolved: Collections::MVN_MIRROR.to_string(),
            ambiguous: Collections::MVN_MULTI_RESULT.to_string(),
            unresolved: Collections::MVN_BLACKLIST.to_string(),
        }
    }
}

impl OutcomeSinks {
    pub fn collection(&self, outcome: Outcome) -> &str {
        match outcome {
            Outcome::Resolved => &self.resolved,
            Outcome::Ambiguous => &self.ambiguous,
            Outcome::Unresolved => &self.unresolved,
        }
    }
}

/// Worker output: the record plus the bucket it belongs to.
#[derive(Clone, Debug, PartialEq)]
pub struct Classified {
    pub outcome: Outcome,
    pub record: Record,
}
