//! Newtype domain identifiers.
//!
//! Every domain concept that has an identity is represented as a distinct newtype
//! wrapping a primitive. This prevents accidentally interchanging a [`TaskId`]
//! with a [`ProjectId`] even though the task store hands out both as strings.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Identifiers: store-assigned
// ---------------------------------------------------------------------------

string_id! {
    /// Identifies a task in the remote task store.
    TaskId
}

string_id! {
    /// Identifies a project (queue) in the remote task store.
    ProjectId
}

string_id! {
    /// Opaque continuation token returned by the store for the next page.
    PageCursor
}

// ---------------------------------------------------------------------------
// Identifiers: operator supplied
// ---------------------------------------------------------------------------

string_id! {
    /// Human-readable project name as given on the command line.
    ///
    /// Matched case-insensitively against the store's project names.
    ProjectName
}

impl ProjectName {
    /// Returns `true` if `candidate` names the same project, ignoring case.
    pub fn matches(&self, candidate: &str) -> bool {
        self.0.to_lowercase() == candidate.to_lowercase()
    }
}

// ---------------------------------------------------------------------------
// Identifiers: UUID-backed (internally generated)
// ---------------------------------------------------------------------------

/// Identifies a single poll cycle (one fetch-filter-dispatch pass).
///
/// Generated fresh for every cycle and attached to the cycle's tracing span so
/// all activity from one pass can be correlated in the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PollCycleId(Uuid);

impl PollCycleId {
    /// Generates a new random cycle identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for PollCycleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
