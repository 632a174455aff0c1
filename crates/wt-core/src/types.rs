//! Core type definitions with validation.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// A stored or user-supplied value did not name a known variant.
    #[error("invalid {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },
}

/// Generates a validated string ID newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new ID after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.trim().is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Returns the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl std::str::FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

/// Adds a random UUID v4 constructor to generated record IDs.
macro_rules! impl_generated_id {
    ($($name:ident),+) => {
        $(
            impl $name {
                /// Generates a fresh random identifier.
                pub fn generate() -> Self {
                    Self(Uuid::new_v4().to_string())
                }
            }
        )+
    };
}

define_string_id!(
    /// A reference to a user (employee, planner or admin).
    ///
    /// The engine never authenticates users; it only compares references.
    UserId, "user ID"
);

define_string_id!(
    /// A validated task identifier.
    TaskId, "task ID"
);

define_string_id!(
    /// A validated leave request identifier.
    LeaveId, "leave ID"
);

define_string_id!(
    /// A validated time log identifier.
    LogId, "log ID"
);

define_string_id!(
    /// A project code. Globally unique across tasks.
    ProjectCode, "project code"
);

impl_generated_id!(TaskId, LeaveId, LogId);

/// Generates a closed string-backed enum with storage conversions.
///
/// Each variant maps to exactly one lowercase storage string, used both in the
/// database and on the command line.
macro_rules! define_str_enum {
    (
        $(#[$meta:meta])*
        $name:ident, $kind:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* #[serde(rename = $text)] $variant ),+
        }

        impl $name {
            /// String representation for database storage.
            #[must_use]
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $( Self::$variant => $text ),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = ValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $text => Ok(Self::$variant), )+
                    _ => Err(ValidationError::UnknownVariant {
                        kind: $kind,
                        value: s.to_string(),
                    }),
                }
            }
        }
    };
}

define_str_enum!(
    /// Kind of leave. Only [`LeaveType::Annual`] draws from the accrual balance.
    LeaveType, "leave type" {
        Annual => "annual",
        Sick => "sick",
        Personal => "personal",
        Maternity => "maternity",
        Unpaid => "unpaid",
        Other => "other",
    }
);

define_str_enum!(
    /// Leave request lifecycle. `Approved` and `Rejected` are terminal.
    LeaveStatus, "leave status" {
        Pending => "pending",
        Approved => "approved",
        Rejected => "rejected",
    }
);

define_str_enum!(
    /// Task lifecycle status.
    TaskStatus, "task status" {
        Pending => "pending",
        InProgress => "in_progress",
        Completed => "completed",
        Overdue => "overdue",
    }
);

define_str_enum!(
    /// Task priority. Informational only; does not affect capacity.
    TaskPriority, "task priority" {
        Low => "low",
        Medium => "medium",
        High => "high",
    }
);

define_str_enum!(
    /// The kind of segment a time log is currently in.
    LogType, "log type" {
        Work => "work",
        Break => "break",
    }
);

impl Default for TaskPriority {
    fn default() -> Self {
        Self::Medium
    }
}
