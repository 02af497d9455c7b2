pub mod document;
pub mod page;
pub mod submission;
pub mod template;
pub mod user;

use std::fmt;

/// Returned when a string does not name a variant of one of the closed enumerations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {} '{}'", self.kind, self.value)
    }
}

impl std::error::Error for UnknownVariant {}
