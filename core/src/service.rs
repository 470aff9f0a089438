//! Sibling services the composite service talks to over plain HTTP.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A sibling resource service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    /// Owns breeder records.
    Breeder,
    /// Owns pet records (each pet references a breeder).
    Pet,
    /// Owns customers and breeder waitlists.
    Customer,
}

impl Service {
    /// All services, in probe order.
    pub const ALL: [Self; 3] = [Self::Breeder, Self::Pet, Self::Customer];

    /// Lowercase identifier, used for metric labels and log fields.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Breeder => "breeder",
            Self::Pet => "pet",
            Self::Customer => "customer",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Breeder => write!(f, "Breeder"),
            Self::Pet => write!(f, "Pet"),
            Self::Customer => write!(f, "Customer"),
        }
    }
}
