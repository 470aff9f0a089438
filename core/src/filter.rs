//! Query-parameter builders for the list endpoint.
//!
//! `GET /composites/` accepts one flat set of filters and splits it into two
//! independent upstream queries. Only parameters with a meaningful value are
//! forwarded: blank strings are treated as absent and a zero offset is the
//! upstream default, so it is dropped.

use crate::error::CompositeError;
use serde::Deserialize;

/// Largest page size accepted for either upstream list.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Filters accepted by `GET /composites/`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CompositeFilter {
    /// Page size for breeders
    #[serde(default)]
    pub breeder_limit: Option<u32>,
    /// Offset into breeders
    #[serde(default)]
    pub breeder_offset: Option<u32>,
    /// Restrict breeders to a city
    #[serde(default)]
    pub breeder_city: Option<String>,
    /// Page size for pets
    #[serde(default)]
    pub pet_limit: Option<u32>,
    /// Offset into pets
    #[serde(default)]
    pub pet_offset: Option<u32>,
    /// Restrict pets to a type
    #[serde(default, rename = "type")]
    pub pet_type: Option<String>,
}

impl CompositeFilter {
    /// Check limits against [`MAX_PAGE_SIZE`].
    ///
    /// # Errors
    ///
    /// Returns [`CompositeError::Validation`] when a limit is zero or too large.
    pub fn validate(&self) -> Result<(), CompositeError> {
        let mut problems = Vec::new();
        for (name, limit) in [
            ("breeder_limit", self.breeder_limit),
            ("pet_limit", self.pet_limit),
        ] {
            if let Some(limit) = limit {
                if !(1..=MAX_PAGE_SIZE).contains(&limit) {
                    problems.push(format!("{name} must be between 1 and {MAX_PAGE_SIZE}"));
                }
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(CompositeError::Validation(problems.join("; ")))
        }
    }

    /// Query for the breeder service: `limit`, `offset`, `breeder_city`.
    #[must_use]
    pub fn breeder_query(&self) -> QueryParams {
        QueryParams::default()
            .number("limit", self.breeder_limit)
            .offset("offset", self.breeder_offset)
            .text("breeder_city", self.breeder_city.as_deref())
    }

    /// Query for the pet service: `limit`, `offset`, `type`.
    #[must_use]
    pub fn pet_query(&self) -> QueryParams {
        QueryParams::default()
            .number("limit", self.pet_limit)
            .offset("offset", self.pet_offset)
            .text("type", self.pet_type.as_deref())
    }
}

/// Ordered `key=value` pairs for one upstream request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(Vec<(&'static str, String)>);

impl QueryParams {
    fn number(mut self, key: &'static str, value: Option<u32>) -> Self {
        if let Some(value) = value {
            self.0.push((key, value.to_string()));
        }
        self
    }

    fn offset(self, key: &'static str, value: Option<u32>) -> Self {
        self.number(key, value.filter(|offset| *offset > 0))
    }

    fn text(mut self, key: &'static str, value: Option<&str>) -> Self {
        if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
            self.0.push((key, value.to_string()));
        }
        self
    }

    /// The pairs, in insertion order. Suitable for `reqwest::RequestBuilder::query`.
    #[must_use]
    pub fn pairs(&self) -> &[(&'static str, String)] {
        &self.0
    }

    /// `true` when nothing would be forwarded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
