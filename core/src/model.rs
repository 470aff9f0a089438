//! Resource representations.
//!
//! Input types (`*In`, `*Update`) are what clients send to the composite
//! service and what the composite service forwards upstream. Output types carry
//! the upstream-assigned `id` plus hypermedia `links`.
//!
//! Upstream services are not consistent about identifier types, so every `id`
//! and foreign key is accepted as either a JSON string or a JSON number and
//! normalised to a string.

use crate::error::CompositeError;
use crate::link::Link;
use serde::{Deserialize, Deserializer, Serialize};

/// Accept a string or numeric identifier.
pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(text) => text,
        RawId::Number(number) => number.to_string(),
    })
}

/// Treat an explicit `null` the same as an absent list.
pub(crate) fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

// ============================================================================
// Breeders
// ============================================================================

/// Breeder attributes as submitted by a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreederIn {
    /// Display name
    pub name: String,
    /// City
    pub breeder_city: String,
    /// Country
    pub breeder_country: String,
    /// Price level label (e.g. `$$`)
    pub price_level: String,
    /// Street address
    pub breeder_address: String,
    /// Contact email, used for notifications
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// A breeder record owned by the breeder service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breeder {
    /// Identifier assigned by the breeder service
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    /// Breeder attributes
    #[serde(flatten)]
    pub attributes: BreederIn,
    /// Hypermedia links
    #[serde(default, deserialize_with = "null_as_empty")]
    pub links: Vec<Link>,
}

/// Partial breeder update. Only fields that are present are forwarded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreederUpdate {
    /// New name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New city
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breeder_city: Option<String>,
    /// New country
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breeder_country: Option<String>,
    /// New price level
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_level: Option<String>,
    /// New street address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breeder_address: Option<String>,
    /// New contact email
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl BreederUpdate {
    /// `true` when no field is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.breeder_city.is_none()
            && self.breeder_country.is_none()
            && self.price_level.is_none()
            && self.breeder_address.is_none()
            && self.email.is_none()
    }
}

// ============================================================================
// Pets
// ============================================================================

/// Pet attributes as submitted inside a composite. The breeder reference is
/// injected by the composite service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PetIn {
    /// Pet name
    pub name: String,
    /// Species or breed
    #[serde(rename = "type")]
    pub pet_type: String,
    /// Asking price
    pub price: f64,
    /// Optional picture
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

/// Body posted to the pet service: pet attributes plus the breeder reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewPet {
    /// Pet attributes
    #[serde(flatten)]
    pub attributes: PetIn,
    /// Breeder that owns the pet
    pub breeder_id: String,
}

impl NewPet {
    /// Stitch a pet to its breeder.
    #[must_use]
    pub fn new(attributes: PetIn, breeder_id: impl Into<String>) -> Self {
        Self {
            attributes,
            breeder_id: breeder_id.into(),
        }
    }
}

/// A pet record owned by the pet service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pet {
    /// Identifier assigned by the pet service
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    /// Pet attributes
    #[serde(flatten)]
    pub attributes: PetIn,
    /// Owning breeder
    #[serde(deserialize_with = "deserialize_id")]
    pub breeder_id: String,
    /// Hypermedia links
    #[serde(default, deserialize_with = "null_as_empty")]
    pub links: Vec<Link>,
}

/// Partial pet update. Only fields that are present are forwarded.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PetUpdate {
    /// New name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New species or breed
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub pet_type: Option<String>,
    /// New price
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    /// Move the pet to another breeder
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breeder_id: Option<String>,
    /// New picture
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl PetUpdate {
    /// `true` when no field is set.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.pet_type.is_none()
            && self.price.is_none()
            && self.breeder_id.is_none()
            && self.image_url.is_none()
    }
}

// ============================================================================
// Customers
// ============================================================================

/// A customer record owned by the customer service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    /// Identifier assigned by the customer service
    #[serde(deserialize_with = "deserialize_id")]
    pub id: String,
    /// Full name
    pub name: String,
    /// Email address
    pub email: String,
    /// Hypermedia links
    #[serde(default, deserialize_with = "null_as_empty")]
    pub links: Vec<Link>,
}

// ============================================================================
// Composites
// ============================================================================

/// `{data, links}` envelope used by every list-shaped response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListResponse<T> {
    /// Items
    pub data: Vec<T>,
    /// Hypermedia links for the list
    #[serde(default, deserialize_with = "null_as_empty")]
    pub links: Vec<Link>,
}

impl<T> ListResponse<T> {
    /// Wrap items with list links.
    #[must_use]
    pub const fn new(data: Vec<T>, links: Vec<Link>) -> Self {
        Self { data, links }
    }
}

/// Transient aggregate of breeders and pets, built per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Composite {
    /// Breeders section
    pub breeders: ListResponse<Breeder>,
    /// Pets section
    pub pets: ListResponse<Pet>,
    /// Links for the composite itself
    pub links: Vec<Link>,
}

/// A breeder together with the pets to create for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeIn {
    /// Breeder to create
    pub breeder: BreederIn,
    /// Pets to create under the new breeder
    pub pets: Vec<PetIn>,
}

impl CompositeIn {
    /// Basic shape checks before anything is sent upstream.
    ///
    /// # Errors
    ///
    /// Returns [`CompositeError::Validation`] listing every problem found.
    pub fn validate(&self) -> Result<(), CompositeError> {
        let mut problems = Vec::new();

        if self.breeder.name.trim().is_empty() {
            problems.push("breeder.name must not be empty".to_string());
        }

        for (index, pet) in self.pets.iter().enumerate() {
            if pet.name.trim().is_empty() {
                problems.push(format!("pets[{index}].name must not be empty"));
            }
            if !pet.price.is_finite() || pet.price < 0.0 {
                problems.push(format!("pets[{index}].price must be a non-negative number"));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(CompositeError::Validation(problems.join("; ")))
        }
    }
}

/// Update for a breeder and one of its pets.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompositeUpdate {
    /// Breeder changes, if any
    #[serde(default)]
    pub breeder: Option<BreederUpdate>,
    /// Pet changes, if any
    #[serde(default)]
    pub pet: Option<PetUpdate>,
}

impl CompositeUpdate {
    /// Breeder changes, when at least one field is set.
    #[must_use]
    pub fn breeder_changes(&self) -> Option<&BreederUpdate> {
        self.breeder.as_ref().filter(|update| !update.is_empty())
    }

    /// Pet changes, when at least one field is set.
    #[must_use]
    pub fn pet_changes(&self) -> Option<&PetUpdate> {
        self.pet.as_ref().filter(|update| !update.is_empty())
    }

    /// Shape checks on the fields that are present.
    ///
    /// # Errors
    ///
    /// Returns [`CompositeError::Validation`] for blank names or invalid prices.
    pub fn validate(&self) -> Result<(), CompositeError> {
        let mut problems = Vec::new();

        if let Some(name) = self.breeder.as_ref().and_then(|b| b.name.as_deref()) {
            if name.trim().is_empty() {
                problems.push("breeder.name must not be empty");
            }
        }
        if let Some(pet) = &self.pet {
            if pet.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
                problems.push("pet.name must not be empty");
            }
            if pet.price.is_some_and(|price| !price.is_finite() || price < 0.0) {
                problems.push("pet.price must be a non-negative number");
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(CompositeError::Validation(problems.join("; ")))
        }
    }
}
