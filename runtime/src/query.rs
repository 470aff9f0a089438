//! Query Layer: `breederPetsWithWaitlist(breeder_id)`.
//!
//! Fetches the breeder first, then the full pet list and the breeder's waitlist
//! concurrently. The pet service has no breeder filter on this path, so pets are
//! filtered here. Waitlist entries are joined onto pets by `pet_id`.
//!
//! Missing or malformed upstream JSON is a typed [`CompositeError::Decode`],
//! never an empty result.

use crate::client::ResourceClient;
use composite_core::{
    BreederGraph, CompositeError, CompositeResult, Consumer, PetGraph, RequestContext,
    WaitlistEntry,
};
use serde_json::Value;
use std::collections::HashMap;

/// Builds the nested breeder → pets → waitlist graph.
#[derive(Clone, Debug)]
pub struct QueryLayer {
    breeders: ResourceClient,
    pets: ResourceClient,
    customers: ResourceClient,
}

impl QueryLayer {
    /// Create a query layer.
    #[must_use]
    pub const fn new(
        breeders: ResourceClient,
        pets: ResourceClient,
        customers: ResourceClient,
    ) -> Self {
        Self {
            breeders,
            pets,
            customers,
        }
    }

    /// Resolve one breeder with its pets and their waitlists.
    ///
    /// # Errors
    ///
    /// - [`CompositeError::NotFound`] when the breeder does not exist
    /// - [`CompositeError::Decode`] when an upstream answer has the wrong shape
    /// - upstream and transport failures
    pub async fn breeder_pets_with_waitlist(
        &self,
        breeder_id: &str,
        ctx: &RequestContext,
    ) -> CompositeResult<BreederGraph> {
        let breeder = self
            .breeders
            .get_optional::<Value>(&ResourceClient::item(breeder_id), ctx)
            .await?
            .ok_or_else(|| CompositeError::not_found("Breeder", breeder_id))?;

        let waitlist_path = format!("breeder/{breeder_id}/waitlist");
        let (pets, waitlist) = tokio::try_join!(
            self.pets.get_value("", ctx),
            self.customers.get_value(&waitlist_path, ctx),
        )?;

        let mut waitlists = join_waitlist(&waitlist, breeder_id)?;

        let pets = pets
            .get("data")
            .and_then(Value::as_array)
            .ok_or_else(|| CompositeError::decode("pet service", "expected `data` array"))?
            .iter()
            .filter(|pet| pet.get("breeder_id").and_then(id_text).as_deref() == Some(breeder_id))
            .map(|pet| {
                let id = required_id(pet, "id", "pet")?;
                Ok::<_, CompositeError>(PetGraph {
                    waitlist: waitlists.remove(&id).unwrap_or_default(),
                    name: required_text(pet, "name", "pet")?,
                    pet_type: required_text(pet, "type", "pet")?,
                    price: pet.get("price").and_then(Value::as_f64),
                    breeder_id: breeder_id.to_string(),
                    image_url: optional_text(pet, "image_url"),
                    id,
                })
            })
            .collect::<CompositeResult<Vec<_>>>()?;

        tracing::debug!(breeder_id, pets = pets.len(), "Resolved breeder graph");

        Ok(BreederGraph {
            id: required_id(&breeder, "id", "breeder")?,
            name: required_text(&breeder, "name", "breeder")?,
            email: optional_text(&breeder, "email"),
            breeder_city: required_text(&breeder, "breeder_city", "breeder")?,
            breeder_country: required_text(&breeder, "breeder_country", "breeder")?,
            price_level: optional_text(&breeder, "price_level"),
            breeder_address: optional_text(&breeder, "breeder_address"),
            pets,
        })
    }
}

/// Group waitlist entries by pet id. Entries without a pet id are skipped.
fn join_waitlist(
    waitlist: &Value,
    breeder_id: &str,
) -> CompositeResult<HashMap<String, Vec<WaitlistEntry>>> {
    let entries = waitlist.as_array().ok_or_else(|| {
        CompositeError::decode(
            "waitlist service",
            format!("Unexpected waitlist data format: {waitlist}"),
        )
    })?;

    let mut by_pet: HashMap<String, Vec<WaitlistEntry>> = HashMap::new();
    for entry in entries {
        let Some(pet_id) = entry.get("pet_id").and_then(id_text) else {
            continue;
        };
        let customer_id = required_id(entry, "id", "waitlist entry")?;
        by_pet.entry(pet_id.clone()).or_default().push(WaitlistEntry {
            id: WaitlistEntry::compose_id(breeder_id, &pet_id, &customer_id),
            consumer: Consumer {
                name: required_text(entry, "name", "waitlist entry")?,
                email: required_text(entry, "email", "waitlist entry")?,
                id: customer_id,
            },
            pet_id,
            breeder_id: breeder_id.to_string(),
        });
    }
    Ok(by_pet)
}

fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn required_id(record: &Value, key: &str, context: &str) -> CompositeResult<String> {
    record
        .get(key)
        .and_then(id_text)
        .ok_or_else(|| CompositeError::decode(context, format!("missing `{key}`")))
}

fn required_text(record: &Value, key: &str, context: &str) -> CompositeResult<String> {
    record
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| CompositeError::decode(context, format!("missing `{key}`")))
}

fn optional_text(record: &Value, key: &str) -> Option<String> {
    record.get(key).and_then(Value::as_str).map(str::to_string)
}
