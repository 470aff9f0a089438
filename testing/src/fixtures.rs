//! Payload fixtures shared by unit and integration tests.

use composite_core::{BreederIn, CompositeIn, PetIn};
use serde_json::{Value, json};
use std::collections::HashMap;

/// A complete breeder submission.
#[must_use]
pub fn breeder_in() -> BreederIn {
    BreederIn {
        name: "Happy Paws".to_string(),
        breeder_city: "San Jose".to_string(),
        breeder_country: "USA".to_string(),
        price_level: "$$".to_string(),
        breeder_address: "1 Kennel Way".to_string(),
        email: Some("breeder@happypaws.example".to_string()),
    }
}

/// A pet submission named `name`.
#[must_use]
pub fn pet_in(name: &str) -> PetIn {
    PetIn {
        name: name.to_string(),
        pet_type: "dog".to_string(),
        price: 450.0,
        image_url: None,
    }
}

/// A composite with `pets` pets named `Pet 0`, `Pet 1`, ...
#[must_use]
pub fn composite_in(pets: usize) -> CompositeIn {
    CompositeIn {
        breeder: breeder_in(),
        pets: (0..pets).map(|i| pet_in(&format!("Pet {i}"))).collect(),
    }
}

/// The breeder service's representation of `breeder` under `id`.
#[must_use]
pub fn breeder_json(id: &str, breeder: &BreederIn) -> Value {
    let mut value = json!({
        "id": id,
        "name": breeder.name,
        "breeder_city": breeder.breeder_city,
        "breeder_country": breeder.breeder_country,
        "price_level": breeder.price_level,
        "breeder_address": breeder.breeder_address,
        "links": [],
    });
    if let (Some(email), Some(map)) = (&breeder.email, value.as_object_mut()) {
        map.insert("email".to_string(), json!(email));
    }
    value
}

/// The pet service's representation of `pet` under `id`.
#[must_use]
pub fn pet_json(id: &str, breeder_id: &str, pet: &PetIn) -> Value {
    json!({
        "id": id,
        "name": pet.name,
        "type": pet.pet_type,
        "price": pet.price,
        "breeder_id": breeder_id,
        "image_url": pet.image_url,
        "links": [],
    })
}

/// The customer service's representation of a customer.
#[must_use]
pub fn customer_json(id: &str, name: &str, email: &str) -> Value {
    json!({ "id": id, "name": name, "email": email })
}

/// An upstream list envelope.
#[must_use]
pub fn list_json(items: Vec<Value>) -> Value {
    json!({ "data": items, "links": [] })
}

/// Environment pointing every sibling service at `uri` (`/breeders`, `/pets`,
/// `/customers`), for use with `Config::from_lookup`.
#[must_use]
pub fn upstream_env(uri: &str) -> HashMap<String, String> {
    [
        ("BREEDER_SERVICE_URL", format!("{uri}/breeders")),
        ("PET_SERVICE_URL", format!("{uri}/pets")),
        ("CUSTOMER_SERVICE_URL", format!("{uri}/customers")),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), value))
    .collect()
}
