//! Nested breeder → pets → waitlist graph returned by the query layer.
//!
//! Serialized with camelCase field names under
//! `{"data": {"breederPetsWithWaitlist": ...}}`.

use serde::{Deserialize, Serialize};

/// A breeder with its pets and each pet's waitlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BreederGraph {
    /// Breeder id
    pub id: String,
    /// Breeder name
    pub name: String,
    /// Contact email
    pub email: Option<String>,
    /// City
    pub breeder_city: String,
    /// Country
    pub breeder_country: String,
    /// Price level label
    pub price_level: Option<String>,
    /// Street address
    pub breeder_address: Option<String>,
    /// Pets owned by this breeder
    pub pets: Vec<PetGraph>,
}

/// A pet with its waitlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PetGraph {
    /// Pet id
    pub id: String,
    /// Pet name
    pub name: String,
    /// Species or breed
    #[serde(rename = "type")]
    pub pet_type: String,
    /// Asking price
    pub price: Option<f64>,
    /// Owning breeder
    pub breeder_id: String,
    /// Picture
    pub image_url: Option<String>,
    /// Customers waiting for this pet
    pub waitlist: Vec<WaitlistEntry>,
}

/// One customer waiting for one pet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WaitlistEntry {
    /// `{breeder_id}_{pet_id}_{entry_id}`
    pub id: String,
    /// The waiting customer
    pub consumer: Consumer,
    /// Pet waited for
    pub pet_id: String,
    /// Breeder of that pet
    pub breeder_id: String,
}

impl WaitlistEntry {
    /// Composite id of a waitlist entry.
    #[must_use]
    pub fn compose_id(breeder_id: &str, pet_id: &str, entry_id: &str) -> String {
        format!("{breeder_id}_{pet_id}_{entry_id}")
    }
}

/// Customer as shown inside a waitlist entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consumer {
    /// Customer id
    pub id: String,
    /// Name
    pub name: String,
    /// Email
    pub email: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_graph_uses_camel_case() {
        let graph = BreederGraph {
            id: "1".into(),
            name: "B".into(),
            email: None,
            breeder_city: "C".into(),
            breeder_country: "US".into(),
            price_level: Some("$".into()),
            breeder_address: None,
            pets: vec![PetGraph {
                id: "7".into(),
                name: "Rex".into(),
                pet_type: "dog".into(),
                price: Some(10.0),
                breeder_id: "1".into(),
                image_url: None,
                waitlist: vec![WaitlistEntry {
                    id: WaitlistEntry::compose_id("1", "7", "3"),
                    consumer: Consumer {
                        id: "c1".into(),
                        name: "Ann".into(),
                        email: "ann@example.com".into(),
                    },
                    pet_id: "7".into(),
                    breeder_id: "1".into(),
                }],
            }],
        };

        let value = serde_json::to_value(&graph).unwrap();
        assert_eq!(value["breederCity"], "C");
        assert_eq!(value["pets"][0]["breederId"], "1");
        assert_eq!(value["pets"][0]["type"], "dog");
        assert_eq!(value["pets"][0]["waitlist"][0]["id"], "1_7_3");
        assert_eq!(value["pets"][0]["waitlist"][0]["petId"], "7");
        assert_eq!(
            value["pets"][0]["waitlist"][0]["consumer"],
            json!({"id": "c1", "name": "Ann", "email": "ann@example.com"})
        );
    }
}
