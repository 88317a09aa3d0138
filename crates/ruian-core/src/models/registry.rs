use serde::{Deserialize, Serialize};

/// A town part from the registry, keyed by its RUIAN code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Town {
    #[serde(default)]
    pub id: i64,
    pub code: i64,
    pub name: String,
    pub postal_code: String,
}

impl Town {
    pub fn new(code: i64, name: impl Into<String>, postal_code: impl Into<String>) -> Self {
        Self {
            id: 0,
            code,
            name: name.into(),
            postal_code: postal_code.into(),
        }
    }
}

/// A street name. Names are unique across the whole registry, so one street
/// may span several towns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Street {
    #[serde(default)]
    pub id: i64,
    pub name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub town_ids: Vec<i64>,

    #[serde(default)]
    pub number_count: u32,
}

impl Street {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            town_ids: Vec::new(),
            number_count: 0,
        }
    }
}

/// An address place (house number) identified by its RUIAN ADM code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressNumber {
    #[serde(default)]
    pub id: i64,
    pub code: i64,
    pub name: String,
    #[serde(default)]
    pub coord_x: f64,
    #[serde(default)]
    pub coord_y: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub town_id: Option<i64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub street_ids: Vec<i64>,
}

impl AddressNumber {
    pub fn new(code: i64, name: impl Into<String>) -> Self {
        Self {
            id: 0,
            code,
            name: name.into(),
            coord_x: 0.0,
            coord_y: 0.0,
            town_id: None,
            street_ids: Vec::new(),
        }
    }

    /// `"<number>, <streets>, <town>"`, skipping empty parts.
    pub fn full_address(&self, streets: &[Street], town: Option<&Town>) -> String {
        let street_names = streets
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join(", ");

        [
            self.name.as_str(),
            street_names.as_str(),
            town.map(|t| t.name.as_str()).unwrap_or_default(),
        ]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_address() {
        let number = AddressNumber::new(21_000_001, "12a");
        let streets = vec![Street::new("Hlavní")];
        let town = Town::new(400_001, "Brno - Veveří", "60200");

        assert_eq!(
            number.full_address(&streets, Some(&town)),
            "12a, Hlavní, Brno - Veveří"
        );
    }

    #[test]
    fn test_full_address_without_street() {
        let number = AddressNumber::new(1, "154");
        let town = Town::new(2, "Lhota", "53701");
        assert_eq!(number.full_address(&[], Some(&town)), "154, Lhota");
    }
}
