use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RuianError;

/// Lookup phase of the address field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Matching street names.
    #[default]
    Street,
    /// Matching house numbers and towns within an already chosen street.
    NumberTown,
}

impl Stage {
    /// The stage follows from whether a street has been chosen.
    pub fn for_street(street_id: Option<i64>) -> Self {
        match street_id {
            Some(_) => Self::NumberTown,
            None => Self::Street,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Street => "street",
            Self::NumberTown => "number_town",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = RuianError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "street" => Ok(Self::Street),
            "number_town" => Ok(Self::NumberTown),
            other => Err(RuianError::InvalidStage(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreetPayload {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressPayload {
    /// RUIAN code of the address place.
    pub id: String,
    pub city: String,
    pub zip: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub number: String,
}

/// One candidate returned by the lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Suggestion {
    Street {
        display: String,
        payload: StreetPayload,
    },
    Address {
        display: String,
        payload: AddressPayload,
    },
}

impl Suggestion {
    pub fn street(id: i64, name: impl Into<String>) -> Self {
        let name = name.into();
        Self::Street {
            display: name.clone(),
            payload: StreetPayload { id, name },
        }
    }

    pub fn address(
        ruian_code: impl Into<String>,
        number: impl Into<String>,
        city: impl Into<String>,
        zip: impl Into<String>,
    ) -> Self {
        let payload = AddressPayload {
            id: ruian_code.into(),
            city: city.into(),
            zip: zip.into(),
            number: number.into(),
        };
        let display = if payload.number.is_empty() {
            format!("{}, {}", payload.city, payload.zip)
        } else {
            format!("{}, {}, {}", payload.number, payload.city, payload.zip)
        };
        Self::Address { display, payload }
    }

    pub fn display(&self) -> &str {
        match self {
            Self::Street { display, .. } | Self::Address { display, .. } => display,
        }
    }
}

/// Explicit per-request context handed to the lookup instead of ambient session state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupContext {
    pub locale: String,
    /// Overrides the service's configured limit for this request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl Default for LookupContext {
    fn default() -> Self {
        Self {
            locale: "cs".to_string(),
            limit: None,
        }
    }
}

/// Payload sent to the suggestion endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestRequest {
    pub query: String,
    #[serde(default)]
    pub street_id: Option<i64>,
    pub stage: Stage,
    #[serde(default)]
    pub context: LookupContext,
}

impl SuggestRequest {
    pub fn new(query: impl Into<String>, street_id: Option<i64>, context: LookupContext) -> Self {
        Self {
            query: query.into(),
            street_id,
            stage: Stage::for_street(street_id),
            context,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_street_wire_shape() {
        let json = serde_json::to_value(Suggestion::street(7, "Main St")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "type": "street",
                "display": "Main St",
                "payload": { "id": 7, "name": "Main St" }
            })
        );
    }

    #[test]
    fn test_address_parses_without_number() {
        let s: Suggestion = serde_json::from_value(serde_json::json!({
            "type": "address",
            "display": "Springfield, 12345",
            "payload": { "id": "X1", "city": "Springfield", "zip": "12345" }
        }))
        .unwrap();

        match s {
            Suggestion::Address { payload, .. } => {
                assert_eq!(payload.id, "X1");
                assert!(payload.number.is_empty());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_stage_follows_street() {
        assert_eq!(Stage::for_street(None), Stage::Street);
        assert_eq!(Stage::for_street(Some(7)), Stage::NumberTown);
        let req = SuggestRequest::new("Main", Some(7), LookupContext::default());
        assert_eq!(req.stage, Stage::NumberTown);
    }

    #[test]
    fn test_stage_parse() {
        assert_eq!("number_town".parse::<Stage>().unwrap(), Stage::NumberTown);
        assert!(matches!(
            "town".parse::<Stage>(),
            Err(RuianError::InvalidStage(_))
        ));
    }

    #[test]
    fn test_address_display() {
        let s = Suggestion::address("21000001", "12", "Brno", "60200");
        assert_eq!(s.display(), "12, Brno, 60200");
    }
}
