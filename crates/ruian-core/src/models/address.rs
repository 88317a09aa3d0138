use serde::{Deserialize, Serialize};

/// The four partner fields the address lookup writes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressField {
    Street,
    City,
    Zip,
    RuianCode,
}

impl AddressField {
    pub const ALL: [AddressField; 4] = [Self::Street, Self::City, Self::Zip, Self::RuianCode];

    pub fn name(self) -> &'static str {
        match self {
            Self::Street => "street",
            Self::City => "city",
            Self::Zip => "zip",
            Self::RuianCode => "ruian_code",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Street => "Street",
            Self::City => "City",
            Self::Zip => "ZIP",
            Self::RuianCode => "RUIAN code",
        }
    }

    /// Field-level validation. Empty values are always accepted.
    pub fn validate(self, value: &str) -> Option<String> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        match self {
            Self::Zip => {
                let digits: String = value.chars().filter(|c| !c.is_whitespace()).collect();
                if digits.len() != 5 || !digits.chars().all(|c| c.is_ascii_digit()) {
                    return Some(format!("ZIP must have 5 digits, got '{value}'"));
                }
                None
            }
            Self::RuianCode => {
                if !value.chars().all(|c| c.is_ascii_alphanumeric()) {
                    return Some(format!("RUIAN code must be alphanumeric, got '{value}'"));
                }
                None
            }
            Self::Street | Self::City => None,
        }
    }
}

/// Partner address as stored by the host form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnerAddress {
    pub street: String,
    pub city: String,
    pub zip: String,
    pub ruian_code: String,
}

impl PartnerAddress {
    pub fn get(&self, field: AddressField) -> &str {
        match field {
            AddressField::Street => &self.street,
            AddressField::City => &self.city,
            AddressField::Zip => &self.zip,
            AddressField::RuianCode => &self.ruian_code,
        }
    }

    pub fn set(&mut self, field: AddressField, value: impl Into<String>) {
        let slot = match field {
            AddressField::Street => &mut self.street,
            AddressField::City => &mut self.city,
            AddressField::Zip => &mut self.zip,
            AddressField::RuianCode => &mut self.ruian_code,
        };
        *slot = value.into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zip_validation() {
        assert!(AddressField::Zip.validate("60200").is_none());
        assert!(AddressField::Zip.validate("602 00").is_none());
        assert!(AddressField::Zip.validate("").is_none());
        assert!(AddressField::Zip.validate("6020").is_some());
        assert!(AddressField::Zip.validate("6020x").is_some());
    }

    #[test]
    fn test_ruian_code_validation() {
        assert!(AddressField::RuianCode.validate("21000001").is_none());
        assert!(AddressField::RuianCode.validate("X1").is_none());
        assert!(AddressField::RuianCode.validate("12-3").is_some());
    }

    #[test]
    fn test_get_set() {
        let mut address = PartnerAddress::default();
        address.set(AddressField::City, "Brno");
        assert_eq!(address.get(AddressField::City), "Brno");
        assert_eq!(address.city, "Brno");
    }
}
