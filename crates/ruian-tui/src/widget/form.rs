use std::collections::{HashMap, HashSet};

use ruian_core::{AddressField, PartnerAddress};

/// The form the address field writes into.
///
/// Writes go through [`set_value`](FormHost::set_value) so the host can react
/// to every change (dirty marking, validation), the way a value written by a
/// user would be handled.
pub trait FormHost {
    fn value(&self, field: AddressField) -> &str;
    fn set_value(&mut self, field: AddressField, value: String);
}

/// Partner address form state.
#[derive(Debug, Clone, Default)]
pub struct AddressForm {
    values: PartnerAddress,
    dirty: HashSet<AddressField>,
    errors: HashMap<AddressField, String>,
    changes: u64,
}

impl AddressForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values(values: PartnerAddress) -> Self {
        Self {
            values,
            ..Self::default()
        }
    }

    pub fn values(&self) -> &PartnerAddress {
        &self.values
    }

    pub fn into_values(self) -> PartnerAddress {
        self.values
    }

    pub fn is_dirty(&self) -> bool {
        !self.dirty.is_empty()
    }

    pub fn is_field_dirty(&self, field: AddressField) -> bool {
        self.dirty.contains(&field)
    }

    /// Number of change notifications received.
    pub fn change_count(&self) -> u64 {
        self.changes
    }

    pub fn error(&self, field: AddressField) -> Option<&str> {
        self.errors.get(&field).map(String::as_str)
    }

    /// Validation errors in field order.
    pub fn errors(&self) -> Vec<(AddressField, &str)> {
        AddressField::ALL
            .into_iter()
            .filter_map(|field| self.error(field).map(|msg| (field, msg)))
            .collect()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn on_changed(&mut self, field: AddressField) {
        self.changes += 1;
        self.dirty.insert(field);
        match field.validate(self.values.get(field)) {
            Some(message) => {
                self.errors.insert(field, message);
            }
            None => {
                self.errors.remove(&field);
            }
        }
        tracing::debug!(field = field.name(), "form field changed");
    }
}

impl FormHost for AddressForm {
    fn value(&self, field: AddressField) -> &str {
        self.values.get(field)
    }

    fn set_value(&mut self, field: AddressField, value: String) {
        self.values.set(field, value);
        self.on_changed(field);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_value_notifies() {
        let mut form = AddressForm::new();
        assert!(!form.is_dirty());

        form.set_value(AddressField::City, "Brno".into());
        assert_eq!(form.value(AddressField::City), "Brno");
        assert!(form.is_field_dirty(AddressField::City));
        assert!(!form.is_field_dirty(AddressField::Zip));
        assert_eq!(form.change_count(), 1);
    }

    #[test]
    fn test_validation_tracks_latest_value() {
        let mut form = AddressForm::new();
        form.set_value(AddressField::Zip, "123".into());
        assert!(!form.is_valid());
        assert!(form.error(AddressField::Zip).is_some());

        form.set_value(AddressField::Zip, "602 00".into());
        assert!(form.is_valid());
        assert!(form.errors().is_empty());
    }

    #[test]
    fn test_clearing_a_field_counts_as_change() {
        let mut form = AddressForm::with_values(PartnerAddress {
            city: "Brno".into(),
            ..PartnerAddress::default()
        });
        form.set_value(AddressField::City, String::new());
        assert_eq!(form.values().city, "");
        assert!(form.is_field_dirty(AddressField::City));
    }
}
