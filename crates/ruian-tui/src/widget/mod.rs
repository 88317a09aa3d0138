//! The RUIAN address autocomplete field and the pieces it is built from.

pub mod debounce;
pub mod field;
pub mod form;
pub mod highlight;
pub mod view;

pub use debounce::Debouncer;
pub use field::{AddressAutocompleteField, FetchOutcome, FieldMessage, FieldSettings};
pub use form::{AddressForm, FormHost};
pub use highlight::{Segment, escape_regex, highlight_segments, highlight_text};
pub use view::{FieldView, SuggestionItem};
