mod address;
mod import_log;
mod registry;
mod suggestion;

pub use address::{AddressField, PartnerAddress};
pub use import_log::{ImportLog, ImportState};
pub use registry::{AddressNumber, Street, Town};
pub use suggestion::{
    AddressPayload, LookupContext, Stage, StreetPayload, SuggestRequest, Suggestion,
};
