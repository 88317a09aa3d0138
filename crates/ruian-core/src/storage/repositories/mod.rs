mod import_log_repository;
mod number_repository;
mod street_repository;
mod town_repository;

pub use import_log_repository::{ImportLogRepository, SqliteImportLogRepository};
pub use number_repository::{NumberRepository, SqliteNumberRepository};
pub use street_repository::{SqliteStreetRepository, StreetRepository};
pub use town_repository::{SqliteTownRepository, TownRepository};

use crate::error::Result;

pub trait Repository {
    type Entity;
    type Id;

    fn find_by_id(&self, id: &Self::Id) -> Result<Option<Self::Entity>>;
    fn save(&self, entity: &Self::Entity) -> Result<i64>;
    fn delete(&self, id: &Self::Id) -> Result<bool>;
}

/// Lowercased form stored in the `*_folded` columns.
pub fn fold(text: &str) -> String {
    text.trim().to_lowercase()
}

/// `%term%` LIKE pattern over the folded form, with LIKE wildcards escaped
/// (use with `ESCAPE '\'`).
pub fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in fold(term).chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("Náměstí"), "%náměstí%");
        assert_eq!(contains_pattern("50%_a\\"), "%50\\%\\_a\\\\%");
    }
}
