//! Built-in DOV record types.
//!
//! Field names, source properties and definitions follow the published DOV
//! output definitions.

pub mod boring;
pub mod grondwaterfilter;
pub mod interpretaties;

use crate::error::RegistryError;
use crate::field::RecordType;

/// Every built-in record type, in catalogue order.
pub fn builtin() -> Result<Vec<RecordType>, RegistryError> {
    Ok(vec![
        boring::record_type()?,
        grondwaterfilter::record_type()?,
        interpretaties::informele_stratigrafie()?,
        interpretaties::formele_stratigrafie()?,
        interpretaties::hydrogeologische_stratigrafie()?,
        interpretaties::lithologische_beschrijvingen()?,
        interpretaties::gecodeerde_lithologie()?,
    ])
}

/// Looks up a built-in record type by name.
pub fn by_name(name: &str) -> Result<RecordType, RegistryError> {
    builtin()?
        .into_iter()
        .find(|t| t.name() == name)
        .ok_or_else(|| RegistryError::UnknownRecordType {
            name: name.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_builtin_types_build() {
        let types = builtin().unwrap();
        assert_eq!(types.len(), 7);
        for t in &types {
            assert!(!t.description().is_empty(), "{} lacks a description", t.name());
            assert!(t.layer().contains(':'), "{} layer is not qualified", t.name());
            assert!(!t.children().is_empty(), "{} has no child types", t.name());
        }
        let filter = types.iter().find(|t| t.name() == "grondwaterfilter").unwrap();
        assert_eq!(filter.children().len(), 2);
    }

    #[test]
    fn test_by_name() {
        assert_eq!(by_name("boring").unwrap().layer(), "dov-pub:Boringen");
        assert!(by_name("onbestaand").is_err());
    }
}
