//! Field Registry.
//!
//! The registry holds every known [`RecordType`] bound to the schema of its
//! WFS layer. Binding produces the [`NamespaceContext`] that is handed to
//! every locator evaluation for that type; there is no global namespace
//! table.

use std::sync::Arc;

use helios_ows::{FeatureTypeSchema, NamespaceContext};
use tracing::debug;

use crate::error::{DovError, RegistryError, Result};
use crate::field::{FieldDescriptor, FieldInfo, FieldSource, Origin, RecordType};
use crate::types;
use crate::value::ValueType;

/// A record type bound to its feature type schema.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisteredType {
    record_type: RecordType,
    namespace: NamespaceContext,
    schema: Option<FeatureTypeSchema>,
}

impl RegisteredType {
    /// Binds a record type. A schema overrides the record type's built-in
    /// namespace; without either, locators match on local names.
    pub fn bind(record_type: RecordType, schema: Option<FeatureTypeSchema>) -> Self {
        let uri = schema
            .as_ref()
            .map(|s| s.namespace.as_str())
            .or(record_type.namespace());
        let namespace = match uri {
            Some(uri) => NamespaceContext::with_default(uri),
            None => NamespaceContext::unqualified(),
        };
        Self {
            record_type,
            namespace,
            schema,
        }
    }

    pub fn record_type(&self) -> &RecordType {
        &self.record_type
    }

    pub fn name(&self) -> &str {
        self.record_type.name()
    }

    /// Namespace context for listing locators.
    pub fn namespace(&self) -> &NamespaceContext {
        &self.namespace
    }

    pub fn schema(&self) -> Option<&FeatureTypeSchema> {
        self.schema.as_ref()
    }

    pub fn field_names(&self, include_children: bool) -> Vec<String> {
        self.record_type
            .field_names(include_children)
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Metadata of every output field, followed by the query-only
    /// properties of the bound schema.
    pub fn fields(&self) -> Vec<FieldInfo> {
        let mut fields = self.record_type.field_info();
        let Some(schema) = &self.schema else {
            return fields;
        };
        let sources: Vec<String> = self
            .listing_fields()
            .filter_map(FieldDescriptor::locator)
            .map(|l| property_name(l.as_str()))
            .collect();
        let geometry = self.record_type.geometry_property();
        for property in &schema.properties {
            if property == geometry || sources.contains(property) {
                continue;
            }
            if fields.iter().any(|f| &f.name == property) {
                continue;
            }
            if let Some(value_type) = xsd_value_type(schema.property_type(property)) {
                fields.push(FieldInfo::query_only(property, value_type));
            }
        }
        fields
    }

    /// Resolves the caller's return fields into registry order.
    ///
    /// `None` selects every field. Names are validated against the full field
    /// set; caller order and duplicates are ignored.
    pub fn resolve_return_fields(&self, subset: Option<&[String]>) -> Result<Vec<String>> {
        let all = self.record_type.field_names(true);
        let Some(subset) = subset else {
            return Ok(all.into_iter().map(str::to_string).collect());
        };
        if subset.is_empty() {
            return Err(DovError::invalid_search("return_fields must not be empty"));
        }
        if let Some(unknown) = subset.iter().find(|name| !all.contains(&name.as_str())) {
            return Err(DovError::unknown_field(self.name(), unknown.as_str()));
        }
        Ok(all
            .into_iter()
            .filter(|name| subset.iter().any(|s| s == name))
            .map(str::to_string)
            .collect())
    }

    /// The WFS property name to filter on for a query field.
    ///
    /// Accepts the output name of a listing field (translated to its source
    /// property) or a property published by the layer.
    pub fn queryable(&self, name: &str) -> Result<String> {
        if let Some(field) = self.record_type.own_fields().iter().find(|f| f.name() == name) {
            if let (Origin::Listing, Some(locator)) = (field.origin(), field.locator()) {
                return Ok(property_name(locator.as_str()));
            }
        }

        let published = match &self.schema {
            Some(schema) => schema.has_property(name),
            None => self
                .listing_fields()
                .filter_map(FieldDescriptor::locator)
                .any(|l| property_name(l.as_str()) == name),
        };
        if published {
            Ok(name.to_string())
        } else {
            Err(DovError::unknown_field(self.name(), name))
        }
    }

    fn listing_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.record_type
            .own_fields()
            .iter()
            .filter(|f| f.origin() == Origin::Listing)
    }

    /// Source properties of all listing fields, for a minimal GetFeature.
    pub fn listing_properties(&self) -> Vec<String> {
        let mut properties: Vec<String> = Vec::new();
        let derived = self
            .record_type
            .own_fields()
            .iter()
            .filter_map(|f| match f.source() {
                FieldSource::Derived(rule) => {
                    Some([rule.when.as_str(), rule.take.as_str()])
                }
                _ => None,
            })
            .flatten();
        let listed = self
            .listing_fields()
            .filter_map(FieldDescriptor::locator)
            .map(|l| l.as_str());
        for raw in listed.chain(derived) {
            let name = property_name(raw);
            if !properties.contains(&name) {
                properties.push(name);
            }
        }
        properties
    }
}

/// Maps a declared XSD type to a value type; `None` for geometry types.
fn xsd_value_type(type_name: Option<&str>) -> Option<ValueType> {
    let Some(type_name) = type_name else {
        return Some(ValueType::String);
    };
    let local = type_name.rsplit(':').next().unwrap_or(type_name);
    if local.ends_with("PropertyType") {
        return None;
    }
    Some(match local {
        "int" | "integer" | "long" | "short" | "byte" | "nonNegativeInteger"
        | "positiveInteger" | "unsignedInt" | "unsignedLong" => ValueType::Integer,
        "double" | "float" | "decimal" => ValueType::Float,
        "date" | "dateTime" => ValueType::Date,
        "boolean" => ValueType::Boolean,
        _ => ValueType::String,
    })
}

fn property_name(locator: &str) -> String {
    locator
        .trim()
        .trim_start_matches("./")
        .trim_start_matches('/')
        .to_string()
}

/// All record types known to a client.
#[derive(Debug, Clone, Default)]
pub struct FieldRegistry {
    types: Vec<Arc<RegisteredType>>,
}

impl FieldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in record type, bound without a schema.
    pub fn builtin() -> std::result::Result<Self, RegistryError> {
        let mut registry = Self::new();
        for record_type in types::builtin()? {
            registry.register(record_type, None)?;
        }
        Ok(registry)
    }

    /// Registers a record type with the schema of its layer.
    pub fn register(
        &mut self,
        record_type: RecordType,
        schema: Option<FeatureTypeSchema>,
    ) -> std::result::Result<Arc<RegisteredType>, RegistryError> {
        if self.types.iter().any(|t| t.name() == record_type.name()) {
            return Err(RegistryError::DuplicateRecordType {
                name: record_type.name().to_string(),
            });
        }
        debug!(
            record_type = record_type.name(),
            layer = record_type.layer(),
            has_schema = schema.is_some(),
            "Registering record type"
        );
        let registered = Arc::new(RegisteredType::bind(record_type, schema));
        self.types.push(Arc::clone(&registered));
        Ok(registered)
    }

    /// Replaces the schema a registered type is bound to.
    pub fn rebind(
        &mut self,
        name: &str,
        schema: FeatureTypeSchema,
    ) -> std::result::Result<Arc<RegisteredType>, RegistryError> {
        let slot = self
            .types
            .iter_mut()
            .find(|t| t.name() == name)
            .ok_or_else(|| RegistryError::UnknownRecordType {
                name: name.to_string(),
            })?;
        let rebound = Arc::new(RegisteredType::bind(
            slot.record_type().clone(),
            Some(schema),
        ));
        *slot = Arc::clone(&rebound);
        Ok(rebound)
    }

    pub fn get(&self, name: &str) -> std::result::Result<Arc<RegisteredType>, RegistryError> {
        self.types
            .iter()
            .find(|t| t.name() == name)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownRecordType {
                name: name.to_string(),
            })
    }

    /// Registered record type names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.types.iter().map(|t| t.name()).collect()
    }

    pub fn field_names(&self, record_type: &str, include_children: bool) -> Result<Vec<String>> {
        Ok(self.get(record_type)?.field_names(include_children))
    }

    pub fn fields(&self, record_type: &str) -> Result<Vec<FieldInfo>> {
        Ok(self.get(record_type)?.fields())
    }

    pub fn resolve_return_fields(
        &self,
        record_type: &str,
        subset: Option<&[String]>,
    ) -> Result<Vec<String>> {
        self.get(record_type)?.resolve_return_fields(subset)
    }

    pub fn queryable(&self, record_type: &str, name: &str) -> Result<String> {
        self.get(record_type)?.queryable(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_builtin_registry() {
        let registry = FieldRegistry::builtin().unwrap();
        assert!(registry.names().contains(&"boring"));
        assert!(registry.names().contains(&"grondwaterfilter"));
        assert!(registry.names().contains(&"informele_stratigrafie"));
        assert!(matches!(
            registry.get("sondering"),
            Err(RegistryError::UnknownRecordType { .. })
        ));
    }

    #[test]
    fn test_child_names_extend_own_names_without_duplicates() {
        let registry = FieldRegistry::builtin().unwrap();
        for name in registry.names() {
            let own = registry.field_names(name, false).unwrap();
            let all = registry.field_names(name, true).unwrap();
            assert!(all.len() > own.len(), "{} has no child fields", name);
            assert_eq!(&all[..own.len()], own.as_slice());
            let mut dedup = all.clone();
            dedup.sort();
            dedup.dedup();
            assert_eq!(dedup.len(), all.len(), "{} has duplicate fields", name);
        }
    }

    #[test]
    fn test_duplicate_registration() {
        let mut registry = FieldRegistry::builtin().unwrap();
        let boring = registry.get("boring").unwrap().record_type().clone();
        assert_eq!(
            registry.register(boring, None).unwrap_err(),
            RegistryError::DuplicateRecordType {
                name: "boring".to_string()
            }
        );
    }

    #[test]
    fn test_resolve_return_fields_uses_registry_order() {
        let registry = FieldRegistry::builtin().unwrap();
        let resolved = registry
            .resolve_return_fields(
                "boring",
                Some(&names(&["boormethode", "diepte_boring_tot", "pkey_boring"])),
            )
            .unwrap();
        assert_eq!(
            resolved,
            names(&["pkey_boring", "diepte_boring_tot", "boormethode"])
        );
    }

    #[test]
    fn test_resolve_return_fields_unknown() {
        let registry = FieldRegistry::builtin().unwrap();
        let err = registry
            .resolve_return_fields("boring", Some(&names(&["pkey_boring", "onbestaand"])))
            .unwrap_err();
        assert!(matches!(
            err,
            DovError::UnknownField { ref field, .. } if field == "onbestaand"
        ));
    }

    #[test]
    fn test_queryable_translates_listing_names() {
        let registry = FieldRegistry::builtin().unwrap();
        assert_eq!(
            registry.queryable("boring", "diepte_boring_tot").unwrap(),
            "diepte_tot_m"
        );
        assert_eq!(
            registry.queryable("boring", "diepte_tot_m").unwrap(),
            "diepte_tot_m"
        );
        assert!(matches!(
            registry.queryable("boring", "mv_mtaw"),
            Err(DovError::UnknownField { .. })
        ));
        assert!(matches!(
            registry.queryable("boring", "boormethode"),
            Err(DovError::UnknownField { .. })
        ));
    }

    #[test]
    fn test_schema_binding() {
        let mut registry = FieldRegistry::builtin().unwrap();
        let schema = FeatureTypeSchema {
            namespace: "http://example.org/boringen".to_string(),
            properties: names(&["fiche", "boornummer", "methode"]),
            ..Default::default()
        };
        let bound = registry.rebind("boring", schema).unwrap();
        assert_eq!(
            bound.namespace().default_namespace(),
            Some("http://example.org/boringen")
        );
        assert_eq!(bound.queryable("methode").unwrap(), "methode");
        assert_eq!(
            bound.queryable("diepte_boring_tot").unwrap(),
            "diepte_tot_m"
        );
        // Only published properties are queryable by their own name.
        assert!(bound.queryable("diepte_tot_m").is_err());
        assert!(bound.queryable("onbekend").is_err());
    }

    #[test]
    fn test_fields_list_query_only_properties() {
        let mut registry = FieldRegistry::builtin().unwrap();
        let output_fields = registry.fields("boring").unwrap().len();
        let mut schema = FeatureTypeSchema {
            namespace: "http://dov.vlaanderen.be/ocdov/dov-pub".to_string(),
            properties: names(&["fiche", "diepte_tot_m", "doel", "diepte_van_m", "geom"]),
            ..Default::default()
        };
        schema
            .property_types
            .insert("diepte_van_m".to_string(), "xsd:double".to_string());
        schema
            .property_types
            .insert("geom".to_string(), "gml:PointPropertyType".to_string());
        let bound = registry.rebind("boring", schema).unwrap();

        let fields = bound.fields();
        let query_only: Vec<&FieldInfo> = fields.iter().filter(|f| !f.returnable).collect();
        assert_eq!(fields.len(), output_fields + 2);
        assert_eq!(query_only[0].name, "doel");
        assert_eq!(query_only[0].value_type, ValueType::String);
        assert_eq!(query_only[1].name, "diepte_van_m");
        assert_eq!(query_only[1].value_type, ValueType::Float);
        assert!(query_only.iter().all(|f| f.queryable && f.origin == Origin::Listing));

        // Query-only properties filter but never return.
        assert_eq!(bound.queryable("doel").unwrap(), "doel");
        assert!(bound
            .resolve_return_fields(Some(names(&["doel"]).as_slice()))
            .is_err());
    }

    #[test]
    fn test_xsd_value_types() {
        assert_eq!(xsd_value_type(Some("xsd:int")), Some(ValueType::Integer));
        assert_eq!(xsd_value_type(Some("xs:boolean")), Some(ValueType::Boolean));
        assert_eq!(xsd_value_type(Some("xsd:date")), Some(ValueType::Date));
        assert_eq!(xsd_value_type(None), Some(ValueType::String));
        assert_eq!(xsd_value_type(Some("gml:MultiSurfacePropertyType")), None);
    }

    #[test]
    fn test_listing_properties_include_derivation_sources() {
        let registry = FieldRegistry::builtin().unwrap();
        let props = registry
            .get("informele_stratigrafie")
            .unwrap()
            .listing_properties();
        assert!(props.contains(&"Interpretatiefiche".to_string()));
        assert!(props.contains(&"Type_proef".to_string()));
        assert!(props.contains(&"Proeffiche".to_string()));
    }
}
