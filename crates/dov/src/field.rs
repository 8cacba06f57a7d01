//! Field descriptors and record type definitions.
//!
//! A [`RecordType`] owns its own [`FieldDescriptor`]s and a list of
//! [`ChildType`]s (repeatable nested entities found in the detail document).
//! All field-set questions ("which fields exist, in which order") are answered
//! from this data alone.

use std::collections::HashSet;

use helios_ows::{Locator, NamespaceContext, XmlElement};
use serde::Serialize;

use crate::error::RegistryError;
use crate::value::ValueType;

/// Where the value of a field comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// The bulk listing feature.
    Listing,
    /// The per-record detail document.
    Detail,
    /// Computed from other listing values.
    Derived,
}

/// A conditional pick between listing values.
///
/// Evaluates to the text of `take` when the text of `when` equals `equals`,
/// and to null otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Derivation {
    pub when: Locator,
    pub equals: String,
    pub take: Locator,
}

impl Derivation {
    pub fn when_equals(when: &str, equals: &str, take: &str) -> Result<Self, RegistryError> {
        Ok(Self {
            when: parse_locator(when, when)?,
            equals: equals.to_string(),
            take: parse_locator(take, take)?,
        })
    }

    pub fn evaluate<'a>(&self, element: &'a XmlElement, ns: &NamespaceContext) -> Option<&'a str> {
        match self.when.find_text(element, ns) {
            Some(text) if text.trim() == self.equals => self.take.find_text(element, ns),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldSource {
    Listing(Locator),
    Detail(Locator),
    Derived(Derivation),
}

/// Immutable metadata of one output column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    name: String,
    source: FieldSource,
    value_type: ValueType,
    notnull: bool,
    definition: String,
}

impl FieldDescriptor {
    /// A field read from the listing feature.
    pub fn listing(name: &str, locator: &str, type_tag: &str) -> Result<Self, RegistryError> {
        Self::new(name, FieldSource::Listing(parse_locator(name, locator)?), type_tag)
    }

    /// A field read from the detail document.
    pub fn detail(name: &str, locator: &str, type_tag: &str) -> Result<Self, RegistryError> {
        Self::new(name, FieldSource::Detail(parse_locator(name, locator)?), type_tag)
    }

    /// A field computed from listing values.
    pub fn derived(name: &str, rule: Derivation, type_tag: &str) -> Result<Self, RegistryError> {
        Self::new(name, FieldSource::Derived(rule), type_tag)
    }

    fn new(name: &str, source: FieldSource, type_tag: &str) -> Result<Self, RegistryError> {
        Ok(Self {
            name: name.to_string(),
            source,
            value_type: type_tag.parse()?,
            notnull: false,
            definition: String::new(),
        })
    }

    pub fn with_definition(mut self, definition: &str) -> Self {
        self.definition = definition.to_string();
        self
    }

    /// Marks the field as required in the detail document.
    pub fn not_null(mut self) -> Self {
        self.notnull = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &FieldSource {
        &self.source
    }

    pub fn origin(&self) -> Origin {
        match self.source {
            FieldSource::Listing(_) => Origin::Listing,
            FieldSource::Detail(_) => Origin::Detail,
            FieldSource::Derived(_) => Origin::Derived,
        }
    }

    /// Locator of listing and detail fields.
    pub fn locator(&self) -> Option<&Locator> {
        match &self.source {
            FieldSource::Listing(l) | FieldSource::Detail(l) => Some(l),
            FieldSource::Derived(_) => None,
        }
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn is_notnull(&self) -> bool {
        self.notnull
    }

    pub fn definition(&self) -> &str {
        &self.definition
    }

    /// Returns true for fields that are known without the detail document.
    pub fn is_cheap(&self) -> bool {
        self.origin() != Origin::Detail
    }
}

fn parse_locator(field: &str, expr: &str) -> Result<Locator, RegistryError> {
    Locator::parse(expr).map_err(|e| RegistryError::InvalidLocator {
        field: field.to_string(),
        message: e.to_string(),
    })
}

/// A repeatable nested entity of a record, read from the detail document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildType {
    name: String,
    root: Locator,
    fields: Vec<FieldDescriptor>,
}

impl ChildType {
    /// `root` selects the repeated elements, relative to the document root.
    pub fn new(name: &str, root: &str) -> Result<Self, RegistryError> {
        Ok(Self {
            name: name.to_string(),
            root: parse_locator(name, root)?,
            fields: Vec::new(),
        })
    }

    /// Adds a field whose locator is relative to one repeated element.
    pub fn with_field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &Locator {
        &self.root
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

/// Serializable description of one field of a record type.
///
/// Output fields are returnable. Layer properties published by the WFS
/// schema without an output field are listed as query-only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldInfo {
    pub name: String,
    pub origin: Origin,
    #[serde(rename = "type")]
    pub value_type: ValueType,
    pub notnull: bool,
    pub definition: String,
    /// Child type the field belongs to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub child: Option<String>,
    /// Usable in a query expression.
    pub queryable: bool,
    /// Usable as a return field.
    pub returnable: bool,
}

impl FieldInfo {
    /// A layer property that can be filtered on but is not an output column.
    pub fn query_only(name: &str, value_type: ValueType) -> Self {
        Self {
            name: name.to_string(),
            origin: Origin::Listing,
            value_type,
            notnull: false,
            definition: String::new(),
            child: None,
            queryable: true,
            returnable: false,
        }
    }
}

/// Definition of one record type: its layer, fields and child types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordType {
    name: String,
    layer: String,
    namespace: Option<String>,
    description: String,
    identity_field: String,
    geometry_property: String,
    fields: Vec<FieldDescriptor>,
    children: Vec<ChildType>,
}

impl RecordType {
    pub fn builder(name: &str, layer: &str) -> RecordTypeBuilder {
        RecordTypeBuilder {
            name: name.to_string(),
            layer: layer.to_string(),
            namespace: None,
            description: String::new(),
            identity_field: None,
            geometry_property: "geom".to_string(),
            fields: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Qualified WFS layer name, e.g. `dov-pub:Boringen`.
    pub fn layer(&self) -> &str {
        &self.layer
    }

    /// Feature namespace used when no schema has been bound.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Name of the own field holding the permanent identifier.
    pub fn identity_field(&self) -> &str {
        &self.identity_field
    }

    pub fn geometry_property(&self) -> &str {
        &self.geometry_property
    }

    pub fn own_fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn children(&self) -> &[ChildType] {
        &self.children
    }

    pub fn own_field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// The child type that declares `field`, if any.
    pub fn child_of(&self, field: &str) -> Option<(usize, &ChildType)> {
        self.children
            .iter()
            .enumerate()
            .find(|(_, c)| c.field_index(field).is_some())
    }

    /// Field names in registry order: own fields first, then child fields
    /// grouped per child type.
    pub fn field_names(&self, include_children: bool) -> Vec<&str> {
        let own = self.fields.iter().map(|f| f.name());
        if include_children {
            own.chain(
                self.children
                    .iter()
                    .flat_map(|c| c.fields.iter().map(|f| f.name())),
            )
            .collect()
        } else {
            own.collect()
        }
    }

    /// All descriptors in registry order.
    pub fn fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields
            .iter()
            .chain(self.children.iter().flat_map(|c| c.fields.iter()))
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields().find(|f| f.name == name)
    }

    pub fn field_info(&self) -> Vec<FieldInfo> {
        let own = self.fields.iter().map(|f| info(f, None));
        let children = self
            .children
            .iter()
            .flat_map(|c| c.fields.iter().map(move |f| info(f, Some(c.name()))));
        own.chain(children).collect()
    }
}

fn info(field: &FieldDescriptor, child: Option<&str>) -> FieldInfo {
    FieldInfo {
        name: field.name.clone(),
        origin: field.origin(),
        value_type: field.value_type,
        notnull: field.notnull,
        definition: field.definition.clone(),
        child: child.map(str::to_string),
        queryable: child.is_none() && field.origin() == Origin::Listing,
        returnable: true,
    }
}

/// Builder for [`RecordType`]; field name uniqueness is checked in
/// [`build`](RecordTypeBuilder::build).
#[derive(Debug, Clone)]
pub struct RecordTypeBuilder {
    name: String,
    layer: String,
    namespace: Option<String>,
    description: String,
    identity_field: Option<String>,
    geometry_property: String,
    fields: Vec<FieldDescriptor>,
    children: Vec<ChildType>,
}

impl RecordTypeBuilder {
    pub fn namespace(mut self, uri: &str) -> Self {
        self.namespace = Some(uri.to_string());
        self
    }

    pub fn description(mut self, text: &str) -> Self {
        self.description = text.to_string();
        self
    }

    /// The own field holding the permanent identifier. Defaults to the
    /// first own field.
    pub fn identity(mut self, field: &str) -> Self {
        self.identity_field = Some(field.to_string());
        self
    }

    pub fn geometry_property(mut self, property: &str) -> Self {
        self.geometry_property = property.to_string();
        self
    }

    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn child(mut self, child: ChildType) -> Self {
        self.children.push(child);
        self
    }

    pub fn build(self) -> Result<RecordType, RegistryError> {
        let mut seen = HashSet::new();
        let all = self
            .fields
            .iter()
            .chain(self.children.iter().flat_map(|c| c.fields.iter()));
        for field in all {
            if !seen.insert(field.name.as_str()) {
                return Err(RegistryError::DuplicateField {
                    record_type: self.name.clone(),
                    field: field.name.clone(),
                });
            }
        }

        for child in &self.children {
            if let Some(field) = child.fields.iter().find(|f| f.origin() != Origin::Detail) {
                return Err(RegistryError::InvalidDefinition {
                    record_type: self.name.clone(),
                    message: format!(
                        "field '{}' of child type '{}' must be a detail field",
                        field.name, child.name
                    ),
                });
            }
        }

        let identity_field = match self.identity_field {
            Some(name) => name,
            None => self
                .fields
                .first()
                .map(|f| f.name.clone())
                .ok_or_else(|| RegistryError::InvalidDefinition {
                    record_type: self.name.clone(),
                    message: "a record type needs at least one field".to_string(),
                })?,
        };
        let identity_is_listing = self
            .fields
            .iter()
            .any(|f| f.name == identity_field && f.origin() == Origin::Listing);
        if !identity_is_listing {
            return Err(RegistryError::InvalidDefinition {
                record_type: self.name,
                message: format!("identity field '{}' must be a listing field", identity_field),
            });
        }

        Ok(RecordType {
            name: self.name,
            layer: self.layer,
            namespace: self.namespace,
            description: self.description,
            identity_field,
            geometry_property: self.geometry_property,
            fields: self.fields,
            children: self.children,
        })
    }
}
