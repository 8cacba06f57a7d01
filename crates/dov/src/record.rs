//! Record model with lazy detail resolution.
//!
//! A [`Record`] is created from one listing feature. Listing and derived
//! fields are filled immediately; detail fields stay
//! [`FieldValue::Unresolved`] until the detail document is fetched, which
//! happens at most once and only when a requested field needs it.

use std::sync::Arc;

use helios_ows::{NamespaceContext, XmlElement};
use tracing::{debug, trace};

use crate::coerce::coerce;
use crate::error::{DovError, Result, TransportError};
use crate::field::{FieldDescriptor, FieldSource};
use crate::registry::RegisteredType;
use crate::transport::Transport;
use crate::value::{FieldValue, Value};

/// One output row, aligned with the requested field names.
pub type Row = Vec<Option<Value>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordState {
    /// Only listing and derived values are known.
    Listed,
    /// The detail document has been applied.
    DetailResolved,
}

/// One repeated nested entity of a record, aligned with the fields of its
/// child type.
#[derive(Debug, Clone, PartialEq)]
pub struct SubRecord {
    values: Vec<Option<Value>>,
}

impl SubRecord {
    pub fn values(&self) -> &[Option<Value>] {
        &self.values
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index).and_then(Option::as_ref)
    }
}

/// Where a requested column is read from.
#[derive(Debug, Clone, Copy)]
enum Column {
    Own(usize),
    Child { child: usize, field: usize },
}

#[derive(Debug, Clone)]
pub struct Record {
    identity: String,
    bound: Arc<RegisteredType>,
    values: Vec<FieldValue>,
    children: Vec<Vec<SubRecord>>,
    state: RecordState,
}

impl Record {
    /// Builds a record from a listing feature.
    ///
    /// Fails with a transport error when the feature lacks its identity and
    /// with a coercion error when a listing value has the wrong type.
    pub fn from_listing(bound: Arc<RegisteredType>, feature: &XmlElement) -> Result<Self> {
        let ns = bound.namespace();
        let record_type = bound.record_type();

        let mut values = Vec::with_capacity(record_type.own_fields().len());
        for field in record_type.own_fields() {
            let raw = match field.source() {
                FieldSource::Listing(locator) => locator.find_text(feature, ns),
                FieldSource::Derived(rule) => rule.evaluate(feature, ns),
                FieldSource::Detail(_) => {
                    values.push(FieldValue::Unresolved);
                    continue;
                }
            };
            let value = coerce(raw, field.value_type()).map_err(|e| e.for_field(field.name()))?;
            values.push(FieldValue::from(value));
        }

        let identity = record_type
            .own_field_index(record_type.identity_field())
            .and_then(|i| values[i].as_value())
            .map(|v| v.to_string())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| TransportError::InvalidResponse {
                message: format!(
                    "{} feature without '{}'",
                    record_type.name(),
                    record_type.identity_field()
                ),
            })?;

        let children = vec![Vec::new(); record_type.children().len()];
        Ok(Self {
            identity,
            bound,
            values,
            children,
            state: RecordState::Listed,
        })
    }

    /// The permanent identifier (detail document URL without `.xml`).
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn state(&self) -> RecordState {
        self.state
    }

    pub fn record_type(&self) -> &RegisteredType {
        &self.bound
    }

    /// Current value of an own field.
    pub fn value(&self, field: &str) -> Option<&FieldValue> {
        self.bound
            .record_type()
            .own_field_index(field)
            .map(|i| &self.values[i])
    }

    /// Resolved sub-records of a child type.
    pub fn sub_records(&self, child: &str) -> Option<&[SubRecord]> {
        self.bound
            .record_type()
            .children()
            .iter()
            .position(|c| c.name() == child)
            .map(|i| self.children[i].as_slice())
    }

    /// Returns true if any of `fields` can only be answered by the detail
    /// document and it has not been applied yet.
    pub fn needs_detail(&self, fields: &[String]) -> bool {
        if self.state == RecordState::DetailResolved {
            return false;
        }
        let record_type = self.bound.record_type();
        fields.iter().any(|name| {
            record_type
                .field(name)
                .is_some_and(|f| !f.is_cheap())
        })
    }

    /// Fetches and applies the detail document unless already resolved.
    pub fn resolve_detail(&mut self, transport: &dyn Transport) -> Result<()> {
        if self.state == RecordState::DetailResolved {
            return Ok(());
        }
        trace!(identity = %self.identity, "Fetching detail document");
        let document = transport.fetch_detail(&self.identity)?;
        self.apply_detail(&document)
    }

    /// Applies a detail document.
    ///
    /// Either every detail field and sub-record is filled or the record is
    /// left untouched.
    pub fn apply_detail(&mut self, document: &str) -> Result<()> {
        if self.state == RecordState::DetailResolved {
            return Ok(());
        }
        let root = XmlElement::parse(document)
            .map_err(|e| DovError::detail_fetch(self.identity.as_str(), e.to_string()))?;
        let ns = NamespaceContext::unqualified();
        let record_type = self.bound.record_type();

        let mut values = self.values.clone();
        for (slot, field) in values.iter_mut().zip(record_type.own_fields()) {
            if let FieldSource::Detail(locator) = field.source() {
                *slot = self.detail_value(field, locator.find_text(&root, &ns))?.into();
            }
        }

        let mut children = Vec::with_capacity(record_type.children().len());
        for child in record_type.children() {
            let mut subs = Vec::new();
            for element in child.root().find_all(&root, &ns) {
                let mut sub = Vec::with_capacity(child.fields().len());
                for field in child.fields() {
                    let raw = field.locator().and_then(|l| l.find_text(element, &ns));
                    sub.push(self.detail_value(field, raw)?);
                }
                subs.push(SubRecord { values: sub });
            }
            children.push(subs);
        }

        debug!(
            identity = %self.identity,
            sub_records = children.iter().map(Vec::len).sum::<usize>(),
            "Applied detail document"
        );
        self.values = values;
        self.children = children;
        self.state = RecordState::DetailResolved;
        Ok(())
    }

    fn detail_value(&self, field: &FieldDescriptor, raw: Option<&str>) -> Result<Option<Value>> {
        if field.is_notnull() && raw.is_none_or(|r| r.trim().is_empty()) {
            return Err(DovError::detail_fetch(
                self.identity.as_str(),
                format!("required field '{}' is missing", field.name()),
            ));
        }
        coerce(raw, field.value_type()).map_err(|e| e.for_field(field.name()).into())
    }

    /// Materializes rows for `fields`, resolving the detail document first
    /// when needed. Calling it again returns the same rows without another
    /// fetch.
    pub fn to_rows(&mut self, fields: &[String], transport: &dyn Transport) -> Result<Vec<Row>> {
        if self.needs_detail(fields) {
            self.resolve_detail(transport)?;
        }
        self.rows(fields)
    }

    /// Materializes rows from the values known so far.
    ///
    /// Without requested child fields this is a single row. Otherwise there
    /// is one row per sub-record of each requested child type, with the
    /// fields of other child types null; a record without sub-records yields
    /// no rows.
    pub fn rows(&self, fields: &[String]) -> Result<Vec<Row>> {
        let record_type = self.bound.record_type();
        let columns = fields
            .iter()
            .map(|name| {
                if let Some(i) = record_type.own_field_index(name) {
                    return Ok(Column::Own(i));
                }
                record_type
                    .child_of(name)
                    .and_then(|(child, ty)| ty.field_index(name).map(|field| Column::Child { child, field }))
                    .ok_or_else(|| DovError::unknown_field(record_type.name(), name.as_str()))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut requested: Vec<usize> = columns
            .iter()
            .filter_map(|c| match c {
                Column::Child { child, .. } => Some(*child),
                Column::Own(_) => None,
            })
            .collect();
        requested.sort_unstable();
        requested.dedup();

        let own = |i: usize| self.values[i].as_value().cloned();
        if requested.is_empty() {
            return Ok(vec![columns
                .iter()
                .map(|c| match c {
                    Column::Own(i) => own(*i),
                    Column::Child { .. } => None,
                })
                .collect()]);
        }

        let mut rows = Vec::new();
        for child in requested {
            for sub in &self.children[child] {
                rows.push(
                    columns
                        .iter()
                        .map(|c| match *c {
                            Column::Own(i) => own(i),
                            Column::Child { child: owner, field } if owner == child => {
                                sub.get(field).cloned()
                            }
                            Column::Child { .. } => None,
                        })
                        .collect(),
                );
            }
        }
        Ok(rows)
    }
}
