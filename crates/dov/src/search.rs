//! Result Assembler.
//!
//! [`Search`] ties the registry, the filter builder, the transport and the
//! record model together: one call to [`Search::search`] validates the
//! request, lists the matching features, resolves detail documents where the
//! requested fields need them and returns a flat [`Table`].

use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::error::{DovError, Result};
use crate::field::FieldInfo;
use crate::query::{BoundingBox, DEFAULT_SRS, FilterBuilder, parse_query};
use crate::record::Record;
use crate::registry::RegisteredType;
use crate::table::{Column, Table};
use crate::transport::{FeatureRequest, Transport};
use crate::value::ValueType;

/// Per-client search settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    /// Limit applied when a request does not set one.
    pub max_features: Option<u32>,
    /// The server's `DefaultMaxFeatures`; requests are clamped to it.
    pub server_max_features: Option<u32>,
    pub srs_name: String,
    /// Fetch detail documents on the rayon pool before assembling rows.
    pub parallel_detail_fetch: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_features: None,
            server_max_features: None,
            srs_name: DEFAULT_SRS.to_string(),
            parallel_detail_fetch: false,
        }
    }
}

/// Parameters of one search.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchRequest {
    pub query: Option<String>,
    pub location: Option<BoundingBox>,
    pub return_fields: Option<Vec<String>>,
    pub max_features: Option<u32>,
}

impl SearchRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, expression: impl Into<String>) -> Self {
        self.query = Some(expression.into());
        self
    }

    pub fn location(mut self, bbox: BoundingBox) -> Self {
        self.location = Some(bbox);
        self
    }

    pub fn return_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.return_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn max_features(mut self, max: u32) -> Self {
        self.max_features = Some(max);
        self
    }

    /// The query expression, or `None` when absent or blank.
    fn query_text(&self) -> Option<&str> {
        self.query.as_deref().map(str::trim).filter(|q| !q.is_empty())
    }
}

/// Searches one record type.
pub struct Search {
    bound: Arc<RegisteredType>,
    transport: Arc<dyn Transport>,
    options: SearchOptions,
}

impl Search {
    pub fn new(bound: Arc<RegisteredType>, transport: Arc<dyn Transport>) -> Self {
        Self {
            bound,
            transport,
            options: SearchOptions::default(),
        }
    }

    pub fn with_options(mut self, options: SearchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    pub fn record_type(&self) -> &RegisteredType {
        &self.bound
    }

    /// Description of the record type.
    pub fn description(&self) -> &str {
        self.bound.record_type().description()
    }

    /// Metadata of every output field, plus the query-only properties of
    /// the layer once a schema is bound.
    pub fn fields(&self) -> Vec<FieldInfo> {
        self.bound.fields()
    }

    pub fn field_names(&self, include_children: bool) -> Vec<String> {
        self.bound.field_names(include_children)
    }

    /// Checks a request without touching the network: query and location
    /// exclusivity, the feature limit, return field names and query syntax.
    ///
    /// Returns the resolved return fields in registry order. Query field
    /// names are checked later by [`search`](Search::search), since a bound
    /// schema can publish more queryable properties.
    pub fn validate(&self, request: &SearchRequest) -> Result<Vec<String>> {
        match (request.query_text(), request.location.as_ref()) {
            (Some(_), Some(_)) => {
                return Err(DovError::invalid_search(
                    "query and location cannot be combined",
                ));
            }
            (None, None) => {
                return Err(DovError::invalid_search(
                    "either a query or a location is required",
                ));
            }
            _ => {}
        }
        if request.max_features == Some(0) {
            return Err(DovError::invalid_search("max_features must be positive"));
        }

        let fields = self
            .bound
            .resolve_return_fields(request.return_fields.as_deref())?;
        if let Some(query) = request.query_text() {
            parse_query(query)?;
        }
        Ok(fields)
    }

    /// Runs a search.
    ///
    /// Exactly one of query and location must be set. Field names and the
    /// query are validated before any request is sent.
    pub fn search(&self, request: &SearchRequest) -> Result<Table> {
        let fields = self.validate(request)?;
        let query = request.query_text();
        let filter = FilterBuilder::new(&self.bound)
            .with_srs_name(&self.options.srs_name)
            .build(query, request.location.as_ref())?;

        let listing = FeatureRequest {
            type_name: self.bound.record_type().layer().to_string(),
            namespace: self.bound.namespace().default_namespace().map(str::to_string),
            filter,
            max_features: self.effective_max_features(request.max_features),
            srs_name: Some(self.options.srs_name.clone()),
            property_names: self.bound.listing_properties(),
        };

        info!(
            record_type = self.bound.name(),
            query = ?query,
            location = ?request.location,
            max_features = ?listing.max_features,
            "Searching"
        );
        let features = self.transport.list_features(&listing)?;
        debug!(
            record_type = self.bound.name(),
            features = features.len(),
            "Received listing"
        );

        let mut records = features
            .iter()
            .map(|feature| Record::from_listing(Arc::clone(&self.bound), feature))
            .collect::<Result<Vec<_>>>()?;

        if self.options.parallel_detail_fetch {
            self.prefetch_details(&mut records, &fields)?;
        }

        let mut table = Table::new(self.columns(&fields));
        for record in &mut records {
            table.extend(record.to_rows(&fields, self.transport.as_ref())?);
        }

        info!(
            record_type = self.bound.name(),
            records = records.len(),
            rows = table.len(),
            "Search complete"
        );
        Ok(table)
    }

    /// Fetches the detail documents of all records that need one on the
    /// rayon pool, then applies them in listing order.
    fn prefetch_details(&self, records: &mut [Record], fields: &[String]) -> Result<()> {
        let pending: Vec<usize> = records
            .iter()
            .enumerate()
            .filter(|(_, r)| r.needs_detail(fields))
            .map(|(i, _)| i)
            .collect();
        if pending.is_empty() {
            return Ok(());
        }
        debug!(documents = pending.len(), "Fetching detail documents in parallel");

        let transport = self.transport.as_ref();
        let shared = &*records;
        let documents: Vec<_> = pending
            .par_iter()
            .map(|&i| transport.fetch_detail(shared[i].identity()))
            .collect();

        for (i, document) in pending.into_iter().zip(documents) {
            records[i].apply_detail(&document?)?;
        }
        Ok(())
    }

    fn columns(&self, fields: &[String]) -> Vec<Column> {
        let record_type = self.bound.record_type();
        fields
            .iter()
            .map(|name| {
                let value_type = record_type
                    .field(name)
                    .map(|f| f.value_type())
                    .unwrap_or(ValueType::String);
                Column::new(name.as_str(), value_type)
            })
            .collect()
    }

    /// The requested limit, falling back to the configured one and clamped
    /// to the server maximum.
    pub fn effective_max_features(&self, requested: Option<u32>) -> Option<u32> {
        let wanted = requested.or(self.options.max_features);
        match (wanted, self.options.server_max_features) {
            (Some(wanted), Some(server)) if wanted > server => {
                warn!(
                    requested = wanted,
                    server_max = server,
                    "Clamping max_features to the server maximum"
                );
                Some(server)
            }
            (None, server) => server,
            (wanted, _) => wanted,
        }
    }
}

#[cfg(test)]
mod tests {
    use helios_ows::XmlElement;

    use super::*;
    use crate::error::TransportError;
    use crate::registry::FieldRegistry;

    struct Unreachable;

    impl Transport for Unreachable {
        fn list_features(
            &self,
            _: &FeatureRequest,
        ) -> std::result::Result<Vec<XmlElement>, TransportError> {
            Err(TransportError::NotFound {
                what: "listing".to_string(),
            })
        }

        fn fetch_detail(&self, identity: &str) -> std::result::Result<String, TransportError> {
            Err(TransportError::NotFound {
                what: identity.to_string(),
            })
        }
    }

    fn search(options: SearchOptions) -> Search {
        let bound = FieldRegistry::builtin().unwrap().get("boring").unwrap();
        Search::new(bound, Arc::new(Unreachable)).with_options(options)
    }

    #[test]
    fn test_max_features_clamp() {
        let s = search(SearchOptions {
            max_features: Some(500),
            server_max_features: Some(1000),
            ..SearchOptions::default()
        });
        assert_eq!(s.effective_max_features(None), Some(500));
        assert_eq!(s.effective_max_features(Some(20)), Some(20));
        assert_eq!(s.effective_max_features(Some(5000)), Some(1000));

        let s = search(SearchOptions {
            server_max_features: Some(1000),
            ..SearchOptions::default()
        });
        assert_eq!(s.effective_max_features(None), Some(1000));
        assert_eq!(search(SearchOptions::default()).effective_max_features(None), None);
    }

    #[test]
    fn test_request_validation() {
        let s = search(SearchOptions::default());
        let bbox = BoundingBox::new(0.0, 0.0, 1.0, 1.0).unwrap();
        for request in [
            SearchRequest::new(),
            SearchRequest::new().query("   "),
            SearchRequest::new().query("gemeente = Gent").location(bbox),
            SearchRequest::new().query("gemeente = Gent").max_features(0),
            SearchRequest::new()
                .query("gemeente = Gent")
                .return_fields(Vec::<String>::new()),
        ] {
            assert!(
                matches!(
                    s.search(&request),
                    Err(DovError::InvalidSearchParameter { .. })
                ),
                "{:?} should be rejected",
                request
            );
        }
    }

    #[test]
    fn test_validate_without_transport() {
        let s = search(SearchOptions::default());
        let fields = s
            .validate(
                &SearchRequest::new()
                    .query("gemeente = Gent")
                    .return_fields(["boormethode", "pkey_boring"]),
            )
            .unwrap();
        assert_eq!(fields, vec!["pkey_boring", "boormethode"]);

        assert!(matches!(
            s.validate(&SearchRequest::new().query("gemeente == 'Gent")),
            Err(DovError::MalformedQuery { .. })
        ));
        // Field names in the query are left to the filter builder.
        assert!(s.validate(&SearchRequest::new().query("doel = grondwater")).is_ok());
    }

    #[test]
    fn test_transport_error_propagates() {
        let s = search(SearchOptions::default());
        let err = s
            .search(&SearchRequest::new().query("gemeente = Gent"))
            .unwrap_err();
        assert!(matches!(
            err,
            DovError::Transport(TransportError::NotFound { .. })
        ));
    }

    #[test]
    fn test_metadata() {
        let s = search(SearchOptions::default());
        assert!(s.description().contains("boring"));
        assert_eq!(s.fields().len(), s.field_names(true).len());
    }
}
