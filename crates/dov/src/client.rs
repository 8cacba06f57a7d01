//! Client entry point.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::DovConfig;
use crate::error::{DovError, Result};
use crate::http::HttpTransport;
use crate::registry::FieldRegistry;
use crate::search::{Search, SearchOptions, SearchRequest};
use crate::table::Table;
use crate::transport::{SchemaService, Transport};

/// A registry of record types plus the services to search them.
///
/// When a [`SchemaService`] is configured, each record type is bound to the
/// schema its layer publishes the first time it is searched, and the server's
/// default feature limit is read once.
pub struct DovClient {
    registry: FieldRegistry,
    transport: Arc<dyn Transport>,
    schema_service: Option<Arc<dyn SchemaService>>,
    options: SearchOptions,
    server_limit_loaded: bool,
}

impl DovClient {
    pub fn new(registry: FieldRegistry, transport: Arc<dyn Transport>) -> Self {
        Self {
            registry,
            transport,
            schema_service: None,
            options: SearchOptions::default(),
            server_limit_loaded: false,
        }
    }

    /// A client for the configured WFS endpoint with every built-in record
    /// type.
    pub fn from_config(config: &DovConfig) -> Result<Self> {
        config.validate().map_err(DovError::Config)?;
        let http = Arc::new(HttpTransport::new(config)?);
        info!(url = %config.wfs_url, version = %config.wfs_version, "Creating DOV client");
        Ok(Self::new(FieldRegistry::builtin()?, http.clone())
            .with_schema_service(http)
            .with_options(config.search_options()))
    }

    pub fn with_schema_service(mut self, service: Arc<dyn SchemaService>) -> Self {
        self.schema_service = Some(service);
        self
    }

    pub fn with_options(mut self, options: SearchOptions) -> Self {
        self.options = options;
        self
    }

    pub fn registry(&self) -> &FieldRegistry {
        &self.registry
    }

    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    pub fn record_types(&self) -> Vec<&str> {
        self.registry.names()
    }

    /// A [`Search`] for one record type.
    ///
    /// With a schema service, the first call per record type binds the
    /// layer schema and the first call overall reads the server limit.
    pub fn search_for(&mut self, record_type: &str) -> Result<Search> {
        let mut bound = self.registry.get(record_type)?;

        if let Some(service) = &self.schema_service {
            if bound.schema().is_none() {
                let schema = service.describe_feature_type(bound.record_type().layer())?;
                debug!(
                    record_type,
                    namespace = %schema.namespace,
                    properties = schema.properties.len(),
                    "Bound feature type schema"
                );
                bound = self.registry.rebind(record_type, schema)?;
            }
            if !self.server_limit_loaded {
                self.options.server_max_features = service.default_max_features()?;
                self.server_limit_loaded = true;
                debug!(
                    server_max_features = ?self.options.server_max_features,
                    "Loaded server feature limit"
                );
            }
        }

        Ok(Search::new(bound, Arc::clone(&self.transport)).with_options(self.options.clone()))
    }

    /// Searches one record type.
    ///
    /// The request is checked against the registered type before the schema
    /// service is consulted.
    pub fn search(&mut self, record_type: &str, request: &SearchRequest) -> Result<Table> {
        let registered = self.registry.get(record_type)?;
        Search::new(registered, Arc::clone(&self.transport)).validate(request)?;
        self.search_for(record_type)?.search(request)
    }
}
