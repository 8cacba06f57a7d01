//! The boundary between the client and the DOV services.
//!
//! Searching only needs two capabilities: listing features of a layer and
//! fetching the detail document of one record. Both are behind [`Transport`]
//! so that tests can substitute a recording stub for the HTTP implementation.
//! Schema discovery is a separate, optional [`SchemaService`].

use helios_ows::{FeatureTypeSchema, Filter, GetFeature, XmlElement};

use crate::error::TransportError;

/// One listing request against a WFS layer.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRequest {
    /// Qualified layer name.
    pub type_name: String,
    pub namespace: Option<String>,
    pub filter: Filter,
    pub max_features: Option<u32>,
    pub srs_name: Option<String>,
    /// Listing properties to request; empty requests all of them.
    pub property_names: Vec<String>,
}

impl FeatureRequest {
    pub fn new(type_name: impl Into<String>, filter: Filter) -> Self {
        Self {
            type_name: type_name.into(),
            namespace: None,
            filter,
            max_features: None,
            srs_name: None,
            property_names: Vec::new(),
        }
    }

    /// The WFS GetFeature request for this listing.
    pub fn to_get_feature(&self, version: &str) -> GetFeature {
        let mut request = GetFeature::new(self.type_name.as_str())
            .with_version(version)
            .with_filter(self.filter.clone())
            .with_property_names(self.property_names.iter().cloned());
        if let Some(ns) = &self.namespace {
            request = request.with_namespace(ns.as_str());
        }
        if let Some(max) = self.max_features {
            request = request.with_max_features(max);
        }
        if let Some(srs) = &self.srs_name {
            request = request.with_srs_name(srs.as_str());
        }
        request
    }
}

/// Retrieval of listing features and detail documents.
pub trait Transport: Send + Sync {
    /// Returns the feature elements matching the request, in service order.
    fn list_features(&self, request: &FeatureRequest) -> Result<Vec<XmlElement>, TransportError>;

    /// Returns the raw XML detail document of the record with this identity.
    fn fetch_detail(&self, identity: &str) -> Result<String, TransportError>;
}

/// Discovery of layer schemas and server limits.
pub trait SchemaService: Send + Sync {
    fn describe_feature_type(&self, type_name: &str) -> Result<FeatureTypeSchema, TransportError>;

    /// The server's default maximum number of features per request, if it
    /// advertises one.
    fn default_max_features(&self) -> Result<Option<u32>, TransportError>;
}
