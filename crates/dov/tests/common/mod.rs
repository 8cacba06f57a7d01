//! Shared helpers for integration tests: fixtures and a recording transport.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use helios_dov::{FeatureRequest, SchemaService, Transport, TransportError};
use helios_ows::wfs::parse_feature_collection;
use helios_ows::{FeatureTypeSchema, XmlElement};

pub const BORING_1: &str = "https://www.dov.vlaanderen.be/data/boring/1930-120730";
pub const BORING_2: &str = "https://www.dov.vlaanderen.be/data/boring/2004-103984";
pub const BORING_3: &str = "https://www.dov.vlaanderen.be/data/boring/2016-125579";
pub const FILTER_1: &str = "https://www.dov.vlaanderen.be/data/filter/2003-004471";
pub const INTERPRETATIE_1: &str = "https://www.dov.vlaanderen.be/data/interpretatie/2016-290843";

/// Reads a file from `tests/data`.
pub fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("data")
        .join(name);
    std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("cannot read fixture {}: {}", path.display(), e))
}

/// A transport answering from fixtures and recording every call.
#[derive(Default)]
pub struct StubTransport {
    features: Vec<XmlElement>,
    details: HashMap<String, String>,
    listing_error: Option<TransportError>,
    requests: Mutex<Vec<FeatureRequest>>,
    detail_requests: Mutex<Vec<String>>,
    list_calls: AtomicUsize,
    detail_calls: AtomicUsize,
}

impl StubTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serves the features of a GetFeature response fixture.
    pub fn with_listing(mut self, fixture_name: &str) -> Self {
        self.features = parse_feature_collection(&fixture(fixture_name)).unwrap();
        self
    }

    pub fn with_detail(mut self, identity: &str, fixture_name: &str) -> Self {
        self.details
            .insert(identity.to_string(), fixture(fixture_name));
        self
    }

    pub fn with_detail_text(mut self, identity: &str, document: &str) -> Self {
        self.details
            .insert(identity.to_string(), document.to_string());
        self
    }

    pub fn with_listing_error(mut self, error: TransportError) -> Self {
        self.listing_error = Some(error);
        self
    }

    /// The three fixture boreholes with their detail documents.
    pub fn boringen() -> Self {
        Self::new()
            .with_listing("boring_listing.xml")
            .with_detail(BORING_1, "boring_1930-120730.xml")
            .with_detail(BORING_2, "boring_2004-103984.xml")
            .with_detail(BORING_3, "boring_2016-125579.xml")
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn detail_calls(&self) -> usize {
        self.detail_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.list_calls() + self.detail_calls()
    }

    pub fn last_request(&self) -> Option<FeatureRequest> {
        self.requests.lock().unwrap().last().cloned()
    }

    pub fn detail_requests(&self) -> Vec<String> {
        self.detail_requests.lock().unwrap().clone()
    }
}

impl Transport for StubTransport {
    fn list_features(&self, request: &FeatureRequest) -> Result<Vec<XmlElement>, TransportError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());
        match &self.listing_error {
            Some(err) => Err(err.clone()),
            None => Ok(self.features.clone()),
        }
    }

    fn fetch_detail(&self, identity: &str) -> Result<String, TransportError> {
        self.detail_calls.fetch_add(1, Ordering::SeqCst);
        self.detail_requests
            .lock()
            .unwrap()
            .push(identity.to_string());
        self.details
            .get(identity)
            .cloned()
            .ok_or_else(|| TransportError::Status {
                url: format!("{}.xml", identity),
                status: 404,
            })
    }
}

/// A schema service with a fixed answer.
pub struct StubSchemaService {
    pub schema: FeatureTypeSchema,
    pub max_features: Option<u32>,
    describe_calls: AtomicUsize,
    capabilities_calls: AtomicUsize,
}

impl StubSchemaService {
    pub fn new(namespace: &str, properties: &[&str], max_features: Option<u32>) -> Self {
        Self {
            schema: FeatureTypeSchema {
                namespace: namespace.to_string(),
                properties: properties.iter().map(|p| p.to_string()).collect(),
                ..Default::default()
            },
            max_features,
            describe_calls: AtomicUsize::new(0),
            capabilities_calls: AtomicUsize::new(0),
        }
    }

    /// Declares the XSD type of a published property.
    pub fn with_property_type(mut self, property: &str, type_name: &str) -> Self {
        self.schema
            .property_types
            .insert(property.to_string(), type_name.to_string());
        self
    }

    pub fn describe_calls(&self) -> usize {
        self.describe_calls.load(Ordering::SeqCst)
    }

    pub fn capabilities_calls(&self) -> usize {
        self.capabilities_calls.load(Ordering::SeqCst)
    }
}

impl SchemaService for StubSchemaService {
    fn describe_feature_type(&self, _type_name: &str) -> Result<FeatureTypeSchema, TransportError> {
        self.describe_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.schema.clone())
    }

    fn default_max_features(&self) -> Result<Option<u32>, TransportError> {
        self.capabilities_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.max_features)
    }
}
