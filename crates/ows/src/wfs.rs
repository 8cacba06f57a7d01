//! WFS request bodies and response parsing.
//!
//! Covers the small part of WFS the DOV client uses:
//!
//! - GetFeature as a WFS 1.1.0 POST body with an embedded filter
//! - GetFeature feature collections (`gml:featureMember`, `gml:featureMembers`,
//!   `wfs:member`)
//! - DescribeFeatureType target namespace and property names
//! - The `DefaultMaxFeatures` constraint from GetCapabilities

use std::collections::BTreeMap;

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use tracing::{debug, warn};
use url::Url;

use crate::error::{OwsError, Result};
use crate::fes::{Filter, GML_NAMESPACE};
use crate::xml::XmlElement;

/// WFS 1.x namespace.
pub const WFS_NAMESPACE: &str = "http://www.opengis.net/wfs";

/// WFS 2.0 namespace.
pub const WFS2_NAMESPACE: &str = "http://www.opengis.net/wfs/2.0";

/// OWS common namespace used in capabilities and exception reports.
pub const OWS_NAMESPACE: &str = "http://www.opengis.net/ows";

/// XML Schema namespace.
pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// XML Schema instance namespace.
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// A WFS GetFeature request.
#[derive(Debug, Clone, PartialEq)]
pub struct GetFeature {
    /// Qualified layer name, e.g. `dov-pub:Boringen`.
    pub type_name: String,
    /// Namespace bound to the layer prefix in the request body.
    pub namespace: Option<String>,
    /// Properties to return; empty means all.
    pub property_names: Vec<String>,
    pub filter: Option<Filter>,
    pub max_features: Option<u32>,
    pub srs_name: Option<String>,
    pub version: String,
}

impl GetFeature {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            namespace: None,
            property_names: Vec::new(),
            filter: None,
            max_features: None,
            srs_name: None,
            version: "1.1.0".to_string(),
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_property_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.property_names = names.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_max_features(mut self, max_features: u32) -> Self {
        self.max_features = Some(max_features);
        self
    }

    pub fn with_srs_name(mut self, srs_name: impl Into<String>) -> Self {
        self.srs_name = Some(srs_name.into());
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Prefix of the layer name, if it is qualified.
    pub fn type_prefix(&self) -> Option<&str> {
        self.type_name.split_once(':').map(|(prefix, _)| prefix)
    }

    /// Serializes the request as an XML POST body.
    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new(Vec::new());
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(OwsError::write)?;

        let mut root = BytesStart::new("wfs:GetFeature");
        root.push_attribute(("xmlns:wfs", WFS_NAMESPACE));
        root.push_attribute(("xmlns:gml", GML_NAMESPACE));
        root.push_attribute(("xmlns:xsi", XSI_NAMESPACE));
        root.push_attribute(("service", "WFS"));
        root.push_attribute(("version", self.version.as_str()));
        let max_features = self.max_features.map(|n| n.to_string());
        if let Some(max) = &max_features {
            root.push_attribute(("maxFeatures", max.as_str()));
        }
        root.push_attribute((
            "xsi:schemaLocation",
            "http://www.opengis.net/wfs http://schemas.opengis.net/wfs/1.1.0/wfs.xsd",
        ));
        writer
            .write_event(Event::Start(root))
            .map_err(OwsError::write)?;

        let mut query = BytesStart::new("wfs:Query");
        query.push_attribute(("typeName", self.type_name.as_str()));
        if let Some(srs) = &self.srs_name {
            query.push_attribute(("srsName", srs.as_str()));
        }
        let prefix_attr = self.type_prefix().map(|p| format!("xmlns:{}", p));
        if let (Some(attr), Some(ns)) = (&prefix_attr, &self.namespace) {
            query.push_attribute((attr.as_str(), ns.as_str()));
        }

        let filter = self.filter.as_ref().filter(|f| f.leaf_count() > 0);
        if filter.is_none() && self.property_names.is_empty() {
            writer
                .write_event(Event::Empty(query))
                .map_err(OwsError::write)?;
        } else {
            writer
                .write_event(Event::Start(query))
                .map_err(OwsError::write)?;
            for name in &self.property_names {
                writer
                    .write_event(Event::Start(BytesStart::new("wfs:PropertyName")))
                    .map_err(OwsError::write)?;
                writer
                    .write_event(Event::Text(BytesText::new(name)))
                    .map_err(OwsError::write)?;
                writer
                    .write_event(Event::End(BytesEnd::new("wfs:PropertyName")))
                    .map_err(OwsError::write)?;
            }
            if let Some(filter) = filter {
                filter.write_document(&mut writer)?;
            }
            writer
                .write_event(Event::End(BytesEnd::new("wfs:Query")))
                .map_err(OwsError::write)?;
        }

        writer
            .write_event(Event::End(BytesEnd::new("wfs:GetFeature")))
            .map_err(OwsError::write)?;
        String::from_utf8(writer.into_inner()).map_err(OwsError::write)
    }
}

/// Target namespace and property names of a feature type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureTypeSchema {
    pub namespace: String,
    pub properties: Vec<String>,
    /// Declared XSD type per property, e.g. `xsd:double`, when the schema
    /// states one.
    pub property_types: BTreeMap<String, String>,
}

impl FeatureTypeSchema {
    pub fn has_property(&self, name: &str) -> bool {
        self.properties.iter().any(|p| p == name)
    }

    pub fn property_type(&self, name: &str) -> Option<&str> {
        self.property_types.get(name).map(String::as_str)
    }
}

/// Extracts the feature elements from a GetFeature response.
///
/// An OWS exception report is returned as [`OwsError::ServiceException`].
pub fn parse_feature_collection(text: &str) -> Result<Vec<XmlElement>> {
    let root = XmlElement::parse(text)?;
    check_exception_report(&root)?;

    let mut features = Vec::new();
    for member in root.children() {
        match member.name() {
            "featureMember" | "featureMembers" | "member" => {
                features.extend(member.children().iter().cloned());
            }
            _ => {}
        }
    }
    debug!(
        root = root.name(),
        features = features.len(),
        "Parsed feature collection"
    );
    Ok(features)
}

/// Parses a DescribeFeatureType XML schema.
pub fn parse_describe_feature_type(text: &str) -> Result<FeatureTypeSchema> {
    let root = XmlElement::parse(text)?;
    check_exception_report(&root)?;

    if !root.is(XSD_NAMESPACE, "schema") {
        return Err(OwsError::MissingElement {
            element: "xsd:schema".to_string(),
            document: "DescribeFeatureType response".to_string(),
        });
    }

    let namespace = root
        .attribute("targetNamespace")
        .ok_or_else(|| OwsError::MissingElement {
            element: "@targetNamespace".to_string(),
            document: "DescribeFeatureType response".to_string(),
        })?
        .to_string();

    let mut properties = Vec::new();
    let mut property_types = BTreeMap::new();
    let elements = root
        .descendants()
        .filter(|e| e.is(XSD_NAMESPACE, "complexType"))
        .flat_map(|complex| complex.descendants())
        .filter(|e| e.is(XSD_NAMESPACE, "element"));
    for element in elements {
        let Some(name) = element.attribute("name") else {
            continue;
        };
        if let Some(type_name) = element.attribute("type") {
            property_types.insert(name.to_string(), type_name.to_string());
        }
        properties.push(name.to_string());
    }
    debug!(
        namespace = %namespace,
        properties = properties.len(),
        "Parsed feature type schema"
    );

    Ok(FeatureTypeSchema {
        namespace,
        properties,
        property_types,
    })
}

/// Reads the `DefaultMaxFeatures` (WFS 1.1) or `CountDefault` (WFS 2.0)
/// constraint from a capabilities document.
pub fn parse_default_max_features(text: &str) -> Result<Option<u32>> {
    let root = XmlElement::parse(text)?;
    check_exception_report(&root)?;

    let constraint = root.descendants().find(|e| {
        e.name() == "Constraint"
            && matches!(
                e.attribute("name"),
                Some("DefaultMaxFeatures") | Some("CountDefault")
            )
    });
    let Some(constraint) = constraint else {
        return Ok(None);
    };

    let value = constraint
        .descendants()
        .find(|e| matches!(e.name(), "DefaultValue" | "Value"))
        .and_then(|e| e.text())
        .map(str::trim);

    match value {
        Some(v) => v.parse::<u32>().map(Some).map_err(|e| OwsError::Parse {
            message: format!("invalid DefaultMaxFeatures '{}': {}", v, e),
        }),
        None => Ok(None),
    }
}

fn check_exception_report(root: &XmlElement) -> Result<()> {
    if root.name() != "ExceptionReport" && root.name() != "ServiceExceptionReport" {
        return Ok(());
    }
    let message = root
        .descendants()
        .filter(|e| matches!(e.name(), "ExceptionText" | "ServiceException"))
        .filter_map(|e| e.text())
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("; ");
    warn!(report = root.name(), message = %message, "Service returned an exception report");
    Err(OwsError::ServiceException {
        message: if message.is_empty() {
            "unspecified service exception".to_string()
        } else {
            message
        },
    })
}

/// Builds a key-value-pair request URL against a WFS endpoint.
fn kvp_url(base: &Url, version: &str, request: &str, extra: &[(&str, &str)]) -> Url {
    let mut url = base.clone();
    {
        let mut pairs = url.query_pairs_mut();
        pairs
            .append_pair("service", "WFS")
            .append_pair("version", version)
            .append_pair("request", request);
        for (key, value) in extra {
            pairs.append_pair(key, value);
        }
    }
    url
}

/// `GetCapabilities` URL for a WFS endpoint.
pub fn capabilities_url(base: &Url, version: &str) -> Url {
    kvp_url(base, version, "GetCapabilities", &[])
}

/// `DescribeFeatureType` URL for one layer.
pub fn describe_feature_type_url(base: &Url, version: &str, type_name: &str) -> Url {
    kvp_url(
        base,
        version,
        "DescribeFeatureType",
        &[("typeName", type_name)],
    )
}
