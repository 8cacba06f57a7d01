//! Blocking HTTP implementation of [`Transport`] and [`SchemaService`].

use reqwest::blocking::{Client, Response};
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, warn};
use url::Url;

use helios_ows::wfs::{
    capabilities_url, describe_feature_type_url, parse_default_max_features,
    parse_describe_feature_type, parse_feature_collection,
};
use helios_ows::{FeatureTypeSchema, XmlElement};

use crate::config::DovConfig;
use crate::error::TransportError;
use crate::transport::{FeatureRequest, SchemaService, Transport};

/// Talks to a DOV WFS endpoint over HTTP.
///
/// Listings are POSTed as WFS GetFeature XML bodies; detail documents are
/// fetched with a GET on `<identity>.xml`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
    version: String,
}

impl HttpTransport {
    pub fn new(config: &DovConfig) -> Result<Self, TransportError> {
        let base_url = Url::parse(&config.wfs_url).map_err(|e| TransportError::Request {
            url: config.wfs_url.clone(),
            message: e.to_string(),
        })?;
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| TransportError::Request {
                url: config.wfs_url.clone(),
                message: e.to_string(),
            })?;
        Ok(Self {
            client,
            base_url,
            version: config.wfs_version.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn get_text(&self, url: &str) -> Result<String, TransportError> {
        debug!(url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| request_error(url, e))?;
        read_body(url, response)
    }
}

fn request_error(url: &str, err: reqwest::Error) -> TransportError {
    TransportError::Request {
        url: url.to_string(),
        message: err.to_string(),
    }
}

fn read_body(url: &str, response: Response) -> Result<String, TransportError> {
    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
        warn!(url, status = status.as_u16(), "Request failed");
        return Err(TransportError::Status {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    response.text().map_err(|e| request_error(url, e))
}

impl Transport for HttpTransport {
    fn list_features(&self, request: &FeatureRequest) -> Result<Vec<XmlElement>, TransportError> {
        let body = request.to_get_feature(&self.version).to_xml()?;
        let url = self.base_url.as_str();
        debug!(url, type_name = %request.type_name, "POST GetFeature");
        let response = self
            .client
            .post(self.base_url.clone())
            .header(CONTENT_TYPE, "text/xml; charset=UTF-8")
            .body(body)
            .send()
            .map_err(|e| request_error(url, e))?;
        let text = read_body(url, response)?;
        Ok(parse_feature_collection(&text)?)
    }

    fn fetch_detail(&self, identity: &str) -> Result<String, TransportError> {
        self.get_text(&format!("{}.xml", identity))
    }
}

impl SchemaService for HttpTransport {
    fn describe_feature_type(&self, type_name: &str) -> Result<FeatureTypeSchema, TransportError> {
        let url = describe_feature_type_url(&self.base_url, &self.version, type_name);
        let text = self.get_text(url.as_str())?;
        Ok(parse_describe_feature_type(&text)?)
    }

    fn default_max_features(&self) -> Result<Option<u32>, TransportError> {
        let url = capabilities_url(&self.base_url, &self.version);
        let text = self.get_text(url.as_str())?;
        Ok(parse_default_max_features(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_from_config() {
        let transport = HttpTransport::new(&DovConfig::for_testing()).unwrap();
        assert_eq!(transport.base_url().host_str(), Some("127.0.0.1"));
    }

    #[test]
    fn test_invalid_base_url() {
        let config = DovConfig {
            wfs_url: "::not a url".to_string(),
            ..DovConfig::for_testing()
        };
        assert!(matches!(
            HttpTransport::new(&config),
            Err(TransportError::Request { .. })
        ));
    }
}
