//! # Helios OWS
//!
//! Small, dependency-light building blocks for talking to OGC Web Services,
//! scoped to what the DOV client needs from a Web Feature Service.
//!
//! ## Modules
//!
//! - [`xml`] - Owned XML element tree, namespace context and path locators
//! - [`fes`] - OGC Filter Encoding 1.1 primitives (comparisons, between, within, and)
//! - [`wfs`] - WFS 1.1 GetFeature bodies, DescribeFeatureType and capabilities parsing,
//!   GML feature collection parsing
//! - [`error`] - Error type shared by all modules
//!
//! ## Example
//!
//! ```
//! use helios_ows::xml::{Locator, NamespaceContext, XmlElement};
//!
//! let doc = XmlElement::parse(
//!     r#"<root><laag><van>1.5</van></laag><laag><van>3.0</van></laag></root>"#,
//! ).unwrap();
//!
//! let layers = Locator::parse(".//laag").unwrap();
//! let van = Locator::parse("/van").unwrap();
//! let ns = NamespaceContext::unqualified();
//!
//! let depths: Vec<_> = layers
//!     .find_all(&doc, &ns)
//!     .into_iter()
//!     .filter_map(|layer| van.find_text(layer, &ns))
//!     .collect();
//! assert_eq!(depths, vec!["1.5", "3.0"]);
//! ```

pub mod error;
pub mod fes;
pub mod wfs;
pub mod xml;

pub use error::{OwsError, Result};
pub use fes::{ComparisonOperator, Envelope, Filter};
pub use wfs::{FeatureTypeSchema, GetFeature};
pub use xml::{Locator, NamespaceContext, XmlElement};
