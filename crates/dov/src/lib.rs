//! # helios-dov - Typed client for the DOV web feature service
//!
//! This crate searches the public web feature service of the Databank
//! Ondergrond Vlaanderen (DOV) and returns flat, typed tables. Every record
//! type is described once by field metadata; that metadata drives the query
//! filter, decides whether the per-record detail document has to be fetched
//! and types the output columns.
//!
//! ## Features
//!
//! - **Field Registry**: built-in record types (boreholes, groundwater filters,
//!   stratigraphic and lithological interpretations) with their listing,
//!   detail and derived fields
//! - **Type Coercion**: string, integer, float, date and boolean conversion of
//!   raw XML text
//! - **Query Filters**: a small `field operator literal` grammar plus bounding
//!   boxes, written as OGC Filter Encoding
//! - **Lazy Detail Resolution**: detail documents are fetched only when a
//!   requested field needs them, optionally in parallel
//! - **Output**: CSV, JSON, NDJSON, Parquet and Arrow record batches
//!
//! ## Record Types
//!
//! | Name | WFS layer |
//! |------|-----------|
//! | `boring` | `dov-pub:Boringen` |
//! | `grondwaterfilter` | `gw_meetnetten:meetnetten` |
//! | `informele_stratigrafie` | `interpretaties:informele_stratigrafie` |
//! | `formele_stratigrafie` | `interpretaties:formele_stratigrafie` |
//! | `hydrogeologische_stratigrafie` | `interpretaties:hydrogeologische_stratigrafie` |
//! | `lithologische_beschrijvingen` | `interpretaties:lithologische_beschrijvingen` |
//! | `gecodeerde_lithologie` | `interpretaties:gecodeerde_lithologie` |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use helios_dov::{ContentType, DovClient, DovConfig, SearchRequest};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut client = DovClient::from_config(&DovConfig::default())?;
//!
//!     let table = client.search(
//!         "boring",
//!         &SearchRequest::new()
//!             .query("gemeente = 'Sint-Truiden', diepte_boring_tot > 20")
//!             .return_fields(["pkey_boring", "diepte_boring_tot", "boormethode"]),
//!     )?;
//!
//!     table.write(ContentType::CsvWithHeader, std::io::stdout())?;
//!     Ok(())
//! }
//! ```
//!
//! ## Query Grammar
//!
//! Clauses are `field operator literal` triples separated by commas and
//! combined with AND; OR is not supported. Operators are `=`, `!=` (or `<>`),
//! `<`, `>`, `<=`, `>=` and `<<` (between), which takes a `(lower,upper)`
//! pair. Literals containing spaces or commas must be quoted.

pub mod client;
pub mod coerce;
pub mod config;
pub mod error;
pub mod field;
pub mod http;
pub mod query;
pub mod record;
pub mod registry;
pub mod search;
pub mod table;
pub mod transport;
pub mod types;
pub mod value;

pub use client::DovClient;
pub use config::DovConfig;
pub use error::{CoercionError, DovError, OutputError, RegistryError, Result, TransportError};
pub use field::{ChildType, Derivation, FieldDescriptor, FieldInfo, Origin, RecordType};
pub use http::HttpTransport;
pub use query::{BoundingBox, FilterBuilder};
pub use record::{Record, RecordState, Row, SubRecord};
pub use registry::{FieldRegistry, RegisteredType};
pub use search::{Search, SearchOptions, SearchRequest};
pub use table::{Column, ContentType, Table};
pub use transport::{FeatureRequest, SchemaService, Transport};
pub use value::{FieldValue, Value, ValueType};

/// Initializes the tracing subscriber for logging.
///
/// `RUST_LOG` takes precedence over `level`.
pub fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("helios_dov={},helios_ows={}", level, level)));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}
