//! OGC Filter Encoding 1.1 primitives.
//!
//! Only the operators the DOV client issues are modelled: binary comparisons,
//! `PropertyIsBetween`, a `Within` envelope test and a flat logical `And`.

use std::io::Write;

use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

use crate::error::{OwsError, Result};

/// OGC filter namespace.
pub const OGC_NAMESPACE: &str = "http://www.opengis.net/ogc";

/// GML 3.1 namespace.
pub const GML_NAMESPACE: &str = "http://www.opengis.net/gml";

/// Binary comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOperator {
    EqualTo,
    NotEqualTo,
    LessThan,
    GreaterThan,
    LessThanOrEqualTo,
    GreaterThanOrEqualTo,
}

impl ComparisonOperator {
    /// Filter Encoding element name for this operator.
    pub fn element_name(&self) -> &'static str {
        match self {
            ComparisonOperator::EqualTo => "ogc:PropertyIsEqualTo",
            ComparisonOperator::NotEqualTo => "ogc:PropertyIsNotEqualTo",
            ComparisonOperator::LessThan => "ogc:PropertyIsLessThan",
            ComparisonOperator::GreaterThan => "ogc:PropertyIsGreaterThan",
            ComparisonOperator::LessThanOrEqualTo => "ogc:PropertyIsLessThanOrEqualTo",
            ComparisonOperator::GreaterThanOrEqualTo => "ogc:PropertyIsGreaterThanOrEqualTo",
        }
    }
}

/// A rectangular envelope in a given reference system.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
    pub srs_name: Option<String>,
}

/// A filter expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `property <op> literal`
    Comparison {
        property: String,
        operator: ComparisonOperator,
        literal: String,
    },
    /// `lower <= property <= upper`
    Between {
        property: String,
        lower: String,
        upper: String,
    },
    /// Geometry of `property` lies within the envelope.
    Within {
        property: String,
        envelope: Envelope,
    },
    /// Logical conjunction of all operands.
    And(Vec<Filter>),
}

impl Filter {
    /// Number of leaf predicates in this filter.
    pub fn leaf_count(&self) -> usize {
        match self {
            Filter::And(operands) => operands.iter().map(Filter::leaf_count).sum(),
            _ => 1,
        }
    }

    /// Returns true for spatial leaves.
    pub fn is_spatial(&self) -> bool {
        matches!(self, Filter::Within { .. })
    }

    /// Serializes this filter as a standalone `ogc:Filter` document.
    pub fn to_xml(&self) -> Result<String> {
        let mut writer = Writer::new(Vec::new());
        self.write_document(&mut writer)?;
        String::from_utf8(writer.into_inner()).map_err(OwsError::write)
    }

    /// Writes the `ogc:Filter` element, including namespace declarations.
    pub fn write_document<W: Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        let mut root = BytesStart::new("ogc:Filter");
        root.push_attribute(("xmlns:ogc", OGC_NAMESPACE));
        root.push_attribute(("xmlns:gml", GML_NAMESPACE));
        writer
            .write_event(Event::Start(root))
            .map_err(OwsError::write)?;
        self.write_predicate(writer)?;
        writer
            .write_event(Event::End(BytesEnd::new("ogc:Filter")))
            .map_err(OwsError::write)?;
        Ok(())
    }

    fn write_predicate<W: Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        match self {
            Filter::Comparison {
                property,
                operator,
                literal,
            } => {
                let name = operator.element_name();
                start(writer, name)?;
                text_element(writer, "ogc:PropertyName", property)?;
                text_element(writer, "ogc:Literal", literal)?;
                end(writer, name)
            }
            Filter::Between {
                property,
                lower,
                upper,
            } => {
                start(writer, "ogc:PropertyIsBetween")?;
                text_element(writer, "ogc:PropertyName", property)?;
                start(writer, "ogc:LowerBoundary")?;
                text_element(writer, "ogc:Literal", lower)?;
                end(writer, "ogc:LowerBoundary")?;
                start(writer, "ogc:UpperBoundary")?;
                text_element(writer, "ogc:Literal", upper)?;
                end(writer, "ogc:UpperBoundary")?;
                end(writer, "ogc:PropertyIsBetween")
            }
            Filter::Within { property, envelope } => {
                start(writer, "ogc:Within")?;
                text_element(writer, "ogc:PropertyName", property)?;
                let mut env = BytesStart::new("gml:Envelope");
                env.push_attribute(("srsDimension", "2"));
                if let Some(srs) = &envelope.srs_name {
                    env.push_attribute(("srsName", srs.as_str()));
                }
                writer
                    .write_event(Event::Start(env))
                    .map_err(OwsError::write)?;
                text_element(
                    writer,
                    "gml:lowerCorner",
                    &format!("{:.3} {:.3}", envelope.min_x, envelope.min_y),
                )?;
                text_element(
                    writer,
                    "gml:upperCorner",
                    &format!("{:.3} {:.3}", envelope.max_x, envelope.max_y),
                )?;
                end(writer, "gml:Envelope")?;
                end(writer, "ogc:Within")
            }
            Filter::And(operands) => match operands.as_slice() {
                [] => Ok(()),
                [single] => single.write_predicate(writer),
                _ => {
                    start(writer, "ogc:And")?;
                    for operand in operands {
                        operand.write_predicate(writer)?;
                    }
                    end(writer, "ogc:And")
                }
            },
        }
    }
}

fn start<W: Write>(writer: &mut Writer<W>, name: &str) -> Result<()> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(OwsError::write)
}

fn end<W: Write>(writer: &mut Writer<W>, name: &str) -> Result<()> {
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(OwsError::write)
}

fn text_element<W: Write>(writer: &mut Writer<W>, name: &str, text: &str) -> Result<()> {
    start(writer, name)?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(OwsError::write)?;
    end(writer, name)
}
