//! Query Filter Builder.
//!
//! Translates a query expression and an optional bounding box into an OGC
//! filter. The expression grammar is deliberately small:
//!
//! ```text
//! expression = clause ("," clause)*
//! clause     = field operator literal
//! operator   = "=" | "!=" | "<>" | "<" | ">" | "<=" | ">=" | "<<"
//! literal    = word | 'quoted text' | "quoted text" | "(" lower "," upper ")"
//! ```
//!
//! Clauses are combined with AND; there is no OR. The `<<` operator is
//! "between" and takes a parenthesized `(lower,upper)` pair.

use std::fmt;
use std::str::FromStr;

use helios_ows::{ComparisonOperator, Envelope, Filter};

use crate::error::{DovError, Result};
use crate::registry::RegisteredType;

/// Default spatial reference system of the DOV services (Belgian Lambert 72).
pub const DEFAULT_SRS: &str = "EPSG:31370";

/// A rectangular search area in the service CRS.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Result<Self> {
        let coords = [min_x, min_y, max_x, max_y];
        if coords.iter().any(|c| !c.is_finite()) {
            return Err(DovError::invalid_search(
                "bounding box coordinates must be finite",
            ));
        }
        if min_x > max_x || min_y > max_y {
            return Err(DovError::invalid_search(format!(
                "bounding box ({}, {}, {}, {}) has its minimum above its maximum",
                min_x, min_y, max_x, max_y
            )));
        }
        Ok(Self {
            min_x,
            min_y,
            max_x,
            max_y,
        })
    }

    pub fn to_envelope(&self, srs_name: &str) -> Envelope {
        Envelope {
            min_x: self.min_x,
            min_y: self.min_y,
            max_x: self.max_x,
            max_y: self.max_y,
            srs_name: Some(srs_name.to_string()),
        }
    }
}

impl FromStr for BoundingBox {
    type Err = DovError;

    /// Parses `xmin,ymin,xmax,ymax`.
    fn from_str(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        let [min_x, min_y, max_x, max_y] = parts.as_slice() else {
            return Err(DovError::invalid_search(format!(
                "bounding box '{}' must have four comma-separated coordinates",
                s
            )));
        };
        let coord = |v: &str| {
            v.parse::<f64>().map_err(|_| {
                DovError::invalid_search(format!("invalid bounding box coordinate '{}'", v))
            })
        };
        BoundingBox::new(coord(min_x)?, coord(min_y)?, coord(max_x)?, coord(max_y)?)
    }
}

/// Operators of the query grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryOperator {
    Equal,
    NotEqual,
    LessThan,
    GreaterThan,
    LessOrEqual,
    GreaterOrEqual,
    Between,
}

impl QueryOperator {
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "=" => Some(QueryOperator::Equal),
            "!=" | "<>" => Some(QueryOperator::NotEqual),
            "<" => Some(QueryOperator::LessThan),
            ">" => Some(QueryOperator::GreaterThan),
            "<=" => Some(QueryOperator::LessOrEqual),
            ">=" => Some(QueryOperator::GreaterOrEqual),
            "<<" => Some(QueryOperator::Between),
            _ => None,
        }
    }

    fn comparison(&self) -> Option<ComparisonOperator> {
        match self {
            QueryOperator::Equal => Some(ComparisonOperator::EqualTo),
            QueryOperator::NotEqual => Some(ComparisonOperator::NotEqualTo),
            QueryOperator::LessThan => Some(ComparisonOperator::LessThan),
            QueryOperator::GreaterThan => Some(ComparisonOperator::GreaterThan),
            QueryOperator::LessOrEqual => Some(ComparisonOperator::LessThanOrEqualTo),
            QueryOperator::GreaterOrEqual => Some(ComparisonOperator::GreaterThanOrEqualTo),
            QueryOperator::Between => None,
        }
    }
}

impl fmt::Display for QueryOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = match self {
            QueryOperator::Equal => "=",
            QueryOperator::NotEqual => "!=",
            QueryOperator::LessThan => "<",
            QueryOperator::GreaterThan => ">",
            QueryOperator::LessOrEqual => "<=",
            QueryOperator::GreaterOrEqual => ">=",
            QueryOperator::Between => "<<",
        };
        f.write_str(token)
    }
}

/// Right-hand side of a clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Literal(String),
    Range { lower: String, upper: String },
}

/// One `field operator literal` triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub field: String,
    pub operator: QueryOperator,
    pub operand: Operand,
}

/// Parses a query expression into clauses without looking at field names.
pub fn parse_query(expression: &str) -> Result<Vec<Clause>> {
    let malformed = |message: String| DovError::malformed_query(expression, message);

    let mut clauses = Vec::new();
    for part in split_top_level(expression, ',').map_err(&malformed)? {
        let part = part.trim();
        if part.is_empty() {
            return Err(malformed("empty clause".to_string()));
        }
        let tokens = tokenize(part).map_err(&malformed)?;
        let [field, operator, literal] = tokens.as_slice() else {
            return Err(malformed(format!(
                "clause '{}' must have the form 'field operator literal', found {} tokens",
                part,
                tokens.len()
            )));
        };
        let operator = QueryOperator::parse(operator)
            .ok_or_else(|| malformed(format!("unknown operator '{}'", operator)))?;
        let operand = match operator {
            QueryOperator::Between => parse_range(literal).map_err(&malformed)?,
            _ => {
                if literal.starts_with('(') {
                    return Err(malformed(format!(
                        "operator '{}' does not take a range",
                        operator
                    )));
                }
                Operand::Literal(unquote(literal))
            }
        };
        clauses.push(Clause {
            field: field.to_string(),
            operator,
            operand,
        });
    }
    Ok(clauses)
}

/// Splits on `sep` outside quotes and parentheses.
fn split_top_level(input: &str, sep: char) -> std::result::Result<Vec<&str>, String> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;
    for (i, c) in input.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| "unbalanced ')'".to_string())?;
            }
            (None, c) if c == sep && depth == 0 => {
                parts.push(&input[start..i]);
                start = i + c.len_utf8();
            }
            _ => {}
        }
    }
    if quote.is_some() {
        return Err("unterminated quote".to_string());
    }
    if depth != 0 {
        return Err("unbalanced '('".to_string());
    }
    parts.push(&input[start..]);
    Ok(parts)
}

/// Splits a clause on whitespace, keeping quoted text and parenthesized
/// groups together.
fn tokenize(clause: &str) -> std::result::Result<Vec<String>, String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for c in clause.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => {
                quote = None;
                current.push(c);
            }
            (Some(_), c) => current.push(c),
            (None, '\'' | '"') => {
                quote = Some(c);
                current.push(c);
            }
            (None, '(') => {
                depth += 1;
                current.push(c);
            }
            (None, ')') => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            (None, c) if c.is_whitespace() && depth == 0 => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            (None, c) => current.push(c),
        }
    }
    if quote.is_some() {
        return Err("unterminated quote".to_string());
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    Ok(tokens)
}

fn unquote(token: &str) -> String {
    let trimmed = token.trim();
    for q in ['\'', '"'] {
        if let Some(inner) = trimmed
            .strip_prefix(q)
            .and_then(|rest| rest.strip_suffix(q))
        {
            return inner.to_string();
        }
    }
    trimmed.to_string()
}

fn parse_range(token: &str) -> std::result::Result<Operand, String> {
    let inner = token
        .trim()
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
        .ok_or_else(|| format!("between needs a '(lower,upper)' pair, found '{}'", token))?;
    let bounds = split_top_level(inner, ',')?;
    let [lower, upper] = bounds.as_slice() else {
        return Err(format!(
            "between needs exactly two comma-separated bounds, found '{}'",
            token
        ));
    };
    let (lower, upper) = (unquote(lower), unquote(upper));
    if lower.is_empty() || upper.is_empty() {
        return Err(format!("between bounds must not be empty in '{}'", token));
    }
    Ok(Operand::Range { lower, upper })
}

/// Builds filters for one registered record type.
pub struct FilterBuilder<'a> {
    record_type: &'a RegisteredType,
    srs_name: &'a str,
}

impl<'a> FilterBuilder<'a> {
    pub fn new(record_type: &'a RegisteredType) -> Self {
        Self {
            record_type,
            srs_name: DEFAULT_SRS,
        }
    }

    pub fn with_srs_name(mut self, srs_name: &'a str) -> Self {
        self.srs_name = srs_name;
        self
    }

    /// Builds the filter for an expression and/or a bounding box.
    ///
    /// Syntax errors are reported before field names are checked. Without
    /// constraints the result is an empty `And`, which writes no filter.
    pub fn build(&self, expression: Option<&str>, bbox: Option<&BoundingBox>) -> Result<Filter> {
        let clauses = match expression.map(str::trim).filter(|e| !e.is_empty()) {
            Some(expr) => parse_query(expr)?,
            None => Vec::new(),
        };

        let mut leaves = Vec::with_capacity(clauses.len() + 1);
        for clause in clauses {
            let property = self.record_type.queryable(&clause.field)?;
            let leaf = match (clause.operator.comparison(), clause.operand) {
                (Some(operator), Operand::Literal(literal)) => Filter::Comparison {
                    property,
                    operator,
                    literal,
                },
                (None, Operand::Range { lower, upper }) => Filter::Between {
                    property,
                    lower,
                    upper,
                },
                (_, operand) => {
                    return Err(DovError::malformed_query(
                        clause.field,
                        format!("operand {:?} does not match the operator", operand),
                    ));
                }
            };
            leaves.push(leaf);
        }

        if let Some(bbox) = bbox {
            leaves.push(Filter::Within {
                property: self.record_type.record_type().geometry_property().to_string(),
                envelope: bbox.to_envelope(self.srs_name),
            });
        }

        Ok(match leaves.len() {
            1 => leaves.remove(0),
            _ => Filter::And(leaves),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::FieldRegistry;

    fn boring() -> std::sync::Arc<RegisteredType> {
        FieldRegistry::builtin().unwrap().get("boring").unwrap()
    }

    #[test]
    fn test_parse_simple_clauses() {
        let clauses = parse_query("diepte_tot_m > 20, gemeente = 'Sint-Truiden'").unwrap();
        assert_eq!(clauses.len(), 2);
        assert_eq!(clauses[0].operator, QueryOperator::GreaterThan);
        assert_eq!(clauses[1].operand, Operand::Literal("Sint-Truiden".to_string()));
    }

    #[test]
    fn test_quoted_literal_keeps_spaces_and_commas() {
        let clauses = parse_query("uitvoerder = \"Smet, GWT\"").unwrap();
        assert_eq!(clauses.len(), 1);
        assert_eq!(clauses[0].operand, Operand::Literal("Smet, GWT".to_string()));
    }

    #[test]
    fn test_between() {
        let clauses = parse_query("diepte_tot_m << (20, 100)").unwrap();
        assert_eq!(
            clauses[0].operand,
            Operand::Range {
                lower: "20".to_string(),
                upper: "100".to_string()
            }
        );
    }

    #[test]
    fn test_malformed_queries() {
        for bad in [
            "depth << (20 100)",
            "depth << 20",
            "depth << (20,)",
            "depth ~ 3",
            "depth >",
            "depth > 3 4",
            "depth > 3,",
            "gemeente = 'Gent",
            "depth = (1,2)",
            "depth << (1,2",
        ] {
            assert!(
                matches!(parse_query(bad), Err(DovError::MalformedQuery { .. })),
                "expected '{}' to be malformed",
                bad
            );
        }
    }

    #[test]
    fn test_build_counts_leaves() {
        let bound = boring();
        let builder = FilterBuilder::new(&bound);
        let filter = builder
            .build(
                Some("diepte_boring_tot > 20, gemeente = Gent, x << (100,200)"),
                None,
            )
            .unwrap();
        assert_eq!(filter.leaf_count(), 3);

        let bbox = BoundingBox::new(151650.0, 214675.0, 151750.0, 214775.0).unwrap();
        let filter = builder
            .build(Some("diepte_boring_tot > 20, gemeente = Gent"), Some(&bbox))
            .unwrap();
        assert_eq!(filter.leaf_count(), 3);
        let Filter::And(leaves) = &filter else {
            panic!("expected a conjunction");
        };
        assert!(leaves[2].is_spatial());
    }

    #[test]
    fn test_build_translates_output_names() {
        let bound = boring();
        let filter = FilterBuilder::new(&bound)
            .build(Some("diepte_boring_tot >= 5"), None)
            .unwrap();
        assert_eq!(
            filter,
            Filter::Comparison {
                property: "diepte_tot_m".to_string(),
                operator: ComparisonOperator::GreaterThanOrEqualTo,
                literal: "5".to_string(),
            }
        );
    }

    #[test]
    fn test_build_without_constraints_is_empty() {
        let bound = boring();
        let filter = FilterBuilder::new(&bound).build(None, None).unwrap();
        assert_eq!(filter.leaf_count(), 0);
        assert_eq!(filter, Filter::And(Vec::new()));
    }

    #[test]
    fn test_build_rejects_unknown_and_detail_fields() {
        let bound = boring();
        let builder = FilterBuilder::new(&bound);
        assert!(matches!(
            builder.build(Some("onbestaand = 1"), None),
            Err(DovError::UnknownField { .. })
        ));
        assert!(matches!(
            builder.build(Some("mv_mtaw > 1"), None),
            Err(DovError::UnknownField { .. })
        ));
    }

    #[test]
    fn test_syntax_is_checked_before_fields() {
        let bound = boring();
        assert!(matches!(
            FilterBuilder::new(&bound).build(Some("onbestaand << (1 2)"), None),
            Err(DovError::MalformedQuery { .. })
        ));
    }

    #[test]
    fn test_bounding_box_parsing() {
        let bbox: BoundingBox = "160000, 200000,178100,215100".parse().unwrap();
        assert_eq!(bbox.max_x, 178100.0);
        assert!("1,2,3".parse::<BoundingBox>().is_err());
        assert!("3,2,1,4".parse::<BoundingBox>().is_err());
        assert!("a,2,3,4".parse::<BoundingBox>().is_err());
        assert!(BoundingBox::new(0.0, f64::NAN, 1.0, 1.0).is_err());
    }
}
