//! Owned XML element tree with namespace-aware path locators.
//!
//! Service responses are parsed once with `roxmltree` and converted into an
//! owned [`XmlElement`] tree so that listing elements and detail documents can
//! outlive the text they were parsed from.
//!
//! # Locators
//!
//! A [`Locator`] is a restricted path expression:
//!
//! ```text
//! locator = [".//" | "./" | "/"] step ("/" step)*
//! step    = [prefix ":"] name ["[" position "]"]
//! ```
//!
//! - A leading `.//` turns the first step into a descendant search.
//! - `position` is 1-based and counts same-named siblings under one parent.
//! - Unprefixed steps use the default namespace of the [`NamespaceContext`];
//!   a context without a default namespace matches on local name only.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{OwsError, Result};

/// An owned XML element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    namespace: Option<String>,
    name: String,
    attributes: Vec<(String, String)>,
    text: Option<String>,
    children: Vec<XmlElement>,
}

impl XmlElement {
    /// Parses a document and returns its root element.
    pub fn parse(text: &str) -> Result<Self> {
        let doc = roxmltree::Document::parse(text).map_err(OwsError::parse)?;
        Ok(Self::from_node(doc.root_element()))
    }

    fn from_node(node: roxmltree::Node<'_, '_>) -> Self {
        let tag = node.tag_name();
        Self {
            namespace: tag.namespace().map(str::to_string),
            name: tag.name().to_string(),
            attributes: node
                .attributes()
                .map(|a| (a.name().to_string(), a.value().to_string()))
                .collect(),
            text: node.text().map(str::to_string),
            children: node
                .children()
                .filter(|c| c.is_element())
                .map(Self::from_node)
                .collect(),
        }
    }

    /// Local name of the element.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Namespace URI of the element, if any.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Text content preceding the first child element.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Element children in document order.
    pub fn children(&self) -> &[XmlElement] {
        &self.children
    }

    /// Looks up an attribute by local name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if this element has the given local name and namespace.
    pub fn is(&self, namespace: &str, name: &str) -> bool {
        self.name == name && self.namespace.as_deref() == Some(namespace)
    }

    /// Iterates over this element and all of its descendants in document order.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// Finds the first child with the given local name, ignoring namespaces.
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }
}

/// Pre-order iterator over an element subtree.
pub struct Descendants<'a> {
    stack: Vec<&'a XmlElement>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a XmlElement;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        self.stack.extend(next.children.iter().rev());
        Some(next)
    }
}

/// Namespace bindings used when resolving locators.
///
/// A context is created once per feature type registration and passed to
/// every locator call; there is no process-wide namespace table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceContext {
    default: Option<String>,
    prefixes: BTreeMap<String, String>,
}

impl NamespaceContext {
    /// A context that matches unprefixed steps on local name only.
    pub fn unqualified() -> Self {
        Self::default()
    }

    /// A context whose unprefixed steps resolve to `uri`.
    pub fn with_default(uri: impl Into<String>) -> Self {
        Self {
            default: Some(uri.into()),
            prefixes: BTreeMap::new(),
        }
    }

    /// Binds a prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.prefixes.insert(prefix.into(), uri.into());
        self
    }

    /// The default namespace, if any.
    pub fn default_namespace(&self) -> Option<&str> {
        self.default.as_deref()
    }

    /// Resolves a bound prefix.
    pub fn resolve_prefix(&self, prefix: &str) -> Option<&str> {
        self.prefixes.get(prefix).map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Step {
    prefix: Option<String>,
    name: String,
    position: Option<usize>,
}

impl Step {
    fn matches(&self, element: &XmlElement, ns: &NamespaceContext) -> bool {
        if element.name != self.name {
            return false;
        }
        let wanted = match &self.prefix {
            Some(prefix) => ns.resolve_prefix(prefix),
            None => ns.default_namespace(),
        };
        match wanted {
            Some(uri) => element.namespace.as_deref() == Some(uri),
            // Unbound prefix never matches; no default namespace matches any.
            None => self.prefix.is_none(),
        }
    }

    /// Matching children of `parent`, honouring the positional predicate.
    fn select<'a>(&self, parent: &'a XmlElement, ns: &NamespaceContext) -> Vec<&'a XmlElement> {
        let matching = parent.children.iter().filter(|c| self.matches(c, ns));
        match self.position {
            Some(n) => matching.skip(n - 1).take(1).collect(),
            None => matching.collect(),
        }
    }
}

/// A parsed path expression locating elements relative to a context element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    raw: String,
    descendant: bool,
    steps: Vec<Step>,
}

impl Locator {
    /// Parses a locator expression.
    pub fn parse(expr: &str) -> Result<Self> {
        let invalid = |message: &str| OwsError::InvalidLocator {
            locator: expr.to_string(),
            message: message.to_string(),
        };

        let trimmed = expr.trim();
        let (descendant, path) = if let Some(rest) = trimmed.strip_prefix(".//") {
            (true, rest)
        } else if let Some(rest) = trimmed.strip_prefix("./") {
            (false, rest)
        } else {
            (false, trimmed.trim_start_matches('/'))
        };

        if path.is_empty() {
            return Err(invalid("empty path"));
        }

        let mut steps = Vec::new();
        for segment in path.split('/') {
            if segment.is_empty() {
                return Err(invalid("empty step"));
            }
            let (qname, position) = match segment.find('[') {
                Some(open) => {
                    let inner = segment[open + 1..]
                        .strip_suffix(']')
                        .ok_or_else(|| invalid("unterminated position predicate"))?;
                    let n: usize = inner
                        .trim()
                        .parse()
                        .map_err(|_| invalid("position must be a positive integer"))?;
                    if n == 0 {
                        return Err(invalid("positions are 1-based"));
                    }
                    (&segment[..open], Some(n))
                }
                None => (segment, None),
            };
            let (prefix, name) = match qname.split_once(':') {
                Some((p, n)) => (Some(p.to_string()), n),
                None => (None, qname),
            };
            if name.is_empty() || name.contains(char::is_whitespace) {
                return Err(invalid("invalid element name"));
            }
            steps.push(Step {
                prefix,
                name: name.to_string(),
                position,
            });
        }

        Ok(Self {
            raw: expr.to_string(),
            descendant,
            steps,
        })
    }

    /// The expression this locator was parsed from.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// All elements matched by this locator, in document order per parent.
    pub fn find_all<'a>(
        &self,
        context: &'a XmlElement,
        ns: &NamespaceContext,
    ) -> Vec<&'a XmlElement> {
        let (first, rest) = match self.steps.split_first() {
            Some(split) => split,
            None => return Vec::new(),
        };

        let mut current: Vec<&XmlElement> = if self.descendant {
            context
                .descendants()
                .flat_map(|parent| first.select(parent, ns))
                .collect()
        } else {
            first.select(context, ns)
        };

        for step in rest {
            current = current
                .into_iter()
                .flat_map(|parent| step.select(parent, ns))
                .collect();
            if current.is_empty() {
                break;
            }
        }
        current
    }

    /// The first element matched by this locator.
    pub fn find<'a>(&self, context: &'a XmlElement, ns: &NamespaceContext) -> Option<&'a XmlElement> {
        self.find_all(context, ns).into_iter().next()
    }

    /// Text of the first matched element.
    ///
    /// Returns `None` when nothing matches and `Some("")` when the element is
    /// present but empty.
    pub fn find_text<'a>(&self, context: &'a XmlElement, ns: &NamespaceContext) -> Option<&'a str> {
        self.find(context, ns).map(|e| e.text().unwrap_or(""))
    }
}

impl FromStr for Locator {
    type Err = OwsError;

    fn from_str(s: &str) -> Result<Self> {
        Locator::parse(s)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DETAIL: &str = r#"<kern:dov-schema xmlns:kern="http://kern.schemas.dov.vlaanderen.be">
  <boring>
    <diepte_van>0</diepte_van>
    <details>
      <boormethode><van>0</van><tot>1.5</tot><methode>handboring</methode></boormethode>
      <boormethode><van>1.5</van><tot>10</tot><methode>spoelboring</methode></boormethode>
    </details>
  </boring>
  <laag>
    <hoofdnaam><grondsoort>Z</grondsoort></hoofdnaam>
    <hoofdnaam><grondsoort>K</grondsoort></hoofdnaam>
    <leeg/>
  </laag>
</kern:dov-schema>"#;

    #[test]
    fn test_parse_builds_owned_tree() {
        let root = XmlElement::parse(DETAIL).unwrap();
        assert_eq!(root.name(), "dov-schema");
        assert_eq!(root.namespace(), Some("http://kern.schemas.dov.vlaanderen.be"));
        assert_eq!(root.children().len(), 2);
        assert_eq!(root.child("boring").unwrap().children().len(), 2);
    }

    #[test]
    fn test_parse_rejects_malformed_xml() {
        assert!(matches!(
            XmlElement::parse("<a><b></a>"),
            Err(OwsError::Parse { .. })
        ));
    }

    #[test]
    fn test_absolute_and_relative_paths() {
        let root = XmlElement::parse(DETAIL).unwrap();
        let ns = NamespaceContext::unqualified();

        let loc = Locator::parse("/boring/diepte_van").unwrap();
        assert_eq!(loc.find_text(&root, &ns), Some("0"));

        let loc = Locator::parse("./boring/diepte_van").unwrap();
        assert_eq!(loc.find_text(&root, &ns), Some("0"));

        let loc = Locator::parse("boring/onbestaand").unwrap();
        assert_eq!(loc.find_text(&root, &ns), None);
    }

    #[test]
    fn test_descendant_search() {
        let root = XmlElement::parse(DETAIL).unwrap();
        let ns = NamespaceContext::unqualified();

        let loc = Locator::parse(".//boring/details/boormethode").unwrap();
        let found = loc.find_all(&root, &ns);
        assert_eq!(found.len(), 2);

        let methode = Locator::parse("/methode").unwrap();
        assert_eq!(methode.find_text(found[1], &ns), Some("spoelboring"));
    }

    #[test]
    fn test_positional_predicate() {
        let root = XmlElement::parse(DETAIL).unwrap();
        let ns = NamespaceContext::unqualified();
        let laag = root.child("laag").unwrap();

        let first = Locator::parse("/hoofdnaam[1]/grondsoort").unwrap();
        let second = Locator::parse("/hoofdnaam[2]/grondsoort").unwrap();
        let third = Locator::parse("/hoofdnaam[3]/grondsoort").unwrap();
        assert_eq!(first.find_text(laag, &ns), Some("Z"));
        assert_eq!(second.find_text(laag, &ns), Some("K"));
        assert_eq!(third.find_text(laag, &ns), None);
    }

    #[test]
    fn test_empty_element_yields_empty_text() {
        let root = XmlElement::parse(DETAIL).unwrap();
        let ns = NamespaceContext::unqualified();
        let loc = Locator::parse("laag/leeg").unwrap();
        assert_eq!(loc.find_text(&root, &ns), Some(""));
    }

    #[test]
    fn test_namespaced_matching() {
        let feature = XmlElement::parse(
            r#"<dov-pub:Boringen xmlns:dov-pub="http://dov.vlaanderen.be/ocdov/dov-pub">
                 <dov-pub:boornummer>B1</dov-pub:boornummer>
                 <boornummer>unqualified</boornummer>
               </dov-pub:Boringen>"#,
        )
        .unwrap();

        let qualified = NamespaceContext::with_default("http://dov.vlaanderen.be/ocdov/dov-pub");
        let loc = Locator::parse("boornummer").unwrap();
        assert_eq!(loc.find_text(&feature, &qualified), Some("B1"));

        let other = NamespaceContext::with_default("http://example.org/other");
        assert_eq!(loc.find_text(&feature, &other), None);

        let prefixed = NamespaceContext::unqualified()
            .with_prefix("dp", "http://dov.vlaanderen.be/ocdov/dov-pub");
        let loc = Locator::parse("dp:boornummer").unwrap();
        assert_eq!(loc.find_text(&feature, &prefixed), Some("B1"));

        let loc = Locator::parse("nope:boornummer").unwrap();
        assert_eq!(loc.find_text(&feature, &prefixed), None);
    }

    #[test]
    fn test_invalid_locators() {
        for bad in ["", "/", "a//b", "a[0]", "a[x]", "a[1", "ns:"] {
            assert!(
                matches!(Locator::parse(bad), Err(OwsError::InvalidLocator { .. })),
                "expected '{}' to be rejected",
                bad
            );
        }
    }

    #[test]
    fn test_descendants_preorder() {
        let root = XmlElement::parse("<a><b><c/></b><d/></a>").unwrap();
        let names: Vec<_> = root.descendants().map(|e| e.name().to_string()).collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);
    }
}
