//! In-memory XML element tree with resolved namespaces.
//!
//! The whole document is parsed up front so extractors can look children up
//! by name in any order, including searches at arbitrary depth.

use std::path::Path;

use quick_xml::NsReader;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesRef, BytesStart, Event};
use quick_xml::name::ResolveResult;

use crate::error::{ExtractError, Result};

/// Element name used for lookups.
///
/// A tag either requires a specific namespace URI or matches on the local
/// name alone, whatever namespace the element lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag {
    namespace: Option<&'static str>,
    local: &'static str,
}

impl Tag {
    pub const fn qualified(namespace: &'static str, local: &'static str) -> Self {
        Self {
            namespace: Some(namespace),
            local,
        }
    }

    pub const fn local(local: &'static str) -> Self {
        Self {
            namespace: None,
            local,
        }
    }

    pub fn local_name(&self) -> &'static str {
        self.local
    }
}

/// A parsed element and everything below it.
#[derive(Debug, Clone, Default)]
pub struct Element {
    namespace: Option<String>,
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Element>,
    text: String,
}

impl Element {
    fn from_start(start: &BytesStart<'_>, namespace: Option<String>) -> Result<Self> {
        let name = std::str::from_utf8(start.local_name().as_ref())?.to_owned();
        let mut attributes = Vec::new();

        for attr_result in start.attributes() {
            let attr = attr_result?;
            // Namespace declarations and prefixed attributes (xsi:schemaLocation
            // and friends) carry nothing the extractors read.
            if attr.key.as_namespace_binding().is_some() || attr.key.prefix().is_some() {
                continue;
            }
            let key = std::str::from_utf8(attr.key.local_name().as_ref())?.to_owned();
            let raw = std::str::from_utf8(&attr.value)?;
            let value = quick_xml::escape::unescape(raw)?.into_owned();
            attributes.push((key, value));
        }

        Ok(Self {
            namespace,
            name,
            attributes,
            children: Vec::new(),
            text: String::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn matches(&self, tag: Tag) -> bool {
        self.name == tag.local
            && tag
                .namespace
                .is_none_or(|ns| self.namespace.as_deref() == Some(ns))
    }

    /// Unprefixed attribute value by name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Text content with surrounding whitespace removed.
    pub fn text(&self) -> &str {
        self.text.trim()
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    pub fn first_element(&self) -> Option<&Element> {
        self.children.first()
    }

    /// First direct child matching `tag`.
    pub fn child(&self, tag: Tag) -> Option<&Element> {
        self.children.iter().find(|child| child.matches(tag))
    }

    pub fn children_named(&self, tag: Tag) -> impl Iterator<Item = &Element> {
        self.children.iter().filter(move |child| child.matches(tag))
    }

    /// First element matching `tag` anywhere below this one, in document order.
    pub fn descendant(&self, tag: Tag) -> Option<&Element> {
        self.children.iter().find_map(|child| {
            if child.matches(tag) {
                Some(child)
            } else {
                child.descendant(tag)
            }
        })
    }
}

/// A fully parsed XML document.
#[derive(Debug, Clone)]
pub struct Document {
    root: Element,
}

impl Document {
    /// Read and parse the file at `path`.
    pub fn read(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let xml = std::fs::read_to_string(path).map_err(|source| ExtractError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&xml)
    }

    /// Parse an XML string into an element tree.
    pub fn parse(xml: &str) -> Result<Self> {
        let xml = xml.strip_prefix('\u{feff}').unwrap_or(xml);
        let mut reader = NsReader::from_str(xml);
        let mut open: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let (ns, event) = reader.read_resolved_event()?;
            let namespace = resolve_namespace(ns)?;
            match event {
                Event::Start(e) => open.push(Element::from_start(&e, namespace)?),
                Event::Empty(e) => {
                    let element = Element::from_start(&e, namespace)?;
                    attach(&mut open, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = open.pop().ok_or_else(|| {
                        ExtractError::MalformedDocument("unexpected closing tag".to_string())
                    })?;
                    attach(&mut open, &mut root, element)?;
                }
                Event::Text(e) => {
                    if let Some(current) = open.last_mut() {
                        current.text.push_str(std::str::from_utf8(e.as_ref())?);
                    }
                }
                Event::CData(e) => {
                    if let Some(current) = open.last_mut() {
                        current.text.push_str(std::str::from_utf8(e.as_ref())?);
                    }
                }
                Event::GeneralRef(e) => {
                    if let Some(current) = open.last_mut() {
                        push_reference(&mut current.text, &e)?;
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if let Some(unclosed) = open.last() {
            return Err(ExtractError::MalformedDocument(format!(
                "unclosed element <{}>",
                unclosed.name
            )));
        }

        root.map(|root| Self { root })
            .ok_or_else(|| ExtractError::MalformedDocument("no root element".to_string()))
    }

    pub fn root(&self) -> &Element {
        &self.root
    }
}

fn resolve_namespace(ns: ResolveResult<'_>) -> Result<Option<String>> {
    match ns {
        ResolveResult::Bound(ns) => Ok(Some(std::str::from_utf8(ns.0)?.to_owned())),
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => Err(ExtractError::MalformedDocument(format!(
            "undeclared namespace prefix '{}'",
            String::from_utf8_lossy(&prefix)
        ))),
    }
}

fn attach(open: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    if let Some(parent) = open.last_mut() {
        parent.children.push(element);
    } else if root.is_none() {
        *root = Some(element);
    } else {
        return Err(ExtractError::MalformedDocument(
            "more than one root element".to_string(),
        ));
    }
    Ok(())
}

/// Append the text an entity or character reference stands for.
fn push_reference(text: &mut String, reference: &BytesRef<'_>) -> Result<()> {
    if let Some(ch) = reference.resolve_char_ref()? {
        text.push(ch);
        return Ok(());
    }
    let name = std::str::from_utf8(reference.as_ref())?;
    let resolved = resolve_predefined_entity(name).ok_or_else(|| {
        ExtractError::MalformedDocument(format!("unknown entity '&{name};'"))
    })?;
    text.push_str(resolved);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NS_A: &str = "urn:example:a";
    const NS_B: &str = "urn:example:b";

    #[test]
    fn test_builds_nested_tree() {
        let xml = r#"<?xml version="1.0"?>
<root>
  <item id="1"><name>First</name></item>
  <item id="2"/>
  <other/>
</root>"#;
        let doc = Document::parse(xml).unwrap();
        let root = doc.root();
        assert_eq!(root.name(), "root");
        assert_eq!(root.children().len(), 3);

        let items: Vec<&Element> = root.children_named(Tag::local("item")).collect();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].attribute("id"), Some("1"));
        assert_eq!(items[1].attribute("id"), Some("2"));
        assert_eq!(
            items[0].child(Tag::local("name")).map(Element::text),
            Some("First")
        );
        assert!(items[1].child(Tag::local("name")).is_none());
    }

    #[test]
    fn test_resolves_default_and_prefixed_namespaces() {
        let xml = r#"<root xmlns="urn:example:a" xmlns:b="urn:example:b">
  <value>1</value>
  <b:value>2</b:value>
</root>"#;
        let doc = Document::parse(xml).unwrap();
        let root = doc.root();
        assert_eq!(root.namespace(), Some(NS_A));

        let a = root.child(Tag::qualified(NS_A, "value")).unwrap();
        let b = root.child(Tag::qualified(NS_B, "value")).unwrap();
        assert_eq!(a.text(), "1");
        assert_eq!(b.text(), "2");
        assert_eq!(root.children_named(Tag::local("value")).count(), 2);
    }

    #[test]
    fn test_qualified_tag_rejects_other_namespace() {
        let xml = r#"<root xmlns="urn:example:a"><value>1</value></root>"#;
        let doc = Document::parse(xml).unwrap();
        assert!(doc.root().child(Tag::qualified(NS_B, "value")).is_none());
    }

    #[test]
    fn test_descendant_searches_any_depth() {
        let xml = r#"<root xmlns:b="urn:example:b">
  <outer>
    <inner><b:deep>7.5</b:deep></inner>
  </outer>
  <b:deep>ignored</b:deep>
</root>"#;
        let doc = Document::parse(xml).unwrap();
        let deep = doc.root().descendant(Tag::qualified(NS_B, "deep")).unwrap();
        assert_eq!(deep.text(), "7.5");
        assert!(doc.root().descendant(Tag::local("missing")).is_none());
    }

    #[test]
    fn test_descendant_excludes_self() {
        let xml = r#"<deep><other/></deep>"#;
        let doc = Document::parse(xml).unwrap();
        assert!(doc.root().descendant(Tag::local("deep")).is_none());
    }

    #[test]
    fn test_text_with_entities_and_cdata() {
        let xml = r#"<root><a>Fish &amp; Chips &#60;3</a><b><![CDATA[x < y]]></b></root>"#;
        let doc = Document::parse(xml).unwrap();
        assert_eq!(
            doc.root().child(Tag::local("a")).unwrap().text(),
            "Fish & Chips <3"
        );
        assert_eq!(doc.root().child(Tag::local("b")).unwrap().text(), "x < y");
    }

    #[test]
    fn test_predefined_entities_in_text() {
        let xml = r#"<root>&lt;&gt;&amp;&quot;&apos;&#x41;</root>"#;
        let doc = Document::parse(xml).unwrap();
        assert_eq!(doc.root().text(), "<>&\"'A");
    }

    #[test]
    fn test_unknown_entity_is_error() {
        let err = Document::parse("<root>&nbsp;</root>").unwrap_err();
        assert!(matches!(err, ExtractError::MalformedDocument(ref msg) if msg.contains("&nbsp;")));
    }

    #[test]
    fn test_attribute_entities_unescaped() {
        let xml = r#"<root title="A &amp; B"/>"#;
        let doc = Document::parse(xml).unwrap();
        assert_eq!(doc.root().attribute("title"), Some("A & B"));
    }

    #[test]
    fn test_skips_namespace_declarations_and_prefixed_attributes() {
        let xml = r#"<root xmlns="urn:example:a"
      xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
      xsi:schemaLocation="urn:example:a a.xsd" version="1.1"/>"#;
        let doc = Document::parse(xml).unwrap();
        assert_eq!(doc.root().attribute("version"), Some("1.1"));
        assert!(doc.root().attribute("xmlns").is_none());
        assert!(doc.root().attribute("schemaLocation").is_none());
    }

    #[test]
    fn test_byte_order_mark_ignored() {
        let xml = "\u{feff}<?xml version=\"1.0\"?><root/>";
        let doc = Document::parse(xml).unwrap();
        assert_eq!(doc.root().name(), "root");
    }

    #[test]
    fn test_mismatched_end_tag_is_error() {
        let result = Document::parse("<root><a></b></root>");
        assert!(matches!(result, Err(ExtractError::Xml(_))));
    }

    #[test]
    fn test_unclosed_element_is_error() {
        let result = Document::parse("<root><a>text</a>");
        assert!(result.is_err());
    }

    #[test]
    fn test_empty_document_is_error() {
        let result = Document::parse(r#"<?xml version="1.0"?>"#);
        assert!(matches!(result, Err(ExtractError::MalformedDocument(_))));
    }

    #[test]
    fn test_undeclared_prefix_is_error() {
        let result = Document::parse("<root><x:a/></root>");
        assert!(matches!(result, Err(ExtractError::MalformedDocument(_))));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = Document::read("tests/fixtures/does_not_exist.gpx");
        assert!(matches!(result, Err(ExtractError::Io { .. })));
    }
}
