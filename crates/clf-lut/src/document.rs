//! Owned element tree read and written with quick-xml.
//!
//! Nodes never touch the XML reader directly: the whole document is first
//! turned into an [`Element`] tree, then walked by the node parsers.

use crate::{ClfError, ClfResult};
use quick_xml::Writer;
use quick_xml::escape::{resolve_predefined_entity, unescape};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Reader;

/// A document element: name, ordered attributes, text and children.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    /// Tag name.
    pub name: String,
    /// Attributes in document order.
    pub attributes: Vec<(String, String)>,
    /// Concatenated, trimmed character data.
    pub text: String,
    /// Child elements in document order.
    pub children: Vec<Element>,
}

impl Element {
    /// Empty element called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Element with text content.
    pub fn with_text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            ..Default::default()
        }
    }

    /// Attribute value by name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Attribute value, or [`ClfError::MissingAttribute`].
    pub fn required_attr(&self, name: &'static str) -> ClfResult<&str> {
        self.attr(name).ok_or_else(|| ClfError::MissingAttribute {
            element: self.name.clone(),
            attribute: name,
        })
    }

    /// Attribute parsed as a number.
    pub fn attr_f64(&self, name: &str) -> ClfResult<Option<f64>> {
        match self.attr(name) {
            None => Ok(None),
            Some(v) => parse_f64(v).map(Some).ok_or_else(|| {
                ClfError::parse(format!("<{}> {}='{}' is not a number", self.name, name, v))
            }),
        }
    }

    /// Appends an attribute.
    pub fn push_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.attributes.push((name.into(), value.into()));
    }

    /// Builder form of [`Element::push_attr`].
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.push_attr(name, value);
        self
    }

    /// First child called `name`.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Children called `name`.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Parses a document into its root element.
    pub fn parse(bytes: &[u8]) -> ClfResult<Element> {
        // Whitespace is trimmed per element once its text is complete, so
        // spaces next to entity references survive.
        let mut reader = Reader::from_reader(bytes);

        let mut buf = Vec::new();
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let event = reader
                .read_event_into(&mut buf)
                .map_err(|e| ClfError::Xml(e.to_string()))?;
            match event {
                Event::Start(ref e) => {
                    stack.push(start_element(e)?);
                }
                Event::Empty(ref e) => {
                    let el = start_element(e)?;
                    attach(&mut stack, &mut root, el)?;
                }
                Event::End(_) => {
                    let mut el = stack
                        .pop()
                        .ok_or_else(|| ClfError::Xml("unbalanced end tag".into()))?;
                    let trimmed = el.text.trim();
                    if trimmed.len() != el.text.len() {
                        el.text = trimmed.to_string();
                    }
                    attach(&mut stack, &mut root, el)?;
                }
                Event::Text(ref e) => {
                    if let Some(top) = stack.last_mut() {
                        let raw = std::str::from_utf8(&**e)
                            .map_err(|e| ClfError::Xml(e.to_string()))?;
                        let text = unescape(raw).map_err(|e| ClfError::Xml(e.to_string()))?;
                        top.text.push_str(&text);
                    }
                }
                Event::CData(ref e) => {
                    if let Some(top) = stack.last_mut() {
                        let raw = std::str::from_utf8(&**e)
                            .map_err(|e| ClfError::Xml(e.to_string()))?;
                        top.text.push_str(raw);
                    }
                }
                Event::GeneralRef(ref e) => {
                    if let Some(top) = stack.last_mut() {
                        let name = std::str::from_utf8(&**e)
                            .map_err(|e| ClfError::Xml(e.to_string()))?;
                        top.text.push_str(&resolve_entity(name)?);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if !stack.is_empty() {
            let open = &stack[stack.len() - 1].name;
            return Err(ClfError::Xml(format!("unclosed element <{}>", open)));
        }
        root.ok_or_else(|| ClfError::Xml("document has no root element".into()))
    }

    /// Serializes this element as a document with an XML declaration.
    pub fn to_bytes(&self) -> ClfResult<Vec<u8>> {
        let mut xml = Writer::new_with_indent(Vec::new(), b' ', 2);
        xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(|e| ClfError::Write(e.to_string()))?;
        write_element(&mut xml, self)?;
        let mut out = xml.into_inner();
        out.push(b'\n');
        Ok(out)
    }
}

fn start_element(e: &BytesStart<'_>) -> ClfResult<Element> {
    let name = std::str::from_utf8(e.name().as_ref())
        .map_err(|err| ClfError::Xml(err.to_string()))?
        .to_string();
    let mut el = Element::new(name);
    for attr in e.attributes() {
        let attr = attr.map_err(|err| ClfError::Xml(err.to_string()))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|err| ClfError::Xml(err.to_string()))?
            .to_string();
        let raw = std::str::from_utf8(&attr.value).map_err(|err| ClfError::Xml(err.to_string()))?;
        let value = unescape(raw).map_err(|err| ClfError::Xml(err.to_string()))?;
        el.attributes.push((key, value.into_owned()));
    }
    Ok(el)
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, el: Element) -> ClfResult<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(el),
        None if root.is_none() => *root = Some(el),
        None => return Err(ClfError::Xml("multiple root elements".into())),
    }
    Ok(())
}

fn resolve_entity(name: &str) -> ClfResult<String> {
    if let Some(s) = resolve_predefined_entity(name) {
        return Ok(s.to_string());
    }
    let code = if let Some(hex) = name.strip_prefix("#x") {
        u32::from_str_radix(hex, 16).ok()
    } else if let Some(dec) = name.strip_prefix('#') {
        dec.parse::<u32>().ok()
    } else {
        None
    };
    code.and_then(char::from_u32)
        .map(|c| c.to_string())
        .ok_or_else(|| ClfError::Xml(format!("unknown entity '&{};'", name)))
}

fn write_element(xml: &mut Writer<Vec<u8>>, el: &Element) -> ClfResult<()> {
    let mut start = BytesStart::new(el.name.as_str());
    for (k, v) in &el.attributes {
        start.push_attribute((k.as_str(), v.as_str()));
    }
    if el.children.is_empty() && el.text.is_empty() {
        return xml
            .write_event(Event::Empty(start))
            .map_err(|e| ClfError::Write(e.to_string()));
    }
    xml.write_event(Event::Start(start))
        .map_err(|e| ClfError::Write(e.to_string()))?;
    if !el.text.is_empty() {
        xml.write_event(Event::Text(BytesText::new(&el.text)))
            .map_err(|e| ClfError::Write(e.to_string()))?;
    }
    for child in &el.children {
        write_element(xml, child)?;
    }
    xml.write_event(Event::End(BytesEnd::new(el.name.as_str())))
        .map_err(|e| ClfError::Write(e.to_string()))
}

/// Parses a decimal number, accepting the `inf` / `nan` spellings.
pub(crate) fn parse_f64(s: &str) -> Option<f64> {
    let s = s.trim();
    s.parse::<f64>().ok().or_else(|| match s.to_ascii_lowercase().as_str() {
        "inf" | "+inf" | "infinity" => Some(f64::INFINITY),
        "-inf" | "-infinity" => Some(f64::NEG_INFINITY),
        "nan" => Some(f64::NAN),
        _ => None,
    })
}

/// Formats a number so it reads back to the same value.
pub(crate) fn format_f64(v: f64) -> String {
    format!("{}", v)
}

/// Parses a `true`/`false` attribute.
pub(crate) fn parse_bool(el: &Element, name: &str) -> ClfResult<Option<bool>> {
    match el.attr(name) {
        None => Ok(None),
        Some(v) => match v.trim() {
            "true" | "1" => Ok(Some(true)),
            "false" | "0" => Ok(Some(false)),
            other => Err(ClfError::parse(format!(
                "<{}> {}='{}' is not a boolean",
                el.name, name, other
            ))),
        },
    }
}
