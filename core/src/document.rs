//! Minimal owned XML element tree over `quick-xml`.
//!
//! CTD documents are small, so they are read into a plain [`Element`] tree
//! and written back from one. Comments, processing instructions and the
//! XML declaration are dropped on read; whitespace-only text is trimmed.

use std::io::Write;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;

use crate::error::{CtdError, Result};

/// One XML element with ordered attributes.
///
/// # Examples
///
/// ```
/// use ctd_params_core::Element;
///
/// let doc = Element::parse(r#"<a x="1"><b>text &amp; more</b><c/></a>"#).unwrap();
/// assert_eq!(doc.attr("x"), Some("1"));
/// assert_eq!(doc.find("b").unwrap().text.as_deref(), Some("text & more"));
///
/// let xml = doc.to_pretty_string().unwrap();
/// assert_eq!(Element::parse(&xml).unwrap(), doc);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Element {
    pub tag: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Element>,
    pub text: Option<String>,
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..Default::default()
        }
    }

    /// Sets an attribute, replacing an existing one of the same name.
    pub fn with_attr(mut self, key: &str, value: &str) -> Self {
        self.set_attr(key, value);
        self
    }

    pub fn set_attr(&mut self, key: &str, value: &str) {
        match self.attributes.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value.to_string(),
            None => self.attributes.push((key.to_string(), value.to_string())),
        }
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn push(&mut self, child: Element) {
        self.children.push(child);
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// First child with the given tag.
    pub fn find(&self, tag: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.tag == tag)
    }

    /// All children with the given tag.
    pub fn children_named<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |c| c.tag == tag)
    }

    /// Parses a complete document and returns its root element.
    ///
    /// # Errors
    ///
    /// [`CtdError::Xml`] for syntax errors and mismatched tags,
    /// [`CtdError::ModelParsing`] for documents without exactly one root.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut open: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;
        loop {
            match reader.read_event()? {
                Event::Start(start) => open.push(element_from_start(&start)?),
                Event::Empty(start) => {
                    let element = element_from_start(&start)?;
                    close(&mut open, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = open.pop().ok_or_else(|| {
                        CtdError::ModelParsing("closing tag without an open element".to_string())
                    })?;
                    close(&mut open, &mut root, element)?;
                }
                Event::Text(text) => {
                    let text = text.unescape()?;
                    if let Some(current) = open.last_mut() {
                        append_text(current, &text);
                    }
                }
                Event::CData(data) => {
                    let text = String::from_utf8(data.into_inner().into_owned())
                        .map_err(|e| CtdError::ModelParsing(format!("invalid CDATA: {e}")))?;
                    if let Some(current) = open.last_mut() {
                        append_text(current, &text);
                    }
                }
                Event::Eof => break,
                Event::Decl(_) | Event::PI(_) | Event::Comment(_) | Event::DocType(_) => {}
            }
        }

        if !open.is_empty() {
            return Err(CtdError::ModelParsing(format!(
                "unclosed element <{}>",
                open[open.len() - 1].tag
            )));
        }
        root.ok_or_else(|| CtdError::ModelParsing("document has no root element".to_string()))
    }

    /// Writes the element as an indented document with an XML declaration.
    pub fn write_pretty<W: Write>(&self, sink: W) -> Result<()> {
        let mut writer = Writer::new_with_indent(sink, b'\t', 1);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        self.write_into(&mut writer)?;
        writer.get_mut().write_all(b"\n")?;
        Ok(())
    }

    /// Pretty-printed document text.
    pub fn to_pretty_string(&self) -> Result<String> {
        let mut buffer = Vec::new();
        self.write_pretty(&mut buffer)?;
        String::from_utf8(buffer).map_err(|e| CtdError::ModelParsing(e.to_string()))
    }

    fn write_into<W: Write>(&self, writer: &mut Writer<W>) -> Result<()> {
        let mut start = BytesStart::new(self.tag.as_str());
        for (key, value) in &self.attributes {
            start.push_attribute((key.as_str(), value.as_str()));
        }
        if self.children.is_empty() && self.text.is_none() {
            writer.write_event(Event::Empty(start))?;
            return Ok(());
        }
        writer.write_event(Event::Start(start))?;
        if let Some(text) = &self.text {
            writer.write_event(Event::Text(BytesText::new(text)))?;
        }
        for child in &self.children {
            child.write_into(writer)?;
        }
        writer.write_event(Event::End(BytesEnd::new(self.tag.as_str())))?;
        Ok(())
    }
}

fn element_from_start(start: &BytesStart<'_>) -> Result<Element> {
    let tag = utf8(start.name().as_ref())?;
    let mut element = Element::new(&tag);
    for attribute in start.attributes() {
        let attribute = attribute?;
        let key = utf8(attribute.key.as_ref())?;
        let value = attribute.unescape_value()?;
        element.attributes.push((key, value.into_owned()));
    }
    Ok(element)
}

fn utf8(bytes: &[u8]) -> Result<String> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| CtdError::ModelParsing(format!("invalid UTF-8 in element name: {e}")))
}

fn append_text(element: &mut Element, text: &str) {
    match &mut element.text {
        Some(existing) => existing.push_str(text),
        None => element.text = Some(text.to_string()),
    }
}

fn close(open: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    if let Some(parent) = open.last_mut() {
        parent.children.push(element);
        return Ok(());
    }
    if root.is_some() {
        return Err(CtdError::ModelParsing(
            "document has more than one root element".to_string(),
        ));
    }
    *root = Some(element);
    Ok(())
}
