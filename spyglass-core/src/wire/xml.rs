//! Minimal owned XML element tree for protocol envelopes.
//!
//! The daemon's messages are small, flat documents; decoding walks a
//! fully-materialized tree instead of streaming. `quick-xml` does the
//! lexing, this module does the shaping.

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::error::ClientError;

/// One parsed element: tag name, accumulated text content, child elements.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct XmlElement {
    pub name: String,
    pub text: String,
    pub children: Vec<XmlElement>,
}

impl XmlElement {
    fn new(name: String) -> Self {
        Self {
            name,
            text: String::new(),
            children: Vec::new(),
        }
    }

    /// First direct child with the given tag name.
    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Text content of the first direct child with the given tag name.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).map(|c| c.text.as_str())
    }

    /// Text content of a required direct child.
    pub fn require_text(&self, name: &str) -> Result<&str, ClientError> {
        self.child_text(name)
            .ok_or_else(|| ClientError::Decode(format!("<{}> missing <{name}>", self.name)))
    }

    /// All direct children with the given tag name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Text of every descendant (any depth) with the given tag name,
    /// in document order.
    pub fn descendant_texts(&self, name: &str) -> Vec<String> {
        let mut out = Vec::new();
        self.collect_descendant_texts(name, &mut out);
        out
    }

    fn collect_descendant_texts(&self, name: &str, out: &mut Vec<String>) {
        for child in &self.children {
            if child.name == name {
                out.push(child.text.clone());
            }
            child.collect_descendant_texts(name, out);
        }
    }
}

/// Parse one XML document into its root element.
pub(crate) fn parse_document(xml: &str) -> Result<XmlElement, ClientError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(start)) => {
                let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
                stack.push(XmlElement::new(name));
            }
            Ok(Event::Empty(start)) => {
                let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
                attach(XmlElement::new(name), &mut stack, &mut root)?;
            }
            Ok(Event::Text(text)) => {
                let unescaped = text
                    .unescape()
                    .map_err(|e| ClientError::Decode(e.to_string()))?;
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&unescaped);
                }
            }
            Ok(Event::CData(cdata)) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&cdata.into_inner()));
                }
            }
            Ok(Event::End(_)) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| ClientError::Decode("unbalanced closing tag".to_string()))?;
                attach(element, &mut stack, &mut root)?;
            }
            Ok(Event::Eof) => break,
            Ok(_) => {} // declarations, comments, processing instructions
            Err(e) => return Err(ClientError::Decode(e.to_string())),
        }
    }

    if !stack.is_empty() {
        return Err(ClientError::Decode("unclosed element".to_string()));
    }
    root.ok_or_else(|| ClientError::Decode("empty document".to_string()))
}

fn attach(
    element: XmlElement,
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
) -> Result<(), ClientError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => {
            if root.is_some() {
                return Err(ClientError::Decode(
                    "multiple root elements".to_string(),
                ));
            }
            *root = Some(element);
        }
    }
    Ok(())
}

/// Escape text for inclusion in an XML element body.
pub(crate) fn escape_text(raw: &str) -> String {
    quick_xml::escape::escape(raw).into_owned()
}
