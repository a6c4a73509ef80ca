//! Minimal element tree on top of the quick-xml event reader and writer.
use super::InterchangeError;
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::io::Cursor;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlElement>,
    pub text: String,
}

impl XmlElement {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn with_attr(mut self, key: &str, value: &str) -> Self {
        self.attributes.push((key.to_string(), value.to_string()));
        self
    }

    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// attribute that must be present
    pub fn required_attr(&self, key: &str) -> Result<&str, InterchangeError> {
        self.attr(key)
            .ok_or_else(|| InterchangeError::malformed(&format!("{} without '{}' attribute", self.name, key)))
    }

    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// `self/a/b/...`, each step taking the first matching child
    pub fn path(&self, steps: &[&str]) -> Option<&XmlElement> {
        steps.iter().try_fold(self, |el, step| el.child(step))
    }

    /// first descendant (or self) with the given name, depth first
    pub fn find(&self, name: &str) -> Option<&XmlElement> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }

    /// Serializes with two-space indentation and an XML declaration.
    pub fn to_document(&self) -> Result<String, InterchangeError> {
        let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
            .map_err(write_error)?;
        self.write_into(&mut writer)?;
        let bytes = writer.into_inner().into_inner();
        let mut text = String::from_utf8(bytes).map_err(|e| InterchangeError::Xml {
            position: e.utf8_error().valid_up_to(),
            message: e.to_string(),
        })?;
        text.push('\n');
        Ok(text)
    }

    fn write_into(&self, writer: &mut Writer<Cursor<Vec<u8>>>) -> Result<(), InterchangeError> {
        let start = BytesStart::new(self.name.as_str())
            .with_attributes(self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        if self.children.is_empty() && self.text.is_empty() {
            return writer.write_event(Event::Empty(start)).map_err(write_error);
        }
        writer.write_event(Event::Start(start)).map_err(write_error)?;
        if !self.text.is_empty() {
            writer
                .write_event(Event::Text(BytesText::new(&self.text)))
                .map_err(write_error)?;
        }
        for child in &self.children {
            child.write_into(writer)?;
        }
        writer
            .write_event(Event::End(BytesEnd::new(self.name.as_str())))
            .map_err(write_error)
    }
}

fn write_error(e: impl std::fmt::Display) -> InterchangeError {
    InterchangeError::Xml {
        position: 0,
        message: e.to_string(),
    }
}

fn element_from(start: &BytesStart, reader: &Reader<&[u8]>) -> Result<XmlElement, InterchangeError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).to_string();
    let mut element = XmlElement::new(&name);
    for attr in start.attributes() {
        let attr = attr.map_err(|e| xml_error(reader, e))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = attr.unescape_value().map_err(|e| xml_error(reader, e))?;
        element.attributes.push((key, value.to_string()));
    }
    Ok(element)
}

fn xml_error(reader: &Reader<&[u8]>, e: impl std::fmt::Display) -> InterchangeError {
    InterchangeError::Xml {
        position: reader.error_position() as usize,
        message: e.to_string(),
    }
}

/// Parses a document and returns its root element.
pub fn parse_xml(xml: &str) -> Result<XmlElement, InterchangeError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    let mut attach = |element: XmlElement, stack: &mut Vec<XmlElement>| -> Result<(), InterchangeError> {
        match stack.last_mut() {
            Some(parent) => parent.children.push(element),
            None if root.is_none() => root = Some(element),
            None => return Err(InterchangeError::malformed("more than one root element")),
        }
        Ok(())
    };

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => stack.push(element_from(&e, &reader)?),
            Ok(Event::Empty(e)) => {
                let element = element_from(&e, &reader)?;
                attach(element, &mut stack)?;
            }
            Ok(Event::End(_)) => {
                let Some(element) = stack.pop() else {
                    return Err(InterchangeError::malformed("closing tag without opening tag"));
                };
                attach(element, &mut stack)?;
            }
            Ok(Event::Text(t)) => {
                let text = t.unescape().map_err(|e| xml_error(&reader, e))?;
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(text.trim());
                }
            }
            Ok(Event::CData(c)) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(xml_error(&reader, e)),
        }
    }
    if let Some(open) = stack.last() {
        return Err(InterchangeError::malformed(&format!("unclosed element <{}>", open.name)));
    }
    root.ok_or_else(|| InterchangeError::malformed("document has no root element"))
}
