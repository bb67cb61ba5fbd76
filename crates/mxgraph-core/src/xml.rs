// Minimal owned element tree over quick-xml.
//
// Reading policy:
// - DO NOT enable Config::trim_text; whitespace-only text is dropped manually
// - DO keep non-whitespace text (compressed <diagram> payloads live there)
// - comments, processing instructions and the declaration are skipped
//
// Writing policy: compact output, attributes in stored order, empty elements
// self-close. Attribute values escape newlines/tabs as character references so
// a value survives a parse/serialize cycle unchanged.

use crate::error::{ModelError, ModelResult};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use serde::Serialize;
use std::fmt::Write as _;
use std::str;

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlElement>,
    pub text: String,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attr(&self, key: &str) -> bool {
        self.attributes.iter().any(|(k, _)| k == key)
    }

    /// Sets `key`, replacing an existing value in place or appending.
    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((key, value)),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    pub fn push_child(&mut self, child: XmlElement) {
        self.children.push(child);
    }

    pub fn child(&self, name: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    /// First element named `name` in document order, including `self`.
    pub fn find(&self, name: &str) -> Option<&XmlElement> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }

    /// Owned variant of [`XmlElement::find`].
    pub fn into_found(self, name: &str) -> Option<XmlElement> {
        if self.name == name {
            return Some(self);
        }
        self.children.into_iter().find_map(|c| c.into_found(name))
    }

    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        self.write_into(&mut out);
        out
    }

    pub fn write_into(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (k, v) in &self.attributes {
            let _ = write!(out, " {k}=\"{}\"", escape_attr(v));
        }
        if self.children.is_empty() && self.text.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        out.push_str(&escape_text(&self.text));
        for child in &self.children {
            child.write_into(out);
        }
        let _ = write!(out, "</{}>", self.name);
    }
}

/// Parse `xml` into its document element.
pub fn parse_document(xml: &str) -> ModelResult<XmlElement> {
    let mut reader = Reader::from_str(xml);
    let mut buf = Vec::new();
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut document: Option<XmlElement> = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => stack.push(element_from_start(&e)?),
            Event::Empty(e) => {
                let el = element_from_start(&e)?;
                attach(&mut stack, &mut document, el)?;
            }
            Event::End(_) => {
                let el = stack.pop().ok_or_else(|| {
                    ModelError::Structure("closing tag without matching start".into())
                })?;
                attach(&mut stack, &mut document, el)?;
            }
            Event::Text(t) => {
                let txt = t.decode()?;
                if !txt.trim().is_empty()
                    && let Some(current) = stack.last_mut()
                {
                    current.text.push_str(&txt);
                }
            }
            Event::GeneralRef(r) => {
                let resolved = match r
                    .resolve_char_ref()
                    .map_err(|e| ModelError::Structure(e.to_string()))?
                {
                    Some(ch) => ch.to_string(),
                    None => {
                        let name = r.decode()?;
                        quick_xml::escape::resolve_predefined_entity(&name)
                            .ok_or_else(|| {
                                ModelError::Structure(format!("unknown entity &{name};"))
                            })?
                            .to_string()
                    }
                };
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&resolved);
                }
            }
            Event::CData(c) => {
                let txt = c.decode()?;
                if !txt.trim().is_empty()
                    && let Some(current) = stack.last_mut()
                {
                    current.text.push_str(&txt);
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if let Some(open) = stack.last() {
        return Err(ModelError::Structure(format!(
            "unexpected end of document inside <{}>",
            open.name
        )));
    }
    document.ok_or(ModelError::MissingElement("document element"))
}

fn attach(
    stack: &mut [XmlElement],
    document: &mut Option<XmlElement>,
    el: XmlElement,
) -> ModelResult<()> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(el);
        return Ok(());
    }
    if document.is_some() {
        return Err(ModelError::Structure(format!(
            "second document element <{}>",
            el.name
        )));
    }
    *document = Some(el);
    Ok(())
}

fn element_from_start(e: &BytesStart<'_>) -> ModelResult<XmlElement> {
    let name = str::from_utf8(e.name().as_ref())?.to_string();
    let mut attributes = Vec::new();
    for a in e.attributes() {
        let a = a?;
        let key = str::from_utf8(a.key.as_ref())?.to_string();
        let val = a.unescape_value()?.to_string();
        attributes.push((key, val));
    }
    Ok(XmlElement {
        name,
        attributes,
        children: Vec::new(),
        text: String::new(),
    })
}

pub(crate) fn escape_attr(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\n' => out.push_str("&#xa;"),
            '\r' => out.push_str("&#xd;"),
            '\t' => out.push_str("&#x9;"),
            _ => out.push(ch),
        }
    }
    out
}

fn escape_text(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Compact number form used for every numeric attribute: integral values
/// print without a fraction and `-0` prints as `0`.
pub(crate) fn format_number(value: f64) -> String {
    let value = if value == 0.0 { 0.0 } else { value };
    if value.fract() == 0.0 && value.abs() < 1e15 {
        return format!("{}", value as i64);
    }
    format!("{value}")
}

pub(crate) fn parse_f64_opt(v: Option<&str>, field: &'static str) -> ModelResult<Option<f64>> {
    let Some(s) = v else { return Ok(None) };
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let parsed = serde_json::from_str::<f64>(trimmed).map_err(|_| ModelError::InvalidNumber {
        field,
        value: s.to_string(),
    })?;
    Ok(Some(parsed))
}

pub(crate) fn parse_i64_opt(v: Option<&str>, field: &'static str) -> ModelResult<Option<i64>> {
    let Some(s) = v else { return Ok(None) };
    if s.trim().is_empty() {
        return Ok(None);
    }
    let parsed = s.trim().parse::<i64>().map_err(|_| ModelError::InvalidNumber {
        field,
        value: s.to_string(),
    })?;
    Ok(Some(parsed))
}

pub(crate) fn parse_bool_opt(v: Option<&str>) -> Option<bool> {
    match v? {
        "1" | "true" | "TRUE" | "True" => Some(true),
        "0" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}
