use crate::error::{ModelError, ModelResult};
use crate::payload::{decode_diagram_payload, encode_diagram_payload};
use crate::root::Root;
use crate::xml::{XmlElement, parse_bool_opt, parse_document, parse_f64_opt, parse_i64_opt};
use serde::Serialize;
use tracing::debug;

/// An `<mxGraphModel>`: preserved model attributes plus the cell root.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphDocument {
    attributes: Vec<(String, String)>,
    root: Root,
}

/// Typed view over the well-known `<mxGraphModel>` attributes.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PageSettings {
    pub dx: Option<i64>,
    pub dy: Option<i64>,
    pub grid: Option<bool>,
    pub grid_size: Option<i64>,
    pub guides: Option<bool>,
    pub tooltips: Option<bool>,
    pub connect: Option<bool>,
    pub arrows: Option<bool>,
    pub fold: Option<bool>,
    pub page: Option<bool>,
    pub page_scale: Option<f64>,
    pub page_width: Option<f64>,
    pub page_height: Option<f64>,
    pub math: Option<bool>,
    pub shadow: Option<bool>,
}

impl Default for GraphDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphDocument {
    /// A blank page: default layer `0` and one drawable layer `1`.
    pub fn new() -> Self {
        Self {
            attributes: Vec::new(),
            root: Root::blank(),
        }
    }

    pub fn from_parts(attributes: Vec<(String, String)>, root: Root) -> Self {
        Self { attributes, root }
    }

    /// Parses a bare `<mxGraphModel>` or an `<mxfile>` whose first diagram
    /// holds one, inline or compressed.
    pub fn parse(xml: &str) -> ModelResult<Self> {
        let document = parse_document(xml)?;
        let model = locate_graph_model(document)?;
        let root_el = model.child("root").ok_or(ModelError::MissingElement("root"))?;
        let root = Root::from_element(root_el)?;
        debug!(
            attributes = model.attributes.len(),
            cells = root.len(),
            "parsed graph document"
        );
        Ok(Self {
            attributes: model.attributes,
            root,
        })
    }

    pub fn to_element(&self) -> XmlElement {
        let mut el = XmlElement::new("mxGraphModel");
        el.attributes = self.attributes.clone();
        el.push_child(self.root.to_element());
        el
    }

    /// Compact `<mxGraphModel>` text with attributes in their original order
    /// and cells in collection order.
    pub fn serialize(&self) -> String {
        self.to_element().to_xml_string()
    }

    /// A single-diagram `<mxfile>` carrying this model compressed.
    pub fn to_mxfile(&self, diagram_name: &str) -> ModelResult<String> {
        let mut diagram = XmlElement::new("diagram")
            .with_attr("name", diagram_name)
            .with_attr("id", diagram_name);
        diagram.text = encode_diagram_payload(&self.serialize())?;
        let mut file = XmlElement::new("mxfile").with_attr("host", env!("CARGO_PKG_NAME"));
        file.push_child(diagram);
        Ok(file.to_xml_string())
    }

    pub fn root(&self) -> &Root {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Root {
        &mut self.root
    }

    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Overwrites in place or appends, so existing order is kept.
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((key, value)),
        }
    }

    pub fn page_settings(&self) -> ModelResult<PageSettings> {
        let attr = |k: &str| self.attribute(k);
        Ok(PageSettings {
            dx: parse_i64_opt(attr("dx"), "dx")?,
            dy: parse_i64_opt(attr("dy"), "dy")?,
            grid: parse_bool_opt(attr("grid")),
            grid_size: parse_i64_opt(attr("gridSize"), "gridSize")?,
            guides: parse_bool_opt(attr("guides")),
            tooltips: parse_bool_opt(attr("tooltips")),
            connect: parse_bool_opt(attr("connect")),
            arrows: parse_bool_opt(attr("arrows")),
            fold: parse_bool_opt(attr("fold")),
            page: parse_bool_opt(attr("page")),
            page_scale: parse_f64_opt(attr("pageScale"), "pageScale")?,
            page_width: parse_f64_opt(attr("pageWidth"), "pageWidth")?,
            page_height: parse_f64_opt(attr("pageHeight"), "pageHeight")?,
            math: parse_bool_opt(attr("math")),
            shadow: parse_bool_opt(attr("shadow")),
        })
    }
}

fn locate_graph_model(document: XmlElement) -> ModelResult<XmlElement> {
    if document.find("mxGraphModel").is_some() {
        return document
            .into_found("mxGraphModel")
            .ok_or(ModelError::MissingElement("mxGraphModel"));
    }

    let payload = document
        .find("diagram")
        .map(|d| d.text.trim())
        .filter(|t| !t.is_empty())
        .ok_or(ModelError::MissingElement("mxGraphModel"))?;
    let decoded = decode_diagram_payload(payload)?;
    debug!(bytes = decoded.len(), "decoded compressed diagram payload");
    parse_document(&decoded)?
        .into_found("mxGraphModel")
        .ok_or(ModelError::MissingElement("mxGraphModel"))
}
