use crate::error::{ModelError, ModelResult};
use crate::geometry::Geometry;
use crate::style::StyleMap;
use crate::wrapper::{ObjectWrapper, WrapperTag};
use crate::xml::XmlElement;
use serde::Serialize;
use std::str::FromStr;
use tracing::warn;

/// A `"0"`/`"1"` attribute. Absence is modelled with `Option<Flag>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Flag {
    #[serde(rename = "0")]
    Off,
    #[serde(rename = "1")]
    On,
}

impl Flag {
    pub fn as_str(self) -> &'static str {
        match self {
            Flag::Off => "0",
            Flag::On => "1",
        }
    }

    pub fn is_on(self) -> bool {
        self == Flag::On
    }

    fn from_attr(value: &str) -> Option<Self> {
        match value {
            "1" | "true" => Some(Flag::On),
            "0" | "false" => Some(Flag::Off),
            _ => None,
        }
    }
}

impl From<bool> for Flag {
    fn from(on: bool) -> Self {
        if on { Flag::On } else { Flag::Off }
    }
}

/// What a cell is, as the tree view labels it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CellKind {
    Layer,
    Group,
    Vertex,
    Edge,
    Other,
}

/// Attributes addressable by name in façade lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellAttribute {
    Id,
    Value,
    Style,
    Parent,
    Source,
    Target,
    Vertex,
    Edge,
    Connectable,
    Collapsed,
    Visible,
    Label,
}

impl FromStr for CellAttribute {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "id" => CellAttribute::Id,
            "value" => CellAttribute::Value,
            "style" => CellAttribute::Style,
            "parent" => CellAttribute::Parent,
            "source" => CellAttribute::Source,
            "target" => CellAttribute::Target,
            "vertex" => CellAttribute::Vertex,
            "edge" => CellAttribute::Edge,
            "connectable" => CellAttribute::Connectable,
            "collapsed" => CellAttribute::Collapsed,
            "visible" => CellAttribute::Visible,
            "label" => CellAttribute::Label,
            other => return Err(ModelError::Structure(format!("unknown cell attribute {other:?}"))),
        })
    }
}

/// One `<mxCell>`, optionally wrapped in a `<UserObject>`/`<object>`.
///
/// `value` keeps the absent/empty distinction: `None` lets the host fall back
/// to its own label, `Some("")` blanks it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cell {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    style: Option<StyleMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    vertex: Option<Flag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    edge: Option<Flag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    parent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    connectable: Option<Flag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    collapsed: Option<Flag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    visible: Option<Flag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    wrapper: Option<ObjectWrapper>,
    #[serde(skip_serializing_if = "Option::is_none")]
    geometry: Option<Geometry>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    extra: Vec<(String, String)>,
    /// Set by [`Cell::mark_if_layer`]; owned by the containing root.
    #[serde(rename = "is_layer")]
    layer: bool,
}

/// Element shape resolved once per parsed cell.
enum CellElement<'a> {
    Bare(&'a XmlElement),
    Wrapped {
        envelope: &'a XmlElement,
        inner: &'a XmlElement,
    },
}

impl<'a> CellElement<'a> {
    fn classify(el: &'a XmlElement) -> ModelResult<Self> {
        if WrapperTag::from_element_name(&el.name).is_none() {
            return Ok(CellElement::Bare(el));
        }
        let mut cells = el.children.iter().filter(|c| c.name == "mxCell");
        let inner = cells.next().ok_or(ModelError::MissingElement("mxCell"))?;
        if cells.next().is_some() {
            warn!(wrapper = %el.name, "wrapper holds more than one mxCell, using the first");
        }
        for other in el.children.iter().filter(|c| c.name != "mxCell") {
            warn!(wrapper = %el.name, child = %other.name, "found child not mapped");
        }
        Ok(CellElement::Wrapped {
            envelope: el,
            inner,
        })
    }
}

impl Cell {
    pub fn builder() -> CellBuilder {
        CellBuilder::default()
    }

    /// A cell with only an id and an optional parent (layers, default layer).
    pub fn plain(id: impl Into<String>, parent: Option<&str>) -> Cell {
        Cell {
            id: Some(id.into()),
            value: None,
            style: None,
            vertex: None,
            edge: None,
            parent: parent.map(str::to_string),
            source: None,
            target: None,
            connectable: None,
            collapsed: None,
            visible: None,
            wrapper: None,
            geometry: None,
            extra: Vec::new(),
            layer: false,
        }
    }

    /// Wrapper id when wrapped, else the cell's own id, else `""`.
    pub fn id(&self) -> &str {
        match &self.wrapper {
            Some(w) => w.id(),
            None => self.id.as_deref().unwrap_or(""),
        }
    }

    pub fn has_id(&self) -> bool {
        !self.id().is_empty()
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn set_value(&mut self, value: Option<String>) {
        self.value = value;
    }

    pub fn style(&self) -> Option<&StyleMap> {
        self.style.as_ref()
    }

    pub fn style_mut(&mut self) -> Option<&mut StyleMap> {
        self.style.as_mut()
    }

    pub fn set_style(&mut self, style: Option<StyleMap>) {
        self.style = style;
    }

    pub fn vertex(&self) -> Option<Flag> {
        self.vertex
    }

    pub fn edge(&self) -> Option<Flag> {
        self.edge
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub(crate) fn set_parent(&mut self, parent: Option<String>) {
        self.parent = parent;
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn set_source(&mut self, source: Option<String>) {
        self.source = source;
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn set_target(&mut self, target: Option<String>) {
        self.target = target;
    }

    pub fn connectable(&self) -> Option<Flag> {
        self.connectable
    }

    pub fn set_connectable(&mut self, connectable: Option<Flag>) {
        self.connectable = connectable;
    }

    pub fn collapsed(&self) -> Option<Flag> {
        self.collapsed
    }

    pub fn set_collapsed(&mut self, collapsed: Option<Flag>) {
        self.collapsed = collapsed;
    }

    pub fn visible(&self) -> Option<Flag> {
        self.visible
    }

    pub fn set_visible(&mut self, visible: Option<Flag>) {
        self.visible = visible;
    }

    pub fn wrapper(&self) -> Option<&ObjectWrapper> {
        self.wrapper.as_ref()
    }

    /// Wrapper metadata is editable; its id is not.
    pub fn wrapper_mut(&mut self) -> Option<&mut ObjectWrapper> {
        self.wrapper.as_mut()
    }

    pub fn geometry(&self) -> Option<&Geometry> {
        self.geometry.as_ref()
    }

    pub fn geometry_mut(&mut self) -> Option<&mut Geometry> {
        self.geometry.as_mut()
    }

    pub fn set_geometry(&mut self, geometry: Option<Geometry>) {
        self.geometry = geometry;
    }

    /// Attributes this model does not interpret, in document order.
    pub fn extra_attributes(&self) -> &[(String, String)] {
        &self.extra
    }

    pub fn is_vertex(&self) -> bool {
        self.vertex == Some(Flag::On)
    }

    pub fn is_edge(&self) -> bool {
        self.edge == Some(Flag::On)
    }

    pub fn is_connectable(&self) -> bool {
        self.connectable != Some(Flag::Off)
    }

    pub fn is_group(&self) -> bool {
        self.is_vertex()
            && self.connectable == Some(Flag::Off)
            && self.style.as_ref().is_some_and(StyleMap::is_group)
    }

    /// Classification from the last [`Cell::mark_if_layer`].
    pub fn is_layer(&self) -> bool {
        self.layer
    }

    /// Pure layer test against `default_layer_id`.
    pub fn is_layer_under(&self, default_layer_id: &str) -> bool {
        !self.is_vertex() && !self.is_edge() && self.parent.as_deref() == Some(default_layer_id)
    }

    pub fn mark_if_layer(&mut self, default_layer_id: &str) -> bool {
        self.layer = self.is_layer_under(default_layer_id);
        self.layer
    }

    pub fn kind(&self) -> CellKind {
        if self.layer {
            CellKind::Layer
        } else if self.is_group() {
            CellKind::Group
        } else if self.is_edge() {
            CellKind::Edge
        } else if self.is_vertex() {
            CellKind::Vertex
        } else {
            CellKind::Other
        }
    }

    /// Display text for tree views.
    pub fn label(&self) -> String {
        let wrapper_label = self.wrapper.as_ref().and_then(|w| w.label.as_deref());

        if let Some(label) = wrapper_label.map(str::trim).filter(|l| !l.is_empty()) {
            return label.to_string();
        }
        if let Some(label) = self
            .wrapper
            .as_ref()
            .and_then(|w| w.custom_attributes.get("label"))
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
        {
            return label.to_string();
        }
        if let Some(value) = self.value.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
            return value.to_string();
        }
        if let Some(shape) = self.style.as_ref().and_then(StyleMap::shape) {
            return shape.to_string();
        }
        if self.is_group() {
            return format!("Group - {}", self.id());
        }
        if self.layer && wrapper_label.is_none_or(str::is_empty) {
            return "Background".to_string();
        }
        self.id().to_string()
    }

    /// Reads `attribute` as text; the style reads in its encoded form.
    pub fn attribute(&self, attribute: CellAttribute) -> Option<String> {
        let flag = |f: Option<Flag>| f.map(|f| f.as_str().to_string());
        match attribute {
            CellAttribute::Id => self.has_id().then(|| self.id().to_string()),
            CellAttribute::Value => self.value.clone(),
            CellAttribute::Style => self.style.as_ref().map(StyleMap::stringify),
            CellAttribute::Parent => self.parent.clone(),
            CellAttribute::Source => self.source.clone(),
            CellAttribute::Target => self.target.clone(),
            CellAttribute::Vertex => flag(self.vertex),
            CellAttribute::Edge => flag(self.edge),
            CellAttribute::Connectable => flag(self.connectable),
            CellAttribute::Collapsed => flag(self.collapsed),
            CellAttribute::Visible => flag(self.visible),
            CellAttribute::Label => Some(self.label()),
        }
    }

    /// Parses a bare `<mxCell>` or a wrapper holding one.
    pub fn from_element(el: &XmlElement) -> ModelResult<Cell> {
        match CellElement::classify(el)? {
            CellElement::Bare(el) => parse_bare_cell(el),
            CellElement::Wrapped { envelope, inner } => {
                let mut cell = parse_bare_cell(inner)?;
                let wrapper = ObjectWrapper::from_element(envelope, cell.id.as_deref())?;
                // Copied for uniform lookup; to_element drops it again.
                cell.id = Some(wrapper.id().to_string());
                cell.wrapper = Some(wrapper);
                Ok(cell)
            }
        }
    }

    /// Emits the cell, nested inside its wrapper element when it has one.
    /// Unset attributes are omitted entirely.
    pub fn to_element(&self) -> XmlElement {
        let mut el = XmlElement::new("mxCell");

        if self.wrapper.is_none() {
            if let Some(id) = &self.id {
                el.set_attr("id", id.clone());
            }
            if let Some(value) = &self.value {
                el.set_attr("value", value.clone());
            }
        }
        if let Some(style) = &self.style {
            el.set_attr("style", style.stringify());
        }
        let attrs = [
            ("parent", self.parent.as_deref()),
            ("vertex", self.vertex.map(Flag::as_str)),
            ("connectable", self.connectable.map(Flag::as_str)),
            ("source", self.source.as_deref()),
            ("target", self.target.as_deref()),
            ("edge", self.edge.map(Flag::as_str)),
            ("collapsed", self.collapsed.map(Flag::as_str)),
            ("visible", self.visible.map(Flag::as_str)),
        ];
        for (key, value) in attrs {
            if let Some(value) = value {
                el.set_attr(key, value);
            }
        }
        for (k, v) in &self.extra {
            el.set_attr(k.clone(), v.clone());
        }
        if let Some(geometry) = &self.geometry {
            el.push_child(geometry.to_element());
        }

        match &self.wrapper {
            Some(wrapper) => {
                let mut envelope = wrapper.to_element();
                envelope.push_child(el);
                envelope
            }
            None => el,
        }
    }
}

fn parse_bare_cell(el: &XmlElement) -> ModelResult<Cell> {
    if el.name != "mxCell" {
        return Err(ModelError::Structure(format!(
            "expected <mxCell>, found <{}>",
            el.name
        )));
    }

    let mut extra = Vec::new();
    let mut flag = |key: &'static str| -> Option<Flag> {
        let raw = el.attr(key)?;
        let parsed = Flag::from_attr(raw);
        if parsed.is_none() {
            warn!(
                cell = el.attr("id").unwrap_or(""),
                attr = key,
                value = raw,
                "unrecognized flag value kept verbatim"
            );
            extra.push((key.to_string(), raw.to_string()));
        }
        parsed
    };
    let vertex = flag("vertex");
    let edge = flag("edge");
    let connectable = flag("connectable");
    let collapsed = flag("collapsed");
    let visible = flag("visible");

    for (k, v) in &el.attributes {
        if !is_known_cell_attr(k) {
            extra.push((k.clone(), v.clone()));
        }
    }

    let reference = |key: &str| el.attr(key).filter(|v| !v.is_empty()).map(str::to_string);

    let mut builder = CellBuilder {
        id: el.attr("id").filter(|v| !v.is_empty()).map(str::to_string),
        value: el.attr("value").map(str::to_string),
        style: el.attr("style").map(StyleMap::parse),
        vertex,
        edge,
        parent: reference("parent"),
        source: reference("source"),
        target: reference("target"),
        connectable,
        collapsed,
        visible,
        wrapper: None,
        geometry: None,
        extra,
    };

    for child in &el.children {
        if child.name == "mxGeometry" {
            builder.geometry = Some(Geometry::from_element(child)?);
        } else {
            warn!(
                cell = builder.id.as_deref().unwrap_or(""),
                child = %child.name,
                "found child not mapped"
            );
        }
    }

    builder.build()
}

fn is_known_cell_attr(k: &str) -> bool {
    matches!(
        k,
        "id" | "value"
            | "style"
            | "vertex"
            | "edge"
            | "parent"
            | "source"
            | "target"
            | "connectable"
            | "collapsed"
            | "visible"
    )
}

/// Validating constructor for [`Cell`].
#[derive(Debug, Clone, Default)]
pub struct CellBuilder {
    id: Option<String>,
    value: Option<String>,
    style: Option<StyleMap>,
    vertex: Option<Flag>,
    edge: Option<Flag>,
    parent: Option<String>,
    source: Option<String>,
    target: Option<String>,
    connectable: Option<Flag>,
    collapsed: Option<Flag>,
    visible: Option<Flag>,
    wrapper: Option<ObjectWrapper>,
    geometry: Option<Geometry>,
    extra: Vec<(String, String)>,
}

impl CellBuilder {
    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Accepts encoded style text or an already built [`StyleMap`].
    pub fn style(mut self, style: impl Into<StyleMap>) -> Self {
        self.style = Some(style.into());
        self
    }

    /// Accepts style entries as raw key/value pairs.
    pub fn style_entries<I, K, V>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.style = Some(entries.into_iter().collect());
        self
    }

    pub fn vertex(mut self, on: bool) -> Self {
        self.vertex = Some(on.into());
        self
    }

    pub fn edge(mut self, on: bool) -> Self {
        self.edge = Some(on.into());
        self
    }

    pub fn parent(mut self, parent: impl Into<String>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn connectable(mut self, on: bool) -> Self {
        self.connectable = Some(on.into());
        self
    }

    pub fn collapsed(mut self, on: bool) -> Self {
        self.collapsed = Some(on.into());
        self
    }

    pub fn visible(mut self, on: bool) -> Self {
        self.visible = Some(on.into());
        self
    }

    pub fn wrapper(mut self, wrapper: ObjectWrapper) -> Self {
        self.wrapper = Some(wrapper);
        self
    }

    pub fn geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = Some(geometry);
        self
    }

    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.push((key.into(), value.into()));
        self
    }

    pub fn build(self) -> ModelResult<Cell> {
        let id = match &self.wrapper {
            Some(wrapper) => Some(wrapper.id().to_string()),
            None => self.id,
        };
        if self.vertex == Some(Flag::On) && self.edge == Some(Flag::On) {
            return Err(ModelError::VertexAndEdge(id.unwrap_or_default()));
        }
        Ok(Cell {
            id,
            value: self.value,
            style: self.style,
            vertex: self.vertex,
            edge: self.edge,
            parent: self.parent,
            source: self.source,
            target: self.target,
            connectable: self.connectable,
            collapsed: self.collapsed,
            visible: self.visible,
            wrapper: self.wrapper,
            geometry: self.geometry,
            extra: self.extra,
            layer: false,
        })
    }
}
