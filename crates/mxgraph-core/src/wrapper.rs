//! `<UserObject>` / `<object>` metadata envelopes.

use crate::error::{ModelError, ModelResult};
use crate::xml::XmlElement;
use serde::Serialize;
use std::collections::BTreeMap;

/// Attributes read into dedicated fields; never copied into `custom_attributes`.
pub const RESERVED_ATTRIBUTES: [&str; 7] =
    ["id", "label", "type", "link", "tooltip", "description", "tags"];

/// Element name the wrapper was read from. The host writes both spellings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum WrapperTag {
    #[default]
    UserObject,
    Object,
}

impl WrapperTag {
    pub fn element_name(self) -> &'static str {
        match self {
            WrapperTag::UserObject => "UserObject",
            WrapperTag::Object => "object",
        }
    }

    pub fn from_element_name(name: &str) -> Option<Self> {
        match name {
            "UserObject" => Some(WrapperTag::UserObject),
            "object" => Some(WrapperTag::Object),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ObjectWrapper {
    id: String,
    pub tag: WrapperTag,
    pub label: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub link: Option<String>,
    pub tooltip: Option<String>,
    pub description: Option<String>,
    /// Space-separated `tags`; `Some(vec![])` is a present but empty attribute.
    pub tags: Option<Vec<String>>,
    pub custom_attributes: BTreeMap<String, String>,
}

impl ObjectWrapper {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Authoritative id of the wrapped cell.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Reads the envelope attributes. `fallback_id` covers wrappers that only
    /// carry the id on their inner cell.
    pub fn from_element(el: &XmlElement, fallback_id: Option<&str>) -> ModelResult<Self> {
        let tag = WrapperTag::from_element_name(&el.name).ok_or_else(|| {
            ModelError::Structure(format!("<{}> is not an object wrapper", el.name))
        })?;
        let id = el
            .attr("id")
            .or(fallback_id)
            .ok_or(ModelError::MissingAttr("UserObject@id"))?
            .to_string();

        let custom_attributes = el
            .attributes
            .iter()
            .filter(|(k, _)| !RESERVED_ATTRIBUTES.contains(&k.as_str()))
            .cloned()
            .collect();

        Ok(ObjectWrapper {
            id,
            tag,
            label: el.attr("label").map(str::to_string),
            kind: el.attr("type").map(str::to_string),
            link: el.attr("link").map(str::to_string),
            tooltip: el.attr("tooltip").map(str::to_string),
            description: el.attr("description").map(str::to_string),
            tags: el
                .attr("tags")
                .map(|t| t.split_whitespace().map(str::to_string).collect()),
            custom_attributes,
        })
    }

    /// The envelope element without its inner cell; the id goes last, as the
    /// host writes it.
    pub fn to_element(&self) -> XmlElement {
        let mut el = XmlElement::new(self.tag.element_name());
        let reserved = [
            ("label", &self.label),
            ("tooltip", &self.tooltip),
            ("link", &self.link),
            ("type", &self.kind),
            ("description", &self.description),
        ];
        for (key, value) in reserved {
            if let Some(value) = value {
                el.set_attr(key, value.clone());
            }
        }
        if let Some(tags) = &self.tags {
            el.set_attr("tags", tags.join(" "));
        }
        for (k, v) in &self.custom_attributes {
            el.set_attr(k.clone(), v.clone());
        }
        el.set_attr("id", self.id.clone());
        el
    }
}
