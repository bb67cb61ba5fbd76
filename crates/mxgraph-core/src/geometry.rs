use crate::error::ModelResult;
use crate::xml::{XmlElement, format_number, parse_bool_opt, parse_f64_opt};
use serde::{Serialize, Serializer};
use tracing::warn;

/// `<mxGeometry>` payload of a cell.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Geometry {
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "ser_coord"
    )]
    pub x: Option<f64>,

    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "ser_coord"
    )]
    pub y: Option<f64>,

    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "ser_coord"
    )]
    pub width: Option<f64>,

    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "ser_coord"
    )]
    pub height: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub relative: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub as_attr: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<(String, String)>,

    /// Nested elements in document order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<GeometryChild>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GeometryChild {
    /// A single `<mxPoint as="...">` (source/target point, label offset).
    Point(Point),
    /// `<Array as="points">` waypoints.
    Points(Vec<Point>),
    /// Anything else, kept verbatim (`mxRectangle as="alternateBounds"`).
    Other(XmlElement),
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Point {
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "ser_coord"
    )]
    pub x: Option<f64>,

    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "ser_coord"
    )]
    pub y: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub as_attr: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extra: Vec<(String, String)>,
}

impl Geometry {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            width: Some(width),
            height: Some(height),
            as_attr: Some("geometry".into()),
            ..Self::default()
        }
    }

    /// Edge geometry: no position, `relative="1"`.
    pub fn relative() -> Self {
        Self {
            relative: Some(true),
            as_attr: Some("geometry".into()),
            ..Self::default()
        }
    }

    fn coordinate(&self, key: &str) -> Option<f64> {
        match key {
            "x" => self.x,
            "y" => self.y,
            "width" => self.width,
            "height" => self.height,
            _ => None,
        }
    }

    pub fn is_relative(&self) -> bool {
        self.relative == Some(true)
    }

    pub fn source_point(&self) -> Option<&Point> {
        self.tagged_point("sourcePoint")
    }

    pub fn target_point(&self) -> Option<&Point> {
        self.tagged_point("targetPoint")
    }

    pub fn offset(&self) -> Option<&Point> {
        self.tagged_point("offset")
    }

    pub fn waypoints(&self) -> &[Point] {
        self.children
            .iter()
            .find_map(|c| match c {
                GeometryChild::Points(points) => Some(points.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    fn tagged_point(&self, tag: &str) -> Option<&Point> {
        self.children.iter().find_map(|c| match c {
            GeometryChild::Point(p) if p.as_attr.as_deref() == Some(tag) => Some(p),
            _ => None,
        })
    }

    pub fn from_element(el: &XmlElement) -> ModelResult<Self> {
        let mut extra = Vec::new();
        let mut geometry = Geometry {
            x: lenient_coord(el, "x", "mxGeometry@x", &mut extra),
            y: lenient_coord(el, "y", "mxGeometry@y", &mut extra),
            width: lenient_coord(el, "width", "mxGeometry@width", &mut extra),
            height: lenient_coord(el, "height", "mxGeometry@height", &mut extra),
            relative: parse_bool_opt(el.attr("relative")),
            as_attr: el.attr("as").map(str::to_string),
            extra: Vec::new(),
            children: Vec::new(),
        };
        extra.extend(
            el.attributes
                .iter()
                .filter(|(k, _)| !is_known_geometry_attr(k))
                .cloned(),
        );
        geometry.extra = extra;

        for child in &el.children {
            let parsed = match child.name.as_str() {
                "mxPoint" => GeometryChild::Point(Point::from_element(child)?),
                "Array" if is_plain_points_array(child) => GeometryChild::Points(
                    child
                        .children
                        .iter()
                        .map(Point::from_element)
                        .collect::<ModelResult<Vec<_>>>()?,
                ),
                _ => GeometryChild::Other(child.clone()),
            };
            geometry.children.push(parsed);
        }

        Ok(geometry)
    }

    pub fn to_element(&self) -> XmlElement {
        let mut el = XmlElement::new("mxGeometry");
        push_number(&mut el, "x", self.x);
        push_number(&mut el, "y", self.y);
        push_number(&mut el, "width", self.width);
        push_number(&mut el, "height", self.height);
        if let Some(relative) = self.relative {
            el.set_attr("relative", if relative { "1" } else { "0" });
        }
        if let Some(as_attr) = &self.as_attr {
            el.set_attr("as", as_attr.clone());
        }
        for (k, v) in &self.extra {
            if self.coordinate(k).is_some() {
                continue;
            }
            el.set_attr(k.clone(), v.clone());
        }

        for child in &self.children {
            el.push_child(match child {
                GeometryChild::Point(p) => p.to_element(),
                GeometryChild::Points(points) => {
                    let mut array = XmlElement::new("Array").with_attr("as", "points");
                    array.children = points.iter().map(Point::to_element).collect();
                    array
                }
                GeometryChild::Other(other) => other.clone(),
            });
        }
        el
    }
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Self::default()
        }
    }

    pub fn from_element(el: &XmlElement) -> ModelResult<Self> {
        let mut extra = Vec::new();
        let x = lenient_coord(el, "x", "mxPoint@x", &mut extra);
        let y = lenient_coord(el, "y", "mxPoint@y", &mut extra);
        extra.extend(
            el.attributes
                .iter()
                .filter(|(k, _)| !matches!(k.as_str(), "x" | "y" | "as"))
                .cloned(),
        );
        Ok(Point {
            x,
            y,
            as_attr: el.attr("as").map(str::to_string),
            extra,
        })
    }

    pub fn to_element(&self) -> XmlElement {
        let mut el = XmlElement::new("mxPoint");
        push_number(&mut el, "x", self.x);
        push_number(&mut el, "y", self.y);
        if let Some(as_attr) = &self.as_attr {
            el.set_attr("as", as_attr.clone());
        }
        for (k, v) in &self.extra {
            let numeric = match k.as_str() {
                "x" => self.x,
                "y" => self.y,
                _ => None,
            };
            if numeric.is_none() {
                el.set_attr(k.clone(), v.clone());
            }
        }
        el
    }
}

/// JSON twin of [`format_number`]: whole coordinates dump as integers.
fn ser_coord<S: Serializer>(value: &Option<f64>, s: S) -> Result<S::Ok, S::Error> {
    match *value {
        None => s.serialize_none(),
        Some(v) if !v.is_finite() => Err(serde::ser::Error::custom(format!(
            "coordinate {v} has no JSON form"
        ))),
        Some(v) if v.fract() == 0.0 && v.abs() < 1e15 => s.serialize_i64(v as i64),
        Some(v) => s.serialize_f64(v),
    }
}

/// Coordinates are not validated: a spelling the number parser rejects
/// (`.5`, `+5`, `1e400`) stays in `extra` as raw text and is written back
/// unchanged.
fn lenient_coord(
    el: &XmlElement,
    key: &str,
    field: &'static str,
    extra: &mut Vec<(String, String)>,
) -> Option<f64> {
    match parse_f64_opt(el.attr(key), field) {
        Ok(value) => value,
        Err(err) => {
            warn!(%err, "keeping coordinate as raw text");
            if let Some(raw) = el.attr(key) {
                extra.push((key.to_string(), raw.to_string()));
            }
            None
        }
    }
}

fn push_number(el: &mut XmlElement, key: &str, value: Option<f64>) {
    if let Some(value) = value {
        el.set_attr(key, format_number(value));
    }
}

/// `<Array as="points">` holding only `mxPoint`s; any other shape is kept
/// as [`GeometryChild::Other`].
fn is_plain_points_array(el: &XmlElement) -> bool {
    el.attr("as") == Some("points")
        && el.attributes.len() == 1
        && el.text.is_empty()
        && el.children.iter().all(|p| p.name == "mxPoint")
}

fn is_known_geometry_attr(k: &str) -> bool {
    matches!(k, "x" | "y" | "width" | "height" | "relative" | "as")
}
