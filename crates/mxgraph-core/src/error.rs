use serde::Serialize;

/// Coarse classification of a [`ModelError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    /// Input could not be read as a graph document.
    Format,
    /// An operation would break the implicit tree.
    Structural,
    /// A referenced cell does not exist.
    NotFound,
}

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("attribute error: {0}")]
    Attr(#[from] quick_xml::events::attributes::AttrError),

    #[error("utf8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("encoding error: {0}")]
    Encoding(#[from] quick_xml::encoding::EncodingError),

    #[error("base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("missing required element: <{0}>")]
    MissingElement(&'static str),

    #[error("missing required attribute: {0}")]
    MissingAttr(&'static str),

    #[error("invalid number for {field}: {value}")]
    InvalidNumber { field: &'static str, value: String },

    #[error("invalid position {0:?}, expected \"before\" or \"after\"")]
    InvalidPosition(String),

    #[error("unexpected structure: {0}")]
    Structure(String),

    #[error("could not find default layer")]
    NoDefaultLayer,

    #[error("cell cannot be both a vertex and an edge (id: {0})")]
    VertexAndEdge(String),

    #[error("cell has no id")]
    MissingId,

    #[error("duplicate cell id {0:?}")]
    DuplicateId(String),

    #[error("cell {id:?} references unknown parent {parent:?}")]
    DanglingParent { id: String, parent: String },

    #[error("cell {0:?} has no parent but is not the default layer")]
    Parentless(String),

    #[error("cannot move {id:?} under {parent:?}: it would become its own ancestor")]
    Cycle { id: String, parent: String },

    #[error("the default layer {0:?} cannot be removed")]
    DefaultLayerRemoval(String),

    #[error("cell with id {0:?} not found")]
    NotFound(String),
}

impl ModelError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ModelError::VertexAndEdge(_)
            | ModelError::MissingId
            | ModelError::DuplicateId(_)
            | ModelError::DanglingParent { .. }
            | ModelError::Parentless(_)
            | ModelError::Cycle { .. }
            | ModelError::DefaultLayerRemoval(_) => ErrorKind::Structural,
            ModelError::NotFound(_) => ErrorKind::NotFound,
            _ => ErrorKind::Format,
        }
    }
}

pub type ModelResult<T> = Result<T, ModelError>;
