pub mod builder;
pub mod cell;
pub mod config;
pub mod document;
pub mod error;
pub mod geometry;
pub mod payload;
pub mod root;
pub mod style;
pub mod sync;
pub mod wrapper;
pub mod xml;

pub use builder::DocumentBuilder;
pub use cell::{Cell, CellAttribute, CellBuilder, CellKind, Flag};
pub use config::SyncConfig;
pub use document::{GraphDocument, PageSettings};
pub use error::{ErrorKind, ModelError, ModelResult};
pub use geometry::{Geometry, GeometryChild, Point};
pub use payload::{decode_diagram_payload, encode_diagram_payload};
pub use root::{Position, RemoveMode, Root};
pub use style::StyleMap;
pub use sync::{ClientCommand, Debouncer, EditingGate, HostEvent, SyncSession, SyncTick};
pub use wrapper::{ObjectWrapper, WrapperTag};
