use crate::cell::{Cell, CellAttribute};
use crate::document::GraphDocument;
use crate::error::ModelResult;
use crate::root::Root;

/// Read-mostly façade the tree and property panels work against. Mutations
/// go straight to the [`Root`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocumentBuilder {
    document: GraphDocument,
}

impl DocumentBuilder {
    pub fn new(document: GraphDocument) -> Self {
        Self { document }
    }

    pub fn from_xml(xml: &str) -> ModelResult<Self> {
        GraphDocument::parse(xml).map(Self::new)
    }

    pub fn to_xml(&self) -> String {
        self.document.serialize()
    }

    pub fn document(&self) -> &GraphDocument {
        &self.document
    }

    pub fn into_document(self) -> GraphDocument {
        self.document
    }

    pub fn root(&self) -> &Root {
        self.document.root()
    }

    pub fn root_mut(&mut self) -> &mut Root {
        self.document.root_mut()
    }

    /// First cell, in collection order, whose `attribute` reads as `value`.
    pub fn find_cell_by_attribute(&self, attribute: CellAttribute, value: &str) -> Option<&Cell> {
        self.root()
            .cells()
            .iter()
            .find(|cell| cell.attribute(attribute).as_deref() == Some(value))
    }

    /// Groups and layers: where a cell may be reparented to.
    pub fn list_allow_parent_ids(&self) -> Vec<&Cell> {
        self.root()
            .cells()
            .iter()
            .filter(|cell| cell.is_group() || cell.is_layer())
            .collect()
    }

    /// Plain vertices an edge may connect to.
    pub fn list_allow_connectables(&self) -> Vec<&Cell> {
        self.root()
            .cells()
            .iter()
            .filter(|cell| {
                cell.is_vertex() && !cell.is_edge() && !cell.is_group() && !cell.is_layer()
            })
            .collect()
    }

    pub fn list_layers(&self) -> Vec<&Cell> {
        self.root().list_layers()
    }
}

impl From<GraphDocument> for DocumentBuilder {
    fn from(document: GraphDocument) -> Self {
        Self::new(document)
    }
}
