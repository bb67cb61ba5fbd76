//! The `<root>` container: an ordered, flat list of cells whose tree shape
//! lives entirely in `parent` id references.
//!
//! Collection order is z-order in the host and is only changed by explicit
//! reorders. Every mutation validates first and reclassifies layers last, so
//! a failed call leaves the root untouched.

use crate::cell::{Cell, Flag};
use crate::error::{ModelError, ModelResult};
use crate::wrapper::WrapperTag;
use crate::xml::XmlElement;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::str::FromStr;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Before,
    After,
}

impl FromStr for Position {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "before" => Ok(Position::Before),
            "after" => Ok(Position::After),
            other => Err(ModelError::InvalidPosition(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RemoveMode {
    /// Children of the removed cell move up to its former parent.
    #[default]
    Graft,
    /// The removed cell takes every descendant with it.
    Recursive,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Root {
    cells: Vec<Cell>,
    default_layer: String,
    layers: Vec<String>,
}

impl Root {
    /// Builds a root from cells in document order.
    ///
    /// The default layer is the cell with id `0`, or failing that the first
    /// cell without a parent. Every cell needs a unique id, and every other
    /// cell's parent must resolve.
    pub fn from_cells(cells: Vec<Cell>) -> ModelResult<Root> {
        let default_layer = validate_cells(&cells)?;
        let mut root = Root {
            cells,
            default_layer,
            layers: Vec::new(),
        };
        root.reclassify();
        Ok(root)
    }

    /// Default layer `0` with one layer `1` under it.
    pub fn blank() -> Root {
        let mut root = Root {
            cells: vec![Cell::plain("0", None), Cell::plain("1", Some("0"))],
            default_layer: "0".to_string(),
            layers: Vec::new(),
        };
        root.reclassify();
        root
    }

    /// Reads every cell or wrapper child of `<root>`; other elements are logged and skipped.
    pub fn from_element(el: &XmlElement) -> ModelResult<Root> {
        let cells = el
            .children
            .iter()
            .filter(|child| {
                let known = child.name == "mxCell"
                    || WrapperTag::from_element_name(&child.name).is_some();
                if !known {
                    warn!(child = %child.name, "found child not mapped");
                }
                known
            })
            .map(Cell::from_element)
            .collect::<ModelResult<Vec<_>>>()?;
        let root = Root::from_cells(cells)?;
        debug!(
            cells = root.cells.len(),
            layers = root.layers.len(),
            default_layer = %root.default_layer,
            "parsed root"
        );
        Ok(root)
    }

    pub fn to_element(&self) -> XmlElement {
        let mut el = XmlElement::new("root");
        el.children = self.cells.iter().map(Cell::to_element).collect();
        el
    }

    fn reclassify(&mut self) {
        self.layers.clear();
        for cell in &mut self.cells {
            if cell.mark_if_layer(&self.default_layer) {
                self.layers.push(cell.id().to_string());
            }
        }
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn default_layer_id(&self) -> &str {
        &self.default_layer
    }

    pub fn default_layer(&self) -> Option<&Cell> {
        self.find_by_id(&self.default_layer)
    }

    /// Every layer id in collection order.
    pub fn layer_ids(&self) -> &[String] {
        &self.layers
    }

    /// Layers a user can switch between; the default layer is never listed.
    pub fn list_layers(&self) -> Vec<&Cell> {
        self.cells
            .iter()
            .filter(|c| c.is_layer() && c.id() != self.default_layer)
            .collect()
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.cells.iter().position(|c| c.id() == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index_of(id).is_some()
    }

    pub fn find_by_id(&self, id: &str) -> Option<&Cell> {
        self.cells.iter().find(|c| c.id() == id)
    }

    /// Edits the attributes of `id` in place. The edit runs on a copy that is
    /// kept only if id and parent are unchanged and the cell is not both a
    /// vertex and an edge; reparenting goes through [`Root::set_parent`].
    pub fn update_cell<R>(
        &mut self,
        id: &str,
        edit: impl FnOnce(&mut Cell) -> R,
    ) -> ModelResult<R> {
        let index = self
            .index_of(id)
            .ok_or_else(|| ModelError::NotFound(id.to_string()))?;
        let mut draft = self.cells[index].clone();
        let out = edit(&mut draft);

        let current = &self.cells[index];
        if draft.id() != current.id() || draft.parent() != current.parent() {
            return Err(ModelError::Structure(format!(
                "edit of {id:?} changed its id or parent"
            )));
        }
        if draft.is_vertex() && draft.is_edge() {
            return Err(ModelError::VertexAndEdge(id.to_string()));
        }
        self.cells[index] = draft;
        self.reclassify();
        Ok(out)
    }

    pub fn children(&self, parent_id: &str) -> Vec<&Cell> {
        self.cells
            .iter()
            .filter(|c| c.parent() == Some(parent_id))
            .collect()
    }

    pub fn cells_in_layer(&self, layer_id: &str) -> Vec<&Cell> {
        self.children(layer_id)
    }

    /// Breadth-first transitive children of `parent_id`.
    pub fn descendants(&self, parent_id: &str) -> Vec<&Cell> {
        let by_parent = self.children_by_parent();
        let mut out = Vec::new();
        let mut visited: HashSet<&str> = HashSet::from([parent_id]);
        let mut queue = VecDeque::from([parent_id]);

        while let Some(current) = queue.pop_front() {
            let Some(children) = by_parent.get(current) else {
                continue;
            };
            for &idx in children {
                let child = &self.cells[idx];
                if visited.insert(child.id()) {
                    out.push(child);
                    queue.push_back(child.id());
                }
            }
        }
        out
    }

    fn children_by_parent(&self) -> HashMap<&str, Vec<usize>> {
        let mut by_parent: HashMap<&str, Vec<usize>> = HashMap::new();
        for (idx, cell) in self.cells.iter().enumerate() {
            if let Some(parent) = cell.parent() {
                by_parent.entry(parent).or_default().push(idx);
            }
        }
        by_parent
    }

    /// True when `ancestor_id` appears on the parent chain above `descendant_id`.
    pub fn is_ancestor(&self, ancestor_id: &str, descendant_id: &str) -> bool {
        let mut current = self.find_by_id(descendant_id);
        let mut hops = 0;
        while let Some(cell) = current {
            let Some(parent) = cell.parent() else {
                return false;
            };
            if parent == ancestor_id {
                return true;
            }
            hops += 1;
            if hops > self.cells.len() {
                return false;
            }
            current = self.find_by_id(parent);
        }
        false
    }

    /// Cell id to effective visibility. A cell is hidden when it or an
    /// ancestor has `visible="0"`, or when an ancestor is collapsed.
    pub fn effective_visibility(&self) -> BTreeMap<String, bool> {
        let by_parent = self.children_by_parent();
        let mut out = BTreeMap::new();
        let root_visible = self
            .default_layer()
            .is_none_or(|layer| layer.visible() != Some(Flag::Off));
        out.insert(self.default_layer.clone(), root_visible);
        let mut queue: VecDeque<(&str, bool)> =
            VecDeque::from([(self.default_layer.as_str(), root_visible)]);

        while let Some((parent, parent_visible)) = queue.pop_front() {
            let Some(children) = by_parent.get(parent) else {
                continue;
            };
            for &idx in children {
                let child = &self.cells[idx];
                if out.contains_key(child.id()) {
                    continue;
                }
                let effective = parent_visible && child.visible() != Some(Flag::Off);
                out.insert(child.id().to_string(), effective);
                queue.push_back((child.id(), effective && child.collapsed() != Some(Flag::On)));
            }
        }
        out
    }

    fn check_insertable(&self, cell: &Cell) -> ModelResult<()> {
        if !cell.has_id() {
            return Err(ModelError::MissingId);
        }
        if self.contains(cell.id()) {
            return Err(ModelError::DuplicateId(cell.id().to_string()));
        }
        match cell.parent() {
            None => Err(ModelError::Parentless(cell.id().to_string())),
            Some(parent) if !self.contains(parent) => Err(ModelError::DanglingParent {
                id: cell.id().to_string(),
                parent: parent.to_string(),
            }),
            Some(_) => Ok(()),
        }
    }

    /// Appends `cell` at the end of the collection.
    pub fn add(&mut self, cell: Cell) -> ModelResult<()> {
        self.check_insertable(&cell)?;
        debug!(id = cell.id(), "add cell");
        self.cells.push(cell);
        self.reclassify();
        Ok(())
    }

    /// Inserts `cell` directly before or after `target_id`.
    pub fn add_before_or_after(
        &mut self,
        cell: Cell,
        target_id: &str,
        position: Position,
    ) -> ModelResult<()> {
        let index = self
            .index_of(target_id)
            .ok_or_else(|| ModelError::NotFound(target_id.to_string()))?;
        self.check_insertable(&cell)?;
        debug!(id = cell.id(), target = target_id, ?position, "insert cell");
        let at = match position {
            Position::Before => index,
            Position::After => index + 1,
        };
        self.cells.insert(at, cell);
        self.reclassify();
        Ok(())
    }

    /// Moves `cell_id` next to `target_id`. Moving a cell relative to itself
    /// is a no-op.
    pub fn move_position(
        &mut self,
        cell_id: &str,
        position: Position,
        target_id: &str,
    ) -> ModelResult<()> {
        let from = self
            .index_of(cell_id)
            .ok_or_else(|| ModelError::NotFound(cell_id.to_string()))?;
        let to = self
            .index_of(target_id)
            .ok_or_else(|| ModelError::NotFound(target_id.to_string()))?;

        if cell_id == target_id {
            warn!(id = cell_id, "ignoring move of cell relative to itself");
            return Ok(());
        }

        let cell = self.cells.remove(from);
        // The target shifts down by one when the cell came from before it.
        let target = if from < to { to - 1 } else { to };
        let at = match position {
            Position::Before => target,
            Position::After => target + 1,
        };
        debug!(id = cell_id, from, to = at, "move cell");
        self.cells.insert(at, cell);
        self.reclassify();
        Ok(())
    }

    /// Removes `cell_id` and returns everything taken out of the collection.
    /// A missing id is a no-op returning nothing.
    pub fn remove(&mut self, cell_id: &str, mode: RemoveMode) -> ModelResult<Vec<Cell>> {
        let Some(index) = self.index_of(cell_id) else {
            return Ok(Vec::new());
        };
        if cell_id == self.default_layer {
            return Err(ModelError::DefaultLayerRemoval(cell_id.to_string()));
        }

        let removed = self.cells.remove(index);
        let former_parent = removed.parent().map(str::to_string);
        let mut out = vec![removed];

        match mode {
            RemoveMode::Graft => {
                for cell in &mut self.cells {
                    if cell.parent() == Some(cell_id) {
                        cell.set_parent(former_parent.clone());
                    }
                }
            }
            RemoveMode::Recursive => {
                let mut doomed: HashSet<String> = HashSet::from([cell_id.to_string()]);
                let mut changed = true;
                while changed {
                    changed = false;
                    for cell in &self.cells {
                        if let Some(parent) = cell.parent()
                            && doomed.contains(parent)
                            && doomed.insert(cell.id().to_string())
                        {
                            changed = true;
                        }
                    }
                }
                let (gone, kept): (Vec<Cell>, Vec<Cell>) = std::mem::take(&mut self.cells)
                    .into_iter()
                    .partition(|c| doomed.contains(c.id()));
                self.cells = kept;
                out.extend(gone);
            }
        }

        debug!(id = cell_id, ?mode, removed = out.len(), "remove cell");
        self.reclassify();
        Ok(out)
    }

    /// Reparents `cell_id` under `parent_id` without changing collection order.
    pub fn set_parent(&mut self, cell_id: &str, parent_id: &str) -> ModelResult<()> {
        let index = self
            .index_of(cell_id)
            .ok_or_else(|| ModelError::NotFound(cell_id.to_string()))?;
        if !self.contains(parent_id) {
            return Err(ModelError::NotFound(parent_id.to_string()));
        }
        if cell_id == self.default_layer
            || cell_id == parent_id
            || self.is_ancestor(cell_id, parent_id)
        {
            return Err(ModelError::Cycle {
                id: cell_id.to_string(),
                parent: parent_id.to_string(),
            });
        }
        debug!(id = cell_id, parent = parent_id, "reparent cell");
        self.cells[index].set_parent(Some(parent_id.to_string()));
        self.reclassify();
        Ok(())
    }
}

/// Checks ids and parent references, returning the default layer id.
fn validate_cells(cells: &[Cell]) -> ModelResult<String> {
    let mut seen = HashSet::new();
    for cell in cells {
        if !cell.has_id() {
            return Err(ModelError::MissingId);
        }
        if !seen.insert(cell.id()) {
            return Err(ModelError::DuplicateId(cell.id().to_string()));
        }
    }

    let default_layer = cells
        .iter()
        .find(|c| c.id() == "0")
        .or_else(|| cells.iter().find(|c| c.parent().is_none()))
        .map(|c| c.id().to_string())
        .ok_or(ModelError::NoDefaultLayer)?;

    for cell in cells {
        if cell.id() == default_layer {
            continue;
        }
        match cell.parent() {
            None => return Err(ModelError::Parentless(cell.id().to_string())),
            Some(parent) if !seen.contains(parent) => {
                return Err(ModelError::DanglingParent {
                    id: cell.id().to_string(),
                    parent: parent.to_string(),
                });
            }
            Some(_) => {}
        }
    }
    Ok(default_layer)
}
