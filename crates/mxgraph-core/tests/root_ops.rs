use mxgraph_core::{Cell, ErrorKind, ModelError, Position, RemoveMode, Root};
use pretty_assertions::assert_eq;

fn vertex(id: &str, parent: &str) -> Cell {
    Cell::builder()
        .id(id)
        .parent(parent)
        .vertex(true)
        .build()
        .expect("build vertex")
}

fn group(id: &str, parent: &str) -> Cell {
    Cell::builder()
        .id(id)
        .style("group")
        .parent(parent)
        .vertex(true)
        .connectable(false)
        .build()
        .expect("build group")
}

/// 0 ─ 1 ─ g ─ a
///         │   └ b ─ b1
///         └ c
///     2 ─ d
fn sample_root() -> Root {
    Root::from_cells(vec![
        Cell::plain("0", None),
        Cell::plain("1", Some("0")),
        group("g", "1"),
        vertex("a", "g"),
        vertex("b", "g"),
        vertex("b1", "b"),
        vertex("c", "1"),
        Cell::plain("2", Some("0")),
        vertex("d", "2"),
    ])
    .expect("sample root")
}

fn ids(root: &Root) -> Vec<&str> {
    root.cells().iter().map(Cell::id).collect()
}

fn ids_of(cells: &[&Cell]) -> Vec<String> {
    cells.iter().map(|c| c.id().to_string()).collect()
}

fn assert_classification(root: &Root) {
    for cell in root.cells() {
        assert_eq!(
            cell.is_layer(),
            cell.is_layer_under(root.default_layer_id()),
            "stale layer flag on {}",
            cell.id()
        );
    }
}

#[test]
fn default_layer_prefers_id_zero() {
    let root = Root::from_cells(vec![Cell::plain("1", Some("0")), Cell::plain("0", None)])
        .expect("root");
    assert_eq!(root.default_layer_id(), "0");
    assert_eq!(root.layer_ids(), &["1".to_string()]);
}

#[test]
fn default_layer_falls_back_to_first_parentless_cell() {
    let root = Root::from_cells(vec![
        Cell::plain("root", None),
        Cell::plain("layer", Some("root")),
    ])
    .expect("root");
    assert_eq!(root.default_layer_id(), "root");
    assert_eq!(root.layer_ids(), &["layer".to_string()]);
}

#[test]
fn construction_errors() {
    let err = Root::from_cells(vec![Cell::plain("a", Some("b"))]).expect_err("no default layer");
    assert!(matches!(err, ModelError::NoDefaultLayer));
    assert_eq!(err.kind(), ErrorKind::Format);

    let err = Root::from_cells(vec![Cell::plain("0", None), vertex("v", "ghost")])
        .expect_err("dangling");
    assert!(matches!(err, ModelError::DanglingParent { .. }));
    assert_eq!(err.kind(), ErrorKind::Structural);

    let err = Root::from_cells(vec![Cell::plain("0", None), Cell::plain("x", None)])
        .expect_err("second parentless cell");
    assert!(matches!(err, ModelError::Parentless(ref id) if id == "x"));

    let err = Root::from_cells(vec![Cell::plain("0", None), Cell::plain("0", None)])
        .expect_err("duplicate");
    assert!(matches!(err, ModelError::DuplicateId(_)));
}

#[test]
fn layers_exclude_the_default_layer() {
    let root = sample_root();
    assert_eq!(root.layer_ids(), &["1".to_string(), "2".to_string()]);
    assert_eq!(ids_of(&root.list_layers()), vec!["1", "2"]);
    assert_classification(&root);
}

#[test]
fn add_appends_and_before_after_splices() {
    let mut root = sample_root();
    root.add(vertex("e", "2")).expect("add");
    assert_eq!(ids(&root).last(), Some(&"e"));

    root.add_before_or_after(vertex("x", "1"), "c", Position::Before)
        .expect("insert before");
    root.add_before_or_after(vertex("y", "1"), "c", Position::After)
        .expect("insert after");
    assert_eq!(
        ids(&root),
        vec!["0", "1", "g", "a", "b", "b1", "x", "c", "y", "2", "d", "e"]
    );
}

#[test]
fn insert_failures_leave_root_untouched() {
    let mut root = sample_root();
    let before = root.clone();

    let err = root
        .add_before_or_after(vertex("x", "1"), "missing", Position::After)
        .expect_err("unknown target");
    assert!(matches!(err, ModelError::NotFound(ref id) if id == "missing"));
    assert!(root.add(vertex("a", "1")).is_err());
    assert!(root.add(vertex("z", "nowhere")).is_err());
    assert!(root.add(Cell::plain("free", None)).is_err());

    assert_eq!(root, before);
}

#[test]
fn move_forward_accounts_for_removal_shift() {
    let mut root = Root::from_cells(vec![
        Cell::plain("0", None),
        Cell::plain("1", Some("0")),
        vertex("a", "1"),
        vertex("b", "1"),
        vertex("c", "1"),
        vertex("d", "1"),
    ])
    .expect("root");

    root.move_position("a", Position::After, "c").expect("move");
    assert_eq!(ids(&root), vec!["0", "1", "b", "c", "a", "d"]);

    root.move_position("b", Position::Before, "d").expect("move");
    assert_eq!(ids(&root), vec!["0", "1", "c", "a", "b", "d"]);
}

#[test]
fn move_backward() {
    let mut root = Root::from_cells(vec![
        Cell::plain("0", None),
        Cell::plain("1", Some("0")),
        vertex("a", "1"),
        vertex("b", "1"),
        vertex("c", "1"),
    ])
    .expect("root");

    root.move_position("c", Position::Before, "a").expect("move");
    assert_eq!(ids(&root), vec!["0", "1", "c", "a", "b"]);

    root.move_position("b", Position::After, "c").expect("move");
    assert_eq!(ids(&root), vec!["0", "1", "c", "b", "a"]);
}

#[test]
fn move_relative_to_self_is_a_no_op() {
    let mut root = sample_root();
    let before = root.clone();
    root.move_position("c", Position::After, "c").expect("no-op");
    assert_eq!(root, before);
}

#[test]
fn move_with_unknown_id_fails_without_side_effects() {
    let mut root = sample_root();
    let before = root.clone();
    assert!(matches!(
        root.move_position("a", Position::Before, "missing"),
        Err(ModelError::NotFound(_))
    ));
    assert!(matches!(
        root.move_position("missing", Position::Before, "a"),
        Err(ModelError::NotFound(_))
    ));
    assert_eq!(root, before);
}

#[test]
fn position_parses_from_text() {
    assert_eq!("before".parse::<Position>().ok(), Some(Position::Before));
    assert_eq!("after".parse::<Position>().ok(), Some(Position::After));
    let err = "inside".parse::<Position>().expect_err("bad position");
    assert_eq!(err.kind(), ErrorKind::Format);
}

#[test]
fn graft_removal_reparents_direct_children() {
    let mut root = sample_root();
    let removed = root.remove("g", RemoveMode::Graft).expect("remove");

    assert_eq!(ids_of(&removed.iter().collect::<Vec<_>>()), vec!["g"]);
    assert_eq!(root.find_by_id("a").and_then(Cell::parent), Some("1"));
    assert_eq!(root.find_by_id("b").and_then(Cell::parent), Some("1"));
    assert_eq!(root.find_by_id("b1").and_then(Cell::parent), Some("b"));
    assert_eq!(ids(&root), vec!["0", "1", "a", "b", "b1", "c", "2", "d"]);
}

#[test]
fn grafting_a_layer_promotes_its_children_to_layers() {
    let mut root = sample_root();
    root.remove("1", RemoveMode::Graft).expect("remove");
    assert_eq!(root.find_by_id("c").and_then(Cell::parent), Some("0"));
    // A vertex directly under the default layer is still not a layer.
    assert!(!root.find_by_id("c").is_some_and(Cell::is_layer));
    assert_eq!(root.layer_ids(), &["2".to_string()]);
    assert_classification(&root);
}

#[test]
fn recursive_removal_takes_descendants_only() {
    let mut root = sample_root();
    let removed = root.remove("1", RemoveMode::Recursive).expect("remove");

    let mut removed_ids = ids_of(&removed.iter().collect::<Vec<_>>());
    removed_ids.sort();
    assert_eq!(removed_ids, vec!["1", "a", "b", "b1", "c", "g"]);
    assert_eq!(ids(&root), vec!["0", "2", "d"]);
    assert_classification(&root);
}

#[test]
fn recursive_removal_handles_children_listed_before_parents() {
    let mut root = Root::from_cells(vec![
        Cell::plain("0", None),
        Cell::plain("1", Some("0")),
        vertex("leaf", "mid"),
        vertex("mid", "top"),
        group("top", "1"),
        vertex("keep", "1"),
    ])
    .expect("root");

    root.remove("top", RemoveMode::Recursive).expect("remove");
    assert_eq!(ids(&root), vec!["0", "1", "keep"]);
}

#[test]
fn removing_missing_id_is_a_no_op() {
    let mut root = sample_root();
    let before = root.clone();
    assert!(root.remove("missing", RemoveMode::Recursive).expect("no-op").is_empty());
    assert_eq!(root, before);
}

#[test]
fn default_layer_cannot_be_removed() {
    let mut root = sample_root();
    for mode in [RemoveMode::Graft, RemoveMode::Recursive] {
        let err = root.remove("0", mode).expect_err("default layer");
        assert!(matches!(err, ModelError::DefaultLayerRemoval(_)));
    }
    assert_eq!(root.len(), 9);
}

#[test]
fn children_and_descendants() {
    let root = sample_root();
    assert_eq!(ids_of(&root.children("g")), vec!["a", "b"]);
    assert_eq!(ids_of(&root.cells_in_layer("1")), vec!["g", "c"]);
    assert_eq!(ids_of(&root.descendants("1")), vec!["g", "c", "a", "b", "b1"]);
    assert!(root.descendants("d").is_empty());
}

#[test]
fn ancestry() {
    let root = sample_root();
    assert!(root.is_ancestor("g", "b1"));
    assert!(root.is_ancestor("0", "b1"));
    assert!(root.is_ancestor("1", "g"));
    assert!(!root.is_ancestor("2", "b1"));
    assert!(!root.is_ancestor("b1", "g"));
    assert!(!root.is_ancestor("a", "a"));
    assert!(!root.is_ancestor("g", "missing"));
}

#[test]
fn set_parent_moves_between_layers() {
    let mut root = sample_root();
    root.set_parent("g", "2").expect("reparent");
    assert_eq!(root.find_by_id("g").and_then(Cell::parent), Some("2"));
    assert_eq!(ids_of(&root.cells_in_layer("2")), vec!["g", "d"]);
    assert!(root.is_ancestor("2", "b1"));
    // order is untouched
    assert_eq!(ids(&root), ids(&sample_root()));
}

#[test]
fn set_parent_rejects_cycles() {
    let mut root = sample_root();
    let before = root.clone();

    for (cell, parent) in [("g", "b1"), ("g", "g"), ("0", "1")] {
        let err = root.set_parent(cell, parent).expect_err("cycle");
        assert!(matches!(err, ModelError::Cycle { .. }), "{cell} -> {parent}");
        assert_eq!(err.kind(), ErrorKind::Structural);
    }
    assert!(matches!(root.set_parent("g", "missing"), Err(ModelError::NotFound(_))));
    assert_eq!(root, before);
}

#[test]
fn set_parent_reclassifies_layers() {
    let mut root = sample_root();
    root.set_parent("2", "1").expect("reparent");
    assert_eq!(root.layer_ids(), &["1".to_string()]);
    root.set_parent("2", "0").expect("reparent back");
    assert_eq!(root.layer_ids(), &["1".to_string(), "2".to_string()]);
    assert_classification(&root);
}

#[test]
fn update_cell_keeps_identity_and_classification() {
    let mut root = sample_root();
    let before = root.clone();

    let err = root
        .update_cell("c", |cell| *cell = vertex("z", "1"))
        .expect_err("id swap");
    assert_eq!(err.kind(), ErrorKind::Structural);
    let err = root
        .update_cell("2", |cell| *cell = Cell::plain("2", Some("1")))
        .expect_err("parent swap");
    assert_eq!(err.kind(), ErrorKind::Structural);
    assert!(matches!(
        root.update_cell("missing", |_| ()),
        Err(ModelError::NotFound(_))
    ));
    assert_eq!(root, before);

    // same id and parent, but now a vertex: no longer a layer
    root.update_cell("2", |cell| *cell = vertex("2", "0"))
        .expect("update");
    assert_eq!(root.layer_ids(), &["1".to_string()]);
    assert_classification(&root);

    let label = root
        .update_cell("c", |cell| {
            cell.set_value(Some("C".into()));
            cell.label().to_string()
        })
        .expect("update");
    assert_eq!(label, "C");
    assert_eq!(root.find_by_id("c").and_then(Cell::value), Some("C"));
}

#[test]
fn effective_visibility_follows_hidden_and_collapsed_ancestors() {
    let mut hidden_layer = Cell::plain("2", Some("0"));
    hidden_layer.set_visible(Some(mxgraph_core::Flag::Off));
    let collapsed = Cell::builder()
        .id("g")
        .style("group")
        .parent("1")
        .vertex(true)
        .connectable(false)
        .collapsed(true)
        .build()
        .expect("build");

    let root = Root::from_cells(vec![
        Cell::plain("0", None),
        Cell::plain("1", Some("0")),
        collapsed,
        vertex("inside", "g"),
        vertex("c", "1"),
        hidden_layer,
        vertex("d", "2"),
    ])
    .expect("root");

    let visibility = root.effective_visibility();
    let visible = |id: &str| visibility.get(id).copied();
    assert_eq!(visible("0"), Some(true));
    assert_eq!(visible("g"), Some(true));
    assert_eq!(visible("inside"), Some(false));
    assert_eq!(visible("c"), Some(true));
    assert_eq!(visible("2"), Some(false));
    assert_eq!(visible("d"), Some(false));
}

#[test]
fn blank_root_has_default_and_first_layer() {
    let root = Root::blank();
    assert_eq!(ids(&root), vec!["0", "1"]);
    assert_eq!(root.default_layer_id(), "0");
    assert_eq!(ids_of(&root.list_layers()), vec!["1"]);
}
