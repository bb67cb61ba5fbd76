use mxgraph_core::{
    Cell, ClientCommand, DocumentBuilder, HostEvent, ModelError, SyncConfig, SyncSession,
};
use pretty_assertions::assert_eq;
use std::time::{Duration, Instant};

const DOC_A: &str = r#"<mxGraphModel><root><mxCell id="0"/><mxCell id="1" parent="0"/><mxCell id="a" value="A" parent="1" vertex="1"/></root></mxGraphModel>"#;
const DOC_B: &str = r#"<mxGraphModel><root><mxCell id="0"/><mxCell id="1" parent="0"/><mxCell id="b" value="B" parent="1" vertex="1"/></root></mxGraphModel>"#;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn session() -> SyncSession {
    SyncSession::new(&SyncConfig::default())
}

fn vertex(id: &str) -> Cell {
    Cell::builder()
        .id(id)
        .parent("1")
        .vertex(true)
        .build()
        .expect("build")
}

#[test]
fn inbound_documents_are_debounced_to_the_latest() {
    let t0 = Instant::now();
    let mut session = session();

    session.handle_event(HostEvent::DocumentUpdated(DOC_A.into()), t0);
    session.handle_event(HostEvent::DocumentUpdated(DOC_B.into()), t0 + ms(200));

    let early = session.poll(t0 + ms(400));
    assert!(!early.document_replaced);

    let tick = session.poll(t0 + ms(500));
    assert!(tick.document_replaced);
    assert!(tick.error.is_none());
    assert!(session.builder().root().contains("b"));
    assert!(!session.builder().root().contains("a"));
}

#[test]
fn bad_inbound_document_keeps_last_good_state() {
    let t0 = Instant::now();
    let mut session = session();
    session.handle_event(HostEvent::DocumentUpdated(DOC_A.into()), t0);
    session.poll(t0 + ms(300));
    session.handle_event(HostEvent::SelectionChanged(vec!["a".into()]), t0 + ms(310));

    session.handle_event(HostEvent::DocumentUpdated("<mxGraphModel>".into()), t0 + ms(400));
    let tick = session.poll(t0 + ms(700));

    assert!(!tick.document_replaced);
    assert!(matches!(tick.error, Some(ModelError::Structure(_)) | Some(ModelError::Xml(_))));
    assert!(session.builder().root().contains("a"));
    assert_eq!(session.selection(), &["a".to_string()]);
}

#[test]
fn replaced_document_prunes_selection() {
    let t0 = Instant::now();
    let mut session = session();
    session.handle_event(HostEvent::DocumentUpdated(DOC_A.into()), t0);
    session.poll(t0 + ms(300));
    session.handle_event(
        HostEvent::SelectionChanged(vec!["a".into(), "1".into()]),
        t0 + ms(310),
    );

    session.handle_event(HostEvent::DocumentUpdated(DOC_B.into()), t0 + ms(400));
    session.poll(t0 + ms(700));
    assert_eq!(session.selection(), &["1".to_string()]);
}

#[test]
fn local_edits_go_out_after_the_outbound_window() {
    let t0 = Instant::now();
    let mut session = session();

    session.edit(t0, |root| root.add(vertex("v1"))).expect("edit");
    session.edit(t0 + ms(100), |root| root.add(vertex("v2"))).expect("edit");

    assert!(session.poll(t0 + ms(500)).commands.is_empty());
    let tick = session.poll(t0 + ms(600));
    assert_eq!(tick.commands.len(), 1);
    let ClientCommand::UpdateDocument(xml) = &tick.commands[0] else {
        panic!("expected a document update, got {:?}", tick.commands);
    };
    assert!(xml.contains(r#"id="v1""#) && xml.contains(r#"id="v2""#));

    // nothing left to send
    assert!(session.poll(t0 + ms(5000)).commands.is_empty());
    assert_eq!(session.next_deadline(), None);
}

#[test]
fn failed_edit_changes_nothing() {
    let t0 = Instant::now();
    let mut session = session();
    let before = session.builder().clone();

    let result = session.edit(t0, |root| {
        root.add(vertex("ok"))?;
        root.add(vertex("ok"))
    });
    assert!(matches!(result, Err(ModelError::DuplicateId(_))));
    assert_eq!(session.builder(), &before);
    assert_eq!(session.next_deadline(), None);
}

#[test]
fn outbound_waits_while_host_is_editing() {
    let t0 = Instant::now();
    let mut session = SyncSession::with_builder(
        &SyncConfig::default(),
        DocumentBuilder::from_xml(DOC_A).expect("parse"),
    );

    session.edit(t0, |root| root.add(vertex("local"))).expect("edit");
    session.handle_event(HostEvent::SelectionChanged(vec!["a".into()]), t0 + ms(400));

    // outbound window has passed but the host was active 100 ms ago
    assert!(session.poll(t0 + ms(500)).commands.is_empty());
    assert_eq!(session.next_deadline(), Some(t0 + ms(900)));

    let tick = session.poll(t0 + ms(900));
    assert_eq!(tick.commands.len(), 1);
    assert!(matches!(tick.commands[0], ClientCommand::UpdateDocument(_)));
}

#[test]
fn host_document_supersedes_pending_local_edit() {
    let t0 = Instant::now();
    let mut session = session();

    session.edit(t0, |root| root.add(vertex("local"))).expect("edit");
    session.handle_event(HostEvent::DocumentUpdated(DOC_B.into()), t0 + ms(100));

    let tick = session.poll(t0 + ms(400));
    assert!(tick.document_replaced);
    assert_eq!(session.next_deadline(), None);
    assert!(session.poll(t0 + ms(2000)).commands.is_empty());
    assert!(!session.builder().root().contains("local"));
}

#[test]
fn echoes_are_ignored_both_ways() {
    let t0 = Instant::now();
    let mut session = session();

    session.edit(t0, |root| root.add(vertex("v"))).expect("edit");
    let sent = session.poll(t0 + ms(500));
    let Some(ClientCommand::UpdateDocument(xml)) = sent.commands.first().cloned() else {
        panic!("expected a document update");
    };

    // host reflects our own document back
    session.handle_event(HostEvent::DocumentUpdated(xml), t0 + ms(600));
    let tick = session.poll(t0 + ms(900));
    assert!(!tick.document_replaced);

    // committing an unchanged document schedules nothing
    session.commit(t0 + ms(1000));
    assert_eq!(session.next_deadline(), None);
}

#[test]
fn local_selection_is_sent_once_host_is_idle() {
    let t0 = Instant::now();
    let mut session = session();

    session.select(vec!["x".into()]);
    session.select(vec!["y".into()]);
    let tick = session.poll(t0);
    assert_eq!(tick.commands, vec![ClientCommand::SelectCells(vec!["y".into()])]);

    session.select(vec!["y".into()]);
    assert!(session.poll(t0).commands.is_empty());
}

#[test]
fn host_selection_replaces_unsent_local_selection() {
    let t0 = Instant::now();
    let mut session = session();

    session.select(vec!["a".into()]);
    session.handle_event(HostEvent::SelectionChanged(vec!["b".into()]), t0);

    let tick = session.poll(t0 + ms(5_000));
    assert!(tick.commands.is_empty());
    assert_eq!(session.selection().to_vec(), vec!["b".to_string()]);
}

#[test]
fn shutdown_cancels_everything() {
    let t0 = Instant::now();
    let mut session = session();
    session.handle_event(HostEvent::DocumentUpdated(DOC_A.into()), t0);
    session.edit(t0, |root| root.add(vertex("v"))).expect("edit");
    session.select(vec!["v".into()]);

    session.shutdown();
    assert_eq!(session.next_deadline(), None);
    let tick = session.poll(t0 + ms(10_000));
    assert!(!tick.document_replaced);
    assert!(tick.commands.is_empty());
}

#[test]
fn messages_use_type_and_payload_fields() {
    let event = HostEvent::from_json(r#"{"type":"selection_changed","payload":["1","2"]}"#)
        .expect("parse event");
    assert_eq!(event, HostEvent::SelectionChanged(vec!["1".into(), "2".into()]));

    let command = ClientCommand::UpdateDocument("<mxGraphModel/>".into());
    assert_eq!(
        command.to_json().expect("json"),
        r#"{"type":"update_document","payload":"<mxGraphModel/>"}"#
    );
    assert!(HostEvent::from_json(r#"{"type":"unknown","payload":1}"#).is_err());
}

#[test]
fn config_from_toml_drives_windows() {
    let config = SyncConfig::from_toml_str(
        "inbound_debounce_ms = 50\noutbound_debounce_ms = 80\nediting_grace_ms = 0\n",
    )
    .expect("config");
    let t0 = Instant::now();
    let mut session = SyncSession::new(&config);

    session.handle_event(HostEvent::DocumentUpdated(DOC_A.into()), t0);
    assert!(session.poll(t0 + ms(50)).document_replaced);

    session.edit(t0 + ms(60), |root| root.add(vertex("v"))).expect("edit");
    assert_eq!(session.poll(t0 + ms(140)).commands.len(), 1);
}
