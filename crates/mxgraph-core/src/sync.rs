//! Keeping a [`DocumentBuilder`] in step with the host editor.
//!
//! Both directions are debounced so that only the newest payload inside the
//! window is acted on, and payloads equal to the last one exchanged are
//! treated as echoes. Time is passed in by the caller so the session can be
//! driven from any event loop and tested without sleeping.

use crate::builder::DocumentBuilder;
use crate::config::SyncConfig;
use crate::error::{ModelError, ModelResult};
use crate::root::Root;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// One cancellable timer slot. Scheduling replaces the pending payload and
/// restarts the window; dropping the debouncer cancels it.
#[derive(Debug)]
pub struct Debouncer<T> {
    window: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: None,
        }
    }

    pub fn schedule(&mut self, payload: T, now: Instant) {
        self.pending = Some((payload, now + self.window));
    }

    /// Takes the payload once its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        let due = self.pending.as_ref().is_some_and(|(_, deadline)| now >= *deadline);
        if !due {
            return None;
        }
        self.pending.take().map(|(p, _)| p)
    }

    /// Pushes the deadline out to at least `at`.
    pub fn defer_until(&mut self, at: Instant) {
        if let Some((_, deadline)) = &mut self.pending
            && *deadline < at
        {
            *deadline = at;
        }
    }

    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take().map(|(p, _)| p)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, d)| *d)
    }
}

/// Tracks whether the host is mid-edit: busy until `grace` has passed since
/// its last reported activity.
#[derive(Debug, Clone)]
pub struct EditingGate {
    grace: Duration,
    last_activity: Option<Instant>,
}

impl EditingGate {
    pub fn new(grace: Duration) -> Self {
        Self {
            grace,
            last_activity: None,
        }
    }

    pub fn note_activity(&mut self, now: Instant) {
        self.last_activity = Some(now);
    }

    pub fn idle_at(&self) -> Option<Instant> {
        self.last_activity.map(|t| t + self.grace)
    }

    pub fn is_editing(&self, now: Instant) -> bool {
        self.idle_at().is_some_and(|idle| now < idle)
    }
}

/// Messages from the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum HostEvent {
    DocumentUpdated(String),
    SelectionChanged(Vec<String>),
}

impl HostEvent {
    pub fn from_json(text: &str) -> ModelResult<Self> {
        Ok(serde_json::from_str(text)?)
    }
}

/// Messages to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ClientCommand {
    UpdateDocument(String),
    SelectCells(Vec<String>),
}

impl ClientCommand {
    pub fn to_json(&self) -> ModelResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// What one [`SyncSession::poll`] produced.
#[derive(Debug, Default)]
pub struct SyncTick {
    pub document_replaced: bool,
    pub commands: Vec<ClientCommand>,
    /// An inbound payload that failed to parse; the previous document stays.
    pub error: Option<ModelError>,
}

#[derive(Debug)]
pub struct SyncSession {
    builder: DocumentBuilder,
    selection: Vec<String>,
    inbound: Debouncer<String>,
    outbound: Debouncer<String>,
    host_editing: EditingGate,
    last_exchanged: Option<String>,
    queued: Vec<ClientCommand>,
}

impl SyncSession {
    pub fn new(config: &SyncConfig) -> Self {
        Self::with_builder(config, DocumentBuilder::default())
    }

    pub fn with_builder(config: &SyncConfig, builder: DocumentBuilder) -> Self {
        Self {
            builder,
            selection: Vec::new(),
            inbound: Debouncer::new(config.inbound_debounce()),
            outbound: Debouncer::new(config.outbound_debounce()),
            host_editing: EditingGate::new(config.editing_grace()),
            last_exchanged: None,
            queued: Vec::new(),
        }
    }

    pub fn builder(&self) -> &DocumentBuilder {
        &self.builder
    }

    pub fn selection(&self) -> &[String] {
        &self.selection
    }

    pub fn handle_event(&mut self, event: HostEvent, now: Instant) {
        self.host_editing.note_activity(now);
        match event {
            HostEvent::DocumentUpdated(xml) => self.inbound.schedule(xml, now),
            HostEvent::SelectionChanged(ids) => {
                // the host's selection wins over one not yet sent
                self.queued.retain(|c| !matches!(c, ClientCommand::SelectCells(_)));
                if ids != self.selection {
                    debug!(count = ids.len(), "selection changed by host");
                    self.selection = ids;
                }
            }
        }
    }

    /// Local selection change; sent on the next poll without debouncing.
    pub fn select(&mut self, ids: Vec<String>) {
        if ids == self.selection {
            return;
        }
        self.selection = ids.clone();
        self.queued.retain(|c| !matches!(c, ClientCommand::SelectCells(_)));
        self.queued.push(ClientCommand::SelectCells(ids));
    }

    /// Runs `edit` against a copy of the root and keeps the result only on
    /// success, then schedules the new document for the host.
    pub fn edit<R>(
        &mut self,
        now: Instant,
        edit: impl FnOnce(&mut Root) -> ModelResult<R>,
    ) -> ModelResult<R> {
        let mut draft = self.builder.root().clone();
        let out = edit(&mut draft)?;
        *self.builder.root_mut() = draft;
        self.commit(now);
        Ok(out)
    }

    /// Schedules the current document for the host.
    pub fn commit(&mut self, now: Instant) {
        let xml = self.builder.to_xml();
        if self.last_exchanged.as_deref() == Some(xml.as_str()) {
            self.outbound.cancel();
            return;
        }
        self.outbound.schedule(xml, now);
    }

    pub fn poll(&mut self, now: Instant) -> SyncTick {
        let mut tick = SyncTick::default();

        if let Some(xml) = self.inbound.poll(now) {
            match self.apply_inbound(xml) {
                Ok(replaced) => tick.document_replaced = replaced,
                Err(err) => {
                    warn!(error = %err, "rejected document from host, keeping previous one");
                    tick.error = Some(err);
                }
            }
        }

        if self.host_editing.is_editing(now) {
            if let Some(idle) = self.host_editing.idle_at() {
                self.outbound.defer_until(idle);
            }
            return tick;
        }

        if let Some(xml) = self.outbound.poll(now)
            && self.last_exchanged.as_deref() != Some(xml.as_str())
        {
            info!(bytes = xml.len(), "sending document to host");
            self.last_exchanged = Some(xml.clone());
            tick.commands.push(ClientCommand::UpdateDocument(xml));
        }
        tick.commands.append(&mut self.queued);
        tick
    }

    fn apply_inbound(&mut self, xml: String) -> ModelResult<bool> {
        if self.last_exchanged.as_deref() == Some(xml.as_str()) {
            debug!("document from host unchanged, skipping");
            return Ok(false);
        }
        let builder = DocumentBuilder::from_xml(&xml)?;
        let root = builder.root();
        self.selection.retain(|id| root.contains(id));
        self.builder = builder;
        self.last_exchanged = Some(xml);
        // The host's copy is newer than anything still waiting to go out.
        self.outbound.cancel();
        info!(cells = self.builder.root().len(), "document replaced from host");
        Ok(true)
    }

    /// Earliest instant at which [`SyncSession::poll`] has work to do.
    pub fn next_deadline(&self) -> Option<Instant> {
        [self.inbound.deadline(), self.outbound.deadline()]
            .into_iter()
            .flatten()
            .min()
    }

    /// Cancels both timers and drops queued commands.
    pub fn shutdown(&mut self) {
        self.inbound.cancel();
        self.outbound.cancel();
        self.queued.clear();
    }
}
