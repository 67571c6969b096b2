//! Connection manager — owns the transport and drives the protocol.
//!
//! One `Client` per connection. It owns the lifecycle phase, the session
//! context, the folder tree, the transfer assembler and the request
//! correlator; collaborators observe it exclusively through the
//! [`ClientEvent`] stream.
//!
//! All inbound handling runs in arrival order on the task that calls
//! [`process_next`](Client::process_next) (or [`run`](Client::run));
//! dispatch itself never awaits, so two inbound messages are never
//! handled concurrently. Outbound requests are fully encoded before they
//! reach the transport's writer task, which serializes the socket.

use bytes::Bytes;

use crate::config::ClientConfig;
use crate::correlate::RequestCorrelator;
use crate::error::ClientError;
use crate::event::{ClientEvent, EventSender, LinkStatus};
use crate::session::SessionContext;
use crate::state::LinkPhase;
use crate::transfer::TransferAssembler;
use crate::transport::{Transport, WireMessage, WsTransport, secure_uri};
use crate::tree::FolderTree;
use crate::wire::{self, FileSelector, Request, Response};

/// The protocol client engine.
pub struct Client {
    config: ClientConfig,
    phase: LinkPhase,
    session: SessionContext,
    tree: FolderTree,
    assembler: TransferAssembler,
    correlator: RequestCorrelator,
    events: EventSender,
    transport: Option<Box<dyn Transport + Send>>,
    /// Monotonically increasing request ID counter.
    next_request_id: u64,
}

impl Client {
    /// Create a disconnected client reporting into `events`.
    pub fn new(config: ClientConfig, events: EventSender) -> Self {
        let mut correlator = RequestCorrelator::new();
        correlator.set_default_deadline(config.request_timeout());

        Self {
            config,
            phase: LinkPhase::default(),
            session: SessionContext::new(),
            tree: FolderTree::new(),
            assembler: TransferAssembler::new(),
            correlator,
            events,
            transport: None,
            next_request_id: 1,
        }
    }

    // ── Connection management ────────────────────────────────────

    /// Open the configured WebSocket endpoint.
    ///
    /// Fails fast unless `Disconnected`. On success the client is
    /// `Connected` and a list-roots request has been issued.
    pub async fn connect(&mut self) -> Result<(), ClientError> {
        self.phase.begin_connect()?;
        self.emit_status(LinkStatus::Connecting);

        let endpoint = if self.config.network.secure {
            secure_uri(&self.config.network.endpoint)
        } else {
            self.config.network.endpoint.clone()
        };
        let capacity = self.config.network.channel_capacity;
        match WsTransport::connect(&endpoint, capacity).await {
            Ok(transport) => self.finish_connect(Box::new(transport)).await,
            Err(e) => {
                self.phase.force_disconnect();
                self.emit_status(LinkStatus::Errored {
                    reason: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Connect over an already-open transport (alternative transports,
    /// tests).
    pub async fn connect_over(
        &mut self,
        transport: Box<dyn Transport + Send>,
    ) -> Result<(), ClientError> {
        self.phase.begin_connect()?;
        self.emit_status(LinkStatus::Connecting);
        self.finish_connect(transport).await
    }

    async fn finish_connect(
        &mut self,
        transport: Box<dyn Transport + Send>,
    ) -> Result<(), ClientError> {
        self.transport = Some(transport);
        self.phase.open()?;
        self.emit_status(LinkStatus::Connected);

        // First thing on any fresh connection: ask for the watched roots.
        self.list_roots().await?;
        Ok(())
    }

    /// Close the connection.
    ///
    /// Valid from any non-`Disconnected` state. A hard abort: pending
    /// requests and any in-progress transfer are discarded without
    /// completion notification.
    pub async fn disconnect(&mut self) -> Result<(), ClientError> {
        self.phase.begin_close()?;
        if let Some(mut transport) = self.transport.take() {
            transport.close().await;
        }
        self.correlator.clear();
        self.assembler.abort();
        self.phase.finish_close()?;
        self.emit_status(LinkStatus::Disconnected);
        Ok(())
    }

    /// Encode, track and queue one request. Only valid in `Connected`;
    /// returns the request id.
    pub async fn send(&mut self, request: Request) -> Result<u64, ClientError> {
        if !self.phase.is_connected() || self.transport.is_none() {
            return Err(ClientError::NotConnected);
        }

        let id = self.next_request_id;
        self.next_request_id += 1;

        let kind = request.kind();
        let encoded = request.encode(id);
        self.correlator.track(id, kind);

        let sent = match self.transport.as_mut() {
            Some(transport) => transport.send(WireMessage::Text(encoded)).await,
            None => Err(ClientError::NotConnected),
        };

        if let Err(e) = sent {
            self.correlator.abandon(id);
            self.fail_connection(e.to_string());
            return Err(e);
        }

        tracing::debug!(id, kind = %kind, "request sent");
        Ok(id)
    }

    // ── Navigation and fetch operations ──────────────────────────

    /// Re-request the daemon's watched roots.
    pub async fn list_roots(&mut self) -> Result<u64, ClientError> {
        self.send(Request::ListWatches).await
    }

    /// Select a root: fresh tree, top-level listing, history axis.
    pub async fn select_root(&mut self, root: &str) -> Result<(), ClientError> {
        self.session.select_root(root);
        self.tree.select_root(root);
        self.request_listing().await?;
        self.send(Request::DatabaseVersionHeaders {
            root: root.to_string(),
        })
        .await?;
        Ok(())
    }

    /// Descend into a folder of the current listing.
    pub async fn open_folder(&mut self, folder: &str) -> Result<u64, ClientError> {
        self.required_root()?;
        self.session.enter(folder);
        self.request_listing().await
    }

    /// Ascend one level.
    pub async fn go_up(&mut self) -> Result<u64, ClientError> {
        self.required_root()?;
        self.session.up();
        self.request_listing().await
    }

    /// Scope listings to a history date (`None` returns to live state)
    /// and refresh the current level.
    pub async fn select_date(&mut self, date: Option<String>) -> Result<u64, ClientError> {
        self.required_root()?;
        self.session.select_date(date);
        self.request_listing().await
    }

    /// Fetch a file of the current listing by its entry path.
    pub async fn fetch_file(&mut self, path: &str) -> Result<u64, ClientError> {
        let root = self.required_root()?;
        let full_path = format!("{}{}", self.session.prefix(), path);
        self.send(Request::File {
            root,
            selector: FileSelector::Path(full_path),
        })
        .await
    }

    /// Fetch a specific version of a file history.
    pub async fn fetch_file_version(
        &mut self,
        file_history_id: &str,
        version: u64,
    ) -> Result<u64, ClientError> {
        let root = self.required_root()?;
        self.send(Request::File {
            root,
            selector: FileSelector::Version {
                file_history_id: file_history_id.to_string(),
                version,
            },
        })
        .await
    }

    /// Fetch all versions of one file history.
    pub async fn fetch_file_history(
        &mut self,
        file_history_id: &str,
    ) -> Result<u64, ClientError> {
        let root = self.required_root()?;
        self.send(Request::FileHistory {
            root,
            file_history_id: file_history_id.to_string(),
        })
        .await
    }

    /// Fetch the selected root's sync-history timestamps.
    pub async fn fetch_version_headers(&mut self) -> Result<u64, ClientError> {
        let root = self.required_root()?;
        self.send(Request::DatabaseVersionHeaders { root }).await
    }

    /// Ask the daemon to restore a file version into the root.
    pub async fn restore_file(
        &mut self,
        file_history_id: &str,
        version: u64,
    ) -> Result<u64, ClientError> {
        let root = self.required_root()?;
        self.send(Request::Restore {
            root,
            file_history_id: file_history_id.to_string(),
            version,
        })
        .await
    }

    async fn request_listing(&mut self) -> Result<u64, ClientError> {
        let root = self.required_root()?;
        let prefix = self.session.prefix().to_string();
        let date = self.session.date().map(str::to_string);
        self.send(Request::FileTree { root, prefix, date }).await
    }

    fn required_root(&self) -> Result<String, ClientError> {
        self.session
            .root()
            .map(str::to_string)
            .ok_or(ClientError::NoRootSelected)
    }

    // ── Inbound pump ─────────────────────────────────────────────

    /// Receive and dispatch one inbound message.
    ///
    /// `Ok(true)`: a message was handled, keep pumping. `Ok(false)`: the
    /// channel ended cleanly (or there is no transport). `Err`: transport
    /// failure — the connection has been torn down and the error status
    /// emitted.
    pub async fn process_next(&mut self) -> Result<bool, ClientError> {
        let item = match self.transport.as_mut() {
            Some(transport) => transport.next().await,
            None => return Ok(false),
        };

        match item {
            Some(Ok(message)) => {
                self.dispatch(message);
                Ok(true)
            }
            Some(Err(e)) => {
                self.fail_connection(e.to_string());
                Err(e)
            }
            None => {
                self.teardown();
                self.emit_status(LinkStatus::Disconnected);
                Ok(false)
            }
        }
    }

    /// Pump inbound messages until the connection ends, sweeping expired
    /// requests at the configured cadence.
    pub async fn run(&mut self) -> Result<(), ClientError> {
        let sweep = self.config.timeout_sweep();
        while self.phase.is_connected() {
            match tokio::time::timeout(sweep, self.process_next()).await {
                Ok(Ok(true)) => self.sweep_timeouts(),
                Ok(Ok(false)) => break,
                Ok(Err(e)) => return Err(e),
                Err(_idle) => self.sweep_timeouts(),
            }
        }
        Ok(())
    }

    /// Report every request whose advisory deadline has passed.
    ///
    /// Timeouts never force a disconnect — that decision belongs to the
    /// caller.
    pub fn sweep_timeouts(&mut self) {
        for expired in self.correlator.drain_expired() {
            tracing::warn!(
                id = expired.id,
                kind = %expired.kind,
                elapsed = ?expired.elapsed(),
                "request timed out"
            );
            self.emit(ClientEvent::RequestTimedOut {
                id: expired.id,
                kind: expired.kind,
                elapsed: expired.elapsed(),
            });
        }
    }

    // ── Dispatch ─────────────────────────────────────────────────

    fn dispatch(&mut self, message: WireMessage) {
        match message {
            WireMessage::Binary(frame) => self.dispatch_frame(frame),
            WireMessage::Text(xml) => self.dispatch_text(&xml),
        }
    }

    fn dispatch_frame(&mut self, frame: Bytes) {
        match self.assembler.append_frame(frame) {
            Ok(Some(done)) => {
                tracing::debug!(name = %done.name, bytes = done.payload.len(), "transfer complete");
                self.emit(ClientEvent::TransferComplete(done));
            }
            Ok(None) => {}
            Err(_) => {
                tracing::warn!("binary frame with no transfer in progress; discarded");
            }
        }
    }

    fn dispatch_text(&mut self, xml: &str) {
        match wire::decode(xml) {
            Ok(response) => {
                if let Some(answered) = self.correlator.resolve(response.kind()) {
                    tracing::debug!(id = answered.id, kind = %response.kind(), "request answered");
                }
                self.apply(response);
            }
            Err(ClientError::ProtocolStatus { kind, code, body }) => {
                tracing::warn!(%kind, code, "protocol error response");
                self.emit(ClientEvent::ProtocolError { kind, code, body });
            }
            Err(ClientError::UnknownResponseKind(tag)) => {
                tracing::warn!(%tag, "unknown response kind; ignored");
            }
            Err(e) => {
                tracing::warn!(error = %e, "undecodable message; ignored");
            }
        }
    }

    fn apply(&mut self, response: Response) {
        match response {
            Response::ListWatches { watches } => {
                self.emit(ClientEvent::RootsListed(watches));
            }
            Response::FileTree { prefix, files, .. } => {
                self.session.set_prefix(&prefix);
                self.tree.apply_listing(&prefix, &files);
                self.emit(ClientEvent::DirectoryListed {
                    prefix,
                    entries: files,
                });
            }
            Response::File(announcement) => {
                self.emit(ClientEvent::TransferStarted(announcement.clone()));
                if let Some(done) = self.assembler.begin(announcement) {
                    self.emit(ClientEvent::TransferComplete(done));
                }
            }
            Response::FileHistory { files, .. } => {
                self.emit(ClientEvent::FileHistoryListed { versions: files });
            }
            Response::DatabaseVersionHeaders { dates, .. } => {
                self.emit(ClientEvent::VersionHeadersListed { dates });
            }
            Response::WatchEvent {
                action, subject, ..
            } => {
                self.emit(ClientEvent::SyncActivity { action, subject });
            }
            Response::Restore { target_file } => {
                self.emit(ClientEvent::FileRestored {
                    target: target_file,
                });
            }
        }
    }

    // ── Teardown ─────────────────────────────────────────────────

    fn fail_connection(&mut self, reason: String) {
        self.teardown();
        self.emit_status(LinkStatus::Errored { reason });
    }

    fn teardown(&mut self) {
        self.transport = None;
        self.correlator.clear();
        self.assembler.abort();
        self.phase.force_disconnect();
    }

    fn emit(&self, event: ClientEvent) {
        let _ = self.events.send(event);
    }

    fn emit_status(&self, status: LinkStatus) {
        tracing::info!(status = %status, "connection status");
        self.emit(ClientEvent::StatusChanged(status));
    }

    // ── Accessors ────────────────────────────────────────────────

    pub fn is_connected(&self) -> bool {
        self.phase.is_connected()
    }

    pub fn phase(&self) -> &LinkPhase {
        &self.phase
    }

    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    pub fn tree(&self) -> &FolderTree {
        &self.tree
    }

    /// Number of in-flight requests awaiting a response.
    pub fn pending_request_count(&self) -> usize {
        self.correlator.pending_count()
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::*;
    use crate::event::{EventReceiver, event_channel};

    /// Shared record of everything a scripted transport was asked to send.
    #[derive(Clone, Default)]
    struct SendLog(Arc<Mutex<Vec<WireMessage>>>);

    impl SendLog {
        fn texts(&self) -> Vec<String> {
            self.0
                .lock()
                .unwrap()
                .iter()
                .filter_map(|m| match m {
                    WireMessage::Text(t) => Some(t.clone()),
                    WireMessage::Binary(_) => None,
                })
                .collect()
        }
    }

    /// A transport that replays a scripted inbound sequence and records
    /// outbound messages.
    struct ScriptedTransport {
        inbound: VecDeque<Result<WireMessage, ClientError>>,
        log: SendLog,
        fail_sends: bool,
    }

    impl ScriptedTransport {
        fn new(log: SendLog) -> Self {
            Self {
                inbound: VecDeque::new(),
                log,
                fail_sends: false,
            }
        }

        fn push_text(&mut self, xml: &str) {
            self.inbound
                .push_back(Ok(WireMessage::Text(xml.to_string())));
        }

        fn push_binary(&mut self, bytes: &[u8]) {
            self.inbound
                .push_back(Ok(WireMessage::Binary(Bytes::copy_from_slice(bytes))));
        }

        fn push_error(&mut self, reason: &str) {
            self.inbound
                .push_back(Err(ClientError::Transport(reason.to_string())));
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn send(&mut self, message: WireMessage) -> Result<(), ClientError> {
            if self.fail_sends {
                return Err(ClientError::ChannelClosed);
            }
            self.log.0.lock().unwrap().push(message);
            Ok(())
        }

        async fn next(&mut self) -> Option<Result<WireMessage, ClientError>> {
            self.inbound.pop_front()
        }

        async fn close(&mut self) {}
    }

    fn new_client() -> (Client, EventReceiver) {
        let (tx, rx) = event_channel();
        let client = Client::new(ClientConfig::default(), tx);
        (client, rx)
    }

    fn drain(rx: &mut EventReceiver) -> Vec<ClientEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    async fn connected_client(transport: ScriptedTransport) -> (Client, EventReceiver) {
        let (mut client, mut rx) = new_client();
        client.connect_over(Box::new(transport)).await.unwrap();
        drain(&mut rx);
        (client, rx)
    }

    // ── send / lifecycle ─────────────────────────────────────────

    #[tokio::test]
    async fn send_outside_connected_fails_without_write() {
        let (mut client, _rx) = new_client();
        let err = client.send(Request::ListWatches).await.unwrap_err();
        assert!(matches!(err, ClientError::NotConnected));
        assert_eq!(client.pending_request_count(), 0);
    }

    #[tokio::test]
    async fn connect_emits_status_and_lists_roots() {
        let (mut client, mut rx) = new_client();
        let log = SendLog::default();
        let transport = ScriptedTransport::new(log.clone());

        client.connect_over(Box::new(transport)).await.unwrap();

        assert!(client.is_connected());
        let events = drain(&mut rx);
        assert_eq!(
            events[0],
            ClientEvent::StatusChanged(LinkStatus::Connecting)
        );
        assert_eq!(events[1], ClientEvent::StatusChanged(LinkStatus::Connected));

        let texts = log.texts();
        assert_eq!(texts.len(), 1);
        assert!(texts[0].starts_with("<listWatchesRequest>"));
        assert_eq!(client.pending_request_count(), 1);
    }

    #[tokio::test]
    async fn connect_fails_fast_when_already_connected() {
        let log = SendLog::default();
        let (mut client, _rx) = connected_client(ScriptedTransport::new(log.clone())).await;
        let err = client.connect().await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidTransition(_)));
        assert!(client.is_connected());
    }

    #[tokio::test]
    async fn roots_response_resolves_request_and_emits() {
        let log = SendLog::default();
        let mut transport = ScriptedTransport::new(log.clone());
        transport.push_text(
            "<listWatchesResponse><code>200</code><watches><watch>/a</watch><watch>/b</watch></watches></listWatchesResponse>",
        );
        let (mut client, mut rx) = connected_client(transport).await;

        assert!(client.process_next().await.unwrap());
        assert_eq!(client.pending_request_count(), 0);
        assert_eq!(
            drain(&mut rx),
            vec![ClientEvent::RootsListed(vec![
                "/a".to_string(),
                "/b".to_string()
            ])]
        );
    }

    #[tokio::test]
    async fn select_root_builds_tree_and_requests_listing_and_headers() {
        let log = SendLog::default();
        let (mut client, _rx) = connected_client(ScriptedTransport::new(log.clone())).await;

        client.select_root("/a").await.unwrap();

        assert_eq!(client.tree().len(), 1);
        assert_eq!(client.tree().root_path(), Some("/a"));
        assert_eq!(client.session().root(), Some("/a"));

        let texts = log.texts();
        // list-watches from connect, then listing + history axis.
        assert!(texts[1].starts_with("<getFileTreeRequest>"));
        assert!(texts[1].contains("<root>/a</root>"));
        assert!(texts[1].contains("<prefix></prefix>"));
        assert!(texts[2].starts_with("<getDatabaseVersionHeadersRequest>"));
    }

    #[tokio::test]
    async fn listing_response_updates_tree_session_and_emits() {
        let log = SendLog::default();
        let mut transport = ScriptedTransport::new(log.clone());
        transport.push_text(
            "<getFileTreeResponse><code>200</code><root>/a</root><prefix>docs/</prefix>\
             <files><file><path>notes</path><type>FOLDER</type></file>\
             <file><path>readme.txt</path><type>FILE</type></file></files>\
             </getFileTreeResponse>",
        );
        let (mut client, mut rx) = connected_client(transport).await;
        client.select_root("/a").await.unwrap();
        drain(&mut rx);

        client.process_next().await.unwrap();

        assert_eq!(client.session().prefix(), "docs/");
        assert!(client.tree().node("docs/notes").is_some());
        assert!(client.tree().node("docs/readme.txt").is_none());

        match drain(&mut rx).as_slice() {
            [ClientEvent::DirectoryListed { prefix, entries }] => {
                assert_eq!(prefix, "docs/");
                assert_eq!(entries.len(), 2);
            }
            other => panic!("wrong events: {other:?}"),
        }
    }

    #[tokio::test]
    async fn duplicate_listing_leaves_node_count_unchanged() {
        let listing = "<getFileTreeResponse><code>200</code><prefix>docs/</prefix>\
             <files><file><path>notes</path><type>FOLDER</type></file></files>\
             </getFileTreeResponse>";
        let log = SendLog::default();
        let mut transport = ScriptedTransport::new(log.clone());
        transport.push_text(listing);
        transport.push_text(listing);
        let (mut client, _rx) = connected_client(transport).await;
        client.select_root("/a").await.unwrap();

        client.process_next().await.unwrap();
        let count = client.tree().len();
        client.process_next().await.unwrap();
        assert_eq!(client.tree().len(), count);
    }

    #[tokio::test]
    async fn file_announcement_then_frames_complete() {
        let log = SendLog::default();
        let mut transport = ScriptedTransport::new(log.clone());
        transport.push_text(
            "<getFileResponse><code>200</code><name>a.txt</name><length>15</length>\
             <mimeType>text/plain</mimeType><frames>2</frames></getFileResponse>",
        );
        transport.push_binary(&[1u8; 10]);
        transport.push_binary(&[2u8; 5]);
        let (mut client, mut rx) = connected_client(transport).await;

        client.process_next().await.unwrap();
        client.process_next().await.unwrap();
        client.process_next().await.unwrap();

        let events = drain(&mut rx);
        match events.as_slice() {
            [
                ClientEvent::TransferStarted(announcement),
                ClientEvent::TransferComplete(done),
            ] => {
                assert_eq!(announcement.frames_expected, 2);
                assert_eq!(done.name, "a.txt");
                assert_eq!(done.mime_type, "text/plain");
                assert_eq!(done.payload.len(), 15);
            }
            other => panic!("wrong events: {other:?}"),
        }
    }

    #[tokio::test]
    async fn stray_frame_is_discarded_without_event() {
        let log = SendLog::default();
        let mut transport = ScriptedTransport::new(log.clone());
        transport.push_binary(b"stray");
        transport.push_text(
            "<listWatchesResponse><code>200</code><watches><watch>/a</watch></watches></listWatchesResponse>",
        );
        let (mut client, mut rx) = connected_client(transport).await;

        client.process_next().await.unwrap();
        assert!(drain(&mut rx).is_empty());

        // Connection is unaffected; the next message still dispatches.
        client.process_next().await.unwrap();
        assert_eq!(drain(&mut rx).len(), 1);
    }

    #[tokio::test]
    async fn non_success_code_mutates_nothing() {
        let log = SendLog::default();
        let mut transport = ScriptedTransport::new(log.clone());
        // Declared kind is a listing, but the code is a failure: the tree
        // must not change.
        transport.push_text(
            "<getFileTreeResponse><code>400</code><message>boom</message>\
             <prefix>docs/</prefix>\
             <files><file><path>notes</path><type>FOLDER</type></file></files>\
             </getFileTreeResponse>",
        );
        let (mut client, mut rx) = connected_client(transport).await;
        client.select_root("/a").await.unwrap();
        drain(&mut rx);
        let count = client.tree().len();

        client.process_next().await.unwrap();

        assert_eq!(client.tree().len(), count);
        assert_eq!(client.session().prefix(), "");
        match drain(&mut rx).as_slice() {
            [ClientEvent::ProtocolError { code, body, .. }] => {
                assert_eq!(*code, 400);
                assert_eq!(body, "boom");
            }
            other => panic!("wrong events: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_kind_keeps_connection_alive() {
        let log = SendLog::default();
        let mut transport = ScriptedTransport::new(log.clone());
        transport.push_text("<mysteryResponse><code>200</code></mysteryResponse>");
        transport.push_text(
            "<watchEventResponse><code>200</code><action>UPLOAD_START</action></watchEventResponse>",
        );
        let (mut client, mut rx) = connected_client(transport).await;

        client.process_next().await.unwrap();
        assert!(drain(&mut rx).is_empty());
        assert!(client.is_connected());

        client.process_next().await.unwrap();
        match drain(&mut rx).as_slice() {
            [ClientEvent::SyncActivity { action, .. }] => assert_eq!(action, "UPLOAD_START"),
            other => panic!("wrong events: {other:?}"),
        }
    }

    #[tokio::test]
    async fn watch_event_resolves_no_pending_request() {
        let log = SendLog::default();
        let mut transport = ScriptedTransport::new(log.clone());
        transport.push_text(
            "<watchEventResponse><code>200</code><action>INDEX_START</action></watchEventResponse>",
        );
        let (mut client, _rx) = connected_client(transport).await;
        let pending = client.pending_request_count();

        client.process_next().await.unwrap();
        assert_eq!(client.pending_request_count(), pending);
    }

    #[tokio::test]
    async fn transport_error_tears_down_with_errored_status() {
        let log = SendLog::default();
        let mut transport = ScriptedTransport::new(log.clone());
        transport.push_error("connection reset");
        let (mut client, mut rx) = connected_client(transport).await;

        let err = client.process_next().await.unwrap_err();
        assert!(matches!(err, ClientError::Transport(_)));
        assert!(!client.is_connected());
        assert_eq!(client.pending_request_count(), 0);
        match drain(&mut rx).as_slice() {
            [ClientEvent::StatusChanged(LinkStatus::Errored { reason })] => {
                assert!(reason.contains("connection reset"));
            }
            other => panic!("wrong events: {other:?}"),
        }
    }

    #[tokio::test]
    async fn clean_close_emits_disconnected() {
        let log = SendLog::default();
        let transport = ScriptedTransport::new(log.clone());
        let (mut client, mut rx) = connected_client(transport).await;

        // Script exhausted = remote closed the channel.
        assert!(!client.process_next().await.unwrap());
        assert!(!client.is_connected());
        assert_eq!(
            drain(&mut rx),
            vec![ClientEvent::StatusChanged(LinkStatus::Disconnected)]
        );
    }

    #[tokio::test]
    async fn disconnect_discards_pending_and_transfer() {
        let log = SendLog::default();
        let mut transport = ScriptedTransport::new(log.clone());
        transport.push_text(
            "<getFileResponse><code>200</code><name>a.bin</name><length>10</length>\
             <mimeType></mimeType><frames>2</frames></getFileResponse>",
        );
        let (mut client, mut rx) = connected_client(transport).await;
        client.process_next().await.unwrap();
        assert!(client.pending_request_count() > 0);
        drain(&mut rx);

        client.disconnect().await.unwrap();

        assert!(!client.is_connected());
        assert_eq!(client.pending_request_count(), 0);
        assert_eq!(
            drain(&mut rx),
            vec![ClientEvent::StatusChanged(LinkStatus::Disconnected)]
        );

        // No completion notification ever arrives for the aborted
        // transfer: reconnect-style send is also refused while down.
        assert!(matches!(
            client.send(Request::ListWatches).await,
            Err(ClientError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn disconnect_when_disconnected_is_invalid() {
        let (mut client, _rx) = new_client();
        assert!(matches!(
            client.disconnect().await,
            Err(ClientError::InvalidTransition(_))
        ));
    }

    #[tokio::test]
    async fn send_failure_rolls_back_tracking_and_fails_connection() {
        let log = SendLog::default();
        let (mut client, mut rx) = connected_client(ScriptedTransport::new(log.clone())).await;

        // Swap in a transport that refuses writes.
        let mut broken = ScriptedTransport::new(SendLog::default());
        broken.fail_sends = true;
        client.transport = Some(Box::new(broken));

        let err = client.list_roots().await.unwrap_err();
        assert!(matches!(err, ClientError::ChannelClosed));
        assert!(!client.is_connected());
        assert_eq!(client.pending_request_count(), 0);
        assert!(matches!(
            drain(&mut rx).as_slice(),
            [ClientEvent::StatusChanged(LinkStatus::Errored { .. })]
        ));
    }

    #[tokio::test]
    async fn expired_request_is_reported_once() {
        let log = SendLog::default();
        let (mut client, mut rx) = connected_client(ScriptedTransport::new(log.clone())).await;
        client.correlator.set_default_deadline(std::time::Duration::ZERO);
        client.session.select_root("/a");
        client.fetch_version_headers().await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;

        client.sweep_timeouts();
        let first: Vec<_> = drain(&mut rx)
            .into_iter()
            .filter(|e| matches!(e, ClientEvent::RequestTimedOut { .. }))
            .collect();
        assert_eq!(first.len(), 1);

        client.sweep_timeouts();
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn operations_without_root_fail() {
        let log = SendLog::default();
        let (mut client, _rx) = connected_client(ScriptedTransport::new(log.clone())).await;
        assert!(matches!(
            client.open_folder("docs").await,
            Err(ClientError::NoRootSelected)
        ));
        assert!(matches!(
            client.fetch_file("a.txt").await,
            Err(ClientError::NoRootSelected)
        ));
    }

    #[tokio::test]
    async fn fetch_file_prepends_prefix() {
        let log = SendLog::default();
        let mut transport = ScriptedTransport::new(log.clone());
        transport.push_text(
            "<getFileTreeResponse><code>200</code><prefix>docs/</prefix><files></files></getFileTreeResponse>",
        );
        let (mut client, _rx) = connected_client(transport).await;
        client.select_root("/a").await.unwrap();
        client.process_next().await.unwrap();

        client.fetch_file("readme.txt").await.unwrap();
        let texts = log.texts();
        let last = texts.last().unwrap();
        assert!(last.contains("<file>docs/readme.txt</file>"));
    }

}
