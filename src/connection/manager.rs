use super::backoff::{RetryDecision, RetryTracker};
use super::transport::{Connector, Frame, Link};
use super::wire;
use crate::config::ReconnectConfig;
use crate::error::{ConnectionError, ConnectionResult};
use crate::events::{ConnectionEvent, ConnectionState, Message};
use crate::store::Outbound;
use log::{debug, error, info, warn};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Snapshot of the lifecycle published to handles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    pub retries: u32,
}

#[derive(Debug)]
enum Command {
    Send(Message),
}

/// Cheap, cloneable handle used by the UI to talk to the driver
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<ConnectionStatus>,
}

impl ConnectionHandle {
    pub fn status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    /// Transmit a message if the connection is online. Nothing is queued
    /// otherwise: the message is dropped and `NotOnline` returned.
    pub fn send(&self, message: &Message) -> ConnectionResult<()> {
        let status = self.status();
        if status.state != ConnectionState::Online {
            warn!(
                "[connection] dropping outbound message, connection is {}",
                status.state
            );
            return Err(ConnectionError::NotOnline(status.state));
        }

        self.commands
            .send(Command::Send(message.clone()))
            .map_err(|_| ConnectionError::DriverStopped)
    }
}

impl Outbound for ConnectionHandle {
    fn send(&self, message: &Message) -> ConnectionResult<()> {
        ConnectionHandle::send(self, message)
    }
}

/// Everything the driver needs, held until `connect` is called
struct Startup<C> {
    connector: C,
    commands: mpsc::UnboundedReceiver<Command>,
    status: watch::Sender<ConnectionStatus>,
    events: mpsc::UnboundedSender<ConnectionEvent>,
}

/// Owns the lifecycle of one outbound persistent connection.
///
/// The socket itself lives inside a spawned driver task; the manager keeps the
/// cancellation token and join handle so teardown always releases it.
pub struct ConnectionManager<C: Connector> {
    url: String,
    policy: ReconnectConfig,
    startup: Option<Startup<C>>,
    handle: ConnectionHandle,
    cancel: CancellationToken,
    driver: Option<JoinHandle<()>>,
}

impl<C: Connector> ConnectionManager<C> {
    pub fn new(
        url: impl Into<String>,
        policy: ReconnectConfig,
        connector: C,
        events: mpsc::UnboundedSender<ConnectionEvent>,
    ) -> Self {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(ConnectionStatus {
            state: ConnectionState::Offline,
            retries: 0,
        });

        Self {
            url: url.into(),
            policy,
            startup: Some(Startup {
                connector,
                commands: command_rx,
                status: status_tx,
                events,
            }),
            handle: ConnectionHandle {
                commands: command_tx,
                status: status_rx,
            },
            cancel: CancellationToken::new(),
            driver: None,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn handle(&self) -> ConnectionHandle {
        self.handle.clone()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.handle.status()
    }

    /// Start the connection driver. Calling this again is a no-op.
    pub fn connect(&mut self) {
        let Some(startup) = self.startup.take() else {
            debug!("[connection] connect() called while already started");
            return;
        };

        info!("[connection] connecting to {}", self.url);
        let driver = Driver {
            url: self.url.clone(),
            tracker: RetryTracker::new(self.policy),
            connector: startup.connector,
            commands: startup.commands,
            status: startup.status,
            events: startup.events,
            cancel: self.cancel.clone(),
        };
        self.driver = Some(tokio::spawn(driver.run()));
    }

    /// Close the active connection and stop all future reconnects
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(driver) = self.driver.take() {
            if let Err(e) = driver.await {
                error!("[connection] driver task failed: {}", e);
            }
        }
        info!("[connection] shut down");
    }
}

impl<C: Connector> Drop for ConnectionManager<C> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[derive(Debug, PartialEq, Eq)]
enum SessionEnd {
    Shutdown,
    Lost,
}

struct Driver<C: Connector> {
    url: String,
    tracker: RetryTracker,
    connector: C,
    commands: mpsc::UnboundedReceiver<Command>,
    status: watch::Sender<ConnectionStatus>,
    events: mpsc::UnboundedSender<ConnectionEvent>,
    cancel: CancellationToken,
}

impl<C: Connector> Driver<C> {
    async fn run(mut self) {
        loop {
            self.publish(ConnectionState::Connecting);

            let attempt = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return,
                attempt = self.connector.connect(&self.url) => attempt,
            };

            match attempt {
                Ok(link) => {
                    self.tracker.on_connected();
                    self.publish(ConnectionState::Online);
                    info!("[connection] online at {}", self.url);

                    if self.run_session(link).await == SessionEnd::Shutdown {
                        return;
                    }
                }
                Err(e) => warn!("[connection] {}", e),
            }

            if self.cancel.is_cancelled() {
                return;
            }
            self.publish(ConnectionState::Offline);
            self.drop_stale_commands();

            match self.tracker.on_failure() {
                RetryDecision::RetryAfter(delay) => {
                    debug!(
                        "[connection] retry {} in {:?}",
                        self.tracker.retries(),
                        delay
                    );
                    tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => return,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                RetryDecision::GiveUp => {
                    warn!("[connection] max retries reached, connection closed permanently");
                    self.publish(ConnectionState::PermanentlyClosed);
                    return;
                }
            }
        }
    }

    async fn run_session(&mut self, mut link: C::Link) -> SessionEnd {
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    link.close().await;
                    return SessionEnd::Shutdown;
                }
                command = self.commands.recv() => match command {
                    Some(Command::Send(message)) => {
                        if let Err(e) = Self::transmit(&mut link, &message).await {
                            warn!("[connection] send failed: {}", e);
                            return SessionEnd::Lost;
                        }
                    }
                    None => {
                        link.close().await;
                        return SessionEnd::Shutdown;
                    }
                },
                frame = link.next_frame() => match frame {
                    Some(Ok(Frame::Text(text))) => self.deliver(&text),
                    Some(Ok(Frame::Binary(len))) => {
                        warn!("[connection] discarding {}-byte binary frame", len);
                    }
                    Some(Ok(Frame::Close)) | None => {
                        info!("[connection] closed by remote");
                        return SessionEnd::Lost;
                    }
                    Some(Err(e)) => {
                        warn!("[connection] {}", e);
                        return SessionEnd::Lost;
                    }
                },
            }
        }
    }

    async fn transmit(link: &mut C::Link, message: &Message) -> ConnectionResult<()> {
        let payload = wire::encode_outbound(message)?;
        debug!("[connection] -> {}", payload);
        link.send_text(payload).await
    }

    fn deliver(&self, text: &str) {
        match wire::decode_inbound(text) {
            Ok(message) => {
                debug!("[connection] <- {} chars", message.content.len());
                let _ = self.events.send(ConnectionEvent::Reply(message));
            }
            Err(e) => warn!("[connection] discarding malformed payload: {}", e),
        }
    }

    /// Sends accepted while online but not yet written belong to a link that
    /// no longer exists.
    fn drop_stale_commands(&mut self) {
        while let Ok(Command::Send(_)) = self.commands.try_recv() {
            warn!("[connection] dropping message queued for a closed link");
        }
    }

    fn publish(&self, state: ConnectionState) {
        let retries = self.tracker.retries();
        self.status.send_replace(ConnectionStatus { state, retries });
        let _ = self
            .events
            .send(ConnectionEvent::StateChanged { state, retries });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Role;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::time::Instant;

    struct FakeLink {
        inbound: mpsc::UnboundedReceiver<Frame>,
        outbound: mpsc::UnboundedSender<String>,
        closed: Arc<AtomicBool>,
    }

    /// Server side of a `FakeLink`
    struct FakeServer {
        frames: mpsc::UnboundedSender<Frame>,
        received: mpsc::UnboundedReceiver<String>,
        closed: Arc<AtomicBool>,
    }

    fn fake_pair() -> (FakeLink, FakeServer) {
        let (frame_tx, frame_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));
        (
            FakeLink {
                inbound: frame_rx,
                outbound: out_tx,
                closed: closed.clone(),
            },
            FakeServer {
                frames: frame_tx,
                received: out_rx,
                closed,
            },
        )
    }

    impl Link for FakeLink {
        async fn send_text(&mut self, text: String) -> ConnectionResult<()> {
            self.outbound
                .send(text)
                .map_err(|e| ConnectionError::Transport(e.to_string()))
        }

        async fn next_frame(&mut self) -> Option<ConnectionResult<Frame>> {
            self.inbound.recv().await.map(Ok)
        }

        async fn close(&mut self) {
            self.closed.store(true, Ordering::SeqCst);
        }
    }

    /// Hands out scripted links in order, refusing once the script runs out
    #[derive(Clone, Default)]
    struct ScriptedConnector {
        script: Arc<Mutex<VecDeque<Option<FakeLink>>>>,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedConnector {
        fn refuse(&self, times: usize) {
            let mut script = self.script.lock().unwrap();
            for _ in 0..times {
                script.push_back(None);
            }
        }

        fn accept(&self) -> FakeServer {
            let (link, server) = fake_pair();
            self.script.lock().unwrap().push_back(Some(link));
            server
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Connector for ScriptedConnector {
        type Link = FakeLink;

        async fn connect(&self, url: &str) -> ConnectionResult<FakeLink> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.script.lock().unwrap().pop_front().flatten();
            next.ok_or_else(|| ConnectionError::Handshake {
                url: url.to_string(),
                reason: "refused".to_string(),
            })
        }
    }

    fn manager(
        connector: ScriptedConnector,
    ) -> (
        ConnectionManager<ScriptedConnector>,
        mpsc::UnboundedReceiver<ConnectionEvent>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let manager =
            ConnectionManager::new("ws://test.invalid/", ReconnectConfig::default(), connector, tx);
        (manager, rx)
    }

    async fn states_until(
        rx: &mut mpsc::UnboundedReceiver<ConnectionEvent>,
        target: ConnectionState,
    ) -> Vec<(ConnectionState, u32)> {
        let mut seen = Vec::new();
        while let Some(event) = rx.recv().await {
            if let ConnectionEvent::StateChanged { state, retries } = event {
                seen.push((state, retries));
                if state == target {
                    break;
                }
            }
        }
        seen
    }

    async fn next_reply(rx: &mut mpsc::UnboundedReceiver<ConnectionEvent>) -> Message {
        loop {
            match rx.recv().await {
                Some(ConnectionEvent::Reply(message)) => return message,
                Some(_) => continue,
                None => panic!("event channel closed before a reply arrived"),
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn successful_connect_is_online_with_zero_retries() {
        let connector = ScriptedConnector::default();
        let _server = connector.accept();
        let (mut manager, mut rx) = manager(connector);

        manager.connect();
        let states = states_until(&mut rx, ConnectionState::Online).await;

        assert_eq!(
            states,
            vec![
                (ConnectionState::Connecting, 0),
                (ConnectionState::Online, 0),
            ]
        );
        assert_eq!(
            manager.status(),
            ConnectionStatus {
                state: ConnectionState::Online,
                retries: 0
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn connect_is_idempotent() {
        let connector = ScriptedConnector::default();
        let _server = connector.accept();
        let (mut manager, mut rx) = manager(connector.clone());

        manager.connect();
        manager.connect();
        states_until(&mut rx, ConnectionState::Online).await;

        assert_eq!(connector.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn ten_reconnects_are_attempted_before_giving_up() {
        let connector = ScriptedConnector::default();
        connector.refuse(10);
        let _server = connector.accept();
        let (mut manager, mut rx) = manager(connector.clone());

        let started = Instant::now();
        manager.connect();
        let states = states_until(&mut rx, ConnectionState::Online).await;

        let cycles = states
            .windows(2)
            .filter(|pair| {
                pair[0].0 == ConnectionState::Offline && pair[1].0 == ConnectionState::Connecting
            })
            .count();
        assert_eq!(cycles, 10);
        assert!(!states
            .iter()
            .any(|(state, _)| *state == ConnectionState::PermanentlyClosed));
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(10_000) && elapsed < Duration::from_millis(10_100));
        assert_eq!(connector.calls(), 11);
        assert_eq!(manager.status().retries, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_reconnects_close_permanently() {
        let connector = ScriptedConnector::default();
        connector.refuse(11);
        let (mut manager, mut rx) = manager(connector.clone());

        manager.connect();
        let states = states_until(&mut rx, ConnectionState::PermanentlyClosed).await;
        assert_eq!(states.last(), Some(&(ConnectionState::PermanentlyClosed, 10)));
        assert_eq!(connector.calls(), 11);

        // Driver has exited: no timer, no more events.
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(rx.recv().await.is_none());
        assert_eq!(connector.calls(), 11);
        assert_eq!(manager.status().state, ConnectionState::PermanentlyClosed);
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_cancels_pending_reconnect() {
        let connector = ScriptedConnector::default();
        connector.refuse(1);
        let (mut manager, mut rx) = manager(connector.clone());

        manager.connect();
        states_until(&mut rx, ConnectionState::Offline).await;

        manager.shutdown().await;
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert!(rx.recv().await.is_none());
        assert_eq!(connector.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_closes_active_link() {
        let connector = ScriptedConnector::default();
        let server = connector.accept();
        let (mut manager, mut rx) = manager(connector);

        manager.connect();
        states_until(&mut rx, ConnectionState::Online).await;
        manager.shutdown().await;

        assert!(server.closed.load(Ordering::SeqCst));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn sends_serialized_message_and_surfaces_replies() {
        let connector = ScriptedConnector::default();
        let mut server = connector.accept();
        let (mut manager, mut rx) = manager(connector);
        let handle = manager.handle();

        manager.connect();
        states_until(&mut rx, ConnectionState::Online).await;

        handle.send(&Message::user("Hello")).unwrap();
        assert_eq!(
            server.received.recv().await.as_deref(),
            Some(r#"{"role":"user","content":"Hello"}"#)
        );

        server
            .frames
            .send(Frame::Text("{not json".to_string()))
            .unwrap();
        server.frames.send(Frame::Binary(4)).unwrap();
        server
            .frames
            .send(Frame::Text(r#"{"message":"Hi there"}"#.to_string()))
            .unwrap();

        let reply = next_reply(&mut rx).await;
        assert_eq!(reply.role, Role::Assistant);
        assert_eq!(reply.content, "Hi there");
        assert_eq!(manager.status().state, ConnectionState::Online);
    }

    #[tokio::test(start_paused = true)]
    async fn send_while_not_online_is_dropped() {
        let connector = ScriptedConnector::default();
        let (manager, _rx) = manager(connector);
        let handle = manager.handle();

        let err = handle.send(&Message::user("Hello")).unwrap_err();
        assert!(matches!(
            err,
            ConnectionError::NotOnline(ConnectionState::Offline)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn remote_close_reconnects_and_resets_counter() {
        let connector = ScriptedConnector::default();
        let server = connector.accept();
        let _second = connector.accept();
        let (mut manager, mut rx) = manager(connector.clone());

        manager.connect();
        states_until(&mut rx, ConnectionState::Online).await;
        server.frames.send(Frame::Close).unwrap();

        let states = states_until(&mut rx, ConnectionState::Online).await;
        assert_eq!(
            states,
            vec![
                (ConnectionState::Offline, 0),
                (ConnectionState::Connecting, 1),
                (ConnectionState::Online, 0),
            ]
        );
        assert_eq!(connector.calls(), 2);
    }
}
