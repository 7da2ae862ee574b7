use crate::config::Config;
use crate::connection::{ConnectionHandle, ConnectionManager, WsConnector};
use crate::events::{AppEvent, ConnectionEvent};
use crate::tui::{self, Tui};
use crate::ui::conversation::{ConversationView, ViewAction};
use anyhow::Result;
use crossterm::event::EventStream;
use futures::StreamExt;
use log::info;
use std::time::Duration;
use tokio::sync::mpsc;

/// Run the chat window against `endpoint` until the user quits
pub async fn run(config: Config, endpoint: String) -> Result<()> {
    let (events_tx, mut events_rx) = mpsc::unbounded_channel();
    let mut connection =
        ConnectionManager::new(endpoint, config.reconnect, WsConnector, events_tx);
    let mut view = ConversationView::new(
        &config,
        connection.url(),
        connection.handle(),
        connection.status(),
    );

    connection.connect();

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let tick_rate = Duration::from_millis(config.ui.tick_rate_ms.max(16));
    let result = event_loop(&mut terminal, &mut view, &mut events_rx, tick_rate).await;
    tui::restore()?;

    connection.shutdown().await;
    info!("[app] exited");
    result
}

async fn event_loop(
    terminal: &mut Tui,
    view: &mut ConversationView<ConnectionHandle>,
    events_rx: &mut mpsc::UnboundedReceiver<ConnectionEvent>,
    tick_rate: Duration,
) -> Result<()> {
    let mut input = EventStream::new();
    let mut ticker = tokio::time::interval(tick_rate);

    loop {
        terminal.draw(|frame| view.render(frame.size(), frame.buffer_mut()))?;

        let event = tokio::select! {
            Some(terminal_event) = input.next() => {
                match tui::translate(terminal_event?) {
                    Some(event) => AppEvent::Tui(event),
                    None => continue,
                }
            }
            Some(connection_event) = events_rx.recv() => AppEvent::Connection(connection_event),
            _ = ticker.tick() => AppEvent::Tick,
        };

        if view.handle_event(event) == ViewAction::Exit {
            return Ok(());
        }
    }
}
