//! Event loop that drives a [`DashboardSession`].
//!
//! Everything runs on one task: the pending handshake, inbound frames, the
//! reconnect deadline, the alert deadline, user commands and shutdown are
//! multiplexed with `tokio::select!`, so session state is never touched
//! concurrently.

use anyhow::Result;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, sleep_until};
use tracing::{debug, info, warn};

use crate::feed::{DEFAULT_RECONNECT_DELAY, Effect, FeedConnector, FeedLink, LinkEvent};
use crate::session::{DashboardSession, SessionCommand};

type PendingConnect = Pin<Box<dyn Future<Output = Result<Box<dyn FeedLink>>> + Send>>;

/// Runs the session until `shutdown` flips to `true` (or its sender is
/// dropped), then closes the feed and returns the session.
pub async fn run_session(
    mut session: DashboardSession,
    connector: Arc<dyn FeedConnector>,
    mut commands: mpsc::Receiver<SessionCommand>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<DashboardSession> {
    let mut link: Option<Box<dyn FeedLink>> = None;
    let mut connecting: Option<PendingConnect> = None;
    let mut reconnect_at: Option<Instant> = None;
    let mut commands_open = true;

    let mut effects: VecDeque<Effect> = session.feed.connect().into();
    session.render();

    loop {
        while let Some(effect) = effects.pop_front() {
            let Some(effect) = session.apply_local_effect(effect) else {
                continue;
            };
            match effect {
                Effect::Open(url) => {
                    let connector = connector.clone();
                    connecting = Some(Box::pin(async move { connector.connect(&url).await }));
                }
                Effect::SendProbe(text) => {
                    if let Some(l) = link.as_mut() {
                        if let Err(e) = l.send_text(text).await {
                            effects.extend(session.feed.on_error(&e.to_string()));
                        }
                    }
                }
                Effect::CloseTransport => {
                    connecting = None;
                    if let Some(mut l) = link.take() {
                        l.close().await;
                    }
                    effects.extend(session.feed.on_close());
                }
                Effect::ScheduleReconnect(delay) => {
                    if reconnect_at.is_none() {
                        session.note_reconnect_scheduled();
                        reconnect_at = Some(deadline_after(Instant::now(), delay));
                    }
                }
                Effect::Deliver(_) => {}
            }
        }

        let alert_deadline = session.alert_signal().deadline();

        tokio::select! {
            result = wait_connect(&mut connecting) => {
                connecting = None;
                match result {
                    Ok(opened) => {
                        link = Some(opened);
                        effects.extend(session.feed.on_open());
                        session.on_connection_opened();
                    }
                    Err(e) => {
                        effects.extend(session.feed.on_error(&format!("{e:#}")));
                    }
                }
            }
            event = next_link_event(&mut link) => {
                match event {
                    LinkEvent::Frame(text) => {
                        session.note_frame();
                        effects.extend(session.feed.on_frame(&text));
                    }
                    LinkEvent::Closed(reason) => {
                        debug!(reason = reason.as_deref().unwrap_or(""), "Feed socket closed");
                        link = None;
                        effects.extend(session.feed.on_close());
                    }
                    LinkEvent::Error(reason) => {
                        effects.extend(session.feed.on_error(&reason));
                    }
                }
            }
            () = sleep_until_opt(reconnect_at) => {
                reconnect_at = None;
                effects.extend(session.feed.on_reconnect_due());
            }
            () = sleep_until_opt(alert_deadline) => {
                session.on_alert_deadline(Instant::now());
            }
            command = commands.recv(), if commands_open => {
                match command {
                    Some(command) => session.handle_command(command),
                    None => {
                        debug!("Command channel closed");
                        commands_open = false;
                    }
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!("Shutting down feed session");
                    break;
                }
            }
        }
    }

    if let Some(mut l) = link.take() {
        l.close().await;
    }

    let stats = session.stats();
    if stats.frames_received == 0 {
        warn!("Session ended without receiving any frames");
    }
    info!(
        frames = stats.frames_received,
        state_frames = stats.state_frames,
        accepted = stats.readings_accepted,
        discarded = stats.readings_discarded,
        decode_failures = stats.decode_failures,
        reconnects = stats.reconnects_scheduled,
        sink_failures = stats.sink_failures,
        "Session summary"
    );

    Ok(session)
}

async fn wait_connect(connecting: &mut Option<PendingConnect>) -> Result<Box<dyn FeedLink>> {
    match connecting {
        Some(fut) => fut.await,
        None => std::future::pending().await,
    }
}

async fn next_link_event(link: &mut Option<Box<dyn FeedLink>>) -> LinkEvent {
    match link {
        Some(l) => l.next_event().await,
        None => std::future::pending().await,
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}

/// Reconnect deadline `delay` after `now`, or after the default delay when
/// `delay` does not fit on the clock.
fn deadline_after(now: Instant, delay: Duration) -> Instant {
    now.checked_add(delay)
        .unwrap_or_else(|| now + DEFAULT_RECONNECT_DELAY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deadline_after() {
        let now = Instant::now();
        assert_eq!(deadline_after(now, Duration::from_millis(500)), now + Duration::from_millis(500));
        assert_eq!(deadline_after(now, Duration::MAX), now + DEFAULT_RECONNECT_DELAY);
    }
}
