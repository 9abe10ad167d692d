//! services/api/src/web/ticker.rs
//!
//! The background task that drives the live countdown. It also closes a
//! session whose time has run out, but it is advisory: check-ins perform
//! their own expiry check and never depend on this task having run.

use crate::web::{protocol::ServerMessage, state::AppState};
use std::sync::Arc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Runs until `cancellation_token` is cancelled.
pub async fn session_ticker(app_state: Arc<AppState>, cancellation_token: CancellationToken) {
    info!(
        "Session ticker started ({} ms interval).",
        app_state.config.tick_interval.as_millis()
    );
    let mut interval = tokio::time::interval(app_state.config.tick_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancellation_token.cancelled() => {
                info!("Session ticker cancelled.");
                return;
            }
            _ = interval.tick() => tick(&app_state).await,
        }
    }
}

/// One pass: expire the session if due, otherwise broadcast the time left.
pub async fn tick(app_state: &AppState) {
    let now = app_state.clock.now();
    let (expired, remaining, class_id) = {
        let mut manager = app_state.attendance.lock().await;
        let expired = manager.expire_if_due(now);
        let class_id = manager.active_session().map(|s| s.class_id.clone());
        (expired, manager.remaining(now), class_id)
    };

    if let Some(session) = expired {
        info!("Session {} reached its end time.", session.id);
        app_state.announce_session_end(&session).await;
        return;
    }

    if let (Some(remaining), Some(class_id)) = (remaining, class_id) {
        if let Ok(class) = app_state.classes.get_class(&class_id).await {
            app_state.publish(
                &class.teacher_id,
                ServerMessage::Countdown {
                    remaining_seconds: remaining.num_seconds(),
                },
            );
        }
    }
}
