//! Session observer tasks
//!
//! - Position observer: level-triggered, one `PositionTick` per interval
//! - Rate observer: edge-triggered `PlayingChanged` on observed transitions,
//!   plus one `TrackEnded` per natural completion
//!
//! Both only send on the unbounded telemetry channel, so they never block the
//! session teardown that aborts them.

use super::session::{lock_player, SharedPlayer};
use crate::media::PlayerStatus;
use crate::playback::events::EngineEvent;
use loopwise_common::time::sanitize_seconds;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, trace};

pub(super) fn spawn_position_observer(
    generation: u64,
    player: SharedPlayer,
    period: Duration,
    tx: mpsc::UnboundedSender<EngineEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            let raw = lock_player(&player).current_time();
            let Some(position) = sanitize_seconds(raw) else {
                trace!("Discarding unusable position sample {}", raw);
                continue;
            };

            if tx.send(EngineEvent::PositionTick { generation, position }).is_err() {
                debug!("Telemetry receiver dropped, position observer stopping");
                break;
            }
        }
    })
}

pub(super) fn spawn_rate_observer(
    generation: u64,
    mut status_rx: watch::Receiver<PlayerStatus>,
    tx: mpsc::UnboundedSender<EngineEvent>,
) -> JoinHandle<()> {
    // Baseline taken before spawning so a change racing the first poll is
    // still seen as a transition
    let initial = *status_rx.borrow_and_update();

    tokio::spawn(async move {
        let mut playing = initial.is_playing();
        let mut completions = initial.completions;

        while status_rx.changed().await.is_ok() {
            let status = *status_rx.borrow_and_update();

            if status.is_playing() != playing {
                playing = status.is_playing();
                if tx.send(EngineEvent::PlayingChanged { generation, playing }).is_err() {
                    break;
                }
            }

            while completions < status.completions {
                completions += 1;
                if tx.send(EngineEvent::TrackEnded { generation }).is_err() {
                    return;
                }
            }
        }

        debug!("Player status feed closed, rate observer stopping");
    })
}
