//! Periodic background tasks.
//!
//! Both sweeps are idempotent against the store's conditional updates, so
//! they are safe to run alongside live traffic and alongside a second
//! instance of themselves.

use std::time::Duration;

use chrono::Utc;
use tokio::time::MissedTickBehavior;

use crate::config::Config;
use crate::handlers::AppState;

pub fn spawn_background_jobs(state: &AppState, config: &Config) {
    spawn_expiry_sweep(state, config.expiry_sweep_interval_secs);
    spawn_payout_sweep(state, config.payout_sweep_interval_secs);
}

/// Gives inventory back from reservations that never saw a payment outcome.
fn spawn_expiry_sweep(state: &AppState, interval_secs: u64) {
    let reservations = state.reservations.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match reservations.release_expired(Utc::now()).await {
                Ok(0) => {}
                Ok(count) => {
                    tracing::info!(count, "Expiry sweep released stale reservations");
                }
                Err(e) => tracing::error!(error = ?e, "Expiry sweep failed"),
            }
        }
    });
}

/// Releases organizer payouts whose hold window has elapsed.
fn spawn_payout_sweep(state: &AppState, interval_secs: u64) {
    let payouts = state.payouts.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match payouts.sweep(Utc::now()).await {
                Ok(released) if released.is_empty() => {}
                Ok(released) => {
                    tracing::info!(count = released.len(), "Payout sweep released held funds");
                }
                Err(e) => tracing::error!(error = ?e, "Payout sweep failed"),
            }
        }
    });
}
