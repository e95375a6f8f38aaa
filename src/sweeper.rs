//! Background eviction of idle client records.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::limiter::AdmissionControl;

/// Spawn the periodic sweep task.
///
/// Each tick removes records idle past `idle_threshold`; blacklisted clients
/// are skipped so an eviction can never shorten a cooldown. The task runs for
/// the life of the process.
pub fn spawn(control: Arc<AdmissionControl>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            match control.sweep_idle() {
                Ok(removed) if removed > 0 => {
                    tracing::debug!(
                        target: "turnstile::sweeper",
                        removed,
                        tracked = control.tracked_clients(),
                        "swept idle client records"
                    );
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(target: "turnstile::sweeper", error = %err, "sweep failed");
                }
            }
        }
    })
}
