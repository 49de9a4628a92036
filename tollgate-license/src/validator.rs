//! Background revalidation.

use crate::engine::LicenseEngine;
use crate::error::{LicenseError, LicenseResult};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Re-runs startup validation on a fixed period.
pub struct BackgroundValidator;

impl BackgroundValidator {
    /// Spawns the validator on the current runtime.
    ///
    /// The first tick fires one `period` after spawning, since the host has
    /// just run startup validation. Dropping the handle stops the task.
    /// A zero `period` is rejected.
    pub fn spawn(engine: LicenseEngine, period: Duration) -> LicenseResult<ValidatorHandle> {
        if period.is_zero() {
            return Err(LicenseError::Config(
                "background validation period must be non-zero".to_string(),
            ));
        }

        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(period_secs = period.as_secs(), "background validator started");

            loop {
                tokio::select! {
                    biased;

                    _ = &mut shutdown_rx => {
                        break;
                    }

                    _ = ticker.tick() => {
                        // A tick runs to completion once started; shutdown is
                        // only observed between ticks.
                        let outcome = engine.validate_background().await;
                        if outcome.is_blocked() {
                            warn!(reason = %outcome.reason_code, "background validation blocked license");
                        } else {
                            debug!(decision = %outcome.decision, "background validation complete");
                        }
                    }
                }
            }

            info!("background validator stopped");
        });

        Ok(ValidatorHandle {
            shutdown: Some(shutdown_tx),
            task,
        })
    }
}

/// Handle to a running background validator.
pub struct ValidatorHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ValidatorHandle {
    /// Stops the validator, waiting for an in-flight tick to finish.
    pub async fn shutdown(mut self) -> LicenseResult<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.task
            .await
            .map_err(|e| LicenseError::Task(format!("background validator: {e}")))
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
