//! Latest-value position feed.
//!
//! Fixes are never queued: subscribers always see the most recent one and
//! intermediate fixes published while a handler is busy are skipped.

use std::future::Future;

use moped_nav_routing::Coordinate;
use serde::{Deserialize, Serialize};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{NavigationError, Result};

/// Used when the sensor is denied or unavailable before any fix (Brussels)
pub const DEFAULT_POSITION: Coordinate = Coordinate::new(50.8466, 4.3528);

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PositionFix {
    pub coordinate: Coordinate,
    /// Ground speed, when the sensor reports one
    pub speed_mps: Option<f64>,
}

impl PositionFix {
    pub fn new(coordinate: Coordinate, speed_mps: Option<f64>) -> Self {
        Self { coordinate, speed_mps }
    }

    pub fn at(coordinate: Coordinate) -> Self {
        Self::new(coordinate, None)
    }

    /// Speed in whole km/h
    pub fn speed_kph(&self) -> Option<u32> {
        self.speed_mps
            .filter(|s| s.is_finite())
            .map(|s| (s.max(0.0) * 3.6).round() as u32)
    }
}

pub struct SensorFeed {
    tx: watch::Sender<Option<PositionFix>>,
}

impl Default for SensorFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorFeed {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    pub fn publish(&self, fix: PositionFix) {
        self.tx.send_replace(Some(fix));
    }

    /// The sensor was denied or failed. Falls back to [`DEFAULT_POSITION`]
    /// unless a real fix was seen earlier, and returns the fix now in effect.
    pub fn report_unavailable(&self) -> PositionFix {
        warn!("position sensor unavailable");

        self.tx.send_if_modified(|current| match current {
            Some(_) => false,
            None => {
                *current = Some(PositionFix::at(DEFAULT_POSITION));
                true
            }
        });

        (*self.tx.borrow()).unwrap_or(PositionFix::at(DEFAULT_POSITION))
    }

    pub fn latest(&self) -> Result<PositionFix> {
        (*self.tx.borrow()).ok_or(NavigationError::SensorUnavailable)
    }

    /// Run `on_fix` for every new fix on a tokio task, starting with the
    /// current one if any. Must be called inside a runtime.
    pub fn subscribe<F, Fut>(&self, mut on_fix: F) -> Subscription
    where
        F: FnMut(PositionFix) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut rx = self.tx.subscribe();
        rx.mark_changed();

        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut shutdown_rx => break,
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let fix = *rx.borrow_and_update();
                        if let Some(fix) = fix {
                            on_fix(fix).await;
                        }
                    }
                }
            }
            debug!("position subscription ended");
        });

        Subscription {
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        }
    }
}

/// Handle to a running fix handler; dropping it stops the handler
pub struct Subscription {
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Stop the handler and wait for it to finish
    pub async fn cancel(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(|t| t.is_finished())
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}
