//! Background polling of the machine status.
//!
//! The poller owns a `watch` channel holding the latest snapshot. Readers
//! only ever see a complete [`MachineStatus`]; a failed poll leaves the
//! previous one in place until the next tick.

use kioskflow_types::MachineStatus;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::backend::SettlementBackend;

pub type StatusSnapshot = Option<Arc<MachineStatus>>;

pub struct StatusPoller {
    snapshot: watch::Receiver<StatusSnapshot>,
    task: Option<JoinHandle<()>>,
}

impl StatusPoller {
    /// Spawn the polling task. The first fetch happens immediately.
    pub fn start(source: Arc<dyn SettlementBackend>, interval: Duration) -> Self {
        let (tx, rx) = watch::channel(None);
        info!("Polling machine status every {:?}", interval);
        let task = tokio::spawn(poll_loop(source, interval, tx));
        Self {
            snapshot: rx,
            task: Some(task),
        }
    }

    /// Latest successful snapshot, `None` until the first poll succeeds.
    pub fn latest(&self) -> StatusSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Receiver notified whenever a new snapshot lands.
    pub fn subscribe(&self) -> watch::Receiver<StatusSnapshot> {
        self.snapshot.clone()
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            debug!("Stopping status poller");
            task.abort();
        }
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn poll_loop(
    source: Arc<dyn SettlementBackend>,
    interval: Duration,
    tx: watch::Sender<StatusSnapshot>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        match source.stats().await {
            Ok(status) => {
                tx.send_replace(Some(Arc::new(status)));
            }
            Err(e) => warn!("Status poll failed, keeping previous snapshot: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{KioskError, KioskResult};
    use async_trait::async_trait;
    use kioskflow_types::SettlementResponse;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Succeeds on the first poll, fails afterwards.
    struct FlakyStats {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SettlementBackend for FlakyStats {
        async fn stats(&self) -> KioskResult<MachineStatus> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call == 0 {
                Ok(MachineStatus {
                    matic_per_cad: Some(0.675),
                    version: "1.0.0".to_string(),
                    ..Default::default()
                })
            } else {
                Err(KioskError::internal("backend down"))
            }
        }

        async fn start_deposit(&self) -> KioskResult<()> {
            Ok(())
        }

        async fn cancel_deposit(&self) -> KioskResult<()> {
            Ok(())
        }

        async fn end_deposit(&self, _: &str, _: &str) -> KioskResult<SettlementResponse> {
            Err(KioskError::internal("unused"))
        }

        async fn end_membership(&self, _: &str) -> KioskResult<()> {
            Ok(())
        }

        async fn empty_payout(&self) -> KioskResult<()> {
            Ok(())
        }

        async fn reset_machine(&self) -> KioskResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn failed_poll_keeps_previous_snapshot() {
        let source = Arc::new(FlakyStats {
            calls: AtomicUsize::new(0),
        });
        let poller = StatusPoller::start(source.clone(), Duration::from_millis(10));

        let mut updates = poller.subscribe();
        updates.changed().await.unwrap();
        assert_eq!(poller.latest().unwrap().matic_per_cad, Some(0.675));

        while source.calls.load(Ordering::SeqCst) < 4 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        let latest = poller.latest().unwrap();
        assert_eq!(latest.matic_per_cad, Some(0.675));
        assert_eq!(latest.version, "1.0.0");
    }

    #[tokio::test]
    async fn stop_ends_polling() {
        let source = Arc::new(FlakyStats {
            calls: AtomicUsize::new(0),
        });
        let mut poller = StatusPoller::start(source.clone(), Duration::from_millis(10));
        assert!(poller.is_running());

        poller.stop();
        assert!(!poller.is_running());
        let calls = source.calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(source.calls.load(Ordering::SeqCst), calls);
    }
}
