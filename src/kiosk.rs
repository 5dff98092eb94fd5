//! The running kiosk: controller, dispatcher, status poller and the scan
//! session, driven from a single event loop.

use chrono::Utc;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::backend::{BackendClient, IdentityClient, MemberDirectory, SettlementBackend};
use crate::config::AppConfig;
use crate::dispatch::Dispatcher;
use crate::error::KioskResult;
use crate::flow::{FlowController, FlowEvent, ScreenState};
use crate::scan::Scanner;
use crate::status::{StatusPoller, StatusSnapshot};

pub struct Kiosk {
    controller: FlowController,
    dispatcher: Dispatcher,
    poller: StatusPoller,
    scanner: Arc<dyn Scanner>,
    scan_session: Option<JoinHandle<()>>,
    events_tx: mpsc::UnboundedSender<FlowEvent>,
    events_rx: mpsc::UnboundedReceiver<FlowEvent>,
}

impl Kiosk {
    /// Must be called inside a tokio runtime; starts the status poller.
    pub fn new(
        controller: FlowController,
        backend: Arc<dyn SettlementBackend>,
        directory: Arc<dyn MemberDirectory>,
        scanner: Arc<dyn Scanner>,
        poll_interval: Duration,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let poller = StatusPoller::start(backend.clone(), poll_interval);
        let dispatcher = Dispatcher::new(backend, directory, events_tx.clone());

        Self {
            controller,
            dispatcher,
            poller,
            scanner,
            scan_session: None,
            events_tx,
            events_rx,
        }
    }

    /// Build a kiosk talking to the configured HTTP services.
    pub fn from_config(config: &AppConfig, scanner: Arc<dyn Scanner>) -> KioskResult<Self> {
        let backend = Arc::new(BackendClient::new(&config.backend)?);
        let directory = Arc::new(IdentityClient::new(&config.identity)?);
        let controller = FlowController::new(
            config.products.products()?,
            config.membership.extension()?,
        );
        Ok(Self::new(
            controller,
            backend,
            directory,
            scanner,
            config.poller.interval(),
        ))
    }

    /// Feed one event through the controller and start whatever it asks for.
    pub fn handle(&mut self, event: FlowEvent) {
        let status = self.poller.latest();
        let commands = self.controller.handle(event, status.as_deref());
        for command in commands {
            self.dispatcher.dispatch(command);
        }
        self.sync_scan_session();
    }

    /// Next completion or scan event posted by a background task.
    pub async fn next_event(&mut self) -> Option<FlowEvent> {
        self.events_rx.recv().await
    }

    pub fn controller(&self) -> &FlowController {
        &self.controller
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn status(&self) -> StatusSnapshot {
        self.poller.latest()
    }

    /// Expiry preview against the latest status and the current time.
    pub fn expiry_preview(&self) -> Option<chrono::DateTime<Utc>> {
        let status = self.poller.latest();
        self.controller.expiry_preview(status.as_deref(), Utc::now())
    }

    pub fn receivable(&self) -> Option<f64> {
        let status = self.poller.latest();
        self.controller.receivable(status.as_deref())
    }

    pub fn is_scanning(&self) -> bool {
        self.scan_session.is_some()
    }

    pub fn shutdown(&mut self) {
        self.poller.stop();
        self.stop_scanning();
    }

    /// Scanning runs exactly while the address screen is showing.
    fn sync_scan_session(&mut self) {
        let wants_scan = self.controller.screen() == ScreenState::ScanAddress;
        match (wants_scan, self.scan_session.is_some()) {
            (true, false) => self.start_scanning(),
            (false, true) => self.stop_scanning(),
            _ => {}
        }
    }

    fn start_scanning(&mut self) {
        debug!("Scan session started");
        let mut attempts = self.scanner.attempts();
        let tx = self.events_tx.clone();
        self.scan_session = Some(tokio::spawn(async move {
            while let Some(attempt) = attempts.next().await {
                match attempt {
                    Ok(payload) => {
                        if tx.send(FlowEvent::ScanDecoded(payload)).is_err() {
                            break;
                        }
                    }
                    Err(e) => debug!("Scan attempt failed: {}", e),
                }
            }
        }));
    }

    fn stop_scanning(&mut self) {
        if let Some(session) = self.scan_session.take() {
            debug!("Scan session stopped");
            session.abort();
        }
    }
}

impl Drop for Kiosk {
    fn drop(&mut self) {
        self.stop_scanning();
    }
}
