//! Runs the backend work requested by the flow controller.
//!
//! Every call runs on its own task and reports back as a [`FlowEvent`].
//! Result-bearing calls are registered under their context. Returning home
//! releases them but never aborts one: a finalize request that has reached
//! the backend must be allowed to settle.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::backend::{MemberDirectory, SettlementBackend};
use crate::flow::{BackendCall, Command, ContextId, FlowEvent};

pub struct Dispatcher {
    backend: Arc<dyn SettlementBackend>,
    directory: Arc<dyn MemberDirectory>,
    events: mpsc::UnboundedSender<FlowEvent>,
    in_flight: DashMap<ContextId, Vec<JoinHandle<()>>>,
}

impl Dispatcher {
    pub fn new(
        backend: Arc<dyn SettlementBackend>,
        directory: Arc<dyn MemberDirectory>,
        events: mpsc::UnboundedSender<FlowEvent>,
    ) -> Self {
        Self {
            backend,
            directory,
            events,
            in_flight: DashMap::new(),
        }
    }

    pub fn dispatch(&self, command: Command) {
        match command {
            Command::StartDeposit => self.fire(BackendCall::StartDeposit),
            Command::CancelDeposit => self.fire(BackendCall::CancelDeposit),
            Command::EmptyPayout => self.fire(BackendCall::EmptyPayout),
            Command::ResetMachine => self.fire(BackendCall::ResetMachine),
            Command::FinalizeAsset {
                context,
                leg,
                recipient,
            } => {
                let backend = self.backend.clone();
                let tx = self.events.clone();
                let handle = tokio::spawn(async move {
                    let result = backend
                        .end_deposit(leg.finalize_endpoint, &recipient)
                        .await
                        .map_err(|e| {
                            error!("Settlement of {} failed: {}", leg.label, e);
                            e.alert_text()
                        });
                    let _ = tx.send(FlowEvent::SettlementFinished { context, result });
                });
                self.track(context, handle);
            }
            Command::FinalizeMembership { context, fob_id } => {
                let backend = self.backend.clone();
                let tx = self.events.clone();
                let handle = tokio::spawn(async move {
                    let result = backend.end_membership(&fob_id).await.map_err(|e| {
                        error!("Membership settlement failed: {}", e);
                        e.alert_text()
                    });
                    let _ = tx.send(FlowEvent::MembershipFinalized { context, result });
                });
                self.track(context, handle);
            }
            Command::LookupMember { context, fob_id } => {
                let directory = self.directory.clone();
                let tx = self.events.clone();
                let handle = tokio::spawn(async move {
                    let result = directory.lookup(&fob_id).await.map_err(|e| {
                        error!("Lookup of fob {} failed: {}", fob_id, e);
                        e.alert_text()
                    });
                    let _ = tx.send(FlowEvent::MemberResolved { context, result });
                });
                self.track(context, handle);
            }
            Command::ReleaseContext { context } => self.release(context),
        }
    }

    /// Number of unfinished calls registered for a context.
    pub fn in_flight(&self, context: ContextId) -> usize {
        self.in_flight
            .get(&context)
            .map(|handles| handles.iter().filter(|h| !h.is_finished()).count())
            .unwrap_or(0)
    }

    fn fire(&self, call: BackendCall) {
        let backend = self.backend.clone();
        let tx = self.events.clone();
        tokio::spawn(async move {
            let result = match call {
                BackendCall::StartDeposit => backend.start_deposit().await,
                BackendCall::CancelDeposit => backend.cancel_deposit().await,
                BackendCall::EmptyPayout => backend.empty_payout().await,
                BackendCall::ResetMachine => backend.reset_machine().await,
            };
            match result {
                Ok(()) => debug!("{:?} completed", call),
                Err(e) => {
                    error!("{:?} failed: {}", call, e);
                    let _ = tx.send(FlowEvent::CallFailed {
                        call,
                        error: e.alert_text(),
                    });
                }
            }
        });
    }

    fn track(&self, context: ContextId, handle: JoinHandle<()>) {
        let mut handles = self.in_flight.entry(context).or_default();
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
    }

    /// Dropping the handles detaches the tasks without cancelling them.
    fn release(&self, context: ContextId) {
        if let Some((_, handles)) = self.in_flight.remove(&context) {
            let pending = handles.iter().filter(|h| !h.is_finished()).count();
            if pending > 0 {
                info!(
                    "Released context {} with {} calls still running",
                    context, pending
                );
            }
        }
    }
}
