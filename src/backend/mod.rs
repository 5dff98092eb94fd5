//! Remote collaborators: the settlement backend and the identity service.

pub mod client;
pub mod identity;

use async_trait::async_trait;
use kioskflow_types::{MachineStatus, MemberRecord, SettlementResponse};

use crate::error::KioskResult;

pub use client::BackendClient;
pub use identity::IdentityClient;

/// Cash acceptor and payout service.
#[async_trait]
pub trait SettlementBackend: Send + Sync {
    async fn stats(&self) -> KioskResult<MachineStatus>;

    async fn start_deposit(&self) -> KioskResult<()>;

    async fn cancel_deposit(&self) -> KioskResult<()>;

    /// Settle the open deposit to `recipient` through a leg's endpoint.
    async fn end_deposit(&self, endpoint: &str, recipient: &str) -> KioskResult<SettlementResponse>;

    async fn end_membership(&self, fob_id: &str) -> KioskResult<()>;

    async fn empty_payout(&self) -> KioskResult<()>;

    async fn reset_machine(&self) -> KioskResult<()>;
}

/// Resolves a fob to the member it belongs to.
#[async_trait]
pub trait MemberDirectory: Send + Sync {
    async fn lookup(&self, fob_id: &str) -> KioskResult<MemberRecord>;
}
