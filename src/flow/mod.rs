//! Kiosk transaction flow: products, screens and the state machine.

pub mod controller;
pub mod product;
pub mod state;

pub use controller::{BackendCall, Command, FlowController, FlowEvent, PendingAction};
pub use product::{AmountField, Leg, Product, ETHEREUM_ETH, LIGHTNING_SATS, POLYGON_MATIC};
pub use state::{
    expiry_preview, ContextId, ResolvedMember, ScreenState, SettlementResult, TransactionContext,
};
