use chrono::{DateTime, TimeDelta, Utc};
use kioskflow_types::{MachineStatus, MemberRecord, SettlementResponse};
use tracing::{debug, info, warn};

use super::product::{Leg, Product};
use super::state::{
    expiry_preview, ContextId, ResolvedMember, ScreenState, SettlementResult, TransactionContext,
};
use crate::confirm::{ConfirmKind, ConfirmationGate, Prompt};
use crate::receipt::{self, Receipt};
use crate::scan::filter_scan;

/// Action held by an open confirmation prompt.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingAction {
    ReturnHome,
    AcceptRecipient(String),
    FinishDeposit,
    EmptyPayout,
    ResetMachine,
}

/// Fire-and-forget backend calls. Their failures only raise an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendCall {
    StartDeposit,
    CancelDeposit,
    EmptyPayout,
    ResetMachine,
}

impl BackendCall {
    pub fn describe(&self) -> &'static str {
        match self {
            Self::StartDeposit => "Starting the deposit",
            Self::CancelDeposit => "Cancelling the deposit",
            Self::EmptyPayout => "Emptying the payout",
            Self::ResetMachine => "Resetting the machine",
        }
    }
}

/// Input to the controller: operator actions and backend completions.
#[derive(Debug, Clone)]
pub enum FlowEvent {
    SelectProduct(Product),
    FobEntered(String),
    ScanDecoded(String),
    PayMembership,
    PressDone,
    RequestReturnHome,
    RequestEmptyPayout,
    RequestResetMachine,
    Confirm,
    Decline,
    DismissAlert,

    MemberResolved {
        context: ContextId,
        result: Result<MemberRecord, String>,
    },
    MembershipFinalized {
        context: ContextId,
        result: Result<(), String>,
    },
    SettlementFinished {
        context: ContextId,
        result: Result<SettlementResponse, String>,
    },
    CallFailed {
        call: BackendCall,
        error: String,
    },
}

impl FlowEvent {
    /// Events produced by someone standing at the kiosk.
    fn is_operator_input(&self) -> bool {
        matches!(
            self,
            Self::SelectProduct(_)
                | Self::FobEntered(_)
                | Self::ScanDecoded(_)
                | Self::PayMembership
                | Self::PressDone
                | Self::RequestReturnHome
                | Self::RequestEmptyPayout
                | Self::RequestResetMachine
        )
    }
}

/// Side effect requested by a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    StartDeposit,
    CancelDeposit,
    FinalizeAsset {
        context: ContextId,
        leg: Leg,
        recipient: String,
    },
    FinalizeMembership {
        context: ContextId,
        fob_id: String,
    },
    LookupMember {
        context: ContextId,
        fob_id: String,
    },
    EmptyPayout,
    ResetMachine,
    /// Stop tracking the context's calls. They still run to completion and
    /// their results are discarded as stale.
    ReleaseContext {
        context: ContextId,
    },
}

/// The kiosk state machine.
///
/// Owns the screen, the transaction context and the confirmation gate.
/// [`FlowController::handle`] applies one event and returns the backend
/// work to start; it never performs I/O itself.
#[derive(Debug)]
pub struct FlowController {
    screen: ScreenState,
    context: Option<TransactionContext>,
    gate: ConfirmationGate<PendingAction>,
    alert: Option<String>,
    products: Vec<Product>,
    extension: TimeDelta,
}

impl FlowController {
    pub fn new(products: Vec<Product>, extension: TimeDelta) -> Self {
        Self {
            screen: ScreenState::Main,
            context: None,
            gate: ConfirmationGate::new(),
            alert: None,
            products,
            extension,
        }
    }

    pub fn screen(&self) -> ScreenState {
        self.screen
    }

    pub fn context(&self) -> Option<&TransactionContext> {
        self.context.as_ref()
    }

    pub fn prompt(&self) -> Option<&Prompt<PendingAction>> {
        self.gate.current()
    }

    pub fn alert(&self) -> Option<&str> {
        self.alert.as_deref()
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// Receivable amount for the leg in flight, from the latest status.
    pub fn receivable(&self, status: Option<&MachineStatus>) -> Option<f64> {
        let leg = self.context.as_ref()?.product.leg()?;
        leg.amount_field.receivable(status?)
    }

    /// New membership expiry if the deposit were finished now.
    pub fn expiry_preview(
        &self,
        status: Option<&MachineStatus>,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        match self.context.as_ref()?.resolved_member.as_ref()? {
            ResolvedMember::Registered { expiry, .. } => {
                let deposit = status.map(|s| s.current_deposit_amount).unwrap_or(0.0);
                Some(expiry_preview(*expiry, deposit, now, self.extension))
            }
            ResolvedMember::NotRegistered => None,
        }
    }

    /// Receipt for the finished transfer, once on the receipt screen.
    pub fn receipt(&self) -> Option<Receipt> {
        if self.screen != ScreenState::TxReceipt {
            return None;
        }
        let context = self.context.as_ref()?;
        let leg = context.product.leg()?;
        let result = context.settlement_result.as_ref()?;
        Some(receipt::present(leg, result))
    }

    /// Apply one event. `status` is the latest machine snapshot, used for
    /// busy guards only.
    pub fn handle(&mut self, event: FlowEvent, status: Option<&MachineStatus>) -> Vec<Command> {
        if event.is_operator_input() && (self.gate.is_open() || self.alert.is_some()) {
            debug!("Ignoring {:?} while a dialog is open", event);
            return Vec::new();
        }

        match event {
            FlowEvent::SelectProduct(product) => self.select_product(product, status),
            FlowEvent::FobEntered(fob_id) => self.fob_entered(fob_id),
            FlowEvent::ScanDecoded(payload) => self.scan_decoded(&payload),
            FlowEvent::PayMembership => self.pay_membership(),
            FlowEvent::PressDone => self.press_done(),
            FlowEvent::RequestReturnHome => self.request_return_home(),
            FlowEvent::RequestEmptyPayout => self.request_empty_payout(status),
            FlowEvent::RequestResetMachine => self.request_reset_machine(),
            FlowEvent::Confirm => self.confirm(),
            FlowEvent::Decline => {
                if let Some(prompt) = self.gate.decline() {
                    debug!("Declined {:?}", prompt.kind);
                }
                Vec::new()
            }
            FlowEvent::DismissAlert => {
                self.alert = None;
                Vec::new()
            }
            FlowEvent::MemberResolved { context, result } => self.member_resolved(context, result),
            FlowEvent::MembershipFinalized { context, result } => {
                self.membership_finalized(context, result)
            }
            FlowEvent::SettlementFinished { context, result } => {
                self.settlement_finished(context, result)
            }
            FlowEvent::CallFailed { call, error } => {
                self.raise_alert(format!("{} failed: {}", call.describe(), error));
                Vec::new()
            }
        }
    }

    fn transition(&mut self, to: ScreenState) {
        info!("Screen {:?} -> {:?}", self.screen, to);
        self.screen = to;
    }

    fn raise_alert(&mut self, message: String) {
        warn!("Alert: {}", message);
        self.alert = Some(message);
    }

    fn open_prompt(&mut self, prompt: Prompt<PendingAction>) {
        // Operator input is dropped while a prompt is open, so this only
        // fails if a caller bypasses handle().
        if let Err(busy) = self.gate.request(prompt) {
            debug!("Prompt not opened: {}", busy);
        }
    }

    /// The context a backend result belongs to, if it is still current.
    fn current_context(&mut self, id: ContextId) -> Option<&mut TransactionContext> {
        match self.context.as_mut() {
            Some(context) if context.id == id => Some(context),
            _ => {
                debug!("Discarding result for stale context {}", id);
                None
            }
        }
    }

    fn select_product(&mut self, product: Product, status: Option<&MachineStatus>) -> Vec<Command> {
        if self.screen != ScreenState::Main {
            return Vec::new();
        }
        if !self.products.contains(&product) {
            self.raise_alert(format!("{} is not available on this kiosk", product));
            return Vec::new();
        }
        if status.is_some_and(|s| s.deposit_in_progress || s.emptying_in_progress) {
            self.raise_alert("The machine is busy, please try again shortly".to_string());
            return Vec::new();
        }

        let context = TransactionContext::new(product);
        info!("Starting {} (context {})", product.key(), context.id);
        self.context = Some(context);
        match product {
            Product::BuyAsset(_) => self.transition(ScreenState::ScanAddress),
            Product::ExtendMembership => self.transition(ScreenState::AwaitFob),
        }
        Vec::new()
    }

    fn fob_entered(&mut self, fob_id: String) -> Vec<Command> {
        if self.screen != ScreenState::AwaitFob {
            return Vec::new();
        }
        let Some(context) = self.context.as_mut() else {
            return Vec::new();
        };
        context.membership_fob_id = Some(fob_id.clone());
        let id = context.id;
        self.transition(ScreenState::FobResolving);
        vec![Command::LookupMember {
            context: id,
            fob_id,
        }]
    }

    fn member_resolved(
        &mut self,
        id: ContextId,
        result: Result<MemberRecord, String>,
    ) -> Vec<Command> {
        let screen = self.screen;
        let Some(context) = self.current_context(id) else {
            return Vec::new();
        };
        let next = match screen {
            ScreenState::FobResolving => ScreenState::FobResolved,
            ScreenState::MembershipFinalizing if context.membership_settled => {
                ScreenState::MembershipDone
            }
            _ => {
                debug!("Member lookup result not expected in {:?}", screen);
                return Vec::new();
            }
        };

        match result {
            Ok(record) => {
                context.resolved_member = Some(ResolvedMember::from(record));
                self.transition(next);
            }
            Err(error) => self.raise_alert(format!("Member lookup failed: {}", error)),
        }
        Vec::new()
    }

    fn pay_membership(&mut self) -> Vec<Command> {
        if self.screen != ScreenState::FobResolved {
            return Vec::new();
        }
        let registered = matches!(
            self.context.as_ref().and_then(|c| c.resolved_member.as_ref()),
            Some(ResolvedMember::Registered { .. })
        );
        if !registered {
            debug!("Membership payment refused, member not registered");
            return Vec::new();
        }
        self.transition(ScreenState::MembershipInsertBill);
        vec![Command::StartDeposit]
    }

    fn scan_decoded(&mut self, payload: &str) -> Vec<Command> {
        if self.screen != ScreenState::ScanAddress {
            return Vec::new();
        }
        let Some(leg) = self.context.as_ref().and_then(|c| c.product.leg()).copied() else {
            return Vec::new();
        };
        let Some(address) = filter_scan(payload, leg.family) else {
            return Vec::new();
        };

        self.open_prompt(Prompt::new(
            ConfirmKind::RecipientAddress,
            "Confirm Your Address",
            format!("Confirm that {} is your {} address?", address, leg.chain),
            PendingAction::AcceptRecipient(address),
        ));
        Vec::new()
    }

    fn press_done(&mut self) -> Vec<Command> {
        let Some(context) = self.context.as_ref() else {
            return Vec::new();
        };
        let body = match (self.screen, &context.product) {
            (ScreenState::InsertBill, Product::BuyAsset(leg)) => format!(
                "Finish depositing and send {} to {}? Inserted bills are not refundable.",
                leg.label,
                context.recipient_address.as_deref().unwrap_or_default()
            ),
            (ScreenState::MembershipInsertBill, Product::ExtendMembership) => {
                "Finish depositing and extend the membership?".to_string()
            }
            _ => return Vec::new(),
        };
        self.open_prompt(Prompt::new(
            ConfirmKind::FinishDeposit,
            "Finish Depositing?",
            body,
            PendingAction::FinishDeposit,
        ));
        Vec::new()
    }

    fn request_return_home(&mut self) -> Vec<Command> {
        if self.screen == ScreenState::Main {
            return Vec::new();
        }
        self.open_prompt(Prompt::new(
            ConfirmKind::ReturnHome,
            "Cancel And Return Home?",
            "Do you really want to cancel your progress and return home?",
            PendingAction::ReturnHome,
        ));
        Vec::new()
    }

    fn request_empty_payout(&mut self, status: Option<&MachineStatus>) -> Vec<Command> {
        if self.screen != ScreenState::Main {
            return Vec::new();
        }
        if status.is_some_and(|s| s.deposit_in_progress || s.emptying_in_progress) {
            self.raise_alert("Cannot empty the payout while the machine is busy".to_string());
            return Vec::new();
        }
        self.open_prompt(Prompt::new(
            ConfirmKind::EmptyPayout,
            "Empty Payout?",
            "Dispense all bills held in the payout?",
            PendingAction::EmptyPayout,
        ));
        Vec::new()
    }

    fn request_reset_machine(&mut self) -> Vec<Command> {
        if self.screen != ScreenState::Main {
            return Vec::new();
        }
        self.open_prompt(Prompt::new(
            ConfirmKind::ResetMachine,
            "Reset Machine State?",
            "Clear any deposit or emptying flags held by the machine?",
            PendingAction::ResetMachine,
        ));
        Vec::new()
    }

    fn confirm(&mut self) -> Vec<Command> {
        let Some(action) = self.gate.confirm() else {
            return Vec::new();
        };
        match action {
            PendingAction::ReturnHome => self.return_home(),
            PendingAction::AcceptRecipient(address) => self.accept_recipient(address),
            PendingAction::FinishDeposit => self.finish_deposit(),
            PendingAction::EmptyPayout => vec![Command::EmptyPayout],
            PendingAction::ResetMachine => vec![Command::ResetMachine],
        }
    }

    fn return_home(&mut self) -> Vec<Command> {
        let mut commands = Vec::new();
        if let Some(context) = self.context.take() {
            info!("Discarding context {}", context.id);
            commands.push(Command::ReleaseContext {
                context: context.id,
            });
        }
        if self.screen.is_deposit_open() {
            commands.push(Command::CancelDeposit);
        }
        self.gate.close();
        self.transition(ScreenState::Main);
        commands
    }

    fn accept_recipient(&mut self, address: String) -> Vec<Command> {
        if self.screen != ScreenState::ScanAddress {
            return Vec::new();
        }
        let Some(context) = self.context.as_mut() else {
            return Vec::new();
        };
        if context.recipient_address.is_some() {
            return Vec::new();
        }
        info!("Recipient {} accepted for context {}", address, context.id);
        context.recipient_address = Some(address);
        self.transition(ScreenState::InsertBill);
        vec![Command::StartDeposit]
    }

    fn finish_deposit(&mut self) -> Vec<Command> {
        let Some(context) = self.context.as_ref() else {
            return Vec::new();
        };
        match (self.screen, &context.product) {
            (ScreenState::InsertBill, Product::BuyAsset(leg)) => {
                let Some(recipient) = context.recipient_address.clone() else {
                    return Vec::new();
                };
                let command = Command::FinalizeAsset {
                    context: context.id,
                    leg: *leg,
                    recipient,
                };
                self.transition(ScreenState::SendingTx);
                vec![command]
            }
            (ScreenState::MembershipInsertBill, Product::ExtendMembership) => {
                let Some(fob_id) = context.membership_fob_id.clone() else {
                    return Vec::new();
                };
                let command = Command::FinalizeMembership {
                    context: context.id,
                    fob_id,
                };
                self.transition(ScreenState::MembershipFinalizing);
                vec![command]
            }
            _ => Vec::new(),
        }
    }

    fn settlement_finished(
        &mut self,
        id: ContextId,
        result: Result<SettlementResponse, String>,
    ) -> Vec<Command> {
        let screen = self.screen;
        let Some(context) = self.current_context(id) else {
            return Vec::new();
        };
        if screen != ScreenState::SendingTx || context.settlement_result.is_some() {
            debug!("Settlement result not expected in {:?}", screen);
            return Vec::new();
        }
        let Some(leg) = context.product.leg().copied() else {
            return Vec::new();
        };

        match result {
            Ok(response) => {
                info!("Settled {} in tx {}", leg.label, response.tx_hash);
                context.settlement_result = Some(SettlementResult::from_response(response, &leg));
                self.transition(ScreenState::TxReceipt);
            }
            Err(error) => self.raise_alert(format!("Sending {} failed: {}", leg.label, error)),
        }
        Vec::new()
    }

    fn membership_finalized(&mut self, id: ContextId, result: Result<(), String>) -> Vec<Command> {
        let screen = self.screen;
        let Some(context) = self.current_context(id) else {
            return Vec::new();
        };
        if screen != ScreenState::MembershipFinalizing || context.membership_settled {
            return Vec::new();
        }

        match result {
            Ok(()) => {
                context.membership_settled = true;
                match context.membership_fob_id.clone() {
                    Some(fob_id) => vec![Command::LookupMember {
                        context: id,
                        fob_id,
                    }],
                    None => Vec::new(),
                }
            }
            Err(error) => {
                self.raise_alert(format!("Membership payment failed: {}", error));
                Vec::new()
            }
        }
    }
}
