//! Yes/no confirmation in front of irreversible actions.

use tracing::warn;

/// What a prompt is guarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfirmKind {
    ReturnHome,
    RecipientAddress,
    FinishDeposit,
    EmptyPayout,
    ResetMachine,
}

/// An open prompt carrying the action it will run on confirm.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt<A> {
    pub kind: ConfirmKind,
    pub title: String,
    pub body: String,
    pub action: A,
}

impl<A> Prompt<A> {
    pub fn new(kind: ConfirmKind, title: impl Into<String>, body: impl Into<String>, action: A) -> Self {
        Self {
            kind,
            title: title.into(),
            body: body.into(),
            action,
        }
    }
}

/// Returned when a prompt is requested while another is still open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("a {open:?} confirmation is already open")]
pub struct GateBusy {
    pub open: ConfirmKind,
}

/// Holds at most one open prompt.
#[derive(Debug)]
pub struct ConfirmationGate<A> {
    open: Option<Prompt<A>>,
}

impl<A> Default for ConfirmationGate<A> {
    fn default() -> Self {
        Self { open: None }
    }
}

impl<A> ConfirmationGate<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a prompt. The currently open prompt, if any, is left untouched.
    pub fn request(&mut self, prompt: Prompt<A>) -> Result<(), GateBusy> {
        if let Some(open) = &self.open {
            warn!(
                "Refusing {:?} confirmation, {:?} is still open",
                prompt.kind, open.kind
            );
            return Err(GateBusy { open: open.kind });
        }
        self.open = Some(prompt);
        Ok(())
    }

    /// Close the prompt and hand back its action for execution.
    pub fn confirm(&mut self) -> Option<A> {
        self.open.take().map(|prompt| prompt.action)
    }

    /// Close the prompt without running its action.
    pub fn decline(&mut self) -> Option<Prompt<A>> {
        self.open.take()
    }

    pub fn current(&self) -> Option<&Prompt<A>> {
        self.open.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    pub fn close(&mut self) {
        self.open = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirm_returns_action_and_closes() {
        let mut gate = ConfirmationGate::new();
        gate.request(Prompt::new(ConfirmKind::FinishDeposit, "Done?", "", 7))
            .unwrap();
        assert!(gate.is_open());
        assert_eq!(gate.confirm(), Some(7));
        assert!(!gate.is_open());
        assert_eq!(gate.confirm(), None);
    }

    #[test]
    fn decline_discards_action() {
        let mut gate = ConfirmationGate::new();
        gate.request(Prompt::new(ConfirmKind::RecipientAddress, "Address", "0x..", "addr"))
            .unwrap();
        let declined = gate.decline().unwrap();
        assert_eq!(declined.kind, ConfirmKind::RecipientAddress);
        assert_eq!(gate.confirm(), None);
    }

    #[test]
    fn second_request_is_refused() {
        let mut gate = ConfirmationGate::new();
        gate.request(Prompt::new(ConfirmKind::ReturnHome, "Home?", "", 1))
            .unwrap();
        let err = gate
            .request(Prompt::new(ConfirmKind::FinishDeposit, "Done?", "", 2))
            .unwrap_err();
        assert_eq!(err.open, ConfirmKind::ReturnHome);
        assert_eq!(gate.current().map(|p| p.action), Some(1));
    }
}
