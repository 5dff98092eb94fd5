use std::fmt;

use chrono::{DateTime, TimeDelta, Utc};
use kioskflow_types::{MemberRecord, SettlementResponse};
use uuid::Uuid;

use super::product::{Leg, Product};

/// Identity of one transaction context. Backend results carry it so that
/// answers for an abandoned context can be recognised and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(Uuid);

impl ContextId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ContextId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Screen the kiosk is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScreenState {
    #[default]
    Main,
    AwaitFob,
    FobResolving,
    FobResolved,
    MembershipInsertBill,
    MembershipFinalizing,
    MembershipDone,
    ScanAddress,
    InsertBill,
    SendingTx,
    TxReceipt,
}

impl ScreenState {
    /// States in which a cash deposit is open on the backend.
    pub fn is_deposit_open(&self) -> bool {
        matches!(self, Self::InsertBill | Self::MembershipInsertBill)
    }

    /// States waiting on a result-bearing backend call.
    pub fn is_awaiting_backend(&self) -> bool {
        matches!(
            self,
            Self::FobResolving | Self::MembershipFinalizing | Self::SendingTx
        )
    }
}

/// Outcome of a fob lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedMember {
    Registered { name: String, expiry: DateTime<Utc> },
    /// Unknown fob, or a record missing its name or expiry
    NotRegistered,
}

impl From<MemberRecord> for ResolvedMember {
    fn from(record: MemberRecord) -> Self {
        let expiry = record
            .expire_timestamp
            .and_then(|secs| DateTime::from_timestamp(secs, 0));
        match (record.name, expiry) {
            (Some(name), Some(expiry)) if !name.trim().is_empty() => {
                Self::Registered { name, expiry }
            }
            _ => Self::NotRegistered,
        }
    }
}

/// Settled transfer as shown on the receipt.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementResult {
    pub tx_hash: String,
    pub total_asset_received: f64,
    pub total_deposit_cad: f64,
    pub explorer_link: Option<String>,
}

impl SettlementResult {
    pub fn from_response(response: SettlementResponse, leg: &Leg) -> Self {
        let explorer_link = response
            .explorer_link
            .filter(|link| !link.is_empty())
            .or_else(|| leg.explorer_link(&response.tx_hash));
        Self {
            tx_hash: response.tx_hash,
            total_asset_received: response.total_asset_received,
            total_deposit_cad: response.total_deposit_cad,
            explorer_link,
        }
    }
}

/// Everything known about the transaction in progress.
#[derive(Debug, Clone)]
pub struct TransactionContext {
    pub id: ContextId,
    pub product: Product,
    pub recipient_address: Option<String>,
    pub membership_fob_id: Option<String>,
    pub resolved_member: Option<ResolvedMember>,
    pub settlement_result: Option<SettlementResult>,
    /// Membership payment accepted; waiting for the refreshed member record.
    pub(crate) membership_settled: bool,
}

impl TransactionContext {
    pub fn new(product: Product) -> Self {
        Self {
            id: ContextId::new(),
            product,
            recipient_address: None,
            membership_fob_id: None,
            resolved_member: None,
            settlement_result: None,
            membership_settled: false,
        }
    }
}

/// Expiry shown while bills are going in: one extension period past the
/// later of the current expiry and now, once any cash has been inserted.
///
/// An expiry too close to the end of the representable range is shown
/// unchanged.
pub fn expiry_preview(
    expiry: DateTime<Utc>,
    deposit: f64,
    now: DateTime<Utc>,
    extension: TimeDelta,
) -> DateTime<Utc> {
    if deposit > 0.0 {
        expiry.max(now).checked_add_signed(extension).unwrap_or(expiry)
    } else {
        expiry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::product::POLYGON_MATIC;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    #[test]
    fn preview_unchanged_without_deposit() {
        let expiry = at(1_700_000_000);
        let now = at(1_800_000_000);
        assert_eq!(expiry_preview(expiry, 0.0, now, TimeDelta::days(30)), expiry);
    }

    #[test]
    fn preview_extends_from_later_of_expiry_and_now() {
        let extension = TimeDelta::days(30);
        let past = at(1_700_000_000);
        let now = at(1_750_000_000);
        let future = at(1_800_000_000);

        assert_eq!(expiry_preview(past, 20.0, now, extension), now + extension);
        assert_eq!(expiry_preview(future, 20.0, now, extension), future + extension);
    }

    #[test]
    fn preview_saturates_near_the_end_of_time() {
        let record = MemberRecord {
            name: Some("Ada".to_string()),
            expire_timestamp: Some(8_210_266_876_000),
        };
        let ResolvedMember::Registered { expiry, .. } = ResolvedMember::from(record) else {
            panic!("far-future expiry should still resolve");
        };
        let now = at(1_750_000_000);
        assert_eq!(expiry_preview(expiry, 20.0, now, TimeDelta::days(30)), expiry);
        let end = DateTime::<Utc>::MAX_UTC;
        assert_eq!(expiry_preview(end, 5.0, now, TimeDelta::days(1)), end);
    }

    #[test]
    fn incomplete_member_record_is_not_registered() {
        let missing_expiry = MemberRecord {
            name: Some("Ada".to_string()),
            expire_timestamp: None,
        };
        assert_eq!(ResolvedMember::from(missing_expiry), ResolvedMember::NotRegistered);
        assert_eq!(ResolvedMember::from(MemberRecord::default()), ResolvedMember::NotRegistered);

        let full = MemberRecord {
            name: Some("Ada".to_string()),
            expire_timestamp: Some(1_700_000_000),
        };
        assert_eq!(
            ResolvedMember::from(full),
            ResolvedMember::Registered {
                name: "Ada".to_string(),
                expiry: at(1_700_000_000)
            }
        );
    }

    #[test]
    fn settlement_falls_back_to_leg_explorer() {
        let response = SettlementResponse {
            tx_hash: "0xabc".to_string(),
            total_asset_received: 13.5,
            total_deposit_cad: 20.0,
            explorer_link: None,
        };
        let result = SettlementResult::from_response(response, &POLYGON_MATIC);
        assert_eq!(
            result.explorer_link.as_deref(),
            Some("https://polygonscan.com/tx/0xabc")
        );
    }
}
