//! JSON bodies exchanged with the kiosk settlement backend and the
//! membership identity service.
//!
//! These mirror the backend's wire format; domain logic lives in the
//! `kioskflow` crate.

use serde::{Deserialize, Serialize};

/// Snapshot returned by `GET /stats`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineStatus {
    #[serde(default)]
    pub deposit_in_progress: bool,
    #[serde(default)]
    pub emptying_in_progress: bool,
    /// CAD inserted into the open deposit
    #[serde(default)]
    pub current_deposit_amount: f64,

    pub matic_per_cad: Option<f64>,
    pub matic_receivable: Option<f64>,
    pub eth_per_cad: Option<f64>,
    pub eth_receivable: Option<f64>,
    pub sats_per_cad: Option<f64>,
    pub sats_receivable: Option<f64>,

    pub matic_balance: Option<f64>,
    pub eth_balance: Option<f64>,
    pub sats_balance: Option<f64>,

    /// Unix seconds
    pub rate_last_updated: Option<i64>,
    #[serde(default)]
    pub version: String,
}

/// Body of `POST /deposit/end/<asset>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndDepositRequest {
    pub recipient: String,
}

/// Body of `POST /deposit/end/membership`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EndMembershipRequest {
    pub fob_key: String,
}

/// Response of a successful asset settlement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementResponse {
    pub tx_hash: String,
    #[serde(
        alias = "totalMaticReceived",
        alias = "totalEthReceived",
        alias = "totalSatsReceived"
    )]
    pub total_asset_received: f64,
    #[serde(rename = "totalDepositCAD")]
    pub total_deposit_cad: f64,
    #[serde(default)]
    pub explorer_link: Option<String>,
}

/// Response of `GET /fob/{id}/user` on the identity service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemberRecord {
    #[serde(default)]
    pub name: Option<String>,
    /// Unix seconds
    #[serde(default)]
    pub expire_timestamp: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_tolerates_missing_fields() {
        let status: MachineStatus =
            serde_json::from_str(r#"{"depositInProgress":true,"version":"1.2"}"#).unwrap();
        assert!(status.deposit_in_progress);
        assert!(!status.emptying_in_progress);
        assert_eq!(status.matic_receivable, None);
        assert_eq!(status.version, "1.2");
    }

    #[test]
    fn settlement_accepts_asset_specific_amount_field() {
        let response: SettlementResponse = serde_json::from_str(
            r#"{"txHash":"0xabc","totalMaticReceived":13.5,"totalDepositCAD":20}"#,
        )
        .unwrap();
        assert_eq!(response.total_asset_received, 13.5);
        assert_eq!(response.total_deposit_cad, 20.0);
        assert_eq!(response.explorer_link, None);
    }

    #[test]
    fn membership_request_uses_fob_key() {
        let body = serde_json::to_string(&EndMembershipRequest {
            fob_key: "0042".to_string(),
        })
        .unwrap();
        assert_eq!(body, r#"{"fobKey":"0042"}"#);
    }
}
