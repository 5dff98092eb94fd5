//! Display payload for the receipt screen.

use qrcode::QrCode;

use crate::flow::{Leg, SettlementResult};

/// Fixed content of the receipt screen.
#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    pub headline: String,
    pub tx_hash: String,
    pub lines: Vec<String>,
    pub explorer_link: Option<String>,
}

impl Receipt {
    /// Explorer link as a terminal QR code, if there is a link.
    pub fn explorer_qr(&self) -> Option<String> {
        let link = self.explorer_link.as_deref()?;
        let code = QrCode::new(link.as_bytes()).ok()?;
        Some(
            code.render::<char>()
                .quiet_zone(true)
                .module_dimensions(2, 1)
                .dark_color('█')
                .light_color(' ')
                .build(),
        )
    }
}

pub fn present(leg: &Leg, result: &SettlementResult) -> Receipt {
    Receipt {
        headline: format!("{} SENT", leg.label),
        tx_hash: result.tx_hash.clone(),
        lines: vec![
            format!("DEPOSITED: ${} CAD", pretty_amount(result.total_deposit_cad, 2)),
            format!(
                "{} RECEIVED: {}",
                leg.label,
                pretty_amount(result.total_asset_received, 6)
            ),
            format!("NETWORK: {}", leg.chain),
        ],
        explorer_link: result.explorer_link.clone(),
    }
}

/// Truncate (not round) the fractional part to `decimals` digits.
pub fn pretty_amount(value: f64, decimals: usize) -> String {
    let text = value.to_string();
    match text.split_once('.') {
        Some((whole, _)) if decimals == 0 => whole.to_string(),
        Some((whole, fraction)) => {
            let digits: String = fraction.chars().take(decimals).collect();
            format!("{}.{}", whole, digits)
        }
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::product::{LIGHTNING_SATS, POLYGON_MATIC};

    fn settled(link: Option<&str>) -> SettlementResult {
        SettlementResult {
            tx_hash: "0xabc".to_string(),
            total_asset_received: 13.5,
            total_deposit_cad: 20.0,
            explorer_link: link.map(str::to_string),
        }
    }

    #[test]
    fn test_pretty_amount_truncates() {
        assert_eq!(pretty_amount(20.0, 6), "20");
        assert_eq!(pretty_amount(13.5, 6), "13.5");
        assert_eq!(pretty_amount(0.123456789, 6), "0.123456");
        assert_eq!(pretty_amount(19.999, 2), "19.99");
        assert_eq!(pretty_amount(7.25, 0), "7");
    }

    #[test]
    fn test_receipt_renders_settlement_values() {
        let receipt = present(&POLYGON_MATIC, &settled(Some("https://polygonscan.com/tx/0xabc")));
        assert_eq!(receipt.headline, "MATIC SENT");
        assert_eq!(receipt.tx_hash, "0xabc");
        assert_eq!(receipt.lines[0], "DEPOSITED: $20 CAD");
        assert_eq!(receipt.lines[1], "MATIC RECEIVED: 13.5");
        assert!(receipt.explorer_qr().is_some());
    }

    #[test]
    fn test_no_qr_without_link() {
        let receipt = present(&LIGHTNING_SATS, &settled(None));
        assert_eq!(receipt.explorer_qr(), None);
    }
}
