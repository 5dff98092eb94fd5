//! Property tests for scanned address filtering.

use kioskflow::scan::{filter_scan, AssetFamily};
use proptest::prelude::*;

fn evm_address() -> impl Strategy<Value = String> {
    "[0-9a-fA-F]{40}".prop_map(|hex| format!("0x{}", hex))
}

proptest! {
    #[test]
    fn evm_accepts_address_with_any_suffix(address in evm_address(), suffix in "[ -~]{0,20}") {
        let payload = format!("{}{}", address, suffix);
        prop_assert_eq!(filter_scan(&payload, AssetFamily::Evm), Some(address));
    }

    #[test]
    fn evm_strips_uri_scheme(address in evm_address(), suffix in "(@[0-9]{1,3})?(\\?value=[0-9]{1,6})?") {
        let payload = format!("ethereum:{}{}", address, suffix);
        prop_assert_eq!(filter_scan(&payload, AssetFamily::Evm), Some(address));
    }

    #[test]
    fn evm_rejects_short_payloads(payload in "0x[0-9a-f]{0,39}") {
        prop_assert_eq!(filter_scan(&payload, AssetFamily::Evm), None);
    }

    #[test]
    fn evm_rejects_missing_prefix(body in "[0-9a-f]{42,50}") {
        prop_assume!(!body.starts_with("0x"));
        prop_assert_eq!(filter_scan(&body, AssetFamily::Evm), None);
    }

    #[test]
    fn evm_accepted_address_is_always_well_formed(payload in "(ethereum:)?0x[ -~]{0,60}") {
        if let Some(address) = filter_scan(&payload, AssetFamily::Evm) {
            prop_assert!(address.starts_with("0x"));
            prop_assert_eq!(address.chars().count(), 42);
        }
    }

    #[test]
    fn lightning_passes_anything_with_at_sign(user in "[a-z0-9._]{1,16}", domain in "[a-z0-9.]{1,16}") {
        let payload = format!("{}@{}", user, domain);
        prop_assert_eq!(filter_scan(&payload, AssetFamily::Lightning), Some(payload.clone()));
    }

    #[test]
    fn lightning_rejects_without_at_sign(payload in "[^@]{0,64}") {
        prop_assert_eq!(filter_scan(&payload, AssetFamily::Lightning), None);
    }
}
