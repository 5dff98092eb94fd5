//! Scanner input and address filtering.
//!
//! A scanner yields an endless stream of decode attempts. Only successful
//! decodes that pass [`filter_scan`] for the leg's address family ever
//! reach the flow controller.

use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::broadcast;
use tracing::debug;

const EVM_SCHEME: &str = "ethereum:";
const EVM_ADDRESS_LEN: usize = 42;

/// Address format expected by a leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetFamily {
    /// `0x` + 40 hex characters
    Evm,
    /// `user@domain` lightning address
    Lightning,
}

/// Accept or reject a decoded payload for the given family.
///
/// Returns the normalized address on accept.
pub fn filter_scan(payload: &str, family: AssetFamily) -> Option<String> {
    match family {
        AssetFamily::Evm => {
            let stripped = payload.strip_prefix(EVM_SCHEME).unwrap_or(payload);
            let candidate: String = stripped.chars().take(EVM_ADDRESS_LEN).collect();
            if candidate.starts_with("0x") && candidate.chars().count() == EVM_ADDRESS_LEN {
                Some(candidate)
            } else {
                None
            }
        }
        AssetFamily::Lightning => payload.contains('@').then(|| payload.to_string()),
    }
}

/// Failure reported by the decode pipeline for a single frame.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScanError {
    #[error("no code found in frame")]
    NotFound,
    #[error("decode failed: {0}")]
    Decode(String),
}

pub type ScanAttempt = Result<String, ScanError>;

/// Source of decode attempts.
pub trait Scanner: Send + Sync {
    /// Start a fresh sequence of attempts. Each call is independent, so a
    /// scan session can be stopped and restarted at will.
    fn attempts(&self) -> BoxStream<'static, ScanAttempt>;
}

/// Scanner fed from an external decode pipeline (a camera worker, or a
/// keyboard-wedge barcode reader) through a [`ScanFeed`].
pub struct ChannelScanner {
    tx: broadcast::Sender<ScanAttempt>,
}

/// Producer side of a [`ChannelScanner`].
#[derive(Clone)]
pub struct ScanFeed {
    tx: broadcast::Sender<ScanAttempt>,
}

impl ChannelScanner {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn feed(&self) -> ScanFeed {
        ScanFeed {
            tx: self.tx.clone(),
        }
    }
}

impl ScanFeed {
    /// Publish one attempt. Attempts made while nobody is scanning are dropped.
    pub fn push(&self, attempt: ScanAttempt) {
        if self.tx.send(attempt).is_err() {
            debug!("Scan attempt dropped, no active scan session");
        }
    }
}

impl Scanner for ChannelScanner {
    fn attempts(&self) -> BoxStream<'static, ScanAttempt> {
        let rx = self.tx.subscribe();
        stream::unfold(rx, |mut rx| async move {
            loop {
                match rx.recv().await {
                    Ok(attempt) => return Some((attempt, rx)),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        debug!("Scanner lagged, skipped {} attempts", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                }
            }
        })
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDRESS: &str = "0xABCDEF0000000000000000000000000000000001";

    #[test]
    fn evm_accepts_plain_address() {
        assert_eq!(filter_scan(ADDRESS, AssetFamily::Evm).as_deref(), Some(ADDRESS));
    }

    #[test]
    fn evm_strips_scheme_and_truncates() {
        let payload = format!("ethereum:{}extra", ADDRESS);
        assert_eq!(filter_scan(&payload, AssetFamily::Evm).as_deref(), Some(ADDRESS));
    }

    #[test]
    fn evm_rejects_short_or_unprefixed() {
        assert_eq!(filter_scan("0x1234", AssetFamily::Evm), None);
        assert_eq!(
            filter_scan("1xABCDEF0000000000000000000000000000000001", AssetFamily::Evm),
            None
        );
        assert_eq!(filter_scan("bob@example.com", AssetFamily::Evm), None);
    }

    #[test]
    fn lightning_requires_at_sign() {
        assert_eq!(
            filter_scan("satoshi@walletofsatoshi.com", AssetFamily::Lightning).as_deref(),
            Some("satoshi@walletofsatoshi.com")
        );
        assert_eq!(filter_scan(ADDRESS, AssetFamily::Lightning), None);
    }

    #[tokio::test]
    async fn channel_scanner_restarts() {
        let scanner = ChannelScanner::new(8);
        let feed = scanner.feed();

        let mut first = scanner.attempts();
        feed.push(Ok("one".to_string()));
        assert_eq!(first.next().await, Some(Ok("one".to_string())));
        drop(first);

        let mut second = scanner.attempts();
        feed.push(Err(ScanError::NotFound));
        feed.push(Ok("two".to_string()));
        assert_eq!(second.next().await, Some(Err(ScanError::NotFound)));
        assert_eq!(second.next().await, Some(Ok("two".to_string())));
    }
}
