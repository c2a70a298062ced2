//! Duplicate registries
//!
//! The orchestrator consults a registry before encoding a bundle. The
//! in-memory implementation covers intra-batch duplicates; the remote
//! implementation asks the external system itself, which is what makes
//! re-submitting the same CSV twice safe across runs. Both sit behind one
//! trait so they are interchangeable and independently testable.

use crate::codec::xml::{close, format_date, open, tag};
use crate::core::fingerprint::VoucherFingerprint;
use crate::delivery::transport::Transport;
use async_trait::async_trait;
use std::collections::HashSet;

/// Lookup/record interface over a set of known voucher fingerprints
#[async_trait]
pub trait DuplicateRegistry: Send {
    /// True when the fingerprint is already known
    async fn lookup(&mut self, fingerprint: &VoucherFingerprint) -> bool;

    /// Remember a fingerprint that has just been delivered
    fn record(&mut self, fingerprint: &VoucherFingerprint);
}

/// Intra-batch registry: a plain in-memory set of digests
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    seen: HashSet<String>,
}

impl InMemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DuplicateRegistry for InMemoryRegistry {
    async fn lookup(&mut self, fingerprint: &VoucherFingerprint) -> bool {
        self.seen.contains(fingerprint.digest())
    }

    fn record(&mut self, fingerprint: &VoucherFingerprint) {
        self.seen.insert(fingerprint.digest().to_string());
    }
}

/// Cross-run registry: counts matching vouchers in the external system
///
/// A lookup failure degrades to "not a duplicate" with a warning; the
/// external system still rejects true duplicates at import time, so
/// attempting delivery is the safe direction.
pub struct RemoteRegistry<T: Transport> {
    transport: T,
}

impl<T: Transport> RemoteRegistry<T> {
    pub fn new(transport: T) -> Self {
        RemoteRegistry { transport }
    }

    /// Count-export request for one voucher number and date
    fn count_request(fingerprint: &VoucherFingerprint) -> String {
        let mut buf = String::new();
        open(&mut buf, "ENVELOPE");
        open(&mut buf, "HEADER");
        tag(&mut buf, "TALLYREQUEST", "Export Data");
        close(&mut buf, "HEADER");
        open(&mut buf, "BODY");
        open(&mut buf, "EXPORTDATA");
        open(&mut buf, "REQUESTDESC");
        tag(&mut buf, "REPORTNAME", "Voucher Count");
        open(&mut buf, "STATICVARIABLES");
        tag(&mut buf, "SVVOUCHERNUMBER", fingerprint.number());
        tag(&mut buf, "SVVOUCHERDATE", &format_date(fingerprint.date()));
        close(&mut buf, "STATICVARIABLES");
        close(&mut buf, "REQUESTDESC");
        close(&mut buf, "EXPORTDATA");
        close(&mut buf, "BODY");
        close(&mut buf, "ENVELOPE");
        buf
    }

    fn parse_count(reply: &str) -> Option<u32> {
        let start = reply.find("<COUNT>")? + "<COUNT>".len();
        let end = reply[start..].find("</COUNT>")? + start;
        reply[start..end].trim().parse().ok()
    }
}

#[async_trait]
impl<T: Transport> DuplicateRegistry for RemoteRegistry<T> {
    async fn lookup(&mut self, fingerprint: &VoucherFingerprint) -> bool {
        let request = Self::count_request(fingerprint);
        match self.transport.exchange(&request).await {
            Ok(reply) => match Self::parse_count(&reply) {
                Some(count) => count > 0,
                None => {
                    tracing::warn!(
                        fingerprint = %fingerprint,
                        "count reply had no COUNT element, assuming not a duplicate"
                    );
                    false
                }
            },
            Err(error) => {
                tracing::warn!(
                    fingerprint = %fingerprint,
                    error = %error,
                    "remote duplicate lookup failed, assuming not a duplicate"
                );
                false
            }
        }
    }

    /// The external system records the voucher itself at import time
    fn record(&mut self, _fingerprint: &VoucherFingerprint) {}
}
