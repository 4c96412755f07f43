//! The stale-vs-fresh decision protocol.
//!
//! The gate is consulted twice per update cycle: once before fetching
//! ([`FreshnessGate::admit`]) and once with the fetch outcome
//! ([`FreshnessGate::resolve`]). It never performs I/O itself; it only
//! answers whether the cycle should go on and what packet to store.

use crate::packet::{ClientCachePacket, PacketState, NO_DATA};
use cinemetrics_codec::EncodedTable;
use cinemetrics_core::Fingerprint;
use tracing::warn;

/// Outcome of one gate decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision<T> {
    /// Carry on with `T`.
    Proceed(T),
    /// This event has no further observable effect.
    Skip,
    /// The cycle failed; the held packet stays as it is.
    Fail(String),
}

impl<T> GateDecision<T> {
    pub fn is_skip(&self) -> bool {
        matches!(self, GateDecision::Skip)
    }

    pub fn proceeded(self) -> Option<T> {
        match self {
            GateDecision::Proceed(value) => Some(value),
            _ => None,
        }
    }
}

/// What the data fetch produced, already encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Rows(EncodedTable),
    /// The call succeeded with zero rows.
    Empty,
    /// The call (or encoding its result) failed.
    Failed(String),
}

/// Per-query freshness policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct FreshnessGate;

impl FreshnessGate {
    pub fn new() -> Self {
        Self
    }

    /// Decide whether `current` needs a fetch at all.
    ///
    /// A held packet for the same fingerprint suppresses the fetch whatever
    /// it holds, so each distinct filter combination is fetched at most once.
    pub fn admit(
        &self,
        current: &Fingerprint,
        held: Option<&ClientCachePacket>,
    ) -> GateDecision<()> {
        if PacketState::of(held, current).needs_fetch() {
            GateDecision::Proceed(())
        } else {
            GateDecision::Skip
        }
    }

    /// Turn a fetch outcome into the packet to store.
    ///
    /// With a prior payload held, empty results are skipped and failures are
    /// reported without touching the packet. With nothing to fall back on,
    /// both become an error packet for `current`.
    pub fn resolve(
        &self,
        current: &Fingerprint,
        held: Option<&ClientCachePacket>,
        outcome: FetchOutcome,
    ) -> GateDecision<ClientCachePacket> {
        let retained = held.filter(|p| p.has_payload());

        match (outcome, retained) {
            (FetchOutcome::Rows(payload), _) => {
                GateDecision::Proceed(ClientCachePacket::fresh(current.clone(), payload))
            }
            (FetchOutcome::Empty, Some(prior)) => {
                warn!(
                    held = prior.fingerprint.short(),
                    current = current.short(),
                    "Empty result; keeping previously held data"
                );
                GateDecision::Skip
            }
            (FetchOutcome::Empty, None) => {
                GateDecision::Proceed(ClientCachePacket::errored(current.clone(), NO_DATA))
            }
            (FetchOutcome::Failed(reason), Some(_)) => GateDecision::Fail(reason),
            (FetchOutcome::Failed(reason), None) => {
                GateDecision::Proceed(ClientCachePacket::errored(current.clone(), reason))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinemetrics_core::KeyArgs;

    fn fp(tag: &str) -> Fingerprint {
        KeyArgs::new().arg(tag).fingerprint()
    }

    fn payload() -> EncodedTable {
        EncodedTable::from_text("UEFZTE9BRA==")
    }

    #[test]
    fn test_admit() {
        let gate = FreshnessGate::new();
        let a = fp("a");
        let held = ClientCachePacket::fresh(a.clone(), payload());
        let errored = ClientCachePacket::errored(a.clone(), "boom");

        assert_eq!(gate.admit(&a, None), GateDecision::Proceed(()));
        assert!(gate.admit(&a, Some(&held)).is_skip());
        assert!(gate.admit(&a, Some(&errored)).is_skip());
        assert_eq!(gate.admit(&fp("b"), Some(&held)), GateDecision::Proceed(()));
    }

    #[test]
    fn test_rows_replace_whatever_was_held() {
        let gate = FreshnessGate::new();
        let old = ClientCachePacket::errored(fp("a"), "boom");
        let decision = gate.resolve(&fp("b"), Some(&old), FetchOutcome::Rows(payload()));
        assert_eq!(
            decision,
            GateDecision::Proceed(ClientCachePacket::fresh(fp("b"), payload()))
        );
    }

    #[test]
    fn test_empty_result() {
        let gate = FreshnessGate::new();
        let prior = ClientCachePacket::fresh(fp("a"), payload());

        assert!(gate
            .resolve(&fp("b"), Some(&prior), FetchOutcome::Empty)
            .is_skip());
        assert_eq!(
            gate.resolve(&fp("b"), None, FetchOutcome::Empty),
            GateDecision::Proceed(ClientCachePacket::errored(fp("b"), NO_DATA))
        );
    }

    #[test]
    fn test_failure_never_clobbers_payload() {
        let gate = FreshnessGate::new();
        let prior = ClientCachePacket::fresh(fp("a"), payload());

        assert_eq!(
            gate.resolve(&fp("b"), Some(&prior), FetchOutcome::Failed("timeout".into())),
            GateDecision::Fail("timeout".to_string())
        );
        assert_eq!(
            gate.resolve(&fp("b"), None, FetchOutcome::Failed("timeout".into()))
                .proceeded(),
            Some(ClientCachePacket::errored(fp("b"), "timeout"))
        );
    }

    #[test]
    fn test_error_packet_without_payload_is_replaced() {
        let gate = FreshnessGate::new();
        let prior = ClientCachePacket::errored(fp("a"), NO_DATA);
        assert_eq!(
            gate.resolve(&fp("b"), Some(&prior), FetchOutcome::Failed("down".into())),
            GateDecision::Proceed(ClientCachePacket::errored(fp("b"), "down"))
        );
    }
}
