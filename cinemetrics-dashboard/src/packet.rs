//! The client-held cache packet.
//!
//! One packet per chart query lives in session storage. Its JSON shape is
//! `{"cache_key": .., "data": .., "error": ..}` so that packets written by
//! earlier page loads keep reading back.

use cinemetrics_codec::EncodedTable;
use cinemetrics_core::Fingerprint;
use serde::{Deserialize, Serialize};

/// Placeholder error stored when a fetch succeeds with zero rows.
pub const NO_DATA: &str = "No data available";

/// `{fingerprint, payload, error}` for one query.
///
/// A completed fetch always leaves at least one of `payload` and `error`
/// set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCachePacket {
    #[serde(rename = "cache_key")]
    pub fingerprint: Fingerprint,
    #[serde(rename = "data", default)]
    pub payload: Option<EncodedTable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ClientCachePacket {
    /// A successful fetch.
    pub fn fresh(fingerprint: Fingerprint, payload: EncodedTable) -> Self {
        Self {
            fingerprint,
            payload: Some(payload),
            error: None,
        }
    }

    /// A failed or empty fetch with nothing to fall back on.
    pub fn errored(fingerprint: Fingerprint, reason: impl Into<String>) -> Self {
        Self {
            fingerprint,
            payload: None,
            error: Some(reason.into()),
        }
    }

    pub fn has_payload(&self) -> bool {
        self.payload.as_ref().is_some_and(|p| !p.is_empty())
    }

    pub fn matches(&self, fingerprint: &Fingerprint) -> bool {
        &self.fingerprint == fingerprint
    }

    /// Where this packet stands relative to the current fingerprint.
    pub fn state<'a>(&'a self, current: &'a Fingerprint) -> PacketState<'a> {
        let payload = self.payload.as_ref().filter(|p| !p.is_empty());
        if !self.matches(current) {
            return PacketState::Stale {
                payload,
                new_fingerprint: current,
            };
        }
        match (payload, self.error.as_deref()) {
            (retained, Some(reason)) => PacketState::Errored { reason, retained },
            (Some(payload), None) => PacketState::Fresh { payload },
            (None, None) => PacketState::Empty,
        }
    }
}

/// A held packet classified against the current fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketState<'a> {
    /// Nothing held yet.
    Empty,
    /// Held payload belongs to the current filters.
    Fresh { payload: &'a EncodedTable },
    /// Filters moved on; the held payload (if any) is for older filters.
    Stale {
        payload: Option<&'a EncodedTable>,
        new_fingerprint: &'a Fingerprint,
    },
    /// The last fetch for the current filters failed.
    Errored {
        reason: &'a str,
        retained: Option<&'a EncodedTable>,
    },
}

impl<'a> PacketState<'a> {
    /// Classify an optional packet; no packet is [`PacketState::Empty`].
    pub fn of(packet: Option<&'a ClientCachePacket>, current: &'a Fingerprint) -> Self {
        packet.map_or(PacketState::Empty, |p| p.state(current))
    }

    /// Whether a fetch is needed to reach the current filters.
    pub fn needs_fetch(&self) -> bool {
        matches!(self, PacketState::Empty | PacketState::Stale { .. })
    }
}
