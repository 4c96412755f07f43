//! Client-side slot storage.
//!
//! Slots hold JSON text, as a browser store would. Query packets live in
//! session slots; reference data lives in local slots that survive
//! [`ClientStorage::end_session`].

use crate::packet::ClientCachePacket;
use cinemetrics_core::QueryKind;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::warn;

/// How long a slot survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Durability {
    /// Cleared when the session ends.
    Session,
    /// Survives across sessions.
    Local,
}

impl Durability {
    /// Durability used for a query's packet.
    pub fn for_query(kind: QueryKind) -> Self {
        if kind.is_reference_data() {
            Durability::Local
        } else {
            Durability::Session
        }
    }
}

type Slots = HashMap<String, String>;

/// Named JSON slots in two durability classes.
#[derive(Debug, Default)]
pub struct ClientStorage {
    session: RwLock<Slots>,
    local: RwLock<Slots>,
}

impl ClientStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self, durability: Durability) -> &RwLock<Slots> {
        match durability {
            Durability::Session => &self.session,
            Durability::Local => &self.local,
        }
    }

    fn read_slots(&self, durability: Durability) -> RwLockReadGuard<'_, Slots> {
        self.slots(durability)
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn write_slots(&self, durability: Durability) -> RwLockWriteGuard<'_, Slots> {
        self.slots(durability)
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn read_raw(&self, durability: Durability, slot: &str) -> Option<String> {
        self.read_slots(durability).get(slot).cloned()
    }

    pub fn write_raw(&self, durability: Durability, slot: &str, json: impl Into<String>) {
        self.write_slots(durability)
            .insert(slot.to_string(), json.into());
    }

    /// Read and deserialize a slot. Malformed JSON reads as absent.
    pub fn read<T: DeserializeOwned>(&self, durability: Durability, slot: &str) -> Option<T> {
        let raw = self.read_raw(durability, slot)?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(slot, error = %e, "Failed to deserialize stored slot");
                None
            }
        }
    }

    /// Serialize and store a value.
    pub fn write<T: Serialize>(
        &self,
        durability: Durability,
        slot: &str,
        value: &T,
    ) -> Result<(), serde_json::Error> {
        let json = serde_json::to_string(value)?;
        self.write_raw(durability, slot, json);
        Ok(())
    }

    pub fn read_packet(&self, kind: QueryKind) -> Option<ClientCachePacket> {
        self.read(Durability::for_query(kind), kind.slot())
    }

    pub fn write_packet(
        &self,
        kind: QueryKind,
        packet: &ClientCachePacket,
    ) -> Result<(), serde_json::Error> {
        self.write(Durability::for_query(kind), kind.slot(), packet)
    }

    pub fn remove(&self, durability: Durability, slot: &str) -> Option<String> {
        self.write_slots(durability).remove(slot)
    }

    pub fn contains(&self, durability: Durability, slot: &str) -> bool {
        self.read_slots(durability).contains_key(slot)
    }

    /// Drop every session slot; local slots are kept.
    pub fn end_session(&self) {
        self.write_slots(Durability::Session).clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinemetrics_codec::EncodedTable;
    use cinemetrics_core::KeyArgs;

    #[test]
    fn test_packet_round_trip_through_slot() {
        let storage = ClientStorage::new();
        let packet = ClientCachePacket::fresh(
            KeyArgs::new().arg(&2000).fingerprint(),
            EncodedTable::from_text("QUJD"),
        );
        storage.write_packet(QueryKind::YearlyTrends, &packet).unwrap();

        assert_eq!(storage.read_packet(QueryKind::YearlyTrends), Some(packet));
        assert!(storage.contains(Durability::Session, "yearly-trends-cache"));
        assert_eq!(storage.read_packet(QueryKind::TopMovies), None);
    }

    #[test]
    fn test_malformed_slot_reads_as_absent() {
        let storage = ClientStorage::new();
        storage.write_raw(Durability::Session, "top-movies-cache", "{not json");
        assert_eq!(storage.read_packet(QueryKind::TopMovies), None);
    }

    #[test]
    fn test_end_session_keeps_local_slots() {
        let storage = ClientStorage::new();
        storage.write_raw(Durability::Session, "genre-trends-cache", "{}");
        storage.write_raw(Durability::Local, "genres-cache", r#"{"genres":[]}"#);

        storage.end_session();

        assert!(!storage.contains(Durability::Session, "genre-trends-cache"));
        assert!(storage.contains(Durability::Local, "genres-cache"));
    }

    #[test]
    fn test_durability_per_query() {
        assert_eq!(Durability::for_query(QueryKind::TopMovies), Durability::Session);
        assert_eq!(Durability::for_query(QueryKind::YearBounds), Durability::Local);
        assert_eq!(Durability::for_query(QueryKind::GenreCatalog), Durability::Local);
    }

    #[test]
    fn test_remove() {
        let storage = ClientStorage::new();
        storage.write_raw(Durability::Local, "year-range-cache", "{}");
        assert_eq!(
            storage.remove(Durability::Local, "year-range-cache").as_deref(),
            Some("{}")
        );
        assert_eq!(storage.remove(Durability::Local, "year-range-cache"), None);
    }
}
