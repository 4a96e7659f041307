use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::history::HandHistory;

const DOMAIN_DOCUMENT: &[u8] = b"voice-hand-history/document/v1";

/// SHA-256 over a committed document. Equal documents hash equal, so an
/// unchanged hash after a fragment means nothing was written.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StateHash([u8; 32]);

impl StateHash {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn zero() -> Self {
        Self([0u8; 32])
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First eight hex digits, for log lines.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl From<[u8; 32]> for StateHash {
    fn from(bytes: [u8; 32]) -> Self {
        StateHash::new(bytes)
    }
}

impl fmt::Display for StateHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for StateHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StateHash({})", self.short())
    }
}

impl Serialize for StateHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for StateHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(&raw, &mut bytes).map_err(serde::de::Error::custom)?;
        Ok(StateHash(bytes))
    }
}

pub fn hash_document(hand: &HandHistory) -> StateHash {
    let mut hasher = Sha256::new();
    hasher.update(DOMAIN_DOCUMENT);
    // Struct fields serialize in declaration order and `extra` is a sorted
    // map, so the encoding is canonical.
    match serde_json::to_vec(hand) {
        Ok(encoded) => hasher.update(&encoded),
        Err(_) => hasher.update(b"unserializable"),
    }
    let digest = hasher.finalize();
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&digest);
    StateHash(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::fixtures::{heads_up_preflop, three_handed_to_river};
    use crate::test_utils::serde::assert_round_trip_eq;

    #[test]
    fn equal_documents_hash_equal() {
        assert_eq!(
            hash_document(&heads_up_preflop()),
            hash_document(&heads_up_preflop())
        );
        assert_ne!(
            hash_document(&heads_up_preflop()),
            hash_document(&three_handed_to_river())
        );
        assert_ne!(hash_document(&heads_up_preflop()), StateHash::zero());
    }

    #[test]
    fn any_field_change_moves_the_hash() {
        let base = heads_up_preflop();
        let mut changed = base.clone();
        changed.rounds[0].actions[2].amount = Some(8.0);
        assert_ne!(hash_document(&base), hash_document(&changed));
    }

    #[test]
    fn serializes_as_hex() {
        let hash = hash_document(&heads_up_preflop());
        let json = serde_json::to_value(hash).unwrap();
        assert_eq!(json.as_str().map(str::len), Some(64));
        assert_round_trip_eq(&hash);
        assert_eq!(hash.short().len(), 8);
    }
}
