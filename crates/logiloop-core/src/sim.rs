//! Determinism helpers.
//!
//! The engine is deterministic by construction: the same command sequence on
//! the same layout always produces the same container positions. A
//! [`StateHash`] over the engine state makes that cheap to check, e.g. by
//! running a scenario twice and comparing hashes.

use crate::node::Container;

/// A simple deterministic hash of simulation state.
///
/// Uses FNV-1a (64-bit) for speed and simplicity. Not cryptographic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateHash(pub u64);

impl StateHash {
    const FNV_OFFSET: u64 = 0xcbf29ce484222325;
    const FNV_PRIME: u64 = 0x100000001b3;

    /// Start a new hash.
    pub fn new() -> Self {
        Self(Self::FNV_OFFSET)
    }

    /// Feed bytes into the hash.
    pub fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u64;
            self.0 = self.0.wrapping_mul(Self::FNV_PRIME);
        }
    }

    pub fn write_u64(&mut self, v: u64) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.write(&v.to_le_bytes());
    }

    pub fn write_u8(&mut self, v: u8) {
        self.write(&[v]);
    }

    /// Feed one node slot: a presence tag, then the container's number and
    /// destination. Content is not hashed; it never affects movement.
    pub fn write_slot(&mut self, slot: Option<&Container>) {
        match slot {
            Some(container) => {
                self.write_u8(1);
                self.write_u32(container.transport_unit().0);
                self.write_u8(container.destination() as u8);
            }
            None => self.write_u8(0),
        }
    }

    /// Get the final hash value.
    pub fn finish(&self) -> u64 {
        self.0
    }
}

impl Default for StateHash {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_hash_is_offset_basis() {
        assert_eq!(StateHash::new().finish(), 0xcbf29ce484222325);
    }

    #[test]
    fn same_input_same_hash() {
        let mut a = StateHash::new();
        let mut b = StateHash::new();
        a.write_u64(42);
        a.write_u32(10001);
        b.write_u64(42);
        b.write_u32(10001);
        assert_eq!(a.finish(), b.finish());
    }

    #[test]
    fn order_matters() {
        let mut a = StateHash::new();
        let mut b = StateHash::new();
        a.write_u8(1);
        a.write_u8(2);
        b.write_u8(2);
        b.write_u8(1);
        assert_ne!(a.finish(), b.finish());
    }

    #[test]
    fn slot_hash_ignores_content_but_not_destination() {
        use crate::id::TransportUnitNumber;
        use crate::node::NodeType;

        let hash_of = |c: &Container| {
            let mut h = StateHash::new();
            h.write_slot(Some(c));
            h.finish()
        };
        let apples = Container::new(TransportUnitNumber(10001), "Apples", NodeType::Commissioning);
        let pears = Container::new(TransportUnitNumber(10001), "Pears", NodeType::Commissioning);
        let stored = Container::new(TransportUnitNumber(10001), "Apples", NodeType::Storage);
        assert_eq!(hash_of(&apples), hash_of(&pears));
        assert_ne!(hash_of(&apples), hash_of(&stored));

        let mut empty = StateHash::new();
        empty.write_slot(None);
        assert_ne!(empty.finish(), hash_of(&apples));
    }

    #[test]
    fn known_fnv1a_vector() {
        // FNV-1a 64 of "a".
        let mut h = StateHash::new();
        h.write(b"a");
        assert_eq!(h.finish(), 0xaf63dc4c8601ec8c);
    }
}
