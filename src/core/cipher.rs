//! Linear congruential keystream used by encrypted requests.
//!
//! The generator is seeded from the unmasked transmitted checksum and advanced
//! once per payload byte. Each keystream byte is bits 16..24 of the new state.
//! XOR is its own inverse, so the same routine encrypts and decrypts.

use crate::config::ProtocolConfig;

/// Expand a 32-bit checksum into the generator seed: low half repeated in both halves.
#[inline]
pub fn seed_from_checksum(checksum: i32) -> u32 {
    let c = checksum as u32;
    (c & 0xFFFF) | (c << 16)
}

/// Keystream generator over `state = (state * mul + add) mod modulus`, all in wrapping u32.
#[derive(Debug, Clone)]
pub struct KeystreamRng {
    state: u32,
    mul: u32,
    add: u32,
    modulus: u32,
}

impl KeystreamRng {
    pub fn new(seed: u32, mul: u32, add: u32, modulus: u32) -> Self {
        Self {
            state: seed,
            mul,
            add,
            modulus,
        }
    }

    /// Generator configured from `config` and seeded from `checksum`.
    pub fn for_checksum(config: &ProtocolConfig, checksum: i32) -> Self {
        Self::new(
            seed_from_checksum(checksum),
            config.rng_mul(),
            config.rng_add(),
            config.rng_mod(),
        )
    }

    /// Advance and return the new state.
    #[inline]
    pub fn next_state(&mut self) -> u32 {
        let raw = self.state.wrapping_mul(self.mul).wrapping_add(self.add);
        // Configs reject a zero modulus whenever the cipher can run.
        self.state = raw.checked_rem(self.modulus).unwrap_or(raw);
        self.state
    }

    /// Advance and return the keystream byte.
    #[inline]
    pub fn next_byte(&mut self) -> u8 {
        (self.next_state() >> 16) as u8
    }

    /// XOR `data` in place with the keystream.
    pub fn apply(&mut self, data: &mut [u8]) {
        for b in data.iter_mut() {
            *b ^= self.next_byte();
        }
    }
}
