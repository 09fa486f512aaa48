//! # Tracer Checksum
//!
//! The controller protects each telegram with a 16-bit check value produced by
//! two 8-bit shift registers and a fixed feedback network. The registers are
//! seeded with the first two bytes; every further byte is clocked in bit by bit,
//! MSB first, and whenever the bit leaving the first register is set the
//! feedback constants `0x10` / `0x41` are folded into both registers.
//!
//! Because the check value is transmitted high byte first, running the same
//! computation over a frame *including* its check value yields zero. Validation
//! is therefore "compute and expect zero", never "compute and compare".

use crate::constants::TRACER_CHECKSUM_INVALID_INPUT;

const FEEDBACK_HIGH: u8 = 0x10;
const FEEDBACK_LOW: u8 = 0x41;

/// Computes the check value over `data`.
///
/// Returns [`TRACER_CHECKSUM_INVALID_INPUT`] when fewer than two bytes are given.
pub fn checksum(data: &[u8]) -> u16 {
    let [r1_seed, r2_seed, rest @ ..] = data else {
        return TRACER_CHECKSUM_INVALID_INPUT;
    };

    let mut r1 = *r1_seed;
    let mut r2 = *r2_seed;

    for &byte in rest {
        let mut input = byte;
        for _ in 0..8 {
            let carry_out = r1 & 0x80 != 0;

            r1 = (r1 << 1) | (r2 >> 7);
            r2 = (r2 << 1) | (input >> 7);
            input <<= 1;

            if carry_out {
                r1 ^= FEEDBACK_HIGH;
                r2 ^= FEEDBACK_LOW;
            }
        }
    }

    u16::from(r1) << 8 | u16::from(r2)
}

/// True when `data` (address..checksum low byte) carries a valid check value.
pub fn verify(data: &[u8]) -> bool {
    data.len() >= 2 && checksum(data) == 0
}

/// Computes the check value for `data` with two zeroed checksum bytes appended
/// and returns it in wire order.
pub fn seal(data: &[u8]) -> [u8; 2] {
    let mut scratch = Vec::with_capacity(data.len() + 2);
    scratch.extend_from_slice(data);
    scratch.extend_from_slice(&[0, 0]);
    checksum(&scratch).to_be_bytes()
}
