//! Shared deterministic primitives for the Folio document engine.
//!
//! Everything downstream that derives an identifier, hashes rendered content
//! or draws a "random" value goes through this crate. Identical inputs must
//! produce identical outputs on every platform, so both the hash and the RNG
//! are fixed algorithms rather than `std::hash`/`rand` (whose outputs are
//! allowed to vary between versions and processes).

pub mod rng;
pub mod stable_hash;

pub use rng::RngStream;
pub use stable_hash::{fnv1a64, fnv1a64_mix, fnv1a64_str, FNV1A_OFFSET_BASIS_64};
