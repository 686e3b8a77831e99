//! Cryptography used by the ECH offer and the partial TLS 1.3 handshake.
//!
//! The primitives come from RustCrypto crates and hpke-rs; this module
//! only adapts them to the message types in [`crate::msgs`].

pub mod cipher;
pub mod hpke;
pub mod kx;
