//! # echspec - a conformance checker for TLS Encrypted Client Hello
//! echspec connects to a TLS 1.3 server that publishes ECH configs and
//! checks that it follows the MUST-statements of the ECH draft: above
//! all, that it rejects malformed ECH offers with the alert the draft
//! requires.
//!
//! ## Checked requirements
//!
//! * 9: the configs include DHKEM(X25519, HKDF-SHA256) with
//!   HKDF-SHA256/AES-128-GCM.
//! * 5.1-9: non-zero padding of EncodedClientHelloInner is rejected.
//! * 5.1-10: broken `ech_outer_extensions` references are rejected.
//! * 7-5: unassigned ECHClientHello types are rejected.
//! * 7.1-11: a ClientHelloInner offering TLS 1.2 is rejected.
//! * 7.1-14.2.1: GREASE ECH is answered with `retry_configs`.
//! * 7.1.1-2 and 7.1.1-5: a broken second ClientHelloOuter after
//!   HelloRetryRequest is rejected.
//!
//! ## Non-features
//!
//! echspec is not a TLS client. It never validates certificates and
//! never completes a handshake; it reads exactly as far as each check
//! needs.
//!
//! ## Design
//!
//! Each check is a [`cases::Probe`] that opens its own connection and
//! returns an [`Outcome`]. The [`runner::Runner`] runs the selected
//! sections in order and collects a [`runner::Report`].
//!
//! Wire-level progress is logged through the `log` crate: run the
//! `echspec` binary with `RUST_LOG=echspec=trace` to see every record.

// Deny unsafe code, etc.
#![forbid(unsafe_code, unused_must_use)]
#![deny(unused_import_braces, unused_extern_crates)]
// Relax these clippy lints:
// - new_without_default: for internal constructors, the indirection is not
//   helpful
// - upper_case_acronyms: protocol constant names follow the registries
#![allow(clippy::new_without_default, clippy::upper_case_acronyms)]

#[macro_use]
mod msgs;
mod crypto;
mod enums;
mod error;
mod hash_hs;
mod rand;
mod tls13;

pub mod cases;
pub mod client;
pub mod ech_config;
pub mod message_stack;
pub mod outcome;
pub mod runner;

/// Internal classes which may be useful outside the library.
/// The contents of this section DO NOT form part of the stable interface.
pub mod internal {
    /// Low-level TLS message parsing and encoding functions.
    pub mod msgs {
        pub use crate::msgs::*;
    }
}

// The public interface is:
pub use crate::enums::{AlertDescription, CipherSuite, ContentType, HandshakeType, ProtocolVersion};
pub use crate::error::{ConfigError, Error, InvalidMessage};
pub use crate::msgs::ech::EchConfigPayload;
pub use crate::outcome::Outcome;
pub use crate::runner::{Report, RunConfig, Runner, Style};
