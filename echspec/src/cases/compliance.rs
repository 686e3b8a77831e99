//! Section 9: the mandatory-to-implement HPKE cipher suite.
//!
//! This is checked against the published configs rather than by
//! connecting, see [`crate::ech_config::pick_compliant`].

pub const LABEL: &str = "9";

pub const URL: &str = "https://datatracker.ietf.org/doc/html/draft-ietf-tls-esni-17#section-9";

pub const DESCRIPTION: &str = "MUST implement the following HPKE cipher suite: KEM: \
                               DHKEM(X25519, HKDF-SHA256), KDF: HKDF-SHA256 and AEAD: \
                               AES-128-GCM.";
