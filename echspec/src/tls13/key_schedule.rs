//! The part of the TLS 1.3 key schedule that reaches the server's
//! handshake traffic keys.
//!
//! No PSK is ever offered, so the early secret is always derived from zeros.

use hkdf::Hkdf;
use sha2::{Sha256, Sha384};

use super::{HashAlgorithm, Tls13CipherSuite};
use crate::crypto::cipher::{Iv, NONCE_LEN};
use crate::error::Error;

/// The kinds of secret we can extract from `KeySchedule`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SecretKind {
    ClientHandshakeTrafficSecret,
    ServerHandshakeTrafficSecret,
    DerivedSecret,
}

impl SecretKind {
    fn to_bytes(self) -> &'static [u8] {
        use self::SecretKind::*;
        match self {
            ClientHandshakeTrafficSecret => b"c hs traffic",
            ServerHandshakeTrafficSecret => b"s hs traffic",
            DerivedSecret => b"derived",
        }
    }
}

/// The handshake secret, and the hash it was derived with.
pub struct KeySchedule {
    hash: HashAlgorithm,
    current: Vec<u8>,
}

impl KeySchedule {
    /// Run the schedule from the (PSK-less) early secret up to the
    /// handshake secret, mixing in the ECDHE `shared_secret`.
    pub fn new_handshake(hash: HashAlgorithm, shared_secret: &[u8]) -> Result<Self, Error> {
        let zeroes = vec![0u8; hash.output_len()];
        let early_secret = hkdf_extract(hash, &zeroes, &zeroes);
        let early = Self {
            hash,
            current: early_secret,
        };

        let empty_hash = hash.hash(&[]);
        let derived = early.derive(SecretKind::DerivedSecret, &empty_hash)?;
        Ok(Self {
            hash,
            current: hkdf_extract(hash, &derived, shared_secret),
        })
    }

    /// Derive-Secret(current, kind, transcript) with `hs_hash` being the
    /// transcript hash.
    pub fn derive(&self, kind: SecretKind, hs_hash: &[u8]) -> Result<Vec<u8>, Error> {
        hkdf_expand_label(
            self.hash,
            &self.current,
            kind.to_bytes(),
            hs_hash,
            self.hash.output_len(),
        )
    }

    /// The secret the schedule currently holds.
    pub fn secret(&self) -> &[u8] {
        &self.current
    }
}

/// Expand a traffic secret into the record protection key and IV.
pub fn derive_traffic_key_iv(
    suite: &Tls13CipherSuite,
    secret: &[u8],
) -> Result<(Vec<u8>, Iv), Error> {
    let key = hkdf_expand_label(suite.hash, secret, b"key", &[], suite.aead.key_len())?;
    let iv = hkdf_expand_label(suite.hash, secret, b"iv", &[], NONCE_LEN)?;
    Ok((key, Iv::copy(&iv)?))
}

fn hkdf_extract(hash: HashAlgorithm, salt: &[u8], ikm: &[u8]) -> Vec<u8> {
    match hash {
        HashAlgorithm::SHA256 => Hkdf::<Sha256>::extract(Some(salt), ikm)
            .0
            .to_vec(),
        HashAlgorithm::SHA384 => Hkdf::<Sha384>::extract(Some(salt), ikm)
            .0
            .to_vec(),
    }
}

/// [HKDF-Expand-Label] where the output length is `n`.
///
/// [HKDF-Expand-Label]: <https://www.rfc-editor.org/rfc/rfc8446#section-7.1>
pub fn hkdf_expand_label(
    hash: HashAlgorithm,
    secret: &[u8],
    label: &[u8],
    context: &[u8],
    n: usize,
) -> Result<Vec<u8>, Error> {
    const LABEL_PREFIX: &[u8] = b"tls13 ";

    let output_len = u16::to_be_bytes(n as u16);
    let label_len = u8::to_be_bytes((LABEL_PREFIX.len() + label.len()) as u8);
    let context_len = u8::to_be_bytes(context.len() as u8);

    let info = &[
        &output_len[..],
        &label_len[..],
        LABEL_PREFIX,
        label,
        &context_len[..],
        context,
    ];

    let mut okm = vec![0u8; n];
    let expanded = match hash {
        HashAlgorithm::SHA256 => Hkdf::<Sha256>::from_prk(secret)
            .map_err(|_| ())
            .and_then(|hk| {
                hk.expand_multi_info(info, &mut okm)
                    .map_err(|_| ())
            }),
        HashAlgorithm::SHA384 => Hkdf::<Sha384>::from_prk(secret)
            .map_err(|_| ())
            .and_then(|hk| {
                hk.expand_multi_info(info, &mut okm)
                    .map_err(|_| ())
            }),
    };

    expanded
        .map(|_| okm)
        .map_err(|_| Error::General("HKDF-Expand-Label failed".into()))
}
