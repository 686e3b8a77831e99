use std::fmt;

use sha2::{Digest, Sha256, Sha384};

use crate::crypto::cipher::AeadAlgorithm;
use crate::enums::CipherSuite;
use crate::error::Error;

pub mod key_schedule;

/// Hash functions the TLS 1.3 suites we decrypt with are built on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HashAlgorithm {
    SHA256,
    SHA384,
}

impl HashAlgorithm {
    pub fn output_len(&self) -> usize {
        match self {
            Self::SHA256 => 32,
            Self::SHA384 => 48,
        }
    }

    pub fn hash(&self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::SHA256 => Sha256::digest(data).to_vec(),
            Self::SHA384 => Sha384::digest(data).to_vec(),
        }
    }
}

/// A TLS 1.3 cipher suite we can decrypt handshake records with.
pub struct Tls13CipherSuite {
    pub suite: CipherSuite,
    pub hash: HashAlgorithm,
    pub aead: AeadAlgorithm,
}

impl Tls13CipherSuite {
    /// Find the suite a server selected.
    pub fn lookup(suite: CipherSuite) -> Result<&'static Self, Error> {
        ALL_CIPHER_SUITES
            .iter()
            .copied()
            .find(|s| s.suite == suite)
            .ok_or(Error::UnsupportedCipherSuite(suite))
    }
}

impl PartialEq for Tls13CipherSuite {
    fn eq(&self, other: &Self) -> bool {
        self.suite == other.suite
    }
}

impl fmt::Debug for Tls13CipherSuite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tls13CipherSuite")
            .field("suite", &self.suite)
            .finish()
    }
}

/// The TLS13_AES_256_GCM_SHA384 cipher suite
pub static TLS13_AES_256_GCM_SHA384: Tls13CipherSuite = Tls13CipherSuite {
    suite: CipherSuite::TLS13_AES_256_GCM_SHA384,
    hash: HashAlgorithm::SHA384,
    aead: AeadAlgorithm::Aes256Gcm,
};

/// The TLS13_CHACHA20_POLY1305_SHA256 cipher suite
pub static TLS13_CHACHA20_POLY1305_SHA256: Tls13CipherSuite = Tls13CipherSuite {
    suite: CipherSuite::TLS13_CHACHA20_POLY1305_SHA256,
    hash: HashAlgorithm::SHA256,
    aead: AeadAlgorithm::Chacha20Poly1305,
};

/// The TLS13_AES_128_GCM_SHA256 cipher suite
pub static TLS13_AES_128_GCM_SHA256: Tls13CipherSuite = Tls13CipherSuite {
    suite: CipherSuite::TLS13_AES_128_GCM_SHA256,
    hash: HashAlgorithm::SHA256,
    aead: AeadAlgorithm::Aes128Gcm,
};

/// Every suite we offer, in the order they appear in ClientHello.
pub static ALL_CIPHER_SUITES: &[&Tls13CipherSuite] = &[
    &TLS13_AES_256_GCM_SHA384,
    &TLS13_CHACHA20_POLY1305_SHA256,
    &TLS13_AES_128_GCM_SHA256,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_known_and_unknown() {
        assert_eq!(
            Tls13CipherSuite::lookup(CipherSuite::TLS13_CHACHA20_POLY1305_SHA256).unwrap(),
            &TLS13_CHACHA20_POLY1305_SHA256
        );
        assert_eq!(
            Tls13CipherSuite::lookup(CipherSuite::TLS13_AES_128_CCM_SHA256).unwrap_err(),
            Error::UnsupportedCipherSuite(CipherSuite::TLS13_AES_128_CCM_SHA256)
        );
    }

    #[test]
    fn hash_lengths() {
        for alg in [HashAlgorithm::SHA256, HashAlgorithm::SHA384] {
            assert_eq!(alg.hash(b"").len(), alg.output_len());
        }
    }
}
