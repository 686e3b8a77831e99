use std::fmt::{self, Debug, Formatter};

use hpke_rs_crypto::types::{AeadAlgorithm, KdfAlgorithm, KemAlgorithm};
use hpke_rs_crypto::HpkeCrypto;
use hpke_rs_rust_crypto::HpkeRustCrypto;

use crate::error::Error;
use crate::msgs::ech::{HpkeKeyConfig, HpkeSymmetricCipherSuite};
use crate::msgs::enums::{HpkeAead, HpkeKdf, HpkeKem};

/// An HPKE suite, specifying a key encapsulation mechanism and a symmetric cipher suite.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct HpkeSuite {
    /// The choice of HPKE key encapsulation mechanism.
    pub kem: HpkeKem,

    /// The choice of HPKE symmetric cipher suite.
    pub sym: HpkeSymmetricCipherSuite,
}

impl HpkeSuite {
    /// Is this suite implemented by our HPKE backend?
    pub fn is_supported(&self) -> bool {
        let kem = KemAlgorithm::try_from(u16::from(self.kem)).ok();
        let kdf = KdfAlgorithm::try_from(u16::from(self.sym.kdf_id)).ok();
        let aead = AeadAlgorithm::try_from(u16::from(self.sym.aead_id)).ok();
        match (kem, kdf, aead) {
            (Some(kem), Some(kdf), Some(aead)) => {
                HpkeRustCrypto::supports_kem(kem).is_ok()
                    && HpkeRustCrypto::supports_kdf(kdf).is_ok()
                    && HpkeRustCrypto::supports_aead(aead).is_ok()
            }
            _ => false,
        }
    }

    /// Choose a suite for `key_config`.
    ///
    /// The config's KEM is fixed; the symmetric suite is the first of
    /// [`SYMMETRIC_SUITE_PREFERENCE`] the config lists and we support.
    pub fn select(key_config: &HpkeKeyConfig) -> Result<Self, Error> {
        SYMMETRIC_SUITE_PREFERENCE
            .iter()
            .filter(|sym| {
                key_config
                    .symmetric_cipher_suites
                    .contains(sym)
            })
            .map(|sym| Self {
                kem: key_config.kem_id,
                sym: *sym,
            })
            .find(Self::is_supported)
            .ok_or(Error::NoSupportedHpkeSuite)
    }
}

/// Symmetric suites we offer, most preferred first.
pub static SYMMETRIC_SUITE_PREFERENCE: &[HpkeSymmetricCipherSuite] = &[
    HpkeSymmetricCipherSuite {
        kdf_id: HpkeKdf::HKDF_SHA256,
        aead_id: HpkeAead::AES_128_GCM,
    },
    HpkeSymmetricCipherSuite {
        kdf_id: HpkeKdf::HKDF_SHA256,
        aead_id: HpkeAead::CHACHA20_POLY_1305,
    },
    HpkeSymmetricCipherSuite {
        kdf_id: HpkeKdf::HKDF_SHA256,
        aead_id: HpkeAead::AES_256_GCM,
    },
    HpkeSymmetricCipherSuite {
        kdf_id: HpkeKdf::HKDF_SHA384,
        aead_id: HpkeAead::AES_256_GCM,
    },
    HpkeSymmetricCipherSuite {
        kdf_id: HpkeKdf::HKDF_SHA384,
        aead_id: HpkeAead::AES_128_GCM,
    },
    HpkeSymmetricCipherSuite {
        kdf_id: HpkeKdf::HKDF_SHA512,
        aead_id: HpkeAead::AES_256_GCM,
    },
];

/// An HPKE sealer context.
///
/// This is a stateful object that can be used to seal messages for receipt by
/// a receiver.  Every seal consumes one AEAD sequence number.
pub trait HpkeSealer: Debug {
    /// Seal the provided `plaintext` with additional data `aad`, returning
    /// ciphertext.
    fn seal(&mut self, aad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, Error>;

    /// How many seals this context has performed.
    fn sequence_number(&self) -> u64;
}

/// Set up a base-mode sender context for `suite` against the recipient
/// public key `pub_key`.
///
/// Returns the encapsulated key `enc` and the sealer.
pub fn setup_sealer(
    suite: HpkeSuite,
    info: &[u8],
    pub_key: &[u8],
) -> Result<(Vec<u8>, Box<dyn HpkeSealer>), Error> {
    let mut hpke = start(suite)?;
    let pk_r = hpke_rs::HpkePublicKey::new(pub_key.to_vec());
    let (enc, context) = hpke
        .setup_sender(&pk_r, info, None, None, None)
        .map_err(hpke_err)?;
    Ok((enc.to_vec(), Box::new(HpkeRsSender { context, seq: 0 })))
}

fn start(suite: HpkeSuite) -> Result<hpke_rs::Hpke<HpkeRustCrypto>, Error> {
    if !suite.is_supported() {
        return Err(Error::NoSupportedHpkeSuite);
    }

    Ok(hpke_rs::Hpke::new(
        hpke_rs::Mode::Base,
        KemAlgorithm::try_from(u16::from(suite.kem)).map_err(hpke_err)?,
        KdfAlgorithm::try_from(u16::from(suite.sym.kdf_id)).map_err(hpke_err)?,
        AeadAlgorithm::try_from(u16::from(suite.sym.aead_id)).map_err(hpke_err)?,
    ))
}

struct HpkeRsSender {
    context: hpke_rs::Context<HpkeRustCrypto>,
    seq: u64,
}

impl Debug for HpkeRsSender {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("HpkeRsSender")
            .field("seq", &self.seq)
            .finish()
    }
}

impl HpkeSealer for HpkeRsSender {
    fn seal(&mut self, aad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, Error> {
        let ciphertext = self
            .context
            .seal(aad, plaintext)
            .map_err(hpke_err)?;
        self.seq += 1;
        Ok(ciphertext)
    }

    fn sequence_number(&self) -> u64 {
        self.seq
    }
}

fn hpke_err(err: impl Debug) -> Error {
    Error::Hpke(format!("{:?}", err))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::msgs::base::PayloadU16;

    pub(crate) const X25519_SUITE: HpkeSuite = HpkeSuite {
        kem: HpkeKem::DHKEM_X25519_HKDF_SHA256,
        sym: HpkeSymmetricCipherSuite {
            kdf_id: HpkeKdf::HKDF_SHA256,
            aead_id: HpkeAead::AES_128_GCM,
        },
    };

    /// The receiving side, as a server under test would hold it.
    pub(crate) struct Recipient {
        hpke: hpke_rs::Hpke<HpkeRustCrypto>,
        keypair: hpke_rs::HpkeKeyPair,
    }

    impl Recipient {
        pub(crate) fn new(suite: HpkeSuite) -> Self {
            let mut hpke = start(suite).unwrap();
            let keypair = hpke.generate_key_pair().unwrap();
            Self { hpke, keypair }
        }

        pub(crate) fn public_key(&self) -> Vec<u8> {
            self.keypair
                .public_key()
                .as_slice()
                .to_vec()
        }

        pub(crate) fn opener(&mut self, enc: &[u8], info: &[u8]) -> hpke_rs::Context<HpkeRustCrypto> {
            self.hpke
                .setup_receiver(enc, self.keypair.private_key(), info, None, None, None)
                .unwrap()
        }
    }

    fn key_config(suites: &[(HpkeKdf, HpkeAead)]) -> HpkeKeyConfig {
        HpkeKeyConfig {
            config_id: 1,
            kem_id: HpkeKem::DHKEM_X25519_HKDF_SHA256,
            public_key: PayloadU16::new(vec![0; 32]),
            symmetric_cipher_suites: suites
                .iter()
                .map(|(kdf_id, aead_id)| HpkeSymmetricCipherSuite {
                    kdf_id: *kdf_id,
                    aead_id: *aead_id,
                })
                .collect(),
        }
    }

    #[test]
    fn select_follows_our_preference() {
        let config = key_config(&[
            (HpkeKdf::HKDF_SHA384, HpkeAead::AES_256_GCM),
            (HpkeKdf::HKDF_SHA256, HpkeAead::AES_128_GCM),
        ]);
        assert_eq!(HpkeSuite::select(&config).unwrap(), X25519_SUITE);
    }

    #[test]
    fn select_rejects_unusable_configs() {
        let config = key_config(&[(HpkeKdf::Unknown(0x99), HpkeAead::AES_128_GCM)]);
        assert_eq!(HpkeSuite::select(&config), Err(Error::NoSupportedHpkeSuite));

        let mut config = key_config(&[(HpkeKdf::HKDF_SHA256, HpkeAead::AES_128_GCM)]);
        config.kem_id = HpkeKem::Unknown(0x77);
        assert_eq!(HpkeSuite::select(&config), Err(Error::NoSupportedHpkeSuite));
    }

    #[test]
    fn export_only_is_never_supported() {
        let suite = HpkeSuite {
            sym: HpkeSymmetricCipherSuite {
                kdf_id: HpkeKdf::HKDF_SHA256,
                aead_id: HpkeAead::EXPORT_ONLY,
            },
            ..X25519_SUITE
        };
        assert!(!suite.is_supported());
    }

    #[test]
    fn seals_are_sequenced() {
        let mut recipient = Recipient::new(X25519_SUITE);
        let (enc, mut sealer) =
            setup_sealer(X25519_SUITE, b"info", &recipient.public_key()).unwrap();
        assert_eq!(enc.len(), 32);

        let first = sealer.seal(b"aad", b"first").unwrap();
        let second = sealer.seal(b"aad", b"second").unwrap();
        assert_eq!(sealer.sequence_number(), 2);

        let mut opener = recipient.opener(&enc, b"info");
        assert_eq!(opener.open(b"aad", &first).unwrap(), b"first");
        assert_eq!(opener.open(b"aad", &second).unwrap(), b"second");
    }

    #[test]
    fn skipped_sequence_number_fails_to_open() {
        let mut recipient = Recipient::new(X25519_SUITE);
        let (enc, mut sealer) =
            setup_sealer(X25519_SUITE, b"info", &recipient.public_key()).unwrap();

        let first = sealer.seal(b"aad", b"first").unwrap();
        sealer.seal(b"", b"").unwrap();
        let third = sealer.seal(b"aad", b"third").unwrap();

        let mut opener = recipient.opener(&enc, b"info");
        assert_eq!(opener.open(b"aad", &first).unwrap(), b"first");
        assert!(opener.open(b"aad", &third).is_err());
    }
}
