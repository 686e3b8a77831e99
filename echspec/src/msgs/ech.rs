use crate::enums::EchClientHelloType;
use crate::error::InvalidMessage;
use crate::msgs::base::{PayloadU16, PayloadU8};
use crate::msgs::codec::{
    encode_vec_u16, read_vec_u16, Codec, LengthPrefixedBuffer, ListLength, Reader,
};
use crate::msgs::enums::{EchVersion, HpkeAead, HpkeKdf, HpkeKem};

/// Prefix of the HPKE `info` parameter; the full ECHConfig follows it.
const HPKE_INFO_PREFIX: &[u8] = b"tls ech\0";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HpkeSymmetricCipherSuite {
    pub kdf_id: HpkeKdf,
    pub aead_id: HpkeAead,
}

impl Codec<'_> for HpkeSymmetricCipherSuite {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.kdf_id.encode(bytes);
        self.aead_id.encode(bytes);
    }

    fn read(r: &mut Reader<'_>) -> Result<Self, InvalidMessage> {
        Ok(Self {
            kdf_id: HpkeKdf::read(r)?,
            aead_id: HpkeAead::read(r)?,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct HpkeKeyConfig {
    pub config_id: u8,
    pub kem_id: HpkeKem,
    pub public_key: PayloadU16,
    pub symmetric_cipher_suites: Vec<HpkeSymmetricCipherSuite>,
}

impl Codec<'_> for HpkeKeyConfig {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.config_id.encode(bytes);
        self.kem_id.encode(bytes);
        self.public_key.encode(bytes);
        encode_vec_u16(bytes, &self.symmetric_cipher_suites);
    }

    fn read(r: &mut Reader<'_>) -> Result<Self, InvalidMessage> {
        Ok(Self {
            config_id: u8::read(r)?,
            kem_id: HpkeKem::read(r)?,
            public_key: PayloadU16::read(r)?,
            symmetric_cipher_suites: read_vec_u16::<HpkeSymmetricCipherSuite>(r)?,
        })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EchConfigContents {
    pub key_config: HpkeKeyConfig,
    pub maximum_name_length: u8,
    pub public_name: String,
    /// ECHConfig extensions, kept as their encoded list.
    pub extensions: PayloadU16,
}

impl Codec<'_> for EchConfigContents {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.key_config.encode(bytes);
        self.maximum_name_length.encode(bytes);
        PayloadU8::new(self.public_name.as_bytes().to_vec()).encode(bytes);
        self.extensions.encode(bytes);
    }

    fn read(r: &mut Reader<'_>) -> Result<Self, InvalidMessage> {
        let key_config = HpkeKeyConfig::read(r)?;
        let maximum_name_length = u8::read(r)?;
        let public_name = String::from_utf8(PayloadU8::read(r)?.0)
            .map_err(|_| InvalidMessage::InvalidServerName)?;
        Ok(Self {
            key_config,
            maximum_name_length,
            public_name,
            extensions: PayloadU16::read(r)?,
        })
    }
}

/// An encrypted client hello (ECH) config.
#[derive(Clone, Debug, PartialEq)]
pub enum EchConfigPayload {
    /// A recognised V18 ECH configuration.
    V18(EchConfigContents),
    /// An unknown version ECH configuration.
    Unknown {
        version: EchVersion,
        contents: PayloadU16,
    },
}

impl EchConfigPayload {
    pub fn contents(&self) -> Option<&EchConfigContents> {
        match self {
            Self::V18(contents) => Some(contents),
            Self::Unknown { .. } => None,
        }
    }

    /// The HPKE `info` bound to this config: `"tls ech" || 0x00 || ECHConfig`.
    pub fn hpke_info(&self) -> Vec<u8> {
        let mut info = HPKE_INFO_PREFIX.to_vec();
        self.encode(&mut info);
        info
    }
}

impl Codec<'_> for EchConfigPayload {
    fn encode(&self, bytes: &mut Vec<u8>) {
        match self {
            Self::V18(contents) => {
                EchVersion::V18.encode(bytes);
                let inner = LengthPrefixedBuffer::new(ListLength::U16, bytes);
                contents.encode(inner.buf);
            }
            Self::Unknown { version, contents } => {
                version.encode(bytes);
                contents.encode(bytes);
            }
        }
    }

    fn read(r: &mut Reader<'_>) -> Result<Self, InvalidMessage> {
        let version = EchVersion::read(r)?;
        let length = u16::read(r)?;
        let mut contents = r.sub(usize::from(length))?;

        Ok(match version {
            EchVersion::V18 => {
                let parsed = EchConfigContents::read(&mut contents)?;
                contents.expect_empty("EchConfigContents")?;
                Self::V18(parsed)
            }
            _ => Self::Unknown {
                version,
                contents: PayloadU16::new(contents.rest().to_vec()),
            },
        })
    }
}

/// Encode `configs` as an `ECHConfigList`: a u16 length and the configs.
pub fn encode_ech_config_list(configs: &[EchConfigPayload]) -> Vec<u8> {
    let mut bytes = Vec::new();
    encode_vec_u16(&mut bytes, configs);
    bytes
}

#[derive(Clone, Debug, PartialEq)]
pub struct EncryptedClientHelloOuter {
    pub cipher_suite: HpkeSymmetricCipherSuite,
    pub config_id: u8,
    pub enc: PayloadU16,
    pub payload: PayloadU16,
}

impl Codec<'_> for EncryptedClientHelloOuter {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.cipher_suite.encode(bytes);
        self.config_id.encode(bytes);
        self.enc.encode(bytes);
        self.payload.encode(bytes);
    }

    fn read(r: &mut Reader<'_>) -> Result<Self, InvalidMessage> {
        Ok(Self {
            cipher_suite: HpkeSymmetricCipherSuite::read(r)?,
            config_id: u8::read(r)?,
            enc: PayloadU16::read(r)?,
            payload: PayloadU16::read(r)?,
        })
    }
}

/// The `encrypted_client_hello` extension as offered by a client.
///
/// `Illegal` is the non-conformant layout: an unassigned type tag,
/// optionally followed by outer-form fields.
#[derive(Clone, Debug, PartialEq)]
pub enum EncryptedClientHello {
    Outer(EncryptedClientHelloOuter),
    Inner,
    Illegal {
        typ: EchClientHelloType,
        outer: Option<EncryptedClientHelloOuter>,
    },
}

impl Codec<'_> for EncryptedClientHello {
    fn encode(&self, bytes: &mut Vec<u8>) {
        match self {
            Self::Outer(payload) => {
                EchClientHelloType::ClientHelloOuter.encode(bytes);
                payload.encode(bytes);
            }
            Self::Inner => EchClientHelloType::ClientHelloInner.encode(bytes),
            Self::Illegal { typ, outer } => {
                typ.encode(bytes);
                if let Some(outer) = outer {
                    outer.encode(bytes);
                }
            }
        }
    }

    fn read(r: &mut Reader<'_>) -> Result<Self, InvalidMessage> {
        match EchClientHelloType::read(r)? {
            EchClientHelloType::ClientHelloOuter => {
                Ok(Self::Outer(EncryptedClientHelloOuter::read(r)?))
            }
            EchClientHelloType::ClientHelloInner => Ok(Self::Inner),
            typ => Ok(Self::Illegal {
                typ,
                outer: match r.any_left() {
                    true => Some(EncryptedClientHelloOuter::read(r)?),
                    false => None,
                },
            }),
        }
    }
}

/// The `encrypted_client_hello` extension sent by a server in EncryptedExtensions.
#[derive(Clone, Debug, PartialEq)]
pub struct ServerEncryptedClientHello {
    pub retry_configs: Vec<EchConfigPayload>,
}

impl Codec<'_> for ServerEncryptedClientHello {
    fn encode(&self, bytes: &mut Vec<u8>) {
        encode_vec_u16(bytes, &self.retry_configs);
    }

    fn read(r: &mut Reader<'_>) -> Result<Self, InvalidMessage> {
        Ok(Self {
            retry_configs: read_vec_u16::<EchConfigPayload>(r)?,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_config(
        config_id: u8,
        kem_id: HpkeKem,
        suites: &[(HpkeKdf, HpkeAead)],
    ) -> EchConfigPayload {
        EchConfigPayload::V18(EchConfigContents {
            key_config: HpkeKeyConfig {
                config_id,
                kem_id,
                public_key: PayloadU16::new(vec![0x42; 32]),
                symmetric_cipher_suites: suites
                    .iter()
                    .map(|(kdf_id, aead_id)| HpkeSymmetricCipherSuite {
                        kdf_id: *kdf_id,
                        aead_id: *aead_id,
                    })
                    .collect(),
            },
            maximum_name_length: 0,
            public_name: "public.example".to_string(),
            extensions: PayloadU16::empty(),
        })
    }

    #[test]
    fn config_round_trips() {
        let config = sample_config(
            7,
            HpkeKem::DHKEM_X25519_HKDF_SHA256,
            &[(HpkeKdf::HKDF_SHA256, HpkeAead::AES_128_GCM)],
        );
        let bytes = config.get_encoding();
        assert_eq!(&bytes[..2], &[0xfe, 0x0d]);
        assert_eq!(EchConfigPayload::read_bytes(&bytes).unwrap(), config);
    }

    #[test]
    fn unknown_version_is_kept_opaque() {
        let bytes = [0xfe, 0x0a, 0x00, 0x02, 0xaa, 0xbb];
        let config = EchConfigPayload::read_bytes(&bytes).unwrap();
        assert_eq!(
            config,
            EchConfigPayload::Unknown {
                version: EchVersion::Unknown(0xfe0a),
                contents: PayloadU16::new(vec![0xaa, 0xbb]),
            }
        );
        assert!(config.contents().is_none());
        assert_eq!(config.get_encoding(), bytes.to_vec());
    }

    #[test]
    fn truncated_config_is_an_error() {
        let config = sample_config(
            1,
            HpkeKem::DHKEM_X25519_HKDF_SHA256,
            &[(HpkeKdf::HKDF_SHA256, HpkeAead::AES_128_GCM)],
        );
        let bytes = config.get_encoding();
        assert!(EchConfigPayload::read_bytes(&bytes[..bytes.len() - 1]).is_err());
    }

    #[test]
    fn hpke_info_covers_whole_config() {
        let config = sample_config(1, HpkeKem::DHKEM_X25519_HKDF_SHA256, &[]);
        let info = config.hpke_info();
        assert!(info.starts_with(b"tls ech\0"));
        assert_eq!(&info[8..], &config.get_encoding()[..]);
    }

    #[test]
    fn illegal_ech_types_encode_tag_then_body() {
        let inner = EncryptedClientHello::Illegal {
            typ: EchClientHelloType::Unknown(0x03),
            outer: None,
        };
        assert_eq!(inner.get_encoding(), vec![0x03]);

        let outer = EncryptedClientHelloOuter {
            cipher_suite: HpkeSymmetricCipherSuite {
                kdf_id: HpkeKdf::HKDF_SHA256,
                aead_id: HpkeAead::AES_128_GCM,
            },
            config_id: 9,
            enc: PayloadU16::new(vec![1, 2]),
            payload: PayloadU16::new(vec![3]),
        };
        let illegal = EncryptedClientHello::Illegal {
            typ: EchClientHelloType::Unknown(0x02),
            outer: Some(outer.clone()),
        };
        let mut conformant = EncryptedClientHello::Outer(outer).get_encoding();
        conformant[0] = 0x02;
        assert_eq!(illegal.get_encoding(), conformant);
        assert_eq!(EncryptedClientHello::read_bytes(&conformant).unwrap(), illegal);
    }

    #[test]
    fn retry_configs_decode() {
        let config = sample_config(
            3,
            HpkeKem::DHKEM_X25519_HKDF_SHA256,
            &[(HpkeKdf::HKDF_SHA256, HpkeAead::AES_128_GCM)],
        );
        let bytes = encode_ech_config_list(&[config.clone()]);
        let ext = ServerEncryptedClientHello::read_bytes(&bytes).unwrap();
        assert_eq!(ext.retry_configs, vec![config]);
    }
}
