use aes_gcm::aead::{self, Aead, KeyInit, Payload};

use crate::enums::{ContentType, ProtocolVersion};
use crate::error::Error;
use crate::msgs::base;
use crate::msgs::codec;
use crate::msgs::message::{OpaqueMessage, PlainMessage};

/// The AEAD algorithms TLS 1.3 record protection can use.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AeadAlgorithm {
    Aes128Gcm,
    Aes256Gcm,
    Chacha20Poly1305,
}

impl AeadAlgorithm {
    pub fn key_len(&self) -> usize {
        match self {
            Self::Aes128Gcm => 16,
            Self::Aes256Gcm | Self::Chacha20Poly1305 => 32,
        }
    }

    /// Build a decrypter for records protected under `key` and `iv`.
    pub fn decrypter(&self, key: &[u8], iv: Iv) -> Result<Box<dyn MessageDecrypter>, Error> {
        let bad_key = |_| Error::General(format!("bad {:?} key length {}", self, key.len()));
        let decrypter: Box<dyn MessageDecrypter> = match self {
            Self::Aes128Gcm => Box::new(Tls13Cipher(
                aes_gcm::Aes128Gcm::new_from_slice(key).map_err(bad_key)?,
                iv,
            )),
            Self::Aes256Gcm => Box::new(Tls13Cipher(
                aes_gcm::Aes256Gcm::new_from_slice(key).map_err(bad_key)?,
                iv,
            )),
            Self::Chacha20Poly1305 => Box::new(Tls13Cipher(
                chacha20poly1305::ChaCha20Poly1305::new_from_slice(key).map_err(bad_key)?,
                iv,
            )),
        };
        Ok(decrypter)
    }
}

/// Objects with this trait can decrypt TLS messages.
pub trait MessageDecrypter {
    /// Perform the decryption over the concerned TLS message.
    fn decrypt(&self, m: OpaqueMessage, seq: u64) -> Result<PlainMessage, Error>;

    /// For TLS1.3 (only), checks the length m.payload is valid and removes the padding.
    fn tls13_check_length_and_unpad(&self, mut msg: PlainMessage) -> Result<PlainMessage, Error> {
        let payload = &mut msg.payload.0;

        if payload.len() > MAX_FRAGMENT_LEN + 1 {
            return Err(Error::PeerSentOversizedRecord);
        }

        msg.typ = unpad_tls13(payload);
        if msg.typ == ContentType::Unknown(0) {
            return Err(Error::General("peer sent an all-zero TLSInnerPlaintext".into()));
        }

        if payload.len() > MAX_FRAGMENT_LEN {
            return Err(Error::PeerSentOversizedRecord);
        }

        msg.version = ProtocolVersion::TLSv1_3;
        Ok(msg)
    }
}

/// `v` is a message payload, immediately post-decryption.  This function
/// removes zero padding bytes, until a non-zero byte is encountered which is
/// the content type, which is returned.  See RFC8446 s5.2.
///
/// ContentType(0) is returned if the message payload is empty or all zeroes.
fn unpad_tls13(v: &mut Vec<u8>) -> ContentType {
    loop {
        match v.pop() {
            Some(0) => {}
            Some(content_type) => return ContentType::from(content_type),
            None => return ContentType::Unknown(0),
        }
    }
}

/// Largest plaintext a record may carry.
pub const MAX_FRAGMENT_LEN: usize = 16384;

/// Size of TLS nonces (incorrectly termed "IV" in standard) for all supported ciphersuites
/// (AES-GCM, Chacha20Poly1305)
pub const NONCE_LEN: usize = 12;

/// A write or read IV.
#[derive(Default)]
pub struct Iv([u8; NONCE_LEN]);

impl From<[u8; NONCE_LEN]> for Iv {
    fn from(bytes: [u8; NONCE_LEN]) -> Self {
        Self(bytes)
    }
}

impl Iv {
    /// Create a new `Iv` from a byte slice, of precisely `NONCE_LEN` bytes.
    pub fn copy(value: &[u8]) -> Result<Self, Error> {
        let bytes: [u8; NONCE_LEN] = value
            .try_into()
            .map_err(|_| Error::General(format!("bad IV length {}", value.len())))?;
        Ok(Self(bytes))
    }

    pub fn value(&self) -> &[u8; NONCE_LEN] {
        &self.0
    }
}

impl std::fmt::Debug for Iv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        base::hex(f, &self.0)
    }
}

/// Combine an `Iv` and sequence number to produce a unique nonce.
///
/// This is `iv ^ seq` where `seq` is encoded as a 96-bit big-endian integer.
#[inline]
pub fn make_nonce(iv: &Iv, seq: u64) -> [u8; NONCE_LEN] {
    let mut nonce = [0u8; NONCE_LEN];
    codec::put_u64(seq, &mut nonce[4..]);

    nonce
        .iter_mut()
        .zip(iv.0.iter())
        .for_each(|(nonce, iv)| {
            *nonce ^= *iv;
        });

    nonce
}

struct Tls13Cipher<A>(A, Iv);

impl<A: Aead> MessageDecrypter for Tls13Cipher<A> {
    fn decrypt(&self, msg: OpaqueMessage, seq: u64) -> Result<PlainMessage, Error> {
        // the record header is the additional data
        let aad = msg.header();
        let nonce = make_nonce(&self.1, seq);

        let plain = self
            .0
            .decrypt(
                aead::Nonce::<A>::from_slice(&nonce),
                Payload {
                    msg: msg.payload.bytes(),
                    aad: &aad,
                },
            )
            .map_err(|_| Error::DecryptError)?;

        let mut msg = PlainMessage::from(msg);
        msg.payload.0 = plain;
        self.tls13_check_length_and_unpad(msg)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::msgs::base::Payload as MsgPayload;

    /// Protect `plain` of type `typ` the way a TLS 1.3 server would.
    pub(crate) fn seal_record(
        aead_alg: AeadAlgorithm,
        key: &[u8],
        iv: &Iv,
        seq: u64,
        typ: ContentType,
        plain: &[u8],
    ) -> OpaqueMessage {
        let mut inner = plain.to_vec();
        inner.push(u8::from(typ));
        let len = inner.len() + 16;

        let mut msg = OpaqueMessage {
            typ: ContentType::ApplicationData,
            version: ProtocolVersion::TLSv1_2,
            payload: MsgPayload::new(vec![0; len]),
        };
        let aad = msg.header();
        let nonce = make_nonce(iv, seq);
        let payload = Payload {
            msg: &inner,
            aad: &aad,
        };

        let sealed = match aead_alg {
            AeadAlgorithm::Aes128Gcm => aes_gcm::Aes128Gcm::new_from_slice(key)
                .unwrap()
                .encrypt(aes_gcm::Nonce::from_slice(&nonce), payload),
            AeadAlgorithm::Aes256Gcm => aes_gcm::Aes256Gcm::new_from_slice(key)
                .unwrap()
                .encrypt(aes_gcm::Nonce::from_slice(&nonce), payload),
            AeadAlgorithm::Chacha20Poly1305 => {
                chacha20poly1305::ChaCha20Poly1305::new_from_slice(key)
                    .unwrap()
                    .encrypt(chacha20poly1305::Nonce::from_slice(&nonce), payload)
            }
        };
        msg.payload = MsgPayload::new(sealed.unwrap());
        msg
    }

    #[test]
    fn nonce_is_iv_xor_sequence() {
        let iv = Iv::from([0xff; NONCE_LEN]);
        let nonce = make_nonce(&iv, 0x0102);
        assert_eq!(
            nonce,
            [0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xfe, 0xfd]
        );
    }

    #[test]
    fn unpad_strips_zeros_and_returns_type() {
        let mut v = vec![1, 2, 0x16, 0, 0, 0];
        assert_eq!(unpad_tls13(&mut v), ContentType::Handshake);
        assert_eq!(v, vec![1, 2]);

        let mut v = vec![0, 0];
        assert_eq!(unpad_tls13(&mut v), ContentType::Unknown(0));
    }

    #[test]
    fn decrypts_each_algorithm() {
        for alg in [
            AeadAlgorithm::Aes128Gcm,
            AeadAlgorithm::Aes256Gcm,
            AeadAlgorithm::Chacha20Poly1305,
        ] {
            let key = vec![0x33; alg.key_len()];
            let iv = [7u8; NONCE_LEN];
            let record = seal_record(
                alg,
                &key,
                &Iv::from(iv),
                3,
                ContentType::Handshake,
                b"hello",
            );

            let decrypter = alg
                .decrypter(&key, Iv::from(iv))
                .unwrap();
            let plain = decrypter
                .decrypt(record.clone(), 3)
                .unwrap();
            assert_eq!(plain.typ, ContentType::Handshake);
            assert_eq!(plain.payload.bytes(), b"hello");

            // wrong sequence number
            assert_eq!(
                decrypter.decrypt(record, 4).unwrap_err(),
                Error::DecryptError
            );
        }
    }

    #[test]
    fn rejects_wrong_key_length() {
        assert!(AeadAlgorithm::Aes128Gcm
            .decrypter(&[0; 5], Iv::default())
            .is_err());
    }
}
