use crate::enums::HandshakeType;
use crate::msgs::base::Payload;
use crate::msgs::codec::Codec;
use crate::msgs::handshake::{HandshakeMessagePayload, HandshakePayload};
use crate::msgs::message::{Message, MessagePayload};
use crate::tls13::HashAlgorithm;

/// Buffering of handshake payloads for the transcript hash.
///
/// We only learn the hash algorithm from ServerHello (or HelloRetryRequest),
/// and the transcript is short, so we keep every byte and hash on demand.
#[derive(Clone, Debug, Default)]
pub struct HandshakeHashBuffer {
    buffer: Vec<u8>,
}

impl HandshakeHashBuffer {
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Buffer a handshake message.
    pub fn add_message(&mut self, m: &Message) {
        if let MessagePayload::Handshake { encoded, .. } = &m.payload {
            self.update_raw(encoded.bytes());
        }
    }

    /// Buffer a byte slice.
    pub fn update_raw(&mut self, buf: &[u8]) {
        self.buffer.extend_from_slice(buf);
    }

    /// Get the current hash value under `alg`.
    pub fn get_current_hash(&self, alg: HashAlgorithm) -> Vec<u8> {
        alg.hash(&self.buffer)
    }

    /// Take the current hash value, and encapsulate it in a
    /// 'message_hash' handshake message.  Start the transcript
    /// again, with that message at the front.
    pub fn rollup_for_hrr(&mut self, alg: HashAlgorithm) {
        let old_hash = self.get_current_hash(alg);
        let old_handshake_hash_msg = HandshakeMessagePayload {
            typ: HandshakeType::MessageHash,
            payload: HandshakePayload::Unknown(Payload::new(old_hash)),
        };
        self.buffer = old_handshake_hash_msg.get_encoding();
    }
}
