use std::collections::VecDeque;

use crate::enums::{ContentType, ProtocolVersion};
use crate::error::InvalidMessage;
use crate::msgs::base::Payload;
use crate::msgs::codec::{self, Codec};
use crate::msgs::handshake::HandshakeMessagePayload;
use crate::msgs::message::{Message, MessagePayload, PlainMessage};

const HEADER_SIZE: usize = 1 + 3;

/// Servers under test send certificates at most; anything above
/// 64KB means we lost sync.
const MAX_HANDSHAKE_SIZE: u32 = 0xffff;

/// Reconstructs handshake messages from record payloads.
///
/// One record may carry several handshake messages and one message
/// may span several records; `frames` holds exactly one message per
/// entry, in arrival order.
#[derive(Debug, Default)]
pub struct HandshakeJoiner {
    /// Completed handshake messages for output.
    pub frames: VecDeque<Message>,

    /// Bytes of a message still being accumulated.
    buf: Vec<u8>,
}

enum BufferState {
    /// Buffer contains a header that introduces a message that is too long.
    MessageTooLarge,

    /// Buffer contains a full header and body.
    OneMessage,

    /// We need more data to see a header and complete body.
    NeedsMoreData,
}

impl HandshakeJoiner {
    pub fn new() -> Self {
        Self {
            frames: VecDeque::new(),
            buf: Vec::new(),
        }
    }

    /// Do we want to process this message?
    pub fn want_message(&self, msg: &PlainMessage) -> bool {
        msg.typ == ContentType::Handshake
    }

    #[cfg(test)]
    fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Take the record payload `msg`, and join/split it as needed.
    ///
    /// Returns how many complete messages were queued, which may be zero.
    pub fn take_message(&mut self, msg: PlainMessage) -> Result<usize, InvalidMessage> {
        if self.buf.is_empty() {
            self.buf = msg.payload.0;
        } else {
            self.buf
                .extend_from_slice(&msg.payload.0[..]);
        }

        let mut count = 0;
        loop {
            match self.buf_contains_message() {
                BufferState::MessageTooLarge => return Err(InvalidMessage::HandshakePayloadTooLarge),
                BufferState::NeedsMoreData => break,
                BufferState::OneMessage => {
                    self.deframe_one(msg.version)?;
                    count += 1;
                }
            }
        }

        Ok(count)
    }

    fn buf_contains_message(&self) -> BufferState {
        if self.buf.len() < HEADER_SIZE {
            return BufferState::NeedsMoreData;
        }

        let (header, rest) = self.buf.split_at(HEADER_SIZE);
        match codec::u24::read_bytes(&header[1..]) {
            Ok(len) if len.0 > MAX_HANDSHAKE_SIZE => BufferState::MessageTooLarge,
            Ok(len) if rest.len() >= usize::from(len) => BufferState::OneMessage,
            _ => BufferState::NeedsMoreData,
        }
    }

    /// Take a handshake message off the front of `buf`, and put it onto
    /// the back of `frames`.
    fn deframe_one(&mut self, version: ProtocolVersion) -> Result<(), InvalidMessage> {
        let used = {
            let mut rd = codec::Reader::init(&self.buf);
            let parsed = HandshakeMessagePayload::read(&mut rd)?;

            self.frames.push_back(Message {
                version,
                payload: MessagePayload::Handshake {
                    parsed,
                    encoded: Payload::new(&self.buf[..rd.used()]),
                },
            });
            rd.used()
        };
        self.buf = self.buf.split_off(used);
        Ok(())
    }
}
