use crate::enums::{AlertDescription, ContentType, HandshakeType, ProtocolVersion};
use crate::error::{Error, InvalidMessage};
use crate::msgs::alert::AlertMessagePayload;
use crate::msgs::base::Payload;
use crate::msgs::ccs::ChangeCipherSpecPayload;
use crate::msgs::codec::{Codec, Reader};
use crate::msgs::handshake::{HandshakeMessagePayload, HandshakePayload};

#[derive(Clone, Debug, PartialEq)]
pub enum MessagePayload {
    Alert(AlertMessagePayload),
    Handshake {
        parsed: HandshakeMessagePayload,
        encoded: Payload,
    },
    ChangeCipherSpec(ChangeCipherSpecPayload),
    ApplicationData(Payload),
}

impl MessagePayload {
    pub fn handshake(parsed: HandshakeMessagePayload) -> Self {
        Self::Handshake {
            encoded: Payload::new(parsed.get_encoding()),
            parsed,
        }
    }

    /// Decode a non-handshake record body.
    ///
    /// Handshake bodies are split into messages by the connection, which
    /// may need several records to complete one.
    pub fn new(typ: ContentType, payload: Payload) -> Result<Self, InvalidMessage> {
        let mut r = Reader::init(payload.bytes());
        match typ {
            ContentType::ApplicationData => Ok(Self::ApplicationData(payload.clone())),
            ContentType::Alert => AlertMessagePayload::read(&mut r).map(MessagePayload::Alert),
            ContentType::ChangeCipherSpec => {
                ChangeCipherSpecPayload::read(&mut r).map(MessagePayload::ChangeCipherSpec)
            }
            _ => Err(InvalidMessage::InvalidContentType),
        }
    }

    pub fn content_type(&self) -> ContentType {
        match self {
            Self::Alert(_) => ContentType::Alert,
            Self::Handshake { .. } => ContentType::Handshake,
            Self::ChangeCipherSpec(_) => ContentType::ChangeCipherSpec,
            Self::ApplicationData(_) => ContentType::ApplicationData,
        }
    }
}

/// A TLS frame, named TLSPlaintext in the standard.
///
/// This type owns all memory for its interior parts. It is used to read/write from/to I/O
/// buffers as well as for fragmenting, joining and encryption/decryption. It can be converted
/// into a `Message` by decoding the payload.
#[derive(Clone, Debug, PartialEq)]
pub struct OpaqueMessage {
    pub typ: ContentType,
    pub version: ProtocolVersion,
    pub payload: Payload,
}

impl OpaqueMessage {
    /// `MessageError` allows callers to distinguish between valid prefixes (might
    /// become valid if we read more data) and invalid data.
    pub fn read(r: &mut Reader<'_>) -> Result<Self, MessageError> {
        let typ = ContentType::read(r).map_err(|_| MessageError::TooShortForHeader)?;
        // Don't accept any new content-types.
        if let ContentType::Unknown(_) = typ {
            return Err(MessageError::InvalidContentType);
        }

        let version = ProtocolVersion::read(r).map_err(|_| MessageError::TooShortForHeader)?;
        // Accept only versions 0x03XX for any XX.
        match version {
            ProtocolVersion::Unknown(ref v) if (v & 0xff00) != 0x0300 => {
                return Err(MessageError::UnknownProtocolVersion);
            }
            _ => {}
        };

        // Empty records are framed like any other; the reader skips them.
        let len = u16::read(r).map_err(|_| MessageError::TooShortForHeader)?;

        // Reject oversize messages
        if len >= Self::MAX_PAYLOAD {
            return Err(MessageError::MessageTooLarge);
        }

        let mut sub = r
            .sub(len as usize)
            .map_err(|_| MessageError::TooShortForLength)?;
        let payload = Payload::read(&mut sub);

        Ok(Self {
            typ,
            version,
            payload,
        })
    }

    pub fn encode(self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.typ.encode(&mut buf);
        self.version.encode(&mut buf);
        (self.payload.0.len() as u16).encode(&mut buf);
        buf.extend_from_slice(self.payload.bytes());
        buf
    }

    /// The record header this message carries on the wire; it is the AAD
    /// of TLS 1.3 record protection.
    pub fn header(&self) -> [u8; Self::HEADER_SIZE as usize] {
        let mut header = [0u8; Self::HEADER_SIZE as usize];
        header[0] = u8::from(self.typ);
        header[1..3].copy_from_slice(&self.version.to_array());
        header[3..5].copy_from_slice(&(self.payload.0.len() as u16).to_be_bytes());
        header
    }

    /// This is the maximum on-the-wire size of a TLSCiphertext.
    /// That's 2^14 payload bytes, a header, and a 2KB allowance
    /// for ciphertext overheads.
    pub const MAX_PAYLOAD: u16 = 16_384 + 2048;

    /// Content type, version and size.
    pub const HEADER_SIZE: u16 = 1 + 2 + 2;

    /// Maximum on-wire message size.
    pub const MAX_WIRE_SIZE: usize = (Self::MAX_PAYLOAD + Self::HEADER_SIZE) as usize;
}

/// A decoded TLS message.
#[derive(Clone, Debug, PartialEq)]
pub struct Message {
    pub version: ProtocolVersion,
    pub payload: MessagePayload,
}

impl Message {
    pub fn is_handshake_type(&self, hstyp: HandshakeType) -> bool {
        // Bit of a layering violation, but OK.
        if let MessagePayload::Handshake { parsed, .. } = &self.payload {
            parsed.typ == hstyp
        } else {
            false
        }
    }

    pub fn handshake_payload(&self) -> Option<&HandshakePayload> {
        match &self.payload {
            MessagePayload::Handshake { parsed, .. } => Some(&parsed.payload),
            _ => None,
        }
    }

    pub fn alert_description(&self) -> Option<AlertDescription> {
        match &self.payload {
            MessagePayload::Alert(alert) => Some(alert.description),
            _ => None,
        }
    }

    pub fn is_change_cipher_spec(&self) -> bool {
        matches!(self.payload, MessagePayload::ChangeCipherSpec(_))
    }

    /// The wire encoding of a handshake message, header included.
    pub fn handshake_encoding(&self) -> Result<&[u8], Error> {
        match &self.payload {
            MessagePayload::Handshake { encoded, .. } => Ok(encoded.bytes()),
            other => Err(Error::InappropriateMessage {
                expect_types: vec![ContentType::Handshake],
                got_type: other.content_type(),
            }),
        }
    }
}

/// A TLS frame after removal of any record protection.
#[derive(Clone, Debug, PartialEq)]
pub struct PlainMessage {
    pub typ: ContentType,
    pub version: ProtocolVersion,
    pub payload: Payload,
}

impl From<OpaqueMessage> for PlainMessage {
    fn from(msg: OpaqueMessage) -> Self {
        Self {
            typ: msg.typ,
            version: msg.version,
            payload: msg.payload,
        }
    }
}

#[derive(Debug, PartialEq)]
pub enum MessageError {
    TooShortForHeader,
    TooShortForLength,
    MessageTooLarge,
    InvalidContentType,
    UnknownProtocolVersion,
}
