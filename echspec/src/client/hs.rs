use std::io::{Read, Write};

use log::{debug, trace};

use crate::crypto::cipher::MessageDecrypter;
use crate::crypto::kx::{KeyExchange, ALL_KX_GROUPS};
use crate::enums::{CipherSuite, ContentType, ProtocolVersion, SignatureScheme};
use crate::error::{Error, InvalidMessage};
use crate::hash_hs::HandshakeHashBuffer;
use crate::message_stack::MessageStack;
use crate::msgs::base::Payload;
use crate::msgs::codec::Codec;
use crate::msgs::deframer::MessageDeframer;
use crate::msgs::enums::{Compression, NamedGroup};
use crate::msgs::handshake::{
    ClientExtension, ClientExtensions, ClientHelloPayload, HandshakeMessagePayload,
    HandshakePayload, HelloRetryRequest, KeyShareEntry, Random, ServerExtension,
    ServerHelloPayload, SessionId,
};
use crate::msgs::hsjoiner::HandshakeJoiner;
use crate::msgs::message::{Message, MessagePayload, OpaqueMessage, PlainMessage};
use crate::tls13::key_schedule::{derive_traffic_key_iv, KeySchedule, SecretKind};
use crate::tls13::Tls13CipherSuite;

/// Signature schemes offered in every ClientHello.
static SIGNATURE_SCHEMES: &[SignatureScheme] = &[
    SignatureScheme::ECDSA_NISTP256_SHA256,
    SignatureScheme::ECDSA_NISTP384_SHA384,
    SignatureScheme::ECDSA_NISTP521_SHA512,
    SignatureScheme::RSA_PSS_SHA256,
    SignatureScheme::RSA_PSS_SHA384,
    SignatureScheme::RSA_PSS_SHA512,
    SignatureScheme::RSA_PKCS1_SHA256,
    SignatureScheme::RSA_PKCS1_SHA384,
    SignatureScheme::RSA_PKCS1_SHA512,
];

static CIPHER_SUITES: &[CipherSuite] = &[
    CipherSuite::TLS13_AES_256_GCM_SHA384,
    CipherSuite::TLS13_CHACHA20_POLY1305_SHA256,
    CipherSuite::TLS13_AES_128_GCM_SHA256,
];

/// A TLS record stream over `T`.
///
/// Writes are always plaintext. Reads are plaintext until a
/// decrypter is installed, after which protected records are opened
/// with it. ChangeCipherSpec records are dropped.
pub struct Connection<T> {
    sock: T,
    deframer: MessageDeframer,
    joiner: HandshakeJoiner,
    decrypter: Option<Box<dyn MessageDecrypter>>,
    read_seq: u64,
    sent_hello: bool,
}

impl<T: Read + Write> Connection<T> {
    pub fn new(sock: T) -> Self {
        Self {
            sock,
            deframer: MessageDeframer::new(),
            joiner: HandshakeJoiner::new(),
            decrypter: None,
            read_seq: 0,
            sent_hello: false,
        }
    }

    /// Send `hs` in a single Handshake record, returning it as a
    /// [`Message`] for the transcript.
    pub fn send_handshake(&mut self, hs: HandshakeMessagePayload) -> Result<Message, Error> {
        // RFC 8446 allows 0x0301 on the very first record.
        let version = match self.sent_hello {
            false => ProtocolVersion::TLSv1_0,
            true => ProtocolVersion::TLSv1_2,
        };
        self.sent_hello = true;

        let msg = Message {
            version,
            payload: MessagePayload::handshake(hs),
        };
        let record = OpaqueMessage {
            typ: ContentType::Handshake,
            version,
            payload: Payload::new(msg.handshake_encoding()?.to_vec()),
        };
        trace!("Sending {:?} record of {} bytes", record.typ, record.payload.0.len());
        self.sock.write_all(&record.encode())?;
        self.sock.flush()?;
        Ok(msg)
    }

    /// Open records read from now on with `decrypter`.
    pub fn set_message_decrypter(&mut self, decrypter: Box<dyn MessageDecrypter>) {
        self.decrypter = Some(decrypter);
        self.read_seq = 0;
    }

    /// Return the next message, in arrival order.
    ///
    /// Handshake messages sharing a record are returned one per call.
    pub fn read_message(&mut self) -> Result<Message, Error> {
        loop {
            if let Some(msg) = self.joiner.frames.pop_front() {
                return Ok(msg);
            }

            if let Some(record) = self.deframer.frames.pop_front() {
                if let Some(msg) = self.process_record(record)? {
                    return Ok(msg);
                }
                continue;
            }

            if self.deframer.desynced {
                return Err(InvalidMessage::InvalidContentType.into());
            }

            if self.deframer.read(&mut self.sock)? == 0 {
                debug!("Peer closed the connection");
                return Err(Error::ConnectionClosed);
            }
        }
    }

    /// Decrypt and decode one record. Handshake bodies go to the joiner.
    fn process_record(&mut self, record: OpaqueMessage) -> Result<Option<Message>, Error> {
        trace!("Received {:?} record of {} bytes", record.typ, record.payload.0.len());
        if record.typ == ContentType::ChangeCipherSpec {
            trace!("Dropping CCS");
            return Ok(None);
        }
        if record.payload.0.is_empty() {
            trace!("Skipping empty {:?} record", record.typ);
            return Ok(None);
        }

        let plain = match (&self.decrypter, record.typ) {
            (Some(decrypter), ContentType::ApplicationData) => {
                let plain = decrypter.decrypt(record, self.read_seq)?;
                self.read_seq += 1;
                plain
            }
            _ => PlainMessage::from(record),
        };

        if self.joiner.want_message(&plain) {
            self.joiner.take_message(plain)?;
            return Ok(None);
        }

        let payload = MessagePayload::new(plain.typ, plain.payload)?;
        Ok(Some(Message {
            version: plain.version,
            payload,
        }))
    }

    #[cfg(test)]
    fn into_inner(self) -> T {
        self.sock
    }
}

/// The client half of a TLS 1.3 handshake, as far as the probes need it.
///
/// Keeps the transcript and the key shares offered so far, so that
/// EncryptedExtensions can be decrypted after a ServerHello.
pub struct Handshake<T> {
    conn: Connection<T>,
    transcript: HandshakeHashBuffer,
    key_shares: Vec<KeyExchange>,
}

impl<T: Read + Write> Handshake<T> {
    pub fn new(sock: T) -> Self {
        Self {
            conn: Connection::new(sock),
            transcript: HandshakeHashBuffer::new(),
            key_shares: Vec::new(),
        }
    }

    /// Send `hello`, keeping `key_shares` for a later ServerHello.
    pub fn send_client_hello(
        &mut self,
        hello: &ClientHelloPayload,
        key_shares: Vec<KeyExchange>,
        stack: &mut MessageStack,
    ) -> Result<(), Error> {
        debug!(
            "Sending ClientHello with extensions {:?}",
            hello.extensions.types()
        );
        let msg = self
            .conn
            .send_handshake(HandshakeMessagePayload::client_hello(hello.clone()))?;
        self.transcript.add_message(&msg);
        self.key_shares.extend(key_shares);
        stack.push(&msg);
        Ok(())
    }

    /// Read the next message, adding it to the transcript and `stack`.
    pub fn receive(&mut self, stack: &mut MessageStack) -> Result<Message, Error> {
        let msg = self.conn.read_message()?;
        stack.push(&msg);

        if let Some(HandshakePayload::HelloRetryRequest(hrr)) = msg.handshake_payload() {
            match Tls13CipherSuite::lookup(hrr.cipher_suite) {
                Ok(suite) => self.transcript.rollup_for_hrr(suite.hash),
                Err(_) => debug!("Not hashing transcript for HRR with {:?}", hrr.cipher_suite),
            }
        }
        self.transcript.add_message(&msg);

        if let Some(alert) = msg.alert_description() {
            debug!("Received alert {:?}", alert);
        }
        Ok(msg)
    }

    pub fn expect_hello_retry_request(
        &mut self,
        stack: &mut MessageStack,
    ) -> Result<HelloRetryRequest, Error> {
        match self.receive(stack)?.payload {
            MessagePayload::Handshake {
                parsed:
                    HandshakeMessagePayload {
                        payload: HandshakePayload::HelloRetryRequest(hrr),
                        ..
                    },
                ..
            } => Ok(hrr),
            _ => Err(Error::BeforeTargetSituation(
                "did not send expected handshake message: HelloRetryRequest".into(),
            )),
        }
    }

    pub fn expect_server_hello(
        &mut self,
        stack: &mut MessageStack,
    ) -> Result<ServerHelloPayload, Error> {
        match self.receive(stack)?.payload {
            MessagePayload::Handshake {
                parsed:
                    HandshakeMessagePayload {
                        payload: HandshakePayload::ServerHello(sh),
                        ..
                    },
                ..
            } => Ok(sh),
            _ => Err(Error::BeforeTargetSituation(
                "not received ServerHello".into(),
            )),
        }
    }

    pub fn expect_encrypted_extensions(
        &mut self,
        stack: &mut MessageStack,
    ) -> Result<Vec<ServerExtension>, Error> {
        match self.receive(stack)?.payload {
            MessagePayload::Handshake {
                parsed:
                    HandshakeMessagePayload {
                        payload: HandshakePayload::EncryptedExtensions(exts),
                        ..
                    },
                ..
            } => Ok(exts),
            _ => Err(Error::BeforeTargetSituation(
                "not received EncryptedExtensions".into(),
            )),
        }
    }

    /// Derive the server handshake traffic key from `sh` and the
    /// transcript so far, and decrypt everything that follows with it.
    pub fn start_handshake_encryption(&mut self, sh: &ServerHelloPayload) -> Result<(), Error> {
        let suite = Tls13CipherSuite::lookup(sh.cipher_suite)?;
        let their_share = sh
            .key_share()
            .ok_or(Error::InvalidMessage(InvalidMessage::MissingData("KeyShareEntry")))?;

        // The latest share for a group wins: after HRR it replaces CH1's.
        let pos = self
            .key_shares
            .iter()
            .rposition(|kx| kx.group() == their_share.group)
            .ok_or(Error::UnsupportedGroup(their_share.group))?;
        let ours = self.key_shares.remove(pos);
        let shared = ours.complete(&their_share.payload.0)?;

        let hs_hash = self.transcript.get_current_hash(suite.hash);
        let schedule = KeySchedule::new_handshake(suite.hash, &shared)?;
        let secret = schedule.derive(SecretKind::ServerHandshakeTrafficSecret, &hs_hash)?;
        let (key, iv) = derive_traffic_key_iv(suite, &secret)?;
        debug!("Decrypting server handshake with {:?}", suite.suite);

        self.conn
            .set_message_decrypter(suite.aead.decrypter(&key, iv)?);
        Ok(())
    }
}

/// A TLS 1.3 ClientHello for `hostname`, with one key share for each
/// of `share_groups`.
///
/// `supported_groups` always lists every group we can do.
pub fn client_hello(
    hostname: &str,
    share_groups: &[NamedGroup],
) -> Result<(ClientHelloPayload, Vec<KeyExchange>), Error> {
    let key_shares = share_groups
        .iter()
        .map(|group| KeyExchange::start(*group))
        .collect::<Result<Vec<_>, _>>()?;

    let extensions = [
        ClientExtension::ServerName(hostname.to_string()),
        ClientExtension::SupportedVersions(vec![ProtocolVersion::TLSv1_3]),
        ClientExtension::SignatureAlgorithms(SIGNATURE_SCHEMES.to_vec()),
        ClientExtension::NamedGroups(ALL_KX_GROUPS.to_vec()),
        ClientExtension::KeyShare(
            key_shares
                .iter()
                .map(|kx| KeyShareEntry::new(kx.group(), kx.pub_key()))
                .collect(),
        ),
    ]
    .into_iter()
    .collect();

    let hello = ClientHelloPayload {
        client_version: ProtocolVersion::TLSv1_2,
        random: Random::new()?,
        session_id: SessionId::random()?,
        cipher_suites: CIPHER_SUITES.to_vec(),
        compression_methods: vec![Compression::Null],
        extensions,
    };
    Ok((hello, key_shares))
}

/// The extensions of a second ClientHello answering `hrr`.
///
/// Everything in `exts` is carried over, except that `key_share` is
/// replaced by one fresh share for the requested group and the
/// cookie is echoed.
pub fn retry_extensions(
    exts: &ClientExtensions,
    hrr: &HelloRetryRequest,
) -> Result<(ClientExtensions, Option<KeyExchange>), Error> {
    let mut exts = exts.clone();

    let key_share = match hrr.requested_key_share_group() {
        Some(group) => {
            trace!("HRR asks for a {:?} key share", group);
            let kx = KeyExchange::start(group)?;
            exts.insert(ClientExtension::KeyShare(vec![KeyShareEntry::new(
                group,
                kx.pub_key(),
            )]));
            Some(kx)
        }
        None => None,
    };

    if let Some(cookie) = hrr.cookie() {
        exts.insert(ClientExtension::Cookie(cookie.clone()));
    }
    Ok((exts, key_share))
}
