use std::fmt;

use crate::enums::{CipherSuite, HandshakeType, ProtocolVersion, SignatureScheme};
use crate::error::InvalidMessage;
use crate::msgs::base::{hex, Payload, PayloadU16};
use crate::msgs::codec::{
    self, encode_vec_u16, encode_vec_u8, read_vec_u16, read_vec_u8, Codec, LengthPrefixedBuffer,
    ListLength, Reader,
};
use crate::msgs::ech::{EncryptedClientHello, ServerEncryptedClientHello};
use crate::msgs::enums::{Compression, ExtensionType, NamedGroup};
use crate::rand;

#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Random(pub [u8; 32]);

impl fmt::Debug for Random {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        hex(f, &self.0)
    }
}

/// SHA-256("HelloRetryRequest"), from RFC 8446 section 4.1.3.
pub static HELLO_RETRY_REQUEST_RANDOM: Random = Random([
    0xcf, 0x21, 0xad, 0x74, 0xe5, 0x9a, 0x61, 0x11, 0xbe, 0x1d, 0x8c, 0x02, 0x1e, 0x65, 0xb8, 0x91,
    0xc2, 0xa2, 0x11, 0x16, 0x7a, 0xbb, 0x8c, 0x5e, 0x07, 0x9e, 0x09, 0xe2, 0xc8, 0xa8, 0x33, 0x9c,
]);

pub static ZERO_RANDOM: Random = Random([0u8; 32]);

impl Codec<'_> for Random {
    fn encode(&self, bytes: &mut Vec<u8>) {
        bytes.extend_from_slice(&self.0);
    }

    fn read(r: &mut Reader<'_>) -> Result<Self, InvalidMessage> {
        let bytes = match r.take(32) {
            Some(bytes) => bytes,
            None => return Err(InvalidMessage::MissingData("Random")),
        };

        let mut opaque = [0; 32];
        opaque.clone_from_slice(bytes);
        Ok(Self(opaque))
    }
}

impl Random {
    pub fn new() -> Result<Self, rand::GetRandomFailed> {
        let mut data = [0u8; 32];
        rand::fill_random(&mut data)?;
        Ok(Self(data))
    }
}

impl From<[u8; 32]> for Random {
    #[inline]
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

#[derive(Copy, Clone)]
pub struct SessionId {
    len: usize,
    data: [u8; 32],
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        hex(f, &self.data[..self.len])
    }
}

impl PartialEq for SessionId {
    fn eq(&self, other: &Self) -> bool {
        self.as_ref() == other.as_ref()
    }
}

impl Codec<'_> for SessionId {
    fn encode(&self, bytes: &mut Vec<u8>) {
        debug_assert!(self.len <= 32);
        bytes.push(self.len as u8);
        bytes.extend_from_slice(self.as_ref());
    }

    fn read(r: &mut Reader<'_>) -> Result<Self, InvalidMessage> {
        let len = u8::read(r)? as usize;
        if len > 32 {
            return Err(InvalidMessage::TrailingData("SessionID"));
        }

        let bytes = match r.take(len) {
            Some(bytes) => bytes,
            None => return Err(InvalidMessage::MissingData("SessionID")),
        };

        let mut out = [0u8; 32];
        out[..len].clone_from_slice(&bytes[..len]);
        Ok(Self { data: out, len })
    }
}

impl SessionId {
    pub fn random() -> Result<Self, rand::GetRandomFailed> {
        let mut data = [0u8; 32];
        rand::fill_random(&mut data)?;
        Ok(Self { data, len: 32 })
    }

    pub fn empty() -> Self {
        Self {
            data: [0u8; 32],
            len: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl AsRef<[u8]> for SessionId {
    fn as_ref(&self) -> &[u8] {
        &self.data[..self.len]
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct UnknownExtension {
    pub typ: ExtensionType,
    pub payload: Payload,
}

impl UnknownExtension {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.payload.encode(bytes);
    }

    fn read(typ: ExtensionType, r: &mut Reader<'_>) -> Self {
        let payload = Payload::read(r);
        Self { typ, payload }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct KeyShareEntry {
    pub group: NamedGroup,
    pub payload: PayloadU16,
}

impl KeyShareEntry {
    pub fn new(group: NamedGroup, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            group,
            payload: PayloadU16::new(payload.into()),
        }
    }
}

impl Codec<'_> for KeyShareEntry {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.group.encode(bytes);
        self.payload.encode(bytes);
    }

    fn read(r: &mut Reader<'_>) -> Result<Self, InvalidMessage> {
        let group = NamedGroup::read(r)?;
        let payload = PayloadU16::read(r)?;

        Ok(Self { group, payload })
    }
}

/// The single host_name entry of a `server_name` extension.
fn encode_server_name(name: &str, bytes: &mut Vec<u8>) {
    let list = LengthPrefixedBuffer::new(ListLength::U16, bytes);
    // name_type: host_name
    0u8.encode(list.buf);
    PayloadU16::encode_slice(name.as_bytes(), list.buf);
}

fn read_server_name(r: &mut Reader<'_>) -> Result<String, InvalidMessage> {
    let len = u16::read(r)?;
    let mut list = r.sub(usize::from(len))?;
    let mut host_name = None;
    while list.any_left() {
        let typ = u8::read(&mut list)?;
        let name = PayloadU16::read(&mut list)?;
        if typ == 0 && host_name.is_none() {
            host_name = Some(name.0);
        }
    }

    match host_name {
        Some(name) => String::from_utf8(name).map_err(|_| InvalidMessage::InvalidServerName),
        None => Err(InvalidMessage::InvalidServerName),
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ClientExtension {
    ServerName(String),
    SupportedVersions(Vec<ProtocolVersion>),
    SignatureAlgorithms(Vec<SignatureScheme>),
    NamedGroups(Vec<NamedGroup>),
    KeyShare(Vec<KeyShareEntry>),
    Cookie(PayloadU16),
    EncryptedClientHello(EncryptedClientHello),
    EncryptedClientHelloOuterExtensions(Vec<ExtensionType>),
    Unknown(UnknownExtension),
}

impl ClientExtension {
    pub fn ext_type(&self) -> ExtensionType {
        match self {
            Self::ServerName(_) => ExtensionType::ServerName,
            Self::SupportedVersions(_) => ExtensionType::SupportedVersions,
            Self::SignatureAlgorithms(_) => ExtensionType::SignatureAlgorithms,
            Self::NamedGroups(_) => ExtensionType::EllipticCurves,
            Self::KeyShare(_) => ExtensionType::KeyShare,
            Self::Cookie(_) => ExtensionType::Cookie,
            Self::EncryptedClientHello(_) => ExtensionType::EncryptedClientHello,
            Self::EncryptedClientHelloOuterExtensions(_) => {
                ExtensionType::EncryptedClientHelloOuterExtensions
            }
            Self::Unknown(r) => r.typ,
        }
    }
}

impl Codec<'_> for ClientExtension {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.ext_type().encode(bytes);

        let nested = LengthPrefixedBuffer::new(ListLength::U16, bytes);
        match self {
            Self::ServerName(name) => encode_server_name(name, nested.buf),
            Self::SupportedVersions(versions) => encode_vec_u8(nested.buf, versions),
            Self::SignatureAlgorithms(schemes) => encode_vec_u16(nested.buf, schemes),
            Self::NamedGroups(groups) => encode_vec_u16(nested.buf, groups),
            Self::KeyShare(shares) => encode_vec_u16(nested.buf, shares),
            Self::Cookie(cookie) => cookie.encode(nested.buf),
            Self::EncryptedClientHello(ech) => ech.encode(nested.buf),
            Self::EncryptedClientHelloOuterExtensions(types) => encode_vec_u8(nested.buf, types),
            Self::Unknown(r) => r.encode(nested.buf),
        }
    }

    fn read(r: &mut Reader<'_>) -> Result<Self, InvalidMessage> {
        let typ = ExtensionType::read(r)?;
        let len = usize::from(u16::read(r)?);
        let mut sub = r.sub(len)?;

        let ext = match typ {
            ExtensionType::ServerName => Self::ServerName(read_server_name(&mut sub)?),
            ExtensionType::SupportedVersions => Self::SupportedVersions(read_vec_u8(&mut sub)?),
            ExtensionType::SignatureAlgorithms => {
                Self::SignatureAlgorithms(read_vec_u16(&mut sub)?)
            }
            ExtensionType::EllipticCurves => Self::NamedGroups(read_vec_u16(&mut sub)?),
            ExtensionType::KeyShare => Self::KeyShare(read_vec_u16(&mut sub)?),
            ExtensionType::Cookie => Self::Cookie(PayloadU16::read(&mut sub)?),
            ExtensionType::EncryptedClientHello => {
                Self::EncryptedClientHello(EncryptedClientHello::read(&mut sub)?)
            }
            ExtensionType::EncryptedClientHelloOuterExtensions => {
                Self::EncryptedClientHelloOuterExtensions(read_vec_u8(&mut sub)?)
            }
            _ => Self::Unknown(UnknownExtension::read(typ, &mut sub)),
        };

        sub.expect_empty("ClientExtension")
            .map(|_| ext)
    }
}

/// ClientHello extensions: keyed by type, in the order they go on the wire.
///
/// ECH's `ech_outer_extensions` refers to ClientHelloOuter extensions by
/// position, so order is part of the value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClientExtensions(Vec<ClientExtension>);

impl ClientExtensions {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Insert `ext`, replacing an extension of the same type in place,
    /// or appending it.
    pub fn insert(&mut self, ext: ClientExtension) {
        let typ = ext.ext_type();
        match self
            .0
            .iter_mut()
            .find(|e| e.ext_type() == typ)
        {
            Some(existing) => *existing = ext,
            None => self.0.push(ext),
        }
    }

    pub fn get(&self, typ: ExtensionType) -> Option<&ClientExtension> {
        self.0
            .iter()
            .find(|e| e.ext_type() == typ)
    }

    pub fn contains(&self, typ: ExtensionType) -> bool {
        self.get(typ).is_some()
    }

    pub fn remove(&mut self, typ: ExtensionType) -> Option<ClientExtension> {
        let pos = self
            .0
            .iter()
            .position(|e| e.ext_type() == typ)?;
        Some(self.0.remove(pos))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ClientExtension> {
        self.0.iter()
    }

    pub fn types(&self) -> Vec<ExtensionType> {
        self.0
            .iter()
            .map(ClientExtension::ext_type)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Split out the extensions named in `outer`.
    ///
    /// Returns the extensions for EncodedClientHelloInner, where the
    /// referenced extensions are replaced by one `ech_outer_extensions`
    /// at the position of the first of them, and the referenced
    /// extensions themselves, in order.
    pub fn compress(&self, outer: &[ExtensionType]) -> (Self, Self) {
        let mut compressed = Vec::new();
        let mut referenced = Vec::new();
        let mut marker = None;

        for ext in &self.0 {
            if !outer.contains(&ext.ext_type()) {
                compressed.push(ext.clone());
                continue;
            }
            if marker.is_none() {
                marker = Some(compressed.len());
                compressed.push(ClientExtension::EncryptedClientHelloOuterExtensions(Vec::new()));
            }
            referenced.push(ext.clone());
        }

        let referenced = Self(referenced);
        if let Some(pos) = marker {
            compressed[pos] = ClientExtension::EncryptedClientHelloOuterExtensions(referenced.types());
        }
        (Self(compressed), referenced)
    }
}

impl FromIterator<ClientExtension> for ClientExtensions {
    fn from_iter<I: IntoIterator<Item = ClientExtension>>(iter: I) -> Self {
        let mut exts = Self::new();
        for ext in iter {
            exts.insert(ext);
        }
        exts
    }
}

impl Codec<'_> for ClientExtensions {
    fn encode(&self, bytes: &mut Vec<u8>) {
        encode_vec_u16(bytes, &self.0);
    }

    fn read(r: &mut Reader<'_>) -> Result<Self, InvalidMessage> {
        Ok(Self(read_vec_u16(r)?))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ClientHelloPayload {
    pub client_version: ProtocolVersion,
    pub random: Random,
    pub session_id: SessionId,
    pub cipher_suites: Vec<CipherSuite>,
    pub compression_methods: Vec<Compression>,
    pub extensions: ClientExtensions,
}

impl Codec<'_> for ClientHelloPayload {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.client_version.encode(bytes);
        self.random.encode(bytes);
        self.session_id.encode(bytes);
        encode_vec_u16(bytes, &self.cipher_suites);
        encode_vec_u8(bytes, &self.compression_methods);
        self.extensions.encode(bytes);
    }

    fn read(r: &mut Reader<'_>) -> Result<Self, InvalidMessage> {
        let mut ret = Self {
            client_version: ProtocolVersion::read(r)?,
            random: Random::read(r)?,
            session_id: SessionId::read(r)?,
            cipher_suites: read_vec_u16::<CipherSuite>(r)?,
            compression_methods: read_vec_u8::<Compression>(r)?,
            extensions: ClientExtensions::new(),
        };

        if r.any_left() {
            ret.extensions = ClientExtensions::read(r)?;
        }

        r.expect_empty("ClientHelloPayload")
            .map(|_| ret)
    }
}

impl ClientHelloPayload {
    pub fn server_name(&self) -> Option<&str> {
        match self
            .extensions
            .get(ExtensionType::ServerName)?
        {
            ClientExtension::ServerName(name) => Some(name),
            _ => None,
        }
    }

    pub fn key_shares(&self) -> Option<&[KeyShareEntry]> {
        match self
            .extensions
            .get(ExtensionType::KeyShare)?
        {
            ClientExtension::KeyShare(shares) => Some(shares),
            _ => None,
        }
    }

    pub fn encrypted_client_hello(&self) -> Option<&EncryptedClientHello> {
        match self
            .extensions
            .get(ExtensionType::EncryptedClientHello)?
        {
            ClientExtension::EncryptedClientHello(ech) => Some(ech),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ServerExtension {
    KeyShare(KeyShareEntry),
    SupportedVersions(ProtocolVersion),
    ServerNameAck,
    NamedGroups(Vec<NamedGroup>),
    EncryptedClientHello(ServerEncryptedClientHello),
    Unknown(UnknownExtension),
}

impl ServerExtension {
    pub fn ext_type(&self) -> ExtensionType {
        match self {
            Self::KeyShare(_) => ExtensionType::KeyShare,
            Self::SupportedVersions(_) => ExtensionType::SupportedVersions,
            Self::ServerNameAck => ExtensionType::ServerName,
            Self::NamedGroups(_) => ExtensionType::EllipticCurves,
            Self::EncryptedClientHello(_) => ExtensionType::EncryptedClientHello,
            Self::Unknown(r) => r.typ,
        }
    }
}

impl Codec<'_> for ServerExtension {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.ext_type().encode(bytes);

        let nested = LengthPrefixedBuffer::new(ListLength::U16, bytes);
        match self {
            Self::KeyShare(share) => share.encode(nested.buf),
            Self::SupportedVersions(version) => version.encode(nested.buf),
            Self::ServerNameAck => {}
            Self::NamedGroups(groups) => encode_vec_u16(nested.buf, groups),
            Self::EncryptedClientHello(ech) => ech.encode(nested.buf),
            Self::Unknown(r) => r.encode(nested.buf),
        }
    }

    fn read(r: &mut Reader<'_>) -> Result<Self, InvalidMessage> {
        let typ = ExtensionType::read(r)?;
        let len = usize::from(u16::read(r)?);
        let mut sub = r.sub(len)?;

        let ext = match typ {
            ExtensionType::KeyShare => Self::KeyShare(KeyShareEntry::read(&mut sub)?),
            ExtensionType::SupportedVersions => {
                Self::SupportedVersions(ProtocolVersion::read(&mut sub)?)
            }
            ExtensionType::ServerName if len == 0 => Self::ServerNameAck,
            ExtensionType::EllipticCurves => Self::NamedGroups(read_vec_u16(&mut sub)?),
            ExtensionType::EncryptedClientHello => {
                Self::EncryptedClientHello(ServerEncryptedClientHello::read(&mut sub)?)
            }
            _ => Self::Unknown(UnknownExtension::read(typ, &mut sub)),
        };

        sub.expect_empty("ServerExtension")
            .map(|_| ext)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ServerHelloPayload {
    pub legacy_version: ProtocolVersion,
    pub random: Random,
    pub session_id: SessionId,
    pub cipher_suite: CipherSuite,
    pub compression_method: Compression,
    pub extensions: Vec<ServerExtension>,
}

impl Codec<'_> for ServerHelloPayload {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.legacy_version.encode(bytes);
        self.random.encode(bytes);
        self.session_id.encode(bytes);
        self.cipher_suite.encode(bytes);
        self.compression_method.encode(bytes);
        encode_vec_u16(bytes, &self.extensions);
    }

    // minus version and random, which have already been read.
    fn read(r: &mut Reader<'_>) -> Result<Self, InvalidMessage> {
        let session_id = SessionId::read(r)?;
        let suite = CipherSuite::read(r)?;
        let compression = Compression::read(r)?;

        // RFC5246:
        // "The presence of extensions can be detected by determining whether
        //  there are bytes following the compression_method field at the end of
        //  the ServerHello."
        let extensions = match r.any_left() {
            true => read_vec_u16::<ServerExtension>(r)?,
            false => vec![],
        };

        let ret = Self {
            legacy_version: ProtocolVersion::Unknown(0),
            random: ZERO_RANDOM,
            session_id,
            cipher_suite: suite,
            compression_method: compression,
            extensions,
        };

        r.expect_empty("ServerHelloPayload")
            .map(|_| ret)
    }
}

impl ServerHelloPayload {
    fn find_extension(&self, typ: ExtensionType) -> Option<&ServerExtension> {
        self.extensions
            .iter()
            .find(|x| x.ext_type() == typ)
    }

    pub fn key_share(&self) -> Option<&KeyShareEntry> {
        match self.find_extension(ExtensionType::KeyShare)? {
            ServerExtension::KeyShare(share) => Some(share),
            _ => None,
        }
    }

    pub fn supported_versions(&self) -> Option<ProtocolVersion> {
        match self.find_extension(ExtensionType::SupportedVersions)? {
            ServerExtension::SupportedVersions(vers) => Some(*vers),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum HelloRetryExtension {
    KeyShare(NamedGroup),
    Cookie(PayloadU16),
    SupportedVersions(ProtocolVersion),
    /// The 8-byte ECH acceptance confirmation.
    EchHelloRetryRequest(Payload),
    Unknown(UnknownExtension),
}

impl HelloRetryExtension {
    pub fn ext_type(&self) -> ExtensionType {
        match self {
            Self::KeyShare(_) => ExtensionType::KeyShare,
            Self::Cookie(_) => ExtensionType::Cookie,
            Self::SupportedVersions(_) => ExtensionType::SupportedVersions,
            Self::EchHelloRetryRequest(_) => ExtensionType::EncryptedClientHello,
            Self::Unknown(r) => r.typ,
        }
    }
}

impl Codec<'_> for HelloRetryExtension {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.ext_type().encode(bytes);

        let nested = LengthPrefixedBuffer::new(ListLength::U16, bytes);
        match self {
            Self::KeyShare(group) => group.encode(nested.buf),
            Self::Cookie(cookie) => cookie.encode(nested.buf),
            Self::SupportedVersions(version) => version.encode(nested.buf),
            Self::EchHelloRetryRequest(confirmation) => confirmation.encode(nested.buf),
            Self::Unknown(r) => r.encode(nested.buf),
        }
    }

    fn read(r: &mut Reader<'_>) -> Result<Self, InvalidMessage> {
        let typ = ExtensionType::read(r)?;
        let len = usize::from(u16::read(r)?);
        let mut sub = r.sub(len)?;

        let ext = match typ {
            ExtensionType::KeyShare => Self::KeyShare(NamedGroup::read(&mut sub)?),
            ExtensionType::Cookie => Self::Cookie(PayloadU16::read(&mut sub)?),
            ExtensionType::SupportedVersions => {
                Self::SupportedVersions(ProtocolVersion::read(&mut sub)?)
            }
            ExtensionType::EncryptedClientHello => {
                Self::EchHelloRetryRequest(Payload::read(&mut sub))
            }
            _ => Self::Unknown(UnknownExtension::read(typ, &mut sub)),
        };

        sub.expect_empty("HelloRetryExtension")
            .map(|_| ext)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct HelloRetryRequest {
    pub legacy_version: ProtocolVersion,
    pub session_id: SessionId,
    pub cipher_suite: CipherSuite,
    pub extensions: Vec<HelloRetryExtension>,
}

impl Codec<'_> for HelloRetryRequest {
    fn encode(&self, bytes: &mut Vec<u8>) {
        self.legacy_version.encode(bytes);
        HELLO_RETRY_REQUEST_RANDOM.encode(bytes);
        self.session_id.encode(bytes);
        self.cipher_suite.encode(bytes);
        Compression::Null.encode(bytes);
        encode_vec_u16(bytes, &self.extensions);
    }

    // minus version and random, which have already been read.
    fn read(r: &mut Reader<'_>) -> Result<Self, InvalidMessage> {
        let session_id = SessionId::read(r)?;
        let cipher_suite = CipherSuite::read(r)?;
        let compression = Compression::read(r)?;

        if compression != Compression::Null {
            return Err(InvalidMessage::UnsupportedCompression);
        }

        Ok(Self {
            legacy_version: ProtocolVersion::Unknown(0),
            session_id,
            cipher_suite,
            extensions: read_vec_u16::<HelloRetryExtension>(r)?,
        })
    }
}

impl HelloRetryRequest {
    fn find_extension(&self, typ: ExtensionType) -> Option<&HelloRetryExtension> {
        self.extensions
            .iter()
            .find(|x| x.ext_type() == typ)
    }

    pub fn requested_key_share_group(&self) -> Option<NamedGroup> {
        match self.find_extension(ExtensionType::KeyShare)? {
            HelloRetryExtension::KeyShare(group) => Some(*group),
            _ => None,
        }
    }

    pub fn cookie(&self) -> Option<&PayloadU16> {
        match self.find_extension(ExtensionType::Cookie)? {
            HelloRetryExtension::Cookie(cookie) => Some(cookie),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum HandshakePayload {
    ClientHello(ClientHelloPayload),
    ServerHello(ServerHelloPayload),
    HelloRetryRequest(HelloRetryRequest),
    EncryptedExtensions(Vec<ServerExtension>),
    Certificate(Payload),
    CertificateRequest(Payload),
    CertificateVerify(Payload),
    Finished(Payload),
    NewSessionTicket(Payload),
    Unknown(Payload),
}

impl HandshakePayload {
    fn encode(&self, bytes: &mut Vec<u8>) {
        match self {
            Self::ClientHello(x) => x.encode(bytes),
            Self::ServerHello(x) => x.encode(bytes),
            Self::HelloRetryRequest(x) => x.encode(bytes),
            Self::EncryptedExtensions(x) => encode_vec_u16(bytes, x),
            Self::Certificate(x)
            | Self::CertificateRequest(x)
            | Self::CertificateVerify(x)
            | Self::Finished(x)
            | Self::NewSessionTicket(x)
            | Self::Unknown(x) => x.encode(bytes),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct HandshakeMessagePayload {
    pub typ: HandshakeType,
    pub payload: HandshakePayload,
}

impl Codec<'_> for HandshakeMessagePayload {
    fn encode(&self, bytes: &mut Vec<u8>) {
        // output type, length, and encoded payload
        match self.typ {
            HandshakeType::HelloRetryRequest => HandshakeType::ServerHello,
            _ => self.typ,
        }
        .encode(bytes);

        let mut sub = Vec::new();
        self.payload.encode(&mut sub);
        codec::u24(sub.len() as u32).encode(bytes);
        bytes.append(&mut sub);
    }

    fn read(r: &mut Reader<'_>) -> Result<Self, InvalidMessage> {
        let mut typ = HandshakeType::read(r)?;
        let len = codec::u24::read(r)?.0 as usize;
        let mut sub = r.sub(len)?;

        let payload = match typ {
            HandshakeType::ClientHello => {
                HandshakePayload::ClientHello(ClientHelloPayload::read(&mut sub)?)
            }
            HandshakeType::ServerHello => {
                let version = ProtocolVersion::read(&mut sub)?;
                let random = Random::read(&mut sub)?;

                if random == HELLO_RETRY_REQUEST_RANDOM {
                    let mut hrr = HelloRetryRequest::read(&mut sub)?;
                    hrr.legacy_version = version;
                    typ = HandshakeType::HelloRetryRequest;
                    HandshakePayload::HelloRetryRequest(hrr)
                } else {
                    let mut shp = ServerHelloPayload::read(&mut sub)?;
                    shp.legacy_version = version;
                    shp.random = random;
                    HandshakePayload::ServerHello(shp)
                }
            }
            HandshakeType::EncryptedExtensions => {
                HandshakePayload::EncryptedExtensions(read_vec_u16::<ServerExtension>(&mut sub)?)
            }
            HandshakeType::Certificate => HandshakePayload::Certificate(Payload::read(&mut sub)),
            HandshakeType::CertificateRequest => {
                HandshakePayload::CertificateRequest(Payload::read(&mut sub))
            }
            HandshakeType::CertificateVerify => {
                HandshakePayload::CertificateVerify(Payload::read(&mut sub))
            }
            HandshakeType::Finished => HandshakePayload::Finished(Payload::read(&mut sub)),
            HandshakeType::NewSessionTicket => {
                HandshakePayload::NewSessionTicket(Payload::read(&mut sub))
            }
            _ => HandshakePayload::Unknown(Payload::read(&mut sub)),
        };

        sub.expect_empty("HandshakeMessagePayload")
            .map(|_| Self { typ, payload })
    }
}

impl HandshakeMessagePayload {
    pub fn client_hello(payload: ClientHelloPayload) -> Self {
        Self {
            typ: HandshakeType::ClientHello,
            payload: HandshakePayload::ClientHello(payload),
        }
    }
}
