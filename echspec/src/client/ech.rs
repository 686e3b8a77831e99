use log::{debug, trace};

use crate::crypto::hpke::{setup_sealer, HpkeSealer, HpkeSuite};
use crate::enums::{EchClientHelloType, ProtocolVersion};
use crate::error::Error;
use crate::msgs::base::PayloadU16;
use crate::msgs::codec::Codec;
use crate::msgs::ech::{
    EchConfigPayload, EncryptedClientHello, EncryptedClientHelloOuter, HpkeSymmetricCipherSuite,
};
use crate::msgs::enums::{ExtensionType, HpkeAead, HpkeKdf};
use crate::msgs::handshake::{ClientExtension, ClientExtensions, ClientHelloPayload, Random, SessionId};
use crate::rand;

/// Type tag put on a ClientHelloOuter's ECH extension by
/// [`EchEncoding::IllegalOuterType`].
pub const ILLEGAL_OUTER_TYPE: u8 = 0x02;

/// Type tag put on a ClientHelloInner's ECH extension by
/// [`EchEncoding::IllegalInnerType`].
pub const ILLEGAL_INNER_TYPE: u8 = 0x03;

/// Padding byte used by [`EchEncoding::NonZeroPadding`].
const NON_ZERO_PADDING: u8 = 0x11;

/// How to lay out an ECH offer.
///
/// Everything other than `Conformant` produces an offer a conforming
/// server must reject.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EchEncoding {
    Conformant,
    /// ClientHelloInner's ECH extension carries an unassigned type.
    IllegalInnerType,
    /// ClientHelloOuter's ECH extension carries an unassigned type.
    IllegalOuterType,
    /// EncodedClientHelloInner is padded with non-zero bytes.
    NonZeroPadding,
    /// EncodedClientHelloInner's `ech_outer_extensions` is broken.
    OuterExtensions(OuterExtensionsFault),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OuterExtensionsFault {
    /// `key_share` is referenced but absent from ClientHelloOuter.
    MissingReferenced,
    /// `key_share` is referenced twice.
    DuplicateReference,
    /// `encrypted_client_hello` itself is referenced.
    EchReferenced,
    /// `supported_groups` and `key_share` are referenced in the reverse
    /// of their ClientHelloOuter order.
    OutOfOrder,
}

/// The two ClientHellos of one ECH offer.
#[derive(Clone, Debug)]
pub struct EchOffer {
    /// The ClientHelloInner as it was encrypted, before compression.
    pub inner: ClientHelloPayload,
    /// The ClientHelloOuter to put on the wire.
    pub outer: ClientHelloPayload,
}

/// Per-offer ECH state: the chosen config and an HPKE sender context.
///
/// A second ClientHello after HelloRetryRequest reuses this state, so
/// its payload is sealed under the next HPKE sequence number.
#[derive(Debug)]
pub struct EchState {
    suite: HpkeSuite,
    sender: Box<dyn HpkeSealer>,
    enc: Vec<u8>,
    config_id: u8,
    public_name: String,
    maximum_name_length: u8,
}

impl EchState {
    /// Pick an HPKE suite for `config` and encapsulate to its public key.
    pub fn new(config: &EchConfigPayload) -> Result<Self, Error> {
        let contents = config
            .contents()
            .ok_or(Error::NoSupportedHpkeSuite)?;
        let key_config = &contents.key_config;
        let suite = HpkeSuite::select(key_config)?;
        debug!(
            "ECH config {} uses {:?}/{:?}/{:?}",
            key_config.config_id, suite.kem, suite.sym.kdf_id, suite.sym.aead_id
        );

        let (enc, sender) = setup_sealer(suite, &config.hpke_info(), &key_config.public_key.0)?;
        Ok(Self {
            suite,
            sender,
            enc,
            config_id: key_config.config_id,
            public_name: contents.public_name.clone(),
            maximum_name_length: contents.maximum_name_length,
        })
    }

    pub fn config_id(&self) -> u8 {
        self.config_id
    }

    pub fn cipher_suite(&self) -> HpkeSymmetricCipherSuite {
        self.suite.sym
    }

    pub fn enc(&self) -> &[u8] {
        &self.enc
    }

    pub fn public_name(&self) -> &str {
        &self.public_name
    }

    /// How many payloads have been sealed under this state.
    pub fn sequence_number(&self) -> u64 {
        self.sender.sequence_number()
    }

    /// Burn one HPKE sequence number without sending anything, so the
    /// next payload is sealed under a nonce the server does not expect.
    pub fn skip_sequence(&mut self) -> Result<(), Error> {
        trace!("Skipping ECH sequence number {}", self.sequence_number());
        self.sender.seal(&[], &[])?;
        Ok(())
    }

    /// Build the ClientHelloOuter for a second ClientHello, after
    /// HelloRetryRequest: same config and context, empty `enc`.
    pub fn offer_retry(&mut self, inner: &ClientHelloPayload) -> Result<EchOffer, Error> {
        self.seal_offer(inner, EchEncoding::Conformant, Vec::new())
    }

    fn seal_offer(
        &mut self,
        inner: &ClientHelloPayload,
        encoding: EchEncoding,
        enc: Vec<u8>,
    ) -> Result<EchOffer, Error> {
        trace!(
            "Preparing {:?} ECH offer{}",
            encoding,
            if enc.is_empty() { " for retry" } else { "" }
        );

        let mut inner = inner.clone();
        inner
            .extensions
            .insert(ClientExtension::EncryptedClientHello(inner_marker(encoding)));

        let (compressed, omitted) = compress_extensions(&inner.extensions, encoding);
        let encoded_inner = self.encode_inner(&inner, compressed, encoding);

        let tag_len = self
            .suite
            .sym
            .aead_id
            .tag_len()
            .ok_or(Error::NoSupportedHpkeSuite)?;

        let mut outer = ClientHelloPayload {
            client_version: inner.client_version,
            random: Random::new()?,
            session_id: inner.session_id,
            cipher_suites: inner.cipher_suites.clone(),
            compression_methods: inner.compression_methods.clone(),
            extensions: inner.extensions.clone(),
        };
        for typ in omitted {
            outer.extensions.remove(typ);
        }
        outer
            .extensions
            .insert(ClientExtension::ServerName(self.public_name.clone()));
        outer
            .extensions
            .insert(ClientExtension::SupportedVersions(vec![ProtocolVersion::TLSv1_3]));

        // ClientHelloOuterAAD carries a zeroed payload of the final length.
        let placeholder = vec![0; encoded_inner.len() + tag_len];
        outer
            .extensions
            .insert(self.outer_extension(encoding, enc.clone(), placeholder));

        let payload = self
            .sender
            .seal(&outer.get_encoding(), &encoded_inner)?;
        outer
            .extensions
            .insert(self.outer_extension(encoding, enc, payload));

        Ok(EchOffer { inner, outer })
    }

    /// Encode `inner` as EncodedClientHelloInner with `extensions` and pad it.
    fn encode_inner(
        &self,
        inner: &ClientHelloPayload,
        extensions: ClientExtensions,
        encoding: EchEncoding,
    ) -> Vec<u8> {
        let encoded = ClientHelloPayload {
            client_version: inner.client_version,
            random: inner.random,
            session_id: SessionId::empty(),
            cipher_suites: inner.cipher_suites.clone(),
            compression_methods: inner.compression_methods.clone(),
            extensions,
        };
        let mut bytes = encoded.get_encoding();

        let fill = match encoding {
            EchEncoding::NonZeroPadding => NON_ZERO_PADDING,
            _ => 0,
        };
        let len = padding_len(
            bytes.len(),
            inner.server_name().map(str::len),
            self.maximum_name_length,
        );
        bytes.resize(bytes.len() + len, fill);
        bytes
    }

    fn outer_extension(&self, encoding: EchEncoding, enc: Vec<u8>, payload: Vec<u8>) -> ClientExtension {
        let outer = EncryptedClientHelloOuter {
            cipher_suite: self.suite.sym,
            config_id: self.config_id,
            enc: PayloadU16::new(enc),
            payload: PayloadU16::new(payload),
        };
        ClientExtension::EncryptedClientHello(match encoding {
            EchEncoding::IllegalOuterType => EncryptedClientHello::Illegal {
                typ: EchClientHelloType::Unknown(ILLEGAL_OUTER_TYPE),
                outer: Some(outer),
            },
            _ => EncryptedClientHello::Outer(outer),
        })
    }
}

/// Offer ECH for `inner` under `config`.
pub fn offer(
    inner: &ClientHelloPayload,
    config: &EchConfigPayload,
) -> Result<(EchOffer, EchState), Error> {
    offer_degraded(inner, config, EchEncoding::Conformant)
}

/// Offer ECH for `inner` under `config`, laid out according to `encoding`.
pub fn offer_degraded(
    inner: &ClientHelloPayload,
    config: &EchConfigPayload,
    encoding: EchEncoding,
) -> Result<(EchOffer, EchState), Error> {
    let mut state = EchState::new(config)?;
    let enc = state.enc.clone();
    let offer = state.seal_offer(inner, encoding, enc)?;
    Ok((offer, state))
}

/// A GREASE ECH offer: `hello`'s own extensions, with an outer ECH
/// extension no server can decrypt.
///
/// The payload is random, sized like a real offer for `hello` would be.
pub fn offer_grease(hello: &ClientHelloPayload) -> Result<ClientHelloPayload, Error> {
    let sym = HpkeSymmetricCipherSuite {
        kdf_id: HpkeKdf::HKDF_SHA256,
        aead_id: HpkeAead::AES_128_GCM,
    };
    let mut outer = hello.clone();
    outer
        .extensions
        .insert(ClientExtension::EncryptedClientHello(EncryptedClientHello::Inner));

    let encoded_len = ClientHelloPayload {
        session_id: SessionId::empty(),
        ..outer.clone()
    }
    .get_encoding()
    .len();
    let payload_len = encoded_len + padding_len(encoded_len, hello.server_name().map(str::len), 0) + 16;

    let grease = EncryptedClientHelloOuter {
        cipher_suite: sym,
        config_id: rand::random_u8()?,
        enc: PayloadU16::new(rand::random_vec(32)?),
        payload: PayloadU16::new(rand::random_vec(payload_len)?),
    };
    outer
        .extensions
        .insert(ClientExtension::EncryptedClientHello(EncryptedClientHello::Outer(grease)));
    Ok(outer)
}

/// Number of padding bytes to append to an EncodedClientHelloInner of
/// `encoded_len` bytes.
///
/// The name-dependent padding is followed by enough bytes to reach a
/// multiple of 32.
pub fn padding_len(encoded_len: usize, server_name_len: Option<usize>, maximum_name_length: u8) -> usize {
    let max = usize::from(maximum_name_length);
    let base = match server_name_len {
        Some(len) => max.saturating_sub(len),
        None => max + 9,
    };
    base + (31 - ((encoded_len + base + 31) % 32))
}

fn inner_marker(encoding: EchEncoding) -> EncryptedClientHello {
    match encoding {
        EchEncoding::IllegalInnerType => EncryptedClientHello::Illegal {
            typ: EchClientHelloType::Unknown(ILLEGAL_INNER_TYPE),
            outer: None,
        },
        _ => EncryptedClientHello::Inner,
    }
}

/// The EncodedClientHelloInner extensions for `encoding`, and the types
/// to leave out of ClientHelloOuter.
fn compress_extensions(
    exts: &ClientExtensions,
    encoding: EchEncoding,
) -> (ClientExtensions, Vec<ExtensionType>) {
    let fault = match encoding {
        EchEncoding::OuterExtensions(fault) => fault,
        _ => return (exts.clone(), Vec::new()),
    };

    let referenced: &[ExtensionType] = match fault {
        OuterExtensionsFault::OutOfOrder => &[ExtensionType::EllipticCurves, ExtensionType::KeyShare],
        _ => &[ExtensionType::KeyShare],
    };
    let (mut compressed, _) = exts.compress(referenced);

    let (references, omitted) = match fault {
        OuterExtensionsFault::MissingReferenced => {
            (vec![ExtensionType::KeyShare], vec![ExtensionType::KeyShare])
        }
        OuterExtensionsFault::DuplicateReference => (
            vec![ExtensionType::KeyShare, ExtensionType::KeyShare],
            Vec::new(),
        ),
        OuterExtensionsFault::EchReferenced => (
            vec![ExtensionType::KeyShare, ExtensionType::EncryptedClientHello],
            Vec::new(),
        ),
        OuterExtensionsFault::OutOfOrder => (
            vec![ExtensionType::KeyShare, ExtensionType::EllipticCurves],
            Vec::new(),
        ),
    };
    compressed.insert(ClientExtension::EncryptedClientHelloOuterExtensions(references));
    (compressed, omitted)
}
