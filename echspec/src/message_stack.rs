//! A post-mortem log of the protocol messages one probe exchanged.
//!
//! Rendering is best effort: every message produces an entry, and
//! anything we cannot describe field by field becomes a `"$Name"`
//! placeholder.

use serde_json::{json, Map, Value};

use crate::msgs::alert::AlertMessagePayload;
use crate::msgs::ech::{EchConfigPayload, EncryptedClientHello, EncryptedClientHelloOuter};
use crate::msgs::enums::EchVersion;
use crate::msgs::handshake::{
    ClientExtension, ClientHelloPayload, HandshakePayload, HelloRetryExtension, HelloRetryRequest,
    KeyShareEntry, ServerExtension, ServerHelloPayload,
};
use crate::msgs::message::{Message, MessagePayload};

/// The messages of one probe, in the order they were sent or received.
///
/// A ClientHelloInner never goes on the wire; it is recorded when the
/// offer carrying it is built, so it precedes that offer's ClientHello.
#[derive(Clone, Debug, Default)]
pub struct MessageStack {
    entries: Vec<(String, Value)>,
}

impl MessageStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a ClientHelloInner an offer was built from.
    pub fn client_hello_inner(&mut self, inner: &ClientHelloPayload) {
        self.entries
            .push(("ClientHelloInner".into(), client_hello(inner)));
    }

    pub fn push(&mut self, msg: &Message) {
        self.entries
            .push((label(msg), render(msg)));
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize as a JSON array of single-key objects, label to message.
    pub fn marshal(&self) -> String {
        let list = self
            .entries
            .iter()
            .map(|(label, value)| {
                let mut entry = Map::new();
                entry.insert(label.to_string(), value.clone());
                Value::Object(entry)
            })
            .collect();
        Value::Array(list).to_string()
    }
}

fn label(msg: &Message) -> String {
    match &msg.payload {
        MessagePayload::Handshake { parsed, .. } => match &parsed.payload {
            HandshakePayload::ClientHello(_) => "ClientHello".into(),
            HandshakePayload::ServerHello(_) => "ServerHello".into(),
            HandshakePayload::HelloRetryRequest(_) => "HelloRetryRequest".into(),
            HandshakePayload::EncryptedExtensions(_) => "EncryptedExtensions".into(),
            HandshakePayload::Certificate(_) => "Certificate".into(),
            HandshakePayload::CertificateRequest(_) => "CertificateRequest".into(),
            HandshakePayload::CertificateVerify(_) => "CertificateVerify".into(),
            HandshakePayload::Finished(_) => "Finished".into(),
            HandshakePayload::NewSessionTicket(_) => "NewSessionTicket".into(),
            HandshakePayload::Unknown(_) => format!("{:?}", parsed.typ),
        },
        MessagePayload::Alert(_) => "Alert".into(),
        MessagePayload::ChangeCipherSpec(_) => "ChangeCipherSpec".into(),
        MessagePayload::ApplicationData(_) => "ApplicationData".into(),
    }
}

fn render(msg: &Message) -> Value {
    match &msg.payload {
        MessagePayload::Handshake { parsed, .. } => match &parsed.payload {
            HandshakePayload::ClientHello(ch) => client_hello(ch),
            HandshakePayload::ServerHello(sh) => server_hello(sh),
            HandshakePayload::HelloRetryRequest(hrr) => hello_retry_request(hrr),
            HandshakePayload::EncryptedExtensions(exts) => json!({
                "extensions": server_extensions(exts),
            }),
            HandshakePayload::Certificate(p)
            | HandshakePayload::CertificateRequest(p)
            | HandshakePayload::CertificateVerify(p)
            | HandshakePayload::Finished(p)
            | HandshakePayload::NewSessionTicket(p) => json!({ "payload": hex(p.bytes()) }),
            HandshakePayload::Unknown(_) => placeholder(&format!("{:?}", parsed.typ)),
        },
        MessagePayload::Alert(alert) => alert_message(alert),
        MessagePayload::ChangeCipherSpec(_) => placeholder("ChangeCipherSpec"),
        MessagePayload::ApplicationData(_) => placeholder("ApplicationData"),
    }
}

/// Bytes as `0x`-prefixed hex; empty bytes as an empty string.
fn hex_string(bytes: &[u8]) -> String {
    if bytes.is_empty() {
        return String::new();
    }
    let digits: String = bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect();
    format!("0x{}", digits)
}

fn hex(bytes: &[u8]) -> Value {
    Value::String(hex_string(bytes))
}

fn placeholder(name: &str) -> Value {
    Value::String(format!("${}", name))
}

fn client_hello(ch: &ClientHelloPayload) -> Value {
    let mut extensions = Map::new();
    for ext in ch.extensions.iter() {
        extensions.insert(hex_string(&ext.ext_type().to_array()), client_extension(ext));
    }

    json!({
        "legacy_version": hex(&ch.client_version.to_array()),
        "random": hex(&ch.random.0),
        "legacy_session_id": hex(ch.session_id.as_ref()),
        "cipher_suites": ch.cipher_suites.iter().map(|cs| hex(&cs.to_array())).collect::<Vec<_>>(),
        "legacy_compression_methods": ch.compression_methods.iter().map(|c| hex(&c.to_array())).collect::<Vec<_>>(),
        "extensions": extensions,
    })
}

fn client_extension(ext: &ClientExtension) -> Value {
    match ext {
        ClientExtension::ServerName(name) => json!({ "server_name": hex(name.as_bytes()) }),
        ClientExtension::SupportedVersions(versions) => json!({
            "versions": versions.iter().map(|v| hex(&v.to_array())).collect::<Vec<_>>(),
        }),
        ClientExtension::SignatureAlgorithms(schemes) => json!({
            "supported_signature_algorithms": schemes.iter().map(|s| hex(&s.to_array())).collect::<Vec<_>>(),
        }),
        ClientExtension::NamedGroups(groups) => json!({
            "named_group_list": groups.iter().map(|g| hex(&g.to_array())).collect::<Vec<_>>(),
        }),
        ClientExtension::KeyShare(entries) => json!({
            "key_share_entry": entries.iter().map(key_share).collect::<Vec<_>>(),
        }),
        ClientExtension::Cookie(cookie) => json!({ "cookie": hex(&cookie.0) }),
        ClientExtension::EncryptedClientHello(ech) => encrypted_client_hello(ech),
        ClientExtension::EncryptedClientHelloOuterExtensions(types) => json!({
            "outer_extensions": types.iter().map(|t| hex(&t.to_array())).collect::<Vec<_>>(),
        }),
        ClientExtension::Unknown(unknown) => json!({
            "extension_type": hex(&unknown.typ.to_array()),
            "extension_data": hex(unknown.payload.bytes()),
        }),
    }
}

fn key_share(entry: &KeyShareEntry) -> Value {
    json!({
        "group": hex(&entry.group.to_array()),
        "key_exchange": hex(&entry.payload.0),
    })
}

fn encrypted_client_hello(ech: &EncryptedClientHello) -> Value {
    match ech {
        EncryptedClientHello::Outer(outer) => outer_fields(hex(&[0]), outer),
        EncryptedClientHello::Inner => json!({ "type": hex(&[1]) }),
        EncryptedClientHello::Illegal {
            typ,
            outer: Some(outer),
        } => outer_fields(hex(&typ.to_array()), outer),
        EncryptedClientHello::Illegal { typ, outer: None } => json!({ "type": hex(&typ.to_array()) }),
    }
}

fn outer_fields(typ: Value, outer: &EncryptedClientHelloOuter) -> Value {
    json!({
        "type": typ,
        "cipher_suite": {
            "kdf_id": hex(&outer.cipher_suite.kdf_id.to_array()),
            "aead_id": hex(&outer.cipher_suite.aead_id.to_array()),
        },
        "config_id": outer.config_id,
        "enc": hex(&outer.enc.0),
        "payload": hex(&outer.payload.0),
    })
}

fn server_hello(sh: &ServerHelloPayload) -> Value {
    json!({
        "legacy_version": hex(&sh.legacy_version.to_array()),
        "random": hex(&sh.random.0),
        "legacy_session_id_echo": hex(sh.session_id.as_ref()),
        "cipher_suite": hex(&sh.cipher_suite.to_array()),
        "legacy_compression_method": hex(&sh.compression_method.to_array()),
        "extensions": server_extensions(&sh.extensions),
    })
}

fn server_extensions(exts: &[ServerExtension]) -> Value {
    let mut map = Map::new();
    for ext in exts {
        let value = match ext {
            ServerExtension::KeyShare(entry) => json!({ "key_share_entry": [key_share(entry)] }),
            ServerExtension::SupportedVersions(v) => json!({ "versions": [hex(&v.to_array())] }),
            ServerExtension::ServerNameAck => placeholder("ServerName"),
            ServerExtension::NamedGroups(groups) => json!({
                "named_group_list": groups.iter().map(|g| hex(&g.to_array())).collect::<Vec<_>>(),
            }),
            ServerExtension::EncryptedClientHello(ech) => json!({
                "retry_configs": ech.retry_configs.iter().map(ech_config).collect::<Vec<_>>(),
            }),
            ServerExtension::Unknown(unknown) => json!({
                "extension_type": hex(&unknown.typ.to_array()),
                "extension_data": hex(unknown.payload.bytes()),
            }),
        };
        map.insert(hex_string(&ext.ext_type().to_array()), value);
    }
    Value::Object(map)
}

fn hello_retry_request(hrr: &HelloRetryRequest) -> Value {
    let mut map = Map::new();
    for ext in &hrr.extensions {
        let value = match ext {
            HelloRetryExtension::KeyShare(group) => json!({ "group": hex(&group.to_array()) }),
            HelloRetryExtension::Cookie(cookie) => json!({ "cookie": hex(&cookie.0) }),
            HelloRetryExtension::SupportedVersions(v) => json!({ "versions": [hex(&v.to_array())] }),
            HelloRetryExtension::EchHelloRetryRequest(confirmation) => json!({
                "confirmation": hex(confirmation.bytes()),
            }),
            HelloRetryExtension::Unknown(unknown) => json!({
                "extension_type": hex(&unknown.typ.to_array()),
                "extension_data": hex(unknown.payload.bytes()),
            }),
        };
        map.insert(hex_string(&ext.ext_type().to_array()), value);
    }

    json!({
        "legacy_version": hex(&hrr.legacy_version.to_array()),
        "legacy_session_id_echo": hex(hrr.session_id.as_ref()),
        "cipher_suite": hex(&hrr.cipher_suite.to_array()),
        "extensions": map,
    })
}

fn ech_config(config: &EchConfigPayload) -> Value {
    match config {
        EchConfigPayload::V18(contents) => json!({
            "version": hex(&EchVersion::V18.to_array()),
            "key_config": {
                "config_id": contents.key_config.config_id,
                "kem_id": hex(&contents.key_config.kem_id.to_array()),
                "public_key": hex(&contents.key_config.public_key.0),
                "cipher_suites": contents.key_config.symmetric_cipher_suites.iter().map(|cs| json!({
                    "kdf_id": hex(&cs.kdf_id.to_array()),
                    "aead_id": hex(&cs.aead_id.to_array()),
                })).collect::<Vec<_>>(),
            },
            "maximum_name_length": contents.maximum_name_length,
            "public_name": hex(contents.public_name.as_bytes()),
            "extensions": hex(&contents.extensions.0),
        }),
        EchConfigPayload::Unknown { version, contents } => json!({
            "version": hex(&version.to_array()),
            "contents": hex(&contents.0),
        }),
    }
}

fn alert_message(alert: &AlertMessagePayload) -> Value {
    json!({
        "level": hex(&alert.level.to_array()),
        "description": hex(&alert.description.to_array()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::{AlertDescription, CipherSuite, HandshakeType, ProtocolVersion};
    use crate::msgs::base::Payload;
    use crate::msgs::enums::{AlertLevel, Compression, NamedGroup};
    use crate::msgs::handshake::{HandshakeMessagePayload, Random, SessionId};

    fn hello() -> ClientHelloPayload {
        ClientHelloPayload {
            client_version: ProtocolVersion::TLSv1_2,
            random: Random([0xab; 32]),
            session_id: SessionId::empty(),
            cipher_suites: vec![CipherSuite::TLS13_AES_128_GCM_SHA256],
            compression_methods: vec![Compression::Null],
            extensions: [
                ClientExtension::ServerName("a.b".into()),
                ClientExtension::KeyShare(vec![KeyShareEntry::new(NamedGroup::X25519, vec![1, 2])]),
                ClientExtension::EncryptedClientHello(EncryptedClientHello::Inner),
            ]
            .into_iter()
            .collect(),
        }
    }

    fn alert() -> Message {
        Message {
            version: ProtocolVersion::TLSv1_2,
            payload: MessagePayload::Alert(AlertMessagePayload {
                level: AlertLevel::Fatal,
                description: AlertDescription::IllegalParameter,
            }),
        }
    }

    #[test]
    fn empty_stack() {
        assert_eq!(MessageStack::new().marshal(), "[]");
        assert!(MessageStack::new().is_empty());
    }

    fn labels(stack: &MessageStack) -> Vec<String> {
        let parsed: Value = serde_json::from_str(&stack.marshal()).unwrap();
        parsed
            .as_array()
            .unwrap()
            .iter()
            .map(|entry| {
                entry
                    .as_object()
                    .unwrap()
                    .keys()
                    .next()
                    .unwrap()
                    .clone()
            })
            .collect()
    }

    fn outer() -> Message {
        Message {
            version: ProtocolVersion::TLSv1_0,
            payload: MessagePayload::handshake(HandshakeMessagePayload::client_hello(hello())),
        }
    }

    #[test]
    fn inner_comes_first_then_arrival_order() {
        let mut stack = MessageStack::new();
        stack.client_hello_inner(&hello());
        stack.push(&outer());
        stack.push(&alert());

        assert_eq!(labels(&stack), ["ClientHelloInner", "ClientHello", "Alert"]);
        let parsed: Value = serde_json::from_str(&stack.marshal()).unwrap();
        assert_eq!(
            parsed[2]["Alert"],
            json!({ "level": "0x02", "description": "0x2f" })
        );
    }

    #[test]
    fn every_inner_is_kept() {
        let mut stack = MessageStack::new();
        stack.client_hello_inner(&hello());
        stack.push(&outer());
        stack.client_hello_inner(&hello());
        stack.push(&outer());
        stack.push(&alert());

        assert_eq!(
            labels(&stack),
            ["ClientHelloInner", "ClientHello", "ClientHelloInner", "ClientHello", "Alert"]
        );
    }

    #[test]
    fn fields_are_hex_and_empty_is_blank() {
        let value = client_hello(&hello());
        assert_eq!(value["legacy_version"], "0x0303");
        assert_eq!(value["legacy_session_id"], "");
        assert_eq!(value["cipher_suites"], json!(["0x1301"]));
        assert_eq!(
            value["extensions"]["0x0000"],
            json!({ "server_name": "0x612e62" })
        );
        assert_eq!(value["extensions"]["0xfe0d"], json!({ "type": "0x01" }));

        // extension order survives
        let keys: Vec<&String> = value["extensions"]
            .as_object()
            .unwrap()
            .keys()
            .collect();
        assert_eq!(keys, ["0x0000", "0x0033", "0xfe0d"]);
    }

    #[test]
    fn unknown_handshake_is_a_placeholder() {
        let mut stack = MessageStack::new();
        stack.push(&Message {
            version: ProtocolVersion::TLSv1_3,
            payload: MessagePayload::handshake(HandshakeMessagePayload {
                typ: HandshakeType::KeyUpdate,
                payload: HandshakePayload::Unknown(Payload::new(vec![0])),
            }),
        });
        assert_eq!(stack.marshal(), r#"[{"KeyUpdate":"$KeyUpdate"}]"#);
    }
}
