//! Obtaining the ECHConfigs to test with, and checking them against
//! the mandatory-to-implement HPKE cipher suite.

use std::fs;
use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::proto::rr::rdata::svcb::{SvcParamKey, SvcParamValue};
use hickory_resolver::proto::rr::{RData, RecordType};
use hickory_resolver::Resolver;
use log::{debug, warn};

use crate::error::ConfigError;
use crate::msgs::codec::{read_vec_u16, Reader};
use crate::msgs::ech::EchConfigPayload;
use crate::msgs::enums::{HpkeAead, HpkeKdf, HpkeKem};

const PEM_BEGIN: &str = "-----BEGIN ECH CONFIGS-----";
const PEM_END: &str = "-----END ECH CONFIGS-----";

/// Decode an `ECHConfigList`: a u16 length, then the configs.
///
/// The length must cover the rest of `bytes` exactly.
pub fn parse(bytes: &[u8]) -> Result<Vec<EchConfigPayload>, ConfigError> {
    let declared = match bytes {
        [hi, lo, ..] => usize::from(u16::from_be_bytes([*hi, *lo])),
        _ => return Err(ConfigError::Parse),
    };
    if declared + 2 != bytes.len() {
        debug!(
            "ECHConfigList declares {} bytes but carries {}",
            declared,
            bytes.len() - 2
        );
        return Err(ConfigError::Parse);
    }

    let mut rd = Reader::init(bytes);
    let configs = read_vec_u16::<EchConfigPayload>(&mut rd).map_err(|err| {
        debug!("Cannot decode ECHConfigList: {:?}", err);
        ConfigError::Parse
    })?;

    match configs.is_empty() {
        true => Err(ConfigError::Parse),
        false => Ok(configs),
    }
}

/// Decode the text of an `ECH CONFIGS` PEM file.
pub fn parse_pem(text: &str) -> Result<Vec<EchConfigPayload>, ConfigError> {
    let b64: String = text
        .replace(PEM_BEGIN, "")
        .replace(PEM_END, "")
        .split_whitespace()
        .collect();
    let bytes = STANDARD
        .decode(b64.as_bytes())
        .map_err(|_| ConfigError::Parse)?;
    parse(&bytes)
}

pub fn read_pem_file(path: &Path) -> Result<Vec<EchConfigPayload>, ConfigError> {
    let text = fs::read_to_string(path).map_err(|err| ConfigError::File(err.to_string()))?;
    parse_pem(&text)
}

/// Fetch the ECHConfigs published in `hostname`'s HTTPS resource record.
pub fn resolve_via_dns(hostname: &str) -> Result<Vec<EchConfigPayload>, ConfigError> {
    let resolver = Resolver::new(ResolverConfig::default(), ResolverOpts::default())
        .map_err(|err| ConfigError::Dns(err.to_string()))?;
    let lookup = resolver
        .lookup(hostname, RecordType::HTTPS)
        .map_err(|err| ConfigError::Dns(err.to_string()))?;

    let list = lookup
        .record_iter()
        .find_map(|r| match r.data() {
            Some(RData::HTTPS(svcb)) => svcb
                .svc_params()
                .iter()
                .find_map(|sp| match sp {
                    (SvcParamKey::EchConfig, SvcParamValue::EchConfig(e)) => Some(e.0.clone()),
                    _ => None,
                }),
            _ => None,
        })
        .ok_or(ConfigError::NoEchSvcParam)?;

    debug!("HTTPS record for {} carries {} bytes of ECHConfigs", hostname, list.len());
    parse(&list)
}

/// Whether `config` offers DHKEM(X25519, HKDF-SHA256) together with
/// HKDF-SHA256/AES-128-GCM.
pub fn is_compliant(config: &EchConfigPayload) -> bool {
    let Some(contents) = config.contents() else {
        return false;
    };
    let key_config = &contents.key_config;

    key_config.kem_id == HpkeKem::DHKEM_X25519_HKDF_SHA256
        && key_config
            .symmetric_cipher_suites
            .iter()
            .any(|cs| cs.kdf_id == HpkeKdf::HKDF_SHA256 && cs.aead_id == HpkeAead::AES_128_GCM)
}

/// The first compliant config, in publication order.
pub fn pick_compliant(configs: &[EchConfigPayload]) -> Result<&EchConfigPayload, ConfigError> {
    configs
        .iter()
        .find(|c| is_compliant(c))
        .ok_or(ConfigError::NoCompliantConfig)
}

/// Choose the config to test with.
///
/// With `force_compliant` only a compliant config will do; otherwise the
/// first config of a version we understand is taken.
pub fn select(
    configs: &[EchConfigPayload],
    force_compliant: bool,
) -> Result<&EchConfigPayload, ConfigError> {
    if force_compliant {
        return pick_compliant(configs);
    }

    for config in configs {
        match config {
            EchConfigPayload::V18(_) => return Ok(config),
            EchConfigPayload::Unknown { version, .. } => {
                warn!("Skipping ECHConfig of unknown version {:?}", version)
            }
        }
    }
    Err(ConfigError::Parse)
}
