use std::fmt;

use p256::elliptic_curve::sec1::ToEncodedPoint;
use rand_core::OsRng;

use crate::error::Error;
use crate::msgs::enums::NamedGroup;

/// Key exchange groups we can offer in `key_share`, in preference order.
pub static ALL_KX_GROUPS: &[NamedGroup] = &[NamedGroup::X25519, NamedGroup::secp256r1];

/// An in-progress key exchange.  This has the algorithm,
/// our private key, and our public key.
pub struct KeyExchange {
    group: NamedGroup,
    privkey: PrivateKey,
    pubkey: Vec<u8>,
}

enum PrivateKey {
    X25519(x25519_dalek::EphemeralSecret),
    Secp256r1(p256::ecdh::EphemeralSecret),
}

impl KeyExchange {
    /// Generate a fresh key pair for `group`.
    pub fn start(group: NamedGroup) -> Result<Self, Error> {
        let (privkey, pubkey) = match group {
            NamedGroup::X25519 => {
                let privkey = x25519_dalek::EphemeralSecret::random_from_rng(OsRng);
                let pubkey = x25519_dalek::PublicKey::from(&privkey);
                (PrivateKey::X25519(privkey), pubkey.as_bytes().to_vec())
            }
            NamedGroup::secp256r1 => {
                let privkey = p256::ecdh::EphemeralSecret::random(&mut OsRng);
                let pubkey = privkey
                    .public_key()
                    .to_encoded_point(false)
                    .as_bytes()
                    .to_vec();
                (PrivateKey::Secp256r1(privkey), pubkey)
            }
            other => return Err(Error::UnsupportedGroup(other)),
        };

        Ok(Self {
            group,
            privkey,
            pubkey,
        })
    }

    /// Return the group being used.
    pub fn group(&self) -> NamedGroup {
        self.group
    }

    /// Return the public key being used.
    pub fn pub_key(&self) -> &[u8] {
        &self.pubkey
    }

    /// Completes the key exchange, given the peer's public key.
    pub fn complete(self, peer: &[u8]) -> Result<Vec<u8>, Error> {
        match self.privkey {
            PrivateKey::X25519(privkey) => {
                let peer: [u8; 32] = peer
                    .try_into()
                    .map_err(|_| Error::General("invalid x25519 key share".into()))?;
                let shared = privkey.diffie_hellman(&x25519_dalek::PublicKey::from(peer));
                if !shared.was_contributory() {
                    return Err(Error::General("x25519 key share is a low order point".into()));
                }
                Ok(shared.as_bytes().to_vec())
            }
            PrivateKey::Secp256r1(privkey) => {
                let peer = p256::PublicKey::from_sec1_bytes(peer)
                    .map_err(|_| Error::General("invalid secp256r1 key share".into()))?;
                Ok(privkey
                    .diffie_hellman(&peer)
                    .raw_secret_bytes()
                    .to_vec())
            }
        }
    }
}

impl fmt::Debug for KeyExchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyExchange")
            .field("group", &self.group)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn agree_on_each_group() {
        for group in ALL_KX_GROUPS {
            let ours = KeyExchange::start(*group).unwrap();
            let theirs = KeyExchange::start(*group).unwrap();
            assert_eq!(ours.group(), *group);

            let their_pub = theirs.pub_key().to_vec();
            let our_pub = ours.pub_key().to_vec();
            assert_eq!(
                ours.complete(&their_pub).unwrap(),
                theirs.complete(&our_pub).unwrap()
            );
        }
    }

    #[test]
    fn public_key_sizes() {
        assert_eq!(
            KeyExchange::start(NamedGroup::X25519)
                .unwrap()
                .pub_key()
                .len(),
            32
        );
        let p256 = KeyExchange::start(NamedGroup::secp256r1).unwrap();
        assert_eq!(p256.pub_key().len(), 65);
        assert_eq!(p256.pub_key()[0], 0x04);
    }

    #[test]
    fn unsupported_group() {
        assert_eq!(
            KeyExchange::start(NamedGroup::X448).unwrap_err(),
            Error::UnsupportedGroup(NamedGroup::X448)
        );
    }

    #[test]
    fn bad_peer_key_is_an_error() {
        let kx = KeyExchange::start(NamedGroup::X25519).unwrap();
        assert!(kx.complete(&[1, 2, 3]).is_err());
        let kx = KeyExchange::start(NamedGroup::secp256r1).unwrap();
        assert!(kx.complete(&[4; 65]).is_err());
    }
}
