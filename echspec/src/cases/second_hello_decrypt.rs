use super::{expect_alert, provoke_hello_retry, with_socket, Case, Section, Target};
use crate::client::hs::retry_extensions;
use crate::enums::AlertDescription;
use crate::msgs::ech::EchConfigPayload;
use crate::msgs::handshake::ClientHelloPayload;
use crate::outcome::Outcome;

pub(super) const SECTION: Section = Section {
    label: "7.1.1-5",
    url: "https://datatracker.ietf.org/doc/html/draft-ietf-tls-esni-17#section-7.1.1-5",
    cases: &[Case {
        description: "MUST abort with a \"decrypt_error\" alert, if fails to decrypt 2nd \
                      ClientHelloOuter",
        probe: undecryptable_second_outer,
    }],
};

/// Seal the second ClientHelloInner one HPKE sequence number too late.
fn undecryptable_second_outer(target: &Target, config: &EchConfigPayload) -> Outcome {
    with_socket(target, |hs, stack| {
        let (offer, mut state, hrr) = provoke_hello_retry(hs, stack, target, config)?;

        let (extensions, key_share) = retry_extensions(&offer.inner.extensions, &hrr)?;
        let inner = ClientHelloPayload {
            extensions,
            ..offer.inner
        };
        state.skip_sequence()?;
        let second = state.offer_retry(&inner)?;
        stack.client_hello_inner(&second.inner);

        hs.send_client_hello(&second.outer, key_share.into_iter().collect(), stack)?;
        expect_alert(hs, stack, AlertDescription::DecryptError)
    })
}
