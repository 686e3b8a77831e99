use super::{expect_alert, send_offer, with_socket, Case, Section, Target};
use crate::client::ech::EchEncoding;
use crate::enums::AlertDescription;
use crate::msgs::ech::EchConfigPayload;
use crate::outcome::Outcome;

pub(super) const SECTION: Section = Section {
    label: "5.1-9",
    url: "https://datatracker.ietf.org/doc/html/draft-ietf-tls-esni-18#section-5.1-9",
    cases: &[Case {
        description: "MUST abort with an \"illegal_parameter\" alert, if EncodedClientHelloInner \
                      is padded with non-zero values.",
        probe: non_zero_padding,
    }],
};

fn non_zero_padding(target: &Target, config: &EchConfigPayload) -> Outcome {
    with_socket(target, |hs, stack| {
        send_offer(hs, stack, target, config, EchEncoding::NonZeroPadding)?;
        expect_alert(hs, stack, AlertDescription::IllegalParameter)
    })
}
