use super::{expect_alert, send_offer, with_socket, Case, Section, Target};
use crate::client::ech::EchEncoding;
use crate::enums::AlertDescription;
use crate::msgs::ech::EchConfigPayload;
use crate::outcome::Outcome;

pub(super) const SECTION: Section = Section {
    label: "7-5",
    url: "https://datatracker.ietf.org/doc/html/draft-ietf-tls-esni-22#section-7-5",
    cases: &[
        Case {
            description: "MUST abort with an \"illegal_parameter\" alert, if ECHClientHello.type \
                          is not a valid ECHClientHelloType in ClientHelloInner.",
            probe: illegal_inner_type,
        },
        Case {
            description: "MUST abort with an \"illegal_parameter\" alert, if ECHClientHello.type \
                          is not a valid ECHClientHelloType in ClientHelloOuter.",
            probe: illegal_outer_type,
        },
    ],
};

fn illegal_inner_type(target: &Target, config: &EchConfigPayload) -> Outcome {
    with_socket(target, |hs, stack| {
        send_offer(hs, stack, target, config, EchEncoding::IllegalInnerType)?;
        expect_alert(hs, stack, AlertDescription::IllegalParameter)
    })
}

fn illegal_outer_type(target: &Target, config: &EchConfigPayload) -> Outcome {
    with_socket(target, |hs, stack| {
        send_offer(hs, stack, target, config, EchEncoding::IllegalOuterType)?;
        expect_alert(hs, stack, AlertDescription::IllegalParameter)
    })
}
