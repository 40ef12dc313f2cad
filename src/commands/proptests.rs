//! Property-based tests for the directive grammar
//!
//! - Any well-formed line parses back to its fields
//! - Parsing never panics, whatever the input
//! - The reason keeps every colon after the second delimiter

use super::directive::parse_directive;
use crate::platform::UserId;
use crate::relay::ActionKind;
use proptest::prelude::*;

fn arb_action() -> impl Strategy<Value = (String, ActionKind)> {
    prop_oneof![
        "[bB][aA][nN]".prop_map(|s| (s, ActionKind::Ban)),
        "[pP][aA][rR][dD][oO][nN]".prop_map(|s| (s, ActionKind::Pardon)),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// Property: a well-formed directive yields exactly its fields
    #[test]
    fn well_formed_directive_parses(
        (action, kind) in arb_action(),
        target in any::<u64>(),
        reason in "[a-zA-Z0-9 :,.!?]{0,40}[a-zA-Z0-9]",
        mention in any::<bool>(),
    ) {
        let user = if mention { format!("<@{}>", target) } else { target.to_string() };
        let line = format!("{}:{}:{}", action, user, reason);

        let request = parse_directive(&line, UserId(7), true).unwrap();

        prop_assert_eq!(request.kind, kind);
        prop_assert_eq!(request.target, UserId(target));
        prop_assert_eq!(request.reason, reason.trim());
        prop_assert_eq!(request.issuer, UserId(7));
    }

    /// Property: arbitrary input is either parsed or rejected, never a panic
    #[test]
    fn parse_never_panics(line in ".{0,80}") {
        let _ = parse_directive(&line, UserId(1), true);
    }

    /// Property: lines without any colon are always rejected
    #[test]
    fn colonless_lines_are_rejected(line in "[^:]{0,60}") {
        prop_assert!(parse_directive(&line, UserId(1), true).is_err());
    }
}
