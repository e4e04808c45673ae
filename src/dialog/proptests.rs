//! Property-based tests for profile derivation and dialog liveness

use super::profile::{ProfileField, UnknownFieldPolicy, UserProfile};
use crate::runtime::testing::{DirectoryCall, TestRuntime};
use crate::services::IntentPrediction;
use proptest::prelude::*;
use serde_json::{json, Map, Value};

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_name() -> impl Strategy<Value = String> {
    "[A-Z][a-z]{1,8}( [A-Z][a-z]{1,8})?"
}

fn arb_domain() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("@student.hogent.be".to_string()),
        Just("@hogent.be".to_string()),
    ]
}

/// Profile fields as (key, value) pairs in a shuffled order
fn arb_reply_fields() -> impl Strategy<Value = (String, String, String, Vec<(String, String)>)> {
    (arb_name(), arb_name(), arb_domain(), "[a-z]{0,10}").prop_flat_map(
        |(given, sur, domain, department)| {
            let fields = vec![
                ("GivenName".to_string(), given.clone()),
                ("SurName".to_string(), sur.clone()),
                ("Domain".to_string(), domain.clone()),
                ("Department".to_string(), department),
            ];
            (Just(given), Just(sur), Just(domain), Just(fields).prop_shuffle())
        },
    )
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    /// Derived names depend only on the fields, never on the order they arrive in
    #[test]
    fn prop_principal_independent_of_arrival_order(
        (given, sur, domain, fields) in arb_reply_fields(),
        split in 0usize..4,
    ) {
        let mut profile = UserProfile::default();
        let (first, second) = fields.split_at(split);
        for batch in [first, second] {
            let map: Map<String, Value> = batch
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect();
            profile.merge_fields(&map, UnknownFieldPolicy::Ignore).unwrap();
        }

        let prefix = format!("{}{}", given.replace(' ', ""), sur.replace(' ', ""));
        prop_assert_eq!(profile.domain_name_prefix(), Some(prefix.clone()));
        prop_assert_eq!(profile.principal_name(), Some(format!("{prefix}{domain}")));
    }

    /// Both names win over an override, whichever came first
    #[test]
    fn prop_names_override_domain_name(
        given in arb_name(),
        sur in arb_name(),
        override_name in "[a-z]{1,10}",
        override_first in any::<bool>(),
    ) {
        let mut profile = UserProfile::default();
        let names: Map<String, Value> = [
            (ProfileField::GivenName.key().to_string(), json!(given)),
            (ProfileField::SurName.key().to_string(), json!(sur)),
        ]
        .into_iter()
        .collect();

        if override_first {
            profile.set_domain_name(&override_name);
            profile.merge_fields(&names, UnknownFieldPolicy::Ignore).unwrap();
        } else {
            profile.merge_fields(&names, UnknownFieldPolicy::Ignore).unwrap();
            profile.set_domain_name(&override_name);
        }

        let expected = format!("{}{}", given.replace(' ', ""), sur.replace(' ', ""));
        prop_assert_eq!(profile.domain_name_prefix(), Some(expected));
    }

    /// Unknown keys never change the profile under the ignore policy
    #[test]
    fn prop_unknown_keys_are_ignored(key in "[a-z]{3,12}", value in "[a-z]{0,12}") {
        prop_assume!(ProfileField::from_key(&key).is_none());
        let mut profile = UserProfile::default();
        let map: Map<String, Value> = [(key, json!(value))].into_iter().collect();
        profile.merge_fields(&map, UnknownFieldPolicy::Ignore).unwrap();
        prop_assert_eq!(profile, UserProfile::default());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Removal happens exactly when the confirmation selects code 2,
    /// and the conversation always ends with an empty stack
    #[test]
    fn prop_remove_only_on_affirmative_code(code in 0i64..5, as_text in any::<bool>()) {
        runtime().block_on(async {
            let rt = TestRuntime::builder().build();
            rt.nlu.queue(
                IntentPrediction::new("Remove User").with_entity("DomainName", "johndoe2"),
            );

            rt.send_text("hello").await;
            rt.send_text("remove johndoe2").await;
            rt.send_value(json!({ "Domain": "@hogent.be" })).await;
            let selection = if as_text { json!(code.to_string()) } else { json!(code) };
            let outcome = rt.send_value(json!({ "SingleSelectVal": selection })).await;

            let removed = rt
                .directory
                .calls()
                .contains(&DirectoryCall::RemoveUser("johndoe2@hogent.be".to_string()));
            assert_eq!(removed, code == 2);
            assert_eq!(outcome.depth, 0);
            assert!(!outcome.waiting);
        });
    }

    /// Any free-text answers drive the domain-name dialog to completion
    #[test]
    fn prop_domain_name_dialog_terminates(
        name in "[a-z]{1,12}",
        domain in arb_domain(),
        action in prop_oneof![Just("Get User"), Just("Disable User"), Just("Enable User")],
    ) {
        runtime().block_on(async {
            let rt = TestRuntime::builder().build();
            rt.nlu.queue(IntentPrediction::new(action));

            rt.send_text("hello").await;
            let asked = rt.send_text("do something with a user").await;
            assert!(asked.waiting);
            let asked = rt.send_text(&name).await;
            assert!(asked.waiting);
            let done = rt.send_value(json!({ "Domain": domain })).await;

            assert_eq!(done.depth, 0);
            assert_eq!(rt.directory.calls().len(), 1);
        });
    }
}
