//! Property tests for rule identity.

use proptest::prelude::*;
use signalform_provider::validation::Severity;
use signalform_provider::{Rule, RuleSet, rule_hash};

fn severity() -> impl Strategy<Value = Severity> {
    prop::sample::select(Severity::ALL.to_vec())
}

fn notification() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z]{1,8}@example\\.com".prop_map(|address| format!("Email,{address}")),
        "[A-Z0-9]{4,8}".prop_map(|id| format!("PagerDuty,{id}")),
        ("[A-Z0-9]{4,8}", "[a-z-]{1,12}").prop_map(|(id, channel)| format!("Slack,{id},{channel}")),
        "[A-Z0-9]{4,8}".prop_map(|id| format!("Team,{id}")),
    ]
}

prop_compose! {
    fn rule()(
        severity in severity(),
        detect_label in "[a-z ]{1,16}",
        description in "[ -~]{0,24}",
        disabled in any::<bool>(),
        notifications in prop::collection::vec(notification(), 0..4),
        tip in "[ -~]{0,24}",
    ) -> Rule {
        Rule {
            description,
            disabled,
            notifications,
            tip,
            ..Rule::new(severity, detect_label)
        }
    }
}

proptest! {
    #[test]
    fn test_hash_ignores_notification_order(rule in rule()) {
        let mut reversed = rule.clone();
        reversed.notifications.reverse();
        prop_assert_eq!(rule_hash(&rule), rule_hash(&reversed));
    }

    #[test]
    fn test_hash_tracks_detect_label(rule in rule(), suffix in "[a-z]{1,4}") {
        let mut changed = rule.clone();
        changed.detect_label.push_str(&suffix);
        prop_assert_ne!(rule_hash(&rule), rule_hash(&changed));
    }

    #[test]
    fn test_set_is_order_independent(rules in prop::collection::vec(rule(), 0..6)) {
        let forward: RuleSet = rules.iter().cloned().collect();
        let backward: RuleSet = rules.iter().rev().cloned().collect();
        prop_assert_eq!(&forward, &backward);
        prop_assert!(forward.len() <= rules.len());
        for rule in &rules {
            prop_assert!(forward.contains(rule.hash()));
        }
    }

    #[test]
    fn test_set_serializes_in_hash_order(rules in prop::collection::vec(rule(), 0..6)) {
        let set: RuleSet = rules.into_iter().collect();
        let encoded = serde_json::to_value(&set).unwrap();
        let decoded: RuleSet = serde_json::from_value(encoded.clone()).unwrap();
        prop_assert_eq!(&decoded, &set);

        let hashes: Vec<u32> = set.hashes().collect();
        let mut sorted = hashes.clone();
        sorted.sort_unstable();
        prop_assert_eq!(hashes, sorted);
    }
}
