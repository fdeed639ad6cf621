//! Property-based tests for duplicate parameter collapsing

use std::collections::HashMap;
use chatty::backend::middleware::hpp::collapse;
use chatty::backend::server::config::PollutionRule;
use proptest::prelude::*;

fn pairs() -> impl Strategy<Value = Vec<(String, String)>> {
    prop::collection::vec(("[a-d]", "[a-z0-9]{0,4}"), 0..24)
}

proptest! {
    #[test]
    fn test_collapse_keeps_one_value_per_key(input in pairs()) {
        let (kept, discarded) = collapse(input.clone(), PollutionRule::LastWins);

        let mut seen = std::collections::HashSet::new();
        for (key, _) in &kept {
            prop_assert!(seen.insert(key.clone()));
        }
        prop_assert_eq!(kept.len() + discarded.len(), input.len());
    }

    #[test]
    fn test_last_wins(input in pairs()) {
        let (kept, _) = collapse(input.clone(), PollutionRule::LastWins);
        let last: HashMap<_, _> = input.into_iter().collect();
        for (key, value) in kept {
            prop_assert_eq!(Some(&value), last.get(&key));
        }
    }

    #[test]
    fn test_first_wins(input in pairs()) {
        let (kept, _) = collapse(input.clone(), PollutionRule::FirstWins);
        let mut first = HashMap::new();
        for (key, value) in input {
            first.entry(key).or_insert(value);
        }
        for (key, value) in kept {
            prop_assert_eq!(Some(&value), first.get(&key));
        }
    }
}
