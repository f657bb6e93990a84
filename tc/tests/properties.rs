//! Property tests for the structural invariants
//!
//! Whatever numbering or typing the model hands back, step numbers stay
//! dense and the breakdown always adds up.

use proptest::prelude::*;

use taskcapture::domain::{Breakdown, LeafType, MicroStep, renumber};

fn leaf_strategy() -> impl Strategy<Value = LeafType> {
    prop_oneof![
        Just(LeafType::Digital),
        Just(LeafType::Human),
        Just(LeafType::Unknown),
    ]
}

fn step_strategy() -> impl Strategy<Value = MicroStep> {
    (any::<u32>(), 0u8..=5, leaf_strategy(), "[a-z ]{1,40}").prop_map(|(number, minutes, leaf, desc)| {
        let mut step = MicroStep::new("task-prop", number, desc);
        step.estimated_minutes = minutes;
        step.leaf_type = leaf;
        step
    })
}

proptest! {
    #[test]
    fn renumber_is_dense_for_any_input(mut steps in proptest::collection::vec(step_strategy(), 1..20)) {
        renumber(&mut steps);

        let numbers: Vec<u32> = steps.iter().map(|s| s.step_number).collect();
        let expected: Vec<u32> = (1..=steps.len() as u32).collect();
        prop_assert_eq!(numbers, expected);
    }

    #[test]
    fn breakdown_counts_always_add_up(steps in proptest::collection::vec(step_strategy(), 0..20)) {
        let b = Breakdown::from_steps(&steps);

        prop_assert_eq!(b.total_steps, steps.len());
        prop_assert_eq!(b.total_steps, b.digital_count + b.human_count + b.unknown_count);
        prop_assert_eq!(b.needs_clarification(), b.unknown_count > 0);

        let minutes: u32 = steps.iter().map(|s| u32::from(s.estimated_minutes)).sum();
        prop_assert_eq!(b.total_minutes, minutes);
    }

    #[test]
    fn renumber_preserves_order_and_content(steps in proptest::collection::vec(step_strategy(), 1..20)) {
        let mut renumbered = steps.clone();
        renumber(&mut renumbered);

        for (before, after) in steps.iter().zip(renumbered.iter()) {
            prop_assert_eq!(&before.description, &after.description);
            prop_assert_eq!(before.leaf_type, after.leaf_type);
            prop_assert_eq!(before.estimated_minutes, after.estimated_minutes);
        }
    }
}
