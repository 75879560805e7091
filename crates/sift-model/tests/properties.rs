#![forbid(unsafe_code)]
//! Property suite: the model stays internally consistent under arbitrary
//! generated histories.

use proptest::prelude::*;
use sift_history::{generate, GeneratorConfig};
use sift_model::{invariants, FsState};
use sift_types::{CompletionKind, Op};

fn run_checked(ops: &[Op]) -> FsState {
    let mut state = FsState::new();
    for (i, op) in ops.iter().enumerate() {
        let (next, completion) = state.apply(op);
        if completion.kind == CompletionKind::Fail {
            assert_eq!(next, state, "op {i} ({op}) failed but changed state");
        }
        let violations = invariants::violations(&next);
        assert!(violations.is_empty(), "op {i} ({op}): {violations:?}");
        state = next;
    }
    state
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn invariants_hold_after_every_operation(seed in any::<u64>()) {
        let config = GeneratorConfig {
            seed,
            length: 300,
            lose_unfsynced_writes: true,
        };
        run_checked(&generate(&config));
    }

    #[test]
    fn crash_leaves_a_self_contained_disk_image(seed in any::<u64>()) {
        let config = GeneratorConfig {
            seed,
            length: 200,
            lose_unfsynced_writes: false,
        };
        let state = run_checked(&generate(&config));
        let (crashed, completion) = state.apply(&Op::LoseUnfsyncedWrites);
        prop_assert_eq!(completion.kind, CompletionKind::Ok);
        let violations = invariants::post_crash_violations(&crashed);
        prop_assert!(violations.is_empty(), "{:?}", violations);
    }

    #[test]
    fn crash_is_idempotent(seed in any::<u64>()) {
        let config = GeneratorConfig {
            seed,
            length: 150,
            lose_unfsynced_writes: true,
        };
        let state = run_checked(&generate(&config));
        let (once, _) = state.apply(&Op::LoseUnfsyncedWrites);
        let (twice, _) = once.apply(&Op::LoseUnfsyncedWrites);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn apply_never_mutates_its_input(seed in any::<u64>()) {
        let config = GeneratorConfig {
            seed,
            length: 100,
            lose_unfsynced_writes: true,
        };
        let mut state = FsState::new();
        for op in generate(&config) {
            let snapshot = state.clone();
            let (next, _) = state.apply(&op);
            prop_assert_eq!(&state, &snapshot);
            state = next;
        }
    }
}
