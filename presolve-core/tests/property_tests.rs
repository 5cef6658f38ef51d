//! Property tests for the value stack and the index maps.

use presolve_core::datastack::DataStack;
use presolve_core::PostsolveStack;
use proptest::prelude::*;

proptest! {
    #[test]
    fn scalars_round_trip_in_reverse_order(values in prop::collection::vec(-1e12f64..1e12, 1..64)) {
        let mut stack = DataStack::new();
        for &v in &values {
            stack.push(v);
        }
        stack.reset_position();
        for &v in values.iter().rev() {
            prop_assert_eq!(stack.pop::<f64>(), v);
        }
        prop_assert_eq!(stack.position(), 0);
    }

    #[test]
    fn nonzero_lists_pop_in_reverse_push_order(
        lists in prop::collection::vec(
            prop::collection::vec((0usize..1000, -1e6f64..1e6), 0..16),
            1..8,
        )
    ) {
        let mut stack = DataStack::new();
        for list in &lists {
            stack.push_nonzeros(list);
        }
        stack.reset_position();

        let mut out = Vec::new();
        for list in lists.iter().rev() {
            stack.pop_nonzeros(&mut out);
            prop_assert_eq!(&out, list);
        }
        prop_assert_eq!(stack.position(), 0);
    }

    #[test]
    fn reset_makes_replay_repeatable(
        lists in prop::collection::vec(
            prop::collection::vec((0usize..1000, -1e6f64..1e6), 0..8),
            1..5,
        )
    ) {
        let mut stack = DataStack::new();
        for list in &lists {
            stack.push_nonzeros(list);
        }

        let mut out = Vec::new();
        for _ in 0..2 {
            stack.reset_position();
            for list in lists.iter().rev() {
                stack.pop_nonzeros(&mut out);
                prop_assert_eq!(&out, list);
            }
        }
    }

    #[test]
    fn compressed_maps_stay_monotone_and_above_their_index(
        keep in prop::collection::vec(any::<bool>(), 1..64)
    ) {
        let n = keep.len();
        let mut next = 0usize;
        let new_index: Vec<Option<usize>> = keep
            .iter()
            .map(|&k| {
                if k {
                    let idx = next;
                    next += 1;
                    Some(idx)
                } else {
                    None
                }
            })
            .collect();

        let mut stack = PostsolveStack::new();
        stack.initialize_index_maps(0, n);
        stack.compress_index_maps(&[], &new_index);

        let mut prev: Option<usize> = None;
        for reduced in 0..next {
            let orig = stack.get_orig_col_index(reduced);
            // presolve only removes, so the original index never drops
            // below the reduced one and the map stays strictly increasing
            prop_assert!(orig >= reduced);
            if let Some(prev) = prev {
                prop_assert!(orig > prev);
            }
            prop_assert!(keep[orig]);
            prev = Some(orig);
        }
    }
}
