//! Property-based tests for the result pager

use super::*;
use proptest::prelude::*;

fn arb_pager() -> impl Strategy<Value = ResultPager<usize>> {
    (0usize..60, 1usize..15).prop_map(|(len, window)| ResultPager::new((0..len).collect(), window))
}

proptest! {
    /// Forward paging covers every item exactly once before repeating
    #[test]
    fn next_covers_every_item_once(mut pager in arb_pager()) {
        let len = pager.len();
        let mut seen = Vec::new();
        let mut last: Option<Vec<usize>> = None;

        for _ in 0..(len + 2) {
            let window = pager.next().to_vec();
            if last.as_ref() == Some(&window) {
                break;
            }
            seen.extend(window.iter().copied());
            last = Some(window);
        }

        prop_assert_eq!(seen, (0..len).collect::<Vec<_>>());
    }

    /// Once the end is reached, `next` keeps returning the same window
    #[test]
    fn next_is_idempotent_at_end(mut pager in arb_pager()) {
        let calls = pager.len() / pager.window_size() + 2;
        for _ in 0..calls {
            pager.next();
        }
        let cursor = pager.cursor();
        let end = pager.next().to_vec();
        for _ in 0..3 {
            prop_assert_eq!(pager.next().to_vec(), end.clone());
            prop_assert_eq!(pager.cursor(), cursor);
        }
    }

    /// Once the start is reached, `prev` keeps returning the first window
    #[test]
    fn prev_is_idempotent_at_start(mut pager in arb_pager(), forward in 0usize..8) {
        for _ in 0..forward {
            pager.next();
        }
        for _ in 0..=forward {
            pager.prev();
        }
        let first: Vec<usize> = pager.items().iter().copied().take(pager.window_size()).collect();
        for _ in 0..3 {
            prop_assert_eq!(pager.prev().to_vec(), first.clone());
            prop_assert_eq!(pager.cursor(), 0);
        }
    }

    /// Non-empty sequences never produce an empty window
    #[test]
    fn windows_are_never_empty(mut pager in arb_pager(), moves in proptest::collection::vec(any::<bool>(), 0..30)) {
        prop_assume!(!pager.is_empty());
        let size = pager.window_size();
        for forward in moves {
            let window = if forward { pager.next() } else { pager.prev() };
            prop_assert!(!window.is_empty());
            prop_assert!(window.len() <= size);
        }
    }
}
