//! Property tests for dependency-token combination.

use parablock_core::{JobCompletion, JobHandle};
use proptest::prelude::*;

proptest! {
    #[test]
    fn combined_handle_completes_only_when_all_finish(
        finish in prop::collection::vec(any::<bool>(), 0..12),
    ) {
        let mut completions: Vec<Option<JobCompletion>> = Vec::new();
        let mut handles = Vec::new();
        for _ in &finish {
            let (h, c) = JobHandle::new();
            handles.push(h);
            completions.push(Some(c));
        }
        let combined = JobHandle::combine(handles);

        for (done, c) in finish.iter().zip(completions.iter_mut()) {
            if *done {
                c.take().unwrap().finish();
            }
        }
        prop_assert_eq!(combined.is_completed(), finish.iter().all(|d| *d));

        completions.clear();
        prop_assert!(combined.is_completed());
        combined.wait();
    }

    #[test]
    fn prune_drops_finished_receivers(total in 1usize..10, finished in 0usize..10) {
        let finished = finished.min(total);
        let mut completions = Vec::new();
        let mut handles = Vec::new();
        for _ in 0..total {
            let (h, c) = JobHandle::new();
            handles.push(h);
            completions.push(c);
        }
        let mut combined = JobHandle::combine(handles);
        for c in completions.drain(..finished) {
            c.finish();
        }
        let done = combined.prune();
        prop_assert_eq!(done, finished == total);
        prop_assert_eq!(combined.tracked_jobs(), total - finished);
    }
}
