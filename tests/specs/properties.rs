// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Property tests for the supervision invariants.

use super::prelude::*;
use proptest::prelude::*;
use warden_core::{EventKind, ResourceSample};

/// One step of the adversarial schedule driven at the supervisor.
#[derive(Debug, Clone)]
enum Step {
    /// Process appears (or changes pid).
    Appear(u32),
    /// Process disappears without operator involvement.
    Vanish,
    /// Operator flags an intentional stop, then the process disappears.
    OperatorStop,
    /// A sweep with no state change.
    Idle,
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        (1u32..10_000).prop_map(Step::Appear),
        Just(Step::Vanish),
        Just(Step::OperatorStop),
        Just(Step::Idle),
    ]
}

fn block_on(fut: impl std::future::Future<Output = ()>) {
    match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime.block_on(fut),
        Err(e) => panic!("tokio runtime: {e}"),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// The emitted event stream over one program is always a prefix of
    /// `(start (crash|stop)*)*`: starts and terminations strictly
    /// alternate, beginning with a start.
    #[test]
    fn event_stream_alternates(steps in proptest::collection::vec(step_strategy(), 1..40)) {
        block_on(async move {
            let rig = rig();
            let program = rig.register("p", &[]).await;

            for step in steps {
                match step {
                    Step::Appear(pid) => rig.adapter.set_running("p", pid),
                    Step::Vanish => rig.adapter.set_stopped("p"),
                    Step::OperatorStop => {
                        rig.ctx.handle.mark_intentional_stop("p");
                        rig.adapter.set_stopped("p");
                    }
                    Step::Idle => {}
                }
                rig.sweep().await;
            }

            let events = rig.events(program.id);
            for (index, kind) in events.iter().enumerate() {
                if index % 2 == 0 {
                    assert_eq!(*kind, EventKind::Start, "event {index} of {events:?}");
                } else {
                    assert!(
                        matches!(kind, EventKind::Stop | EventKind::Crash),
                        "event {index} of {events:?}"
                    );
                }
            }
        });
    }

    /// An exit with the intentional-stop flag set is always a stop; one
    /// without it is always a crash.
    #[test]
    fn stop_classification_follows_the_flag(intentional in any::<bool>()) {
        block_on(async move {
            let rig = rig();
            let program = rig.register("p", &[]).await;
            rig.adapter.set_running("p", 1);
            rig.sweep().await;

            if intentional {
                rig.ctx.handle.mark_intentional_stop("p");
            }
            rig.adapter.set_stopped("p");
            rig.sweep().await;

            let expected = if intentional { EventKind::Stop } else { EventKind::Crash };
            assert_eq!(rig.events(program.id), vec![EventKind::Start, expected]);
        });
    }

    /// Batch inserts change the sample count by exactly the batch size.
    #[test]
    fn batch_insert_cardinality(sizes in proptest::collection::vec(0usize..20, 1..6)) {
        block_on(async move {
            let rig = rig();
            let program = rig.register("p", &[]).await;

            let mut ts = 0i64;
            for size in sizes {
                let before = rig.store.list_samples(program.id, 0).unwrap().len();
                let rows: Vec<_> = (0..size)
                    .map(|i| {
                        ts += 1;
                        ResourceSample {
                            program_id: program.id,
                            cpu_percent: i as f32,
                            memory_mb: 1.0,
                            ts_ms: ts,
                        }
                    })
                    .collect();
                rig.store.insert_samples_batch(&rows).unwrap();
                let after = rig.store.list_samples(program.id, 0).unwrap().len();
                assert_eq!(after - before, rows.len());
            }
        });
    }

    /// After `invalidate_by_tag(t)`, no key tagged `t` is retrievable
    /// and untagged keys are unaffected.
    #[test]
    fn tag_invalidation_is_exact(
        keys in proptest::collection::btree_set("[a-z]{1,8}", 1..20),
        tagged_bits in proptest::collection::vec(any::<bool>(), 20),
    ) {
        block_on(async move {
            let rig = rig();
            let cache = &rig.ctx.cache;

            let keys: Vec<String> = keys.into_iter().collect();
            let mut tagged = Vec::new();
            let mut untagged = Vec::new();
            for (index, key) in keys.iter().enumerate() {
                if tagged_bits[index % tagged_bits.len()] {
                    cache.set(key, serde_json::json!(index), &["victim"]);
                    tagged.push(key.clone());
                } else {
                    cache.set(key, serde_json::json!(index), &["bystander"]);
                    untagged.push(key.clone());
                }
            }

            let removed = cache.invalidate_by_tag("victim");
            assert_eq!(removed, tagged.len());
            for key in &tagged {
                assert!(cache.get(key).is_none());
            }
            for key in &untagged {
                assert!(cache.get(key).is_some());
            }
        });
    }

    /// Per-program sample timestamps are non-decreasing in insertion
    /// order, and survive a store round-trip that way.
    #[test]
    fn sample_timestamps_monotonic(count in 1usize..30) {
        block_on(async move {
            let rig = rig();
            let program = rig.register("p", &[]).await;

            for i in 0..count {
                rig.buffer.add(program.id, i as f32, 1.0);
                rig.clock.advance(std::time::Duration::from_millis(37));
            }
            rig.buffer.flush();

            let samples = rig.store.list_samples(program.id, 0).unwrap();
            assert_eq!(samples.len(), count);
            assert!(samples.windows(2).all(|w| w[0].ts_ms <= w[1].ts_ms));
        });
    }
}
