// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::path::PathBuf;
use warden_core::{FakeClock, ProgramDraft};

fn setup(capacity: usize) -> (Arc<MetricBuffer<FakeClock>>, Store, FakeClock, tempfile::TempDir, i64)
{
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(&dir.path().join("warden.db"), 2).unwrap();
    let program = store
        .create_program(
            &ProgramDraft { name: "p".into(), path: PathBuf::from("/bin/p"), ..Default::default() },
            0,
        )
        .unwrap();
    let clock = FakeClock::new();
    let buffer = Arc::new(MetricBuffer::new(store.clone(), clock.clone(), capacity));
    (buffer, store, clock, dir, program.id)
}

#[test]
fn add_buffers_without_persisting_below_capacity() {
    let (buffer, store, _clock, _dir, id) = setup(10);
    buffer.add(id, 1.0, 10.0);
    buffer.add(id, 2.0, 20.0);

    assert_eq!(buffer.len(), 2);
    assert!(store.list_samples(id, 0).unwrap().is_empty());
}

#[test]
fn capacity_triggers_immediate_batch_insert() {
    let (buffer, store, _clock, _dir, id) = setup(3);
    buffer.add(id, 1.0, 10.0);
    buffer.add(id, 2.0, 20.0);
    buffer.add(id, 3.0, 30.0);

    assert!(buffer.is_empty());
    assert_eq!(store.list_samples(id, 0).unwrap().len(), 3);
}

#[test]
fn flush_drains_everything() {
    let (buffer, store, clock, _dir, id) = setup(100);
    buffer.add(id, 1.0, 10.0);
    clock.advance(Duration::from_secs(1));
    buffer.add(id, 2.0, 20.0);

    buffer.flush();
    assert!(buffer.is_empty());

    let samples = store.list_samples(id, 0).unwrap();
    assert_eq!(samples.len(), 2);
    assert!(samples[0].ts_ms < samples[1].ts_ms);
}

#[test]
fn flush_of_empty_buffer_is_a_no_op() {
    let (buffer, _store, _clock, _dir, _id) = setup(10);
    buffer.flush();
    assert!(buffer.is_empty());
}

#[test]
fn timestamps_are_non_decreasing_per_program() {
    let (buffer, store, clock, _dir, id) = setup(100);
    for i in 0..5 {
        buffer.add(id, i as f32, 1.0);
        clock.advance(Duration::from_millis(250));
    }
    buffer.flush();

    let samples = store.list_samples(id, 0).unwrap();
    assert!(samples.windows(2).all(|w| w[0].ts_ms <= w[1].ts_ms));
}

#[tokio::test]
async fn shutdown_flushes_the_final_window() {
    let (buffer, store, _clock, _dir, id) = setup(100);
    let shutdown = CancellationToken::new();
    let handle = Arc::clone(&buffer).spawn_flusher(Duration::from_secs(600), shutdown.clone());

    buffer.add(id, 1.0, 10.0);
    shutdown.cancel();
    handle.await.unwrap();

    assert_eq!(store.list_samples(id, 0).unwrap().len(), 1);
}
