//! Concurrent writers against one database file, each with its own handle.

use std::path::Path;
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use ovpn_radius_core::{RadiusError, SessionRecord, SessionStore, StoreLock};

fn open_store(dir: &Path) -> SessionStore {
    SessionStore::open(
        &dir.join("sessions.db"),
        StoreLock::new(dir.join("sessions.db.lock"), Duration::from_secs(10)),
    )
    .expect("open store")
}

#[test]
fn concurrent_create_same_key_has_one_winner() {
    let dir = tempfile::tempdir().expect("temp dir");
    // Create the schema up front so both racers only contend on the insert.
    drop(open_store(dir.path()));

    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = ["alice", "mallory"]
        .into_iter()
        .map(|principal| {
            let barrier = Arc::clone(&barrier);
            let path = dir.path().to_path_buf();
            thread::spawn(move || {
                let store = open_store(&path);
                barrier.wait();
                store.create(&SessionRecord::new("10.0.0.5:4000", principal, None))
            })
        })
        .collect();

    let results: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().expect("racer thread"))
        .collect();

    let winners = results.iter().filter(|r| r.is_ok()).count();
    let duplicates = results
        .iter()
        .filter(|r| matches!(r, Err(RadiusError::DuplicateSession(_))))
        .count();
    assert_eq!(winners, 1);
    assert_eq!(duplicates, 1);

    let store = open_store(dir.path());
    assert_eq!(store.list_all().expect("list").len(), 1);
}

#[test]
fn many_sessions_created_concurrently_are_all_persisted() {
    let dir = tempfile::tempdir().expect("temp dir");
    drop(open_store(dir.path()));

    let handles: Vec<_> = (0..8u16)
        .map(|i| {
            let path = dir.path().to_path_buf();
            thread::spawn(move || {
                let store = open_store(&path);
                let key = format!("10.0.0.{i}:{}", 4000 + i);
                store.create(&SessionRecord::new(key.as_str(), format!("user{i}"), None))?;
                let mut record = store.get(&key)?;
                record.endpoint = Some(format!("10.8.0.{}", i + 2));
                store.update(&record)
            })
        })
        .collect();

    for handle in handles {
        handle.join().expect("writer thread").expect("writer succeeds");
    }

    let records = open_store(dir.path()).list_all().expect("list");
    assert_eq!(records.len(), 8);
    assert!(records.iter().all(|r| r.endpoint.is_some()));
}
