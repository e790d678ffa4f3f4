//! End-to-end scenarios against the real inotify backend.

#![cfg(target_os = "linux")]

mod common;

use std::fs;
use std::sync::Arc;

use common::{Recorder, wait_for};
use vigil::{EventMask, InotifyBackend, LifecycleState, Notifier};

fn started_notifier() -> Notifier {
    let backend = InotifyBackend::new().expect("open inotify");
    let notifier = Notifier::builder()
        .backend(backend)
        .build()
        .expect("build notifier");
    notifier.start().expect("start notifier");
    notifier
}

#[test]
fn create_in_watched_directory() {
    let dir = tempfile::tempdir().expect("tempdir");
    let notifier = started_notifier();
    let recorder = Recorder::named("recorder");

    notifier
        .add_watch(
            dir.path(),
            EventMask::MODIFY | EventMask::CREATE,
            vec![Arc::clone(&recorder) as _],
        )
        .expect("add watch");

    fs::write(dir.path().join("a.txt"), b"hello").expect("create file");

    assert!(wait_for(|| {
        recorder
            .events()
            .iter()
            .any(|e| e.mask.contains(EventMask::CREATE))
    }));

    let events = recorder.events();
    let created = events
        .iter()
        .find(|e| e.mask.contains(EventMask::CREATE))
        .expect("create event");
    assert_eq!(created.name.as_deref(), Some("a.txt".as_ref()));
    assert_eq!(created.cookie, 0);
    assert_eq!(created.path, dir.path().join("a.txt"));

    notifier.request_stop();
    notifier.join();
}

#[test]
fn rename_produces_a_correlated_pair() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(dir.path().join("a.txt"), b"hello").expect("create file");

    let notifier = started_notifier();
    let recorder = Recorder::named("recorder");

    notifier
        .add_watch(dir.path(), EventMask::MOVE, vec![Arc::clone(&recorder) as _])
        .expect("add watch");

    fs::rename(dir.path().join("a.txt"), dir.path().join("b.txt")).expect("rename");

    assert!(wait_for(|| recorder.len() >= 2));

    let events = recorder.events();
    let from = events
        .iter()
        .find(|e| e.mask.contains(EventMask::MOVED_FROM))
        .expect("moved-from event");
    let to = events
        .iter()
        .find(|e| e.mask.contains(EventMask::MOVED_TO))
        .expect("moved-to event");

    assert_eq!(from.name.as_deref(), Some("a.txt".as_ref()));
    assert_eq!(to.name.as_deref(), Some("b.txt".as_ref()));
    assert_ne!(from.cookie, 0);
    assert_eq!(from.cookie, to.cookie);

    notifier.request_stop();
    notifier.join();
}

#[test]
fn removed_watch_is_silent() {
    let dir = tempfile::tempdir().expect("tempdir");
    let notifier = started_notifier();
    let recorder = Recorder::named("recorder");

    let handle = notifier
        .add_watch(
            dir.path(),
            EventMask::ALL_EVENTS,
            vec![Arc::clone(&recorder) as _],
        )
        .expect("add watch");

    notifier.remove_watch(handle).expect("remove watch");
    assert!(notifier.registry().lookup(handle).is_none());

    fs::write(dir.path().join("a.txt"), b"unwatched").expect("create file");
    std::thread::sleep(std::time::Duration::from_millis(200));
    assert_eq!(recorder.len(), 0);

    notifier.request_stop();
    notifier.join();
}

#[test]
fn deleting_the_watched_target_drops_the_registration() {
    let dir = tempfile::tempdir().expect("tempdir");
    let target = dir.path().join("watched");
    fs::create_dir(&target).expect("mkdir");

    let notifier = started_notifier();
    let recorder = Recorder::named("recorder");

    let handle = notifier
        .add_watch(
            &target,
            EventMask::ALL_EVENTS,
            vec![Arc::clone(&recorder) as _],
        )
        .expect("add watch");

    fs::remove_dir(&target).expect("rmdir");

    // The kernel reports DELETE_SELF then IGNORED; the engine must
    // dispatch the final events and drop the entry on its own.
    assert!(wait_for(|| notifier.registry().lookup(handle).is_none()));
    assert!(
        recorder
            .events()
            .iter()
            .any(|e| e.mask.contains(EventMask::DELETE_SELF))
    );

    notifier.request_stop();
    notifier.join();
}

#[test]
fn stop_reaches_stopped_with_an_empty_registry() {
    let dir = tempfile::tempdir().expect("tempdir");
    let notifier = started_notifier();

    notifier
        .add_watch(dir.path(), EventMask::ALL_EVENTS, vec![])
        .expect("add watch");

    notifier.request_stop();
    notifier.join();

    assert_eq!(notifier.state(), LifecycleState::Stopped);
    assert!(notifier.registry().is_empty());
}
