//! Integration tests for the log archive status state machine

use proptest::prelude::*;
use strata_backup::archive::ArchiveCompatible;
use strata_backup::{ArchiveStatus, LogArchiveStatus, NamedEnum};
use strata_core::ErrorKind;

use ArchiveStatus::*;

const ALLOWED: &[(ArchiveStatus, ArchiveStatus)] = &[
    (Stop, Stop),
    (Beginning, Beginning),
    (Beginning, Doing),
    (Beginning, Stopping),
    (Beginning, Stop),
    (Beginning, Interrupted),
    (Doing, Doing),
    (Doing, Stopping),
    (Doing, Stop),
    (Doing, Interrupted),
    (Doing, Paused),
    (Stopping, Stopping),
    (Stopping, Stop),
    (Interrupted, Interrupted),
    (Interrupted, Stopping),
    (Interrupted, Stop),
    (Paused, Interrupted),
    (Paused, Doing),
    (Paused, Stop),
];

fn stream_status(status: ArchiveStatus, start_ts: i64, checkpoint_ts: i64) -> LogArchiveStatus {
    LogArchiveStatus {
        tenant_id: 1002,
        incarnation: 1,
        round: 2,
        start_ts,
        checkpoint_ts,
        status,
        compatible: ArchiveCompatible::Version2,
        ..LogArchiveStatus::default()
    }
}

// Strategy for statuses that pass validity checks
fn valid_status_strategy() -> impl Strategy<Value = ArchiveStatus> {
    prop::sample::select(
        ArchiveStatus::ALL
            .iter()
            .copied()
            .filter(|s| s.is_valid())
            .collect::<Vec<_>>(),
    )
}

// Property: update accepts exactly the transition table and never mutates on rejection
proptest! {
    #[test]
    fn test_update_is_total(
        current in valid_status_strategy(),
        requested in valid_status_strategy(),
        start_ts in 1i64..1_000_000,
        checkpoint_ts in 1i64..1_000_000,
        start_delta in 0i64..1_000,
        checkpoint_delta in 0i64..1_000,
    ) {
        let mut status = stream_status(current, start_ts, checkpoint_ts);
        let before = status.clone();
        let new_status = stream_status(
            requested,
            start_ts + start_delta,
            checkpoint_ts + checkpoint_delta,
        );

        let result = status.update(&new_status);
        if ALLOWED.contains(&(current, requested)) {
            prop_assert!(result.is_ok(), "{} -> {} rejected: {:?}", current, requested, result);
        } else {
            prop_assert_eq!(result.unwrap_err().kind(), ErrorKind::LogArchiveStatusNotMatch);
            prop_assert_eq!(&status, &before);
        }
    }
}

// Property: once the mount file exists no update can clear the flag
proptest! {
    #[test]
    fn test_mount_flag_is_monotonic(
        steps in prop::collection::vec((valid_status_strategy(), prop::bool::ANY), 1..32),
    ) {
        let mut status = stream_status(Doing, 10, 10);
        status.is_mount_file_created = true;

        let mut checkpoint = 10;
        for (requested, mounted) in steps {
            checkpoint += 1;
            let mut new_status = stream_status(requested, 10, checkpoint);
            new_status.is_mount_file_created = mounted;
            let before = status.clone();
            let result = status.update(&new_status);
            if !mounted {
                prop_assert_eq!(result.unwrap_err().kind(), ErrorKind::InvalidArgument);
                prop_assert_eq!(&status, &before);
            }
            prop_assert!(status.is_mount_file_created);
        }
    }
}

// Property: DOING never moves its start or checkpoint backwards
proptest! {
    #[test]
    fn test_doing_rejects_regression(
        start_ts in 2i64..1_000_000,
        checkpoint_ts in 2i64..1_000_000,
        back in 1i64..1_000,
    ) {
        let mut status = stream_status(Doing, start_ts, checkpoint_ts);
        let before = status.clone();

        let stale_checkpoint = stream_status(Doing, start_ts, checkpoint_ts - back.min(checkpoint_ts - 1));
        let err = status.update(&stale_checkpoint).unwrap_err();
        prop_assert_eq!(err.kind(), ErrorKind::InvalidLogArchiveStatus);
        prop_assert_eq!(&status, &before);

        let stale_start = stream_status(Doing, start_ts - back.min(start_ts - 1), checkpoint_ts);
        let err = status.update(&stale_start).unwrap_err();
        prop_assert_eq!(err.kind(), ErrorKind::InvalidLogArchiveStatus);
        prop_assert_eq!(&status, &before);
    }
}

#[test]
fn test_archive_round_lifecycle() {
    let mut status = stream_status(Beginning, 0, 0);

    status.update(&stream_status(Doing, 100, 100)).unwrap();
    assert_eq!(status.status, Doing);
    assert_eq!((status.start_ts, status.checkpoint_ts), (100, 100));

    status.update(&stream_status(Doing, 100, 250)).unwrap();
    assert_eq!(status.checkpoint_ts, 250);

    status.update(&stream_status(Paused, 100, 250)).unwrap();
    status.update(&stream_status(Doing, 100, 300)).unwrap();
    assert_eq!(status.status, Doing);

    status.update(&stream_status(Stopping, 100, 300)).unwrap();
    status.update(&stream_status(Stop, 100, 300)).unwrap();
    assert_eq!(status.status, Stop);
    assert_eq!(status.status_str(), "STOP");
}

#[test]
fn test_beginning_to_doing_requires_timestamps() {
    let mut status = stream_status(Beginning, 0, 0);
    let err = status.update(&stream_status(Doing, 0, 10)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidLogArchiveStatus);
    let err = status.update(&stream_status(Doing, 10, 0)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidLogArchiveStatus);
    assert_eq!(status.status, Beginning);
}

#[test]
fn test_paused_accepts_interrupted_without_moving() {
    // PAUSED -> INTERRUPTED is accepted but the status stays PAUSED
    let mut status = stream_status(Paused, 10, 20);
    status.update(&stream_status(Interrupted, 10, 20)).unwrap();
    assert_eq!(status.status, Paused);
}

#[test]
fn test_foreign_stream_rejected() {
    let mut status = stream_status(Doing, 10, 20);
    let other_round = LogArchiveStatus {
        round: 3,
        ..stream_status(Doing, 10, 30)
    };
    let err = status.update(&other_round).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let other_compat = LogArchiveStatus {
        compatible: ArchiveCompatible::Version1,
        ..stream_status(Doing, 10, 30)
    };
    assert!(status.update(&other_compat).is_err());
    assert_eq!(status.checkpoint_ts, 20);
}

#[test]
fn test_uninitialized_receiver() {
    let mut status = LogArchiveStatus::default();
    let err = status.update(&stream_status(Stop, 0, 0)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotInit);
}

#[test]
fn test_mixed_is_never_a_transition() {
    let mut status = stream_status(Doing, 10, 20);
    let err = status.update(&stream_status(Mixed, 10, 20)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LogArchiveStatusNotMatch);

    let mut mixed = stream_status(Mixed, 10, 20);
    let err = mixed.update(&stream_status(Stop, 10, 20)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::LogArchiveStatusNotMatch);
}

#[test]
fn test_piece_key_follows_switch() {
    let mut status = stream_status(Doing, 10, 20);
    status.backup_piece_id = 5;
    assert!(!status.need_switch_piece());
    assert_eq!(status.piece_key().backup_piece_id, 0);

    status.start_piece_id = 1;
    assert!(status.need_switch_piece());
    let key = status.piece_key();
    assert_eq!(key.backup_piece_id, 5);
    assert_eq!((key.tenant_id, key.round_id), (1002, 2));
}

#[test]
fn test_status_string_table() {
    let names: Vec<_> = ArchiveStatus::ALL.iter().map(|s| s.name()).collect();
    assert_eq!(
        names.join(","),
        "INVALID,STOP,BEGINNING,DOING,STOPPING,INTERRUPTED,MIXED,PAUSED"
    );
    assert_eq!(ArchiveStatus::name_of_ordinal(99), "UNKNOWN");
    assert_eq!(ArchiveStatus::from_name("PAUSED").unwrap(), Paused);
}
