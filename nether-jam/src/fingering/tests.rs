//! Tests for fingering tables

use super::*;

const KEYS: &[&str] = &["octave", "b", "a", "g"];

fn recorder_table() -> FingeringTable {
    FingeringTable::from_entries(
        "recorder",
        KEYS,
        &[
            (71, &["b"]),
            (69, &["b", "a"]),
            (67, &["b", "a", "g"]),
            (83, &["octave", "b"]),
        ],
    )
    .unwrap()
}

// ============================================================================
// Lookup
// ============================================================================

#[test]
fn test_pose_for_known_pitch() {
    let table = recorder_table();
    let pose = table.pose_for(69).unwrap();

    let b = table.key_id("b").unwrap();
    let a = table.key_id("a").unwrap();
    let g = table.key_id("g").unwrap();
    assert!(pose.is_pressed(b));
    assert!(pose.is_pressed(a));
    assert!(!pose.is_pressed(g));
    assert_eq!(pose.depth_of(a), 1.0);
    assert_eq!(pose.depth_of(g), 0.0);
}

#[test]
fn test_range_defaults_to_fingered_pitches() {
    let table = recorder_table();
    assert_eq!(table.range(), Some(67..=83));
}

#[test]
fn test_unsupported_pitch_outside_range() {
    let table = recorder_table();
    let err = table.pose_for(20).unwrap_err();
    assert_eq!(err.pitch, 20);
    assert_eq!(err.family, "recorder");
    assert!(!table.supports(100));
}

#[test]
fn test_unsupported_pitch_gap_inside_range() {
    let table = recorder_table();
    // 70 is within 67..=83 but has no entry
    assert!(table.pose_for(70).is_err());
}

#[test]
fn test_lookup_matches_pose_for() {
    let table = recorder_table();
    for pitch in 0..=127u8 {
        assert_eq!(table.lookup(pitch), table.pose_for(pitch).ok(), "pitch {pitch}");
    }
    assert!(table.lookup(70).is_none());
    assert!(table.lookup(83).is_some());
}

#[test]
fn test_empty_table_supports_nothing() {
    let table = FingeringTable::from_def("drum", &FingeringDef::default()).unwrap();
    assert_eq!(table.range(), None);
    assert!(table.pose_for(60).is_err());
    assert!(table.lookup(60).is_none());
    assert!(table.rest_pose().is_rest());
}

#[test]
fn test_key_names_round_trip() {
    let table = recorder_table();
    assert_eq!(table.key_count(), 4);
    assert_eq!(table.key_name(KeyId(2)), Some("a"));
    assert_eq!(table.key_name(KeyId(9)), None);
    assert_eq!(table.key_id("octave"), Some(KeyId(0)));
    assert_eq!(table.key_id("pinky"), None);
}

// ============================================================================
// Pose
// ============================================================================

#[test]
fn test_pose_is_order_independent() {
    let a = Pose::from_presses([
        KeyPress {
            key: KeyId(3),
            depth: 1.0,
        },
        KeyPress {
            key: KeyId(1),
            depth: 0.5,
        },
    ]);
    let b = Pose::from_presses([
        KeyPress {
            key: KeyId(1),
            depth: 0.5,
        },
        KeyPress {
            key: KeyId(3),
            depth: 1.0,
        },
    ]);
    assert_eq!(a, b);
    assert_eq!(a.presses().len(), 2);
}

#[test]
fn test_pose_drops_duplicate_keys() {
    let pose = Pose::from_presses([
        KeyPress {
            key: KeyId(1),
            depth: 0.25,
        },
        KeyPress {
            key: KeyId(1),
            depth: 1.0,
        },
    ]);
    assert_eq!(pose.presses().len(), 1);
    assert_eq!(pose.depth_of(KeyId(1)), 0.25);
}

// ============================================================================
// Definition validation
// ============================================================================

#[test]
fn test_parse_definition_from_toml() {
    let def: FingeringDef = toml::from_str(
        r#"
        keys = ["octave", "b", "a"]
        range = [60, 84]

        [[notes]]
        pitch = 71
        keys = ["b"]

        [[notes]]
        pitch = 69
        keys = ["b", "a"]
        depth = 0.5
        "#,
    )
    .unwrap();

    let table = FingeringTable::from_def("whistle", &def).unwrap();
    assert_eq!(table.range(), Some(60..=84));
    let a = table.key_id("a").unwrap();
    assert_eq!(table.pose_for(69).unwrap().depth_of(a), 0.5);
    // In range, unfingered
    assert!(table.pose_for(60).is_err());
}

#[test]
fn test_rejects_unknown_key() {
    let err = FingeringTable::from_entries("x", KEYS, &[(60, &["thumb"])]).unwrap_err();
    assert_eq!(
        err,
        FingeringError::UnknownKey {
            pitch: 60,
            key: "thumb".to_string()
        }
    );
}

#[test]
fn test_rejects_duplicate_pitch_and_key() {
    let err = FingeringTable::from_entries("x", KEYS, &[(60, &["b"]), (60, &["a"])]).unwrap_err();
    assert_eq!(err, FingeringError::DuplicatePitch(60));

    let err = FingeringTable::from_entries("x", &["b", "b"], &[]).unwrap_err();
    assert_eq!(err, FingeringError::DuplicateKey("b".to_string()));
}

#[test]
fn test_rejects_bad_range_and_depth() {
    let def = FingeringDef {
        keys: vec!["b".to_string()],
        range: Some([70, 60]),
        notes: Vec::new(),
    };
    assert_eq!(
        FingeringTable::from_def("x", &def).unwrap_err(),
        FingeringError::EmptyRange { low: 70, high: 60 }
    );

    let def = FingeringDef {
        keys: vec!["b".to_string()],
        range: Some([60, 70]),
        notes: vec![NoteFingeringDef {
            pitch: 80,
            keys: vec!["b".to_string()],
            depth: 1.0,
        }],
    };
    assert_eq!(
        FingeringTable::from_def("x", &def).unwrap_err(),
        FingeringError::OutsideRange {
            pitch: 80,
            low: 60,
            high: 70
        }
    );

    let def = FingeringDef {
        keys: vec!["b".to_string()],
        range: None,
        notes: vec![NoteFingeringDef {
            pitch: 60,
            keys: vec!["b".to_string()],
            depth: 1.5,
        }],
    };
    assert!(matches!(
        FingeringTable::from_def("x", &def).unwrap_err(),
        FingeringError::DepthOutOfRange { pitch: 60, .. }
    ));
}
