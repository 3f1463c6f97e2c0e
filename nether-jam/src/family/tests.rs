//! Tests for instrument family descriptors

use super::*;
use std::io::Write;

const MINIMAL: &str = r#"
name = "kazoo"
clone_capacity = 2

[fingering]
keys = ["hum"]

[[fingering.notes]]
pitch = 60
keys = ["hum"]
"#;

// ============================================================================
// Bundled families
// ============================================================================

#[test]
fn test_all_bundled_families_load() {
    for (name, _) in BUNDLED_FAMILIES {
        let family = FamilyDescriptor::bundled(name).unwrap();
        assert_eq!(family.name(), *name);
        assert!(family.clone_capacity() >= 1);
        assert!(family.fingering().range().is_some());
    }
}

#[test]
fn test_tenor_sax_descriptor() {
    let sax = FamilyDescriptor::bundled("tenor_sax").unwrap();
    assert_eq!(sax.clone_capacity(), 4);
    assert_eq!(sax.stagger_mode(), StaggerMode::Static);
    assert_eq!(sax.envelope().stretch_factor, 0.65);
    assert_eq!(sax.fingering().range(), Some(44..=75));
    assert_eq!(sax.meshes().len(), 2);
    for i in 0..sax.clone_capacity() {
        let placement = sax.placement_offset(i);
        assert_eq!(placement.scale, 1.15);
        assert_eq!(placement.translation, Vec3::new(-11.0, 34.5, -22.0));
    }

    // Low Bb (concert Ab2) uses the low Bb key, high F (concert Eb5) the octave key
    let low_bb = sax.fingering().key_id("low_bb").unwrap();
    assert!(sax.fingering().pose_for(44).unwrap().is_pressed(low_bb));
    let octave = sax.fingering().key_id("octave").unwrap();
    assert!(sax.fingering().pose_for(75).unwrap().is_pressed(octave));
    assert!(!sax.fingering().pose_for(50).unwrap().is_pressed(octave));
}

#[test]
fn test_flute_descriptor() {
    let flute = FamilyDescriptor::bundled("flute").unwrap();
    assert_eq!(flute.stagger_mode(), StaggerMode::Compact);
    assert_eq!(flute.placement_offset(2).translation, Vec3::new(10.0, 0.0, -10.0));
    assert!(flute.fingering().supports(60));
    assert!(!flute.fingering().supports(100));
}

#[test]
fn test_unknown_bundled_family() {
    let err = FamilyDescriptor::bundled("theremin").unwrap_err();
    assert!(matches!(err, FamilyError::UnknownBundled(name) if name == "theremin"));
}

// ============================================================================
// Placement
// ============================================================================

#[test]
fn test_placements_are_distinct() {
    for (name, _) in BUNDLED_FAMILIES {
        let family = FamilyDescriptor::bundled(name).unwrap();
        let placements: Vec<Placement> = (0..family.clone_capacity())
            .map(|i| family.placement_offset(i))
            .collect();
        for i in 0..placements.len() {
            for j in (i + 1)..placements.len() {
                assert_ne!(placements[i], placements[j], "{}: {} vs {}", name, i, j);
            }
        }
    }
}

#[test]
fn test_stagger_geometry_math() {
    let geometry = StaggerGeometry {
        mode: StaggerMode::Static,
        base: Vec3::new(1.0, 2.0, 3.0),
        step: Vec3::new(5.0, 0.0, -5.0),
        yaw_step_degrees: 90.0,
        scale: 2.0,
    };

    assert_eq!(geometry.placement(0).translation, Vec3::new(1.0, 2.0, 3.0));
    assert_eq!(geometry.placement(0).rotation, Quat::IDENTITY);
    assert_eq!(geometry.placement(0).scale, 2.0);

    let second = geometry.placement(1);
    assert_eq!(second.translation, Vec3::new(11.0, 2.0, -7.0));
    assert!(
        second
            .rotation
            .abs_diff_eq(Quat::from_rotation_y(90f32.to_radians()), 1e-6)
    );
}

// ============================================================================
// Loading
// ============================================================================

#[test]
fn test_minimal_descriptor_uses_defaults() {
    let family = FamilyDescriptor::from_toml_str(MINIMAL).unwrap();
    assert_eq!(family.name(), "kazoo");
    assert_eq!(family.stagger_mode(), StaggerMode::Static);
    assert_eq!(family.placement_offset(1), Placement::IDENTITY);
    assert_eq!(family.placement_offset(1).scale, 1.0);
    assert_eq!(*family.envelope(), EnvelopeConfig::default());
    assert!(family.meshes().is_empty());
}

#[test]
fn test_rejects_zero_capacity() {
    let source = MINIMAL.replace("clone_capacity = 2", "clone_capacity = 0");
    let err = FamilyDescriptor::from_toml_str(&source).unwrap_err();
    assert!(matches!(err, FamilyError::ZeroCapacity(_)));
}

#[test]
fn test_reports_bad_fingering_with_family_name() {
    let source = MINIMAL.replace("keys = [\"hum\"]\n\n[[", "keys = [\"buzz\"]\n\n[[");
    let err = FamilyDescriptor::from_toml_str(&source).unwrap_err();
    match err {
        FamilyError::Fingering { family, source } => {
            assert_eq!(family, "kazoo");
            assert!(matches!(source, crate::error::FingeringError::UnknownKey { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(MINIMAL.as_bytes()).unwrap();

    let family = FamilyDescriptor::load(file.path()).unwrap();
    assert_eq!(family.clone_capacity(), 2);

    let missing = FamilyDescriptor::load(file.path().with_extension("missing"));
    assert!(matches!(missing, Err(FamilyError::Io(_))));
}

#[test]
fn test_with_envelope_override() {
    let envelope = EnvelopeConfig {
        attack: 0.5,
        ..Default::default()
    };
    let family = FamilyDescriptor::from_toml_str(MINIMAL)
        .unwrap()
        .with_envelope(envelope);
    assert_eq!(family.envelope().attack, 0.5);
}

#[test]
fn test_envelope_override_delegates_the_rest() {
    let flute: Arc<dyn InstrumentFamily> = Arc::new(FamilyDescriptor::bundled("flute").unwrap());
    let envelope = EnvelopeConfig {
        stretch_factor: 0.3,
        ..Default::default()
    };
    let wrapped = EnvelopeOverride::new(flute.clone(), envelope);

    assert_eq!(wrapped.envelope().stretch_factor, 0.3);
    assert_eq!(wrapped.name(), "flute");
    assert_eq!(wrapped.clone_capacity(), flute.clone_capacity());
    assert_eq!(wrapped.stagger_mode(), StaggerMode::Compact);
    assert_eq!(wrapped.placement_offset(3), flute.placement_offset(3));
    assert!(wrapped.fingering().supports(72));
}
