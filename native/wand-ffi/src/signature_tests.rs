// Copyright (c) the wand-ffi Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Unit tests for the signature module.

use super::*;

/// Records every attachment so tests can inspect the resulting table.
#[derive(Default)]
struct RecordingTarget {
    valid: bool,
    attached: BTreeMap<PixelFunction, Binding>,
    attach_calls: usize,
}

impl RecordingTarget {
    fn valid() -> Self {
        Self {
            valid: true,
            ..Self::default()
        }
    }
}

impl BindingTarget for RecordingTarget {
    fn is_valid(&self) -> bool {
        self.valid
    }

    fn attach(&mut self, function: PixelFunction, binding: Binding) {
        self.attach_calls += 1;
        self.attached.insert(function, binding);
    }
}

const QUANTUM_GETTERS: [PixelFunction; 4] = [
    PixelFunction::PixelGetRedQuantum,
    PixelFunction::PixelGetGreenQuantum,
    PixelFunction::PixelGetBlueQuantum,
    PixelFunction::PixelGetAlphaQuantum,
];

// ============================================================================
// Quantum type resolution
// ============================================================================

#[test]
fn test_quantum_type_table() {
    let cases = [
        (QuantumDepth::Q8, false, QuantumType::U8),
        (QuantumDepth::Q8, true, QuantumType::F32),
        (QuantumDepth::Q16, false, QuantumType::U16),
        (QuantumDepth::Q16, true, QuantumType::F32),
        (QuantumDepth::Q32, false, QuantumType::U32),
        (QuantumDepth::Q32, true, QuantumType::F64),
        (QuantumDepth::Q64, false, QuantumType::U64),
        (QuantumDepth::Q64, true, QuantumType::LongDouble),
    ];

    for (depth, hdri, expected) in cases {
        assert_eq!(
            resolve_quantum_type(depth, hdri),
            expected,
            "depth {} hdri {}",
            depth.bits(),
            hdri
        );
    }
}

#[test]
fn test_hdri_builds_are_floating_point() {
    for depth in [QuantumDepth::Q8, QuantumDepth::Q16, QuantumDepth::Q32, QuantumDepth::Q64] {
        assert!(resolve_quantum_type(depth, true).is_floating_point());
        assert!(!resolve_quantum_type(depth, false).is_floating_point());
    }
}

#[test]
fn test_quantum_depth_rejects_unknown_values() {
    for bits in [0u32, 1, 7, 12, 24, 48, 65, 128] {
        let err = QuantumDepth::try_from(bits).unwrap_err();
        assert!(matches!(err, BindingError::InvalidArgument(_)), "depth {bits}");
    }
    assert_eq!(QuantumDepth::try_from(64u32).unwrap(), QuantumDepth::Q64);
}

// ============================================================================
// Version gate
// ============================================================================

#[test]
fn test_version_fields() {
    let version = MagickVersion::from_packed(0x069A);
    assert_eq!((version.major(), version.minor(), version.patch()), (6, 9, 10));
    assert_eq!(MagickVersion::from_packed(0x0689).to_string(), "6.8.9");
    assert_eq!(MagickVersion::from_packed(0x070A).to_string(), "7.0.10");
}

#[test]
fn test_era_threshold() {
    assert_eq!(MagickVersion::from_packed(0x06FF).era(), ApiEra::Legacy);
    assert_eq!(MagickVersion::from_packed(0x0700).era(), ApiEra::Modern);
    assert_eq!(MagickVersion::from_packed(0x0000).era(), ApiEra::Legacy);

    let legacy = ApiEra::Legacy;
    assert!(legacy.is_legacy() && !legacy.is_modern());
}

#[test]
fn test_negative_version_is_rejected() {
    let err = MagickVersion::from_raw(-1).unwrap_err();
    assert!(matches!(err, BindingError::InvalidArgument(_)));

    let err = MagickVersion::from_raw(i64::from(u32::MAX) + 1).unwrap_err();
    assert!(matches!(err, BindingError::InvalidArgument(_)));
}

// ============================================================================
// Catalog
// ============================================================================

#[test]
fn test_symbol_names_round_trip() {
    for &function in PixelFunction::ALL {
        assert_eq!(PixelFunction::from_symbol(function.symbol()), Some(function));
    }
    assert_eq!(PixelFunction::from_symbol("MagickReadImage"), None);
    assert_eq!(PixelFunction::ALL.len(), 22);
}

#[test]
fn test_table_covers_whole_catalog() {
    let config = LibraryConfig::from_raw(0x0689, 16, false).unwrap();
    let table = SignatureTable::for_config(config);

    assert_eq!(table.len(), PixelFunction::ALL.len());
    for &function in PixelFunction::ALL {
        assert!(table.get(function).is_some(), "{function} missing from table");
    }
}

#[test]
fn test_unconditional_signatures() {
    let table = SignatureTable::for_config(LibraryConfig::from_raw(0x0710, 8, false).unwrap());

    let sig = |f| *table.get(f).unwrap().signature().unwrap();

    assert_eq!(sig(PixelFunction::NewPixelWand), Signature::new(&[], CType::PixelWand));
    assert_eq!(
        sig(PixelFunction::IsPixelWandSimilar),
        Signature::new(&[CType::PixelWand, CType::PixelWand, CType::Double], CType::Boolean)
    );
    assert_eq!(
        sig(PixelFunction::PixelGetException),
        Signature::new(&[CType::PixelWand, CType::IntOut], CType::MagickString)
    );
    assert_eq!(sig(PixelFunction::PixelGetColorCount).ret, CType::Size);
    assert_eq!(sig(PixelFunction::PixelClearException).ret, CType::Void);
    assert_eq!(sig(PixelFunction::PixelSetColor).params, &[CType::PixelWand, CType::CString]);
}

#[test]
fn test_legacy_scenario() {
    let mut target = RecordingTarget::valid();
    let table = configure(&mut target, 0x0689, 16, false).unwrap();

    assert_eq!(table.quantum_type(), QuantumType::U16);
    assert_eq!(table.era(), ApiEra::Legacy);
    assert_eq!(
        target.attached[&PixelFunction::PixelGetAlphaQuantum],
        Binding::Present(Signature::new(&[CType::PixelWand], CType::Quantum(QuantumType::U16)))
    );
    assert_eq!(target.attached[&PixelFunction::PixelGetPixel], Binding::Absent);
    assert!(target.attached[&PixelFunction::PixelSetMagickColor].is_present());
    assert_eq!(target.attached[&PixelFunction::PixelSetPixelColor], Binding::Absent);
}

#[test]
fn test_modern_scenario() {
    let mut target = RecordingTarget::valid();
    let table = configure(&mut target, 0x070A, 32, true).unwrap();

    assert_eq!(table.quantum_type(), QuantumType::F64);
    assert!(target.attached[&PixelFunction::PixelGetPixel].is_present());
    assert!(target.attached[&PixelFunction::PixelSetPixelColor].is_present());
    assert_eq!(target.attached[&PixelFunction::PixelSetMagickColor], Binding::Absent);
}

#[test]
fn test_quantum_getters_follow_quantum_type() {
    for (depth, hdri) in [(8, false), (16, true), (32, false), (64, true)] {
        let config = LibraryConfig::from_raw(0x0700, depth, hdri).unwrap();
        let table = SignatureTable::for_config(config);
        for function in QUANTUM_GETTERS {
            let ret = table.get(function).unwrap().signature().unwrap().ret;
            assert_eq!(ret, CType::Quantum(config.quantum_type()), "{function} at Q{depth}");
        }
    }
}

#[test]
fn test_set_color_aliases_are_mutually_exclusive() {
    for version in [0x0600, 0x0689, 0x06FF, 0x0700, 0x070A, 0x0711] {
        let config = LibraryConfig::from_raw(version, 16, false).unwrap();
        let table = SignatureTable::for_config(config);
        assert_ne!(
            table.is_present(PixelFunction::PixelSetMagickColor),
            table.is_present(PixelFunction::PixelSetPixelColor),
            "version {version:#x}"
        );
        assert_eq!(
            table.is_present(PixelFunction::PixelGetPixel),
            table.is_present(PixelFunction::PixelSetPixelColor)
        );
    }
}

// ============================================================================
// Configuration
// ============================================================================

#[test]
fn test_invalid_target_rejected_before_attach() {
    let mut target = RecordingTarget::default();
    let err = configure(&mut target, 0x0689, 16, false).unwrap_err();

    assert!(matches!(err, BindingError::InvalidArgument(_)));
    assert_eq!(target.attach_calls, 0);
}

#[test]
fn test_invalid_arguments_rejected_before_attach() {
    let mut target = RecordingTarget::valid();

    assert!(matches!(
        configure(&mut target, -0x700, 16, false),
        Err(BindingError::InvalidArgument(_))
    ));
    assert!(matches!(
        configure(&mut target, 0x0700, 65, false),
        Err(BindingError::InvalidArgument(_))
    ));
    assert!(matches!(
        configure(&mut target, 0x0700, 12, true),
        Err(BindingError::InvalidArgument(_))
    ));
    assert_eq!(target.attach_calls, 0);
}

#[test]
fn test_configure_is_idempotent() {
    let mut target = RecordingTarget::valid();
    let first_table = configure(&mut target, 0x070A, 16, true).unwrap();
    let first = target.attached.clone();

    let second_table = configure(&mut target, 0x070A, 16, true).unwrap();

    assert_eq!(first, target.attached);
    assert_eq!(first_table, second_table);
    assert_eq!(target.attached.len(), PixelFunction::ALL.len());
}

#[test]
fn test_reconfigure_replaces_era_entries() {
    let mut target = RecordingTarget::valid();
    configure(&mut target, 0x0689, 8, false).unwrap();
    configure(&mut target, 0x0710, 8, false).unwrap();

    assert_eq!(target.attached[&PixelFunction::PixelSetMagickColor], Binding::Absent);
    assert!(target.attached[&PixelFunction::PixelSetPixelColor].is_present());
}

#[test]
fn test_signature_display() {
    let sig = PixelFunction::IsPixelWandSimilar
        .binding(QuantumType::U8, ApiEra::Modern)
        .signature()
        .copied()
        .unwrap();
    assert_eq!(sig.to_string(), "(PixelWand *, PixelWand *, double) -> MagickBooleanType");

    let sig = Signature::new(&[CType::PixelWand], CType::Quantum(QuantumType::U16));
    assert_eq!(sig.to_string(), "(PixelWand *) -> Quantum<unsigned short>");
}
