// Copyright (c) the wand-ffi Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Type conversions between C API types and the Rust binding types.

use crate::error::{BindingError, Result};
use crate::signature::{CType, LibraryConfig, MagickVersion, QuantumDepth, Signature};
use crate::types::*;

// ============================================================================
// Options Conversion
// ============================================================================

/// Merges explicit options with the library's own build configuration.
///
/// `query` is only called when at least one field asks for it.
pub(crate) fn config_from_options(
    options: &WandBindingOptions,
    query: impl FnOnce() -> Result<LibraryConfig>,
) -> Result<LibraryConfig> {
    let needs_query =
        options.Version == 0 || options.QuantumDepth == 0 || options.Hdri == WandHdriMode::Query;
    let queried = if needs_query { Some(query()?) } else { None };

    let version = match (options.Version, queried) {
        (0, Some(q)) => q.version,
        (packed, _) if packed != 0 => MagickVersion::from_packed(packed),
        _ => return Err(BindingError::Internal("library version was not queried".into())),
    };
    let quantum_depth = match (options.QuantumDepth, queried) {
        (0, Some(q)) => q.quantum_depth,
        (bits, _) if bits != 0 => QuantumDepth::try_from(bits)?,
        _ => return Err(BindingError::Internal("quantum depth was not queried".into())),
    };
    let hdri = match (options.Hdri, queried) {
        (WandHdriMode::Enabled, _) => true,
        (WandHdriMode::Disabled, _) => false,
        (WandHdriMode::Query, Some(q)) => q.hdri,
        (WandHdriMode::Query, None) => {
            return Err(BindingError::Internal("HDRI mode was not queried".into()));
        }
    };

    Ok(LibraryConfig::new(version, quantum_depth, hdri))
}

pub(crate) fn convert_library_info(config: &LibraryConfig) -> WandLibraryInfo {
    WandLibraryInfo {
        Version: config.version.packed(),
        QuantumDepth: config.quantum_depth.bits(),
        QuantumType: config.quantum_type(),
        Hdri: config.hdri,
        IsModern: config.era().is_modern(),
    }
}

// ============================================================================
// Signature Conversion
// ============================================================================

fn convert_ctype(ctype: CType) -> WandCType {
    match ctype {
        CType::Void => WandCType::Void,
        CType::Boolean => WandCType::Boolean,
        CType::Double => WandCType::Double,
        CType::Size => WandCType::Size,
        CType::PixelWand => WandCType::PixelWand,
        CType::Pointer => WandCType::Pointer,
        CType::CString => WandCType::CString,
        CType::MagickString => WandCType::MagickString,
        CType::IntOut => WandCType::IntOut,
        CType::Quantum(_) => WandCType::Quantum,
    }
}

pub(crate) fn convert_signature(signature: &Signature) -> Result<WandSignatureRaw> {
    if signature.params.len() > WAND_MAX_PARAMS {
        return Err(BindingError::Internal(format!(
            "signature {signature} has more than {WAND_MAX_PARAMS} parameters"
        )));
    }

    let mut raw = WandSignatureRaw::default();
    for (slot, &param) in raw.Params.iter_mut().zip(signature.params) {
        *slot = convert_ctype(param);
    }
    raw.ParamCount = signature.params.len() as u32;
    raw.Return = convert_ctype(signature.ret);
    if let CType::Quantum(quantum) = signature.ret {
        raw.QuantumType = quantum;
    }

    Ok(raw)
}

// ============================================================================
// Status Conversion
// ============================================================================

pub(crate) fn status_for_error(error: &BindingError) -> WandStatus {
    match error {
        BindingError::InvalidArgument(_) => WandStatus::InvalidArgument,
        BindingError::Unavailable(_) | BindingError::UnsupportedAbi { .. } => {
            WandStatus::Unavailable
        }
        BindingError::Native { .. } => WandStatus::NativeException,
        BindingError::Load(_)
        | BindingError::Symbol { .. }
        | BindingError::SignatureMismatch { .. }
        | BindingError::Internal(_) => WandStatus::Error,
    }
}

// ============================================================================
// Buffers
// ============================================================================

/// Copies `bytes` into a C buffer as a null-terminated string.
///
/// Returns the full length of `bytes` (excluding the null terminator), so a
/// caller can detect truncation or query the size with a null buffer.
///
/// # Safety
/// If `buffer` is not null it must be valid for writes of `buffer_size` bytes.
pub(crate) unsafe fn copy_to_c_buffer(bytes: &[u8], buffer: *mut u8, buffer_size: usize) -> usize {
    if buffer.is_null() || buffer_size == 0 {
        return bytes.len();
    }

    let copy_len = bytes.len().min(buffer_size - 1);
    unsafe {
        if copy_len > 0 {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), buffer, copy_len);
        }
        // Null terminate
        *buffer.add(copy_len) = 0;
    }

    bytes.len()
}
