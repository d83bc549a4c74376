// Copyright (c) the wand-ffi Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! C API over the configured bindings and pixel wands.

use std::ffi::{CStr, c_char};
use std::path::Path;

use crate::conversions::{
    convert_library_info, convert_signature, copy_to_c_buffer, status_for_error,
};
use crate::dispatch::WandBinding;
use crate::error::{BindingError, clear_last_error, set_last_error};
use crate::pixel::PixelWand;
use crate::signature::{PixelFunction, QuantumDepth, resolve_quantum_type};
use crate::types::*;

// ============================================================================
// Handle Validation Macros
// ============================================================================

/// Gets a reference to the binding, returning an error if null.
macro_rules! get_binding_ref {
    ($binding:expr, $error_return:expr) => {
        match unsafe { ($binding as *const WandBinding).as_ref() } {
            Some(inner) => inner,
            None => {
                set_last_error("Null binding pointer");
                return $error_return;
            }
        }
    };
}

/// Gets an immutable reference to the pixel wand, returning an error if null.
macro_rules! get_pixel_ref {
    ($pixel:expr, $error_return:expr) => {
        match unsafe { ($pixel as *const PixelWand).as_ref() } {
            Some(inner) => inner,
            None => {
                set_last_error("Null pixel pointer");
                return $error_return;
            }
        }
    };
}

/// Gets a mutable reference to the pixel wand, returning an error if null.
macro_rules! get_pixel_mut {
    ($pixel:expr, $error_return:expr) => {
        match unsafe { ($pixel as *mut PixelWand).as_mut() } {
            Some(inner) => inner,
            None => {
                set_last_error("Null pixel pointer");
                return $error_return;
            }
        }
    };
}

/// Records `error` as the last error and returns its status code.
fn fail(error: BindingError) -> WandStatus {
    let status = status_for_error(&error);
    set_last_error(error.to_string());
    status
}

/// Reads a required C string argument.
unsafe fn read_str<'a>(ptr: *const c_char, what: &str) -> Result<&'a str, BindingError> {
    if ptr.is_null() {
        return Err(BindingError::invalid_argument(format!("Null {what} pointer")));
    }
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|_| BindingError::invalid_argument(format!("{what} is not valid UTF-8")))
}

pub(crate) fn binding_into_handle(binding: WandBinding) -> *mut NativeBindingHandle {
    Box::into_raw(Box::new(binding)) as *mut NativeBindingHandle
}

// ============================================================================
// Quantum Resolution
// ============================================================================

/// Resolves the channel sample type for a quantum depth and HDRI mode.
///
/// # Safety
/// `quantum_type` must point to a writable `QuantumType`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn wand_resolve_quantum_type(
    quantum_depth: u32,
    hdri: bool,
    quantum_type: *mut QuantumType,
) -> WandStatus {
    let Some(out) = (unsafe { quantum_type.as_mut() }) else {
        set_last_error("Null quantum type pointer");
        return WandStatus::InvalidArgument;
    };

    match QuantumDepth::try_from(quantum_depth) {
        Ok(depth) => {
            clear_last_error();
            *out = resolve_quantum_type(depth, hdri);
            WandStatus::Success
        }
        Err(e) => fail(e),
    }
}

// ============================================================================
// Binding Lifecycle
// ============================================================================

/// Loads and configures MagickWand, querying its build configuration.
///
/// # Arguments
/// * `path` - Path of the shared library, or null to search for it.
///
/// # Returns
/// A pointer to the binding, or null on failure (see `wand_get_last_error`).
/// The binding must be destroyed with `wand_binding_destroy`.
///
/// # Safety
/// If `path` is not null, it must point to a null-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn wand_binding_open(path: *const c_char) -> *mut NativeBindingHandle {
    unsafe { wand_binding_open_with_options(path, std::ptr::null()) }
}

/// Loads and configures MagickWand with explicit options.
///
/// # Arguments
/// * `path` - Path of the shared library, or null to search for it.
/// * `options` - Pointer to binding options, or null to use defaults.
///
/// # Returns
/// A pointer to the binding, or null on failure (see `wand_get_last_error`).
///
/// # Safety
/// - If `path` is not null, it must point to a null-terminated string.
/// - If `options` is not null, it must point to a valid `WandBindingOptions`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn wand_binding_open_with_options(
    path: *const c_char,
    options: *const WandBindingOptions,
) -> *mut NativeBindingHandle {
    clear_last_error();

    let path = if path.is_null() {
        None
    } else {
        match unsafe { read_str(path, "path") } {
            Ok(path) => Some(Path::new(path)),
            Err(e) => {
                fail(e);
                return std::ptr::null_mut();
            }
        }
    };
    let options = unsafe { options.as_ref() }.cloned().unwrap_or_default();

    match WandBinding::open(path, &options) {
        Ok(binding) => binding_into_handle(binding),
        Err(e) => {
            fail(e);
            std::ptr::null_mut()
        }
    }
}

/// Destroys a binding.
///
/// Pixel wands created from the binding stay usable; the library is unloaded
/// once the last of them is destroyed.
///
/// # Safety
/// The binding pointer must have been created by `wand_binding_open`.
/// After calling this function, the binding pointer is invalid.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn wand_binding_destroy(binding: *mut NativeBindingHandle) {
    if !binding.is_null() {
        unsafe {
            drop(Box::from_raw(binding as *mut WandBinding));
        }
    }
}

// ============================================================================
// Binding Queries
// ============================================================================

/// Gets the build configuration the binding was configured for.
///
/// # Safety
/// - `binding` must be valid.
/// - `info` must point to a writable `WandLibraryInfo`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn wand_binding_get_info(
    binding: *const NativeBindingHandle,
    info: *mut WandLibraryInfo,
) -> WandStatus {
    let inner = get_binding_ref!(binding, WandStatus::InvalidArgument);

    let Some(out) = (unsafe { info.as_mut() }) else {
        set_last_error("Null info pointer");
        return WandStatus::InvalidArgument;
    };

    clear_last_error();
    *out = convert_library_info(inner.config());

    WandStatus::Success
}

/// Probes whether a catalog function can be called.
///
/// # Arguments
/// * `binding` - The binding instance.
/// * `name` - Native symbol name, e.g. `PixelSetPixelColor`.
///
/// # Returns
/// `Unknown` for null arguments or names outside the catalog.
///
/// # Safety
/// `binding` must be valid and `name` must point to a null-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn wand_binding_function_status(
    binding: *const NativeBindingHandle,
    name: *const c_char,
) -> WandFunctionStatus {
    let inner = get_binding_ref!(binding, WandFunctionStatus::Unknown);

    let function = match unsafe { read_str(name, "function name") } {
        Ok(name) => PixelFunction::from_symbol(name),
        Err(e) => {
            fail(e);
            return WandFunctionStatus::Unknown;
        }
    };

    function.map_or(WandFunctionStatus::Unknown, |function| inner.status(function))
}

/// Gets the signature attached to a catalog function.
///
/// # Returns
/// `Unavailable` if the function does not exist in the library's API version.
///
/// # Safety
/// - `binding` must be valid and `name` must point to a null-terminated string.
/// - `signature` must point to a writable `WandSignatureRaw`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn wand_binding_get_signature(
    binding: *const NativeBindingHandle,
    name: *const c_char,
    signature: *mut WandSignatureRaw,
) -> WandStatus {
    let inner = get_binding_ref!(binding, WandStatus::InvalidArgument);

    let Some(out) = (unsafe { signature.as_mut() }) else {
        set_last_error("Null signature pointer");
        return WandStatus::InvalidArgument;
    };

    let name = match unsafe { read_str(name, "function name") } {
        Ok(name) => name,
        Err(e) => return fail(e),
    };
    let Some(function) = PixelFunction::from_symbol(name) else {
        return fail(BindingError::invalid_argument(format!("{name} is not a PixelWand function")));
    };
    let Some(attached) = inner.dispatch().signature(function) else {
        return fail(BindingError::Unavailable(function));
    };

    match convert_signature(&attached) {
        Ok(raw) => {
            clear_last_error();
            *out = raw;
            WandStatus::Success
        }
        Err(e) => fail(e),
    }
}

// ============================================================================
// Pixel Lifecycle
// ============================================================================

/// Creates a new pixel wand (black, opaque).
///
/// # Returns
/// A pointer to the pixel wand, or null on failure.
/// The wand must be destroyed with `wand_pixel_destroy`.
///
/// # Safety
/// The binding pointer must be valid.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn wand_pixel_create(
    binding: *const NativeBindingHandle,
) -> *mut NativePixelHandle {
    let inner = get_binding_ref!(binding, std::ptr::null_mut());

    clear_last_error();

    match inner.new_pixel() {
        Ok(pixel) => Box::into_raw(Box::new(pixel)) as *mut NativePixelHandle,
        Err(e) => {
            fail(e);
            std::ptr::null_mut()
        }
    }
}

/// Destroys a pixel wand.
///
/// # Safety
/// The pixel pointer must have been created by `wand_pixel_create`.
/// After calling this function, the pixel pointer is invalid.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn wand_pixel_destroy(pixel: *mut NativePixelHandle) {
    if !pixel.is_null() {
        unsafe {
            drop(Box::from_raw(pixel as *mut PixelWand));
        }
    }
}

// ============================================================================
// Pixel Color
// ============================================================================

/// Checks whether the native wand is valid.
///
/// # Safety
/// The pixel pointer must be valid or null.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn wand_pixel_is_valid(pixel: *const NativePixelHandle) -> bool {
    let inner = get_pixel_ref!(pixel, false);

    inner.is_valid().unwrap_or_else(|e| {
        fail(e);
        false
    })
}

/// Checks whether two pixel colors are within `fuzz` of each other.
///
/// # Safety
/// Both pixel pointers must be valid.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn wand_pixel_is_similar(
    pixel: *const NativePixelHandle,
    other: *const NativePixelHandle,
    fuzz: f64,
) -> bool {
    let inner = get_pixel_ref!(pixel, false);
    let other = get_pixel_ref!(other, false);

    inner.is_similar(other, fuzz).unwrap_or_else(|e| {
        fail(e);
        false
    })
}

/// Sets the color from a color string (name, `#RRGGBB`, `srgb(...)`, ...).
///
/// # Returns
/// `NativeException` if ImageMagick rejects the color.
///
/// # Safety
/// - `pixel` must be valid.
/// - `color` must point to a null-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn wand_pixel_set_color(
    pixel: *mut NativePixelHandle,
    color: *const c_char,
) -> WandStatus {
    let inner = get_pixel_mut!(pixel, WandStatus::InvalidArgument);

    let color = match unsafe { read_str(color, "color") } {
        Ok(color) => color,
        Err(e) => return fail(e),
    };

    match inner.set_color(color) {
        Ok(()) => {
            clear_last_error();
            WandStatus::Success
        }
        Err(e) => fail(e),
    }
}

/// Gets a normalized channel value (0.0 to 1.0).
///
/// # Arguments
/// * `pixel` - The pixel wand.
/// * `channel` - A `WandChannel` value.
/// * `value` - Receives the channel value.
///
/// # Returns
/// `InvalidArgument` if `channel` is not a `WandChannel` value.
///
/// # Safety
/// - `pixel` must be valid.
/// - `value` must point to a writable `double`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn wand_pixel_get_channel(
    pixel: *const NativePixelHandle,
    channel: u32,
    value: *mut f64,
) -> WandStatus {
    let inner = get_pixel_ref!(pixel, WandStatus::InvalidArgument);

    let channel = match WandChannel::try_from(channel) {
        Ok(channel) => channel,
        Err(e) => return fail(e),
    };

    let Some(out) = (unsafe { value.as_mut() }) else {
        set_last_error("Null value pointer");
        return WandStatus::InvalidArgument;
    };

    match inner.channel(channel) {
        Ok(v) => {
            clear_last_error();
            *out = v;
            WandStatus::Success
        }
        Err(e) => fail(e),
    }
}

/// Gets a raw channel sample in the library's quantum type.
///
/// The sample is written in native byte order. Use `wand_binding_get_info`
/// to learn its `QuantumType`.
///
/// # Returns
/// The sample size in bytes, or 0 on error (including a `channel` that is not
/// a `WandChannel` value). If `buffer` is null or smaller than the sample,
/// nothing is written and the required size is returned.
///
/// # Safety
/// - `pixel` must be valid.
/// - If `buffer` is not null, it must be valid for writes of `buffer_size` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn wand_pixel_get_quantum(
    pixel: *const NativePixelHandle,
    channel: u32,
    buffer: *mut u8,
    buffer_size: usize,
) -> usize {
    let inner = get_pixel_ref!(pixel, 0);

    let quantum = WandChannel::try_from(channel).and_then(|channel| inner.quantum(channel));
    let bytes = match quantum {
        Ok(quantum) => quantum.to_ne_bytes(),
        Err(e) => {
            fail(e);
            return 0;
        }
    };

    clear_last_error();

    if !buffer.is_null() && buffer_size >= bytes.len() {
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), buffer, bytes.len());
        }
    }

    bytes.len()
}

/// Gets the color as a string.
///
/// # Arguments
/// * `pixel` - The pixel wand.
/// * `normalized` - Whether to return normalized channel values instead of
///   ImageMagick's color notation.
/// * `buffer` - Output buffer for the UTF-8 string, or null to query its length.
/// * `buffer_size` - Size of the buffer in bytes.
///
/// # Returns
/// The string length (excluding null terminator), or 0 on error.
/// If the buffer is too small, the string is truncated.
///
/// # Safety
/// - `pixel` must be valid.
/// - If `buffer` is not null, it must be valid for writes of `buffer_size` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn wand_pixel_get_color_string(
    pixel: *const NativePixelHandle,
    normalized: bool,
    buffer: *mut c_char,
    buffer_size: usize,
) -> usize {
    let inner = get_pixel_ref!(pixel, 0);

    let color = if normalized {
        inner.normalized_color_string()
    } else {
        inner.color_string()
    };

    match color {
        Ok(color) => {
            clear_last_error();
            unsafe { copy_to_c_buffer(color.as_bytes(), buffer.cast(), buffer_size) }
        }
        Err(e) => {
            fail(e);
            0
        }
    }
}

/// Gets the color count (set by histogram queries).
///
/// # Safety
/// The pixel pointer must be valid.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn wand_pixel_get_color_count(pixel: *const NativePixelHandle) -> usize {
    let inner = get_pixel_ref!(pixel, 0);

    inner.color_count().unwrap_or_else(|e| {
        fail(e);
        0
    })
}

/// Copies the full color of `source` into `pixel`.
///
/// # Safety
/// Both pixel pointers must be valid and distinct.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn wand_pixel_copy_color(
    pixel: *mut NativePixelHandle,
    source: *const NativePixelHandle,
) -> WandStatus {
    if std::ptr::eq(pixel.cast_const(), source) {
        set_last_error("Source and destination pixel must differ");
        return WandStatus::InvalidArgument;
    }
    let inner = get_pixel_mut!(pixel, WandStatus::InvalidArgument);
    let source = get_pixel_ref!(source, WandStatus::InvalidArgument);

    match inner.copy_color_from(source) {
        Ok(()) => {
            clear_last_error();
            WandStatus::Success
        }
        Err(e) => fail(e),
    }
}

// ============================================================================
// Pixel Exceptions
// ============================================================================

/// Gets the pending wand exception.
///
/// # Arguments
/// * `pixel` - The pixel wand.
/// * `severity` - Receives the ImageMagick `ExceptionType` (0 if none).
/// * `buffer` - Output buffer for the message, or null to query its length.
/// * `buffer_size` - Size of the buffer in bytes.
///
/// # Returns
/// The message length (excluding null terminator); 0 if there is no exception.
///
/// # Safety
/// - `pixel` must be valid and `severity` must point to a writable `int`.
/// - If `buffer` is not null, it must be valid for writes of `buffer_size` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn wand_pixel_get_exception(
    pixel: *const NativePixelHandle,
    severity: *mut i32,
    buffer: *mut c_char,
    buffer_size: usize,
) -> usize {
    let inner = get_pixel_ref!(pixel, 0);

    let Some(out_severity) = (unsafe { severity.as_mut() }) else {
        set_last_error("Null severity pointer");
        return 0;
    };

    match inner.exception() {
        Ok(Some(BindingError::Native { severity, message })) => {
            clear_last_error();
            *out_severity = severity;
            unsafe { copy_to_c_buffer(message.as_bytes(), buffer.cast(), buffer_size) }
        }
        Ok(_) => {
            clear_last_error();
            *out_severity = 0;
            unsafe { copy_to_c_buffer(&[], buffer.cast(), buffer_size) }
        }
        Err(e) => {
            fail(e);
            0
        }
    }
}

/// Clears the pending wand exception.
///
/// # Safety
/// The pixel pointer must be valid.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn wand_pixel_clear_exception(pixel: *mut NativePixelHandle) -> WandStatus {
    let inner = get_pixel_mut!(pixel, WandStatus::InvalidArgument);

    match inner.clear_exception() {
        Ok(()) => {
            clear_last_error();
            WandStatus::Success
        }
        Err(e) => fail(e),
    }
}

#[cfg(test)]
#[path = "binding_tests.rs"]
mod tests;
