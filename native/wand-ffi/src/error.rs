// Copyright (c) the wand-ffi Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Error handling for the Rust API and the C API.

use std::cell::RefCell;
use std::ffi::c_char;

use crate::conversions::copy_to_c_buffer;
use crate::signature::{CType, PixelFunction};
use crate::types::QuantumType;

/// Errors raised while loading, configuring or calling into MagickWand.
#[derive(Debug, thiserror::Error)]
pub enum BindingError {
    /// A caller-supplied argument violates a precondition.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// No candidate library could be opened.
    #[error("failed to load MagickWand: {0}")]
    Load(String),

    /// A library-wide symbol the binding depends on is not exported.
    #[error("symbol {name} not found: {source}")]
    Symbol {
        name: &'static str,
        #[source]
        source: libloading::Error,
    },

    /// The function is absent in this API era or not exported by the library.
    #[error("{0} is not available in the loaded library")]
    Unavailable(PixelFunction),

    /// The attached signature differs from the one the caller was compiled against.
    #[error("{function} is bound as {attached} but was called as {expected}")]
    SignatureMismatch {
        function: PixelFunction,
        attached: String,
        expected: String,
    },

    /// The native return type has no Rust equivalent.
    #[error("{function} returns {return_type:?}, which cannot be called from Rust")]
    UnsupportedAbi {
        function: PixelFunction,
        return_type: CType,
    },

    /// The wand reported an exception.
    #[error("MagickWand exception (severity {severity}): {message}")]
    Native { severity: i32, message: String },

    /// The binding reached a state validation should have ruled out.
    #[error("internal binding error: {0}")]
    Internal(String),
}

impl BindingError {
    pub(crate) fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub(crate) fn unsupported_quantum(function: PixelFunction, quantum: QuantumType) -> Self {
        Self::UnsupportedAbi {
            function,
            return_type: CType::Quantum(quantum),
        }
    }
}

pub type Result<T> = std::result::Result<T, BindingError>;

thread_local! {
    static LAST_ERROR: RefCell<String> = const { RefCell::new(String::new()) };
}

/// Sets the last error message for the current thread.
pub(crate) fn set_last_error(msg: impl Into<String>) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = msg.into();
    });
}

/// Clears the last error message.
pub(crate) fn clear_last_error() {
    LAST_ERROR.with(|e| {
        e.borrow_mut().clear();
    });
}

/// Returns a copy of the last error message for the current thread.
#[cfg(test)]
pub(crate) fn last_error() -> String {
    LAST_ERROR.with(|e| e.borrow().clone())
}

/// Gets the last error message.
///
/// # Arguments
/// * `buffer` - Buffer to write the error message to.
/// * `buffer_size` - Size of the buffer in bytes.
///
/// # Returns
/// The length of the error message (excluding null terminator).
/// If the buffer is too small, the message is truncated.
/// Returns 0 if there is no error message.
///
/// # Safety
/// The buffer must be valid for writes of `buffer_size` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn wand_get_last_error(buffer: *mut c_char, buffer_size: usize) -> usize {
    LAST_ERROR.with(|e| {
        let error = e.borrow();
        unsafe { copy_to_c_buffer(error.as_bytes(), buffer.cast(), buffer_size) }
    })
}

/// Clears the last error message.
#[unsafe(no_mangle)]
pub extern "C" fn wand_clear_last_error() {
    clear_last_error();
}
