// Copyright (c) the wand-ffi Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! wand-ffi - version-aware bindings for the MagickWand PixelWand API.
//!
//! This crate loads an installed MagickWand library at runtime, works out
//! which PixelWand functions exist and which channel sample type they use for
//! that build (ImageMagick 6 or 7, quantum depth, HDRI), and exposes the
//! result both as a Rust API and as a C API for FFI bindings to languages
//! like C#.

mod binding;
mod conversions;
mod dispatch;
mod error;
mod library;
mod pixel;
mod signature;
mod types;

#[cfg(test)]
mod test_support;

pub use binding::*;
pub use dispatch::{Dispatch, WandBinding};
pub use error::*;
pub use library::{LIBRARY_PATH_ENV, NativeLibrary, SymbolSource};
pub use pixel::*;
pub use signature::*;
pub use types::*;

/// Returns the library version as a packed integer.
/// Format: (major << 24) | (minor << 16) | (patch << 8)
#[unsafe(no_mangle)]
pub extern "C" fn wand_ffi_version() -> u32 {
    let major: u32 = env!("CARGO_PKG_VERSION_MAJOR").parse().unwrap_or(0);
    let minor: u32 = env!("CARGO_PKG_VERSION_MINOR").parse().unwrap_or(0);
    let patch: u32 = env!("CARGO_PKG_VERSION_PATCH").parse().unwrap_or(0);
    (major << 24) | (minor << 16) | (patch << 8)
}
