// Copyright (c) the wand-ffi Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! C-compatible type definitions.

/// Opaque binding handle (a loaded and configured MagickWand library).
#[repr(C)]
pub struct NativeBindingHandle {
    _private: [u8; 0],
}

/// Opaque pixel wand handle.
#[repr(C)]
pub struct NativePixelHandle {
    _private: [u8; 0],
}

/// Status codes returned by binding functions.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WandStatus {
    /// Operation completed successfully.
    Success = 0,
    /// An error occurred. Call `wand_get_last_error` for details.
    Error = 1,
    /// Invalid argument passed to function.
    InvalidArgument = 2,
    /// The function is absent in this ImageMagick version or not exported.
    Unavailable = 3,
    /// The native wand raised an exception.
    NativeException = 4,
}

/// Scalar type of a channel sample as seen through the C ABI.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum QuantumType {
    /// `unsigned char`
    U8 = 0,
    /// `unsigned short`
    U16 = 1,
    /// `unsigned int`
    U32 = 2,
    /// `unsigned long long`
    U64 = 3,
    /// `float`
    F32 = 4,
    /// `double`
    F64 = 5,
    /// `long double`
    LongDouble = 6,
}

impl QuantumType {
    pub const fn is_floating_point(self) -> bool {
        matches!(self, Self::F32 | Self::F64 | Self::LongDouble)
    }

    /// Size of one sample in bytes, if Rust has a matching primitive.
    pub const fn size_in_bytes(self) -> Option<usize> {
        match self {
            Self::U8 => Some(1),
            Self::U16 => Some(2),
            Self::U32 | Self::F32 => Some(4),
            Self::U64 | Self::F64 => Some(8),
            Self::LongDouble => None,
        }
    }

    pub const fn c_name(self) -> &'static str {
        match self {
            Self::U8 => "unsigned char",
            Self::U16 => "unsigned short",
            Self::U32 => "unsigned int",
            Self::U64 => "unsigned long long",
            Self::F32 => "float",
            Self::F64 => "double",
            Self::LongDouble => "long double",
        }
    }
}

/// Color channel of a pixel wand.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WandChannel {
    Red = 0,
    Green = 1,
    Blue = 2,
    Alpha = 3,
}

/// How the HDRI build mode is determined when opening a library.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WandHdriMode {
    /// Ask the library (`FEATURES` configure option).
    Query = 0,
    /// Assume an HDRI build.
    Enabled = 1,
    /// Assume an integer build.
    Disabled = 2,
}

/// Options for opening a binding.
/// Zero / `Query` fields are read from the loaded library.
#[repr(C)]
#[derive(Debug, Clone)]
#[allow(non_snake_case)]
pub struct WandBindingOptions {
    /// Packed ImageMagick version (e.g. 0x0689). 0 = query the library.
    pub Version: u32,
    /// Quantum depth in bits. 0 = query the library.
    pub QuantumDepth: u32,
    /// HDRI mode.
    pub Hdri: WandHdriMode,
    /// Whether to skip `MagickWandGenesis` (the host already initialized the library).
    pub SkipGenesis: bool,
}

impl Default for WandBindingOptions {
    fn default() -> Self {
        Self {
            Version: 0,
            QuantumDepth: 0,
            Hdri: WandHdriMode::Query,
            SkipGenesis: false,
        }
    }
}

/// Build configuration of a loaded library.
#[repr(C)]
#[derive(Debug, Clone)]
#[allow(non_snake_case)]
pub struct WandLibraryInfo {
    /// Packed ImageMagick version.
    pub Version: u32,
    /// Quantum depth in bits.
    pub QuantumDepth: u32,
    /// Resolved channel sample type.
    pub QuantumType: QuantumType,
    /// Whether the library is an HDRI build.
    pub Hdri: bool,
    /// Whether the 7.x API is in use.
    pub IsModern: bool,
}

/// Result of probing a catalog function.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WandFunctionStatus {
    /// Not a function managed by the binding.
    Unknown = 0,
    /// Managed, but no configuration has been attached yet.
    Unconfigured = 1,
    /// Does not exist in the library's API version.
    Absent = 2,
    /// Should exist, but the library does not export it.
    Missing = 3,
    /// Bound and callable.
    Present = 4,
}

/// Parameter or return type tag.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WandCType {
    Void = 0,
    Boolean = 1,
    Double = 2,
    Size = 3,
    PixelWand = 4,
    Pointer = 5,
    CString = 6,
    MagickString = 7,
    IntOut = 8,
    /// See `WandSignatureRaw::QuantumType`.
    Quantum = 9,
}

/// Maximum number of parameters of a catalog function.
pub const WAND_MAX_PARAMS: usize = 4;

/// Signature of a bound function (raw FFI struct).
#[repr(C)]
#[derive(Debug, Clone)]
#[allow(non_snake_case)]
pub struct WandSignatureRaw {
    /// Parameter types; only the first `ParamCount` are meaningful.
    pub Params: [WandCType; WAND_MAX_PARAMS],
    /// Number of parameters.
    pub ParamCount: u32,
    /// Return type.
    pub Return: WandCType,
    /// Sample type when `Return` is `Quantum`.
    pub QuantumType: QuantumType,
}

impl Default for WandSignatureRaw {
    fn default() -> Self {
        Self {
            Params: [WandCType::Void; WAND_MAX_PARAMS],
            ParamCount: 0,
            Return: WandCType::Void,
            QuantumType: QuantumType::U8,
        }
    }
}
