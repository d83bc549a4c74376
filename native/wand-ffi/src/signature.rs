// Copyright (c) the wand-ffi Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Calling conventions for the MagickWand pixel-color API.
//!
//! The PixelWand functions exported by `libMagickWand` are not the same across
//! releases: a few exist only in 6.x or only in 7.x, and the functions that
//! return a raw channel sample ("quantum") return a type chosen when the
//! library was built. This module turns the three facts that decide the ABI
//! (packed version, quantum depth, HDRI mode) into an immutable
//! [`SignatureTable`], which [`configure`] then attaches to a
//! [`BindingTarget`] such as the host [`Dispatch`](crate::dispatch::Dispatch).

use std::collections::BTreeMap;
use std::fmt;

use crate::error::{BindingError, Result};
use crate::types::QuantumType;

/// First packed version of the 7.x API.
pub const MODERN_API_VERSION: u32 = 0x700;

// ============================================================================
// Build Configuration
// ============================================================================

/// A hex-packed MagickCore version, e.g. `0x0689` for 6.8.9.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MagickVersion(u32);

impl MagickVersion {
    pub const fn from_packed(packed: u32) -> Self {
        Self(packed)
    }

    /// Validates a version code coming from an untyped source.
    pub fn from_raw(raw: i64) -> Result<Self> {
        u32::try_from(raw).map(Self).map_err(|_| {
            BindingError::invalid_argument(format!(
                "expecting a MagickCore version number, got {raw}"
            ))
        })
    }

    pub const fn packed(self) -> u32 {
        self.0
    }

    pub const fn major(self) -> u32 {
        (self.0 >> 8) & 0xff
    }

    pub const fn minor(self) -> u32 {
        (self.0 >> 4) & 0xf
    }

    pub const fn patch(self) -> u32 {
        self.0 & 0xf
    }

    pub const fn era(self) -> ApiEra {
        ApiEra::for_version(self)
    }
}

impl fmt::Display for MagickVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major(), self.minor(), self.patch())
    }
}

/// The two generations of the MagickWand API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiEra {
    /// ImageMagick 6.x (`wand/pixel-wand.h`).
    Legacy,
    /// ImageMagick 7.x (`MagickWand/pixel-wand.h`).
    Modern,
}

impl ApiEra {
    pub const fn for_version(version: MagickVersion) -> Self {
        if version.packed() < MODERN_API_VERSION {
            Self::Legacy
        } else {
            Self::Modern
        }
    }

    pub const fn is_legacy(self) -> bool {
        matches!(self, Self::Legacy)
    }

    pub const fn is_modern(self) -> bool {
        matches!(self, Self::Modern)
    }
}

/// Bits per channel sample the library was built with (`MAGICKCORE_QUANTUM_DEPTH`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuantumDepth {
    Q8 = 8,
    Q16 = 16,
    Q32 = 32,
    Q64 = 64,
}

impl QuantumDepth {
    pub const fn bits(self) -> u32 {
        self as u32
    }
}

impl TryFrom<u32> for QuantumDepth {
    type Error = BindingError;

    fn try_from(bits: u32) -> Result<Self> {
        match bits {
            8 => Ok(Self::Q8),
            16 => Ok(Self::Q16),
            32 => Ok(Self::Q32),
            64 => Ok(Self::Q64),
            other => Err(BindingError::invalid_argument(format!(
                "quantum depth must be one of 8, 16, 32, or 64, got {other}"
            ))),
        }
    }
}

/// Maps the build configuration to the quantum type, following `magick-type.h`.
pub const fn resolve_quantum_type(depth: QuantumDepth, hdri: bool) -> QuantumType {
    match (depth, hdri) {
        (QuantumDepth::Q8, false) => QuantumType::U8,
        (QuantumDepth::Q16, false) => QuantumType::U16,
        (QuantumDepth::Q32, false) => QuantumType::U32,
        (QuantumDepth::Q64, false) => QuantumType::U64,
        (QuantumDepth::Q8 | QuantumDepth::Q16, true) => QuantumType::F32,
        (QuantumDepth::Q32, true) => QuantumType::F64,
        (QuantumDepth::Q64, true) => QuantumType::LongDouble,
    }
}

/// The facts about a loaded library that decide its pixel API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LibraryConfig {
    pub version: MagickVersion,
    pub quantum_depth: QuantumDepth,
    pub hdri: bool,
}

impl LibraryConfig {
    pub const fn new(version: MagickVersion, quantum_depth: QuantumDepth, hdri: bool) -> Self {
        Self {
            version,
            quantum_depth,
            hdri,
        }
    }

    /// Validates an untyped version code and quantum depth.
    pub fn from_raw(version: i64, quantum_depth: u32, hdri: bool) -> Result<Self> {
        Ok(Self {
            version: MagickVersion::from_raw(version)?,
            quantum_depth: QuantumDepth::try_from(quantum_depth)?,
            hdri,
        })
    }

    pub const fn era(&self) -> ApiEra {
        self.version.era()
    }

    pub const fn quantum_type(&self) -> QuantumType {
        resolve_quantum_type(self.quantum_depth, self.hdri)
    }
}

// ============================================================================
// Signatures
// ============================================================================

/// A parameter or return type in a native signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CType {
    Void,
    /// `MagickBooleanType`, an `int`-sized enum.
    Boolean,
    Double,
    /// `size_t`
    Size,
    /// `PixelWand *`
    PixelWand,
    /// Any other opaque pointer (`MagickPixelPacket *`, `PixelInfo *`).
    Pointer,
    /// `const char *` owned by the caller.
    CString,
    /// `char *` allocated by MagickCore, released with `MagickRelinquishMemory`.
    MagickString,
    /// `int *` out-parameter.
    IntOut,
    Quantum(QuantumType),
}

impl fmt::Display for CType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => f.write_str("void"),
            Self::Boolean => f.write_str("MagickBooleanType"),
            Self::Double => f.write_str("double"),
            Self::Size => f.write_str("size_t"),
            Self::PixelWand => f.write_str("PixelWand *"),
            Self::Pointer => f.write_str("void *"),
            Self::CString => f.write_str("const char *"),
            Self::MagickString => f.write_str("char *"),
            Self::IntOut => f.write_str("int *"),
            Self::Quantum(q) => write!(f, "Quantum<{}>", q.c_name()),
        }
    }
}

/// Parameter list and return type of one native function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature {
    pub params: &'static [CType],
    pub ret: CType,
}

impl Signature {
    pub const fn new(params: &'static [CType], ret: CType) -> Self {
        Self { params, ret }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{param}")?;
        }
        write!(f, ") -> {}", self.ret)
    }
}

/// What the configurator decided for one catalog function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Binding {
    Present(Signature),
    /// The function does not exist in this API era.
    Absent,
}

impl Binding {
    pub const fn signature(&self) -> Option<&Signature> {
        match self {
            Self::Present(sig) => Some(sig),
            Self::Absent => None,
        }
    }

    pub const fn is_present(&self) -> bool {
        matches!(self, Self::Present(_))
    }
}

// ============================================================================
// Catalog
// ============================================================================

macro_rules! pixel_functions {
    ($($name:ident),* $(,)?) => {
        /// The PixelWand functions managed by the configurator.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum PixelFunction {
            $($name,)*
        }

        impl PixelFunction {
            pub const ALL: &'static [PixelFunction] = &[$(PixelFunction::$name,)*];

            /// Name of the exported symbol.
            pub const fn symbol(self) -> &'static str {
                match self {
                    $(PixelFunction::$name => stringify!($name),)*
                }
            }
        }
    };
}

pixel_functions!(
    DestroyPixelWand,
    IsPixelWand,
    IsPixelWandSimilar,
    NewPixelWand,
    PixelClearException,
    PixelGetAlpha,
    PixelGetAlphaQuantum,
    PixelGetBlue,
    PixelGetBlueQuantum,
    PixelGetColorAsNormalizedString,
    PixelGetColorAsString,
    PixelGetColorCount,
    PixelGetException,
    PixelGetGreen,
    PixelGetGreenQuantum,
    PixelGetMagickColor,
    PixelGetPixel,
    PixelGetRed,
    PixelGetRedQuantum,
    PixelSetColor,
    PixelSetMagickColor,
    PixelSetPixelColor,
);

pub(crate) const WAND: &[CType] = &[CType::PixelWand];
pub(crate) const WAND_WAND_FUZZ: &[CType] = &[CType::PixelWand, CType::PixelWand, CType::Double];
pub(crate) const WAND_PACKET: &[CType] = &[CType::PixelWand, CType::Pointer];
pub(crate) const WAND_STRING: &[CType] = &[CType::PixelWand, CType::CString];
pub(crate) const WAND_SEVERITY: &[CType] = &[CType::PixelWand, CType::IntOut];

impl PixelFunction {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.symbol() == symbol)
    }

    /// The binding of this function for a quantum type and API era.
    pub const fn binding(self, quantum: QuantumType, era: ApiEra) -> Binding {
        use CType::*;

        const fn present(params: &'static [CType], ret: CType) -> Binding {
            Binding::Present(Signature::new(params, ret))
        }

        match self {
            Self::DestroyPixelWand => present(WAND, PixelWand),
            Self::IsPixelWand => present(WAND, Boolean),
            Self::IsPixelWandSimilar => present(WAND_WAND_FUZZ, Boolean),
            Self::NewPixelWand => present(&[], PixelWand),
            Self::PixelClearException => present(WAND, Void),
            Self::PixelGetAlpha => present(WAND, Double),
            Self::PixelGetAlphaQuantum => present(WAND, Quantum(quantum)),
            Self::PixelGetBlue => present(WAND, Double),
            Self::PixelGetBlueQuantum => present(WAND, Quantum(quantum)),
            Self::PixelGetColorAsNormalizedString => present(WAND, MagickString),
            Self::PixelGetColorAsString => present(WAND, MagickString),
            Self::PixelGetColorCount => present(WAND, Size),
            Self::PixelGetException => present(WAND_SEVERITY, MagickString),
            Self::PixelGetGreen => present(WAND, Double),
            Self::PixelGetGreenQuantum => present(WAND, Quantum(quantum)),
            Self::PixelGetMagickColor => present(WAND_PACKET, Void),
            Self::PixelGetRed => present(WAND, Double),
            Self::PixelGetRedQuantum => present(WAND, Quantum(quantum)),
            Self::PixelSetColor => present(WAND_STRING, Boolean),
            Self::PixelGetPixel => match era {
                ApiEra::Modern => present(WAND, Pointer),
                ApiEra::Legacy => Binding::Absent,
            },
            Self::PixelSetMagickColor => match era {
                ApiEra::Legacy => present(WAND_PACKET, Void),
                ApiEra::Modern => Binding::Absent,
            },
            Self::PixelSetPixelColor => match era {
                ApiEra::Modern => present(WAND_PACKET, Void),
                ApiEra::Legacy => Binding::Absent,
            },
        }
    }
}

impl fmt::Display for PixelFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Immutable mapping from catalog function to binding for one library build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureTable {
    config: LibraryConfig,
    entries: BTreeMap<PixelFunction, Binding>,
}

impl SignatureTable {
    pub fn for_config(config: LibraryConfig) -> Self {
        let quantum = config.quantum_type();
        let era = config.era();
        let entries = PixelFunction::ALL
            .iter()
            .map(|&function| (function, function.binding(quantum, era)))
            .collect();

        Self { config, entries }
    }

    pub fn config(&self) -> &LibraryConfig {
        &self.config
    }

    pub fn quantum_type(&self) -> QuantumType {
        self.config.quantum_type()
    }

    pub fn era(&self) -> ApiEra {
        self.config.era()
    }

    pub fn get(&self, function: PixelFunction) -> Option<&Binding> {
        self.entries.get(&function)
    }

    pub fn is_present(&self, function: PixelFunction) -> bool {
        self.get(function).is_some_and(Binding::is_present)
    }

    pub fn iter(&self) -> impl Iterator<Item = (PixelFunction, &Binding)> {
        self.entries.iter().map(|(&function, binding)| (function, binding))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Something a [`SignatureTable`] can be attached to.
pub trait BindingTarget {
    /// Whether the target refers to a usable loaded library.
    fn is_valid(&self) -> bool {
        true
    }

    /// Records `binding` for `function`, replacing any earlier entry.
    fn attach(&mut self, function: PixelFunction, binding: Binding);
}

/// Validates the build configuration and attaches the matching signatures to
/// `target`.
///
/// Nothing is attached unless every argument is valid. Attaching the same
/// configuration again leaves the target unchanged.
pub fn configure<T: BindingTarget + ?Sized>(
    target: &mut T,
    version: i64,
    quantum_depth: u32,
    hdri: bool,
) -> Result<SignatureTable> {
    if !target.is_valid() {
        return Err(BindingError::invalid_argument(
            "binding target is not a loaded MagickWand library",
        ));
    }
    let config = LibraryConfig::from_raw(version, quantum_depth, hdri)?;
    Ok(configure_with(target, config))
}

/// Attaches the signatures for an already validated configuration.
pub fn configure_with<T: BindingTarget + ?Sized>(
    target: &mut T,
    config: LibraryConfig,
) -> SignatureTable {
    let table = SignatureTable::for_config(config);
    for (function, binding) in table.iter() {
        target.attach(function, *binding);
    }
    table
}

#[cfg(test)]
#[path = "signature_tests.rs"]
mod tests;
