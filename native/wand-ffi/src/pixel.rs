// Copyright (c) the wand-ffi Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Safe wrapper around a native `PixelWand`.
//!
//! Every call goes through the [`Dispatch`] table, which refuses to hand out a
//! function pointer unless the signature attached for the loaded library
//! matches the Rust function type used here.

use std::ffi::{CString, c_char, c_double, c_int, c_uint, c_void};
use std::ptr::NonNull;
use std::sync::Arc;

use tracing::warn;

use crate::dispatch::Dispatch;
use crate::error::{BindingError, Result};
use crate::signature::{
    CType, PixelFunction, WAND, WAND_PACKET, WAND_SEVERITY, WAND_STRING, WAND_WAND_FUZZ,
};
use crate::types::{QuantumType, WandChannel, WandFunctionStatus};

/// `MagickBooleanType`
type MagickBoolean = c_uint;

const MAGICK_FALSE: MagickBoolean = 0;

type WandFn<R> = unsafe extern "C" fn(*mut c_void) -> R;
type NewWandFn = unsafe extern "C" fn() -> *mut c_void;
type SimilarFn = unsafe extern "C" fn(*mut c_void, *mut c_void, c_double) -> MagickBoolean;
type SetColorFn = unsafe extern "C" fn(*mut c_void, *const c_char) -> MagickBoolean;
type ExceptionFn = unsafe extern "C" fn(*mut c_void, *mut c_int) -> *mut c_char;
type PacketFn = unsafe extern "C" fn(*mut c_void, *mut c_void);

/// Size reserved for a `MagickPixelPacket` (6.x) or `PixelInfo` (7.x).
pub const COLOR_PACKET_SIZE: usize = 256;

impl WandChannel {
    pub const ALL: [WandChannel; 4] = [Self::Red, Self::Green, Self::Blue, Self::Alpha];

    const fn value_function(self) -> PixelFunction {
        match self {
            Self::Red => PixelFunction::PixelGetRed,
            Self::Green => PixelFunction::PixelGetGreen,
            Self::Blue => PixelFunction::PixelGetBlue,
            Self::Alpha => PixelFunction::PixelGetAlpha,
        }
    }

    const fn quantum_function(self) -> PixelFunction {
        match self {
            Self::Red => PixelFunction::PixelGetRedQuantum,
            Self::Green => PixelFunction::PixelGetGreenQuantum,
            Self::Blue => PixelFunction::PixelGetBlueQuantum,
            Self::Alpha => PixelFunction::PixelGetAlphaQuantum,
        }
    }
}

impl TryFrom<u32> for WandChannel {
    type Error = BindingError;

    fn try_from(value: u32) -> Result<Self> {
        Self::ALL
            .get(value as usize)
            .copied()
            .ok_or_else(|| BindingError::invalid_argument(format!("unknown channel {value}")))
    }
}

/// A raw channel sample in the library's quantum representation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Quantum {
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    F32(f32),
    F64(f64),
}

impl Quantum {
    pub fn quantum_type(self) -> QuantumType {
        match self {
            Self::U8(_) => QuantumType::U8,
            Self::U16(_) => QuantumType::U16,
            Self::U32(_) => QuantumType::U32,
            Self::U64(_) => QuantumType::U64,
            Self::F32(_) => QuantumType::F32,
            Self::F64(_) => QuantumType::F64,
        }
    }

    pub fn to_f64(self) -> f64 {
        match self {
            Self::U8(v) => v.into(),
            Self::U16(v) => v.into(),
            Self::U32(v) => v.into(),
            Self::U64(v) => v as f64,
            Self::F32(v) => v.into(),
            Self::F64(v) => v,
        }
    }

    /// The sample in native byte order, as the library stores it.
    pub fn to_ne_bytes(self) -> Vec<u8> {
        match self {
            Self::U8(v) => bytemuck::bytes_of(&v).to_vec(),
            Self::U16(v) => bytemuck::bytes_of(&v).to_vec(),
            Self::U32(v) => bytemuck::bytes_of(&v).to_vec(),
            Self::U64(v) => bytemuck::bytes_of(&v).to_vec(),
            Self::F32(v) => bytemuck::bytes_of(&v).to_vec(),
            Self::F64(v) => bytemuck::bytes_of(&v).to_vec(),
        }
    }
}

/// Opaque copy of a wand's full color, as filled by `PixelGetMagickColor`.
#[repr(C, align(16))]
#[derive(Debug, Clone, PartialEq)]
pub struct ColorPacket {
    bytes: [u8; COLOR_PACKET_SIZE],
}

impl Default for ColorPacket {
    fn default() -> Self {
        Self {
            bytes: [0; COLOR_PACKET_SIZE],
        }
    }
}

impl ColorPacket {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    fn as_mut_ptr(&mut self) -> *mut c_void {
        self.bytes.as_mut_ptr().cast()
    }
}

/// A native pixel wand. Destroyed with `DestroyPixelWand` on drop.
pub struct PixelWand {
    dispatch: Arc<Dispatch>,
    raw: NonNull<c_void>,
}

impl PixelWand {
    pub fn new(dispatch: Arc<Dispatch>) -> Result<Self> {
        let new_wand: NewWandFn =
            unsafe { dispatch.function(PixelFunction::NewPixelWand, &[], CType::PixelWand)? };
        let raw = NonNull::new(unsafe { new_wand() })
            .ok_or_else(|| BindingError::Internal("NewPixelWand returned null".into()))?;

        Ok(Self { dispatch, raw })
    }

    pub fn as_ptr(&self) -> *mut c_void {
        self.raw.as_ptr()
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Both wands must come from the same loaded library.
    fn ensure_same_library(&self, other: &PixelWand) -> Result<()> {
        if Arc::ptr_eq(&self.dispatch, &other.dispatch) {
            Ok(())
        } else {
            Err(BindingError::invalid_argument(
                "pixel wands belong to different MagickWand libraries",
            ))
        }
    }

    /// Calls a `(PixelWand *) -> R` catalog function.
    fn call<R>(&self, function: PixelFunction, ret: CType) -> Result<R> {
        let f: WandFn<R> = unsafe { self.dispatch.function(function, WAND, ret)? };
        Ok(unsafe { f(self.as_ptr()) })
    }

    fn call_string(&self, function: PixelFunction) -> Result<String> {
        let ptr: *mut c_char = self.call(function, CType::MagickString)?;
        unsafe { self.dispatch.take_string(ptr) }
            .ok_or_else(|| BindingError::Internal(format!("{function} returned null")))
    }

    pub fn is_valid(&self) -> Result<bool> {
        let valid: MagickBoolean = self.call(PixelFunction::IsPixelWand, CType::Boolean)?;
        Ok(valid != MAGICK_FALSE)
    }

    /// Whether the two colors are within `fuzz` of each other.
    pub fn is_similar(&self, other: &PixelWand, fuzz: f64) -> Result<bool> {
        self.ensure_same_library(other)?;
        let f: SimilarFn = unsafe {
            self.dispatch
                .function(PixelFunction::IsPixelWandSimilar, WAND_WAND_FUZZ, CType::Boolean)?
        };
        Ok(unsafe { f(self.as_ptr(), other.as_ptr(), fuzz) } != MAGICK_FALSE)
    }

    /// Sets the color from a name, hex code or functional notation such as
    /// `"srgb(255,0,0)"`.
    pub fn set_color(&mut self, color: &str) -> Result<()> {
        let color = CString::new(color)
            .map_err(|_| BindingError::invalid_argument("color contains a null byte"))?;
        let f: SetColorFn = unsafe {
            self.dispatch
                .function(PixelFunction::PixelSetColor, WAND_STRING, CType::Boolean)?
        };

        if unsafe { f(self.as_ptr(), color.as_ptr()) } != MAGICK_FALSE {
            return Ok(());
        }

        let error = match self.exception()? {
            Some(error) => error,
            None => BindingError::Native {
                severity: 0,
                message: format!("unrecognized color {color:?}"),
            },
        };
        self.clear_exception()?;
        Err(error)
    }

    /// Normalized channel value in `0.0..=1.0`.
    pub fn channel(&self, channel: WandChannel) -> Result<f64> {
        self.call(channel.value_function(), CType::Double)
    }

    pub fn red(&self) -> Result<f64> {
        self.channel(WandChannel::Red)
    }

    pub fn green(&self) -> Result<f64> {
        self.channel(WandChannel::Green)
    }

    pub fn blue(&self) -> Result<f64> {
        self.channel(WandChannel::Blue)
    }

    pub fn alpha(&self) -> Result<f64> {
        self.channel(WandChannel::Alpha)
    }

    /// Raw channel sample, typed by the library's quantum depth and HDRI mode.
    pub fn quantum(&self, channel: WandChannel) -> Result<Quantum> {
        let function = channel.quantum_function();
        let ret = self.dispatch.signature(function).map(|sig| sig.ret);
        let Some(CType::Quantum(quantum_type)) = ret else {
            return Err(BindingError::Unavailable(function));
        };
        let ret = CType::Quantum(quantum_type);

        Ok(match quantum_type {
            QuantumType::U8 => Quantum::U8(self.call(function, ret)?),
            QuantumType::U16 => Quantum::U16(self.call(function, ret)?),
            QuantumType::U32 => Quantum::U32(self.call(function, ret)?),
            QuantumType::U64 => Quantum::U64(self.call(function, ret)?),
            QuantumType::F32 => Quantum::F32(self.call(function, ret)?),
            QuantumType::F64 => Quantum::F64(self.call(function, ret)?),
            QuantumType::LongDouble => {
                return Err(BindingError::unsupported_quantum(function, quantum_type));
            }
        })
    }

    pub fn red_quantum(&self) -> Result<Quantum> {
        self.quantum(WandChannel::Red)
    }

    pub fn green_quantum(&self) -> Result<Quantum> {
        self.quantum(WandChannel::Green)
    }

    pub fn blue_quantum(&self) -> Result<Quantum> {
        self.quantum(WandChannel::Blue)
    }

    pub fn alpha_quantum(&self) -> Result<Quantum> {
        self.quantum(WandChannel::Alpha)
    }

    /// The color as ImageMagick spells it, e.g. `srgb(255,0,0)`.
    pub fn color_string(&self) -> Result<String> {
        self.call_string(PixelFunction::PixelGetColorAsString)
    }

    /// The color as comma-separated normalized channel values.
    pub fn normalized_color_string(&self) -> Result<String> {
        self.call_string(PixelFunction::PixelGetColorAsNormalizedString)
    }

    /// Number of pixels with this color (set by histogram queries).
    pub fn color_count(&self) -> Result<usize> {
        self.call(PixelFunction::PixelGetColorCount, CType::Size)
    }

    /// The pending wand exception, if any, as a [`BindingError::Native`].
    pub fn exception(&self) -> Result<Option<BindingError>> {
        let f: ExceptionFn = unsafe {
            self.dispatch
                .function(PixelFunction::PixelGetException, WAND_SEVERITY, CType::MagickString)?
        };

        let mut severity: c_int = 0;
        let message = unsafe { self.dispatch.take_string(f(self.as_ptr(), &mut severity)) };
        if severity == 0 {
            return Ok(None);
        }

        Ok(Some(BindingError::Native {
            severity,
            message: message.unwrap_or_default(),
        }))
    }

    pub fn clear_exception(&mut self) -> Result<()> {
        self.call::<()>(PixelFunction::PixelClearException, CType::Void)
    }

    /// Copies the full color (all channels, colorspace, fuzz) out of the wand.
    pub fn color_packet(&self) -> Result<ColorPacket> {
        let f: PacketFn = unsafe {
            self.dispatch
                .function(PixelFunction::PixelGetMagickColor, WAND_PACKET, CType::Void)?
        };

        let mut packet = ColorPacket::default();
        unsafe { f(self.as_ptr(), packet.as_mut_ptr()) };
        Ok(packet)
    }

    /// Restores a color captured with [`color_packet`](Self::color_packet),
    /// using whichever setter the loaded API version provides.
    pub fn set_color_packet(&mut self, packet: &ColorPacket) -> Result<()> {
        let setter = if self.dispatch.status(PixelFunction::PixelSetPixelColor)
            == WandFunctionStatus::Present
        {
            PixelFunction::PixelSetPixelColor
        } else {
            PixelFunction::PixelSetMagickColor
        };
        let f: PacketFn = unsafe { self.dispatch.function(setter, WAND_PACKET, CType::Void)? };

        // The setters only read from the packet.
        unsafe { f(self.as_ptr(), packet.bytes.as_ptr().cast_mut().cast()) };
        Ok(())
    }

    pub fn copy_color_from(&mut self, other: &PixelWand) -> Result<()> {
        self.ensure_same_library(other)?;
        let packet = other.color_packet()?;
        self.set_color_packet(&packet)
    }
}

impl Drop for PixelWand {
    fn drop(&mut self) {
        let destroyed = self.call::<*mut c_void>(PixelFunction::DestroyPixelWand, CType::PixelWand);
        if let Err(e) = destroyed {
            warn!(error = %e, "leaking pixel wand");
        }
    }
}

#[cfg(test)]
#[path = "pixel_tests.rs"]
mod tests;
