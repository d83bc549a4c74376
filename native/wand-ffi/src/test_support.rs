// Copyright (c) the wand-ffi Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! In-process stand-ins for MagickWand, shared by the unit tests.

use std::cell::Cell;
use std::collections::HashMap;
use std::ffi::{CStr, CString, c_char, c_double, c_int, c_uint, c_void};
use std::ptr::NonNull;

use crate::dispatch::{Dispatch, WandBinding};
use crate::library::SymbolSource;
use crate::pixel::PixelWand;
use crate::signature::LibraryConfig;
use crate::types::QuantumType;

/// Severity the fake reports for unparseable colors (`OptionError`).
pub(crate) const OPTION_ERROR: c_int = 410;

thread_local! {
    static DESTROYED: Cell<usize> = const { Cell::new(0) };
    static RELINQUISHED: Cell<usize> = const { Cell::new(0) };
    static LAST_SETTER: Cell<Option<&'static str>> = const { Cell::new(None) };
}

pub(crate) fn destroyed_count() -> usize {
    DESTROYED.with(Cell::get)
}

pub(crate) fn relinquished_count() -> usize {
    RELINQUISHED.with(Cell::get)
}

pub(crate) fn last_setter() -> Option<&'static str> {
    LAST_SETTER.with(Cell::get)
}

/// State behind a fake `PixelWand *`.
#[derive(Debug, Clone)]
pub(crate) struct FakeWand {
    pub rgba: [f64; 4],
    pub color_count: usize,
    pub severity: c_int,
    pub message: String,
}

impl Default for FakeWand {
    fn default() -> Self {
        Self {
            rgba: [0.0, 0.0, 0.0, 1.0],
            color_count: 0,
            severity: 0,
            message: String::new(),
        }
    }
}

/// The fake state of a live pixel wand.
pub(crate) fn fake_wand(pixel: &PixelWand) -> &mut FakeWand {
    unsafe { &mut *pixel.as_ptr().cast::<FakeWand>() }
}

unsafe fn wand<'a>(ptr: *mut c_void) -> &'a mut FakeWand {
    unsafe { &mut *ptr.cast::<FakeWand>() }
}

fn into_c_string(text: String) -> *mut c_char {
    CString::new(text).map_or(std::ptr::null_mut(), CString::into_raw)
}

fn to_8bit(value: f64) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

unsafe extern "C" fn new_pixel_wand() -> *mut c_void {
    Box::into_raw(Box::new(FakeWand::default())).cast()
}

unsafe extern "C" fn destroy_pixel_wand(ptr: *mut c_void) -> *mut c_void {
    drop(unsafe { Box::from_raw(ptr.cast::<FakeWand>()) });
    DESTROYED.with(|count| count.set(count.get() + 1));
    std::ptr::null_mut()
}

unsafe extern "C" fn is_pixel_wand(ptr: *mut c_void) -> c_uint {
    (!ptr.is_null()) as c_uint
}

unsafe extern "C" fn is_pixel_wand_similar(
    a: *mut c_void,
    b: *mut c_void,
    fuzz: c_double,
) -> c_uint {
    let (a, b) = unsafe { (wand(a).rgba, wand(b).rgba) };
    a.iter().zip(b).all(|(x, y)| (x - y).abs() <= fuzz) as c_uint
}

unsafe extern "C" fn pixel_set_color(ptr: *mut c_void, color: *const c_char) -> c_uint {
    let wand = unsafe { wand(ptr) };
    let name = unsafe { CStr::from_ptr(color) }.to_string_lossy();
    let rgba = match name.as_ref() {
        "black" => [0.0, 0.0, 0.0, 1.0],
        "white" => [1.0, 1.0, 1.0, 1.0],
        "red" => [1.0, 0.0, 0.0, 1.0],
        "blue" => [0.0, 0.0, 1.0, 1.0],
        "transparent" => [0.0, 0.0, 0.0, 0.0],
        other => {
            wand.severity = OPTION_ERROR;
            wand.message = format!("UnrecognizedColor `{other}'");
            return 0;
        }
    };
    wand.rgba = rgba;
    1
}

unsafe extern "C" fn pixel_get_red(ptr: *mut c_void) -> c_double {
    unsafe { wand(ptr).rgba[0] }
}

unsafe extern "C" fn pixel_get_green(ptr: *mut c_void) -> c_double {
    unsafe { wand(ptr).rgba[1] }
}

unsafe extern "C" fn pixel_get_blue(ptr: *mut c_void) -> c_double {
    unsafe { wand(ptr).rgba[2] }
}

unsafe extern "C" fn pixel_get_alpha(ptr: *mut c_void) -> c_double {
    unsafe { wand(ptr).rgba[3] }
}

/// A channel sample type the fake can return from the quantum getters.
pub(crate) trait FakeSample: Copy {
    /// Sample for a normalized channel value.
    fn from_unit(value: f64) -> Self;
}

macro_rules! integer_samples {
    ($($ty:ty),*) => {
        $(impl FakeSample for $ty {
            fn from_unit(value: f64) -> Self {
                (value.clamp(0.0, 1.0) * <$ty>::MAX as f64).round() as $ty
            }
        })*
    };
}

integer_samples!(u8, u16, u32, u64);

// HDRI stand-ins report normalized samples.
impl FakeSample for f32 {
    fn from_unit(value: f64) -> Self {
        value as f32
    }
}

impl FakeSample for f64 {
    fn from_unit(value: f64) -> Self {
        value
    }
}

unsafe extern "C" fn pixel_get_quantum<T: FakeSample, const CHANNEL: usize>(
    ptr: *mut c_void,
) -> T {
    T::from_unit(unsafe { wand(ptr).rgba[CHANNEL] })
}

fn quantum_symbols<T: FakeSample>() -> [(&'static str, NonNull<c_void>); 4] {
    fn address(function: *mut c_void) -> NonNull<c_void> {
        NonNull::new(function).expect("function address")
    }

    [
        ("PixelGetRedQuantum", address(pixel_get_quantum::<T, 0> as *mut c_void)),
        ("PixelGetGreenQuantum", address(pixel_get_quantum::<T, 1> as *mut c_void)),
        ("PixelGetBlueQuantum", address(pixel_get_quantum::<T, 2> as *mut c_void)),
        ("PixelGetAlphaQuantum", address(pixel_get_quantum::<T, 3> as *mut c_void)),
    ]
}

unsafe extern "C" fn pixel_get_color_as_string(ptr: *mut c_void) -> *mut c_char {
    let [r, g, b, _] = unsafe { wand(ptr).rgba };
    into_c_string(format!("srgb({},{},{})", to_8bit(r), to_8bit(g), to_8bit(b)))
}

unsafe extern "C" fn pixel_get_color_as_normalized_string(ptr: *mut c_void) -> *mut c_char {
    let [r, g, b, _] = unsafe { wand(ptr).rgba };
    into_c_string(format!("{r},{g},{b}"))
}

unsafe extern "C" fn pixel_get_color_count(ptr: *mut c_void) -> usize {
    unsafe { wand(ptr).color_count }
}

unsafe extern "C" fn pixel_get_exception(ptr: *mut c_void, severity: *mut c_int) -> *mut c_char {
    let wand = unsafe { wand(ptr) };
    unsafe { *severity = wand.severity };
    into_c_string(wand.message.clone())
}

unsafe extern "C" fn pixel_clear_exception(ptr: *mut c_void) {
    let wand = unsafe { wand(ptr) };
    wand.severity = 0;
    wand.message.clear();
}

unsafe extern "C" fn pixel_get_magick_color(ptr: *mut c_void, packet: *mut c_void) {
    unsafe { *packet.cast::<[f64; 4]>() = wand(ptr).rgba };
}

unsafe extern "C" fn pixel_set_magick_color(ptr: *mut c_void, packet: *mut c_void) {
    unsafe { wand(ptr).rgba = *packet.cast::<[f64; 4]>() };
    LAST_SETTER.with(|setter| setter.set(Some("PixelSetMagickColor")));
}

unsafe extern "C" fn pixel_set_pixel_color(ptr: *mut c_void, packet: *mut c_void) {
    unsafe { wand(ptr).rgba = *packet.cast::<[f64; 4]>() };
    LAST_SETTER.with(|setter| setter.set(Some("PixelSetPixelColor")));
}

unsafe extern "C" fn pixel_get_pixel(_ptr: *mut c_void) -> *mut c_void {
    std::ptr::null_mut()
}

macro_rules! fake_symbols {
    ($($symbol:literal => $function:ident),* $(,)?) => {
        HashMap::from([
            $(($symbol, NonNull::new($function as *mut c_void).expect("function address")),)*
        ])
    };
}

/// A [`SymbolSource`] exporting the in-process stand-ins.
pub(crate) struct FakeLibrary {
    symbols: HashMap<&'static str, NonNull<c_void>>,
    loaded: bool,
}

impl FakeLibrary {
    /// A library whose quantum getters return 16-bit integer samples.
    pub(crate) fn new() -> Self {
        Self::for_quantum(QuantumType::U16)
    }

    /// A library whose quantum getters return `quantum` samples.
    ///
    /// `LongDouble` getters fall back to 16-bit stand-ins; they are never
    /// called from Rust.
    pub(crate) fn for_quantum(quantum: QuantumType) -> Self {
        let mut symbols = fake_symbols!(
            "NewPixelWand" => new_pixel_wand,
            "DestroyPixelWand" => destroy_pixel_wand,
            "IsPixelWand" => is_pixel_wand,
            "IsPixelWandSimilar" => is_pixel_wand_similar,
            "PixelSetColor" => pixel_set_color,
            "PixelGetRed" => pixel_get_red,
            "PixelGetGreen" => pixel_get_green,
            "PixelGetBlue" => pixel_get_blue,
            "PixelGetAlpha" => pixel_get_alpha,
            "PixelGetColorAsString" => pixel_get_color_as_string,
            "PixelGetColorAsNormalizedString" => pixel_get_color_as_normalized_string,
            "PixelGetColorCount" => pixel_get_color_count,
            "PixelGetException" => pixel_get_exception,
            "PixelClearException" => pixel_clear_exception,
            "PixelGetMagickColor" => pixel_get_magick_color,
            "PixelSetMagickColor" => pixel_set_magick_color,
            "PixelSetPixelColor" => pixel_set_pixel_color,
            "PixelGetPixel" => pixel_get_pixel,
        );
        symbols.extend(match quantum {
            QuantumType::U8 => quantum_symbols::<u8>(),
            QuantumType::U16 | QuantumType::LongDouble => quantum_symbols::<u16>(),
            QuantumType::U32 => quantum_symbols::<u32>(),
            QuantumType::U64 => quantum_symbols::<u64>(),
            QuantumType::F32 => quantum_symbols::<f32>(),
            QuantumType::F64 => quantum_symbols::<f64>(),
        });

        Self {
            symbols,
            loaded: true,
        }
    }

    /// A library that stopped being usable (e.g. failed to initialize).
    pub(crate) fn unloaded() -> Self {
        Self {
            symbols: HashMap::new(),
            loaded: false,
        }
    }

    pub(crate) fn without(mut self, symbol: &str) -> Self {
        self.symbols.remove(symbol);
        self
    }
}

impl SymbolSource for FakeLibrary {
    fn is_loaded(&self) -> bool {
        self.loaded
    }

    fn resolve(&self, symbol: &str) -> Option<NonNull<c_void>> {
        self.symbols.get(symbol).copied()
    }

    unsafe fn relinquish(&self, ptr: *mut c_void) {
        drop(unsafe { CString::from_raw(ptr.cast()) });
        RELINQUISHED.with(|count| count.set(count.get() + 1));
    }
}

/// A binding over `library` configured for the given build.
pub(crate) fn fake_binding_with(
    library: FakeLibrary,
    version: i64,
    depth: u32,
    hdri: bool,
) -> WandBinding {
    let config = LibraryConfig::from_raw(version, depth, hdri).expect("valid configuration");
    WandBinding::configure(Dispatch::new(library), config).expect("fake library is loaded")
}

/// A binding over a fake library whose quantum getters match the build.
pub(crate) fn fake_binding(version: i64, depth: u32, hdri: bool) -> WandBinding {
    let config = LibraryConfig::from_raw(version, depth, hdri).expect("valid configuration");
    let library = FakeLibrary::for_quantum(config.quantum_type());
    WandBinding::configure(Dispatch::new(library), config).expect("fake library is loaded")
}

/// A 6.8.9 Q16 binding over the full fake library.
pub(crate) fn legacy_binding() -> WandBinding {
    fake_binding_with(FakeLibrary::new(), 0x0689, 16, false)
}

/// A 7.0.10 Q16 binding over the full fake library.
pub(crate) fn modern_binding() -> WandBinding {
    fake_binding_with(FakeLibrary::new(), 0x070A, 16, false)
}
