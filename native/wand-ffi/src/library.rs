// Copyright (c) the wand-ffi Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! Loading `libMagickWand` and querying its build configuration.

use std::cell::Cell;
use std::ffi::{CStr, CString, OsString, c_char, c_void};
use std::path::{Path, PathBuf};
use std::ptr::NonNull;

use libloading::Library;
use tracing::{debug, info, warn};

use crate::error::{BindingError, Result};
use crate::signature::LibraryConfig;

/// Environment variable naming the library to load instead of searching.
pub const LIBRARY_PATH_ENV: &str = "MAGICK_WAND_LIBRARY";

#[cfg(target_os = "macos")]
const CANDIDATE_NAMES: &[&str] = &[
    "libMagickWand-7.Q16HDRI.dylib",
    "libMagickWand-7.Q16.dylib",
    "libMagickWand-6.Q16.dylib",
    "libMagickWand.dylib",
];

#[cfg(windows)]
const CANDIDATE_NAMES: &[&str] = &["CORE_RL_MagickWand_.dll", "CORE_RL_wand_.dll"];

#[cfg(all(unix, not(target_os = "macos")))]
const CANDIDATE_NAMES: &[&str] = &[
    "libMagickWand-7.Q16HDRI.so.10",
    "libMagickWand-7.Q16HDRI.so",
    "libMagickWand-7.Q16.so.10",
    "libMagickWand-7.Q16.so",
    "libMagickWand-6.Q16.so.6",
    "libMagickWand-6.Q16.so",
    "libMagickWand.so",
];

/// Resolves native symbols for a dispatch table.
pub trait SymbolSource {
    /// Whether the source refers to a usable library.
    fn is_loaded(&self) -> bool {
        true
    }

    /// Address of an exported symbol, if the library has it.
    fn resolve(&self, symbol: &str) -> Option<NonNull<c_void>>;

    /// Releases a string allocated by MagickCore.
    ///
    /// # Safety
    /// `ptr` must have been returned by the library and not released yet.
    unsafe fn relinquish(&self, ptr: *mut c_void);
}

type GenesisFn = unsafe extern "C" fn();
type TerminusFn = unsafe extern "C" fn();
type GetSizeFn = unsafe extern "C" fn(*mut usize) -> *const c_char;
type QueryOptionFn = unsafe extern "C" fn(*const c_char) -> *mut c_char;
type RelinquishFn = unsafe extern "C" fn(*mut c_void) -> *mut c_void;

/// Library-wide entry points outside the pixel catalog.
struct CoreFunctions {
    genesis: GenesisFn,
    terminus: TerminusFn,
    get_version: GetSizeFn,
    get_quantum_depth: GetSizeFn,
    query_configure_option: QueryOptionFn,
    relinquish_memory: RelinquishFn,
}

impl CoreFunctions {
    fn load(library: &Library) -> Result<Self> {
        Ok(Self {
            genesis: core_symbol(library, "MagickWandGenesis")?,
            terminus: core_symbol(library, "MagickWandTerminus")?,
            get_version: core_symbol(library, "MagickGetVersion")?,
            get_quantum_depth: core_symbol(library, "MagickGetQuantumDepth")?,
            query_configure_option: core_symbol(library, "MagickQueryConfigureOption")?,
            relinquish_memory: core_symbol(library, "MagickRelinquishMemory")?,
        })
    }
}

fn core_symbol<T: Copy>(library: &Library, name: &'static str) -> Result<T> {
    // The function types above match the MagickWand headers.
    unsafe { library.get::<T>(name.as_bytes()) }
        .map(|symbol| *symbol)
        .map_err(|source| BindingError::Symbol { name, source })
}

/// A loaded `libMagickWand` shared library.
pub struct NativeLibrary {
    core: CoreFunctions,
    path: PathBuf,
    initialized: Cell<bool>,
    // Dropped last; every function pointer above points into it.
    library: Library,
}

impl NativeLibrary {
    /// Loads the library at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let library = unsafe { Library::new(path) }
            .map_err(|e| BindingError::Load(format!("{}: {e}", path.display())))?;
        let core = CoreFunctions::load(&library)?;

        info!(path = %path.display(), "loaded MagickWand");

        Ok(Self {
            core,
            path: path.to_path_buf(),
            initialized: Cell::new(false),
            library,
        })
    }

    /// Loads the library named by `MAGICK_WAND_LIBRARY`, or the first platform
    /// candidate that opens.
    pub fn discover() -> Result<Self> {
        Self::open_first(candidate_paths(std::env::var_os(LIBRARY_PATH_ENV)))
    }

    /// Loads the first of `candidates` that opens, warning about each one
    /// that does not.
    fn open_first(candidates: impl IntoIterator<Item = PathBuf>) -> Result<Self> {
        let mut failures = Vec::new();

        for candidate in candidates {
            match Self::open(&candidate) {
                Ok(library) => return Ok(library),
                Err(e) => {
                    warn!(candidate = %candidate.display(), error = %e, "candidate rejected");
                    failures.push(e.to_string());
                }
            }
        }

        debug!(attempts = failures.len(), "no MagickWand library could be loaded");
        Err(BindingError::Load(failures.join("; ")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Calls `MagickWandGenesis` once; `MagickWandTerminus` follows on drop.
    pub fn genesis(&self) {
        if !self.initialized.replace(true) {
            unsafe { (self.core.genesis)() };
        }
    }

    /// Reads version, quantum depth and HDRI mode from the library.
    pub fn query_config(&self) -> Result<LibraryConfig> {
        let mut version: usize = 0;
        let mut depth: usize = 0;
        unsafe {
            (self.core.get_version)(&mut version);
            (self.core.get_quantum_depth)(&mut depth);
        }

        let version = i64::try_from(version).map_err(|_| {
            BindingError::invalid_argument(format!("version {version:#x} out of range"))
        })?;
        let depth = u32::try_from(depth).map_err(|_| {
            BindingError::invalid_argument(format!("quantum depth {depth} out of range"))
        })?;
        let hdri = self
            .configure_option("FEATURES")
            .is_some_and(|features| features_include_hdri(&features));

        LibraryConfig::from_raw(version, depth, hdri)
    }

    /// Value of a build configure option such as `FEATURES` or `QuantumDepth`.
    pub fn configure_option(&self, name: &str) -> Option<String> {
        let name = CString::new(name).ok()?;
        let value = unsafe { (self.core.query_configure_option)(name.as_ptr()) };
        if value.is_null() {
            return None;
        }

        let text = unsafe { CStr::from_ptr(value) }.to_string_lossy().into_owned();
        unsafe { (self.core.relinquish_memory)(value.cast()) };
        Some(text)
    }
}

impl SymbolSource for NativeLibrary {
    fn resolve(&self, symbol: &str) -> Option<NonNull<c_void>> {
        let address = unsafe { self.library.get::<*mut c_void>(symbol.as_bytes()) }.ok()?;
        NonNull::new(*address)
    }

    unsafe fn relinquish(&self, ptr: *mut c_void) {
        unsafe { (self.core.relinquish_memory)(ptr) };
    }
}

impl Drop for NativeLibrary {
    fn drop(&mut self) {
        if self.initialized.get() {
            unsafe { (self.core.terminus)() };
        }
    }
}

/// Search order: the environment override first, then the platform names.
pub(crate) fn candidate_paths(env_override: Option<OsString>) -> Vec<PathBuf> {
    env_override
        .filter(|path| !path.is_empty())
        .map(PathBuf::from)
        .into_iter()
        .chain(CANDIDATE_NAMES.iter().map(PathBuf::from))
        .collect()
}

pub(crate) fn features_include_hdri(features: &str) -> bool {
    features.split_whitespace().any(|feature| feature.eq_ignore_ascii_case("HDRI"))
}
