// Copyright (c) the wand-ffi Authors. All rights reserved.
//
// Use of this source code is governed by a BSD-style
// license that can be found in the LICENSE file.

//! The host-side dispatch table that configured signatures are merged into.

use std::collections::BTreeMap;
use std::ffi::{CStr, c_char, c_void};
use std::path::Path;
use std::ptr::NonNull;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::conversions::config_from_options;
use crate::error::{BindingError, Result};
use crate::library::{NativeLibrary, SymbolSource};
use crate::pixel::PixelWand;
use crate::signature::{
    Binding, BindingTarget, CType, LibraryConfig, PixelFunction, Signature, SignatureTable,
    configure_with,
};
use crate::types::{QuantumType, WandBindingOptions, WandFunctionStatus};

/// One attached catalog entry.
#[derive(Debug, Clone, Copy)]
struct Slot {
    binding: Binding,
    /// Resolved symbol; `None` for absent bindings and unexported symbols.
    address: Option<NonNull<c_void>>,
}

/// Catalog functions of one library, with their signatures and addresses.
pub struct Dispatch {
    slots: BTreeMap<PixelFunction, Slot>,
    source: Box<dyn SymbolSource>,
}

impl Dispatch {
    pub fn new(source: impl SymbolSource + 'static) -> Self {
        Self {
            slots: BTreeMap::new(),
            source: Box::new(source),
        }
    }

    pub fn status(&self, function: PixelFunction) -> WandFunctionStatus {
        match self.slots.get(&function) {
            None => WandFunctionStatus::Unconfigured,
            Some(Slot { binding: Binding::Absent, .. }) => WandFunctionStatus::Absent,
            Some(Slot { address: None, .. }) => WandFunctionStatus::Missing,
            Some(_) => WandFunctionStatus::Present,
        }
    }

    pub fn binding(&self, function: PixelFunction) -> Option<Binding> {
        self.slots.get(&function).map(|slot| slot.binding)
    }

    pub fn signature(&self, function: PixelFunction) -> Option<Signature> {
        self.binding(function)?.signature().copied()
    }

    /// Sample type, read back from the attached `PixelGetAlphaQuantum`.
    pub fn quantum_type(&self) -> Option<QuantumType> {
        match self.signature(PixelFunction::PixelGetAlphaQuantum)?.ret {
            CType::Quantum(quantum) => Some(quantum),
            _ => None,
        }
    }

    /// Returns the function pointer for `function` once its attached signature
    /// matches `(params) -> ret`.
    ///
    /// # Safety
    /// `F` must be an `unsafe extern "C" fn` type whose ABI matches
    /// `(params) -> ret`.
    pub(crate) unsafe fn function<F: Copy>(
        &self,
        function: PixelFunction,
        params: &'static [CType],
        ret: CType,
    ) -> Result<F> {
        let slot = self
            .slots
            .get(&function)
            .ok_or(BindingError::Unavailable(function))?;
        let Binding::Present(attached) = slot.binding else {
            return Err(BindingError::Unavailable(function));
        };

        let expected = Signature::new(params, ret);
        if attached != expected {
            return Err(BindingError::SignatureMismatch {
                function,
                attached: attached.to_string(),
                expected: expected.to_string(),
            });
        }

        let address = slot.address.ok_or(BindingError::Unavailable(function))?;
        debug_assert_eq!(size_of::<F>(), size_of::<*mut c_void>());
        Ok(unsafe { std::mem::transmute_copy::<*mut c_void, F>(&address.as_ptr()) })
    }

    /// Copies a MagickCore-allocated string and releases it.
    ///
    /// # Safety
    /// `ptr` must be null or a string returned by the library that has not
    /// been released yet.
    pub(crate) unsafe fn take_string(&self, ptr: *mut c_char) -> Option<String> {
        if ptr.is_null() {
            return None;
        }

        let text = unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned();
        unsafe { self.source.relinquish(ptr.cast()) };
        Some(text)
    }
}

impl BindingTarget for Dispatch {
    fn is_valid(&self) -> bool {
        self.source.is_loaded()
    }

    fn attach(&mut self, function: PixelFunction, binding: Binding) {
        let address = match binding {
            Binding::Present(_) => {
                let address = self.source.resolve(function.symbol());
                if address.is_none() {
                    warn!(%function, "symbol not exported by the loaded library");
                }
                address
            }
            Binding::Absent => None,
        };

        debug!(%function, ?binding, "attached");
        self.slots.insert(function, Slot { binding, address });
    }
}

/// A configured MagickWand library, ready to create pixel wands.
pub struct WandBinding {
    dispatch: Arc<Dispatch>,
    table: SignatureTable,
}

impl WandBinding {
    /// Loads `path` (or discovers the library when `None`) and configures it.
    pub fn open(path: Option<&Path>, options: &WandBindingOptions) -> Result<Self> {
        let library = match path {
            Some(path) => NativeLibrary::open(path)?,
            None => NativeLibrary::discover()?,
        };
        if !options.SkipGenesis {
            library.genesis();
        }

        let config = config_from_options(options, || library.query_config())?;
        Self::configure(Dispatch::new(library), config)
    }

    /// Attaches the signatures for `config` to a fresh dispatch table.
    pub fn configure(mut dispatch: Dispatch, config: LibraryConfig) -> Result<Self> {
        if !dispatch.is_valid() {
            return Err(BindingError::invalid_argument(
                "binding target is not a loaded MagickWand library",
            ));
        }

        let table = configure_with(&mut dispatch, config);
        info!(
            version = %config.version,
            quantum_depth = config.quantum_depth.bits(),
            hdri = config.hdri,
            quantum_type = ?table.quantum_type(),
            "configured PixelWand bindings"
        );

        Ok(Self {
            dispatch: Arc::new(dispatch),
            table,
        })
    }

    pub fn config(&self) -> &LibraryConfig {
        self.table.config()
    }

    pub fn table(&self) -> &SignatureTable {
        &self.table
    }

    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    pub fn status(&self, function: PixelFunction) -> WandFunctionStatus {
        self.dispatch.status(function)
    }

    /// Creates a new pixel wand. The wand keeps the library loaded.
    pub fn new_pixel(&self) -> Result<PixelWand> {
        PixelWand::new(Arc::clone(&self.dispatch))
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
