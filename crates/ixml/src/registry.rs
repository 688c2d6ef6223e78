//! Process-wide, reference-counted lifecycle state.
//!
//! The native library keeps its own init refcount, but the binding layer
//! must serialize its bookkeeping too: the loaded symbol table and the
//! count live behind one mutex so two racing first-time initializations
//! cannot both believe they are first.

use std::sync::{Arc, Mutex};

use ixml_sys::IxmlLib;

use crate::error::{check, IxmlError};

pub(crate) struct Registry {
    state: Mutex<State>,
}

struct State {
    refs: u32,
    lib: Option<Arc<IxmlLib>>,
}

impl Registry {
    pub(crate) const fn new() -> Self {
        Registry {
            state: Mutex::new(State { refs: 0, lib: None }),
        }
    }

    /// Takes one reference. The 0 -> 1 transition runs `load` and the
    /// native init; later acquisitions reuse the loaded table.
    pub(crate) fn acquire<F>(&self, load: F) -> Result<Arc<IxmlLib>, IxmlError>
    where
        F: FnOnce() -> Result<Arc<IxmlLib>, IxmlError>,
    {
        let mut state = self.lock();
        if state.refs == 0 {
            let lib = load()?;
            check(unsafe { (lib.table().init)() })?;
            state.lib = Some(lib);
        }
        let lib = match &state.lib {
            Some(lib) => Arc::clone(lib),
            // refs > 0 implies a loaded table; reachable only if state was
            // corrupted, so report it the way the native code would.
            None => return Err(IxmlError::Uninitialized),
        };
        state.refs += 1;
        Ok(lib)
    }

    /// Drops one reference, clamped at zero: releasing more times than
    /// acquiring is a no-op, matching the native over-shutdown contract.
    /// Only the 1 -> 0 transition performs the real teardown.
    pub(crate) fn release(&self) {
        let mut state = self.lock();
        state.refs = state.refs.saturating_sub(1);
        if state.refs == 0 {
            if let Some(lib) = state.lib.take() {
                tracing::debug!("shutting down the ixml library");
                let ret = unsafe { (lib.table().shutdown)() };
                if let Err(err) = check(ret) {
                    tracing::warn!(error = %err, "ixml shutdown reported a failure");
                }
            }
        }
    }

    pub(crate) fn is_loaded(&self) -> bool {
        self.lock().lib.is_some()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        // A panic while holding the lock leaves the state itself coherent;
        // keep going rather than poisoning every later caller.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

pub(crate) fn global() -> &'static Registry {
    static GLOBAL: Registry = Registry::new();
    &GLOBAL
}
