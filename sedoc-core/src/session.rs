//! Per-call automation session guard.
//!
//! [`Session`] wraps runtime initialisation / teardown in an RAII pattern so
//! that every engine call starts from a freshly initialised apartment and
//! ends with all native references released, unused libraries reclaimed and
//! the apartment torn down, even on early return or panic.
//!
//! The `PhantomData<*const ()>` field enforces `!Send` + `!Sync` at compile
//! time, preventing the guard from being moved across thread boundaries.

use std::marker::PhantomData;

use crate::errors::SolidEdgeError;
use crate::variant::{AutomationObject, Handle};

/// The automation runtime the engine attaches through.
///
/// On Windows this is COM (`com::ComRuntime`); tests supply an in-memory
/// host.  Calls are strictly single-in-flight.
pub trait Runtime {
    /// Initialise the runtime for the calling thread.  Returns `true` when a
    /// balancing [`Runtime::uninitialize`] is required.
    fn initialize(&self) -> Result<bool, SolidEdgeError>;

    /// Look up the running application object.
    fn attach(&self) -> Result<Handle, SolidEdgeError>;

    /// Ask the runtime to unload libraries that no longer hold references.
    fn reclaim(&self);

    fn uninitialize(&self);
}

/// RAII scope for one engine call.
#[must_use = "Session must be kept alive for the duration of host access"]
pub struct Session<'r, R: Runtime + ?Sized> {
    runtime: &'r R,
    should_uninit: bool,
    _not_send: PhantomData<*const ()>,
}

impl<'r, R: Runtime + ?Sized> Session<'r, R> {
    /// Initialise the runtime for this call.
    pub fn open(runtime: &'r R) -> Result<Self, SolidEdgeError> {
        let should_uninit = runtime.initialize()?;
        log::trace!("session opened (balancing uninit: {should_uninit})");
        Ok(Self {
            runtime,
            should_uninit,
            _not_send: PhantomData,
        })
    }

    /// Attach to the application and run `body` against it.
    ///
    /// The application handle, and every handle `body` derived from it, is
    /// dropped before the session itself is torn down.
    pub fn run<T, F>(self, body: F) -> Result<T, SolidEdgeError>
    where
        F: FnOnce(&dyn AutomationObject) -> Result<T, SolidEdgeError>,
    {
        let application = self.runtime.attach()?;
        let result = body(application.as_ref());
        drop(application);
        result
    }
}

impl<R: Runtime + ?Sized> Drop for Session<'_, R> {
    fn drop(&mut self) {
        self.runtime.reclaim();
        if self.should_uninit {
            self.runtime.uninitialize();
        }
        log::trace!("session closed");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
