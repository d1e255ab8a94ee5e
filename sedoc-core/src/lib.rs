//! `sedoc_core` -- Solid Edge document discovery and property sync engine.
//!
//! Attaches to a running Solid Edge instance through its late-bound
//! automation interface, lists the open documents, activates one on request
//! and reads / writes the custom properties of Draft documents.  Every call
//! is self-contained: it initialises the automation runtime, does its work
//! and releases every reference before returning.
//!
//! The crate has no UI.  It can be consumed by:
//! - `sedoc-cli` (JSON-line worker and document dump binaries)
//! - any host that drives [`worker::run_action`] from its own thread
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`errors`] | `SolidEdgeError` enum via `thiserror` |
//! | [`variant`] | `Variant` values and the `AutomationObject` seam |
//! | [`session`] | `Runtime` trait and the per-call `Session` guard |
//! | `com` | `ComRuntime` / `DispatchObject` via `windows-rs` (Windows only) |
//! | [`collection`] | `_NewEnum` / `Count` + `Item(i)` iteration |
//! | [`document`] | Open-document enumeration and type classification |
//! | [`identity`] | Path / name identity keys and activation |
//! | [`properties`] | Draft custom property read / write |
//! | [`diagnostics`] | Best-effort host probe |
//! | [`engine`] | `Engine` façade, one session per call |
//! | [`worker`] | `Action` → `Payload` with user-facing messages |
//! | [`config`] | `EngineConfig` defaults |

pub mod collection;
#[cfg(windows)]
pub mod com;
pub mod config;
pub mod diagnostics;
pub mod document;
pub mod engine;
pub mod errors;
pub mod identity;
pub mod properties;
pub mod session;
pub mod variant;
pub mod worker;

#[cfg(test)]
mod testing;

pub use engine::Engine;
pub use errors::SolidEdgeError;
