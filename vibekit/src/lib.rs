//! Mobile packaging of `vibekit-core`.
//!
//! Builds the static/dynamic library shipped in the Swift package and the Android AAR. All
//! exported types and functions come from `vibekit_core`; bindings are generated from this
//! library with the `uniffi-bindgen` binary.

pub use vibekit_core::*;

vibekit_core::uniffi_reexport_scaffolding!();
