//! Workspace placeholder crate.
//!
//! Exposes feature flags that map to the member crates so a host application
//! can depend on `podcast-workspace` alone. With `desktop-shims` enabled the
//! desktop bridges are wired in and `core_service` is re-exported.

#[cfg(feature = "desktop-shims")]
pub use core_service;
