//! Vault storage abstraction for the WV export engine.
//!
//! This crate provides a [`VaultStorage`] trait for abstracting vault scanning and
//! content retrieval from the underlying backend. This enables:
//!
//! - **Deterministic tests** that never touch a real directory tree
//! - **Backend flexibility** (filesystem today, archives or remotes later)
//! - **Clean separation** between export pipeline logic and I/O operations
//!
//! # Architecture
//!
//! The crate provides:
//! - [`VaultStorage`] trait with `scan()`, `read()`, `read_bytes()`, `exists()`,
//!   and `stat()` methods
//! - [`FsVault`] implementation for local vault directories
//! - [`MockVault`] for testing (behind the `mock` feature flag)
//!
//! # Path Convention
//!
//! All path parameters are **vault-relative logical paths** with `/` separators
//! (e.g. `notes/daily/2024-01-01.md`). Backends map logical paths to their own
//! addressing scheme.

mod fs;
#[cfg(feature = "mock")]
mod mock;
mod vault;

pub use fs::FsVault;
#[cfg(feature = "mock")]
pub use mock::MockVault;
pub use vault::{Document, FileStat, VaultError, VaultErrorKind, VaultStorage};
