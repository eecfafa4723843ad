//! Node.js ecosystem support
//!
//! Handles:
//! - Lockfile parsing: package-lock.json, pnpm-lock.yaml, yarn.lock
//! - Publish-time lookup via the npm registry API

pub mod lockfile;
mod npm;

pub use lockfile::{Extracted, LockfileError, extract};
pub use npm::{DEFAULT_REGISTRY_URL, NpmRegistry, RegistryError};
