//! Shared test utilities for the dependency-file-fetcher workspace.
//!
//! Provides [`MemoryHost`], an in-memory hosting provider implementing
//! [`fetch_source::ContentClient`], so session and rules suites can build
//! repository trees (including submodules) and assert on the exact requests
//! a fetch made. It is a dev-dependency only and never published.

pub mod host;

pub use host::{MemoryHost, RepoFixture, Request};
