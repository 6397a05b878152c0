//! # reqtrace-vcs
//!
//! Artifact version-control subsystem for requirements-traceability
//! projects whose artifacts (requirements, use cases, test cases,
//! information items) live as individual text files inside a
//! version-controlled working directory.
//!
//! ## Overview
//!
//! The crate layers a uniform virtual filesystem over two kinds of
//! storage (a privileged native path and a permission-scoped sandboxed
//! directory), drives an embedded version-control engine through it,
//! serializes commits so concurrent artifact saves produce one consistent
//! history, and exposes history, baseline, remote, and sync services
//! behind a single facade.
//!
//! ## Key features
//!
//! - **Dual storage backends**: identical behavior on a native host path
//!   or a sandboxed directory grant
//! - **Serialized commits**: a fair FIFO commit lock orders every history
//!   mutation
//! - **Reconciled status**: engine status merged with an independent
//!   artifact-folder enumeration, with a post-commit grace window
//! - **Baselines**: annotated tags with lightweight-tag fallback
//! - **Divergence and counters**: ahead/behind/diverged classification and
//!   max-wins ID-counter reconciliation
//!
//! ## Architecture
//!
//! Leaf-to-root: [`paths`] and [`store`] at the bottom, [`vfs`] adapting
//! storage to the engine's expectations, [`engine`] wrapping the embedded
//! engine behind a trait, [`vcs`] implementing the core operations, the
//! [`history`], [`baseline`], [`remote`], and [`sync`] services above it,
//! and [`facade`] wiring everything together.

/// Baseline (annotated tag) creation and enumeration with resolved
/// commit, message, and timestamp details.
pub mod baseline;

/// Disk-mirrored, append-only cache of per-commit changed-file lists,
/// shared by the whole subsystem.
pub mod cache;

/// Platform-agnostic configuration directory management (token store and
/// log file locations).
pub mod config;

/// Embedded version-control engine contract and its libgit2-backed
/// implementation.
pub mod engine;

/// Typed failure taxonomy: not-initialized, authentication-required,
/// not-found, detached-head.
pub mod error;

/// Composite facade exposing the full public operation surface with
/// fail-fast initialization checks.
pub mod facade;

/// Commit log traversal, changed-file computation, blob retrieval at a
/// commit, and whole-project snapshot reconstruction.
pub mod history;

/// Logging configuration: console output via `RUST_LOG` plus an
/// append-only log file with rotation.
pub mod logger;

/// Pure path normalization, internal-path classification, transient-file
/// filtering, and the artifact path layout.
pub mod paths;

/// Remote registry, two-location credential storage, and authenticated
/// fetch/push/pull.
pub mod remote;

/// Session state shared by all services: the initialized flag and the
/// once-per-session head-attachment check.
pub mod session;

/// Storage backend trait with native and sandboxed implementations.
pub mod store;

/// Ahead/behind/diverged classification and ID-counter reconciliation.
pub mod sync;

/// Version-control core: init/repair, artifact persistence, serialized
/// commits, working-tree status, revert.
pub mod vcs;

/// Virtual filesystem adapter presenting a POSIX-like surface over a
/// storage backend.
pub mod vfs;

pub use facade::ArtifactVcs;
