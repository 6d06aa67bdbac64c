//! # stockwatch
//!
//! Watches a storefront catalog and notifies only when products become
//! available, not on every poll.
//!
//! ## Architecture
//!
//! One check is a single batch:
//!
//! ```text
//! CatalogSource → FetchOrchestrator → Normalizer → AvailabilityStateStore → Notifier
//! ```
//!
//! - [`source`]: catalog listing and per-product detail, over HTTP or headless Chrome
//! - [`fetcher`]: bounded-parallel detail fetching over pooled sessions
//! - [`normalizer`]: raw responses to typed items with safe defaults
//! - [`state`]: durable per-store availability snapshot and diffing
//! - [`notifier`]: Telegram delivery
//!
//! ## Quick Start
//!
//! ```bash
//! # Check once and notify about newly available products
//! PINCODE=110001 stockwatch
//!
//! # Print the full status report without sending it
//! stockwatch check --force --dry-run
//!
//! # Container health check
//! stockwatch health --max-age 900
//! ```
//!
//! ## Modules
//!
//! - [`app`]: Application context and error types
//! - [`checker`]: The end-to-end availability check
//! - [`cli`]: Command-line interface definitions
//! - [`config`]: TOML configuration with environment overrides
//! - [`domain`]: Items, raw response views and store selection
//! - [`health`]: Heartbeat and liveness checks
//! - [`store`]: Snapshot persistence

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together the configured
/// sources, snapshot store, normalizer and notifier.
pub mod app;

/// One availability check from catalog fetch to notification.
///
/// - [`AvailabilityChecker`](checker::AvailabilityChecker): runs the phases
/// - [`RunReport`](checker::RunReport): what a completed run saw and sent
pub mod checker;

/// Command-line interface using clap.
///
/// - `check [--force] [--dry-run] [--source chrome|http]` (default)
/// - `health [--max-age SECS]`
pub mod cli;

/// Configuration loaded from `~/.config/stockwatch/config.toml`.
pub mod config;

/// Core domain models.
///
/// - [`Item`](domain::Item): a catalog product with its enrichment
/// - [`RawCatalogEntry`](domain::RawCatalogEntry) and
///   [`RawDetail`](domain::RawDetail): typed views over source JSON
/// - [`StoreContext`](domain::StoreContext): the selected store
pub mod domain;

/// Parallel detail fetching.
///
/// - [`SessionPool`](fetcher::SessionPool): lazily grown pool of reusable sessions
/// - [`FetchOrchestrator`](fetcher::FetchOrchestrator): semaphore-bounded fan-out
pub mod fetcher;

pub mod health;

/// Builds typed items from a raw listing and its detail map.
pub mod normalizer;

/// Notification delivery and message formatting.
pub mod notifier;

/// Catalog sources.
pub mod source;

/// Cross-run availability state on top of a [`SnapshotStore`](store::SnapshotStore).
pub mod state;

/// SQLite persistence layer.
///
/// - [`SnapshotStore`](store::SnapshotStore): Trait defining snapshot operations
/// - [`SqliteSnapshotStore`](store::SqliteSnapshotStore): SQLite implementation
pub mod store;
