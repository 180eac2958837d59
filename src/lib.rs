//! The Rust SDK for Flagsmith, an open-source feature flag and remote config service.
//!
//! # Overview
//!
//! The SDK revolves around a [`Client`] that evaluates feature flags of an environment, either
//! anonymously or for an identity (a user, device or any other subject with a unique key).
//! Identities carry [`Trait`]s, key-value attributes used for segmentation, which can be read and
//! written through the client.
//!
//! Every call is a single request to the Flagsmith API. Nothing is cached between calls, so a
//! call always reflects the current server state.
//!
//! ```no_run
//! # async fn run() -> flagsmith::Result<()> {
//! use flagsmith::{ClientConfig, Trait};
//!
//! let client = ClientConfig::from_environment_key("environment-key").to_client()?;
//!
//! let enabled = client
//!     .has_flag("new_checkout", Some("user-42"), &[Trait::new("plan", "premium")])
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! # Analytics
//!
//! Flagsmith can show how often each flag is evaluated. Enable it with
//! [`ClientConfig::enable_analytics`] and an [`AnalyticsStore`]; counts are then uploaded in the
//! background. Alternatively, plug your own [`AnalyticsCollector`].
//!
//! # Error Handling
//!
//! Errors are represented by the [`Error`] enum. A missing or disabled flag is not an error, the
//! lookup returns `Ok(None)` instead.
//!
//! In production, it is recommended to fall back to default values on errors, as feature flag
//! evaluation should not be critical enough to cause system crashes.
//!
//! # Logging
//!
//! The package uses the [`log`](https://docs.rs/log/latest/log/) crate for logging
//! messages. Consider integrating a `log`-compatible logger implementation for better visibility
//! into SDK operations.

#![warn(rustdoc::missing_crate_level_docs)]
#![warn(missing_docs)]

mod analytics;
mod client;
mod config;
mod dispatcher;
mod error;
mod models;
pub mod request;

pub use analytics::{AnalyticsCollector, AnalyticsStore, FlagAnalytics, MemoryAnalyticsStore};
pub use client::Client;
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use models::{
    Feature, Flag, Identity, IdentityFlagsAndTraits, Trait, TraitWithIdentity, Value,
};
