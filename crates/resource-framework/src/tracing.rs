//! # Tracing Setup
//!
//! Structured logging for stores, handlers and the HTTP layer. Every store
//! event carries an `entity_type` field (`products`, `choices`, …) instead of
//! a module path, so one filter line follows a record kind through the whole
//! system:
//!
//! ```text
//! INFO Store started entity_type="questions"
//! INFO Created entity_type="questions" id=1 size=1
//! DEBUG Stage stage=Authorized entity_type="choices" operation=Create
//! WARN Create failed entity_type="choices" error=validation failed on 1 field(s)
//! ```
//!
//! # Environment Variables
//!
//! `RUST_LOG` takes precedence over the level passed to [`setup_tracing`]:
//! - `RUST_LOG=debug` - stage transitions, payloads and query parameters
//! - `RUST_LOG=resource_framework=debug,tower_http=info` - per-crate levels

use tracing_subscriber::EnvFilter;

/// Installs the global subscriber.
///
/// `default_level` is used when `RUST_LOG` is unset or unparsable. Calling
/// this twice (e.g. from several tests) keeps the first subscriber.
pub fn setup_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false) // entity_type identifies the source
        .compact()
        .try_init();
}
