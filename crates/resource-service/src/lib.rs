//! # Resource Service
//!
//! HTTP service exposing the record kinds in [`model`] through the generic
//! resource framework.
//!
//! - **[model]**: the record kinds and their schemas.
//! - **[lifecycle]**: starts and stops one store per kind and wires their relations.
//! - **[api]**: axum routes, caller resolution and error mapping.
//! - **[config]**: command line and environment settings.

pub mod api;
pub mod config;
pub mod lifecycle;
pub mod model;
