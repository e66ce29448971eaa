//! # Travel Audit - Activity Audit for the Travel Admin Back Office
//!
//! Records who did what to destinations, hotels and users, plus login and
//! logout events, built on Clean Architecture principles.
//!
//! ## Architecture Layers
//!
//! - **Domain**: Audit records, actions, actor context, snapshots and tracked kinds
//! - **Application**: Capture services, query service, token ledger and ports
//! - **Infrastructure**: Postgres and in-memory activity logs, session storage
//! - **API**: Admin HTTP handlers and middleware
//!
//! ## Key Features
//!
//! - Entity change capture with before/after snapshots
//! - Login, failed login and deduplicated logout records
//! - Activity browsing, search, statistics and scheduled retention
//! - Session-scoped anti-forgery tokens with lazy expiry
//!
//! ## Example Usage
//!
//! ```no_run
//! use travel_audit::{ApplicationBuilder, Config};
//! use travel_audit::domain::tracking::EntityRef;
//! use travel_audit::entities::Hotel;
//! use travel_audit::value_objects::ActorContext;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let state = ApplicationBuilder::new(Config::default())
//!     .with_in_memory_log()
//!     .build()?;
//!
//! let hotel = Hotel::new("Seaside", "Nice").with_id(4);
//! let scope = state.entity_changes.begin();
//! let outcome = scope
//!     .post_create(&EntityRef::of(&hotel)?, &ActorContext::system())
//!     .await;
//! assert!(outcome.is_recorded());
//! scope.finish_scope();
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

// Re-export key types explicitly to avoid ambiguity
pub use api::errors as api_errors;
pub use application::builder::ApplicationBuilder;
pub use application::{capture, dto, ports, use_cases};
pub use config::Config;
pub use domain::errors as domain_errors;
pub use domain::{entities, value_objects};
