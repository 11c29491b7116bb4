//! Service kit for the VPN account warden.
//!
//! Wraps the account ledger of [`warden_user`] in everything a running service needs: a
//! command dispatcher for a chat transport, an audit log of every management action, a
//! daily expiration sweep and a builder reading its configuration from the environment.
//!
//! # Example
//! ```rust
//! use warden_sdk::prelude::*;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let warden = WardenConfig::from_env()?.builder().build().await?;
//! let _sweeper = warden.spawn_scheduler();
//!
//! let response = warden.dispatch(1000, "/add alice").await;
//! println!("{}", response.text());
//! # Ok(())
//! # }
//! ```
//!
//! # Commands
//! - `/start`, `/help`: anyone
//! - `/add`, `/delete`, `/renew`, `/list`: managers and the super-admin
//! - `/grant`, `/revoke`, `/backup`, `/repair`: the super-admin
//!
//! The transport itself (chat API, polling, webhooks) is left to the embedding program.
//! The bundled `warden` binary reads `<actor_id> /command [arg]` lines from stdin.
#![forbid(unsafe_code)]
#![deny(
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_features
)]

/// Convenience import for building services
pub mod prelude {
    pub use crate::audit::{AuditAction, AuditEntry, AuditLog};
    pub use crate::builder::{Warden, WardenBuilder};
    pub use crate::config::WardenConfig;
    pub use crate::dispatch::{Command, Dispatcher, ParseError};
    pub use crate::responses::Response;
    pub use crate::scheduler::SweepScheduler;
    pub use warden_user::prelude::*;
}

/// The append-only log of management actions
pub mod audit;
/// Assembles a [`Warden`](crate::builder::Warden)
pub mod builder;
/// Environment configuration
pub mod config;
/// Command parsing and routing
pub mod dispatch;
/// Reply helpers
pub mod responses;
/// The daily expiration sweep
pub mod scheduler;
