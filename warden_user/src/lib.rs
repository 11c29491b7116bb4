//! # Warden User Management System
//!
//! The account lifecycle and authorization engine of the VPN account warden. It decides
//! who may create, delete, renew or view an account, keeps the daemon configuration and
//! the tracking ledger consistent, retires expired accounts and maintains the manager
//! allowlist.
//!
//! ## Features
//!
//! * **Account Ledger**:
//!   - Ownership: managers handle only the accounts they created
//!   - Super-admin override on every account
//!   - Expiration windows recomputed on every add and renew
//!
//! * **Backend Support**:
//!   - File System Storage: the daemon's own configuration file
//!   - In-Memory Storage: tests and dry runs
//!
//! * **Maintenance**:
//!   - Expiration sweep
//!   - Reconciliation and repair of the two documents
//!   - Timestamped backups
//!
//! ## Architecture
//!
//! ```text
//! AccountManager
//! ├── PersistenceHandler (document guard)
//! │   └── BackendConnection (filesystem | memory)
//! ├── LedgerSettings (super-admin, validity)
//! ├── ReloadTrigger (daemon restart)
//! └── Clock
//! ```
//!
//! ## Important Notes
//!
//! * Loading a document never fails; corrupt documents are replaced by defaults
//! * Saving a document always reports failure
//! * A failed daemon reload never fails an operation
//!
//! ## Feature Flags
//!
//! * `filesystem`: Enable file system storage
//!
#![forbid(unsafe_code)]
#![deny(
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_features
)]
#![allow(rustdoc::broken_intra_doc_links)]

/// Standard imports for this library
pub mod prelude {
    pub use crate::account::AccountRecord;
    pub use crate::account_manager::{AccountManager, LedgerAction, LedgerReceipt, RepairReport};
    pub use crate::backend::{BackendType, Document};
    pub use crate::backup::{BackupEntry, BackupReport};
    pub use crate::clock::{Clock, ManualClock, SystemClock};
    pub use crate::ledger_settings::LedgerSettings;
    pub use crate::misc::AccountError;
    pub use crate::reload::{NoopReload, ReloadCommand, ReloadStatus, ReloadTrigger};
    pub use crate::sweeper::SweepReport;
    pub use warden_types::prelude::*;
}

/// Serde and others
pub mod re_exports {
    #[cfg(feature = "filesystem")]
    pub use crate::directory_store::DirectoryStore;
    pub use chrono;
    pub use serde_json;
}

/// A tracking record: owner and validity of one account
pub mod account;
/// Add, delete, renew, list, get, authorize and repair
pub mod account_manager;
/// Grant, revoke and membership of managers
pub mod allowlist;
/// Where the documents are stored
pub mod backend;
/// Timestamped copies of the documents
pub mod backup;
/// The source of "now"
pub mod clock;
/// Filesystem layout
#[cfg(feature = "filesystem")]
pub mod directory_store;
/// Settings injected into the account manager
pub mod ledger_settings;
/// Errors and timestamps
pub mod misc;
/// The daemon configuration document
pub mod primary_config;
/// Drift between the daemon configuration and the tracking ledger
pub mod reconcile;
/// Restarting the daemon
pub mod reload;
/// JSON encoding and recovery of the documents
pub mod serialization;
/// Retirement of expired accounts
pub mod sweeper;
