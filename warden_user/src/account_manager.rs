//! # Account Manager
//!
//! The Account Manager owns the account lifecycle: who may create, delete, renew or view
//! an account, and how the daemon configuration and the tracking ledger are kept in step.
//!
//! ## Features
//!
//! * **Ledger Operations**
//!   - `add`, `delete`, `renew`, `list` and `get`
//!   - Ownership enforcement with a super-admin override
//!   - Expirations always recomputed from the current time
//!
//! * **Consistency**
//!   - A reconciliation of both documents inside every mutating operation
//!   - Orphaned records overwritten on re-creation, pruned by `repair`
//!   - Failures after a partial save flagged as inconsistent
//!
//! * **Storage Backend Support**
//!   - In-memory storage
//!   - File system persistence
//!
//! ## Usage Example
//!
//! ```rust
//! use std::sync::Arc;
//! use warden_user::prelude::*;
//!
//! async fn example() -> Result<(), AccountError> {
//!     let manager = AccountManager::new(
//!         BackendType::InMemory,
//!         LedgerSettings::new(1000),
//!         Arc::new(NoopReload),
//!         Arc::new(SystemClock),
//!     )
//!     .await?;
//!
//!     manager.grant(1001).await?;
//!     let receipt = manager.add("alice".into(), 1001).await?;
//!     println!("{receipt}");
//!
//!     for record in manager.list(1001).await {
//!         println!("{} expires {}", record.identifier, record.expiration_display());
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Important Notes
//!
//! * Every load-mutate-save sequence holds the document guard of the `PersistenceHandler`,
//!   which is shared with the sweeper, the allowlist and backups
//! * The config is saved before the tracking ledger
//! * The daemon is reloaded after the guard is released, and only when the active list
//!   changed
//!
//! ## Related Components
//!
//! * `PersistenceHandler` - Backend storage interface
//! * `Reconciliation` - Standing of an identifier across both documents
//! * `ReloadTrigger` - Restarts the daemon
//! * `LedgerSettings` - Super-admin identity and validity window

use crate::account::AccountRecord;
use crate::backend::memory::MemoryBackend;
use crate::backend::{BackendConnection, BackendType, Document, PersistenceHandler};
use crate::clock::Clock;
use crate::ledger_settings::LedgerSettings;
use crate::misc::{format_timestamp, AccountError};
use crate::primary_config::PrimaryConfig;
use crate::reconcile::{join, Reconciliation, Standing};
use crate::reload::{reload_logged, ReloadStatus, ReloadTrigger};
use std::sync::Arc;
use warden_types::prelude::{AccountId, ActorId, CommandScope, Role};

/// The default manager for the accounts of one daemon configuration
#[derive(Clone)]
pub struct AccountManager {
    persistence_handler: PersistenceHandler,
    settings: Arc<LedgerSettings>,
    reload: Arc<dyn ReloadTrigger>,
    clock: Arc<dyn Clock>,
    backend_ty: BackendType,
}

/// What a successful ledger operation did
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LedgerAction {
    Added,
    Deleted,
    Renewed,
}

/// Returned by every successful ledger operation
#[derive(Clone, Debug)]
pub struct LedgerReceipt {
    pub action: LedgerAction,
    pub identifier: AccountId,
    /// The tracking record after the operation. `None` after a deletion
    pub record: Option<AccountRecord>,
    pub reload: ReloadStatus,
}

impl std::fmt::Display for LedgerReceipt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let expiration = self
            .record
            .as_ref()
            .map(AccountRecord::expiration_display)
            .unwrap_or("never");

        match self.action {
            LedgerAction::Added => write!(
                f,
                "Account '{}' added. Expires on {expiration}.",
                self.identifier
            )?,
            LedgerAction::Deleted => write!(f, "Account '{}' deleted.", self.identifier)?,
            LedgerAction::Renewed => write!(
                f,
                "Account '{}' renewed until {expiration}.",
                self.identifier
            )?,
        }

        if let ReloadStatus::Failed(reason) = &self.reload {
            write!(
                f,
                " Warning: the daemon could not be restarted ({reason}); the change applies on its next restart."
            )?;
        }

        Ok(())
    }
}

/// Returned by [`AccountManager::repair`]
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RepairReport {
    /// Orphaned tracking records that were removed
    pub pruned: Vec<AccountId>,
    /// Active accounts without an owner. Never removed automatically
    pub untracked: Vec<AccountId>,
}

impl std::fmt::Display for RepairReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.pruned.is_empty() {
            write!(f, "No orphaned tracking records.")?;
        } else {
            write!(f, "Removed orphaned tracking records: {}.", join(&self.pruned))?;
        }

        if !self.untracked.is_empty() {
            write!(
                f,
                " Active accounts without an owner: {}.",
                join(&self.untracked)
            )?;
        }

        Ok(())
    }
}

impl AccountManager {
    /// `backend_type`: where the documents live
    /// `settings`: the super-admin identity and ledger rules, fixed for the life of the manager
    /// `reload`: restarts the daemon after the active list changes
    /// `clock`: the source of "now" for every expiration
    pub async fn new(
        backend_type: BackendType,
        settings: LedgerSettings,
        reload: Arc<dyn ReloadTrigger>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AccountError> {
        let seed = settings.seed_accounts.clone();
        let persistence_handler = match &backend_type {
            BackendType::InMemory => {
                let backend = MemoryBackend::default();
                PersistenceHandler::create(backend, seed).await?
            }

            #[cfg(feature = "filesystem")]
            BackendType::Filesystem(store) => {
                use crate::backend::filesystem_backend::FilesystemBackend;
                let backend = FilesystemBackend::from(store.clone());
                PersistenceHandler::create(backend, seed).await?
            }
        };

        Self::from_handler(persistence_handler, backend_type, settings, reload, clock).await
    }

    /// Like [`Self::new`], but with a backend constructed by the caller
    pub async fn with_backend<T: BackendConnection + 'static>(
        backend: T,
        settings: LedgerSettings,
        reload: Arc<dyn ReloadTrigger>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AccountError> {
        let persistence_handler =
            PersistenceHandler::create(backend, settings.seed_accounts.clone()).await?;
        Self::from_handler(
            persistence_handler,
            BackendType::InMemory,
            settings,
            reload,
            clock,
        )
        .await
    }

    async fn from_handler(
        persistence_handler: PersistenceHandler,
        backend_ty: BackendType,
        settings: LedgerSettings,
        reload: Arc<dyn ReloadTrigger>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, AccountError> {
        if !persistence_handler.is_connected().await? {
            return Err(AccountError::msg(
                "Unable to connect to the document backend via account manager",
            ));
        }

        log::info!(target: "warden", "Successfully established connection to backend {:?}...", backend_ty);

        Ok(Self {
            persistence_handler,
            settings: Arc::new(settings),
            reload,
            clock,
            backend_ty,
        })
    }

    /// Creates every missing document with its default content. Existing documents are
    /// never overwritten
    pub async fn init_storage(&self) -> Result<Vec<Document>, AccountError> {
        self.persistence_handler.initialize().await
    }

    /// Returns the persistence handler
    pub fn get_persistence_handler(&self) -> &PersistenceHandler {
        &self.persistence_handler
    }

    pub fn settings(&self) -> &LedgerSettings {
        &self.settings
    }

    pub fn backend_type(&self) -> &BackendType {
        &self.backend_ty
    }

    /// The source of "now" for every expiration
    pub fn clock(&self) -> &dyn Clock {
        &*self.clock
    }

    pub(crate) fn reload_trigger(&self) -> &dyn ReloadTrigger {
        &*self.reload
    }

    /// The role of `actor`, if any
    pub async fn role_of(&self, actor: ActorId) -> Option<Role> {
        if self.settings.is_super_admin(actor) {
            Some(Role::SuperAdmin)
        } else if self.is_manager(actor).await {
            Some(Role::Manager)
        } else {
            None
        }
    }

    /// The coarse gate in front of every command. Returns the role of `actor` if it may
    /// invoke a command of `scope`. For [`CommandScope::Open`] the role may be `None`
    pub async fn authorize(
        &self,
        actor: ActorId,
        scope: CommandScope,
    ) -> Result<Option<Role>, AccountError> {
        let role = self.role_of(actor).await;
        match (scope, role) {
            (CommandScope::Open, role) => Ok(role),
            (CommandScope::Management, Some(role)) => Ok(Some(role)),
            (CommandScope::SuperAdmin, Some(Role::SuperAdmin)) => Ok(Some(Role::SuperAdmin)),
            _ => {
                log::warn!(target: "warden", "Identity {} denied a {:?} command", actor, scope);
                Err(AccountError::Unauthorized(actor))
            }
        }
    }

    /// Activates `identifier` in the daemon configuration and records `actor` as its owner,
    /// valid for the configured number of days from now
    pub async fn add(
        &self,
        identifier: AccountId,
        actor: ActorId,
    ) -> Result<LedgerReceipt, AccountError> {
        validate(&identifier)?;
        let _ = self.authorize(actor, CommandScope::Management).await?;
        let pers = &self.persistence_handler;

        let record = {
            let _guard = pers.lock().await;
            let mut config = pers.load_config().await;
            let mut tracking = pers.load_tracking().await;
            let reconciliation = Reconciliation::compute(&config, &tracking);

            match reconciliation.standing(&identifier, config.contains(&identifier)) {
                Standing::Tracked | Standing::Untracked => {
                    return Err(AccountError::AlreadyExists(identifier))
                }
                Standing::Orphaned => {
                    log::warn!(target: "warden", "Overwriting the orphaned tracking record of {}", identifier);
                    tracking.retain(|r| r.identifier != identifier);
                }
                Standing::Absent => {}
            }

            let now = self.clock.now();
            let expires = self.settings.expiration_from(&now)?;
            let record = AccountRecord::new(identifier.clone(), actor, &now, &expires);

            let _ = config.activate(identifier.clone());
            tracking.push(record.clone());
            self.save_both(&config, &tracking).await?;
            record
        };

        log::info!(target: "warden", "Identity {} added {} (expires {})", actor, identifier, record.expiration_display());
        let reload = reload_logged(&*self.reload, &format!("adding {identifier}")).await;

        Ok(LedgerReceipt {
            action: LedgerAction::Added,
            identifier,
            record: Some(record),
            reload,
        })
    }

    /// Removes `identifier` from both documents. Only its creator or the super-admin may
    /// do so, and the protected identifier is never removed
    pub async fn delete(
        &self,
        identifier: AccountId,
        actor: ActorId,
    ) -> Result<LedgerReceipt, AccountError> {
        validate(&identifier)?;
        if self.settings.is_protected(&identifier) {
            return Err(AccountError::Protected(identifier));
        }

        let _ = self.authorize(actor, CommandScope::Management).await?;

        let pers = &self.persistence_handler;
        let config_changed = {
            let _guard = pers.lock().await;
            let mut config = pers.load_config().await;
            let mut tracking = pers.load_tracking().await;
            let reconciliation = Reconciliation::compute(&config, &tracking);

            match reconciliation.standing(&identifier, config.contains(&identifier)) {
                Standing::Absent => return Err(AccountError::NotFound(identifier)),

                Standing::Untracked => {
                    if !self.settings.is_super_admin(actor) {
                        return Err(AccountError::PermissionDenied {
                            target: identifier,
                            creator: None,
                        });
                    }

                    log::warn!(target: "warden", "Super-admin removing untracked account {} from the config only", identifier);
                    let _ = config.deactivate(&identifier);
                    pers.save_config(&config).await?;
                    true
                }

                Standing::Tracked | Standing::Orphaned => {
                    self.check_owner(&identifier, &tracking, actor)?;
                    let config_changed = config.deactivate(&identifier);
                    tracking.retain(|r| r.identifier != identifier);

                    if config_changed {
                        self.save_both(&config, &tracking).await?;
                    } else {
                        pers.save_tracking(&tracking).await?;
                    }

                    config_changed
                }
            }
        };

        log::info!(target: "warden", "Identity {} deleted {}", actor, identifier);
        let reload = if config_changed {
            reload_logged(&*self.reload, &format!("deleting {identifier}")).await
        } else {
            ReloadStatus::NotRequired
        };

        Ok(LedgerReceipt {
            action: LedgerAction::Deleted,
            identifier,
            record: None,
            reload,
        })
    }

    /// Pushes the expiration of `identifier` to the configured number of days from now.
    /// Unused time is not carried over. Only the tracking ledger is written
    pub async fn renew(
        &self,
        identifier: AccountId,
        actor: ActorId,
    ) -> Result<LedgerReceipt, AccountError> {
        validate(&identifier)?;
        let _ = self.authorize(actor, CommandScope::Management).await?;
        let pers = &self.persistence_handler;

        let record = {
            let _guard = pers.lock().await;
            let config = pers.load_config().await;
            let mut tracking = pers.load_tracking().await;
            let reconciliation = Reconciliation::compute(&config, &tracking);

            let idx = tracking
                .iter()
                .position(|r| r.identifier == identifier)
                .ok_or_else(|| AccountError::NotFound(identifier.clone()))?;

            self.check_owner(&identifier, &tracking, actor)?;

            if reconciliation.standing(&identifier, config.contains(&identifier))
                == Standing::Orphaned
            {
                log::warn!(target: "warden", "Renewing {} although it is not active in the daemon configuration", identifier);
            }

            let expires = self.settings.expiration_from(&self.clock.now())?;
            tracking[idx].expiration_date = Some(format_timestamp(&expires));
            let record = tracking[idx].clone();
            pers.save_tracking(&tracking).await?;
            record
        };

        log::info!(target: "warden", "Identity {} renewed {} until {}", actor, identifier, record.expiration_display());

        Ok(LedgerReceipt {
            action: LedgerAction::Renewed,
            identifier,
            record: Some(record),
            reload: ReloadStatus::NotRequired,
        })
    }

    /// Every tracking record visible to `actor`, sorted by identifier ignoring case. The
    /// super-admin sees everything, a manager only what they created, anyone else nothing
    pub async fn list(&self, actor: ActorId) -> Vec<AccountRecord> {
        if self.role_of(actor).await.is_none() {
            log::warn!(target: "warden", "Identity {} denied a listing", actor);
            return Vec::new();
        }

        let mut records = {
            let _guard = self.persistence_handler.lock().await;
            self.persistence_handler.load_tracking().await
        };

        if !self.settings.is_super_admin(actor) {
            records.retain(|r| r.is_owned_by(actor));
        }

        records.sort_by_cached_key(|r| r.identifier.sort_key());
        records
    }

    /// The tracking record of `identifier`, if any
    pub async fn get(&self, identifier: &AccountId) -> Option<AccountRecord> {
        let _guard = self.persistence_handler.lock().await;
        self.persistence_handler
            .load_tracking()
            .await
            .into_iter()
            .find(|r| &r.identifier == identifier)
    }

    /// Prunes orphaned tracking records and reports untracked active accounts. Only the
    /// super-admin may repair
    pub async fn repair(&self, actor: ActorId) -> Result<RepairReport, AccountError> {
        if !self.settings.is_super_admin(actor) {
            return Err(AccountError::Unauthorized(actor));
        }

        let pers = &self.persistence_handler;
        let _guard = pers.lock().await;
        let config = pers.load_config().await;
        let mut tracking = pers.load_tracking().await;
        let reconciliation = Reconciliation::compute(&config, &tracking);

        if !reconciliation.orphaned.is_empty() {
            tracking.retain(|r| !reconciliation.orphaned.contains(&r.identifier));
            pers.save_tracking(&tracking).await?;
            log::info!(target: "warden", "Pruned orphaned tracking records: {}", join(&reconciliation.orphaned));
        }

        Ok(RepairReport {
            pruned: reconciliation.orphaned,
            untracked: reconciliation.untracked,
        })
    }

    /// Saves the config, then the tracking ledger. A tracking failure after the config was
    /// written is flagged as inconsistent
    pub(crate) async fn save_both(
        &self,
        config: &PrimaryConfig,
        tracking: &[AccountRecord],
    ) -> Result<(), AccountError> {
        self.persistence_handler.save_config(config).await?;
        self.persistence_handler
            .save_tracking(tracking)
            .await
            .map_err(|err| {
                let err = err.into_inconsistent();
                log::error!(target: "warden", "CRITICAL: {}", err);
                err
            })
    }

    fn check_owner(
        &self,
        identifier: &AccountId,
        tracking: &[AccountRecord],
        actor: ActorId,
    ) -> Result<(), AccountError> {
        let creator = tracking
            .iter()
            .find(|r| &r.identifier == identifier)
            .map(|r| r.creator_id);

        match creator {
            Some(creator) if creator == actor || self.settings.is_super_admin(actor) => Ok(()),
            Some(creator) => {
                log::warn!(target: "warden", "Identity {} is not allowed to manage {} (created by {})", actor, identifier, creator);
                Err(AccountError::PermissionDenied {
                    target: identifier.clone(),
                    creator: Some(creator),
                })
            }
            None => Err(AccountError::NotFound(identifier.clone())),
        }
    }
}

fn validate(identifier: &AccountId) -> Result<(), AccountError> {
    if identifier.as_text().trim().is_empty() {
        return Err(AccountError::InvalidIdentifier(
            "An account identifier cannot be empty.".into(),
        ));
    }

    Ok(())
}
