//! Manager allowlist.
//!
//! Identities other than the super-admin that may use the management commands. The
//! super-admin is never stored here.

use crate::account_manager::AccountManager;
use crate::misc::AccountError;
use warden_types::prelude::ActorId;

impl AccountManager {
    /// Adds `identity` to the allowlist
    pub async fn grant(&self, identity: ActorId) -> Result<(), AccountError> {
        if self.settings().is_super_admin(identity) {
            return Err(AccountError::AlreadyPrivileged(identity));
        }

        let pers = self.get_persistence_handler();
        let _guard = pers.lock().await;
        let mut managers = pers.load_allowlist().await;
        if managers.contains(&identity) {
            return Err(AccountError::AlreadyGranted(identity));
        }

        managers.push(identity);
        pers.save_allowlist(&managers).await?;
        log::info!(target: "warden", "Identity {} is now a manager", identity);
        Ok(())
    }

    /// Removes `identity` from the allowlist
    pub async fn revoke(&self, identity: ActorId) -> Result<(), AccountError> {
        let pers = self.get_persistence_handler();
        let _guard = pers.lock().await;
        let mut managers = pers.load_allowlist().await;
        if !managers.contains(&identity) {
            return Err(AccountError::NotGranted(identity));
        }

        managers.retain(|manager| *manager != identity);
        pers.save_allowlist(&managers).await?;
        log::info!(target: "warden", "Identity {} is no longer a manager", identity);
        Ok(())
    }

    /// Whether `identity` is on the allowlist. The super-admin is not, unless someone
    /// edited the file by hand
    pub async fn is_manager(&self, identity: ActorId) -> bool {
        self.managers().await.contains(&identity)
    }

    /// The allowlist, in grant order
    pub async fn managers(&self) -> Vec<ActorId> {
        let pers = self.get_persistence_handler();
        let _guard = pers.lock().await;
        pers.load_allowlist().await
    }
}
