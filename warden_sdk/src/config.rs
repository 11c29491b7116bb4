//! Process configuration
//!
//! Everything the service needs at start, read from the environment:
//!
//! | variable | default |
//! |----------|---------|
//! | `WARDEN_ADMIN_ID` | required |
//! | `WARDEN_HOME` | `/etc/zivpn` |
//! | `WARDEN_CONFIG_FILE` | `$WARDEN_HOME/config.json` |
//! | `WARDEN_TRACKING_FILE` | `$WARDEN_HOME/manager_tracking.json` |
//! | `WARDEN_ALLOWLIST_FILE` | `$WARDEN_HOME/manager_allowlist.json` |
//! | `WARDEN_BACKUP_DIR` | `$WARDEN_HOME/backups` |
//! | `WARDEN_AUDIT_LOG` | `$WARDEN_HOME/admin_log.json` |
//! | `WARDEN_RELOAD_UNIT` | `zivpn.service` (empty disables reloads) |
//! | `WARDEN_RELOAD_TIMEOUT_SECS` | `30` |
//! | `WARDEN_VALIDITY_DAYS` | `30` (at most 36500) |
//! | `WARDEN_SWEEP_HOUR` | `3` |

use anyhow::Context;
use std::path::PathBuf;
use std::time::Duration;
use warden_user::directory_store::{BasePath, DirectoryStore, DEFAULT_HOME};
use warden_user::ledger_settings::{DEFAULT_VALIDITY_DAYS, MAX_VALIDITY_DAYS};
use warden_user::prelude::{ActorId, LedgerSettings};

pub const DEFAULT_RELOAD_UNIT: &str = "zivpn.service";
pub const DEFAULT_SWEEP_HOUR: u32 = 3;
pub const AUDIT_LOG_FILE_NAME: &str = "admin_log.json";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WardenConfig {
    /// The single super-admin identity
    pub admin_id: ActorId,
    pub store: DirectoryStore,
    pub audit_log: PathBuf,
    /// The systemd unit restarted after the active list changes. `None` disables reloads
    pub reload_unit: Option<String>,
    pub reload_timeout: Duration,
    pub validity_days: i64,
    /// Local hour (0-23) of the daily expiration sweep
    pub sweep_hour: u32,
}

impl WardenConfig {
    /// The defaults, rooted at `/etc/zivpn`
    pub fn new(admin_id: ActorId) -> Self {
        Self::with_home(admin_id, DEFAULT_HOME)
    }

    /// The defaults, rooted at `home`
    pub fn with_home<P: Into<PathBuf>>(admin_id: ActorId, home: P) -> Self {
        let store = DirectoryStore::new(home.into());
        Self {
            admin_id,
            audit_log: store.make_path(BasePath::Home, AUDIT_LOG_FILE_NAME),
            store,
            reload_unit: Some(DEFAULT_RELOAD_UNIT.to_string()),
            reload_timeout: warden_user::reload::DEFAULT_RELOAD_TIMEOUT,
            validity_days: DEFAULT_VALIDITY_DAYS,
            sweep_hour: DEFAULT_SWEEP_HOUR,
        }
    }

    /// Reads every `WARDEN_*` variable from the process environment
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(get_env)
    }

    /// Like [`Self::from_env`], but with a custom variable source
    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> anyhow::Result<Self> {
        let admin_id = lookup("WARDEN_ADMIN_ID")
            .ok_or_else(|| anyhow::Error::msg("Expected the env_var WARDEN_ADMIN_ID set"))?;
        let admin_id = warden_user::prelude::parse_actor_id(&admin_id)
            .with_context(|| format!("WARDEN_ADMIN_ID is not a valid identity: {admin_id}"))?;

        let mut this = match lookup("WARDEN_HOME") {
            Some(home) => Self::with_home(admin_id, home),
            None => Self::new(admin_id),
        };

        if let Some(path) = lookup("WARDEN_CONFIG_FILE") {
            this.store = this.store.with_config_file(path);
        }

        if let Some(path) = lookup("WARDEN_TRACKING_FILE") {
            this.store = this.store.with_tracking_file(path);
        }

        if let Some(path) = lookup("WARDEN_ALLOWLIST_FILE") {
            this.store = this.store.with_allowlist_file(path);
        }

        if let Some(path) = lookup("WARDEN_BACKUP_DIR") {
            this.store = this.store.with_backup_dir(path);
        }

        if let Some(path) = lookup("WARDEN_AUDIT_LOG") {
            this.audit_log = path.into();
        }

        if let Some(unit) = lookup("WARDEN_RELOAD_UNIT") {
            this.reload_unit = Some(unit).filter(|unit| !unit.trim().is_empty());
        }

        if let Some(secs) = lookup("WARDEN_RELOAD_TIMEOUT_SECS") {
            let secs = secs
                .trim()
                .parse::<u64>()
                .with_context(|| format!("WARDEN_RELOAD_TIMEOUT_SECS is not a number: {secs}"))?;
            this.reload_timeout = Duration::from_secs(secs);
        }

        if let Some(days) = lookup("WARDEN_VALIDITY_DAYS") {
            this.validity_days = days
                .trim()
                .parse::<i64>()
                .with_context(|| format!("WARDEN_VALIDITY_DAYS is not a number: {days}"))?;
        }

        if let Some(hour) = lookup("WARDEN_SWEEP_HOUR") {
            this.sweep_hour = hour
                .trim()
                .parse::<u32>()
                .with_context(|| format!("WARDEN_SWEEP_HOUR is not a number: {hour}"))?;
        }

        this.check()?;
        Ok(this)
    }

    pub(crate) fn check(&self) -> anyhow::Result<()> {
        if self.sweep_hour > 23 {
            return Err(anyhow::Error::msg(format!(
                "The sweep hour must be between 0 and 23 (got {})",
                self.sweep_hour
            )));
        }

        if self.validity_days <= 0 || self.validity_days > MAX_VALIDITY_DAYS {
            return Err(anyhow::Error::msg(format!(
                "Accounts must stay valid between 1 and {MAX_VALIDITY_DAYS} days (got {})",
                self.validity_days
            )));
        }

        Ok(())
    }

    /// The ledger settings derived from this configuration
    pub fn ledger_settings(&self) -> LedgerSettings {
        LedgerSettings::new(self.admin_id).with_validity_days(self.validity_days)
    }
}

fn get_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}
