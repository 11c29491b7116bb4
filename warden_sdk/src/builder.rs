//! Warden Builder
//!
//! Assembles a running [`Warden`] from a [`WardenConfig`]: the account manager with its
//! backend, reload trigger and clock, the audit log, the dispatcher and the sweep
//! scheduler.
//!
//! # Example
//! ```rust
//! use warden_sdk::prelude::*;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let warden = WardenConfig::new(1000)
//!     .builder()
//!     .with_backend(BackendType::InMemory)
//!     .with_reload(NoopReload)
//!     .build()
//!     .await?;
//!
//! let response = warden.dispatch(1000, "/list").await;
//! assert!(response.ok);
//! # Ok(())
//! # }
//! ```
//!
//! # Important Notes
//! - The backend defaults to the filesystem layout of the configuration
//! - Without an explicit trigger, the configured systemd unit is restarted; a missing unit
//!   disables reloads
//! - Missing documents are created during [`WardenBuilder::build`]

use crate::audit::AuditLog;
use crate::config::WardenConfig;
use crate::dispatch::Dispatcher;
use crate::responses::Response;
use crate::scheduler::SweepScheduler;
use std::sync::Arc;
use warden_io::tokio::task::JoinHandle;
use warden_user::prelude::*;

/// Used to construct a [`Warden`]
#[derive(Default)]
pub struct WardenBuilder {
    config: Option<WardenConfig>,
    backend_type: Option<BackendType>,
    reload: Option<Arc<dyn ReloadTrigger>>,
    clock: Option<Arc<dyn Clock>>,
    audit_enabled: Option<bool>,
}

impl WardenConfig {
    /// Starts a [`WardenBuilder`] with this configuration
    pub fn builder(self) -> WardenBuilder {
        let mut builder = WardenBuilder::default();
        let _ = builder.with_config(self);
        builder
    }
}

impl WardenBuilder {
    pub fn with_config(&mut self, config: WardenConfig) -> &mut Self {
        self.config = Some(config);
        self
    }

    /// Overrides the backend derived from the configuration
    pub fn with_backend(&mut self, backend_type: BackendType) -> &mut Self {
        self.backend_type = Some(backend_type);
        self
    }

    /// Overrides the systemd reload derived from the configuration
    pub fn with_reload<T: ReloadTrigger + 'static>(&mut self, reload: T) -> &mut Self {
        let reload: Arc<dyn ReloadTrigger> = Arc::new(reload);
        self.reload = Some(reload);
        self
    }

    pub fn with_clock<T: Clock + 'static>(&mut self, clock: Arc<T>) -> &mut Self {
        let clock: Arc<dyn Clock> = clock;
        self.clock = Some(clock);
        self
    }

    /// Enables or disables the audit log. Enabled by default
    pub fn with_audit(&mut self, enabled: bool) -> &mut Self {
        self.audit_enabled = Some(enabled);
        self
    }

    fn check(&self) -> anyhow::Result<()> {
        match self.config.as_ref() {
            Some(config) => config.check(),
            None => Err(anyhow::Error::msg(
                "A configuration must be set before building the warden",
            )),
        }
    }

    /// Creates the account manager and initializes the documents
    pub async fn build(&mut self) -> anyhow::Result<Warden> {
        self.check()?;
        let config = self
            .config
            .take()
            .ok_or_else(|| anyhow::Error::msg("Missing configuration"))?;

        let backend_type = self
            .backend_type
            .take()
            .unwrap_or_else(|| BackendType::Filesystem(config.store.clone()));

        let reload: Arc<dyn ReloadTrigger> = match self.reload.take() {
            Some(reload) => reload,
            None => match config.reload_unit.as_deref() {
                Some(unit) => Arc::new(
                    ReloadCommand::systemd(unit).with_timeout(config.reload_timeout),
                ),
                None => {
                    log::warn!(target: "warden", "No reload unit configured. The daemon will not be restarted after changes");
                    Arc::new(NoopReload)
                }
            },
        };

        let clock = match self.clock.take() {
            Some(clock) => clock,
            None => Arc::new(SystemClock) as Arc<dyn Clock>,
        };

        log::trace!(target: "warden", "[WardenBuilder] Creating account manager ...");
        let manager =
            AccountManager::new(backend_type, config.ledger_settings(), reload, clock.clone())
                .await
                .map_err(|err| anyhow::Error::msg(err.into_string()))?;

        let created = manager
            .init_storage()
            .await
            .map_err(|err| anyhow::Error::msg(err.into_string()))?;

        for document in created {
            log::info!(target: "warden", "Initialized missing document {}", document);
        }

        let audit = if self.audit_enabled.take().unwrap_or(true) {
            AuditLog::new(config.audit_log.clone(), clock)
        } else {
            AuditLog::disabled(clock)
        };

        Ok(Warden {
            dispatcher: Dispatcher::new(manager, audit),
            sweep_hour: config.sweep_hour,
        })
    }
}

/// A ready-to-serve warden
#[derive(Clone)]
pub struct Warden {
    dispatcher: Dispatcher,
    sweep_hour: u32,
}

impl Warden {
    /// Handles one line of input from `actor`
    pub async fn dispatch(&self, actor: ActorId, line: &str) -> Response {
        self.dispatcher.dispatch(actor, line).await
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn account_manager(&self) -> &AccountManager {
        self.dispatcher.account_manager()
    }

    /// The scheduler for the daily expiration sweep
    pub fn scheduler(&self) -> SweepScheduler {
        SweepScheduler::new(
            self.dispatcher.account_manager().clone(),
            self.dispatcher.audit_log().clone(),
            self.sweep_hour,
        )
    }

    /// Runs the daily expiration sweep in the background
    pub fn spawn_scheduler(&self) -> JoinHandle<()> {
        self.scheduler().spawn()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rstest::rstest;
    use warden_io::tokio;

    fn clock() -> Arc<ManualClock> {
        Arc::new(ManualClock::new(
            NaiveDate::from_ymd_opt(2024, 5, 1)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
        ))
    }

    #[tokio::test]
    async fn build_requires_config() {
        assert!(WardenBuilder::default().build().await.is_err());
    }

    #[rstest]
    #[case(24, 30)]
    #[case(3, 0)]
    #[case(3, 1_000_000_000)]
    #[tokio::test]
    async fn build_rejects_invalid_config(#[case] hour: u32, #[case] days: i64) {
        let mut config = WardenConfig::new(1000);
        config.sweep_hour = hour;
        config.validity_days = days;
        let result = config
            .builder()
            .with_backend(BackendType::InMemory)
            .build()
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn build_initializes_filesystem_documents() {
        let tmp = tempfile::tempdir().unwrap();
        let config = WardenConfig::with_home(1000, tmp.path());
        let store = config.store.clone();

        let warden = config
            .builder()
            .with_reload(NoopReload)
            .with_clock(clock())
            .build()
            .await
            .unwrap();

        assert!(store.config_file.exists());
        assert!(store.tracking_file.exists());
        assert!(store.allowlist_file.exists());
        assert!(warden.dispatch(1000, "/list").await.ok);
    }
}
