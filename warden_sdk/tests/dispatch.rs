#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate};
    use rstest::rstest;
    use std::sync::Arc;
    use tempfile::TempDir;
    use warden_io::tokio;
    use warden_sdk::prelude::*;

    const ADMIN: ActorId = 1000;
    const MANAGER: ActorId = 1001;
    const STRANGER: ActorId = 4242;

    struct Harness {
        warden: Warden,
        clock: Arc<ManualClock>,
        home: TempDir,
    }

    impl Harness {
        async fn audit_actions(&self) -> Vec<String> {
            self.warden
                .dispatcher()
                .audit_log()
                .entries()
                .await
                .into_iter()
                .map(|entry| entry.action)
                .collect()
        }
    }

    async fn harness() -> Harness {
        warden_logging::setup_log_no_panic_hook();
        let home = tempfile::tempdir().unwrap();
        let clock = Arc::new(ManualClock::new(
            NaiveDate::from_ymd_opt(2024, 5, 1)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap(),
        ));

        let warden = WardenConfig::with_home(ADMIN, home.path())
            .builder()
            .with_reload(NoopReload)
            .with_clock(clock.clone())
            .build()
            .await
            .unwrap();

        let granted = warden.dispatch(ADMIN, &format!("/grant {MANAGER}")).await;
        assert!(granted.ok, "{}", granted.text());

        Harness {
            warden,
            clock,
            home,
        }
    }

    #[rstest]
    #[case("/add alice")]
    #[case("/delete alice")]
    #[case("/renew alice")]
    #[case("/list")]
    #[case("/backup")]
    #[tokio::test]
    async fn strangers_are_refused(#[case] line: &str) {
        let h = harness().await;
        let response = h.warden.dispatch(STRANGER, line).await;
        assert!(!response.ok);
        assert!(response.text().contains("not allowed"));
    }

    #[rstest]
    #[case("/grant 5")]
    #[case("/revoke 5")]
    #[case("/backup")]
    #[case("/repair")]
    #[tokio::test]
    async fn managers_cannot_use_admin_commands(#[case] line: &str) {
        let h = harness().await;
        let response = h.warden.dispatch(MANAGER, line).await;
        assert!(!response.ok);
        assert_eq!(
            response.text(),
            format!("Identity {MANAGER} is not allowed to use this command.")
        );
    }

    #[tokio::test]
    async fn help_is_open_to_everyone() {
        let h = harness().await;
        let response = h.warden.dispatch(STRANGER, "/start").await;
        assert!(response.ok);
        assert_eq!(response.messages[0], format!("Hello, {STRANGER}!"));
        assert!(response.messages[1].contains("Ask the admin"));

        let response = h.warden.dispatch(ADMIN, "/help").await;
        assert!(response.text().contains("/grant"));
    }

    #[tokio::test]
    async fn add_list_delete_is_audited() {
        let h = harness().await;

        let added = h.warden.dispatch(MANAGER, "/add alice").await;
        assert!(added.ok);
        assert_eq!(
            added.text(),
            "Account 'alice' added. Expires on 2024-05-31 12:00:00."
        );

        let listed = h.warden.dispatch(MANAGER, "/list").await;
        assert!(listed.text().contains("- alice (expires 2024-05-31 12:00:00)"));

        let listed = h.warden.dispatch(ADMIN, "/list").await;
        assert!(listed.text().contains("created by 1001"));

        let again = h.warden.dispatch(MANAGER, "/add alice").await;
        assert!(!again.ok);

        let deleted = h.warden.dispatch(MANAGER, "/delete alice").await;
        assert!(deleted.ok);
        assert_eq!(deleted.text(), "Account 'alice' deleted.");

        assert_eq!(
            h.audit_actions().await,
            [
                "grant_manager",
                "add_username",
                "add_username_fail",
                "delete_username"
            ]
        );

        let entries = h.warden.dispatcher().audit_log().entries().await;
        assert_eq!(entries[1].admin_id, MANAGER);
        assert_eq!(entries[1].target_username.as_deref(), Some("alice"));
        assert_eq!(entries[1].timestamp, "2024-05-01 12:00:00");
    }

    #[tokio::test]
    async fn managers_cannot_touch_each_others_accounts() {
        let h = harness().await;
        assert!(h.warden.dispatch(ADMIN, "/grant 1002").await.ok);
        assert!(h.warden.dispatch(MANAGER, "/add bob").await.ok);

        let denied = h.warden.dispatch(1002, "/delete bob").await;
        assert!(!denied.ok);
        assert!(denied.text().contains("created by: 1001"));

        let overridden = h.warden.dispatch(ADMIN, "/delete bob").await;
        assert!(overridden.ok);
    }

    #[tokio::test]
    async fn revoked_managers_lose_access() {
        let h = harness().await;
        assert!(h.warden.dispatch(ADMIN, "/revoke 1001").await.ok);
        assert!(!h.warden.dispatch(MANAGER, "/list").await.ok);

        let twice = h.warden.dispatch(ADMIN, "/revoke 1001").await;
        assert_eq!(twice.text(), "Identity 1001 is not a manager.");
        assert_eq!(
            h.audit_actions().await.last().map(String::as_str),
            Some("revoke_manager_fail")
        );
    }

    #[rstest]
    #[case("/add", "Usage: /add <username_or_id>")]
    #[case("/grant someone", "Usage: /grant <numeric_id>")]
    #[case("/list all", "Usage: /list")]
    #[case("/launch", "Unknown command. Use /help to see the available commands.")]
    #[tokio::test]
    async fn malformed_commands_are_answered(#[case] line: &str, #[case] expected: &str) {
        let h = harness().await;
        let response = h.warden.dispatch(MANAGER, line).await;
        assert!(!response.ok);
        assert_eq!(response.text(), expected);
    }

    #[tokio::test]
    async fn backup_attaches_the_configuration_copy() {
        let h = harness().await;
        let response = h.warden.dispatch(ADMIN, "/backup").await;
        assert!(response.ok, "{}", response.text());
        assert_eq!(response.text(), "Backup 20240501_120000 created (3 files).");

        let attachment = response.attachment.unwrap();
        assert!(attachment.starts_with(h.home.path()));
        assert!(attachment.exists());
        assert_eq!(
            attachment.file_name().unwrap().to_str().unwrap(),
            "config.json_20240501_120000.bak"
        );
        assert_eq!(h.audit_actions().await.last().map(String::as_str), Some("backup"));
    }

    #[tokio::test]
    async fn long_listings_are_paginated() {
        let h = harness().await;
        for n in 0..200 {
            let line = format!("/add user_with_a_long_name_{n:03}");
            assert!(h.warden.dispatch(MANAGER, &line).await.ok);
        }

        let response = h.warden.dispatch(ADMIN, "/list").await;
        assert!(response.ok);
        assert!(response.messages.len() > 1);
        assert!(response.messages[0].starts_with("All registered accounts (200)"));
        assert!(response
            .messages
            .iter()
            .all(|page| page.chars().count() <= warden_sdk::responses::MAX_MESSAGE_LEN));

        let listed = response
            .messages
            .iter()
            .flat_map(|page| page.lines())
            .filter(|line| line.starts_with("- "))
            .count();
        assert_eq!(listed, 200);
    }

    #[tokio::test]
    async fn scheduled_sweep_retires_and_audits() {
        let h = harness().await;
        assert!(h.warden.dispatch(MANAGER, "/add alice").await.ok);
        h.clock.advance(Duration::days(10));
        assert!(h.warden.dispatch(MANAGER, "/add bob").await.ok);
        h.clock.advance(Duration::days(21));

        let scheduler = h.warden.scheduler();
        let report = scheduler.run_once().await.unwrap();
        assert_eq!(report.removed, vec![AccountId::from("alice")]);

        let listed = h.warden.dispatch(MANAGER, "/list").await;
        assert!(!listed.text().contains("alice"));
        assert!(listed.text().contains("bob"));

        let entries = h.warden.dispatcher().audit_log().entries().await;
        let sweep = entries.last().unwrap();
        assert_eq!(sweep.action, "sweep");
        assert_eq!(sweep.admin_id, warden_sdk::scheduler::SCHEDULER_ACTOR);

        let quiet = scheduler.run_once().await.unwrap();
        assert!(!quiet.changed());
        assert_eq!(h.warden.dispatcher().audit_log().entries().await.len(), entries.len());
    }

    #[tokio::test]
    async fn sweep_cadence_follows_the_ledger_clock() {
        let h = harness().await;
        let scheduler = h.warden.scheduler();
        assert_eq!(scheduler.next_delay(), Duration::hours(15));

        h.clock.advance(Duration::hours(14) + Duration::minutes(30));
        assert_eq!(scheduler.next_delay(), Duration::minutes(30));

        h.clock.advance(Duration::minutes(30));
        assert_eq!(scheduler.next_delay(), Duration::days(1));
    }

    #[tokio::test]
    async fn repair_is_reported_and_audited() {
        let h = harness().await;
        let response = h.warden.dispatch(ADMIN, "/repair").await;
        assert!(response.ok, "{}", response.text());
        assert_eq!(h.audit_actions().await.last().map(String::as_str), Some("repair"));
    }
}
