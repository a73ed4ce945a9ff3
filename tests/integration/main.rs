//! Integration tests for pinkeep

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// Isolated config + state directories for one test
    struct Sandbox {
        dir: TempDir,
    }

    impl Sandbox {
        fn new() -> Self {
            let sandbox = Self {
                dir: TempDir::new().unwrap(),
            };
            let config = format!(
                "[general]\naudit_log = false\n\n[ipfs]\napi_url = \"http://127.0.0.1:9\"\ntimeout_secs = 2\n\n[ledger]\npath = \"{}\"\n",
                sandbox.ledger_path().display()
            );
            std::fs::write(sandbox.config_path(), config).unwrap();
            sandbox
        }

        fn config_path(&self) -> PathBuf {
            self.dir.path().join("config.toml")
        }

        fn ledger_path(&self) -> PathBuf {
            self.dir.path().join("ledger.json")
        }

        fn write_ledger(&self, json: &str) {
            std::fs::write(self.ledger_path(), json).unwrap();
        }

        fn cmd(&self) -> Command {
            let mut cmd = cargo_bin_cmd!("pinkeep");
            cmd.env("PINKEEP_CONFIG", self.config_path())
                .env("XDG_STATE_HOME", self.dir.path().join("state"))
                .env("XDG_CONFIG_HOME", self.dir.path().join("xdg-config"))
                .env("CI", "1");
            cmd
        }
    }

    fn pinkeep() -> Command {
        cargo_bin_cmd!("pinkeep")
    }

    fn expired_and_namespace_ledger() -> &'static str {
        r#"{
            "QmExpired": {"kind": "expiring", "key": "QmExpired", "expires_at": "2000-01-01T00:00:00Z"},
            "QmFresh": {"kind": "expiring", "key": "QmFresh", "expires_at": "2999-01-01T00:00:00Z"},
            "mainnet:aragon.aragonpm.eth": {"kind": "namespace_pin", "key": "mainnet:aragon.aragonpm.eth", "pinned_hash": "QmRelease"}
        }"#
    }

    #[test]
    fn help_displays() {
        pinkeep()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("pin-on-access"));
    }

    #[test]
    fn version_displays() {
        pinkeep()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("pinkeep"));
    }

    #[test]
    fn config_path_follows_env() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains(
                sandbox.config_path().display().to_string(),
            ));
    }

    #[test]
    fn config_show() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[cache]"))
            .stdout(predicate::str::contains("expiration_window_days = 7"));
    }

    #[test]
    fn config_set_persists() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["config", "set", "cache.expiration_window_days", "30"])
            .assert()
            .success();

        sandbox
            .cmd()
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("expiration_window_days = 30"));
    }

    #[test]
    fn config_set_rejects_oversized_window() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["config", "set", "cache.expiration_window_days", "4294967295"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("out of range"));

        sandbox
            .cmd()
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("expiration_window_days = 7"));
    }

    #[test]
    fn config_set_unknown_key_fails() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["config", "set", "vm.name", "x"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown config key"));
    }

    #[test]
    fn list_empty() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["list", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::diff("[]\n"));
    }

    #[test]
    fn list_shows_entries() {
        let sandbox = Sandbox::new();
        sandbox.write_ledger(expired_and_namespace_ledger());

        sandbox
            .cmd()
            .args(["list", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("QmExpired"))
            .stdout(predicate::str::contains("QmFresh"))
            .stdout(predicate::str::contains("mainnet:aragon.aragonpm.eth"));

        sandbox
            .cmd()
            .args(["list", "--expired", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::contains("QmExpired"))
            .stdout(predicate::str::contains("QmFresh").not());
    }

    #[test]
    fn corrupt_ledger_is_reported() {
        let sandbox = Sandbox::new();
        sandbox.write_ledger("{ not json");

        sandbox
            .cmd()
            .arg("list")
            .assert()
            .failure()
            .stderr(predicate::str::contains("corrupt"));
    }

    #[test]
    fn sweep_empty_ledger() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["sweep", "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"examined\": 0"));
    }

    #[test]
    fn sweep_dry_run_lists_expired_only() {
        let sandbox = Sandbox::new();
        sandbox.write_ledger(expired_and_namespace_ledger());

        sandbox
            .cmd()
            .args(["sweep", "--dry-run", "--format", "plain"])
            .assert()
            .success()
            .stdout(predicate::str::diff("QmExpired\n"));

        // Dry run leaves the ledger alone
        let ledger = std::fs::read_to_string(sandbox.ledger_path()).unwrap();
        assert!(ledger.contains("QmExpired"));
    }

    #[test]
    fn sweep_with_unreachable_daemon_fails_and_keeps_entry() {
        let sandbox = Sandbox::new();
        sandbox.write_ledger(expired_and_namespace_ledger());

        sandbox
            .cmd()
            .args(["sweep", "--format", "json"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("failed key"));

        let ledger = std::fs::read_to_string(sandbox.ledger_path()).unwrap();
        assert!(ledger.contains("QmExpired"));
    }

    #[test]
    fn access_rejects_malformed_key() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["access", "not/a/key"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid resource key"));
    }

    #[test]
    fn namespace_show() {
        let sandbox = Sandbox::new();
        sandbox
            .cmd()
            .args(["namespace", "show", "--network", "rinkeby"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Nothing pinned for rinkeby:aragon.aragonpm.eth"));

        sandbox.write_ledger(expired_and_namespace_ledger());
        sandbox
            .cmd()
            .args(["namespace", "show", "--network", "mainnet"])
            .assert()
            .success()
            .stdout(predicate::str::contains("QmRelease"));
    }
}

mod library_tests {
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use pinkeep::audit::AuditLog;
    use pinkeep::clock::ManualClock;
    use pinkeep::config::Config;
    use pinkeep::error::PinOp;
    use pinkeep::intercept::LineFeedHost;
    use pinkeep::ledger::{FileLedger, LedgerEntry, LedgerStore, ResourceKey};
    use pinkeep::namespace::NamespaceUpdate;
    use pinkeep::pin::PinService;
    use pinkeep::{PinKeeper, PinkeepError, PinkeepResult};
    use std::collections::BTreeSet;
    use std::path::Path;
    use std::sync::{Arc, Mutex};
    use tempfile::TempDir;

    /// In-process stand-in for the IPFS daemon
    #[derive(Default)]
    struct FakeIpfs {
        pinned: Mutex<BTreeSet<String>>,
        offline: Mutex<bool>,
    }

    impl FakeIpfs {
        fn pinned(&self) -> BTreeSet<String> {
            self.pinned.lock().unwrap().clone()
        }

        fn set_offline(&self, offline: bool) {
            *self.offline.lock().unwrap() = offline;
        }

        fn check_online(&self, op: PinOp, key: &ResourceKey) -> PinkeepResult<()> {
            if *self.offline.lock().unwrap() {
                return Err(PinkeepError::pin(op, key.as_str(), "connection refused"));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl PinService for FakeIpfs {
        async fn pin_add(&self, key: &ResourceKey) -> PinkeepResult<()> {
            self.check_online(PinOp::Add, key)?;
            self.pinned.lock().unwrap().insert(key.to_string());
            Ok(())
        }

        async fn pin_remove(&self, key: &ResourceKey) -> PinkeepResult<()> {
            self.check_online(PinOp::Remove, key)?;
            self.pinned.lock().unwrap().remove(key.as_str());
            Ok(())
        }

        fn service_name(&self) -> &'static str {
            "fake-ipfs"
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 8, 0, 0).unwrap()
    }

    fn key(raw: &str) -> ResourceKey {
        ResourceKey::parse(raw).unwrap()
    }

    async fn open_keeper(
        path: &Path,
        ipfs: Arc<FakeIpfs>,
        clock: Arc<ManualClock>,
    ) -> (PinKeeper, Arc<FileLedger>) {
        let ledger = Arc::new(FileLedger::open(path).await.unwrap());
        let keeper = PinKeeper::new(
            ledger.clone(),
            ipfs,
            clock,
            Arc::new(AuditLog::disabled()),
            &Config::default(),
        )
        .unwrap();
        (keeper, ledger)
    }

    #[tokio::test]
    async fn full_lifecycle_survives_restart() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("ledger.json");
        let ipfs = Arc::new(FakeIpfs::default());
        let clock = Arc::new(ManualClock::new(t0()));

        {
            let (keeper, _) = open_keeper(&path, ipfs.clone(), clock.clone()).await;
            let ns = keeper.namespace_key("mainnet", None).unwrap();

            keeper.record_access(&key("QmAsset")).await.unwrap();
            keeper.pin_namespace_resource(&ns, &key("QmRelease1")).await.unwrap();
        }

        // Reopen from disk, eight days later
        clock.advance(Duration::days(8));
        let (keeper, ledger) = open_keeper(&path, ipfs.clone(), clock.clone()).await;
        let ns = keeper.namespace_key("mainnet", None).unwrap();

        assert_eq!(
            keeper.current_namespace_resource(&ns).await.unwrap(),
            Some(key("QmRelease1"))
        );

        let report = keeper.sweep_expired_resources().await.unwrap();
        assert_eq!(report.reaped, vec![key("QmAsset")]);
        assert!(ledger.get("QmAsset").await.unwrap().is_none());
        assert_eq!(ipfs.pinned(), BTreeSet::from(["QmRelease1".to_string()]));

        // Advancing the namespace releases the old release
        let update = keeper
            .pin_namespace_resource(&ns, &key("QmRelease2"))
            .await
            .unwrap();
        assert_eq!(
            update,
            NamespaceUpdate::Advanced {
                previous: Some(key("QmRelease1")),
                released: true,
            }
        );
        assert_eq!(ipfs.pinned(), BTreeSet::from(["QmRelease2".to_string()]));
    }

    #[tokio::test]
    async fn offline_daemon_defers_release_to_next_sweep() {
        let temp = TempDir::new().unwrap();
        let ipfs = Arc::new(FakeIpfs::default());
        let clock = Arc::new(ManualClock::new(t0()));
        let path = temp.path().join("ledger.json");
        let (keeper, ledger) = open_keeper(&path, ipfs.clone(), clock.clone()).await;

        keeper.record_access(&key("QmA")).await.unwrap();
        keeper.record_access(&key("QmB")).await.unwrap();
        clock.advance(Duration::days(7) + Duration::minutes(1));

        ipfs.set_offline(true);
        let report = keeper.sweep_expired_resources().await.unwrap();
        assert_eq!(report.failure_count(), 2);
        assert!(ledger.has("QmA").await.unwrap());
        assert!(ledger.has("QmB").await.unwrap());

        ipfs.set_offline(false);
        let report = keeper.sweep_expired_resources().await.unwrap();
        assert!(report.is_clean());
        assert_eq!(report.reaped.len(), 2);
        assert!(ipfs.pinned().is_empty());
    }

    #[tokio::test]
    async fn two_keepers_on_one_ledger_keep_both_writes() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("ledger.json");
        let ipfs = Arc::new(FakeIpfs::default());
        let clock = Arc::new(ManualClock::new(t0()));

        // A long-running `serve` and a one-off `namespace set`
        let (server, _) = open_keeper(&path, ipfs.clone(), clock.clone()).await;
        let (operator, _) = open_keeper(&path, ipfs.clone(), clock.clone()).await;
        let ns = operator.namespace_key("mainnet", None).unwrap();

        operator
            .pin_namespace_resource(&ns, &key("QmRelease"))
            .await
            .unwrap();
        server.record_access(&key("QmAsset")).await.unwrap();

        let reopened = FileLedger::open(&path).await.unwrap();
        assert_eq!(
            reopened.keys().await.unwrap(),
            vec!["QmAsset".to_string(), ns.to_string()]
        );
        assert_eq!(
            server.current_namespace_resource(&ns).await.unwrap(),
            Some(key("QmRelease"))
        );
    }

    #[tokio::test]
    async fn intercepted_feed_is_tracked() {
        let temp = TempDir::new().unwrap();
        let ipfs = Arc::new(FakeIpfs::default());
        let clock = Arc::new(ManualClock::new(t0()));
        let path = temp.path().join("ledger.json");
        let (keeper, ledger) = open_keeper(&path, ipfs.clone(), clock).await;

        let host = LineFeedHost::new();
        keeper.install_interception_hook(&host).unwrap();

        let feed = "GET https://localhost:8080/ipfs/QmOne/app.js 200\n\
                    GET https://localhost:8080/status 200\n\
                    GET https://localhost:8080/ipfs/QmTwo 200\n";
        let matched = host.run(feed.as_bytes()).await.unwrap();
        assert_eq!(matched, 2);

        for _ in 0..200 {
            if ledger.keys().await.unwrap().len() == 2 {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }

        assert!(matches!(
            ledger.get("QmOne").await.unwrap(),
            Some(LedgerEntry::ExpiringResource { .. })
        ));
        assert!(ledger.has("QmTwo").await.unwrap());
        assert_eq!(
            ipfs.pinned(),
            BTreeSet::from(["QmOne".to_string(), "QmTwo".to_string()])
        );
    }
}
