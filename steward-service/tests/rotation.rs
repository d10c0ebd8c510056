//! End-to-end tests of the rotation watcher driving a real coordinator,
//! materializer, and store against a recording token server.

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use clap::Parser as _;
use steward_service::SecretsProvider;
use steward_service::config::StewardConfig;
use steward_service::key_materializer::{ArtifactPaths, KeyMaterializer};
use steward_service::reload::ReloadCoordinator;
use steward_service::rotation_watcher::rotation_watcher_task;
use steward_service::secrets_store::SecretsStore;
use steward_service::token_server::{TokenServer, TokenServerService};
use steward_types::{Commitment, EpochId, SecretsBundle, SigningKey};
use tokio_util::sync::CancellationToken;

fn epoch(s: &str) -> EpochId {
    s.parse().expect("valid epoch id")
}

fn bundle(epochs: &[(&str, &str)]) -> SecretsBundle {
    SecretsBundle {
        keys: epochs
            .iter()
            .map(|(e, k)| (epoch(e), SigningKey::new(*k)))
            .collect(),
        commitments: epochs
            .iter()
            .map(|(e, k)| (epoch(e), Commitment::new(format!("C_{k}"))))
            .collect::<HashMap<_, _>>(),
    }
}

/// Records the signing-key artifact contents at every `load_keys` call.
#[derive(Default)]
struct RecordingTokenServer {
    loads: Mutex<Vec<String>>,
    fail_next: AtomicBool,
}

#[async_trait]
impl TokenServer for RecordingTokenServer {
    async fn load_keys(&self, signing_key: &Path, _: &Path, _: &Path) -> eyre::Result<()> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            eyre::bail!("transient failure");
        }
        self.loads
            .lock()
            .unwrap()
            .push(std::fs::read_to_string(signing_key)?);
        Ok(())
    }
}

struct StaticSecretsProvider(SecretsBundle);

#[async_trait]
impl SecretsProvider for StaticSecretsProvider {
    async fn load_bundle(&self) -> eyre::Result<SecretsBundle> {
        Ok(self.0.clone())
    }
}

struct Harness {
    server: Arc<RecordingTokenServer>,
    clock: Arc<Mutex<EpochId>>,
    cancellation_token: CancellationToken,
    watcher: tokio::task::JoinHandle<eyre::Result<()>>,
    _dir: tempfile::TempDir,
}

impl Harness {
    /// Spawns the watcher with a 60s poll over a controllable clock.
    fn spawn(bundle: SecretsBundle, initial: EpochId) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let server = Arc::new(RecordingTokenServer::default());
        let store = Arc::new(SecretsStore::new(bundle));
        let materializer = KeyMaterializer::new(
            store,
            ArtifactPaths {
                signing_key: dir.path().join("key.pem"),
                commitment: dir.path().join("commitment.json"),
                redemption_keys: dir.path().join("redeem_keys.pem"),
            },
        );
        let token_server: TokenServerService = server.clone();
        let coordinator =
            ReloadCoordinator::new(materializer, token_server, Duration::from_secs(5));
        let clock = Arc::new(Mutex::new(initial));
        let cancellation_token = CancellationToken::new();
        let watcher = tokio::spawn(rotation_watcher_task(
            {
                let clock = Arc::clone(&clock);
                move || *clock.lock().unwrap()
            },
            coordinator,
            Duration::from_secs(60),
            initial,
            cancellation_token.clone(),
        ));
        Self {
            server,
            clock,
            cancellation_token,
            watcher,
            _dir: dir,
        }
    }

    fn loads(&self) -> Vec<String> {
        self.server.loads.lock().unwrap().clone()
    }

    async fn stop(self) {
        self.cancellation_token.cancel();
        self.watcher.await.unwrap().unwrap();
    }
}

#[tokio::test(start_paused = true)]
async fn cycles_keys_exactly_once_per_epoch_transition() {
    let harness = Harness::spawn(
        bundle(&[("2024-02", "KEY_FEB"), ("2024-03", "KEY_MAR")]),
        epoch("2024-02"),
    );

    // several polls with an unchanged clock: no reloads
    tokio::time::sleep(Duration::from_secs(150)).await;
    assert_eq!(harness.loads().len(), 0);

    // the clock crosses into March between two polls
    *harness.clock.lock().unwrap() = epoch("2024-03");
    tokio::time::sleep(Duration::from_secs(90)).await;
    assert_eq!(harness.loads(), vec!["KEY_MAR".to_string()]);

    // still March: no further reloads
    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(harness.loads().len(), 1);

    harness.stop().await;
}

#[tokio::test(start_paused = true)]
async fn a_failed_reload_is_retried_with_the_same_target() {
    let harness = Harness::spawn(
        bundle(&[("2024-02", "KEY_FEB"), ("2024-03", "KEY_MAR")]),
        epoch("2024-02"),
    );

    harness.server.fail_next.store(true, Ordering::SeqCst);
    *harness.clock.lock().unwrap() = epoch("2024-03");

    // first poll after the transition fails
    tokio::time::sleep(Duration::from_secs(70)).await;
    assert_eq!(harness.loads().len(), 0);

    // the very next poll re-attempts the same epoch and succeeds
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(harness.loads(), vec!["KEY_MAR".to_string()]);

    harness.stop().await;
}

#[tokio::test(start_paused = true)]
async fn an_unprovisioned_epoch_is_retried_indefinitely() {
    let harness = Harness::spawn(bundle(&[("2024-02", "KEY_FEB")]), epoch("2024-02"));

    *harness.clock.lock().unwrap() = epoch("2024-03");
    tokio::time::sleep(Duration::from_secs(600)).await;
    // every poll fails on the missing key; nothing ever reaches the server
    assert_eq!(harness.loads().len(), 0);

    harness.stop().await;
}

fn config_for(dir: &Path) -> StewardConfig {
    let args: Vec<OsString> = vec![
        "steward".into(),
        "--signing-key-path".into(),
        dir.join("key.pem").into_os_string(),
        "--commitment-path".into(),
        dir.join("commitment.json").into_os_string(),
        "--redemption-keys-path".into(),
        dir.join("redeem_keys.pem").into_os_string(),
        "--bind-addr".into(),
        "127.0.0.1:0".into(),
    ];
    StewardConfig::parse_from(args)
}

#[tokio::test]
async fn start_performs_the_initial_load_and_shuts_down_cleanly() {
    let dir = tempfile::tempdir().unwrap();
    let now = EpochId::current();
    let bundle = SecretsBundle {
        keys: HashMap::from([(now, SigningKey::new("KEY_NOW"))]),
        commitments: HashMap::from([(now, Commitment::new("C_NOW"))]),
    };
    let server = Arc::new(RecordingTokenServer::default());

    steward_service::start(
        config_for(dir.path()),
        Arc::new(StaticSecretsProvider(bundle)),
        server.clone(),
        async {},
    )
    .await
    .unwrap();

    assert_eq!(server.loads.lock().unwrap().len(), 1);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("key.pem")).unwrap(),
        "KEY_NOW"
    );
}

#[tokio::test]
async fn start_fails_fast_without_valid_initial_key_material() {
    let dir = tempfile::tempdir().unwrap();
    let server = Arc::new(RecordingTokenServer::default());

    let result = steward_service::start(
        config_for(dir.path()),
        Arc::new(StaticSecretsProvider(SecretsBundle::default())),
        server.clone(),
        std::future::pending(),
    )
    .await;

    assert!(result.is_err());
    assert_eq!(server.loads.lock().unwrap().len(), 0);
}
