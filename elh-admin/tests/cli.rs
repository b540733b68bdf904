use assert_cmd::Command;
use predicates::prelude::*;
use std::fs::write;
use tempfile::{tempdir, NamedTempFile, TempDir};

const KEY_ENV: &str = "FIREBASE_SERVICE_ACCOUNT_KEY_PATH";
const EMULATOR_ENV: &str = "FIRESTORE_EMULATOR_HOST";
/// Nothing listens on the discard/tcpmux ports in CI.
const UNREACHABLE_HOST: &str = "127.0.0.1:1";

/// A key file with a placeholder private key; only usable against the emulator.
fn create_key_file() -> NamedTempFile {
    let key = NamedTempFile::new().expect("Creating temp key file failed");
    write(
        key.path(),
        br#"{"type":"service_account","project_id":"elh-test","client_email":"cli@elh-test.iam.gserviceaccount.com","private_key":"placeholder"}"#,
    )
    .expect("Writing temp key failed");
    key
}

/// Runs the binary from an empty directory so no stray `.env` is picked up.
fn elh_admin(workdir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("elh-admin").expect("Binary exists");
    cmd.current_dir(workdir.path())
        .env_remove(KEY_ENV)
        .env_remove(EMULATOR_ENV)
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn fails_before_any_database_call_without_credentials() {
    let dir = tempdir().unwrap();
    elh_admin(&dir)
        .arg("check-db-connection")
        .assert()
        .code(1)
        .stderr(predicate::str::contains(KEY_ENV).and(predicate::str::contains("--key-path")))
        .stdout(predicate::str::contains("Successfully").not());
}

#[test]
fn reports_missing_key_file() {
    let dir = tempdir().unwrap();
    elh_admin(&dir)
        .args(["--key-path", "/no/such/key.json", "check-db-connection"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Service account key file not found"));
}

#[test]
fn key_path_is_read_from_environment() {
    let dir = tempdir().unwrap();
    elh_admin(&dir)
        .env(KEY_ENV, "/no/such/env-key.json")
        .arg("check-db-connection")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("/no/such/env-key.json"));
}

#[test]
fn rejects_malformed_key_file() {
    let dir = tempdir().unwrap();
    let key = NamedTempFile::new().unwrap();
    write(key.path(), "definitely not json").unwrap();

    elh_admin(&dir)
        .arg("--key-path")
        .arg(key.path())
        .arg("check-db-connection")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Failed to initialize Firestore"))
        .stderr(predicate::str::contains("valid JSON key file"));
}

#[test]
fn out_of_range_level_is_rejected_before_writing() {
    let dir = tempdir().unwrap();
    let key = create_key_file();

    for level in ["0", "19", "-2"] {
        elh_admin(&dir)
            .env(EMULATOR_ENV, UNREACHABLE_HOST)
            .arg("--key-path")
            .arg(key.path())
            .args(["add-article", "tides-101", "How Tides Work", "--level", level])
            .assert()
            .code(1)
            .stderr(predicate::str::contains("level must be between 1 and 18"))
            // a write attempt against the unreachable host would surface as a request error
            .stderr(predicate::str::contains("request failed").not())
            .stdout(predicate::str::contains("added/updated").not());
    }
}

#[test]
fn missing_content_file_aborts_article_creation() {
    let dir = tempdir().unwrap();
    let key = create_key_file();

    elh_admin(&dir)
        .env(EMULATOR_ENV, UNREACHABLE_HOST)
        .arg("--key-path")
        .arg(key.path())
        .args([
            "add-article",
            "tides-101",
            "How Tides Work",
            "--level",
            "5",
            "--content-file",
            "/no/such/content.txt",
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error reading content file"));
}

#[test]
fn connection_check_fails_clearly_against_unreachable_database() {
    let dir = tempdir().unwrap();
    let key = create_key_file();

    elh_admin(&dir)
        .env(EMULATOR_ENV, UNREACHABLE_HOST)
        .arg("--key-path")
        .arg(key.path())
        .arg("check-db-connection")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("error performing a test read"))
        .stderr(predicate::str::contains("roles/datastore.user"));
}

#[test]
fn article_write_failure_exits_non_zero() {
    let dir = tempdir().unwrap();
    let key = create_key_file();

    elh_admin(&dir)
        .env(EMULATOR_ENV, UNREACHABLE_HOST)
        .arg("--key-path")
        .arg(key.path())
        .args(["add-article", "tides-101", "How Tides Work", "--level", "5", "--tags", "sea,moon"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error processing article"));
}

#[test]
fn help_lists_every_subcommand() {
    let dir = tempdir().unwrap();
    elh_admin(&dir).arg("--help").assert().success().stdout(
        predicate::str::contains("check-db-connection")
            .and(predicate::str::contains("add-article"))
            .and(predicate::str::contains("list-article-questions"))
            .and(predicate::str::contains("add-questions"))
            .and(predicate::str::contains("add-listening-activity")),
    );
}

use std::sync::{Arc, Mutex};
use tracing_subscriber::prelude::*; // needed for .with()
use tracing_subscriber::{layer::Context, Layer, Registry};

/// Custom Layer to collect emitted event messages.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        use std::fmt::Write as FmtWrite;
        let mut msg = String::new();
        let _ = write!(&mut msg, "{:?}", event);
        self.events.lock().unwrap().push(msg);
    }
}

#[tokio::test]
#[serial_test::serial]
async fn emits_trace_initialised_event() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    use elh_admin::cli::{run, Cli, Commands};

    // No key anywhere: run fails at credential resolution, after the first event.
    std::env::remove_var(KEY_ENV);
    let cli = Cli {
        key_path: None,
        config: None,
        command: Commands::CheckDbConnection,
    };

    let result = run(cli).await;
    assert!(result.is_err());

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
}
