use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Config, content dump and public directory inside a fresh temp dir.
    fn new(content: &str) -> Self {
        let dir = tempdir().expect("Creating temp dir failed");
        let root = dir.path();
        let config = format!(
            "archive:\n  public_dir: {public}\n  public_url_path: /files/\n  base_path: RePEc\n  archive_code: tst\n  provider_name: Test Institute\n  provider_homepage: https://example.org\n  provider_institution: RePEc:edi:tstinus\n  maintainer_name: Jo Maintainer\n  maintainer_email: jo@example.org\nbundle_store: {store}\ncontent: {content}\n",
            public = root.join("public").display(),
            store = root.join("bundles.json").display(),
            content = root.join("content.yaml").display(),
        );
        fs::write(root.join("config.yaml"), config).expect("Writing temp config failed");
        fs::write(root.join("content.yaml"), content).expect("Writing content dump failed");
        Workspace { dir }
    }

    fn config(&self) -> PathBuf {
        self.dir.path().join("config.yaml")
    }

    fn archive(&self) -> PathBuf {
        self.dir.path().join("public/RePEc/tst")
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("repec-archive").expect("Binary exists");
        cmd.env_remove("REPEC_PUBLIC_DIR")
            .env_remove("REPEC_BUNDLE_STORE");
        cmd
    }

    fn configure_papers(&self) {
        self.cmd()
            .args(["bundle", "set", "--config"])
            .arg(self.config())
            .args(["--entity-type", "node", "--bundle", "paper"])
            .args([
                "--set",
                "enabled=true",
                "--set",
                "serie_type=wpaper",
                "--set",
                "serie_name=Working Papers",
                "--set",
                "is_different_serie_directory=false",
                "--set",
                "author_name=field_authors",
                "--set",
                "abstract=body",
                "--set",
                "keywords=field_tags",
            ])
            .assert()
            .success();
    }
}

const CONTENT: &str = r#"
users:
  - { id: 7, name: Jane Doe }
terms:
  - { id: 10, name: Macro }
  - { id: 11, name: Trade }
entities:
  - entity_type: node
    bundle: paper
    id: 42
    label: Growth and Trade
    fields:
      field_authors: [{ target_id: 7 }]
      body: [{ value: "<p>Growth</p>" }]
      field_tags: [{ target_id: 10 }, { target_id: 11 }]
  - entity_type: node
    bundle: page
    id: 43
    label: About us
"#;

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| panic!("reading {path:?}: {e}"))
}

#[test]
fn series_lists_every_series_type() {
    Command::cargo_bin("repec-archive")
        .expect("Binary exists")
        .arg("series")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("wpaper\tReDIF-Paper\tPaper series")
                .and(predicate::str::contains("sftwre"))
                .and(predicate::str::contains("bookss")),
        );
}

#[test]
fn init_then_publish_writes_archive() {
    let ws = Workspace::new(CONTENT);
    ws.configure_papers();

    ws.cmd()
        .arg("init")
        .arg("--config")
        .arg(ws.config())
        .assert()
        .success()
        .stdout(predicate::str::contains("tstarchi.rdf"));
    assert!(ws.archive().join(".htaccess").exists());

    ws.cmd()
        .arg("publish")
        .arg("--config")
        .arg(ws.config())
        .assert()
        .success()
        .stdout(
            predicate::str::contains("wpaper_node_42.rdf")
                .and(predicate::str::contains("appended"))
                .and(predicate::str::contains("node_43").not()),
        );

    let paper = read(&ws.archive().join("wpaper/wpaper_node_42.rdf"));
    assert!(paper.starts_with("Template-Type: ReDIF-Paper 1.0\nTitle: Growth and Trade\n"));
    assert!(paper.contains("Author-Name: Jane Doe\n"));
    assert!(paper.contains("Abstract: Growth\n"));
    assert!(paper.contains("Keywords: Macro, Trade\n"));

    let index = read(&ws.archive().join("tstseri.rdf"));
    assert_eq!(index.matches("Name: Working Papers").count(), 1);

    ws.cmd()
        .args(["delete", "--entity-type", "node", "--id", "42", "--config"])
        .arg(ws.config())
        .assert()
        .success()
        .stdout(predicate::str::contains("removed"));
    assert!(!ws.archive().join("wpaper/wpaper_node_42.rdf").exists());
}

#[test]
fn publish_exits_non_zero_on_stale_reference() {
    let ws = Workspace::new(
        r#"
entities:
  - entity_type: node
    bundle: paper
    id: 42
    label: Orphan
    fields:
      field_authors: [{ target_id: 99 }]
"#,
    );
    ws.configure_papers();

    ws.cmd()
        .arg("publish")
        .arg("--config")
        .arg(ws.config())
        .assert()
        .failure()
        .stderr(predicate::str::contains("user 99 could not be loaded"));

    // The entity file is still written, without authors.
    let paper = read(&ws.archive().join("wpaper/wpaper_node_42.rdf"));
    assert!(!paper.contains("Author-Name"));
}

#[test]
fn bundle_set_rejects_unknown_settings() {
    let ws = Workspace::new(CONTENT);

    ws.cmd()
        .args(["bundle", "set", "--entity-type", "node", "--bundle", "paper"])
        .args(["--set", "colour=blue", "--config"])
        .arg(ws.config())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown bundle setting"));

    ws.cmd()
        .args(["bundle", "set", "--entity-type", "node", "--bundle", "paper"])
        .args(["--set", "serie_type=novels", "--config"])
        .arg(ws.config())
        .assert()
        .failure();
}

#[test]
fn bundle_show_prints_defaults_and_stored_values() {
    let ws = Workspace::new(CONTENT);
    ws.configure_papers();

    ws.cmd()
        .args(["bundle", "show", "--entity-type", "node", "--bundle", "paper", "--config"])
        .arg(ws.config())
        .assert()
        .success()
        .stdout(
            predicate::str::contains(r#""serie_type": "wpaper""#)
                .and(predicate::str::contains(r#""restriction_by_field": false"#)),
        );

    let stored = read(&ws.dir.path().join("bundles.json"));
    assert!(stored.contains("repec_bundle.node.paper"));
    assert!(!stored.contains("restriction_by_field"));
}

#[test]
fn init_with_empty_base_path_fails() {
    let ws = Workspace::new(CONTENT);
    let config = read(&ws.config()).replace("base_path: RePEc", "base_path: \"\"");
    fs::write(ws.config(), config).unwrap();

    ws.cmd()
        .arg("init")
        .arg("--config")
        .arg(ws.config())
        .assert()
        .failure()
        .stderr(predicate::str::contains("The base path cannot be empty."));
}

#[test]
fn init_with_empty_archive_code_keeps_base_path() {
    let ws = Workspace::new(CONTENT);
    let config = read(&ws.config()).replace("archive_code: tst", "archive_code: \"\"");
    fs::write(ws.config(), config).unwrap();
    let base = ws.dir.path().join("public/RePEc");
    fs::create_dir_all(&base).unwrap();
    fs::write(base.join("otharchi.rdf"), "Handle: RePEc:oth\n").unwrap();

    ws.cmd()
        .arg("init")
        .arg("--config")
        .arg(ws.config())
        .assert()
        .failure()
        .stderr(predicate::str::contains("The archive code cannot be empty."));
    assert!(base.join("otharchi.rdf").exists());
}

use std::sync::{Arc, Mutex};
use tracing_subscriber::prelude::*;
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
        self.events.lock().unwrap().push(format!("{:?}", event));
    }
}

#[test]
fn emits_trace_initialised_event() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    use repec_archive::cli::{run, Cli, Commands};

    let cli = Cli {
        command: Commands::Init {
            config: PathBuf::from("dummy.yaml"),
        },
    };

    assert!(run(cli).is_err(), "missing config must fail");

    let event_msgs = events.lock().unwrap();
    assert!(
        event_msgs.iter().any(|msg| msg.contains("trace_initialised")),
        "Expected a 'trace_initialised' trace event, got: {:?}",
        event_msgs
    );
}
