//! End-to-end tests for the huddle binary
//!
//! Each test runs the compiled binary against its own SQLite file and reads
//! the JSON printed on stdout.

use serde_json::Value;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

struct Cli {
    dir: TempDir,
}

impl Cli {
    fn new() -> Self {
        Cli {
            dir: TempDir::new().expect("temp dir"),
        }
    }

    fn database(&self) -> std::path::PathBuf {
        self.dir.path().join("huddle.db")
    }

    fn raw(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_huddle"))
            .arg("--database")
            .arg(self.database())
            .args(["--log-level", "error"])
            .args(args)
            .env_remove("RUST_LOG")
            .output()
            .expect("failed to run huddle")
    }

    fn ok(&self, args: &[&str]) -> Value {
        let output = self.raw(args);
        assert!(
            output.status.success(),
            "huddle {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        serde_json::from_slice(&output.stdout).expect("stdout is JSON")
    }

    fn fails(&self, args: &[&str]) -> String {
        let output = self.raw(args);
        assert!(!output.status.success(), "huddle {:?} unexpectedly succeeded", args);
        String::from_utf8_lossy(&output.stderr).into_owned()
    }

    fn register(&self, name: &str, moderator: bool) -> String {
        let mut args = vec!["user", "register", name];
        if moderator {
            args.push("--moderator");
        }
        id_of(&self.ok(&args))
    }
}

fn id_of(value: &Value) -> String {
    value["id"].as_str().expect("id field").to_string()
}

fn ids(value: &Value) -> Vec<String> {
    value.as_array().expect("array").iter().map(id_of).collect()
}

#[test]
fn test_public_event_lifecycle() {
    let cli = Cli::new();
    let alice = cli.register("alice", false);
    let bob = cli.register("bob", false);
    let moderator = cli.register("mod", true);

    let event = cli.ok(&[
        "event", "create", "--as", &alice, "--title", "Picnic", "--visibility", "public",
    ]);
    let event_id = id_of(&event);
    assert_eq!(event["status"], "UNVERIFIED");
    assert_eq!(event["access"], "public");

    let hidden = cli.fails(&["event", "show", "--as", &bob, &event_id]);
    assert!(hidden.contains("Not found"), "stderr: {}", hidden);

    let approved = cli.ok(&["moderate", "approve", "--as", &moderator, &event_id]);
    assert_eq!(approved["status"], "OPENED");

    let shown = cli.ok(&["event", "show", "--as", &bob, &event_id]);
    assert_eq!(shown["title"], "Picnic");
    assert_eq!(ids(&cli.ok(&["event", "discover", "--as", &bob])), vec![event_id.clone()]);
    assert!(ids(&cli.ok(&["event", "discover", "--as", &alice])).is_empty());
}

#[test]
fn test_invites_and_duplicate_invite() {
    let cli = Cli::new();
    let alice = cli.register("alice", false);
    let bob = cli.register("bob", false);

    let event_id = id_of(&cli.ok(&[
        "event",
        "create",
        "--as",
        &alice,
        "--title",
        "Dinner",
        "--visibility",
        "SELECTED_INDIVIDUALS",
        "--expires-in",
        "2h",
    ]));

    let invited = cli.ok(&["event", "invite", "--as", &alice, &event_id, &bob]);
    assert_eq!(invited["access"], "invited");
    let names: Vec<&str> = invited["users_with_invite"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["display_name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["alice", "bob"]);
    assert!(invited["expiration_at"].is_u64());

    let duplicate = cli.fails(&["event", "invite", "--as", &alice, &event_id, &bob]);
    assert!(duplicate.contains("Already exists"), "stderr: {}", duplicate);
}

#[test]
fn test_chat_event_follows_membership() {
    let cli = Cli::new();
    let alice = cli.register("alice", false);
    let carol = cli.register("carol", false);
    let moderator = cli.register("mod", true);

    let chat_id = id_of(&cli.ok(&["chat", "create", "--as", &alice, "Climbers"]));
    let event_id = id_of(&cli.ok(&[
        "event", "create", "--as", &alice, "--title", "Bouldering", "--visibility",
        "specific_chat", "--chat", &chat_id,
    ]));
    cli.ok(&["moderate", "approve", "--as", &moderator, &event_id]);

    cli.fails(&["event", "show", "--as", &carol, &event_id]);

    let denied = cli.fails(&["chat", "add-member", "--as", &carol, &chat_id, &carol]);
    assert!(denied.contains("Not found"), "stderr: {}", denied);

    cli.ok(&["chat", "add-member", "--as", &alice, &chat_id, &carol]);
    let shown = cli.ok(&["event", "show", "--as", &carol, &event_id]);
    assert_eq!(shown["access"], "chat");
    assert_eq!(shown["shared_chat"]["title"], "Climbers");
}

#[test]
fn test_friends_only_and_removal() {
    let cli = Cli::new();
    let alice = cli.register("alice", false);
    let bob = cli.register("bob", false);
    let moderator = cli.register("mod", true);

    cli.ok(&["friend", "add", "--as", &alice, &bob]);
    assert_eq!(ids(&cli.ok(&["friend", "list", "--as", &alice])), vec![bob.clone()]);

    let event_id = id_of(&cli.ok(&[
        "event", "create", "--as", &alice, "--title", "Movie", "--visibility", "friends_only",
    ]));
    cli.ok(&["moderate", "approve", "--as", &moderator, &event_id]);
    cli.ok(&["event", "show", "--as", &bob, &event_id]);

    let forbidden = cli.fails(&["event", "remove", "--as", &bob, &event_id]);
    assert!(forbidden.contains("Not authorized"), "stderr: {}", forbidden);

    let removed = cli.ok(&["event", "remove", "--as", &alice, &event_id]);
    assert_eq!(removed["status"], "REMOVED");

    cli.ok(&["event", "show", "--as", &alice, &event_id]);
    cli.fails(&["event", "show", "--as", &bob, &event_id]);
    assert_eq!(ids(&cli.ok(&["event", "mine", "--as", &alice])), vec![event_id]);
}

#[test]
fn test_expiration_past_storage_range_is_rejected() {
    let cli = Cli::new();
    let alice = cli.register("alice", false);

    let refused = cli.fails(&[
        "event", "create", "--as", &alice, "--title", "Forever", "--visibility", "public",
        "--expires-in", "1000000000years",
    ]);
    assert!(refused.contains("Validation error"), "stderr: {}", refused);
    assert!(ids(&cli.ok(&["event", "mine", "--as", &alice])).is_empty());
}

#[test]
fn test_patch_and_moderation_listing() {
    let cli = Cli::new();
    let alice = cli.register("alice", false);
    let moderator = cli.register("mod", true);

    let event_id = id_of(&cli.ok(&[
        "event", "create", "--as", &alice, "--title", "Run", "--visibility", "public",
    ]));

    let patched = cli.ok(&["event", "patch", "--as", &alice, &event_id, "--title", "Long run"]);
    assert_eq!(patched["title"], "Long run");
    assert_eq!(patched["visibility"], "PUBLIC");

    let pending = cli.ok(&["moderate", "list", "--as", &moderator, "--status", "unverified"]);
    assert_eq!(ids(&pending), vec![event_id.clone()]);

    cli.ok(&["moderate", "reject", "--as", &moderator, &event_id]);
    let shown = cli.ok(&["moderate", "show", "--as", &moderator, &event_id]);
    assert_eq!(shown["status"], "REJECTED");

    let refused = cli.fails(&["moderate", "list", "--as", &alice]);
    assert!(refused.contains("Not authorized"), "stderr: {}", refused);
}

#[test]
fn test_config_file_is_honored() {
    let cli = Cli::new();
    let config_path = cli.dir.path().join("huddle.toml");
    write_config(&config_path, &cli.database(), 5);

    let alice = cli.register("alice", false);
    let output = Command::new(env!("CARGO_BIN_EXE_huddle"))
        .arg("--config")
        .arg(&config_path)
        .args(["event", "create", "--as", &alice, "--title", "Too long", "--visibility", "public"])
        .env_remove("RUST_LOG")
        .output()
        .unwrap();

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("Validation error"));
}

fn write_config(path: &Path, database: &Path, max_title_length: usize) {
    let contents = format!(
        "[store]\ndatabase_path = {:?}\n\n[logging]\nlevel = \"error\"\n\n[events]\nmax_title_length = {}\n",
        database.display().to_string(),
        max_title_length
    );
    std::fs::write(path, contents).unwrap();
}
