use std::fs;
use std::path::PathBuf;
use std::process::Output;

use clientbook_sqlite::client_catalog;

/// Helper to create a temp directory that is cleaned up on drop.
struct TempDir {
    path: PathBuf,
}

impl TempDir {
    fn new(name: &str) -> Self {
        let path =
            std::env::temp_dir().join(format!("clientbook_cli_test_{name}_{}", std::process::id()));
        let _ = fs::remove_dir_all(&path);
        fs::create_dir_all(&path).expect("failed to create temp dir");
        Self { path }
    }

    fn join(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    fn database(&self) -> PathBuf {
        self.join("clientsDatabase.db")
    }

    /// Writes a config that keeps the database inside this directory.
    fn write_config(&self) -> PathBuf {
        let path = self.join("config.yml");
        let yaml = format!(
            "version: \"1.0\"\ndatabase:\n  data_dir: '{}'\nlogging:\n  filter: warn\n",
            self.path.display()
        );
        fs::write(&path, yaml).expect("failed to write config");
        path
    }
}

impl Drop for TempDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

/// Runs `clientbook` with the directory's config file.
fn clientbook(dir: &TempDir, args: &[&str]) -> Output {
    let config = dir.write_config();
    std::process::Command::new(env!("CARGO_BIN_EXE_clientbook"))
        .arg("--config")
        .arg(&config)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run clientbook")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn assert_ok(output: &Output) -> String {
    assert!(
        output.status.success(),
        "command failed.\nstdout: {}\nstderr: {}",
        stdout(output),
        stderr(output)
    );
    stdout(output)
}

// ---------------------------------------------------------------------------
// schema commands
// ---------------------------------------------------------------------------

#[test]
fn reconcile_creates_then_matches() {
    let dir = TempDir::new("reconcile_twice");

    let first = assert_ok(&clientbook(&dir, &["reconcile"]));
    assert!(first.contains("Users: created"), "stdout: {first}");
    assert!(first.contains("5 created, 0 rebuilt, 0 unchanged"), "stdout: {first}");
    assert!(dir.database().exists());

    let second = assert_ok(&clientbook(&dir, &["reconcile"]));
    assert!(second.contains("Repairs: matching"), "stdout: {second}");
    assert!(second.contains("0 created, 0 rebuilt, 5 unchanged"), "stdout: {second}");
}

#[test]
fn reconcile_json_output() {
    let dir = TempDir::new("reconcile_json");

    let out = assert_ok(&clientbook(&dir, &["reconcile", "--json"]));
    let json: serde_json::Value = serde_json::from_str(&out).unwrap();
    let tables = json["tables"].as_array().unwrap();
    assert_eq!(tables.len(), 5);
    assert_eq!(tables[0]["table"], "Users");
    assert_eq!(tables[0]["outcome"], "created");
}

#[test]
fn db_flag_overrides_config() {
    let dir = TempDir::new("db_override");
    let custom = dir.join("custom.db");

    assert_ok(&clientbook(
        &dir,
        &["--db", custom.to_str().unwrap(), "reconcile"],
    ));
    assert!(custom.exists());
    assert!(!dir.database().exists());
}

#[test]
fn plan_on_missing_database_writes_nothing() {
    let dir = TempDir::new("plan_missing");

    let out = assert_ok(&clientbook(&dir, &["plan"]));
    assert!(out.contains("Users: create"), "stdout: {out}");
    assert!(out.contains("Repairs: create"), "stdout: {out}");
    assert!(!dir.database().exists());
}

#[test]
fn plan_then_reconcile_drifted_table() {
    let dir = TempDir::new("plan_drift");
    {
        let conn = rusqlite::Connection::open(dir.database()).unwrap();
        conn.execute_batch(
            "CREATE TABLE Users (
                internalId INTEGER PRIMARY KEY AUTOINCREMENT,
                phone TEXT, cpf TEXT, idName TEXT, contactName TEXT, email TEXT
            );
            INSERT INTO Users (idName, contactName) VALUES ('ACME', 'Silva');",
        )
        .unwrap();
    }

    let plan = assert_ok(&clientbook(&dir, &["plan"]));
    assert!(
        plan.contains("Users: rebuild (keep internalId, phone, cpf, idName, contactName, email; drop none; add cep, address)"),
        "stdout: {plan}"
    );
    assert!(plan.contains("Purchases: create"), "stdout: {plan}");

    let done = assert_ok(&clientbook(&dir, &["reconcile"]));
    assert!(done.contains("Users: rebuilt (1 row(s) copied"), "stdout: {done}");

    let list = assert_ok(&clientbook(&dir, &["user", "list"]));
    assert!(list.contains("ACME\tSilva"), "stdout: {list}");
}

#[test]
fn status_reports_table_states() {
    let dir = TempDir::new("status");

    let before = assert_ok(&clientbook(&dir, &["status"]));
    assert!(before.contains("Users: missing"), "stdout: {before}");

    assert_ok(&clientbook(&dir, &["reconcile"]));
    let after = assert_ok(&clientbook(&dir, &["status"]));
    assert!(after.contains("Users: matching, 0 row(s)"), "stdout: {after}");
    assert!(!after.contains("missing"), "stdout: {after}");
}

#[test]
fn reconcile_failure_exits_with_error() {
    let dir = TempDir::new("reconcile_fk_failure");
    {
        let conn = rusqlite::Connection::open(dir.database()).unwrap();
        conn.execute_batch("PRAGMA foreign_keys = OFF;").unwrap();
        for table in &client_catalog() {
            conn.execute_batch(&table.create_sql()).unwrap();
        }
        conn.execute(
            "INSERT INTO Purchases (purchaseId, userId, date) VALUES (1, 42, '2024-01-01')",
            [],
        )
        .unwrap();
    }

    let out = clientbook(&dir, &["reconcile"]);
    assert!(!out.status.success());
    assert_eq!(out.status.code(), Some(1));
    let err = stderr(&out);
    assert!(err.contains("error: Schema reconciliation failed"), "stderr: {err}");
    assert!(err.contains("Purchases row 1"), "stderr: {err}");
}

// ---------------------------------------------------------------------------
// record commands
// ---------------------------------------------------------------------------

#[test]
fn user_add_list_show_remove() {
    let dir = TempDir::new("users");

    let added = assert_ok(&clientbook(
        &dir,
        &[
            "user",
            "add",
            "--id-name",
            "ACME",
            "--contact-name",
            "Silva",
            "--phone",
            "555",
            "--address",
            "Rua A, 12, Centro, Recife",
        ],
    ));
    assert!(added.contains("Added user 1."), "stdout: {added}");

    let list = assert_ok(&clientbook(&dir, &["user", "list"]));
    assert!(list.contains("1\tACME\tSilva\t555"), "stdout: {list}");

    let json = assert_ok(&clientbook(&dir, &["user", "list", "--json"]));
    let users: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(users.as_array().unwrap().len(), 1);
    assert_eq!(users[0]["contact_name"], "Silva");

    let show = assert_ok(&clientbook(&dir, &["user", "show", "1"]));
    assert!(show.contains("City:      Recife"), "stdout: {show}");

    let found = assert_ok(&clientbook(&dir, &["user", "find", "--phone", "555"]));
    assert!(found.contains("1\tACME"), "stdout: {found}");

    assert_ok(&clientbook(&dir, &["user", "remove", "1"]));
    let missing = clientbook(&dir, &["user", "show", "1"]);
    assert_eq!(missing.status.code(), Some(1));
    assert!(stderr(&missing).contains("error: user 1 not found"));
}

#[test]
fn purchase_flow_updates_total() {
    let dir = TempDir::new("purchases");

    assert_ok(&clientbook(&dir, &["user", "add", "--id-name", "ACME"]));
    let added = assert_ok(&clientbook(
        &dir,
        &["purchase", "add", "--user", "1", "--date", "2024-05-01"],
    ));
    assert!(added.contains("Added purchase 1."), "stdout: {added}");

    let item = assert_ok(&clientbook(
        &dir,
        &[
            "purchase", "item", "--purchase", "1", "--name", "Filter", "--quantity", "2",
            "--price", "10",
        ],
    ));
    assert!(item.contains("Purchase 1 total: 20.00"), "stdout: {item}");

    let history = assert_ok(&clientbook(&dir, &["purchase", "history", "--user", "1"]));
    assert!(history.contains("2024-05-01\tFilter"), "stdout: {history}");

    let unknown = clientbook(&dir, &["purchase", "add", "--user", "9"]);
    assert!(!unknown.status.success());
}

#[test]
fn machine_and_repair_flow() {
    let dir = TempDir::new("repairs");

    assert_ok(&clientbook(
        &dir,
        &["machine", "add", "--serial", "SN-1", "--model", "Mower"],
    ));
    let machines = assert_ok(&clientbook(&dir, &["machine", "list"]));
    assert!(machines.contains("1\tSN-1\tMower"), "stdout: {machines}");

    assert_ok(&clientbook(
        &dir,
        &[
            "repair",
            "add",
            "--machine",
            "1",
            "--description",
            "Belt",
            "--price",
            "12.5",
            "--date",
            "2024-03-09",
        ],
    ));
    let open = assert_ok(&clientbook(&dir, &["repair", "list", "--machine", "1"]));
    assert!(open.contains("2024-03-09\tBelt\t12.50\topen"), "stdout: {open}");

    assert_ok(&clientbook(&dir, &["repair", "done", "1"]));
    let done = assert_ok(&clientbook(&dir, &["repair", "list", "--machine", "1"]));
    assert!(done.contains("\tdone"), "stdout: {done}");

    let bad_date = clientbook(
        &dir,
        &[
            "repair",
            "add",
            "--machine",
            "1",
            "--description",
            "x",
            "--date",
            "09/03/2024",
        ],
    );
    assert!(!bad_date.status.success());
    assert!(stderr(&bad_date).contains("Invalid date"));

    assert_ok(&clientbook(&dir, &["machine", "remove", "1"]));
    let after = assert_ok(&clientbook(&dir, &["repair", "list", "--machine", "1"]));
    assert!(after.trim().is_empty(), "stdout: {after}");
}

// ---------------------------------------------------------------------------
// config command
// ---------------------------------------------------------------------------

#[test]
fn config_init_refuses_to_overwrite() {
    let dir = TempDir::new("config_init");
    let target = dir.join("new.yml");

    assert_ok(&clientbook(&dir, &["config", "init", target.to_str().unwrap()]));
    let written = fs::read_to_string(&target).unwrap();
    assert!(written.contains("clientsDatabase.db"), "config: {written}");

    let again = clientbook(&dir, &["config", "init", target.to_str().unwrap()]);
    assert!(!again.status.success());
    assert!(stderr(&again).contains("already exists"));

    assert_ok(&clientbook(
        &dir,
        &["config", "init", target.to_str().unwrap(), "--force"],
    ));
}

#[test]
fn missing_config_file_is_an_error() {
    let dir = TempDir::new("config_missing");
    let out = std::process::Command::new(env!("CARGO_BIN_EXE_clientbook"))
        .args(["--config", dir.join("absent.yml").to_str().unwrap(), "status"])
        .output()
        .expect("failed to run clientbook");
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("Failed to load config"));
}
