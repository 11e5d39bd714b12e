use std::path::PathBuf;
use std::process::{Command, Output};

use serde_json::Value;

fn unique_temp_db_path() -> PathBuf {
    std::env::temp_dir().join(format!("larder-cli-{}.sqlite3", ulid::Ulid::new()))
}

fn run_cli(db_path: &PathBuf, args: &[&str]) -> Output {
    let output = Command::new(env!("CARGO_BIN_EXE_larder"))
        .arg("--db")
        .arg(db_path)
        .args(args)
        .output();
    match output {
        Ok(output) => output,
        Err(err) => panic!("failed to spawn larder binary: {err}"),
    }
}

fn run_cli_json(db_path: &PathBuf, args: &[&str]) -> Value {
    let output = run_cli(db_path, args);
    assert!(
        output.status.success(),
        "command {args:?} failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    match serde_json::from_slice(&output.stdout) {
        Ok(value) => value,
        Err(err) => panic!(
            "command {args:?} emitted invalid JSON ({err}): {}",
            String::from_utf8_lossy(&output.stdout)
        ),
    }
}

fn string_field<'a>(value: &'a Value, field: &str) -> &'a str {
    match value.get(field).and_then(Value::as_str) {
        Some(raw) => raw,
        None => panic!("expected string field {field} in {value}"),
    }
}

#[test]
fn item_add_list_get_round_trip() {
    let db_path = unique_temp_db_path();

    let created = run_cli_json(
        &db_path,
        &[
            "item",
            "add",
            "--title",
            "Chicken thighs",
            "--quantity",
            "4",
            "--unit",
            "pcs",
            "--expires-on",
            "2027-01-15",
        ],
    );
    assert_eq!(created["contract_version"], "cli.v1");
    assert_eq!(created["title"], "Chicken thighs");
    assert_eq!(created["expires_on"], "2027-01-15");
    let id = string_field(&created, "id").to_string();

    let listed = run_cli_json(&db_path, &["item", "list", "--search", "chicken"]);
    assert_eq!(listed["count"], 1);
    assert_eq!(listed["items"][0]["id"], id.as_str());

    let fetched = run_cli_json(&db_path, &["item", "get", "--id", &id]);
    assert_eq!(fetched["title"], "Chicken thighs");
    assert_eq!(fetched["category"], "Uncategorized");

    let _ = std::fs::remove_file(&db_path);
}

#[test]
fn use_discard_and_history_flow() {
    let db_path = unique_temp_db_path();

    let created = run_cli_json(
        &db_path,
        &["item", "add", "--title", "Milk", "--quantity", "2", "--unit", "l"],
    );
    let id = string_field(&created, "id").to_string();

    let used = run_cli_json(
        &db_path,
        &["item", "use", "--id", &id, "--amount", "0.5", "--notes", "porridge"],
    );
    assert_eq!(used["found"], true);
    let remaining = match used["item"]["quantity"].as_f64() {
        Some(quantity) => quantity,
        None => panic!("use output should carry the updated quantity"),
    };
    assert!((remaining - 1.5).abs() < f64::EPSILON);

    let discarded = run_cli_json(&db_path, &["item", "discard", "--id", &id, "--action", "expired"]);
    let after_discard = match discarded["quantity"].as_f64() {
        Some(quantity) => quantity,
        None => panic!("discard output should carry the updated quantity"),
    };
    assert!(after_discard.abs() < f64::EPSILON);

    let history = run_cli_json(&db_path, &["history", "--item-id", &id]);
    assert_eq!(history["count"], 2);
    assert_eq!(history["records"][0]["action"], "expired");
    assert_eq!(history["records"][1]["action"], "used");
    assert_eq!(history["records"][1]["notes"], "porridge");

    let only_used = run_cli_json(&db_path, &["history", "--action", "used", "--days", "1"]);
    assert_eq!(only_used["count"], 1);

    // Using a ghost id succeeds without recording anything.
    let ghost = run_cli_json(
        &db_path,
        &["item", "use", "--id", &ulid::Ulid::new().to_string(), "--amount", "1"],
    );
    assert_eq!(ghost["found"], false);
    assert!(ghost["item"].is_null());

    let _ = std::fs::remove_file(&db_path);
}

#[test]
fn location_add_reorder_and_counts() {
    let db_path = unique_temp_db_path();

    let garage = run_cli_json(
        &db_path,
        &["location", "add", "--name", "Garage Freezer", "--kind", "freezer"],
    );
    let garage_id = string_field(&garage, "id").to_string();
    assert_eq!(garage["kind"], "freezer");
    assert_eq!(garage["visible"], true);

    let listed = run_cli_json(&db_path, &["location", "list"]);
    assert_eq!(listed["count"], 2);
    let seeded_id = {
        let locations = match listed["locations"].as_array() {
            Some(locations) => locations,
            None => panic!("location list should be an array"),
        };
        let seeded = match locations.iter().find(|entry| entry["id"] != garage_id.as_str()) {
            Some(entry) => entry,
            None => panic!("seeded location should exist"),
        };
        string_field(seeded, "id").to_string()
    };

    let reordered = run_cli_json(
        &db_path,
        &["location", "reorder", "--id", &garage_id, "--id", &seeded_id],
    );
    assert_eq!(reordered["locations"][0]["id"], garage_id.as_str());
    assert_eq!(reordered["locations"][0]["sort_order"], 1);
    assert_eq!(reordered["locations"][1]["sort_order"], 2);

    let counts = run_cli_json(&db_path, &["location", "counts"]);
    assert_eq!(counts["count"], 2);
    assert_eq!(counts["locations"][0]["items"], 0);

    let _ = std::fs::remove_file(&db_path);
}

#[test]
fn db_commands_report_schema_state() {
    let db_path = unique_temp_db_path();

    let planned = run_cli_json(&db_path, &["db", "migrate", "--dry-run"]);
    assert_eq!(planned["dry_run"], true);
    assert_eq!(planned["current_version"], 0);
    assert_eq!(planned["would_apply_versions"][0], 1);

    let applied = run_cli_json(&db_path, &["db", "migrate"]);
    assert_eq!(applied["after_version"], 1);
    assert_eq!(applied["up_to_date"], true);

    let status = run_cli_json(&db_path, &["db", "schema-version"]);
    assert_eq!(status["current_version"], 1);
    assert_eq!(status["up_to_date"], true);

    let report = run_cli_json(&db_path, &["db", "integrity-check"]);
    assert_eq!(report["quick_check_ok"], true);

    let _ = std::fs::remove_file(&db_path);
}

#[test]
fn export_backup_and_restore() {
    let db_path = unique_temp_db_path();
    let backup_path = std::env::temp_dir().join(format!("larder-cli-{}.backup", ulid::Ulid::new()));

    run_cli_json(&db_path, &["item", "add", "--title", "Flour", "--quantity", "1"]);

    let exported = run_cli_json(&db_path, &["item", "export"]);
    assert_eq!(exported["count"], 1);

    let backup_out = backup_path.to_string_lossy().to_string();
    let backup = run_cli_json(&db_path, &["db", "backup", "--out", &backup_out]);
    assert_eq!(backup["status"], "ok");

    // Drop the item, then restore the snapshot taken before the deletion.
    let id = string_field(&exported["items"][0], "id").to_string();
    run_cli_json(&db_path, &["item", "delete", "--id", &id]);
    assert_eq!(run_cli_json(&db_path, &["item", "export"])["count"], 0);

    let restored = run_cli_json(&db_path, &["db", "restore", "--in", &backup_out]);
    assert_eq!(restored["current_version"], 1);
    assert_eq!(run_cli_json(&db_path, &["item", "export"])["count"], 1);

    let _ = std::fs::remove_file(&db_path);
    let _ = std::fs::remove_file(&backup_path);
}

#[test]
fn blank_title_fails_with_nonzero_exit() {
    let db_path = unique_temp_db_path();

    let output = run_cli(&db_path, &["item", "add", "--title", "   "]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("title"), "stderr should mention the title: {stderr}");

    let _ = std::fs::remove_file(&db_path);
}

#[test]
fn stats_and_categories_are_available_on_a_fresh_database() {
    let db_path = unique_temp_db_path();

    let stats = run_cli_json(&db_path, &["stats"]);
    assert_eq!(stats["contract_version"], "cli.v1");
    assert_eq!(stats["total_items"], 0);
    assert_eq!(stats["locations"].as_array().map(Vec::len), Some(1));

    let categories = run_cli_json(&db_path, &["category", "list"]);
    assert_eq!(categories["count"], 20);

    let _ = std::fs::remove_file(&db_path);
}
