//! Integration tests for the casebook CLI
//!
//! These tests exercise the CLI commands end-to-end using assert_cmd.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Helper to get a casebook command isolated from the caller's environment
fn casebook() -> Command {
    let mut cmd = Command::cargo_bin("casebook").unwrap();
    cmd.env_remove("CASEBOOK_USER").env_remove("CASEBOOK_LOG");
    cmd
}

/// Helper to run a command in the project and return trimmed stdout
fn stdout_of(tmp: &TempDir, args: &[&str]) -> String {
    let output = casebook()
        .current_dir(tmp.path())
        .args(args)
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "command {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

fn add_member(tmp: &TempDir, username: &str, roles: &str, extra: &[&str]) {
    let email = format!("{}@example.com", username);
    let mut args = vec![
        "team",
        "add",
        "--name",
        username,
        "--email",
        email.as_str(),
        "--username",
        username,
        "--roles",
        roles,
    ];
    args.extend_from_slice(extra);
    casebook()
        .current_dir(tmp.path())
        .args(&args)
        .assert()
        .success();
}

/// A project with three roster members, two products and one test case
struct TestProject {
    tmp: TempDir,
    case_id: String,
}

fn setup_test_project() -> TestProject {
    let tmp = TempDir::new().unwrap();
    casebook().current_dir(tmp.path()).arg("init").assert().success();

    add_member(&tmp, "admin", "admin", &[]);
    add_member(
        &tmp,
        "restricted",
        "engineering",
        &["--revoke", "testcases.delete_testcasetag"],
    );
    add_member(&tmp, "viewer", "management", &[]);

    stdout_of(&tmp, &["new", "product", "StarCraft"]);
    stdout_of(&tmp, &["new", "product", "Diablo"]);
    stdout_of(&tmp, &["new", "component", "-p", "StarCraft", "engine"]);
    stdout_of(&tmp, &["new", "component", "-p", "Diablo", "townportal"]);
    let case_id = stdout_of(
        &tmp,
        &["new", "case", "-p", "StarCraft", "Build a pylon", "-f", "id"],
    );

    TestProject { tmp, case_id }
}

impl TestProject {
    fn call(&self, user: &str, method: &str, params: &str) -> assert_cmd::assert::Assert {
        casebook()
            .current_dir(self.tmp.path())
            .args(["call", "--user", user, method, params])
            .assert()
    }

    fn params(&self, rest: &str) -> String {
        if rest.is_empty() {
            format!("[{}]", self.case_id)
        } else {
            format!("[{}, {}]", self.case_id, rest)
        }
    }
}

// ============================================================================
// Basic CLI
// ============================================================================

#[test]
fn test_help_displays() {
    casebook()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("casebook"))
        .stdout(predicate::str::contains("call"));
}

#[test]
fn test_call_help_lists_methods() {
    casebook()
        .args(["call", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("TestCase.add_tag"))
        .stdout(predicate::str::contains("TestCase.filter"));
}

#[test]
fn test_init_creates_project_files() {
    let tmp = TempDir::new().unwrap();
    casebook()
        .current_dir(tmp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized casebook project"));

    assert!(tmp.path().join(".casebook/config.yaml").is_file());
    assert!(tmp.path().join(".casebook/team.yaml").is_file());
    assert!(tmp.path().join(".casebook/casebook.db").is_file());
}

#[test]
fn test_init_twice_warns() {
    let tmp = TempDir::new().unwrap();
    casebook().current_dir(tmp.path()).arg("init").assert().success();
    casebook()
        .current_dir(tmp.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn test_call_outside_project_fails() {
    let tmp = TempDir::new().unwrap();
    casebook()
        .current_dir(tmp.path())
        .args(["call", "--user", "admin", "TestCase.filter", "[{}]"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Not a casebook project"));
}

#[test]
fn test_completions_bash() {
    casebook()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("casebook"));
}

// ============================================================================
// RPC calls
// ============================================================================

#[test]
fn test_update_returns_record() {
    let project = setup_test_project();
    project
        .call(
            "admin",
            "TestCase.update",
            &project.params(r#"{"summary": "This was updated", "text": "new TC text"}"#),
        )
        .success()
        .stdout(predicate::str::contains("This was updated"))
        .stdout(predicate::str::contains("new TC text"));
}

#[test]
fn test_update_rejects_unknown_field() {
    let project = setup_test_project();
    project
        .call("admin", "TestCase.update", &project.params(r#"{"priority": "P1"}"#))
        .failure()
        .stderr(predicate::str::contains("Invalid params"));
}

#[test]
fn test_add_tag_then_filter_by_tag() {
    let project = setup_test_project();
    project
        .call("admin", "TestCase.add_tag", &project.params(r#""smoke""#))
        .success();
    project
        .call("admin", "TestCase.add_tag", &project.params(r#""smoke""#))
        .success();

    let ids = stdout_of(&project.tmp, &["cases", "--tag", "smoke", "-f", "id"]);
    assert_eq!(ids, project.case_id);
}

#[test]
fn test_unauthorized_remove_tag_leaves_tag_attached() {
    let project = setup_test_project();
    project
        .call("admin", "TestCase.add_tag", &project.params(r#""smoke""#))
        .success();

    project
        .call("restricted", "TestCase.remove_tag", &project.params(r#""smoke""#))
        .failure()
        .stderr(predicate::str::contains("403 Forbidden"));

    let ids = stdout_of(&project.tmp, &["cases", "--tag", "smoke", "-f", "id"]);
    assert_eq!(ids, project.case_id);
}

#[test]
fn test_add_component_from_other_product_fails() {
    let project = setup_test_project();
    project
        .call(
            "admin",
            "TestCase.add_component",
            &project.params(r#""townportal""#),
        )
        .failure()
        .stderr(predicate::str::contains("Component matching query does not exist"));

    project
        .call("admin", "TestCase.get_components", &project.params(""))
        .success()
        .stdout(predicate::str::contains("[]"));
}

#[test]
fn test_add_component_same_product() {
    let project = setup_test_project();
    project
        .call("admin", "TestCase.add_component", &project.params(r#""engine""#))
        .success();

    project
        .call("viewer", "TestCase.get_components", &project.params(""))
        .success()
        .stdout(predicate::str::contains("engine"));
}

#[test]
fn test_remove_notification_cc() {
    let project = setup_test_project();
    project
        .call(
            "admin",
            "TestCase.add_notification_cc",
            &project.params(r#"["a@x.com"]"#),
        )
        .success();
    project
        .call("admin", "TestCase.get_notification_cc", &project.params(""))
        .success()
        .stdout(predicate::str::contains("a@x.com"));

    project
        .call(
            "admin",
            "TestCase.remove_notification_cc",
            &project.params(r#"["a@x.com"]"#),
        )
        .success();
    project
        .call("admin", "TestCase.get_notification_cc", &project.params(""))
        .success()
        .stdout(predicate::str::contains("a@x.com").not());
}

#[test]
fn test_viewer_cannot_change_case() {
    let project = setup_test_project();
    project
        .call(
            "viewer",
            "TestCase.add_notification_cc",
            &project.params(r#"["a@x.com"]"#),
        )
        .failure()
        .stderr(predicate::str::contains("403 Forbidden"));
}

#[test]
fn test_unknown_user_is_refused() {
    let project = setup_test_project();
    project
        .call("mallory", "TestCase.filter", "[{}]")
        .failure()
        .stderr(predicate::str::contains("not an active member"));
}

#[test]
fn test_unknown_method_fails() {
    let project = setup_test_project();
    project
        .call("admin", "TestCase.explode", "[]")
        .failure()
        .stderr(predicate::str::contains("Method not found"));
}

#[test]
fn test_filter_call_by_product_name() {
    let project = setup_test_project();
    project
        .call(
            "viewer",
            "TestCase.filter",
            r#"[{"category__product__name": "StarCraft"}]"#,
        )
        .success()
        .stdout(predicate::str::contains("Build a pylon"));

    project
        .call(
            "viewer",
            "TestCase.filter",
            r#"[{"category__product__name": "Diablo"}]"#,
        )
        .success()
        .stdout(predicate::str::contains("Build a pylon").not());
}

// ============================================================================
// Listing and batch
// ============================================================================

#[test]
fn test_cases_table() {
    let project = setup_test_project();
    casebook()
        .current_dir(project.tmp.path())
        .args(["cases", "--product-name", "StarCraft"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Build a pylon"))
        .stdout(predicate::str::contains("1 test case(s) found"));
}

#[test]
fn test_batch_reports_faults_in_order() {
    let project = setup_test_project();
    let input = format!(
        "{}\n{}\n{}\n",
        format!(
            r#"{{"id": 1, "user": "admin", "method": "TestCase.add_tag", "params": [{}, "smoke"]}}"#,
            project.case_id
        ),
        format!(
            r#"{{"id": 2, "user": "restricted", "method": "TestCase.remove_tag", "params": [{}, "smoke"]}}"#,
            project.case_id
        ),
        "not json",
    );

    let output = casebook()
        .current_dir(project.tmp.path())
        .arg("batch")
        .write_stdin(input)
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<serde_json::Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0]["id"], 1);
    assert!(lines[0].get("fault").is_none());
    assert_eq!(lines[1]["id"], 2);
    assert_eq!(lines[1]["fault"]["code"], 403);
    assert_eq!(lines[2]["fault"]["code"], 400);
}

#[test]
fn test_team_show_lists_permissions() {
    let project = setup_test_project();
    casebook()
        .current_dir(project.tmp.path())
        .args(["team", "show", "restricted", "-f", "json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("testcases.add_testcasetag"))
        .stdout(predicate::str::contains("testcases.delete_testcasetag").not());
}

#[test]
fn test_cases_uses_config_default_format() {
    let project = setup_test_project();
    let config_path = project.tmp.path().join(".casebook/config.yaml");
    let mut config = std::fs::read_to_string(&config_path).unwrap();
    config.push_str("\ndefault_format: json\n");
    std::fs::write(&config_path, config).unwrap();

    let stdout = stdout_of(&project.tmp, &["cases", "--product-name", "StarCraft"]);
    let cases: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(cases[0]["summary"], "Build a pylon");

    let table = stdout_of(&project.tmp, &["cases", "-f", "table"]);
    assert!(table.contains("| "));
}

// ============================================================================
// Creation and roster edge cases
// ============================================================================

#[test]
fn test_new_case_prints_json_record() {
    let project = setup_test_project();
    let stdout = stdout_of(
        &project.tmp,
        &["new", "case", "-p", "StarCraft", "Warp in a zealot", "-f", "json"],
    );
    let case: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    assert_eq!(case["summary"], "Warp in a zealot");
    assert!(case["id"].as_i64().is_some());
}

#[test]
fn test_new_case_rejects_blank_summary() {
    let project = setup_test_project();
    casebook()
        .current_dir(project.tmp.path())
        .args(["new", "case", "-p", "StarCraft", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Summary must not be empty"));

    let listing = stdout_of(&project.tmp, &["cases", "-f", "id"]);
    assert_eq!(listing.lines().count(), 1);
}

#[test]
fn test_team_add_refuses_malformed_roster() {
    let tmp = TempDir::new().unwrap();
    casebook().current_dir(tmp.path()).arg("init").assert().success();

    let team_path = tmp.path().join(".casebook/team.yaml");
    let roster = "\
members:
  - name: Admin
    email: admin@example.com
    username: admin
    roles: [admin]
  - name: QA
    email: qa@example.com
    username: qa
    roles: [quality]
    revocations: [testcases.delet_testcasetag]
";
    std::fs::write(&team_path, roster).unwrap();

    casebook()
        .current_dir(tmp.path())
        .args([
            "team", "add", "--name", "Newbie", "--email", "newbie@example.com", "--username",
            "newbie", "--roles", "engineering",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid team roster"));

    assert_eq!(std::fs::read_to_string(&team_path).unwrap(), roster);
}
