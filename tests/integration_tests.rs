//! Integration tests: CLI smoke tests and end-to-end runs of the binary.

mod common;

use std::fs;

use serde_json::Value;

const CLOCK_AND_MISSING_WIFI: &str = r#"
[status]
unknown_str = "n/a"

[[status.args]]
function = "wifi_essid"
format = "<%s>"
argument = "slhnope0"

[[status.args]]
function = "datetime"
format = "[%s]"
argument = "%Y"
"#;

fn parse_json_line(stdout: &str) -> Value {
    let line = stdout.lines().next().unwrap_or_default();
    serde_json::from_str(line).unwrap_or_else(|e| panic!("invalid JSON {line:?}: {e}"))
}

fn is_year_stamp(text: &str) -> bool {
    text.len() == 6
        && text.starts_with('[')
        && text.ends_with(']')
        && text[1..5].chars().all(|c| c.is_ascii_digit())
}

#[test]
fn help_command_prints_usage() {
    let result = common::run_cli_case("help_command_prints_usage", &["--help"]);
    assert!(
        result.status.success(),
        "expected success; log: {}",
        result.log_path.display()
    );
    assert!(
        result.stdout.contains("Usage: slh [OPTIONS] <COMMAND>"),
        "missing help banner; log: {}",
        result.log_path.display()
    );
}

#[test]
fn subcommand_help_flags_work() {
    for sub in ["run", "check", "config", "version", "completions"] {
        let result = common::run_cli_case(&format!("help_{sub}"), &[sub, "--help"]);
        assert!(
            result.status.success(),
            "{sub} --help failed; log: {}",
            result.log_path.display()
        );
    }
}

#[test]
fn version_json_names_binary() {
    let result = common::run_cli_case("version_json_names_binary", &["version", "--json"]);
    assert!(result.status.success(), "log: {}", result.log_path.display());
    let payload = parse_json_line(&result.stdout);
    assert_eq!(payload["binary"], "slh");
    assert_eq!(payload["version"], env!("CARGO_PKG_VERSION"));
}

#[test]
fn run_once_prints_one_line_with_placeholder() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::write_config(dir.path(), CLOCK_AND_MISSING_WIFI);
    let result = common::run_cli_case(
        "run_once_prints_one_line_with_placeholder",
        &["run", "--once", "--config", config.to_str().unwrap()],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());

    let lines: Vec<&str> = result.stdout.lines().collect();
    assert_eq!(lines.len(), 1, "log: {}", result.log_path.display());
    let line = lines[0];
    assert!(line.starts_with("<n/a>"), "line: {line:?}");
    assert!(is_year_stamp(&line["<n/a>".len()..]), "line: {line:?}");
}

#[test]
fn env_override_changes_placeholder() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::write_config(dir.path(), CLOCK_AND_MISSING_WIFI);
    let result = common::run_cli_case_with_env(
        "env_override_changes_placeholder",
        &["run", "--once", "--config", config.to_str().unwrap()],
        &[("SLH_UNKNOWN_STR", "--")],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    assert!(result.stdout.starts_with("<-->"), "stdout: {:?}", result.stdout);
}

#[test]
fn max_len_truncates_line() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::write_config(
        dir.path(),
        "[status]\nmax_len = 5\n\n[[status.args]]\nfunction = \"datetime\"\nformat = \"[%s]\"\nargument = \"%Y\"\n",
    );
    let result = common::run_cli_case(
        "max_len_truncates_line",
        &["run", "--once", "--config", config.to_str().unwrap()],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    let line = result.stdout.trim_end_matches('\n');
    assert_eq!(line.len(), 4, "line: {line:?}");
    assert!(line.starts_with('['));
}

#[test]
fn blank_env_values_keep_builtin_table() {
    let result = common::run_cli_case_with_env(
        "blank_env_values_keep_builtin_table",
        &["config", "show", "--json"],
        &[("SLH_INTERVAL_MS", "  "), ("SLH_UNKNOWN_STR", "")],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    let payload = parse_json_line(&result.stdout);
    assert_eq!(payload["config"]["status"]["interval_ms"], 1000);
    assert_eq!(payload["config"]["status"]["unknown_str"], "n/a");
}

#[test]
fn bad_env_number_is_user_error() {
    let result = common::run_cli_case_with_env(
        "bad_env_number_is_user_error",
        &["run", "--once"],
        &[("SLH_INTERVAL_MS", "soon")],
    );
    assert_eq!(result.status.code(), Some(1), "log: {}", result.log_path.display());
    assert!(result.stderr.contains("SLH-1003"), "stderr: {}", result.stderr);
}

#[test]
fn missing_explicit_config_is_user_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");
    let result = common::run_cli_case(
        "missing_explicit_config_is_user_error",
        &["run", "--once", "--config", missing.to_str().unwrap()],
    );
    assert_eq!(result.status.code(), Some(1), "log: {}", result.log_path.display());
    assert!(result.stderr.contains("SLH-1002"));
}

#[test]
fn config_validate_accepts_good_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::write_config(dir.path(), CLOCK_AND_MISSING_WIFI);
    let result = common::run_cli_case(
        "config_validate_accepts_good_file",
        &["config", "validate", "--json", "--config", config.to_str().unwrap()],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    let payload = parse_json_line(&result.stdout);
    assert_eq!(payload["valid"], true);
    assert_eq!(payload["records"], 2);
    assert_eq!(payload["hash"].as_str().map(str::len), Some(16));
}

#[test]
fn config_validate_rejects_two_slot_template() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::write_config(
        dir.path(),
        "[[status.args]]\nfunction = \"ram_perc\"\nformat = \"%s %s\"\n",
    );
    let result = common::run_cli_case(
        "config_validate_rejects_two_slot_template",
        &["config", "validate", "--json", "--config", config.to_str().unwrap()],
    );
    assert_eq!(result.status.code(), Some(1), "log: {}", result.log_path.display());
    let payload = parse_json_line(&result.stdout);
    assert_eq!(payload["valid"], false);
    assert_eq!(payload["error_code"], "SLH-1001");
}

#[test]
fn config_show_without_file_is_builtin_table() {
    let result = common::run_cli_case(
        "config_show_without_file_is_builtin_table",
        &["config", "show", "--json"],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    let payload = parse_json_line(&result.stdout);
    let status = &payload["config"]["status"];
    assert_eq!(status["interval_ms"], 1000);
    assert_eq!(status["unknown_str"], "n/a");
    assert_eq!(status["max_len"], 2048);
    let functions: Vec<&str> = status["args"]
        .as_array()
        .unwrap()
        .iter()
        .map(|record| record["function"].as_str().unwrap())
        .collect();
    assert_eq!(functions, ["cpu_perc", "ram_perc", "wifi_essid", "datetime"]);
}

#[test]
fn config_diff_human_without_file() {
    let result = common::run_cli_case_with_env(
        "config_diff_human_without_file",
        &["config", "diff"],
        &[("SLH_OUTPUT_FORMAT", "human")],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    assert!(result.stdout.contains("No differences from defaults."));
}

#[test]
fn check_reports_each_record() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::write_config(dir.path(), CLOCK_AND_MISSING_WIFI);
    let result = common::run_cli_case(
        "check_reports_each_record",
        &["check", "--json", "--config", config.to_str().unwrap()],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());

    let payload = parse_json_line(&result.stdout);
    let records = payload["records"].as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["function"], "wifi_essid");
    assert_eq!(records[0]["available"], false);
    assert_eq!(records[0]["error_code"], "SLH-2001");
    assert_eq!(records[1]["function"], "datetime");
    assert_eq!(records[1]["available"], true);
    assert_eq!(payload["unavailable"], 1);
}

#[test]
fn activity_log_records_start_and_stop() {
    let dir = tempfile::tempdir().unwrap();
    let config = common::write_config(dir.path(), CLOCK_AND_MISSING_WIFI);
    let log = dir.path().join("logs").join("activity.jsonl");
    let result = common::run_cli_case_with_env(
        "activity_log_records_start_and_stop",
        &["run", "--once", "--config", config.to_str().unwrap()],
        &[
            ("SLH_LOG_ENABLED", "true"),
            ("SLH_LOG_PATH", log.to_str().unwrap()),
        ],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());

    let contents = fs::read_to_string(&log).unwrap();
    let events: Vec<String> = contents
        .lines()
        .map(|line| {
            let value: Value = serde_json::from_str(line).unwrap();
            value["event"].as_str().unwrap().to_string()
        })
        .collect();
    assert_eq!(events.first().map(String::as_str), Some("daemon_start"));
    assert_eq!(events.last().map(String::as_str), Some("daemon_stop"));
}

#[test]
fn completions_generate_for_bash() {
    let result = common::run_cli_case("completions_generate_for_bash", &["completions", "bash"]);
    assert!(result.status.success(), "log: {}", result.log_path.display());
    assert!(result.stdout.contains("slh"));
}
