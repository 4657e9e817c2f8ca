// src/regression.rs
use serde_json::Value;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use crate::config::RunConfig;
use crate::utils::error::RegressionError;

/// Issues printed before the remainder is summarized.
pub const MAX_REPORTED_ISSUES: usize = 20;

const RULE: &str = "======================================================================";

fn record_id(record: &Value) -> String {
    ["employee_id", "shain_id"]
        .iter()
        .find_map(|key| record.get(*key))
        .map(display_value)
        .unwrap_or_else(|| "unknown".to_string())
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn keys_of(record: &Value) -> BTreeSet<&str> {
    record
        .as_object()
        .map(|map| map.keys().map(String::as_str).collect())
        .unwrap_or_default()
}

/// Positional, exact comparison of two record lists.
///
/// A count mismatch is reported alone. Otherwise each position reports its
/// missing keys, extra keys, then every shared key whose values differ.
pub fn compare_records(actual: &[Value], expected: &[Value]) -> Vec<String> {
    let mut issues = Vec::new();

    if actual.len() != expected.len() {
        issues.push(format!(
            "Record count mismatch: got {}, expected {}",
            actual.len(),
            expected.len()
        ));
        return issues;
    }

    for (act, exp) in actual.iter().zip(expected) {
        let id = record_id(act);
        let act_keys = keys_of(act);
        let exp_keys = keys_of(exp);

        let missing: Vec<&str> = exp_keys.difference(&act_keys).copied().collect();
        let extra: Vec<&str> = act_keys.difference(&exp_keys).copied().collect();
        if !missing.is_empty() {
            issues.push(format!("Employee {}: Missing keys {:?}", id, missing));
        }
        if !extra.is_empty() {
            issues.push(format!("Employee {}: Extra keys {:?}", id, extra));
        }

        for key in exp_keys.intersection(&act_keys) {
            let (Some(got), Some(want)) = (act.get(*key), exp.get(*key)) else {
                continue;
            };
            if got != want {
                issues.push(format!(
                    "Employee {}, field '{}': got {}, expected {}",
                    id,
                    key,
                    display_value(got),
                    display_value(want)
                ));
            }
        }
    }

    issues
}

fn load_records(path: &Path) -> Result<Vec<Value>, RegressionError> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|source| RegressionError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// The report body for a list of issues, capped at [`MAX_REPORTED_ISSUES`].
pub fn format_report(issues: &[String]) -> String {
    let mut out = format!("{}\nFOUND {} ISSUES:\n{}\n", RULE, issues.len(), RULE);
    for issue in issues.iter().take(MAX_REPORTED_ISSUES) {
        out.push_str(&format!("  • {}\n", issue));
    }
    if issues.len() > MAX_REPORTED_ISSUES {
        out.push_str(&format!(
            "\n  ... and {} more issues\n",
            issues.len() - MAX_REPORTED_ISSUES
        ));
    }
    out
}

/// Compares the last extraction output with the checked-in reference.
/// Returns whether both match.
pub fn run(config: &RunConfig) -> Result<bool, RegressionError> {
    let actual_path = config.output_json();
    let expected_path = config.reference_json();

    println!("\n{}\nTESTING {} PARSER\n{}\n", RULE, config.kind.as_str().to_uppercase(), RULE);

    if !actual_path.exists() {
        return Err(RegressionError::ActualMissing(actual_path));
    }
    if !expected_path.exists() {
        return Err(RegressionError::ReferenceMissing(expected_path));
    }

    let actual = load_records(&actual_path)?;
    let expected = load_records(&expected_path)?;
    println!("Loaded {} actual records", actual.len());
    println!("Loaded {} expected records\n", expected.len());

    let issues = compare_records(&actual, &expected);
    if issues.is_empty() {
        println!("{}\nALL TESTS PASSED!\n{}", RULE, RULE);
        println!("Structure and data match perfectly with {}", expected_path.display());
        return Ok(true);
    }

    tracing::warn!("Regression check found {} issues", issues.len());
    print!("{}", format_report(&issues));
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DocumentKind, FieldLayout};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::path::PathBuf;

    #[test]
    fn test_identical_records_have_no_issues() {
        let records = vec![json!({"employee_id": "123456", "kei": 1000})];
        assert!(compare_records(&records, &records.clone()).is_empty());
    }

    #[test]
    fn test_count_mismatch_stops_comparison() {
        let actual = vec![json!({"shain_id": "1"})];
        let expected = vec![json!({"shain_id": "1"}), json!({"shain_id": "2"})];
        assert_eq!(
            compare_records(&actual, &expected),
            vec!["Record count mismatch: got 1, expected 2".to_string()]
        );
    }

    #[test]
    fn test_single_field_difference() {
        let actual = vec![json!({
            "employee_id": "123456",
            "kihon_kyu": {"count": 22, "amount": 185000},
            "kei": 250000
        })];
        let expected = vec![json!({
            "employee_id": "123456",
            "kihon_kyu": {"count": 22, "amount": 185000},
            "kei": 251000
        })];
        assert_eq!(
            compare_records(&actual, &expected),
            vec!["Employee 123456, field 'kei': got 250000, expected 251000".to_string()]
        );
    }

    #[test]
    fn test_key_set_differences() {
        let actual = vec![json!({"shain_id": "654321", "shimei": "田中 太郎", "lorry_a": "5"})];
        let expected = vec![json!({"shain_id": "654321", "shimei": "田中 太郎", "gokei": "5"})];
        assert_eq!(
            compare_records(&actual, &expected),
            vec![
                "Employee 654321: Missing keys [\"gokei\"]".to_string(),
                "Employee 654321: Extra keys [\"lorry_a\"]".to_string(),
            ]
        );
    }

    #[test]
    fn test_unknown_id() {
        let issues = compare_records(&[json!({"a": 1})], &[json!({"a": 2})]);
        assert_eq!(issues, vec!["Employee unknown, field 'a': got 1, expected 2".to_string()]);
    }

    #[test]
    fn test_report_caps_issues() {
        let issues: Vec<String> = (0..23).map(|i| format!("issue {}", i)).collect();
        let report = format_report(&issues);
        assert!(report.contains("FOUND 23 ISSUES"));
        assert!(report.contains("  • issue 19\n"));
        assert!(!report.contains("issue 20\n"));
        assert!(report.ends_with("... and 3 more issues\n"));
    }

    fn config_in(dir: &Path) -> RunConfig {
        RunConfig {
            kind: DocumentKind::Allowance,
            input: PathBuf::from("unused.pdf"),
            output_dir: dir.to_path_buf(),
            pages: "all".to_string(),
            layout: FieldLayout::default(),
            camelot: "camelot".to_string(),
        }
    }

    #[test]
    fn test_run_requires_actual_output() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        assert!(matches!(run(&config), Err(RegressionError::ActualMissing(_))));
    }

    #[test]
    fn test_run_reports_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        fs::create_dir_all(config.output_folder()).unwrap();
        fs::write(config.output_json(), r#"[{"shain_id": "123456", "gokei": "100"}]"#).unwrap();
        fs::write(config.reference_json(), r#"[{"shain_id": "123456", "gokei": "100"}]"#).unwrap();
        assert!(run(&config).unwrap());

        fs::write(config.reference_json(), r#"[{"shain_id": "123456", "gokei": "200"}]"#).unwrap();
        assert!(!run(&config).unwrap());
    }
}
