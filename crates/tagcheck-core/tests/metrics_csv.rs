//! End-to-end: evaluation CSV on disk → observations → report CSV on disk.

use std::path::Path;

use tagcheck_core::dataset::{load_observations, Table};
use tagcheck_core::metrics::{default_report_path, DuplicatePolicy, MetricsReport};

fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn run(input: &Path, policy: DuplicatePolicy) -> (MetricsReport, String) {
    let table = Table::read(input).unwrap();
    let loaded = load_observations(&table, "tag_gt", "inference_result").unwrap();
    let report = MetricsReport::compute(&loaded.observations, policy);

    let output = default_report_path(input);
    report.save(&output).unwrap();
    let written = std::fs::read_to_string(&output).unwrap();
    (report, written)
}

#[test]
fn report_written_next_to_input() {
    let dir = tempfile::tempdir().unwrap();
    let input = write(
        dir.path(),
        "results.csv",
        "image,tag_gt,inference_result\n\
         1.jpg,A,B\n\
         2.jpg,B,B\n",
    );

    let (_, written) = run(&input, DuplicatePolicy::Deduplicate);

    assert!(dir.path().join("results_metric.csv").exists());
    assert_eq!(
        written,
        "Label,Precision,Recall,TP,FP,FN\n\
         A,0.0,0.0,0,0,1\n\
         B,0.5,1.0,1,1,0\n"
    );
}

#[test]
fn multi_label_hit_with_unknown_label() {
    let dir = tempfile::tempdir().unwrap();
    let input = write(
        dir.path(),
        "eval.csv",
        "tag_gt,inference_result\n\
         刀具,\"刀具, 未知标签\"\n\
         充电宝,\n",
    );

    let (report, written) = run(&input, DuplicatePolicy::Deduplicate);

    assert_eq!(report.observations, 2);
    assert_eq!(report.rows.len(), 2);
    assert!(!written.contains("未知标签"));
    let knife = report.rows.iter().find(|r| r.label == "刀具").unwrap();
    assert_eq!((knife.true_positives, knife.false_positives, knife.false_negatives), (1, 0, 0));
    let power_bank = report.rows.iter().find(|r| r.label == "充电宝").unwrap();
    assert_eq!(power_bank.false_negatives, 1);
    assert_eq!(power_bank.recall, 0.0);
}

#[test]
fn blank_ground_truth_rows_are_not_labels() {
    let dir = tempfile::tempdir().unwrap();
    let input = write(
        dir.path(),
        "eval.csv",
        "tag_gt,inference_result\n  ,A\nA,A\n",
    );

    let table = Table::read(&input).unwrap();
    let loaded = load_observations(&table, "tag_gt", "inference_result").unwrap();
    assert_eq!(loaded.skipped, 1);

    let (report, _) = run(&input, DuplicatePolicy::Deduplicate);
    assert_eq!(report.rows.len(), 1);
    assert_eq!(report.rows[0].label, "A");
    assert_eq!(report.rows[0].precision, 1.0);
}

#[test]
fn duplicate_tokens_depend_on_policy() {
    let dir = tempfile::tempdir().unwrap();
    let input = write(
        dir.path(),
        "dup.csv",
        "tag_gt,inference_result\nA,\"B,B\"\nB,B\n",
    );

    let (dedup, _) = run(&input, DuplicatePolicy::Deduplicate);
    let (per_occurrence, _) = run(&input, DuplicatePolicy::PerOccurrence);

    let fp = |report: &MetricsReport| {
        report
            .rows
            .iter()
            .find(|r| r.label == "B")
            .map(|r| r.false_positives)
            .unwrap()
    };
    assert_eq!(fp(&dedup), 1);
    assert_eq!(fp(&per_occurrence), 2);
}

#[test]
fn empty_table_still_has_header() {
    let dir = tempfile::tempdir().unwrap();
    let input = write(dir.path(), "empty.csv", "tag_gt,inference_result\n");

    let (report, written) = run(&input, DuplicatePolicy::Deduplicate);
    assert!(report.rows.is_empty());
    assert_eq!(written, "Label,Precision,Recall,TP,FP,FN\n");
}

#[test]
fn missing_column_names_available_headers() {
    let dir = tempfile::tempdir().unwrap();
    let input = write(dir.path(), "bad.csv", "label,prediction\nA,A\n");

    let table = Table::read(&input).unwrap();
    let err = load_observations(&table, "tag_gt", "inference_result").unwrap_err();
    assert_eq!(
        err.to_string(),
        "Column 'tag_gt' not found. Available columns: [label, prediction]"
    );
}
