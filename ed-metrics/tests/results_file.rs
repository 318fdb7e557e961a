use edsim_metrics::{export_csv, export_json, read_results, GroupedSamples, MetricsError};
use std::fs;

fn temp_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("edsim_metrics_{}_{}", std::process::id(), name))
}

#[test]
fn grouped_samples_to_results_file_and_back() {
    let path = temp_path("runs.csv");
    fs::remove_file(&path).ok();

    for run in 0..3 {
        let mut samples = GroupedSamples::new();
        for key in 1..=4u8 {
            samples.declare(key);
        }
        samples.record(1, 35.0 + run as f64);
        samples.record(1, 45.0);
        samples.record(4, 32.5);

        let summary = samples.summarize(|k| format!("Type {k}")).unwrap();
        export_csv(&summary, &path).unwrap();
    }

    let rows = read_results(&path).unwrap();
    assert_eq!(rows.len(), 3);
    for row in &rows {
        assert_eq!(row.groups.len(), 4);
        assert_eq!(row.groups[0].0, 2);
        assert_eq!(row.groups[1], (0, 0.0));
        assert_eq!(row.groups[2], (0, 0.0));
        assert_eq!(row.groups[3], (1, 32.5));
    }
    assert_eq!(rows[0].groups[0].1, 40.0);
    assert_eq!(rows[2].groups[0].1, 41.0);

    let content = fs::read_to_string(&path).unwrap();
    assert_eq!(content.matches("Overall Average Time").count(), 1);
    assert!(content.lines().nth(1).unwrap().contains(','));

    fs::remove_file(&path).ok();
}

#[test]
fn empty_run_cannot_be_summarized() {
    let mut samples = GroupedSamples::new();
    samples.declare(1u8);
    let err = samples.summarize(|k| k.to_string()).unwrap_err();
    assert!(matches!(err, MetricsError::EmptySample(_)));
    assert!(err.to_string().contains("empty sample"));
}

#[test]
fn json_export_writes_any_serializable_value() {
    let path = temp_path("nested/dir/value.json");
    export_json(&vec![1, 2, 3], &path, false).unwrap();
    assert_eq!(fs::read_to_string(&path).unwrap(), "[1,2,3]");
    fs::remove_dir_all(std::env::temp_dir().join(format!("edsim_metrics_{}_nested", std::process::id()))).ok();
}

#[test]
fn missing_results_file_is_an_io_error() {
    let err = read_results(temp_path("does_not_exist.csv")).unwrap_err();
    assert!(matches!(err, MetricsError::Io(_)));
}
