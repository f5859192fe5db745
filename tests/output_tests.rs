use hierprof::commands::{execute_compare, validate_report_file};
use hierprof::metrics::{ManualMetrics, MetricFlags};
use hierprof::output::{read_report, write_report, ReportDocument};
use hierprof::scenarios::{self, run_with_source};
use hierprof::session::{ProfilerOptions, ProfilerSession};
use hierprof::utils::error::OutputError;
use tempfile::tempdir;

fn document(name: &str, flags: MetricFlags) -> ReportDocument {
    let scenario = scenarios::find(name).unwrap();
    let report = run_with_source(scenario, flags, ManualMetrics::wall_ticks(5)).unwrap();
    ReportDocument::new(name, report)
}

#[test]
fn test_written_reports_are_byte_identical() {
    let dir = tempdir().unwrap();
    let first = dir.path().join("first.json");
    let second = dir.path().join("nested/second.json");

    write_report(&document("classes", MetricFlags::CPU), &first).unwrap();
    write_report(&document("classes", MetricFlags::CPU), &second).unwrap();

    assert_eq!(std::fs::read(&first).unwrap(), std::fs::read(&second).unwrap());
}

#[test]
fn test_written_report_reads_back() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bar-loop.json");
    let original = document("bar-loop", MetricFlags::MEMORY);

    write_report(&original, &path).unwrap();
    let loaded = read_report(&path).unwrap();

    assert_eq!(loaded, original);
    assert!(loaded.report.contains("bar@3==>bar@4"));
    validate_report_file(&path).unwrap();
}

#[test]
fn test_read_rejects_other_major_version() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("old.json");
    let mut doc = document("tracked", MetricFlags::NONE);
    doc.version = "0.9.0".to_string();
    write_report(&doc, &path).unwrap();

    match read_report(&path) {
        Err(OutputError::IncompatibleVersion { found, .. }) => assert_eq!(found, "0.9.0"),
        other => panic!("expected version error, got {:?}", other),
    }
}

#[test]
fn test_read_rejects_malformed_edge_key() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bad.json");
    std::fs::write(
        &path,
        r#"{"version":"1.0.0","label":"bad","report":{"flags":0,"degradedSamples":0,"edges":{"==>foo":{"count":1,"wall":1,"cpu":0,"memoryDelta":0,"peakMemoryDelta":0}}}}"#,
    )
    .unwrap();

    assert!(matches!(
        read_report(&path),
        Err(OutputError::SerializationFailed(_))
    ));
}

#[test]
fn test_compare_direct_and_indirect_recursion() {
    let dir = tempdir().unwrap();
    let direct = dir.path().join("direct.json");
    let indirect = dir.path().join("indirect.json");
    write_report(&document("recursion-direct", MetricFlags::NONE), &direct).unwrap();
    write_report(&document("recursion-indirect", MetricFlags::NONE), &indirect).unwrap();

    let diff = execute_compare(&direct, &indirect, false).unwrap();
    assert!(!diff.same_shape());
    assert!(diff.baseline_only.iter().any(|edge| edge.key == "foo==>foo"));
    assert!(diff.target_only.iter().any(|edge| edge.key == "bar==>foo"));

    let same = execute_compare(&direct, &direct, true).unwrap();
    assert!(same.same_shape());
}

#[test]
fn test_reports_with_awkward_names_read_back() {
    let mut session = ProfilerSession::with_source(ManualMetrics::wall_ticks(1));
    session.enable(MetricFlags::NONE, &ProfilerOptions::default()).unwrap();
    session.call("Vec<T>::eq==>x", |s| s.call("eq_inner", |_| ()));
    session.call("f@1", |_| ());
    session.call("user@host", |_| ());
    let report = session.disable().unwrap();

    let dir = tempdir().unwrap();
    let path = dir.path().join("awkward.json");
    let original = ReportDocument::new("awkward", report);
    write_report(&original, &path).unwrap();

    let loaded = read_report(&path).unwrap();
    assert_eq!(loaded, original);
    assert_eq!(
        loaded.report.keys(),
        vec!["main()", "main()==>eq_inner", "main()==>user@host"]
    );
}
