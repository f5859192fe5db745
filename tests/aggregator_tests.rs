use hierprof::aggregator::{calculate_function_summaries, calculate_hot_edges};
use hierprof::metrics::{ManualMetrics, MetricFlags};
use hierprof::report::Report;
use hierprof::scenarios::{self, run_with_source};

fn run(name: &str) -> Report {
    let scenario = scenarios::find(name).unwrap();
    run_with_source(scenario, MetricFlags::CPU, ManualMetrics::wall_ticks(3)).unwrap()
}

#[test]
fn test_hot_edges_rank_outermost_call_first() {
    let report = run("recursion-direct");
    let hot = calculate_hot_edges(&report, 3);

    assert_eq!(hot.len(), 3);
    assert_eq!(hot[0].key, "main()==>foo");
    assert_eq!(hot[1].key, "foo==>foo@1");
    assert!(hot.windows(2).all(|pair| pair[0].wall >= pair[1].wall));
    assert!(hot.iter().all(|edge| edge.percentage <= 100.0));
}

#[test]
fn test_hot_edges_skip_root() {
    let report = run("bar-loop");
    let hot = calculate_hot_edges(&report, usize::MAX);

    assert_eq!(hot.len(), report.len() - 1);
    assert!(hot.iter().all(|edge| edge.key != "main()"));
}

#[test]
fn test_function_summaries_fold_recursion() {
    let report = run("recursion-direct");
    let summaries = calculate_function_summaries(&report);

    let foo = summaries.iter().find(|s| s.function == "foo").unwrap();
    assert_eq!(foo.count, 5);
    assert_eq!(foo.inclusive.wall, report.get("main()==>foo").unwrap().wall);

    let main = summaries.iter().find(|s| s.function == "main()").unwrap();
    assert_eq!(main.count, 1);

    let exclusive: u64 = summaries.iter().map(|s| s.exclusive.wall).sum();
    assert_eq!(exclusive, report.root().unwrap().wall);
}

#[test]
fn test_function_summaries_cover_every_function() {
    let report = run("classes");
    let mut names: Vec<String> = calculate_function_summaries(&report)
        .into_iter()
        .map(|s| s.function)
        .collect();
    names.sort();

    assert_eq!(
        names,
        vec![
            "C::drop",
            "C::get_attr",
            "C::inner_static",
            "C::new",
            "C::outer_static",
            "main()"
        ]
    );
}
