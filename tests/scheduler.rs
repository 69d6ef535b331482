use std::{convert::Infallible, env, fs, num::NonZeroUsize, process, thread, time::Duration};

use pretty_assertions::assert_eq;
use sectest::{
    SuiteRegistry,
    config::{Config, FormatKind},
    formatter::{FmtBegin, FmtSuite, FmtTotals, SuiteFormatter},
    harness,
    runner::{DefaultRunner, SimpleRunner, SmartRunner},
    suite::InstantiationKey,
};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[derive(Debug, Default)]
struct Calls {
    begin: usize,
    end: usize,
    suites_begun: Vec<String>,
    suites_ended: Vec<String>,
    totals: Option<FmtTotals>,
}

impl SuiteFormatter for Calls {
    type Error = Infallible;

    fn fmt_begin(&mut self, _: FmtBegin) -> Result<(), Self::Error> {
        self.begin += 1;
        Ok(())
    }

    fn fmt_suite_begin(&mut self, data: FmtSuite<'_>) -> Result<(), Self::Error> {
        self.suites_begun.push(data.meta.name.to_string());
        Ok(())
    }

    fn fmt_suite_end(&mut self, data: FmtSuite<'_>) -> Result<(), Self::Error> {
        self.suites_ended.push(data.meta.name.to_string());
        Ok(())
    }

    fn fmt_totals(&mut self, data: FmtTotals) -> Result<(), Self::Error> {
        self.totals = Some(data);
        Ok(())
    }

    fn fmt_end(&mut self) -> Result<(), Self::Error> {
        self.end += 1;
        Ok(())
    }
}

/// Later suites finish first.
fn staggered(count: usize) -> SuiteRegistry {
    let mut registry = SuiteRegistry::new();
    for idx in 0..count {
        let millis = 20 * (count - idx) as u64;
        registry.suite(format!("suite_{idx}")).run(move |ctx| {
            thread::sleep(Duration::from_millis(millis));
            ctx.section("slept", |ctx| {
                ctx.expect(millis).is_gt(0);
            });
        });
    }
    registry
}

#[test]
fn formatter_sees_registration_order_under_concurrency() {
    init_tracing();
    let registry = staggered(4);

    const FOUR: NonZeroUsize = NonZeroUsize::new(4).unwrap();
    let mut calls = Calls::default();
    let report = harness(&registry)
        .with_runner(DefaultRunner::default().with_thread_count(FOUR))
        .with_formatter(&mut calls)
        .run();

    let expected = ["suite_0", "suite_1", "suite_2", "suite_3"];
    assert_eq!(calls.begin, 1);
    assert_eq!(calls.end, 1);
    assert_eq!(calls.suites_begun, expected);
    assert_eq!(calls.suites_ended, expected);

    let names: Vec<_> = report.outcomes.iter().map(|(name, _)| *name).collect();
    assert_eq!(names, expected);
    assert!(report.success());
}

#[test]
fn single_threaded_mode_matches_concurrent_results() {
    let registry = staggered(3);

    let serial = harness(&registry)
        .with_runner(SmartRunner::default().with_single_threaded(true))
        .with_formatter(sectest::formatter::no::NoFormatter)
        .run();
    let parallel = harness(&registry)
        .with_runner(SmartRunner::default())
        .with_formatter(sectest::formatter::no::NoFormatter)
        .run();

    assert_eq!(serial.totals, parallel.totals);
    assert_eq!(serial.totals.tally.pass, 3);
}

#[test]
fn totals_and_durations_cover_every_suite() {
    init_tracing();
    let mut registry = SuiteRegistry::new();
    registry.suite("passes").run(|ctx| {
        ctx.expect("a").is_eq("a");
    });
    registry.suite("fails").run(|ctx| {
        ctx.section("one", |ctx| {
            ctx.expect(1).is_eq(2);
        });
        ctx.section("two", |ctx| {
            ctx.require(false).is_eq(true);
        });
    });

    let mut calls = Calls::default();
    let report = harness(&registry)
        .with_runner(SimpleRunner)
        .with_formatter(&mut calls)
        .run();

    let totals = calls.totals.unwrap();
    assert_eq!(totals.totals, report.totals);
    assert_eq!(totals.totals.tally.pass, 1);
    assert_eq!(totals.totals.tally.fail, 1);
    assert_eq!(totals.totals.tally.fatal, 1);
    assert_eq!(totals.totals.suites, 2);
    assert_eq!(totals.totals.failed_suites, 1);
    assert!(totals.cpu_duration <= totals.wall_duration);
    assert!(!report.success());
}

#[test]
fn instantiation_buckets_run_in_one_suite() {
    let mut registry = SuiteRegistry::new();
    registry.suite("sized").typed::<u8>(["u8"]).run(|ctx| {
        ctx.expect(size_of::<u8>()).is_eq(1);
    });
    registry.suite("sized").typed::<u32>(["u32"]).run(|ctx| {
        ctx.expect(size_of::<u32>()).is_eq(4);
    });
    registry
        .suite("sized")
        .instantiation(InstantiationKey::named("u8 again"), ["u8"])
        .run(|ctx| {
            ctx.expect(size_of::<u8>()).is_eq(1);
        });

    let mut calls = Calls::default();
    let report = harness(&registry)
        .with_runner(SimpleRunner)
        .with_formatter(&mut calls)
        .run();

    assert_eq!(calls.suites_begun, ["sized"]);
    let outcome = report.outcome("sized").unwrap();
    assert_eq!(outcome.buckets.len(), 3);
    assert_eq!(outcome.tally.pass, 3);
}

#[test]
fn config_drives_category_filter() {
    let mut registry = SuiteRegistry::new();
    registry.suite("fast").categories(["fast"]).run(|ctx| {
        ctx.expect(1).is_eq(1);
    });
    registry.suite("broken_but_slow").categories(["slow"]).run(|ctx| {
        ctx.expect(1).is_eq(2);
    });

    let config = Config {
        categories: vec!["fast".to_string()],
        format: FormatKind::None,
        ..Config::default()
    };

    let report = harness(&registry)
        .with_filter(config.filter())
        .with_runner(config.runner())
        .with_env(config.suite_env())
        .with_formatter(sectest::formatter::no::NoFormatter)
        .run();

    assert!(report.success());
    assert_eq!(report.filtered_out, 1);

    // The convenience entry point goes through the same path.
    let _ = sectest::run_with_config(&registry, &config);
}

#[test]
fn config_output_writes_to_a_file() {
    let mut registry = SuiteRegistry::new();
    registry.suite("written").run(|ctx| {
        ctx.expect(2).is_eq(2);
    });

    let path = env::temp_dir().join(format!("sectest-output-{}.json", process::id()));
    let config = Config {
        format: FormatKind::Json,
        output: Some(path.clone()),
        ..Config::default()
    };
    let _ = sectest::run_with_config(&registry, &config);

    let written = fs::read_to_string(&path).unwrap();
    fs::remove_file(&path).unwrap();
    let json: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert_eq!(json["suites"][0]["name"], "written");
    assert_eq!(json["totals"]["tally"]["pass"], 1);
}
