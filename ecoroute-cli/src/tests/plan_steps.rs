//! Behaviour-driven step definitions driving the plan CLI scenarios.

use super::helpers::{StubBackends, busan_request, temp_root, write_utf8};
use super::*;
use crate::plan::run_plan_with;
use camino::Utf8PathBuf;
use ecoroute_core::{ModelError, PlanOutcome, PlanStatus};
use ecoroute_data::SqliteResultSink;
use rstest::fixture;
use rstest_bdd_macros::{given, scenario, then, when};
use serde_json::json;
use std::cell::RefCell;
use tempfile::TempDir;

#[derive(Debug)]
struct PlanWorld {
    _tmp: TempDir,
    root: Utf8PathBuf,
    request_path: Utf8PathBuf,
    include_request: RefCell<bool>,
    results_db: RefCell<Option<Utf8PathBuf>>,
    stdout: RefCell<Vec<u8>>,
    result: RefCell<Option<Result<(), CliError>>>,
}

impl PlanWorld {
    fn new() -> Self {
        let (tmp, root) = temp_root();
        let request_path = root.join("request.json");
        Self {
            _tmp: tmp,
            root,
            request_path,
            include_request: RefCell::new(true),
            results_db: RefCell::new(None),
            stdout: RefCell::new(Vec::new()),
            result: RefCell::new(None),
        }
    }

    fn write_request(&self, document: &serde_json::Value) {
        write_utf8(&self.request_path, document.to_string().as_bytes());
    }

    fn build_command_line(&self) -> Vec<String> {
        let mut argv = vec!["ecoroute".to_owned(), "plan".to_owned()];
        if *self.include_request.borrow() {
            argv.push(self.request_path.as_str().to_owned());
        }
        if let Some(path) = self.results_db.borrow().as_ref() {
            argv.extend([format!("--{ARG_RESULTS_DB}"), path.as_str().to_owned()]);
        }
        argv
    }

    fn printed_outcome(&self) -> PlanOutcome {
        let stdout = String::from_utf8(self.stdout.borrow().clone()).expect("stdout utf-8");
        serde_json::from_str(&stdout).expect("output should be a JSON plan outcome")
    }

    fn error(&self) -> std::cell::Ref<'_, CliError> {
        std::cell::Ref::map(self.result.borrow(), |result| {
            result
                .as_ref()
                .expect("result recorded")
                .as_ref()
                .expect_err("expected error")
        })
    }
}

#[fixture]
fn world() -> PlanWorld {
    PlanWorld::new()
}

#[given("a plan request for one delivery in Busan")]
fn busan_request_exists(#[from(world)] world: &PlanWorld) {
    world.write_request(&busan_request());
}

#[given("a results database path")]
fn results_database_path(#[from(world)] world: &PlanWorld) {
    world
        .results_db
        .replace(Some(world.root.join("out").join("results.db")));
}

#[given("the plan request contains invalid JSON")]
fn request_contains_invalid_json(#[from(world)] world: &PlanWorld) {
    write_utf8(&world.request_path, b"{ not valid json");
}

#[given("a plan request with a job of negative demand")]
fn request_with_negative_demand(#[from(world)] world: &PlanWorld) {
    let mut document = busan_request();
    document["jobs"][0]["demand_kg"] = json!(-5.0);
    world.write_request(&document);
}

#[given("I omit the plan request path")]
fn omit_plan_request_path(#[from(world)] world: &PlanWorld) {
    *world.include_request.borrow_mut() = false;
}

#[given("a plan request without vehicles")]
fn request_without_vehicles(#[from(world)] world: &PlanWorld) {
    let mut document = busan_request();
    document["vehicles"] = json!([]);
    world.write_request(&document);
}

#[when("I run the plan command")]
fn run_plan_command(#[from(world)] world: &PlanWorld) {
    let invocation = world.build_command_line();
    let parsed = Cli::try_parse_from(invocation).map_err(CliError::from);
    let outcome = parsed.and_then(|cli| {
        let Command::Plan(args) = cli.command;
        let mut buffer = world.stdout.borrow_mut();
        run_plan_with(args, &StubBackends, &mut *buffer)
    });
    world.result.replace(Some(outcome));
}

#[then("the command succeeds and prints the eco and baseline options")]
fn command_succeeds_with_two_options(#[from(world)] world: &PlanWorld) {
    let borrowed = world.result.borrow();
    let result = borrowed.as_ref().expect("result recorded");
    result.as_ref().expect("expected success");

    let outcome = world.printed_outcome();
    assert_eq!(outcome.status, PlanStatus::Success);
    let names: Vec<&str> = outcome
        .results
        .iter()
        .map(|option| option.route_name.as_str())
        .collect();
    assert_eq!(names, ["eco", "baseline"]);
    assert!(outcome.comparison.is_some());
}

#[then("the eco option follows the 305 km alternative")]
fn eco_option_is_alternative(#[from(world)] world: &PlanWorld) {
    let outcome = world.printed_outcome();
    let eco = outcome.results.first().expect("eco option");
    assert_eq!(eco.label.as_deref(), Some("alternative-1"));
    assert!((eco.summary.total_distance_km - 305.0).abs() < 1e-9);
}

#[then("the results database holds the eco option")]
fn database_holds_eco_option(#[from(world)] world: &PlanWorld) {
    let path = world.results_db.borrow().clone().expect("database path");
    let sink = SqliteResultSink::open(&path).expect("reopen results database");
    let (summary, assignments) = sink
        .load("run-7", "eco")
        .expect("read results")
        .expect("eco option stored");
    assert_eq!(summary.route_name, "eco");
    assert_eq!(assignments.len(), 1);
}

#[then("the command fails because the request JSON is invalid")]
fn command_fails_invalid_json(#[from(world)] world: &PlanWorld) {
    match &*world.error() {
        CliError::ParsePlanRequest { .. } => {}
        other => panic!("expected ParsePlanRequest, found {other:?}"),
    }
}

#[then("the command fails because the request is invalid")]
fn command_fails_invalid_request(#[from(world)] world: &PlanWorld) {
    match &*world.error() {
        CliError::InvalidPlanRequest { source, .. } => assert_eq!(
            *source,
            ModelError::NegativeDemand {
                job_id: "busan".to_owned(),
                demand_kg: -5.0,
            }
        ),
        other => panic!("expected InvalidPlanRequest, found {other:?}"),
    }
}

#[then("the command fails because the request path is missing")]
fn command_fails_missing_request_path(#[from(world)] world: &PlanWorld) {
    match &*world.error() {
        CliError::MissingArgument { field, .. } => assert_eq!(*field, ARG_PLAN_REQUEST),
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[then("the command prints a failed outcome")]
fn command_prints_failed_outcome(#[from(world)] world: &PlanWorld) {
    let outcome = world.printed_outcome();
    assert_eq!(outcome.status, PlanStatus::Failed);
    assert!(outcome.results.is_empty());
    assert!(outcome.message.is_some());
}

#[then("the command fails because the run failed")]
fn command_fails_run_failed(#[from(world)] world: &PlanWorld) {
    match &*world.error() {
        CliError::PlanFailed { run_id, .. } => assert_eq!(run_id, "run-7"),
        other => panic!("expected PlanFailed, found {other:?}"),
    }
}

macro_rules! register_plan_scenario {
    ($fn_name:ident, $scenario_title:literal) => {
        #[scenario(path = "tests/features/plan_command.feature", name = $scenario_title)]
        fn $fn_name(#[from(world)] world: PlanWorld) {
            let _ = world;
        }
    };
}

register_plan_scenario!(plan_single_delivery, "planning a single delivery from JSON");
register_plan_scenario!(plan_stores_results, "storing results in a SQLite database");
register_plan_scenario!(plan_invalid_json, "rejecting invalid JSON input");
register_plan_scenario!(plan_negative_demand, "rejecting jobs with negative demand");
register_plan_scenario!(plan_missing_request, "rejecting missing request paths");
register_plan_scenario!(plan_without_vehicles, "reporting a run without vehicles");
