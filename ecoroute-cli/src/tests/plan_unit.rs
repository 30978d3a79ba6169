//! Focused unit tests covering plan CLI configuration and request parsing.

use super::helpers::{busan_request, temp_root, write_utf8};
use super::*;
use crate::plan::{DEFAULT_OSRM_BASE_URL, PlanArgs, PlanConfig, config_from_layers_for_test};
use crate::request::load_request_document;
use camino::Utf8PathBuf;
use ecoroute_core::{DAY_SECONDS, EngineSettings, ModelError, TimeWindow};
use ecoroute_solver_vrp::VrpSequencerConfig;
use rstest::rstest;
use serde_json::json;
use std::time::Duration;

fn config_for(request_path: Utf8PathBuf) -> PlanConfig {
    PlanConfig {
        request_path,
        osrm_base_url: DEFAULT_OSRM_BASE_URL.to_owned(),
        results_db: None,
        environment_profile: None,
        settings: None,
        search_time_limit: None,
        sequencer: VrpSequencerConfig::default(),
    }
}

#[rstest]
fn converting_plan_without_request_errors() {
    let err = PlanConfig::try_from(PlanArgs::default()).expect_err("missing request should error");
    match err {
        CliError::MissingArgument { field, env } => {
            assert_eq!(field, ARG_PLAN_REQUEST);
            assert_eq!(env, ENV_PLAN_REQUEST);
        }
        other => panic!("expected MissingArgument, found {other:?}"),
    }
}

#[rstest]
fn plan_config_applies_defaults_and_overrides() {
    let args = PlanArgs {
        request_path: Some(Utf8PathBuf::from("request.json")),
        search_time_limit: Some(3),
        max_generations: Some(250),
        ..PlanArgs::default()
    };

    let config = PlanConfig::try_from(args).expect("config should build");
    assert_eq!(config.osrm_base_url, "http://localhost:5000");
    assert_eq!(config.search_time_limit, Some(Duration::from_secs(3)));
    assert_eq!(config.sequencer.max_generations, 250);
    assert!(config.results_db.is_none());
}

#[rstest]
fn validate_sources_reports_missing_settings_file() {
    let (_tmp, root) = temp_root();
    let request_path = root.join("request.json");
    write_utf8(&request_path, b"{}");
    let mut config = config_for(request_path);
    config.settings = Some(root.join("settings.json"));

    let err = config.validate_sources().expect_err("missing settings");
    match err {
        CliError::MissingSourceFile { field, .. } => assert_eq!(field, ARG_SETTINGS),
        other => panic!("expected MissingSourceFile, found {other:?}"),
    }
}

#[rstest]
fn validate_sources_reports_not_file() {
    let (_tmp, root) = temp_root();
    let request_path = root.join("request.json");
    std::fs::create_dir(&request_path).expect("request directory");

    let err = config_for(request_path.clone())
        .validate_sources()
        .expect_err("expected directory path to fail validation");
    match err {
        CliError::SourcePathNotFile { field, path } => {
            assert_eq!(field, ARG_PLAN_REQUEST);
            assert_eq!(path, request_path);
        }
        other => panic!("expected SourcePathNotFile, found {other:?}"),
    }
}

#[rstest]
fn settings_file_keeps_defaults_and_cli_budget_wins() {
    let (_tmp, root) = temp_root();
    let settings_path = root.join("settings.json");
    write_utf8(
        &settings_path,
        br#"{ "co2_weight": 0.5, "search_time_limit_secs": 30 }"#,
    );
    let mut config = config_for(root.join("request.json"));
    config.settings = Some(settings_path);
    config.search_time_limit = Some(Duration::from_secs(4));

    let settings = config.engine_settings().expect("settings should load");
    assert_eq!(settings.co2_weight, 0.5);
    assert_eq!(settings.search_time_limit(), Duration::from_secs(4));
    assert_eq!(settings.alpha_load, EngineSettings::default().alpha_load);
}

#[rstest]
fn zero_budget_in_settings_file_is_raised_to_one_second() {
    let (_tmp, root) = temp_root();
    let settings_path = root.join("settings.json");
    write_utf8(&settings_path, br#"{ "search_time_limit_secs": 0 }"#);
    let mut config = config_for(root.join("request.json"));
    config.settings = Some(settings_path);

    let settings = config.engine_settings().expect("settings should load");
    assert_eq!(settings.search_time_limit_secs, 1);
    assert_eq!(settings.search_time_limit(), Duration::from_secs(1));
}

#[rstest]
fn malformed_settings_file_is_reported() {
    let (_tmp, root) = temp_root();
    let settings_path = root.join("settings.json");
    write_utf8(&settings_path, b"{ \"co2_weight\": \"heavy\" }");
    let mut config = config_for(root.join("request.json"));
    config.settings = Some(settings_path.clone());

    match config.engine_settings() {
        Err(CliError::ParseSettings { path, .. }) => assert_eq!(path, settings_path),
        other => panic!("expected ParseSettings, found {other:?}"),
    }
}

#[rstest]
fn request_datetimes_become_offsets_and_idle_rate_is_derived() {
    let (_tmp, root) = temp_root();
    let request_path = root.join("request.json");
    write_utf8(&request_path, busan_request().to_string().as_bytes());

    let request = load_request_document(&request_path)
        .expect("request should decode")
        .into_plan_request(&EngineSettings::default())
        .expect("request should validate");

    let job = request.jobs.first().expect("one job");
    assert_eq!(job.time_window, TimeWindow { start: 0, end: 36_000 });
    let truck = request.vehicles.first().expect("one vehicle");
    assert!((truck.idle_g_per_sec - 2.2644).abs() < 1e-3);
    assert_eq!(request.run_id, "run-7");
}

#[rstest]
#[case::offsets_win(json!({ "start": 600, "end": 1200 }), TimeWindow { start: 600, end: 1_200 })]
#[case::no_window(json!(null), TimeWindow { start: 0, end: DAY_SECONDS })]
fn explicit_offsets_take_precedence(
    #[case] window: serde_json::Value,
    #[case] expected: TimeWindow,
) {
    let mut document = busan_request();
    let job = &mut document["jobs"][0];
    job["time_window"] = window;
    if job["time_window"].is_null() {
        let fields = job.as_object_mut().expect("job object");
        fields.remove("time_window");
        fields.remove("tw_end");
    }
    let decoded: crate::request::RequestDocument =
        serde_json::from_value(document).expect("request should decode");

    let request = decoded
        .into_plan_request(&EngineSettings::default())
        .expect("request should validate");
    assert_eq!(request.jobs.first().map(|job| job.time_window), Some(expected));
}

#[rstest]
fn inverted_offsets_are_rejected() {
    let mut document = busan_request();
    document["jobs"][0]["time_window"] = json!({ "start": 900, "end": 300 });
    let decoded: crate::request::RequestDocument =
        serde_json::from_value(document).expect("request should decode");

    let err = decoded
        .into_plan_request(&EngineSettings::default())
        .expect_err("inverted window");
    assert_eq!(err, ModelError::InvertedTimeWindow { start: 900, end: 300 });
}

#[rstest]
fn load_request_document_rejects_invalid_json() {
    let (_tmp, root) = temp_root();
    let request_path = root.join("request.json");
    write_utf8(&request_path, b"{ not valid json");

    let err = load_request_document(&request_path).expect_err("invalid json should error");
    match err {
        CliError::ParsePlanRequest { path, .. } => assert_eq!(path, request_path),
        other => panic!("unexpected error {other:?}"),
    }
}

#[rstest]
fn load_request_document_io_error_returns_open_error() {
    let (_tmp, root) = temp_root();
    let request_path = root.join("request.json");

    let err = load_request_document(&request_path).expect_err("missing request should error");
    match err {
        CliError::OpenPlanRequest { path, .. } => assert_eq!(path, request_path),
        other => panic!("expected OpenPlanRequest, found {other:?}"),
    }
}

#[rstest]
fn merge_layers_maps_configuration_errors() {
    use ortho_config::MergeComposer;

    let mut composer = MergeComposer::new();
    composer.push_cli(json!({ "request_path": 42 }));

    let err = config_from_layers_for_test(composer.layers())
        .expect_err("invalid config layer should map to CliError::Configuration");
    match err {
        CliError::Configuration(_) => {}
        other => panic!("expected CliError::Configuration, found {other:?}"),
    }
}

#[rstest]
fn merge_layers_honours_precedence() {
    use ortho_config::MergeComposer;

    let (_tmp, root) = temp_root();
    let env_request = root.join("from-env-request.json");
    let mut composer = MergeComposer::new();
    composer.push_file(
        json!({
            "osrm_base_url": "http://from-file:5000",
            "max_generations": 100,
            "search_time_limit": 20,
        }),
        None,
    );
    composer.push_environment(json!({
        "request_path": env_request.as_str(),
        "max_generations": 200,
    }));
    composer.push_cli(json!({ "max_generations": 300 }));

    let config =
        config_from_layers_for_test(composer.layers()).expect("merged config should build");
    assert_eq!(config.request_path, env_request);
    assert_eq!(config.osrm_base_url, "http://from-file:5000");
    assert_eq!(config.sequencer.max_generations, 300);
    assert_eq!(config.search_time_limit, Some(Duration::from_secs(20)));
}
