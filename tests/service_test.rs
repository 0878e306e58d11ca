mod common;

use common::{predict_body, test_env, Behaviour, RecordingRunner, TEMPLATE};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use witoil_api::config::model_config::ModelConfig;
use witoil_api::{ApiError, ContentType, ModelService, PredictArgs, TrainArgs};

fn png_args(name: &str) -> PredictArgs {
    let mut args = PredictArgs::from_json(predict_body(name)).unwrap();
    args.accept = Some("image/png".to_string());
    args
}

#[tokio::test]
async fn test_predict_invokes_model_with_case_config() {
    let env = test_env(&[]);
    let runner = RecordingRunner::new(Behaviour::WriteFigures(vec![
        ("surf_oil_001.png", "PNG-1"),
        ("surf_oil_002.png", "PNG-2"),
    ]));
    let service = ModelService::new(env.config.clone(), runner.clone());

    let rendered = service.predict(&png_args("cyprus")).await.unwrap();
    assert_eq!(rendered.content_type, ContentType::Png);
    assert_eq!(rendered.body, b"PNG-1");

    let calls = runner.calls();
    assert_eq!(calls.len(), 1);
    let expected_config = env
        .root()
        .join("WITOIL_iMagine")
        .join("cases")
        .join("cyprus")
        .join("config.toml");
    assert_eq!(calls[0].program, "python3");
    assert_eq!(
        calls[0].args,
        vec![
            "main.py".to_string(),
            expected_config.to_string_lossy().into_owned()
        ]
    );
    assert_eq!(calls[0].cwd, env.root().join("WITOIL_iMagine"));

    // per-simulation config carries the request values
    let written = ModelConfig::from_file(&expected_config).unwrap();
    assert_eq!(
        written.get("simulation", "sim_length"),
        Some(&toml::Value::Float(48.0))
    );
    assert_eq!(
        written.get("download", "copernicus_password"),
        Some(&toml::Value::String("secret-password".into()))
    );
    assert_eq!(
        written.get("run_options", "run_model"),
        Some(&toml::Value::Boolean(true))
    );

    // shared template is untouched
    let template =
        std::fs::read_to_string(env.root().join("WITOIL_iMagine").join("config.toml")).unwrap();
    assert_eq!(template, TEMPLATE);
}

#[tokio::test]
async fn test_predict_uses_configured_command() {
    let env = test_env(&[("MEDSLIK_COMMAND", "medslik --run {config} --quiet")]);
    let runner = RecordingRunner::new(Behaviour::WriteFigures(vec![("a.png", "x")]));
    let service = ModelService::new(env.config.clone(), runner.clone());

    service.predict(&png_args("run1")).await.unwrap();

    let call = &runner.calls()[0];
    assert_eq!(call.program, "medslik");
    assert_eq!(call.args[0], "--run");
    assert!(call.args[1].ends_with("config.toml"));
    assert_eq!(call.args[2], "--quiet");
}

#[tokio::test]
async fn test_rerun_returns_only_fresh_figures() {
    let env = test_env(&[]);
    let first = ModelService::new(
        env.config.clone(),
        RecordingRunner::new(Behaviour::WriteFigures(vec![("a_old.png", "OLD")])),
    );
    let rendered = first.predict(&png_args("my_experiment")).await.unwrap();
    assert_eq!(rendered.body, b"OLD");

    let second = ModelService::new(
        env.config.clone(),
        RecordingRunner::new(Behaviour::WriteFigures(vec![("b_new.png", "NEW")])),
    );
    let rendered = second.predict(&png_args("my_experiment")).await.unwrap();
    assert_eq!(rendered.body, b"NEW");
    assert_eq!(rendered.filename.as_deref(), Some("b_new.png"));
    assert!(!env.config.figures_dir("my_experiment").join("a_old.png").exists());
}

#[tokio::test]
async fn test_same_name_cannot_run_twice_at_once() {
    let env = test_env(&[]);
    let release = Arc::new(Notify::new());
    let runner = RecordingRunner::new(Behaviour::WaitFor(release.clone()));
    let service = Arc::new(ModelService::new(env.config.clone(), runner.clone()));

    let mut args = png_args("shared");
    args.accept = Some("application/json".into());

    let first = tokio::spawn({
        let service = service.clone();
        let args = args.clone();
        async move { service.predict(&args).await }
    });
    while runner.calls().is_empty() {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let err = service.predict(&args).await.unwrap_err();
    assert!(matches!(err, ApiError::CaseBusy { ref name } if name == "shared"));
    assert_eq!(runner.calls().len(), 1);

    release.notify_one();
    first.await.unwrap().unwrap();

    // the name is free once the first run finished
    release.notify_one();
    service.predict(&args).await.unwrap();
    assert_eq!(runner.calls().len(), 2);
}

#[tokio::test]
async fn test_invalid_args_never_reach_the_model() {
    let env = test_env(&[]);
    let runner = RecordingRunner::new(Behaviour::WriteFigures(vec![]));
    let service = ModelService::new(env.config.clone(), runner.clone());

    let mut args = png_args("bad");
    args.spill_lat = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
    let err = service.predict(&args).await.unwrap_err();

    assert!(matches!(err, ApiError::ValidationError { .. }));
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn test_model_failure_propagates() {
    let env = test_env(&[]);
    let runner = RecordingRunner::new(Behaviour::Fail(
        "ValueError: Your coordinates lie within land",
    ));
    let service = ModelService::new(env.config.clone(), runner);

    let err = service.predict(&png_args("land")).await.unwrap_err();
    match err {
        ApiError::ModelFailed { stderr_tail, .. } => assert!(stderr_tail.contains("within land")),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_template_is_config_error() {
    let env = test_env(&[("MODEL_CONFIG_TEMPLATE", "missing.toml")]);
    let runner = RecordingRunner::new(Behaviour::WriteFigures(vec![]));
    let service = ModelService::new(env.config.clone(), runner.clone());

    let err = service.predict(&png_args("x")).await.unwrap_err();
    assert!(matches!(err, ApiError::ConfigError { .. }));
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn test_mp4_requested_but_only_png_produced() {
    let env = test_env(&[]);
    let runner = RecordingRunner::new(Behaviour::WriteFigures(vec![("a.png", "x")]));
    let service = ModelService::new(env.config.clone(), runner);

    let mut args = png_args("video");
    args.accept = Some("video/mp4".into());
    let err = service.predict(&args).await.unwrap_err();
    assert!(matches!(err, ApiError::ResultMissing { .. }));
}

#[test]
fn test_metadata_lists_datasets_and_models() {
    let env = test_env(&[]);
    let service = ModelService::new(
        env.config.clone(),
        RecordingRunner::new(Behaviour::WriteFigures(vec![])),
    );

    let metadata = service.get_metadata().unwrap();
    assert_eq!(metadata.name, "witoil-api");
    assert_eq!(metadata.license, "MIT");
    assert_eq!(metadata.datasets, vec!["currents_2021.nc"]);
    assert_eq!(metadata.models, vec!["baseline"]);

    let value = serde_json::to_value(&metadata).unwrap();
    assert!(value.get("author-email").is_some());
}

#[tokio::test]
async fn test_train_is_unsupported_without_command() {
    let env = test_env(&[]);
    let runner = RecordingRunner::new(Behaviour::WriteFigures(vec![]));
    let service = ModelService::new(env.config.clone(), runner.clone());

    let args = TrainArgs::from_json(serde_json::json!({ "model_name": "baseline" })).unwrap();
    let err = service.train(&args).await.unwrap_err();
    assert!(matches!(err, ApiError::Unsupported { .. }));
    assert!(runner.calls().is_empty());
}

#[tokio::test]
async fn test_train_validates_before_reporting_unsupported() {
    let env = test_env(&[]);
    let service = ModelService::new(
        env.config.clone(),
        RecordingRunner::new(Behaviour::WriteFigures(vec![])),
    );

    let args = TrainArgs::from_json(serde_json::json!({
        "model_name": "baseline",
        "epochs": 0
    }))
    .unwrap();
    assert!(matches!(
        service.train(&args).await,
        Err(ApiError::ValidationError { ref field, .. }) if field == "epochs"
    ));
}

#[tokio::test]
async fn test_train_invokes_configured_command() {
    let env = test_env(&[(
        "MEDSLIK_TRAIN_COMMAND",
        "python3 train.py --model {model} --data {dataset} --epochs {epochs}",
    )]);
    let runner = RecordingRunner::new(Behaviour::WriteFigures(vec![]));
    let service = ModelService::new(env.config.clone(), runner.clone());

    let args = TrainArgs::from_json(serde_json::json!({
        "model_name": "baseline",
        "dataset": "currents_2021.nc",
        "epochs": 3
    }))
    .unwrap();
    let summary = service.train(&args).await.unwrap();
    assert_eq!(summary.epochs, 3);
    assert_eq!(summary.output_tail, vec!["epoch 1 done", "finished"]);

    let call = &runner.calls()[0];
    assert_eq!(
        call.args,
        vec![
            "train.py".to_string(),
            "--model".to_string(),
            env.root().join("models").join("baseline").to_string_lossy().into_owned(),
            "--data".to_string(),
            env.root().join("data").join("currents_2021.nc").to_string_lossy().into_owned(),
            "--epochs".to_string(),
            "3".to_string(),
        ]
    );
}

#[test]
fn test_train_rejects_unknown_checkpoint_and_dataset() {
    let env = test_env(&[]);
    let service = ModelService::new(
        env.config.clone(),
        RecordingRunner::new(Behaviour::WriteFigures(vec![])),
    );

    let args = TrainArgs::from_json(serde_json::json!({ "model_name": "nope" })).unwrap();
    assert!(matches!(
        service.resolve_train_args(&args),
        Err(ApiError::ValidationError { ref field, .. }) if field == "model_name"
    ));

    let args = TrainArgs::from_json(serde_json::json!({
        "model_name": "baseline",
        "dataset": "missing.nc"
    }))
    .unwrap();
    assert!(matches!(
        service.resolve_train_args(&args),
        Err(ApiError::ValidationError { ref field, .. }) if field == "dataset"
    ));
}
