//! End-to-end tests for an extract/transform/load flow.

use flowstate_config::RunnerConfig;
use flowstate_flow::{Binding, Context, Flow, FlowBuilder, Outcome, Parameter, Task, Trigger};
use flowstate_runtime::{FlowRunArgs, FlowRunner};
use flowstate_state::{State, StateTag};
use flowstate_testing::{expect_task, run_flow_runner_test};
use serde_json::json;
use tokio_util::sync::CancellationToken;

/// extract -> transform -> load, with a report that runs whatever happens.
fn pipeline() -> (Flow, Task, Task, Task, Task) {
  let extract = Task::new("extract", |inputs, _| {
    let rows: i64 = inputs.require("rows")?;
    Ok(Outcome::value((1..=rows).collect::<Vec<_>>()))
  })
  .arg("rows", Binding::parameter("rows"));

  let transform = Task::new("transform", |inputs, _| {
    let values: Vec<i64> = inputs.require("values")?;
    if values.is_empty() {
      return Ok(Outcome::skip("no rows"));
    }
    Ok(Outcome::value(values.iter().map(|v| v * 10).collect::<Vec<_>>()))
  })
  .arg("values", Binding::upstream(&extract));

  let load = Task::new("load", |inputs, ctx| {
    let values: Vec<i64> = inputs.require("values")?;
    anyhow::ensure!(ctx.get("target").is_some(), "no load target configured");
    Ok(Outcome::value(values.iter().sum::<i64>()))
  })
  .arg("values", Binding::upstream(&transform));

  let report = Task::new("report", |_, _| Ok(Outcome::value("reported")))
    .after(&load)
    .with_trigger(Trigger::AllFinished)
    .skip_on_upstream_skip(false);

  let flow = FlowBuilder::new("etl")
    .tasks([extract.clone(), transform.clone(), load.clone(), report.clone()])
    .parameter(Parameter::with_default("rows", 3))
    .reference_tasks([&load])
    .build()
    .expect("valid pipeline");

  (flow, extract, transform, load, report)
}

#[tokio::test]
async fn test_pipeline_succeeds() {
  let (flow, extract, transform, load, report) = pipeline();

  run_flow_runner_test(
    &flow,
    Some(StateTag::Success.into()),
    vec![
      expect_task(&extract, State::success(json!([1, 2, 3]))),
      expect_task(&transform, State::success(json!([10, 20, 30]))),
      expect_task(&load, State::success(60)),
      expect_task(&report, StateTag::Success),
    ],
    FlowRunArgs::new().with_context(Context::new().with("target", "warehouse")),
    RunnerConfig::default(),
  )
  .await;
}

#[tokio::test]
async fn test_pipeline_failure_still_reports() {
  let (flow, _, _, load, report) = pipeline();

  let result = FlowRunner::default()
    .run(&flow, FlowRunArgs::new(), CancellationToken::new())
    .await
    .unwrap();

  assert_eq!(result, StateTag::Failed);
  let load_state = result.task_state(&load.id()).unwrap();
  assert_eq!(load_state, &StateTag::Failed);
  assert_eq!(load_state.message(), Some("no load target configured"));
  assert_eq!(result.task_state(&report.id()).unwrap(), &StateTag::Success);
}

#[tokio::test]
async fn test_pipeline_empty_input_skips() {
  let (flow, _, transform, load, report) = pipeline();

  let result = FlowRunner::default()
    .run(
      &flow,
      FlowRunArgs::new()
        .with_parameter("rows", 0)
        .with_context(Context::new().with("target", "warehouse")),
      CancellationToken::new(),
    )
    .await
    .unwrap();

  assert_eq!(result.task_state(&transform.id()).unwrap(), &StateTag::Skipped);
  assert_eq!(result.task_state(&load.id()).unwrap(), &StateTag::Skipped);
  assert_eq!(result.task_state(&report.id()).unwrap(), &StateTag::Success);
  assert_eq!(result, StateTag::Skipped);
}

#[tokio::test]
async fn test_pipeline_resumes_after_fix() {
  let (flow, extract, transform, load, _) = pipeline();
  let runner = FlowRunner::default();

  let first = runner
    .run(&flow, FlowRunArgs::new(), CancellationToken::new())
    .await
    .unwrap();
  assert_eq!(first, StateTag::Failed);

  // Drop the failed state and re-run load, reusing upstream results
  let mut seeded = first.result().clone().into_inner();
  seeded.remove(&load.id());
  let args = FlowRunArgs::new()
    .with_task_states(seeded)
    .with_start_tasks([&load])
    .with_context(Context::new().with("target", "warehouse"));
  let second = runner.run(&flow, args, CancellationToken::new()).await.unwrap();

  assert_eq!(second, StateTag::Success);
  assert_eq!(second.task_state(&load.id()).unwrap().result(), Some(&json!(60)));
  assert_eq!(
    second.task_state(&extract.id()).unwrap().result(),
    first.task_state(&extract.id()).unwrap().result()
  );
  assert!(second.task_state(&transform.id()).unwrap().is_successful());
}
