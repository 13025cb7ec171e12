//! Integration tests: the process worker backend against real child
//! processes.
//!
//! The non-ignored tests drive the backend with `sh` fake workers, so
//! they run anywhere with a POSIX shell. The `#[ignore]`-gated tests
//! exercise the full engine against a real `python3` interpreter.

use std::path::PathBuf;
use std::time::Duration;

use lancet_core::examples::{
    diagnosis_counts_snippet, division_by_zero_snippet, example_cohort, mean_age_snippet,
};
use lancet_core::{ExecLimits, NormalizedResult, Outcome, ResourceKind, ScalarValue, Snippet};
use lancet_executor::{
    ExecutionRequest, ProcessWorkerBackend, SandboxEngine, WireReport, WorkerBackend,
    WorkerProgram, WorkerRun,
};

fn sh_backend(script: &str) -> ProcessWorkerBackend {
    ProcessWorkerBackend::new(PathBuf::from("sh"), vec!["-c".to_owned(), script.to_owned()])
}

fn limits(timeout: Duration) -> ExecLimits {
    match ExecLimits::new(timeout, 256 * 1024 * 1024) {
        Ok(l) => l,
        Err(e) => panic!("valid limits rejected: {e}"),
    }
}

fn ignored_program() -> WorkerProgram {
    WorkerProgram::new("ignored by the fake worker".to_owned())
}

#[tokio::test]
async fn fake_worker_report_round_trips_through_markers() {
    let backend = sh_backend(concat!(
        "echo LANCET_RESULT_BEGIN; ",
        r#"echo '{"status":"ok","result":42,"visualization":null}'; "#,
        "echo LANCET_RESULT_END",
    ));
    let run = backend.run(&ignored_program(), &limits(Duration::from_secs(10))).await;
    let run = match run {
        Ok(r) => r,
        Err(e) => panic!("run failed: {e}"),
    };
    let WorkerRun::Finished { report, .. } = run else {
        panic!("expected a finished worker, got {run:?}");
    };
    assert_eq!(
        report,
        WireReport::Completed {
            result: serde_json::json!(42),
            visualization: serde_json::Value::Null,
        }
    );
}

#[tokio::test]
async fn hung_worker_is_killed_at_the_wall_clock_ceiling() {
    let backend = sh_backend("sleep 30");
    let started = std::time::Instant::now();
    let run = backend.run(&ignored_program(), &limits(Duration::from_millis(300))).await;
    let run = match run {
        Ok(r) => r,
        Err(e) => panic!("run failed: {e}"),
    };
    let WorkerRun::TimedOut { elapsed } = run else {
        panic!("expected a timeout, got {run:?}");
    };
    assert!(elapsed >= Duration::from_millis(300), "elapsed must cover the ceiling");
    assert!(
        started.elapsed() < Duration::from_secs(5),
        "the kill must not wait for the worker's own exit"
    );
}

#[tokio::test]
async fn worker_without_markers_is_classified_as_crashed() {
    let backend = sh_backend("echo plain output; echo oops >&2; exit 3");
    let run = backend.run(&ignored_program(), &limits(Duration::from_secs(10))).await;
    let run = match run {
        Ok(r) => r,
        Err(e) => panic!("run failed: {e}"),
    };
    let WorkerRun::Crashed { exit_code, detail, .. } = run else {
        panic!("expected a crash, got {run:?}");
    };
    assert_eq!(exit_code, Some(3));
    assert!(detail.contains("oops"), "stderr excerpt must be reported");
}

#[tokio::test]
async fn worker_with_garbage_between_markers_is_classified_as_crashed() {
    let backend = sh_backend(concat!(
        "echo LANCET_RESULT_BEGIN; echo 'not json'; echo LANCET_RESULT_END",
    ));
    let run = backend.run(&ignored_program(), &limits(Duration::from_secs(10))).await;
    match run {
        Ok(WorkerRun::Crashed { detail, .. }) => {
            assert!(detail.contains("report parse"), "parse failure must be reported");
        }
        other => panic!("expected a crash, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_interpreter_fails_before_any_worker_exists() {
    let backend = ProcessWorkerBackend::new(
        PathBuf::from("lancet-no-such-interpreter"),
        vec!["-".to_owned()],
    );
    let run = backend.run(&ignored_program(), &limits(Duration::from_secs(1))).await;
    assert!(run.is_err(), "a missing interpreter is an infrastructure error");
}

#[tokio::test]
async fn health_check_passes_for_a_clean_worker_and_fails_otherwise() {
    assert!(sh_backend("exit 0").health_check().await.is_ok());
    assert!(sh_backend("exit 3").health_check().await.is_err());
}

// ── End-to-end tests against a real interpreter ──────────────────────────────

fn python_engine() -> SandboxEngine<ProcessWorkerBackend> {
    SandboxEngine::new(ProcessWorkerBackend::python3())
}

fn python_request(snippet: Snippet) -> ExecutionRequest {
    ExecutionRequest::new(snippet, example_cohort(), limits(Duration::from_secs(15)))
}

#[tokio::test]
#[ignore = "requires python3 on PATH"]
async fn python_scalar_result_normalizes_to_int() {
    let record = python_engine()
        .execute(&python_request(Snippet::new("result = 42\n")))
        .await;
    assert_eq!(
        record.outcome,
        Outcome::Success {
            result: NormalizedResult::Scalar { value: ScalarValue::Int(42) }
        }
    );
}

#[tokio::test]
#[ignore = "requires python3 on PATH"]
async fn python_mean_age_over_records_succeeds() {
    let record = python_engine()
        .execute(&python_request(mean_age_snippet()))
        .await;
    let Outcome::Success { result: NormalizedResult::Scalar { value: ScalarValue::Float(mean) } } =
        record.outcome
    else {
        panic!("expected a float scalar, got {:?}", record.outcome);
    };
    assert!((mean - 56.166_666_666_666_664).abs() < 1e-9);
}

#[tokio::test]
#[ignore = "requires python3 on PATH"]
async fn python_diagnosis_counts_normalize_to_a_mapping() {
    let record = python_engine()
        .execute(&python_request(diagnosis_counts_snippet()))
        .await;
    let Outcome::Success { result: NormalizedResult::Mapping { entries } } = record.outcome
    else {
        panic!("expected a mapping, got {:?}", record.outcome);
    };
    assert_eq!(
        entries.get("hypertension"),
        Some(&NormalizedResult::Scalar { value: ScalarValue::Int(2) })
    );
}

#[tokio::test]
#[ignore = "requires python3 on PATH"]
async fn python_division_by_zero_reports_category() {
    let record = python_engine()
        .execute(&python_request(division_by_zero_snippet()))
        .await;
    let Outcome::RuntimeFailure { category, .. } = record.outcome else {
        panic!("expected a runtime failure, got {:?}", record.outcome);
    };
    assert_eq!(category, "division_by_zero");
}

#[tokio::test]
#[ignore = "requires python3 on PATH"]
async fn python_first_statement_failure_is_a_failure_not_an_undefined_sentinel() {
    let record = python_engine()
        .execute(&python_request(Snippet::new("x = undefined_name_here\n")))
        .await;
    let Outcome::RuntimeFailure { category, .. } = record.outcome else {
        panic!("sentinels must be pre-bound; got {:?}", record.outcome);
    };
    assert_eq!(category, "undefined_name");
}

#[tokio::test]
#[ignore = "requires python3 on PATH"]
async fn python_dynamic_import_is_caught_by_the_worker_gate() {
    // The line continuation hides the import from the static scanner;
    // the in-worker gate must still block it.
    let record = python_engine()
        .execute(&python_request(Snippet::new("import \\\nsocket\nresult = 1\n")))
        .await;
    assert_eq!(
        record.outcome,
        Outcome::BlockedCapability { capability: "socket".to_owned() }
    );
}

#[tokio::test]
#[ignore = "requires python3 on PATH"]
async fn python_stub_is_inert_until_reached() {
    let untouched = python_engine()
        .execute(&python_request(Snippet::new("import requests\nresult = 7\n")))
        .await;
    assert_eq!(
        untouched.outcome,
        Outcome::Success {
            result: NormalizedResult::Scalar { value: ScalarValue::Int(7) }
        },
        "an unused stub must not fail the attempt"
    );

    let touched = python_engine()
        .execute(&python_request(Snippet::new("import requests\nresult = requests.get\n")))
        .await;
    assert_eq!(
        touched.outcome,
        Outcome::BlockedCapability { capability: "requests".to_owned() },
        "touching the stub must raise the blocked condition"
    );
}

#[tokio::test]
#[ignore = "requires python3 on PATH"]
async fn python_infinite_loop_times_out_and_is_reclaimed() {
    let record = python_engine()
        .execute(&ExecutionRequest::new(
            Snippet::new("while True:\n    pass\n"),
            example_cohort(),
            limits(Duration::from_millis(800)),
        ))
        .await;
    let Outcome::Timeout { elapsed } = record.outcome else {
        panic!("expected a timeout, got {:?}", record.outcome);
    };
    assert!(elapsed >= Duration::from_millis(800));
    assert!(
        record.duration < Duration::from_secs(10),
        "the attempt must end promptly after the kill"
    );
}

#[tokio::test]
#[ignore = "requires python3 on PATH"]
async fn python_oversized_table_truncates() {
    let record = python_engine()
        .execute(&python_request(Snippet::new(
            "result = [{\"n\": i} for i in range(10000)]\n",
        )))
        .await;
    let Outcome::Success { result: NormalizedResult::Table { rows, truncated } } = record.outcome
    else {
        panic!("expected a table, got {:?}", record.outcome);
    };
    assert_eq!(rows.len(), 500);
    assert!(truncated);
}

#[tokio::test]
#[ignore = "requires python3 on PATH"]
async fn python_memory_hog_reports_resource_exceeded() {
    let record = python_engine()
        .execute(&python_request(Snippet::new("result = \"x\" * (10 ** 10)\n")))
        .await;
    assert_eq!(record.outcome, Outcome::ResourceExceeded { kind: ResourceKind::Memory });
}

#[tokio::test]
#[ignore = "requires python3 on PATH"]
async fn python_snippet_prints_cannot_corrupt_the_wire_protocol() {
    let record = python_engine()
        .execute(&python_request(Snippet::new(
            "print(\"LANCET_RESULT_BEGIN\")\nresult = 5\n",
        )))
        .await;
    assert_eq!(
        record.outcome,
        Outcome::Success {
            result: NormalizedResult::Scalar { value: ScalarValue::Int(5) }
        }
    );
}

#[tokio::test]
#[ignore = "requires python3 on PATH"]
async fn python_same_snippet_twice_is_value_equal() {
    let engine = python_engine();
    let req = python_request(diagnosis_counts_snippet());
    let first = engine.execute(&req).await;
    let second = engine.execute(&req).await;
    assert_eq!(first.outcome, second.outcome);
    assert_eq!(first.snippet_hash, second.snippet_hash);
    assert_eq!(first.dataset_fingerprint, second.dataset_fingerprint);
}
