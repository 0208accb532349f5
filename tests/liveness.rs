mod common;
use crate::common::{init_tracing, with_timeout, DetectorConfigBuilder, RequestBuilder};

use std::error::Error;

use stallguard::{CommandRequest, ExecutionState, Supervisor};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn echo_completes_with_captured_stdout() -> TestResult {
    init_tracing();
    let supervisor = Supervisor::new(DetectorConfigBuilder::fast().build());

    let report = with_timeout(supervisor.execute(CommandRequest::new(["echo", "hi"]))).await?;

    assert_eq!(report.state, ExecutionState::Completed);
    assert_eq!(report.return_code, Some(0));
    assert!(report.stdout_lines.iter().any(|l| l.contains("hi")));
    assert!(report.errors.is_empty());
    assert_eq!(report.recovery_attempts, 0);

    supervisor.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn shell_request_runs_through_the_platform_shell() -> TestResult {
    init_tracing();
    let supervisor = Supervisor::new(DetectorConfigBuilder::fast().build());

    let request = RequestBuilder::shell("echo one && echo two").build();
    let report = with_timeout(supervisor.execute(request)).await?;

    assert_eq!(report.state, ExecutionState::Completed);
    assert_eq!(report.stdout_lines, vec!["one".to_string(), "two".to_string()]);

    supervisor.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn nonzero_exit_is_failed_with_the_real_code() -> TestResult {
    init_tracing();
    let supervisor = Supervisor::new(DetectorConfigBuilder::fast().build());

    let request = RequestBuilder::shell("exit 3").build();
    let report = with_timeout(supervisor.execute(request)).await?;

    assert_eq!(report.state, ExecutionState::Failed);
    assert_eq!(report.return_code, Some(3));

    supervisor.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn missing_executable_fails_with_127_without_throwing() -> TestResult {
    init_tracing();
    let supervisor = Supervisor::new(DetectorConfigBuilder::fast().build());

    let report = with_timeout(
        supervisor.execute(CommandRequest::new(["nonexistent_command_12345"])),
    )
    .await?;

    assert_eq!(report.state, ExecutionState::Failed);
    assert_eq!(report.return_code, Some(127));
    assert!(!report.errors.is_empty());
    assert_eq!(report.recovery_attempts, 0);

    supervisor.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn malformed_requests_fail_synchronously() -> TestResult {
    init_tracing();
    let supervisor = Supervisor::new(DetectorConfigBuilder::fast().build());

    let err = supervisor
        .execute(CommandRequest::new(Vec::<String>::new()))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("non-empty"));

    let request = RequestBuilder::new(["sleep", "1"]).timeout_secs(4000).build();
    assert!(supervisor.execute(request).await.is_err());

    // Nothing was admitted.
    assert_eq!(supervisor.stats().total, 0);

    supervisor.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn environment_report_is_structured_and_usable() -> TestResult {
    init_tracing();
    let report = with_timeout(stallguard::verify_environment()).await;

    assert!(report.async_runtime);
    assert!(report.can_spawn);
    assert!(report.pipes_captured);
    assert!(report.reference_command);
    assert!(report.usable());
    Ok(())
}

#[tokio::test]
async fn working_dir_and_env_overrides_reach_the_child() -> TestResult {
    init_tracing();
    let supervisor = Supervisor::new(DetectorConfigBuilder::fast().build());

    let dir = tempfile::tempdir()?;
    let request = RequestBuilder::shell("echo \"$STALLGUARD_PROBE\" && pwd")
        .env("STALLGUARD_PROBE", "probe-value")
        .working_dir(dir.path())
        .build();

    let report = with_timeout(supervisor.execute(request)).await?;

    assert_eq!(report.state, ExecutionState::Completed);
    assert!(report.stdout_lines.iter().any(|l| l == "probe-value"));
    let canonical = dir.path().canonicalize()?;
    assert!(
        report
            .stdout_lines
            .iter()
            .any(|l| std::path::Path::new(l) == canonical || std::path::Path::new(l) == dir.path())
    );

    supervisor.shutdown().await;
    Ok(())
}
