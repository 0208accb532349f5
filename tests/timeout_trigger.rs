mod common;
use crate::common::{init_tracing, with_timeout, DetectorConfigBuilder, RequestBuilder};

use std::error::Error;
use std::time::Instant;

use stallguard::{ExecutionState, Supervisor};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn overrunning_command_is_timed_out_and_recovered() -> TestResult {
    init_tracing();
    let supervisor = Supervisor::new(DetectorConfigBuilder::fast().build());

    let started = Instant::now();
    let request = RequestBuilder::new(["sleep", "8"])
        .timeout_secs(3)
        .auto_recover(true)
        .build();
    let report = with_timeout(supervisor.execute(request)).await?;

    // Never silently RUNNING forever: the default interrupt action kills the
    // sleep, so the execution ends well before its natural 8s runtime.
    assert!(started.elapsed().as_secs_f64() < 7.0);
    assert!(matches!(
        report.state,
        ExecutionState::Timeout | ExecutionState::Recovered
    ));
    assert!(report.recovery_attempts >= 1);
    assert_eq!(
        report.recovery_history.len(),
        report.recovery_attempts as usize
    );
    assert!(
        report
            .recovery_history
            .iter()
            .all(|entry| entry.contains("absolute_timeout"))
    );

    supervisor.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn timeout_without_auto_recovery_still_cancels() -> TestResult {
    init_tracing();
    let supervisor = Supervisor::new(DetectorConfigBuilder::fast().build());

    let started = Instant::now();
    let request = RequestBuilder::new(["sleep", "8"])
        .timeout_secs(3)
        .auto_recover(false)
        .build();
    let report = with_timeout(supervisor.execute(request)).await?;

    assert!(started.elapsed().as_secs_f64() < 7.0);
    assert_eq!(report.state, ExecutionState::Timeout);
    assert_eq!(report.recovery_attempts, 0);
    assert!(report.recovery_history.is_empty());
    assert!(
        report
            .warnings
            .iter()
            .any(|w| w.contains("auto-recovery disabled"))
    );

    supervisor.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn command_finishing_inside_its_timeout_is_untouched() -> TestResult {
    init_tracing();
    let supervisor = Supervisor::new(DetectorConfigBuilder::fast().build());

    let request = RequestBuilder::new(["sleep", "1"]).timeout_secs(10).build();
    let report = with_timeout(supervisor.execute(request)).await?;

    assert_eq!(report.state, ExecutionState::Completed);
    assert_eq!(report.return_code, Some(0));
    assert_eq!(report.recovery_attempts, 0);

    supervisor.shutdown().await;
    Ok(())
}
