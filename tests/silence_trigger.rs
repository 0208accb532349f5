mod common;
use crate::common::{init_tracing, with_timeout, DetectorConfigBuilder, RequestBuilder};

use std::error::Error;

use stallguard::{ExecutionState, Supervisor};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn silent_process_is_flagged_stalled_before_it_finishes() -> TestResult {
    init_tracing();
    // Tight silence window, roomy stall window: only the silence trigger can
    // fire here.
    let config = DetectorConfigBuilder::fast()
        .output_timeout(5.0)
        .stall_timeout(60.0)
        .build();
    let supervisor = Supervisor::new(config);

    // sleep produces no output and would finish naturally at 7s, inside any
    // overall window; it must still be flagged. Recovery is disabled so the
    // detector-assigned state survives to the report.
    let request = RequestBuilder::new(["sleep", "7"]).auto_recover(false).build();
    let report = with_timeout(supervisor.execute(request)).await?;

    assert_eq!(report.state, ExecutionState::Stalled);
    assert_eq!(report.return_code, Some(0));
    assert_eq!(report.recovery_attempts, 0);
    assert!(
        report
            .warnings
            .iter()
            .any(|w| w.contains("output_silence"))
    );

    supervisor.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn silent_process_with_auto_recovery_gets_recovered() -> TestResult {
    init_tracing();
    let config = DetectorConfigBuilder::fast()
        .output_timeout(5.0)
        .stall_timeout(60.0)
        .build();
    let supervisor = Supervisor::new(config);

    let request = RequestBuilder::new(["sleep", "30"]).auto_recover(true).build();
    let report = with_timeout(supervisor.execute(request)).await?;

    // The interrupt action kills the sleep once silence is detected.
    assert!(matches!(
        report.state,
        ExecutionState::Stalled | ExecutionState::Recovered
    ));
    assert!(report.recovery_attempts >= 1);
    assert!(
        report
            .recovery_history
            .iter()
            .all(|entry| entry.contains("output_silence"))
    );

    supervisor.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn chatty_process_is_not_flagged_by_the_silence_trigger() -> TestResult {
    init_tracing();
    let config = DetectorConfigBuilder::fast()
        .output_timeout(5.0)
        .stall_timeout(60.0)
        .build();
    let supervisor = Supervisor::new(config);

    // Emits a line every second for 6 seconds: runs past output_timeout but
    // is never silent for that long.
    let request = RequestBuilder::shell(
        "for i in 1 2 3 4 5 6; do echo tick$i; sleep 1; done",
    )
    .build();
    let report = with_timeout(supervisor.execute(request)).await?;

    assert_eq!(report.state, ExecutionState::Completed);
    assert_eq!(report.stdout_lines.len(), 6);
    assert_eq!(report.recovery_attempts, 0);

    supervisor.shutdown().await;
    Ok(())
}
