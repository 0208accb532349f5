mod common;
use crate::common::{init_tracing, with_timeout, DetectorConfigBuilder, RequestBuilder};

use std::error::Error;
use std::sync::Arc;
use std::time::Instant;

use stallguard::{CommandRequest, ExecutionState, Supervisor};

type TestResult = Result<(), Box<dyn Error>>;

#[tokio::test]
async fn stalled_sleep_does_not_delay_concurrent_echoes() -> TestResult {
    init_tracing();
    let supervisor = Arc::new(Supervisor::new(DetectorConfigBuilder::fast().build()));

    // One execution that will stall out...
    let stuck = {
        let supervisor = Arc::clone(&supervisor);
        tokio::spawn(async move {
            let request = RequestBuilder::new(["sleep", "10"]).timeout_secs(3).build();
            supervisor.execute(request).await
        })
    };

    // ...must not affect these.
    let started = Instant::now();
    for i in 0..3 {
        let report = with_timeout(
            supervisor.execute(CommandRequest::new(["echo", &format!("ok{i}")])),
        )
        .await?;
        assert_eq!(report.state, ExecutionState::Completed);
        assert!(report.stdout_lines.iter().any(|l| l == &format!("ok{i}")));
    }
    // All three echoes finish long before the sleep's 3s timeout resolves.
    assert!(started.elapsed().as_secs_f64() < 3.0);

    let stuck_report = with_timeout(async { stuck.await }).await??;
    assert!(matches!(
        stuck_report.state,
        ExecutionState::Timeout | ExecutionState::Recovered
    ));

    supervisor.shutdown().await;
    Ok(())
}

#[tokio::test]
async fn per_execution_state_is_isolated() -> TestResult {
    init_tracing();
    let supervisor = Arc::new(Supervisor::new(DetectorConfigBuilder::fast().build()));

    let slow = {
        let supervisor = Arc::clone(&supervisor);
        tokio::spawn(async move {
            let request = RequestBuilder::new(["sleep", "30"]).timeout_secs(3).build();
            supervisor.execute(request).await
        })
    };
    let fast = {
        let supervisor = Arc::clone(&supervisor);
        tokio::spawn(async move {
            supervisor
                .execute(CommandRequest::new(["echo", "fast"]))
                .await
        })
    };

    let fast_report = with_timeout(async { fast.await }).await??;
    let slow_report = with_timeout(async { slow.await }).await??;

    assert_eq!(fast_report.state, ExecutionState::Completed);
    assert_eq!(fast_report.recovery_attempts, 0);
    assert!(fast_report.errors.is_empty());

    assert!(slow_report.recovery_attempts >= 1);
    assert_ne!(fast_report.id, slow_report.id);

    supervisor.shutdown().await;
    Ok(())
}
