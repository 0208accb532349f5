use std::time::{Duration, Instant};

use proptest::prelude::*;

use stallguard::config::{DetectorConfig, RawDetectorConfig};
use stallguard::engine::detector::{evaluate, DetectorView};
use stallguard::types::{ExecutionState, StallReason};

fn config_strategy() -> impl Strategy<Value = DetectorConfig> {
    // Stay inside the validated ranges.
    (5.0..300.0f64, 5.0..120.0f64).prop_map(|(stall_timeout, output_timeout)| {
        DetectorConfig::try_from(RawDetectorConfig {
            stall_timeout,
            output_timeout,
            ..RawDetectorConfig::default()
        })
        .expect("strategy produced an invalid config")
    })
}

proptest! {
    /// The evaluator fires iff at least one threshold is exceeded, and the
    /// absolute deadline always takes precedence.
    #[test]
    fn trigger_matches_threshold_arithmetic(
        cfg in config_strategy(),
        silence_ms in 0u64..400_000,
        window_ms in 0u64..400_000,
        deadline_offset_ms in proptest::option::of(0i64..400_000),
    ) {
        let now = Instant::now() + Duration::from_secs(500_000);
        let view = DetectorView {
            state: ExecutionState::Running,
            exited: false,
            recovering: false,
            deadline: deadline_offset_ms
                .map(|off| now - Duration::from_millis(off.unsigned_abs())),
            last_output_time: Some(now - Duration::from_millis(silence_ms)),
            stall_window_start: Some(now - Duration::from_millis(window_ms)),
        };

        let deadline_passed = matches!(deadline_offset_ms, Some(off) if off > 0);
        let silent_too_long = Duration::from_millis(silence_ms) > cfg.output_timeout;
        let window_exceeded = Duration::from_millis(window_ms) > cfg.stall_timeout;

        let expected = if deadline_passed {
            Some(StallReason::AbsoluteTimeout)
        } else if silent_too_long {
            Some(StallReason::OutputSilence)
        } else if window_exceeded {
            Some(StallReason::StallWindow)
        } else {
            None
        };

        prop_assert_eq!(evaluate(&view, &cfg, now), expected);
    }

    /// Exited or mid-recovery executions are never flagged, no matter how
    /// stale their timestamps are.
    #[test]
    fn settled_executions_never_trigger(
        cfg in config_strategy(),
        age_ms in 0u64..400_000,
        exited in any::<bool>(),
    ) {
        let now = Instant::now() + Duration::from_secs(500_000);
        let view = DetectorView {
            state: ExecutionState::Running,
            exited,
            recovering: !exited,
            deadline: Some(now - Duration::from_millis(age_ms)),
            last_output_time: Some(now - Duration::from_millis(age_ms)),
            stall_window_start: Some(now - Duration::from_millis(age_ms)),
        };

        prop_assert_eq!(evaluate(&view, &cfg, now), None);
    }
}
