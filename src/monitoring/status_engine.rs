//! Pure status state machine. No I/O happens here.

use crate::db::enums::{EndpointStatus, NotificationType};
use crate::monitoring::probe::ProbeOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub previous: Option<EndpointStatus>,
    pub new_status: EndpointStatus,
    /// Set iff `new_status` differs from `previous`.
    pub notify: Option<NotificationType>,
}

impl Transition {
    pub fn changed(&self) -> bool {
        self.notify.is_some()
    }
}

/// Health implied by a single outcome, in priority order: failure, slowness,
/// healthy.
pub fn classify(outcome: &ProbeOutcome, timeout_ms: i32) -> EndpointStatus {
    if !outcome.success {
        EndpointStatus::Down
    } else if outcome.response_time_ms > timeout_ms {
        EndpointStatus::Warning
    } else {
        EndpointStatus::Active
    }
}

/// Computes the next status. An endpoint that was never classified counts as
/// changed, so its first result always notifies.
pub fn transition(
    previous: Option<EndpointStatus>,
    outcome: &ProbeOutcome,
    timeout_ms: i32,
) -> Transition {
    let new_status = classify(outcome, timeout_ms);
    let notify = if previous == Some(new_status) {
        None
    } else {
        Some(NotificationType::for_status(new_status))
    };
    Transition {
        previous,
        new_status,
        notify,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::enums::CheckErrorType;

    fn ok(response_time_ms: i32) -> ProbeOutcome {
        ProbeOutcome::responded(200, response_time_ms)
    }

    const PREVIOUS: [Option<EndpointStatus>; 4] = [
        None,
        Some(EndpointStatus::Active),
        Some(EndpointStatus::Warning),
        Some(EndpointStatus::Down),
    ];

    #[test]
    fn failures_are_down_whatever_the_latency() {
        let outcomes = [
            ProbeOutcome::responded(500, 10),
            ProbeOutcome::responded(404, 90_000),
            ProbeOutcome::failed(CheckErrorType::Timeout, "timed out".into(), 5_000),
            ProbeOutcome::failed(CheckErrorType::Dns, "dns error".into(), 3),
        ];
        for previous in PREVIOUS {
            for outcome in &outcomes {
                assert_eq!(
                    transition(previous, outcome, 5_000).new_status,
                    EndpointStatus::Down
                );
            }
        }
    }

    #[test]
    fn slow_successes_are_warnings_and_fast_ones_active() {
        for timeout in [1_000, 5_000, 30_000] {
            for previous in PREVIOUS {
                assert_eq!(
                    transition(previous, &ok(timeout + 1), timeout).new_status,
                    EndpointStatus::Warning
                );
                assert_eq!(
                    transition(previous, &ok(timeout), timeout).new_status,
                    EndpointStatus::Active
                );
                assert_eq!(
                    transition(previous, &ok(0), timeout).new_status,
                    EndpointStatus::Active
                );
            }
        }
    }

    #[test]
    fn notifies_iff_status_changes() {
        let outcomes = [ok(100), ok(9_000), ProbeOutcome::responded(502, 100)];
        for previous in PREVIOUS {
            for outcome in &outcomes {
                let t = transition(previous, outcome, 5_000);
                assert_eq!(t.notify.is_some(), previous != Some(t.new_status));
                assert_eq!(t.previous, previous);
            }
        }
    }

    #[test]
    fn slow_response_raises_slow_response() {
        let t = transition(Some(EndpointStatus::Active), &ok(6_000), 5_000);
        assert_eq!(t.new_status, EndpointStatus::Warning);
        assert_eq!(t.notify, Some(NotificationType::SlowResponse));
    }

    #[test]
    fn recovery_from_down_raises_recovered() {
        let t = transition(Some(EndpointStatus::Down), &ok(200), 5_000);
        assert_eq!(t.new_status, EndpointStatus::Active);
        assert_eq!(t.notify, Some(NotificationType::Recovered));
    }

    #[test]
    fn steady_active_is_silent() {
        let t = transition(Some(EndpointStatus::Active), &ok(200), 5_000);
        assert_eq!(t.new_status, EndpointStatus::Active);
        assert_eq!(t.notify, None);
        assert!(!t.changed());
    }

    #[test]
    fn first_check_counts_as_a_transition() {
        let down = ProbeOutcome::failed(CheckErrorType::Connection, "refused".into(), 1);
        assert_eq!(transition(None, &down, 5_000).notify, Some(NotificationType::Down));
        assert_eq!(transition(None, &ok(10), 5_000).notify, Some(NotificationType::Recovered));
    }

    #[test]
    fn a_run_of_identical_results_notifies_once() {
        let down = ProbeOutcome::responded(503, 40);
        let mut status = Some(EndpointStatus::Active);
        let mut notifications = 0;
        for _ in 0..10 {
            let t = transition(status, &down, 5_000);
            if t.notify.is_some() {
                notifications += 1;
            }
            status = Some(t.new_status);
        }
        assert_eq!(notifications, 1);
    }
}
