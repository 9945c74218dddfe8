use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Process-global circuit breaker for one vendor target.
///
/// Closed: every attempt's outcome lands in a sliding window of the last
/// `window_size` calls; once the window is full and the failure ratio
/// reaches `failure_ratio`, the breaker opens. Open: rejects fast until
/// `open_duration` elapses. Half-open: admits up to `probe_budget` probes;
/// that many successes close it, any failure re-opens it.
pub struct CircuitBreaker {
    window_size: usize,
    failure_ratio: f64,
    open_duration: Duration,
    probe_budget: u32,
    state: Mutex<State>,
}

struct State {
    phase: Phase,
    window: VecDeque<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Closed,
    Open { until: Instant },
    HalfOpen { in_flight: u32, successes: u32 },
}

impl CircuitBreaker {
    pub fn new(
        window_size: usize,
        failure_ratio: f64,
        open_duration: Duration,
        probe_budget: u32,
    ) -> Self {
        Self {
            window_size: window_size.max(1),
            failure_ratio,
            open_duration,
            probe_budget: probe_budget.max(1),
            state: Mutex::new(State {
                phase: Phase::Closed,
                window: VecDeque::new(),
            }),
        }
    }

    /// Ask permission for one attempt. `false` means reject fast.
    pub fn try_acquire(&self) -> bool {
        let mut state = self.state.lock().unwrap();
        match state.phase {
            Phase::Closed => true,
            Phase::Open { until } => {
                if Instant::now() < until {
                    false
                } else {
                    state.phase = Phase::HalfOpen {
                        in_flight: 1,
                        successes: 0,
                    };
                    true
                }
            }
            Phase::HalfOpen {
                in_flight,
                successes,
            } => {
                if in_flight < self.probe_budget {
                    state.phase = Phase::HalfOpen {
                        in_flight: in_flight + 1,
                        successes,
                    };
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut state = self.state.lock().unwrap();
        match state.phase {
            Phase::Closed => {
                Self::push(&mut state.window, self.window_size, true);
            }
            Phase::HalfOpen {
                in_flight,
                successes,
            } => {
                let successes = successes + 1;
                if successes >= self.probe_budget {
                    state.phase = Phase::Closed;
                    state.window.clear();
                } else {
                    state.phase = Phase::HalfOpen {
                        in_flight: in_flight.saturating_sub(1),
                        successes,
                    };
                }
            }
            Phase::Open { .. } => {}
        }
    }

    pub fn record_failure(&self) {
        let mut state = self.state.lock().unwrap();
        match state.phase {
            Phase::Closed => {
                Self::push(&mut state.window, self.window_size, false);
                if state.window.len() >= self.window_size {
                    let failures = state.window.iter().filter(|ok| !**ok).count();
                    let ratio = failures as f64 / state.window.len() as f64;
                    if ratio >= self.failure_ratio {
                        state.phase = Phase::Open {
                            until: Instant::now() + self.open_duration,
                        };
                        state.window.clear();
                    }
                }
            }
            Phase::HalfOpen { .. } => {
                state.phase = Phase::Open {
                    until: Instant::now() + self.open_duration,
                };
                state.window.clear();
            }
            Phase::Open { .. } => {}
        }
    }

    pub fn is_open(&self) -> bool {
        let state = self.state.lock().unwrap();
        matches!(state.phase, Phase::Open { until } if Instant::now() < until)
    }

    fn push(window: &mut VecDeque<bool>, cap: usize, outcome: bool) {
        if window.len() == cap {
            window.pop_front();
        }
        window.push_back(outcome);
    }
}
