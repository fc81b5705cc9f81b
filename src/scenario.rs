use reqwest::{Method, StatusCode};
use serde::Serialize;
use std::fmt;
use tracing::{error, info, warn};

use crate::probe::EndpointProbe;

/// A request method paired with the status the server must answer with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Scenario {
    pub method: Method,
    pub expected: StatusCode,
}

impl Scenario {
    pub fn new(method: Method, expected: StatusCode) -> Self {
        Self { method, expected }
    }

    /// The resource is readable.
    pub fn get_ok() -> Self {
        Self::new(Method::GET, StatusCode::OK)
    }

    /// The resource is read-only.
    pub fn post_not_allowed() -> Self {
        Self::new(Method::POST, StatusCode::METHOD_NOT_ALLOWED)
    }

    pub fn check(&self, actual: StatusCode) -> Outcome {
        if actual == self.expected {
            Outcome::Passed { status: actual }
        } else {
            Outcome::Failed {
                expected: self.expected,
                actual,
            }
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.method, self.expected.as_u16())
    }
}

pub fn default_scenarios() -> Vec<Scenario> {
    vec![Scenario::get_ok(), Scenario::post_not_allowed()]
}

/// Result of one attempt. A status mismatch and a request that never got
/// an answer are kept apart.
#[derive(Debug)]
pub enum Outcome {
    Passed { status: StatusCode },
    Failed { expected: StatusCode, actual: StatusCode },
    Errored(anyhow::Error),
}

impl Outcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, Outcome::Passed { .. })
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Outcome::Passed { status } => Some(*status),
            Outcome::Failed { actual, .. } => Some(*actual),
            Outcome::Errored(_) => None,
        }
    }
}

#[derive(Debug)]
pub struct ScenarioResult {
    pub scenario: Scenario,
    pub attempts: Vec<Outcome>,
}

impl ScenarioResult {
    pub fn passed(&self) -> bool {
        self.attempts.iter().all(Outcome::is_passed)
    }

    /// True when every attempt that got a response saw the same status.
    pub fn is_idempotent(&self) -> bool {
        let mut statuses = self.attempts.iter().filter_map(Outcome::status);
        match statuses.next() {
            Some(first) => statuses.all(|s| s == first),
            None => true,
        }
    }
}

#[derive(Debug, Default)]
pub struct Report {
    pub results: Vec<ScenarioResult>,
}

impl Report {
    fn count(&self, pred: impl Fn(&Outcome) -> bool) -> usize {
        self.results
            .iter()
            .flat_map(|r| r.attempts.iter())
            .filter(|o| pred(o))
            .count()
    }

    pub fn passed(&self) -> usize {
        self.count(Outcome::is_passed)
    }

    pub fn failed(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Failed { .. }))
    }

    pub fn errored(&self) -> usize {
        self.count(|o| matches!(o, Outcome::Errored(_)))
    }

    pub fn all_passed(&self) -> bool {
        self.results.iter().all(ScenarioResult::passed)
    }

    /// 0 when everything passed, 2 when any request errored, 1 otherwise.
    pub fn exit_code(&self) -> u8 {
        if self.errored() > 0 {
            2
        } else if self.failed() > 0 {
            1
        } else {
            0
        }
    }

    pub fn summary(&self) -> ReportSummary {
        ReportSummary {
            passed: self.passed(),
            failed: self.failed(),
            errored: self.errored(),
            scenarios: self
                .results
                .iter()
                .map(|r| ScenarioSummary {
                    method: r.scenario.method.to_string(),
                    expected: r.scenario.expected.as_u16(),
                    statuses: r
                        .attempts
                        .iter()
                        .map(|o| o.status().map(|s| s.as_u16()))
                        .collect(),
                    errors: r
                        .attempts
                        .iter()
                        .filter_map(|o| match o {
                            Outcome::Errored(e) => Some(format!("{e:#}")),
                            _ => None,
                        })
                        .collect(),
                    passed: r.passed(),
                    idempotent: r.is_idempotent(),
                })
                .collect(),
        }
    }
}

/// Serializable view of a [`Report`].
#[derive(Debug, Serialize)]
pub struct ReportSummary {
    pub passed: usize,
    pub failed: usize,
    pub errored: usize,
    pub scenarios: Vec<ScenarioSummary>,
}

#[derive(Debug, Serialize)]
pub struct ScenarioSummary {
    pub method: String,
    pub expected: u16,
    /// One entry per attempt; `null` when the request errored.
    pub statuses: Vec<Option<u16>>,
    pub errors: Vec<String>,
    pub passed: bool,
    pub idempotent: bool,
}

/// Runs every scenario `repeat` times, one request at a time.
///
/// Failures and transport errors are recorded and never stop the
/// remaining attempts. A `repeat` of 0 is treated as 1.
pub async fn run_scenarios(
    probe: &EndpointProbe,
    scenarios: &[Scenario],
    repeat: u32,
) -> Report {
    let repeat = repeat.max(1);
    let mut report = Report::default();

    for scenario in scenarios {
        let mut attempts = Vec::new();

        for attempt in 1..=repeat {
            let outcome = match probe.probe(scenario.method.clone()).await {
                Ok(status) => scenario.check(status),
                Err(e) => Outcome::Errored(e),
            };

            match &outcome {
                Outcome::Passed { status } => {
                    info!(%scenario, attempt, status = status.as_u16(), "Scenario passed");
                }
                Outcome::Failed { expected, actual } => {
                    warn!(
                        %scenario,
                        attempt,
                        expected = expected.as_u16(),
                        actual = actual.as_u16(),
                        "Unexpected status code"
                    );
                }
                Outcome::Errored(e) => {
                    error!(%scenario, attempt, error = ?e, "Request failed");
                }
            }

            attempts.push(outcome);
        }

        let result = ScenarioResult {
            scenario: scenario.clone(),
            attempts,
        };
        if !result.is_idempotent() {
            warn!(scenario = %result.scenario, "Status code changed between attempts");
        }
        report.results.push(result);
    }

    report
}
