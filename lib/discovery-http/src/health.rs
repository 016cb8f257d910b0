//! Health report served on `/health`

use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Outcome of a single check
#[derive(Clone, Debug, PartialEq)]
pub struct HealthCheckResult {
    pub status: HealthStatus,
    pub description: Option<String>,
    pub data: Map<String, Value>,
    pub exception: Option<String>,
}

impl HealthCheckResult {
    pub fn healthy() -> Self {
        Self {
            status: HealthStatus::Healthy,
            description: None,
            data: Map::new(),
            exception: None,
        }
    }

    pub fn degraded(description: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Degraded,
            description: Some(description.into()),
            ..Self::healthy()
        }
    }

    pub fn unhealthy(description: impl Into<String>) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            description: Some(description.into()),
            ..Self::healthy()
        }
    }

    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }
}

type CheckFn = Arc<dyn Fn() -> HealthCheckResult + Send + Sync>;

struct RegisteredCheck {
    name: String,
    tags: Vec<String>,
    check: CheckFn,
}

/// Named health checks, starting with an always-healthy `self` check
pub struct HealthChecks {
    checks: Vec<RegisteredCheck>,
}

impl HealthChecks {
    pub fn new() -> Self {
        Self { checks: Vec::new() }.add_check("self", &["ready"], HealthCheckResult::healthy)
    }

    pub fn add_check<F>(mut self, name: impl Into<String>, tags: &[&str], check: F) -> Self
    where
        F: Fn() -> HealthCheckResult + Send + Sync + 'static,
    {
        self.checks.push(RegisteredCheck {
            name: name.into(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            check: Arc::new(check),
        });
        self
    }

    /// Run every check; the overall status is the worst individual status
    pub fn run(&self) -> HealthReport {
        let started = Instant::now();
        let mut entries = Vec::with_capacity(self.checks.len());

        for registered in &self.checks {
            let check_started = Instant::now();
            let result = (registered.check)();
            entries.push(HealthEntry {
                name: registered.name.clone(),
                status: result.status,
                description: result.description,
                data: result.data,
                tags: registered.tags.clone(),
                duration: format_duration(check_started.elapsed()),
                exception: result.exception,
            });
        }

        let status = entries
            .iter()
            .map(|entry| entry.status)
            .max()
            .unwrap_or(HealthStatus::Healthy);

        HealthReport {
            status,
            total_duration: format_duration(started.elapsed()),
            checks: entries,
        }
    }
}

impl Default for HealthChecks {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub status: HealthStatus,
    pub total_duration: String,
    pub checks: Vec<HealthEntry>,
}

#[derive(Clone, Debug, Serialize)]
pub struct HealthEntry {
    pub name: String,
    pub status: HealthStatus,
    pub description: Option<String>,
    pub data: Map<String, Value>,
    pub tags: Vec<String>,
    pub duration: String,
    pub exception: Option<String>,
}

/// `hh:mm:ss.fffffff`, with seven digits of 100ns ticks
pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let ticks = duration.subsec_nanos() / 100;
    format!(
        "{:02}:{:02}:{:02}.{:07}",
        total_secs / 3600,
        (total_secs / 60) % 60,
        total_secs % 60,
        ticks
    )
}
