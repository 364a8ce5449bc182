//! The reserved `GET /status` endpoint.
//!
//! Combines framework metadata, the bound application's own status, the
//! server clock and the request counters into one snapshot.

use crate::counters::{CounterSet, CounterSnapshot};
use crate::registration::{ApplicationBinding, ApplicationStatus};
use crate::routing::EndpointDefinition;
use crate::{HttpRequest, HttpResponse, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Path the status endpoint is served on. Applications cannot register it.
pub const STATUS_PATH: &str = "/status";

/// Media type the status endpoint produces.
pub const STATUS_MEDIA_TYPE: &str = "application/se.novafaen.smrt.status.v1+json";

/// Version reported in `smrt.smrt_version`.
pub const SMRT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameworkInfo {
    pub smrt_version: String,
    pub app_loaded: bool,
    /// Seconds since the framework instance was created
    pub uptime: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub smrt: FrameworkInfo,
    pub application: ApplicationStatus,
    /// Unix seconds
    pub server_time: i64,
    pub status: CounterSnapshot,
}

/// Read-only view over the counters and the application binding.
#[derive(Debug)]
pub struct StatusEndpoint {
    counters: Arc<CounterSet>,
    binding: Arc<ApplicationBinding>,
    started: DateTime<Utc>,
}

impl StatusEndpoint {
    pub fn new(counters: Arc<CounterSet>, binding: Arc<ApplicationBinding>) -> Self {
        Self {
            counters,
            binding,
            started: Utc::now(),
        }
    }

    /// Build the snapshot. Fails with `NoApplicationBound` until an
    /// application is registered.
    pub fn report(&self) -> Result<StatusReport> {
        let application = self.binding.status()?;
        let now = Utc::now();

        Ok(StatusReport {
            smrt: FrameworkInfo {
                smrt_version: SMRT_VERSION.to_string(),
                app_loaded: self.binding.is_bound(),
                uptime: (now - self.started).num_seconds(),
            },
            application,
            server_time: now.timestamp(),
            status: self.counters.snapshot(),
        })
    }

    /// The endpoint definition registered under [`STATUS_PATH`].
    pub(crate) fn definition(self: &Arc<Self>) -> Result<EndpointDefinition> {
        let endpoint = self.clone();
        EndpointDefinition::builder(STATUS_PATH, move |_req: HttpRequest| {
            let endpoint = endpoint.clone();
            async move {
                let report = endpoint.report()?;
                HttpResponse::ok()
                    .content_type(STATUS_MEDIA_TYPE)
                    .with_json(&report)
            }
        })
        .method("GET")
        .produces(STATUS_MEDIA_TYPE)
        .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::counters::Bucket;
    use crate::registration::SmrtApp;
    use crate::Error;

    struct App;

    impl SmrtApp for App {
        fn status(&self) -> ApplicationStatus {
            ApplicationStatus::new("X", "OK", "1.0.0")
        }

        fn application_name(&self) -> String {
            "X".to_string()
        }
    }

    #[test]
    fn test_report_requires_application() {
        let endpoint = StatusEndpoint::new(
            Arc::new(CounterSet::new()),
            Arc::new(ApplicationBinding::new()),
        );
        assert!(matches!(endpoint.report(), Err(Error::NoApplicationBound)));
    }

    #[test]
    fn test_report_shape() {
        let counters = Arc::new(CounterSet::new());
        let binding = Arc::new(ApplicationBinding::new());
        binding.bind(Arc::new(App)).unwrap();
        counters.record(Bucket::Successful);
        counters.record(Bucket::Bad);

        let endpoint = StatusEndpoint::new(counters, binding);
        let report = endpoint.report().unwrap();
        assert!(report.smrt.app_loaded);
        assert!(report.smrt.uptime >= 0);
        assert_eq!(report.smrt.smrt_version, SMRT_VERSION);
        assert_eq!(report.application, ApplicationStatus::new("X", "OK", "1.0.0"));
        assert_eq!(report.status.amount_total, 2);

        let json = serde_json::to_value(&report).unwrap();
        assert!(json["smrt"]["uptime"].is_i64());
        assert!(json["server_time"].is_i64());
        assert_eq!(json["application"]["status"], "OK");
        assert_eq!(json["status"]["amount_bad"], 1);
    }
}
