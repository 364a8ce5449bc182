// Application registration
//
// Exactly one application runs on top of a framework instance. It exposes
// its status and name through `SmrtApp`; the binding is set once at startup.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Status an application reports about itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationStatus {
    pub name: String,
    pub status: String,
    pub version: String,
}

impl ApplicationStatus {
    pub fn new(
        name: impl Into<String>,
        status: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            status: status.into(),
            version: version.into(),
        }
    }
}

/// Capability contract for the application mounted on the framework.
///
/// Both required methods are synchronous and expected to be side-effect free.
pub trait SmrtApp: Send + Sync + 'static {
    /// Current status of the application
    fn status(&self) -> ApplicationStatus;

    /// Human-readable application name
    fn application_name(&self) -> String;

    /// Application version, taken from the status by default
    fn version(&self) -> String {
        self.status().version
    }
}

/// Single-assignment slot holding the registered application.
#[derive(Default)]
pub struct ApplicationBinding {
    app: OnceLock<Arc<dyn SmrtApp>>,
}

impl ApplicationBinding {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `app`. A second call fails and leaves the first binding in place.
    pub fn bind(&self, app: Arc<dyn SmrtApp>) -> Result<()> {
        let name = app.application_name();
        self.app.set(app).map_err(|rejected| {
            Error::AlreadyRegistered(format!(
                "cannot register '{}', '{}' is already registered",
                rejected.application_name(),
                self.app
                    .get()
                    .map(|existing| existing.application_name())
                    .unwrap_or_default()
            ))
        })?;
        tracing::debug!(application = %name, "application registered");
        Ok(())
    }

    pub fn is_bound(&self) -> bool {
        self.app.get().is_some()
    }

    fn app(&self) -> Result<&Arc<dyn SmrtApp>> {
        self.app.get().ok_or(Error::NoApplicationBound)
    }

    /// Status of the bound application, passed through verbatim.
    pub fn status(&self) -> Result<ApplicationStatus> {
        Ok(self.app()?.status())
    }

    pub fn application_name(&self) -> Result<String> {
        Ok(self.app()?.application_name())
    }

    pub fn version(&self) -> Result<String> {
        Ok(self.app()?.version())
    }
}

impl fmt::Debug for ApplicationBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplicationBinding")
            .field(
                "app",
                &self.app.get().map(|app| app.application_name()),
            )
            .finish()
    }
}
