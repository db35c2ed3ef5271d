//! Per-run outcome bookkeeping and process exit status.

use serde::Serialize;

use crate::loader::Rejection;

/// The two passes over the module set (plus the validation-only check).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Pass {
    Build,
    Catalog,
    Check,
}

impl Pass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Pass::Build => "build",
            Pass::Catalog => "catalog",
            Pass::Check => "check",
        }
    }
}

/// Where inside a pass a module failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Load,
    Generate,
    Export,
    Publish,
    Document,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Load => "load",
            Phase::Generate => "generate",
            Phase::Export => "export",
            Phase::Publish => "publish",
            Phase::Document => "document",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
}

/// One module that did not make it through a pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleFailure {
    pub id: String,
    pub phase: Phase,
    pub severity: Severity,
    pub message: String,
}

impl ModuleFailure {
    pub fn error(id: &str, phase: Phase, message: impl Into<String>) -> Self {
        let failure = Self {
            id: id.to_string(),
            phase,
            severity: Severity::Error,
            message: message.into(),
        };
        tracing::error!(
            module = %failure.id,
            phase = phase.as_str(),
            "{}",
            failure.message
        );
        failure
    }
}

impl From<&Rejection> for ModuleFailure {
    fn from(rejection: &Rejection) -> Self {
        Self {
            id: rejection.id.clone(),
            phase: Phase::Load,
            severity: if rejection.reason.is_warning() {
                Severity::Warning
            } else {
                Severity::Error
            },
            message: rejection.reason.to_string(),
        }
    }
}

/// Overall result of a run, mapped to the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every discovered module went through
    Success,
    /// Nothing to do: the design tree holds no modules
    NoModules,
    /// At least one module was skipped or failed
    PartialFailure,
    /// The run could not complete
    Fatal,
}

impl RunStatus {
    pub fn exit_code(&self) -> i32 {
        match self {
            RunStatus::Success | RunStatus::NoModules => 0,
            RunStatus::PartialFailure => 1,
            RunStatus::Fatal => 2,
        }
    }
}

/// What one pass did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub pass: Pass,
    pub discovered: usize,
    /// Ids that completed the pass, in discovery order
    pub succeeded: Vec<String>,
    pub failures: Vec<ModuleFailure>,
}

impl RunReport {
    pub fn new(pass: Pass, discovered: usize) -> Self {
        Self {
            pass,
            discovered,
            succeeded: Vec::new(),
            failures: Vec::new(),
        }
    }

    pub fn status(&self) -> RunStatus {
        if !self.failures.is_empty() {
            RunStatus::PartialFailure
        } else if self.discovered == 0 {
            RunStatus::NoModules
        } else {
            RunStatus::Success
        }
    }

    pub fn failed_ids(&self) -> Vec<&str> {
        self.failures.iter().map(|f| f.id.as_str()).collect()
    }

    /// Log a one-line summary of the pass.
    pub fn log_summary(&self) {
        let pass = self.pass.as_str();
        match self.status() {
            RunStatus::NoModules => {
                tracing::warn!("{}: no design modules found", pass);
            }
            RunStatus::Success => {
                tracing::info!(
                    "{}: {} of {} module(s) succeeded",
                    pass,
                    self.succeeded.len(),
                    self.discovered
                );
            }
            _ => {
                tracing::warn!(
                    "{}: {} of {} module(s) succeeded, {} failed: {}",
                    pass,
                    self.succeeded.len(),
                    self.discovered,
                    self.failures.len(),
                    self.failed_ids().join(", ")
                );
            }
        }
    }
}
