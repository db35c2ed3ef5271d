//! Loading and contract validation of discovered modules.
//!
//! Every failure here is scoped to one module: the loader returns a tagged
//! [`LoadOutcome`] instead of an error, and [`load_all`] keeps going.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::time::SystemTime;

use shared::{DesignSource, ParameterError, ParameterSpec};
use thiserror::Error;

use crate::contract::DesignModule;
use crate::discovery::DiscoveredModule;
use crate::script::ScriptedDesign;
use crate::source;

/// Why a module was skipped.
#[derive(Error, Debug)]
pub enum RejectReason {
    #[error("cannot read entry point: {0}")]
    Unreadable(#[source] io::Error),

    #[error("malformed design document: {0}")]
    Malformed(String),

    #[error("no parameter definitions declared")]
    MissingParameterDefinitions,

    #[error("invalid parameter definitions: {0}")]
    InvalidParameterDefinitions(#[source] ParameterError),

    #[error("id already used by {}", .0.display())]
    DuplicateId(PathBuf),
}

impl RejectReason {
    /// Contract violations are warnings; broken modules are errors.
    pub fn is_warning(&self) -> bool {
        matches!(
            self,
            RejectReason::MissingParameterDefinitions | RejectReason::DuplicateId(_)
        )
    }
}

/// A module that failed to load.
#[derive(Debug)]
pub struct Rejection {
    pub id: String,
    pub entry_point: PathBuf,
    pub reason: RejectReason,
}

/// A module that satisfies the contract, with what later stages need.
pub struct LoadedModule {
    pub id: String,
    pub entry_point: PathBuf,
    pub dir: PathBuf,
    /// Raw entry-point text, used for description extraction
    pub source_text: String,
    /// Entry-point modification time
    pub modified: SystemTime,
    /// Validated result of `parameter_definitions()`
    pub parameters: Vec<ParameterSpec>,
    pub module: Box<dyn DesignModule>,
}

impl std::fmt::Debug for LoadedModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModule")
            .field("id", &self.id)
            .field("entry_point", &self.entry_point)
            .field("parameters", &self.parameters.len())
            .finish_non_exhaustive()
    }
}

/// Tagged result of loading one module.
#[derive(Debug)]
pub enum LoadOutcome {
    Loaded(LoadedModule),
    Rejected(Rejection),
}

impl LoadOutcome {
    /// Validate an already constructed module against the contract.
    pub fn from_module(
        discovered: &DiscoveredModule,
        source_text: String,
        modified: SystemTime,
        module: Box<dyn DesignModule>,
    ) -> Self {
        match module.parameter_definitions() {
            Ok(parameters) => LoadOutcome::Loaded(LoadedModule {
                id: discovered.id.clone(),
                entry_point: discovered.entry_point.clone(),
                dir: discovered.dir.clone(),
                source_text,
                modified,
                parameters,
                module,
            }),
            Err(e) => reject(discovered, RejectReason::InvalidParameterDefinitions(e)),
        }
    }
}

fn reject(discovered: &DiscoveredModule, reason: RejectReason) -> LoadOutcome {
    LoadOutcome::Rejected(Rejection {
        id: discovered.id.clone(),
        entry_point: discovered.entry_point.clone(),
        reason,
    })
}

/// Load one entry point and check it against the contract.
pub fn load_module(discovered: &DiscoveredModule) -> LoadOutcome {
    let read = fs::read_to_string(&discovered.entry_point).and_then(|text| {
        let modified = fs::metadata(&discovered.entry_point)?.modified()?;
        Ok((text, modified))
    });
    let (text, modified) = match read {
        Ok(pair) => pair,
        Err(e) => return reject(discovered, RejectReason::Unreadable(e)),
    };

    let scanned = source::scan(&text);
    if scanned.unterminated_block {
        return reject(
            discovered,
            RejectReason::Malformed("unterminated block comment".to_string()),
        );
    }

    let design: DesignSource = match serde_json::from_str(&scanned.code) {
        Ok(design) => design,
        Err(e) => return reject(discovered, RejectReason::Malformed(e.to_string())),
    };

    if design.parameters.is_none() {
        return reject(discovered, RejectReason::MissingParameterDefinitions);
    }

    LoadOutcome::from_module(
        discovered,
        text,
        modified,
        Box::new(ScriptedDesign::new(design)),
    )
}

/// Modules that passed validation and those that did not, in discovery order.
#[derive(Debug, Default)]
pub struct LoadedSet {
    pub discovered: usize,
    pub modules: Vec<LoadedModule>,
    pub rejections: Vec<Rejection>,
}

/// Load every discovered module. Never aborts the batch.
pub fn load_all(discovered: &[DiscoveredModule]) -> LoadedSet {
    let outcomes = discovered.iter().map(|module| (module, load_module(module)));
    collect_outcomes(discovered.len(), outcomes)
}

/// Sort outcomes into a [`LoadedSet`]. A loaded module claims its id; later
/// modules that load with the same id are rejected.
pub fn collect_outcomes<'a>(
    discovered: usize,
    outcomes: impl IntoIterator<Item = (&'a DiscoveredModule, LoadOutcome)>,
) -> LoadedSet {
    let mut set = LoadedSet {
        discovered,
        ..Default::default()
    };
    let mut seen: HashMap<String, PathBuf> = HashMap::new();

    for (module, outcome) in outcomes {
        // Only a module that loaded claims its id
        let outcome = match (seen.get(&module.id), outcome) {
            (Some(first), LoadOutcome::Loaded(_)) => {
                reject(module, RejectReason::DuplicateId(first.clone()))
            }
            (_, outcome) => outcome,
        };

        match outcome {
            LoadOutcome::Loaded(loaded) => {
                seen.insert(loaded.id.clone(), loaded.entry_point.clone());
                tracing::debug!(
                    module = %loaded.id,
                    "Loaded {} ({} parameters)",
                    loaded.entry_point.display(),
                    loaded.parameters.len()
                );
                set.modules.push(loaded);
            }
            LoadOutcome::Rejected(rejection) => {
                if rejection.reason.is_warning() {
                    tracing::warn!(
                        module = %rejection.id,
                        phase = "load",
                        "Skipping {}: {}",
                        rejection.entry_point.display(),
                        rejection.reason
                    );
                } else {
                    tracing::error!(
                        module = %rejection.id,
                        phase = "load",
                        "Skipping {}: {}",
                        rejection.entry_point.display(),
                        rejection.reason
                    );
                }
                set.rejections.push(rejection);
            }
        }
    }

    set
}
