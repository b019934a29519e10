use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;

use crate::error::ReconError;
use crate::key::NullKeyPolicy;
use crate::merge::{MergeRule, MergeSpec};
use crate::model::ValueType;
use crate::recipes::{RereleaseColumns, Role, RELEASE_KEY};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ReconConfig {
    pub name: String,
    pub kind: JobKind,
    /// Primary input CSV, relative to the config file.
    pub input: String,
    /// Table whose keys are removed from `input` (`filter` jobs).
    #[serde(default)]
    pub search: Option<String>,
    /// Voice-actor table (`actors` jobs).
    #[serde(default)]
    pub actors: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub key_columns: Vec<String>,
    #[serde(default)]
    pub sort_columns: Option<Vec<String>>,
    #[serde(default)]
    pub null_keys: NullKeyPolicy,
    #[serde(default)]
    pub merge: BTreeMap<String, MergeRule>,
    #[serde(default)]
    pub rereleases: RereleaseColumns,
    /// Forced column types; other columns are inferred.
    #[serde(default)]
    pub types: HashMap<String, ValueType>,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Generic group-and-merge.
    Reconcile,
    /// Anti-join of `input` against `search`.
    Filter,
    Rereleases,
    Actors,
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Reconcile => write!(f, "reconcile"),
            Self::Filter => write!(f, "filter"),
            Self::Rereleases => write!(f, "rereleases"),
            Self::Actors => write!(f, "actors"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub json: Option<String>,
    #[serde(default)]
    pub csv: Option<String>,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.input.trim().is_empty() {
            return Err(ReconError::ConfigValidation("input must not be empty".into()));
        }

        match self.kind {
            JobKind::Reconcile => {
                if self.key_columns.is_empty() {
                    return Err(ReconError::ConfigValidation(
                        "reconcile jobs require at least one key column".into(),
                    ));
                }
                if let Some(column) = self.merge.keys().find(|c| self.key_columns.contains(*c)) {
                    return Err(ReconError::ConfigValidation(format!(
                        "merge column '{column}' is also a key column"
                    )));
                }
            }
            JobKind::Filter => {
                if self.search.is_none() {
                    return Err(ReconError::ConfigValidation(
                        "filter jobs require a 'search' table".into(),
                    ));
                }
            }
            JobKind::Actors => {
                if self.actors.is_none() {
                    return Err(ReconError::ConfigValidation(
                        "actors jobs require an 'actors' table".into(),
                    ));
                }
                self.parsed_role()?;
            }
            JobKind::Rereleases => {
                if self.rereleases.identity.is_empty() {
                    return Err(ReconError::ConfigValidation(
                        "rereleases.identity must not be empty".into(),
                    ));
                }
            }
        }

        // Options that belong to another job kind are a config mistake
        if self.kind != JobKind::Filter && self.search.is_some() {
            return Err(ReconError::ConfigValidation(format!(
                "'search' is only valid for filter jobs, not {}",
                self.kind
            )));
        }
        if self.kind != JobKind::Reconcile && !self.merge.is_empty() {
            return Err(ReconError::ConfigValidation(format!(
                "[merge] is only valid for reconcile jobs, not {}",
                self.kind
            )));
        }

        Ok(())
    }

    pub fn parsed_role(&self) -> Result<Role, ReconError> {
        match self.role {
            Some(ref role) => role.parse(),
            None => Err(ReconError::ConfigValidation("actors jobs require a 'role'".into())),
        }
    }

    pub fn merge_spec(&self) -> MergeSpec {
        self.merge.iter().map(|(c, r)| (c.as_str(), *r)).collect()
    }

    /// Key columns for a filter job; release identity when none are given.
    pub fn filter_key(&self) -> Vec<String> {
        if self.key_columns.is_empty() {
            RELEASE_KEY.iter().map(|c| c.to_string()).collect()
        } else {
            self.key_columns.clone()
        }
    }

    /// Every CSV file this job reads, primary input first.
    pub fn input_files(&self) -> Vec<&str> {
        let mut files = vec![self.input.as_str()];
        files.extend(self.search.as_deref());
        files.extend(self.actors.as_deref());
        files
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
