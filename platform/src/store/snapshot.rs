//! Persisted snapshot layout

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{BuildJob, Installation, Project, Repository, Service};

/// Every entity of the platform, keyed by ID.
///
/// Serialized as a single JSON document and rewritten in full on every
/// mutation. Missing maps deserialize as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub projects: BTreeMap<String, Project>,
    #[serde(default)]
    pub services: BTreeMap<String, Service>,
    #[serde(default)]
    pub repos: BTreeMap<String, Repository>,
    #[serde(default)]
    pub installations: BTreeMap<String, Installation>,
    #[serde(default)]
    pub build_jobs: BTreeMap<String, BuildJob>,
}
