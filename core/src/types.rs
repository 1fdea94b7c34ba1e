//! Resource kinds served by the handle machinery.
//!
//! Each kind is a marker type implementing `ResourceKind`, paired with the
//! representation the service returns and the patch document it accepts.
//! Patch fields are `Option`s skipped when `None`, so "leave unchanged" and
//! "set to empty" stay distinct on the wire.

use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::context::Context;
use crate::error::Result;
use crate::resource::{Handle, ResourceKind};

/// Account that owns or authored a resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cluster {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub capacity: Option<u32>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub terminated: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capacity: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub author: Option<Identity>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub created: Option<String>,
}

/// Only one field may be set per request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Empty string deletes the description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Experiment {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub author: Option<Identity>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub created: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperimentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub modified: Option<String>,
}

/// Renaming breaks existing references by name, but not handles.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspacePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive: Option<bool>,
}

macro_rules! resource_kind {
    ($(#[$meta:meta])* $marker:ident, $kind:literal, $collection:literal, $item:ty, $patch:ty, $alias:ident, $getter:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $marker {}

        impl ResourceKind for $marker {
            const KIND: &'static str = $kind;
            const COLLECTION: &'static str = $collection;
            type Item = $item;
            type Patch = $patch;
        }

        pub type $alias = Handle<$marker>;

        impl Client {
            #[doc = concat!("Resolve a ", $kind, " by name or ID.")]
            pub fn $getter(&self, ctx: &Context, reference: &str) -> Result<$alias> {
                self.resource::<$marker>(ctx, reference)
            }
        }
    };
}

resource_kind!(
    /// Compute clusters. Deleting a cluster terminates it; running tasks finish.
    Clusters, "cluster", "clusters", Cluster, ClusterPatch, ClusterHandle, cluster
);
resource_kind!(Datasets, "dataset", "datasets", Dataset, DatasetPatch, DatasetHandle, dataset);
resource_kind!(
    Experiments,
    "experiment",
    "experiments",
    Experiment,
    ExperimentPatch,
    ExperimentHandle,
    experiment
);
resource_kind!(
    Workspaces,
    "workspace",
    "workspaces",
    Workspace,
    WorkspacePatch,
    WorkspaceHandle,
    workspace
);
