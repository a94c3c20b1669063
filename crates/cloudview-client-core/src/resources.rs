use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Complete per-region snapshot for one resource type. Replaced wholesale
/// on every successful fetch; partial merges never occur.
pub type RegionMap<T> = BTreeMap<String, Vec<T>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Instances,
    Databases,
    Clusters,
    Buckets,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Instances,
        ResourceKind::Databases,
        ResourceKind::Clusters,
        ResourceKind::Buckets,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Instances => "instances",
            Self::Databases => "databases",
            Self::Clusters => "clusters",
            Self::Buckets => "buckets",
        }
    }

    /// Key under which this kind's snapshot is persisted.
    #[must_use]
    pub fn storage_key(self) -> &'static str {
        match self {
            Self::Instances => "instancesByRegion",
            Self::Databases => "rdsByRegion",
            Self::Clusters => "eksByRegion",
            Self::Buckets => "bucketsByRegion",
        }
    }

    /// Path of the read-only listing endpoint for this kind.
    #[must_use]
    pub fn list_path(self) -> &'static str {
        match self {
            Self::Instances => "/list-instances",
            Self::Databases => "/list-rds",
            Self::Clusters => "/list-eks-clusters",
            Self::Buckets => "/list-s3-buckets",
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Instances => "EC2 instances",
            Self::Databases => "RDS databases",
            Self::Clusters => "EKS clusters",
            Self::Buckets => "S3 buckets",
        }
    }
}

#[must_use]
pub fn parse_resource_kind(raw: &str) -> Option<ResourceKind> {
    let normalized = raw.trim().to_ascii_lowercase();
    match normalized.as_str() {
        "instances" | "instance" | "ec2" => Some(ResourceKind::Instances),
        "databases" | "database" | "dbs" | "rds" => Some(ResourceKind::Databases),
        "clusters" | "cluster" | "eks" => Some(ResourceKind::Clusters),
        "buckets" | "bucket" | "s3" => Some(ResourceKind::Buckets),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ComputeInstance {
    #[serde(default)]
    pub name: String,
    pub instance_id: String,
    #[serde(rename = "Type")]
    pub instance_type: String,
    pub state: String,
    #[serde(default)]
    pub launch_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DatabaseInstance {
    #[serde(rename = "DBInstanceIdentifier")]
    pub db_instance_identifier: String,
    #[serde(default)]
    pub engine: String,
    #[serde(rename = "DBInstanceClass", default)]
    pub db_instance_class: String,
    #[serde(default)]
    pub availability_zone: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub instance_create_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContainerCluster {
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub arn: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StorageBucket {
    pub name: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub creation_date: String,
    #[serde(default)]
    pub versioning: String,
    #[serde(default)]
    pub encryption: String,
}
