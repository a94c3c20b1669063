use crate::resources::ResourceKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Home,
    Instances,
    ManagedDatabases,
    ContainerClusters,
    StorageBuckets,
    Callback,
}

impl Route {
    pub const ALL: [Route; 6] = [
        Route::Home,
        Route::Instances,
        Route::ManagedDatabases,
        Route::ContainerClusters,
        Route::StorageBuckets,
        Route::Callback,
    ];

    #[must_use]
    pub fn path(self) -> &'static str {
        match self {
            Self::Home => "/",
            Self::Instances => "/instances",
            Self::ManagedDatabases => "/dbs-rds",
            Self::ContainerClusters => "/eks-clusters",
            Self::StorageBuckets => "/s3-buckets",
            Self::Callback => "/callback",
        }
    }

    /// The resource kind whose cache backs this page, if any.
    #[must_use]
    pub fn resource_kind(self) -> Option<ResourceKind> {
        match self {
            Self::Instances => Some(ResourceKind::Instances),
            Self::ManagedDatabases => Some(ResourceKind::Databases),
            Self::ContainerClusters => Some(ResourceKind::Clusters),
            Self::StorageBuckets => Some(ResourceKind::Buckets),
            Self::Home | Self::Callback => None,
        }
    }
}

/// Outcome of mapping a visible path onto the route table. Unknown paths
/// redirect to the root rather than rendering a not-found page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteMatch {
    Found(Route),
    RedirectToRoot,
}

impl Route {
    #[must_use]
    pub fn parse(path: &str) -> RouteMatch {
        let trimmed = path.trim();
        let normalized = if trimmed.len() > 1 {
            trimmed.trim_end_matches('/')
        } else {
            trimmed
        };
        for route in Self::ALL {
            if normalized == route.path() {
                return RouteMatch::Found(route);
            }
        }
        RouteMatch::RedirectToRoot
    }
}
