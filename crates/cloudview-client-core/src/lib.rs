//! Client core for the cloudview dashboard.
//!
//! Holds the pieces with real state: the persistent key-value store, the
//! per-resource-type cache with its staleness clock, the session-gated
//! access control layer, and the route-to-page composition shell. Network
//! transport and rendering live elsewhere; both are reached through traits
//! defined here so the state machines stay testable in isolation.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod auth;
pub mod cache;
pub mod listing;
pub mod resources;
pub mod routes;
pub mod shell;
pub mod store;

pub use auth::{AuthGate, GateView, IdentityProvider, Navigator, OidcConfig, Session, SessionStatus};
pub use cache::{CachePolicy, CacheStatus, ResourceCache};
pub use listing::{ListingError, RegionListing};
pub use resources::{
    ComputeInstance, ContainerCluster, DatabaseInstance, RegionMap, ResourceKind, StorageBucket,
    parse_resource_kind,
};
pub use routes::{Route, RouteMatch};
pub use shell::{DashboardShell, ListingSet, PageView};
pub use store::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore};
