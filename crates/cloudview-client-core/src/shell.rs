use crate::auth::{AuthGate, GateView, IdentityProvider, Navigator};
use crate::cache::{CachePolicy, ResourceCache};
use crate::listing::RegionListing;
use crate::resources::{ComputeInstance, ContainerCluster, DatabaseInstance, StorageBucket};
use crate::routes::{Route, RouteMatch};
use crate::store::KeyValueStore;

pub type BoxedListing<T> = Box<dyn RegionListing<T>>;
pub type PageCache<T, S> = ResourceCache<T, S, BoxedListing<T>>;

/// One listing transport per resource type, boxed so the shell does not
/// care which client crate produced them.
pub struct ListingSet {
    pub instances: BoxedListing<ComputeInstance>,
    pub databases: BoxedListing<DatabaseInstance>,
    pub clusters: BoxedListing<ContainerCluster>,
    pub buckets: BoxedListing<StorageBucket>,
}

/// Composition root: wires the auth gate and the four page caches to the
/// route table. Holds no cache or auth logic of its own.
pub struct DashboardShell<S, P, N> {
    gate: AuthGate<P, N>,
    instances: PageCache<ComputeInstance, S>,
    databases: PageCache<DatabaseInstance, S>,
    clusters: PageCache<ContainerCluster, S>,
    buckets: PageCache<StorageBucket, S>,
}

/// What a resolved route hands to the renderer: either a static page or a
/// mutable handle on the one cache that backs the resource page.
pub enum PageView<'a, S> {
    Home,
    Callback,
    RedirectToRoot,
    Instances(&'a mut PageCache<ComputeInstance, S>),
    ManagedDatabases(&'a mut PageCache<DatabaseInstance, S>),
    ContainerClusters(&'a mut PageCache<ContainerCluster, S>),
    StorageBuckets(&'a mut PageCache<StorageBucket, S>),
}

impl<S, P, N> DashboardShell<S, P, N>
where
    S: KeyValueStore + Clone,
    P: IdentityProvider,
    N: Navigator,
{
    pub fn new(gate: AuthGate<P, N>, policy: CachePolicy, store: S, listings: ListingSet) -> Self {
        use crate::resources::ResourceKind;
        Self {
            gate,
            instances: ResourceCache::new(
                ResourceKind::Instances,
                policy,
                store.clone(),
                listings.instances,
            ),
            databases: ResourceCache::new(
                ResourceKind::Databases,
                policy,
                store.clone(),
                listings.databases,
            ),
            clusters: ResourceCache::new(
                ResourceKind::Clusters,
                policy,
                store.clone(),
                listings.clusters,
            ),
            buckets: ResourceCache::new(ResourceKind::Buckets, policy, store, listings.buckets),
        }
    }

    pub fn view(&mut self) -> GateView {
        self.gate.view()
    }

    pub fn sign_out(&self) {
        self.gate.sign_out();
    }

    #[must_use]
    pub fn gate(&self) -> &AuthGate<P, N> {
        &self.gate
    }

    /// Resolves a visible path to its page. Only call once `view()` says
    /// `Dashboard`; the gate, not the router, decides whether anything
    /// renders at all.
    pub fn page(&mut self, path: &str) -> PageView<'_, S> {
        match Route::parse(path) {
            RouteMatch::RedirectToRoot => PageView::RedirectToRoot,
            RouteMatch::Found(Route::Home) => PageView::Home,
            RouteMatch::Found(Route::Callback) => PageView::Callback,
            RouteMatch::Found(Route::Instances) => PageView::Instances(&mut self.instances),
            RouteMatch::Found(Route::ManagedDatabases) => {
                PageView::ManagedDatabases(&mut self.databases)
            }
            RouteMatch::Found(Route::ContainerClusters) => {
                PageView::ContainerClusters(&mut self.clusters)
            }
            RouteMatch::Found(Route::StorageBuckets) => PageView::StorageBuckets(&mut self.buckets),
        }
    }

    pub fn instances(&mut self) -> &mut PageCache<ComputeInstance, S> {
        &mut self.instances
    }

    pub fn databases(&mut self) -> &mut PageCache<DatabaseInstance, S> {
        &mut self.databases
    }

    pub fn clusters(&mut self) -> &mut PageCache<ContainerCluster, S> {
        &mut self.clusters
    }

    pub fn buckets(&mut self) -> &mut PageCache<StorageBucket, S> {
        &mut self.buckets
    }
}
