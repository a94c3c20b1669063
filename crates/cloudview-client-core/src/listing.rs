use async_trait::async_trait;
use thiserror::Error;

use crate::resources::RegionMap;

/// Failure surface of a listing fetch, as seen by the cache and the UI.
///
/// `Http` means the server was reachable but rejected the request;
/// `Decode` means it answered with a malformed envelope or payload. The
/// two are kept distinct so callers can tell "server broken" apart from
/// "server unreachable" (`Request`/`Read`).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListingError {
    #[error("listing_request_failed:{message}")]
    Request { message: String },
    #[error("listing_read_failed:{message}")]
    Read { message: String },
    #[error("listing_http_{status}:{body}")]
    Http { status: u16, body: String },
    #[error("listing_json_decode_failed:{message}")]
    Decode { message: String },
}

/// One resource type's remote listing, already unwrapped to a region map.
///
/// The dashboard runs on a single cooperative thread, so listing futures
/// are not required to be `Send`.
#[async_trait(?Send)]
pub trait RegionListing<T> {
    async fn list_by_region(&self) -> Result<RegionMap<T>, ListingError>;
}

#[async_trait(?Send)]
impl<T, L: RegionListing<T> + ?Sized> RegionListing<T> for Box<L> {
    async fn list_by_region(&self) -> Result<RegionMap<T>, ListingError> {
        self.as_ref().list_by_region().await
    }
}
