//! View state: the active filter, the catalog shown for it, and the request
//! bookkeeping that keeps a slow response for an old filter from overwriting
//! a newer one.

use tracing::{debug, info, warn};

use crate::error::CatalogFetchError;
use crate::model::{Catalog, CatalogStatus, ViewFilter};

/// A fetch the caller must run.  `generation` increases with every request
/// issued, so issuance order decides which response wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchRequest {
    pub generation: u64,
    pub filter: ViewFilter,
}

/// A completed fetch, handed back to [`ViewState::apply`].
#[derive(Debug)]
pub struct FetchResponse {
    pub request: FetchRequest,
    pub result: Result<Catalog, CatalogFetchError>,
}

/// What `apply` did with a response.
#[derive(Debug)]
pub enum Applied {
    /// A newer request was issued after this one; nothing changed.
    Superseded,
    /// The catalog was replaced; playback must re-validate its current track.
    Replaced,
    /// The fetch failed; the catalog is now empty for the active filter.
    Failed(CatalogFetchError),
}

#[derive(Debug)]
pub struct ViewState {
    filter: ViewFilter,
    catalog: Catalog,
    status: CatalogStatus,
    generation: u64,
}

impl ViewState {
    pub fn new() -> Self {
        Self {
            filter: ViewFilter::ForYou,
            catalog: Catalog::empty(ViewFilter::ForYou),
            status: CatalogStatus::Loading,
            generation: 0,
        }
    }

    /// The startup fetch for the default view.
    pub fn initial_request(&mut self) -> FetchRequest {
        self.set_filter(self.filter)
    }

    /// Switching to another filter drops the old catalog right away, so
    /// nothing shows or steps through the previous view's tracks while the
    /// new one loads.  Re-requesting the active filter keeps its catalog.
    pub fn set_filter(&mut self, filter: ViewFilter) -> FetchRequest {
        if filter != self.catalog.filter() {
            info!("view: {:?} → {:?}", self.filter, filter);
            self.catalog = Catalog::empty(filter);
        }
        self.filter = filter;
        self.status = CatalogStatus::Loading;
        self.generation += 1;
        FetchRequest {
            generation: self.generation,
            filter,
        }
    }

    /// Re-issue the fetch for the active filter.
    pub fn refresh(&mut self) -> FetchRequest {
        self.set_filter(self.filter)
    }

    pub fn apply(&mut self, response: FetchResponse) -> Applied {
        let FetchResponse { request, result } = response;
        if request.generation != self.generation {
            debug!(
                "view: dropping superseded {:?} response (gen {} < {})",
                request.filter, request.generation, self.generation
            );
            return Applied::Superseded;
        }

        match result {
            Ok(catalog) => {
                self.catalog = catalog;
                self.status = CatalogStatus::Ready;
                Applied::Replaced
            }
            Err(e) => {
                warn!("view: fetch for {:?} failed: {}", request.filter, e);
                self.catalog = Catalog::empty(self.filter);
                self.status = CatalogStatus::Failed(e.to_string());
                Applied::Failed(e)
            }
        }
    }

    pub fn filter(&self) -> ViewFilter {
        self.filter
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn status(&self) -> &CatalogStatus {
        &self.status
    }
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new()
    }
}
