use common_in_memory_cache::Freshness;

use crate::time::WeekClass;

use super::mediator::Origin;

/// What to do with a `load` request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Return the cached week, no network activity
    Serve,
    /// Return the cached week and refresh it in the background
    ServeAndRevalidate,
    /// Block on a network fetch
    Fetch,
}

/// Decide how to answer a request for a week of class `class`.
///
/// `cached` describes the usable cached entry, if any. The week class must be computed
/// right before the call.
pub fn decide(class: WeekClass, cached: Option<(Freshness, Origin)>, force: bool) -> Decision {
    if force {
        return Decision::Fetch;
    }
    match (class, cached) {
        (_, None) | (_, Some((Freshness::Expired, _))) => Decision::Fetch,
        (WeekClass::Past, Some(_)) => Decision::Serve,
        (_, Some((Freshness::Fresh, Origin::Network))) => Decision::Serve,
        (_, Some((Freshness::Stale, _))) | (_, Some((_, Origin::Durable))) => Decision::ServeAndRevalidate,
    }
}
