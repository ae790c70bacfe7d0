//! Route lookup.
//!
//! # Responsibilities
//! - Store compiled routes
//! - Look up the matching route for a request path
//! - Return the matched route or an explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) path prefix scan (acceptable for typical route counts)
//! - Routes kept sorted by descending endpoint length, so the first hit is
//!   the longest matching prefix

use std::fmt;
use std::sync::Arc;

use crate::proxy::Forwarder;
use crate::routing::{Destination, RoutingError};

/// A registered endpoint bound to its forwarder.
pub struct Route {
    endpoint: String,
    destination: Arc<Destination>,
    forwarder: Arc<dyn Forwarder>,
}

impl Route {
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    pub fn forwarder(&self) -> Arc<dyn Forwarder> {
        Arc::clone(&self.forwarder)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("endpoint", &self.endpoint)
            .field("destination", &self.destination.to_string())
            .finish()
    }
}

/// Endpoint prefix table.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `destination`, bind a forwarder for it and insert the route.
    ///
    /// `bind` receives the endpoint and the resolved destination. Duplicate
    /// endpoints are not rejected here; validated configuration rules them out.
    pub fn register<F>(&mut self, endpoint: &str, destination: &str, bind: F) -> Result<(), RoutingError>
    where
        F: FnOnce(&str, Arc<Destination>) -> Result<Arc<dyn Forwarder>, RoutingError>,
    {
        let destination = Arc::new(Destination::parse(destination)?);
        let forwarder = bind(endpoint, Arc::clone(&destination))?;

        // Equal lengths keep registration order.
        let at = self
            .routes
            .partition_point(|r| r.endpoint.len() >= endpoint.len());
        self.routes.insert(
            at,
            Route {
                endpoint: endpoint.to_string(),
                destination,
                forwarder,
            },
        );
        Ok(())
    }

    /// Longest registered endpoint that prefixes `path`.
    pub fn lookup(&self, path: &str) -> Option<&Route> {
        self.routes.iter().find(|r| path.starts_with(r.endpoint.as_str()))
    }

    /// Endpoints in match order.
    pub fn endpoints(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(|r| r.endpoint.as_str())
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, Response, StatusCode};
    use axum::response::IntoResponse;
    use futures_util::future::{BoxFuture, FutureExt};

    /// Answers with the endpoint it was bound for.
    pub(crate) struct Named(pub String);

    impl Forwarder for Named {
        fn forward(self: Arc<Self>, _req: Request<Body>) -> BoxFuture<'static, Response<Body>> {
            async move { (StatusCode::OK, self.0.clone()).into_response() }.boxed()
        }
    }

    pub(crate) fn named(endpoint: &str, _dest: Arc<Destination>) -> Result<Arc<dyn Forwarder>, RoutingError> {
        Ok(Arc::new(Named(endpoint.to_string())))
    }

    fn table(endpoints: &[&str]) -> RouteTable {
        let mut table = RouteTable::new();
        for endpoint in endpoints {
            table.register(endpoint, "http://upstream.local", named).unwrap();
        }
        table
    }

    #[test]
    fn test_prefix_match() {
        let table = table(&["/api", "/mock"]);

        for path in ["/api", "/api/", "/api/users/5", "/apiusers"] {
            assert_eq!(table.lookup(path).map(Route::endpoint), Some("/api"), "{path}");
        }
        assert_eq!(table.lookup("/mock/1").map(Route::endpoint), Some("/mock"));
        assert!(table.lookup("/ap").is_none());
        assert!(table.lookup("/not-registered").is_none());
    }

    #[test]
    fn test_longest_prefix_wins_regardless_of_order() {
        let forward = table(&["/api", "/api/v2"]);
        let reverse = table(&["/api/v2", "/api"]);

        for table in [&forward, &reverse] {
            assert_eq!(table.lookup("/api/v2/items").map(Route::endpoint), Some("/api/v2"));
            assert_eq!(table.lookup("/api/v1/items").map(Route::endpoint), Some("/api"));
            assert_eq!(table.endpoints().collect::<Vec<_>>(), vec!["/api/v2", "/api"]);
        }
    }

    #[test]
    fn test_equal_length_keeps_registration_order() {
        let table = table(&["/aa", "/bb", "/a"]);
        assert_eq!(table.endpoints().collect::<Vec<_>>(), vec!["/aa", "/bb", "/a"]);
    }

    #[test]
    fn test_invalid_destination_leaves_table_untouched() {
        let mut table = table(&["/api"]);
        let err = table.register("/bad", "://invalid-url", named).unwrap_err();

        assert!(matches!(err, RoutingError::InvalidDestination { .. }));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_route_keeps_destination() {
        let mut table = RouteTable::new();
        table.register("/svc", "https://svc.internal:8443/base/", named).unwrap();

        let route = table.lookup("/svc/x").unwrap();
        assert_eq!(route.destination().host(), "svc.internal:8443");
        assert_eq!(route.destination().base_path(), "/base");
    }
}
