//! Top-level request entry point shared by both engines.

use std::time::Instant;

use axum::body::Body;
use axum::http::{Request, Response};

use crate::http::{response, EngineKind};
use crate::observability::metrics;
use crate::routing::{Route, RouteTable};

/// Liveness banner path.
pub const ROOT_PATH: &str = "/";
/// Health check path.
pub const LIVEZ_PATH: &str = "/livez";

/// Outcome of looking up a request path.
#[derive(Debug)]
pub enum Dispatch<'a> {
    Banner,
    Liveness,
    Forward(&'a Route),
    NotFound,
}

/// Serves the reserved paths and hands everything else to the route table.
#[derive(Debug)]
pub struct Dispatcher {
    routes: RouteTable,
    engine: EngineKind,
}

impl Dispatcher {
    pub fn new(routes: RouteTable, engine: EngineKind) -> Self {
        Self { routes, engine }
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// Reserved paths are exact matches and are checked before any route,
    /// so no configured endpoint can shadow them.
    pub fn lookup(&self, path: &str) -> Dispatch<'_> {
        match path {
            ROOT_PATH => Dispatch::Banner,
            LIVEZ_PATH => Dispatch::Liveness,
            _ => match self.routes.lookup(path) {
                Some(route) => Dispatch::Forward(route),
                None => Dispatch::NotFound,
            },
        }
    }

    pub async fn dispatch(&self, req: Request<Body>) -> Response<Body> {
        let started = Instant::now();
        let path = req.uri().path().to_owned();

        let (label, response) = match self.lookup(&path) {
            Dispatch::Banner => (ROOT_PATH, response::banner()),
            Dispatch::Liveness => (LIVEZ_PATH, response::liveness()),
            Dispatch::Forward(route) => {
                tracing::trace!(
                    endpoint = route.endpoint(),
                    destination = %route.destination(),
                    "Route matched"
                );
                let forwarder = route.forwarder();
                (route.endpoint(), forwarder.forward(req).await)
            }
            Dispatch::NotFound => {
                tracing::debug!(path = %path, "No route matched");
                ("none", response::route_not_found())
            }
        };

        metrics::record_request(self.engine, label, response.status(), started);
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::router::tests::named;
    use axum::http::StatusCode;

    fn dispatcher(endpoints: &[&str]) -> Dispatcher {
        let mut table = RouteTable::new();
        for endpoint in endpoints {
            table.register(endpoint, "http://upstream.local", named).unwrap();
        }
        Dispatcher::new(table, EngineKind::Standard)
    }

    async fn get(dispatcher: &Dispatcher, path: &str) -> (StatusCode, String) {
        let req = Request::builder().uri(path).body(Body::empty()).unwrap();
        let res = dispatcher.dispatch(req).await;
        let status = res.status();
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[test]
    fn test_reserved_paths_take_precedence() {
        let dispatcher = dispatcher(&["/", "/livez", "/api"]);

        assert!(matches!(dispatcher.lookup("/"), Dispatch::Banner));
        assert!(matches!(dispatcher.lookup("/livez"), Dispatch::Liveness));
        // Only the exact reserved paths are shadowed.
        assert!(matches!(dispatcher.lookup("/livez/deep"), Dispatch::Forward(r) if r.endpoint() == "/livez"));
        assert!(matches!(dispatcher.lookup("/other"), Dispatch::Forward(r) if r.endpoint() == "/"));
        assert!(matches!(dispatcher.lookup("/api/x"), Dispatch::Forward(r) if r.endpoint() == "/api"));
    }

    #[test]
    fn test_not_found() {
        let dispatcher = dispatcher(&["/api"]);
        assert!(matches!(dispatcher.lookup("/not-registered"), Dispatch::NotFound));
    }

    #[tokio::test]
    async fn test_dispatch_bodies() {
        let dispatcher = dispatcher(&["/test", "/mock"]);

        assert_eq!(get(&dispatcher, "/").await, (StatusCode::OK, "Proxier is running".into()));
        assert_eq!(get(&dispatcher, "/livez").await, (StatusCode::OK, "OK".into()));
        assert_eq!(
            get(&dispatcher, "/not-registered").await,
            (StatusCode::NOT_FOUND, "Route not found".into())
        );
        assert_eq!(get(&dispatcher, "/mock/42").await, (StatusCode::OK, "/mock".into()));
        assert_eq!(get(&dispatcher, "/test").await, (StatusCode::OK, "/test".into()));
    }
}
