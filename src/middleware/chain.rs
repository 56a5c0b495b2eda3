#![forbid(unsafe_code)]

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::StreamExt;
use log::debug;
use poem::http::{Method, StatusCode};
use poem::{Body, Endpoint, IntoResponse, Middleware, Request, Response};

// ***************************************************************************
//                          Request/Response Definitions
// ***************************************************************************
/// A request whose body has been fully buffered.
#[derive(Debug, Clone)]
pub struct DevRequest {
    pub method: Method,
    pub path: String,
    pub body: Vec<u8>,
}

/// A terminal JSON response produced by a chain handler.
#[derive(Debug, Clone, PartialEq)]
pub struct DevResponse {
    pub status: StatusCode,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum HandlerOutcome {
    Handled(DevResponse),
    NotHandled,
}

impl DevRequest {
    pub fn new(method: Method, path: &str, body: impl Into<Vec<u8>>) -> Self {
        Self {method, path: path.to_string(), body: body.into()}
    }
}

impl DevResponse {
    pub fn new(status: StatusCode, body: String) -> Self {
        Self {status, body}
    }
}

impl IntoResponse for DevResponse {
    fn into_response(self) -> Response {
        Response::builder()
            .status(self.status)
            .content_type("application/json")
            .body(self.body)
    }
}

// ***************************************************************************
//                                  Traits
// ***************************************************************************
/** An optional interception layer in front of the server's routes.  A handler
 * either answers the request or declines it so that the next handler, and
 * eventually the wrapped endpoint, sees it unchanged.
 *
 * Only requests some handler `wants` have their body buffered; everything
 * else streams through to the wrapped endpoint.
 */
pub trait DevHandler: Send + Sync {
    fn name(&self) -> &str;
    fn wants(&self, method: &Method, path: &str) -> bool;
    fn handle<'a>(&'a self, req: &'a DevRequest) -> BoxFuture<'a, HandlerOutcome>;
}

// ***************************************************************************
//                                DevChain
// ***************************************************************************
/// Handlers run left to right; the first one to answer wins.
#[derive(Clone, Default)]
pub struct DevChain {
    handlers: Vec<Arc<dyn DevHandler>>,
}

impl DevChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, handler: impl DevHandler + 'static) -> Self {
        self.handlers.push(Arc::new(handler));
        self
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// True when at least one handler wants to see this request.
    pub fn claims(&self, method: &Method, path: &str) -> bool {
        self.handlers.iter().any(|h| h.wants(method, path))
    }

    /// Offer the request to each handler that wants it, in order.
    pub async fn run(&self, req: &DevRequest) -> HandlerOutcome {
        for handler in self.handlers.iter() {
            if !handler.wants(&req.method, &req.path) {
                continue;
            }
            if let HandlerOutcome::Handled(resp) = handler.handle(req).await {
                debug!("{} {} handled by {} with status {}", req.method, req.path, handler.name(), resp.status);
                return HandlerOutcome::Handled(resp);
            }
        }
        HandlerOutcome::NotHandled
    }
}

impl<E: Endpoint> Middleware<E> for DevChain {
    type Output = DevChainEndpoint<E>;

    fn transform(&self, ep: E) -> Self::Output {
        DevChainEndpoint {inner: ep, chain: self.clone()}
    }
}

// ---------------------------------------------------------------------------
// DevChainEndpoint:
// ---------------------------------------------------------------------------
pub struct DevChainEndpoint<E> {
    inner: E,
    chain: DevChain,
}

impl<E: Endpoint> Endpoint for DevChainEndpoint<E> {
    type Output = Response;

    async fn call(&self, mut req: Request) -> poem::Result<Self::Output> {
        // Nothing to intercept, leave the body streaming.
        if !self.chain.claims(req.method(), req.uri().path()) {
            return self.inner.call(req).await.map(IntoResponse::into_response);
        }

        // Accumulate the body before any handler looks at the request.
        let body = buffer_body(req.take_body()).await
            .map_err(poem::error::InternalServerError)?;
        let dev_req = DevRequest {
            method: req.method().clone(),
            path: req.uri().path().to_string(),
            body,
        };

        match self.chain.run(&dev_req).await {
            HandlerOutcome::Handled(resp) => Ok(resp.into_response()),
            HandlerOutcome::NotHandled => {
                // Restore the body so the wrapped endpoint sees the original request.
                req.set_body(dev_req.body);
                self.inner.call(req).await.map(IntoResponse::into_response)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// buffer_body:
// ---------------------------------------------------------------------------
/** Collect a request body chunk by chunk until the stream ends. */
pub async fn buffer_body(body: Body) -> std::io::Result<Vec<u8>> {
    let mut stream = Box::pin(body.into_bytes_stream());
    let mut buf = Vec::new();
    while let Some(chunk) = stream.next().await {
        buf.extend_from_slice(&chunk?);
    }
    Ok(buf)
}

// ***************************************************************************
//                                  Tests
// ***************************************************************************
#[cfg(test)]
mod tests {
    use super::*;
    use poem::test::TestClient;
    use poem::{get, handler, post, EndpointExt, Route};

    // Answers every request to a fixed path, regardless of method.
    struct Teapot;

    impl DevHandler for Teapot {
        fn name(&self) -> &str { "teapot" }
        fn wants(&self, _method: &Method, path: &str) -> bool { path == "/teapot" }
        fn handle<'a>(&'a self, req: &'a DevRequest) -> BoxFuture<'a, HandlerOutcome> {
            Box::pin(async move {
                if req.path == "/teapot" {
                    HandlerOutcome::Handled(DevResponse::new(
                        StatusCode::IM_A_TEAPOT,
                        format!("{{\"bytes\":{}}}", req.body.len())))
                } else {
                    HandlerOutcome::NotHandled
                }
            })
        }
    }

    // Never answers.
    struct Bystander;

    impl DevHandler for Bystander {
        fn name(&self) -> &str { "bystander" }
        fn wants(&self, _method: &Method, _path: &str) -> bool { true }
        fn handle<'a>(&'a self, _req: &'a DevRequest) -> BoxFuture<'a, HandlerOutcome> {
            Box::pin(async { HandlerOutcome::NotHandled })
        }
    }

    // Wants nothing; must never be asked to handle a request.
    struct Uninterested;

    impl DevHandler for Uninterested {
        fn name(&self) -> &str { "uninterested" }
        fn wants(&self, _method: &Method, _path: &str) -> bool { false }
        fn handle<'a>(&'a self, req: &'a DevRequest) -> BoxFuture<'a, HandlerOutcome> {
            Box::pin(async move { panic!("{} {} should not reach handle", req.method, req.path) })
        }
    }

    #[handler]
    fn echo(body: String) -> String {
        format!("echo:{}", body)
    }

    #[handler]
    fn inner_teapot() -> &'static str {
        "inner"
    }

    fn app(chain: DevChain) -> impl Endpoint {
        Route::new()
            .at("/echo", post(echo))
            .at("/teapot", get(inner_teapot))
            .with(chain)
    }

    #[tokio::test]
    async fn handled_request_short_circuits() {
        let cli = TestClient::new(app(DevChain::new().push(Bystander).push(Teapot)));
        let resp = cli.get("/teapot").send().await;
        resp.assert_status(StatusCode::IM_A_TEAPOT);
        resp.assert_header("content-type", "application/json");
        resp.assert_text("{\"bytes\":0}").await;
    }

    #[tokio::test]
    async fn unhandled_request_reaches_inner_with_body() {
        let cli = TestClient::new(app(DevChain::new().push(Teapot)));
        let resp = cli.post("/echo").body("some posted text").send().await;
        resp.assert_status_is_ok();
        resp.assert_text("echo:some posted text").await;
    }

    #[tokio::test]
    async fn empty_chain_forwards_everything() {
        let cli = TestClient::new(app(DevChain::new()));
        let resp = cli.get("/teapot").send().await;
        resp.assert_status_is_ok();
        resp.assert_text("inner").await;
    }

    #[tokio::test]
    async fn run_returns_first_answer() {
        let chain = DevChain::new().push(Bystander).push(Teapot);
        assert_eq!(chain.len(), 2);
        let req = DevRequest::new(Method::POST, "/teapot", "abc");
        match chain.run(&req).await {
            HandlerOutcome::Handled(resp) => assert_eq!(resp.body, "{\"bytes\":3}"),
            HandlerOutcome::NotHandled => panic!("expected the teapot to answer"),
        }
        let other = DevRequest::new(Method::GET, "/elsewhere", "");
        assert_eq!(chain.run(&other).await, HandlerOutcome::NotHandled);
    }

    #[test]
    fn claims_only_wanted_requests() {
        let chain = DevChain::new().push(Uninterested).push(Teapot);
        assert!(chain.claims(&Method::GET, "/teapot"));
        assert!(!chain.claims(&Method::POST, "/echo"));
        assert!(!DevChain::new().claims(&Method::POST, "/teapot"));
    }

    #[tokio::test]
    async fn unclaimed_request_streams_to_inner() {
        let cli = TestClient::new(app(DevChain::new().push(Uninterested).push(Teapot)));
        let chunks = futures::stream::iter(vec![
            Ok::<_, std::io::Error>(b"streamed ".to_vec()),
            Ok(b"text".to_vec()),
        ]);
        let resp = cli.post("/echo").body(Body::from_bytes_stream(chunks)).send().await;
        resp.assert_status_is_ok();
        resp.assert_text("echo:streamed text").await;
    }

    #[tokio::test]
    async fn run_skips_handlers_that_do_not_want_the_request() {
        let chain = DevChain::new().push(Uninterested).push(Teapot);
        let req = DevRequest::new(Method::GET, "/teapot", "");
        assert!(matches!(chain.run(&req).await, HandlerOutcome::Handled(_)));
    }

    #[tokio::test]
    async fn buffer_body_joins_chunks() {
        let chunks = futures::stream::iter(vec![
            Ok::<_, std::io::Error>(b"{\"a\":".to_vec()),
            Ok(b"1}".to_vec()),
        ]);
        let body = Body::from_bytes_stream(chunks);
        let bytes = buffer_body(body).await.unwrap();
        assert_eq!(bytes, b"{\"a\":1}");
    }
}
