//! Request interceptor chain.
//!
//! Every outbound request passes through an ordered list of named
//! [`Interceptor`]s before a [`Transport`] sends it:
//!
//! ```text
//! request ─▶ [user-agent] ─▶ [bearer-token] ─▶ [request-logging] ─▶ Transport
//! response ◀───────────────────────────────────────────────────────────┘
//! ```
//!
//! Each interceptor receives the request and a [`Next`] handle to the rest
//! of the chain. It either forwards with [`Next::run`] or aborts by
//! returning `Err`. `Next` is consumed on use, so it cannot be invoked
//! twice. Returning `Ok` without having invoked it is reported as
//! [`SdkError::ChainProtocolViolation`], and returning `Ok` after the rest of
//! the chain failed is reported as [`SdkError::ErrorSuppressed`]. Panics
//! become [`SdkError::InterceptorPanicked`] or [`SdkError::TransportPanicked`]
//! instead of unwinding through the caller.
//!
//! A built [`InterceptorChain`] is immutable. It is shared by reference
//! between concurrent requests; all per-request state lives in the request
//! itself.

use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Request;
use tracing::warn;

use crate::error::SdkError;
use crate::response::HttpResponse;

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// One named stage of the request pipeline.
#[async_trait]
pub trait Interceptor: Send + Sync {
    /// Stable name used in errors and logs.
    fn name(&self) -> &str;

    /// Inspect or mutate `request`, then forward it with `next.run(request)`
    /// or abort by returning an error.
    async fn handle(&self, request: Request, next: Next<'_>) -> Result<HttpResponse, SdkError>;
}

/// Terminal stage of the chain: actually sends the request.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` and buffer the whole response.
    async fn send(&self, request: Request) -> Result<HttpResponse, SdkError>;
}

// ---------------------------------------------------------------------------
// Transport over reqwest
// ---------------------------------------------------------------------------

/// [`Transport`] backed by a [`reqwest::Client`].
///
/// Timeouts are whatever the client was built with; the transport adds
/// none of its own.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Transport over a default `reqwest::Client`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport over a caller-configured client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: Request) -> Result<HttpResponse, SdkError> {
        let resp = self.client.execute(request).await?;
        HttpResponse::from_reqwest(resp).await
    }
}

// ---------------------------------------------------------------------------
// Next
// ---------------------------------------------------------------------------

/// Continuation to the remaining stages of the chain.
pub struct Next<'a> {
    stages: &'a [Arc<dyn Interceptor>],
    transport: &'a dyn Transport,
    invoked: &'a AtomicBool,
    downstream_error: &'a OnceLock<String>,
}

impl Next<'_> {
    /// Hand the request to the next stage and wait for its response.
    ///
    /// An `Err` returned here must be propagated (or replaced by another
    /// `Err`); an interceptor that turns it into `Ok` fails the request with
    /// [`SdkError::ErrorSuppressed`].
    pub async fn run(self, request: Request) -> Result<HttpResponse, SdkError> {
        self.invoked.store(true, Ordering::Release);
        let result = dispatch(self.stages, self.transport, request).await;
        if let Err(err) = &result {
            let _ = self.downstream_error.set(err.to_string());
        }
        result
    }
}

fn dispatch<'a>(
    stages: &'a [Arc<dyn Interceptor>],
    transport: &'a dyn Transport,
    request: Request,
) -> BoxFuture<'a, Result<HttpResponse, SdkError>> {
    Box::pin(async move {
        let Some((stage, rest)) = stages.split_first() else {
            return send_guarded(transport, request).await;
        };

        let invoked = AtomicBool::new(false);
        let downstream_error = OnceLock::new();
        let next = Next {
            stages: rest,
            transport,
            invoked: &invoked,
            downstream_error: &downstream_error,
        };

        let outcome = AssertUnwindSafe(stage.handle(request, next))
            .catch_unwind()
            .await;

        match outcome {
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(interceptor = stage.name(), %message, "interceptor panicked");
                Err(SdkError::InterceptorPanicked {
                    interceptor: stage.name().to_string(),
                    message,
                })
            }
            Ok(Ok(_)) if !invoked.load(Ordering::Acquire) => {
                warn!(interceptor = stage.name(), "interceptor skipped the rest of the chain");
                Err(SdkError::ChainProtocolViolation {
                    interceptor: stage.name().to_string(),
                })
            }
            Ok(Ok(resp)) => match downstream_error.get() {
                Some(message) => {
                    warn!(interceptor = stage.name(), %message, "interceptor suppressed a downstream error");
                    Err(SdkError::ErrorSuppressed {
                        interceptor: stage.name().to_string(),
                        message: message.clone(),
                    })
                }
                None => Ok(resp),
            },
            Ok(Err(err)) => Err(err),
        }
    })
}

async fn send_guarded(transport: &dyn Transport, request: Request) -> Result<HttpResponse, SdkError> {
    match AssertUnwindSafe(transport.send(request)).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            warn!(%message, "transport panicked");
            Err(SdkError::TransportPanicked { message })
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// ---------------------------------------------------------------------------
// InterceptorChain
// ---------------------------------------------------------------------------

/// Ordered interceptors in front of a transport.
///
/// Built once with [`InterceptorChain::builder`]; there is no way to add or
/// remove stages afterwards.
///
/// # Examples
///
/// ```rust,no_run
/// use armctl_sdk::interceptors::UserAgentInterceptor;
/// use armctl_sdk::pipeline::{InterceptorChain, ReqwestTransport};
/// use std::sync::Arc;
///
/// # async fn run() -> Result<(), armctl_sdk::SdkError> {
/// let chain = InterceptorChain::builder(Arc::new(ReqwestTransport::new()))
///     .with(UserAgentInterceptor::create("armctl/0.1.0")?)
///     .build();
///
/// let url = reqwest::Url::parse("https://management.azure.com/subscriptions?api-version=2022-12-01")
///     .expect("static URL");
/// let resp = chain.send(reqwest::Request::new(reqwest::Method::GET, url)).await?;
/// println!("{}", resp.status());
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct InterceptorChain {
    stages: Vec<Arc<dyn Interceptor>>,
    transport: Arc<dyn Transport>,
}

impl InterceptorChain {
    /// Start building a chain that ends in `transport`.
    pub fn builder(transport: Arc<dyn Transport>) -> ChainBuilder {
        ChainBuilder {
            stages: Vec::new(),
            transport,
        }
    }

    /// Interceptor names in execution order.
    pub fn names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run `request` through every interceptor, then the transport.
    pub async fn send(&self, request: Request) -> Result<HttpResponse, SdkError> {
        dispatch(&self.stages, self.transport.as_ref(), request).await
    }
}

impl fmt::Debug for InterceptorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterceptorChain")
            .field("stages", &self.names())
            .finish_non_exhaustive()
    }
}

/// Builder for [`InterceptorChain`]. Stages run in the order they are added.
pub struct ChainBuilder {
    stages: Vec<Arc<dyn Interceptor>>,
    transport: Arc<dyn Transport>,
}

impl ChainBuilder {
    /// Append an interceptor.
    #[must_use]
    pub fn with(self, interceptor: impl Interceptor + 'static) -> Self {
        self.with_shared(Arc::new(interceptor))
    }

    /// Append an interceptor that is also held elsewhere.
    #[must_use]
    pub fn with_shared(mut self, interceptor: Arc<dyn Interceptor>) -> Self {
        self.stages.push(interceptor);
        self
    }

    /// Freeze the stages into an immutable chain.
    pub fn build(self) -> InterceptorChain {
        InterceptorChain {
            stages: self.stages,
            transport: self.transport,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
    use reqwest::{Method, StatusCode, Url};
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    /// Records every request and echoes its `x-echo` header as the body.
    #[derive(Default)]
    struct RecordingTransport {
        calls: AtomicUsize,
        seen: Mutex<Vec<HeaderMap>>,
    }

    impl RecordingTransport {
        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn send(&self, request: Request) -> Result<HttpResponse, SdkError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(request.headers().clone());
            let echo = request
                .headers()
                .get("x-echo")
                .map(|v| v.as_bytes().to_vec())
                .unwrap_or_default();
            Ok(HttpResponse::new(StatusCode::OK, HeaderMap::new(), echo))
        }
    }

    /// Sets a fixed header, then forwards.
    struct Stamp {
        name: &'static str,
        header: &'static str,
        value: &'static str,
    }

    #[async_trait]
    impl Interceptor for Stamp {
        fn name(&self) -> &str {
            self.name
        }

        async fn handle(&self, mut request: Request, next: Next<'_>) -> Result<HttpResponse, SdkError> {
            request.headers_mut().insert(
                HeaderName::from_static(self.header),
                HeaderValue::from_static(self.value),
            );
            next.run(request).await
        }
    }

    /// Records whether `x-a` was already set when it ran.
    #[derive(Default)]
    struct ObserveA {
        saw: Mutex<Option<String>>,
    }

    #[async_trait]
    impl Interceptor for ObserveA {
        fn name(&self) -> &str {
            "observe-a"
        }

        async fn handle(&self, request: Request, next: Next<'_>) -> Result<HttpResponse, SdkError> {
            *self.saw.lock().unwrap() = request
                .headers()
                .get("x-a")
                .and_then(|v| v.to_str().ok())
                .map(String::from);
            next.run(request).await
        }
    }

    struct Deny;

    #[async_trait]
    impl Interceptor for Deny {
        fn name(&self) -> &str {
            "deny"
        }

        async fn handle(&self, _request: Request, _next: Next<'_>) -> Result<HttpResponse, SdkError> {
            Err(SdkError::Config("denied".into()))
        }
    }

    struct Swallow;

    #[async_trait]
    impl Interceptor for Swallow {
        fn name(&self) -> &str {
            "swallow"
        }

        async fn handle(&self, _request: Request, _next: Next<'_>) -> Result<HttpResponse, SdkError> {
            Ok(HttpResponse::new(StatusCode::OK, HeaderMap::new(), Vec::new()))
        }
    }

    /// Forwards, then reports success whatever happened downstream.
    struct Suppress;

    #[async_trait]
    impl Interceptor for Suppress {
        fn name(&self) -> &str {
            "suppress"
        }

        async fn handle(&self, request: Request, next: Next<'_>) -> Result<HttpResponse, SdkError> {
            let _ = next.run(request).await;
            Ok(HttpResponse::new(StatusCode::OK, HeaderMap::new(), Vec::new()))
        }
    }

    /// Forwards and replaces any downstream error with its own.
    struct Rewrap;

    #[async_trait]
    impl Interceptor for Rewrap {
        fn name(&self) -> &str {
            "rewrap"
        }

        async fn handle(&self, request: Request, next: Next<'_>) -> Result<HttpResponse, SdkError> {
            next.run(request)
                .await
                .map_err(|e| SdkError::Config(format!("wrapped: {e}")))
        }
    }

    /// Forwards unchanged.
    struct Pass;

    #[async_trait]
    impl Interceptor for Pass {
        fn name(&self) -> &str {
            "pass"
        }

        async fn handle(&self, request: Request, next: Next<'_>) -> Result<HttpResponse, SdkError> {
            next.run(request).await
        }
    }

    struct FailingTransport;

    #[async_trait]
    impl Transport for FailingTransport {
        async fn send(&self, _request: Request) -> Result<HttpResponse, SdkError> {
            Err(SdkError::Config("downstream failed".into()))
        }
    }

    struct PanickingTransport;

    #[async_trait]
    impl Transport for PanickingTransport {
        async fn send(&self, _request: Request) -> Result<HttpResponse, SdkError> {
            panic!("transport boom");
        }
    }

    struct Explode;

    #[async_trait]
    impl Interceptor for Explode {
        fn name(&self) -> &str {
            "explode"
        }

        async fn handle(&self, _request: Request, _next: Next<'_>) -> Result<HttpResponse, SdkError> {
            panic!("boom");
        }
    }

    /// Copies the request path into `x-echo`.
    struct EchoPath;

    #[async_trait]
    impl Interceptor for EchoPath {
        fn name(&self) -> &str {
            "echo-path"
        }

        async fn handle(&self, mut request: Request, next: Next<'_>) -> Result<HttpResponse, SdkError> {
            let path = HeaderValue::from_str(request.url().path()).unwrap();
            request.headers_mut().insert("x-echo", path);
            tokio::task::yield_now().await;
            next.run(request).await
        }
    }

    fn get(path: &str) -> Request {
        let url = Url::parse("https://management.azure.com/").unwrap().join(path).unwrap();
        Request::new(Method::GET, url)
    }

    #[tokio::test]
    async fn empty_chain_goes_straight_to_transport() {
        let transport = Arc::new(RecordingTransport::default());
        let chain = InterceptorChain::builder(transport.clone()).build();

        let resp = chain.send(get("/subscriptions")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn stages_run_in_registration_order() {
        let transport = Arc::new(RecordingTransport::default());
        let observer = Arc::new(ObserveA::default());
        let chain = InterceptorChain::builder(transport.clone())
            .with(Stamp {
                name: "a",
                header: "x-a",
                value: "from-a",
            })
            .with_shared(observer.clone())
            .build();

        assert_eq!(chain.names(), vec!["a", "observe-a"]);
        chain.send(get("/subscriptions")).await.unwrap();

        assert_eq!(observer.saw.lock().unwrap().as_deref(), Some("from-a"));
        let seen = transport.seen.lock().unwrap();
        assert_eq!(seen[0].get("x-a").unwrap(), "from-a");
    }

    #[tokio::test]
    async fn later_stage_sees_nothing_from_reversed_order() {
        let transport = Arc::new(RecordingTransport::default());
        let observer = Arc::new(ObserveA::default());
        let chain = InterceptorChain::builder(transport.clone())
            .with_shared(observer.clone())
            .with(Stamp {
                name: "a",
                header: "x-a",
                value: "from-a",
            })
            .build();

        chain.send(get("/subscriptions")).await.unwrap();
        assert_eq!(*observer.saw.lock().unwrap(), None);
    }

    #[tokio::test]
    async fn error_aborts_chain_before_transport() {
        let transport = Arc::new(RecordingTransport::default());
        let chain = InterceptorChain::builder(transport.clone())
            .with(Stamp {
                name: "a",
                header: "x-a",
                value: "1",
            })
            .with(Deny)
            .build();

        let err = chain.send(get("/subscriptions")).await.unwrap_err();
        assert!(matches!(err, SdkError::Config(ref m) if m == "denied"));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn returning_without_next_is_a_violation() {
        let transport = Arc::new(RecordingTransport::default());
        let chain = InterceptorChain::builder(transport.clone())
            .with(Swallow)
            .build();

        let err = chain.send(get("/subscriptions")).await.unwrap_err();
        assert!(
            matches!(err, SdkError::ChainProtocolViolation { ref interceptor } if interceptor == "swallow")
        );
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn suppressing_downstream_error_is_reported() {
        let chain = InterceptorChain::builder(Arc::new(FailingTransport))
            .with(Suppress)
            .build();

        let err = chain.send(get("/subscriptions")).await.unwrap_err();
        match err {
            SdkError::ErrorSuppressed {
                interceptor,
                message,
            } => {
                assert_eq!(interceptor, "suppress");
                assert!(message.contains("downstream failed"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn suppression_deeper_in_chain_is_caught() {
        let chain = InterceptorChain::builder(Arc::new(FailingTransport))
            .with(Pass)
            .with(Suppress)
            .build();

        let err = chain.send(get("/subscriptions")).await.unwrap_err();
        assert!(
            matches!(err, SdkError::ErrorSuppressed { ref interceptor, .. } if interceptor == "suppress")
        );
    }

    #[tokio::test]
    async fn replacing_downstream_error_is_allowed() {
        let chain = InterceptorChain::builder(Arc::new(FailingTransport))
            .with(Rewrap)
            .build();

        let err = chain.send(get("/subscriptions")).await.unwrap_err();
        assert!(matches!(err, SdkError::Config(ref m) if m == "wrapped: configuration error: downstream failed"));
    }

    #[tokio::test]
    async fn transport_panic_is_not_blamed_on_interceptor() {
        let chain = InterceptorChain::builder(Arc::new(PanickingTransport))
            .with(Pass)
            .build();

        let err = chain.send(get("/subscriptions")).await.unwrap_err();
        assert!(matches!(err, SdkError::TransportPanicked { ref message } if message == "transport boom"));
    }

    #[tokio::test]
    async fn transport_panic_with_empty_chain_is_reported() {
        let chain = InterceptorChain::builder(Arc::new(PanickingTransport)).build();

        let err = chain.send(get("/subscriptions")).await.unwrap_err();
        assert!(matches!(err, SdkError::TransportPanicked { .. }));
    }

    #[tokio::test]
    async fn panic_is_reported_not_propagated() {
        let transport = Arc::new(RecordingTransport::default());
        let chain = InterceptorChain::builder(transport.clone())
            .with(Explode)
            .build();

        let err = chain.send(get("/subscriptions")).await.unwrap_err();
        match err {
            SdkError::InterceptorPanicked {
                interceptor,
                message,
            } => {
                assert_eq!(interceptor, "explode");
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn concurrent_requests_do_not_share_state() {
        let transport = Arc::new(RecordingTransport::default());
        let chain = InterceptorChain::builder(transport.clone())
            .with(EchoPath)
            .build();

        let (first, second) = tokio::join!(
            chain.send(get("/subscriptions/one")),
            chain.send(get("/subscriptions/two")),
        );

        assert_eq!(first.unwrap().text(), "/subscriptions/one");
        assert_eq!(second.unwrap().text(), "/subscriptions/two");
        assert_eq!(transport.calls(), 2);
    }

    #[test]
    fn debug_lists_stage_names() {
        let chain = InterceptorChain::builder(Arc::new(RecordingTransport::default()))
            .with(Deny)
            .build();
        assert!(format!("{chain:?}").contains("deny"));
    }
}
