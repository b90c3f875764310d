use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::future::{Ready, ready};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Once;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use crate::domain::error::DomainError;
use actix_service::{Service, Transform};
use actix_web::body::{BodySize, EitherBody, MessageBody};
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::http::header::{self, HeaderName, HeaderValue};
use actix_web::{Error, HttpMessage, HttpRequest, ResponseError};
use futures_util::FutureExt;
use futures_util::future::LocalBoxFuture;
use tracing::{Instrument, error, info, info_span, warn};
use uuid::Uuid;

static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");
static TIMING_HEADER: HeaderName = HeaderName::from_static("server-timing");

#[derive(Clone)]
pub struct RequestId(pub String);

// ======================= Recovery =======================

thread_local! {
    static PANIC_STACK: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Chains a hook that records the panicking thread's backtrace so the
/// recovery log can carry the stack of the panic site.
fn install_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            let stack = Backtrace::force_capture().to_string();
            PANIC_STACK.with(|slot| *slot.borrow_mut() = Some(stack));
            previous(info);
        }));
    });
}

/// Turns a panic in any inner service into a 500 response.
pub struct RecoverMiddleware;

impl<S, B> Transform<S, ServiceRequest> for RecoverMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = RecoverService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        install_panic_hook();
        ready(Ok(RecoverService { service }))
    }
}

pub struct RecoverService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for RecoverService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let http_req = req.request().clone();

        let fut = match panic::catch_unwind(AssertUnwindSafe(|| self.service.call(req))) {
            Ok(fut) => fut,
            Err(payload) => return Box::pin(ready(Ok(recovered(http_req, payload)))),
        };

        Box::pin(async move {
            match AssertUnwindSafe(fut).catch_unwind().await {
                Ok(res) => res.map(|res| res.map_into_left_body()),
                Err(payload) => Ok(recovered(http_req, payload)),
            }
        })
    }
}

fn recovered<B>(req: HttpRequest, payload: Box<dyn Any + Send>) -> ServiceResponse<EitherBody<B>> {
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".into());
    let stack = PANIC_STACK
        .with(|slot| slot.borrow_mut().take())
        .unwrap_or_default();
    // The request id lives in the shared extensions even though the inner
    // services unwound before echoing it.
    let request_id = req.extensions().get::<RequestId>().map(|r| r.0.clone());

    error!(
        req_id = request_id.as_deref().unwrap_or("unknown"),
        http_method = %req.method(),
        uri = %req.uri(),
        resp_status = 500u16,
        panic = %message,
        stack = %stack,
        "request panicked"
    );

    let mut response = DomainError::Internal(format!("panic: {}", message)).error_response();
    if let Some(value) = request_id.and_then(|id| HeaderValue::from_str(&id).ok()) {
        response.headers_mut().insert(REQUEST_ID_HEADER.clone(), value);
    }
    ServiceResponse::new(req, response).map_into_right_body()
}

// ======================= Request ID =======================

pub struct RequestIdMiddleware;

impl<S, B> Transform<S, ServiceRequest> for RequestIdMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RequestIdService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RequestIdService { service }))
    }
}

pub struct RequestIdService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for RequestIdService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let request_id = req
            .headers()
            .get(&REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_owned())
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        req.extensions_mut().insert(RequestId(request_id.clone()));

        let fut = self.service.call(req);

        Box::pin(async move {
            let mut res = fut.await?;
            if let Ok(value) = HeaderValue::from_str(&request_id) {
                res.headers_mut().insert(REQUEST_ID_HEADER.clone(), value);
            }
            Ok(res)
        })
    }
}

// ======================= Structured logging =======================

/// Emits "request started" / "request complete" events inside a per-request
/// span, so handler logs carry the same request fields.
pub struct StructuredLogger;

impl<S, B> Transform<S, ServiceRequest> for StructuredLogger
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = StructuredLoggerService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(StructuredLoggerService { service }))
    }
}

pub struct StructuredLoggerService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for StructuredLoggerService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let start = Instant::now();
        let rid = req
            .extensions()
            .get::<RequestId>()
            .map(|r| r.0.clone())
            .unwrap_or_else(|| "unknown".into());
        let scheme = req.connection_info().scheme().to_owned();
        let remote_addr = req
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_default();
        let user_agent = req
            .headers()
            .get(header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_owned();

        let span = info_span!(
            "request",
            req_id = %rid,
            http_scheme = %scheme,
            http_proto = ?req.version(),
            http_method = %req.method(),
            remote_addr = %remote_addr,
            user_agent = %user_agent,
            uri = %req.uri()
        );

        let fut = span.in_scope(|| {
            info!("request started");
            self.service.call(req)
        });

        Box::pin(
            async move {
                let mut res = match fut.await {
                    Ok(res) => res,
                    Err(err) => {
                        info!(
                            resp_status = err.as_response_error().status_code().as_u16(),
                            resp_elapsed_ms = elapsed_ms(start),
                            "request failed"
                        );
                        return Err(err);
                    }
                };

                let resp_bytes_length = match res.response().body().size() {
                    BodySize::Sized(n) => n,
                    BodySize::None | BodySize::Stream => 0,
                };
                let elapsed = elapsed_ms(start);
                info!(
                    resp_status = res.status().as_u16(),
                    resp_bytes_length,
                    resp_elapsed_ms = elapsed,
                    "request complete"
                );

                if let Ok(value) = HeaderValue::from_str(&format!("app;dur={:.3}", elapsed)) {
                    res.headers_mut().insert(TIMING_HEADER.clone(), value);
                }

                Ok(res)
            }
            .instrument(span),
        )
    }
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

// ======================= Timeout =======================

/// Abandons the inner future once `limit` elapses and answers 504.
pub struct TimeoutMiddleware {
    limit: Duration,
}

impl TimeoutMiddleware {
    pub fn new(limit: Duration) -> Self {
        Self { limit }
    }
}

impl<S, B> Transform<S, ServiceRequest> for TimeoutMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = TimeoutService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(TimeoutService {
            service,
            limit: self.limit,
        }))
    }
}

pub struct TimeoutService<S> {
    service: S,
    limit: Duration,
}

impl<S, B> Service<ServiceRequest> for TimeoutService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.service.poll_ready(cx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let http_req = req.request().clone();
        let limit = self.limit;
        let fut = self.service.call(req);

        Box::pin(async move {
            match actix_web::rt::time::timeout(limit, fut).await {
                Ok(res) => res.map(|res| res.map_into_left_body()),
                Err(_) => {
                    warn!(timeout_ms = limit.as_millis() as u64, "request timed out");
                    let response = DomainError::Timeout(limit).error_response();
                    Ok(ServiceResponse::new(http_req, response).map_into_right_body())
                }
            }
        })
    }
}
