use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use http::header::HeaderValue;
use http::Request as HttpRequest;
use http::Response as HttpResponse;
use http_body_util::combinators::UnsyncBoxBody;
use tonic::Status;
use tower::{Layer, Service};

use crate::auth::TokenIssuer;
use crate::models::User;

/// Server-verified identity injected by the auth middleware into request
/// extensions. Services take ownership decisions from this, never from
/// request fields.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub user_id: String,
    pub email: String,
    pub name: String,
}

impl AuthenticatedUser {
    pub fn user(&self) -> User {
        User {
            id: self.user_id.clone(),
            email: self.email.clone(),
            name: self.name.clone(),
        }
    }
}

impl From<User> for AuthenticatedUser {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id,
            email: user.email,
            name: user.name,
        }
    }
}

/// Paths that never require a token, even when a bad one is attached.
const PUBLIC_PATHS: &[&str] = &[
    "/campus.auth.AuthService/Register",
    "/campus.auth.AuthService/Login",
    "/campus.auth.AuthService/ValidateToken",
    "/grpc.health.v1.Health/Check",
    "/grpc.health.v1.Health/Watch",
    "/grpc.reflection.v1.ServerReflection/ServerReflectionInfo",
    "/grpc.reflection.v1alpha.ServerReflection/ServerReflectionInfo",
];

fn is_public_path(path: &str) -> bool {
    PUBLIC_PATHS.iter().any(|p| path == *p)
}

fn bearer_token(headers: &http::HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

#[derive(Clone)]
pub struct AuthLayer {
    tokens: TokenIssuer,
}

impl AuthLayer {
    pub fn new(tokens: TokenIssuer) -> Self {
        Self { tokens }
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthMiddleware {
            inner,
            tokens: self.tokens.clone(),
        }
    }
}

#[derive(Clone)]
pub struct AuthMiddleware<S> {
    inner: S,
    tokens: TokenIssuer,
}

type BoxBody = UnsyncBoxBody<bytes::Bytes, Status>;

fn grpc_status_response(status: Status) -> HttpResponse<BoxBody> {
    let code = status.code() as i32;
    let message = status.message().to_string();

    let mut response = HttpResponse::new(UnsyncBoxBody::default());
    response.headers_mut().insert(
        "content-type",
        HeaderValue::from_static("application/grpc"),
    );
    response
        .headers_mut()
        .insert("grpc-status", HeaderValue::from(code));
    if !message.is_empty() {
        if let Ok(val) = HeaderValue::from_str(&message) {
            response.headers_mut().insert("grpc-message", val);
        }
    }
    response
}

impl<S, ReqBody> Service<HttpRequest<ReqBody>> for AuthMiddleware<S>
where
    S: Service<HttpRequest<ReqBody>, Response = HttpResponse<BoxBody>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    ReqBody: Send + 'static,
{
    type Response = HttpResponse<BoxBody>;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: HttpRequest<ReqBody>) -> Self::Future {
        let mut inner = self.inner.clone();
        std::mem::swap(&mut self.inner, &mut inner);

        let tokens = self.tokens.clone();

        Box::pin(async move {
            let path = req.uri().path().to_string();

            if is_public_path(&path) {
                return inner.call(req).await;
            }

            // No token: pass through anonymously; services decide whether
            // the call needs an identity
            let verified = bearer_token(req.headers()).map(|token| tokens.verify(token));

            match verified {
                Some(Ok(claims)) => {
                    req.extensions_mut()
                        .insert(AuthenticatedUser::from(claims.user()));
                }
                Some(Err(e)) => {
                    tracing::debug!("Rejected token: path={}, error={}", path, e);
                    return Ok(grpc_status_response(Status::unauthenticated(
                        "Invalid or expired token",
                    )));
                }
                None => {}
            }

            inner.call(req).await
        })
    }
}
