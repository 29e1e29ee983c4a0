use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::StatusCode,
    Error, HttpMessage, HttpResponse, ResponseError,
};
use crypto_core::JwtKeys;
use error_types::{error_codes, ApiResponse, ErrorBody, ErrorKind};
use futures::future::{ready, LocalBoxFuture, Ready};
use std::rc::Rc;
use std::sync::Arc;

/// Caller identity extracted from a validated bearer token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser(pub String);

impl AuthenticatedUser {
    pub fn email(&self) -> &str {
        &self.0
    }
}

/// JWT Authentication Middleware
///
/// Rejects requests without a valid `Authorization: Bearer <token>` header
/// with a 401 error envelope; otherwise stores [`AuthenticatedUser`] in the
/// request extensions.
#[derive(Clone)]
pub struct JwtAuthMiddleware {
    keys: Arc<JwtKeys>,
}

impl JwtAuthMiddleware {
    pub fn new(keys: Arc<JwtKeys>) -> Self {
        Self { keys }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtAuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = JwtAuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(JwtAuthMiddlewareService {
            service: Rc::new(service),
            keys: Arc::clone(&self.keys),
        }))
    }
}

pub struct JwtAuthMiddlewareService<S> {
    service: Rc<S>,
    keys: Arc<JwtKeys>,
}

impl<S, B> Service<ServiceRequest> for JwtAuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let keys = Arc::clone(&self.keys);

        Box::pin(async move {
            match authenticate(&keys, &req) {
                Ok(user) => {
                    req.extensions_mut().insert(user);
                    let res = service.call(req).await?;
                    Ok(res.map_into_left_body())
                }
                Err(reason) => {
                    tracing::warn!(path = %req.path(), reason = %reason, "Rejected unauthenticated request");
                    let (request, _payload) = req.into_parts();
                    let response = unauthorized(reason);
                    Ok(ServiceResponse::new(request, response).map_into_right_body())
                }
            }
        })
    }
}

fn authenticate(keys: &JwtKeys, req: &ServiceRequest) -> Result<AuthenticatedUser, &'static str> {
    let auth_header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .ok_or("No token")?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or("Invalid Authorization header format")?;

    let subject = keys.subject_of(token).map_err(|e| {
        tracing::debug!("JWT validation failed: {}", e);
        "Invalid token"
    })?;

    Ok(AuthenticatedUser(subject))
}

fn unauthorized(message: &str) -> HttpResponse {
    HttpResponse::Unauthorized().json(ApiResponse::<()>::failure(ErrorBody::new(
        ErrorKind::Auth,
        error_codes::UNAUTHORIZED,
        message,
    )))
}

/// Raised when a handler asks for [`AuthenticatedUser`] on a route the
/// middleware does not cover.
#[derive(Debug)]
pub struct MissingIdentity;

impl std::fmt::Display for MissingIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("User not authenticated")
    }
}

impl ResponseError for MissingIdentity {
    fn status_code(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }

    fn error_response(&self) -> HttpResponse {
        unauthorized("User not authenticated")
    }
}

/// FromRequest implementation for AuthenticatedUser
impl actix_web::FromRequest for AuthenticatedUser {
    type Error = MissingIdentity;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(
        req: &actix_web::HttpRequest,
        _payload: &mut actix_web::dev::Payload,
    ) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthenticatedUser>()
                .cloned()
                .ok_or(MissingIdentity),
        )
    }
}
