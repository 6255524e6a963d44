//! services/api/src/web/respond.rs
//!
//! Endpoints that mutate state answer programmatic callers with JSON and send
//! browsers back to the page they came from.

use axum::{
    extract::{FromRequest, FromRequestParts, Path, Request},
    http::{header, request::Parts, HeaderMap, Uri},
    response::{IntoResponse, Json, Redirect, Response},
};
use echo_core::PortError;
use serde::de::DeserializeOwned;
use std::convert::Infallible;

use crate::error::ApiError;

/// How the caller wants to be answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientKind {
    /// `X-Requested-With: XMLHttpRequest` or `Accept: application/json`.
    Ajax,
    /// Anything else. `referer` is where a redirect should point; it is only
    /// kept when it stays on this host.
    Browser { referer: Option<String> },
}

impl ClientKind {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let header_str =
            |name: header::HeaderName| headers.get(name).and_then(|v| v.to_str().ok());

        let requested_with = header_str(header::HeaderName::from_static("x-requested-with"));
        let accepts_json = header_str(header::ACCEPT)
            .map(|accept| accept.contains("application/json"))
            .unwrap_or(false);

        if requested_with.is_some_and(|v| v.eq_ignore_ascii_case("XMLHttpRequest")) || accepts_json
        {
            ClientKind::Ajax
        } else {
            ClientKind::Browser {
                referer: header_str(header::REFERER)
                    .and_then(|referer| local_target(referer, header_str(header::HOST))),
            }
        }
    }

    /// JSON `body` for Ajax callers, a redirect for browsers. `fallback` is
    /// used when the browser sent no referer, or always when `prefer_fallback`.
    pub fn reply<T: serde::Serialize>(
        self,
        body: T,
        fallback: &str,
        prefer_fallback: bool,
    ) -> Response {
        match self {
            ClientKind::Ajax => Json(body).into_response(),
            ClientKind::Browser { referer } => {
                let target = match referer {
                    Some(referer) if !prefer_fallback => referer,
                    _ => fallback.to_string(),
                };
                Redirect::to(&target).into_response()
            }
        }
    }

    pub fn fail(&self, error: impl Into<ApiError>) -> Failure {
        Failure {
            client: self.clone(),
            error: error.into(),
        }
    }
}

/// The path and query of `referer` when it points back at `host`, or when it
/// is already a plain relative path.
fn local_target(referer: &str, host: Option<&str>) -> Option<String> {
    let uri = referer.parse::<Uri>().ok()?;
    match uri.authority() {
        Some(authority) if Some(authority.as_str()) == host => {
            uri.path_and_query().map(|pq| pq.as_str().to_string())
        }
        Some(_) => None,
        // "//evil.example" parses as a path here but browsers treat it as a host.
        None if referer.starts_with('/') && !referer.starts_with("//") => {
            Some(referer.to_string())
        }
        None => None,
    }
}

impl<S> FromRequestParts<S> for ClientKind
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ClientKind::from_headers(&parts.headers))
    }
}

/// `Path` whose rejection is answered like any other failure for the caller.
pub struct PathParam<T>(pub T);

impl<S, T> FromRequestParts<S> for PathParam<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = Failure;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Path::<T>::from_request_parts(parts, state).await {
            Ok(Path(value)) => Ok(PathParam(value)),
            Err(rejection) => Err(ClientKind::from_headers(&parts.headers)
                .fail(PortError::InvalidArgument(rejection.body_text()))),
        }
    }
}

/// `Json` whose rejection becomes the standard JSON error body.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| PortError::InvalidArgument(rejection.body_text()))?;
        Ok(JsonBody(value))
    }
}

/// An error rendered for a specific kind of caller: a JSON error body for
/// Ajax, the status with a plain-text message for browsers.
#[derive(Debug)]
pub struct Failure {
    client: ClientKind,
    error: ApiError,
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        match self.client {
            ClientKind::Ajax => self.error.into_response(),
            ClientKind::Browser { .. } => {
                self.error.log();
                (self.error.status(), self.error.public_message()).into_response()
            }
        }
    }
}
