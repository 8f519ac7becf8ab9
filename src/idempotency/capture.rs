use axum::{
    body::{Body, Bytes, HttpBody},
    extract::Request,
    http::{header, request, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

use super::error::IdempotencyError;
use super::record::IdempotencyRecord;

pub const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// A request whose body has been read once into memory.
///
/// `body()` lends the bytes for digesting; `into_request()` yields a request
/// whose body is readable from the start again, whichever path forwards it.
pub struct BufferedRequest {
    parts: request::Parts,
    body: Bytes,
}

impl BufferedRequest {
    pub async fn from_request(
        request: Request,
        max_body_bytes: usize,
    ) -> Result<Self, IdempotencyError> {
        let declared = request
            .headers()
            .get(header::CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<usize>().ok());
        if declared.is_some_and(|len| len > max_body_bytes) {
            return Err(IdempotencyError::PayloadTooLarge {
                max: max_body_bytes,
            });
        }

        let (parts, body) = request.into_parts();
        if body.size_hint().lower() > max_body_bytes as u64 {
            return Err(IdempotencyError::PayloadTooLarge {
                max: max_body_bytes,
            });
        }

        let body = axum::body::to_bytes(body, max_body_bytes)
            .await
            .map_err(|e| {
                tracing::debug!("Failed to buffer request body: {}", e);
                IdempotencyError::UnreadableBody
            })?;

        Ok(Self { parts, body })
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    pub fn into_request(self) -> Request {
        Request::from_parts(self.parts, Body::from(self.body))
    }
}

/// A downstream response buffered in full before being forwarded.
#[derive(Debug, Clone)]
pub struct CapturedResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl CapturedResponse {
    pub async fn capture(response: Response) -> Result<Self, axum::Error> {
        let (parts, body) = response.into_parts();
        let body = axum::body::to_bytes(body, usize::MAX).await?;

        Ok(Self {
            status: parts.status,
            headers: parts.headers,
            body,
        })
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn content_type(&self) -> &str {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
    }

    pub fn to_record(&self) -> IdempotencyRecord {
        IdempotencyRecord::new(self.status.as_u16(), self.body.to_vec(), self.content_type())
    }
}

impl IntoResponse for CapturedResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// Rebuilds the stored response verbatim.
pub fn replay(record: IdempotencyRecord) -> Response {
    let status = StatusCode::from_u16(record.status_code).unwrap_or(StatusCode::OK);
    let content_type = HeaderValue::from_str(&record.content_type)
        .unwrap_or_else(|_| HeaderValue::from_static(DEFAULT_CONTENT_TYPE));

    let mut response = Response::new(Body::from(record.body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, content_type);
    response
}
