#![allow(dead_code)]
use serde::Serialize;

/// Success envelope for handlers that don't already return a typed DTO.
/// Errors go through `CoreError`'s own `IntoResponse` impl instead of this
/// type, so there's no `ApiResponse::error` constructor here anymore.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    pub timestamp: i64,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}
