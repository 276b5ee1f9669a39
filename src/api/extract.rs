//! Request extractors
//!
//! Thin wrappers over axum's `Json` and `Query` whose rejections go through
//! [`AppError`], so malformed bodies and query strings get the same JSON
//! error envelope as every other failure.

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::AppError;

/// JSON body extractor that rejects with `400 invalid_request`
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Query string extractor that rejects with `400 invalid_request`
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct ApiQuery<T>(pub T);
