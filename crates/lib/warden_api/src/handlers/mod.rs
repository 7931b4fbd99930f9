//! Request handlers.

pub mod auth;
pub mod health;
pub mod users;

use axum::extract::FromRequest;

use crate::error::AppError;

/// JSON body extractor whose rejections render as `{"error": "Invalid input"}`.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);
