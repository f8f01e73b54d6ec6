//! Remote API access for the attendance backend.
//!
//! This module provides the `ApiClient` request dispatcher, the `Action`
//! description of a remote operation, and the response normalizer that
//! reconciles the backend's two field-naming conventions into `ApiResponse`.

pub mod action;
pub mod client;
pub mod error;
pub mod normalize;

pub use action::Action;
pub use client::{ApiClient, HttpTransport, NoopHooks, NoticeLevel, Transport, TransportResponse, UiHooks};
pub use error::ApiError;
pub use normalize::{normalize, ApiResponse};
