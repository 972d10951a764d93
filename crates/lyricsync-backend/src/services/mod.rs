//! Backend service handlers for frontend-driven requests.
//!
//! This module groups async request handlers that operate on the shared
//! `AppContext`, drive the alignment engine, persist configuration and emit
//! events or notifications back to the frontend.

pub mod config_service;
pub mod correction_service;
pub mod lyrics_service;
pub mod recognition_service;

/// Represents a type that is used in all handlers as an application context.
pub(crate) type AppContextHandle = std::sync::Arc<crate::app::AppContext>;
