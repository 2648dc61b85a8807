//! Gemini API client modules.
//!
//! This module provides the typed REST client used by the extractor.

pub mod client;

pub use client::{GeminiClient, GeminiConfig, GeminiError, UploadedFile};
