//! # Quill Shared
//!
//! Wire types shared by the API server and its clients.
//! Field names follow the JSON contract of the blog frontend (camelCase, `_id`).

pub mod dto;
pub mod response;

pub use response::{ErrorResponse, FieldErrorBody};
