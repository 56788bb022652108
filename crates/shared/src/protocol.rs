//! Request payloads and query strings sent to the REST backend.

use serde::{Deserialize, Serialize};

use crate::domain::{BookId, BookRef};

/// Query string for the book listing endpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BookQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(default)]
    pub eagerload: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewReview {
    pub rating: i32,
    pub comment: String,
    pub created_at: String,
    pub book: BookRef,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddBookParams {
    pub book_id: BookId,
    pub quantity: i64,
}
