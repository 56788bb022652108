use shared::error::{ApiError, ErrorCode};
use thiserror::Error;

/// Local input rejections raised before any request is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ValidationFailure {
    #[error("quantity must be a positive count")]
    NonPositiveQuantity,
    #[error("the selected book is out of stock")]
    OutOfStock,
    #[error("a book must be selected")]
    MissingBookId,
    #[error("a rating is required")]
    MissingRating,
    #[error("rating must be between {min} and {max}")]
    RatingOutOfRange { min: i32, max: i32 },
    #[error("a comment is required")]
    MissingComment,
    #[error("the shopping cart is empty")]
    EmptyCart,
}

#[derive(Debug, Clone, Error)]
pub enum ClientError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationFailure),
    #[error("request failed{}: {message}", status_suffix(.status))]
    Network {
        status: Option<u16>,
        message: String,
    },
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ClientError {
    pub fn from_problem(status: u16, problem: ApiError) -> Self {
        Self::Network {
            status: Some(status),
            message: problem.summary(),
        }
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Network {
                status: Some(status),
                ..
            } => Some(ErrorCode::from_status(*status)),
            Self::NotFound { .. } => Some(ErrorCode::NotFound),
            Self::Validation(_) => Some(ErrorCode::Validation),
            _ => None,
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(value: reqwest::Error) -> Self {
        Self::Network {
            status: value.status().map(|s| s.as_u16()),
            message: value.to_string(),
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({s})")).unwrap_or_default()
}

pub type Result<T, E = ClientError> = std::result::Result<T, E>;
