//! Single mutating user actions: validate, write, then signal and navigate.

use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use shared::{
    domain::{Book, BookId, BookRef, CartItem, Order, Review},
    protocol::NewReview,
};
use tracing::{error, info};

use crate::{
    api::{Acknowledgment, CartApi, ReviewApi, Route, UiShell},
    error::{ClientError, Result, ValidationFailure},
    refresh::RefreshBus,
};

pub const MIN_RATING: i32 = 1;
pub const MAX_RATING: i32 = 5;

#[derive(Debug, Clone, PartialEq)]
pub enum MutationAction {
    AddToCart {
        book_id: Option<BookId>,
        title: Option<String>,
        quantity: i64,
        /// Units on hand as last seen by the view; absent means none.
        stock: Option<i64>,
    },
    SubmitReview {
        book_id: BookId,
        rating: Option<i32>,
        comment: Option<String>,
    },
    PlaceOrder {
        item_count: usize,
    },
}

impl MutationAction {
    pub fn add_to_cart(book: &Book, quantity: i64) -> Self {
        Self::AddToCart {
            book_id: Some(book.id),
            title: book.title.clone(),
            quantity,
            stock: book.stock,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::AddToCart { .. } => "add_to_cart",
            Self::SubmitReview { .. } => "submit_review",
            Self::PlaceOrder { .. } => "place_order",
        }
    }

    /// Local checks that gate the network call.
    pub fn validate(&self) -> Result<(), ValidationFailure> {
        self.checked().map(|_| ())
    }

    fn checked(&self) -> Result<Request, ValidationFailure> {
        match self {
            Self::AddToCart {
                book_id,
                quantity,
                stock,
                ..
            } => {
                if *quantity <= 0 {
                    return Err(ValidationFailure::NonPositiveQuantity);
                }
                let book_id = book_id.ok_or(ValidationFailure::MissingBookId)?;
                if stock.unwrap_or(0) <= 0 {
                    return Err(ValidationFailure::OutOfStock);
                }
                Ok(Request::AddToCart {
                    book_id,
                    quantity: *quantity,
                })
            }
            Self::SubmitReview {
                book_id,
                rating,
                comment,
            } => {
                let rating = rating.ok_or(ValidationFailure::MissingRating)?;
                if !(MIN_RATING..=MAX_RATING).contains(&rating) {
                    return Err(ValidationFailure::RatingOutOfRange {
                        min: MIN_RATING,
                        max: MAX_RATING,
                    });
                }
                let comment = comment
                    .as_deref()
                    .map(str::trim)
                    .filter(|c| !c.is_empty())
                    .ok_or(ValidationFailure::MissingComment)?;
                Ok(Request::SubmitReview(NewReview {
                    rating,
                    comment: comment.to_string(),
                    created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
                    book: BookRef { id: *book_id },
                }))
            }
            Self::PlaceOrder { item_count } => {
                if *item_count == 0 {
                    return Err(ValidationFailure::EmptyCart);
                }
                Ok(Request::PlaceOrder)
            }
        }
    }
}

/// A validated action, ready to send.
enum Request {
    AddToCart { book_id: BookId, quantity: i64 },
    SubmitReview(NewReview),
    PlaceOrder,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MutationReceipt {
    AddedToCart(CartItem),
    ReviewSubmitted(Review),
    OrderPlaced(Order),
}

pub struct CartMutationFlow {
    cart: Arc<dyn CartApi>,
    reviews: Arc<dyn ReviewApi>,
    bus: RefreshBus,
    shell: Arc<dyn UiShell>,
}

impl CartMutationFlow {
    pub fn new(
        cart: Arc<dyn CartApi>,
        reviews: Arc<dyn ReviewApi>,
        bus: RefreshBus,
        shell: Arc<dyn UiShell>,
    ) -> Self {
        Self {
            cart,
            reviews,
            bus,
            shell,
        }
    }

    /// Never retries. Every outcome ends in an acknowledgment or a redirect.
    pub async fn submit(&self, action: MutationAction) -> Result<MutationReceipt> {
        let kind = action.kind();
        let request = match action.checked() {
            Ok(request) => request,
            Err(failure) => {
                info!(action = kind, %failure, "mutation rejected locally");
                self.shell
                    .acknowledge(Acknowledgment::Failure(capitalize(&failure.to_string())));
                return Err(ClientError::Validation(failure));
            }
        };

        match self.dispatch(request).await {
            Ok(receipt) => {
                self.bus.notify();
                self.finish(&action);
                Ok(receipt)
            }
            Err(err) => {
                error!(action = kind, error = %err, "mutation failed");
                self.shell
                    .acknowledge(Acknowledgment::Failure(failure_text(&action).to_string()));
                Err(err)
            }
        }
    }

    async fn dispatch(&self, request: Request) -> Result<MutationReceipt> {
        match request {
            Request::AddToCart { book_id, quantity } => self
                .cart
                .add_book_to_cart(book_id, quantity)
                .await
                .map(MutationReceipt::AddedToCart),
            Request::SubmitReview(review) => self
                .reviews
                .create_review(&review)
                .await
                .map(MutationReceipt::ReviewSubmitted),
            Request::PlaceOrder => self
                .cart
                .place_order()
                .await
                .map(MutationReceipt::OrderPlaced),
        }
    }

    fn finish(&self, action: &MutationAction) {
        match action {
            MutationAction::AddToCart { title, .. } => {
                let title = title.as_deref().unwrap_or("book");
                self.shell.acknowledge(Acknowledgment::Success(format!(
                    "Added \"{title}\" to your cart!"
                )));
            }
            MutationAction::SubmitReview { book_id, .. } => {
                self.shell.acknowledge(Acknowledgment::Success(
                    "Review submitted successfully!".into(),
                ));
                self.shell.navigate(Route::BookDetail(*book_id));
            }
            MutationAction::PlaceOrder { .. } => self.shell.navigate(Route::Orders),
        }
    }

    /// Leaves the review form without submitting.
    pub fn cancel(&self) {
        self.shell.navigate(Route::BookList);
    }
}

fn failure_text(action: &MutationAction) -> &'static str {
    match action {
        MutationAction::AddToCart { .. } => "Failed to add book to cart. Please try again.",
        MutationAction::SubmitReview { .. } => {
            "Something went wrong when submitting the review."
        }
        MutationAction::PlaceOrder { .. } => "Failed to place order. Please try again.",
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
#[path = "tests/mutation_tests.rs"]
mod tests;
