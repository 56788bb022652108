//! Contracts of the collaborators the views consume.

use async_trait::async_trait;
use shared::{
    domain::{Account, Book, BookId, CartItem, Order, Review, ReviewId, ShoppingCart},
    protocol::{BookQuery, NewReview},
};

use crate::error::Result;

#[async_trait]
pub trait BookApi: Send + Sync {
    /// `Ok(None)` when the backend has no such book.
    async fn find_book(&self, id: BookId) -> Result<Option<Book>>;
    async fn query_books(&self, query: &BookQuery) -> Result<Vec<Book>>;
    async fn search_books(&self, query: &BookQuery) -> Result<Vec<Book>>;
    async fn delete_book(&self, id: BookId) -> Result<()>;
}

#[async_trait]
pub trait ReviewApi: Send + Sync {
    async fn reviews_for_book(&self, book_id: BookId) -> Result<Vec<Review>>;
    async fn create_review(&self, review: &NewReview) -> Result<Review>;
    async fn delete_review(&self, id: ReviewId) -> Result<()>;
}

#[async_trait]
pub trait CartApi: Send + Sync {
    async fn add_book_to_cart(&self, book_id: BookId, quantity: i64) -> Result<CartItem>;
    /// `Ok(None)` when the user has no open cart.
    async fn my_cart(&self) -> Result<Option<ShoppingCart>>;
    async fn place_order(&self) -> Result<Order>;
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// `Ok(None)` for an anonymous session.
    async fn identity(&self) -> Result<Option<Account>>;
}

/// Resolves whether the current principal may use admin-only affordances.
/// Identity failures read as "not admin".
pub async fn is_admin(identity: &dyn IdentityProvider) -> bool {
    match identity.identity().await {
        Ok(account) => account.is_some_and(|a| a.is_admin()),
        Err(err) => {
            tracing::warn!(error = %err, "identity lookup failed; treating session as non-admin");
            false
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeletionTarget {
    Book(Book),
    Review(Review),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogOutcome {
    Deleted,
    Dismissed,
    /// Confirmed, but the backend refused or could not be reached.
    Failed,
}

/// Modal confirmation. Performs the deletion itself and reports whether it
/// happened.
#[async_trait]
pub trait ConfirmDialog: Send + Sync {
    async fn confirm_delete(&self, target: DeletionTarget) -> DialogOutcome;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    BookList,
    BookDetail(BookId),
    Cart,
    Orders,
    NotFound,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acknowledgment {
    Success(String),
    Failure(String),
}

/// Navigation and user-facing acknowledgments of the surrounding view layer.
pub trait UiShell: Send + Sync {
    fn navigate(&self, route: Route);
    fn acknowledge(&self, ack: Acknowledgment);
}
