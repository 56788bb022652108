//! In-memory collaborators shared by the unit tests.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Mutex,
    },
};

use async_trait::async_trait;
use shared::{
    domain::{
        Account, Book, BookId, CartId, CartItem, CartItemId, Order, OrderId, Review, ReviewId,
        ShoppingCart,
    },
    protocol::{BookQuery, NewReview},
};
use tokio::sync::oneshot;

use crate::{
    api::{
        Acknowledgment, BookApi, CartApi, ConfirmDialog, DeletionTarget, DialogOutcome,
        IdentityProvider, ReviewApi, Route, UiShell,
    },
    error::{ClientError, Result},
};

pub fn book(id: i64, title: &str) -> Book {
    let mut book = Book::new(BookId(id));
    book.title = Some(title.to_string());
    book
}

pub fn review(id: i64, book_id: i64, rating: i32, created_at: Option<&str>) -> Review {
    Review {
        id: ReviewId(id),
        rating: Some(rating),
        comment: Some(format!("comment {id}")),
        created_at: created_at.map(str::to_string),
        user: None,
        book: Some(shared::domain::BookRef { id: BookId(book_id) }),
    }
}

pub fn outage() -> ClientError {
    ClientError::Network {
        status: Some(503),
        message: "service unavailable".into(),
    }
}

#[derive(Default)]
pub struct FakeBackend {
    pub catalog: Mutex<Vec<Book>>,
    pub books: Mutex<HashMap<BookId, Book>>,
    pub reviews: Mutex<HashMap<BookId, Vec<Review>>>,
    pub cart: Mutex<Option<ShoppingCart>>,
    pub account: Mutex<Option<Account>>,
    pub calls: Mutex<Vec<String>>,
    pub created_reviews: Mutex<Vec<NewReview>>,
    pub fail_books: AtomicBool,
    pub fail_reviews: AtomicBool,
    pub fail_cart: AtomicBool,
    pub fail_deletes: AtomicBool,
    query_gate: Mutex<Option<oneshot::Receiver<()>>>,
    book_gates: Mutex<HashMap<BookId, oneshot::Receiver<()>>>,
    review_gates: Mutex<HashMap<BookId, oneshot::Receiver<()>>>,
}

impl FakeBackend {
    pub fn with_catalog(books: Vec<Book>) -> Self {
        let backend = Self::default();
        *backend.catalog.lock().unwrap() = books;
        backend
    }

    pub fn put_book(&self, book: Book) {
        self.books.lock().unwrap().insert(book.id, book);
    }

    pub fn put_reviews(&self, book_id: BookId, reviews: Vec<Review>) {
        self.reviews.lock().unwrap().insert(book_id, reviews);
    }

    /// Holds the next `query_books` after it has read the catalog.
    pub fn gate_query(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.query_gate.lock().unwrap() = Some(rx);
        tx
    }

    /// Holds `find_book(id)` until the returned sender fires.
    pub fn gate_book(&self, id: BookId) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.book_gates.lock().unwrap().insert(id, rx);
        tx
    }

    /// Holds `reviews_for_book(id)` until the returned sender fires.
    pub fn gate_reviews(&self, id: BookId) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.review_gates.lock().unwrap().insert(id, rx);
        tx
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }
}

async fn wait_gate(gates: &Mutex<HashMap<BookId, oneshot::Receiver<()>>>, id: BookId) {
    let gate = gates.lock().unwrap().remove(&id);
    if let Some(gate) = gate {
        let _ = gate.await;
    }
}

#[async_trait]
impl BookApi for FakeBackend {
    async fn find_book(&self, id: BookId) -> Result<Option<Book>> {
        self.record(format!("find_book:{id}"));
        wait_gate(&self.book_gates, id).await;
        if self.fail_books.load(Ordering::SeqCst) {
            return Err(outage());
        }
        Ok(self.books.lock().unwrap().get(&id).cloned())
    }

    async fn query_books(&self, query: &BookQuery) -> Result<Vec<Book>> {
        self.record(format!("query_books:{}", query.sort.clone().unwrap_or_default()));
        if self.fail_books.load(Ordering::SeqCst) {
            return Err(outage());
        }
        let books = self.catalog.lock().unwrap().clone();
        let gate = self.query_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        Ok(books)
    }

    async fn search_books(&self, query: &BookQuery) -> Result<Vec<Book>> {
        self.record(format!("search_books:{}", query.query.clone().unwrap_or_default()));
        if self.fail_books.load(Ordering::SeqCst) {
            return Err(outage());
        }
        Ok(self.catalog.lock().unwrap().clone())
    }

    async fn delete_book(&self, id: BookId) -> Result<()> {
        self.record(format!("delete_book:{id}"));
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(outage());
        }
        self.catalog.lock().unwrap().retain(|b| b.id != id);
        Ok(())
    }
}

#[async_trait]
impl ReviewApi for FakeBackend {
    async fn reviews_for_book(&self, book_id: BookId) -> Result<Vec<Review>> {
        self.record(format!("reviews_for_book:{book_id}"));
        wait_gate(&self.review_gates, book_id).await;
        if self.fail_reviews.load(Ordering::SeqCst) {
            return Err(outage());
        }
        Ok(self
            .reviews
            .lock()
            .unwrap()
            .get(&book_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_review(&self, review: &NewReview) -> Result<Review> {
        self.record(format!("create_review:{}", review.book.id));
        if self.fail_reviews.load(Ordering::SeqCst) {
            return Err(outage());
        }
        self.created_reviews.lock().unwrap().push(review.clone());
        Ok(Review {
            id: ReviewId(100),
            rating: Some(review.rating),
            comment: Some(review.comment.clone()),
            created_at: Some(review.created_at.clone()),
            user: None,
            book: Some(review.book.clone()),
        })
    }

    async fn delete_review(&self, id: ReviewId) -> Result<()> {
        self.record(format!("delete_review:{id}"));
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(outage());
        }
        for reviews in self.reviews.lock().unwrap().values_mut() {
            reviews.retain(|r| r.id != id);
        }
        Ok(())
    }
}

#[async_trait]
impl CartApi for FakeBackend {
    async fn add_book_to_cart(&self, book_id: BookId, quantity: i64) -> Result<CartItem> {
        self.record(format!("add_book_to_cart:{book_id}:{quantity}"));
        if self.fail_cart.load(Ordering::SeqCst) {
            return Err(outage());
        }
        Ok(CartItem {
            id: CartItemId(1),
            quantity: Some(quantity),
            book: self.books.lock().unwrap().get(&book_id).cloned(),
        })
    }

    async fn my_cart(&self) -> Result<Option<ShoppingCart>> {
        self.record("my_cart");
        if self.fail_cart.load(Ordering::SeqCst) {
            return Err(outage());
        }
        Ok(self.cart.lock().unwrap().clone())
    }

    async fn place_order(&self) -> Result<Order> {
        self.record("place_order");
        if self.fail_cart.load(Ordering::SeqCst) {
            return Err(outage());
        }
        Ok(Order {
            id: OrderId(1),
            total_price: None,
            placed_at: None,
            status: None,
            user: None,
        })
    }
}

#[async_trait]
impl IdentityProvider for FakeBackend {
    async fn identity(&self) -> Result<Option<Account>> {
        Ok(self.account.lock().unwrap().clone())
    }
}

pub fn cart_with(items: Vec<CartItem>) -> ShoppingCart {
    ShoppingCart {
        id: CartId(1),
        created_at: None,
        completed: Some(false),
        user: None,
        items: Some(items),
    }
}

#[derive(Default)]
pub struct RecordingShell {
    pub routes: Mutex<Vec<Route>>,
    pub acks: Mutex<Vec<Acknowledgment>>,
}

impl RecordingShell {
    pub fn routes(&self) -> Vec<Route> {
        self.routes.lock().unwrap().clone()
    }

    pub fn acks(&self) -> Vec<Acknowledgment> {
        self.acks.lock().unwrap().clone()
    }
}

impl UiShell for RecordingShell {
    fn navigate(&self, route: Route) {
        self.routes.lock().unwrap().push(route);
    }

    fn acknowledge(&self, ack: Acknowledgment) {
        self.acks.lock().unwrap().push(ack);
    }
}

pub struct FixedDialog {
    pub outcome: DialogOutcome,
    pub targets: Mutex<Vec<DeletionTarget>>,
}

impl FixedDialog {
    pub fn new(outcome: DialogOutcome) -> Self {
        Self {
            outcome,
            targets: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ConfirmDialog for FixedDialog {
    async fn confirm_delete(&self, target: DeletionTarget) -> DialogOutcome {
        self.targets.lock().unwrap().push(target);
        self.outcome
    }
}
