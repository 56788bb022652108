//! Book detail page: one bound book id, its reviews, and refresh handling.
//!
//! Transitions are driven by two inputs, id changes and refresh signals.
//! Each starts a load generation made of two independent fetches (the book
//! and its reviews) that update their own slice of the view as they arrive.
//! A response is applied only while its generation is still current.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use futures::future::{self, BoxFuture, FutureExt};
use shared::domain::{Book, BookId, Review};
use tokio::sync::watch;
use tracing::{debug, error, warn};

use crate::{
    api::{
        Acknowledgment, BookApi, ConfirmDialog, DeletionTarget, DialogOutcome, ReviewApi, Route,
        UiShell,
    },
    error::Result,
    refresh::{RefreshBus, Subscription},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DetailPhase {
    #[default]
    Empty,
    Loading,
    Loaded,
    Error,
    NotFound,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatedReview {
    pub review: Review,
    pub created_at: Option<DateTime<Utc>>,
}

impl DatedReview {
    /// Parses the raw timestamp only when present; never invents one.
    pub fn from_review(review: Review) -> Self {
        let created_at = review.created_at.as_deref().and_then(|raw| {
            match DateTime::parse_from_rfc3339(raw) {
                Ok(parsed) => Some(parsed.with_timezone(&Utc)),
                Err(err) => {
                    warn!(review_id = review.id.0, raw, error = %err, "unparseable review timestamp");
                    None
                }
            }
        });
        Self { review, created_at }
    }
}

/// Snapshot rendered by the detail page. Rebuilt wholesale per load.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailView {
    pub book_id: Option<BookId>,
    pub phase: DetailPhase,
    pub book: Option<Book>,
    pub reviews: Vec<DatedReview>,
    pub last_error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadOrigin {
    Initial,
    Refresh,
}

struct DetailState {
    view: DetailView,
    generation: u64,
    origin: LoadOrigin,
    pending: u8,
    failed: bool,
}

enum Arrival {
    Book(Result<Option<Book>>),
    Reviews(Result<Vec<Review>>),
}

#[derive(Clone)]
pub struct DetailRefreshController {
    books: Arc<dyn BookApi>,
    reviews: Arc<dyn ReviewApi>,
    dialog: Arc<dyn ConfirmDialog>,
    shell: Arc<dyn UiShell>,
    state: Arc<Mutex<DetailState>>,
    views: Arc<watch::Sender<DetailView>>,
}

impl DetailRefreshController {
    pub fn new(
        books: Arc<dyn BookApi>,
        reviews: Arc<dyn ReviewApi>,
        dialog: Arc<dyn ConfirmDialog>,
        shell: Arc<dyn UiShell>,
    ) -> Self {
        let (views, _) = watch::channel(DetailView::default());
        Self {
            books,
            reviews,
            dialog,
            shell,
            state: Arc::new(Mutex::new(DetailState {
                view: DetailView::default(),
                generation: 0,
                origin: LoadOrigin::Initial,
                pending: 0,
                failed: false,
            })),
            views: Arc::new(views),
        }
    }

    fn lock(&self) -> MutexGuard<'_, DetailState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn view(&self) -> DetailView {
        self.lock().view.clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DetailView> {
        self.views.subscribe()
    }

    /// Binds, rebinds or clears the book id. Rebinding the current id reloads
    /// it like a refresh signal.
    pub fn bind(&self, id: Option<BookId>) -> BoxFuture<'static, ()> {
        let Some(id) = id else {
            self.clear();
            return future::ready(()).boxed();
        };

        let generation = {
            let mut state = self.lock();
            if state.view.book_id == Some(id) {
                drop(state);
                return self.on_refresh();
            }
            state.generation += 1;
            state.origin = LoadOrigin::Initial;
            state.pending = 2;
            state.failed = false;
            state.view = DetailView {
                book_id: Some(id),
                phase: DetailPhase::Loading,
                ..DetailView::default()
            };
            self.publish(&state.view);
            state.generation
        };
        debug!(book_id = id.0, generation, "detail: bound, loading");
        self.fetch_all(generation, id)
    }

    fn clear(&self) {
        let mut state = self.lock();
        state.generation += 1;
        state.pending = 0;
        state.failed = false;
        state.view = DetailView::default();
        self.publish(&state.view);
        debug!(generation = state.generation, "detail: unbound");
    }

    /// Reloads the bound book, keeping the visible snapshot until new data
    /// arrives. Does nothing while no id is bound.
    pub fn on_refresh(&self) -> BoxFuture<'static, ()> {
        let (generation, id) = {
            let mut state = self.lock();
            let Some(id) = state.view.book_id else {
                return future::ready(()).boxed();
            };
            let showing_data = match state.view.phase {
                DetailPhase::Loaded => true,
                DetailPhase::Loading => state.origin == LoadOrigin::Refresh,
                _ => false,
            };
            state.origin = if showing_data {
                LoadOrigin::Refresh
            } else {
                LoadOrigin::Initial
            };
            state.generation += 1;
            state.pending = 2;
            state.failed = false;
            state.view.phase = DetailPhase::Loading;
            state.view.last_error = None;
            self.publish(&state.view);
            (state.generation, id)
        };
        debug!(book_id = id.0, generation, "detail: refreshing");
        self.fetch_all(generation, id)
    }

    /// Re-fetches on every signal. Requires a running tokio runtime at notify
    /// time.
    pub fn attach(&self, bus: &RefreshBus) -> Subscription {
        let controller = self.clone();
        bus.subscribe(move |_| match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(controller.on_refresh());
            }
            Err(_) => warn!("detail: refresh signal outside a runtime; reload skipped"),
        })
    }

    /// Opens the confirmation dialog; a confirmed deletion reloads like a
    /// refresh signal.
    pub async fn delete_review(&self, review: Review) -> DialogOutcome {
        let outcome = self
            .dialog
            .confirm_delete(DeletionTarget::Review(review))
            .await;
        if outcome == DialogOutcome::Deleted {
            self.on_refresh().await;
        }
        outcome
    }

    fn fetch_all(&self, generation: u64, id: BookId) -> BoxFuture<'static, ()> {
        let book_side = {
            let controller = self.clone();
            async move {
                let result = controller.books.find_book(id).await;
                controller.settle(generation, Arrival::Book(result));
            }
        };
        let review_side = {
            let controller = self.clone();
            async move {
                let result = controller.reviews.reviews_for_book(id).await;
                controller.settle(generation, Arrival::Reviews(result));
            }
        };
        async move {
            future::join(book_side, review_side).await;
        }
        .boxed()
    }

    fn settle(&self, generation: u64, arrival: Arrival) {
        let mut effects = Vec::new();
        {
            let mut state = self.lock();
            if state.generation != generation {
                debug!(
                    generation,
                    current = state.generation,
                    "detail: discarding stale response"
                );
                return;
            }
            state.pending = state.pending.saturating_sub(1);

            // Once an initial load has failed, or the book is gone, later
            // arrivals of the same generation stay discarded.
            let discard = (state.failed && state.origin == LoadOrigin::Initial)
                || state.view.phase == DetailPhase::NotFound;
            let failure = match arrival {
                Arrival::Book(Ok(Some(book))) if !discard => {
                    state.view.book = Some(book);
                    None
                }
                Arrival::Book(Ok(None)) if !discard => {
                    state.failed = true;
                    state.view.phase = DetailPhase::NotFound;
                    state.view.book = None;
                    state.view.reviews.clear();
                    effects.push(Effect::Navigate(Route::NotFound));
                    None
                }
                Arrival::Reviews(Ok(reviews)) if !discard => {
                    state.view.reviews = reviews.into_iter().map(DatedReview::from_review).collect();
                    None
                }
                Arrival::Book(Err(err)) | Arrival::Reviews(Err(err)) => Some(err),
                _ => None,
            };

            if state.view.phase == DetailPhase::NotFound {
                self.publish(&state.view);
                drop(state);
                self.run(effects);
                return;
            }

            if let Some(err) = failure {
                match state.origin {
                    LoadOrigin::Refresh => {
                        warn!(generation, error = %err, "detail: refresh failed; keeping last snapshot");
                        if state.view.last_error.is_none() {
                            effects.push(Effect::Ack(Acknowledgment::Failure(
                                "Could not refresh book details. Showing the last loaded data."
                                    .into(),
                            )));
                        }
                    }
                    LoadOrigin::Initial => {
                        error!(generation, error = %err, "detail: initial load failed");
                        if !state.failed {
                            effects.push(Effect::Ack(Acknowledgment::Failure(
                                "Could not load book details.".into(),
                            )));
                        }
                        state.failed = true;
                        state.view.book = None;
                        state.view.reviews.clear();
                    }
                }
                state.view.last_error = Some(err.to_string());
            }

            state.view.phase = if state.failed && state.origin == LoadOrigin::Initial {
                DetailPhase::Error
            } else if state.pending == 0 {
                DetailPhase::Loaded
            } else {
                DetailPhase::Loading
            };
            self.publish(&state.view);
        }
        self.run(effects);
    }

    fn publish(&self, view: &DetailView) {
        self.views.send_replace(view.clone());
    }

    fn run(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Navigate(route) => self.shell.navigate(route),
                Effect::Ack(ack) => self.shell.acknowledge(ack),
            }
        }
    }
}

enum Effect {
    Navigate(Route),
    Ack(Acknowledgment),
}

#[cfg(test)]
#[path = "tests/detail_tests.rs"]
mod tests;
