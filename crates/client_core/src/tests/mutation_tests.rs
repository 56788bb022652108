use super::*;

use std::sync::atomic::{AtomicUsize, Ordering};

use crate::test_support::{book, FakeBackend, RecordingShell};

struct Harness {
    backend: Arc<FakeBackend>,
    shell: Arc<RecordingShell>,
    signals: Arc<AtomicUsize>,
    flow: CartMutationFlow,
    _subscription: crate::refresh::Subscription,
}

fn harness() -> Harness {
    let backend = Arc::new(FakeBackend::default());
    let shell = Arc::new(RecordingShell::default());
    let bus = RefreshBus::new();
    let signals = Arc::new(AtomicUsize::new(0));
    let subscription = {
        let signals = Arc::clone(&signals);
        bus.subscribe(move |_| {
            signals.fetch_add(1, Ordering::SeqCst);
        })
    };
    let flow = CartMutationFlow::new(backend.clone(), backend.clone(), bus, shell.clone());
    Harness {
        backend,
        shell,
        signals,
        flow,
        _subscription: subscription,
    }
}

fn in_stock(id: i64, title: &str, stock: i64) -> Book {
    let mut book = book(id, title);
    book.stock = Some(stock);
    book
}

#[tokio::test]
async fn zero_quantity_is_rejected_before_any_request() {
    let h = harness();
    let action = MutationAction::add_to_cart(&in_stock(9, "Dune", 3), 0);

    let err = h.flow.submit(action).await.expect_err("rejected");

    assert!(matches!(
        err,
        ClientError::Validation(ValidationFailure::NonPositiveQuantity)
    ));
    assert!(h.backend.calls().is_empty());
    assert_eq!(h.signals.load(Ordering::SeqCst), 0);
    assert_eq!(
        h.shell.acks(),
        vec![Acknowledgment::Failure(
            "Quantity must be a positive count".into()
        )]
    );
}

#[tokio::test]
async fn out_of_stock_book_is_rejected() {
    let h = harness();
    let action = MutationAction::add_to_cart(&book(1, "Dune"), 1);

    let err = h.flow.submit(action).await.expect_err("rejected");

    assert!(matches!(
        err,
        ClientError::Validation(ValidationFailure::OutOfStock)
    ));
    assert!(h.backend.calls().is_empty());
}

#[test]
fn validation_checks_quantity_before_book_and_stock() {
    let action = MutationAction::AddToCart {
        book_id: None,
        title: None,
        quantity: -1,
        stock: None,
    };
    assert_eq!(action.validate(), Err(ValidationFailure::NonPositiveQuantity));

    let action = MutationAction::AddToCart {
        book_id: None,
        title: None,
        quantity: 1,
        stock: Some(4),
    };
    assert_eq!(action.validate(), Err(ValidationFailure::MissingBookId));
}

#[tokio::test]
async fn add_to_cart_without_book_never_reaches_the_cart() {
    let h = harness();
    let action = MutationAction::AddToCart {
        book_id: None,
        title: Some("Dune".into()),
        quantity: 1,
        stock: Some(4),
    };

    let err = h.flow.submit(action).await.expect_err("rejected");

    assert!(matches!(
        err,
        ClientError::Validation(ValidationFailure::MissingBookId)
    ));
    assert!(h.backend.calls().is_empty());
    assert_eq!(h.signals.load(Ordering::SeqCst), 0);
    assert_eq!(h.shell.acks().len(), 1);
}

#[tokio::test]
async fn add_to_cart_signals_once_and_acknowledges() {
    let h = harness();
    let action = MutationAction::add_to_cart(&in_stock(3, "Dune", 2), 2);

    let receipt = h.flow.submit(action).await.expect("added");

    assert!(matches!(receipt, MutationReceipt::AddedToCart(_)));
    assert_eq!(h.backend.calls(), vec!["add_book_to_cart:3:2".to_string()]);
    assert_eq!(h.signals.load(Ordering::SeqCst), 1);
    assert_eq!(
        h.shell.acks(),
        vec![Acknowledgment::Success(
            "Added \"Dune\" to your cart!".into()
        )]
    );
    assert!(h.shell.routes().is_empty());
}

#[tokio::test]
async fn failed_write_does_not_signal() {
    let h = harness();
    h.backend.fail_cart.store(true, Ordering::SeqCst);
    let action = MutationAction::add_to_cart(&in_stock(3, "Dune", 2), 1);

    let err = h.flow.submit(action).await.expect_err("outage");

    assert!(matches!(err, ClientError::Network { .. }));
    assert_eq!(h.backend.calls().len(), 1);
    assert_eq!(h.signals.load(Ordering::SeqCst), 0);
    assert_eq!(
        h.shell.acks(),
        vec![Acknowledgment::Failure(
            "Failed to add book to cart. Please try again.".into()
        )]
    );
}

#[tokio::test]
async fn review_submission_returns_to_the_book() {
    let h = harness();
    let action = MutationAction::SubmitReview {
        book_id: BookId(4),
        rating: Some(5),
        comment: Some("  loved it ".into()),
    };

    let receipt = h.flow.submit(action).await.expect("submitted");

    assert!(matches!(receipt, MutationReceipt::ReviewSubmitted(_)));
    assert_eq!(h.signals.load(Ordering::SeqCst), 1);
    assert_eq!(h.shell.routes(), vec![Route::BookDetail(BookId(4))]);
    assert_eq!(
        h.shell.acks(),
        vec![Acknowledgment::Success("Review submitted successfully!".into())]
    );

    let created = h.backend.created_reviews.lock().unwrap().clone();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].comment, "loved it");
    assert_eq!(created[0].rating, 5);
    assert_eq!(created[0].book.id, BookId(4));
    assert!(chrono::DateTime::parse_from_rfc3339(&created[0].created_at).is_ok());
}

#[tokio::test]
async fn review_requires_rating_in_range_and_comment() {
    let h = harness();
    let cases = [
        (None, Some("ok"), ValidationFailure::MissingRating),
        (
            Some(6),
            Some("ok"),
            ValidationFailure::RatingOutOfRange {
                min: MIN_RATING,
                max: MAX_RATING,
            },
        ),
        (Some(0), Some("ok"), ValidationFailure::RatingOutOfRange {
            min: MIN_RATING,
            max: MAX_RATING,
        }),
        (Some(3), Some("   "), ValidationFailure::MissingComment),
        (Some(3), None, ValidationFailure::MissingComment),
    ];

    for (rating, comment, expected) in cases {
        let action = MutationAction::SubmitReview {
            book_id: BookId(1),
            rating,
            comment: comment.map(str::to_string),
        };
        let err = h.flow.submit(action).await.expect_err("rejected");
        assert!(
            matches!(err, ClientError::Validation(failure) if failure == expected),
            "expected {expected:?}"
        );
    }
    assert!(h.backend.calls().is_empty());
    assert_eq!(h.signals.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failed_review_keeps_user_on_form() {
    let h = harness();
    h.backend.fail_reviews.store(true, Ordering::SeqCst);
    let action = MutationAction::SubmitReview {
        book_id: BookId(4),
        rating: Some(2),
        comment: Some("meh".into()),
    };

    h.flow.submit(action).await.expect_err("outage");

    assert!(h.shell.routes().is_empty());
    assert_eq!(
        h.shell.acks(),
        vec![Acknowledgment::Failure(
            "Something went wrong when submitting the review.".into()
        )]
    );
}

#[tokio::test]
async fn placing_an_order_navigates_to_orders() {
    let h = harness();

    let receipt = h
        .flow
        .submit(MutationAction::PlaceOrder { item_count: 2 })
        .await
        .expect("placed");

    assert!(matches!(receipt, MutationReceipt::OrderPlaced(_)));
    assert_eq!(h.signals.load(Ordering::SeqCst), 1);
    assert_eq!(h.shell.routes(), vec![Route::Orders]);
}

#[tokio::test]
async fn empty_cart_cannot_be_ordered() {
    let h = harness();

    let err = h
        .flow
        .submit(MutationAction::PlaceOrder { item_count: 0 })
        .await
        .expect_err("rejected");

    assert!(err.is_validation());
    assert!(h.backend.calls().is_empty());
    assert!(h.shell.routes().is_empty());
}

#[test]
fn cancel_leaves_for_the_list() {
    let h = harness();
    h.flow.cancel();
    assert_eq!(h.shell.routes(), vec![Route::BookList]);
}
