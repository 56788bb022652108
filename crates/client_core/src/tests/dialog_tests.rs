use super::*;

use std::sync::{atomic::Ordering, Mutex};

use shared::domain::{BookId, ReviewId};

use crate::test_support::{book, review, FakeBackend, RecordingShell};

struct Scripted {
    answer: bool,
    prompts: Mutex<Vec<String>>,
}

impl Scripted {
    fn answering(answer: bool) -> Arc<Self> {
        Arc::new(Self {
            answer,
            prompts: Mutex::new(Vec::new()),
        })
    }
}

impl Confirmer for Scripted {
    fn confirm(&self, prompt: &str) -> bool {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.answer
    }
}

#[tokio::test]
async fn confirmed_book_deletion_is_performed() {
    let backend = Arc::new(FakeBackend::with_catalog(vec![book(3, "Dune")]));
    let confirmer = Scripted::answering(true);
    let dialog = DeleteDialog::new(
        backend.clone(),
        backend.clone(),
        confirmer.clone(),
        Arc::new(RecordingShell::default()),
    );

    let outcome = dialog
        .confirm_delete(DeletionTarget::Book(book(3, "Dune")))
        .await;

    assert_eq!(outcome, DialogOutcome::Deleted);
    assert_eq!(backend.calls(), vec!["delete_book:3".to_string()]);
    assert_eq!(
        *confirmer.prompts.lock().unwrap(),
        vec!["Are you sure you want to delete Book 3 (Dune)?".to_string()]
    );
}

#[tokio::test]
async fn declined_deletion_touches_nothing() {
    let backend = Arc::new(FakeBackend::default());
    let dialog = DeleteDialog::new(
        backend.clone(),
        backend.clone(),
        Scripted::answering(false),
        Arc::new(RecordingShell::default()),
    );

    let outcome = dialog
        .confirm_delete(DeletionTarget::Review(review(8, 1, 4, None)))
        .await;

    assert_eq!(outcome, DialogOutcome::Dismissed);
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn review_deletion_targets_review_id() {
    let backend = Arc::new(FakeBackend::default());
    backend.put_reviews(BookId(1), vec![review(8, 1, 4, None)]);
    let dialog = DeleteDialog::new(
        backend.clone(),
        backend.clone(),
        Scripted::answering(true),
        Arc::new(RecordingShell::default()),
    );

    let outcome = dialog
        .confirm_delete(DeletionTarget::Review(review(8, 1, 4, None)))
        .await;

    assert_eq!(outcome, DialogOutcome::Deleted);
    assert_eq!(backend.calls(), vec![format!("delete_review:{}", ReviewId(8))]);
    assert!(backend.reviews.lock().unwrap()[&BookId(1)].is_empty());
}

#[tokio::test]
async fn failed_review_deletion_is_acknowledged_not_dismissed() {
    let backend = Arc::new(FakeBackend::default());
    backend.fail_deletes.store(true, Ordering::SeqCst);
    let shell = Arc::new(RecordingShell::default());
    let dialog = DeleteDialog::new(
        backend.clone(),
        backend.clone(),
        Scripted::answering(true),
        shell.clone(),
    );

    let outcome = dialog
        .confirm_delete(DeletionTarget::Review(review(8, 1, 4, None)))
        .await;

    assert_eq!(outcome, DialogOutcome::Failed);
    assert_eq!(
        shell.acks(),
        vec![Acknowledgment::Failure(
            "Could not delete the review. Please try again.".into()
        )]
    );
}

#[tokio::test]
async fn failed_book_deletion_is_acknowledged() {
    let backend = Arc::new(FakeBackend::with_catalog(vec![book(3, "Dune")]));
    backend.fail_deletes.store(true, Ordering::SeqCst);
    let shell = Arc::new(RecordingShell::default());
    let dialog = DeleteDialog::new(
        backend.clone(),
        backend.clone(),
        Scripted::answering(true),
        shell.clone(),
    );

    let outcome = dialog
        .confirm_delete(DeletionTarget::Book(book(3, "Dune")))
        .await;

    assert_eq!(outcome, DialogOutcome::Failed);
    assert_eq!(backend.calls(), vec!["delete_book:3".to_string()]);
    assert_eq!(
        shell.acks(),
        vec![Acknowledgment::Failure(
            "Could not delete the book. Please try again.".into()
        )]
    );
}

#[tokio::test]
async fn declined_deletion_sends_no_acknowledgment() {
    let backend = Arc::new(FakeBackend::default());
    let shell = Arc::new(RecordingShell::default());
    let dialog = DeleteDialog::new(
        backend.clone(),
        backend.clone(),
        Scripted::answering(false),
        shell.clone(),
    );

    dialog
        .confirm_delete(DeletionTarget::Book(book(3, "Dune")))
        .await;

    assert!(shell.acks().is_empty());
}
