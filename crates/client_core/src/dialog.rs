//! Delete confirmation dialog that performs the deletion it confirms.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use crate::api::{
    Acknowledgment, BookApi, ConfirmDialog, DeletionTarget, DialogOutcome, ReviewApi, UiShell,
};

/// Yes/no prompt presented to the user.
pub trait Confirmer: Send + Sync {
    fn confirm(&self, prompt: &str) -> bool;
}

pub struct DeleteDialog {
    books: Arc<dyn BookApi>,
    reviews: Arc<dyn ReviewApi>,
    confirmer: Arc<dyn Confirmer>,
    shell: Arc<dyn UiShell>,
}

impl DeleteDialog {
    pub fn new(
        books: Arc<dyn BookApi>,
        reviews: Arc<dyn ReviewApi>,
        confirmer: Arc<dyn Confirmer>,
        shell: Arc<dyn UiShell>,
    ) -> Self {
        Self {
            books,
            reviews,
            confirmer,
            shell,
        }
    }
}

pub fn prompt_for(target: &DeletionTarget) -> String {
    match target {
        DeletionTarget::Book(book) => format!(
            "Are you sure you want to delete Book {} ({})?",
            book.id,
            book.display_title()
        ),
        DeletionTarget::Review(review) => {
            format!("Are you sure you want to delete Review {}?", review.id)
        }
    }
}

fn failure_text(target: &DeletionTarget) -> &'static str {
    match target {
        DeletionTarget::Book(_) => "Could not delete the book. Please try again.",
        DeletionTarget::Review(_) => "Could not delete the review. Please try again.",
    }
}

#[async_trait]
impl ConfirmDialog for DeleteDialog {
    async fn confirm_delete(&self, target: DeletionTarget) -> DialogOutcome {
        if !self.confirmer.confirm(&prompt_for(&target)) {
            return DialogOutcome::Dismissed;
        }
        let result = match &target {
            DeletionTarget::Book(book) => self.books.delete_book(book.id).await,
            DeletionTarget::Review(review) => self.reviews.delete_review(review.id).await,
        };
        match result {
            Ok(()) => {
                info!(?target, "deleted");
                DialogOutcome::Deleted
            }
            Err(err) => {
                error!(error = %err, "delete failed");
                self.shell
                    .acknowledge(Acknowledgment::Failure(failure_text(&target).into()));
                DialogOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/dialog_tests.rs"]
mod tests;
