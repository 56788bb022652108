//! Shopping cart page.

use std::sync::Arc;

use shared::domain::ShoppingCart;
use tracing::{debug, warn};

use crate::{
    api::{is_admin, Acknowledgment, CartApi, IdentityProvider, Route, UiShell},
    error::Result,
    mutation::{CartMutationFlow, MutationAction, MutationReceipt},
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CartSnapshot {
    pub cart: Option<ShoppingCart>,
    pub is_admin: bool,
}

impl CartSnapshot {
    pub fn item_count(&self) -> usize {
        self.cart.as_ref().map_or(0, |c| c.items().len())
    }

    /// Sum of price × quantity; missing prices or quantities count as zero.
    pub fn total_price(&self) -> f64 {
        self.cart
            .as_ref()
            .map_or(0.0, |c| c.items().iter().map(|item| item.line_total()).sum())
    }
}

pub struct CartView {
    cart: Arc<dyn CartApi>,
    identity: Arc<dyn IdentityProvider>,
    mutations: Arc<CartMutationFlow>,
    shell: Arc<dyn UiShell>,
    snapshot: CartSnapshot,
}

impl CartView {
    pub fn new(
        cart: Arc<dyn CartApi>,
        identity: Arc<dyn IdentityProvider>,
        mutations: Arc<CartMutationFlow>,
        shell: Arc<dyn UiShell>,
    ) -> Self {
        Self {
            cart,
            identity,
            mutations,
            shell,
            snapshot: CartSnapshot::default(),
        }
    }

    pub fn snapshot(&self) -> &CartSnapshot {
        &self.snapshot
    }

    /// Administrators manage the catalog, not a cart of their own; nothing is
    /// loaded for them.
    pub async fn load(&mut self) -> Result<()> {
        self.snapshot.is_admin = is_admin(self.identity.as_ref()).await;
        if self.snapshot.is_admin {
            debug!("cart: admin session, skipping cart load");
            self.snapshot.cart = None;
            return Ok(());
        }
        match self.cart.my_cart().await {
            Ok(cart) => {
                self.snapshot.cart = cart;
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "cart: load failed");
                self.shell.acknowledge(Acknowledgment::Failure(
                    "Could not load your cart.".into(),
                ));
                Err(err)
            }
        }
    }

    pub async fn place_order(&mut self) -> Result<MutationReceipt> {
        let action = MutationAction::PlaceOrder {
            item_count: self.snapshot.item_count(),
        };
        let receipt = self.mutations.submit(action).await?;
        self.snapshot.cart = None;
        Ok(receipt)
    }

    pub fn continue_shopping(&self) {
        self.shell.navigate(Route::BookList);
    }
}

#[cfg(test)]
#[path = "tests/cart_tests.rs"]
mod tests;
