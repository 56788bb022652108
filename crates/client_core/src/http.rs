//! REST collaborator backed by `reqwest`.

use std::{fmt::Display, marker::PhantomData};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::{de::DeserializeOwned, Serialize};
use shared::{
    domain::{Account, Book, BookId, CartItem, Order, Review, ReviewId, ShoppingCart},
    error::ApiError,
    protocol::{AddBookParams, BookQuery, NewReview},
};
use tracing::debug;

use crate::{
    api::{BookApi, CartApi, IdentityProvider, ReviewApi},
    config::{normalize_base_url, ClientSettings},
    error::{ClientError, Result},
};

#[derive(Clone)]
pub struct HttpBookstoreClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpBookstoreClient {
    pub fn new(settings: &ClientSettings) -> Result<Self> {
        let http = Client::builder()
            .timeout(settings.request_timeout())
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build http client: {e}")))?;
        Ok(Self {
            http,
            base_url: normalize_base_url(&settings.api_base_url)?,
            token: settings.api_token.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// CRUD handle for `/api/{entity}`.
    pub fn resource<T>(&self, entity: &'static str) -> Resource<T> {
        Resource {
            client: self.clone(),
            entity,
            _record: PhantomData,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<Response> {
        let response = self.authorized(builder).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let problem = response.json::<ApiError>().await.unwrap_or_else(|_| {
            ApiError::new(
                status.as_u16(),
                status.canonical_reason().unwrap_or("request failed"),
            )
        });
        Err(ClientError::from_problem(status.as_u16(), problem))
    }

    async fn get_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        Ok(self.send(builder).await?.json().await?)
    }

    /// Maps a 404 to `Ok(None)`.
    async fn get_optional<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
    ) -> Result<Option<T>> {
        match self.send(builder).await {
            Ok(response) => Ok(Some(response.json().await?)),
            Err(ClientError::Network {
                status: Some(404), ..
            }) => Ok(None),
            Err(err) => Err(err),
        }
    }
}

/// Generic REST resource keyed by entity name.
pub struct Resource<T> {
    client: HttpBookstoreClient,
    entity: &'static str,
    _record: PhantomData<fn() -> T>,
}

impl<T> Resource<T>
where
    T: DeserializeOwned + Serialize + Send,
{
    pub fn entity(&self) -> &'static str {
        self.entity
    }

    pub async fn find(&self, id: impl Display) -> Result<Option<T>> {
        debug!(entity = self.entity, %id, "GET one");
        let url = self.client.url(&format!("{}/{id}", self.entity));
        self.client.get_optional(self.client.http.get(url)).await
    }

    pub async fn query<Q: Serialize + ?Sized>(&self, params: &Q) -> Result<Vec<T>> {
        debug!(entity = self.entity, "GET list");
        let url = self.client.url(self.entity);
        self.client
            .get_json(self.client.http.get(url).query(params))
            .await
    }

    pub async fn search<Q: Serialize + ?Sized>(&self, params: &Q) -> Result<Vec<T>> {
        debug!(entity = self.entity, "GET search");
        let url = self.client.url(&format!("{}/_search", self.entity));
        self.client
            .get_json(self.client.http.get(url).query(params))
            .await
    }

    pub async fn create<B: Serialize + ?Sized + Sync>(&self, record: &B) -> Result<T> {
        debug!(entity = self.entity, "POST");
        let url = self.client.url(self.entity);
        self.client
            .get_json(self.client.http.post(url).json(record))
            .await
    }

    pub async fn update(&self, id: impl Display, record: &T) -> Result<T>
    where
        T: Sync,
    {
        debug!(entity = self.entity, %id, "PUT");
        let url = self.client.url(&format!("{}/{id}", self.entity));
        self.client
            .get_json(self.client.http.put(url).json(record))
            .await
    }

    pub async fn delete(&self, id: impl Display) -> Result<()> {
        debug!(entity = self.entity, %id, "DELETE");
        let url = self.client.url(&format!("{}/{id}", self.entity));
        self.client.send(self.client.http.delete(url)).await?;
        Ok(())
    }
}

#[async_trait]
impl BookApi for HttpBookstoreClient {
    async fn find_book(&self, id: BookId) -> Result<Option<Book>> {
        self.resource::<Book>("books").find(id).await
    }

    async fn query_books(&self, query: &BookQuery) -> Result<Vec<Book>> {
        self.resource::<Book>("books").query(query).await
    }

    async fn search_books(&self, query: &BookQuery) -> Result<Vec<Book>> {
        self.resource::<Book>("books").search(query).await
    }

    async fn delete_book(&self, id: BookId) -> Result<()> {
        self.resource::<Book>("books").delete(id).await
    }
}

#[async_trait]
impl ReviewApi for HttpBookstoreClient {
    async fn reviews_for_book(&self, book_id: BookId) -> Result<Vec<Review>> {
        self.get_json(self.http.get(self.url(&format!("reviews/book/{book_id}"))))
            .await
    }

    async fn create_review(&self, review: &NewReview) -> Result<Review> {
        self.resource::<Review>("reviews").create(review).await
    }

    async fn delete_review(&self, id: ReviewId) -> Result<()> {
        self.resource::<Review>("reviews").delete(id).await
    }
}

#[async_trait]
impl CartApi for HttpBookstoreClient {
    async fn add_book_to_cart(&self, book_id: BookId, quantity: i64) -> Result<CartItem> {
        let params = AddBookParams { book_id, quantity };
        self.get_json(
            self.http
                .post(self.url("shopping-carts/add-book"))
                .query(&params),
        )
        .await
    }

    async fn my_cart(&self) -> Result<Option<ShoppingCart>> {
        self.get_optional(self.http.get(self.url("shopping-carts/my-cart")))
            .await
    }

    async fn place_order(&self) -> Result<Order> {
        self.get_json(self.http.post(self.url("orders/place-order")))
            .await
    }
}

#[async_trait]
impl IdentityProvider for HttpBookstoreClient {
    async fn identity(&self) -> Result<Option<Account>> {
        match self.get_json(self.http.get(self.url("account"))).await {
            Ok(account) => Ok(Some(account)),
            Err(ClientError::Network {
                status: Some(401), ..
            }) => {
                debug!("anonymous session");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
#[path = "tests/http_tests.rs"]
mod tests;
