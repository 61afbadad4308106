use std::sync::Arc;

use serde_json::Value;

use super::models::{ChangeResult, Paginated, Product, ProductQuery};
use super::ApiService;
use crate::error::{E2eError, E2eResult};
use crate::http::{ApiResponse, HttpSession};
use crate::payload;
use crate::registry::Entity;

/// `/products` endpoints
pub struct ProductService {
    session: Arc<HttpSession>,
}

impl Entity for ProductService {
    const NAME: &'static str = "product service";
}

impl ApiService for ProductService {
    fn new(session: Arc<HttpSession>) -> Self {
        Self { session }
    }
}

impl ProductService {
    pub async fn list_response(&self, query: &ProductQuery) -> E2eResult<ApiResponse> {
        self.session.get("/products", &query.to_query()).await
    }

    pub async fn list(&self, query: &ProductQuery) -> E2eResult<Paginated<Product>> {
        self.list_response(query).await?.json()
    }

    pub async fn get_response(&self, id: &str) -> E2eResult<ApiResponse> {
        self.session.get(&format!("/products/{}", id), &[]).await
    }

    pub async fn get(&self, id: &str) -> E2eResult<Product> {
        self.get_response(id).await?.json()
    }

    pub async fn search_response(&self, term: &str, page: Option<u32>) -> E2eResult<ApiResponse> {
        let mut query = vec![("q".to_string(), term.to_string())];
        if let Some(page) = page {
            query.push(("page".to_string(), page.to_string()));
        }
        self.session.get("/products/search", &query).await
    }

    pub async fn search(&self, term: &str, page: Option<u32>) -> E2eResult<Paginated<Product>> {
        self.search_response(term, page).await?.json()
    }

    pub async fn related_response(&self, id: &str) -> E2eResult<ApiResponse> {
        self.session
            .get(&format!("/products/{}/related", id), &[])
            .await
    }

    pub async fn related(&self, id: &str) -> E2eResult<Vec<Product>> {
        let value: Value = self.related_response(id).await?.json()?;
        payload::normalize(value).into_list()
    }

    pub async fn patch_response(&self, id: &str, changes: &Value) -> E2eResult<ApiResponse> {
        self.session
            .patch(&format!("/products/{}", id), changes)
            .await
    }

    pub async fn patch(&self, id: &str, changes: &Value) -> E2eResult<ChangeResult> {
        self.patch_response(id, changes).await?.json()
    }

    pub async fn delete_response(&self, id: &str) -> E2eResult<ApiResponse> {
        self.session.delete(&format!("/products/{}", id)).await
    }

    pub async fn delete(&self, id: &str) -> E2eResult<()> {
        self.delete_response(id).await?.error_for_status().map(drop)
    }

    /// First product of the unfiltered listing
    pub async fn first(&self) -> E2eResult<Product> {
        self.list(&ProductQuery::new())
            .await?
            .data
            .into_iter()
            .next()
            .ok_or_else(|| E2eError::AssertionFailed("No products available".to_string()))
    }
}
