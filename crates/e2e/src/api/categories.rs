use std::sync::Arc;

use rand::seq::SliceRandom;
use serde_json::Value;

use super::models::Category;
use super::ApiService;
use crate::error::{E2eError, E2eResult};
use crate::http::HttpSession;
use crate::payload;
use crate::registry::Entity;

/// `/categories` endpoints
pub struct CategoryService {
    session: Arc<HttpSession>,
}

impl Entity for CategoryService {
    const NAME: &'static str = "category service";
}

impl ApiService for CategoryService {
    fn new(session: Arc<HttpSession>) -> Self {
        Self { session }
    }
}

impl CategoryService {
    pub async fn list(&self) -> E2eResult<Vec<Category>> {
        let value: Value = self.session.get("/categories", &[]).await?.json()?;
        payload::normalize(value).into_list()
    }

    pub async fn get(&self, id: &str) -> E2eResult<Category> {
        self.session
            .get(&format!("/categories/tree/{}", id), &[])
            .await?
            .json()
    }

    /// Leaf categories only; products are never filed under a root category.
    pub async fn leaves(&self) -> E2eResult<Vec<Category>> {
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|c| c.parent_id.is_some())
            .collect())
    }

    pub async fn first(&self) -> E2eResult<Category> {
        self.leaves()
            .await?
            .into_iter()
            .next()
            .ok_or_else(no_categories)
    }

    pub async fn random(&self) -> E2eResult<Category> {
        let categories = self.leaves().await?;
        categories
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or_else(no_categories)
    }
}

fn no_categories() -> E2eError {
    E2eError::AssertionFailed("No categories available".to_string())
}
