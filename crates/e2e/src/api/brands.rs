use std::sync::Arc;

use rand::seq::SliceRandom;
use serde_json::Value;

use super::models::Brand;
use super::ApiService;
use crate::error::{E2eError, E2eResult};
use crate::http::HttpSession;
use crate::payload;
use crate::registry::Entity;

/// `/brands` endpoints
pub struct BrandService {
    session: Arc<HttpSession>,
}

impl Entity for BrandService {
    const NAME: &'static str = "brand service";
}

impl ApiService for BrandService {
    fn new(session: Arc<HttpSession>) -> Self {
        Self { session }
    }
}

impl BrandService {
    pub async fn list(&self) -> E2eResult<Vec<Brand>> {
        let value: Value = self.session.get("/brands", &[]).await?.json()?;
        payload::normalize(value).into_list()
    }

    pub async fn get(&self, id: &str) -> E2eResult<Brand> {
        self.session
            .get(&format!("/brands/{}", id), &[])
            .await?
            .json()
    }

    pub async fn first(&self) -> E2eResult<Brand> {
        self.list()
            .await?
            .into_iter()
            .next()
            .ok_or_else(no_brands)
    }

    pub async fn random(&self) -> E2eResult<Brand> {
        let brands = self.list().await?;
        brands
            .choose(&mut rand::thread_rng())
            .cloned()
            .ok_or_else(no_brands)
    }
}

fn no_brands() -> E2eError {
    E2eError::AssertionFailed("No brands available".to_string())
}
