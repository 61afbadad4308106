use super::{BasePage, Header, PageObject, ELEMENT_TIMEOUT};
use crate::browser::PageHandle;
use crate::error::{E2eError, E2eResult};
use crate::registry::Entity;

const PRODUCT_CARDS: &str = "[data-test^=\"product-\"]";
const PRODUCT_NAMES: &str = "[data-test=\"product-name\"]";
const SEARCH_CAPTION: &str = "[data-test=\"search-caption\"]";
const NO_RESULTS: &str = "[data-test=\"no-results\"]";

/// Product listing with search and filters
pub struct HomePage {
    base: BasePage,
}

impl Entity for HomePage {
    const NAME: &'static str = "home page";
}

impl PageObject for HomePage {
    fn new(page: PageHandle, base_url: &str) -> Self {
        Self {
            base: BasePage::new(page, base_url),
        }
    }
}

impl HomePage {
    pub async fn navigate(&self) -> E2eResult<()> {
        self.base.goto("/").await?;
        self.base.page().wait_for(PRODUCT_NAMES, ELEMENT_TIMEOUT).await
    }

    pub fn header(&self) -> Header {
        self.base.header()
    }

    /// Search and wait until the result caption shows up
    pub async fn search(&self, term: &str) -> E2eResult<()> {
        self.header().search(term).await?;
        self.base.page().wait_for(SEARCH_CAPTION, ELEMENT_TIMEOUT).await
    }

    pub async fn product_names(&self) -> E2eResult<Vec<String>> {
        let names = self.base.page().all_text_contents(PRODUCT_NAMES).await?;
        Ok(names.into_iter().map(|n| n.trim().to_string()).collect())
    }

    pub async fn product_count(&self) -> E2eResult<usize> {
        self.base.page().count(PRODUCT_CARDS).await
    }

    pub async fn has_no_results(&self) -> E2eResult<bool> {
        self.base.page().is_visible(NO_RESULTS).await
    }

    /// Open the first card whose text contains `name`
    pub async fn open_product(&self, name: &str) -> E2eResult<()> {
        let selector = format!("{}:has-text(\"{}\")", PRODUCT_CARDS, name.replace('"', "\\\""));
        if self.base.page().count(&selector).await? == 0 {
            return Err(E2eError::AssertionFailed(format!(
                "No product card matches '{}'",
                name
            )));
        }
        self.base.page().click(&selector).await
    }

    /// Open the first listed product and return its name
    pub async fn open_first_product(&self) -> E2eResult<String> {
        let name = self
            .product_names()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| E2eError::AssertionFailed("No products listed".to_string()))?;
        self.base.page().click(PRODUCT_NAMES).await?;
        Ok(name)
    }
}
