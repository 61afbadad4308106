use super::ELEMENT_TIMEOUT;
use crate::browser::PageHandle;
use crate::error::E2eResult;

const SEARCH_INPUT: &str = "[data-test=\"search-query\"]";
const SEARCH_SUBMIT: &str = "[data-test=\"search-submit\"]";
const CART_LINK: &str = "[data-test=\"nav-cart\"]";
const CART_QUANTITY: &str = "[data-test=\"cart-quantity\"]";
const SIGN_IN_LINK: &str = "[data-test=\"nav-sign-in\"]";

/// Navigation bar present on every page
#[derive(Clone)]
pub struct Header {
    page: PageHandle,
}

impl Header {
    pub fn new(page: PageHandle) -> Self {
        Self { page }
    }

    pub async fn search(&self, term: &str) -> E2eResult<()> {
        self.page.wait_for(SEARCH_INPUT, ELEMENT_TIMEOUT).await?;
        self.page.fill(SEARCH_INPUT, term).await?;
        self.page.click(SEARCH_SUBMIT).await
    }

    pub async fn open_cart(&self) -> E2eResult<()> {
        self.page.wait_for(CART_LINK, ELEMENT_TIMEOUT).await?;
        self.page.click(CART_LINK).await
    }

    pub async fn open_sign_in(&self) -> E2eResult<()> {
        self.page.click(SIGN_IN_LINK).await
    }

    /// Badge count next to the cart link; zero when the badge is absent
    pub async fn cart_quantity(&self) -> E2eResult<usize> {
        if !self.page.is_visible(CART_QUANTITY).await? {
            return Ok(0);
        }
        let text = self.page.text_content(CART_QUANTITY).await?.unwrap_or_default();
        Ok(text.trim().parse().unwrap_or(0))
    }
}
