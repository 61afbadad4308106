use super::{BasePage, PageObject, ELEMENT_TIMEOUT};
use crate::browser::PageHandle;
use crate::error::E2eResult;
use crate::registry::Entity;

const CART_ROWS: &str = "app-cart tbody tr";
const PROCEED: &str = "[data-test=\"proceed-1\"]";

/// Shopping cart, the first checkout step
pub struct CartPage {
    base: BasePage,
}

impl Entity for CartPage {
    const NAME: &'static str = "cart page";
}

impl PageObject for CartPage {
    fn new(page: PageHandle, base_url: &str) -> Self {
        Self {
            base: BasePage::new(page, base_url),
        }
    }
}

impl CartPage {
    pub async fn open(&self) -> E2eResult<()> {
        self.base.goto("/checkout").await
    }

    pub async fn is_displayed(&self) -> E2eResult<bool> {
        Ok(self.base.current_url().await?.contains("/checkout"))
    }

    pub async fn item_count(&self) -> E2eResult<usize> {
        self.base.page().wait_for(CART_ROWS, ELEMENT_TIMEOUT).await?;
        self.base.page().count(CART_ROWS).await
    }

    pub async fn proceed_to_checkout(&self) -> E2eResult<()> {
        self.base.page().wait_for(PROCEED, ELEMENT_TIMEOUT).await?;
        self.base.page().click(PROCEED).await
    }
}
