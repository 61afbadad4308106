use super::{BasePage, Header, PageObject, ELEMENT_TIMEOUT};
use crate::browser::PageHandle;
use crate::error::E2eResult;
use crate::registry::Entity;

const TITLE: &str = "[data-test=\"product-name\"]";
const UNIT_PRICE: &str = "[data-test=\"unit-price\"]";
const ADD_TO_CART: &str = "[data-test=\"add-to-cart\"]";

/// Product details page
pub struct ProductPage {
    base: BasePage,
}

impl Entity for ProductPage {
    const NAME: &'static str = "product page";
}

impl PageObject for ProductPage {
    fn new(page: PageHandle, base_url: &str) -> Self {
        Self {
            base: BasePage::new(page, base_url),
        }
    }
}

impl ProductPage {
    pub async fn open(&self, product_id: &str) -> E2eResult<()> {
        self.base.goto(&format!("/product/{}", product_id)).await?;
        self.wait_loaded().await
    }

    pub async fn wait_loaded(&self) -> E2eResult<()> {
        self.base.page().wait_for(ADD_TO_CART, ELEMENT_TIMEOUT).await
    }

    pub fn header(&self) -> Header {
        self.base.header()
    }

    pub async fn title(&self) -> E2eResult<String> {
        self.wait_loaded().await?;
        let title = self.base.page().text_content(TITLE).await?;
        Ok(title.unwrap_or_default().trim().to_string())
    }

    pub async fn unit_price(&self) -> E2eResult<Option<f64>> {
        let price = self.base.page().text_content(UNIT_PRICE).await?;
        Ok(price.and_then(|p| p.trim().trim_start_matches('$').parse().ok()))
    }

    pub async fn add_to_cart(&self) -> E2eResult<()> {
        self.wait_loaded().await?;
        self.base.page().click(ADD_TO_CART).await
    }
}
