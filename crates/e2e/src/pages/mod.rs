//! Toolshop page objects
//!
//! Page objects receive the scenario's page handle at construction and
//! expose behavior-level operations only. Selectors stay in this module.

use std::time::Duration;

use crate::browser::PageHandle;
use crate::error::E2eResult;
use crate::registry::Entity;

mod account_login;
mod cart;
mod header;
mod home;
mod product;

pub use account_login::AccountLoginPage;
pub use cart::CartPage;
pub use header::Header;
pub use home::HomePage;
pub use product::ProductPage;

pub(crate) const ELEMENT_TIMEOUT: Duration = Duration::from_secs(10);

/// A UI controller the entity registry can construct from the page handle.
/// Construction must not touch the browser.
pub trait PageObject: Entity {
    fn new(page: PageHandle, base_url: &str) -> Self;
}

/// Navigation shared by every page object
#[derive(Clone)]
pub struct BasePage {
    page: PageHandle,
    base_url: String,
}

impl BasePage {
    pub fn new(page: PageHandle, base_url: &str) -> Self {
        Self {
            page,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn page(&self) -> &PageHandle {
        &self.page
    }

    /// Absolute URL for an application path
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub async fn goto(&self, path: &str) -> E2eResult<()> {
        self.page.goto(&self.url_for(path)).await
    }

    pub async fn current_url(&self) -> E2eResult<String> {
        self.page.url().await
    }

    pub fn header(&self) -> Header {
        Header::new(self.page.clone())
    }
}

/// Case-insensitive containment used by the UI assertions
pub(crate) fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
