use super::{contains_ignore_case, BasePage, PageObject, ELEMENT_TIMEOUT};
use crate::browser::PageHandle;
use crate::error::E2eResult;
use crate::registry::Entity;

const TITLE: &str = "h3";
const EMAIL: &str = "[data-test=\"email\"]";
const PASSWORD: &str = "[data-test=\"password\"]";
const SUBMIT: &str = "[data-test=\"login-submit\"]";
const REGISTER_LINK: &str = "[data-test=\"register-link\"]";

/// Sign-in form, standalone or as the second checkout step
pub struct AccountLoginPage {
    base: BasePage,
}

impl Entity for AccountLoginPage {
    const NAME: &'static str = "account login page";
}

impl PageObject for AccountLoginPage {
    fn new(page: PageHandle, base_url: &str) -> Self {
        Self {
            base: BasePage::new(page, base_url),
        }
    }
}

impl AccountLoginPage {
    pub async fn open(&self) -> E2eResult<()> {
        self.base.goto("/auth/login").await
    }

    pub async fn title(&self) -> E2eResult<String> {
        self.base.page().wait_for(TITLE, ELEMENT_TIMEOUT).await?;
        Ok(self
            .base
            .page()
            .text_content(TITLE)
            .await?
            .unwrap_or_default()
            .trim()
            .to_string())
    }

    /// The login form is showing and titled as a login
    pub async fn is_displayed(&self) -> E2eResult<bool> {
        self.base.page().wait_for(EMAIL, ELEMENT_TIMEOUT).await?;
        Ok(contains_ignore_case(&self.title().await?, "login"))
    }

    /// Both paths are offered: sign in, or register a new account
    pub async fn offers_registration(&self) -> E2eResult<bool> {
        self.base.page().is_visible(REGISTER_LINK).await
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> E2eResult<()> {
        self.base.page().fill(EMAIL, email).await?;
        self.base.page().fill(PASSWORD, password).await?;
        self.base.page().click(SUBMIT).await
    }
}
