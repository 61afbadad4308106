//! Storefront UI steps

use super::{StepArgs, StepFuture, StepRegistry};
use crate::error::{E2eError, E2eResult};
use crate::pages::contains_ignore_case;
use crate::state::{CART_ITEMS, SEARCH_TERM, SELECTED_PRODUCT_NAME};
use crate::world::World;

pub(super) fn register(steps: &mut StepRegistry) -> E2eResult<()> {
    steps
        .given("Open the home page", open_home_page)?
        .when("Search for {string}", search_for)?
        .when("Open product {string}", open_product)?
        .when("Open the first search result", open_first_result)?
        .when("Add the product to cart", add_to_cart)?
        .when("click the Checkout button", click_checkout)?
        .then("search results include a product", results_include_product)?
        .then("the product is added to the cart", product_added_to_cart)?
        .then("the cart page displays with the product", cart_displays_product)?
        .then("the Account Login page is displayed", account_login_displayed)?
        .then(
            "user is asked to authenticate or create an account",
            asked_to_authenticate,
        )?;
    Ok(())
}

fn open_home_page(world: &mut World, _args: StepArgs) -> StepFuture<'_> {
    Box::pin(async move { world.entities.home_page()?.navigate().await })
}

fn search_for(world: &mut World, args: StepArgs) -> StepFuture<'_> {
    Box::pin(async move {
        let term = args.str(0)?.to_string();
        world.state.set(SEARCH_TERM, term.clone());
        world.entities.home_page()?.search(&term).await
    })
}

fn results_include_product(world: &mut World, _args: StepArgs) -> StepFuture<'_> {
    Box::pin(async move {
        let term = world.state.get(SEARCH_TERM)?.clone();
        let names = world.entities.home_page()?.product_names().await?;
        if names.iter().any(|name| contains_ignore_case(name, &term)) {
            Ok(())
        } else {
            Err(E2eError::AssertionFailed(format!(
                "No search result matches '{}': {:?}",
                term, names
            )))
        }
    })
}

fn open_product(world: &mut World, args: StepArgs) -> StepFuture<'_> {
    Box::pin(async move {
        let name = args.str(0)?.to_string();
        world.entities.home_page()?.open_product(&name).await?;
        let title = world.entities.product_page()?.title().await?;
        if !contains_ignore_case(&title, &name) {
            return Err(E2eError::AssertionFailed(format!(
                "Opened '{}' instead of '{}'",
                title, name
            )));
        }
        world.state.set(SELECTED_PRODUCT_NAME, title);
        Ok(())
    })
}

fn open_first_result(world: &mut World, _args: StepArgs) -> StepFuture<'_> {
    Box::pin(async move {
        let name = world.entities.home_page()?.open_first_product().await?;
        world.entities.product_page()?.wait_loaded().await?;
        world.state.set(SELECTED_PRODUCT_NAME, name);
        Ok(())
    })
}

fn add_to_cart(world: &mut World, _args: StepArgs) -> StepFuture<'_> {
    Box::pin(async move { world.entities.product_page()?.add_to_cart().await })
}

fn product_added_to_cart(world: &mut World, _args: StepArgs) -> StepFuture<'_> {
    Box::pin(async move {
        world.entities.product_page()?.header().open_cart().await?;
        let count = world.entities.cart_page()?.item_count().await?;
        if count == 0 {
            return Err(E2eError::AssertionFailed("Cart is empty".to_string()));
        }
        world.state.set(CART_ITEMS, count);
        Ok(())
    })
}

fn cart_displays_product(world: &mut World, _args: StepArgs) -> StepFuture<'_> {
    Box::pin(async move {
        let cart = world.entities.cart_page()?;
        if !cart.is_displayed().await? {
            return Err(E2eError::AssertionFailed("Cart page is not displayed".to_string()));
        }
        let count = cart.item_count().await?;
        if count == 0 {
            return Err(E2eError::AssertionFailed("Cart is empty".to_string()));
        }
        world.state.set(CART_ITEMS, count);
        Ok(())
    })
}

fn click_checkout(world: &mut World, _args: StepArgs) -> StepFuture<'_> {
    Box::pin(async move {
        let cart = world.entities.cart_page()?;
        if !cart.is_displayed().await? {
            return Err(E2eError::AssertionFailed("Cart page is not displayed".to_string()));
        }
        cart.proceed_to_checkout().await
    })
}

fn account_login_displayed(world: &mut World, _args: StepArgs) -> StepFuture<'_> {
    Box::pin(async move {
        if world.entities.account_login_page()?.is_displayed().await? {
            Ok(())
        } else {
            Err(E2eError::AssertionFailed(
                "Account login page is not displayed".to_string(),
            ))
        }
    })
}

fn asked_to_authenticate(world: &mut World, _args: StepArgs) -> StepFuture<'_> {
    Box::pin(async move {
        let login = world.entities.account_login_page()?;
        if login.is_displayed().await? && login.offers_registration().await? {
            Ok(())
        } else {
            Err(E2eError::AssertionFailed(
                "Sign-in and registration are not both offered".to_string(),
            ))
        }
    })
}
