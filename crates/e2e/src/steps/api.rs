//! Product API steps
//!
//! Every request step records `lastStatus`. Steps that exercise error paths keep
//! the failure in `lastError` instead of failing; all others fail the step on
//! a non-2xx status. Either way the previous body is dropped, so assertions
//! after a failed call report `lastResponse` as unset.

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::{json, Value};
use tracing::warn;

use super::{StepArgs, StepFuture, StepRegistry};
use crate::api::models::{ChangeResult, Paginated, Product, ProductQuery};
use crate::error::{E2eError, E2eResult};
use crate::http::ApiResponse;
use crate::payload::{self, Payload, PayloadKind};
use crate::state::{
    ApiFailure, CAPTURED_ITEMS, LAST_ERROR, LAST_RESPONSE, LAST_STATUS, PRODUCT_ID,
    SEARCH_TERM, STORED_PRODUCT,
};
use crate::world::World;

const PRODUCT_FIELDS: [&str; 6] = ["id", "name", "price", "in_stock", "description", "co2_rating"];

pub(super) fn register(steps: &mut StepRegistry) -> E2eResult<()> {
    steps
        .given("Product API is available", product_api_is_available)?
        .given("Store first product from list", store_first_product_from_list)?
        .when("Request all products", request_all_products)?
        .when("Request products with page {string}", request_products_with_page)?
        .when("Request products sorted by {string}", request_products_sorted)?
        .when("Request eco-friendly products only", request_eco_friendly)?
        .when("Request rental products only", request_rental)?
        .when(
            "Request products in price range between {string} and {string}",
            request_price_range,
        )?
        .when("Request products filtered by valid category", request_by_category)?
        .when("Request products filtered by valid brand", request_by_brand)?
        .when("Request product details by stored product ID", request_stored_product)?
        .when("Request product details for invalid ID {string}", request_invalid_product)?
        .when("Search products for {string}", search_products)?
        .when("Search products for {string} with page {string}", search_products_page)?
        .when("Search products for first product name", search_stored_product_name)?
        .when("Request related products for stored product ID", request_related)?
        .when("Request related products for non-existent product ID", request_related_missing)?
        .when("Partially update stored product with new name", patch_stored_product)?
        .when("Partially update non-existent product", patch_missing_product)?
        .when("Delete non-existent product", delete_missing_product)?
        .when("Store first product from response", store_first_product_from_response)?
        .then("API response status is {int}", response_status_is)?
        .then("All API calls returned status 200", all_calls_succeeded)?
        .then("Response contains paginated products", contains_paginated_products)?
        .then("Response contains paginated search results", contains_search_results)?
        .then("Response has valid product structure", has_valid_product_structure)?
        .then("Response has complete product details", has_complete_product_details)?
        .then("Response contains array of related products", contains_related_products)?
        .then("Related products have valid structure", has_valid_product_structure)?
        .then("Current page is {string}", current_page_is)?
        .then("Response product matches stored product", product_matches_stored)?
        .then("Response contains matching products in search results", search_contains_stored)?
        .then("All results match search term {string}", results_match_term)?
        .then("All products have CO2 rating A or B", all_co2_rated_a_or_b)?
        .then("All products are marked as rental", all_rental)?
        .then("All products have price between {int} and {int}", all_priced_between)?
        .then("Products are sorted by name in ascending order", sorted_by_name_asc)?
        .then("Products are sorted by price in descending order", sorted_by_price_desc)?
        .then("All products in response belong to requested category", all_in_category)?
        .then("All products in response belong to requested brand", all_of_brand)?
        .then("Response indicates {string} update", update_indicated)?;
    Ok(())
}

/// Record status and body; non-2xx fails the step
fn record(world: &mut World, response: ApiResponse) -> E2eResult<Value> {
    world.state.set(LAST_STATUS, response.status);
    forget_response(world);
    let value = response.error_for_status()?.value()?;
    world.state.set(LAST_RESPONSE, value.clone());
    capture_items(world, &value);
    Ok(value)
}

/// Record the outcome of a call whose non-2xx answer is expected
fn record_outcome(world: &mut World, response: E2eResult<ApiResponse>) -> E2eResult<()> {
    let response = response?;
    if response.is_success() {
        return record(world, response).map(drop);
    }
    world.state.set(LAST_STATUS, response.status);
    forget_response(world);
    if let Err(err) = response.error_for_status() {
        world.state.set(LAST_ERROR, ApiFailure::from_error(&err));
    }
    Ok(())
}

/// Drop the previous call's body so assertions cannot read it
fn forget_response(world: &mut World) {
    world.state.take(LAST_RESPONSE).ok();
    world.state.take(CAPTURED_ITEMS).ok();
}

fn capture_items(world: &mut World, value: &Value) {
    let listed = payload::normalize(value.clone());
    if listed.kind() == PayloadKind::Single {
        return;
    }
    match listed.into_list::<Product>() {
        Ok(items) => world.state.set(CAPTURED_ITEMS, items),
        Err(e) => warn!("Response items are not products: {}", e),
    }
}

fn last_page(world: &World) -> E2eResult<Paginated<Product>> {
    let value = world.state.get(LAST_RESPONSE)?;
    serde_json::from_value(value.clone()).map_err(|e| {
        E2eError::AssertionFailed(format!("Response is not a page of products: {}", e))
    })
}

fn last_products(world: &World) -> E2eResult<Vec<Product>> {
    Ok(last_page(world)?.data)
}

fn last_product(world: &World) -> E2eResult<Product> {
    payload::normalize(world.state.get(LAST_RESPONSE)?.clone()).into_single()
}

fn stored_product_id(world: &World) -> E2eResult<String> {
    Ok(world.state.get(STORED_PRODUCT)?.id.clone())
}

/// Random id in the API's ULID shape that no product has
fn missing_product_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(26)
        .map(char::from)
        .collect::<String>()
        .to_uppercase()
}

fn ensure(condition: bool, message: impl FnOnce() -> String) -> E2eResult<()> {
    if condition {
        Ok(())
    } else {
        Err(E2eError::AssertionFailed(message()))
    }
}

fn check_structure(product: &Value) -> E2eResult<()> {
    for field in PRODUCT_FIELDS {
        ensure(product.get(field).is_some(), || {
            format!("Product is missing '{}': {}", field, product)
        })?;
    }
    ensure(product["id"].is_string(), || format!("Product id is not a string: {}", product))?;
    ensure(product["name"].is_string(), || format!("Product name is not a string: {}", product))?;
    ensure(product["price"].is_number(), || format!("Product price is not a number: {}", product))
}

fn product_api_is_available(world: &mut World, _args: StepArgs) -> StepFuture<'_> {
    Box::pin(async move {
        world.entities.product_service()?;
        Ok(())
    })
}

fn store_first_product_from_list(world: &mut World, _args: StepArgs) -> StepFuture<'_> {
    Box::pin(async move {
        let service = world.entities.product_service()?;
        let page = service.list(&ProductQuery::new()).await?;
        let first = page
            .data
            .into_iter()
            .next()
            .ok_or_else(|| E2eError::AssertionFailed("Product list is empty".to_string()))?;
        world.state.set(STORED_PRODUCT, first);
        Ok(())
    })
}

async fn request_products(world: &mut World, query: ProductQuery) -> E2eResult<()> {
    let service = world.entities.product_service()?;
    let response = service.list_response(&query).await?;
    record(world, response).map(drop)
}

fn request_all_products(world: &mut World, _args: StepArgs) -> StepFuture<'_> {
    Box::pin(request_products(world, ProductQuery::new()))
}

fn request_products_with_page(world: &mut World, args: StepArgs) -> StepFuture<'_> {
    Box::pin(async move {
        let page = args.parse(0)?;
        request_products(world, ProductQuery::new().page(page)).await
    })
}

fn request_products_sorted(world: &mut World, args: StepArgs) -> StepFuture<'_> {
    Box::pin(async move {
        let sort = args.str(0)?.to_string();
        request_products(world, ProductQuery::new().sort(sort)).await
    })
}

fn request_eco_friendly(world: &mut World, _args: StepArgs) -> StepFuture<'_> {
    Box::pin(request_products(world, ProductQuery::new().eco_friendly(true)))
}

fn request_rental(world: &mut World, _args: StepArgs) -> StepFuture<'_> {
    Box::pin(request_products(world, ProductQuery::new().rental(true)))
}

fn request_price_range(world: &mut World, args: StepArgs) -> StepFuture<'_> {
    Box::pin(async move {
        let min = args.parse(0)?;
        let max = args.parse(1)?;
        request_products(world, ProductQuery::new().price_between(min, max)).await
    })
}

fn request_by_category(world: &mut World, _args: StepArgs) -> StepFuture<'_> {
    Box::pin(async move {
        let category = world.entities.category_service()?.random().await?;
        world.state.set(PRODUCT_ID, category.id.clone());
        request_products(world, ProductQuery::new().by_category(category.id)).await
    })
}

fn request_by_brand(world: &mut World, _args: StepArgs) -> StepFuture<'_> {
    Box::pin(async move {
        let brand = world.entities.brand_service()?.random().await?;
        world.state.set(PRODUCT_ID, brand.id.clone());
        request_products(world, ProductQuery::new().by_brand(brand.id)).await
    })
}

fn request_stored_product(world: &mut World, _args: StepArgs) -> StepFuture<'_> {
    Box::pin(async move {
        let id = stored_product_id(world)?;
        let response = world.entities.product_service()?.get_response(&id).await?;
        record(world, response).map(drop)
    })
}

fn request_invalid_product(world: &mut World, args: StepArgs) -> StepFuture<'_> {
    Box::pin(async move {
        let id = args.str(0)?.to_string();
        let response = world.entities.product_service()?.get_response(&id).await;
        record_outcome(world, response)
    })
}

async fn search(world: &mut World, term: String, page: Option<u32>) -> E2eResult<()> {
    let response = world
        .entities
        .product_service()?
        .search_response(&term, page)
        .await?;
    world.state.set(SEARCH_TERM, term);
    record(world, response).map(drop)
}

fn search_products(world: &mut World, args: StepArgs) -> StepFuture<'_> {
    Box::pin(async move {
        let term = args.str(0)?.to_string();
        search(world, term, None).await
    })
}

fn search_products_page(world: &mut World, args: StepArgs) -> StepFuture<'_> {
    Box::pin(async move {
        let term = args.str(0)?.to_string();
        let page = args.parse(1)?;
        search(world, term, Some(page)).await
    })
}

fn search_stored_product_name(world: &mut World, _args: StepArgs) -> StepFuture<'_> {
    Box::pin(async move {
        let name = world.state.get(STORED_PRODUCT)?.name.clone();
        search(world, name, None).await
    })
}

fn request_related(world: &mut World, _args: StepArgs) -> StepFuture<'_> {
    Box::pin(async move {
        let id = stored_product_id(world)?;
        let response = world.entities.product_service()?.related_response(&id).await?;
        record(world, response).map(drop)
    })
}

fn request_related_missing(world: &mut World, _args: StepArgs) -> StepFuture<'_> {
    Box::pin(async move {
        let id = missing_product_id();
        let response = world.entities.product_service()?.related_response(&id).await;
        record_outcome(world, response)
    })
}

fn patch_stored_product(world: &mut World, _args: StepArgs) -> StepFuture<'_> {
    Box::pin(async move {
        let id = stored_product_id(world)?;
        let changes = json!({ "name": "Patched Product Name" });
        let response = world
            .entities
            .product_service()?
            .patch_response(&id, &changes)
            .await;
        record_outcome(world, response)
    })
}

fn patch_missing_product(world: &mut World, _args: StepArgs) -> StepFuture<'_> {
    Box::pin(async move {
        let id = missing_product_id();
        let changes = json!({ "name": "Updated Name" });
        let response = world
            .entities
            .product_service()?
            .patch_response(&id, &changes)
            .await;
        record_outcome(world, response)
    })
}

fn delete_missing_product(world: &mut World, _args: StepArgs) -> StepFuture<'_> {
    Box::pin(async move {
        let id = missing_product_id();
        let response = world.entities.product_service()?.delete_response(&id).await;
        record_outcome(world, response)
    })
}

fn store_first_product_from_response(world: &mut World, _args: StepArgs) -> StepFuture<'_> {
    Box::pin(async move {
        let first = world
            .state
            .get(CAPTURED_ITEMS)?
            .first()
            .cloned()
            .ok_or_else(|| E2eError::AssertionFailed("No products found in API response".to_string()))?;
        world.state.set(STORED_PRODUCT, first);
        Ok(())
    })
}

fn response_status_is(world: &mut World, args: StepArgs) -> StepFuture<'_> {
    Box::pin(async move {
        let expected: u16 = args.parse(0)?;
        let actual = *world.state.get(LAST_STATUS)?;
        ensure(actual == expected, || {
            let detail = world
                .state
                .get(LAST_ERROR)
                .map(|failure| failure.message.clone())
                .unwrap_or_default();
            format!("Expected status {}, got {} {}", expected, actual, detail)
        })
    })
}

fn all_calls_succeeded(world: &mut World, _args: StepArgs) -> StepFuture<'_> {
    Box::pin(async move {
        match world.state.get(LAST_ERROR) {
            Ok(failure) => Err(E2eError::AssertionFailed(format!(
                "An API call failed: {}",
                failure.message
            ))),
            Err(_) => Ok(()),
        }
    })
}

fn contains_paginated_products(world: &mut World, _args: StepArgs) -> StepFuture<'_> {
    Box::pin(async move {
        let page = last_page(world)?;
        ensure(!page.data.is_empty(), || "Page contains no products".to_string())
    })
}

fn contains_search_results(world: &mut World, _args: StepArgs) -> StepFuture<'_> {
    Box::pin(async move { last_page(world).map(drop) })
}

fn has_valid_product_structure(world: &mut World, _args: StepArgs) -> StepFuture<'_> {
    Box::pin(async move {
        let value = world.state.get(LAST_RESPONSE)?.clone();
        for product in payload::normalize(value).items() {
            check_structure(product)?;
        }
        Ok(())
    })
}

fn has_complete_product_details(world: &mut World, _args: StepArgs) -> StepFuture<'_> {
    Box::pin(async move {
        match payload::normalize(world.state.get(LAST_RESPONSE)?.clone()) {
            Payload::Single(product) => check_structure(&product),
            other => Err(E2eError::AssertionFailed(format!(
                "Expected one product, got {:?} payload",
                other.kind()
            ))),
        }
    })
}

fn contains_related_products(world: &mut World, _args: StepArgs) -> StepFuture<'_> {
    Box::pin(async move {
        let value = world.state.get(LAST_RESPONSE)?;
        ensure(value.is_array(), || format!("Related products are not an array: {}", value))
    })
}

fn current_page_is(world: &mut World, args: StepArgs) -> StepFuture<'_> {
    Box::pin(async move {
        let expected: u32 = args.parse(0)?;
        let page = last_page(world)?;
        ensure(page.current_page == expected, || {
            format!("Expected page {}, got {}", expected, page.current_page)
        })
    })
}

fn product_matches_stored(world: &mut World, _args: StepArgs) -> StepFuture<'_> {
    Box::pin(async move {
        let stored = world.state.get(STORED_PRODUCT)?;
        let response = last_product(world)?;
        ensure(response.id == stored.id && response.name == stored.name, || {
            format!(
                "Response product {} '{}' does not match stored {} '{}'",
                response.id, response.name, stored.id, stored.name
            )
        })
    })
}

fn search_contains_stored(world: &mut World, _args: StepArgs) -> StepFuture<'_> {
    Box::pin(async move {
        let stored_id = stored_product_id(world)?;
        let found = world.state.get(CAPTURED_ITEMS)?.iter().any(|p| p.id == stored_id);
        ensure(found, || format!("Product {} not in search results", stored_id))
    })
}

fn results_match_term(world: &mut World, args: StepArgs) -> StepFuture<'_> {
    Box::pin(async move {
        let term = args.str(0)?.to_lowercase();
        for product in last_products(world)? {
            ensure(product.name.to_lowercase().contains(&term), || {
                format!("'{}' does not match search term '{}'", product.name, term)
            })?;
        }
        Ok(())
    })
}

fn all_co2_rated_a_or_b(world: &mut World, _args: StepArgs) -> StepFuture<'_> {
    Box::pin(async move {
        for product in last_products(world)? {
            let rating = product.co2_rating.as_deref();
            ensure(matches!(rating, Some("A") | Some("B")), || {
                format!("'{}' has CO2 rating {:?}", product.name, rating)
            })?;
        }
        Ok(())
    })
}

fn all_rental(world: &mut World, _args: StepArgs) -> StepFuture<'_> {
    Box::pin(async move {
        for product in last_products(world)? {
            ensure(product.is_rental, || format!("'{}' is not a rental", product.name))?;
        }
        Ok(())
    })
}

fn all_priced_between(world: &mut World, args: StepArgs) -> StepFuture<'_> {
    Box::pin(async move {
        let min: f64 = args.parse(0)?;
        let max: f64 = args.parse(1)?;
        for product in last_products(world)? {
            ensure(product.price >= min && product.price <= max, || {
                format!("'{}' costs {} outside {}..={}", product.name, product.price, min, max)
            })?;
        }
        Ok(())
    })
}

fn sorted_by_name_asc(world: &mut World, _args: StepArgs) -> StepFuture<'_> {
    Box::pin(async move {
        let names: Vec<String> = last_products(world)?.into_iter().map(|p| p.name).collect();
        ensure(names.windows(2).all(|w| w[0] <= w[1]), || {
            format!("Names are not in ascending order: {:?}", names)
        })
    })
}

fn sorted_by_price_desc(world: &mut World, _args: StepArgs) -> StepFuture<'_> {
    Box::pin(async move {
        let prices: Vec<f64> = last_products(world)?.into_iter().map(|p| p.price).collect();
        ensure(prices.windows(2).all(|w| w[0] >= w[1]), || {
            format!("Prices are not in descending order: {:?}", prices)
        })
    })
}

fn all_in_category(world: &mut World, _args: StepArgs) -> StepFuture<'_> {
    Box::pin(async move {
        let category_id = world.state.get(PRODUCT_ID)?.clone();
        for product in last_products(world)? {
            let actual = product.category.as_ref().map(|c| c.id.as_str());
            ensure(actual == Some(category_id.as_str()), || {
                format!("'{}' has category {:?}, expected {}", product.name, actual, category_id)
            })?;
        }
        Ok(())
    })
}

fn all_of_brand(world: &mut World, _args: StepArgs) -> StepFuture<'_> {
    Box::pin(async move {
        let brand_id = world.state.get(PRODUCT_ID)?.clone();
        for product in last_products(world)? {
            let actual = product.brand.as_ref().map(|b| b.id.as_str());
            ensure(actual == Some(brand_id.as_str()), || {
                format!("'{}' has brand {:?}, expected {}", product.name, actual, brand_id)
            })?;
        }
        Ok(())
    })
}

fn update_indicated(world: &mut World, args: StepArgs) -> StepFuture<'_> {
    Box::pin(async move {
        let expected = match args.str(0)? {
            "successful" => true,
            "failed" => false,
            other => {
                return Err(E2eError::StepFailed {
                    step: "Response indicates update".to_string(),
                    reason: format!("unknown outcome '{}'", other),
                })
            }
        };
        let result: ChangeResult = serde_json::from_value(world.state.get(LAST_RESPONSE)?.clone())?;
        ensure(result.success == expected, || {
            format!("Update success was {}, expected {}", result.success, expected)
        })
    })
}
