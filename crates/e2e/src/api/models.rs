//! Toolshop API payloads

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub is_location_offer: bool,
    #[serde(default)]
    pub is_rental: bool,
    #[serde(default)]
    pub in_stock: bool,
    #[serde(default)]
    pub is_eco_friendly: bool,
    #[serde(default)]
    pub co2_rating: Option<String>,
    #[serde(default)]
    pub category: Option<CategoryRef>,
    #[serde(default)]
    pub brand: Option<BrandRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandRef {
    pub id: String,
    pub name: String,
}

/// One page of a paginated listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paginated<T> {
    #[serde(default = "first_page")]
    pub current_page: u32,
    pub data: Vec<T>,
    #[serde(default)]
    pub from: Option<u32>,
    #[serde(default = "first_page")]
    pub last_page: u32,
    #[serde(default)]
    pub per_page: u32,
    #[serde(default)]
    pub to: Option<u32>,
    #[serde(default)]
    pub total: u64,
}

fn first_page() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brand {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub parent_id: Option<String>,
}

/// Acknowledgement returned by update endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeResult {
    pub success: bool,
}

/// Filters, sorting and pagination for `GET /products`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductQuery {
    pub by_brand: Option<String>,
    pub by_category: Option<String>,
    pub is_rental: Option<bool>,
    pub eco_friendly: Option<bool>,
    /// Inclusive price range
    pub between: Option<(f64, f64)>,
    /// `column,direction`, e.g. `name,asc`
    pub sort: Option<String>,
    pub page: Option<u32>,
}

impl ProductQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by_brand(mut self, id: impl Into<String>) -> Self {
        self.by_brand = Some(id.into());
        self
    }

    pub fn by_category(mut self, id: impl Into<String>) -> Self {
        self.by_category = Some(id.into());
        self
    }

    pub fn rental(mut self, rental: bool) -> Self {
        self.is_rental = Some(rental);
        self
    }

    pub fn eco_friendly(mut self, eco: bool) -> Self {
        self.eco_friendly = Some(eco);
        self
    }

    pub fn price_between(mut self, min: f64, max: f64) -> Self {
        self.between = Some((min, max));
        self
    }

    pub fn sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Query pairs with unset filters left out
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        if let Some(brand) = &self.by_brand {
            query.push(("by_brand".to_string(), brand.clone()));
        }
        if let Some(category) = &self.by_category {
            query.push(("by_category".to_string(), category.clone()));
        }
        if let Some(rental) = self.is_rental {
            query.push(("is_rental".to_string(), rental.to_string()));
        }
        if let Some(eco) = self.eco_friendly {
            query.push(("eco_friendly".to_string(), eco.to_string()));
        }
        if let Some((min, max)) = self.between {
            query.push(("between".to_string(), format!("price,{},{}", min, max)));
        }
        if let Some(sort) = &self.sort {
            query.push(("sort".to_string(), sort.clone()));
        }
        if let Some(page) = self.page {
            query.push(("page".to_string(), page.to_string()));
        }
        query
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_product_query_skips_unset_filters() {
        assert!(ProductQuery::new().to_query().is_empty());

        let query = ProductQuery::new()
            .by_category("01HCAT")
            .eco_friendly(true)
            .price_between(1.0, 100.5)
            .sort("price,desc")
            .page(2)
            .to_query();

        assert_eq!(
            query,
            vec![
                ("by_category".to_string(), "01HCAT".to_string()),
                ("eco_friendly".to_string(), "true".to_string()),
                ("between".to_string(), "price,1,100.5".to_string()),
                ("sort".to_string(), "price,desc".to_string()),
                ("page".to_string(), "2".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_paginated_products() {
        let raw = r#"{
            "current_page": 1,
            "data": [{
                "id": "01JA1",
                "name": "Combination Pliers",
                "description": "Lorem ipsum",
                "price": 14.15,
                "is_location_offer": false,
                "is_rental": false,
                "co2_rating": "D",
                "in_stock": true,
                "is_eco_friendly": false,
                "product_image": { "id": "img", "file_name": "pliers01.avif" },
                "category": { "id": "01HC", "name": "Pliers", "slug": "pliers" },
                "brand": { "id": "01HB", "name": "ForgeFlex Tools" }
            }],
            "from": 1,
            "last_page": 6,
            "per_page": 9,
            "to": 9,
            "total": 50
        }"#;

        let page: Paginated<Product> = serde_json::from_str(raw).unwrap();
        assert_eq!(page.last_page, 6);
        assert_eq!(page.data[0].name, "Combination Pliers");
        assert_eq!(page.data[0].brand.as_ref().unwrap().name, "ForgeFlex Tools");
        assert_eq!(page.data[0].co2_rating.as_deref(), Some("D"));
    }

    #[test]
    fn test_minimal_product_uses_defaults() {
        let product: Product =
            serde_json::from_str(r#"{ "id": "1", "name": "Saw", "price": 12.0 }"#).unwrap();
        assert!(!product.in_stock);
        assert!(product.category.is_none());
    }
}
