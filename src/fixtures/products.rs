//! Expected product catalog

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::common::{Error, Result};

use super::read_fixture;

/// One expected inventory entry, in rendered order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    pub name: String,
    pub description: String,
    /// Price exactly as rendered, e.g. "$29.99"
    pub price: String,
    pub image_src: String,
}

/// Load the product catalog from a JSON fixture file
pub fn load_products(path: &Path) -> Result<Vec<ProductRecord>> {
    let content = read_fixture(path)?;
    parse_products(&content, &path.display().to_string())
}

/// Parse a JSON array of product records
pub fn parse_products(content: &str, origin: &str) -> Result<Vec<ProductRecord>> {
    let products: Vec<ProductRecord> = serde_json::from_str(content)
        .map_err(|e| Error::fixture_malformed(origin, e.to_string()))?;

    if products.is_empty() {
        return Err(Error::fixture_malformed(origin, "no product records"));
    }
    if let Some(index) = products.iter().position(|p| p.name.trim().is_empty()) {
        return Err(Error::fixture_malformed(
            origin,
            format!("product at index {} has an empty name", index),
        ));
    }
    Ok(products)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_products_keeps_order() {
        let products = parse_products(
            r#"[
                {"name": "B", "description": "second", "price": "$2.00", "imageSrc": "/b.jpg"},
                {"name": "A", "description": "first", "price": "$1.00", "imageSrc": "/a.jpg"}
            ]"#,
            "inline",
        )
        .unwrap();
        assert_eq!(products[0].name, "B");
        assert_eq!(products[1].image_src, "/a.jpg");
    }

    #[test]
    fn test_empty_catalog_is_malformed() {
        let err = parse_products("[]", "inline").unwrap_err();
        assert!(matches!(err, Error::FixtureMalformed { .. }));
    }

    #[test]
    fn test_missing_field_is_malformed() {
        let err = parse_products(r#"[{"name": "A"}]"#, "inline").unwrap_err();
        assert!(matches!(err, Error::FixtureMalformed { .. }));
    }

    #[test]
    fn test_blank_name_is_malformed() {
        let err = parse_products(
            r#"[{"name": " ", "description": "", "price": "$1", "imageSrc": "/x"}]"#,
            "inline",
        )
        .unwrap_err();
        assert!(err.to_string().contains("index 0"));
    }
}
