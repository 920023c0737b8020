//! Fixture store
//!
//! Expected reference data, loaded once at suite start and read-only for
//! the rest of the run.

mod credentials;
mod products;

use std::path::Path;

pub use credentials::{
    credentials_from_listing, load_credentials, parse_credentials, text_fragments, Persona,
    TextFragment, UserCredential, CREDENTIAL_FILE_VERSION,
};
pub use products::{load_products, parse_products, ProductRecord};

use crate::common::config::FixtureConfig;
use crate::common::{Error, Result};

/// Read a fixture file, distinguishing "absent" from "unreadable"
pub(crate) fn read_fixture(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(Error::FixtureMissing {
            path: path.display().to_string(),
        });
    }
    std::fs::read_to_string(path).map_err(|e| Error::FileRead {
        path: path.display().to_string(),
        error: e.to_string(),
    })
}

/// Credentials and expected products for one run
#[derive(Debug, Clone)]
pub struct FixtureStore {
    credentials: Vec<UserCredential>,
    products: Vec<ProductRecord>,
}

impl FixtureStore {
    /// Build a store from already-loaded data
    pub fn new(credentials: Vec<UserCredential>, products: Vec<ProductRecord>) -> Result<Self> {
        if credentials.is_empty() {
            return Err(Error::fixture_malformed("credentials", "no usable credentials"));
        }
        if products.is_empty() {
            return Err(Error::fixture_malformed("products", "no product records"));
        }
        Ok(Self {
            credentials,
            products,
        })
    }

    /// Load both fixtures from files
    pub fn load(config: &FixtureConfig) -> Result<Self> {
        let credentials = load_credentials(&config.credentials_path())?;
        let products = load_products(&config.products_path())?;
        tracing::info!(
            users = credentials.len(),
            products = products.len(),
            "Loaded fixtures from {}",
            config.dir.display()
        );
        Self::new(credentials, products)
    }

    pub fn credentials(&self) -> &[UserCredential] {
        &self.credentials
    }

    pub fn products(&self) -> &[ProductRecord] {
        &self.products
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn write_fixtures(dir: &Path) {
        std::fs::write(
            dir.join("credentials.yaml"),
            "version: 1\nusers:\n  - username: standard_user\n  - username: locked_out_user\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("inventory.json"),
            r#"[{"name": "A", "description": "d", "price": "$1.00", "imageSrc": "/a.jpg"}]"#,
        )
        .unwrap();
    }

    #[test]
    fn test_load_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        write_fixtures(dir.path());
        let config = FixtureConfig {
            dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let store = FixtureStore::load(&config).unwrap();
        assert_eq!(store.credentials().len(), 2);
        assert_eq!(store.products().len(), 1);
        assert_eq!(store.credentials()[1].persona, Persona::LockedOut);
    }

    #[test]
    fn test_missing_file_is_fixture_missing() {
        let dir = tempfile::tempdir().unwrap();
        let config = FixtureConfig {
            dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let err = FixtureStore::load(&config).unwrap_err();
        assert!(matches!(err, Error::FixtureMissing { .. }));
    }

    #[test]
    fn test_shipped_fixtures_parse() {
        let dir = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures");
        let config = FixtureConfig {
            dir,
            ..Default::default()
        };
        let store = FixtureStore::load(&config).unwrap();
        assert_eq!(store.products().len(), 6);
        assert_eq!(store.credentials().len(), 6);
    }
}
