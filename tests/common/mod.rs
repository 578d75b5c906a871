//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use typeahead::embedding::MockEmbeddingProvider;
use typeahead::search::{ItemAccessors, SemanticSearchEngine};
use typeahead::SearchConfig;

/// A catalog entry keyed by id, searched by name.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: u32,
    pub name: String,
}

impl Product {
    pub fn new(id: u32, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
        }
    }
}

pub fn product_accessors() -> ItemAccessors<Product> {
    ItemAccessors::new(|p: &Product| p.name.clone(), |p: &Product| format!("product-{}", p.id))
}

pub fn products() -> Vec<Product> {
    vec![
        Product::new(1, "Mobile Phone"),
        Product::new(2, "Smartphone"),
        Product::new(3, "Laptop"),
        Product::new(4, "Automobile"),
        Product::new(5, "Mobility Scooter"),
    ]
}

/// Query vectors point along the first axis; item vectors are scripted around them.
pub fn catalog_provider() -> MockEmbeddingProvider {
    MockEmbeddingProvider::new()
        .with_vector("phone", vec![1.0, 0.0, 0.0])
        .with_vector("mobi", vec![1.0, 0.0, 0.0])
        .with_vector("laptop", vec![0.0, 1.0, 0.0])
        .with_vector("Mobile Phone", vec![0.9, 0.1, 0.0])
        .with_vector("Smartphone", vec![0.6, 0.8, 0.0])
        .with_vector("Laptop", vec![0.0, 1.0, 0.0])
        .with_vector("Automobile", vec![0.0, 0.0, 1.0])
        .with_vector("Mobility Scooter", vec![0.1, 0.0, 1.0])
}

pub fn product_engine(
    provider: MockEmbeddingProvider,
    config: SearchConfig,
) -> (Arc<MockEmbeddingProvider>, SemanticSearchEngine<Product>) {
    let provider = Arc::new(provider);
    let engine = SemanticSearchEngine::new(provider.clone(), product_accessors(), config)
        .expect("valid search config");
    (provider, engine)
}
