//! Product knowledge base for retrieval-augmented pricing.
//!
//! Defines the `SimilarProducts` trait and an in-memory catalogue of
//! products with known prices, searched by token similarity. The frontier
//! estimator uses the nearest neighbours as pricing context.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

/// A catalogued product with a known price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricedProduct {
    pub description: String,
    pub price: f64,
}

/// Abstraction over similarity search for priced products.
pub trait SimilarProducts: Send + Sync {
    /// Return up to `k` products most similar to `description`,
    /// best match first.
    fn find_similar(&self, description: &str, k: usize) -> Vec<PricedProduct>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ---------------------------------------------------------------------------
// Text similarity
// ---------------------------------------------------------------------------

fn tokens(s: &str) -> HashSet<String> {
    s.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 2) // drop short words like "a", "in", "to"
        .map(String::from)
        .collect()
}

/// Normalised similarity between two token sets.
///
/// Weighted combination of the Jaccard index and a containment score so a
/// short query can still match a long catalogue description.
/// Returns 0.0 (no overlap) to 1.0 (same tokens).
fn token_similarity(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let intersection = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    let jaccard = intersection / union;
    let containment = intersection / a.len().min(b.len()) as f64;

    (0.6 * jaccard + 0.4 * containment).min(1.0)
}

pub fn text_similarity(a: &str, b: &str) -> f64 {
    token_similarity(&tokens(a), &tokens(b))
}

// ---------------------------------------------------------------------------
// In-memory index
// ---------------------------------------------------------------------------

struct IndexedProduct {
    product: PricedProduct,
    tokens: HashSet<String>,
}

/// Product catalogue held in memory, tokenised once at load time.
pub struct ProductIndex {
    products: Vec<IndexedProduct>,
}

impl ProductIndex {
    pub fn new(products: Vec<PricedProduct>) -> Self {
        let products = products
            .into_iter()
            .filter(|p| p.price.is_finite() && p.price > 0.0)
            .map(|product| IndexedProduct {
                tokens: tokens(&product.description),
                product,
            })
            .collect();
        Self { products }
    }

    pub fn empty() -> Self {
        Self { products: Vec::new() }
    }

    /// Load a JSON array of `{description, price}` records.
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read product catalogue {}", path.display()))?;
        let products: Vec<PricedProduct> = serde_json::from_str(&json)
            .with_context(|| format!("Failed to parse product catalogue {}", path.display()))?;
        let index = Self::new(products);
        info!(path = %path.display(), products = index.len(), "Product catalogue loaded");
        Ok(index)
    }

    /// Load the catalogue if it exists, otherwise start with an empty index.
    pub fn load_or_empty(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "No product catalogue found, retrieval context disabled");
            return Ok(Self::empty());
        }
        Self::load(path)
    }
}

impl SimilarProducts for ProductIndex {
    fn find_similar(&self, description: &str, k: usize) -> Vec<PricedProduct> {
        let query = tokens(description);
        let mut scored: Vec<(f64, &IndexedProduct)> = self
            .products
            .iter()
            .map(|p| (token_similarity(&query, &p.tokens), p))
            .filter(|(score, _)| *score > 0.0)
            .collect();

        // Stable: equal scores keep catalogue order.
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        debug!(candidates = scored.len(), k, "Similarity search complete");

        scored
            .into_iter()
            .take(k)
            .map(|(_, p)| p.product.clone())
            .collect()
    }

    fn len(&self) -> usize {
        self.products.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
