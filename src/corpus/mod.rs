use std::path::Path;

use anyhow::{Context, Result};
use rand::seq::{IndexedRandom, SliceRandom};
use tokio::fs;

use crate::models::Image;

/// Read-only table of panorama locations, loaded once at startup
pub struct ImageCorpus {
    images: Vec<Image>,
}

impl ImageCorpus {
    /// Load the corpus from a JSON array of images
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read image corpus {}", path.display()))?;
        let corpus = Self::from_json(&content)?;

        tracing::info!("Loaded {} images into corpus", corpus.len());

        Ok(corpus)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let images: Vec<Image> =
            serde_json::from_str(content).context("Image corpus is not a JSON array of images")?;
        Ok(Self::new(images))
    }

    pub fn new(images: Vec<Image>) -> Self {
        Self { images }
    }

    /// Create an empty corpus (no images can be served)
    pub fn empty() -> Self {
        Self { images: Vec::new() }
    }

    /// Images in `region`, or every image when no region is given
    pub fn pool(&self, region: Option<&str>) -> Vec<&Image> {
        self.filtered(region, None)
    }

    fn filtered(&self, region: Option<&str>, country: Option<&str>) -> Vec<&Image> {
        self.images
            .iter()
            .filter(|img| region.is_none_or(|r| img.region == r))
            .filter(|img| country.is_none_or(|c| img.country.as_deref() == Some(c)))
            .collect()
    }

    /// A uniformly random image from the region pool
    pub fn random_image(&self, region: Option<&str>) -> Option<&Image> {
        let pool = self.pool(region);
        pool.choose(&mut rand::rng()).copied()
    }

    /// Up to `count` distinct images matching the filters, in random order
    pub fn sample(&self, region: Option<&str>, country: Option<&str>, count: usize) -> Vec<&Image> {
        let mut pool = self.filtered(region, country);
        pool.shuffle(&mut rand::rng());
        pool.truncate(count);
        pool
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn test_corpus() -> ImageCorpus {
        ImageCorpus::from_json(
            r#"[
                {"id": "eu-1", "lat": 48.8566, "lng": 2.3522, "region": "europe", "country": "France"},
                {"id": "eu-2", "lat": 52.5200, "lng": 13.4050, "region": "europe", "country": "Germany"},
                {"id": "eu-3", "lat": 41.9028, "lng": 12.4964, "region": "europe", "country": "Italy"},
                {"id": "us-1", "lat": 40.7128, "lng": -74.0060, "region": "usa"},
                {"id": "us-2", "lat": 34.0522, "lng": -118.2437, "region": "usa"}
            ]"#,
        )
        .expect("Failed to parse test corpus")
    }

    #[test]
    fn test_empty_corpus() {
        let corpus = ImageCorpus::empty();
        assert!(corpus.is_empty());
        assert!(corpus.random_image(None).is_none());
        assert!(corpus.sample(None, None, 3).is_empty());
    }

    #[test]
    fn test_pool_filters_by_region() {
        let corpus = test_corpus();
        assert_eq!(corpus.len(), 5);
        assert_eq!(corpus.pool(None).len(), 5);
        assert_eq!(corpus.pool(Some("europe")).len(), 3);
        assert_eq!(corpus.pool(Some("usa")).len(), 2);
        assert!(corpus.pool(Some("atlantis")).is_empty());
    }

    #[test]
    fn test_random_image_respects_region() {
        let corpus = test_corpus();
        for _ in 0..50 {
            let img = corpus.random_image(Some("usa")).expect("usa pool is not empty");
            assert_eq!(img.region, "usa");
        }
        assert!(corpus.random_image(Some("atlantis")).is_none());
    }

    #[test]
    fn test_sample_is_distinct_and_capped() {
        let corpus = test_corpus();

        let sample = corpus.sample(Some("europe"), None, 10);
        assert_eq!(sample.len(), 3);
        let mut ids: Vec<_> = sample.iter().map(|img| img.id.as_str()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 3);

        assert_eq!(corpus.sample(None, None, 1).len(), 1);
    }

    #[test]
    fn test_sample_filters_by_country() {
        let corpus = test_corpus();
        let sample = corpus.sample(Some("europe"), Some("Italy"), 5);
        assert_eq!(sample.len(), 1);
        assert_eq!(sample[0].id, "eu-3");
        // Images without a country never match a country filter
        assert!(corpus.sample(Some("usa"), Some("USA"), 5).is_empty());
    }

    #[test]
    fn test_from_json_rejects_malformed_input() {
        assert!(ImageCorpus::from_json(r#"{"id": "not-an-array"}"#).is_err());
        assert!(ImageCorpus::from_json(r#"[{"id": "x", "lat": 1.0}]"#).is_err());
    }
}
