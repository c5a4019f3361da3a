//! Carousel slide inspection, used by the `check-slides` binary.
//!
//! Slide images live in a storage bucket named `carousel-slides`. A known
//! upload bug stored some paths with the bucket name twice; those URLs 404.

use serde::Deserialize;
use serde_json::Value;

use crate::{
    errors::ServiceResult,
    service::{DataService, Order, Select},
};

/// Default table holding the slides.
pub const SLIDES_TABLE: &str = "carousel_slides";

/// Path fragment that marks a broken image URL.
pub const DUPLICATED_SEGMENT: &str = "carousel-slides/carousel-slides";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CarouselSlide {
    /// Integer or UUID depending on the schema revision.
    pub id: Value,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl CarouselSlide {
    pub fn has_duplicated_segment(&self) -> bool {
        self.image_url
            .as_deref()
            .is_some_and(|url| url.contains(DUPLICATED_SEGMENT))
    }

    /// The id as printed: bare for strings, JSON otherwise.
    pub fn display_id(&self) -> String {
        match &self.id {
            Value::String(id) => id.clone(),
            other => other.to_string(),
        }
    }
}

/// Totals printed after the slide listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlideSummary {
    pub total: usize,
    pub duplicated: usize,
    pub missing_image: usize,
}

impl SlideSummary {
    pub fn of(slides: &[CarouselSlide]) -> Self {
        slides.iter().fold(Self::default(), |mut summary, slide| {
            summary.total += 1;
            if slide.has_duplicated_segment() {
                summary.duplicated += 1;
            }
            if slide.image_url.as_deref().is_none_or(str::is_empty) {
                summary.missing_image += 1;
            }
            summary
        })
    }
}

/// Read up to `limit` slides from `table`, ordered by id.
pub async fn fetch_slides(
    service: &dyn DataService,
    table: &str,
    limit: Option<u32>,
) -> ServiceResult<Vec<CarouselSlide>> {
    let rows = service
        .select(table, Select::new().limit(limit).order(Some(Order::asc("id"))))
        .await?;
    let slides = rows
        .into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<CarouselSlide>, _>>()?;
    crate::debug_log!("📊 [SLIDES] Fetched {} rows from {}", slides.len(), table);
    Ok(slides)
}
