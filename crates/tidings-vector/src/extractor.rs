//! FieldExtractor trait for deriving per-field texts from articles.
//!
//! The extractor decides *what* text each named vector space embeds; the
//! embedding provider decides *how*. Keeping the two apart lets a feed with
//! a different editorial layout plug in its own text composition while the
//! rest of the pipeline stays unchanged.

use tidings_core::strip_markup;

use crate::types::{Article, FieldTexts};

/// Separator placed between tags in the `tags` field text.
pub const TAG_DELIMITER: &str = ", ";

/// Derives the three field texts from an article.
///
/// Implementations must be deterministic: the same article always yields
/// the same texts.
pub trait FieldExtractor: Send + Sync {
    /// Compose the title, summary and tags texts.
    fn extract(&self, article: &Article) -> FieldTexts;

    /// Returns the name of this extractor for logging/debugging.
    fn name(&self) -> &str {
        "unnamed"
    }
}

/// Standard composition for news articles.
///
/// - `title`: the headline as given
/// - `summary`: introduction, a space, then the description with markup removed
/// - `tags`: tags joined by [`TAG_DELIMITER`]
#[derive(Clone, Debug, Default)]
pub struct DefaultFieldExtractor;

impl FieldExtractor for DefaultFieldExtractor {
    fn extract(&self, article: &Article) -> FieldTexts {
        let data = &article.formatted_data;
        let summary = format!(
            "{} {}",
            data.introductory_paragraph,
            strip_markup(&data.descriptive_paragraph)
        );

        FieldTexts {
            title: data.title.clone(),
            summary: summary.trim().to_string(),
            tags: article.tags.join(TAG_DELIMITER),
        }
    }

    fn name(&self) -> &str {
        "default"
    }
}

// ============================================================================
// Tests
// ============================================================================
