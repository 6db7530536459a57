//! Weighted score fusion across the per-field result sets.
//!
//! Each named vector space is searched separately; fusion merges the three
//! ranked lists by point identity into a single relevance per document.
//!
//! # Algorithm
//!
//! For document `d` with per-field similarities `s_f(d)` (0 when `d` is
//! absent from field `f`'s list):
//!
//! `overall(d) = 0.5·s_summary(d) + 0.3·s_title(d) + 0.2·s_tags(d)`
//!
//! Similarities are clamped to `[0, 1]` first, so `overall` is in `[0, 1]`.
//! Output keeps first-encounter order across title, then summary, then
//! tags; [`rank_by_overall`] sorts it when a ranked view is wanted.

use std::collections::HashMap;

use crate::types::{
    ArticlePayload, FieldKind, FusedResult, PerFieldScore, Relevance, ScoredPoint,
};

/// Render a `[0, 1]` score as a percentage with two decimals, e.g. `"81.27%"`.
pub fn format_percentage(score: f32) -> String {
    format!("{:.2}%", score * 100.0)
}

struct Entry {
    id: String,
    scores: PerFieldScore,
    payload: Option<ArticlePayload>,
}

/// Merge the three per-field result sets.
///
/// Every document that appears in any list appears exactly once in the
/// output. If a list repeats an id, the higher score counts.
pub fn fuse(title: &[ScoredPoint], summary: &[ScoredPoint], tags: &[ScoredPoint]) -> Vec<FusedResult> {
    let mut order: Vec<Entry> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    let lists = [
        (FieldKind::Title, title),
        (FieldKind::Summary, summary),
        (FieldKind::Tags, tags),
    ];

    for (field, hits) in lists {
        for hit in hits {
            let score = hit.score.clamp(0.0, 1.0);
            let slot = *index.entry(hit.id.clone()).or_insert_with(|| {
                order.push(Entry {
                    id: hit.id.clone(),
                    scores: PerFieldScore::default(),
                    payload: None,
                });
                order.len() - 1
            });

            let entry = &mut order[slot];
            if score > entry.scores.get(field) {
                entry.scores.set(field, score);
            }
            if entry.payload.is_none() {
                entry.payload = hit.payload.clone();
            }
        }
    }

    order.into_iter().map(into_result).collect()
}

fn into_result(entry: Entry) -> FusedResult {
    let overall = entry.scores.overall();
    let payload = entry.payload.unwrap_or_default();
    FusedResult {
        id: entry.id,
        article_title: payload.title,
        article_link: payload.link,
        relevance: Relevance {
            title: format_percentage(entry.scores.title),
            summary: format_percentage(entry.scores.summary),
            tags: format_percentage(entry.scores.tags),
            overall: format_percentage(overall),
        },
        scores: entry.scores,
        overall,
    }
}

/// Sort fused results by overall score, best first. Ties keep their order.
pub fn rank_by_overall(results: &mut [FusedResult]) {
    results.sort_by(|a, b| {
        b.overall
            .partial_cmp(&a.overall)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn hit(id: &str, score: f32) -> ScoredPoint {
        ScoredPoint {
            id: id.to_string(),
            score,
            payload: Some(ArticlePayload {
                title: format!("title {id}"),
                link: format!("https://example.com/{id}"),
                ..Default::default()
            }),
        }
    }

    #[test]
    fn test_format_percentage() {
        assert_eq!(format_percentage(0.0), "0.00%");
        assert_eq!(format_percentage(1.0), "100.00%");
        assert_eq!(format_percentage(0.81274), "81.27%");
    }

    #[test]
    fn test_fuse_empty() {
        assert!(fuse(&[], &[], &[]).is_empty());
    }

    #[test]
    fn test_fuse_single_field_document() {
        let results = fuse(&[], &[hit("a", 0.8)], &[]);

        assert_eq!(results.len(), 1);
        let r = &results[0];
        assert_eq!(r.scores.title, 0.0);
        assert_eq!(r.scores.tags, 0.0);
        assert!((r.scores.summary - 0.8).abs() < 1e-6);
        assert!((r.overall - 0.4).abs() < 1e-6);
        assert_eq!(r.relevance.title, "0.00%");
        assert_eq!(r.relevance.overall, "40.00%");
    }

    #[test]
    fn test_fuse_merges_by_id() {
        let results = fuse(&[hit("a", 0.6)], &[hit("a", 0.8)], &[hit("a", 0.5)]);

        assert_eq!(results.len(), 1);
        let r = &results[0];
        let expected = 0.5 * 0.8 + 0.3 * 0.6 + 0.2 * 0.5;
        assert!((r.overall - expected).abs() < 1e-6);
        assert_eq!(r.article_title, "title a");
        assert_eq!(r.article_link, "https://example.com/a");
    }

    #[test]
    fn test_fuse_first_encounter_order() {
        let results = fuse(
            &[hit("t1", 0.1), hit("shared", 0.2)],
            &[hit("s1", 0.9), hit("shared", 0.9)],
            &[hit("g1", 0.5)],
        );
        let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["t1", "shared", "s1", "g1"]);
    }

    #[test]
    fn test_rank_by_overall() {
        let mut results = fuse(&[hit("low", 0.1)], &[hit("high", 0.9)], &[hit("mid", 0.9)]);
        rank_by_overall(&mut results);
        let ids: Vec<&str> = results.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["high", "mid", "low"]);
    }

    #[test]
    fn test_fuse_clamps_scores() {
        let results = fuse(&[hit("neg", -0.4)], &[hit("big", 1.2)], &[]);

        assert_eq!(results[0].scores.title, 0.0);
        assert_eq!(results[0].overall, 0.0);
        assert_eq!(results[1].scores.summary, 1.0);
        assert_eq!(results[1].relevance.summary, "100.00%");
    }

    #[test]
    fn test_fuse_duplicate_in_one_list_keeps_max() {
        let results = fuse(&[hit("a", 0.3), hit("a", 0.7)], &[], &[]);
        assert_eq!(results.len(), 1);
        assert!((results[0].scores.title - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_fuse_payload_from_later_field() {
        let bare = ScoredPoint {
            id: "a".into(),
            score: 0.5,
            payload: None,
        };
        let results = fuse(&[bare], &[hit("a", 0.5)], &[]);
        assert_eq!(results[0].article_link, "https://example.com/a");
    }

    #[test]
    fn test_fuse_missing_payload_defaults() {
        let bare = ScoredPoint {
            id: "a".into(),
            score: 0.5,
            payload: None,
        };
        let results = fuse(&[], &[], &[bare]);
        assert_eq!(results[0].article_title, "");
        assert_eq!(results[0].article_link, "");
    }

    fn scored_list() -> impl Strategy<Value = Vec<ScoredPoint>> {
        prop::collection::vec(("[a-e]", -1.5f32..1.5f32), 0..6).prop_map(|hits| {
            hits.into_iter()
                .map(|(id, score)| ScoredPoint {
                    id,
                    score,
                    payload: None,
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_overall_is_weighted_sum(
            title in scored_list(),
            summary in scored_list(),
            tags in scored_list(),
        ) {
            let results = fuse(&title, &summary, &tags);

            let mut seen = std::collections::HashSet::new();
            for r in &results {
                prop_assert!(seen.insert(r.id.clone()));

                let expected = 0.5 * r.scores.summary + 0.3 * r.scores.title + 0.2 * r.scores.tags;
                prop_assert!((r.overall - expected).abs() < 1e-5);
                prop_assert!(r.overall >= 0.0);
                prop_assert!(r.overall <= 1.0 + 1e-6);
            }

            let all: std::collections::HashSet<&str> = title
                .iter()
                .chain(&summary)
                .chain(&tags)
                .map(|h| h.id.as_str())
                .collect();
            prop_assert_eq!(all.len(), results.len());
        }
    }
}
