//! Relevance scoring of candidate references

use super::ReferenceDocument;
use crate::llm::{strip_code_fence, CompletionRequest, SCORING_INSTRUCTION};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Serialize)]
struct ScoredCandidate<'a> {
    title: &'a str,
    url: &'a str,
    content: &'a str,
}

/// Build the rating request for the first `prefix` documents
pub fn scoring_request(
    subject: &str,
    documents: &[ReferenceDocument],
    prefix: usize,
) -> CompletionRequest {
    let candidates: Vec<ScoredCandidate<'_>> = documents
        .iter()
        .take(prefix)
        .map(|d| ScoredCandidate {
            title: &d.title,
            url: &d.url,
            content: &d.content,
        })
        .collect();

    let json = serde_json::to_string(&candidates).unwrap_or_else(|_| "[]".to_string());

    CompletionRequest::new(SCORING_INSTRUCTION, format!("{}\n```json\n{}\n```", subject, json))
}

/// Parse a `{url: score}` object
///
/// Returns `None` when the response is not a JSON object. Scores that are
/// not numbers count as 0; numbers are clamped to 0..=10.
pub fn parse_scores(raw: &str) -> Option<HashMap<String, i32>> {
    let value: serde_json::Value = serde_json::from_str(strip_code_fence(raw)).ok()?;
    let object = value.as_object()?;

    let scores = object
        .iter()
        .map(|(url, score)| {
            let score = score
                .as_f64()
                .or_else(|| score.as_str().and_then(|s| s.trim().parse().ok()))
                .map(|s| s.round().clamp(0.0, 10.0) as i32)
                .unwrap_or(0);
            (url.clone(), score)
        })
        .collect();

    Some(scores)
}

/// Apply scores, drop documents below `threshold`, order by descending score
///
/// Unscored documents count as 0. Ties keep their input order.
pub fn rank(
    documents: Vec<ReferenceDocument>,
    scores: &HashMap<String, i32>,
    threshold: i32,
) -> Vec<ReferenceDocument> {
    let mut ranked: Vec<ReferenceDocument> = documents
        .into_iter()
        .map(|mut doc| {
            doc.rate = scores.get(&doc.url).copied().unwrap_or(0);
            doc
        })
        .filter(|doc| doc.rate >= threshold)
        .collect();

    ranked.sort_by(|a, b| b.rate.cmp(&a.rate));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(url: &str) -> ReferenceDocument {
        ReferenceDocument::new(url, url, "content")
    }

    #[test]
    fn test_parse_fenced_scores() {
        let scores = parse_scores("```json\n{\"https://a\": 7, \"https://b\": \"9\", \"https://c\": null}\n```").unwrap();
        assert_eq!(scores["https://a"], 7);
        assert_eq!(scores["https://b"], 9);
        assert_eq!(scores["https://c"], 0);
    }

    #[test]
    fn test_parse_clamps() {
        let scores = parse_scores(r#"{"https://a": 42, "https://b": -3}"#).unwrap();
        assert_eq!(scores["https://a"], 10);
        assert_eq!(scores["https://b"], 0);
    }

    #[test]
    fn test_unparseable_scores() {
        assert!(parse_scores("I think the first one is best").is_none());
        assert!(parse_scores("[1, 2]").is_none());
    }

    #[test]
    fn test_threshold_boundary() {
        let scores = HashMap::from([("https://five".to_string(), 5), ("https://six".to_string(), 6)]);
        let ranked = rank(vec![doc("https://five"), doc("https://six")], &scores, 6);

        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].url, "https://six");
        assert_eq!(ranked[0].rate, 6);
    }

    #[test]
    fn test_rank_is_stable_descending() {
        let scores = HashMap::from([
            ("https://a".to_string(), 7),
            ("https://b".to_string(), 9),
            ("https://c".to_string(), 7),
        ]);
        let ranked = rank(
            vec![doc("https://a"), doc("https://b"), doc("https://c"), doc("https://d")],
            &scores,
            6,
        );

        assert_eq!(
            ranked.iter().map(|d| d.url.as_str()).collect::<Vec<_>>(),
            ["https://b", "https://a", "https://c"]
        );
    }

    #[test]
    fn test_request_is_bounded_to_prefix() {
        let docs = vec![doc("https://a"), doc("https://b"), doc("https://c")];
        let request = scoring_request("Kotlin arrays", &docs, 2);

        assert!(request.user_query.starts_with("Kotlin arrays\n```json\n"));
        assert!(request.user_query.contains("https://b"));
        assert!(!request.user_query.contains("https://c"));
        assert_eq!(request.system_instruction, SCORING_INSTRUCTION);
    }
}
