//! LLM synthesis of feature content

use super::GenerationMode;
use crate::feature::{FeatureRecord, LanguageProfile, OutlineEntry, UsageEntry};
use crate::llm::{
    reference_block, strip_code_fence, CompletionProvider, CompletionRequest, OUTLINE_INSTRUCTION,
    USAGE_FROM_OUTLINE_INSTRUCTION, USAGE_INSTRUCTION,
};
use crate::reference::ReferenceSet;
use crate::{Error, Result};
use serde::Deserialize;
use std::sync::Arc;

/// Fields read back from a synthesis response
///
/// Anything else the model returns (`title`, `query`, ...) is ignored; the
/// record keeps its authored values.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SynthesisResponse {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub outline: Option<Vec<OutlineEntry>>,
    #[serde(default)]
    pub usage: Option<Vec<UsageEntry>>,
}

/// Turns a feature and its references into generated content
pub struct ContentSynthesizer {
    completion: Arc<dyn CompletionProvider>,
}

impl ContentSynthesizer {
    pub fn new(completion: Arc<dyn CompletionProvider>) -> Self {
        Self { completion }
    }

    /// Generate content for `feature` and merge it into a copy of the record
    ///
    /// The copy keeps the authored id, title, query and comment. References
    /// become the collected links (title and URL only) when any were
    /// collected. On any failure the input record is left as it was.
    pub async fn synthesize(
        &self,
        mode: GenerationMode,
        language: &LanguageProfile,
        feature: &FeatureRecord,
        references: &ReferenceSet,
    ) -> Result<FeatureRecord> {
        let request = build_request(mode, language, feature, references);

        tracing::info!(
            id = %feature.id,
            %mode,
            references = references.documents.len(),
            "synthesize"
        );

        let raw = self.completion.complete(&request).await?;
        let response = match parse_response(mode, &raw) {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(id = %feature.id, error = %e, raw = %raw, "unparseable synthesis response");
                return Err(e);
            }
        };

        let mut record = feature.clone();
        match mode {
            GenerationMode::Outline => {
                record.outline = response.outline;
            }
            GenerationMode::Usage => {
                record.description = response.description.map(|d| d.trim().to_string());
                record.usage = response.usage;
            }
        }

        if !references.is_empty() {
            record.references = Some(references.links());
        }

        Ok(record)
    }
}

/// Skeleton the usage pass must follow, if the record has one
///
/// An outline wins; otherwise usage titles already present act as one.
fn skeleton(feature: &FeatureRecord) -> Option<Vec<OutlineEntry>> {
    if feature.has_outline() {
        return feature.outline.clone();
    }

    let usage = feature.usage.as_ref().filter(|usage| !usage.is_empty())?;
    Some(usage.iter().map(usage_to_outline).collect())
}

fn usage_to_outline(entry: &UsageEntry) -> OutlineEntry {
    OutlineEntry {
        title: entry.title.clone(),
        description: entry.description.clone(),
        children: entry
            .children
            .as_ref()
            .map(|children| children.iter().map(usage_to_outline).collect()),
    }
}

fn indent(text: &str, prefix: &str) -> String {
    text.lines()
        .map(|line| format!("{}{}", prefix, line))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the completion request for one leaf
pub fn build_request(
    mode: GenerationMode,
    language: &LanguageProfile,
    feature: &FeatureRecord,
    references: &ReferenceSet,
) -> CompletionRequest {
    let skeleton = match mode {
        GenerationMode::Usage => skeleton(feature),
        GenerationMode::Outline => None,
    };

    let instruction = match (mode, &skeleton) {
        (GenerationMode::Outline, _) => OUTLINE_INSTRUCTION,
        (GenerationMode::Usage, Some(_)) => USAGE_FROM_OUTLINE_INSTRUCTION,
        (GenerationMode::Usage, None) => USAGE_INSTRUCTION,
    };

    let mut query = format!(
        "{} {}\n\nid: {}\ntitle: {}",
        language.title,
        feature.subject(),
        feature.id,
        feature.title
    );

    if let Some(outline) = skeleton {
        match serde_yaml::to_string(&outline) {
            Ok(yaml) => {
                query.push_str("\noutline:\n");
                query.push_str(&indent(yaml.trim_end(), "  "));
            }
            Err(e) => tracing::warn!(id = %feature.id, error = %e, "could not render outline"),
        }
    }

    if let Some(comment) = feature.comment.as_deref().map(str::trim) {
        if !comment.is_empty() {
            query.push_str("\n\nps: ");
            query.push_str(comment);
        }
    }

    let documents = references
        .documents
        .iter()
        .map(|doc| reference_block(&doc.title, &doc.url, &doc.content))
        .collect();

    CompletionRequest::new(instruction, query).with_documents(documents)
}

/// Decode and validate a synthesis response
///
/// The response must carry what the mode produces: a description and a
/// usage list, or an outline.
pub fn parse_response(mode: GenerationMode, raw: &str) -> Result<SynthesisResponse> {
    let failure = |reason: String| Error::SynthesisParse {
        reason,
        raw: raw.to_string(),
    };

    let response: SynthesisResponse =
        serde_yaml::from_str(strip_code_fence(raw)).map_err(|e| failure(e.to_string()))?;

    match mode {
        GenerationMode::Outline => {
            if response.outline.as_ref().map_or(true, Vec::is_empty) {
                return Err(failure("response has no outline".to_string()));
            }
        }
        GenerationMode::Usage => {
            if response
                .description
                .as_deref()
                .map_or(true, |d| d.trim().is_empty())
            {
                return Err(failure("response has no description".to_string()));
            }
            if response.usage.as_ref().map_or(true, Vec::is_empty) {
                return Err(failure("response has no usage".to_string()));
            }
        }
    }

    Ok(response)
}
