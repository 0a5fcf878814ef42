//! System instructions for LLM interactions

/// Instruction for rating candidate references
pub const SCORING_INSTRUCTION: &str = r#"You are an expert in many programming languages. Given a language feature and a list of documents, rate how useful each document is as a tutorial or reference for that feature.

Scores are integers from 0 to 10; higher means more useful.

Input:
  Kotlin Flow

  ```json
  [
    {"title": "Xxx", "url": "https://xxx", "content": "..."},
    {"title": "Yyy", "url": "https://yyy", "content": "..."}
  ]
  ```

Output: a JSON object whose keys are document URLs and whose values are the scores. Return only the JSON.
  ```json
  {
    "https://xxx": 6,
    "https://yyy": 9
  }
  ```
"#;

/// Instruction for generating a feature outline (titles only)
pub const OUTLINE_INSTRUCTION: &str = r#"You are an educator fluent in many programming languages and you write excellent cheatsheets. Produce a cheatsheet outline for the language feature the user names.

Rules:
- Complete: cover the core syntax, APIs and common problem solving, usually progressing install -> create -> use -> configure -> troubleshoot -> best practices.
- Practical: no concept or theory sections, prefer worked usage.
- Moderate depth: merge closely related topics, do not split without reason.
- Clear: a structure that lets a reader find a topic immediately.

Steps:
1. Collect the syntax, APIs, common problems and best practices of the feature.
2. Order them from easy to hard and group them following the rules.
3. Turn the groups into an outline.
4. Check completeness and add what is missing.
5. Drop dry definitions and add usage instead.
6. Merge topics that are too close or too small (e.g. `for-in` and `forEach` become "Iterating arrays").
7. Reorganize anything that is not clearly categorized.

Output YAML:
```yaml
title: "Title"
query: "search keywords"
comment: "one or two sentences of guidance for writing the cheatsheet"
outline:
  - title: "Outline title"
    description: "key syntax or API list, optional"
    children:
      - title: "Outline title"
        description: "optional"
```
"#;

/// Instruction for generating description, outline and usage in one pass
pub const USAGE_INSTRUCTION: &str = r#"You are a programming expert fluent in many languages and you write excellent introductory material. Using the documents and the language feature the user provides, write a step-by-step cheatsheet.

Workflow:
1. Summarize what the feature is, when it is used and how; this is the feature description.
2. Outline the feature:
   - practical first, avoid dry definitions, usually from creation to use to configuration;
   - cover most of the related syntax, APIs and common problems;
   - group clearly so a reader finds the right section at once.
3. Write the cheatsheet following the outline:
   - each usage gets a short title that states what it does;
   - each usage gets a description; when several related syntaxes, properties or methods are easy to confuse, list them one by one;
   - each usage gets a self-contained example that is factual, includes its context and comments both the effect and the key syntax.

Output YAML:
```yaml
title: "Feature"
description: "What the feature is, when to use it, how it is implemented."
usage:
  - title: "Usage title"
    description: "Usage description in Markdown"
    example: "Code example in Markdown"
  - title: "Grouping usage"
    description: "..."
    children:
      - title: "Nested usage"
        description: "..."
        example: "..."
```
"#;

/// Instruction for filling in an existing outline
pub const USAGE_FROM_OUTLINE_INSTRUCTION: &str = r#"You are a programming expert fluent in many languages and you write excellent introductory material. Using the documents, the language feature and the outline the user provides, write a step-by-step cheatsheet.

Workflow:
1. Summarize what the feature is, when it is used and how; this is the feature description.
2. Write the cheatsheet for exactly the outline provided. Keep its sections and their order; do not invent new top-level sections.
   - each usage keeps the outline title;
   - each usage gets a description; when several related syntaxes, properties or methods are easy to confuse, list them one by one;
   - each leaf usage gets a self-contained example that is factual, includes its context and comments both the effect and the key syntax;
   - outline entries with children become usages with the same children.

Output YAML:
```yaml
title: "Feature"
description: "What the feature is, when to use it, how it is implemented."
usage:
  - title: "Usage 1"
    description: "Usage description in Markdown"
    children:
      - title: "Usage 1a"
        description: "..."
        example: "..."
  - title: "Usage 2"
    description: "..."
    example: "..."
```
"#;

/// Render a reference as a titled context block
pub fn reference_block(title: &str, url: &str, content: &str) -> String {
    format!("# [{}]({})\n\n{}", title, url, content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_block() {
        let block = reference_block("Arrays", "https://kotlinlang.org/docs/arrays.html", "body");
        assert_eq!(block, "# [Arrays](https://kotlinlang.org/docs/arrays.html)\n\nbody");
    }

    #[test]
    fn test_instructions_request_yaml_or_json() {
        assert!(SCORING_INSTRUCTION.contains("JSON"));
        for instruction in [OUTLINE_INSTRUCTION, USAGE_INSTRUCTION, USAGE_FROM_OUTLINE_INSTRUCTION] {
            assert!(instruction.contains("```yaml"));
        }
    }
}
