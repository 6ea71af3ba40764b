// src/parser/mod.rs
// Response Parser: classifies raw model text into completion, follow-up
// question, tool call, or "no structure". Extraction is deliberately
// greedy on tag boundaries (first opening tag, last closing tag) rather
// than non-greedy, so that nested same-name tags inside tool arguments
// (code blocks containing angle brackets, for example) don't truncate
// the match early.

use std::collections::HashMap;

use regex::Regex;

use crate::model::tool::ToolSchema;

#[derive(Debug, Clone, PartialEq)]
pub enum ParsedKind {
    Completion(String),
    Followup {
        question: String,
        options: Option<Vec<String>>,
    },
    ToolCall {
        name: String,
        params: HashMap<String, String>,
    },
    NoStructure,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResponse {
    pub reasoning: Option<String>,
    pub kind: ParsedKind,
}

/// Greedily extracts the content between the first `<tag ...>` and the
/// last `</tag>` in `text`, case-insensitive on the tag name.
pub fn greedy_extract(text: &str, tag: &str) -> Option<String> {
    let open_re = Regex::new(&format!(r"(?is)<{tag}\b[^>]*>")).ok()?;
    let close_re = Regex::new(&format!(r"(?is)</{tag}\s*>")).ok()?;

    let open_match = open_re.find(text)?;
    let close_match = close_re.find_iter(text).last()?;

    if close_match.start() < open_match.end() {
        return None;
    }

    Some(text[open_match.end()..close_match.start()].trim().to_string())
}

fn extract_reasoning(text: &str) -> Option<String> {
    for tag in ["thinking", "thought", "think"] {
        if let Some(content) = greedy_extract(text, tag) {
            if !content.is_empty() {
                return Some(content);
            }
        }
    }
    None
}

fn extract_options(block: &str) -> Option<Vec<String>> {
    let options_block = greedy_extract(block, "options")?;
    let option_re = Regex::new(r"(?is)<option\b[^>]*>(.*?)</option\s*>").ok()?;
    let options: Vec<String> = option_re
        .captures_iter(&options_block)
        .map(|c| c[1].trim().to_string())
        .collect();
    if options.is_empty() {
        None
    } else {
        Some(options)
    }
}

fn extract_tool_params(block: &str, tool: &ToolSchema) -> HashMap<String, String> {
    let mut params = HashMap::new();
    for param in &tool.params {
        if let Some(value) = greedy_extract(block, &param.name) {
            params.insert(param.name.clone(), value);
        }
    }
    params
}

/// Classifies model text against the wire grammar in priority order:
/// attempt_completion > ask_followup_question > tool call > no_structure.
pub fn parse_response(text: &str, tools: &[ToolSchema]) -> ParsedResponse {
    let reasoning = extract_reasoning(text);

    if let Some(block) = greedy_extract(text, "attempt_completion") {
        let result = greedy_extract(&block, "result").unwrap_or(block);
        return ParsedResponse {
            reasoning,
            kind: ParsedKind::Completion(result),
        };
    }
    if let Some(result) = greedy_extract(text, "final_answer") {
        return ParsedResponse {
            reasoning,
            kind: ParsedKind::Completion(result),
        };
    }

    if let Some(block) = greedy_extract(text, "ask_followup_question") {
        let question = greedy_extract(&block, "question").unwrap_or_default();
        let options = extract_options(&block);
        return ParsedResponse {
            reasoning,
            kind: ParsedKind::Followup { question, options },
        };
    }

    for tool in tools {
        if let Some(block) = greedy_extract(text, &tool.name) {
            let params = extract_tool_params(&block, tool);
            return ParsedResponse {
                reasoning,
                kind: ParsedKind::ToolCall {
                    name: tool.name.clone(),
                    params,
                },
            };
        }
    }

    if let Some(block) = greedy_extract(text, "tool_use") {
        if let Some(name) = greedy_extract(&block, "tool_name") {
            if let Some(tool) = tools.iter().find(|t| t.name == name) {
                let params = extract_tool_params(&block, tool);
                return ParsedResponse {
                    reasoning,
                    kind: ParsedKind::ToolCall {
                        name: tool.name.clone(),
                        params,
                    },
                };
            }
        }
    }

    ParsedResponse {
        reasoning,
        kind: ParsedKind::NoStructure,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo_tool() -> ToolSchema {
        ToolSchema::new("echo", "echoes text").with_param("text", "string", "text to echo", true)
    }

    #[test]
    fn greedy_extraction_takes_outer_pair_on_nesting() {
        let text = "<result><result>nested</result></result>";
        assert_eq!(
            greedy_extract(text, "result"),
            Some("<result>nested</result>".to_string())
        );
    }

    #[test]
    fn empty_result_is_a_valid_completion() {
        let text = "<attempt_completion><result></result></attempt_completion>";
        let parsed = parse_response(text, &[]);
        assert_eq!(parsed.kind, ParsedKind::Completion(String::new()));
    }

    #[test]
    fn legacy_final_answer_is_accepted() {
        let text = "<final_answer>done</final_answer>";
        let parsed = parse_response(text, &[]);
        assert_eq!(parsed.kind, ParsedKind::Completion("done".to_string()));
    }

    #[test]
    fn direct_tool_call_round_trips_tool_schema() {
        let tools = vec![echo_tool()];
        let text = "<echo><text>hello world</text></echo>";
        let parsed = parse_response(text, &tools);
        match parsed.kind {
            ParsedKind::ToolCall { name, params } => {
                assert_eq!(name, "echo");
                assert_eq!(params.get("text"), Some(&"hello world".to_string()));
            }
            other => panic!("expected tool call, got {other:?}"),
        }
    }

    #[test]
    fn legacy_tool_use_form_is_accepted() {
        let tools = vec![echo_tool()];
        let text = "<tool_use><tool_name>echo</tool_name><text>hi</text></tool_use>";
        let parsed = parse_response(text, &tools);
        match parsed.kind {
            ParsedKind::ToolCall { name, .. } => assert_eq!(name, "echo"),
            other => panic!("expected tool call, got {other:?}"),
        }
    }

    #[test]
    fn followup_extracts_question_and_ordered_options() {
        let text = "<ask_followup_question><question>Which file?</question><options><option>a.rs</option><option>b.rs</option></options></ask_followup_question>";
        let parsed = parse_response(text, &[]);
        match parsed.kind {
            ParsedKind::Followup { question, options } => {
                assert_eq!(question, "Which file?");
                assert_eq!(options, Some(vec!["a.rs".to_string(), "b.rs".to_string()]));
            }
            other => panic!("expected followup, got {other:?}"),
        }
    }

    #[test]
    fn plain_text_has_no_structure() {
        let parsed = parse_response("let me try that", &[]);
        assert_eq!(parsed.kind, ParsedKind::NoStructure);
    }

    #[test]
    fn reasoning_is_attached_alongside_other_classifications() {
        let text = "<thinking>mulling it over</thinking><attempt_completion><result>ok</result></attempt_completion>";
        let parsed = parse_response(text, &[]);
        assert_eq!(parsed.reasoning.as_deref(), Some("mulling it over"));
    }

    #[test]
    fn reasoning_tag_synonyms_are_tried_in_priority_order() {
        let text = "<think>short form</think>";
        let parsed = parse_response(text, &[]);
        assert_eq!(parsed.reasoning.as_deref(), Some("short form"));
    }
}
