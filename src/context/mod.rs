// src/context/mod.rs
// Context Window Manager: coarse token estimation and middle-truncation
// of conversation history once a soft budget is exceeded.

use tracing::{debug, info};

use crate::config::RuntimeConfig;
use crate::model::loop_config::Language;
use crate::model::message::ChatMessage;

pub fn estimate_tokens(history: &[ChatMessage], chars_per_token: usize) -> usize {
    let chars_per_token = chars_per_token.max(1);
    let total_chars: usize = history.iter().map(|m| m.char_len()).sum();
    total_chars.div_ceil(chars_per_token)
}

enum Severity {
    Half,
    Quarter,
}

fn truncation_notice(severity: &Severity, language: Language) -> String {
    match (severity, language) {
        (Severity::Half, Language::En) => {
            "[Earlier turns were removed to stay within the context window.]".to_string()
        }
        (Severity::Quarter, Language::En) => {
            "[A large portion of earlier turns was removed to stay within the context window.]"
                .to_string()
        }
        (Severity::Half, Language::Zh) => {
            "[为保持在上下文窗口内，已移除部分早期对话。]".to_string()
        }
        (Severity::Quarter, Language::Zh) => {
            "[为保持在上下文窗口内，已移除大部分早期对话。]".to_string()
        }
    }
}

/// Truncates `history` in place if estimated tokens exceed the soft budget.
/// Returns true if truncation was applied.
pub fn maybe_truncate(
    history: &mut Vec<ChatMessage>,
    max_tokens: usize,
    config: &RuntimeConfig,
    language: Language,
) -> bool {
    let soft_budget = (max_tokens as f64 * config.soft_budget_ratio) as usize;
    let tokens = estimate_tokens(history, config.token_chars_per_token);

    debug!(tokens, soft_budget, "evaluating context truncation");

    if tokens <= soft_budget || history.len() <= 4 {
        return false;
    }

    let severity = if tokens as f64 > soft_budget as f64 * config.quarter_severity_multiplier {
        Severity::Quarter
    } else {
        Severity::Half
    };

    let tail_count = history.len().saturating_sub(2);
    let fraction = match severity {
        Severity::Half => 0.25,
        Severity::Quarter => 0.375,
    };
    let mut remove_count = ((tail_count as f64 * fraction) as usize) & !1; // round down to even
    remove_count = remove_count.min(tail_count.saturating_sub(tail_count % 2));
    if remove_count == 0 {
        return false;
    }

    let start = 2;
    let mut end = start + remove_count;

    // Keep pairing: the removed range must end on an assistant message.
    while end > start && !matches!(history.get(end - 1).map(|m| m.role), Some(crate::model::message::Role::Assistant)) {
        end -= 1;
    }
    if end <= start {
        return false;
    }

    let before = history.len();
    history.drain(start..end);
    history.insert(start, ChatMessage::assistant(truncation_notice(&severity, language)));

    info!(
        before,
        after = history.len(),
        removed = end - start,
        "applied context truncation"
    );

    true
}
