// src/prompt/sections.rs
// Small section-builder functions composed by PromptBuilder::build_system_prompt,
// each one responsible for a single fixed block of the assembled prompt.

use crate::model::loop_config::Language;
use crate::model::tool::ToolSchema;

pub fn add_role(prompt: &mut String, base_role_prompt: &str) {
    prompt.push_str(base_role_prompt.trim());
    prompt.push_str("\n\n");
}

pub fn add_tool_protocol(prompt: &mut String, tools: &[ToolSchema], language: Language) {
    if tools.is_empty() {
        return;
    }

    match language {
        Language::En => prompt.push_str("## Tool Use\n\nYou have access to the following tools. Call at most one tool per message, using this exact direct-tag format:\n\n"),
        Language::Zh => prompt.push_str("## 工具使用\n\n你可以使用以下工具。每条消息最多调用一个工具，使用以下直接标签格式：\n\n"),
    }

    for tool in tools {
        prompt.push_str(&format!("### {}\n{}\n\n", tool.name, tool.description));
        prompt.push_str(&format!("<{}>\n", tool.name));
        for param in &tool.params {
            let required = if param.required { "required" } else { "optional" };
            prompt.push_str(&format!(
                "<{}>{} ({}, {})</{}>\n",
                param.name, param.description, param.param_type, required, param.name
            ));
        }
        prompt.push_str(&format!("</{}>\n\n", tool.name));
    }
}

pub fn add_followup_protocol(prompt: &mut String, language: Language) {
    match language {
        Language::En => prompt.push_str(
            "## Asking Follow-up Questions\n\nIf you need information only the user can provide, use:\n\n<ask_followup_question>\n<question>your question</question>\n<options><option>choice one</option><option>choice two</option></options>\n</ask_followup_question>\n\n",
        ),
        Language::Zh => prompt.push_str(
            "## 提出澄清问题\n\n如果你需要只有用户才能提供的信息，请使用：\n\n<ask_followup_question>\n<question>你的问题</question>\n<options><option>选项一</option><option>选项二</option></options>\n</ask_followup_question>\n\n",
        ),
    }
}

pub fn add_completion_protocol(prompt: &mut String, language: Language) {
    match language {
        Language::En => prompt.push_str(
            "## Completing the Task\n\nWhen the task is fully done, respond with:\n\n<attempt_completion>\n<result>your final answer</result>\n</attempt_completion>\n\n",
        ),
        Language::Zh => prompt.push_str(
            "## 完成任务\n\n任务完全完成后，请回复：\n\n<attempt_completion>\n<result>你的最终答案</result>\n</attempt_completion>\n\n",
        ),
    }
}

pub fn add_rules(prompt: &mut String, language: Language) {
    match language {
        Language::En => prompt.push_str(
            "## Rules\n\n- Use at most one tool call per message.\n- Wait for the tool's result before calling another tool.\n- Never fabricate a tool result.\n- Use <attempt_completion> only once the task is actually finished.\n\n",
        ),
        Language::Zh => prompt.push_str(
            "## 规则\n\n- 每条消息最多调用一个工具。\n- 在调用下一个工具前，先等待当前工具的结果。\n- 不要编造工具结果。\n- 只有在任务真正完成后才使用 <attempt_completion>。\n\n",
        ),
    }
}

pub fn add_objective(prompt: &mut String, language: Language) {
    match language {
        Language::En => prompt.push_str(
            "## Objective\n\nWork step by step. Think before acting. Use tools to gather the information you need, then call <attempt_completion> with the final answer.\n\n",
        ),
        Language::Zh => prompt.push_str(
            "## 目标\n\n逐步推进。行动之前先思考。使用工具获取所需信息，然后使用 <attempt_completion> 给出最终答案。\n\n",
        ),
    }
}

pub fn add_user_rules(prompt: &mut String, user_rules: Option<&str>) {
    if let Some(rules) = user_rules {
        if !rules.trim().is_empty() {
            prompt.push_str("## User Rules\n\n");
            prompt.push_str(rules.trim());
            prompt.push_str("\n\n");
        }
    }
}

pub fn add_project_rules(prompt: &mut String, project_rules: Option<&str>) {
    if let Some(rules) = project_rules {
        if !rules.trim().is_empty() {
            prompt.push_str("## Project Rules\n\n");
            prompt.push_str(rules.trim());
            prompt.push_str("\n\n");
        }
    }
}
