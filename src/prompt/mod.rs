// src/prompt/mod.rs
// Prompt Builder: a pure function of its inputs, assembling the system
// prompt in a fixed section order so identical inputs always produce
// byte-identical output.

pub mod sections;

use crate::model::loop_config::Language;
use crate::model::tool::ToolSchema;
use sections::*;

pub struct PromptBuilder;

impl PromptBuilder {
    pub fn build_system_prompt(
        base_role_prompt: &str,
        tools: &[ToolSchema],
        language: Language,
        user_rules: Option<&str>,
        project_rules: Option<&str>,
    ) -> String {
        let mut prompt = String::new();

        add_role(&mut prompt, base_role_prompt);
        add_tool_protocol(&mut prompt, tools, language);
        add_followup_protocol(&mut prompt, language);
        add_completion_protocol(&mut prompt, language);
        add_rules(&mut prompt, language);
        add_objective(&mut prompt, language);
        add_user_rules(&mut prompt, user_rules);
        add_project_rules(&mut prompt, project_rules);

        prompt
    }
}
