// src/engine/nudge.rs
// Language-dependent instruction strings injected back into the history
// when the model's reply needs correcting, without treating the condition
// as an error.

use crate::model::loop_config::Language;

pub fn no_structure_nudge(language: Language) -> &'static str {
    match language {
        Language::En => {
            "No tool call or completion was found in your last reply. Use one of the documented tags: a tool call, <ask_followup_question>, or <attempt_completion>."
        }
        Language::Zh => {
            "你的上一条回复中没有找到工具调用或完成标记。请使用文档中规定的标签之一：工具调用、<ask_followup_question> 或 <attempt_completion>。"
        }
    }
}

pub fn too_many_mistakes_nudge(language: Language) -> &'static str {
    match language {
        Language::En => {
            "You have repeatedly failed to use a valid tag. Stop and carefully re-read the tool protocol, then either call a tool, ask a follow-up question, or attempt completion."
        }
        Language::Zh => {
            "你已多次未能使用有效标签。请停下来仔细重读工具协议，然后调用工具、提出澄清问题，或尝试完成任务。"
        }
    }
}

pub fn missing_params_nudge(language: Language, tool_name: &str, missing: &[String]) -> String {
    let joined = missing.join(", ");
    match language {
        Language::En => format!(
            "The call to '{tool_name}' is missing required parameter(s): {joined}. Retry with all required parameters, or ask the user for the missing information."
        ),
        Language::Zh => format!(
            "对 '{tool_name}' 的调用缺少必需参数：{joined}。请使用全部必需参数重试，或向用户询问缺失的信息。"
        ),
    }
}

pub fn no_followup_prompter_answer(language: Language) -> &'static str {
    match language {
        Language::En => "No user interaction is available right now. Proceed using your best judgement.",
        Language::Zh => "当前无法与用户交互。请根据你的最佳判断继续。",
    }
}

pub fn cancelled_final_answer(language: Language) -> &'static str {
    match language {
        Language::En => "The task was cancelled.",
        Language::Zh => "任务已取消。",
    }
}

pub fn forced_completion_instruction(language: Language) -> &'static str {
    match language {
        Language::En => {
            "You have used all available iterations. Provide your best final answer now using <attempt_completion>."
        }
        Language::Zh => {
            "你已用尽所有可用的迭代次数。请现在使用 <attempt_completion> 给出你的最终答案。"
        }
    }
}

pub fn tool_result_message(tool_name: &str, observation: &str, language: Language) -> String {
    let instruction = match language {
        Language::En => "Decide the next action, or call <attempt_completion> if the task is done.",
        Language::Zh => "决定下一步操作，若任务已完成，请调用 <attempt_completion>。",
    };
    format!("[Tool Use Result: {tool_name}]\n\n{observation}\n\n{instruction}")
}

pub fn followup_answer_message(question: &str, answer: &str) -> String {
    format!("[Follow-up question]: {question}\n[User answer]: {answer}")
}
