// src/engine/mod.rs
// Agent Loop Engine: the ReAct state machine that glues the response
// parser, prompt builder, context window manager, retry policy, step
// emitter, and session memory together, driving tool dispatch, follow-up
// questions, mistake nudging, and forced completion through a small set
// of injected capabilities rather than any concrete LLM or tool client.

pub mod capabilities;
pub mod nudge;

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use serde_json::json;
use tracing::{error, info, warn};

use crate::cancellation::CancellationToken;
use crate::config::RuntimeConfig;
use crate::context;
use crate::error::EngineError;
use crate::model::loop_config::{Language, LoopConfig, LoopResult};
use crate::model::message::ChatMessage;
use crate::model::step::AgentStep;
use crate::model::tool::ToolSchema;
use crate::parser::{parse_response, ParsedKind};
use crate::prompt::PromptBuilder;
use crate::retry::{RetryOutcome, RetryPolicy};
use crate::session::SessionMemory;

use capabilities::{FollowupPrompter, LlmCallOptions, LlmInvoker, StepSink, ToolInvoker};

pub struct EngineInput {
    pub run_id: String,
    pub session_id: String,
    pub task: String,
    pub image_urls: Vec<String>,
    pub user_rules: Option<String>,
    pub project_rules: Option<String>,
}

impl EngineInput {
    /// Convenience constructor that generates a fresh run id, for callers
    /// that don't need to correlate the run with an id of their own.
    pub fn new(session_id: impl Into<String>, task: impl Into<String>) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            session_id: session_id.into(),
            task: task.into(),
            image_urls: Vec::new(),
            user_rules: None,
            project_rules: None,
        }
    }
}

pub struct AgentLoopEngine {
    llm: Arc<dyn LlmInvoker>,
    tool_invoker: Arc<dyn ToolInvoker>,
    followup: Option<Arc<dyn FollowupPrompter>>,
    sink: Arc<dyn StepSink>,
    session_memory: SessionMemory,
    config: LoopConfig,
    tools: Vec<ToolSchema>,
    runtime_config: RuntimeConfig,
    active_sessions: Mutex<HashSet<String>>,
}

struct SessionGuard<'a> {
    active: &'a Mutex<HashSet<String>>,
    session_id: String,
}

impl<'a> Drop for SessionGuard<'a> {
    fn drop(&mut self) {
        if let Ok(mut guard) = self.active.lock() {
            guard.remove(&self.session_id);
        }
    }
}

fn normalize_completion(text: &str) -> String {
    let trimmed = text.trim();
    let without_fence = trimmed
        .strip_prefix("```")
        .map(|s| s.trim_start_matches(|c: char| c.is_alphabetic()))
        .unwrap_or(trimmed);
    without_fence
        .strip_suffix("```")
        .unwrap_or(without_fence)
        .trim()
        .to_string()
}

impl AgentLoopEngine {
    pub fn new(
        llm: Arc<dyn LlmInvoker>,
        tool_invoker: Arc<dyn ToolInvoker>,
        followup: Option<Arc<dyn FollowupPrompter>>,
        sink: Arc<dyn StepSink>,
        session_memory: SessionMemory,
        config: LoopConfig,
        tools: Vec<ToolSchema>,
        runtime_config: RuntimeConfig,
    ) -> Self {
        Self {
            llm,
            tool_invoker,
            followup,
            sink,
            session_memory,
            config,
            tools,
            runtime_config,
            active_sessions: Mutex::new(HashSet::new()),
        }
    }

    fn language(&self) -> Language {
        self.config.language
    }

    async fn emit(&self, run_id: &str, steps: &mut Vec<AgentStep>, step: AgentStep) {
        steps.push(step.clone());
        self.sink.emit(run_id, step).await;
    }

    fn tool_by_name(&self, name: &str) -> Option<&ToolSchema> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub async fn execute(
        &self,
        input: EngineInput,
        mut cancel: CancellationToken,
    ) -> Result<LoopResult, EngineError> {
        {
            let mut active =
                self.active_sessions
                    .lock()
                    .map_err(|_| EngineError::SessionLockPoisoned {
                        session_id: input.session_id.clone(),
                    })?;
            if !active.insert(input.session_id.clone()) {
                return Err(EngineError::SessionBusy {
                    session_id: input.session_id.clone(),
                });
            }
        }
        let _guard = SessionGuard {
            active: &self.active_sessions,
            session_id: input.session_id.clone(),
        };

        let language = self.language();
        let system_prompt = PromptBuilder::build_system_prompt(
            &self.config.base_role_prompt,
            &self.tools,
            language,
            input.user_rules.as_deref(),
            input.project_rules.as_deref(),
        );

        let mut history = self.session_memory.get(&input.session_id).await;
        let user_message = if input.image_urls.is_empty() {
            ChatMessage::user(input.task.clone())
        } else {
            ChatMessage::user_with_images(input.task.clone(), &input.image_urls)
        };
        history.push(user_message);

        let mut steps: Vec<AgentStep> = Vec::new();
        let mut total_tokens: u64 = 0;
        let mut total_cost_usd: f64 = 0.0;
        let mut mistake_count: usize = 0;
        let mut final_answer: Option<String> = None;
        let retry_policy = RetryPolicy::new(
            self.runtime_config.retry_max_attempts,
            self.runtime_config.retry_base_delay_ms,
        );

        info!(run_id = %input.run_id, session_id = %input.session_id, "starting agent loop");

        let mut iterations_used = 0usize;

        'outer: for iteration in 1..=self.config.max_iterations {
            iterations_used = iteration;

            if cancel.is_cancelled() {
                final_answer = Some(nudge::cancelled_final_answer(language).to_string());
                break;
            }

            self.emit(&input.run_id, &mut steps, AgentStep::thinking(iteration, None))
                .await;

            context::maybe_truncate(&mut history, self.config.max_tokens, &self.runtime_config, language);

            if cancel.is_cancelled() {
                final_answer = Some(nudge::cancelled_final_answer(language).to_string());
                break;
            }

            let options = LlmCallOptions {
                temperature: self.config.temperature,
                max_tokens: self.config.max_tokens,
            };
            let llm = self.llm.clone();
            let system_prompt_ref = system_prompt.clone();
            let history_snapshot = history.clone();

            let outcome = retry_policy
                .run(&mut cancel, || {
                    let llm = llm.clone();
                    let system_prompt_ref = system_prompt_ref.clone();
                    let history_snapshot = history_snapshot.clone();
                    let options = options.clone();
                    async move { llm.invoke(&system_prompt_ref, &history_snapshot, &options).await }
                })
                .await;

            let response = match outcome {
                RetryOutcome::Success(response) => response,
                RetryOutcome::Cancelled => {
                    final_answer = Some(nudge::cancelled_final_answer(language).to_string());
                    break 'outer;
                }
                RetryOutcome::Failed(err) => {
                    error!(run_id = %input.run_id, "llm call failed after retries: {err}");
                    self.emit(
                        &input.run_id,
                        &mut steps,
                        AgentStep::error(iteration, format!("LLM call failed: {err}")),
                    )
                    .await;
                    self.session_memory.put(&input.session_id, history).await;
                    return Err(EngineError::LlmFailed(err));
                }
            };

            total_tokens += response.tokens;
            total_cost_usd += response.cost_usd;
            history.push(ChatMessage::assistant(response.text.clone()));

            let parsed = parse_response(&response.text, &self.tools);

            match parsed.kind {
                ParsedKind::Completion(text) => {
                    let normalized = normalize_completion(&text);
                    self.emit(
                        &input.run_id,
                        &mut steps,
                        AgentStep::done(iteration, normalized.clone()),
                    )
                    .await;
                    final_answer = Some(normalized);
                    break 'outer;
                }
                ParsedKind::Followup { question, options } => {
                    self.emit(
                        &input.run_id,
                        &mut steps,
                        AgentStep::acting(
                            iteration,
                            "ask_followup_question",
                            json!({"question": question, "options": options}),
                        ),
                    )
                    .await;

                    let answer = match &self.followup {
                        Some(prompter) => {
                            match prompter.ask(&input.run_id, &question, options.as_deref()).await {
                                Ok(answer) => answer,
                                Err(err) => {
                                    warn!(run_id = %input.run_id, "follow-up prompter failed: {err}");
                                    nudge::no_followup_prompter_answer(language).to_string()
                                }
                            }
                        }
                        None => nudge::no_followup_prompter_answer(language).to_string(),
                    };

                    history.push(ChatMessage::user(nudge::followup_answer_message(
                        &question, &answer,
                    )));
                    self.emit(
                        &input.run_id,
                        &mut steps,
                        AgentStep::observing(iteration, "ask_followup_question", answer.clone()),
                    )
                    .await;
                    mistake_count = 0;
                }
                ParsedKind::ToolCall { name, params } => {
                    let Some(tool) = self.tool_by_name(&name).cloned() else {
                        history.push(ChatMessage::user(format!(
                            "Tool '{name}' is not in the available tool set."
                        )));
                        mistake_count += 1;
                        continue 'outer;
                    };

                    let missing = tool.missing_required(&params);
                    if !missing.is_empty() {
                        let text = nudge::missing_params_nudge(language, &name, &missing);
                        history.push(ChatMessage::user(text.clone()));
                        self.emit(
                            &input.run_id,
                            &mut steps,
                            AgentStep::thinking(iteration, Some(text)),
                        )
                        .await;
                        mistake_count += 1;
                        continue 'outer;
                    }

                    self.emit(
                        &input.run_id,
                        &mut steps,
                        AgentStep::acting(iteration, name.clone(), json!(params)),
                    )
                    .await;

                    let param_map: HashMap<String, String> = params;
                    let observation = match self.tool_invoker.invoke(&name, &param_map).await {
                        Ok(observation) => observation,
                        Err(err) => format!("Tool '{name}' failed: {err}"),
                    };

                    history.push(ChatMessage::user(nudge::tool_result_message(
                        &name,
                        &observation,
                        language,
                    )));
                    self.emit(
                        &input.run_id,
                        &mut steps,
                        AgentStep::observing(iteration, name, observation.clone()),
                    )
                    .await;
                    mistake_count = 0;
                }
                ParsedKind::NoStructure => {
                    mistake_count += 1;
                    let text = if mistake_count >= self.runtime_config.mistake_threshold {
                        nudge::too_many_mistakes_nudge(language).to_string()
                    } else {
                        nudge::no_structure_nudge(language).to_string()
                    };
                    history.push(ChatMessage::user(text.clone()));
                    self.emit(
                        &input.run_id,
                        &mut steps,
                        AgentStep::thinking(iteration, Some(text)),
                    )
                    .await;
                }
            }
        }

        if final_answer.is_none() {
            final_answer = Some(
                self.force_completion(&input, &mut history, &mut steps, iterations_used)
                    .await,
            );
        }

        self.session_memory.put(&input.session_id, history.clone()).await;

        info!(run_id = %input.run_id, iterations_used, "agent loop finished");

        Ok(LoopResult {
            final_answer: final_answer.unwrap_or_default(),
            steps,
            total_tokens,
            total_cost_usd,
            iterations_used,
            history,
        })
    }

    async fn force_completion(
        &self,
        input: &EngineInput,
        history: &mut Vec<ChatMessage>,
        steps: &mut Vec<AgentStep>,
        index: usize,
    ) -> String {
        let language = self.language();
        warn!(run_id = %input.run_id, "max iterations reached, forcing completion");

        history.push(ChatMessage::user(
            nudge::forced_completion_instruction(language),
        ));

        let policy = RetryPolicy::new(
            self.runtime_config.forced_completion_max_attempts,
            self.runtime_config.forced_completion_base_delay_ms,
        );
        let options = LlmCallOptions {
            temperature: (self.config.temperature * 0.5).max(0.0),
            max_tokens: self.config.max_tokens,
        };

        let llm = self.llm.clone();
        let system_prompt = PromptBuilder::build_system_prompt(
            &self.config.base_role_prompt,
            &self.tools,
            language,
            None,
            None,
        );
        let history_snapshot = history.clone();
        let (_handle, mut cancel) = crate::cancellation::cancellation_pair();

        let outcome = policy
            .run(&mut cancel, || {
                let llm = llm.clone();
                let system_prompt = system_prompt.clone();
                let history_snapshot = history_snapshot.clone();
                let options = options.clone();
                async move { llm.invoke(&system_prompt, &history_snapshot, &options).await }
            })
            .await;

        match outcome {
            RetryOutcome::Success(response) => {
                history.push(ChatMessage::assistant(response.text.clone()));
                let parsed = parse_response(&response.text, &self.tools);
                let answer = match parsed.kind {
                    ParsedKind::Completion(text) => normalize_completion(&text),
                    _ => normalize_completion(&response.text),
                };
                self.emit(&input.run_id, steps, AgentStep::done(index, answer.clone()))
                    .await;
                answer
            }
            _ => {
                let fallback: String = steps
                    .iter()
                    .filter_map(|s| s.observation.clone())
                    .collect::<Vec<_>>()
                    .join("\n");
                self.emit(&input.run_id, steps, AgentStep::done(index, fallback.clone()))
                    .await;
                fallback
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancellation::cancellation_pair;
    use crate::config::RuntimeConfig;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Mutex as TokioMutex;

    fn test_config() -> RuntimeConfig {
        RuntimeConfig {
            retry_max_attempts: 2,
            retry_base_delay_ms: 1,
            forced_completion_max_attempts: 1,
            forced_completion_base_delay_ms: 1,
            soft_budget_ratio: 0.8,
            quarter_severity_multiplier: 2.0,
            token_chars_per_token: 4,
            mistake_threshold: 3,
            default_language: Language::En,
        }
    }

    struct ScriptedLlm {
        replies: TokioMutex<Vec<String>>,
    }

    #[async_trait]
    impl LlmInvoker for ScriptedLlm {
        async fn invoke(
            &self,
            _system_prompt: &str,
            _history: &[ChatMessage],
            _options: &LlmCallOptions,
        ) -> anyhow::Result<capabilities::LlmResponse> {
            let mut replies = self.replies.lock().await;
            if replies.is_empty() {
                anyhow::bail!("no more scripted replies");
            }
            let text = replies.remove(0);
            Ok(capabilities::LlmResponse {
                text,
                tokens: 10,
                cost_usd: 0.001,
            })
        }
    }

    struct EchoTool;

    #[async_trait]
    impl ToolInvoker for EchoTool {
        async fn invoke(
            &self,
            _tool_name: &str,
            input: &HashMap<String, String>,
        ) -> anyhow::Result<String> {
            Ok(input.get("text").cloned().unwrap_or_default())
        }
    }

    struct NullSink {
        count: AtomicUsize,
    }

    #[async_trait]
    impl StepSink for NullSink {
        async fn emit(&self, _run_id: &str, _step: AgentStep) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn engine(llm_replies: Vec<&str>, tools: Vec<ToolSchema>) -> AgentLoopEngine {
        let llm = Arc::new(ScriptedLlm {
            replies: TokioMutex::new(llm_replies.into_iter().map(String::from).collect()),
        });
        let mut config = LoopConfig::new("You are a test agent.");
        config.max_iterations = 3;
        config.tool_names = tools.iter().map(|t| t.name.clone()).collect();

        AgentLoopEngine::new(
            llm,
            Arc::new(EchoTool),
            None,
            Arc::new(NullSink { count: AtomicUsize::new(0) }),
            SessionMemory::new(),
            config,
            tools,
            test_config(),
        )
    }

    #[tokio::test]
    async fn plain_completion_finishes_in_one_iteration() {
        let engine = engine(
            vec!["<attempt_completion><result>hello</result></attempt_completion>"],
            vec![],
        );
        let (_h, cancel) = cancellation_pair();
        let result = engine
            .execute(
                EngineInput {
                    run_id: "r1".into(),
                    session_id: "s1".into(),
                    task: "Say hello".into(),
                    image_urls: vec![],
                    user_rules: None,
                    project_rules: None,
                },
                cancel,
            )
            .await
            .unwrap();

        assert_eq!(result.final_answer, "hello");
        assert_eq!(result.iterations_used, 1);
        assert_eq!(result.steps.len(), 2);
    }

    #[tokio::test]
    async fn tool_call_then_completion() {
        let tool = ToolSchema::new("echo", "echoes text").with_param("text", "string", "text", true);
        let engine = engine(
            vec![
                "<echo><text>x</text></echo>",
                "<attempt_completion><result>x</result></attempt_completion>",
            ],
            vec![tool],
        );
        let (_h, cancel) = cancellation_pair();
        let result = engine
            .execute(
                EngineInput {
                    run_id: "r2".into(),
                    session_id: "s2".into(),
                    task: "echo 'x'".into(),
                    image_urls: vec![],
                    user_rules: None,
                    project_rules: None,
                },
                cancel,
            )
            .await
            .unwrap();

        assert_eq!(result.final_answer, "x");
        let tool_result_message = result
            .history
            .iter()
            .find_map(|m| m.content.as_text().filter(|t| t.starts_with("[Tool Use Result: echo]")));
        assert!(tool_result_message.is_some());
    }

    #[tokio::test]
    async fn missing_required_parameter_blocks_tool_invocation() {
        let tool = ToolSchema::new("write", "writes a file")
            .with_param("path", "string", "path", true)
            .with_param("content", "string", "content", true);
        let engine = engine(
            vec![
                "<write><content>hi</content></write>",
                "<attempt_completion><result>done</result></attempt_completion>",
            ],
            vec![tool],
        );
        let (_h, cancel) = cancellation_pair();
        let result = engine
            .execute(
                EngineInput {
                    run_id: "r3".into(),
                    session_id: "s3".into(),
                    task: "write a file".into(),
                    image_urls: vec![],
                    user_rules: None,
                    project_rules: None,
                },
                cancel,
            )
            .await
            .unwrap();

        let mentions_path = result
            .history
            .iter()
            .any(|m| m.content.as_text().map(|t| t.contains("path")).unwrap_or(false));
        assert!(mentions_path);
        assert_eq!(result.final_answer, "done");
    }

    #[tokio::test]
    async fn format_violation_then_recovery_resets_mistake_counter() {
        let engine = engine(
            vec![
                "let me try",
                "<attempt_completion><result>ok</result></attempt_completion>",
            ],
            vec![],
        );
        let (_h, cancel) = cancellation_pair();
        let result = engine
            .execute(
                EngineInput {
                    run_id: "r4".into(),
                    session_id: "s4".into(),
                    task: "do something".into(),
                    image_urls: vec![],
                    user_rules: None,
                    project_rules: None,
                },
                cancel,
            )
            .await
            .unwrap();

        assert_eq!(result.iterations_used, 2);
        assert_eq!(result.final_answer, "ok");
    }

    #[tokio::test]
    async fn concurrent_runs_against_same_session_are_rejected() {
        let engine = Arc::new(engine(
            vec!["<attempt_completion><result>a</result></attempt_completion>"],
            vec![],
        ));
        let active = engine.active_sessions.lock().unwrap();
        drop(active);
        engine
            .active_sessions
            .lock()
            .unwrap()
            .insert("busy-session".to_string());

        let (_h, cancel) = cancellation_pair();
        let err = engine
            .execute(
                EngineInput {
                    run_id: "r5".into(),
                    session_id: "busy-session".into(),
                    task: "anything".into(),
                    image_urls: vec![],
                    user_rules: None,
                    project_rules: None,
                },
                cancel,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::SessionBusy { .. }));
    }
}
