//! Core orchestration loop.

use std::sync::Arc;

use serde_json::json;

use super::citations::{extract_citations, strip_sources_section};
use super::prompt::{build_search_context_prompt, DEFAULT_CHAT_SYSTEM_PROMPT};
use super::synthesis::{cited_urls, synthesize};
use crate::config::ForcedSearchMode;
use crate::llm::{
    latest_user_query, ChatMessage, ChatResponse, CompletionRequest, LlmClient, LlmError,
    ToolCall, ToolChoice,
};
use crate::search::{SearchBackend, SearchOutcome, SearchResult};
use crate::tools::{ToolDefinition, ToolRegistry, WebSearchArgs, DEFAULT_TOP_K, WEB_SEARCH_TOOL};

/// Model rounds allowed on the proxy endpoint.
pub const PROXY_MAX_ROUNDS: usize = 6;

/// Model rounds allowed in the standalone chat helper.
pub const CHAT_HELPER_MAX_ROUNDS: usize = 4;

pub const DEFAULT_TEMPERATURE: f32 = 0.2;

/// Per-entry-point loop behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopProfile {
    /// Hard cap on loop rounds.
    pub max_rounds: usize,
    /// When the forced retry's call omits `query`, search for the user's
    /// latest message instead of `""`.
    pub infer_query_on_forced_retry: bool,
}

impl LoopProfile {
    pub const PROXY: Self = Self {
        max_rounds: PROXY_MAX_ROUNDS,
        infer_query_on_forced_retry: false,
    };

    pub const CHAT_HELPER: Self = Self {
        max_rounds: CHAT_HELPER_MAX_ROUNDS,
        infer_query_on_forced_retry: true,
    };
}

/// One inbound chat request, as the loop sees it.
#[derive(Debug, Clone)]
pub struct AgentRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    /// Caller-declared tools.
    pub tools: Vec<ToolDefinition>,
    pub tool_choice: Option<ToolChoice>,
    pub temperature: f32,
}

/// How a request terminated.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    /// The model produced an answer without (further) tool calls.
    ModelAnswer(String),
    /// The round cap was reached; answer synthesized from a direct search.
    RoundCapFallback(String),
    /// The caller forced `web_search`.
    ForcedSearch {
        content: String,
        sources: Vec<String>,
        results: Vec<SearchResult>,
    },
    /// The upstream model failed; raw search outcome of the latest user message.
    Degraded(SearchOutcome),
}

impl Completion {
    /// Assistant message content for this completion.
    pub fn content(&self) -> String {
        match self {
            Self::ModelAnswer(text) | Self::RoundCapFallback(text) => text.clone(),
            Self::ForcedSearch { content, .. } => content.clone(),
            Self::Degraded(outcome) => outcome.to_json(),
        }
    }
}

struct LoopContext {
    model: String,
    temperature: f32,
    tools: Vec<ToolDefinition>,
    directive: ToolChoice,
    profile: LoopProfile,
    /// Latest user query; used by the fallbacks.
    user_query: String,
}

/// Drives model rounds, executes `web_search` and decides when to stop.
pub struct Agent {
    llm: Arc<dyn LlmClient>,
    search: Arc<dyn SearchBackend>,
    tools: Arc<ToolRegistry>,
    forced_search_mode: ForcedSearchMode,
}

impl Agent {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        search: Arc<dyn SearchBackend>,
        tools: Arc<ToolRegistry>,
    ) -> Self {
        Self {
            llm,
            search,
            tools,
            forced_search_mode: ForcedSearchMode::default(),
        }
    }

    pub fn with_forced_search_mode(mut self, mode: ForcedSearchMode) -> Self {
        self.forced_search_mode = mode;
        self
    }

    /// Answer a proxied chat request.
    pub async fn run(&self, request: AgentRequest) -> Completion {
        let forced_args = request
            .tool_choice
            .as_ref()
            .and_then(ToolChoice::forced_function)
            .filter(|f| f.name == WEB_SEARCH_TOOL)
            .map(|f| {
                f.arguments
                    .as_deref()
                    .map(WebSearchArgs::parse_or_default)
                    .unwrap_or_default()
            });
        if let Some(args) = forced_args {
            return self.forced_search(request, args).await;
        }

        let ctx = LoopContext {
            tools: self.tools.merged_with(&request.tools),
            directive: request.tool_choice.unwrap_or_else(ToolChoice::auto),
            user_query: latest_user_query(&request.messages),
            model: request.model,
            temperature: request.temperature,
            profile: LoopProfile::PROXY,
        };
        self.run_loop(ctx, request.messages).await
    }

    /// Standalone helper: ask one question with the built-in tools only.
    pub async fn chat_with_websearch(
        &self,
        model: &str,
        user_prompt: &str,
        system_prompt: Option<&str>,
    ) -> Completion {
        let messages = vec![
            ChatMessage::system(system_prompt.unwrap_or(DEFAULT_CHAT_SYSTEM_PROMPT)),
            ChatMessage::user(user_prompt),
        ];
        let ctx = LoopContext {
            model: model.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            tools: self.tools.list_tools(),
            directive: ToolChoice::auto(),
            profile: LoopProfile::CHAT_HELPER,
            user_query: user_prompt.to_string(),
        };
        self.run_loop(ctx, messages).await
    }

    async fn run_loop(&self, ctx: LoopContext, mut messages: Vec<ChatMessage>) -> Completion {
        let mut attempted_force_call = false;

        for round in 1..=ctx.profile.max_rounds {
            tracing::debug!(round, max_rounds = ctx.profile.max_rounds, "Agent round");

            let response = match self.call_model(&ctx, &messages, ctx.directive.clone()).await {
                Ok(r) => r,
                Err(e) => return self.degraded(&ctx.user_query, &e).await,
            };

            if !response.requested_tool_calls().is_empty() {
                self.execute_tool_calls(&mut messages, response, "").await;
                continue;
            }

            if !attempted_force_call && !ctx.directive.is_none() {
                attempted_force_call = true;
                tracing::debug!(round, "No tool call, retrying once with web_search forced");

                let forced = match self
                    .call_model(&ctx, &messages, ToolChoice::function(WEB_SEARCH_TOOL))
                    .await
                {
                    Ok(r) => r,
                    Err(e) => return self.degraded(&ctx.user_query, &e).await,
                };

                if !forced.requested_tool_calls().is_empty() {
                    let query_fallback = if ctx.profile.infer_query_on_forced_retry {
                        ctx.user_query.as_str()
                    } else {
                        ""
                    };
                    self.execute_tool_calls(&mut messages, forced, query_fallback).await;
                    continue;
                }
            }

            return Completion::ModelAnswer(response.content.unwrap_or_default());
        }

        tracing::warn!(
            max_rounds = ctx.profile.max_rounds,
            "Round cap reached without a final answer, falling back to direct search"
        );
        let args = WebSearchArgs {
            query: ctx.user_query.clone(),
            top_k: DEFAULT_TOP_K,
        };
        let outcome = self.run_search(&args).await;
        Completion::RoundCapFallback(synthesize(&ctx.user_query, &outcome))
    }

    async fn call_model(
        &self,
        ctx: &LoopContext,
        messages: &[ChatMessage],
        directive: ToolChoice,
    ) -> Result<ChatResponse, LlmError> {
        let request = CompletionRequest {
            model: ctx.model.clone(),
            messages: messages.to_vec(),
            tools: Some(ctx.tools.clone()),
            tool_choice: Some(directive),
            temperature: ctx.temperature,
        };
        self.llm.chat_completion(&request).await
    }

    /// Record the assistant's tool calls and append one tool message per call.
    async fn execute_tool_calls(
        &self,
        messages: &mut Vec<ChatMessage>,
        response: ChatResponse,
        query_fallback: &str,
    ) {
        let calls: Vec<ToolCall> = response.tool_calls.unwrap_or_default();
        messages.push(ChatMessage::assistant_tool_calls(response.content, calls.clone()));

        for call in &calls {
            if call.function.name == WEB_SEARCH_TOOL {
                let args =
                    WebSearchArgs::parse_or_default(&call.function.arguments).or_query(query_fallback);
                let outcome = self.run_search(&args).await;
                messages.push(ChatMessage::tool_result(&call.id, WEB_SEARCH_TOOL, outcome.to_json()));
            } else {
                tracing::warn!(tool = %call.function.name, "Model called a tool this server does not execute");
                let error = json!({
                    "error": format!("tool '{}' is not executed by this server", call.function.name)
                });
                messages.push(ChatMessage::tool_result(&call.id, &call.function.name, error.to_string()));
            }
        }
    }

    async fn forced_search(&self, request: AgentRequest, args: WebSearchArgs) -> Completion {
        let user_query = latest_user_query(&request.messages);
        let args = args.or_query(&user_query);

        match self.forced_search_mode {
            ForcedSearchMode::Synthesize => {
                let outcome = self.run_search(&args).await;
                tracing::debug!(results = outcome.results.len(), "Answering forced web_search from results");

                Completion::ForcedSearch {
                    content: synthesize(&args.query, &outcome),
                    sources: cited_urls(&outcome),
                    results: outcome.results,
                }
            }
            ForcedSearchMode::Model => {
                let outcome = self.run_search(&args).await;
                let synthesis = CompletionRequest {
                    model: request.model,
                    messages: vec![
                        ChatMessage::system(build_search_context_prompt(&outcome.results)),
                        ChatMessage::user(args.query.clone()),
                    ],
                    tools: None,
                    tool_choice: None,
                    temperature: request.temperature,
                };
                match self.llm.chat_completion(&synthesis).await {
                    Ok(reply) => {
                        let answer = reply.content.unwrap_or_default();
                        Completion::ForcedSearch {
                            sources: extract_citations(&answer),
                            content: strip_sources_section(&answer),
                            results: outcome.results,
                        }
                    }
                    Err(e) => self.degraded(&user_query, &e).await,
                }
            }
        }
    }

    async fn degraded(&self, user_query: &str, error: &LlmError) -> Completion {
        tracing::warn!(error = %error, "Upstream model unavailable, returning direct search results");
        let args = WebSearchArgs {
            query: user_query.to_string(),
            top_k: DEFAULT_TOP_K,
        };
        Completion::Degraded(self.run_search(&args).await)
    }

    async fn run_search(&self, args: &WebSearchArgs) -> SearchOutcome {
        tracing::info!(query = %args.query, top_k = args.top_k, "Running web_search");
        let outcome = self.search.search(&args.query, args.top_k).await;
        tracing::debug!(
            provider = %outcome.provider,
            results = outcome.results.len(),
            error = ?outcome.error,
            "web_search finished"
        );
        outcome
    }
}
