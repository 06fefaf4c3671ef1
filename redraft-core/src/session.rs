//! # Model Sessions
//!
//! Routing and accounting for model calls within one run:
//! - `ProviderRegistry` holds one caller per provider family, built from
//!   whatever API keys the environment carries
//! - `ModelSession` resolves each model name to its family, strips an
//!   explicit `family:` routing prefix before the wire call, and tracks
//!   token usage across the run
//!
//! Model names route by substring: "claude"/"anthropic" to Anthropic,
//! "gemini"/"google" to Gemini, "gpt"/"openai" to OpenAI. Names that match
//! nothing go to the default family.

use crate::error::{self, Error, Result};
use crate::provider::{
    AnthropicCaller, CompletionRequest, GeminiCaller, ImagePayload, ModelCaller, OpenAiCaller,
    ProviderConfig, ProviderFamily, UsageTracker,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// One caller per provider family
pub struct ProviderRegistry {
    callers: HashMap<ProviderFamily, Arc<dyn ModelCaller>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            callers: HashMap::new(),
        }
    }

    /// Build a registry from API keys in the environment.
    ///
    /// Reads OPENAI_API_KEY, ANTHROPIC_API_KEY, and GEMINI_API_KEY (or
    /// GOOGLE_API_KEY). Families without a key are simply absent.
    pub fn from_env() -> Self {
        let mut registry = Self::new();

        if let Some(key) = env_key("OPENAI_API_KEY") {
            registry.register(Arc::new(OpenAiCaller::new(ProviderConfig::openai(key))));
        }
        if let Some(key) = env_key("ANTHROPIC_API_KEY") {
            registry.register(Arc::new(AnthropicCaller::new(ProviderConfig::anthropic(key))));
        }
        if let Some(key) = env_key("GEMINI_API_KEY").or_else(|| env_key("GOOGLE_API_KEY")) {
            registry.register(Arc::new(GeminiCaller::new(ProviderConfig::gemini(key))));
        }

        registry
    }

    /// Register a caller under its own family, replacing any existing one
    pub fn register(&mut self, caller: Arc<dyn ModelCaller>) {
        self.callers.insert(caller.family(), caller);
    }

    /// Resolve a model name to the caller for its family
    pub fn resolve(&self, model: &str) -> Result<Arc<dyn ModelCaller>> {
        let family = route(model);
        self.callers.get(&family).cloned().ok_or_else(|| {
            error::config_invalid(format!(
                "no credentials for provider '{}' (set {})",
                family,
                env_hint(family)
            ))
            .with_operation("session::resolve")
            .with_context("model", model)
        })
    }

    /// Registered callers, ordered by family name
    pub fn callers(&self) -> Vec<&Arc<dyn ModelCaller>> {
        let mut callers: Vec<_> = self.callers.values().collect();
        callers.sort_by_key(|c| c.family().as_str());
        callers
    }

    pub fn is_empty(&self) -> bool {
        self.callers.is_empty()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Read an env var, treating empty values as unset
fn env_key(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|k| !k.is_empty())
}

fn env_hint(family: ProviderFamily) -> &'static str {
    match family {
        ProviderFamily::OpenAi => "OPENAI_API_KEY",
        ProviderFamily::Anthropic => "ANTHROPIC_API_KEY",
        ProviderFamily::Gemini => "GEMINI_API_KEY",
    }
}

/// Pick the family for a model name.
///
/// An explicit `family:` prefix wins over substring matching, so
/// "openai:local-llama" routes to OpenAI even though the bare name would
/// not.
fn route(model: &str) -> ProviderFamily {
    if let Some((prefix, _)) = model.split_once(':') {
        match prefix.to_ascii_lowercase().as_str() {
            "openai" => return ProviderFamily::OpenAi,
            "anthropic" | "claude" => return ProviderFamily::Anthropic,
            "gemini" | "google" => return ProviderFamily::Gemini,
            _ => {}
        }
    }
    ProviderFamily::from_model(model)
}

/// Strip a recognized `family:` prefix before the name goes on the wire
fn wire_model(model: &str) -> &str {
    match model.split_once(':') {
        Some((prefix, rest))
            if !rest.is_empty()
                && matches!(
                    prefix.to_ascii_lowercase().as_str(),
                    "openai" | "anthropic" | "claude" | "gemini" | "google"
                ) =>
        {
            rest
        }
        _ => model,
    }
}

/// Routes completions for one run and accounts their token usage
pub struct ModelSession {
    registry: ProviderRegistry,
    usage: Mutex<UsageTracker>,
}

impl ModelSession {
    pub fn new(registry: ProviderRegistry) -> Self {
        Self {
            registry,
            usage: Mutex::new(UsageTracker::new()),
        }
    }

    /// Session over whatever API keys the environment carries
    pub fn from_env() -> Self {
        Self::new(ProviderRegistry::from_env())
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    /// Send a text prompt and return the response text
    pub async fn complete_text(
        &self,
        model: &str,
        prompt: &str,
        temperature: Option<f32>,
    ) -> Result<String> {
        self.dispatch(model, prompt, temperature, None).await
    }

    /// Send a text prompt with an attached image and return the response text
    pub async fn complete_with_image(
        &self,
        model: &str,
        prompt: &str,
        image: ImagePayload,
        temperature: Option<f32>,
    ) -> Result<String> {
        self.dispatch(model, prompt, temperature, Some(image)).await
    }

    async fn dispatch(
        &self,
        model: &str,
        prompt: &str,
        temperature: Option<f32>,
        image: Option<ImagePayload>,
    ) -> Result<String> {
        let caller = self.registry.resolve(model)?;

        if image.is_some() && !caller.supports_images() {
            return Err(Error::unsupported(format!(
                "provider '{}' does not accept image input",
                caller.name()
            ))
            .with_operation("session::complete")
            .with_context("model", model));
        }

        let mut request = CompletionRequest::from_prompt(prompt).with_model(wire_model(model));
        if let Some(temp) = temperature {
            request = request.with_temperature(temp);
        }
        if let Some(image) = image {
            request = request.with_image(image);
        }

        let response = caller.complete(request).await.map_err(|e| {
            Error::from(e)
                .with_operation("session::complete")
                .with_context("model", model)
        })?;

        self.usage.lock().unwrap().track(&response.model, &response.usage);

        response
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| {
                Error::empty_response(model).with_operation("session::complete")
            })
    }

    /// Snapshot of usage accumulated so far
    pub fn usage(&self) -> UsageTracker {
        self.usage.lock().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::provider::{CompletionResponse, FinishReason, ProviderError, Usage};
    use async_trait::async_trait;

    /// Test caller that records the wire model and echoes a fixed reply
    struct EchoCaller {
        family: ProviderFamily,
        reply: String,
        images: bool,
        seen: Mutex<Vec<String>>,
    }

    impl EchoCaller {
        fn new(family: ProviderFamily, reply: &str) -> Self {
            Self {
                family,
                reply: reply.to_string(),
                images: true,
                seen: Mutex::new(Vec::new()),
            }
        }

        fn text_only(family: ProviderFamily, reply: &str) -> Self {
            Self {
                images: false,
                ..Self::new(family, reply)
            }
        }
    }

    #[async_trait]
    impl ModelCaller for EchoCaller {
        fn name(&self) -> &str {
            "echo"
        }

        fn family(&self) -> ProviderFamily {
            self.family
        }

        fn models(&self) -> Vec<String> {
            vec!["echo-1".into()]
        }

        fn default_model(&self) -> &str {
            "echo-1"
        }

        fn supports_images(&self) -> bool {
            self.images
        }

        async fn complete(&self, request: CompletionRequest) -> std::result::Result<CompletionResponse, ProviderError> {
            let model = request.model.unwrap_or_else(|| "echo-1".into());
            self.seen.lock().unwrap().push(model.clone());
            Ok(CompletionResponse {
                id: "echo".into(),
                model,
                content: Some(self.reply.clone()),
                finish_reason: FinishReason::Stop,
                usage: Usage {
                    prompt_tokens: 3,
                    completion_tokens: 5,
                    total_tokens: 8,
                },
            })
        }
    }

    fn session_with(callers: Vec<Arc<dyn ModelCaller>>) -> ModelSession {
        let mut registry = ProviderRegistry::new();
        for caller in callers {
            registry.register(caller);
        }
        ModelSession::new(registry)
    }

    #[tokio::test]
    async fn test_dispatch_by_model_substring() {
        let session = session_with(vec![
            Arc::new(EchoCaller::new(ProviderFamily::Anthropic, "from anthropic")),
            Arc::new(EchoCaller::new(ProviderFamily::Gemini, "from gemini")),
        ]);

        let reply = session.complete_text("claude-3-5-haiku", "hi", None).await.unwrap();
        assert_eq!(reply, "from anthropic");

        let reply = session.complete_text("gemini-2.5-pro", "hi", None).await.unwrap();
        assert_eq!(reply, "from gemini");
    }

    #[tokio::test]
    async fn test_unknown_model_falls_back_to_default_family() {
        let session = session_with(vec![Arc::new(EchoCaller::new(ProviderFamily::OpenAi, "default"))]);
        let reply = session.complete_text("mystery-7b", "hi", None).await.unwrap();
        assert_eq!(reply, "default");
    }

    #[tokio::test]
    async fn test_missing_credentials() {
        let session = session_with(vec![]);
        let err = session.complete_text("claude-latest", "hi", None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
        assert!(err.message().contains("ANTHROPIC_API_KEY"));
    }

    #[tokio::test]
    async fn test_family_prefix_routes_and_strips() {
        let caller = Arc::new(EchoCaller::new(ProviderFamily::Gemini, "ok"));
        let session = session_with(vec![caller.clone()]);

        session.complete_text("gemini:custom-tuned", "hi", None).await.unwrap();

        let seen = caller.seen.lock().unwrap();
        assert_eq!(seen.as_slice(), ["custom-tuned"]);
    }

    #[tokio::test]
    async fn test_image_rejected_by_text_only_caller() {
        let session = session_with(vec![Arc::new(EchoCaller::text_only(ProviderFamily::OpenAi, "ok"))]);
        let err = session
            .complete_with_image("gpt-4o", "describe", ImagePayload::png("cG5n"), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unsupported);
    }

    #[tokio::test]
    async fn test_blank_reply_is_empty_response() {
        let session = session_with(vec![Arc::new(EchoCaller::new(ProviderFamily::OpenAi, "  \n"))]);
        let err = session.complete_text("gpt-4o", "hi", None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::EmptyResponse);
    }

    #[tokio::test]
    async fn test_usage_accumulates_across_calls() {
        let session = session_with(vec![Arc::new(EchoCaller::new(ProviderFamily::OpenAi, "ok"))]);
        session.complete_text("gpt-4o", "one", None).await.unwrap();
        session.complete_text("gpt-4o", "two", None).await.unwrap();

        let usage = session.usage();
        assert_eq!(usage.total_calls, 2);
        assert_eq!(usage.total_prompt_tokens, 6);
        assert_eq!(usage.total_completion_tokens, 10);
    }

    #[test]
    fn test_wire_model_strips_only_known_prefixes() {
        assert_eq!(wire_model("openai:gpt-4o"), "gpt-4o");
        assert_eq!(wire_model("google:gemini-2.5-pro"), "gemini-2.5-pro");
        assert_eq!(wire_model("gpt-4o"), "gpt-4o");
        assert_eq!(wire_model("ft:gpt-4o:org"), "ft:gpt-4o:org");
        assert_eq!(wire_model("openai:"), "openai:");
    }

    #[test]
    fn test_route_honors_prefix_over_substring() {
        assert_eq!(route("openai:claude-like"), ProviderFamily::OpenAi);
        assert_eq!(route("claude-3-opus"), ProviderFamily::Anthropic);
        assert_eq!(route("unknown"), ProviderFamily::DEFAULT);
    }
}
