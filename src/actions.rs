//! Content actions: summarize, explain, key points, suggestions, rewrite, completion.
//!
//! Buffered actions (summarize, key points) are deduplicated per content and options.
//! Streaming actions hand the provider's output to the caller through the stream relay.

use std::sync::Arc;

use futures::StreamExt;
use futures::stream::BoxStream;
use serde::Deserialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::dedup::{RequestDeduplicator, dedup_key};
use crate::error::{ActionError, LlmError};
use crate::json::extract_json;
use crate::llm::{ChatMessage, CompletionRequest, LlmProvider, TextStream, estimate_cost};
use crate::model::{
    Action, Alternative, ExplainOptions, KeyPoint, KeyPointsResponse, RewriteOptions,
    SuggestionsOptions, SuggestionsSnapshot, SummarizeOptions, SummarizeResponse,
};
use crate::relay::{ensure_leading_space, relay_partial_objects, skip_repeats};
use crate::tracker::ActionTracker;

const SUMMARIZE_SYSTEM_PROMPT: &str = "You are a professional content summarizer. Your summaries \
    are clear, accurate, and maintain the key points of the original content.";
const EXPLAIN_SYSTEM_PROMPT: &str =
    "You are an expert at explaining complex topics in a clear and understandable way.";
const KEY_POINTS_SYSTEM_PROMPT: &str =
    "You are an expert at extracting and analyzing key points from content.";
const SUGGESTIONS_SYSTEM_PROMPT: &str = "You are an expert content optimization advisor. Analyze \
    content and provide actionable suggestions for improvement.";
const REWRITE_SYSTEM_PROMPT: &str = "You are an expert content writer. Rewrite content while \
    maintaining its core message and improving its effectiveness.";
const COMPLETION_SYSTEM_PROMPT: &str = "You are an AI assistant that completes text naturally. \
    Only provide the completion part that follows the user's input, without repeating their \
    text. Keep completions concise and relevant. Never start with the user's text.";

const DEFAULT_MAX_KEY_POINTS: u32 = 5;
const DEFAULT_ALTERNATIVES: u32 = 3;

/// Snapshots of the suggestions being generated.
pub type SuggestionsStream = BoxStream<'static, Result<SuggestionsSnapshot, LlmError>>;

/// Runs content actions against a language model.
pub struct Reviver {
    llm: Arc<dyn LlmProvider>,
    tracker: Arc<ActionTracker>,
    summaries: RequestDeduplicator<SummarizeResponse>,
    key_points: RequestDeduplicator<KeyPointsResponse>,
}

impl Reviver {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self::with_tracker(llm, ActionTracker::new())
    }

    pub fn with_tracker(llm: Arc<dyn LlmProvider>, tracker: Arc<ActionTracker>) -> Self {
        Self {
            llm,
            tracker,
            summaries: RequestDeduplicator::new(),
            key_points: RequestDeduplicator::new(),
        }
    }

    pub fn tracker(&self) -> &Arc<ActionTracker> {
        &self.tracker
    }

    pub fn model_name(&self) -> &str {
        self.llm.model_name()
    }

    /// Summarize `content`. Identical concurrent requests share one model call.
    pub async fn summarize_content(
        &self,
        content: &str,
        options: Option<SummarizeOptions>,
    ) -> SummarizeResponse {
        let key = dedup_key(Action::Summarize.as_str(), content, options.as_ref());
        let opts = options.unwrap_or_default();

        let request = CompletionRequest::new(vec![
            ChatMessage::system(SUMMARIZE_SYSTEM_PROMPT),
            ChatMessage::user(format!(
                "Summarize the following content in a {} {} format:\n\n{}",
                opts.style(),
                opts.format(),
                content
            )),
        ])
        .with_temperature(0.3)
        .with_max_tokens(500);

        let llm = Arc::clone(&self.llm);
        let result = self
            .summaries
            .run(key, move || async move {
                match complete_logged(llm.as_ref(), Action::Summarize, request).await {
                    Ok(text) => SummarizeResponse::ok(text),
                    Err(e) => SummarizeResponse::failed(e),
                }
            })
            .await;

        result
            .map_err(ActionError::from)
            .unwrap_or_else(SummarizeResponse::failed)
    }

    /// Explain `content`, streaming the explanation.
    pub async fn explain_content(
        &self,
        content: &str,
        options: Option<ExplainOptions>,
    ) -> Result<TextStream, ActionError> {
        let opts = options.unwrap_or_default();
        let request = CompletionRequest::new(vec![
            ChatMessage::system(EXPLAIN_SYSTEM_PROMPT),
            ChatMessage::user(format!(
                "Explain the following content at a {} level for a {} audience:\n\n{}",
                opts.depth(),
                opts.audience(),
                content
            )),
        ])
        .with_temperature(0.5)
        .with_max_tokens(1000);

        self.stream(Action::Explain.as_str(), request).await
    }

    /// Extract the `max_points` (default 5) most important points of `content`.
    /// Identical concurrent requests share one model call.
    pub async fn extract_key_points(
        &self,
        content: &str,
        max_points: Option<u32>,
    ) -> KeyPointsResponse {
        let max_points = max_points.unwrap_or(DEFAULT_MAX_KEY_POINTS);
        let key = dedup_key(Action::KeyPoints.as_str(), content, Some(&max_points));

        let request = CompletionRequest::new(vec![
            ChatMessage::system(format!(
                "{KEY_POINTS_SYSTEM_PROMPT}\n\n\
                 Respond with a JSON object of the form \
                 {{\"points\": [{{\"point\": string, \"importance\": number 1-10, \"context\": optional string}}]}}. \
                 ONLY output the JSON object."
            )),
            ChatMessage::user(format!(
                "Extract the {max_points} most important key points from the following content:\n\n{content}"
            )),
        ])
        .with_temperature(0.3)
        .with_max_tokens(1000)
        .with_json_output();

        let llm = Arc::clone(&self.llm);
        let result = self
            .key_points
            .run(key, move || async move {
                let parsed = match complete_logged(llm.as_ref(), Action::KeyPoints, request).await {
                    Ok(text) => parse_key_points(&text),
                    Err(e) => Err(e),
                };
                match parsed {
                    Ok(points) => KeyPointsResponse::ok(points),
                    Err(e) => {
                        warn!(error = %e, "Extract key points failed");
                        KeyPointsResponse::failed(e)
                    }
                }
            })
            .await;

        result
            .map_err(ActionError::from)
            .unwrap_or_else(KeyPointsResponse::failed)
    }

    /// Stream improvement suggestions for `content` as they are generated.
    ///
    /// Each item is the best current view of the whole suggestion list. Failures after the
    /// stream started are delivered in-stream.
    pub async fn get_suggestions(
        &self,
        content: &str,
        options: Option<SuggestionsOptions>,
    ) -> Result<SuggestionsStream, ActionError> {
        let opts = options.unwrap_or_default();

        let mut instruction = format!(
            "Provide {} suggestions to improve the following content",
            opts.max_suggestions()
        );
        if let Some(focus) = &opts.focus {
            instruction.push_str(&format!(", focusing on {focus}"));
        }
        if let Some(context) = &opts.context {
            instruction.push_str(&format!(". Context: {context}"));
        }

        let request = CompletionRequest::new(vec![
            ChatMessage::system(format!(
                "{SUGGESTIONS_SYSTEM_PROMPT}\n\n\
                 Respond with a JSON object of the form \
                 {{\"suggestions\": [{{\"suggestion\": string, \"impact\": \"high\" | \"medium\" | \"low\", \
                 \"reasoning\": string, \"implementation\": optional string}}]}}. \
                 ONLY output the JSON object."
            )),
            ChatMessage::user(format!("{instruction}:\n\n{content}")),
        ])
        .with_temperature(0.4)
        .with_max_tokens(1000)
        .with_json_output();

        let text = self.stream(Action::Suggestions.as_str(), request).await?;
        // Raw values that differ only in a half-written field map to the same snapshot.
        let snapshots = relay_partial_objects(text)
            .map(|item| item.map(|value| SuggestionsSnapshot::from_partial(&value)))
            .boxed();
        Ok(skip_repeats(snapshots))
    }

    /// Rewrite `content`, streaming the new text. Empty content is rejected.
    pub async fn rewrite_content(
        &self,
        content: &str,
        options: Option<RewriteOptions>,
    ) -> Result<TextStream, ActionError> {
        if content.trim().is_empty() {
            return Err(ActionError::EmptyContent(
                "Please provide content to rewrite".to_string(),
            ));
        }

        let opts = options.unwrap_or_default();
        let target = opts
            .target
            .as_deref()
            .map(|t| format!(", optimized for {t}"))
            .unwrap_or_default();

        let request = CompletionRequest::new(vec![
            ChatMessage::system(REWRITE_SYSTEM_PROMPT),
            ChatMessage::user(format!(
                "Rewrite the following content with a {} style and {} tone{}:\n\n{}",
                opts.style(),
                opts.tone(),
                target,
                content
            )),
        ])
        .with_temperature(0.4)
        .with_max_tokens(1000);

        self.stream(Action::Rewrite.as_str(), request).await
    }

    /// Continue `content` inline. The streamed completion starts with a space.
    pub async fn get_completion(&self, content: &str) -> Result<TextStream, ActionError> {
        let request = CompletionRequest::new(vec![
            ChatMessage::system(COMPLETION_SYSTEM_PROMPT),
            ChatMessage::user(format!(
                "Complete this text naturally (only provide the completion part): {content}"
            )),
        ])
        .with_temperature(0.4)
        .with_max_tokens(50)
        .with_top_p(0.9)
        .with_presence_penalty(0.6)
        .with_frequency_penalty(0.6);

        let upstream = self.stream("completion", request).await?;
        Ok(ensure_leading_space(upstream))
    }

    /// Generate `count` (default 3) alternative versions of `content`, each in a
    /// different style or tone.
    pub async fn generate_alternatives(
        &self,
        content: &str,
        count: Option<u32>,
    ) -> Result<Vec<Alternative>, ActionError> {
        let count = count.unwrap_or(DEFAULT_ALTERNATIVES);
        if count == 0 {
            return Err(ActionError::Validation {
                reason: "count must be at least 1".to_string(),
            });
        }
        let request = CompletionRequest::new(vec![ChatMessage::user(format!(
            "Generate {count} alternative versions of the following text, each with a different \
             style or tone. Return them as a JSON array where each item has 'title' and 'content' \
             fields.\n\nText to rewrite:\n{content}"
        ))])
        .with_temperature(0.7);

        let text = complete_logged(self.llm.as_ref(), "alternatives", request).await?;
        let alternatives: Vec<Alternative> =
            serde_json::from_str(&extract_json(&text)).map_err(|e| ActionError::Unparseable {
                what: "alternatives".to_string(),
                reason: e.to_string(),
            })?;

        Ok(alternatives.into_iter().take(count as usize).collect())
    }

    async fn stream(
        &self,
        action: &str,
        request: CompletionRequest,
    ) -> Result<TextStream, ActionError> {
        let request_id = Uuid::new_v4();
        info!(action, %request_id, model = self.llm.model_name(), "Streaming action");
        let stream = self.llm.complete_stream(request).await.map_err(|e| {
            warn!(action, %request_id, error = %e, "Streaming action failed to start");
            ActionError::from(e)
        })?;
        Ok(stream)
    }
}

/// Run a buffered completion with structured logging.
async fn complete_logged(
    llm: &dyn LlmProvider,
    action: impl std::fmt::Display,
    request: CompletionRequest,
) -> Result<String, ActionError> {
    let request_id = Uuid::new_v4();
    info!(%action, %request_id, model = llm.model_name(), "Running action");

    let response = llm.complete(request).await.map_err(|e| {
        warn!(%action, %request_id, error = %e, "Action failed");
        ActionError::from(e)
    })?;

    debug!(
        %action,
        %request_id,
        input_tokens = response.input_tokens,
        output_tokens = response.output_tokens,
        cost = %estimate_cost(llm, &response),
        "Action completed"
    );
    Ok(response.content)
}

#[derive(Debug, Deserialize)]
struct KeyPointsEnvelope {
    points: Vec<KeyPoint>,
}

/// Parse and validate the key points document. A bare array is accepted too.
fn parse_key_points(text: &str) -> Result<Vec<KeyPoint>, ActionError> {
    let json = extract_json(text);
    let unparseable = |e: serde_json::Error| ActionError::Unparseable {
        what: "key points".to_string(),
        reason: e.to_string(),
    };

    let points = if json.starts_with('[') {
        serde_json::from_str::<Vec<KeyPoint>>(&json).map_err(unparseable)?
    } else {
        serde_json::from_str::<KeyPointsEnvelope>(&json)
            .map_err(unparseable)?
            .points
    };

    for point in &points {
        point.validate()?;
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use futures::stream;
    use rust_decimal::Decimal;

    use crate::llm::{CompletionResponse, FinishReason};
    use crate::model::Impact;

    /// Mock LLM returning canned text, optionally after a delay, recording requests.
    struct MockLlm {
        response: String,
        chunks: Vec<String>,
        delay: Duration,
        calls: AtomicUsize,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl MockLlm {
        fn new(response: &str) -> Self {
            Self {
                response: response.to_string(),
                chunks: Vec::new(),
                delay: Duration::ZERO,
                calls: AtomicUsize::new(0),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn streaming(chunks: &[&str]) -> Self {
            Self {
                chunks: chunks.iter().map(|c| c.to_string()).collect(),
                ..Self::new("")
            }
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        fn last_request(&self) -> CompletionRequest {
            self.requests.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl LlmProvider for MockLlm {
        fn model_name(&self) -> &str {
            "mock"
        }

        fn cost_per_token(&self) -> (Decimal, Decimal) {
            (Decimal::ZERO, Decimal::ZERO)
        }

        async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request);
            tokio::time::sleep(self.delay).await;
            Ok(CompletionResponse {
                content: self.response.clone(),
                input_tokens: 10,
                output_tokens: 5,
                finish_reason: FinishReason::Stop,
                response_id: None,
            })
        }

        async fn complete_stream(&self, request: CompletionRequest) -> Result<TextStream, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests.lock().unwrap().push(request);
            let chunks: Vec<Result<String, LlmError>> =
                self.chunks.iter().cloned().map(Ok).collect();
            Ok(Box::pin(stream::iter(chunks)))
        }
    }

    /// Mock LLM whose every call fails.
    struct FailingLlm;

    #[async_trait]
    impl LlmProvider for FailingLlm {
        fn model_name(&self) -> &str {
            "failing"
        }

        fn cost_per_token(&self) -> (Decimal, Decimal) {
            (Decimal::ZERO, Decimal::ZERO)
        }

        async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
            Err(LlmError::AuthFailed {
                provider: "mock".into(),
            })
        }

        async fn complete_stream(&self, _request: CompletionRequest) -> Result<TextStream, LlmError> {
            Err(LlmError::AuthFailed {
                provider: "mock".into(),
            })
        }
    }

    async fn collect_text(stream: TextStream) -> String {
        stream.map(|c| c.unwrap()).collect::<Vec<_>>().await.concat()
    }

    #[tokio::test]
    async fn summarize_uses_default_style() {
        let llm = Arc::new(MockLlm::new("A short summary."));
        let reviver = Reviver::new(llm.clone());

        let response = reviver.summarize_content("Long article", None).await;
        assert_eq!(response, SummarizeResponse::ok("A short summary.".into()));

        let request = llm.last_request();
        assert_eq!(request.temperature, Some(0.3));
        assert_eq!(request.max_tokens, Some(500));
        assert!(request.messages[1].content.contains("concise paragraph format"));
        assert!(request.messages[1].content.ends_with("Long article"));
    }

    #[tokio::test]
    async fn concurrent_identical_summaries_share_one_call() {
        let llm = Arc::new(MockLlm::new("shared").with_delay(Duration::from_millis(50)));
        let reviver = Reviver::new(llm.clone());

        let (a, b) = tokio::join!(
            reviver.summarize_content("same text", None),
            reviver.summarize_content("same text", None),
        );
        assert_eq!(a, b);
        assert_eq!(llm.calls.load(Ordering::SeqCst), 1);

        // Completed requests are not cached.
        reviver.summarize_content("same text", None).await;
        assert_eq!(llm.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn different_options_are_not_deduplicated() {
        let llm = Arc::new(MockLlm::new("s").with_delay(Duration::from_millis(20)));
        let reviver = Reviver::new(llm.clone());
        let bullets = SummarizeOptions {
            format: Some("bullets".into()),
            ..Default::default()
        };

        tokio::join!(
            reviver.summarize_content("same text", None),
            reviver.summarize_content("same text", Some(bullets)),
        );
        assert_eq!(llm.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn summarize_failure_is_reported_in_response() {
        let reviver = Reviver::new(Arc::new(FailingLlm));
        let response = reviver.summarize_content("text", None).await;
        assert!(!response.success);
        assert!(response.error.unwrap().contains("Authentication failed"));
    }

    #[tokio::test]
    async fn key_points_parsed_and_validated() {
        let llm = Arc::new(MockLlm::new(
            r#"```json
{"points": [{"point": "Ownership prevents data races", "importance": 9},
            {"point": "Zero-cost abstractions", "importance": 7, "context": "performance"}]}
```"#,
        ));
        let reviver = Reviver::new(llm.clone());

        let response = reviver.extract_key_points("Rust intro", None).await;
        assert!(response.success);
        let points = response.points.unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[1].context.as_deref(), Some("performance"));

        let request = llm.last_request();
        assert!(request.json_output);
        assert!(request.messages[1].content.contains("5 most important"));
    }

    #[tokio::test]
    async fn key_points_out_of_range_importance_fails() {
        let llm = Arc::new(MockLlm::new(r#"{"points": [{"point": "x", "importance": 42}]}"#));
        let reviver = Reviver::new(llm);

        let response = reviver.extract_key_points("text", Some(3)).await;
        assert!(!response.success);
        assert!(response.error.unwrap().contains("importance"));
    }

    #[tokio::test]
    async fn key_points_accept_fractional_importance() {
        let llm = Arc::new(MockLlm::new(
            r#"{"points": [{"point": "x", "importance": 8.0}, {"point": "y", "importance": 7.5}]}"#,
        ));
        let reviver = Reviver::new(llm);

        let response = reviver.extract_key_points("text", Some(2)).await;
        assert!(response.success, "{:?}", response.error);
        let points = response.points.unwrap();
        assert_eq!(points[0].importance, 8.0);
        assert_eq!(points[1].importance, 7.5);
    }

    #[test]
    fn key_points_accepts_bare_array() {
        let points = parse_key_points(r#"[{"point": "a", "importance": 1}]"#).unwrap();
        assert_eq!(points.len(), 1);
    }

    #[tokio::test]
    async fn explain_streams_chunks() {
        let llm = Arc::new(MockLlm::streaming(&["Rust ", "is ", "safe."]));
        let reviver = Reviver::new(llm.clone());

        let stream = reviver.explain_content("Rust", None).await.unwrap();
        assert_eq!(collect_text(stream).await, "Rust is safe.");

        let request = llm.last_request();
        assert!(request.messages[1].content.contains("detailed level for a general audience"));
        assert_eq!(request.temperature, Some(0.5));
    }

    #[tokio::test]
    async fn rewrite_rejects_empty_content() {
        let llm = Arc::new(MockLlm::streaming(&["never"]));
        let reviver = Reviver::new(llm.clone());

        let err = reviver.rewrite_content("   ", None).await.err().unwrap();
        assert_eq!(err.to_string(), "Please provide content to rewrite");
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn rewrite_includes_target() {
        let llm = Arc::new(MockLlm::streaming(&["Better text"]));
        let reviver = Reviver::new(llm.clone());
        let options = RewriteOptions {
            tone: Some("friendly".into()),
            target: Some("email".into()),
            ..Default::default()
        };

        let stream = reviver.rewrite_content("Old text", Some(options)).await.unwrap();
        assert_eq!(collect_text(stream).await, "Better text");
        assert!(llm.last_request().messages[1]
            .content
            .contains("professional style and friendly tone, optimized for email"));
    }

    #[tokio::test]
    async fn completion_gets_leading_space() {
        let llm = Arc::new(MockLlm::streaming(&["jumps", " over"]));
        let reviver = Reviver::new(llm.clone());

        let stream = reviver.get_completion("The quick brown fox").await.unwrap();
        assert_eq!(collect_text(stream).await, " jumps over");

        let request = llm.last_request();
        assert_eq!(request.max_tokens, Some(50));
        assert_eq!(request.top_p, Some(0.9));
        assert_eq!(request.presence_penalty, Some(0.6));
        assert_eq!(request.frequency_penalty, Some(0.6));
    }

    #[tokio::test]
    async fn suggestions_stream_partial_snapshots() {
        let llm = Arc::new(MockLlm::streaming(&[
            r#"{"suggestions": [{"suggestion": "Use active"#,
            r#" voice", "impact": "high", "reasoning": "Clearer"}"#,
            r#"]}"#,
        ]));
        let reviver = Reviver::new(llm.clone());
        let options = SuggestionsOptions {
            focus: Some("clarity".into()),
            ..Default::default()
        };

        let snapshots: Vec<SuggestionsSnapshot> = reviver
            .get_suggestions("Mistakes were made.", Some(options))
            .await
            .unwrap()
            .map(|s| s.unwrap())
            .collect()
            .await;

        assert!(snapshots.len() >= 2);
        assert_eq!(
            snapshots[0].suggestions[0].suggestion.as_deref(),
            Some("Use active")
        );
        let last = snapshots.last().unwrap().completed();
        assert_eq!(last.len(), 1);
        assert_eq!(last[0].impact, Impact::High);

        let request = llm.last_request();
        assert!(request.messages[1].content.starts_with("Provide 3 suggestions"));
        assert!(request.messages[1].content.contains("focusing on clarity"));
    }

    #[tokio::test]
    async fn suggestions_skip_unchanged_snapshots() {
        let llm = Arc::new(MockLlm::streaming(&[
            r#"{"suggestions": [{"suggestion": "x", "impact": "me"#,
            r#"di"#,
            r#"um", "reasoning": "r"}]}"#,
        ]));
        let reviver = Reviver::new(llm);

        let snapshots: Vec<SuggestionsSnapshot> = reviver
            .get_suggestions("text", None)
            .await
            .unwrap()
            .map(|s| s.unwrap())
            .collect()
            .await;

        for pair in snapshots.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
        assert_eq!(snapshots[0].suggestions[0].impact, None);
        let last = snapshots.last().unwrap().completed();
        assert_eq!(last[0].impact, Impact::Medium);
    }

    #[tokio::test]
    async fn streaming_failure_surfaces_error() {
        let reviver = Reviver::new(Arc::new(FailingLlm));
        let err = reviver.explain_content("x", None).await.err().unwrap();
        assert!(matches!(err, ActionError::Llm(LlmError::AuthFailed { .. })));
    }

    #[tokio::test]
    async fn alternatives_are_capped_at_count() {
        let llm = Arc::new(MockLlm::new(
            r#"[{"title": "Formal", "content": "a"}, {"title": "Casual", "content": "b"}, {"title": "Terse", "content": "c"}]"#,
        ));
        let reviver = Reviver::new(llm);

        let alternatives = reviver.generate_alternatives("text", Some(2)).await.unwrap();
        assert_eq!(alternatives.len(), 2);
        assert_eq!(alternatives[0].title, "Formal");
    }

    #[tokio::test]
    async fn alternatives_reject_zero_count() {
        let llm = Arc::new(MockLlm::new("[]"));
        let reviver = Reviver::new(llm.clone());

        let err = reviver.generate_alternatives("text", Some(0)).await.unwrap_err();
        assert!(matches!(err, ActionError::Validation { .. }));
        assert_eq!(llm.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn alternatives_unparseable_output() {
        let reviver = Reviver::new(Arc::new(MockLlm::new("I cannot do that.")));
        let err = reviver.generate_alternatives("text", None).await.unwrap_err();
        assert!(matches!(err, ActionError::Unparseable { .. }));
    }
}
