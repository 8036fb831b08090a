//! Scripted generation provider.
//!
//! Replays a fixed list of text fragments instead of calling a model. Used
//! by tests and by offline demos (`--provider mock`).

use crate::client::{LlmClient, LlmRequest, LlmResponse, LlmStream, LlmStreamChunk, LlmUsage};
use async_stream::stream;
use ragdesk_core::{AppError, AppResult};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

const MOCK_MODEL: &str = "mock";

/// What the mock does when asked to generate.
#[derive(Debug, Clone)]
enum Script {
    /// Answer with a short summary of the prompt it received
    Echo,
    /// Replay these fragments, optionally failing after `fail_after` of them
    Fragments {
        fragments: Vec<String>,
        fail_after: Option<(usize, String)>,
    },
    /// Refuse every request
    Fail(String),
}

/// Mock LLM client with a fixed script.
#[derive(Debug)]
pub struct MockClient {
    script: Script,
    last_prompt: Mutex<Option<String>>,
    open_streams: Arc<AtomicUsize>,
}

/// Decrements the open-stream counter when the stream is dropped.
struct StreamGuard(Arc<AtomicUsize>);

impl Drop for StreamGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl MockClient {
    fn with_script(script: Script) -> Self {
        Self {
            script,
            last_prompt: Mutex::new(None),
            open_streams: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A client that describes the prompt it was given.
    pub fn echo() -> Self {
        Self::with_script(Script::Echo)
    }

    /// A client that emits exactly these fragments, in order.
    pub fn with_fragments<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_script(Script::Fragments {
            fragments: fragments.into_iter().map(Into::into).collect(),
            fail_after: None,
        })
    }

    /// A client whose every request fails with `message`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self::with_script(Script::Fail(message.into()))
    }

    /// Make the stream fail once `count` fragments have been emitted.
    pub fn fail_after(mut self, count: usize, message: impl Into<String>) -> Self {
        if let Script::Fragments { fail_after, .. } = &mut self.script {
            *fail_after = Some((count, message.into()));
        }
        self
    }

    /// The prompt of the most recent request, if any.
    pub fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().ok().and_then(|guard| guard.clone())
    }

    /// Number of streams handed out and not yet dropped.
    pub fn open_streams(&self) -> usize {
        self.open_streams.load(Ordering::SeqCst)
    }

    fn record(&self, request: &LlmRequest) {
        if let Ok(mut guard) = self.last_prompt.lock() {
            *guard = Some(request.prompt.clone());
        }
    }

    /// Fragments for a request, or the scripted failure.
    fn fragments_for(&self, request: &LlmRequest) -> AppResult<(Vec<String>, Option<(usize, String)>)> {
        match &self.script {
            Script::Echo => {
                let text = format!(
                    "Mock answer for a {}-character prompt.",
                    request.prompt.chars().count()
                );
                let fragments = text.split_inclusive(' ').map(str::to_string).collect();
                Ok((fragments, None))
            }
            Script::Fragments {
                fragments,
                fail_after,
            } => Ok((fragments.clone(), fail_after.clone())),
            Script::Fail(message) => Err(AppError::Generation(message.clone())),
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for MockClient {
    fn provider_name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.record(request);
        let (fragments, fail_after) = self.fragments_for(request)?;

        if let Some((_, message)) = fail_after {
            return Err(AppError::Generation(message));
        }

        let content: String = fragments.concat();
        Ok(LlmResponse {
            usage: LlmUsage::new(request.prompt.len() as u32, fragments.len() as u32),
            content,
            model: MOCK_MODEL.to_string(),
            done: true,
        })
    }

    async fn stream(&self, request: &LlmRequest) -> AppResult<LlmStream> {
        self.record(request);
        let (fragments, fail_after) = self.fragments_for(request)?;

        self.open_streams.fetch_add(1, Ordering::SeqCst);
        let guard = StreamGuard(Arc::clone(&self.open_streams));

        let stream = stream! {
            let _guard = guard;
            let total = fragments.len();

            for (index, fragment) in fragments.into_iter().enumerate() {
                if let Some((count, message)) = &fail_after {
                    if index == *count {
                        yield Err(AppError::Generation(message.clone()));
                        return;
                    }
                }
                yield Ok(LlmStreamChunk {
                    content: fragment,
                    model: MOCK_MODEL.to_string(),
                    done: false,
                    usage: None,
                });
            }

            if let Some((_, message)) = &fail_after {
                yield Err(AppError::Generation(message.clone()));
                return;
            }

            yield Ok(LlmStreamChunk {
                content: String::new(),
                model: MOCK_MODEL.to_string(),
                done: true,
                usage: Some(LlmUsage::new(0, total as u32)),
            });
        };

        Ok(Box::pin(stream))
    }
}
