//! Simulated streaming.
//!
//! The CLI returns its answer in one piece, so streaming responses are
//! replayed word by word after the fact:
//!
//! ```text
//! data: {... "delta":{"content":"hello "}, "finish_reason":null ...}
//! data: {... "delta":{"content":"world "}, "finish_reason":null ...}
//! data: {... "delta":{}, "finish_reason":"stop" ...}
//! data: [DONE]
//! ```
//!
//! Frames are produced lazily by an `async_stream` generator; the delay between
//! them is a `tokio` sleep inside the generator, so dropping the stream (the
//! client went away) cancels the pending timer with it.

use std::sync::Arc;
use std::time::Duration;

use axum::response::sse::Event;
use futures::Stream;

use crate::gateway::Gateway;
use crate::openai::types::{
    CHAT_COMPLETION_CHUNK_OBJECT, ChatCompletionChunk, ChatCompletionChunkChoice,
    ChatCompletionChunkDelta, ChatCompletionRequest, ChatCompletionResponse, ErrorResponse,
    FINISH_REASON_STOP,
};

/// End-of-stream sentinel.
pub const DONE_SENTINEL: &str = "[DONE]";

/// One unit of a streamed response.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamFrame {
    Chunk(ChatCompletionChunk),
    Error(ErrorResponse),
    Done,
}

impl StreamFrame {
    /// Payload of the `data:` line.
    pub fn data(&self) -> String {
        let json = match self {
            Self::Chunk(chunk) => serde_json::to_string(chunk),
            Self::Error(error) => serde_json::to_string(error),
            Self::Done => return DONE_SENTINEL.to_string(),
        };
        json.unwrap_or_else(|e| {
            serde_json::to_string(&ErrorResponse::server_error(e.to_string()))
                .unwrap_or_else(|_| "{}".to_string())
        })
    }

    /// Wire encoding: `data: <payload>\n\n`.
    pub fn encode(&self) -> String {
        format!("data: {}\n\n", self.data())
    }

    pub fn to_event(&self) -> Event {
        Event::default().data(self.data())
    }

    /// Content delta carried by a chunk frame.
    pub fn delta(&self) -> Option<&str> {
        match self {
            Self::Chunk(chunk) => chunk.choices.first()?.delta.content.as_deref(),
            _ => None,
        }
    }

    pub fn finish_reason(&self) -> Option<&str> {
        match self {
            Self::Chunk(chunk) => chunk.choices.first()?.finish_reason.as_deref(),
            _ => None,
        }
    }
}

fn chunk(
    response: &ChatCompletionResponse,
    content: Option<String>,
    finish_reason: Option<&str>,
) -> StreamFrame {
    StreamFrame::Chunk(ChatCompletionChunk {
        id: response.id.clone(),
        object: CHAT_COMPLETION_CHUNK_OBJECT.to_string(),
        created: response.created,
        model: response.model.clone(),
        choices: vec![ChatCompletionChunkChoice {
            index: 0,
            delta: ChatCompletionChunkDelta {
                role: None,
                content,
            },
            finish_reason: finish_reason.map(str::to_string),
        }],
    })
}

/// Replay a finished response as word frames, a final frame, and `[DONE]`.
///
/// Every frame shares the response's id and creation time. `delay` is slept
/// after each word frame.
pub fn replay(
    response: ChatCompletionResponse,
    delay: Duration,
) -> impl Stream<Item = StreamFrame> + Send + 'static {
    async_stream::stream! {
        let words: Vec<String> = response
            .content()
            .unwrap_or_default()
            .split_whitespace()
            .map(|w| format!("{w} "))
            .collect();

        for word in words {
            yield chunk(&response, Some(word), None);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        yield chunk(&response, None, Some(FINISH_REASON_STOP));
        yield StreamFrame::Done;
    }
}

/// Run a completion and stream it.
///
/// Response headers are already sent by the time this runs, so a failed
/// completion becomes a single error frame instead of an error status.
pub fn stream_completion(
    gateway: Arc<Gateway>,
    request: ChatCompletionRequest,
) -> impl Stream<Item = StreamFrame> + Send + 'static {
    async_stream::stream! {
        tracing::info!("Starting streaming completion");
        match gateway.complete(&request).await {
            Ok(response) => {
                let frames = replay(response, gateway.frame_delay());
                for await frame in frames {
                    yield frame;
                }
                tracing::info!("Streaming completion finished");
            }
            Err(e) => {
                tracing::error!(name: "stream.failed", kind = e.kind(), error = %e, "Streaming completion error");
                yield StreamFrame::Error(ErrorResponse::server_error(e.to_string()));
            }
        }
    }
}
