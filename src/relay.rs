//! Stream relay: forwards provider output to callers as it arrives.

use futures::StreamExt;
use futures::future::ready;
use futures::stream::{self, BoxStream};

use crate::error::LlmError;
use crate::json::{extract_json, parse_partial_json};
use crate::llm::TextStream;

/// Incrementally parsed JSON snapshots.
pub type ObjectStream = BoxStream<'static, Result<serde_json::Value, LlmError>>;

#[derive(Default)]
struct RelayState {
    seen_first: bool,
    failed: bool,
}

/// Forward `upstream` chunk by chunk, passing each through `transform`.
///
/// `transform` receives the chunk and whether it is the first non-empty one. Empty chunks
/// are dropped. The first upstream error is forwarded and ends the relay.
pub fn relay<F>(upstream: TextStream, mut transform: F) -> TextStream
where
    F: FnMut(String, bool) -> String + Send + 'static,
{
    let relayed = upstream
        .scan(RelayState::default(), move |state, item| {
            let next = if state.failed {
                None
            } else {
                match item {
                    Ok(chunk) if chunk.is_empty() => Some(None),
                    Ok(chunk) => {
                        let first = !state.seen_first;
                        state.seen_first = true;
                        Some(Some(Ok(transform(chunk, first))))
                    }
                    Err(e) => {
                        state.failed = true;
                        Some(Some(Err(e)))
                    }
                }
            };
            ready(next)
        })
        .filter_map(ready);

    Box::pin(relayed)
}

/// Inline completions must read as a continuation of the user's text: the first chunk
/// gets a leading space unless it already has one.
pub fn ensure_leading_space(upstream: TextStream) -> TextStream {
    relay(upstream, |chunk, first| {
        if first && !chunk.starts_with(' ') {
            format!(" {chunk}")
        } else {
            chunk
        }
    })
}

struct PartialState {
    upstream: TextStream,
    buffer: String,
    last: Option<serde_json::Value>,
    done: bool,
}

/// Accumulate a streamed JSON document and emit a parsed snapshot each time it changes.
///
/// The final snapshot is parsed strictly; if the finished text is not valid JSON the
/// stream ends with an error.
pub fn relay_partial_objects(upstream: TextStream) -> ObjectStream {
    let state = PartialState {
        upstream,
        buffer: String::new(),
        last: None,
        done: false,
    };

    let snapshots = stream::unfold(state, |mut st| async move {
        if st.done {
            return None;
        }
        loop {
            match st.upstream.next().await {
                Some(Ok(delta)) => {
                    st.buffer.push_str(&delta);
                    if let Some(value) = parse_partial_json(&st.buffer)
                        && st.last.as_ref() != Some(&value)
                    {
                        st.last = Some(value.clone());
                        return Some((Ok(value), st));
                    }
                }
                Some(Err(e)) => {
                    st.done = true;
                    return Some((Err(e), st));
                }
                None => {
                    st.done = true;
                    return match finish(&st.buffer) {
                        Ok(value) if st.last.as_ref() == Some(&value) => None,
                        Ok(value) => Some((Ok(value), st)),
                        Err(e) => Some((Err(e), st)),
                    };
                }
            }
        }
    });

    Box::pin(snapshots)
}

/// Drop items equal to the last value forwarded. Errors always pass.
pub fn skip_repeats<T>(
    upstream: BoxStream<'static, Result<T, LlmError>>,
) -> BoxStream<'static, Result<T, LlmError>>
where
    T: PartialEq + Clone + Send + 'static,
{
    let distinct = upstream
        .scan(None::<T>, |last, item| {
            let next = match item {
                Ok(value) if last.as_ref() == Some(&value) => None,
                Ok(value) => {
                    *last = Some(value.clone());
                    Some(Ok(value))
                }
                Err(e) => Some(Err(e)),
            };
            ready(Some(next))
        })
        .filter_map(ready);

    Box::pin(distinct)
}

fn finish(buffer: &str) -> Result<serde_json::Value, LlmError> {
    serde_json::from_str(&extract_json(buffer)).map_err(|e| LlmError::InvalidResponse {
        provider: "stream".to_string(),
        reason: format!("incomplete JSON document: {}", e),
    })
}

/// Keep `guard` alive for as long as `stream` is.
pub fn hold<T, G>(stream: BoxStream<'static, T>, guard: G) -> BoxStream<'static, T>
where
    T: Send + 'static,
    G: Send + 'static,
{
    Box::pin(stream.map(move |item| {
        let _held = &guard;
        item
    }))
}
