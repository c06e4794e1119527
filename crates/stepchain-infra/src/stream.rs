//! Streaming-protocol decoder for workflow event feeds.
//!
//! The remote service answers a run request with a chunked, newline-delimited
//! text protocol: each meaningful line is `data: <json>` where the JSON
//! carries an `event` discriminator. This module turns the raw byte stream
//! into typed [`LifecycleEvent`]s:
//!
//! 1. `workflow_started` -- run accepted, carries `workflow_run_id`
//! 2. Per node: `node_started` -> `node_finished` (carries `data.outputs`)
//! 3. `workflow_finished` -- terminal, carries aggregate `data.outputs`
//!    and/or `data.error`
//! 4. `error` -- explicit error record, fails the decode immediately
//!
//! Chunk boundaries do not align with record boundaries: a trailing partial
//! line stays buffered until the next chunk completes it, so every chunk
//! split of a stream decodes to the same event sequence.

use std::pin::Pin;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use serde::Deserialize;

use stepchain_types::JsonMap;
use stepchain_types::error::InvokeError;
use stepchain_types::event::LifecycleEvent;

/// Marker prefixing every meaningful record line.
const DATA_PREFIX: &str = "data: ";

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

/// One record as it appears on the wire, before mapping to a lifecycle event.
#[derive(Debug, Deserialize)]
struct StreamRecord {
    /// Discriminator: `workflow_started`, `node_started`, `node_finished`,
    /// `workflow_finished`, or `error`.
    event: String,
    #[serde(default)]
    workflow_run_id: Option<String>,
    #[serde(default)]
    data: Option<RecordData>,
    /// Present on explicit `error` records.
    #[serde(default)]
    message: Option<String>,
}

/// Event-scoped payload carried under `data`.
#[derive(Debug, Default, Deserialize)]
struct RecordData {
    #[serde(default)]
    outputs: Option<JsonMap>,
    #[serde(default)]
    error: Option<String>,
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// Decode a raw byte stream into a lazy sequence of [`LifecycleEvent`]s.
///
/// Terminates when the terminal `workflow_finished` record is observed
/// (further input is not consumed) or when the source is exhausted. The
/// source is consumed by value and dropped on every exit path.
///
/// Malformed record payloads are skipped with a warning; an explicit `error`
/// record fails the whole decode with [`InvokeError::Upstream`].
pub fn decode_lifecycle_stream<S, E>(
    body: S,
) -> Pin<Box<dyn Stream<Item = Result<LifecycleEvent, InvokeError>> + Send + 'static>>
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    Box::pin(async_stream::try_stream! {
        let mut body = std::pin::pin!(body);
        // Raw bytes: chunk boundaries may fall inside a multi-byte character,
        // so UTF-8 conversion happens per complete line, never per chunk.
        let mut buffer: Vec<u8> = Vec::new();
        let mut finished = false;

        'read: while let Some(chunk) = body.next().await {
            let chunk = chunk
                .map_err(|e| InvokeError::Transport(format!("response body read: {e}")))?;
            buffer.extend_from_slice(&chunk);

            // Drain complete lines; a trailing partial line stays buffered.
            while let Some(newline) = buffer.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=newline).collect();
                let line = String::from_utf8_lossy(&line);
                if let Some(event) = parse_record(line.trim())? {
                    let terminal = event.is_terminal();
                    yield event;
                    if terminal {
                        finished = true;
                        break 'read;
                    }
                }
            }
        }

        // The final record may arrive without a trailing newline.
        if !finished {
            let line = String::from_utf8_lossy(&buffer);
            if let Some(event) = parse_record(line.trim())? {
                yield event;
            }
        }
    })
}

/// Map one trimmed line to a lifecycle event.
///
/// Returns `Ok(None)` for lines to skip: empty, unprefixed, malformed JSON,
/// or an unrecognized discriminator (keepalives, text chunks).
fn parse_record(line: &str) -> Result<Option<LifecycleEvent>, InvokeError> {
    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        return Ok(None);
    };

    let record: StreamRecord = match serde_json::from_str(payload) {
        Ok(record) => record,
        Err(e) => {
            tracing::warn!(error = %e, "skipping malformed stream record");
            return Ok(None);
        }
    };

    let data = record.data.unwrap_or_default();
    let event = match record.event.as_str() {
        "workflow_started" => LifecycleEvent::Started {
            run_id: record.workflow_run_id.unwrap_or_default(),
        },
        "node_started" => LifecycleEvent::NodeStarted {
            outputs: data.outputs,
        },
        "node_finished" => LifecycleEvent::NodeFinished {
            outputs: data.outputs,
        },
        "workflow_finished" => LifecycleEvent::Finished {
            outputs: data.outputs,
            error: data.error,
        },
        "error" => {
            let message = record
                .message
                .unwrap_or_else(|| "workflow stream reported an error".to_string());
            return Err(InvokeError::Upstream(message));
        }
        other => {
            tracing::trace!(event = other, "skipping unhandled stream record");
            return Ok(None);
        }
    };

    Ok(Some(event))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use futures_util::stream;
    use serde_json::json;

    use super::*;

    async fn decode_all(parts: &[&str]) -> Vec<Result<LifecycleEvent, InvokeError>> {
        decode_all_bytes(&parts.iter().map(|p| p.as_bytes()).collect::<Vec<_>>()).await
    }

    async fn decode_all_bytes(parts: &[&[u8]]) -> Vec<Result<LifecycleEvent, InvokeError>> {
        let chunks: Vec<Result<Bytes, Infallible>> = parts
            .iter()
            .map(|p| Ok(Bytes::copy_from_slice(p)))
            .collect();
        decode_lifecycle_stream(stream::iter(chunks)).collect().await
    }

    fn outputs(pairs: &[(&str, serde_json::Value)]) -> Option<JsonMap> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        )
    }

    // Non-ASCII output values so byte-offset splits land inside multi-byte
    // characters.
    const FULL_STREAM: &str = concat!(
        "data: {\"event\":\"workflow_started\",\"workflow_run_id\":\"run-1\"}\n",
        "data: {\"event\":\"node_started\"}\n",
        "data: {\"event\":\"node_finished\",\"data\":{\"outputs\":{\"agent_output\":\"café\"}}}\n",
        "data: {\"event\":\"workflow_finished\",\"data\":{\"outputs\":{\"agent_output\":\"résumé — done\"}}}\n",
    );

    fn expected_full_stream() -> Vec<LifecycleEvent> {
        vec![
            LifecycleEvent::Started {
                run_id: "run-1".to_string(),
            },
            LifecycleEvent::NodeStarted { outputs: None },
            LifecycleEvent::NodeFinished {
                outputs: outputs(&[("agent_output", json!("café"))]),
            },
            LifecycleEvent::Finished {
                outputs: outputs(&[("agent_output", json!("résumé — done"))]),
                error: None,
            },
        ]
    }

    #[tokio::test]
    async fn decodes_an_unsplit_stream() {
        let events: Vec<LifecycleEvent> = decode_all(&[FULL_STREAM])
            .await
            .into_iter()
            .map(|r| r.unwrap())
            .collect();
        assert_eq!(events, expected_full_stream());
    }

    #[tokio::test]
    async fn chunk_splits_do_not_change_the_event_sequence() {
        // Split at every byte offset, including mid-record, mid-JSON, and
        // inside a multi-byte character.
        let bytes = FULL_STREAM.as_bytes();
        for split in 1..bytes.len() {
            let (head, tail) = bytes.split_at(split);
            let events: Vec<LifecycleEvent> = decode_all_bytes(&[head, tail])
                .await
                .into_iter()
                .map(|r| r.unwrap())
                .collect();
            assert_eq!(events, expected_full_stream(), "split at byte {split}");
        }
    }

    #[tokio::test]
    async fn multibyte_character_split_across_chunks_decodes_intact() {
        // "é" is two bytes; split between them.
        let record = "data: {\"event\":\"workflow_finished\",\"data\":{\"outputs\":{\"agent_output\":\"café\"}}}\n";
        let bytes = record.as_bytes();
        let split = record.find('é').unwrap() + 1;
        assert!(!record.is_char_boundary(split));

        let (head, tail) = bytes.split_at(split);
        let events = decode_all_bytes(&[head, tail]).await;
        assert_eq!(
            events[0].as_ref().unwrap(),
            &LifecycleEvent::Finished {
                outputs: outputs(&[("agent_output", json!("café"))]),
                error: None,
            }
        );
    }

    #[tokio::test]
    async fn skips_blank_and_unprefixed_lines() {
        let events = decode_all(&[
            "\n",
            "event: ping\n",
            "   \n",
            "data: {\"event\":\"workflow_finished\",\"data\":{\"outputs\":{}}}\n",
        ])
        .await;
        assert_eq!(events.len(), 1);
        assert!(events[0].as_ref().unwrap().is_terminal());
    }

    #[tokio::test]
    async fn skips_malformed_json_and_continues() {
        let events = decode_all(&[
            "data: {not json}\n",
            "data: {\"event\":\"node_finished\",\"data\":{\"outputs\":{\"k\":1}}}\n",
            "data: {\"event\":\"workflow_finished\"}\n",
        ])
        .await;
        assert_eq!(events.len(), 2);
        assert_eq!(
            events[0].as_ref().unwrap(),
            &LifecycleEvent::NodeFinished {
                outputs: outputs(&[("k", json!(1))])
            }
        );
    }

    #[tokio::test]
    async fn skips_unrecognized_discriminators() {
        let events = decode_all(&[
            "data: {\"event\":\"text_chunk\",\"data\":{\"text\":\"...\"}}\n",
            "data: {\"event\":\"workflow_finished\"}\n",
        ])
        .await;
        assert_eq!(events.len(), 1);
    }

    #[tokio::test]
    async fn error_record_fails_the_decode() {
        let mut events = decode_all(&[
            "data: {\"event\":\"workflow_started\",\"workflow_run_id\":\"run-1\"}\n",
            "data: {\"event\":\"error\",\"message\":\"quota exceeded\"}\n",
        ])
        .await;
        assert_eq!(events.len(), 2);
        match events.pop().unwrap() {
            Err(InvokeError::Upstream(msg)) => assert_eq!(msg, "quota exceeded"),
            other => panic!("expected upstream error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn error_record_without_message_uses_default() {
        let events = decode_all(&["data: {\"event\":\"error\"}\n"]).await;
        match &events[0] {
            Err(InvokeError::Upstream(msg)) => {
                assert_eq!(msg, "workflow stream reported an error")
            }
            other => panic!("expected upstream error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn stops_consuming_after_the_terminal_record() {
        // Records after workflow_finished would fail the decode if consumed;
        // the decoder must never reach them.
        let events = decode_all(&[
            "data: {\"event\":\"workflow_finished\",\"data\":{\"outputs\":{}}}\n",
            "data: {\"event\":\"error\",\"message\":\"must not be read\"}\n",
        ])
        .await;
        assert_eq!(events.len(), 1);
        assert!(events[0].as_ref().unwrap().is_terminal());
    }

    #[tokio::test]
    async fn final_record_without_trailing_newline_is_decoded() {
        let events = decode_all(&[
            "data: {\"event\":\"workflow_finished\",\"data\":{\"outputs\":{\"done\":true}}}",
        ])
        .await;
        assert_eq!(events.len(), 1);
        assert_eq!(
            events[0].as_ref().unwrap(),
            &LifecycleEvent::Finished {
                outputs: outputs(&[("done", json!(true))]),
                error: None,
            }
        );
    }

    #[tokio::test]
    async fn finished_error_field_is_carried_on_the_event() {
        let events = decode_all(&[
            "data: {\"event\":\"workflow_finished\",\"data\":{\"error\":\"boom\"}}\n",
        ])
        .await;
        assert_eq!(
            events[0].as_ref().unwrap(),
            &LifecycleEvent::Finished {
                outputs: None,
                error: Some("boom".to_string()),
            }
        );
    }
}
