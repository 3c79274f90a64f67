//! Conversation state machine: submit → generate (streaming) →
//! stop / regenerate → reset.
//!
//! The raw log and phase live behind one short-held mutex shared with the
//! generation task. Each generation runs in its own tokio task and relays
//! display text through a bounded channel; when it ends it commits the raw
//! text back to the turn that was pending when it started.

use crate::cancel::CancelToken;
use crate::compactor::HistoryCompactor;
use crate::presentation;
use futures_util::StreamExt;
use parking_lot::Mutex;
use pl_domain::error::{Error, Result};
use pl_domain::stream::BoxStream;
use pl_domain::trace::TraceEvent;
use pl_domain::turn::{last_text_index, Completion, History, InputPart, RawTurn, Response};
use pl_providers::traits::{DocumentLoader, GenerationBackend};
use pl_retrieval::{DocumentStore, PromptAugmentor};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::Instrument;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// State
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Generating,
    /// Stop requested; the generation task has not committed yet.
    Cancelling,
}

#[derive(Debug)]
struct SessionState {
    phase: Phase,
    raw_log: Vec<RawTurn>,
    cancel: Option<CancelToken>,
}

impl SessionState {
    fn request_stop(&mut self) -> bool {
        if self.phase != Phase::Generating {
            return false;
        }
        if let Some(token) = &self.cancel {
            token.cancel();
        }
        self.phase = Phase::Cancelling;
        true
    }

    fn finish(&mut self) {
        self.phase = Phase::Idle;
        self.cancel = None;
    }
}

/// Cloneable handle that can stop the session's running generation from any
/// task or thread.
#[derive(Clone)]
pub struct StopHandle {
    state: Arc<Mutex<SessionState>>,
}

impl StopHandle {
    /// Request cancellation. Returns `false` when nothing was running.
    pub fn stop(&self) -> bool {
        self.state.lock().request_stop()
    }
}

/// Retrieval wiring for augmented generations.
pub struct RetrievalContext {
    pub store: Arc<DocumentStore>,
    pub augmentor: PromptAugmentor,
    pub top_k: usize,
}

/// Work captured under the lock at the start of a generation.
struct PreparedTurn {
    target: usize,
    query: String,
    history: History,
    cancel: CancelToken,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// GenerationSession
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct GenerationSession {
    id: String,
    backend: Arc<dyn GenerationBackend>,
    compactor: HistoryCompactor,
    retrieval: Option<RetrievalContext>,
    state: Arc<Mutex<SessionState>>,
    channel_capacity: usize,
}

impl GenerationSession {
    pub fn new(backend: Arc<dyn GenerationBackend>, loader: Arc<dyn DocumentLoader>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            backend,
            compactor: HistoryCompactor::new(loader),
            retrieval: None,
            state: Arc::new(Mutex::new(SessionState {
                phase: Phase::Idle,
                raw_log: Vec::new(),
                cancel: None,
            })),
            channel_capacity: 64,
        }
    }

    pub fn with_retrieval(mut self, retrieval: RetrievalContext) -> Self {
        self.retrieval = Some(retrieval);
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn phase(&self) -> Phase {
        self.state.lock().phase
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            state: self.state.clone(),
        }
    }

    /// Copy of the raw interaction log.
    pub fn snapshot(&self) -> Vec<RawTurn> {
        self.state.lock().raw_log.clone()
    }

    /// Replace the raw interaction log. Only allowed while idle.
    pub fn restore(&self, log: Vec<RawTurn>) -> Result<()> {
        let mut st = self.state.lock();
        if st.phase != Phase::Idle {
            return Err(Error::InvalidState("cannot restore while generating".into()));
        }
        st.raw_log = log;
        Ok(())
    }

    // ── Mutations ─────────────────────────────────────────────────

    /// Append one submission: an attachment turn per path, then the text turn.
    ///
    /// Allowed in any phase. A submission made while generating waits in the
    /// log until the caller starts the next generation.
    pub fn submit(&self, text: &str, attachments: &[PathBuf]) -> Result<()> {
        if text.trim().is_empty() {
            return Err(Error::InvalidArgument("message text is empty".into()));
        }
        let mut st = self.state.lock();
        for path in attachments {
            st.raw_log.push(RawTurn::attachment(path.clone()));
        }
        st.raw_log.push(RawTurn::text(text));
        tracing::debug!(
            session_id = %self.id,
            attachments = attachments.len(),
            queued = st.phase != Phase::Idle,
            "message submitted"
        );
        Ok(())
    }

    /// Request cancellation of the running generation. No-op when idle.
    pub fn stop(&self) -> bool {
        self.state.lock().request_stop()
    }

    /// Clear the log. Rejected while a generation is running or cancelling.
    pub fn reset(&self) -> Result<()> {
        let mut st = self.state.lock();
        if st.phase != Phase::Idle {
            return Err(Error::InvalidState(
                "cannot reset while a generation is in flight; stop it first".into(),
            ));
        }
        let dropped = st.raw_log.len();
        st.raw_log.clear();
        drop(st);

        TraceEvent::SessionReset {
            session_id: self.id.clone(),
            dropped_turns: dropped,
        }
        .emit();
        Ok(())
    }

    // ── Generation ────────────────────────────────────────────────

    /// Start streaming a response to the pending text turn.
    ///
    /// Each stream item is the full display text so far. A backend failure
    /// arrives as the final `Err` item, after the partial text has been
    /// committed as [`Completion::Failed`]. When the stream ends the session
    /// is already back to [`Phase::Idle`].
    pub async fn generate(&self) -> Result<BoxStream<'static, Result<String>>> {
        let prepared = self.prepare().await?;
        Ok(self.spawn_generation(prepared))
    }

    /// Roll back the last response and generate it again.
    ///
    /// Returns `Ok(None)` when there is nothing to roll back.
    pub async fn regenerate(&self) -> Result<Option<BoxStream<'static, Result<String>>>> {
        {
            let mut st = self.state.lock();
            if st.phase != Phase::Idle {
                return Err(Error::InvalidState("cannot regenerate while generating".into()));
            }
            let Some(last) = last_text_index(&st.raw_log) else {
                return Ok(None);
            };
            if st.raw_log[last].response.is_none() {
                return Ok(None);
            }
            st.raw_log.truncate(last + 1);
            let turn = &mut st.raw_log[last];
            turn.response = None;
            turn.completion = None;
            tracing::debug!(session_id = %self.id, turn = last, "last response rolled back");
        }
        self.generate().await.map(Some)
    }

    /// Non-streaming generation; commits and returns the full response.
    pub async fn respond(&self) -> Result<String> {
        let prepared = self.prepare().await?;
        let span = tracing::info_span!("generation", session_id = %self.id, turn = prepared.target);
        let backend = self.backend.clone();
        let state = self.state.clone();
        let session_id = self.id.clone();

        async move {
            let start = Instant::now();
            emit_started(&session_id, backend.backend_id(), &prepared);

            let (text, completion, failure) =
                match backend.chat(&prepared.query, &prepared.history).await {
                    Ok(reply) => (reply.response, Completion::Finished, None),
                    Err(e) => (
                        String::new(),
                        Completion::Failed,
                        Some(e.into_backend(backend.backend_id())),
                    ),
                };
            let artifact = annotate(&*backend, &prepared, &text, completion).await;
            commit(&state, prepared.target, &text, completion, artifact);
            emit_finished(&session_id, completion, &text, 1, start);

            match failure {
                Some(e) => Err(e),
                None => Ok(text),
            }
        }
        .instrument(span)
        .await
    }

    /// Claim the session for a generation and build the backend input.
    ///
    /// On any error the phase is restored to idle and the log is untouched.
    async fn prepare(&self) -> Result<PreparedTurn> {
        let (target, log, cancel) = {
            let mut st = self.state.lock();
            if st.phase != Phase::Idle {
                return Err(Error::InvalidState("a generation is already running".into()));
            }
            let target = last_text_index(&st.raw_log)
                .filter(|&i| st.raw_log[i].is_pending())
                .ok_or_else(|| Error::InvalidState("no pending message to respond to".into()))?;
            let cancel = CancelToken::new();
            st.phase = Phase::Generating;
            st.cancel = Some(cancel.clone());
            (target, st.raw_log[..=target].to_vec(), cancel)
        };

        match self.build_input(&log, target).await {
            Ok((query, history)) => Ok(PreparedTurn {
                target,
                query,
                history,
                cancel,
            }),
            Err(e) => {
                self.state.lock().finish();
                Err(e)
            }
        }
    }

    async fn build_input(&self, log: &[RawTurn], target: usize) -> Result<(String, History)> {
        let (query, history) = self.compactor.compact(log).await?;

        let Some(retrieval) = &self.retrieval else {
            return Ok((query, history));
        };
        let user_text = log[target]
            .input
            .as_ref()
            .and_then(InputPart::as_text)
            .unwrap_or_default();
        let chunks = retrieval.store.retrieve(user_text, retrieval.top_k).await?;
        let prompt = retrieval.augmentor.augment_with(&query, &chunks);
        TraceEvent::PromptAugmented {
            chunks: chunks.len(),
            prompt_chars: prompt.chars().count(),
        }
        .emit();
        Ok((prompt, history))
    }

    fn spawn_generation(&self, prepared: PreparedTurn) -> BoxStream<'static, Result<String>> {
        let (tx, mut rx) = mpsc::channel::<Result<String>>(self.channel_capacity);
        let backend = self.backend.clone();
        let state = self.state.clone();
        let session_id = self.id.clone();

        let span = tracing::info_span!("generation", session_id = %session_id, turn = prepared.target);
        tokio::spawn(
            async move {
                let start = Instant::now();
                let mode = backend.stream_mode();
                emit_started(&session_id, backend.backend_id(), &prepared);

                let mut raw = String::new();
                let mut chunks = 0usize;
                let mut completion = Completion::Finished;
                let mut failure: Option<Error> = None;

                if prepared.cancel.is_cancelled() {
                    completion = Completion::Stopped;
                } else {
                    match backend.chat_stream(&prepared.query, &prepared.history).await {
                        Ok(mut stream) => {
                            while let Some(item) = stream.next().await {
                                if prepared.cancel.is_cancelled() {
                                    completion = Completion::Stopped;
                                    break;
                                }
                                match item {
                                    Ok(chunk) => {
                                        mode.fold(&mut raw, &chunk);
                                        chunks += 1;
                                        let shown = presentation::present(&raw);
                                        if tx.send(Ok(shown)).await.is_err() {
                                            tracing::debug!("consumer dropped the stream");
                                            completion = Completion::Stopped;
                                            break;
                                        }
                                    }
                                    Err(e) => {
                                        tracing::warn!(error = %e, "backend failed mid-stream");
                                        completion = Completion::Failed;
                                        failure = Some(e.into_backend(backend.backend_id()));
                                        break;
                                    }
                                }
                            }
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "backend stream could not be opened");
                            completion = Completion::Failed;
                            failure = Some(e.into_backend(backend.backend_id()));
                        }
                    }
                }

                let artifact = annotate(&*backend, &prepared, &raw, completion).await;
                commit(&state, prepared.target, &raw, completion, artifact);
                emit_finished(&session_id, completion, &raw, chunks, start);

                if let Some(e) = failure {
                    let _ = tx.send(Err(e)).await;
                }
            }
            .instrument(span),
        );

        Box::pin(async_stream::stream! {
            while let Some(item) = rx.recv().await {
                yield item;
            }
        })
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Helpers
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Ask the backend for an artifact, passing the history with the finished
/// pair appended. Failed generations and annotation errors yield none.
async fn annotate(
    backend: &dyn GenerationBackend,
    prepared: &PreparedTurn,
    response: &str,
    completion: Completion,
) -> Option<PathBuf> {
    if completion == Completion::Failed {
        return None;
    }
    let mut history = prepared.history.clone();
    history.push((prepared.query.clone(), response.to_string()));
    match backend.draw_annotation(response, &history).await {
        Ok(path) => path,
        Err(e) => {
            tracing::warn!(error = %e, "annotation failed, skipping artifact");
            None
        }
    }
}

/// Write the response into the target turn, place any artifact right after
/// it, and return the session to idle.
fn commit(
    state: &Mutex<SessionState>,
    target: usize,
    text: &str,
    completion: Completion,
    artifact: Option<PathBuf>,
) {
    let mut guard = state.lock();
    let st = &mut *guard;
    let committed = match st.raw_log.get_mut(target) {
        Some(turn) if turn.is_pending() => {
            turn.response = Some(Response::text(text));
            turn.completion = Some(completion);
            true
        }
        _ => false,
    };
    if committed {
        if let Some(path) = artifact {
            st.raw_log.insert(target + 1, RawTurn::artifact(path));
        }
    } else {
        tracing::warn!(turn = target, "target turn changed during generation, dropping result");
    }
    st.finish();
}

fn emit_started(session_id: &str, backend: &str, prepared: &PreparedTurn) {
    TraceEvent::GenerationStarted {
        session_id: session_id.to_string(),
        backend: backend.to_string(),
        history_pairs: prepared.history.len(),
        query_chars: prepared.query.chars().count(),
    }
    .emit();
}

fn emit_finished(session_id: &str, completion: Completion, text: &str, chunks: usize, start: Instant) {
    TraceEvent::GenerationFinished {
        session_id: session_id.to_string(),
        completion: format!("{completion:?}").to_lowercase(),
        response_chars: text.chars().count(),
        chunks,
        duration_ms: start.elapsed().as_millis() as u64,
    }
    .emit();
}

/// Display path for an artifact turn, used by front-ends when listing the log.
pub fn artifact_path(turn: &RawTurn) -> Option<&Path> {
    match &turn.response {
        Some(Response::Artifact(path)) if turn.is_artifact() => Some(path.as_path()),
        _ => None,
    }
}
