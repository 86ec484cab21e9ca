use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tokio::time::sleep;

use crate::models::generation::{JobState, ProgressUpdate, SubmissionReceipt};

/// Default delay between status checks.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10_000;

/// Default attempt budget. Together with the interval this caps a session
/// at roughly 50 minutes even if the remote queue wedges.
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 300;

const RETRYING_MESSAGE: &str = "Connection issue, retrying";

/// Client for the asynchronous image-generation job attached to a journal
/// entry: submits the job, then polls its status until a terminal state or
/// the attempt budget runs out.
pub struct GenerationClient {
    http: Client,
    base_url: String,
    policy: PollPolicy,
}

/// Cadence and budget for one polling session.
#[derive(Debug, Clone)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            max_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
        }
    }
}

/// Errors surfaced to callers of the generation client. Retryable status
/// failures never appear here; the polling loop absorbs them.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The generation request was not accepted (transport failure or
    /// non-success response, distinguished by message content).
    #[error("image generation request failed: {0}")]
    Submission(String),

    /// The attempt budget ran out before the job reached a terminal state.
    #[error("image generation did not finish after {attempts} status checks")]
    TimedOut { attempts: u32 },

    /// The caller's cancellation check reported true.
    #[error("image generation polling cancelled")]
    Cancelled,
}

/// State owned by a single polling session; discarded when the loop returns.
struct PollSession {
    attempt: u32,
    last_known_position: u32,
}

#[derive(Deserialize)]
struct QueueStatusBody {
    #[serde(rename = "queuePosition", default)]
    queue_position: u32,
}

#[derive(Deserialize)]
struct CompletedBody {
    #[serde(rename = "imageUrl", alias = "image_url")]
    image_url: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl GenerationClient {
    pub fn new(base_url: &str) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    /// Reuse an existing [`reqwest::Client`] (shares the connection pool
    /// with other services talking to the same server).
    pub fn with_client(http: Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            policy: PollPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Ask the server to enqueue a generation job for the entry.
    ///
    /// Issues exactly one request and never retries; repeated calls may
    /// enqueue duplicate jobs (the server owns deduplication). The receipt
    /// carries the queue position at submission time, 0 meaning the job
    /// runs next.
    pub async fn start_generation(
        &self,
        entry_id: u64,
    ) -> Result<SubmissionReceipt, GenerationError> {
        let url = format!("{}/api/entries/{}/generate-image", self.base_url, entry_id);
        tracing::info!(entry_id, "Requesting image generation");

        let response = self
            .http
            .post(&url)
            .send()
            .await
            .map_err(|e| GenerationError::Submission(format!("request failed: {e}")))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| GenerationError::Submission(format!("failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(GenerationError::Submission(error_message(&body, status)));
        }

        let receipt: SubmissionReceipt = serde_json::from_slice(&body)
            .map_err(|e| GenerationError::Submission(format!("unparseable response: {e}")))?;

        tracing::info!(
            entry_id,
            queue_position = receipt.queue_position,
            "Generation job accepted"
        );
        Ok(receipt)
    }

    /// Issue a single status check and totalize the outcome into a
    /// [`JobState`]. Never retries internally; retry policy belongs to the
    /// polling loop, so even transport failures come back as a state.
    pub async fn probe(&self, entry_id: u64) -> JobState {
        let url = format!("{}/api/entries/{}/status", self.base_url, entry_id);

        let response = match self.http.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                return JobState::Failed {
                    message: format!("status request failed: {e}"),
                    retryable: true,
                }
            }
        };

        let status = response.status();
        let body = match response.bytes().await {
            Ok(b) => b,
            Err(e) => {
                return JobState::Failed {
                    message: format!("failed to read status body: {e}"),
                    retryable: true,
                }
            }
        };

        classify_status(status, &body)
    }

    /// Submit the job and poll it to completion, the way an interactive
    /// caller drives the two. Progress updates start flowing as soon as the
    /// submission receipt arrives.
    pub async fn generate<F>(
        &self,
        entry_id: u64,
        on_progress: F,
    ) -> Result<JobState, GenerationError>
    where
        F: FnMut(ProgressUpdate),
    {
        let receipt = self.start_generation(entry_id).await?;
        self.poll_until_done(entry_id, receipt.queue_position, on_progress)
            .await
    }

    /// Poll the job at the configured cadence until it reaches a terminal
    /// state or the attempt budget is exhausted.
    ///
    /// The returned state is always terminal: `Succeeded`, `NotStarted`, or
    /// a non-retryable `Failed`. Retryable failures are reported through
    /// `on_progress` (with the last known queue position) and count against
    /// the same budget as ordinary polls, so a flaky network cannot extend
    /// the session past the normal ceiling. `on_progress` is never invoked
    /// once a terminal outcome has been decided.
    pub async fn poll_until_done<F>(
        &self,
        entry_id: u64,
        initial_position: u32,
        on_progress: F,
    ) -> Result<JobState, GenerationError>
    where
        F: FnMut(ProgressUpdate),
    {
        self.poll_until_done_with_cancel(entry_id, initial_position, on_progress, || false)
            .await
    }

    /// Like [`poll_until_done`](Self::poll_until_done), with a best-effort
    /// cancellation check consulted before each continuation of the loop.
    pub async fn poll_until_done_with_cancel<F, C>(
        &self,
        entry_id: u64,
        initial_position: u32,
        mut on_progress: F,
        cancelled: C,
    ) -> Result<JobState, GenerationError>
    where
        F: FnMut(ProgressUpdate),
        C: Fn() -> bool,
    {
        let mut session = PollSession {
            attempt: 0,
            last_known_position: initial_position,
        };

        on_progress(ProgressUpdate {
            position: Some(initial_position),
            message: progress_message(initial_position),
        });

        while session.attempt < self.policy.max_attempts {
            if cancelled() {
                tracing::debug!(entry_id, attempt = session.attempt, "Polling cancelled");
                return Err(GenerationError::Cancelled);
            }

            sleep(self.policy.interval).await;

            let state = self.probe(entry_id).await;
            session.attempt += 1;
            tracing::debug!(entry_id, attempt = session.attempt, state = ?state, "Status check");

            match state {
                JobState::Queued { position } => {
                    session.last_known_position = position;
                    on_progress(ProgressUpdate {
                        position: Some(position),
                        message: progress_message(position),
                    });
                }
                JobState::Running => {
                    session.last_known_position = 0;
                    on_progress(ProgressUpdate {
                        position: Some(0),
                        message: progress_message(0),
                    });
                }
                JobState::Failed {
                    ref message,
                    retryable: true,
                } => {
                    tracing::warn!(
                        entry_id,
                        attempt = session.attempt,
                        error = %message,
                        "Transient status check failure, will retry"
                    );
                    on_progress(ProgressUpdate {
                        position: Some(session.last_known_position),
                        message: RETRYING_MESSAGE.to_string(),
                    });
                }
                terminal => return Ok(terminal),
            }
        }

        Err(GenerationError::TimedOut {
            attempts: session.attempt,
        })
    }
}

/// Map one observed status response onto a [`JobState`].
///
/// A 200 without a usable image URL and an unparseable 202 body are treated
/// as non-retryable: the server answered, the payload is wrong. Only 5xx
/// responses (and, in [`GenerationClient::probe`], transport errors) are
/// retryable.
fn classify_status(status: StatusCode, body: &[u8]) -> JobState {
    match status {
        StatusCode::OK => match serde_json::from_slice::<CompletedBody>(body) {
            Ok(CompletedBody {
                image_url: Some(url),
            }) if !url.is_empty() => JobState::Succeeded { image_url: url },
            _ => JobState::Failed {
                message: "completed response missing image URL".to_string(),
                retryable: false,
            },
        },
        StatusCode::ACCEPTED => match serde_json::from_slice::<QueueStatusBody>(body) {
            Ok(QueueStatusBody { queue_position: 0 }) => JobState::Running,
            Ok(QueueStatusBody { queue_position }) => JobState::Queued {
                position: queue_position,
            },
            Err(e) => JobState::Failed {
                message: format!("unparseable status body: {e}"),
                retryable: false,
            },
        },
        StatusCode::NO_CONTENT => JobState::NotStarted,
        other => JobState::Failed {
            message: error_message(body, other),
            retryable: other.is_server_error(),
        },
    }
}

/// Extract a human-readable message from an error response body, preferring
/// the JSON `message` field and falling back to the raw text.
fn error_message(body: &[u8], status: StatusCode) -> String {
    if let Ok(parsed) = serde_json::from_slice::<ErrorBody>(body) {
        return parsed.message;
    }
    let text = String::from_utf8_lossy(body);
    if text.trim().is_empty() {
        format!("unexpected status {status}")
    } else {
        text.into_owned()
    }
}

fn progress_message(position: u32) -> String {
    if position == 0 {
        "Image generation in progress".to_string()
    } else {
        format!("Waiting in queue at position {position}")
    }
}
