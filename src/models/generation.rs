use serde::Deserialize;

/// Observed state of the remote image-generation job for one entry.
///
/// Produced by a single status check; the polling loop decides whether a
/// state ends the session. `NotStarted` is deliberately distinct from
/// `Failed`: the server answering "nothing in progress" is not an error.
#[derive(Debug, Clone, PartialEq)]
pub enum JobState {
    /// Accepted but not yet running; position is 1-based within the queue.
    Queued { position: u32 },
    /// Actively processing (the server reports queue position 0 for this).
    Running,
    /// Finished; the illustration is available at the given URL.
    Succeeded { image_url: String },
    /// No generation job exists for the entry.
    NotStarted,
    /// The status check failed. Retryable failures (transport errors,
    /// server-side 5xx) are absorbed by the polling loop; the rest end it.
    Failed { message: String, retryable: bool },
}

impl JobState {
    /// Whether polling stops on this state.
    pub fn is_terminal(&self) -> bool {
        match self {
            JobState::Queued { .. } | JobState::Running => false,
            JobState::Failed { retryable, .. } => !retryable,
            JobState::Succeeded { .. } | JobState::NotStarted => true,
        }
    }
}

/// Receipt returned when the server accepts a generation request.
///
/// The server omits `queuePosition` when it is zero, so it defaults here.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmissionReceipt {
    #[serde(rename = "queuePosition", default)]
    pub queue_position: u32,
    #[serde(default)]
    pub message: String,
}

/// Display-oriented payload handed to the progress sink while polling.
///
/// Not a transition log: callers may coalesce or skip updates freely.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    pub position: Option<u32>,
    pub message: String,
}
