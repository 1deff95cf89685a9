use thiserror::Error;

/// Failures detected on the host side. None of these cross the boundary as
/// errors; the router renders them into result messages.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("❌ No workspace is open ({operation} needs a workspace folder).")]
    NoWorkspace { operation: &'static str },

    #[error("❌ Could not read file: {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("❌ Failed to write to `{path}`: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("❌ Could not list workspace files: {0}")]
    Listing(String),

    #[error("❌ Gemini API key not configured. Set GEMINI_API_KEY or add api_key to the config file.")]
    MissingApiKey,

    #[error("❌ Gemini API request failed: {0}")]
    Transport(String),

    #[error("⏱️ Gemini API request timed out after {0}s.")]
    Timeout(u64),

    #[error("❌ Gemini API returned malformed JSON:\n{raw}")]
    MalformedJson { raw: String },
}

impl HostError {
    pub fn transport(err: &reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            return HostError::Timeout(timeout_secs);
        }
        let message = err.to_string();
        if message.trim().is_empty() {
            HostError::Transport("Unknown error".to_string())
        } else {
            HostError::Transport(message)
        }
    }
}
