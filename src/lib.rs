pub mod config;
pub mod controller;
pub mod error;
pub mod gemini;
pub mod intent;
pub mod logging;
pub mod markdown;
pub mod protocol;
pub mod router;
pub mod session;
pub mod transport;
pub mod workspace;

// Re-export main types for convenience
pub use config::Config;
pub use controller::Controller;
pub use error::HostError;
pub use gemini::GeminiClient;
pub use protocol::{Command, HostMessage, InlineImage};
pub use router::Router;
pub use session::{ChatMessage, ChatRole};
pub use workspace::{EditorView, OpenEditors, Workspace};
