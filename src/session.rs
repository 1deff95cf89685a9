//! Conversation state owned by the chat panel.
//!
//! The transcript is append-only except for the placeholder standing in for an
//! in-flight reply, which is replaced in place when the reply lands. The
//! single-use flags live here too, each with a documented lifetime.

use serde::{Deserialize, Serialize};

use crate::protocol::InlineImage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatRole {
    User,
    Assistant,
}

/// What an in-flight reply is currently waiting on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PendingStage {
    Thinking,
    ReadingFile(String),
    ProcessingFile(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageStatus {
    Complete,
    Pending(PendingStage),
}

/// A chat message in the conversation. A pending message is the placeholder
/// sentinel; its `content` is empty and never shown as text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    pub status: MessageStatus,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            status: MessageStatus::Complete,
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            status: MessageStatus::Complete,
        }
    }

    pub fn placeholder() -> Self {
        Self {
            role: ChatRole::Assistant,
            content: String::new(),
            status: MessageStatus::Pending(PendingStage::Thinking),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self.status, MessageStatus::Pending(_))
    }

    pub fn pending_stage(&self) -> Option<&PendingStage> {
        match &self.status {
            MessageStatus::Pending(stage) => Some(stage),
            MessageStatus::Complete => None,
        }
    }
}

/// Snapshot of the editor at panel-open time. `file_name == None` means there
/// was nothing usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceFileContext {
    pub file_name: Option<String>,
    pub file_content: String,
}

impl WorkspaceFileContext {
    pub fn is_usable(&self) -> bool {
        self.file_name.is_some() && !self.file_content.trim().is_empty()
    }
}

/// A user turn waiting on a file read before the model is prompted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFileReference {
    pub file_path: String,
    pub original_prompt: String,
    pub image: Option<InlineImage>,
}

/// A (file, code) pair parsed out of a model reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEditIntent {
    pub file_name: String,
    pub new_code: String,
}

/// Everything the panel remembers for one chat session. Dropped with the panel.
#[derive(Debug, Default)]
pub struct Session {
    transcript: Vec<ChatMessage>,

    /// Editor snapshot offered for a summary. Consumed by the next user input.
    context: Option<WorkspaceFileContext>,
    /// Whether the next user input is checked for "yes"/"no". Disarmed by the
    /// next user input whatever it says.
    context_armed: bool,

    /// The most recent `@path` the user mentioned.
    last_referenced_file: Option<String>,
    /// Set by a turn that mentions a file; valid for exactly one reply.
    edit_expected: bool,

    follow_ups: Vec<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.transcript.push(message);
    }

    pub fn has_placeholder(&self) -> bool {
        self.transcript.iter().any(ChatMessage::is_placeholder)
    }

    fn last_placeholder_mut(&mut self) -> Option<&mut ChatMessage> {
        self.transcript.iter_mut().rev().find(|m| m.is_placeholder())
    }

    /// Replace the most recent placeholder with `content`, or append it as a
    /// new assistant message when no placeholder is left.
    pub fn resolve_placeholder(&mut self, content: impl Into<String>) {
        let content = content.into();
        match self.last_placeholder_mut() {
            Some(message) => {
                message.content = content;
                message.status = MessageStatus::Complete;
            }
            None => self.transcript.push(ChatMessage::assistant(content)),
        }
    }

    pub fn set_placeholder_stage(&mut self, stage: PendingStage) {
        if let Some(message) = self.last_placeholder_mut() {
            message.status = MessageStatus::Pending(stage);
        }
    }

    pub fn clear_transcript(&mut self) {
        self.transcript.clear();
        self.follow_ups.clear();
    }

    pub fn arm_context(&mut self, context: WorkspaceFileContext) {
        self.context = Some(context);
        self.context_armed = true;
    }

    pub fn clear_context(&mut self) {
        self.context = None;
        self.context_armed = false;
    }

    pub fn context_armed(&self) -> bool {
        self.context_armed
    }

    /// Disarm and hand back the stored context, if the flag was armed.
    pub fn take_armed_context(&mut self) -> Option<WorkspaceFileContext> {
        if !std::mem::replace(&mut self.context_armed, false) {
            return None;
        }
        self.context.take()
    }

    pub fn expect_edit_for(&mut self, file_path: &str) {
        self.last_referenced_file = Some(file_path.to_string());
        self.edit_expected = true;
    }

    pub fn edit_expected(&self) -> bool {
        self.edit_expected
    }

    /// The file a code block without a named target should go to, if an edit
    /// is still expected.
    pub fn edit_fallback_file(&self) -> Option<&str> {
        if self.edit_expected {
            self.last_referenced_file.as_deref()
        } else {
            None
        }
    }

    pub fn last_referenced_file(&self) -> Option<&str> {
        self.last_referenced_file.as_deref()
    }

    pub fn disarm_edit(&mut self) {
        self.edit_expected = false;
    }

    pub fn follow_ups(&self) -> &[String] {
        &self.follow_ups
    }

    pub fn set_follow_ups(&mut self, follow_ups: Vec<String>) {
        self.follow_ups = follow_ups;
    }

    pub fn clear_follow_ups(&mut self) {
        self.follow_ups.clear();
    }
}
