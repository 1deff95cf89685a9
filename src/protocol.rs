//! Message vocabulary shared by the chat panel and the host router.
//!
//! Commands flow panel -> host and are tagged by `command`; results flow
//! host -> panel and are tagged by `type`. Field names are camelCase on the
//! wire. `requestId` is optional in both directions: the router echoes
//! whatever it receives so the panel can correlate replies.

use serde::{Deserialize, Serialize};

pub type RequestId = u64;

/// An image attached to a prompt, already base64 encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InlineImage {
    pub mime_type: String,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum Command {
    #[serde(rename_all = "camelCase")]
    RequestContext {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<RequestId>,
    },
    #[serde(rename_all = "camelCase")]
    GetWorkspaceFiles {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<RequestId>,
    },
    #[serde(rename_all = "camelCase")]
    GetFileContent {
        file_path: String,
        original_prompt: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<RequestId>,
    },
    #[serde(rename_all = "camelCase")]
    GeminiPrompt {
        prompt: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        image: Option<InlineImage>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<RequestId>,
    },
    #[serde(rename_all = "camelCase")]
    ApplyCodeEdit {
        file_name: String,
        new_code: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<RequestId>,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::RequestContext { .. } => "requestContext",
            Command::GetWorkspaceFiles { .. } => "getWorkspaceFiles",
            Command::GetFileContent { .. } => "getFileContent",
            Command::GeminiPrompt { .. } => "geminiPrompt",
            Command::ApplyCodeEdit { .. } => "applyCodeEdit",
        }
    }

    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            Command::RequestContext { request_id }
            | Command::GetWorkspaceFiles { request_id }
            | Command::GetFileContent { request_id, .. }
            | Command::GeminiPrompt { request_id, .. }
            | Command::ApplyCodeEdit { request_id, .. } => *request_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HostMessage {
    #[serde(rename_all = "camelCase")]
    Context {
        file_name: Option<String>,
        file_content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<RequestId>,
    },
    #[serde(rename_all = "camelCase")]
    WorkspaceFiles {
        files: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<RequestId>,
    },
    #[serde(rename_all = "camelCase")]
    FileContent {
        file_name: String,
        file_content: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        original_prompt: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<RequestId>,
    },
    #[serde(rename_all = "camelCase")]
    GeminiReply {
        reply: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        request_id: Option<RequestId>,
    },
}

impl HostMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            HostMessage::Context { .. } => "context",
            HostMessage::WorkspaceFiles { .. } => "workspaceFiles",
            HostMessage::FileContent { .. } => "fileContent",
            HostMessage::GeminiReply { .. } => "geminiReply",
        }
    }

    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            HostMessage::Context { request_id, .. }
            | HostMessage::WorkspaceFiles { request_id, .. }
            | HostMessage::FileContent { request_id, .. }
            | HostMessage::GeminiReply { request_id, .. } => *request_id,
        }
    }

    pub fn reply(reply: impl Into<String>, request_id: Option<RequestId>) -> Self {
        HostMessage::GeminiReply {
            reply: reply.into(),
            request_id,
        }
    }
}
