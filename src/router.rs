//! Host Command Router.
//!
//! Every inbound command produces exactly one result message. The router keeps
//! no conversation state; its collaborators are fixed at construction and all
//! per-request data travels in the command itself.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::HostError;
use crate::gemini::GeminiClient;
use crate::protocol::{Command, HostMessage, InlineImage, RequestId};
use crate::transport::HostEndpoint;
use crate::workspace::{EditorView, Workspace};

pub struct Router {
    workspace: Workspace,
    editors: Arc<dyn EditorView>,
    gemini: Option<GeminiClient>,
}

impl Router {
    pub fn new(
        workspace: Workspace,
        editors: Box<dyn EditorView>,
        gemini: Option<GeminiClient>,
    ) -> Self {
        Self {
            workspace,
            editors: Arc::from(editors),
            gemini,
        }
    }

    pub async fn dispatch(&self, command: Command) -> HostMessage {
        debug!("dispatching {}", command.name());

        match command {
            Command::RequestContext { request_id } => {
                self.handle_request_context(request_id).await
            }
            Command::GetWorkspaceFiles { request_id } => {
                self.handle_workspace_files(request_id).await
            }
            Command::GetFileContent {
                file_path,
                original_prompt,
                request_id,
            } => {
                self.handle_file_content(file_path, original_prompt, request_id)
                    .await
            }
            Command::GeminiPrompt {
                prompt,
                image,
                request_id,
            } => self.handle_prompt(&prompt, image.as_ref(), request_id).await,
            Command::ApplyCodeEdit {
                file_name,
                new_code,
                request_id,
            } => self.handle_code_edit(&file_name, &new_code, request_id).await,
        }
    }

    async fn handle_request_context(&self, request_id: Option<RequestId>) -> HostMessage {
        // Editor snapshots may touch the disk
        let editors = Arc::clone(&self.editors);
        let active = tokio::task::spawn_blocking(move || editors.active_context())
            .await
            .unwrap_or_else(|e| {
                warn!("requestContext snapshot failed: {}", e);
                None
            });

        match active {
            Some(doc) => HostMessage::Context {
                file_name: Some(doc.file_name),
                file_content: doc.text,
                request_id,
            },
            None => HostMessage::Context {
                file_name: None,
                file_content: String::new(),
                request_id,
            },
        }
    }

    async fn handle_workspace_files(&self, request_id: Option<RequestId>) -> HostMessage {
        match self.workspace.list_files().await {
            Ok(files) => HostMessage::WorkspaceFiles {
                files,
                error: None,
                request_id,
            },
            Err(e) => HostMessage::WorkspaceFiles {
                files: Vec::new(),
                error: Some(e.to_string()),
                request_id,
            },
        }
    }

    async fn handle_file_content(
        &self,
        file_path: String,
        original_prompt: String,
        request_id: Option<RequestId>,
    ) -> HostMessage {
        match self.workspace.read_text(&file_path).await {
            Ok(text) => HostMessage::FileContent {
                file_name: file_path,
                file_content: Some(text),
                error: None,
                original_prompt,
                request_id,
            },
            Err(e) => {
                warn!("getFileContent failed for {}: {:?}", file_path, e);
                HostMessage::FileContent {
                    file_name: file_path,
                    file_content: None,
                    error: Some(e.to_string()),
                    original_prompt,
                    request_id,
                }
            }
        }
    }

    async fn handle_prompt(
        &self,
        prompt: &str,
        image: Option<&InlineImage>,
        request_id: Option<RequestId>,
    ) -> HostMessage {
        let Some(gemini) = &self.gemini else {
            return HostMessage::reply(HostError::MissingApiKey.to_string(), request_id);
        };

        let reply = match gemini.generate(prompt, image).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("geminiPrompt failed: {:?}", e);
                e.to_string()
            }
        };
        HostMessage::reply(reply, request_id)
    }

    async fn handle_code_edit(
        &self,
        file_name: &str,
        new_code: &str,
        request_id: Option<RequestId>,
    ) -> HostMessage {
        // Overwrites without asking; see DESIGN.md.
        match self.workspace.write_text(file_name, new_code).await {
            Ok(path) => {
                warn!("overwrote {} ({} bytes)", path.display(), new_code.len());
                HostMessage::reply(format!("✅ Successfully updated `{}`.", file_name), request_id)
            }
            Err(e) => HostMessage::reply(e.to_string(), request_id),
        }
    }
}

/// Serve commands until the panel goes away. Each command runs as its own
/// task, so a slow model call does not hold up file reads.
pub async fn serve(router: Arc<Router>, endpoint: HostEndpoint) {
    let (poster, mut inbox) = endpoint.split();
    info!("host router ready");

    while let Some(command) = inbox.recv().await {
        let router = Arc::clone(&router);
        let poster = poster.clone();
        tokio::spawn(async move {
            let result = router.dispatch(command).await;
            if !poster.post(&result) {
                debug!("panel closed before {} result was delivered", result.kind());
            }
        });
    }

    info!("host router stopped");
}
