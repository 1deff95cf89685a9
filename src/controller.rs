//! Conversation Controller.
//!
//! Turns user input into outbound commands and host results into transcript
//! changes. It never performs I/O itself: every operation returns the commands
//! the caller must post to the host.
//!
//! Correlation: each command carries a fresh `requestId` and the controller
//! remembers what it was for. Results that come back without an id are
//! matched by their `type` alone. Results whose id was retired (a timed-out
//! turn, a superseded follow-up request) are appended or dropped, never
//! allowed to overwrite a newer turn's placeholder.

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::intent::{extract_edit_intent, parse_file_mention, parse_follow_ups};
use crate::protocol::{Command, HostMessage, InlineImage, RequestId};
use crate::session::{
    ChatMessage, PendingFileReference, PendingStage, Session, WorkspaceFileContext,
};

pub const WELCOME_MESSAGE: &str = "👋 Welcome to AI Chat Assistant!\n\nYou can ask me to generate or refactor code, explain snippets, or attach files using @filename.\n\nOpen a file in the editor to unlock contextual awareness!";
pub const DECLINED_SUMMARY_MESSAGE: &str = "👍 No worries! You can still ask me to help with code, refactor suggestions, or explanations anytime.";
pub const TIMED_OUT_MESSAGE: &str = "⏱️ Request timed out.";
const IMAGE_ONLY_LABEL: &str = "🖼️ (image)";

/// Extra time allowed beyond the HTTP timeout before a turn is given up on,
/// so the host's own timeout reply normally wins.
const EXPIRY_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug)]
enum Purpose {
    Context,
    Listing,
    FileFetch(PendingFileReference),
    Prompt,
    FollowUps,
    CodeEdit(String),
}

impl Purpose {
    /// Whether this request belongs to a user turn that is still open.
    fn holds_turn(&self) -> bool {
        matches!(self, Purpose::FileFetch(_) | Purpose::Prompt)
    }
}

#[derive(Debug)]
struct Outstanding {
    purpose: Purpose,
    issued_at: Instant,
}

pub struct Controller {
    session: Session,
    next_request_id: RequestId,
    outstanding: HashMap<RequestId, Outstanding>,
    retired: HashSet<RequestId>,
    context_received: bool,
    follow_ups_enabled: bool,
    turn_timeout: Duration,
    scroll_requested: bool,
}

impl Controller {
    pub fn new(follow_ups_enabled: bool, request_timeout: Duration) -> Self {
        Self {
            session: Session::new(),
            next_request_id: 1,
            outstanding: HashMap::new(),
            retired: HashSet::new(),
            context_received: false,
            follow_ups_enabled,
            turn_timeout: request_timeout + EXPIRY_GRACE,
            scroll_requested: false,
        }
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        self.session.transcript()
    }

    pub fn follow_ups(&self) -> &[String] {
        self.session.follow_ups()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// True while a user turn is waiting on the host. The panel refuses new
    /// input in this state so at most one placeholder exists.
    pub fn is_busy(&self) -> bool {
        self.outstanding.values().any(|o| o.purpose.holds_turn())
    }

    /// True while any command is still waiting for its result.
    pub fn has_outstanding(&self) -> bool {
        !self.outstanding.is_empty()
    }

    pub fn follow_ups_pending(&self) -> bool {
        self.outstanding
            .values()
            .any(|o| matches!(o.purpose, Purpose::FollowUps))
    }

    /// Returns (and clears) whether the view should jump to the bottom.
    pub fn take_scroll_request(&mut self) -> bool {
        std::mem::take(&mut self.scroll_requested)
    }

    fn issue(&mut self, purpose: Purpose) -> RequestId {
        let id = self.next_request_id;
        self.next_request_id += 1;
        self.outstanding.insert(
            id,
            Outstanding {
                purpose,
                issued_at: Instant::now(),
            },
        );
        id
    }

    fn prompt_command(&mut self, prompt: String, image: Option<InlineImage>) -> Command {
        let id = self.issue(Purpose::Prompt);
        Command::GeminiPrompt {
            prompt,
            image,
            request_id: Some(id),
        }
    }

    /// The startup command: ask the host what the user has open.
    pub fn start(&mut self) -> Command {
        let id = self.issue(Purpose::Context);
        Command::RequestContext {
            request_id: Some(id),
        }
    }

    pub fn request_workspace_files(&mut self) -> Command {
        let id = self.issue(Purpose::Listing);
        Command::GetWorkspaceFiles {
            request_id: Some(id),
        }
    }

    pub fn clear(&mut self) {
        self.session.clear_transcript();
        self.session.disarm_edit();
        let retired = &mut self.retired;
        self.outstanding.retain(|id, outstanding| {
            // Context is still needed, and an edit's status records a file change
            let keep = matches!(outstanding.purpose, Purpose::Context | Purpose::CodeEdit(_));
            if !keep {
                retired.insert(*id);
            }
            keep
        });
    }

    /// Record a user turn and work out what to ask the host for.
    pub fn send(&mut self, text: &str, image: Option<InlineImage>) -> Vec<Command> {
        let input = text.trim();
        if input.is_empty() && image.is_none() {
            return Vec::new();
        }

        self.retire_follow_ups();
        self.session.clear_follow_ups();
        self.session.disarm_edit();

        let shown = match (input.is_empty(), image.is_some()) {
            (true, _) => IMAGE_ONLY_LABEL.to_string(),
            (false, true) => format!("{}\n{}", input, IMAGE_ONLY_LABEL),
            (false, false) => input.to_string(),
        };
        self.session.push(ChatMessage::user(shown));
        self.session.push(ChatMessage::placeholder());
        self.scroll_requested = true;

        if let Some(context) = self.session.take_armed_context() {
            match input.to_lowercase().as_str() {
                "yes" => {
                    info!("summarizing {:?}", context.file_name);
                    let prompt = format!("Summarize this code file:\n\n{}", context.file_content);
                    return vec![self.prompt_command(prompt, None)];
                }
                "no" => {
                    self.session.resolve_placeholder(DECLINED_SUMMARY_MESSAGE);
                    return Vec::new();
                }
                _ => debug!("context offer ignored; disarmed"),
            }
        }

        if let Some(file_path) = parse_file_mention(input) {
            self.session.expect_edit_for(&file_path);
            self.session
                .set_placeholder_stage(PendingStage::ReadingFile(file_path.clone()));

            let id = self.issue(Purpose::FileFetch(PendingFileReference {
                file_path: file_path.clone(),
                original_prompt: input.to_string(),
                image,
            }));
            return vec![Command::GetFileContent {
                file_path,
                original_prompt: input.to_string(),
                request_id: Some(id),
            }];
        }

        vec![self.prompt_command(input.to_string(), image)]
    }

    /// Apply one host result to the conversation.
    pub fn reconcile(&mut self, message: HostMessage) -> Vec<Command> {
        debug!("reconciling {}", message.kind());

        let purpose = match message.request_id() {
            None => None,
            Some(id) => match self.outstanding.remove(&id) {
                Some(outstanding) => Some(outstanding.purpose),
                None if self.retired.remove(&id) => {
                    debug!("dropping {} for retired request {}", message.kind(), id);
                    return Vec::new();
                }
                None => {
                    warn!("{} for unknown request {}", message.kind(), id);
                    if let HostMessage::GeminiReply { reply, .. } = message {
                        self.session.push(ChatMessage::assistant(reply));
                        self.scroll_requested = true;
                    }
                    return Vec::new();
                }
            },
        };

        match message {
            HostMessage::Context {
                file_name,
                file_content,
                ..
            } => {
                self.on_context(WorkspaceFileContext {
                    file_name,
                    file_content,
                });
                Vec::new()
            }
            HostMessage::WorkspaceFiles { files, error, .. } => {
                self.on_workspace_files(files, error);
                Vec::new()
            }
            HostMessage::FileContent {
                file_name,
                file_content,
                error,
                original_prompt,
                ..
            } => {
                let image = match purpose {
                    Some(Purpose::FileFetch(pending)) => pending.image,
                    _ => None,
                };
                self.on_file_content(file_name, file_content, error, original_prompt, image)
            }
            HostMessage::GeminiReply { reply, .. } => match purpose {
                Some(Purpose::FollowUps) => {
                    self.session.set_follow_ups(parse_follow_ups(&reply));
                    Vec::new()
                }
                Some(Purpose::CodeEdit(file_name)) => {
                    debug!("edit status for {}", file_name);
                    self.session.push(ChatMessage::assistant(reply));
                    self.scroll_requested = true;
                    Vec::new()
                }
                _ => self.on_reply(reply),
            },
        }
    }

    fn on_context(&mut self, context: WorkspaceFileContext) {
        if std::mem::replace(&mut self.context_received, true) {
            debug!("ignoring repeated context message");
            return;
        }

        if context.is_usable() {
            let file_name = context.file_name.clone().unwrap_or_default();
            self.session.push(ChatMessage::assistant(format!(
                "📄 You've opened {}.\nWould you like a contextual summary of this file? (yes/no)",
                file_name
            )));
            self.session.arm_context(context);
        } else {
            self.session.push(ChatMessage::assistant(WELCOME_MESSAGE));
            self.session.clear_context();
        }
    }

    fn on_workspace_files(&mut self, files: Vec<String>, error: Option<String>) {
        let content = match error {
            Some(error) => error,
            None if files.is_empty() => "📂 No files found in the workspace.".to_string(),
            None => {
                let listing: Vec<String> = files.iter().map(|f| format!("- {}", f)).collect();
                format!("📂 Workspace files ({}):\n{}", files.len(), listing.join("\n"))
            }
        };
        self.session.push(ChatMessage::assistant(content));
        self.scroll_requested = true;
    }

    fn on_file_content(
        &mut self,
        file_name: String,
        file_content: Option<String>,
        error: Option<String>,
        original_prompt: String,
        image: Option<InlineImage>,
    ) -> Vec<Command> {
        let content = match (error, file_content) {
            (None, Some(content)) => content,
            (error, _) => {
                let error = error.unwrap_or_else(|| format!("❌ Could not read file: {}", file_name));
                self.session.resolve_placeholder(error);
                self.session.disarm_edit();
                self.scroll_requested = true;
                return Vec::new();
            }
        };

        self.session
            .set_placeholder_stage(PendingStage::ProcessingFile(file_name.clone()));
        let prompt = format!(
            "{}\n\nHere is the content of {}:\n\n{}",
            original_prompt, file_name, content
        );
        vec![self.prompt_command(prompt, image)]
    }

    fn on_reply(&mut self, reply: String) -> Vec<Command> {
        self.session.resolve_placeholder(reply.clone());
        self.scroll_requested = true;

        let mut commands = Vec::new();

        if let Some(intent) = extract_edit_intent(&reply, self.session.edit_fallback_file()) {
            info!("model suggested an edit to {}", intent.file_name);
            self.session.push(ChatMessage::assistant(format!(
                "✏️ Attempting to update `{}`...",
                intent.file_name
            )));
            let id = self.issue(Purpose::CodeEdit(intent.file_name.clone()));
            commands.push(Command::ApplyCodeEdit {
                file_name: intent.file_name,
                new_code: intent.new_code,
                request_id: Some(id),
            });
        }
        self.session.disarm_edit();

        if self.follow_ups_enabled && !is_marked_failure(&reply) {
            let prompt = format!(
                "Based on this AI response:\n\"{}\"\nSuggest 2-3 relevant follow-up questions the user might want to ask. Return each as a bullet point.",
                reply
            );
            let id = self.issue(Purpose::FollowUps);
            commands.push(Command::GeminiPrompt {
                prompt,
                image: None,
                request_id: Some(id),
            });
        }

        commands
    }

    fn retire_follow_ups(&mut self) {
        let stale: Vec<RequestId> = self
            .outstanding
            .iter()
            .filter(|(_, o)| matches!(o.purpose, Purpose::FollowUps))
            .map(|(id, _)| *id)
            .collect();
        for id in stale {
            self.outstanding.remove(&id);
            self.retired.insert(id);
        }
    }

    /// Give up on user turns that have waited longer than the timeout.
    /// Returns true when the transcript changed.
    pub fn expire_stale(&mut self, now: Instant) -> bool {
        let expired: Vec<RequestId> = self
            .outstanding
            .iter()
            .filter(|(_, o)| o.purpose.holds_turn())
            .filter(|(_, o)| now.saturating_duration_since(o.issued_at) >= self.turn_timeout)
            .map(|(id, _)| *id)
            .collect();

        if expired.is_empty() {
            return false;
        }

        for id in expired {
            warn!("request {} timed out", id);
            self.outstanding.remove(&id);
        }
        self.session.resolve_placeholder(TIMED_OUT_MESSAGE);
        self.session.disarm_edit();
        self.scroll_requested = true;
        true
    }
}

/// Replies carrying an error or warning marker.
fn is_marked_failure(reply: &str) -> bool {
    ["❌", "⚠️", "⏱️"].iter().any(|marker| reply.starts_with(marker))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{ChatRole, MessageStatus};
    use pretty_assertions::assert_eq;

    fn controller() -> Controller {
        Controller::new(false, Duration::from_secs(60))
    }

    fn request_id(command: &Command) -> Option<RequestId> {
        command.request_id()
    }

    fn reply_to(command: &Command, reply: &str) -> HostMessage {
        HostMessage::reply(reply, request_id(command))
    }

    /// Controller that has already received a usable editor context.
    fn with_context() -> Controller {
        let mut c = controller();
        let start = c.start();
        c.reconcile(HostMessage::Context {
            file_name: Some("/work/main.rs".to_string()),
            file_content: "fn main() {}".to_string(),
            request_id: request_id(&start),
        });
        c
    }

    #[test]
    fn test_start_requests_context() {
        let mut c = controller();
        assert!(matches!(c.start(), Command::RequestContext { request_id: Some(_) }));
    }

    #[test]
    fn test_blank_context_shows_welcome() {
        let mut c = controller();
        let start = c.start();
        c.reconcile(HostMessage::Context {
            file_name: Some("/work/empty.rs".to_string()),
            file_content: "   \n".to_string(),
            request_id: request_id(&start),
        });

        assert_eq!(c.transcript(), &[ChatMessage::assistant(WELCOME_MESSAGE)]);
        assert!(!c.session().context_armed());
    }

    #[test]
    fn test_context_handled_once() {
        let mut c = with_context();
        c.reconcile(HostMessage::Context {
            file_name: None,
            file_content: String::new(),
            request_id: None,
        });
        assert_eq!(c.transcript().len(), 1);
        assert!(c.transcript()[0].content.contains("/work/main.rs"));
    }

    #[test]
    fn test_empty_send_is_noop() {
        let mut c = controller();
        assert!(c.send("   ", None).is_empty());
        assert!(c.transcript().is_empty());
    }

    #[test]
    fn test_send_appends_user_then_placeholder() {
        let mut c = controller();
        let commands = c.send("  explain lifetimes  ", None);

        assert_eq!(c.transcript().len(), 2);
        assert_eq!(c.transcript()[0], ChatMessage::user("explain lifetimes"));
        assert!(c.transcript()[1].is_placeholder());
        assert_eq!(c.transcript()[1].role, ChatRole::Assistant);
        assert!(c.take_scroll_request());

        assert_eq!(commands.len(), 1);
        match &commands[0] {
            Command::GeminiPrompt { prompt, image, .. } => {
                assert_eq!(prompt, "explain lifetimes");
                assert!(image.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert!(c.is_busy());
    }

    #[test]
    fn test_image_only_send() {
        let mut c = controller();
        let image = InlineImage {
            mime_type: "image/png".to_string(),
            data: "iVBOR".to_string(),
        };
        let commands = c.send("", Some(image.clone()));

        assert_eq!(c.transcript()[0].content, IMAGE_ONLY_LABEL);
        match &commands[0] {
            Command::GeminiPrompt { image: sent, .. } => assert_eq!(sent.as_ref(), Some(&image)),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_reply_replaces_placeholder() {
        let mut c = controller();
        let commands = c.send("hello", None);
        c.reconcile(reply_to(&commands[0], "Hi there"));

        assert_eq!(
            c.transcript(),
            &[ChatMessage::user("hello"), ChatMessage::assistant("Hi there")]
        );
        assert!(!c.is_busy());
    }

    #[test]
    fn test_reply_without_placeholder_appends() {
        let mut c = controller();
        c.reconcile(HostMessage::reply("unsolicited", None));
        c.reconcile(HostMessage::reply("again", None));

        assert_eq!(
            c.transcript(),
            &[ChatMessage::assistant("unsolicited"), ChatMessage::assistant("again")]
        );
    }

    #[test]
    fn test_mention_fetches_file_first() {
        let mut c = controller();
        let commands = c.send("please fix @src/app.ts", None);

        assert_eq!(commands.len(), 1);
        match &commands[0] {
            Command::GetFileContent {
                file_path,
                original_prompt,
                ..
            } => {
                assert_eq!(file_path, "src/app.ts");
                assert_eq!(original_prompt, "please fix @src/app.ts");
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(
            c.transcript()[1].pending_stage(),
            Some(&PendingStage::ReadingFile("src/app.ts".to_string()))
        );
        assert!(c.session().edit_expected());
    }

    #[test]
    fn test_file_content_chains_into_prompt() {
        let mut c = controller();
        let image = InlineImage {
            mime_type: "image/jpeg".to_string(),
            data: "/9j/".to_string(),
        };
        let fetch = c.send("why does @a.py fail", Some(image.clone()));
        let commands = c.reconcile(HostMessage::FileContent {
            file_name: "a.py".to_string(),
            file_content: Some("raise ValueError()".to_string()),
            error: None,
            original_prompt: "why does @a.py fail".to_string(),
            request_id: request_id(&fetch[0]),
        });

        assert_eq!(commands.len(), 1);
        match &commands[0] {
            Command::GeminiPrompt { prompt, image: sent, .. } => {
                assert_eq!(
                    prompt,
                    "why does @a.py fail\n\nHere is the content of a.py:\n\nraise ValueError()"
                );
                assert_eq!(sent.as_ref(), Some(&image));
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert!(c.is_busy());
    }

    #[test]
    fn test_file_error_resolves_turn_without_prompt() {
        let mut c = controller();
        let fetch = c.send("read @missing.rs", None);
        let commands = c.reconcile(HostMessage::FileContent {
            file_name: "missing.rs".to_string(),
            file_content: None,
            error: Some("❌ Could not read file: missing.rs".to_string()),
            original_prompt: "read @missing.rs".to_string(),
            request_id: request_id(&fetch[0]),
        });

        assert!(commands.is_empty());
        assert_eq!(c.transcript()[1], ChatMessage::assistant("❌ Could not read file: missing.rs"));
        assert!(!c.session().edit_expected());
        assert!(!c.is_busy());
    }

    #[test]
    fn test_named_edit_is_applied() {
        let mut c = controller();
        let commands = c.send("write a hello script", None);
        let out = c.reconcile(reply_to(&commands[0], "Update `foo.py`:\n```py\nprint(1)\n```"));

        assert_eq!(out.len(), 1);
        match &out[0] {
            Command::ApplyCodeEdit {
                file_name,
                new_code,
                ..
            } => {
                assert_eq!(file_name, "foo.py");
                assert_eq!(new_code, "print(1)\n");
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(
            c.transcript().last().unwrap().content,
            "✏️ Attempting to update `foo.py`..."
        );
    }

    #[test]
    fn test_unnamed_code_without_mention_is_not_applied() {
        let mut c = controller();
        let commands = c.send("show me a loop", None);
        let out = c.reconcile(reply_to(&commands[0], "Sure:\n```rust\nloop {}\n```"));
        assert!(out.is_empty());
        assert_eq!(c.transcript().len(), 2);
    }

    #[test]
    fn test_unnamed_code_goes_to_mentioned_file() {
        let mut c = controller();
        let fetch = c.send("refactor @src/app.ts", None);
        let prompt = c.reconcile(HostMessage::FileContent {
            file_name: "src/app.ts".to_string(),
            file_content: Some("var x = 1".to_string()),
            error: None,
            original_prompt: "refactor @src/app.ts".to_string(),
            request_id: request_id(&fetch[0]),
        });
        let out = c.reconcile(reply_to(&prompt[0], "Here you go:\n```ts\nconst x = 1;\n```"));

        match &out[0] {
            Command::ApplyCodeEdit { file_name, new_code, .. } => {
                assert_eq!(file_name, "src/app.ts");
                assert_eq!(new_code, "const x = 1;\n");
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert!(!c.session().edit_expected());
    }

    #[test]
    fn test_edit_expectation_lasts_one_reply() {
        let mut c = controller();
        let fetch = c.send("look at @lib.rs", None);
        let prompt = c.reconcile(HostMessage::FileContent {
            file_name: "lib.rs".to_string(),
            file_content: Some("pub fn f() {}".to_string()),
            error: None,
            original_prompt: "look at @lib.rs".to_string(),
            request_id: request_id(&fetch[0]),
        });
        assert!(c.reconcile(reply_to(&prompt[0], "Looks fine.")).is_empty());

        let next = c.send("and a snippet?", None);
        let out = c.reconcile(reply_to(&next[0], "```rust\nfn g() {}\n```"));
        assert!(out.is_empty());
    }

    #[test]
    fn test_edit_status_is_appended() {
        let mut c = controller();
        let commands = c.send("go", None);
        let out = c.reconcile(reply_to(&commands[0], "Update `a.txt`:\n```\nhi\n```"));
        c.reconcile(reply_to(&out[0], "✅ Successfully updated `a.txt`."));

        let last = c.transcript().last().unwrap();
        assert_eq!(last.content, "✅ Successfully updated `a.txt`.");
        assert_eq!(last.status, MessageStatus::Complete);
    }

    #[test]
    fn test_clear_drops_turn_but_keeps_edit_status() {
        let mut c = controller();
        let commands = c.send("go", None);
        let edit = c.reconcile(reply_to(&commands[0], "Update `a.txt`:\n```\nhi\n```"));
        let pending = c.send("another", None);

        c.clear();
        assert!(c.transcript().is_empty());
        assert!(!c.is_busy());

        // The abandoned turn's reply is dropped
        c.reconcile(reply_to(&pending[0], "late answer"));
        assert!(c.transcript().is_empty());

        // The write still happened on the host, so its status is kept
        c.reconcile(reply_to(&edit[0], "✅ Successfully updated `a.txt`."));
        let contents: Vec<&str> = c.transcript().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["✅ Successfully updated `a.txt`."]);
        assert!(!c.has_outstanding());
    }

    #[test]
    fn test_yes_requests_summary_once() {
        let mut c = with_context();

        let first = c.send("Yes", None);
        match &first[0] {
            Command::GeminiPrompt { prompt, .. } => {
                assert_eq!(prompt, "Summarize this code file:\n\nfn main() {}");
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert!(!c.session().context_armed());
        c.reconcile(reply_to(&first[0], "A tiny program."));

        let second = c.send("yes", None);
        match &second[0] {
            Command::GeminiPrompt { prompt, .. } => assert_eq!(prompt, "yes"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_no_declines_summary() {
        let mut c = with_context();
        let commands = c.send(" NO ", None);

        assert!(commands.is_empty());
        assert_eq!(
            c.transcript().last().unwrap(),
            &ChatMessage::assistant(DECLINED_SUMMARY_MESSAGE)
        );
        assert!(!c.session().has_placeholder());
        assert!(!c.session().context_armed());
    }

    #[test]
    fn test_unrelated_input_disarms_context() {
        let mut c = with_context();
        let commands = c.send("what is a trait?", None);
        assert!(matches!(&commands[0], Command::GeminiPrompt { prompt, .. } if prompt == "what is a trait?"));
        assert!(!c.session().context_armed());
    }

    #[test]
    fn test_follow_ups_requested_after_reply() {
        let mut c = Controller::new(true, Duration::from_secs(60));
        let commands = c.send("explain", None);
        let out = c.reconcile(reply_to(&commands[0], "It works like this."));

        assert_eq!(out.len(), 1);
        assert!(c.follow_ups_pending());
        assert!(!c.is_busy());

        c.reconcile(reply_to(&out[0], "- Why?\n- How?"));
        assert_eq!(c.follow_ups(), &["Why?".to_string(), "How?".to_string()]);
        assert_eq!(c.transcript().len(), 2);
    }

    #[test]
    fn test_no_follow_ups_after_error_reply() {
        let mut c = Controller::new(true, Duration::from_secs(60));
        let commands = c.send("explain", None);
        let out = c.reconcile(reply_to(&commands[0], "❌ Gemini API request failed: Unknown error"));
        assert!(out.is_empty());
    }

    #[test]
    fn test_new_turn_discards_stale_follow_ups() {
        let mut c = Controller::new(true, Duration::from_secs(60));
        let commands = c.send("explain", None);
        let out = c.reconcile(reply_to(&commands[0], "Done."));

        let next = c.send("another", None);
        c.reconcile(reply_to(&out[0], "- stale question"));

        assert!(c.follow_ups().is_empty());
        assert!(c.transcript().last().unwrap().is_placeholder());

        c.reconcile(reply_to(&next[0], "fresh"));
        assert_eq!(c.transcript().last().unwrap().content, "fresh");
    }

    #[test]
    fn test_timeout_resolves_placeholder() {
        let mut c = controller();
        let commands = c.send("slow question", None);

        assert!(!c.expire_stale(Instant::now()));
        assert!(c.expire_stale(Instant::now() + Duration::from_secs(120)));
        assert_eq!(c.transcript()[1], ChatMessage::assistant(TIMED_OUT_MESSAGE));
        assert!(!c.is_busy());

        c.reconcile(reply_to(&commands[0], "finally"));
        assert_eq!(c.transcript().len(), 3);
        assert_eq!(c.transcript()[2], ChatMessage::assistant("finally"));
    }

    #[test]
    fn test_workspace_listing() {
        let mut c = controller();
        let cmd = c.request_workspace_files();
        c.reconcile(HostMessage::WorkspaceFiles {
            files: vec!["a.rs".to_string(), "b/c.md".to_string()],
            error: None,
            request_id: request_id(&cmd),
        });
        assert_eq!(
            c.transcript()[0].content,
            "📂 Workspace files (2):\n- a.rs\n- b/c.md"
        );
    }
}
