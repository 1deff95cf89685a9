use std::path::Path;
use std::time::Instant;

use anyhow::{Result, anyhow};
use base64::Engine;
use codechat::controller::Controller;
use codechat::markdown;
use codechat::protocol::{Command, HostMessage, InlineImage};
use codechat::session::ChatMessage;
use codechat::transport::Poster;
use tracing::{info, warn};

pub const HELP_TEXT: &str = "Commands: /files list workspace files, /image <path> attach an image, /clear reset the chat, /help this text. Mention a file with @path.";

/// An image waiting to go out with the next message.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub label: String,
    pub image: InlineImage,
}

pub struct App {
    pub should_quit: bool,

    // Input box
    pub input: String,
    pub cursor: usize, // cursor position in input, in chars
    pub attachment: Option<Attachment>,
    pub follow_up_idx: Option<usize>,
    pub notice: Option<String>,

    // Chat view
    pub chat_scroll: u16,
    pub chat_height: u16, // Height of chat area for scroll calculations
    pub chat_width: u16,  // Width of chat area for wrap calculations
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Labels for the header
    pub model: String,
    pub workspace_label: String,

    pub controller: Controller,
    poster: Poster<Command>,
}

impl App {
    pub fn new(
        controller: Controller,
        poster: Poster<Command>,
        model: String,
        workspace_label: String,
    ) -> Self {
        Self {
            should_quit: false,
            input: String::new(),
            cursor: 0,
            attachment: None,
            follow_up_idx: None,
            notice: None,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            animation_frame: 0,
            model,
            workspace_label,
            controller,
            poster,
        }
    }

    pub fn start(&mut self) {
        let command = self.controller.start();
        self.post(vec![command]);
    }

    fn post(&mut self, commands: Vec<Command>) {
        for command in commands {
            if !self.poster.post(&command) {
                warn!("host is gone; {} not delivered", command.name());
                self.notice = Some("The host router has stopped.".to_string());
            }
        }
    }

    /// Enter in the input box.
    pub fn submit(&mut self) {
        let text = self.input.trim().to_string();
        if text.is_empty() && self.attachment.is_none() {
            return;
        }

        if let Some(rest) = text.strip_prefix('/') {
            self.run_slash_command(rest);
            self.clear_input();
            return;
        }

        if self.controller.is_busy() {
            self.notice = Some("Still waiting for the previous reply...".to_string());
            return;
        }

        let image = self.attachment.take().map(|a| a.image);
        let commands = self.controller.send(&text, image);
        self.post(commands);
        self.clear_input();
        self.follow_up_idx = None;
        self.notice = None;
        self.sync_scroll();
    }

    fn run_slash_command(&mut self, command: &str) {
        let (name, arg) = match command.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (command, ""),
        };

        match name {
            "files" => {
                let command = self.controller.request_workspace_files();
                self.post(vec![command]);
            }
            "image" => match self.attach_image(Path::new(arg)) {
                Ok(()) => self.notice = None,
                Err(e) => self.notice = Some(format!("❌ {}", e)),
            },
            "clear" => {
                self.controller.clear();
                self.chat_scroll = 0;
                self.notice = None;
            }
            "quit" | "exit" => self.should_quit = true,
            _ => self.notice = Some(HELP_TEXT.to_string()),
        }
    }

    pub fn attach_image(&mut self, path: &Path) -> Result<()> {
        if path.as_os_str().is_empty() {
            return Err(anyhow!("Usage: /image <path>"));
        }
        let mime_type = image_mime_type(path)
            .ok_or_else(|| anyhow!("Unsupported image type: {}", path.display()))?;
        let bytes = std::fs::read(path)
            .map_err(|e| anyhow!("Could not read {}: {}", path.display(), e))?;

        info!("attached {} ({} bytes)", path.display(), bytes.len());
        self.attachment = Some(Attachment {
            label: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            image: InlineImage {
                mime_type: mime_type.to_string(),
                data: base64::engine::general_purpose::STANDARD.encode(bytes),
            },
        });
        Ok(())
    }

    pub fn on_host(&mut self, message: HostMessage) {
        let commands = self.controller.reconcile(message);
        self.post(commands);
        if !self.controller.follow_ups().is_empty() {
            self.follow_up_idx = None;
        }
        self.sync_scroll();
    }

    /// Tick animation frame and give up on stale requests (called by Tick event)
    pub fn tick(&mut self) {
        if self.controller.is_busy() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
        if self.controller.expire_stale(Instant::now()) {
            self.sync_scroll();
        }
    }

    /// Tab: put the next follow-up suggestion in the input box.
    pub fn cycle_follow_up(&mut self) {
        let count = self.controller.follow_ups().len();
        if count == 0 {
            return;
        }
        let next = self.follow_up_idx.map(|i| (i + 1) % count).unwrap_or(0);
        self.follow_up_idx = Some(next);
        self.input = self.controller.follow_ups()[next].clone();
        self.cursor = self.input.chars().count();
    }

    fn clear_input(&mut self) {
        self.input.clear();
        self.cursor = 0;
    }

    fn sync_scroll(&mut self) {
        if self.controller.take_scroll_request() {
            self.scroll_to_bottom();
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines);
    }

    /// Scroll chat to bottom so the newest message is visible
    pub fn scroll_to_bottom(&mut self) {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };
        let visible_height = if self.chat_height > 0 {
            self.chat_height as usize
        } else {
            20
        };

        let total = transcript_height(self.controller.transcript(), wrap_width);
        self.chat_scroll = u16::try_from(total.saturating_sub(visible_height)).unwrap_or(u16::MAX);
    }
}

/// Estimated wrapped height of the chat view, matching what `ui` draws.
fn transcript_height(transcript: &[ChatMessage], wrap_width: usize) -> usize {
    let wrap_width = wrap_width.max(1);
    transcript
        .iter()
        .map(|msg| {
            let body: usize = if msg.is_placeholder() {
                1
            } else {
                markdown::render_or_notice(&msg.content)
                    .iter()
                    .map(|line| line.width() / wrap_width + 1)
                    .sum()
            };
            // Role line and the blank line after the message
            body + 2
        })
        .sum()
}

fn image_mime_type(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "webp" => Some("image/webp"),
        _ => None,
    }
}
