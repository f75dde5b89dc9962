//! Blocking dialogs: messages, confirmations and text prompts.

use crate::export::RasterImage;
use std::collections::VecDeque;

/// The blocking dialog collaborator used by the session and the app.
pub trait Dialogs {
    /// Shows a message.
    fn alert(&mut self, message: &str);

    /// Asks a yes/no question.
    fn confirm(&mut self, message: &str) -> bool;

    /// Asks for text. `None` means cancelled.
    fn prompt(&mut self, message: &str, default: &str) -> Option<String>;

    /// Shows an export preview and asks whether to proceed.
    fn confirm_preview(&mut self, preview: &RasterImage) -> bool {
        self.confirm(&format!(
            "Export this {}x{} preview?",
            preview.width(),
            preview.height()
        ))
    }
}

/// Dialogs answered from queues, for headless replay.
///
/// Unanswered confirmations are declined and unanswered prompts are cancelled.
#[derive(Debug, Default, Clone)]
pub struct ScriptedDialogs {
    confirms: VecDeque<bool>,
    prompts: VecDeque<Option<String>>,
    /// Every message shown so far
    pub alerts: Vec<String>,
    /// Every prompt shown so far, with its default
    pub asked: Vec<(String, String)>,
}

impl ScriptedDialogs {
    /// Creates dialogs with no queued answers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the answer to the next confirmation.
    pub fn answer_confirm(mut self, yes: bool) -> Self {
        self.confirms.push_back(yes);
        self
    }

    /// Queues the answer to the next prompt.
    pub fn answer_prompt(mut self, text: Option<&str>) -> Self {
        self.prompts.push_back(text.map(str::to_string));
        self
    }

    /// Queues a confirmation answer on an existing value.
    pub fn push_confirm(&mut self, yes: bool) {
        self.confirms.push_back(yes);
    }

    /// Queues a prompt answer on an existing value.
    pub fn push_prompt(&mut self, text: Option<String>) {
        self.prompts.push_back(text);
    }

    /// Drops queued answers no dialog asked for.
    pub fn clear_pending(&mut self) {
        if !self.confirms.is_empty() || !self.prompts.is_empty() {
            log::debug!(
                "dropping {} unused confirmations and {} unused prompt answers",
                self.confirms.len(),
                self.prompts.len()
            );
        }
        self.confirms.clear();
        self.prompts.clear();
    }
}

impl Dialogs for ScriptedDialogs {
    fn alert(&mut self, message: &str) {
        log::info!("alert: {message}");
        self.alerts.push(message.to_string());
    }

    fn confirm(&mut self, message: &str) -> bool {
        let answer = self.confirms.pop_front().unwrap_or(false);
        log::debug!("confirm: {message} -> {answer}");
        answer
    }

    fn prompt(&mut self, message: &str, default: &str) -> Option<String> {
        self.asked.push((message.to_string(), default.to_string()));
        self.prompts.pop_front().flatten()
    }
}
