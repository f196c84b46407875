use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use teloxide::types::ChatId;

use crate::config::Config;
use crate::product::ProductRecord;

/// Per-chat position in the card-building dialogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConversationState {
    #[default]
    AwaitingInput,
    ProcessingText,
    ProcessingImage,
    ConfirmingData,
    SelectingTemplate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationEvent {
    TextReceived,
    PhotoReceived,
    ExtractionFinished,
    DataConfirmed,
    CorrectionReceived,
    TemplateChosen,
    Reset,
}

impl ConversationState {
    /// Pure transition function. Events that make no sense in the
    /// current state leave it unchanged, so a stray callback cannot
    /// derail a session.
    pub fn on_event(self, event: ConversationEvent) -> ConversationState {
        use ConversationEvent::*;
        use ConversationState::*;

        match (self, event) {
            (_, Reset) => AwaitingInput,
            (AwaitingInput, TextReceived) => ProcessingText,
            (AwaitingInput, PhotoReceived) => ProcessingImage,
            (ProcessingText | ProcessingImage, ExtractionFinished) => ConfirmingData,
            (ConfirmingData, CorrectionReceived) => ConfirmingData,
            (ConfirmingData, DataConfirmed) => SelectingTemplate,
            (SelectingTemplate, TemplateChosen) => AwaitingInput,
            (state, _) => state,
        }
    }
}

/// Everything the bot remembers about one chat between messages.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub state: ConversationState,
    pub record: ProductRecord,
    pub photo_url: Option<String>,
    pub original_text: Option<String>,
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    sessions: Arc<Mutex<HashMap<ChatId, Session>>>,
}

impl AppState {
    pub fn new(config: Config) -> AppState {
        AppState {
            config: Arc::new(config),
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn session(&self, chat_id: ChatId) -> Session {
        self.sessions.lock().get(&chat_id).cloned().unwrap_or_default()
    }

    pub fn update_session<F>(&self, chat_id: ChatId, update: F)
    where
        F: FnOnce(&mut Session),
    {
        let mut sessions = self.sessions.lock();
        update(sessions.entry(chat_id).or_default());
    }

    pub fn apply_event(&self, chat_id: ChatId, event: ConversationEvent) -> ConversationState {
        let mut sessions = self.sessions.lock();
        let session = sessions.entry(chat_id).or_default();
        session.state = session.state.on_event(event);
        session.state
    }

    pub fn reset_session(&self, chat_id: ChatId) {
        self.sessions.lock().remove(&chat_id);
    }
}
