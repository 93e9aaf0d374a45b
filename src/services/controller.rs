//! One conversation per logged-in user: the active session, the mode, and
//! the turn sequence (optimistic user message, gateway call, merge, persist).

use std::cell::{Cell, RefCell};
use std::future::Future;

use crate::config::TurnFailurePolicy;
use crate::models::{AppSettings, ChatSession, ImageAttachment, Message, Mode, IMAGE_ONLY_PLACEHOLDER};
use crate::services::audio;
use crate::services::auth::AppContext;
use crate::services::export::ExportBundle;
use crate::services::llm::{AiGateway, ReplyRequest, TriggerClassifier};
use crate::services::repository::{SessionRepository, SettingsRepository};
use crate::services::storage::{JsonStore, KeyValueStore};

pub const IMAGE_DONE: &str = "Visualization task completed.";
pub const IMAGE_FAILED: &str = "Failed to render visualization. Check API Key or VPN status.";

#[derive(Clone, PartialEq, Debug, Default)]
pub struct TurnInput {
    pub text: String,
    pub image: Option<ImageAttachment>,
}

impl TurnInput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image: None,
        }
    }

    pub fn with_image(mut self, image: ImageAttachment) -> Self {
        self.image = Some(image);
        self
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TurnRejection {
    /// No text and no image.
    Empty,
    /// Another turn is still waiting on the gateway.
    Busy,
}

#[derive(Clone, PartialEq, Debug)]
pub enum TurnOutcome {
    Rejected(TurnRejection),
    /// The reply was appended and persisted.
    Completed(ChatSession),
    /// The gateway failed; the user message is persisted.
    Failed(ChatSession),
}

/// A turn whose user message is already persisted and which still needs
/// [`ConversationController::complete_turn`].
#[derive(Debug)]
pub struct PendingTurn {
    session: ChatSession,
    prompt: String,
    image: Option<ImageAttachment>,
    mode: Mode,
}

impl PendingTurn {
    pub fn session(&self) -> &ChatSession {
        &self.session
    }
}

/// Snapshot recomputed from the repository after every write.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct ConversationState {
    pub sessions: Vec<ChatSession>,
    pub message_count: usize,
}

/// Clears the single-flight flag however the turn ends, including when the
/// turn future is dropped mid-call.
struct InFlightGuard<'a>(&'a Cell<bool>);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

pub struct ConversationController<S, G> {
    ctx: AppContext,
    sessions: SessionRepository<S>,
    settings: SettingsRepository<S>,
    gateway: G,
    classifier: TriggerClassifier,
    failure_policy: TurnFailurePolicy,
    active: RefCell<Option<ChatSession>>,
    mode: Cell<Mode>,
    in_flight: Cell<bool>,
    state: RefCell<ConversationState>,
}

impl<S, G> ConversationController<S, G>
where
    S: KeyValueStore + Clone,
    G: AiGateway,
{
    pub fn new(ctx: AppContext, store: JsonStore<S>, gateway: G) -> Self {
        let controller = Self {
            ctx,
            sessions: SessionRepository::new(store.clone()),
            settings: SettingsRepository::new(store),
            gateway,
            classifier: TriggerClassifier::default(),
            failure_policy: TurnFailurePolicy::default(),
            active: RefCell::new(None),
            mode: Cell::new(Mode::default()),
            in_flight: Cell::new(false),
            state: RefCell::new(ConversationState::default()),
        };
        controller.refresh();
        controller
    }

    pub fn with_classifier(mut self, classifier: TriggerClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_failure_policy(mut self, policy: TurnFailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn context(&self) -> &AppContext {
        &self.ctx
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn sessions(&self) -> Vec<ChatSession> {
        self.state.borrow().sessions.clone()
    }

    pub fn message_count(&self) -> usize {
        self.state.borrow().message_count
    }

    pub fn active(&self) -> Option<ChatSession> {
        self.active.borrow().clone()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.get()
    }

    pub fn mode(&self) -> Mode {
        self.mode.get()
    }

    pub fn set_mode(&self, mode: Mode) {
        self.mode.set(mode);
    }

    pub fn toggle_mode(&self) -> Mode {
        let mode = self.mode.get().toggled();
        self.mode.set(mode);
        mode
    }

    /// Re-reads the user's sessions and recomputes the aggregate counters.
    pub fn refresh(&self) {
        let sessions = self.sessions.list_for_user(&self.ctx.user.id);
        let message_count = sessions.iter().map(|s| s.messages.len()).sum();
        *self.state.borrow_mut() = ConversationState {
            sessions,
            message_count,
        };
    }

    pub fn select_session(&self, session_id: &str) -> bool {
        let found = self
            .state
            .borrow()
            .sessions
            .iter()
            .find(|s| s.id == session_id)
            .cloned();
        let selected = found.is_some();
        if selected {
            *self.active.borrow_mut() = found;
        }
        selected
    }

    /// Deselects the active session; the next turn starts a new one.
    pub fn new_chat(&self) {
        *self.active.borrow_mut() = None;
    }

    pub fn delete_session(&self, session_id: &str) {
        self.sessions.delete(session_id);
        let was_active = self
            .active
            .borrow()
            .as_ref()
            .map_or(false, |s| s.id == session_id);
        if was_active {
            self.new_chat();
        }
        self.refresh();
    }

    pub fn clear_history(&self) {
        self.sessions.delete_all_for_user(&self.ctx.user.id);
        self.new_chat();
        self.refresh();
    }

    pub fn settings(&self) -> AppSettings {
        self.settings.get()
    }

    /// Only admins may change the global settings.
    pub fn update_settings(&self, settings: &AppSettings) -> bool {
        if !self.ctx.user.is_admin {
            tracing::warn!(user_id = %self.ctx.user.id, "settings update refused for non-admin");
            return false;
        }
        self.settings.set(settings);
        true
    }

    pub fn export_bundle(&self) -> ExportBundle {
        ExportBundle::new(
            self.ctx.user.id.clone(),
            self.sessions.list_for_user(&self.ctx.user.id),
            self.settings.get(),
        )
    }

    fn persist(&self, session: &ChatSession) {
        self.sessions.upsert(session);
        *self.active.borrow_mut() = Some(session.clone());
        self.refresh();
    }

    /// Validates the input, appends the user message and persists it.
    pub fn begin_turn(&self, input: TurnInput) -> Result<PendingTurn, TurnRejection> {
        let text = input.text.trim().to_string();
        if text.is_empty() && input.image.is_none() {
            return Err(TurnRejection::Empty);
        }
        if self.in_flight.get() {
            tracing::debug!("turn rejected, another turn is in flight");
            return Err(TurnRejection::Busy);
        }
        self.in_flight.set(true);

        let mode = self.mode.get();
        let active = self.active.borrow().clone();
        let mut session = active.unwrap_or_else(|| {
            ChatSession::new(self.ctx.user.id.clone(), ChatSession::title_for(&text, mode))
        });

        let content = if text.is_empty() {
            IMAGE_ONLY_PLACEHOLDER.to_string()
        } else {
            text.clone()
        };
        let image_url = input.image.as_ref().map(ImageAttachment::data_url);
        session.messages.push(Message::user(content, image_url));
        self.persist(&session);

        Ok(PendingTurn {
            session,
            prompt: text,
            image: input.image,
            mode,
        })
    }

    async fn respond(
        &self,
        session: &ChatSession,
        prompt: &str,
        image: Option<&ImageAttachment>,
        mode: Mode,
    ) -> anyhow::Result<Message> {
        if image.is_none() && self.classifier.is_image_request(prompt) {
            let url = self.gateway.generate_image(prompt, mode).await?;
            let content = if url.is_some() { IMAGE_DONE } else { IMAGE_FAILED };
            return Ok(Message::model(content, url));
        }

        let settings = self.settings.get();
        let history = &session.messages[..session.messages.len().saturating_sub(1)];
        let reply = self
            .gateway
            .generate_reply(ReplyRequest {
                prompt,
                history,
                username: &self.ctx.user.username,
                is_admin: self.ctx.user.is_admin,
                mode,
                image,
                settings: &settings,
            })
            .await?;
        Ok(Message::model(reply, None))
    }

    /// Calls the gateway for a pending turn and merges the result.
    ///
    /// The in-flight guard is taken before the future is returned, so the
    /// flag is released even if the future is dropped without being polled.
    pub fn complete_turn(&self, pending: PendingTurn) -> impl Future<Output = TurnOutcome> + '_ {
        let guard = InFlightGuard(&self.in_flight);
        async move {
            let _guard = guard;
            let PendingTurn {
                mut session,
                prompt,
                image,
                mode,
            } = pending;

            match self.respond(&session, &prompt, image.as_ref(), mode).await {
                Ok(reply) => {
                    session.messages.push(reply);
                    self.persist(&session);
                    TurnOutcome::Completed(session)
                }
                Err(e) => {
                    tracing::error!(session_id = %session.id, error = %e, "turn failed");
                    if self.failure_policy == TurnFailurePolicy::InlineError {
                        session.messages.push(Message::model(e.to_string(), None));
                        self.persist(&session);
                    }
                    TurnOutcome::Failed(session)
                }
            }
        }
    }

    pub async fn submit(&self, input: TurnInput) -> TurnOutcome {
        match self.begin_turn(input) {
            Ok(pending) => self.complete_turn(pending).await,
            Err(rejection) => TurnOutcome::Rejected(rejection),
        }
    }

    pub async fn continue_story(&self) -> TurnOutcome {
        let prompt = self.mode.get().continue_prompt();
        self.submit(TurnInput::text(prompt)).await
    }

    /// Reads a message of the active session aloud. Never fails.
    pub async fn speak_message(&self, message_id: &str) {
        let text = self
            .active
            .borrow()
            .as_ref()
            .and_then(|s| s.messages.iter().find(|m| m.id == message_id))
            .map(|m| m.content.clone());
        match text {
            Some(text) => audio::speak(&self.gateway, &text, self.mode.get()).await,
            None => tracing::warn!(message_id, "no such message to speak"),
        }
    }
}
