//! Conversation turn controller
//!
//! One controller per call. It owns the call's `ConversationState`, drives the
//! five-state machine and sequences the decision engine and the collaborators
//! (responder, interaction log, handoff desk).
//!
//! ```text
//! AWAITING_INPUT ──transcript──▶ PROCESSING ──respond──▶ AWAITING_INPUT
//!                                    │ noise, no goodbye yet ─▶ AWAITING_INPUT
//!                                    │ noise after goodbye ───▶ ENDED
//!                                    │ escalate ──────────────▶ ENDED
//!                                    └ goodbye ─▶ GOODBYE_PENDING ─▶ FEEDBACK_PENDING ─▶ ENDED
//! ```
//!
//! A live call never fails: engine errors become the safe default decision
//! and collaborator errors are logged and replaced by fallbacks.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::ConversationConfig;
use crate::core::engine::DecisionEngine;
use crate::core::feedback::classify_satisfaction;
use crate::core::records::{CallSummary, HandoffDesk, InteractionLog, TurnRecord};
use crate::core::responder::{ReplyKind, ReplyRequest, Responder, TemplateResponder, FALLBACK_REPLY};
use crate::types::{
    CallState, CallStatus, ConversationState, Decision, HandoffTicket, Intent, Observation, RawAudio,
    RawEmotion, Role, RoutedDecision, Route, SatisfactionScore, Transition, TurnOutput,
};

#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub max_turns: u32,
    pub feedback_timeout: Duration,
    pub collect_feedback: bool,
    pub end_keywords: Vec<String>,
}

impl From<&ConversationConfig> for ControllerSettings {
    fn from(config: &ConversationConfig) -> Self {
        Self {
            max_turns: config.max_turns,
            feedback_timeout: config.feedback_timeout(),
            collect_feedback: config.collect_feedback,
            end_keywords: config.end_keywords.iter().map(|k| k.to_lowercase()).collect(),
        }
    }
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self::from(&ConversationConfig::default())
    }
}

/// External collaborators of a call
#[derive(Clone)]
pub struct Collaborators {
    pub responder: Arc<dyn Responder>,
    pub log: Arc<dyn InteractionLog>,
    pub desk: Arc<dyn HandoffDesk>,
}

impl Collaborators {
    pub fn new(responder: Arc<dyn Responder>, log: Arc<dyn InteractionLog>, desk: Arc<dyn HandoffDesk>) -> Self {
        Self { responder, log, desk }
    }

    /// Template replies, with one store acting as both log and desk
    pub fn with_store<S>(store: Arc<S>) -> Self
    where
        S: InteractionLog + HandoffDesk + 'static,
    {
        Self {
            responder: Arc::new(TemplateResponder::default()),
            log: store.clone(),
            desk: store,
        }
    }
}

/// Raw signals for one caller turn
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TurnInput {
    #[serde(default)]
    pub transcript: Option<String>,
    #[serde(default)]
    pub emotion: Option<RawEmotion>,
    #[serde(default)]
    pub audio: Option<RawAudio>,
}

impl TurnInput {
    pub fn text(transcript: impl Into<String>) -> Self {
        Self {
            transcript: Some(transcript.into()),
            ..Self::default()
        }
    }

    pub fn silence() -> Self {
        Self::default()
    }
}

pub struct TurnController {
    engine: Arc<DecisionEngine>,
    collaborators: Collaborators,
    settings: ControllerSettings,
    conversation: ConversationState,
    state: CallState,
    last_decision: Option<Decision>,
    satisfaction: Option<SatisfactionScore>,
    status: Option<CallStatus>,
}

impl TurnController {
    pub fn new(
        session_id: impl Into<String>,
        engine: Arc<DecisionEngine>,
        collaborators: Collaborators,
        settings: ControllerSettings,
    ) -> Self {
        let mut conversation = ConversationState::new(session_id);
        match collaborators.log.open_interaction(&conversation.session_id) {
            Ok(id) => conversation.interaction_id = Some(id),
            Err(err) => warn!(
                session_id = %conversation.session_id,
                %err,
                "interaction log unavailable, call will not be recorded"
            ),
        }
        info!(
            session_id = %conversation.session_id,
            interaction_id = conversation.interaction_id.as_deref().unwrap_or("-"),
            "call started"
        );

        Self {
            engine,
            collaborators,
            settings,
            conversation,
            state: CallState::AwaitingInput,
            last_decision: None,
            satisfaction: None,
            status: None,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.conversation.session_id
    }

    pub fn state(&self) -> CallState {
        self.state
    }

    pub fn is_ended(&self) -> bool {
        self.state.is_ended()
    }

    pub fn conversation(&self) -> &ConversationState {
        &self.conversation
    }

    pub fn last_decision(&self) -> Option<&Decision> {
        self.last_decision.as_ref()
    }

    pub fn satisfaction(&self) -> Option<SatisfactionScore> {
        self.satisfaction
    }

    /// Set once the call is finalized
    pub fn status(&self) -> Option<CallStatus> {
        self.status
    }

    pub fn feedback_timeout(&self) -> Duration {
        self.settings.feedback_timeout
    }

    /// Opening line; recorded in the history
    pub fn welcome(&mut self) -> String {
        let text = self.compose(&ReplyRequest::new(ReplyKind::Welcome));
        self.conversation.record(Role::Bot, &text);
        text
    }

    pub fn handle_turn(&mut self, input: &TurnInput) -> TurnOutput {
        let observation = self.engine.observe(
            input.transcript.as_deref(),
            input.emotion.as_ref(),
            input.audio.as_ref(),
        );
        self.handle_observation(observation)
    }

    pub fn handle_observation(&mut self, observation: Observation) -> TurnOutput {
        match self.state {
            CallState::Ended => {
                debug!(session_id = %self.session_id(), "input after end of call ignored");
                return TurnOutput::new(self.session_id(), self.conversation.turn_number(), self.state);
            }
            CallState::FeedbackPending => {
                let reply = Some(observation.transcript.as_str()).filter(|t| !is_noise(t));
                return self.handle_feedback_reply(reply);
            }
            _ => {}
        }

        let turn = self.conversation.begin_turn();
        let mut out = TurnOutput::new(self.session_id(), turn, self.state);
        self.enter(CallState::Processing, &mut out);

        let mut end_status = CallStatus::Completed;
        let mut content: Option<RoutedDecision> = None;

        if is_noise(&observation.transcript) {
            if self.conversation.has_said_goodbye {
                info!(session_id = %self.session_id(), turn, "silence after goodbye");
                self.enter(CallState::Ended, &mut out);
            } else {
                out.reply = Some(self.compose(&ReplyRequest::new(ReplyKind::Repeat)));
                self.enter(CallState::AwaitingInput, &mut out);
            }
        } else {
            let routed = match self.engine.route(&observation) {
                Ok(routed) => routed,
                Err(err) => {
                    error!(session_id = %self.session_id(), turn, %err, "decision engine failed, using safe default");
                    out.fault = Some(err.to_string());
                    RoutedDecision::safe_default()
                }
            };
            out.decision = Some(routed.decision);
            out.route = Some(routed.route.clone());

            match routed.route.clone() {
                Route::Repeat => {
                    out.reply = Some(self.compose(&ReplyRequest::new(ReplyKind::Repeat)));
                    self.enter(CallState::AwaitingInput, &mut out);
                }
                Route::Escalate { reason } => {
                    self.open_ticket(HandoffTicket::for_escalation(&reason, &routed.decision, &observation, turn));
                    out.reply = Some(self.compose(&ReplyRequest {
                        kind: ReplyKind::Handoff,
                        transcript: &observation.transcript,
                        decision: Some(&routed.decision),
                        emotion: observation.emotion_label,
                    }));
                    end_status = CallStatus::Transferred;
                    self.enter(CallState::Ended, &mut out);
                    content = Some(routed);
                }
                Route::Respond => {
                    if self.is_goodbye(&observation.transcript) {
                        self.conversation.mark_goodbye();
                        self.enter(CallState::GoodbyePending, &mut out);
                        let ask_feedback = self.settings.collect_feedback;
                        out.reply = Some(self.compose(&ReplyRequest::new(ReplyKind::Goodbye { ask_feedback })));
                        if ask_feedback {
                            self.enter(CallState::FeedbackPending, &mut out);
                        } else if self.conversation.goodbye_count > 1 {
                            self.enter(CallState::Ended, &mut out);
                        }
                    } else {
                        out.reply = Some(self.compose(&ReplyRequest {
                            kind: ReplyKind::Answer,
                            transcript: &observation.transcript,
                            decision: Some(&routed.decision),
                            emotion: observation.emotion_label,
                        }));
                        self.enter(CallState::AwaitingInput, &mut out);
                    }
                    content = Some(routed);
                }
            }
        }

        if turn >= self.settings.max_turns && !self.state.is_ended() {
            info!(session_id = %self.session_id(), turn, max_turns = self.settings.max_turns, "turn limit reached");
            let closing = self.compose(&ReplyRequest::new(ReplyKind::Closing));
            out.reply = Some(match out.reply.take() {
                Some(reply) => format!("{reply} {closing}"),
                None => closing,
            });
            self.enter(CallState::Ended, &mut out);
        }

        if let Some(routed) = content {
            self.record_turn(turn, observation, routed, out.reply.as_deref().unwrap_or_default());
        }
        if self.state.is_ended() {
            self.finalize(end_status);
        }
        out
    }

    /// Answer to the satisfaction question. `None` means silence or timeout.
    /// Always ends the call.
    pub fn handle_feedback_reply(&mut self, reply: Option<&str>) -> TurnOutput {
        let mut out = TurnOutput::new(self.session_id(), self.conversation.turn_number(), self.state);
        if self.state != CallState::FeedbackPending {
            debug!(session_id = %self.session_id(), state = %self.state, "no feedback pending");
            return out;
        }

        match reply.map(str::trim).filter(|t| !t.is_empty()) {
            Some(text) => {
                self.conversation.record(Role::Caller, text);
                self.satisfaction = classify_satisfaction(text);
                info!(session_id = %self.session_id(), satisfaction = ?self.satisfaction, "feedback received");
                let thanks = self.compose(&ReplyRequest::new(ReplyKind::FeedbackThanks));
                self.conversation.record(Role::Bot, &thanks);
                out.reply = Some(thanks);
            }
            None => info!(session_id = %self.session_id(), "no feedback given"),
        }

        out.satisfaction = self.satisfaction;
        self.enter(CallState::Ended, &mut out);
        self.finalize(CallStatus::Completed);
        out
    }

    /// Wait for the satisfaction answer, at most the configured timeout.
    /// A timeout counts as no feedback.
    pub async fn await_feedback<F>(&mut self, reply: F) -> TurnOutput
    where
        F: Future<Output = Option<String>>,
    {
        let timeout = self.settings.feedback_timeout;
        match tokio::time::timeout(timeout, reply).await {
            Ok(text) => self.handle_feedback_reply(text.as_deref()),
            Err(_) => {
                info!(session_id = %self.session_id(), timeout_ms = timeout.as_millis() as u64, "feedback wait timed out");
                self.handle_feedback_reply(None)
            }
        }
    }

    /// Caller hung up or the session was dropped
    pub fn hang_up(&mut self) -> TurnOutput {
        let mut out = TurnOutput::new(self.session_id(), self.conversation.turn_number(), self.state);
        if self.state.is_ended() {
            return out;
        }
        let status = if self.conversation.has_said_goodbye {
            CallStatus::Completed
        } else {
            CallStatus::Abandoned
        };
        self.enter(CallState::Ended, &mut out);
        self.finalize(status);
        out
    }

    fn enter(&mut self, to: CallState, out: &mut TurnOutput) {
        let transition = Transition { from: self.state, to };
        debug!(session_id = %self.conversation.session_id, %transition, "state transition");
        out.transitions.push(transition);
        self.state = to;
        out.state = to;
    }

    fn is_goodbye(&self, transcript: &str) -> bool {
        let lowered = transcript.to_lowercase();
        if self.settings.end_keywords.iter().any(|k| lowered.contains(k.as_str())) {
            return true;
        }
        let words: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .collect();
        words.contains(&"merci") && words.len() <= 3
    }

    fn compose(&self, request: &ReplyRequest<'_>) -> String {
        self.collaborators.responder.reply(request).unwrap_or_else(|err| {
            warn!(session_id = %self.session_id(), %err, "responder failed, using fallback reply");
            FALLBACK_REPLY.to_string()
        })
    }

    fn open_ticket(&self, ticket: HandoffTicket) {
        let queue = ticket.queue_type;
        let reason = ticket.reason.clone();
        match self
            .collaborators
            .desk
            .open_ticket(self.conversation.interaction_id.as_deref(), ticket)
        {
            Ok(ticket_id) => info!(
                session_id = %self.session_id(),
                %ticket_id,
                queue = queue.as_str(),
                %reason,
                "handoff ticket opened"
            ),
            Err(err) => warn!(session_id = %self.session_id(), %err, %reason, "handoff ticket not recorded"),
        }
    }

    fn record_turn(&mut self, turn: u32, observation: Observation, routed: RoutedDecision, reply: &str) {
        self.conversation.record(Role::Caller, &observation.transcript);
        self.conversation.record(Role::Bot, reply);
        // a closing "merci" must not hide what the call was about
        if routed.decision.intent != Intent::Unknown || self.last_decision.is_none() {
            self.last_decision = Some(routed.decision);
        }

        let Some(interaction_id) = self.conversation.interaction_id.clone() else {
            return;
        };
        let record = TurnRecord {
            interaction_id,
            turn_number: turn,
            observation,
            decision: routed.decision,
            route: routed.route,
            bot_reply: reply.to_string(),
            at: chrono::Utc::now(),
        };
        if let Err(err) = self.collaborators.log.log_turn(&record) {
            warn!(session_id = %self.session_id(), turn, %err, "turn not logged");
        }
    }

    /// Runs once per call
    fn finalize(&mut self, status: CallStatus) {
        if self.status.is_some() {
            return;
        }
        self.status = Some(status);
        info!(
            session_id = %self.session_id(),
            status = status.as_str(),
            turns = self.conversation.turn_number(),
            satisfaction = ?self.satisfaction,
            "call ended"
        );

        let Some(interaction_id) = self.conversation.interaction_id.as_deref() else {
            return;
        };
        let summary = CallSummary {
            status,
            satisfaction: self.satisfaction,
            turns: self.conversation.turn_number(),
            final_intent: self.last_decision.map(|d| d.intent),
            ended_at: chrono::Utc::now(),
        };
        if let Err(err) = self.collaborators.log.finalize(interaction_id, &summary) {
            warn!(session_id = %self.session_id(), %err, "interaction not finalized");
        }
    }
}

/// Empty or no alphanumeric content at all
fn is_noise(transcript: &str) -> bool {
    !transcript.chars().any(char::is_alphanumeric)
}
