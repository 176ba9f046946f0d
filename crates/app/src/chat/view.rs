use std::sync::Arc;

use walletchat_llm::{BoxFuture, CompletionProvider, CompletionRequest, ProviderError, ProviderResult};

use crate::connection::Session;

use super::message::{Message, Transcript};

/// Transcript entry that replaces the placeholder when the round trip fails.
pub const FAILED_REPLY_TEXT: &str = "Error: Failed to get response";

/// Identifies one outstanding round trip so a late reply cannot land in a reset view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReplyTicket(u64);

/// Request the view wants sent, paired with the ticket that resolves it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    pub ticket: ReplyTicket,
    pub request: CompletionRequest,
}

pub type ReplyFuture = BoxFuture<'static, (ReplyTicket, ProviderResult<String>)>;

/// Why a submission did not touch the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitRejection {
    EmptyInput,
    NotConnected,
    Busy,
}

/// Chat pane state: transcript, draft input, and the single in-flight round trip.
pub struct ConversationView {
    transcript: Transcript,
    input: String,
    pending: Option<ReplyTicket>,
    next_ticket: u64,
    provider: Option<Arc<dyn CompletionProvider>>,
    model_id: String,
}

impl ConversationView {
    pub fn new(provider: Option<Arc<dyn CompletionProvider>>, model_id: impl Into<String>) -> Self {
        Self {
            transcript: Transcript::default(),
            input: String::new(),
            pending: None,
            next_ticket: 1,
            provider,
            model_id: model_id.into(),
        }
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn set_input(&mut self, input: impl Into<String>) {
        self.input = input.into();
    }

    pub fn is_busy(&self) -> bool {
        self.pending.is_some()
    }

    /// Whether the surface should accept typing and the send trigger.
    pub fn input_enabled(&self, session: &Session) -> bool {
        session.connected && !self.is_busy()
    }

    pub fn set_provider(&mut self, provider: Option<Arc<dyn CompletionProvider>>, model_id: impl Into<String>) {
        self.provider = provider;
        self.model_id = model_id.into();
    }

    /// Drops the transcript and any outstanding ticket, as when the session ends.
    pub fn reset(&mut self) {
        if let Some(ticket) = self.pending.take() {
            tracing::debug!(?ticket, "discarding outstanding reply on reset");
        }
        self.transcript = Transcript::default();
        self.input.clear();
    }

    /// Submits the current draft.
    pub fn submit_input(&mut self, session: &Session) -> Result<OutboundRequest, SubmitRejection> {
        let text = self.input.clone();
        self.begin_submit(&text, session)
    }

    /// First half of a round trip: records the user turn and the placeholder, clears the
    /// draft, and hands back the one request to send.
    pub fn begin_submit(
        &mut self,
        text: &str,
        session: &Session,
    ) -> Result<OutboundRequest, SubmitRejection> {
        if text.trim().is_empty() {
            return Err(SubmitRejection::EmptyInput);
        }
        if !session.connected {
            return Err(SubmitRejection::NotConnected);
        }
        if self.pending.is_some() {
            return Err(SubmitRejection::Busy);
        }

        // Busy is checked above, so the transcript has no placeholder to block these.
        if self.transcript.push(Message::user(text)).is_err()
            || self.transcript.push_placeholder().is_err()
        {
            return Err(SubmitRejection::Busy);
        }
        self.input.clear();

        let ticket = ReplyTicket(self.next_ticket);
        self.next_ticket = self.next_ticket.wrapping_add(1);
        self.pending = Some(ticket);

        Ok(OutboundRequest {
            ticket,
            request: CompletionRequest::new(self.model_id.clone(), text),
        })
    }

    /// Sends one request through the configured provider. Owns everything it needs, so
    /// the caller can keep the view responsive while it runs.
    pub fn dispatch(&self, outbound: OutboundRequest) -> ReplyFuture {
        let OutboundRequest { ticket, request } = outbound;
        match self.provider.clone() {
            Some(provider) => Box::pin(async move { (ticket, provider.complete(request).await) }),
            None => Box::pin(async move {
                (
                    ticket,
                    Err(ProviderError::MissingApiKey {
                        stage: "dispatch-completion",
                        provider_id: "unconfigured".to_string(),
                    }),
                )
            }),
        }
    }

    /// Second half of a round trip. Returns `false` for a ticket this view no longer waits on.
    pub fn resolve(&mut self, ticket: ReplyTicket, result: ProviderResult<String>) -> bool {
        if self.pending != Some(ticket) {
            tracing::debug!(?ticket, "dropping reply for a round trip this view no longer tracks");
            return false;
        }
        self.pending = None;

        let reply = match result {
            Ok(text) => Message::assistant(text),
            Err(error) => {
                tracing::error!(error = %error, "chat completion failed");
                Message::assistant(FAILED_REPLY_TEXT)
            }
        };

        self.transcript.resolve_placeholder(reply).is_ok()
    }

    /// Full round trip for callers that can wait on it.
    pub async fn submit(&mut self, text: &str, session: &Session) -> Result<(), SubmitRejection> {
        let outbound = self.begin_submit(text, session)?;
        let (ticket, result) = self.dispatch(outbound).await;
        self.resolve(ticket, result);
        Ok(())
    }
}
