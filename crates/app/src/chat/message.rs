/// Text shown in the assistant slot while a reply is outstanding.
pub const PLACEHOLDER_TEXT: &str = "...";

/// Chat speaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sender {
    User,
    Assistant,
}

/// Immutable transcript entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub text: String,
    pub sender: Sender,
}

impl Message {
    pub fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            sender,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Sender::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Sender::Assistant, text)
    }
}

/// Rejection reason for illegal transcript edits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptRejection {
    PlaceholderOutstanding,
    NoPlaceholder,
}

/// Ordered, append-only message list with at most one trailing placeholder.
///
/// The placeholder is tracked by position, so an assistant reply that happens to read
/// `"..."` is an ordinary message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    messages: Vec<Message>,
    placeholder: Option<usize>,
}

impl Transcript {
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn placeholder_index(&self) -> Option<usize> {
        self.placeholder
    }

    pub fn is_placeholder(&self, index: usize) -> bool {
        self.placeholder == Some(index)
    }

    pub fn push(&mut self, message: Message) -> Result<usize, TranscriptRejection> {
        if self.placeholder.is_some() {
            return Err(TranscriptRejection::PlaceholderOutstanding);
        }
        self.messages.push(message);
        Ok(self.messages.len() - 1)
    }

    pub fn push_placeholder(&mut self) -> Result<usize, TranscriptRejection> {
        let index = self.push(Message::assistant(PLACEHOLDER_TEXT))?;
        self.placeholder = Some(index);
        Ok(index)
    }

    /// Swaps the placeholder for its final message at the same position.
    pub fn resolve_placeholder(&mut self, message: Message) -> Result<usize, TranscriptRejection> {
        let index = self.placeholder.take().ok_or(TranscriptRejection::NoPlaceholder)?;
        self.messages[index] = message;
        Ok(index)
    }
}
