/// Transcript entities and the placeholder boundary.
pub mod message;
pub mod view;

pub use message::{Message, PLACEHOLDER_TEXT, Sender, Transcript, TranscriptRejection};
pub use view::{
    ConversationView, FAILED_REPLY_TEXT, OutboundRequest, ReplyFuture, ReplyTicket,
    SubmitRejection,
};
