mod support;

use std::sync::Arc;

use support::{ALICE, FakeCompletion, address, completion_failure};
use tokio::sync::Notify;
use walletchat::chat::{
    ConversationView, FAILED_REPLY_TEXT, Message, PLACEHOLDER_TEXT, SubmitRejection,
};
use walletchat::connection::{ConnectionState, Session};
use walletchat_llm::DEFAULT_MODEL;

fn connected() -> Session {
    ConnectionState::Connected {
        address: address(ALICE),
    }
    .session()
}

fn view_with(provider: Arc<FakeCompletion>) -> ConversationView {
    ConversationView::new(Some(provider), DEFAULT_MODEL)
}

#[tokio::test]
async fn reply_follows_the_user_message() {
    let provider = FakeCompletion::replying(vec![Ok("Hi there".to_string())]);
    let mut view = view_with(provider.clone());

    view.submit("Hello", &connected()).await.expect("submit");

    assert_eq!(
        view.transcript().messages(),
        [Message::user("Hello"), Message::assistant("Hi there")]
    );
    assert!(!view.is_busy());
    let requests = provider.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].prompt, "Hello");
    assert_eq!(requests[0].model_id, DEFAULT_MODEL);
}

#[tokio::test]
async fn failed_round_trip_becomes_an_error_reply() {
    let provider = FakeCompletion::replying(vec![Err(completion_failure())]);
    let mut view = view_with(provider);

    view.submit("Hello", &connected()).await.expect("submit");

    assert_eq!(
        view.transcript().messages(),
        [Message::user("Hello"), Message::assistant(FAILED_REPLY_TEXT)]
    );
    assert!(view.input_enabled(&connected()));
}

#[tokio::test]
async fn missing_provider_fails_the_reply_without_crashing() {
    let mut view = ConversationView::new(None, DEFAULT_MODEL);

    view.submit("Hello", &connected()).await.expect("submit");

    assert_eq!(view.transcript().messages()[1], Message::assistant(FAILED_REPLY_TEXT));
}

#[tokio::test]
async fn blank_input_and_missing_session_are_ignored() {
    let provider = FakeCompletion::replying(Vec::new());
    let mut view = view_with(provider.clone());

    assert_eq!(
        view.submit("   \t", &connected()).await,
        Err(SubmitRejection::EmptyInput)
    );
    assert_eq!(
        view.submit("Hello", &Session::default()).await,
        Err(SubmitRejection::NotConnected)
    );

    assert!(view.transcript().is_empty());
    assert!(provider.requests().is_empty());
    assert!(!view.input_enabled(&Session::default()));
}

#[tokio::test]
async fn placeholder_holds_the_last_slot_while_waiting() {
    let gate = Arc::new(Notify::new());
    let provider = FakeCompletion::gated(vec![Ok("Hi there".to_string())], gate.clone());
    let mut view = view_with(provider.clone());
    let session = connected();

    view.set_input("Hello");
    let outbound = view.submit_input(&session).expect("submit");
    assert_eq!(view.input(), "");
    assert!(view.is_busy());
    assert!(!view.input_enabled(&session));
    assert_eq!(view.transcript().placeholder_index(), Some(1));
    assert_eq!(view.transcript().messages()[1].text, PLACEHOLDER_TEXT);

    assert_eq!(
        view.begin_submit("again", &session),
        Err(SubmitRejection::Busy)
    );

    let reply = tokio::spawn(view.dispatch(outbound));
    gate.notify_one();
    let (ticket, result) = reply.await.expect("reply task");
    assert!(view.resolve(ticket, result));

    assert_eq!(view.transcript().len(), 2);
    assert_eq!(view.transcript().messages()[1], Message::assistant("Hi there"));
    assert_eq!(provider.requests().len(), 1);
}

#[tokio::test]
async fn reset_drops_a_reply_that_arrives_late() {
    let provider = FakeCompletion::replying(vec![Ok("too late".to_string())]);
    let mut view = view_with(provider);
    let session = connected();

    let outbound = view.begin_submit("Hello", &session).expect("submit");
    let reply = view.dispatch(outbound);
    view.reset();

    let (ticket, result) = reply.await;
    assert!(!view.resolve(ticket, result));
    assert!(view.transcript().is_empty());
    assert!(!view.is_busy());
}

#[tokio::test]
async fn ticket_from_before_a_reset_cannot_resolve_the_next_round_trip() {
    let provider = FakeCompletion::replying(vec![
        Ok("stale".to_string()),
        Ok("fresh".to_string()),
    ]);
    let mut view = view_with(provider);
    let session = connected();

    let first = view.begin_submit("one", &session).expect("first");
    let first_reply = view.dispatch(first);
    view.reset();

    let second = view.begin_submit("two", &session).expect("second");
    let second_reply = view.dispatch(second);

    let (ticket, result) = first_reply.await;
    assert!(!view.resolve(ticket, result));
    assert!(view.is_busy());

    let (ticket, result) = second_reply.await;
    assert!(view.resolve(ticket, result));
    assert_eq!(
        view.transcript().messages(),
        [Message::user("two"), Message::assistant("fresh")]
    );
}
