//! Line-oriented terminal surface over the connection manager and the conversation view.

use std::sync::Arc;

use snafu::ResultExt;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use walletchat_llm::ProviderResult;

use crate::chat::{ConversationView, ReplyTicket, SubmitRejection};
use crate::connection::{BrowserProfile, ConnectionHandle, ConnectionState};
use crate::error::{AppResult, ReadInputSnafu, SessionSnafu, WriteOutputSnafu};
use crate::presentation;
use crate::settings::SettingsStore;

pub const HELP_TEXT: &str = "\
/connect     connect the wallet (retries after a failure)
/disconnect  end the wallet session
/copy        copy the connected address to the clipboard
/status      show the wallet session
/reload      re-read settings and rebuild the completion provider
/quit        exit
anything else is sent as a chat message";

pub const NO_WALLET_CONNECTED: &str = "No wallet connected";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellCommand {
    Connect,
    Disconnect,
    Copy,
    Status,
    Reload,
    Help,
    Quit,
    Unknown(String),
    Say(String),
}

impl ShellCommand {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        let Some(name) = trimmed.strip_prefix('/') else {
            return Self::Say(line.to_string());
        };

        match name.to_ascii_lowercase().as_str() {
            "connect" => Self::Connect,
            "disconnect" => Self::Disconnect,
            "copy" => Self::Copy,
            "status" => Self::Status,
            "reload" => Self::Reload,
            "help" => Self::Help,
            "quit" | "exit" => Self::Quit,
            _ => Self::Unknown(trimmed.to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

type Reply = (ReplyTicket, ProviderResult<String>);

pub struct Shell<W> {
    connection: ConnectionHandle,
    view: ConversationView,
    settings: Arc<SettingsStore>,
    browser: BrowserProfile,
    output: W,
}

impl<W> Shell<W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(
        connection: ConnectionHandle,
        view: ConversationView,
        settings: Arc<SettingsStore>,
        browser: BrowserProfile,
        output: W,
    ) -> Self {
        Self {
            connection,
            view,
            settings,
            browser,
            output,
        }
    }

    /// Runs until `/quit` or end of input, then hands the output back.
    pub async fn run<R>(mut self, input: R) -> AppResult<W>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();
        let mut states = self.connection.subscribe();
        let (reply_tx, mut replies) = mpsc::unbounded_channel::<Reply>();
        let mut was_connected = states.borrow_and_update().is_connected();

        self.render_status().await?;
        self.write_line(presentation::empty_transcript_hint(was_connected))
            .await?;

        loop {
            tokio::select! {
                line = lines.next_line() => {
                    let Some(line) = line.context(ReadInputSnafu { stage: "read-line" })? else {
                        tracing::debug!("terminal input closed");
                        break;
                    };
                    if self.handle_line(&line, &reply_tx).await? == Flow::Quit {
                        break;
                    }
                }
                changed = states.changed() => {
                    if changed.is_err() {
                        tracing::warn!("connection manager stopped; leaving the shell");
                        break;
                    }
                    let state = states.borrow_and_update().clone();
                    let connected = state.is_connected();
                    if was_connected && !connected {
                        self.view.reset();
                    }
                    self.render_status().await?;
                    if connected && !was_connected && self.view.transcript().is_empty() {
                        self.write_line(presentation::SEND_FIRST_MESSAGE_HINT).await?;
                    }
                    was_connected = connected;
                }
                Some((ticket, result)) = replies.recv() => {
                    if self.view.resolve(ticket, result) {
                        self.render_last_message().await?;
                    }
                }
            }
        }

        self.output
            .flush()
            .await
            .context(WriteOutputSnafu { stage: "flush" })?;
        Ok(self.output)
    }

    async fn handle_line(
        &mut self,
        line: &str,
        reply_tx: &mpsc::UnboundedSender<Reply>,
    ) -> AppResult<Flow> {
        match ShellCommand::parse(line) {
            ShellCommand::Connect => self
                .connection
                .request_connection()
                .context(SessionSnafu { stage: "connect" })?,
            ShellCommand::Disconnect => self
                .connection
                .disconnect()
                .context(SessionSnafu { stage: "disconnect" })?,
            ShellCommand::Copy => self.copy_address().await?,
            ShellCommand::Status => self.render_status().await?,
            ShellCommand::Reload => self.reload_settings().await?,
            ShellCommand::Help => self.write_line(HELP_TEXT).await?,
            ShellCommand::Quit => return Ok(Flow::Quit),
            ShellCommand::Unknown(command) => {
                self.write_line(&format!("unknown command {command}, try /help"))
                    .await?
            }
            ShellCommand::Say(text) => self.say(&text, reply_tx).await?,
        }
        Ok(Flow::Continue)
    }

    async fn say(&mut self, text: &str, reply_tx: &mpsc::UnboundedSender<Reply>) -> AppResult<()> {
        let session = self.connection.session();
        self.view.set_input(text);
        match self.view.submit_input(&session) {
            Ok(outbound) => {
                let rendered = self
                    .view
                    .transcript()
                    .messages()
                    .iter()
                    .rev()
                    .take(2)
                    .rev()
                    .map(presentation::message_line)
                    .collect::<Vec<_>>();
                for line in rendered {
                    self.write_line(&line).await?;
                }

                let reply = self.view.dispatch(outbound);
                let reply_tx = reply_tx.clone();
                tokio::spawn(async move {
                    let _ = reply_tx.send(reply.await);
                });
            }
            Err(SubmitRejection::EmptyInput) => {}
            Err(SubmitRejection::NotConnected) => {
                self.write_line(presentation::CONNECT_TO_CHAT_HINT).await?
            }
            Err(SubmitRejection::Busy) => {
                tracing::debug!("reply outstanding; submission ignored");
                self.write_line(&format!("{} waiting for the reply", presentation::send_label(true)))
                    .await?
            }
        }
        Ok(())
    }

    async fn copy_address(&mut self) -> AppResult<()> {
        let ConnectionState::Connected { address } = self.connection.state() else {
            return self.write_line(NO_WALLET_CONNECTED).await;
        };

        let sequence = presentation::clipboard_sequence(address.as_str());
        self.output
            .write_all(sequence.as_bytes())
            .await
            .context(WriteOutputSnafu { stage: "copy-address" })?;
        self.write_line(presentation::ADDRESS_COPIED).await
    }

    async fn reload_settings(&mut self) -> AppResult<()> {
        let settings = self.settings.reload();
        let provider = settings.completion_provider();
        let configured = provider.is_some();
        self.view.set_provider(provider, settings.model.clone());
        let message = if configured {
            format!("settings reloaded, model {}", settings.model)
        } else {
            "settings reloaded, no API key configured".to_string()
        };
        self.write_line(&message).await
    }

    async fn render_status(&mut self) -> AppResult<()> {
        let state = self.connection.state();
        let mut status = format!("[{}]", presentation::connect_button_label(&state));
        if let ConnectionState::Connected { address } = &state {
            status.push(' ');
            status.push_str(&presentation::truncate_address(address.as_str()));
        }
        self.write_line(&status).await?;

        for line in presentation::error_banner(&state, self.browser) {
            self.write_line(&line).await?;
        }
        if state.is_connected() && !self.view.is_busy() {
            self.write_line(presentation::INPUT_HINT).await?;
        }
        Ok(())
    }

    async fn render_last_message(&mut self) -> AppResult<()> {
        let Some(line) = self
            .view
            .transcript()
            .messages()
            .last()
            .map(presentation::message_line)
        else {
            return Ok(());
        };
        self.write_line(&line).await
    }

    async fn write_line(&mut self, line: &str) -> AppResult<()> {
        self.output
            .write_all(line.as_bytes())
            .await
            .context(WriteOutputSnafu { stage: "write-line" })?;
        self.output
            .write_all(b"\n")
            .await
            .context(WriteOutputSnafu { stage: "write-line" })?;
        self.output
            .flush()
            .await
            .context(WriteOutputSnafu { stage: "write-line" })
    }
}
