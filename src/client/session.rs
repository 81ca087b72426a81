//! Client session
//!
//! Owns the write half of the connection and a single-slot reply channel.
//! The receive loop sorts incoming frames by envelope kind: replies fill the
//! reply slot, relayed messages go straight to the caller's message channel.
//! A relayed message therefore never answers a pending request.

use log::{debug, info, warn};
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::auth::digest_password;
use crate::client::results::{IncomingMessage, Reply};
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::protocol::responses::parse_online_users;
use crate::protocol::{
    Command, EnvelopeKind, Frame, Request, ServerEnvelope, decode, read_frame, write_frame,
};

/// Longest server frame the client accepts
const MAX_ENVELOPE_LENGTH: usize = 64 * 1024;

pub struct ClientSession {
    nickname: String,
    writer: OwnedWriteHalf,
    replies: mpsc::Receiver<ServerEnvelope>,
    receive_loop: JoinHandle<()>,
    reply_timeout: Duration,
}

impl ClientSession {
    /// Connects to `config.server_address`. The returned receiver yields
    /// messages relayed from other users for as long as the connection lives.
    pub async fn connect(
        config: &ClientConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<IncomingMessage>), ClientError> {
        info!("Connecting to '{}' ...", config.server_address);
        let stream = TcpStream::connect(&config.server_address).await?;
        Ok(Self::from_stream(stream, config.reply_timeout()))
    }

    pub fn from_stream(
        stream: TcpStream,
        reply_timeout: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<IncomingMessage>) {
        let (read_half, writer) = stream.into_split();
        let (reply_tx, replies) = mpsc::channel(1);
        let (incoming_tx, incoming) = mpsc::unbounded_channel();

        let receive_loop = tokio::spawn(receive_loop(read_half, reply_tx, incoming_tx));

        let session = Self {
            nickname: String::new(),
            writer,
            replies,
            receive_loop,
            reply_timeout,
        };
        (session, incoming)
    }

    /// Nickname of the logged-in user, empty when anonymous
    pub fn nickname(&self) -> &str {
        &self.nickname
    }

    pub fn is_authenticated(&self) -> bool {
        !self.nickname.is_empty()
    }

    /// Sends `request` and waits for its reply
    pub async fn send_request(&mut self, request: &Request) -> Result<Reply, ClientError> {
        // A reply that arrived after an earlier timeout must not answer this request
        while let Ok(stale) = self.replies.try_recv() {
            warn!("Discarding late reply: {}", stale.field1);
        }

        debug!("Sending {} request", request.command);
        write_frame(&mut self.writer, request).await?;

        match timeout(self.reply_timeout, self.replies.recv()).await {
            Ok(Some(envelope)) => {
                let reply = Reply::from(envelope);
                if reply.is_failure() {
                    debug!("{} rejected: {}", request.command, reply.text);
                }
                Ok(reply)
            }
            Ok(None) => Err(ClientError::NotConnected),
            Err(_) => Err(ClientError::ReplyTimeout(self.reply_timeout)),
        }
    }

    async fn send(&mut self, command: Command, data1: &str, data2: &str) -> Result<Reply, ClientError> {
        self.send_request(&Request::new(command, data1, data2)).await
    }

    pub async fn check_unique_nickname(&mut self, nickname: &str) -> Result<Reply, ClientError> {
        self.send(Command::CheckUniqueNickname, nickname, "").await
    }

    /// Registers `nickname`; only the password digest leaves the process
    pub async fn register(&mut self, nickname: &str, password: &str) -> Result<Reply, ClientError> {
        let digest = digest_password(password);
        self.send(Command::RegisterUser, nickname, &digest).await
    }

    pub async fn login(&mut self, nickname: &str, password: &str) -> Result<Reply, ClientError> {
        let digest = digest_password(password);
        let reply = self.send(Command::Login, nickname, &digest).await?;
        if reply.is_ok() {
            self.nickname = nickname.to_string();
        }
        Ok(reply)
    }

    pub async fn logout(&mut self) -> Result<Reply, ClientError> {
        let reply = self.send(Command::Logout, "", "").await?;
        if reply.is_ok() {
            self.nickname.clear();
        }
        Ok(reply)
    }

    pub async fn change_password(&mut self, new_password: &str) -> Result<Reply, ClientError> {
        let digest = digest_password(new_password);
        self.send(Command::ChangePassword, &digest, "").await
    }

    /// Nicknames currently online, as listed by the server
    pub async fn online_users(&mut self) -> Result<Vec<String>, ClientError> {
        let reply = self.send(Command::GetOnlineUserList, "", "").await?;
        Ok(parse_online_users(&reply.text))
    }

    pub async fn message_to(&mut self, recipient: &str, text: &str) -> Result<Reply, ClientError> {
        self.send(Command::MessageTo, recipient, text).await
    }

    /// Wipes every account on the server. Test hook.
    pub async fn clear(&mut self) -> Result<Reply, ClientError> {
        self.send(Command::Clear, "", "").await
    }

    /// Closes the write side and stops the receive loop
    pub async fn close(mut self) {
        if let Err(e) = self.writer.shutdown().await {
            debug!("Shutdown of client writer failed: {}", e);
        }
        self.receive_loop.abort();
    }
}

impl Drop for ClientSession {
    fn drop(&mut self) {
        self.receive_loop.abort();
    }
}

async fn receive_loop(
    read_half: OwnedReadHalf,
    replies: mpsc::Sender<ServerEnvelope>,
    incoming: mpsc::UnboundedSender<IncomingMessage>,
) {
    let mut reader = BufReader::new(read_half);

    loop {
        let line = match read_frame(&mut reader, MAX_ENVELOPE_LENGTH).await {
            Ok(Frame::Line(line)) if line.is_empty() => continue,
            Ok(Frame::Line(line)) => line,
            Ok(Frame::TooLong) => {
                warn!("Dropping server frame over {} bytes", MAX_ENVELOPE_LENGTH);
                continue;
            }
            Ok(Frame::Invalid) => {
                warn!("Dropping server frame that is not valid UTF-8");
                continue;
            }
            Ok(Frame::Eof) => {
                info!("Server closed the connection");
                break;
            }
            Err(e) => {
                warn!("Read error: {}", e);
                break;
            }
        };

        let envelope = match decode::<ServerEnvelope>(&line) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("Invalid message from server: {}", e);
                continue;
            }
        };

        match envelope.kind {
            EnvelopeKind::Reply => {
                if replies.send(envelope).await.is_err() {
                    break;
                }
            }
            EnvelopeKind::IncomingMessage => {
                let message = IncomingMessage::from(envelope);
                debug!("Message from '{}'", message.sender);
                if incoming.send(message).is_err() {
                    debug!("Incoming message receiver dropped");
                }
            }
        }
    }
}
