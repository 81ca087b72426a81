use log::{debug, info, warn};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncWrite, BufReader};
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;

use crate::config::ServerConfig;
use crate::connection::{ConnectionState, PeerTable};
use crate::error::{ChatServerError, CodecError, ErrorKind};
use crate::protocol::{Frame, Request, ServerEnvelope, decode, handle_command, read_frame, write_frame};
use crate::registry::{ConnectionId, UserRegistry};

/// Shared collaborators handed to every connection worker
#[derive(Clone)]
pub struct ConnectionContext {
    pub registry: Arc<UserRegistry>,
    pub peers: Arc<PeerTable>,
    pub config: Arc<ServerConfig>,
}

/// Why the read loop stopped
#[derive(Debug)]
enum CloseReason {
    PeerClosed,
    IdleTimeout,
    TooManyBadFrames,
    Shutdown,
    WriterGone,
}

/// Serves one chat connection until the peer leaves, the transport fails,
/// or the server shuts down.
///
/// - Reads one line at a time and answers every request with one reply.
/// - All outbound frames go through the connection's mailbox and its writer task.
/// - On exit the bound nickname, if any, is logged out.
pub async fn handle_connection<R, W>(
    read_half: R,
    write_half: W,
    peer_addr: SocketAddr,
    ctx: ConnectionContext,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), ChatServerError>
where
    R: tokio::io::AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (id, mailbox, outbound) = ctx.peers.attach(ctx.config.mailbox_capacity).await;
    info!("Connection {} opened from {}", id, peer_addr);

    let writer = tokio::spawn(run_writer(write_half, outbound, ctx.config.write_timeout(), id));

    let mut reader = BufReader::new(read_half);
    let mut state = ConnectionState::new(id);

    let outcome = serve(&mut reader, &mailbox, &mut state, &ctx, &mut shutdown).await;

    // Cleanup runs whatever ended the loop
    if let Some(nickname) = state.close() {
        ctx.registry.release(&nickname, id).await;
    }
    ctx.peers.detach(id).await;
    drop(mailbox);
    if let Err(e) = writer.await {
        warn!("Writer task for {} ended abnormally: {}", id, e);
    }

    match outcome {
        Ok(reason) => {
            info!("Connection {} from {} closed: {:?}", id, peer_addr, reason);
            Ok(())
        }
        Err(e) => {
            info!("Connection {} from {} failed: {}", id, peer_addr, e);
            Err(ChatServerError::Transport(e))
        }
    }
}

async fn serve<R>(
    reader: &mut R,
    mailbox: &mpsc::Sender<ServerEnvelope>,
    state: &mut ConnectionState,
    ctx: &ConnectionContext,
    shutdown: &mut watch::Receiver<bool>,
) -> io::Result<CloseReason>
where
    R: AsyncBufRead + Unpin,
{
    let config = &ctx.config;
    let mut decode_failures: u32 = 0;

    loop {
        let frame = tokio::select! {
            _ = shutdown.changed() => return Ok(CloseReason::Shutdown),
            frame = read_with_deadline(reader, config.max_frame_length, config.idle_timeout()) => {
                match frame? {
                    Some(frame) => frame,
                    None => return Ok(CloseReason::IdleTimeout),
                }
            }
        };

        let reply = match frame {
            Frame::Eof => return Ok(CloseReason::PeerClosed),
            Frame::Line(line) if line.trim().is_empty() => continue,
            Frame::TooLong => {
                decode_failures += 1;
                warn!("{} sent a frame over {} bytes", state.id(), config.max_frame_length);
                ServerEnvelope::failure(ErrorKind::DecodeFailure, "Request too long")
            }
            Frame::Invalid => {
                decode_failures += 1;
                warn!("{} sent a frame that is not valid UTF-8", state.id());
                ServerEnvelope::failure(
                    ErrorKind::DecodeFailure,
                    "Malformed request: invalid UTF-8",
                )
            }
            Frame::Line(line) => match decode::<Request>(&line) {
                Ok(request) => {
                    decode_failures = 0;
                    debug!("Received from {}: {}", state.id(), request.command);
                    handle_command(state, &request, &ctx.registry, &ctx.peers)
                        .await
                        .reply
                }
                Err(e) => {
                    decode_failures += 1;
                    warn!("Undecodable frame from {}: {}", state.id(), e);
                    malformed_reply(&e)
                }
            },
        };

        if mailbox.send(reply).await.is_err() {
            return Ok(CloseReason::WriterGone);
        }

        if decode_failures >= config.max_decode_failures {
            return Ok(CloseReason::TooManyBadFrames);
        }
    }
}

fn malformed_reply(err: &CodecError) -> ServerEnvelope {
    let detail = match err {
        CodecError::Decode(e) => e.to_string(),
        other => other.to_string(),
    };
    ServerEnvelope::failure(ErrorKind::DecodeFailure, format!("Malformed request: {}", detail))
}

/// `None` when the idle deadline passes with no complete frame
async fn read_with_deadline<R>(
    reader: &mut R,
    max_len: usize,
    idle: Option<Duration>,
) -> io::Result<Option<Frame>>
where
    R: AsyncBufRead + Unpin,
{
    match idle {
        Some(limit) => match timeout(limit, read_frame(reader, max_len)).await {
            Ok(frame) => frame.map(Some),
            Err(_) => Ok(None),
        },
        None => read_frame(reader, max_len).await.map(Some),
    }
}

/// Drains the mailbox onto the socket until every sender is gone or a write fails.
async fn run_writer<W>(
    mut writer: W,
    mut outbound: mpsc::Receiver<ServerEnvelope>,
    write_timeout: Duration,
    id: ConnectionId,
) where
    W: AsyncWrite + Unpin,
{
    while let Some(envelope) = outbound.recv().await {
        match timeout(write_timeout, write_frame(&mut writer, &envelope)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!("Write to {} failed: {}", id, e);
                break;
            }
            Err(_) => {
                warn!("Write to {} timed out after {:?}", id, write_timeout);
                break;
            }
        }
    }
    debug!("Writer for {} stopped", id);
}
