//! Command handlers
//!
//! Maps each request onto the user registry and produces the single reply
//! owed to the requesting connection. Domain errors become failing replies;
//! nothing here tears a connection down.

use log::{debug, info};
use std::fmt;

use crate::connection::{ConnectionState, PeerTable};
use crate::error::{ChatServerError, RegistryError, SessionError, error_kind, handle_error};
use crate::protocol::responses::format_online_users;
use crate::protocol::{Command, CommandResult, Request, ServerEnvelope};
use crate::registry::UserRegistry;

/// Dispatches a decoded request to its handler.
///
/// # Arguments
///
/// * `state` - Protocol state of the requesting connection.
/// * `request` - The decoded request.
/// * `registry` - Shared user registry.
/// * `peers` - Live-connection table, used to relay `MessageTo`.
pub async fn handle_command(
    state: &mut ConnectionState,
    request: &Request,
    registry: &UserRegistry,
    peers: &PeerTable,
) -> CommandResult {
    match request.command {
        Command::CheckUniqueNickname => handle_cmd_check_unique(registry, &request.data1).await,
        Command::RegisterUser => {
            handle_cmd_register(registry, &request.data1, &request.data2).await
        }
        Command::Login => handle_cmd_login(state, registry, &request.data1, &request.data2).await,
        Command::Logout => handle_cmd_logout(state, registry).await,
        Command::ChangePassword => handle_cmd_change_password(state, registry, &request.data1).await,
        Command::GetOnlineUserList => handle_cmd_online_users(registry).await,
        Command::MessageTo => {
            handle_cmd_message_to(state, registry, peers, &request.data1, &request.data2).await
        }
        Command::Clear => handle_cmd_clear(registry).await,
    }
}

/// Builds a failing reply; the text is the bare error message.
fn reject<E>(err: E) -> CommandResult
where
    E: Into<ChatServerError> + fmt::Display,
{
    let text = err.to_string();
    let err = err.into();
    handle_error(&err);
    CommandResult::failure(error_kind(&err), text)
}

async fn handle_cmd_check_unique(registry: &UserRegistry, nickname: &str) -> CommandResult {
    if registry.exists(nickname).await {
        reject(RegistryError::AlreadyExists(nickname.to_string()))
    } else {
        CommandResult::ok()
    }
}

async fn handle_cmd_register(
    registry: &UserRegistry,
    nickname: &str,
    credential: &str,
) -> CommandResult {
    match registry.register(nickname, credential).await {
        Ok(()) => CommandResult::ok(),
        Err(e) => reject(e),
    }
}

/// Login is refused while this connection is already logged in. Retrying the
/// bound nickname reports it as already online, matching a second connection.
async fn handle_cmd_login(
    state: &mut ConnectionState,
    registry: &UserRegistry,
    nickname: &str,
    credential: &str,
) -> CommandResult {
    if let Some(bound) = state.nickname() {
        return if bound == nickname {
            reject(RegistryError::AlreadyOnline(bound.to_string()))
        } else {
            reject(SessionError::AlreadyAuthenticated(bound.to_string()))
        };
    }

    match registry.login(nickname, credential, state.id()).await {
        Ok(()) => {
            state.bind(nickname);
            CommandResult::ok()
        }
        Err(e) => reject(e),
    }
}

/// Anonymous logout is a no-op success
async fn handle_cmd_logout(state: &mut ConnectionState, registry: &UserRegistry) -> CommandResult {
    if let Some(nickname) = state.unbind() {
        registry.release(&nickname, state.id()).await;
    }
    CommandResult::ok()
}

/// Only the connection the account is currently bound to may change its
/// password. A binding lost to `Clear` drops this session back to anonymous.
async fn handle_cmd_change_password(
    state: &mut ConnectionState,
    registry: &UserRegistry,
    credential: &str,
) -> CommandResult {
    let Some(nickname) = state.nickname().map(str::to_string) else {
        return reject(SessionError::NotAuthenticated);
    };

    if registry.lookup_transport(&nickname).await != Some(state.id()) {
        debug!("{} lost its binding to '{}'", state.id(), nickname);
        state.unbind();
        return reject(SessionError::NotAuthenticated);
    }

    match registry.change_password(&nickname, credential).await {
        Ok(()) => CommandResult::ok(),
        Err(e) => reject(e),
    }
}

async fn handle_cmd_online_users(registry: &UserRegistry) -> CommandResult {
    let nicknames = registry.online_nicknames().await;
    CommandResult::success(ServerEnvelope::reply(format_online_users(&nicknames)))
}

/// Relays `text` to `recipient`'s mailbox. The recipient must be registered
/// and online; nothing is queued otherwise.
async fn handle_cmd_message_to(
    state: &ConnectionState,
    registry: &UserRegistry,
    peers: &PeerTable,
    recipient: &str,
    text: &str,
) -> CommandResult {
    let Some(sender) = state.nickname() else {
        return reject(SessionError::NotAuthenticated);
    };

    let connection = match registry.resolve_recipient(recipient).await {
        Ok(connection) => connection,
        Err(e) => return reject(e),
    };

    if peers
        .deliver(connection, ServerEnvelope::incoming(sender, text))
        .await
    {
        debug!("Relayed message from '{}' to '{}'", sender, recipient);
        CommandResult::ok()
    } else {
        reject(RegistryError::Offline(recipient.to_string()))
    }
}

async fn handle_cmd_clear(registry: &UserRegistry) -> CommandResult {
    registry.clear().await;
    info!("Registry reset by client request");
    CommandResult::ok()
}
