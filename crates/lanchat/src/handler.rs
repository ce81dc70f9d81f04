//! Per-connection handler: the security pipeline and message router.
//!
//! Each accepted connection gets its own Tokio task running this
//! handler. Every inbound frame goes through the same gauntlet:
//!   1. Frame size ceiling (before any parsing)
//!   2. JSON parse to a raw value
//!   3. Rate limit (one attempt per frame, keyed by source IP)
//!   4. Dangerous-input scan over every string field
//!   5. Type dispatch: unknown or capability-disabled types are
//!      silently ignored; known-but-malformed frames get an error reply
//!
//! The raw value is kept alongside the typed message so voice signaling
//! frames can be relayed verbatim.

use std::sync::Arc;

use serde_json::Value;

use lanchat_protocol::{ClientId, ClientMessage, ServerMessage};
use lanchat_room::{RoomError, RoomInfoResult};
use lanchat_security::{RoomKey, sanitize_nickname, scan_for_dangerous_input};
use lanchat_session::NicknameChange;
use lanchat_transport::{CLOSE_POLICY_VIOLATION, Connection, WebSocketConnection};

use crate::LanchatError;
use crate::broadcast::{
    announce_departure, announce_queue_positions, broadcast_all,
    broadcast_to_room, detach, now_rfc3339, send_to,
};
use crate::server::{RelayContext, ServerState};

/// Panic backstop for the disconnect cascade.
///
/// The handler runs the cascade inline on normal exit, before any other
/// connection's frame can observe the departed state; this guard only
/// matters if the handler panics. Since `Drop` is synchronous, it
/// spawns a fire-and-forget task for the async lock. `detach` is
/// idempotent, so the double run on the normal path is harmless.
struct ConnectionGuard {
    client_id: ClientId,
    state: Arc<ServerState>,
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let client_id = self.client_id;
        let state = Arc::clone(&self.state);
        tokio::spawn(async move {
            let mut ctx = state.ctx.lock().await;
            if let Some(detached) = detach(&mut ctx, client_id) {
                announce_departure(&mut ctx, &state.codec, detached).await;
            }
        });
    }
}

/// Handles a single connection from accept to close.
pub(crate) async fn handle_connection(
    conn: WebSocketConnection,
    state: Arc<ServerState>,
) -> Result<(), LanchatError> {
    let conn = Arc::new(conn);
    let client_id = conn.id();
    let peer_ip = conn.peer_addr().ip();
    tracing::info!(%client_id, %peer_ip, "client connected");

    {
        let mut ctx = state.ctx.lock().await;
        ctx.registry.register(client_id, Arc::clone(&conn));
    }
    let _guard = ConnectionGuard {
        client_id,
        state: Arc::clone(&state),
    };

    loop {
        let data = match conn.recv().await {
            Ok(Some(data)) => data,
            Ok(None) => {
                tracing::info!(%client_id, "connection closed cleanly");
                break;
            }
            Err(e) => {
                tracing::debug!(%client_id, error = %e, "recv error");
                break;
            }
        };

        // Size ceiling comes first: oversized frames are never parsed.
        if data.len() > state.security.max_frame_len {
            tracing::warn!(
                %client_id,
                len = data.len(),
                limit = state.security.max_frame_len,
                "oversized frame rejected"
            );
            send_to(&conn, &state.codec, &ServerMessage::error("Invalid message format"))
                .await?;
            continue;
        }

        let raw: Value = match serde_json::from_slice(&data) {
            Ok(value) => value,
            Err(e) => {
                tracing::debug!(%client_id, error = %e, "unparseable frame");
                send_to(
                    &conn,
                    &state.codec,
                    &ServerMessage::error("Invalid message format"),
                )
                .await?;
                continue;
            }
        };

        let mut ctx = state.ctx.lock().await;

        if !ctx.limiter.check(peer_ip) {
            let _ = send_to(
                &conn,
                &state.codec,
                &ServerMessage::error("Too many requests. Please slow down."),
            )
            .await;
            let _ = conn
                .close_with_code(CLOSE_POLICY_VIOLATION, "Rate limit exceeded")
                .await;
            break;
        }

        if scan_for_dangerous_input(&raw).is_some() {
            // The scan already logged the offending field.
            send_to(&conn, &state.codec, &ServerMessage::error("Invalid input detected"))
                .await?;
            continue;
        }

        let Some(type_name) = raw.get("type").and_then(Value::as_str) else {
            send_to(
                &conn,
                &state.codec,
                &ServerMessage::error("Invalid message format"),
            )
            .await?;
            continue;
        };

        if !ClientMessage::recognizes(type_name)
            || !state.capabilities.allows(type_name)
        {
            tracing::debug!(%client_id, type_name, "ignoring unhandled message type");
            continue;
        }

        let msg: ClientMessage = match serde_json::from_value(raw.clone()) {
            Ok(msg) => msg,
            Err(e) => {
                tracing::debug!(%client_id, type_name, error = %e, "malformed frame");
                send_to(
                    &conn,
                    &state.codec,
                    &ServerMessage::error("Invalid message format"),
                )
                .await?;
                continue;
            }
        };

        // Handler faults never take the connection down.
        if let Err(e) = dispatch(&mut ctx, &state, &conn, client_id, msg, &raw).await {
            tracing::error!(%client_id, error = %e, "handler fault");
            let _ = send_to(&conn, &state.codec, &ServerMessage::error("Server error"))
                .await;
        }
    }

    // The cascade runs to completion under the lock before the task
    // returns, so a reconnecting peer never races the cleanup.
    {
        let mut ctx = state.ctx.lock().await;
        if let Some(detached) = detach(&mut ctx, client_id) {
            announce_departure(&mut ctx, &state.codec, detached).await;
        }
    }
    Ok(())
}

/// Routes one typed message to its handler. Runs under the context
/// lock, so every handler sees and leaves consistent state.
async fn dispatch(
    ctx: &mut RelayContext,
    state: &ServerState,
    conn: &WebSocketConnection,
    client_id: ClientId,
    msg: ClientMessage,
    raw: &Value,
) -> Result<(), LanchatError> {
    match msg {
        ClientMessage::SetNickname { nickname } => {
            handle_set_nickname(ctx, state, conn, client_id, &nickname).await
        }
        ClientMessage::ChatMessage {
            content,
            encrypted_content,
            signature,
        } => {
            handle_chat_message(
                ctx, state, conn, client_id, content, encrypted_content, signature,
            )
            .await
        }
        ClientMessage::GetUsers => {
            let users = ctx.nicknames.names();
            send_to(conn, &state.codec, &ServerMessage::UserList { users }).await
        }
        ClientMessage::JoinMatchmaking => {
            handle_join_matchmaking(ctx, state, conn, client_id).await
        }
        ClientMessage::LeaveMatchmaking => {
            if ctx.rooms.leave_queue(client_id) {
                send_to(
                    conn,
                    &state.codec,
                    &ServerMessage::MatchmakingLeft {
                        message: "Left matchmaking queue".to_string(),
                    },
                )
                .await?;
                announce_queue_positions(ctx, &state.codec).await;
            }
            Ok(())
        }
        ClientMessage::LeaveRoom => {
            handle_leave_room(ctx, state, client_id).await
        }
        ClientMessage::RoomMessage { content } => {
            handle_room_message(ctx, state, conn, client_id, content).await
        }
        ClientMessage::GetRoomInfo => {
            handle_get_room_info(ctx, state, conn, client_id).await
        }
        ClientMessage::VoiceJoin { nickname } => {
            let msg = ServerMessage::VoiceUserJoined { user: nickname };
            broadcast_all(ctx, &state.codec, &msg, Some(client_id)).await
        }
        ClientMessage::VoiceLeave { nickname } => {
            let msg = ServerMessage::VoiceUserLeft { user: nickname };
            broadcast_all(ctx, &state.codec, &msg, Some(client_id)).await
        }
        ClientMessage::VoiceOffer { to }
        | ClientMessage::VoiceAnswer { to }
        | ClientMessage::VoiceIceCandidate { to } => {
            relay_voice_frame(ctx, client_id, &to, raw).await
        }
    }
}

async fn handle_set_nickname(
    ctx: &mut RelayContext,
    state: &ServerState,
    conn: &WebSocketConnection,
    client_id: ClientId,
    requested: &str,
) -> Result<(), LanchatError> {
    if requested.trim().is_empty() {
        return send_to(
            conn,
            &state.codec,
            &ServerMessage::error("Nickname cannot be empty"),
        )
        .await;
    }

    let Some(nickname) =
        sanitize_nickname(requested, state.security.max_nickname_len)
    else {
        return send_to(
            conn,
            &state.codec,
            &ServerMessage::error("Invalid nickname format"),
        )
        .await;
    };

    let change = match ctx.nicknames.claim(client_id, &nickname) {
        Ok(change) => change,
        Err(_) => {
            return send_to(
                conn,
                &state.codec,
                &ServerMessage::error("Nickname already taken"),
            )
            .await;
        }
    };

    let session_id = ctx.sessions.create(client_id, &nickname);
    tracing::debug!(%client_id, session_id, "session refreshed");

    send_to(
        conn,
        &state.codec,
        &ServerMessage::NicknameSet {
            nickname: nickname.clone(),
        },
    )
    .await?;
    send_to(
        conn,
        &state.codec,
        &ServerMessage::UserList {
            users: ctx.nicknames.names(),
        },
    )
    .await?;

    match change {
        NicknameChange::First => {
            let msg = ServerMessage::UserJoined {
                nickname,
                timestamp: now_rfc3339(),
            };
            broadcast_all(ctx, &state.codec, &msg, Some(client_id)).await
        }
        NicknameChange::Changed { old } => {
            // The rename goes to everyone, the renamer included.
            let msg = ServerMessage::NicknameChanged {
                old_nickname: old,
                new_nickname: nickname,
                timestamp: now_rfc3339(),
            };
            broadcast_all(ctx, &state.codec, &msg, None).await
        }
    }
}

async fn handle_chat_message(
    ctx: &mut RelayContext,
    state: &ServerState,
    conn: &WebSocketConnection,
    client_id: ClientId,
    content: Option<String>,
    encrypted_content: Option<lanchat_protocol::CipherEnvelope>,
    signature: Option<String>,
) -> Result<(), LanchatError> {
    let Some(nickname) = ctx.nicknames.nickname(client_id).map(str::to_string)
    else {
        return send_to(
            conn,
            &state.codec,
            &ServerMessage::error("Please set a nickname first"),
        )
        .await;
    };

    if let Some(envelope) = encrypted_content {
        if !state.capabilities.encrypted_relay {
            tracing::debug!(%client_id, "encrypted relay disabled, frame ignored");
            return Ok(());
        }

        if let Some(sig) = &signature {
            let payload = serde_json::to_value(&envelope)
                .map_err(lanchat_security::SecurityError::from)?;
            let key = ctx.room_key.get_or_insert_with(RoomKey::generate);
            if key.verify(&payload, sig).is_err() {
                tracing::warn!(%client_id, "integrity check failed, message dropped");
                return send_to(
                    conn,
                    &state.codec,
                    &ServerMessage::error("Message integrity check failed"),
                )
                .await;
            }
        }

        // Relayed opaque: the envelope is forwarded byte-identical,
        // sender included so their UI can confirm delivery.
        let msg = ServerMessage::EncryptedChatMessage {
            nickname,
            encrypted_content: envelope,
            signature,
            timestamp: now_rfc3339(),
        };
        return broadcast_all(ctx, &state.codec, &msg, None).await;
    }

    let content = content.unwrap_or_default().trim().to_string();
    if content.is_empty() {
        return Ok(());
    }

    let msg = ServerMessage::ChatMessage {
        nickname,
        content,
        timestamp: now_rfc3339(),
    };
    broadcast_all(ctx, &state.codec, &msg, None).await
}

async fn handle_join_matchmaking(
    ctx: &mut RelayContext,
    state: &ServerState,
    conn: &WebSocketConnection,
    client_id: ClientId,
) -> Result<(), LanchatError> {
    let Some(nickname) = ctx.nicknames.nickname(client_id).map(str::to_string)
    else {
        return send_to(
            conn,
            &state.codec,
            &ServerMessage::error("Please set a nickname first"),
        )
        .await;
    };

    let position = match ctx.rooms.join_queue(client_id) {
        Ok(position) => position,
        Err(RoomError::AlreadyQueued) => {
            return send_to(
                conn,
                &state.codec,
                &ServerMessage::error("You are already in the matchmaking queue"),
            )
            .await;
        }
        Err(RoomError::AlreadyInRoom(_)) => {
            return send_to(
                conn,
                &state.codec,
                &ServerMessage::error("You are already in a match room"),
            )
            .await;
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(%client_id, nickname, position, "joined matchmaking");
    send_to(
        conn,
        &state.codec,
        &ServerMessage::MatchmakingJoined {
            queue_position: position,
            message: format!("Joined matchmaking queue (position {position})"),
        },
    )
    .await?;

    drive_pairing(ctx, state).await
}

/// Pops pairs off the queue until fewer than two remain, notifying the
/// participants and re-announcing positions to whoever is left waiting.
async fn drive_pairing(
    ctx: &mut RelayContext,
    state: &ServerState,
) -> Result<(), LanchatError> {
    let mut matched_any = false;

    while let Some(paired) = ctx.rooms.pair_next() {
        matched_any = true;
        let names: Vec<String> = paired
            .members
            .iter()
            .map(|m| {
                ctx.nicknames
                    .nickname(*m)
                    .map(str::to_string)
                    .unwrap_or_else(|| m.to_string())
            })
            .collect();

        for (i, member) in paired.members.iter().enumerate() {
            let msg = ServerMessage::MatchFound {
                room_id: paired.room_id,
                room_name: paired.room_name.clone(),
                opponent: names[1 - i].clone(),
                message: "Match found! You've been placed in a private room."
                    .to_string(),
            };
            // A member that died between queueing and pairing is picked
            // up by its own handler's cascade.
            if let Some(member_conn) = ctx.registry.get(*member) {
                let _ = send_to(member_conn, &state.codec, &msg).await;
            }
        }

        let welcome = ServerMessage::SystemMessage {
            message: format!(
                "Welcome to {}! {} and {} have been matched.",
                paired.room_name, names[0], names[1]
            ),
            timestamp: now_rfc3339(),
        };
        let members = paired.members.to_vec();
        broadcast_to_room(ctx, &state.codec, &members, &welcome, None).await?;
    }

    if matched_any {
        announce_queue_positions(ctx, &state.codec).await;
    }
    Ok(())
}

async fn handle_leave_room(
    ctx: &mut RelayContext,
    state: &ServerState,
    client_id: ClientId,
) -> Result<(), LanchatError> {
    let nickname = ctx
        .nicknames
        .nickname(client_id)
        .map(str::to_string)
        .unwrap_or_else(|| client_id.to_string());

    // Leaving while not in a room is a no-op, not an error.
    let Ok(departure) = ctx.rooms.leave_room(client_id) else {
        return Ok(());
    };

    if !departure.remaining.is_empty() {
        let msg = ServerMessage::OpponentLeft {
            message: format!("{nickname} has left the room"),
            timestamp: now_rfc3339(),
        };
        broadcast_to_room(ctx, &state.codec, &departure.remaining, &msg, None)
            .await?;
    }
    Ok(())
}

async fn handle_room_message(
    ctx: &mut RelayContext,
    state: &ServerState,
    conn: &WebSocketConnection,
    client_id: ClientId,
    content: String,
) -> Result<(), LanchatError> {
    let Some(room) = ctx.rooms.room_of(client_id) else {
        return send_to(
            conn,
            &state.codec,
            &ServerMessage::error("You are not in a room"),
        )
        .await;
    };

    let room_id = room.id;
    let members = room.members.clone();
    let nickname = ctx
        .nicknames
        .nickname(client_id)
        .map(str::to_string)
        .unwrap_or_else(|| client_id.to_string());

    // Room chat echoes to every member, the sender included.
    let msg = ServerMessage::RoomMessage {
        room_id,
        nickname,
        content,
        timestamp: now_rfc3339(),
    };
    broadcast_to_room(ctx, &state.codec, &members, &msg, None).await
}

async fn handle_get_room_info(
    ctx: &mut RelayContext,
    state: &ServerState,
    conn: &WebSocketConnection,
    client_id: ClientId,
) -> Result<(), LanchatError> {
    let msg = match ctx.rooms.room_info(client_id) {
        RoomInfoResult::NotInRoom => ServerMessage::RoomInfo {
            in_room: false,
            room_id: None,
            room_name: None,
            members: None,
            created_at: None,
        },
        RoomInfoResult::InRoom {
            room_id,
            room_name,
            members,
            created_at,
        } => {
            let member_names = members
                .iter()
                .map(|m| {
                    ctx.nicknames
                        .nickname(*m)
                        .map(str::to_string)
                        .unwrap_or_else(|| m.to_string())
                })
                .collect();
            ServerMessage::RoomInfo {
                in_room: true,
                room_id: Some(room_id),
                room_name: Some(room_name),
                members: Some(member_names),
                created_at: Some(created_at),
            }
        }
    };
    send_to(conn, &state.codec, &msg).await
}

/// Relays a WebRTC signaling frame verbatim to the named recipient.
/// The inbound bytes are re-serialized from the raw value untouched;
/// unknown recipients are silently dropped.
async fn relay_voice_frame(
    ctx: &mut RelayContext,
    client_id: ClientId,
    to: &str,
    raw: &Value,
) -> Result<(), LanchatError> {
    let Some(target) = ctx.nicknames.lookup(to) else {
        tracing::debug!(%client_id, to, "voice frame for unknown nickname dropped");
        return Ok(());
    };
    let Some(target_conn) = ctx.registry.get(target) else {
        return Ok(());
    };

    let bytes = serde_json::to_vec(raw)
        .map_err(lanchat_security::SecurityError::from)?;
    if let Err(e) = target_conn.send(&bytes).await {
        tracing::debug!(%client_id, %target, error = %e, "voice relay failed");
    }
    Ok(())
}
