//! Fan-out and the disconnect cascade.
//!
//! All functions here run with the caller already holding the context
//! lock. A broadcast serializes once, sends to every live connection,
//! and only after the full sweep evicts the ones that failed. The
//! eviction cascade's own notifications are best-effort and never
//! trigger another cascade, so a chain of dying connections unwinds in
//! bounded steps instead of recursing.

use chrono::Utc;

use lanchat_protocol::{ClientId, Codec, JsonCodec, ServerMessage};
use lanchat_room::Disconnection;
use lanchat_transport::{Connection, WebSocketConnection};

use crate::LanchatError;
use crate::server::RelayContext;

/// RFC 3339 timestamp for outbound wire messages.
pub(crate) fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

/// Encodes and sends one message to one connection.
pub(crate) async fn send_to(
    conn: &WebSocketConnection,
    codec: &JsonCodec,
    msg: &ServerMessage,
) -> Result<(), LanchatError> {
    let bytes = codec.encode(msg)?;
    conn.send(&bytes).await?;
    Ok(())
}

/// Sends to every registered connection except `exclude`, serializing
/// once. Returns the ids whose send failed; the caller decides whether
/// to run the cascade on them.
async fn fan_out(
    ctx: &RelayContext,
    codec: &JsonCodec,
    msg: &ServerMessage,
    exclude: Option<ClientId>,
) -> Result<Vec<ClientId>, LanchatError> {
    let bytes = codec.encode(msg)?;
    let mut failed = Vec::new();
    for (id, conn) in ctx.registry.iter() {
        if Some(id) == exclude {
            continue;
        }
        if let Err(e) = conn.send(&bytes).await {
            tracing::debug!(%id, error = %e, "fan-out send failed");
            failed.push(id);
        }
    }
    Ok(failed)
}

/// Sends to the listed ids, skipping `exclude` and ids with no live
/// connection. Returns the ids whose send failed.
async fn fan_out_to(
    ctx: &RelayContext,
    codec: &JsonCodec,
    targets: &[ClientId],
    msg: &ServerMessage,
    exclude: Option<ClientId>,
) -> Result<Vec<ClientId>, LanchatError> {
    let bytes = codec.encode(msg)?;
    let mut failed = Vec::new();
    for id in targets {
        if Some(*id) == exclude {
            continue;
        }
        let Some(conn) = ctx.registry.get(*id) else {
            continue;
        };
        if let Err(e) = conn.send(&bytes).await {
            tracing::debug!(id = %id, error = %e, "targeted send failed");
            failed.push(*id);
        }
    }
    Ok(failed)
}

/// Broadcasts to everyone (minus `exclude`), then runs the full
/// disconnect cascade for any connection that failed mid-sweep.
pub(crate) async fn broadcast_all(
    ctx: &mut RelayContext,
    codec: &JsonCodec,
    msg: &ServerMessage,
    exclude: Option<ClientId>,
) -> Result<(), LanchatError> {
    let failed = fan_out(ctx, codec, msg, exclude).await?;
    evict_failed(ctx, codec, failed).await;
    Ok(())
}

/// Broadcasts to a room's members (minus `exclude`); failed members
/// leave the room through the same cascade.
pub(crate) async fn broadcast_to_room(
    ctx: &mut RelayContext,
    codec: &JsonCodec,
    members: &[ClientId],
    msg: &ServerMessage,
    exclude: Option<ClientId>,
) -> Result<(), LanchatError> {
    let failed = fan_out_to(ctx, codec, members, msg, exclude).await?;
    evict_failed(ctx, codec, failed).await;
    Ok(())
}

/// What [`detach`] removed for one connection.
pub(crate) struct Detached {
    pub(crate) nickname: Option<String>,
    pub(crate) disconnection: Disconnection,
}

/// Removes a connection from every piece of relay state: registry,
/// rate window, nickname directory, sessions, queue or room. Pure
/// bookkeeping, no I/O. Idempotent; returns `None` if the cascade
/// already ran.
pub(crate) fn detach(ctx: &mut RelayContext, client: ClientId) -> Option<Detached> {
    let conn = ctx.registry.unregister(client)?;
    let peer_ip = conn.peer_addr().ip();
    // Keep the rate window while any other connection shares the IP.
    if !ctx.registry.iter().any(|(_, c)| c.peer_addr().ip() == peer_ip) {
        ctx.limiter.forget(peer_ip);
    }
    let nickname = ctx.nicknames.remove(client);
    ctx.sessions.remove_owner(client);
    let disconnection = ctx.rooms.disconnect(client);
    tracing::info!(%client, nickname = nickname.as_deref(), "client detached");
    Some(Detached {
        nickname,
        disconnection,
    })
}

/// Tells the survivors about a departure. All sends here are
/// best-effort: a failure detaches the target quietly, with no further
/// announcements.
pub(crate) async fn announce_departure(
    ctx: &mut RelayContext,
    codec: &JsonCodec,
    detached: Detached,
) {
    if let Some(nickname) = detached.nickname {
        let msg = ServerMessage::UserLeft {
            nickname,
            timestamp: now_rfc3339(),
        };
        if let Ok(failed) = fan_out(ctx, codec, &msg, None).await {
            for id in failed {
                detach(ctx, id);
            }
        }
    }

    match detached.disconnection {
        Disconnection::Idle => {}
        Disconnection::FromQueue => {
            announce_queue_positions(ctx, codec).await;
        }
        Disconnection::FromRoom(departure) => {
            let msg = ServerMessage::OpponentLeft {
                message: "Your opponent has left the room".to_string(),
                timestamp: now_rfc3339(),
            };
            if let Ok(failed) =
                fan_out_to(ctx, codec, &departure.remaining, &msg, None).await
            {
                for id in failed {
                    detach(ctx, id);
                }
            }
        }
    }
}

/// Runs the full cascade (detach + announcements) for each failed id.
async fn evict_failed(ctx: &mut RelayContext, codec: &JsonCodec, failed: Vec<ClientId>) {
    for id in failed {
        if let Some(detached) = detach(ctx, id) {
            announce_departure(ctx, codec, detached).await;
        }
    }
}

/// Re-announces 1-indexed queue positions to every queued connection.
/// Called whenever the queue changes shape. Best-effort sends.
pub(crate) async fn announce_queue_positions(ctx: &mut RelayContext, codec: &JsonCodec) {
    let mut failed = Vec::new();
    for (id, position, total) in ctx.rooms.queue_positions() {
        let msg = ServerMessage::QueueUpdate {
            position,
            total_in_queue: total,
        };
        let Some(conn) = ctx.registry.get(id) else {
            continue;
        };
        let Ok(bytes) = codec.encode(&msg) else {
            continue;
        };
        if conn.send(&bytes).await.is_err() {
            failed.push(id);
        }
    }
    for id in failed {
        detach(ctx, id);
    }
}
