//! Core wire types for the lanchat relay.
//!
//! Every message exchanged with a client is a single flat JSON object
//! carrying a `type` field, e.g.:
//!
//! ```json
//! { "type": "set_nickname", "nickname": "Alice" }
//! { "type": "match_found", "room_id": 1, "room_name": "Match Room 1", "opponent": "Bob" }
//! ```
//!
//! The two enums below model that with serde's internally tagged
//! representation (`#[serde(tag = "type", rename_all = "snake_case")]`).
//! Unknown inbound fields are ignored, which keeps the protocol tolerant
//! of newer clients.

use serde::{Deserialize, Serialize};

use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// Opaque identity of a connected client, assigned by the transport on
/// accept. Newtype over `u64` so it can't be confused with a [`RoomId`].
///
/// `#[serde(transparent)]` makes `ClientId(42)` serialize as plain `42`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(pub u64);

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "C-{}", self.0)
    }
}

/// Identity of a matchmaking room. Allocated from a monotonically
/// increasing counter, so lower ids are always older rooms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub u64);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// CipherEnvelope — opaque end-to-end-encrypted payload
// ---------------------------------------------------------------------------

/// An end-to-end-encrypted message body, produced and consumed only by
/// clients. All three fields are base64 text.
///
/// The server relays this verbatim and never attempts decryption; the
/// only server-side operation on it is HMAC signature verification over
/// its canonical serialization (see `lanchat-security`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CipherEnvelope {
    /// AES-GCM ciphertext.
    pub ciphertext: String,
    /// The random IV/nonce used for this message.
    pub iv: String,
    /// The GCM authentication tag.
    pub tag: String,
}

// ---------------------------------------------------------------------------
// ClientMessage — inbound frames
// ---------------------------------------------------------------------------

/// Every message type a client may send.
///
/// The router treats any `type` value outside this set as unknown and
/// silently ignores it (a deliberate permissive default, so old servers
/// don't error on frames from newer clients).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Claim or change a display name.
    SetNickname { nickname: String },

    /// A global chat message: either `content` (plaintext) or
    /// `encrypted_content` (opaque envelope, optionally signed).
    ChatMessage {
        #[serde(default)]
        content: Option<String>,
        #[serde(default)]
        encrypted_content: Option<CipherEnvelope>,
        /// Base64 HMAC-SHA256 over the canonical envelope serialization.
        #[serde(default)]
        signature: Option<String>,
    },

    /// Request the list of claimed nicknames.
    GetUsers,

    /// Enter the matchmaking queue.
    JoinMatchmaking,

    /// Leave the matchmaking queue.
    LeaveMatchmaking,

    /// Leave the current room.
    LeaveRoom,

    /// A room-scoped chat message.
    RoomMessage { content: String },

    /// Request info about the current room, if any.
    GetRoomInfo,

    /// Announce joining voice chat. Fans out `voice_user_joined` to
    /// everyone else; peers then initiate WebRTC calls.
    VoiceJoin { nickname: String },

    /// Announce leaving voice chat.
    VoiceLeave { nickname: String },

    /// WebRTC offer, relayed verbatim to the `to` nickname. The SDP
    /// payload and `from` field ride along in the raw frame.
    VoiceOffer { to: String },

    /// WebRTC answer, relayed verbatim to the `to` nickname.
    VoiceAnswer { to: String },

    /// ICE candidate, relayed verbatim to the `to` nickname.
    VoiceIceCandidate { to: String },
}

impl ClientMessage {
    /// The wire `type` strings this enum recognizes. The router uses
    /// this to distinguish "unknown type" (ignore) from "known type,
    /// malformed fields" (protocol error).
    pub const TYPE_NAMES: &'static [&'static str] = &[
        "set_nickname",
        "chat_message",
        "get_users",
        "join_matchmaking",
        "leave_matchmaking",
        "leave_room",
        "room_message",
        "get_room_info",
        "voice_join",
        "voice_leave",
        "voice_offer",
        "voice_answer",
        "voice_ice_candidate",
    ];

    /// Returns `true` if `type_name` is one of the recognized wire types.
    pub fn recognizes(type_name: &str) -> bool {
        Self::TYPE_NAMES.contains(&type_name)
    }
}

// ---------------------------------------------------------------------------
// ServerMessage — outbound frames
// ---------------------------------------------------------------------------

/// Every message type the server may send.
///
/// Timestamps are RFC 3339 strings, stamped by the caller at send time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Something the client asked for was refused; `message` names why.
    Error { message: String },

    /// The nickname claim succeeded.
    NicknameSet { nickname: String },

    /// The full list of claimed nicknames.
    UserList { users: Vec<String> },

    /// Broadcast when a connection claims its first nickname.
    UserJoined { nickname: String, timestamp: String },

    /// Broadcast when a named connection disconnects.
    UserLeft { nickname: String, timestamp: String },

    /// Broadcast (including to the renamer) on a nickname change.
    NicknameChanged {
        old_nickname: String,
        new_nickname: String,
        timestamp: String,
    },

    /// A plaintext global chat message.
    ChatMessage {
        nickname: String,
        content: String,
        timestamp: String,
    },

    /// An end-to-end-encrypted chat message, relayed opaque.
    EncryptedChatMessage {
        nickname: String,
        encrypted_content: CipherEnvelope,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signature: Option<String>,
        timestamp: String,
    },

    /// Reply to `join_matchmaking`; position is 1-indexed.
    MatchmakingJoined {
        queue_position: usize,
        message: String,
    },

    /// Reply to `leave_matchmaking`.
    MatchmakingLeft { message: String },

    /// Re-announced to every queued connection whenever the queue
    /// changes shape.
    QueueUpdate {
        position: usize,
        total_in_queue: usize,
    },

    /// Sent to each paired participant; `opponent` is the other's name.
    MatchFound {
        room_id: RoomId,
        room_name: String,
        opponent: String,
        message: String,
    },

    /// A room-scoped announcement from the server itself.
    SystemMessage { message: String, timestamp: String },

    /// Sent to the remaining member(s) when a room member leaves.
    OpponentLeft { message: String, timestamp: String },

    /// A room-scoped chat message.
    RoomMessage {
        room_id: RoomId,
        nickname: String,
        content: String,
        timestamp: String,
    },

    /// Reply to `get_room_info`. When `in_room` is false, the optional
    /// fields are omitted.
    RoomInfo {
        in_room: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room_id: Option<RoomId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        room_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        members: Option<Vec<String>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        created_at: Option<String>,
    },

    /// Fan-out of a `voice_join`; receivers initiate a call to `user`.
    VoiceUserJoined { user: String },

    /// Fan-out of a `voice_leave`.
    VoiceUserLeft { user: String },
}

impl ServerMessage {
    /// Shorthand for the ubiquitous error reply.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! The wire contract is exact JSON shapes; a mismatch means the
    //! browser client can't parse us. These tests pin the serde output.

    use super::*;

    // =====================================================================
    // Identity types
    // =====================================================================

    #[test]
    fn test_client_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&ClientId(42)).unwrap();
        assert_eq!(json, "42");
    }

    #[test]
    fn test_room_id_serializes_as_plain_number() {
        let json = serde_json::to_string(&RoomId(7)).unwrap();
        assert_eq!(json, "7");
    }

    #[test]
    fn test_id_display() {
        assert_eq!(ClientId(3).to_string(), "C-3");
        assert_eq!(RoomId(9).to_string(), "R-9");
    }

    // =====================================================================
    // ClientMessage
    // =====================================================================

    #[test]
    fn test_set_nickname_wire_shape() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"type": "set_nickname", "nickname": "Alice"}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            ClientMessage::SetNickname {
                nickname: "Alice".into()
            }
        );
    }

    #[test]
    fn test_chat_message_plaintext() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{"type": "chat_message", "content": "hi"}"#,
        )
        .unwrap();
        match msg {
            ClientMessage::ChatMessage {
                content,
                encrypted_content,
                signature,
            } => {
                assert_eq!(content.as_deref(), Some("hi"));
                assert!(encrypted_content.is_none());
                assert!(signature.is_none());
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_chat_message_encrypted_envelope() {
        let msg: ClientMessage = serde_json::from_str(
            r#"{
                "type": "chat_message",
                "encrypted_content": {
                    "ciphertext": "YWJj",
                    "iv": "aXY=",
                    "tag": "dGFn"
                },
                "signature": "c2ln"
            }"#,
        )
        .unwrap();
        match msg {
            ClientMessage::ChatMessage {
                encrypted_content: Some(env),
                signature: Some(sig),
                ..
            } => {
                assert_eq!(env.ciphertext, "YWJj");
                assert_eq!(env.iv, "aXY=");
                assert_eq!(env.tag, "dGFn");
                assert_eq!(sig, "c2ln");
            }
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_unit_variants_parse_from_bare_type() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type": "join_matchmaking"}"#).unwrap();
        assert_eq!(msg, ClientMessage::JoinMatchmaking);

        let msg: ClientMessage =
            serde_json::from_str(r#"{"type": "get_room_info"}"#).unwrap();
        assert_eq!(msg, ClientMessage::GetRoomInfo);
    }

    #[test]
    fn test_voice_offer_ignores_sdp_payload_fields() {
        // The typed view only needs `to`; the raw frame (with offer/from)
        // is what actually gets relayed.
        let msg: ClientMessage = serde_json::from_str(
            r#"{
                "type": "voice_offer",
                "to": "Bob",
                "from": "Alice",
                "offer": {"sdp": "v=0...", "type": "offer"}
            }"#,
        )
        .unwrap();
        assert_eq!(msg, ClientMessage::VoiceOffer { to: "Bob".into() });
    }

    #[test]
    fn test_recognizes_known_and_unknown_types() {
        assert!(ClientMessage::recognizes("set_nickname"));
        assert!(ClientMessage::recognizes("voice_ice_candidate"));
        assert!(!ClientMessage::recognizes("fly_to_moon"));
        assert!(!ClientMessage::recognizes(""));
    }

    #[test]
    fn test_unknown_type_fails_typed_decode() {
        let result: Result<ClientMessage, _> =
            serde_json::from_str(r#"{"type": "fly_to_moon"}"#);
        assert!(result.is_err());
    }

    // =====================================================================
    // ServerMessage
    // =====================================================================

    #[test]
    fn test_error_wire_shape() {
        let json =
            serde_json::to_value(ServerMessage::error("Nickname already taken"))
                .unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["message"], "Nickname already taken");
    }

    #[test]
    fn test_match_found_wire_shape() {
        let json = serde_json::to_value(ServerMessage::MatchFound {
            room_id: RoomId(1),
            room_name: "Match Room 1".into(),
            opponent: "Bob".into(),
            message: "Match found!".into(),
        })
        .unwrap();
        assert_eq!(json["type"], "match_found");
        assert_eq!(json["room_id"], 1);
        assert_eq!(json["room_name"], "Match Room 1");
        assert_eq!(json["opponent"], "Bob");
    }

    #[test]
    fn test_room_info_omits_absent_fields() {
        let json = serde_json::to_value(ServerMessage::RoomInfo {
            in_room: false,
            room_id: None,
            room_name: None,
            members: None,
            created_at: None,
        })
        .unwrap();
        assert_eq!(json["type"], "room_info");
        assert_eq!(json["in_room"], false);
        assert!(json.get("room_id").is_none());
        assert!(json.get("members").is_none());
    }

    #[test]
    fn test_room_info_full_wire_shape() {
        let json = serde_json::to_value(ServerMessage::RoomInfo {
            in_room: true,
            room_id: Some(RoomId(2)),
            room_name: Some("Match Room 2".into()),
            members: Some(vec!["Alice".into(), "Bob".into()]),
            created_at: Some("2026-01-01T00:00:00Z".into()),
        })
        .unwrap();
        assert_eq!(json["in_room"], true);
        assert_eq!(json["room_id"], 2);
        assert_eq!(json["members"], serde_json::json!(["Alice", "Bob"]));
    }

    #[test]
    fn test_encrypted_chat_message_round_trips_envelope_untouched() {
        let envelope = CipherEnvelope {
            ciphertext: "Y2lwaGVy".into(),
            iv: "aXYxMjM=".into(),
            tag: "dGFnNDU2".into(),
        };
        let msg = ServerMessage::EncryptedChatMessage {
            nickname: "Alice".into(),
            encrypted_content: envelope.clone(),
            signature: None,
            timestamp: "2026-01-01T00:00:00Z".into(),
        };
        let bytes = serde_json::to_vec(&msg).unwrap();
        let decoded: ServerMessage = serde_json::from_slice(&bytes).unwrap();
        match decoded {
            ServerMessage::EncryptedChatMessage {
                encrypted_content, ..
            } => assert_eq!(encrypted_content, envelope),
            other => panic!("unexpected variant: {other:?}"),
        }
    }

    #[test]
    fn test_queue_update_wire_shape() {
        let json = serde_json::to_value(ServerMessage::QueueUpdate {
            position: 1,
            total_in_queue: 3,
        })
        .unwrap();
        assert_eq!(json["type"], "queue_update");
        assert_eq!(json["position"], 1);
        assert_eq!(json["total_in_queue"], 3);
    }

    #[test]
    fn test_decode_garbage_returns_error() {
        let result: Result<ClientMessage, _> =
            serde_json::from_slice(b"not json at all");
        assert!(result.is_err());
    }
}
