//! Integration tests for the WebSocket transport.
//!
//! These spin up a real listener and a tokio-tungstenite client to
//! verify frames actually cross the network, including the close-code
//! path the rate limiter relies on.

#[cfg(feature = "websocket")]
mod websocket {
    use lanchat_transport::{
        CLOSE_POLICY_VIOLATION, Connection, Transport, WebSocketTransport,
    };

    type ClientWs = tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >;

    /// Binds on a random port, accepts one connection in the background,
    /// and connects a client to it.
    async fn server_and_client()
    -> (lanchat_transport::WebSocketConnection, ClientWs) {
        let mut transport = WebSocketTransport::bind("127.0.0.1:0")
            .await
            .expect("should bind");
        let addr = transport.local_addr().expect("should have local addr");

        let server_handle = tokio::spawn(async move {
            transport.accept().await.expect("should accept")
        });

        let (client_ws, _) =
            tokio_tungstenite::connect_async(format!("ws://{addr}"))
                .await
                .expect("client should connect");

        let server_conn = server_handle.await.expect("task should complete");
        (server_conn, client_ws)
    }

    #[tokio::test]
    async fn test_websocket_send_and_receive_text_frames() {
        let (server_conn, mut client_ws) = server_and_client().await;

        assert!(server_conn.id().0 > 0);
        assert!(server_conn.peer_addr().ip().is_loopback());

        // --- Server sends, client receives as text ---
        server_conn
            .send(br#"{"type":"user_list","users":[]}"#)
            .await
            .expect("send should succeed");

        use futures_util::StreamExt;
        let msg = client_ws.next().await.unwrap().unwrap();
        assert!(msg.is_text());
        assert_eq!(
            msg.into_text().unwrap().as_str(),
            r#"{"type":"user_list","users":[]}"#
        );

        // --- Client sends, server receives ---
        use futures_util::SinkExt;
        use tokio_tungstenite::tungstenite::Message;
        client_ws
            .send(Message::Text(r#"{"type":"get_users"}"#.into()))
            .await
            .unwrap();

        let received = server_conn
            .recv()
            .await
            .expect("recv should succeed")
            .expect("should have data");
        assert_eq!(received, br#"{"type":"get_users"}"#);

        server_conn.close().await.expect("close should succeed");
    }

    #[tokio::test]
    async fn test_websocket_recv_returns_none_on_client_close() {
        let (server_conn, mut client_ws) = server_and_client().await;

        use futures_util::SinkExt;
        use tokio_tungstenite::tungstenite::Message;
        client_ws.send(Message::Close(None)).await.unwrap();

        let result = server_conn.recv().await.expect("recv should not error");
        assert!(result.is_none(), "should return None on client close");
    }

    #[tokio::test]
    async fn test_websocket_close_with_policy_violation_code() {
        let (server_conn, mut client_ws) = server_and_client().await;

        server_conn
            .close_with_code(CLOSE_POLICY_VIOLATION, "Rate limit exceeded")
            .await
            .expect("close should succeed");

        use futures_util::StreamExt;
        use tokio_tungstenite::tungstenite::Message;
        let msg = client_ws.next().await.unwrap().unwrap();
        match msg {
            Message::Close(Some(frame)) => {
                assert_eq!(u16::from(frame.code), CLOSE_POLICY_VIOLATION);
                assert_eq!(frame.reason.as_str(), "Rate limit exceeded");
            }
            other => panic!("expected close frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_websocket_connection_ids_are_unique() {
        let (a, _ws_a) = server_and_client().await;
        let (b, _ws_b) = server_and_client().await;
        assert_ne!(a.id(), b.id());
    }
}
