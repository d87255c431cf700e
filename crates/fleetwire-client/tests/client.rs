//! Integration tests for the client stub against a hand-rolled server.

use fleetwire_client::{Client, ClientError, Connection};
use fleetwire_protocol::{Codec, Framing, JsonCodec, Request, Response};
use fleetwire_transport::{FramedConnection, FramedTcpListener, Listener};
use serde_json::json;

/// A minimal server: answers every request with `{"echo": <name>}`,
/// closing after `limit` responses if a limit is given.
async fn spawn_echo_server(framing: Framing, limit: Option<usize>) -> String {
    let mut listener = FramedTcpListener::bind("127.0.0.1:0", framing)
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr").to_string();

    tokio::spawn(async move {
        loop {
            let mut conn = match listener.accept().await {
                Ok(conn) => conn,
                Err(_) => return,
            };
            tokio::spawn(async move {
                let mut answered = 0;
                while let Ok(Some(frame)) = conn.recv_frame().await {
                    let request: Request = JsonCodec.decode(&frame).expect("request");
                    let body = json!({"echo": request.action.to_string()});
                    let response = Response::ok(body.as_object().unwrap().clone());
                    let bytes = JsonCodec.encode(&response).expect("encode");
                    conn.send_frame(&bytes).await.expect("send");
                    answered += 1;
                    if limit.is_some_and(|limit| answered >= limit) {
                        let _ = conn.close().await;
                        return;
                    }
                }
            });
        }
    });

    addr
}

#[tokio::test]
async fn test_one_shot_call() {
    for framing in [Framing::Newline, Framing::LengthPrefixed] {
        let addr = spawn_echo_server(framing, None).await;
        let client = Client::new(&addr).framing(framing);

        let response = client.call(&Request::named("ping")).await.expect("call");
        match response {
            Response::Ok(body) => assert_eq!(body["echo"], "ping"),
            other => panic!("expected success, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn test_persistent_connection_pairs_requests_and_responses() {
    let addr = spawn_echo_server(Framing::Newline, None).await;
    let mut conn = Connection::open(&addr, Framing::Newline).await.expect("open");

    for name in ["first", "second", "third"] {
        let response = conn.send(&Request::named(name)).await.expect("send");
        match response {
            Response::Ok(body) => assert_eq!(body["echo"], name),
            other => panic!("expected success, got {other:?}"),
        }
    }
    conn.close().await;
}

#[tokio::test]
async fn test_peer_close_before_response_is_closed_error() {
    // The server answers exactly one request, then hangs up.
    let addr = spawn_echo_server(Framing::Newline, Some(1)).await;
    let mut conn = Connection::open(&addr, Framing::Newline).await.expect("open");

    conn.send(&Request::named("only")).await.expect("first send");
    let err = conn.send(&Request::named("too-late")).await.unwrap_err();
    assert!(matches!(err, ClientError::Closed));
}

#[tokio::test]
async fn test_connect_to_dead_address_fails() {
    // Bind a port, then drop the listener so nothing is there.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);

    let err = Client::new(&addr).call(&Request::named("ping")).await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)));
}
