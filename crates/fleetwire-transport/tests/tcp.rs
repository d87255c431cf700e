//! Integration tests for framed TCP I/O over real loopback sockets.

use fleetwire_protocol::{DEFAULT_MAX_FRAME_LEN, Framing, encode_frame};
use fleetwire_transport::{FramedConnection, FramedTcpListener, FramedTcpStream, Listener};
use tokio::io::AsyncWriteExt;

/// Binds a listener on a random port and returns it with its address.
async fn bind(framing: Framing) -> (FramedTcpListener, String) {
    let listener = FramedTcpListener::bind("127.0.0.1:0", framing)
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr").to_string();
    (listener, addr)
}

#[tokio::test]
async fn test_round_trip_both_framings() {
    for framing in [Framing::Newline, Framing::LengthPrefixed] {
        let (mut listener, addr) = bind(framing).await;
        let server = tokio::spawn(async move {
            let mut conn = listener.accept().await.expect("accept");
            let frame = conn.recv_frame().await.expect("recv").expect("frame");
            conn.send_frame(&frame).await.expect("echo");
        });

        let mut client = FramedTcpStream::connect(&addr, framing).await.expect("connect");
        client.send_frame(br#"{"name":"ping"}"#).await.expect("send");
        let echoed = client.recv_frame().await.expect("recv").expect("frame");
        assert_eq!(echoed, br#"{"name":"ping"}"#);
        server.await.unwrap();
    }
}

#[tokio::test]
async fn test_several_frames_in_one_write_arrive_in_order() {
    let framing = Framing::Newline;
    let (mut listener, addr) = bind(framing).await;

    let server = tokio::spawn(async move {
        let mut conn = listener.accept().await.expect("accept");
        let mut frames = Vec::new();
        for _ in 0..3 {
            frames.push(conn.recv_frame().await.expect("recv").expect("frame"));
        }
        frames
    });

    // Write all three frames in a single syscall via a raw socket.
    let mut wire = Vec::new();
    for i in 0..3 {
        let payload = format!("{{\"seq\":{i}}}");
        wire.extend(encode_frame(framing, payload.as_bytes(), DEFAULT_MAX_FRAME_LEN).unwrap());
    }
    let mut raw = tokio::net::TcpStream::connect(&addr).await.expect("connect");
    raw.write_all(&wire).await.expect("write");

    let frames = server.await.unwrap();
    assert_eq!(frames.len(), 3);
    for (i, frame) in frames.iter().enumerate() {
        assert_eq!(frame, format!("{{\"seq\":{i}}}").as_bytes());
    }
}

#[tokio::test]
async fn test_byte_dribble_still_decodes() {
    for framing in [Framing::Newline, Framing::LengthPrefixed] {
        let (mut listener, addr) = bind(framing).await;
        let server = tokio::spawn(async move {
            let mut conn = listener.accept().await.expect("accept");
            conn.recv_frame().await.expect("recv").expect("frame")
        });

        let payload = br#"{"name":"locations"}"#;
        let frame = encode_frame(framing, payload, DEFAULT_MAX_FRAME_LEN).unwrap();
        let mut raw = tokio::net::TcpStream::connect(&addr).await.expect("connect");
        for byte in &frame {
            raw.write_all(std::slice::from_ref(byte)).await.expect("write");
            raw.flush().await.expect("flush");
        }

        assert_eq!(server.await.unwrap(), payload);
    }
}

#[tokio::test]
async fn test_clean_close_reports_none() {
    let (mut listener, addr) = bind(Framing::Newline).await;
    let server = tokio::spawn(async move {
        let mut conn = listener.accept().await.expect("accept");
        conn.recv_frame().await
    });

    let mut client = FramedTcpStream::connect(&addr, Framing::Newline)
        .await
        .expect("connect");
    client.close().await.expect("close");

    assert!(matches!(server.await.unwrap(), Ok(None)));
}

#[tokio::test]
async fn test_mid_frame_close_is_an_error() {
    let (mut listener, addr) = bind(Framing::LengthPrefixed).await;
    let server = tokio::spawn(async move {
        let mut conn = listener.accept().await.expect("accept");
        conn.recv_frame().await
    });

    // Two bytes of a four-byte length prefix, then hang up.
    let mut raw = tokio::net::TcpStream::connect(&addr).await.expect("connect");
    raw.write_all(&[0x00, 0x00]).await.expect("write");
    raw.shutdown().await.expect("shutdown");
    drop(raw);

    assert!(matches!(
        server.await.unwrap(),
        Err(fleetwire_transport::TransportError::Closed)
    ));
}

#[tokio::test]
async fn test_oversized_frame_is_a_frame_error() {
    let (listener, addr) = bind(Framing::LengthPrefixed).await;
    let mut listener = listener.with_max_frame_len(64);
    let server = tokio::spawn(async move {
        let mut conn = listener.accept().await.expect("accept");
        conn.recv_frame().await
    });

    let mut raw = tokio::net::TcpStream::connect(&addr).await.expect("connect");
    raw.write_all(&(1_000_000u32).to_be_bytes()).await.expect("write");

    assert!(matches!(
        server.await.unwrap(),
        Err(fleetwire_transport::TransportError::Frame(_))
    ));
}
