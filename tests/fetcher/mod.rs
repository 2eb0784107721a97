use crate::{init_logging, payload, refused_port, response, start_server, target, ScriptedServer};
use multiget::fetcher::MAX_LINE;
use multiget::{ChunkSink, ChunkSpec, Error, FetchState, Phase, RangeFetcher, Target};
use std::net::TcpListener;
use std::sync::Arc;
use tempfile::TempDir;

const FULL_HISTORY: [Phase; 7] = [
    Phase::Resolving,
    Phase::Connecting,
    Phase::RequestSent,
    Phase::StatusLineRead,
    Phase::HeadersRead,
    Phase::BodyStreaming,
    Phase::Complete,
];

async fn fetch(target: Target, spec: ChunkSpec, dir: &TempDir) -> FetchState {
    init_logging();
    let sink = ChunkSink::new(dir.path().join(format!("out.chunk{}", spec.index)));
    RangeFetcher::new(Arc::new(target), spec, sink).run().await
}

fn sink_contents(state: &FetchState) -> Vec<u8> {
    std::fs::read(state.sink_path()).unwrap()
}

#[tokio::test]
async fn partial_content_walks_every_phase() {
    let server = ScriptedServer::start(|_| {
        response(
            "HTTP/1.1 206 Partial Content\r\nContent-Range: bytes 0-3/10\r\nContent-Length: 4",
            b"abcd",
        )
    });
    let dir = tempfile::tempdir().unwrap();
    let state = fetch(target(server.port), ChunkSpec::new(0, 0, 3), &dir).await;

    assert_eq!(state.history(), &FULL_HISTORY);
    assert!(state.is_complete());
    assert!(state.error().is_none());
    assert_eq!(state.bytes_written(), 4);
    assert_eq!(sink_contents(&state), b"abcd");
    assert_eq!(
        server.requests(),
        vec![
            "GET /file.bin HTTP/1.1\r\nHost: 127.0.0.1\r\nRange: bytes=0-3\r\nConnection: close\r\n\r\n"
                .to_string()
        ]
    );
}

#[tokio::test]
async fn not_found_fails_without_reading_the_body() {
    let server =
        ScriptedServer::start(|_| response("HTTP/1.1 404 Not Found\r\nContent-Length: 9", b"not found"));
    let dir = tempfile::tempdir().unwrap();
    let state = fetch(target(server.port), ChunkSpec::new(0, 0, 3), &dir).await;

    assert_eq!(state.phase(), Phase::Failed);
    assert!(matches!(state.error(), Some(Error::HttpStatus { code: 404 })));
    assert_eq!(state.history().last(), Some(&Phase::Failed));
    assert!(!state.history().contains(&Phase::BodyStreaming));
    assert_eq!(state.bytes_written(), 0);
    assert!(sink_contents(&state).is_empty());
}

#[tokio::test]
async fn body_without_length_is_read_until_close() {
    let body = payload(100_000);
    let served = body.clone();
    let server = ScriptedServer::start(move |_| response("HTTP/1.1 200 OK", &served));
    let dir = tempfile::tempdir().unwrap();
    let state = fetch(target(server.port), ChunkSpec::whole(0), &dir).await;

    assert!(state.is_complete());
    assert_eq!(state.bytes_written(), body.len() as u64);
    assert_eq!(sink_contents(&state), body);
}

#[tokio::test]
async fn whole_resource_request_has_no_range() {
    let server = ScriptedServer::start(|_| response("HTTP/1.1 200 OK", b"everything"));
    let dir = tempfile::tempdir().unwrap();
    let state = fetch(target(server.port), ChunkSpec::whole(0), &dir).await;

    assert!(state.is_complete());
    assert_eq!(
        server.requests(),
        vec!["GET /file.bin HTTP/1.1\r\nHost: 127.0.0.1\r\nConnection: close\r\n\r\n".to_string()]
    );
}

#[tokio::test]
async fn refused_connection() {
    let dir = tempfile::tempdir().unwrap();
    let state = fetch(target(refused_port()), ChunkSpec::new(0, 0, 3), &dir).await;

    assert!(matches!(state.error(), Some(Error::Connection(..))));
    assert_eq!(
        state.history(),
        &[Phase::Resolving, Phase::Connecting, Phase::Failed]
    );
}

#[tokio::test]
async fn malformed_status_line() {
    let server = ScriptedServer::start(|_| response("HTP/1.1 200 OK", b"abcd"));
    let dir = tempfile::tempdir().unwrap();
    let state = fetch(target(server.port), ChunkSpec::new(0, 0, 3), &dir).await;

    assert!(matches!(state.error(), Some(Error::Protocol(_))));
    assert_eq!(state.bytes_written(), 0);
}

#[tokio::test]
async fn closed_before_status_line() {
    let server = ScriptedServer::start(|_| Vec::new());
    let dir = tempfile::tempdir().unwrap();
    let state = fetch(target(server.port), ChunkSpec::new(0, 0, 3), &dir).await;

    match state.error() {
        Some(Error::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof),
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn unusable_port_fails_resolution() {
    let dir = tempfile::tempdir().unwrap();
    let target = Target::new("127.0.0.1", "not-a-port", "/file.bin");
    let state = fetch(target, ChunkSpec::new(0, 0, 3), &dir).await;

    assert!(matches!(state.error(), Some(Error::Resolution(..))));
    assert_eq!(state.history(), &[Phase::Resolving, Phase::Failed]);
}

#[tokio::test]
async fn range_against_static_server() {
    let dir = tempfile::tempdir().unwrap();
    let data = payload(10_000);
    let file = dir.path().join("served.bin");
    std::fs::write(&file, &data).unwrap();
    let addr = start_server(file);

    let state = fetch(target(addr.port()), ChunkSpec::new(3, 4096, 8191), &dir).await;

    assert_eq!(state.history(), &FULL_HISTORY);
    assert_eq!(sink_contents(&state), &data[4096..8192]);
}

#[tokio::test]
async fn dropping_the_state_removes_the_sink() {
    let server = ScriptedServer::start(|_| response("HTTP/1.1 206 Partial Content", b"ab"));
    let dir = tempfile::tempdir().unwrap();
    let state = fetch(target(server.port), ChunkSpec::new(0, 0, 1), &dir).await;
    let path = state.sink_path().to_path_buf();
    assert!(path.exists());

    drop(state);
    assert!(!path.exists());
}

#[tokio::test]
async fn closed_inside_headers() {
    let server = ScriptedServer::start(|_| b"HTTP/1.1 206 Partial Content\r\nX: y\r\n".to_vec());
    let dir = tempfile::tempdir().unwrap();
    let state = fetch(target(server.port), ChunkSpec::new(0, 0, 3), &dir).await;

    match state.error() {
        Some(Error::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof),
        other => panic!("unexpected {:?}", other),
    }
    assert!(state.history().ends_with(&[Phase::StatusLineRead, Phase::HeadersRead, Phase::Failed]));
    assert_eq!(state.bytes_written(), 0);
}

#[tokio::test]
async fn endless_status_line_is_rejected() {
    let server = ScriptedServer::start(|_| vec![b'a'; MAX_LINE as usize + 100]);
    let dir = tempfile::tempdir().unwrap();
    let state = fetch(target(server.port), ChunkSpec::new(0, 0, 3), &dir).await;

    assert!(matches!(state.error(), Some(Error::Protocol(_))));
    assert_eq!(state.history().last(), Some(&Phase::Failed));
}

#[tokio::test]
async fn endless_header_is_rejected() {
    let server = ScriptedServer::start(|_| {
        let mut out = b"HTTP/1.1 200 OK\r\nX-Long: ".to_vec();
        out.extend(std::iter::repeat(b'b').take(MAX_LINE as usize * 2));
        out
    });
    let dir = tempfile::tempdir().unwrap();
    let state = fetch(target(server.port), ChunkSpec::new(0, 0, 3), &dir).await;

    assert!(matches!(state.error(), Some(Error::Protocol(_))));
    assert!(state.history().ends_with(&[Phase::HeadersRead, Phase::Failed]));
}

#[tokio::test]
async fn ipv6_literal_url() {
    let listener = match TcpListener::bind("[::1]:0") {
        Ok(l) => l,
        // host without IPv6 loopback
        Err(_) => return,
    };
    let port = listener.local_addr().unwrap().port();
    let server = ScriptedServer::start_on(listener, |_| response("HTTP/1.1 206 Partial Content", b"v6"));
    let dir = tempfile::tempdir().unwrap();
    let target = Target::parse(&format!("http://[::1]:{}/file.bin", port)).unwrap();
    let state = fetch(target, ChunkSpec::new(0, 0, 1), &dir).await;

    assert_eq!(state.history(), &FULL_HISTORY);
    assert_eq!(sink_contents(&state), b"v6");
    assert!(server.requests()[0].contains("Host: [::1]\r\n"));
}
