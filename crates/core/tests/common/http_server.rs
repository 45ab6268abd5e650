//! A minimal scripted HTTP/1.1 server.
//!
//! Each accepted connection gets the next canned response, written verbatim
//! and followed by a close. The raw requests are returned for assertions.

#![allow(dead_code)]

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// A canned response: status line, content type and body chunks.
pub struct CannedResponse {
    pub status: &'static str,
    pub content_type: &'static str,
    pub chunks: Vec<String>,
}

impl CannedResponse {
    pub fn json(status: &'static str, body: &str) -> Self {
        Self {
            status,
            content_type: "application/json",
            chunks: vec![body.to_string()],
        }
    }

    pub fn event_stream(chunks: &[&str]) -> Self {
        Self {
            status: "200 OK",
            content_type: "text/event-stream",
            chunks: chunks.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Start a server answering one connection per canned response.
///
/// Returns the base URL and a handle yielding the raw requests received.
pub async fn serve(responses: Vec<CannedResponse>) -> (String, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().expect("Listener has no address");

    let handle = tokio::spawn(async move {
        let mut requests = Vec::new();
        for response in responses {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            requests.push(read_request(&mut socket).await);

            // No content-length: the body ends when the connection closes.
            let head = format!(
                "HTTP/1.1 {}\r\nContent-Type: {}\r\nConnection: close\r\n\r\n",
                response.status, response.content_type
            );
            if socket.write_all(head.as_bytes()).await.is_err() {
                continue;
            }
            for chunk in response.chunks {
                if socket.write_all(chunk.as_bytes()).await.is_err() {
                    break;
                }
                let _ = socket.flush().await;
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            }
            let _ = socket.shutdown().await;
        }
        requests
    });

    (format!("http://{addr}"), handle)
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 4096];

    loop {
        let head_end = find(&buffer, b"\r\n\r\n");
        if let Some(end) = head_end {
            let head = String::from_utf8_lossy(&buffer[..end]).to_lowercase();
            let body_len = buffer.len() - (end + 4);

            if head.contains("transfer-encoding: chunked") {
                if find(&buffer[end..], b"\r\n0\r\n\r\n").is_some() {
                    break;
                }
            } else {
                let expected = head
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if body_len >= expected {
                    break;
                }
            }
        }

        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buffer.extend_from_slice(&chunk[..n]),
        }
    }

    String::from_utf8_lossy(&buffer).into_owned()
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
