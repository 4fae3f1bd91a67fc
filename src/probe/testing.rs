//! In-process stand-ins for fleet hosts acting as HTTP proxies.

use super::FetchConfig;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

pub(crate) struct FakeProxy {
    pub port: u16,
    /// Raw request heads, one per connection.
    pub requests: mpsc::UnboundedReceiver<String>,
}

/// Config pointing at a local proxy port with a short timeout.
pub(crate) fn local_config(port: u16) -> FetchConfig {
    FetchConfig {
        url: "http://fleet.test/wiki/Main_Page".to_string(),
        concurrency: 4,
        timeout_seconds: 2,
        port,
        header_name: "X-Wikia-Internal-Request".to_string(),
        header_value: "nagios".to_string(),
    }
}

/// Serve `response` to every connection after reading its request head.
pub(crate) async fn spawn_proxy(response: &'static str) -> FakeProxy {
    spawn_proxy_on("127.0.0.1:0", response).await
}

/// Like [`spawn_proxy`], listening on a given address.
pub(crate) async fn spawn_proxy_on(addr: &str, response: &'static str) -> FakeProxy {
    let listener = TcpListener::bind(addr).await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (tx, requests) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let tx = tx.clone();
            tokio::spawn(async move {
                let head = read_head(&mut socket).await;
                let _ = tx.send(head);
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    FakeProxy { port, requests }
}

/// Accept connections and never answer.
pub(crate) async fn spawn_silent_proxy() -> FakeProxy {
    spawn_silent_proxy_on("127.0.0.1:0").await
}

/// Like [`spawn_silent_proxy`], listening on a given address.
pub(crate) async fn spawn_silent_proxy_on(addr: &str) -> FakeProxy {
    let listener = TcpListener::bind(addr).await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let (_tx, requests) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    FakeProxy { port, requests }
}

async fn read_head(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    loop {
        let n = socket.read(&mut chunk).await.unwrap_or(0);
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }

    String::from_utf8_lossy(&buf).into_owned()
}
