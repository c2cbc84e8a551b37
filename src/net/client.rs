//! Client side of the line protocol.

use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};

/// Send one line on a fresh connection and return the server's reply.
///
/// The reply is read until the server closes the connection, with the
/// trailing newline removed. A rejected connection answers without reading,
/// so a failed write is not an error as long as a reply arrives.
pub async fn send_line<A: ToSocketAddrs>(addr: A, line: &str) -> std::io::Result<String> {
    let mut stream = TcpStream::connect(addr).await?;

    let mut request = String::with_capacity(line.len() + 1);
    request.push_str(line);
    request.push('\n');
    let written = stream.write_all(request.as_bytes()).await;

    let mut reply = String::new();
    match stream.read_to_string(&mut reply).await {
        Ok(_) => {}
        Err(e) if reply.is_empty() => return Err(written.err().unwrap_or(e)),
        Err(_) => {}
    }
    if reply.is_empty() {
        written?;
    }

    Ok(reply.trim_end_matches(['\r', '\n']).to_string())
}

/// Like [`send_line`], but gives up after `timeout`.
pub async fn send_line_timeout<A: ToSocketAddrs>(
    addr: A,
    line: &str,
    timeout: Duration,
) -> std::io::Result<String> {
    tokio::time::timeout(timeout, send_line(addr, line))
        .await
        .map_err(|_| std::io::Error::new(std::io::ErrorKind::TimedOut, "no reply from server"))?
}
