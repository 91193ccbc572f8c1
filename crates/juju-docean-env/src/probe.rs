//! TCP reachability probe

use std::time::Duration;
use tokio::net::TcpStream;

/// Whether `host:port` accepts a TCP connection within `timeout`
pub async fn port_open(host: &str, port: u16, timeout: Duration) -> bool {
    match tokio::time::timeout(timeout, TcpStream::connect((host, port))).await {
        Ok(Ok(_)) => true,
        Ok(Err(e)) => {
            tracing::debug!("{}:{} not reachable: {}", host, port, e);
            false
        }
        Err(_) => {
            tracing::debug!("{}:{} timed out after {:?}", host, port, timeout);
            false
        }
    }
}
