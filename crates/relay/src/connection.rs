use std::time::Duration;

use balancer_core::{BalancerError, BalancerResult, Endpoint};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, Mutex};
use tokio::time::{sleep, timeout};
use tracing::{info, warn};

/// 连接失败后的重试间隔
pub const CONNECT_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// 存活探测的读超时
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// 到某个对端的出站连接
///
/// 同一条TCP连接既是控制通道（ping/free探测）也是数据通道。
/// 连接建立后不自动重连，出站连接丢失只会在下一次send失败时暴露。
pub struct Connection {
    endpoint: Endpoint,
    stream: Mutex<Option<TcpStream>>,
}

impl Connection {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            stream: Mutex::new(None),
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// 单次连接尝试
    pub async fn connect(&self) -> BalancerResult<()> {
        let stream = TcpStream::connect(self.endpoint.addr())
            .await
            .map_err(|e| BalancerError::ConnectFailed(format!("{}: {e}", self.endpoint)))?;
        *self.stream.lock().await = Some(stream);
        Ok(())
    }

    /// 无限重试直到连接成功或收到关闭信号，失败间隔1秒
    pub async fn connect_with_retry(&self, mut shutdown_rx: broadcast::Receiver<()>) {
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => return,
                result = self.connect() => match result {
                    Ok(()) => {
                        info!("已连接到目标 {}", self.endpoint);
                        return;
                    }
                    Err(e) => {
                        warn!("连接失败，1秒后重试: {e}");
                    }
                },
            }
            tokio::select! {
                _ = shutdown_rx.recv() => return,
                _ = sleep(CONNECT_RETRY_INTERVAL) => {}
            }
        }
    }

    pub async fn is_connected(&self) -> bool {
        self.stream.lock().await.is_some()
    }

    /// 发送内容；尚未建立连接时返回`NotConnected`
    pub async fn send(&self, content: &str) -> BalancerResult<()> {
        let mut guard = self.stream.lock().await;
        let stream = guard.as_mut().ok_or(BalancerError::NotConnected)?;
        stream.write_all(content.as_bytes()).await?;
        Ok(())
    }

    /// 存活探测：发送`ping\n`，2秒内回复恰好为`free`才算空闲
    ///
    /// 超时、连接关闭或任何其他回复一律视为忙。
    pub async fn probe_is_free(&self) -> bool {
        let mut guard = self.stream.lock().await;
        let Some(stream) = guard.as_mut() else {
            return false;
        };
        if stream.write_all(b"ping\n").await.is_err() {
            return false;
        }

        let mut buf = [0u8; 64];
        match timeout(PROBE_TIMEOUT, stream.read(&mut buf)).await {
            Ok(Ok(n)) if n > 0 => String::from_utf8_lossy(&buf[..n]).trim() == "free",
            _ => false,
        }
    }

    /// 丢弃出站连接
    pub async fn disconnect(&self) {
        self.stream.lock().await.take();
    }
}
