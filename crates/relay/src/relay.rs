use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use balancer_core::{BalancerResult, Endpoint};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::connection::Connection;
use crate::mailbox::Mailbox;

/// 分发重试循环中两次探测之间的间隔
pub const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// 中继的可注入行为：具体中继类型只需提供这两个行为
#[async_trait]
pub trait RelayBehavior: Send + Sync + 'static {
    /// 收到一个非ping帧（已去除首尾空白）
    async fn on_frame(&self, frame: String);

    /// 处理循环的一轮；内部可自行阻塞等待邮箱或队列
    async fn run_processing_cycle(&self);
}

/// 通用中继：一个监听套接字 + 一个出站连接 + 单槽邮箱
///
/// 持有连接生命周期机制（accept循环、目标重连循环、每连接读取任务、
/// 处理循环），Dispatcher与Worker通过`RelayBehavior`注入各自的语义。
pub struct Relay {
    name: String,
    local_port: u16,
    mailbox: Mailbox,
    downstream: Connection,
    running: AtomicBool,
    shutdown_tx: broadcast::Sender<()>,
}

impl Relay {
    pub fn new(name: impl Into<String>, local_port: u16, destination: Endpoint) -> Self {
        let (shutdown_tx, _) = broadcast::channel(16);
        Self {
            name: name.into(),
            local_port,
            mailbox: Mailbox::new(),
            downstream: Connection::new(destination),
            running: AtomicBool::new(true),
            shutdown_tx,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn local_port(&self) -> u16 {
        self.local_port
    }

    pub fn mailbox(&self) -> &Mailbox {
        &self.mailbox
    }

    pub fn downstream(&self) -> &Connection {
        &self.downstream
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// 订阅关闭信号
    pub fn subscribe_shutdown(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// 绑定监听端口并启动accept循环、目标连接循环与处理循环
    pub async fn start(self: &Arc<Self>, behavior: Arc<dyn RelayBehavior>) -> BalancerResult<()> {
        let listener = self.bind_listener()?;
        info!("{} 已启动，监听端口 {}", self.name, self.local_port);

        {
            let relay = Arc::clone(self);
            let behavior = Arc::clone(&behavior);
            tokio::spawn(async move {
                relay.accept_loop(listener, behavior).await;
            });
        }

        {
            let relay = Arc::clone(self);
            tokio::spawn(async move {
                let shutdown_rx = relay.subscribe_shutdown();
                relay.downstream.connect_with_retry(shutdown_rx).await;
            });
        }

        {
            let relay = Arc::clone(self);
            tokio::spawn(async move {
                relay.processing_loop(behavior).await;
            });
        }

        Ok(())
    }

    fn bind_listener(&self) -> BalancerResult<TcpListener> {
        let addr = SocketAddr::from(([127, 0, 0, 1], self.local_port));
        let socket = TcpSocket::new_v4()?;
        socket.set_reuseaddr(true)?;
        socket.bind(addr)?;
        Ok(socket.listen(1024)?)
    }

    async fn accept_loop(self: Arc<Self>, listener: TcpListener, behavior: Arc<dyn RelayBehavior>) {
        let mut shutdown_rx = self.subscribe_shutdown();
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => break,
                result = listener.accept() => match result {
                    Ok((stream, peer)) => {
                        debug!("{} 接受来自 {peer} 的连接", self.name);
                        let relay = Arc::clone(&self);
                        let behavior = Arc::clone(&behavior);
                        tokio::spawn(async move {
                            relay.read_frames(stream, behavior).await;
                        });
                    }
                    Err(e) => {
                        // accept失败不致命，继续等待下一个连接
                        error!("{} accept失败: {e}", self.name);
                    }
                },
            }
        }
        debug!("{} accept循环退出", self.name);
    }

    /// 每个入站连接一个读取任务：按行读帧，ping直接回复free，
    /// 其余内容交给行为处理；对端关闭或读错误时结束
    async fn read_frames(self: Arc<Self>, stream: TcpStream, behavior: Arc<dyn RelayBehavior>) {
        let (read_half, mut write_half) = stream.into_split();
        let mut lines = BufReader::new(read_half).lines();
        let mut shutdown_rx = self.subscribe_shutdown();

        loop {
            let line = tokio::select! {
                _ = shutdown_rx.recv() => break,
                line = lines.next_line() => line,
            };
            match line {
                Ok(Some(line)) => {
                    let frame = line.trim();
                    if frame.is_empty() {
                        continue;
                    }
                    if frame == "ping" {
                        // 存活探测走读取任务，不经过邮箱
                        if let Err(e) = write_half.write_all(b"free\n").await {
                            warn!("{} 回复探测失败: {e}", self.name);
                            break;
                        }
                    } else {
                        debug!("{} 收到: {frame}", self.name);
                        behavior.on_frame(frame.to_string()).await;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("{} 读取消息失败: {e}", self.name);
                    break;
                }
            }
        }
        debug!("{} 读取任务结束", self.name);
    }

    async fn processing_loop(self: Arc<Self>, behavior: Arc<dyn RelayBehavior>) {
        let mut shutdown_rx = self.subscribe_shutdown();
        while self.is_running() {
            tokio::select! {
                _ = shutdown_rx.recv() => break,
                _ = behavior.run_processing_cycle() => {}
            }
        }
        debug!("{} 处理循环退出", self.name);
    }

    /// 向出站连接发送存活探测
    pub async fn probe_is_free(&self) -> bool {
        self.downstream.probe_is_free().await
    }

    /// 通过出站连接发送内容
    pub async fn send(&self, content: &str) -> BalancerResult<()> {
        self.downstream.send(content).await
    }

    /// 停止中继：running置false为终态，广播关闭信号解除所有阻塞调用；幂等
    pub async fn stop(&self) {
        if self.running.swap(false, Ordering::SeqCst) {
            let _ = self.shutdown_tx.send(());
            self.downstream.disconnect().await;
            info!("{} 已停止", self.name);
        }
    }
}
