use std::sync::Arc;

use async_trait::async_trait;
use balancer_core::{AppConfig, BalancerResult, Endpoint};
use balancer_relay::{Connection, Relay, RelayBehavior, POLL_INTERVAL};
use balancer_worker::{ServiceTime, Worker};
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::cursor::RoundRobinCursor;
use crate::queue::WorkQueue;

/// 到单个Worker的链路：同一条连接承载探测与数据
struct WorkerLink {
    name: String,
    conn: Arc<Connection>,
}

/// 负载均衡Dispatcher：持有有界队列与Worker池的中继
///
/// 读取路径把非ping帧入队（满则丢弃）；处理循环按轮询顺序探测Worker，
/// 找到空闲者即转发。Worker池在构造时创建并启动，生命周期与Dispatcher
/// 相同；Dispatcher自身由调用方另行启动。
pub struct Dispatcher {
    relay: Arc<Relay>,
    queue: Arc<WorkQueue>,
    cursor: RoundRobinCursor,
    workers: Vec<Arc<Worker>>,
    links: Vec<WorkerLink>,
}

impl Dispatcher {
    /// 按配置构建：创建并立即启动N个Worker（端口从port+1起连续分配），
    /// 并为每个Worker建立一条探测/数据链路
    pub async fn new(config: &AppConfig) -> BalancerResult<Arc<Self>> {
        config.validate()?;

        let target = config.target_endpoint();
        let relay = Arc::new(Relay::new(
            config.server.name.clone(),
            config.server.port,
            target.clone(),
        ));
        let queue = Arc::new(WorkQueue::new(config.server.queue_capacity));

        let service_time = ServiceTime::new(
            config.service.service_time_mean,
            config.service.service_time_stddev,
        )?;

        let count = config.worker_count();
        let base_port = config.server.port + 1;
        let mut workers = Vec::with_capacity(count);
        let mut links = Vec::with_capacity(count);

        for i in 0..count {
            let port = base_port + i as u16;
            let worker = Worker::new(
                format!("service{port}"),
                port,
                target.clone(),
                service_time,
                config.service.target_is_source,
            );
            worker.start().await?;

            let conn = Arc::new(Connection::new(Endpoint::new("127.0.0.1", port)));
            {
                let conn = Arc::clone(&conn);
                let shutdown_rx = relay.subscribe_shutdown();
                tokio::spawn(async move {
                    conn.connect_with_retry(shutdown_rx).await;
                });
            }

            links.push(WorkerLink {
                name: format!("service{port}"),
                conn,
            });
            workers.push(worker);
        }

        info!(
            "{} 创建了 {count} 个Worker，端口 {base_port} 起",
            config.server.name
        );

        Ok(Arc::new(Self {
            relay,
            queue,
            cursor: RoundRobinCursor::new(),
            workers,
            links,
        }))
    }

    pub fn relay(&self) -> &Arc<Relay> {
        &self.relay
    }

    pub fn queue(&self) -> &Arc<WorkQueue> {
        &self.queue
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// 启动Dispatcher自身的中继循环
    pub async fn start(self: &Arc<Self>) -> BalancerResult<()> {
        let behavior: Arc<dyn RelayBehavior> = Arc::clone(self) as Arc<dyn RelayBehavior>;
        self.relay.start(behavior).await
    }

    /// 停止Dispatcher及其Worker池
    pub async fn stop(&self) {
        self.relay.stop().await;
        for link in &self.links {
            link.conn.disconnect().await;
        }
        for worker in &self.workers {
            worker.stop().await;
        }
    }
}

#[async_trait]
impl RelayBehavior for Dispatcher {
    async fn on_frame(&self, frame: String) {
        if !self.queue.try_push(frame).await {
            warn!("{} 队列已满，丢弃消息", self.relay.name());
        }
    }

    /// 取出队首消息后进入分发重试循环：探测游标处的Worker，空闲即转发；
    /// 忙或发送失败都前进游标、等待一个间隔后换下一个Worker，
    /// 直到有Worker接收为止（无放弃路径）
    async fn run_processing_cycle(&self) {
        let msg = self.queue.recv().await;
        let count = self.links.len();
        if count == 0 {
            warn!("{} 没有Worker可用，丢弃消息", self.relay.name());
            return;
        }

        loop {
            let link = &self.links[self.cursor.next(count)];
            if link.conn.probe_is_free().await {
                match link.conn.send(&format!("{msg}\n")).await {
                    Ok(()) => {
                        info!("{} 已分发消息给 {}", self.relay.name(), link.name);
                        return;
                    }
                    Err(e) => {
                        warn!("{} 向 {} 发送失败: {e}", self.relay.name(), link.name);
                    }
                }
            } else {
                debug!("{} 等待 {} 空闲", self.relay.name(), link.name);
            }
            sleep(POLL_INTERVAL).await;
        }
    }
}
