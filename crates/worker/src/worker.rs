use std::sync::Arc;

use async_trait::async_trait;
use balancer_core::{register_time, BalancerResult, Endpoint};
use balancer_relay::{Relay, RelayBehavior};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::service_time::ServiceTime;

/// Worker中继：模拟处理延迟后把内容转发到下游
///
/// 读取路径与通用中继一致（ping回复free，其余进邮箱）；处理循环取出
/// 邮箱内容，按高斯分布睡眠，按需追加时间戳尾部，再发往下游。
pub struct Worker {
    relay: Arc<Relay>,
    service_time: ServiceTime,
    stamp_on_forward: bool,
}

impl Worker {
    pub fn new(
        name: impl Into<String>,
        local_port: u16,
        destination: Endpoint,
        service_time: ServiceTime,
        stamp_on_forward: bool,
    ) -> Arc<Self> {
        Arc::new(Self {
            relay: Arc::new(Relay::new(name, local_port, destination)),
            service_time,
            stamp_on_forward,
        })
    }

    pub fn relay(&self) -> &Arc<Relay> {
        &self.relay
    }

    pub fn name(&self) -> &str {
        self.relay.name()
    }

    pub fn local_port(&self) -> u16 {
        self.relay.local_port()
    }

    pub async fn start(self: &Arc<Self>) -> BalancerResult<()> {
        let behavior: Arc<dyn RelayBehavior> = Arc::clone(self) as Arc<dyn RelayBehavior>;
        self.relay.start(behavior).await
    }

    pub async fn stop(&self) {
        self.relay.stop().await;
    }
}

#[async_trait]
impl RelayBehavior for Worker {
    async fn on_frame(&self, frame: String) {
        if let Some(dropped) = self.relay.mailbox().put(frame).await {
            debug!("{} 覆盖未处理内容: {dropped}", self.name());
        }
    }

    async fn run_processing_cycle(&self) {
        let content = self.relay.mailbox().recv().await;

        let delay = self.service_time.sample();
        debug!("{} 模拟处理 {:?}", self.name(), delay);
        sleep(delay).await;

        let content = if self.stamp_on_forward {
            match register_time(&content) {
                Ok(stamped) => stamped,
                Err(e) => {
                    error!("{} 追加时间戳失败，丢弃消息: {e}", self.name());
                    return;
                }
            }
        } else {
            content
        };

        match self.relay.send(&format!("{content}\n")).await {
            Ok(()) => info!("{} 已转发处理后的消息", self.name()),
            Err(e) => warn!("{} 转发失败，消息丢失: {e}", self.name()),
        }
    }
}
