use anyhow::{Context, Result};
use balancer_core::AppConfig;
use balancer_dispatcher::Dispatcher;
use tokio::sync::broadcast;
use tracing::info;

/// 主应用程序：按配置搭建Dispatcher及其Worker池并运行到收到关闭信号
pub struct Application {
    config: AppConfig,
}

impl Application {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    pub async fn run(&self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        // 构造即创建并启动Worker池
        let dispatcher = Dispatcher::new(&self.config)
            .await
            .context("创建Dispatcher失败")?;
        dispatcher.start().await.context("启动Dispatcher失败")?;

        info!(
            "{} 就绪: 端口 {}, {} 个Worker, 队列容量 {}, 目标 {}",
            self.config.server.name,
            self.config.server.port,
            dispatcher.worker_count(),
            self.config.server.queue_capacity,
            self.config.target_endpoint(),
        );

        // 运行到收到关闭信号
        let _ = shutdown_rx.recv().await;

        dispatcher.stop().await;
        Ok(())
    }
}
