use ::config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::errors::{BalancerError, BalancerResult};
use crate::models::Endpoint;

/// 应用配置：server段描述负载均衡器自身，service段描述Worker及其目标
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub service: ServiceConfig,
}

/// 负载均衡器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 负载均衡器名称
    #[serde(default = "default_name")]
    pub name: String,
    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,
    /// 等待队列容量，超出即丢弃
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Worker数量列表，仅第一个元素生效
    #[serde(default = "default_workers")]
    pub workers: Vec<usize>,
}

/// Worker服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// 下游目标IP
    #[serde(default = "default_target_ip")]
    pub target_ip: String,
    /// 下游目标端口
    #[serde(default = "default_target_port")]
    pub target_port: u16,
    /// 模拟服务时间均值（毫秒）
    #[serde(default = "default_service_time_mean")]
    pub service_time_mean: f64,
    /// 模拟服务时间标准差（毫秒）
    #[serde(default = "default_service_time_stddev")]
    pub service_time_stddev: f64,
    /// 目标是否为流量源（往返测量模式，开启时间戳尾部）
    #[serde(default)]
    pub target_is_source: bool,
}

fn default_name() -> String {
    "LoadBalancer".to_string()
}

fn default_port() -> u16 {
    2000
}

fn default_queue_capacity() -> usize {
    100
}

fn default_workers() -> Vec<usize> {
    vec![1]
}

fn default_target_ip() -> String {
    "localhost".to_string()
}

fn default_target_port() -> u16 {
    3000
}

fn default_service_time_mean() -> f64 {
    100.0
}

fn default_service_time_stddev() -> f64 {
    2.0
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            port: default_port(),
            queue_capacity: default_queue_capacity(),
            workers: default_workers(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            target_ip: default_target_ip(),
            target_port: default_target_port(),
            service_time_mean: default_service_time_mean(),
            service_time_stddev: default_service_time_stddev(),
            target_is_source: false,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            service: ServiceConfig::default(),
        }
    }
}

impl AppConfig {
    /// 加载配置：YAML文件 + BALANCER_*环境变量覆盖，缺失字段回退默认值
    pub fn load(config_path: Option<&str>) -> BalancerResult<Self> {
        let mut builder = Config::builder();

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path).required(false));
        }

        builder = builder.add_source(Environment::with_prefix("BALANCER").separator("__"));

        let config = builder
            .build()
            .map_err(|e| BalancerError::Configuration(format!("构建配置失败: {e}")))?;

        let app_config: AppConfig = config
            .try_deserialize()
            .map_err(|e| BalancerError::Configuration(format!("解析配置失败: {e}")))?;

        app_config.validate()?;
        Ok(app_config)
    }

    /// 启动时一次性校验
    pub fn validate(&self) -> BalancerResult<()> {
        if self.server.name.is_empty() {
            return Err(BalancerError::Configuration(
                "server.name 不能为空".to_string(),
            ));
        }
        if self.server.port == 0 {
            return Err(BalancerError::Configuration(
                "server.port 必须大于0".to_string(),
            ));
        }
        if self.server.queue_capacity == 0 {
            return Err(BalancerError::Configuration(
                "server.queue_capacity 必须大于0".to_string(),
            ));
        }
        let workers = self.worker_count();
        if workers == 0 {
            return Err(BalancerError::Configuration(
                "server.workers 第一个元素必须大于0".to_string(),
            ));
        }
        // Worker端口从 port+1 开始连续分配
        if usize::from(self.server.port) + workers > usize::from(u16::MAX) {
            return Err(BalancerError::Configuration(format!(
                "Worker端口超出范围: 基准端口 {} + {} 个Worker",
                self.server.port, workers
            )));
        }
        if self.service.service_time_mean < 0.0 {
            return Err(BalancerError::Configuration(
                "service.service_time_mean 不能为负".to_string(),
            ));
        }
        if self.service.service_time_stddev < 0.0 {
            return Err(BalancerError::Configuration(
                "service.service_time_stddev 不能为负".to_string(),
            ));
        }
        Ok(())
    }

    /// 实际生效的Worker数量（列表仅首元素生效）
    pub fn worker_count(&self) -> usize {
        self.server.workers.first().copied().unwrap_or(1)
    }

    /// Worker的下游目标端点
    pub fn target_endpoint(&self) -> Endpoint {
        Endpoint::new(self.service.target_ip.clone(), self.service.target_port)
    }
}
