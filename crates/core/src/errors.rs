use thiserror::Error;

/// 负载均衡器错误类型定义
#[derive(Debug, Error)]
pub enum BalancerError {
    #[error("尚未建立到目标的出站连接")]
    NotConnected,

    #[error("连接目标失败: {0}")]
    ConnectFailed(String),

    #[error("时间戳尾部字段无效: {0}")]
    MalformedTrailer(String),

    #[error("配置错误: {0}")]
    Configuration(String),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),
}

/// 统一的Result类型
pub type BalancerResult<T> = std::result::Result<T, BalancerError>;
