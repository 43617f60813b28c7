use std::fmt;

use serde::{Deserialize, Serialize};

/// 网络对端标识：IP + 端口，配置时创建后不再变更
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub ip: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(ip: impl Into<String>, port: u16) -> Self {
        Self {
            ip: ip.into(),
            port,
        }
    }

    /// 转换为可用于connect的地址字符串
    pub fn addr(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_addr() {
        let ep = Endpoint::new("localhost", 3000);
        assert_eq!(ep.addr(), "localhost:3000");
        assert_eq!(ep.to_string(), "localhost:3000");
    }

    #[test]
    fn test_endpoint_equality() {
        assert_eq!(Endpoint::new("127.0.0.1", 80), Endpoint::new("127.0.0.1", 80));
        assert_ne!(Endpoint::new("127.0.0.1", 80), Endpoint::new("127.0.0.1", 81));
    }
}
