use std::time::Duration;

use balancer_core::{BalancerError, BalancerResult};
use rand_distr::{Distribution, Normal};

/// 高斯分布的模拟服务时间采样器，参数单位为毫秒
///
/// 负采样值回退为均值：服务时间不允许出现瞬时或负的处理耗时。
#[derive(Debug, Clone, Copy)]
pub struct ServiceTime {
    mean_ms: f64,
    sampler: Normal<f64>,
}

impl ServiceTime {
    pub fn new(mean_ms: f64, stddev_ms: f64) -> BalancerResult<Self> {
        let sampler = Normal::new(mean_ms, stddev_ms).map_err(|e| {
            BalancerError::Configuration(format!(
                "非法服务时间分布 (mean={mean_ms}, stddev={stddev_ms}): {e}"
            ))
        })?;
        Ok(Self { mean_ms, sampler })
    }

    pub fn mean_ms(&self) -> f64 {
        self.mean_ms
    }

    fn clamp_ms(&self, raw_ms: f64) -> f64 {
        if raw_ms < 0.0 {
            self.mean_ms
        } else {
            raw_ms
        }
    }

    /// 采样一次处理耗时；配置值按毫秒计，睡眠按1/1000换算为秒
    pub fn sample(&self) -> Duration {
        let raw_ms = self.sampler.sample(&mut rand::rng());
        Duration::from_secs_f64(self.clamp_ms(raw_ms) / 1000.0)
    }
}
