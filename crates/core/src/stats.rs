use chrono::Utc;

use crate::errors::{BalancerError, BalancerResult};

/// 总体标准差（除以N），空样本返回0
pub fn standard_deviation(samples: &[f64]) -> f64 {
    let n = samples.len();
    if n == 0 {
        return 0.0;
    }
    let mean = samples.iter().sum::<f64>() / n as f64;
    let variance = samples
        .iter()
        .map(|x| {
            let diff = x - mean;
            diff * diff
        })
        .sum::<f64>()
        / n as f64;
    variance.sqrt()
}

/// 为消息追加时间戳尾部：`;{now};{now - last_ts};`
///
/// 消息以分号分隔，最后一个字段必须是毫秒时间戳；每经过一跳追加一次，
/// 从不改写已有字段，用于多跳延迟累计。
pub fn register_time(content: &str) -> BalancerResult<String> {
    register_time_at(content, Utc::now().timestamp_millis())
}

/// `register_time` 的可测版本，`now_ms` 由调用方提供
pub fn register_time_at(content: &str, now_ms: i64) -> BalancerResult<String> {
    let trimmed = content.trim_end_matches(';');
    let last_field = trimmed.rsplit(';').next().unwrap_or("");
    let last_ts: i64 = last_field
        .trim()
        .parse()
        .map_err(|_| BalancerError::MalformedTrailer(last_field.to_string()))?;
    let delta = now_ms - last_ts;
    Ok(format!("{trimmed};{now_ms};{delta};"))
}
