use std::sync::atomic::{AtomicUsize, Ordering};

/// 轮询游标：每次选择都前进一位，对Worker数量取模
///
/// 单个Dispatcher实例内全局有序；探测失败同样前进。
pub struct RoundRobinCursor {
    counter: AtomicUsize,
}

impl RoundRobinCursor {
    pub fn new() -> Self {
        Self {
            counter: AtomicUsize::new(0),
        }
    }

    /// 返回本次应探测的下标并前进游标
    pub fn next(&self, len: usize) -> usize {
        debug_assert!(len > 0);
        self.counter.fetch_add(1, Ordering::Relaxed) % len
    }
}

impl Default for RoundRobinCursor {
    fn default() -> Self {
        Self::new()
    }
}
