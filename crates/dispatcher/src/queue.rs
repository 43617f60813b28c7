use std::collections::VecDeque;

use tokio::sync::{Mutex, Notify};

/// 有界FIFO工作队列
///
/// 背压策略为丢弃最新（drop-newest）：队列满时`try_push`拒绝新消息，
/// 既有内容不受影响。任何读取任务都可入队，只有处理循环出队。
pub struct WorkQueue {
    inner: Mutex<VecDeque<String>>,
    capacity: usize,
    notify: Notify,
}

impl WorkQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            notify: Notify::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 入队；满时返回false且队列内容不变
    pub async fn try_push(&self, msg: String) -> bool {
        {
            let mut queue = self.inner.lock().await;
            if queue.len() >= self.capacity {
                return false;
            }
            queue.push_back(msg);
        }
        self.notify.notify_one();
        true
    }

    /// 弹出最早入队的消息
    pub async fn pop(&self) -> Option<String> {
        self.inner.lock().await.pop_front()
    }

    /// 阻塞等待直到队列非空并弹出队首
    pub async fn recv(&self) -> String {
        loop {
            if let Some(msg) = self.pop().await {
                return msg;
            }
            self.notify.notified().await;
        }
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}
