use tokio::sync::{Mutex, Notify};

/// 单槽邮箱：读取线程与处理循环之间传递内容的一容量缓冲
///
/// 写入覆盖未消费的旧内容（last-writer-wins），设计上有损；
/// 消费方通过`recv`阻塞等待写入唤醒，不做定时轮询。
pub struct Mailbox {
    slot: Mutex<Option<String>>,
    notify: Notify,
}

impl Mailbox {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
            notify: Notify::new(),
        }
    }

    /// 写入内容，返回被覆盖的未消费内容（若有）
    pub async fn put(&self, content: String) -> Option<String> {
        let replaced = {
            let mut slot = self.slot.lock().await;
            slot.replace(content)
        };
        self.notify.notify_one();
        replaced
    }

    /// 原子地取出并清空
    pub async fn take(&self) -> Option<String> {
        self.slot.lock().await.take()
    }

    /// 阻塞等待直到有内容可取
    pub async fn recv(&self) -> String {
        loop {
            if let Some(content) = self.take().await {
                return content;
            }
            self.notify.notified().await;
        }
    }

    pub async fn is_empty(&self) -> bool {
        self.slot.lock().await.is_none()
    }
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new()
    }
}
