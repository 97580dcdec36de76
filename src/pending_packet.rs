// 延迟队列里的一条记录：到点就交给 sink，之后记录销毁
#[derive(Debug)]
pub struct PendingPacket<T> {
    pub release_at: u64, // 允许发出的时刻 (ms)
    pub payload: T,
}

impl<T> PendingPacket<T> {
    pub fn new(release_at: u64, payload: T) -> Self {
        Self { release_at, payload }
    }

    pub fn is_due(&self, now: u64) -> bool {
        self.release_at <= now
    }
}
