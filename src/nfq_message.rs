use nfq::{Message, Queue, Verdict};
use tracing::warn;

use crate::queue::PacketSink;

// nfqueue 里挂起的一个包：payload 给队列看，verdict 时还给内核
pub struct NfqMessage(Message);

impl NfqMessage {
    pub fn accept(self, queue: &mut Queue) {
        self.verdict(queue, Verdict::Accept);
    }

    pub fn drop_on(self, queue: &mut Queue) {
        self.verdict(queue, Verdict::Drop);
    }

    fn verdict(self, queue: &mut Queue, verdict: Verdict) {
        let mut msg = self.0;
        msg.set_verdict(verdict);
        if let Err(e) = queue.verdict(msg) {
            warn!(error = %e, "failed to issue verdict");
        }
    }
}

impl AsRef<[u8]> for NfqMessage {
    fn as_ref(&self) -> &[u8] {
        self.0.get_payload()
    }
}

impl From<Message> for NfqMessage {
    fn from(value: Message) -> Self {
        Self(value)
    }
}

impl From<NfqMessage> for Message {
    fn from(value: NfqMessage) -> Self {
        value.0
    }
}

// ACCEPT verdict 把包还给内核
pub struct NfqSink<'a> {
    pub queue: &'a mut Queue,
}

impl PacketSink<NfqMessage> for NfqSink<'_> {
    fn write(&mut self, payload: NfqMessage) {
        payload.accept(self.queue);
    }
}
