use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime};

use log::{debug, warn};

use crate::error::{Error, Result};
use crate::sniffer::{Packet, PacketConsumer, RxMeta};

/// A frame copied out of the receive buffer.
#[derive(Clone, Debug)]
pub struct OwnedPacket {
    pub timestamp: SystemTime,
    pub data: Vec<u8>,
    pub meta: RxMeta,
}

impl From<&Packet<'_>> for OwnedPacket {
    fn from(packet: &Packet<'_>) -> Self {
        OwnedPacket {
            timestamp: SystemTime::now(),
            data: packet.bytes().to_vec(),
            meta: packet.meta,
        }
    }
}

/// Hands matched frames to a worker thread over a bounded queue.
///
/// The receive path never waits on the worker: when the queue is full the frame is
/// dropped and counted.
pub struct QueuedConsumer {
    tx: SyncSender<OwnedPacket>,
    queued: AtomicU64,
    dropped: AtomicU64,
}

impl QueuedConsumer {
    /// Start a worker named `name` that calls `handler` for every queued frame.
    pub fn spawn<F>(
        name: &str,
        capacity: usize,
        handler: F,
    ) -> Result<(Arc<QueuedConsumer>, QueueWorker)>
    where
        F: FnMut(OwnedPacket) + Send + 'static,
    {
        if capacity == 0 {
            return Err(Error::InvalidArgument("queue capacity must be non-zero".into()));
        }
        let (tx, rx) = mpsc::sync_channel(capacity);
        let alive = Arc::new(AtomicBool::new(true));

        let handle = {
            let alive = alive.clone();
            thread::Builder::new()
                .name(name.to_string())
                .spawn(move || run_worker(rx, alive, handler))?
        };
        debug!("Queue worker {name} started ({capacity} slots)");

        let consumer = Arc::new(QueuedConsumer {
            tx,
            queued: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        });
        let worker = QueueWorker {
            name: name.to_string(),
            handle: Some(handle),
            alive,
        };
        Ok((consumer, worker))
    }

    pub fn queued(&self) -> u64 {
        self.queued.load(Ordering::Relaxed)
    }

    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl PacketConsumer for QueuedConsumer {
    fn on_packet(&self, packet: &Packet<'_>) {
        match self.tx.try_send(packet.into()) {
            Ok(()) => {
                self.queued.fetch_add(1, Ordering::Relaxed);
            }
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

fn run_worker<F>(rx: Receiver<OwnedPacket>, alive: Arc<AtomicBool>, mut handler: F)
where
    F: FnMut(OwnedPacket),
{
    while alive.load(Ordering::SeqCst) {
        match rx.recv_timeout(Duration::from_millis(100)) {
            Ok(packet) => handler(packet),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => return,
        }
    }
    // Drain whatever was queued before the stop
    while let Ok(packet) = rx.try_recv() {
        handler(packet);
    }
}

/// Owner of the worker thread behind a [QueuedConsumer].
pub struct QueueWorker {
    name: String,
    handle: Option<thread::JoinHandle<()>>,
    alive: Arc<AtomicBool>,
}

impl QueueWorker {
    /// Stop the worker once the frames already queued are handled.
    pub fn stop(&mut self) -> Result<()> {
        self.alive.store(false, Ordering::SeqCst);
        let handle = self
            .handle
            .take()
            .ok_or_else(|| Error::InvalidState(format!("worker {} already stopped", self.name)))?;
        handle
            .join()
            .map_err(|_| Error::InvalidState(format!("worker {} panicked", self.name)))
    }
}

impl Drop for QueueWorker {
    fn drop(&mut self) {
        if self.handle.is_some() {
            if let Err(e) = self.stop() {
                warn!("{e}");
            }
        }
    }
}
