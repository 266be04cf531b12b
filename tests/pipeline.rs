use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dot11mux::handshake::{self, CaptureOutcome, Stage, SLOT_COUNT};
use dot11mux::inventory::ApRecord;
use dot11mux::pktfile;
use dot11mux::sniffer::NullRadio;
use dot11mux::{
    CaptureState, CapturedHandshake, Config, FileSink, Filter, HandshakeSink, MacLogger, Packet,
    RxMeta, Sniffer, Subscription,
};
use libdot11::{FrameType, MacAddress, MgmtSubtype, Subtype};
use parking_lot::Mutex;

const AP: MacAddress = MacAddress([0x10, 0x20, 0x30, 0x40, 0x50, 0x60]);
const STA: MacAddress = MacAddress([0x02, 0x11, 0x22, 0x33, 0x44, 0x55]);

#[derive(Default)]
struct MemorySink {
    flushed: Mutex<Vec<CapturedHandshake>>,
}

struct SharedSink(Arc<MemorySink>);

impl HandshakeSink for SharedSink {
    fn flush(&self, handshake: &CapturedHandshake) -> dot11mux::Result<()> {
        self.0.flushed.lock().push(handshake.clone());
        Ok(())
    }
}

/// A sink whose writes always fail.
#[derive(Default)]
struct BrokenSink {
    calls: Arc<AtomicUsize>,
}

impl HandshakeSink for BrokenSink {
    fn flush(&self, _: &CapturedHandshake) -> dot11mux::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(dot11mux::Error::InvalidState("disk full".to_string()))
    }
}

fn meta() -> RxMeta {
    RxMeta {
        sig_len: 0,
        channel: 6,
        rssi: -38,
        rx_state: 0,
    }
}

fn header(fc: [u8; 2], a1: MacAddress, a2: MacAddress, a3: MacAddress, seq: u16) -> Vec<u8> {
    let mut frame = fc.to_vec();
    frame.extend_from_slice(&[0x3a, 0x01]);
    frame.extend_from_slice(&a1.0);
    frame.extend_from_slice(&a2.0);
    frame.extend_from_slice(&a3.0);
    frame.extend_from_slice(&(seq << 4).to_le_bytes());
    frame
}

fn beacon(ssid: &[u8]) -> Vec<u8> {
    let mut frame = header([0x80, 0x00], MacAddress::broadcast(), AP, AP, 100);
    frame.extend_from_slice(&[0; 8]);
    frame.extend_from_slice(&[0x64, 0x00, 0x11, 0x04]);
    frame.push(0x00);
    frame.push(ssid.len() as u8);
    frame.extend_from_slice(ssid);
    frame
}

fn assoc_request(len: usize) -> Vec<u8> {
    let mut frame = header([0x00, 0x00], AP, STA, AP, 1);
    frame.resize(len, 0x31);
    frame
}

fn assoc_response(len: usize) -> Vec<u8> {
    let mut frame = header([0x10, 0x00], STA, AP, AP, 2);
    frame.resize(len, 0x01);
    frame
}

/// An EAPOL data frame. Messages 1 and 3 come from the AP, 2 and 4 from the station.
fn eapol(message: u8, len: usize) -> Vec<u8> {
    let seq = if message <= 2 { 0 } else { 1 };
    let mut frame = if message % 2 == 1 {
        header([0x08, 0x02], STA, AP, AP, seq)
    } else {
        header([0x08, 0x01], AP, STA, AP, seq)
    };
    frame.extend_from_slice(&[0xaa, 0xaa, 0x03, 0x00, 0x00, 0x00, 0x88, 0x8e]);
    frame.resize(len, message);
    frame
}

fn pipeline(config: &Config, sink: Box<dyn HandshakeSink>) -> (Sniffer, Arc<MacLogger>) {
    let sniffer = Sniffer::new(config, Box::new(NullRadio));
    let logger = Arc::new(MacLogger::new(config, sink));
    sniffer.add_filter(logger.subscription(None)).unwrap();
    sniffer.launch(6).unwrap();
    (sniffer, logger)
}

fn handshake_frames() -> Vec<Vec<u8>> {
    vec![
        assoc_request(30),
        assoc_response(36),
        eapol(1, 99),
        eapol(2, 101),
        eapol(3, 105),
        eapol(4, 97),
    ]
}

#[test]
fn handshake_is_flushed_exactly_once() {
    let memory = Arc::new(MemorySink::default());
    let (sniffer, logger) = pipeline(&Config::default(), Box::new(SharedSink(memory.clone())));

    sniffer.dispatch(&beacon(b"HomeNet"), meta()).unwrap();
    let frames = handshake_frames();
    for (index, frame) in frames.iter().enumerate() {
        assert_eq!(memory.flushed.lock().len(), 0);
        sniffer.dispatch(frame, meta()).unwrap();
        if index < SLOT_COUNT - 1 {
            assert_eq!(logger.capture_state(0).unwrap(), CaptureState::Partial(index + 1));
        }
    }

    // Retransmissions after completion change nothing
    for frame in &frames {
        sniffer.dispatch(frame, meta()).unwrap();
    }

    let flushed = memory.flushed.lock();
    assert_eq!(flushed.len(), 1);
    assert_eq!(flushed[0].bssid, AP);
    assert_eq!(flushed[0].ssid, b"HomeNet".to_vec());
    assert_eq!(flushed[0].lengths(), [30, 36, 99, 101, 105, 97]);
    for (slot, frame) in flushed[0].slots.iter().zip(frames.iter()) {
        assert_eq!(slot, frame);
    }
    assert_eq!(logger.capture_state(0).unwrap(), CaptureState::Flushed);
    assert!(logger.ap(0).unwrap().capture == CaptureState::Flushed);
}

#[test]
fn failed_flush_is_not_retried() {
    let sink = BrokenSink::default();
    let calls = sink.calls.clone();
    let (sniffer, logger) = pipeline(&Config::default(), Box::new(sink));

    sniffer.dispatch(&beacon(b"HomeNet"), meta()).unwrap();
    for frame in handshake_frames() {
        sniffer.dispatch(&frame, meta()).unwrap();
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(logger.capture_state(0).unwrap(), CaptureState::Flushed);

    sniffer.dispatch(&eapol(4, 97), meta()).unwrap();
    sniffer.dispatch(&eapol(2, 140), meta()).unwrap();
    sniffer.dispatch(&beacon(b"HomeNet"), meta()).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(logger.capture_state(0).unwrap(), CaptureState::Flushed);
}

#[test]
fn slots_hold_exact_lengths_in_canonical_order() {
    let mut ap = ApRecord::new(AP, b"HomeNet", 6, -40);
    let lengths = [10usize, 12, 99, 101, 105, 97];
    let mut completed = Vec::new();

    for (stage, len) in Stage::ALL.into_iter().zip(lengths) {
        let bytes = vec![stage.index() as u8; len];
        if let CaptureOutcome::Completed(handshake) = handshake::capture(&mut ap, stage, &bytes).unwrap()
        {
            completed.push(handshake);
        }
    }

    assert_eq!(completed.len(), 1);
    assert_eq!(completed[0].lengths(), [10, 12, 99, 101, 105, 97]);
    assert!(ap.handshake.written_out());
}

#[test]
fn handshake_frames_for_untracked_ap_are_ignored() {
    let memory = Arc::new(MemorySink::default());
    let (sniffer, logger) = pipeline(&Config::default(), Box::new(SharedSink(memory.clone())));

    for frame in handshake_frames() {
        sniffer.dispatch(&frame, meta()).unwrap();
    }
    assert_eq!(logger.ap_count().unwrap(), 0);
    assert!(memory.flushed.lock().is_empty());
}

#[test]
fn oversized_frame_leaves_slot_empty() {
    let memory = Arc::new(MemorySink::default());
    let (sniffer, logger) = pipeline(&Config::default(), Box::new(SharedSink(memory.clone())));

    sniffer.dispatch(&beacon(b"HomeNet"), meta()).unwrap();
    sniffer.dispatch(&eapol(1, 257), meta()).unwrap();
    assert_eq!(logger.capture_state(0).unwrap(), CaptureState::Empty);

    sniffer.dispatch(&eapol(1, 256), meta()).unwrap();
    assert_eq!(logger.capture_state(0).unwrap(), CaptureState::Partial(1));
}

#[test]
fn every_matching_subscription_sees_the_frame_once() {
    let sniffer = Sniffer::new(&Config::default(), Box::new(NullRadio));
    let counters: Vec<Arc<AtomicUsize>> = (0..3).map(|_| Arc::new(AtomicUsize::new(0))).collect();

    let filters = [
        Filter::new().with_subtype(Subtype::Management(MgmtSubtype::Beacon)),
        Filter::new().with_type(FrameType::Management).with_ap(AP),
        Filter::new().with_type(FrameType::Data),
    ];
    for (index, filter) in filters.into_iter().enumerate() {
        let counter = counters[index].clone();
        sniffer
            .add_filter(Subscription::new(
                format!("counter-{index}"),
                filter,
                Arc::new(move |_: &Packet<'_>| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            ))
            .unwrap();
    }

    assert_eq!(sniffer.dispatch(&beacon(b"HomeNet"), meta()).unwrap(), 2);
    assert_eq!(counters[0].load(Ordering::SeqCst), 1);
    assert_eq!(counters[1].load(Ordering::SeqCst), 1);
    assert_eq!(counters[2].load(Ordering::SeqCst), 0);

    let stats = sniffer.stats();
    assert_eq!(stats.received, 1);
    assert_eq!(stats.dispatched, 1);
    assert_eq!(stats.deliveries, 2);
}

#[test]
fn repeated_beacons_keep_one_record() {
    let memory = Arc::new(MemorySink::default());
    let (sniffer, logger) = pipeline(&Config::default(), Box::new(SharedSink(memory)));

    for _ in 0..5 {
        sniffer.dispatch(&beacon(b"HomeNet"), meta()).unwrap();
    }
    sniffer.dispatch(&eapol(2, 120), meta()).unwrap();

    assert_eq!(logger.ap_count().unwrap(), 1);
    assert_eq!(logger.station_count().unwrap(), 1);
    assert_eq!(logger.station_of_ap(0, 0).unwrap().mac, STA);
}

#[test]
fn completed_handshake_lands_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::default().output_dir(dir.path());
    let (sniffer, _logger) = pipeline(&config, Box::new(FileSink::new(&config.output_dir)));

    sniffer.dispatch(&beacon(b"Cafe Guest"), meta()).unwrap();
    let frames = handshake_frames();
    for frame in &frames {
        sniffer.dispatch(frame, meta()).unwrap();
    }

    let slots = pktfile::read_pkt(&dir.path().join("Cafe_Guest.pkt")).unwrap();
    assert_eq!(slots.to_vec(), frames);

    let mut pcap = Vec::new();
    assert_eq!(pktfile::export_pcap(&slots, &mut pcap).unwrap(), SLOT_COUNT);
}
