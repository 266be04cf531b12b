use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use libdot11::{EthertypeOffset, MacAddress};
use log::{debug, info, warn, LevelFilter};
use pcap_file::pcap::PcapReader;
use pcap_file::DataLink;
use radiotap::Radiotap;

use dot11mux::dumper::{DumpSelector, RawDumper};
use dot11mux::handshake::Stage;
use dot11mux::pktfile;
use dot11mux::queue::{QueueWorker, QueuedConsumer};
use dot11mux::sniffer::NullRadio;
use dot11mux::status;
use dot11mux::tx::{self, Injector, PcapInjector};
use dot11mux::{retarget, Config, FileSink, MacLogger, RxMeta, Sniffer, Subscription};

#[derive(Parser)]
#[command(name = "dot11mux", version, about = "802.11 frame multiplexer and handshake logger")]
struct Arguments {
    /// Log level: error, warn, info, debug or trace.
    #[arg(long, default_value = "info", global = true)]
    log_level: LevelFilter,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Feed a pcap capture (raw 802.11 or radiotap) through the dispatch pipeline.
    Replay {
        capture: PathBuf,
        /// Switch to passive targeted capture once this access point has been seen.
        #[arg(long)]
        target: Option<MacAddress>,
        /// Directory completed handshakes are written to.
        #[arg(long, default_value = ".")]
        out: PathBuf,
        /// Channel assumed for frames without radiotap channel information.
        #[arg(long, default_value_t = 1)]
        channel: u8,
        /// Also dump matching raw frames to this pcap file.
        #[arg(long)]
        dump: Option<PathBuf>,
        #[arg(long, default_value = "all")]
        dump_type: DumpSelector,
        /// Look for the EAPOL EtherType at this fixed offset instead of after the header.
        #[arg(long)]
        ethertype_offset: Option<usize>,
        #[arg(long, default_value_t = 32)]
        max_aps: usize,
        #[arg(long, default_value_t = 64)]
        max_stations: usize,
        /// Milliseconds a lock may be waited for.
        #[arg(long, default_value_t = 20)]
        lock_wait: u64,
    },
    /// Convert a .pkt handshake file into a pcap.
    Convert { pkt: PathBuf, pcap: PathBuf },
    /// Print the slots of a .pkt handshake file.
    Inspect { pkt: PathBuf },
    /// Build a deauthentication frame and print it, or record it to a pcap.
    Deauth {
        #[arg(long)]
        ap: MacAddress,
        /// Target a single station instead of broadcasting.
        #[arg(long)]
        station: Option<MacAddress>,
        #[arg(long, default_value_t = tx::DEFAULT_DEAUTH_REASON)]
        reason: u16,
        /// Record the radiotap-framed frame here instead of printing it.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let args = Arguments::parse();
    status::init(true, None, args.log_level).context("Failed to install logger")?;

    match args.command {
        Command::Replay {
            capture,
            target,
            out,
            channel,
            dump,
            dump_type,
            ethertype_offset,
            max_aps,
            max_stations,
            lock_wait,
        } => {
            let config = Config::default()
                .output_dir(out)
                .max_aps(max_aps)
                .max_stations(max_stations)
                .lock_wait(Duration::from_millis(lock_wait))
                .ethertype_offset(
                    ethertype_offset.map_or(EthertypeOffset::HeaderDerived, EthertypeOffset::Fixed),
                );
            replay(&config, capture, target, channel, dump.map(|path| (path, dump_type)))
        }
        Command::Convert { pkt, pcap } => {
            let written = pktfile::convert(&pkt, &pcap)
                .with_context(|| format!("Failed to convert {}", pkt.display()))?;
            info!("Wrote {written} frames to {}", pcap.display());
            Ok(())
        }
        Command::Inspect { pkt } => inspect(pkt),
        Command::Deauth {
            ap,
            station,
            reason,
            out,
        } => {
            let frame = tx::build_deauth(&ap, station.as_ref(), reason);
            match out {
                Some(path) => {
                    let file = BufWriter::new(File::create(&path)?);
                    PcapInjector::new(file)?.inject(&frame)?;
                    info!("Recorded deauth to {}", path.display());
                }
                None => println!("{}", hex::encode(&frame)),
            }
            Ok(())
        }
    }
}

fn replay(
    config: &Config,
    capture: PathBuf,
    target: Option<MacAddress>,
    channel: u8,
    dump: Option<(PathBuf, DumpSelector)>,
) -> Result<()> {
    let file = File::open(&capture)
        .with_context(|| format!("Failed to open {}", capture.display()))?;
    let mut reader = PcapReader::new(BufReader::new(file))?;
    let datalink = reader.header().datalink;
    if datalink != DataLink::IEEE802_11 && datalink != DataLink::IEEE802_11_RADIOTAP {
        bail!("Unsupported link type {datalink:?}, need raw 802.11 or radiotap");
    }

    let sniffer = Sniffer::new(config, Box::new(NullRadio));
    let logger = Arc::new(MacLogger::new(
        config,
        Box::new(FileSink::new(&config.output_dir)),
    ));
    sniffer.add_filter(logger.subscription(None))?;

    let mut dumper: Option<(Arc<QueuedConsumer>, QueueWorker)> = None;
    if let Some((path, selector)) = dump {
        let raw = RawDumper::new(BufWriter::new(File::create(&path)?))?;
        let (consumer, worker) = QueuedConsumer::spawn("raw-dumper", 1024, raw.into_handler())?;
        sniffer.add_filter(Subscription::new(
            format!("dump-{selector}"),
            selector.filter(),
            consumer.clone(),
        ))?;
        dumper = Some((consumer, worker));
    }

    sniffer.launch(channel)?;
    let mut targeted = false;

    while let Some(record) = reader.next_packet() {
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                warn!("Stopping at unreadable record: {e}");
                break;
            }
        };

        let (frame, meta) = match split_record(datalink, &record.data, channel) {
            Some(split) => split,
            None => continue,
        };
        if let Err(e) = sniffer.dispatch(frame, meta) {
            debug!("Frame dropped: {e}");
        }

        if let Some(target) = target {
            if !targeted && logger.channel_of(&target).is_ok() {
                match retarget(&sniffer, &logger, target) {
                    Ok(()) => {}
                    Err(e) => warn!("Couldn't retarget to {target}: {e}"),
                }
                targeted = true;
            }
        }
    }

    if sniffer.is_capture_active() {
        sniffer.kill()?;
    }
    if let Some((consumer, mut worker)) = dumper {
        worker.stop()?;
        info!(
            "Dumped {} frames ({} dropped)",
            consumer.queued(),
            consumer.dropped()
        );
    }

    println!("{}", sniffer.stats());
    let aps = logger.aps()?;
    for (index, ap) in aps.iter().enumerate() {
        println!("{ap}");
        for station in 0..ap.station_count {
            match logger.station_of_ap(index, station) {
                Ok(station) => println!("    {station}"),
                Err(e) => warn!("{e}"),
            }
        }
    }
    Ok(())
}

/// Strip the radiotap header, if any, and build receive metadata.
fn split_record(datalink: DataLink, data: &[u8], channel: u8) -> Option<(&[u8], RxMeta)> {
    let mut meta = RxMeta {
        sig_len: data.len() as u16,
        channel,
        rssi: 0,
        rx_state: 0,
    };

    if datalink != DataLink::IEEE802_11_RADIOTAP {
        return Some((data, meta));
    }

    let radiotap = match Radiotap::from_bytes(data) {
        Ok(radiotap) => radiotap,
        Err(e) => {
            debug!("Couldn't read radiotap header: {e:?}");
            return None;
        }
    };
    let mut frame = data.get(radiotap.header.length..)?;

    if let Some(signal) = radiotap.antenna_signal {
        meta.rssi = signal.value;
    }
    if let Some(freq) = radiotap.channel.map(|c| c.freq) {
        meta.channel = frequency_to_channel(freq).unwrap_or(channel);
    }
    if let Some(flags) = radiotap.flags {
        if flags.bad_fcs {
            meta.rx_state = 1;
        } else if flags.fcs {
            match libdot11::strip_fcs(frame) {
                Ok(stripped) => frame = stripped,
                Err(_) => meta.rx_state = 1,
            }
        }
    }
    meta.sig_len = frame.len() as u16;
    Some((frame, meta))
}

fn frequency_to_channel(freq: u16) -> Option<u8> {
    match freq {
        2484 => Some(14),
        2412..=2472 => Some(((freq - 2407) / 5) as u8),
        5000..=5900 => Some(((freq - 5000) / 5) as u8),
        _ => None,
    }
}

fn inspect(pkt: PathBuf) -> Result<()> {
    let slots = pktfile::read_pkt(&pkt)
        .with_context(|| format!("Failed to read {}", pkt.display()))?;

    for (stage, slot) in Stage::ALL.iter().zip(slots.iter()) {
        if slot.is_empty() {
            println!("{stage:<10} empty");
            continue;
        }
        let summary = match libdot11::decode(slot) {
            Ok(header) => format!(
                "{} {} -> {}",
                header.subtype(),
                header.addr2().map_or("-".to_string(), |a| a.to_string()),
                header.addr1()
            ),
            Err(e) => format!("undecodable: {e}"),
        };
        println!("{stage:<10} {:>3} bytes  {summary}", slot.len());
    }
    Ok(())
}
