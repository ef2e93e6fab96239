//! End-to-end tests: raw record bytes in, outbound telemetry out

use rt130_decoder::codec::bcd;
use rt130_decoder::{
    Outbound, RecordKind, StreamAssignment, TrackerConfig, UnitConfig, UnitRegistry, UnitState,
};
use std::time::Duration;
use tokio::sync::mpsc;

const UNIT: u16 = 0x9C3E;

fn xc(time: &str, lock_duration: &str) -> Vec<u8> {
    format!(
        "XC{:<17}L3{:>2}{:<11}{:<12}{:>7}+{:03}{:03}{:<11}",
        time, 9, "S33:27.0000", "W070:39.0000", "520", 0, 17, lock_duration
    )
    .into_bytes()
}

fn dk(time: &str) -> Vec<u8> {
    format!("DK{:<17}1{:>8}{:>8}{:>8}{:>8}{:>8}{:>8}", time, 2000, 1500, 500, 2000, 0, 2000)
        .into_bytes()
}

fn us(time: &str) -> Vec<u8> {
    format!("US{:<17}{:>5}{:>5}{:>5}", time, "12.9", "3.2", "-3.0").into_bytes()
}

fn aq(time: &str) -> Vec<u8> {
    format!("AQ{:<17}Y{:>6}{:>8}{:>8}", time, 3, 3000, 1000).into_bytes()
}

fn eh(stream: u32, trigger: &str) -> Vec<u8> {
    let mut out = b"EH".to_vec();
    out.extend(bcd::encode(1, 1).unwrap());
    out.extend(bcd::encode(24, 1).unwrap());
    out.extend(UNIT.to_be_bytes());
    out.extend([0x06, 0x01, 0x20, 0x00, 0x00, 0x00]);
    out.extend(bcd::encode(1024, 2).unwrap());
    out.extend(bcd::encode(1, 2).unwrap());
    out.extend(bcd::encode(7, 2).unwrap());
    out.extend(bcd::encode(stream, 1).unwrap());
    out.extend([0u8; 5]);
    out.extend(
        format!(
            "{:<4}{:<16}{:>4}{:<4}{:<21}{:<21}{:<21}{:<21}",
            "TEST", "BROADBAND", 40, "STA", trigger, trigger, "", ""
        )
        .into_bytes(),
    );
    out
}

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn unit_config() -> UnitConfig {
    UnitConfig::new(UNIT, "XX", "TEST").add_stream(
        StreamAssignment::new(0, "BH", "ZNE")
            .with_location("00")
            .with_channels("123")
            .with_rate(40.0),
    )
}

#[test]
fn test_clock_record_quality() {
    let mut state = UnitState::new(unit_config(), TrackerConfig::new());
    state
        .apply_record(RecordKind::Clock, &xc("2024:060:12:00:00", "12:45"))
        .unwrap();
    let now = chrono::Utc::now();
    assert_eq!(state.time_quality(now), 100 - (12 * 3600 + 45 * 60) / 1000);
}

#[test]
fn test_configured_stream_seedname() {
    let state = UnitState::new(unit_config(), TrackerConfig::new());
    let name = state.seedname(0, 1);
    assert!(name.resolved);
    assert_eq!(&name.id[7..10], "BHN");
    assert_eq!(&name.id[10..12], "00");
    assert_eq!(name.id.len(), 12);
}

#[test]
fn test_unknown_log_stays_bounded() {
    init_logging();
    let mut state = UnitState::new(unit_config(), TrackerConfig::new());
    let line = format!("060:12:00:00 UNEXPECTED {}", "#".repeat(200));
    let blob: String = std::iter::repeat(line.as_str())
        .take(100)
        .collect::<Vec<_>>()
        .join("\n");
    for _ in 0..20 {
        state.apply_log_text(&blob).unwrap();
        assert!(state.unknown_log().lock().len() <= 100_000);
    }
    assert!(state.unknown_log().lock().discarded() > 0);
}

#[tokio::test(start_paused = true)]
async fn test_one_emission_per_refresh() {
    init_logging();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let tracker = TrackerConfig::new().with_tick(Duration::from_secs(1));
    let mut registry = UnitRegistry::new(tracker, tx);
    let unit = registry.get_or_create(unit_config());

    let t0 = "2024:060:12:00:00";
    unit.send_record(RecordKind::Clock, xc(t0, "12:45")).await.unwrap();
    unit.send_record(RecordKind::Disk, dk(t0)).await.unwrap();
    unit.send_record(RecordKind::Unit, us(t0)).await.unwrap();
    unit.send_record(RecordKind::Acquisition, aq(t0)).await.unwrap();

    let composite = match rx.recv().await {
        Some(Outbound::Composite(status)) => status,
        other => panic!("expected composite status, got {:?}", other),
    };
    assert_eq!(composite.clock_quality, 55);
    assert_eq!(composite.station, "TEST");
    let mut monitoring = 0;
    while let Ok(Some(Outbound::Monitoring(_))) =
        tokio::time::timeout(Duration::from_millis(100), rx.recv()).await
    {
        monitoring += 1;
    }
    assert_eq!(monitoring, 4);

    // Three of four refreshed: nothing over several ticks
    let t1 = "2024:060:12:00:10";
    unit.send_record(RecordKind::Clock, xc(t1, "12:46")).await.unwrap();
    unit.send_record(RecordKind::Disk, dk(t1)).await.unwrap();
    unit.send_record(RecordKind::Unit, us(t1)).await.unwrap();
    assert!(tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.is_err());

    // Fourth arrives: exactly one more emission
    unit.send_record(RecordKind::Acquisition, aq(t1)).await.unwrap();
    assert!(matches!(rx.recv().await, Some(Outbound::Composite(_))));

    registry.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_event_header_trigger() {
    init_logging();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut registry = UnitRegistry::new(TrackerConfig::new(), tx);
    let unit = registry.get_or_create(unit_config());

    unit.send_record(RecordKind::EventHeader, eh(0, "2024:060:11:59:58.125"))
        .await
        .unwrap();
    match rx.recv().await {
        Some(Outbound::Trigger(trigger)) => {
            assert_eq!(trigger.seedname, "XXTEST BHZ00");
            assert_eq!(trigger.source_file, "2024060/9C3E/1/115958125_0007");
        }
        other => panic!("expected trigger, got {:?}", other),
    }

    // Unconfigured stream still triggers, under the fallback name
    unit.send_record(RecordKind::EventHeader, eh(4, "2024:060:12:00:01.000"))
        .await
        .unwrap();
    match rx.recv().await {
        Some(Outbound::Trigger(trigger)) => assert_eq!(trigger.seedname, "ZZ9C3E UN004"),
        other => panic!("expected trigger, got {:?}", other),
    }

    let dump = unit.dump().await.unwrap();
    assert!(dump.contains("(placeholder)"));
    registry.shutdown().await.unwrap();
}
