//! Per-unit async task
//!
//! Each unit runs as one tokio task that owns its `UnitState` and emission
//! scheduler. Transport code talks to it through a cloneable [`UnitHandle`];
//! everything the unit produces leaves through the outbound channel.

use crate::config::StreamAssignment;
use crate::emission::{monitoring_lines, CompositeStatus, EmissionScheduler, MonitoringLine};
use crate::state::{SharedUnknownLog, UnitState};
use crate::types::{RecordError, RecordKind, Result, Trigger};
use serde::Serialize;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Work sent to a unit task
#[derive(Debug)]
pub enum UnitCommand {
    /// Raw record bytes of a known kind
    Record { kind: RecordKind, bytes: Vec<u8> },
    /// Block of state-of-health log text
    LogText(String),
    /// Stream naming from the configuration database
    AddStream(StreamAssignment),
    /// Full state dump, for diagnostics
    Dump(oneshot::Sender<String>),
}

/// Everything a unit sends downstream
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Outbound {
    /// Consolidated status line for the time-series pipeline
    Composite(CompositeStatus),
    /// One category line for the monitoring sink
    Monitoring(MonitoringLine),
    /// Event trigger for persistence
    Trigger(Trigger),
}

/// Cloneable sender side of a unit task
#[derive(Debug, Clone)]
pub struct UnitHandle {
    unit: u16,
    commands: mpsc::Sender<UnitCommand>,
    unknown_log: SharedUnknownLog,
}

impl UnitHandle {
    pub fn unit(&self) -> u16 {
        self.unit
    }

    async fn send(&self, command: UnitCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| RecordError::UnitStopped(self.unit))
    }

    /// Queue a raw record
    pub async fn send_record(&self, kind: RecordKind, bytes: Vec<u8>) -> Result<()> {
        self.send(UnitCommand::Record { kind, bytes }).await
    }

    /// Queue a block of log text
    pub async fn send_log_text(&self, text: impl Into<String>) -> Result<()> {
        self.send(UnitCommand::LogText(text.into())).await
    }

    pub async fn add_stream(&self, assignment: StreamAssignment) -> Result<()> {
        self.send(UnitCommand::AddStream(assignment)).await
    }

    /// Ask the task for a state dump
    pub async fn dump(&self) -> Result<String> {
        let (reply, response) = oneshot::channel();
        self.send(UnitCommand::Dump(reply)).await?;
        response.await.map_err(|_| RecordError::UnitStopped(self.unit))
    }

    /// Unknown-log buffer, readable while the task appends
    pub fn unknown_log(&self) -> &SharedUnknownLog {
        &self.unknown_log
    }

    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }
}

/// A running unit task
#[derive(Debug)]
pub struct UnitTask {
    pub handle: UnitHandle,
    terminate: watch::Sender<bool>,
    join: JoinHandle<Result<()>>,
}

impl UnitTask {
    /// Ask the task to stop at its next loop boundary
    pub fn request_stop(&self) {
        // Err only when the task has already exited
        let _ = self.terminate.send(true);
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Stop the task and wait for it
    ///
    /// Returns the task's own result: `ResourceExhausted` when it died on
    /// its own, `UnitStopped` when it panicked.
    pub async fn stop(self) -> Result<()> {
        self.request_stop();
        let unit = self.handle.unit;
        match self.join.await {
            Ok(result) => result,
            Err(e) => {
                log::error!("Unit {:04X} task failed: {}", unit, e);
                Err(RecordError::UnitStopped(unit))
            }
        }
    }
}

/// Start the task for one unit
///
/// Must be called from within a tokio runtime.
pub fn spawn_unit(state: UnitState, outbound: mpsc::UnboundedSender<Outbound>) -> UnitTask {
    let unit = state.unit();
    let (commands, command_rx) = mpsc::channel(state.tracker().command_queue.max(1));
    let (terminate, terminate_rx) = watch::channel(false);
    let handle = UnitHandle {
        unit,
        commands,
        unknown_log: state.unknown_log().clone(),
    };

    let join = tokio::spawn(run_unit(state, command_rx, terminate_rx, outbound));
    UnitTask {
        handle,
        terminate,
        join,
    }
}

async fn run_unit(
    mut state: UnitState,
    mut commands: mpsc::Receiver<UnitCommand>,
    mut terminate: watch::Receiver<bool>,
    outbound: mpsc::UnboundedSender<Outbound>,
) -> Result<()> {
    let tick = state.tracker().tick();
    let mut ticker = tokio::time::interval(tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut scheduler = EmissionScheduler::new(tick);
    let unit = state.unit_hex();

    log::info!("Unit {} task started (tick {:?})", unit, tick);
    let result = loop {
        if *terminate.borrow() {
            break Ok(());
        }
        tokio::select! {
            biased;
            changed = terminate.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
            }
            // A due tick is served before queued commands
            _ = ticker.tick() => {
                if scheduler.evaluate(&state.freshness()) {
                    emit(&state, &outbound);
                    scheduler.complete();
                }
            }
            command = commands.recv() => {
                let Some(command) = command else {
                    break Ok(());
                };
                if let Err(e) = handle_command(&mut state, command, &outbound) {
                    break Err(e);
                }
            }
        }
    };

    match &result {
        Ok(()) => log::info!("Unit {} task stopped", unit),
        Err(e) => log::error!("Unit {} task ended: {}", unit, e),
    }
    result
}

/// Apply one command; only fatal errors are returned
fn handle_command(
    state: &mut UnitState,
    command: UnitCommand,
    outbound: &mpsc::UnboundedSender<Outbound>,
) -> Result<()> {
    let outcome = match command {
        UnitCommand::Record { kind, bytes } => match state.apply_record(kind, &bytes) {
            Ok(Some(trigger)) => {
                log::info!("Unit {}: {}", state.unit_hex(), trigger);
                forward(outbound, Outbound::Trigger(trigger));
                Ok(())
            }
            Ok(None) => Ok(()),
            Err(e) => Err(e),
        },
        UnitCommand::LogText(text) => state.apply_log_text(&text).map(|summary| {
            log::debug!("Unit {}: log text {:?}", state.unit_hex(), summary);
        }),
        UnitCommand::AddStream(assignment) => state.add_stream(assignment),
        UnitCommand::Dump(reply) => {
            // The requester may have given up waiting
            let _ = reply.send(state.dump());
            Ok(())
        }
    };

    match outcome {
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => {
            log::warn!("Unit {}: record dropped: {}", state.unit_hex(), e);
            Ok(())
        }
        Ok(()) => Ok(()),
    }
}

fn emit(state: &UnitState, outbound: &mpsc::UnboundedSender<Outbound>) {
    let composite = CompositeStatus::build(state, chrono::Utc::now());
    log::info!("Unit {}: emitting status (quality {})", state.unit_hex(), composite.clock_quality);
    forward(outbound, Outbound::Composite(composite));
    for line in monitoring_lines(state) {
        forward(outbound, Outbound::Monitoring(line));
    }
}

fn forward(outbound: &mpsc::UnboundedSender<Outbound>, message: Outbound) {
    if outbound.send(message).is_err() {
        log::debug!("Outbound receiver gone, message dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{TrackerConfig, UnitConfig};
    use crate::records::testdata::*;
    use std::time::Duration;

    fn unit_state() -> UnitState {
        let config = UnitConfig::new(0x9C3E, "XX", "TEST")
            .add_stream(StreamAssignment::new(0, "BH", "ZNE").with_location("00"));
        UnitState::new(config, TrackerConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_trigger_forwarded() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let task = spawn_unit(unit_state(), tx);
        task.handle
            .send_record(RecordKind::EventHeader, event("EH", 0, "2024:060:11:59:58.125", ""))
            .await
            .unwrap();

        match rx.recv().await.unwrap() {
            Outbound::Trigger(trigger) => assert_eq!(trigger.seedname, "XXTEST BHZ00"),
            other => panic!("expected trigger, got {:?}", other),
        }
        task.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_bad_record_does_not_stop_task() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let task = spawn_unit(unit_state(), tx);
        task.handle.send_record(RecordKind::Clock, b"XC garbage".to_vec()).await.unwrap();
        task.handle.send_log_text("186:00:00:00 MYSTERY LINE").await.unwrap();

        let dump = task.handle.dump().await.unwrap();
        assert!(dump.contains("rejected=1"));
        assert_eq!(task.handle.unknown_log().snapshot(), "186:00:00:00 MYSTERY LINE\n");
        assert!(!task.is_finished());
        task.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_closes_handle() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let task = spawn_unit(unit_state(), tx);
        let handle = task.handle.clone();
        task.stop().await.unwrap();
        assert!(matches!(
            handle.send_log_text("late").await,
            Err(RecordError::UnitStopped(0x9C3E))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_emission_after_full_refresh() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let task = spawn_unit(unit_state(), tx);
        for (kind, bytes) in [
            (RecordKind::Clock, xc(T0, 'L', "12:45")),
            (RecordKind::Disk, dk(T0)),
            (RecordKind::Unit, us(T0)),
            (RecordKind::Acquisition, aq(T0)),
        ] {
            task.handle.send_record(kind, bytes).await.unwrap();
        }

        assert!(matches!(rx.recv().await, Some(Outbound::Composite(_))));
        for _ in 0..4 {
            assert!(matches!(rx.recv().await, Some(Outbound::Monitoring(_))));
        }
        assert!(tokio::time::timeout(Duration::from_secs(5), rx.recv()).await.is_err());
        task.stop().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_due_tick_runs_before_queued_commands() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let state = unit_state();
        let tick = state.tracker().tick();
        let task = spawn_unit(state, tx);
        for (kind, bytes) in [
            (RecordKind::Clock, xc(T0, 'L', "12:45")),
            (RecordKind::Disk, dk(T0)),
            (RecordKind::Unit, us(T0)),
            (RecordKind::Acquisition, aq(T0)),
        ] {
            task.handle.send_record(kind, bytes).await.unwrap();
        }
        // Round trip so the four snapshots are applied before time moves
        task.handle.dump().await.unwrap();

        // A backlog is waiting when the next tick falls due
        task.handle.send_record(RecordKind::Sensor, ad(T0, 1)).await.unwrap();
        for _ in 0..32 {
            task.handle.send_log_text("186:00:00:00 LINK IS UP").await.unwrap();
        }
        tokio::time::advance(tick).await;

        match rx.recv().await {
            Some(Outbound::Composite(status)) => assert_eq!(status.mass[0], [None; 3]),
            other => panic!("expected composite status, got {:?}", other),
        }
        task.stop().await.unwrap();
    }
}
