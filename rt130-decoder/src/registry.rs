//! Unit registry
//!
//! The registry is the entry point for transport code: it creates a unit task
//! the first time a unit is referenced and hands out handles to it. Units are
//! only removed by an explicit terminate.

use crate::config::{TrackerConfig, UnitConfig};
use crate::state::UnitState;
use crate::types::{RecordError, Result};
use crate::unit_task::{spawn_unit, Outbound, UnitHandle, UnitTask};
use std::collections::HashMap;
use tokio::sync::mpsc;

/// Live unit tasks keyed by unit number
pub struct UnitRegistry {
    tracker: TrackerConfig,
    outbound: mpsc::UnboundedSender<Outbound>,
    units: HashMap<u16, UnitTask>,
}

impl UnitRegistry {
    /// Create an empty registry; every unit sends to `outbound`
    pub fn new(tracker: TrackerConfig, outbound: mpsc::UnboundedSender<Outbound>) -> Self {
        Self {
            tracker,
            outbound,
            units: HashMap::new(),
        }
    }

    /// Handle for the unit, starting its task on first reference
    ///
    /// Must be called from within a tokio runtime.
    pub fn get_or_create(&mut self, config: UnitConfig) -> UnitHandle {
        let unit = config.unit;
        if let Some(task) = self.units.get(&unit) {
            return task.handle.clone();
        }

        log::info!("Creating unit {:04X} ({}.{})", unit, config.network, config.station);
        let state = UnitState::new(config, self.tracker.clone());
        let task = spawn_unit(state, self.outbound.clone());
        let handle = task.handle.clone();
        self.units.insert(unit, task);
        handle
    }

    pub fn get(&self, unit: u16) -> Option<UnitHandle> {
        self.units.get(&unit).map(|task| task.handle.clone())
    }

    /// Stop a unit, remove it and wait for its task
    pub async fn terminate(&mut self, unit: u16) -> Result<()> {
        let task = self
            .units
            .remove(&unit)
            .ok_or(RecordError::UnconfiguredReference {
                what: "unit",
                index: unit as usize,
            })?;
        log::info!("Terminating unit {:04X}", unit);
        task.stop().await
    }

    /// Registered unit numbers, ascending
    pub fn units(&self) -> Vec<u16> {
        let mut units: Vec<u16> = self.units.keys().copied().collect();
        units.sort_unstable();
        units
    }

    /// Units whose task has already exited on its own
    pub fn finished(&self) -> Vec<u16> {
        let mut units: Vec<u16> = self
            .units
            .iter()
            .filter(|(_, task)| task.is_finished())
            .map(|(unit, _)| *unit)
            .collect();
        units.sort_unstable();
        units
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Terminate every unit; returns the first task error
    pub async fn shutdown(&mut self) -> Result<()> {
        log::info!("Shutting down {} units", self.units.len());
        for task in self.units.values() {
            task.request_stop();
        }

        let mut first_error = None;
        for unit in self.units() {
            if let Err(e) = self.terminate(unit).await {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
