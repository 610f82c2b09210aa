//! Host sensor bridging.
//!
//! Host environments report motion through their own event shapes. Each host
//! gets a [`SensorSource`] that converts those events into [`SensorEvent`]s and
//! pushes them into a [`SensorSink`]. The adapter applies pending readings to
//! the core (see `Adapter::pump_sensors`).
//!
//! The sink keeps one slot per sensor: a new reading replaces an unapplied
//! one, so a source firing while no frames run never builds a backlog.
//!
//! Values are passed through in the host's raw units. Missing or NaN axes become
//! `0.0`.

pub mod browser;
pub mod miniprogram;

use std::sync::{Arc, Mutex, PoisonError};

use crate::abi::Vec3;

use serde::Deserialize;

pub use browser::BrowserSensors;
pub use miniprogram::MiniProgramSensors;

/// A sensor reading destined for the core.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum SensorEvent {
    Accelerometer(Vec3),
    Gyroscope(Vec3),
    Light(i32),
}

/// The latest unapplied reading of each sensor.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct PendingSensors {
    pub accelerometer: Option<Vec3>,
    pub gyroscope: Option<Vec3>,
    pub light: Option<i32>,
}

impl PendingSensors {
    fn record(&mut self, event: SensorEvent) {
        match event {
            SensorEvent::Accelerometer(v) => self.accelerometer = Some(v),
            SensorEvent::Gyroscope(v) => self.gyroscope = Some(v),
            SensorEvent::Light(level) => self.light = Some(level),
        }
    }

    pub fn len(&self) -> usize {
        self.events().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pending readings as events: accelerometer, gyroscope, then light.
    pub fn events(self) -> impl Iterator<Item = SensorEvent> {
        [
            self.accelerometer.map(SensorEvent::Accelerometer),
            self.gyroscope.map(SensorEvent::Gyroscope),
            self.light.map(SensorEvent::Light),
        ]
        .into_iter()
        .flatten()
    }
}

/// Feeds the adapter's sensor slots. Sending never blocks.
#[derive(Clone, Debug, Default)]
pub struct SensorSink {
    slots: Arc<Mutex<PendingSensors>>,
}

impl SensorSink {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Record `event`, replacing any unapplied reading of the same sensor.
    pub fn send(&self, event: SensorEvent) {
        tracing::trace!(?event, "sensor reading");
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .record(event);
    }

    /// Take every pending reading, leaving the slots empty.
    pub(crate) fn take(&self) -> PendingSensors {
        std::mem::take(&mut *self.slots.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

/// A host-specific event source that can be wired to an adapter.
pub trait SensorSource {
    /// Start forwarding events into `sink`. Rebinding replaces the previous sink.
    fn bind(&mut self, sink: SensorSink);
}

/// Three optional axis values as reported by a host.
#[derive(Copy, Clone, Debug, Default, PartialEq, Deserialize)]
pub struct AxisReading {
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
    #[serde(default)]
    pub z: Option<f64>,
}

impl AxisReading {
    pub fn to_vec3(self) -> Vec3 {
        Vec3::new(axis(self.x), axis(self.y), axis(self.z))
    }
}

/// A missing or NaN axis reads as zero.
pub fn axis(value: Option<f64>) -> f32 {
    match value {
        Some(v) if !v.is_nan() => v as f32,
        _ => 0.0,
    }
}
