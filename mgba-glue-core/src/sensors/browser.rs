//! Browser motion / orientation events.
//!
//! Field names follow the DOM `DeviceMotionEvent` / `DeviceOrientationEvent`
//! so events serialized by a page deserialize directly.

use serde::Deserialize;

use super::{AxisReading, SensorEvent, SensorSink, SensorSource, axis};
use crate::abi::Vec3;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceMotionEvent {
    #[serde(default)]
    pub acceleration_including_gravity: Option<AxisReading>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct DeviceOrientationEvent {
    #[serde(default)]
    pub alpha: Option<f64>,
    #[serde(default)]
    pub beta: Option<f64>,
    #[serde(default)]
    pub gamma: Option<f64>,
}

/// Motion feeds the accelerometer; events without gravity-inclusive
/// acceleration are ignored.
pub fn motion_event(ev: &DeviceMotionEvent) -> Option<SensorEvent> {
    ev.acceleration_including_gravity
        .map(|a| SensorEvent::Accelerometer(a.to_vec3()))
}

/// Orientation feeds the gyroscope as (alpha, beta, gamma).
pub fn orientation_event(ev: &DeviceOrientationEvent) -> SensorEvent {
    SensorEvent::Gyroscope(Vec3::new(axis(ev.alpha), axis(ev.beta), axis(ev.gamma)))
}

/// Event source for a browser page.
#[derive(Debug, Default)]
pub struct BrowserSensors {
    sink: Option<SensorSink>,
}

impl BrowserSensors {
    pub fn new() -> Self {
        Self::default()
    }

    /// `devicemotion` listener.
    pub fn on_device_motion(&self, ev: &DeviceMotionEvent) {
        if let (Some(sink), Some(event)) = (&self.sink, motion_event(ev)) {
            sink.send(event);
        }
    }

    /// `deviceorientation` listener.
    pub fn on_device_orientation(&self, ev: &DeviceOrientationEvent) {
        if let Some(sink) = &self.sink {
            sink.send(orientation_event(ev));
        }
    }
}

impl SensorSource for BrowserSensors {
    fn bind(&mut self, sink: SensorSink) {
        self.sink = Some(sink);
    }
}
