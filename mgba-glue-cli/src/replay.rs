//! Replay of recorded host sensor events.
//!
//! A sensor log is JSON lines, one event per line:
//!
//! ```text
//! {"frame": 0, "event": {"type": "deviceorientation", "data": {"alpha": 10, "beta": null, "gamma": 2}}}
//! {"frame": 4, "event": {"type": "accelerometerChange", "data": {"x": 0.1, "y": 0.0, "z": 1.0}}}
//! {"frame": 9, "event": {"type": "light", "data": 120}}
//! ```
//!
//! Events go through the same host sources a live page or mini-program uses.

use std::path::Path;

use anyhow::{Context, Result};
use mgba_glue::sensors::browser::{DeviceMotionEvent, DeviceOrientationEvent};
use mgba_glue::{BrowserSensors, MiniProgramSensors, SensorEvent, SensorSink, SensorSource};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum HostEvent {
    #[serde(rename = "devicemotion")]
    DeviceMotion(DeviceMotionEvent),
    #[serde(rename = "deviceorientation")]
    DeviceOrientation(DeviceOrientationEvent),
    #[serde(rename = "accelerometerChange")]
    AccelerometerChange(serde_json::Value),
    #[serde(rename = "gyroscopeChange")]
    GyroscopeChange(serde_json::Value),
    #[serde(rename = "light")]
    Light(i32),
}

#[derive(Debug, Deserialize)]
pub struct LogLine {
    #[serde(default)]
    pub frame: u32,
    pub event: HostEvent,
}

/// A parsed sensor log, consumed frame by frame.
#[derive(Debug, Default)]
pub struct Replay {
    lines: Vec<LogLine>,
    next: usize,
    browser: BrowserSensors,
    mini: MiniProgramSensors,
    sink: Option<SensorSink>,
}

impl Replay {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read sensor log at {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid sensor log {}", path.display()))
    }

    /// Parse JSON lines. Blank lines are skipped; events are ordered by frame,
    /// keeping file order within a frame.
    pub fn parse(text: &str) -> Result<Self> {
        let mut lines = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let parsed: LogLine = serde_json::from_str(line)
                .with_context(|| format!("line {}", idx + 1))?;
            lines.push(parsed);
        }
        lines.sort_by_key(|l| l.frame);

        Ok(Self {
            lines,
            ..Self::default()
        })
    }

    pub fn remaining(&self) -> usize {
        self.lines.len() - self.next
    }

    /// Dispatch every event scheduled at or before `frame`. Returns how many
    /// were dispatched.
    pub fn emit_until(&mut self, frame: u32) -> usize {
        let start = self.next;
        while let Some(line) = self.lines.get(self.next) {
            if line.frame > frame {
                break;
            }
            match &line.event {
                HostEvent::DeviceMotion(ev) => self.browser.on_device_motion(ev),
                HostEvent::DeviceOrientation(ev) => self.browser.on_device_orientation(ev),
                HostEvent::AccelerometerChange(payload) => {
                    self.mini.on_accelerometer_change(payload)
                }
                HostEvent::GyroscopeChange(payload) => self.mini.on_gyroscope_change(payload),
                HostEvent::Light(level) => {
                    if let Some(sink) = &self.sink {
                        sink.send(SensorEvent::Light(*level));
                    }
                }
            }
            self.next += 1;
        }
        self.next - start
    }
}

impl SensorSource for Replay {
    fn bind(&mut self, sink: SensorSink) {
        self.browser.bind(sink.clone());
        self.mini.bind(sink.clone());
        self.sink = Some(sink);
    }
}
