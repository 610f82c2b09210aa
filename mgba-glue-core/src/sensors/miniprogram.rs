//! Mini-program sensor subscriptions (`onAccelerometerChange`,
//! `onGyroscopeChange`).
//!
//! Callback payloads are loosely shaped JSON: some runtimes nest the axes under
//! `value`, others pass them at the top level.

use serde_json::Value;

use super::{AxisReading, SensorEvent, SensorSink, SensorSource};

/// Pull `{x, y, z}` out of a callback payload.
///
/// Any truthy `value` field is taken as the axes holder; a scalar `value` thus
/// reads as all zeros. A missing or falsy `value` falls back to the payload.
pub fn payload_axes(payload: &Value) -> AxisReading {
    let inner = match payload.get("value") {
        Some(value) if is_truthy(value) => value,
        _ => payload,
    };
    let field = |name: &str| inner.get(name).and_then(Value::as_f64);
    AxisReading {
        x: field("x"),
        y: field("y"),
        z: field("z"),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Event source for a mini-program runtime.
#[derive(Debug, Default)]
pub struct MiniProgramSensors {
    sink: Option<SensorSink>,
}

impl MiniProgramSensors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_accelerometer_change(&self, payload: &Value) {
        if let Some(sink) = &self.sink {
            sink.send(SensorEvent::Accelerometer(payload_axes(payload).to_vec3()));
        }
    }

    pub fn on_gyroscope_change(&self, payload: &Value) {
        if let Some(sink) = &self.sink {
            sink.send(SensorEvent::Gyroscope(payload_axes(payload).to_vec3()));
        }
    }
}

impl SensorSource for MiniProgramSensors {
    fn bind(&mut self, sink: SensorSink) {
        self.sink = Some(sink);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::Vec3;
    use serde_json::json;

    #[test]
    fn unwraps_nested_value() {
        let axes = payload_axes(&json!({ "value": { "x": 1.0, "y": 2.0, "z": 3.0 } }));
        assert_eq!(axes.to_vec3(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn uses_bare_payload() {
        let axes = payload_axes(&json!({ "x": -1.0, "z": 0.25 }));
        assert_eq!(axes.to_vec3(), Vec3::new(-1.0, 0.0, 0.25));
    }

    #[test]
    fn null_value_falls_back_to_payload() {
        let axes = payload_axes(&json!({ "value": null, "x": 4.0 }));
        assert_eq!(axes.to_vec3(), Vec3::new(4.0, 0.0, 0.0));
    }

    #[test]
    fn scalar_value_reads_as_zero_axes() {
        let axes = payload_axes(&json!({ "value": 5, "x": 4.0 }));
        assert_eq!(axes.to_vec3(), Vec3::default());
    }

    #[test]
    fn falsy_value_falls_back_to_payload() {
        for value in [json!(0), json!(false), json!("")] {
            let axes = payload_axes(&json!({ "value": value, "y": 2.0 }));
            assert_eq!(axes.to_vec3(), Vec3::new(0.0, 2.0, 0.0));
        }
    }

    #[test]
    fn non_numeric_axes_are_zero() {
        let axes = payload_axes(&json!({ "x": "fast", "y": true }));
        assert_eq!(axes.to_vec3(), Vec3::default());
        assert_eq!(payload_axes(&Value::Null).to_vec3(), Vec3::default());
    }

    #[test]
    fn forwards_both_subscriptions() {
        let sink = SensorSink::new();
        let mut sensors = MiniProgramSensors::new();
        sensors.bind(sink.clone());

        sensors.on_accelerometer_change(&json!({ "x": 1, "y": 2, "z": 3 }));
        sensors.on_gyroscope_change(&json!({ "value": { "x": 0.5 } }));

        let pending = sink.take();
        assert_eq!(pending.accelerometer, Some(Vec3::new(1.0, 2.0, 3.0)));
        assert_eq!(pending.gyroscope, Some(Vec3::new(0.5, 0.0, 0.0)));
    }
}
