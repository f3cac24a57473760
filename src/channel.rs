//! Per-topic sensor pipelines.
//!
//! A channel turns raw readings into JSON publish events: it applies the
//! configured multipliers, rounds with [`crate::codec::round`], suppresses
//! samples whose rounded values match the last published ones, and hands
//! the payload to a [`PublishSink`]. Channels are independent and expect a
//! single caller context each; they share no state with one another.
//!
//! Two shapes exist, matching the sensor classes they serve:
//! [`SensorChannel`] for three-axis readings (accelerometer, gyroscope,
//! gravity) and [`ScalarChannel`] for single values (temperature, light).

use tracing::debug;

use crate::codec;

/// Best-effort publish capability consumed by the channels.
///
/// The boolean return means "accepted for send", not delivered; see
/// [`crate::mqtt::ConnectionManager`] for the production implementation.
pub trait PublishSink {
    fn publish(&self, topic: &str, payload: &str) -> bool;
}

impl<T: PublishSink> PublishSink for &T {
    fn publish(&self, topic: &str, payload: &str) -> bool {
        (*self).publish(topic, payload)
    }
}

/// Settings for a three-axis channel, replaced wholesale by
/// [`SensorChannel::update_settings`].
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSettings {
    /// Per-axis scale factors applied to raw readings.
    pub multipliers: [f32; 3],
    /// Fractional digits kept after truncating rounding. 0 disables
    /// fractional output entirely.
    pub rounding: u32,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            multipliers: [1.0; 3],
            rounding: 2,
        }
    }
}

/// Three-axis sensor pipeline publishing `{"x":..,"y":..,"z":..}`.
pub struct SensorChannel<P> {
    sink: P,
    topic: String,
    settings: ChannelSettings,
    // Last rounded values accepted for send. NaN means unknown, which
    // never compares nearly-equal and therefore forces a publish.
    last: [f32; 3],
}

impl<P: PublishSink> SensorChannel<P> {
    /// Creates a channel bound to `topic`. An empty topic disables the
    /// channel: `process` becomes a no-op.
    pub fn new(sink: P, topic: impl Into<String>) -> Self {
        Self {
            sink,
            topic: topic.into(),
            settings: ChannelSettings::default(),
            last: [f32::NAN; 3],
        }
    }

    /// Replaces the settings and invalidates the last-published cache so
    /// the next sample publishes unconditionally. Nothing is published
    /// synchronously. `rounding` is clamped to [`codec::MAX_DIGITS`].
    pub fn update_settings(&mut self, multipliers: [f32; 3], rounding: u32) {
        debug!(topic = %self.topic, ?multipliers, rounding, "channel settings updated");
        self.settings = ChannelSettings {
            multipliers,
            rounding: rounding.min(codec::MAX_DIGITS),
        };
        self.last = [f32::NAN; 3];
    }

    /// Processes one raw reading. Publishes only when at least one axis
    /// changed after scaling and rounding; the cache is updated only when
    /// the sink accepted the payload, so a refused publish is retried on
    /// the next sample even if the reading is unchanged.
    pub fn process(&mut self, x: f32, y: f32, z: f32) {
        if self.topic.is_empty() {
            return;
        }

        let digits = self.settings.rounding;
        let [mx, my, mz] = self.settings.multipliers;
        let rounded = [
            codec::round(x * mx, digits),
            codec::round(y * my, digits),
            codec::round(z * mz, digits),
        ];

        let unchanged = rounded
            .iter()
            .zip(self.last.iter())
            .all(|(new, old)| codec::nearly_equal(*new, *old));
        if unchanged {
            return;
        }

        let p = digits as usize;
        let payload = format!(
            "{{\"x\":{:.p$},\"y\":{:.p$},\"z\":{:.p$}}}",
            rounded[0], rounded[1], rounded[2]
        );
        if self.sink.publish(&self.topic, &payload) {
            self.last = rounded;
        }
    }
}

/// Single-value sensor pipeline publishing `{"value":..}`.
pub struct ScalarChannel<P> {
    sink: P,
    topic: String,
    rounding: u32,
    last: f32,
}

impl<P: PublishSink> ScalarChannel<P> {
    pub fn new(sink: P, topic: impl Into<String>) -> Self {
        Self {
            sink,
            topic: topic.into(),
            rounding: 2,
            last: f32::NAN,
        }
    }

    /// Replaces the rounding precision and forces the next sample to
    /// publish. `rounding` is clamped to [`codec::MAX_DIGITS`].
    pub fn update_settings(&mut self, rounding: u32) {
        debug!(topic = %self.topic, rounding, "channel settings updated");
        self.rounding = rounding.min(codec::MAX_DIGITS);
        self.last = f32::NAN;
    }

    pub fn process(&mut self, value: f32) {
        if self.topic.is_empty() {
            return;
        }

        let rounded = codec::round(value, self.rounding);
        if codec::nearly_equal(rounded, self.last) {
            return;
        }

        let payload = format!("{{\"value\":{:.p$}}}", rounded, p = self.rounding as usize);
        if self.sink.publish(&self.topic, &payload) {
            self.last = rounded;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    struct RecordingSink {
        calls: RefCell<Vec<(String, String)>>,
        accept: Cell<bool>,
    }

    impl RecordingSink {
        fn new() -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
                accept: Cell::new(true),
            }
        }

        fn count(&self) -> usize {
            self.calls.borrow().len()
        }

        fn last_payload(&self) -> String {
            self.calls.borrow().last().expect("no publish recorded").1.clone()
        }
    }

    impl PublishSink for RecordingSink {
        fn publish(&self, topic: &str, payload: &str) -> bool {
            self.calls
                .borrow_mut()
                .push((topic.to_string(), payload.to_string()));
            self.accept.get()
        }
    }

    #[test]
    fn scaled_reading_publishes_fixed_key_order_payload() {
        let sink = RecordingSink::new();
        let mut channel = SensorChannel::new(&sink, "sensors/accel");
        channel.update_settings([2.0, 2.0, 2.0], 1);

        channel.process(1.04, 1.06, 1.06);

        assert_eq!(sink.count(), 1);
        assert_eq!(sink.last_payload(), r#"{"x":2.0,"y":2.1,"z":2.1}"#);
    }

    #[test]
    fn identical_rounded_reading_is_suppressed() {
        let sink = RecordingSink::new();
        let mut channel = SensorChannel::new(&sink, "sensors/accel");
        channel.update_settings([2.0, 2.0, 2.0], 1);

        channel.process(1.04, 1.06, 1.06);
        channel.process(1.04, 1.06, 1.06);

        assert_eq!(sink.count(), 1);
    }

    #[test]
    fn sub_precision_jitter_is_suppressed() {
        let sink = RecordingSink::new();
        let mut channel = SensorChannel::new(&sink, "sensors/accel");
        channel.update_settings([1.0, 1.0, 1.0], 1);

        channel.process(0.51, 0.52, 0.53);
        // Different raw values, same rounded result.
        channel.process(0.512, 0.528, 0.539);

        assert_eq!(sink.count(), 1);
    }

    #[test]
    fn settings_update_forces_republish_of_identical_values() {
        let sink = RecordingSink::new();
        let mut channel = SensorChannel::new(&sink, "sensors/accel");

        channel.process(1.0, 2.0, 3.0);
        assert_eq!(sink.count(), 1);

        channel.update_settings([1.0, 1.0, 1.0], 2);
        channel.process(1.0, 2.0, 3.0);
        assert_eq!(sink.count(), 2);
    }

    #[test]
    fn empty_topic_never_publishes() {
        let sink = RecordingSink::new();
        let mut channel = SensorChannel::new(&sink, "");
        channel.process(1.0, 2.0, 3.0);
        channel.update_settings([2.0, 2.0, 2.0], 0);
        channel.process(4.0, 5.0, 6.0);

        let mut scalar = ScalarChannel::new(&sink, "");
        scalar.process(21.5);

        assert_eq!(sink.count(), 0);
    }

    #[test]
    fn refused_publish_keeps_cache_stale_and_retries() {
        let sink = RecordingSink::new();
        sink.accept.set(false);
        let mut channel = ScalarChannel::new(&sink, "sensors/temp");

        channel.process(21.5);
        assert_eq!(sink.count(), 1);

        // The cache was not updated, so the same reading is attempted again.
        channel.process(21.5);
        assert_eq!(sink.count(), 2);

        sink.accept.set(true);
        channel.process(21.5);
        assert_eq!(sink.count(), 3);

        // Now cached, so the reading is suppressed.
        channel.process(21.5);
        assert_eq!(sink.count(), 3);
    }

    #[test]
    fn scalar_payload_respects_rounding_digits() {
        let sink = RecordingSink::new();
        let mut channel = ScalarChannel::new(&sink, "sensors/temp");

        channel.process(21.578);
        assert_eq!(sink.last_payload(), r#"{"value":21.57}"#);

        channel.update_settings(0);
        channel.process(21.578);
        assert_eq!(sink.last_payload(), r#"{"value":21}"#);
    }

    #[test]
    fn oversized_rounding_setting_is_clamped() {
        let sink = RecordingSink::new();
        let mut channel = ScalarChannel::new(&sink, "sensors/temp");
        channel.update_settings(3_000_000_000);

        channel.process(1.5);
        assert_eq!(sink.last_payload(), r#"{"value":1.500000}"#);
    }

    #[test]
    fn negative_zero_is_published_as_positive_zero() {
        let sink = RecordingSink::new();
        let mut channel = ScalarChannel::new(&sink, "sensors/temp");

        channel.process(-0.0001);
        assert_eq!(sink.last_payload(), r#"{"value":0.00}"#);
    }
}
