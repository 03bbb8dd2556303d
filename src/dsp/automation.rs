/*
Parameter Automation Timeline
=============================

A timeline is a declarative curve for one control stream (amplitude, filter
cutoff, ...). Instead of a per-sample state machine, callers schedule events
at absolute instants on the audio clock, and the renderer asks "what is the
value at time t?" for every sample.

Vocabulary
----------

  event       A point on the curve. SetValue jumps to a value at a time,
              LinearRamp arrives at a value at its end time.

  anchor      Read the live value at `now`, drop every event from `now`
              onwards, and pin the stream to that value with a SetValue.

  hold        After the last event the curve holds that event's value.


The Shape
---------

    value
      │         ramp(peak, t1)
      │          ╱╲
      │         ╱  ╲  ramp(sustain, t2)
      │        ╱    ╲________________
      │       ╱
      │  set(v0, t0)
      └──●─────●─────●──────────────────→ time
         t0    t1    t2

A LinearRamp starts from whatever the previous event left behind (its time
and value), so back-to-back ramps chain without jumps.


Why Anchor?
-----------

Cancelling a ramp that is half way done would leave the curve pointing at
the PREVIOUS event's value, which is a discontinuity (an audible click).
Anchoring first samples the curve at `now` and pins it there, so the next
ramp always starts from the value the listener is actually hearing:

    before:  ──╱‾‾‾‾‾‾          cancel only:  ──╱|          anchor:  ──╱──
                                                 |___ (jump)          (no jump)


Ordering
--------

Events stay sorted by time. Two events at the same instant keep the order in
which they were issued, so a SetValue followed by a zero-length ramp resolves
to the ramp's value.
*/

/// One scheduled point on an automation curve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AutomationEvent {
    /// Jump to `value` at `time`.
    SetValue { value: f32, time: f64 },
    /// Arrive at `value` at `end_time`, ramping linearly from the previous event.
    LinearRamp { value: f32, end_time: f64 },
}

impl AutomationEvent {
    pub fn time(&self) -> f64 {
        match *self {
            AutomationEvent::SetValue { time, .. } => time,
            AutomationEvent::LinearRamp { end_time, .. } => end_time,
        }
    }

    pub fn value(&self) -> f32 {
        match *self {
            AutomationEvent::SetValue { value, .. } | AutomationEvent::LinearRamp { value, .. } => {
                value
            }
        }
    }
}

pub struct ParamTimeline {
    default_value: f32,
    events: Vec<AutomationEvent>,
}

impl ParamTimeline {
    pub fn new(default_value: f32) -> Self {
        Self {
            default_value,
            events: Vec::with_capacity(8),
        }
    }

    pub fn set_value_at_time(&mut self, value: f32, time: f64) {
        self.insert(AutomationEvent::SetValue { value, time });
    }

    pub fn linear_ramp_to_value_at_time(&mut self, value: f32, end_time: f64) {
        self.insert(AutomationEvent::LinearRamp { value, end_time });
    }

    /// Drop every event scheduled at or after `from`.
    pub fn cancel_scheduled_values(&mut self, from: f64) {
        self.events.retain(|event| event.time() < from);
    }

    /// Pin the stream to its live value at `now`.
    ///
    /// Returns the pinned value. Sampling before and after the call at `now`
    /// yields the same number.
    pub fn anchor(&mut self, now: f64) -> f32 {
        let value = self.value_at(now);
        self.cancel_scheduled_values(now);
        self.set_value_at_time(value, now);
        value
    }

    /// Value of the curve at absolute time `t`.
    pub fn value_at(&self, t: f64) -> f32 {
        // First event strictly after t; everything before it has already happened.
        let next = self.events.partition_point(|event| event.time() <= t);

        let Some(previous) = next.checked_sub(1).map(|i| self.events[i]) else {
            // Nothing has happened yet. A ramp needs a starting point, so hold.
            return self.default_value;
        };

        match self.events.get(next) {
            Some(&AutomationEvent::LinearRamp { value, end_time }) => {
                let start_time = previous.time();
                let start_value = previous.value();
                let span = end_time - start_time;
                if span <= 0.0 {
                    return value;
                }
                let progress = ((t - start_time) / span) as f32;
                start_value + (value - start_value) * progress
            }
            _ => previous.value(),
        }
    }

    /// Render the curve for a block that starts at `start_time`.
    pub fn fill(&self, out: &mut [f32], start_time: f64, sample_rate: f32) {
        let dt = 1.0 / sample_rate as f64;
        for (i, sample) in out.iter_mut().enumerate() {
            *sample = self.value_at(start_time + i as f64 * dt);
        }
    }

    /// Time of the last scheduled event, if any.
    pub fn end_time(&self) -> Option<f64> {
        self.events.last().map(AutomationEvent::time)
    }

    pub fn events(&self) -> &[AutomationEvent] {
        &self.events
    }

    fn insert(&mut self, event: AutomationEvent) {
        // Insert after every event at the same instant to keep issuance order.
        let index = self
            .events
            .partition_point(|existing| existing.time() <= event.time());
        self.events.insert(index, event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    fn assert_close(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() < EPSILON,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn holds_default_until_first_event() {
        let mut timeline = ParamTimeline::new(0.5);
        timeline.linear_ramp_to_value_at_time(1.0, 2.0);

        assert_close(timeline.value_at(0.0), 0.5);
        assert_close(timeline.value_at(1.0), 0.5);
        assert_close(timeline.value_at(2.0), 1.0);
    }

    #[test]
    fn chained_ramps_interpolate_linearly() {
        let mut timeline = ParamTimeline::new(0.0);
        timeline.set_value_at_time(0.0, 1.0);
        timeline.linear_ramp_to_value_at_time(1.0, 2.0);
        timeline.linear_ramp_to_value_at_time(0.5, 3.0);

        assert_close(timeline.value_at(1.5), 0.5);
        assert_close(timeline.value_at(2.0), 1.0);
        assert_close(timeline.value_at(2.5), 0.75);
        assert_close(timeline.value_at(3.0), 0.5);
        assert_close(timeline.value_at(10.0), 0.5);
    }

    #[test]
    fn anchor_mid_ramp_pins_the_live_value() {
        let mut timeline = ParamTimeline::new(0.0);
        timeline.set_value_at_time(0.0, 0.0);
        timeline.linear_ramp_to_value_at_time(1.0, 1.0);

        let before = timeline.value_at(0.25);
        let pinned = timeline.anchor(0.25);
        let after = timeline.value_at(0.25);

        assert_close(pinned, 0.25);
        assert_eq!(before, after);
        // The old ramp target is gone: the curve holds instead of jumping back.
        assert_close(timeline.value_at(0.9), 0.25);
    }

    #[test]
    fn anchor_then_ramp_starts_from_pinned_value() {
        let mut timeline = ParamTimeline::new(0.0);
        timeline.set_value_at_time(0.0, 0.0);
        timeline.linear_ramp_to_value_at_time(1.0, 1.0);

        timeline.anchor(0.5);
        timeline.linear_ramp_to_value_at_time(0.0, 1.5);

        assert_close(timeline.value_at(0.5), 0.5);
        assert_close(timeline.value_at(1.0), 0.25);
        assert_close(timeline.value_at(1.5), 0.0);
    }

    #[test]
    fn cancel_drops_events_at_or_after_time() {
        let mut timeline = ParamTimeline::new(0.0);
        timeline.set_value_at_time(1.0, 1.0);
        timeline.set_value_at_time(2.0, 2.0);
        timeline.set_value_at_time(3.0, 3.0);

        timeline.cancel_scheduled_values(2.0);

        assert_eq!(timeline.events().len(), 1);
        assert_eq!(timeline.end_time(), Some(1.0));
    }

    #[test]
    fn same_instant_events_keep_issue_order() {
        let mut timeline = ParamTimeline::new(0.0);
        timeline.set_value_at_time(0.2, 1.0);
        timeline.linear_ramp_to_value_at_time(0.8, 1.0);

        // Zero-length ramp issued last wins.
        assert_close(timeline.value_at(1.0), 0.8);
        assert!(matches!(
            timeline.events()[1],
            AutomationEvent::LinearRamp { .. }
        ));
    }

    #[test]
    fn fill_matches_value_at_per_sample() {
        let sample_rate = 1_000.0;
        let mut timeline = ParamTimeline::new(0.0);
        timeline.set_value_at_time(0.0, 0.0);
        timeline.linear_ramp_to_value_at_time(1.0, 0.1);

        let mut buffer = vec![0.0f32; 200];
        timeline.fill(&mut buffer, 0.0, sample_rate);

        assert_close(buffer[0], 0.0);
        assert_close(buffer[50], 0.5);
        assert_close(buffer[100], 1.0);
        assert_close(buffer[199], 1.0);
    }
}
