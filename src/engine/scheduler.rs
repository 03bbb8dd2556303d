use std::collections::{HashSet, VecDeque};

use rand::{rngs::StdRng, Rng, SeedableRng};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{
    error::{Error, Result},
    synth::{
        envelope::{EnvelopeConfig, Parameter, ParameterChange},
        message::{EngineMessage, MessageSender},
        voice::{Voice, VoiceId, VoiceSettings},
    },
};

/*
Trigger Scheduler
=================

The scheduler lives on the control side and runs on its own clock (seconds,
usually wall time since the app started). Nothing here touches audio: each
timer only sends a message that the engine applies on the audio clock.

Two kinds of timers:

  periodic   every `period`, spawn one voice with a random pitch from the
             pool and a snapshot of the current envelope
  one-shot   `period` after a voice was spawned, release it

    start(t0)
      │      fire            fire            fire
      ├───────●───────────────●───────────────●──────→ control time
      t0    t0+P            t0+2P           t0+3P
              └── release ────┘└── release ───┘

`stop()` only cancels the periodic timer. Pending releases still go out, so
every voice already spawned rings out exactly as it would have.

Periodicity is best effort: timers fire when `advance_to` is called with a
time at or past their due instant. If the caller falls more than a period
behind, one firing goes out and the grid realigns to the late instant
instead of bursting through every missed firing.
*/

#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerConfig {
    pub period_ms: f64,
    /// Pitches (MIDI notes) the scheduler draws from, with replacement.
    pub pitch_pool: Vec<u8>,
    /// Envelope in effect before any parameter change arrives.
    pub envelope: EnvelopeConfig,
    pub voice: VoiceSettings,
    /// Fixed RNG seed for reproducible pitch sequences.
    pub seed: Option<u64>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            period_ms: 125.0,
            pitch_pool: vec![60, 62, 64, 67, 69, 72], // C major pentatonic
            envelope: EnvelopeConfig::default(),
            voice: VoiceSettings::default(),
            seed: None,
        }
    }
}

impl SchedulerConfig {
    pub fn period_ms(mut self, period_ms: f64) -> Self {
        self.period_ms = period_ms;
        self
    }

    pub fn pitch_pool(mut self, pitch_pool: impl Into<Vec<u8>>) -> Self {
        self.pitch_pool = pitch_pool.into();
        self
    }

    pub fn envelope(mut self, envelope: EnvelopeConfig) -> Self {
        self.envelope = envelope;
        self
    }

    pub fn voice(mut self, voice: VoiceSettings) -> Self {
        self.voice = voice;
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.period_ms.is_finite() && self.period_ms > 0.0) {
            return Err(Error::InvalidConfig(format!(
                "period {} ms must be positive",
                self.period_ms
            )));
        }
        if self.pitch_pool.is_empty() {
            return Err(Error::InvalidConfig("pitch pool is empty".into()));
        }
        if let Some(pitch) = self.pitch_pool.iter().find(|&&p| p > 127) {
            return Err(Error::InvalidConfig(format!(
                "pitch {pitch} is outside the MIDI range"
            )));
        }
        // Re-validate the envelope field by field; the struct is public.
        for parameter in [
            Parameter::Attack,
            Parameter::Decay,
            Parameter::Sustain,
            Parameter::Release,
        ] {
            if let Some(value) = self.envelope.get(parameter) {
                parameter.validate(value)?;
            }
        }
        self.voice.validate()
    }
}

#[derive(Debug, Clone, Copy)]
struct PendingRelease {
    due: f64,
    voice: VoiceId,
}

pub struct Scheduler {
    period: f64, // seconds
    pitch_pool: Vec<u8>,
    envelope: EnvelopeConfig,
    voice_settings: VoiceSettings,
    rng: StdRng,

    running: bool,
    next_fire: Option<f64>,
    next_voice_id: u64,

    /// One-shot release timers, ordered by due time.
    pending_releases: VecDeque<PendingRelease>,
    active_voices: HashSet<VoiceId>,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig) -> Result<Self> {
        config.validate()?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Self {
            period: config.period_ms / 1000.0,
            pitch_pool: config.pitch_pool,
            envelope: config.envelope,
            voice_settings: config.voice,
            rng,
            running: false,
            next_fire: None,
            next_voice_id: 0,
            pending_releases: VecDeque::new(),
            active_voices: HashSet::new(),
        })
    }

    /// Begin firing every period, the first firing one period after `now`.
    /// Restarting a running scheduler stops it cleanly first.
    pub fn start(&mut self, now: f64) {
        if self.running {
            self.stop();
        }
        self.running = true;
        self.next_fire = Some(now + self.period);
        info!(now, period = self.period, "scheduler started");
    }

    /// Cancel periodic firing. Voices already spawned still get released.
    pub fn stop(&mut self) {
        if self.running {
            info!(
                active = self.active_voices.len(),
                pending_releases = self.pending_releases.len(),
                "scheduler stopped"
            );
        }
        self.running = false;
        self.next_fire = None;
    }

    /// Run every timer that is due at or before `now`, in time order.
    ///
    /// A release due at the same instant as a firing goes first.
    pub fn advance_to(&mut self, now: f64, sink: &mut impl MessageSender) {
        loop {
            let release_due = self
                .pending_releases
                .front()
                .map(|release| release.due)
                .filter(|&due| due <= now);
            let fire_due = self
                .next_fire
                .filter(|&due| self.running && due <= now);

            match (release_due, fire_due) {
                (Some(release), Some(fire)) if release <= fire => {
                    if !self.release_next(sink) {
                        break;
                    }
                }
                (Some(_), None) => {
                    if !self.release_next(sink) {
                        break;
                    }
                }
                (_, Some(fire)) => self.fire(fire, now, sink),
                (None, None) => break,
            }
        }
    }

    /// Apply a parameter change from the UI layer.
    ///
    /// Envelope parameters take effect at the next firing; `FeedbackGain` is
    /// forwarded to the bus insert. Out-of-range values are returned as
    /// `InvalidParameter` and change nothing.
    pub fn apply_parameter(
        &mut self,
        change: ParameterChange,
        sink: &mut impl MessageSender,
    ) -> Result<()> {
        let ParameterChange { parameter, value } = change;
        match parameter {
            Parameter::FeedbackGain => {
                parameter.validate(value)?;
                sink.send(EngineMessage::FeedbackGain(value))?;
            }
            _ => self.envelope.set(parameter, value)?,
        }
        debug!(%parameter, value, "parameter applied");
        Ok(())
    }

    /// Forget a voice the engine reported as finished.
    pub fn voice_finished(&mut self, id: VoiceId) {
        if self.active_voices.remove(&id) {
            debug!(voice = %id, "voice reaped");
        }
    }

    pub fn reap(&mut self, finished: impl IntoIterator<Item = VoiceId>) {
        for id in finished {
            self.voice_finished(id);
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Current envelope, as the next voice will receive it.
    pub fn envelope(&self) -> EnvelopeConfig {
        self.envelope
    }

    pub fn period_seconds(&self) -> f64 {
        self.period
    }

    pub fn pitch_pool(&self) -> &[u8] {
        &self.pitch_pool
    }

    pub fn next_fire_time(&self) -> Option<f64> {
        self.next_fire
    }

    pub fn active_voices(&self) -> &HashSet<VoiceId> {
        &self.active_voices
    }

    pub fn pending_release_count(&self) -> usize {
        self.pending_releases.len()
    }

    /// Fire the timer due at `at`. A late poll fires at `now`, and the
    /// release is timed from that instant.
    fn fire(&mut self, at: f64, now: f64, sink: &mut impl MessageSender) {
        let id = VoiceId(self.next_voice_id);
        self.next_voice_id += 1;

        let fired_at = at.max(now);
        let pitch = self.pick_pitch();
        let voice = Voice::new(id, pitch, self.envelope, &self.voice_settings, fired_at);

        match sink.send(EngineMessage::Spawn(Box::new(voice))) {
            Ok(()) => {
                debug!(voice = %id, pitch, fired_at, "voice spawned");
                self.active_voices.insert(id);
                self.pending_releases.push_back(PendingRelease {
                    due: fired_at + self.period,
                    voice: id,
                });
            }
            Err(err) => warn!(voice = %id, %err, "voice dropped before it started"),
        }

        let mut next = at + self.period;
        if next <= now {
            debug!(late_by = now - at, "scheduler fell behind, realigning");
            next = now + self.period;
        }
        self.next_fire = Some(next);
    }

    /// Send the earliest pending release. Returns false if the sink refused
    /// it; the release stays queued for the next call.
    fn release_next(&mut self, sink: &mut impl MessageSender) -> bool {
        let Some(release) = self.pending_releases.pop_front() else {
            return false;
        };

        match sink.send(EngineMessage::Release(release.voice)) {
            Ok(()) => true,
            Err(err) => {
                warn!(voice = %release.voice, %err, "release deferred");
                self.pending_releases.push_front(release);
                false
            }
        }
    }

    fn pick_pitch(&mut self) -> u8 {
        let index = self.rng.gen_range(0..self.pitch_pool.len());
        self.pitch_pool[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque as Queue;

    /// Sink that records what it was sent, and can refuse messages.
    #[derive(Default)]
    struct RecordingSink {
        refuse: bool,
        sent: Queue<EngineMessage>,
    }

    impl MessageSender for RecordingSink {
        fn send(&mut self, message: EngineMessage) -> Result<()> {
            if self.refuse {
                return Err(Error::QueueFull);
            }
            self.sent.push_back(message);
            Ok(())
        }
    }

    impl RecordingSink {
        fn spawned(&self) -> Vec<(VoiceId, u8)> {
            self.sent
                .iter()
                .filter_map(|m| match m {
                    EngineMessage::Spawn(voice) => Some((voice.id(), voice.pitch())),
                    _ => None,
                })
                .collect()
        }

        fn released(&self) -> Vec<VoiceId> {
            self.sent
                .iter()
                .filter_map(|m| match m {
                    EngineMessage::Release(id) => Some(*id),
                    _ => None,
                })
                .collect()
        }
    }

    fn scheduler(config: SchedulerConfig) -> Scheduler {
        Scheduler::new(config.seed(7)).unwrap()
    }

    #[test]
    fn rejects_invalid_configuration() {
        let empty = SchedulerConfig::default().pitch_pool(Vec::<u8>::new());
        assert!(matches!(Scheduler::new(empty), Err(Error::InvalidConfig(_))));

        let zero_period = SchedulerConfig::default().period_ms(0.0);
        assert!(Scheduler::new(zero_period).is_err());

        let bad_pitch = SchedulerConfig::default().pitch_pool([60, 200]);
        assert!(Scheduler::new(bad_pitch).is_err());

        let mut bad_envelope = SchedulerConfig::default();
        bad_envelope.envelope.sustain_level = 2.0;
        assert!(matches!(
            Scheduler::new(bad_envelope),
            Err(Error::InvalidParameter { .. })
        ));
    }

    #[test]
    fn first_firing_is_one_period_after_start() {
        let mut scheduler = scheduler(SchedulerConfig::default().period_ms(100.0));
        let mut sink = RecordingSink::default();

        scheduler.start(1.0);
        scheduler.advance_to(1.05, &mut sink);
        assert!(sink.sent.is_empty());

        scheduler.advance_to(1.1, &mut sink);
        assert_eq!(sink.spawned().len(), 1);
        assert_eq!(scheduler.active_voices().len(), 1);
        let next = scheduler.next_fire_time().unwrap();
        assert!((next - 1.2).abs() < 1e-9);
    }

    #[test]
    fn release_follows_one_period_after_spawn() {
        let mut scheduler = scheduler(SchedulerConfig::default().period_ms(100.0));
        let mut sink = RecordingSink::default();

        scheduler.start(0.0);
        scheduler.advance_to(0.1, &mut sink);
        let first = sink.spawned()[0].0;
        assert!(sink.released().is_empty());

        scheduler.advance_to(0.2, &mut sink);
        assert_eq!(sink.released(), vec![first]);
        assert_eq!(sink.spawned().len(), 2);

        // The release for the first voice went out before the second spawn.
        assert!(matches!(sink.sent[1], EngineMessage::Release(id) if id == first));
    }

    #[test]
    fn stop_cancels_firing_but_not_pending_releases() {
        let mut scheduler = scheduler(SchedulerConfig::default().period_ms(100.0));
        let mut sink = RecordingSink::default();

        scheduler.start(0.0);
        scheduler.advance_to(0.1, &mut sink);
        scheduler.stop();

        scheduler.advance_to(1.0, &mut sink);

        assert!(!scheduler.is_running());
        assert_eq!(sink.spawned().len(), 1);
        assert_eq!(sink.released().len(), 1);
        assert_eq!(scheduler.pending_release_count(), 0);
    }

    #[test]
    fn restart_does_not_orphan_the_old_timer() {
        let mut scheduler = scheduler(SchedulerConfig::default().period_ms(100.0));
        let mut sink = RecordingSink::default();

        scheduler.start(0.0);
        scheduler.start(0.05);
        let next = scheduler.next_fire_time().unwrap();
        assert!((next - 0.15).abs() < 1e-9);

        scheduler.advance_to(0.12, &mut sink);
        assert!(sink.spawned().is_empty(), "old grid must not fire");

        scheduler.advance_to(0.16, &mut sink);
        assert_eq!(sink.spawned().len(), 1);
    }

    #[test]
    fn late_polling_does_not_burst() {
        let mut scheduler = scheduler(SchedulerConfig::default().period_ms(100.0));
        let mut sink = RecordingSink::default();

        scheduler.start(0.0);
        scheduler.advance_to(1.0, &mut sink);

        assert_eq!(sink.spawned().len(), 1);
        let next = scheduler.next_fire_time().unwrap();
        assert!((next - 1.1).abs() < 1e-9);
    }

    #[test]
    fn late_firing_holds_for_a_full_period() {
        let mut scheduler = scheduler(SchedulerConfig::default().period_ms(100.0));
        let mut sink = RecordingSink::default();

        scheduler.start(0.0);
        scheduler.advance_to(0.25, &mut sink);

        assert_eq!(sink.spawned().len(), 1);
        assert!(sink.released().is_empty(), "release sent with its spawn");
        let EngineMessage::Spawn(voice) = &sink.sent[0] else {
            panic!("first message should be a spawn");
        };
        assert_eq!(voice.created_at(), 0.25);

        scheduler.advance_to(0.349, &mut sink);
        assert!(sink.released().is_empty());
        scheduler.advance_to(0.36, &mut sink);
        assert_eq!(sink.released().len(), 1);
    }

    #[test]
    fn pitches_come_from_the_pool_and_cover_it() {
        let pool = [48u8, 55, 60, 67];
        let mut scheduler = scheduler(SchedulerConfig::default().period_ms(10.0).pitch_pool(pool));
        let mut sink = RecordingSink::default();

        scheduler.start(0.0);
        for step in 1..=4_000 {
            scheduler.advance_to(step as f64 * 0.001, &mut sink);
        }

        let pitches: HashSet<u8> = sink.spawned().into_iter().map(|(_, p)| p).collect();
        assert!(sink.spawned().len() >= 300);
        assert!(pitches.iter().all(|p| pool.contains(p)));
        assert_eq!(pitches.len(), pool.len());
    }

    #[test]
    fn voices_snapshot_the_envelope_at_firing() {
        let mut scheduler = scheduler(SchedulerConfig::default().period_ms(100.0));
        let mut sink = RecordingSink::default();

        scheduler.start(0.0);
        scheduler.advance_to(0.1, &mut sink);
        scheduler
            .apply_parameter(ParameterChange::new(Parameter::Attack, 0.5), &mut sink)
            .unwrap();
        scheduler.advance_to(0.2, &mut sink);

        let attacks: Vec<f32> = sink
            .sent
            .iter()
            .filter_map(|m| match m {
                EngineMessage::Spawn(voice) => Some(voice.envelope().attack_seconds),
                _ => None,
            })
            .collect();
        assert_eq!(attacks, vec![EnvelopeConfig::default().attack_seconds, 0.5]);
    }

    #[test]
    fn invalid_parameters_are_surfaced_and_ignored() {
        let mut scheduler = scheduler(SchedulerConfig::default());
        let mut sink = RecordingSink::default();
        let before = scheduler.envelope();

        let err = scheduler
            .apply_parameter(ParameterChange::new(Parameter::Release, -1.0), &mut sink)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { .. }));

        let err = scheduler
            .apply_parameter(ParameterChange::new(Parameter::FeedbackGain, 1.2), &mut sink)
            .unwrap_err();
        assert!(matches!(err, Error::InvalidParameter { .. }));

        assert_eq!(scheduler.envelope(), before);
        assert!(sink.sent.is_empty());
    }

    #[test]
    fn feedback_gain_is_forwarded_to_the_engine() {
        let mut scheduler = scheduler(SchedulerConfig::default());
        let mut sink = RecordingSink::default();

        scheduler
            .apply_parameter(ParameterChange::new(Parameter::FeedbackGain, 0.4), &mut sink)
            .unwrap();

        assert!(matches!(sink.sent[0], EngineMessage::FeedbackGain(g) if g == 0.4));
        assert_eq!(scheduler.envelope(), EnvelopeConfig::default());
    }

    #[test]
    fn refused_spawn_is_dropped_and_refused_release_retried() {
        let mut scheduler = scheduler(SchedulerConfig::default().period_ms(100.0));
        let mut sink = RecordingSink::default();

        scheduler.start(0.0);
        sink.refuse = true;
        scheduler.advance_to(0.1, &mut sink);
        assert!(scheduler.active_voices().is_empty());
        assert_eq!(scheduler.pending_release_count(), 0);

        sink.refuse = false;
        scheduler.advance_to(0.2, &mut sink);
        let spawned = sink.spawned()[0].0;

        sink.refuse = true;
        scheduler.advance_to(0.3, &mut sink);
        assert_eq!(scheduler.pending_release_count(), 1);

        sink.refuse = false;
        scheduler.stop();
        scheduler.advance_to(0.31, &mut sink);
        assert_eq!(sink.released(), vec![spawned]);
    }

    #[test]
    fn reap_removes_finished_voices() {
        let mut scheduler = scheduler(SchedulerConfig::default().period_ms(100.0));
        let mut sink = RecordingSink::default();

        scheduler.start(0.0);
        scheduler.advance_to(0.3, &mut sink);
        let ids: Vec<VoiceId> = sink.spawned().into_iter().map(|(id, _)| id).collect();
        assert_eq!(scheduler.active_voices().len(), ids.len());

        scheduler.reap(ids.iter().copied().take(1));
        assert_eq!(scheduler.active_voices().len(), ids.len() - 1);
        assert!(!scheduler.active_voices().contains(&ids[0]));
    }
}
