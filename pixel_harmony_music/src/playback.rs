// Audio preview of a melody.
//
// `MelodyPlayer` is the boundary the CLI talks to. `SynthPlayer` renders
// each note as a decaying sine tone and hands the samples to an
// `AudioOutput` (a sound-device backend supplied by the embedding
// application), pausing briefly between notes. When no output is
// available, `select_player` returns a `MockPlayer` that only logs. A
// `SynthPlayer` whose output fails also degrades to logging for the rest
// of its life rather than failing the caller.
//
// Playback happens after evolution finishes and never touches its state.

use crate::scale::Note;
use std::time::Duration;
use thiserror::Error;

pub const SAMPLE_RATE: u32 = 44_100;

/// Peak amplitude of a rendered tone.
const AMPLITUDE: f32 = 0.3;
/// Envelope is `exp(-DECAY * t / duration)`.
const DECAY: f64 = 3.0;
/// Silence between consecutive notes.
pub const NOTE_GAP: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
#[error("audio output failed: {0}")]
pub struct PlaybackError(pub String);

/// Equal-tempered frequency of a MIDI note (A4 = 69 = 440 Hz).
pub fn midi_to_freq(note: Note) -> f64 {
    440.0 * 2f64.powf((f64::from(note) - 69.0) / 12.0)
}

/// Render one note: a sine at the note's frequency under an exponential
/// decay envelope, `duration` seconds long.
pub fn synthesize_note(note: Note, duration: f64, sample_rate: u32) -> Vec<f32> {
    let count = (duration.max(0.0) * f64::from(sample_rate)) as usize;
    if count == 0 {
        return Vec::new();
    }
    let freq = midi_to_freq(note);
    let step = std::f64::consts::TAU * freq / f64::from(sample_rate);
    (0..count)
        .map(|i| {
            let envelope = (-DECAY * i as f64 / count as f64).exp();
            ((step * i as f64).sin() * envelope) as f32 * AMPLITUDE
        })
        .collect()
}

/// A sound device (or anything that accepts mono f32 samples).
pub trait AudioOutput {
    fn play(&mut self, samples: &[f32], sample_rate: u32) -> Result<(), PlaybackError>;
}

pub trait MelodyPlayer {
    /// Play `melody` with each note lasting `note_duration` seconds.
    /// Never fails; problems are logged.
    fn play_melody(&mut self, melody: &[Note], note_duration: f64);
}

/// Logs what would be played and remembers it.
#[derive(Debug, Default)]
pub struct MockPlayer {
    pub played: Vec<Vec<Note>>,
}

impl MelodyPlayer for MockPlayer {
    fn play_melody(&mut self, melody: &[Note], note_duration: f64) {
        tracing::info!(notes = ?melody, note_duration, "mock playback");
        self.played.push(melody.to_vec());
    }
}

pub struct SynthPlayer<O: AudioOutput> {
    output: O,
    sample_rate: u32,
    gap: Duration,
    degraded: bool,
}

impl<O: AudioOutput> SynthPlayer<O> {
    pub fn new(output: O) -> Self {
        SynthPlayer {
            output,
            sample_rate: SAMPLE_RATE,
            gap: NOTE_GAP,
            degraded: false,
        }
    }

    pub fn with_gap(mut self, gap: Duration) -> Self {
        self.gap = gap;
        self
    }

    /// True once an output error has switched this player to logging only.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }
}

impl<O: AudioOutput> MelodyPlayer for SynthPlayer<O> {
    fn play_melody(&mut self, melody: &[Note], note_duration: f64) {
        for (i, &note) in melody.iter().enumerate() {
            if self.degraded {
                tracing::debug!(index = i, note, "skipping note, audio unavailable");
                continue;
            }
            let samples = synthesize_note(note, note_duration, self.sample_rate);
            if let Err(e) = self.output.play(&samples, self.sample_rate) {
                tracing::warn!(error = %e, "audio output failed, continuing without sound");
                self.degraded = true;
                continue;
            }
            if !self.gap.is_zero() {
                std::thread::sleep(self.gap);
            }
        }
    }
}

/// Real synthesis when an output is available, mock playback otherwise.
pub fn select_player(output: Option<Box<dyn AudioOutput>>) -> Box<dyn MelodyPlayer> {
    match output {
        Some(output) => Box::new(SynthPlayer::new(output)),
        None => {
            tracing::info!("no audio device, using mock player");
            Box::new(MockPlayer::default())
        }
    }
}

impl AudioOutput for Box<dyn AudioOutput> {
    fn play(&mut self, samples: &[f32], sample_rate: u32) -> Result<(), PlaybackError> {
        (**self).play(samples, sample_rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Counts sample buffers; fails after `fail_after` of them.
    struct CountingOutput {
        buffers: usize,
        fail_after: usize,
    }

    impl AudioOutput for &mut CountingOutput {
        fn play(&mut self, samples: &[f32], _sample_rate: u32) -> Result<(), PlaybackError> {
            assert!(!samples.is_empty());
            if self.buffers >= self.fail_after {
                return Err(PlaybackError("device unplugged".into()));
            }
            self.buffers += 1;
            Ok(())
        }
    }

    #[test]
    fn test_midi_to_freq_reference_points() {
        assert!((midi_to_freq(69) - 440.0).abs() < 1e-9);
        assert!((midi_to_freq(81) - 880.0).abs() < 1e-9);
        assert!((midi_to_freq(60) - 261.625_565).abs() < 1e-5);
    }

    #[test]
    fn test_synthesized_note_shape() {
        let samples = synthesize_note(69, 0.5, SAMPLE_RATE);
        assert_eq!(samples.len(), 22_050);
        assert_eq!(samples[0], 0.0);
        assert!(samples.iter().all(|s| s.abs() <= AMPLITUDE));
        // Decays to about e^-3 of the peak by the end.
        let tail_peak = samples[samples.len() - 200..].iter().fold(0f32, |m, s| m.max(s.abs()));
        assert!(tail_peak < AMPLITUDE * 0.06, "tail peak {tail_peak}");
        assert!(synthesize_note(60, 0.0, SAMPLE_RATE).is_empty());
    }

    #[test]
    fn test_synth_player_plays_every_note() {
        let mut out = CountingOutput { buffers: 0, fail_after: usize::MAX };
        {
            let mut player = SynthPlayer::new(&mut out).with_gap(Duration::ZERO);
            player.play_melody(&[60, 62, 64], 0.01);
            assert!(!player.is_degraded());
        }
        assert_eq!(out.buffers, 3);
    }

    #[test]
    fn test_synth_player_degrades_on_failure() {
        let mut out = CountingOutput { buffers: 0, fail_after: 1 };
        {
            let mut player = SynthPlayer::new(&mut out).with_gap(Duration::ZERO);
            player.play_melody(&[60, 62, 64, 65], 0.01);
            assert!(player.is_degraded());
        }
        assert_eq!(out.buffers, 1);
    }

    #[test]
    fn test_mock_records() {
        let mut player = MockPlayer::default();
        player.play_melody(&[60, 67], 0.5);
        assert_eq!(player.played, vec![vec![60, 67]]);
    }

    #[test]
    fn test_select_player_without_device_does_not_panic() {
        let mut player = select_player(None);
        player.play_melody(&[60, 64, 67], 0.5);
    }
}
