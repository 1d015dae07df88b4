// MIDI output for the winning melody.
//
// Writes a Standard MIDI File (format 0, single track): a track name, a
// tempo meta event, then one note-on/note-off pair per melody position,
// each one quarter note long at a fixed velocity, starting at tick 0.
//
// Uses the `midly` crate for encoding. Runs strictly after evolution.

use crate::error::ExportError;
use crate::scale::Note;
use midly::{
    Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind,
    num::{u4, u7, u15, u24, u28},
};
use std::path::Path;

/// Ticks per quarter note in MIDI output.
const TICKS_PER_QUARTER: u16 = 480;

/// Slowest tempo whose microseconds-per-quarter fits the 24-bit tempo field.
pub const MIN_TEMPO_BPM: u16 = 4;

const TRACK_NAME: &str = "Generated Melody";
const CHANNEL: u8 = 0;
const VELOCITY: u8 = 100;

/// Encode `melody` at `tempo_bpm` and write it to `path`.
pub fn write_midi(melody: &[Note], tempo_bpm: u16, path: &Path) -> Result<(), ExportError> {
    let bytes = melody_to_bytes(melody, tempo_bpm)?;
    std::fs::write(path, &bytes)?;
    tracing::info!(path = %path.display(), notes = melody.len(), tempo_bpm, "wrote MIDI");
    Ok(())
}

/// Encode `melody` as SMF bytes.
pub fn melody_to_bytes(melody: &[Note], tempo_bpm: u16) -> Result<Vec<u8>, ExportError> {
    let smf = melody_to_smf(melody, tempo_bpm)?;
    let mut buf = Vec::new();
    smf.write_std(&mut buf)?;
    Ok(buf)
}

/// Build an in-memory single-track SMF for `melody`.
pub fn melody_to_smf(melody: &[Note], tempo_bpm: u16) -> Result<Smf<'static>, ExportError> {
    let tempo = tempo_microseconds(tempo_bpm)?;
    let keys = melody
        .iter()
        .map(|&n| {
            u7::try_from(n)
                .ok_or_else(|| ExportError::InvalidArgument(format!("note {n} outside MIDI range")))
        })
        .collect::<Result<Vec<u7>, _>>()?;

    let channel = u4::new(CHANNEL);
    let vel = u7::new(VELOCITY);
    let quarter = u28::new(u32::from(TICKS_PER_QUARTER));

    let mut track: Track<'static> = Vec::with_capacity(keys.len() * 2 + 3);
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::TrackName(TRACK_NAME.as_bytes())),
    });
    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::Tempo(tempo)),
    });

    for key in keys {
        track.push(TrackEvent {
            delta: u28::new(0),
            kind: TrackEventKind::Midi {
                channel,
                message: MidiMessage::NoteOn { key, vel },
            },
        });
        track.push(TrackEvent {
            delta: quarter,
            kind: TrackEventKind::Midi {
                channel,
                message: MidiMessage::NoteOff {
                    key,
                    vel: u7::new(0),
                },
            },
        });
    }

    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });

    let mut smf = Smf::new(Header::new(
        Format::SingleTrack,
        Timing::Metrical(u15::new(TICKS_PER_QUARTER)),
    ));
    smf.tracks.push(track);
    Ok(smf)
}

/// Microseconds per quarter note at `tempo_bpm`.
fn tempo_microseconds(tempo_bpm: u16) -> Result<u24, ExportError> {
    if tempo_bpm == 0 {
        return Err(ExportError::InvalidArgument("tempo must be positive".into()));
    }
    u24::try_from(60_000_000 / u32::from(tempo_bpm)).ok_or_else(|| {
        ExportError::InvalidArgument(format!(
            "tempo {tempo_bpm} BPM is below the MIDI minimum of {MIN_TEMPO_BPM}"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note_ons(smf: &Smf) -> Vec<u8> {
        smf.tracks[0]
            .iter()
            .filter_map(|e| match e.kind {
                TrackEventKind::Midi {
                    message: MidiMessage::NoteOn { key, .. },
                    ..
                } => Some(key.as_int()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_one_pair_per_note() {
        let melody = [60, 62, 64, 65];
        let smf = melody_to_smf(&melody, 120).unwrap();
        assert_eq!(smf.tracks.len(), 1);
        // name + tempo + 2 per note + end of track
        assert_eq!(smf.tracks[0].len(), 3 + 2 * melody.len());
        assert_eq!(note_ons(&smf), melody.to_vec());
    }

    #[test]
    fn test_tempo_event() {
        let smf = melody_to_smf(&[60], 120).unwrap();
        let tempo = smf.tracks[0].iter().find_map(|e| match e.kind {
            TrackEventKind::Meta(MetaMessage::Tempo(t)) => Some(t.as_int()),
            _ => None,
        });
        assert_eq!(tempo, Some(500_000));
    }

    #[test]
    fn test_bytes_parse_back() {
        let bytes = melody_to_bytes(&[72, 71, 69, 67], 90).unwrap();
        let parsed = Smf::parse(&bytes).unwrap();
        assert_eq!(parsed.header.format, Format::SingleTrack);
        assert_eq!(note_ons(&parsed), vec![72, 71, 69, 67]);
    }

    #[test]
    fn test_rejects_out_of_range_note_and_zero_tempo() {
        assert!(matches!(
            melody_to_smf(&[60, 128], 120),
            Err(ExportError::InvalidArgument(_))
        ));
        assert!(matches!(melody_to_smf(&[60], 0), Err(ExportError::InvalidArgument(_))));
    }

    #[test]
    fn test_tempo_too_slow_for_tempo_field() {
        for bpm in 1..MIN_TEMPO_BPM {
            assert!(
                matches!(melody_to_smf(&[60], bpm), Err(ExportError::InvalidArgument(_))),
                "{bpm} BPM accepted"
            );
        }
        let smf = melody_to_smf(&[60], MIN_TEMPO_BPM).unwrap();
        let tempo = smf.tracks[0].iter().find_map(|e| match e.kind {
            TrackEventKind::Meta(MetaMessage::Tempo(t)) => Some(t.as_int()),
            _ => None,
        });
        assert_eq!(tempo, Some(15_000_000));
    }

    #[test]
    fn test_write_midi_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("melody.mid");
        write_midi(&[60, 64, 67], 120, &path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert_eq!(&bytes[..4], b"MThd");
    }

    #[test]
    fn test_write_midi_bad_directory() {
        let err = write_midi(&[60], 120, Path::new("/nonexistent/dir/out.mid")).unwrap_err();
        assert!(matches!(err, ExportError::Io(_)));
    }
}
