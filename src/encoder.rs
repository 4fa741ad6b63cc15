use crate::model::note::{NoteRecord, TICKS_PER_BEAT};
use anyhow::{Result, anyhow, bail};
use clap::ValueEnum;
use log::{debug, info, warn};
use midly::num::{u4, u7, u15, u28};
use midly::{Format, Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const CHANNEL: u8 = 0;
const MAX_DATA_BYTE: i64 = 127;
const MAX_DELTA: i64 = 0x0FFF_FFFF;

/// How chord members end up on the MIDI timeline.
#[derive(Serialize, Deserialize, ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimingMode {
    /// Each note-on is followed directly by its note-off, later chord members start at delta 0
    /// after the previous note-off, and the running clock only advances to each group's start.
    #[default]
    Reference,

    /// Every note-on sits at its start tick and every note-off at its end tick on one absolute
    /// clock, so chord members really do sound together.
    Absolute,
}

/// Counts values squashed into MIDI's 7-bit data / 28-bit delta ranges so we only warn once.
#[derive(Default)]
struct Clamps {
    count: usize,
}

impl Clamps {
    fn data(&mut self, value: i64) -> u7 {
        let clamped = value.clamp(0, MAX_DATA_BYTE);
        if clamped != value {
            self.count += 1;
        }
        u7::new(clamped as u8)
    }

    fn delta(&mut self, value: i64) -> u28 {
        let clamped = value.clamp(0, MAX_DELTA);
        if clamped != value {
            self.count += 1;
        }
        u28::new(clamped as u32)
    }
}

/// Builds the single track for `notes`: a program change, then note-on/note-off pairs.
///
/// `on_progress` is called with a rough 0..=100 percentage after each note is emitted.
pub fn build_track(
    notes: &[NoteRecord],
    program: u8,
    timing: TimingMode,
    on_progress: &mut dyn FnMut(u8),
) -> Track<'static> {
    let mut sorted: Vec<&NoteRecord> = notes.iter().collect();
    sorted.sort_by_key(|note| note.start_time);

    let mut clamps = Clamps::default();
    let mut track: Track<'static> = Vec::with_capacity(notes.len() * 2 + 2);

    track.push(TrackEvent {
        delta: u28::new(0),
        kind: midi_event(MidiMessage::ProgramChange {
            program: clamps.data(program as i64),
        }),
    });

    match timing {
        TimingMode::Reference => reference_events(&sorted, &mut track, &mut clamps, on_progress),
        TimingMode::Absolute => absolute_events(&sorted, &mut track, &mut clamps, on_progress),
    }

    track.push(TrackEvent {
        delta: u28::new(0),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });

    if clamps.count > 0 {
        warn!(
            "Clamped {} out-of-range pitch/velocity/timing value(s) to fit the MIDI format..!",
            clamps.count
        );
    }

    track
}

fn reference_events(
    sorted: &[&NoteRecord],
    track: &mut Track<'static>,
    clamps: &mut Clamps,
    on_progress: &mut dyn FnMut(u8),
) {
    let total = sorted.len() * 2;
    let mut current_time: i64 = 0;

    for group in sorted.chunk_by(|a, b| a.start_time == b.start_time) {
        let start_time = group[0].start_time;
        let delta = start_time.saturating_sub(current_time).max(0);

        if group.len() > 1 {
            debug!("Chord of {} notes at tick {}", group.len(), start_time);
        }

        for (i, note) in group.iter().enumerate() {
            let key = clamps.data(note.pitch);
            let vel = clamps.data(note.velocity);

            track.push(TrackEvent {
                delta: clamps.delta(if i == 0 { delta } else { 0 }),
                kind: midi_event(MidiMessage::NoteOn { key, vel }),
            });
            track.push(TrackEvent {
                delta: clamps.delta(note.duration),
                kind: midi_event(MidiMessage::NoteOff { key, vel }),
            });

            on_progress(progress(track.len(), total));
        }

        // Only the group's start is tracked, not when its notes end.
        current_time = start_time;
    }
}

fn absolute_events(
    sorted: &[&NoteRecord],
    track: &mut Track<'static>,
    clamps: &mut Clamps,
    on_progress: &mut dyn FnMut(u8),
) {
    let total = sorted.len() * 2;
    let mut points: Vec<(i64, bool, TrackEventKind<'static>)> = Vec::with_capacity(total);

    for note in sorted {
        let key = clamps.data(note.pitch);
        let vel = clamps.data(note.velocity);
        let start = note.start_time.max(0);
        let end = note.end_time().max(start);

        points.push((start, true, midi_event(MidiMessage::NoteOn { key, vel })));
        points.push((end, false, midi_event(MidiMessage::NoteOff { key, vel })));
    }

    // Note-offs go before note-ons on the same tick so repeated pitches retrigger cleanly.
    points.sort_by_key(|(tick, is_on, _)| (*tick, *is_on));

    let mut last_tick: i64 = 0;
    for (tick, _, kind) in points {
        track.push(TrackEvent {
            delta: clamps.delta(tick - last_tick),
            kind,
        });
        last_tick = tick;

        on_progress(progress(track.len(), total));
    }
}

fn midi_event(message: MidiMessage) -> TrackEventKind<'static> {
    TrackEventKind::Midi {
        channel: u4::new(CHANNEL),
        message,
    }
}

fn progress(emitted: usize, total: usize) -> u8 {
    if total == 0 {
        return 100;
    }
    (emitted * 100 / total).min(100) as u8
}

/// Encodes `notes` as a single-track Standard MIDI File at 480 ticks per quarter note.
pub fn encode(notes: &[NoteRecord], program: u8, timing: TimingMode) -> Result<Vec<u8>> {
    encode_with_progress(notes, program, timing, &mut |_| {})
}

pub fn encode_with_progress(
    notes: &[NoteRecord],
    program: u8,
    timing: TimingMode,
    on_progress: &mut dyn FnMut(u8),
) -> Result<Vec<u8>> {
    if notes.is_empty() {
        bail!("No notes to encode..!");
    }

    let mut smf = Smf::new(Header::new(
        Format::SingleTrack,
        Timing::Metrical(u15::new(TICKS_PER_BEAT)),
    ));
    smf.tracks.push(build_track(notes, program, timing, on_progress));

    let mut bytes = Vec::new();
    smf.write_std(&mut bytes)
        .map_err(|e| anyhow!("Failed to serialize MIDI: {}", e))?;

    Ok(bytes)
}

/// Encodes `notes` and writes them into `dir` under `base_name`, or the first free
/// `<stem>_<n>.<ext>` variant of it. Returns the path that was written.
pub fn write_sequence<P: AsRef<Path>>(
    notes: &[NoteRecord],
    program: u8,
    timing: TimingMode,
    dir: P,
    base_name: &str,
    on_progress: &mut dyn FnMut(u8),
) -> Result<PathBuf> {
    let bytes = encode_with_progress(notes, program, timing, on_progress)?;
    let dir = dir.as_ref();

    fs::create_dir_all(dir)
        .map_err(|e| anyhow!("Failed to create output directory {}: {}", dir.display(), e))?;

    let path = unique_output_path(dir, base_name);
    fs::write(&path, &bytes)
        .map_err(|e| anyhow!("Failed to write MIDI file {}: {}", path.display(), e))?;

    info!(
        "Wrote {} notes ({} bytes) to '{}'..!",
        notes.len(),
        bytes.len(),
        path.display()
    );

    Ok(path)
}

/// `dir/base_name` if that is free, otherwise `dir/<stem>_1.<ext>`, `dir/<stem>_2.<ext>`, ...
pub fn unique_output_path(dir: &Path, base_name: &str) -> PathBuf {
    let candidate = dir.join(base_name);
    if !candidate.exists() {
        return candidate;
    }

    let base = Path::new(base_name);
    let stem = base
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(base_name);
    let ext = base.extension().and_then(|s| s.to_str());

    let mut counter: u64 = 1;
    loop {
        let name = match ext {
            Some(ext) => format!("{}_{}.{}", stem, counter, ext),
            None => format!("{}_{}", stem, counter),
        };

        let candidate = dir.join(name);
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}
