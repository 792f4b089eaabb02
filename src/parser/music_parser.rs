use crate::error::GpParseError;
use crate::parser::flags::{BeatFlags, NoteFlags, StringMask};
use crate::parser::primitive_parser::{
    parse_byte_size_string, parse_i8, parse_int, parse_int_byte_sized_string, parse_u8, skip,
    GpResult,
};
use crate::parser::song_parser::{
    convert_velocity, measure_starts, parse_beat_effects, parse_chord, parse_color,
    parse_duration, parse_measure_headers, parse_note_effects, Beat, BeatStroke,
    BeatStrokeDirection, ChannelParameter, Chord, Clef, DecodeNotice, DecoderOptions, Duration,
    GpVersion, Measure, MidiChannel, Note, NoteEffect, NoteType, Song, Tempo, Track,
    BASS_CLEF_MAX_TUNING, CHANNEL_COUNT, MAX_STRINGS, MAX_VOICES, PERCUSSION_CHANNEL,
};
use nom::error::context;
use nom::multi::count;
use nom::Parser;

pub const GM_CHANNEL_1: &str = "gm channel 1";
pub const GM_CHANNEL_2: &str = "gm channel 2";

/// State shared by the whole measure pass.
#[derive(Debug, Clone)]
struct DecodeContext {
    version: GpVersion,
    /// Running tempo, updated by mix changes
    tempo: Tempo,
    options: DecoderOptions,
    warned_tremolo_bar: bool,
}

/// Everything a beat record carries before it is merged into its measure.
#[derive(Debug, Default)]
struct BeatRecord {
    /// `Some(empty)` when the beat status byte is present
    status: Option<bool>,
    duration: Duration,
    notes: Vec<Note>,
    text: Option<String>,
    chord: Option<Chord>,
    stroke: BeatStroke,
}

impl BeatRecord {
    /// Time units the voice advances by, a beat without notes does not move it.
    fn length(&self) -> f64 {
        if self.notes.is_empty() {
            0.0
        } else {
            self.duration.time_units()
        }
    }

    fn fill(self, beat: &mut Beat, voice_index: usize) {
        if let Some(voice) = beat.voices.get_mut(voice_index) {
            voice.duration = self.duration;
            if let Some(empty) = self.status {
                voice.empty = empty;
            }
            if !self.notes.is_empty() {
                voice.empty = false;
            }
            voice.notes.extend(self.notes);
        }
        if self.text.is_some() {
            beat.text = self.text;
        }
        if self.chord.is_some() {
            beat.effect.chord = self.chord;
        }
        if self.stroke.direction != BeatStrokeDirection::None {
            beat.effect.stroke = self.stroke;
        }
    }
}

pub struct MusicParser {
    song: Song,
    context: DecodeContext,
}

impl MusicParser {
    pub fn new(song: Song, options: DecoderOptions) -> Self {
        let context = DecodeContext {
            version: song.version,
            tempo: song.tempo.clone(),
            options,
            warned_tremolo_bar: false,
        };
        Self { song, context }
    }

    pub fn take_song(&mut self) -> Song {
        std::mem::take(&mut self.song)
    }

    pub fn parse_music_data<'a>(&mut self, i: &'a [u8]) -> GpResult<'a, ()> {
        // skip directions & master reverb
        let i = skip(i, 42)?;

        let (i, (measure_count, track_count)) = context("counts", parse_counts).parse(i)?;

        log::debug!(
            "Parsing music data -> track_count: {track_count} measure_count {measure_count}"
        );

        let song_tempo = self.song.tempo.value;
        let (i, measure_headers) = parse_measure_headers(
            measure_count,
            song_tempo,
            self.song.key_signature,
        )(i)?;
        self.song.measure_headers = measure_headers;

        let (i, tracks) = self.parse_tracks(track_count)(i)?;
        self.song.tracks = tracks;

        let (i, ()) = self.parse_measures(measure_count, track_count)(i)?;

        Ok((i, ()))
    }

    pub fn parse_tracks(
        &mut self,
        tracks_count: usize,
    ) -> impl FnMut(&[u8]) -> GpResult<'_, Vec<Track>> + '_ {
        move |i| {
            log::debug!("Parsing {tracks_count} tracks");
            let mut i = i;
            let mut tracks = Vec::new();
            for number in 1..=tracks_count {
                let (inner, track) = context("track", self.parse_track(number)).parse(i)?;
                i = inner;
                tracks.push(track);
            }
            // tracks done
            i = match self.context.version {
                GpVersion::GP5 => skip(i, 2)?,
                GpVersion::GP5_10 => skip(i, 1)?,
            };

            Ok((i, tracks))
        }
    }

    pub fn parse_track(
        &mut self,
        number: usize,
    ) -> impl FnMut(&[u8]) -> GpResult<'_, Track> + '_ {
        move |i| {
            log::debug!("--------");
            log::debug!("Parsing track {number}");
            let version = self.context.version;
            let mut i = skip(i, 1)?;
            if number == 1 || version == GpVersion::GP5 {
                i = skip(i, 1)?;
            }

            let mut track = Track {
                number: number as i32,
                ..Default::default()
            };

            // track name
            let (inner, name) = parse_byte_size_string(40)(i)?;
            i = inner;
            log::debug!("Track name:{name}");
            track.name = name;

            // string count
            let (inner, string_count) = parse_int(i)?;
            i = inner;
            log::debug!("String count: {string_count}");

            // tunings
            let (inner, tunings) = count(parse_int, MAX_STRINGS).parse(i)?;
            i = inner;
            log::debug!("Tunings: {tunings:?}");
            track.strings = tunings
                .iter()
                .enumerate()
                .filter(|(i, _)| (*i as i32) < string_count)
                .map(|(i, &t)| (i as i32 + 1, t))
                .collect();

            // midi port
            i = skip(i, 4)?;

            // parse track channel info
            let (inner, channel_id) = self.parse_track_channel()(i)?;
            log::debug!("Midi channel id: {channel_id:?}");
            track.channel_id = channel_id;
            i = inner;

            // fret count
            i = skip(i, 4)?;

            // offset
            let (inner, offset) = parse_int(i)?;
            log::debug!("Offset: {offset:?}");
            i = inner;
            track.offset = offset;

            // color
            let (inner, color) = parse_color(i)?;
            log::debug!("Color: {color:?}");
            i = inner;
            track.color = color;

            i = match version {
                GpVersion::GP5 => skip(i, 44)?,
                GpVersion::GP5_10 => skip(i, 49)?,
            };

            if version == GpVersion::GP5_10 {
                let (inner, _) =
                    (parse_int_byte_sized_string, parse_int_byte_sized_string).parse(i)?;
                i = inner;
            }
            Ok((i, track))
        }
    }

    /// Read MIDI channel. MIDI channel in Guitar Pro is represented by two integers.
    /// First is one-based number of channel, second is one-based number of channel used for effects.
    pub fn parse_track_channel(
        &mut self,
    ) -> impl FnMut(&[u8]) -> GpResult<'_, Option<u8>> + '_ {
        log::debug!("Parsing track channel");
        move |i| {
            let (i, (gm_channel_1, gm_channel_2)) = (parse_int, parse_int).parse(i)?;
            let gm_channel_1 = gm_channel_1.saturating_sub(1);
            let gm_channel_2 = gm_channel_2.saturating_sub(1);

            log::debug!("Track channel gm1: {gm_channel_1} gm2: {gm_channel_2}");
            Ok((i, self.associate_channel(gm_channel_1, gm_channel_2)))
        }
    }

    /// Materialize the preset `gm_channel_1` on first reference and return its id.
    fn associate_channel(&mut self, gm_channel_1: i32, gm_channel_2: i32) -> Option<u8> {
        let Some(index) = usize::try_from(gm_channel_1)
            .ok()
            .filter(|index| *index < CHANNEL_COUNT)
        else {
            log::debug!("channel {gm_channel_1} not found");
            return None;
        };
        let next_id = u8::try_from(self.song.channels.len() + 1).ok()?;
        let preset = self.song.midi_channels.get_mut(index)?;
        if let Some(id) = preset.id {
            return Some(id);
        }
        // percussion has no effect channel
        let effect_channel = if index == PERCUSSION_CHANNEL {
            gm_channel_1
        } else {
            gm_channel_2
        };
        preset.id = Some(next_id);
        preset
            .parameters
            .push(ChannelParameter::new(GM_CHANNEL_1, gm_channel_1));
        preset
            .parameters
            .push(ChannelParameter::new(GM_CHANNEL_2, effect_channel));
        self.song.channels.push(preset.clone());
        Some(next_id)
    }

    /// Read measures. Measures are written in the following order:
    /// - measure 1/track 1
    /// - measure 1/track 2
    /// - ...
    /// - measure 1/track m
    /// - measure 2/track 1
    /// - ...
    /// - measure n/track m
    pub fn parse_measures(
        &mut self,
        measure_count: usize,
        track_count: usize,
    ) -> impl FnMut(&[u8]) -> GpResult<'_, ()> + '_ {
        move |i: &[u8]| {
            log::debug!("--------");
            log::debug!("Parsing measures");
            // header starts only depend on the time signatures
            let starts = measure_starts(&self.song.measure_headers);
            for (header, start) in self.song.measure_headers.iter_mut().zip(starts) {
                header.start = start;
            }
            let mut i = i;
            for measure_index in 0..measure_count {
                for track_index in 0..track_count {
                    let (inner, measure) = context("measure", |i| {
                        self.parse_measure(i, measure_index, track_index)
                    })
                    .parse(i)?;
                    i = skip(inner, 1)?;
                    // push measure on track
                    self.song.tracks[track_index].measures.push(measure);
                }
                self.song.measure_headers[measure_index].tempo = self.context.tempo.clone();
            }
            Ok((i, ()))
        }
    }

    fn parse_measure<'a>(
        &mut self,
        i: &'a [u8],
        measure_index: usize,
        track_index: usize,
    ) -> GpResult<'a, Measure> {
        log::debug!("--------");
        log::debug!("Parsing measure {measure_index} for track {track_index}");
        let header = &self.song.measure_headers[measure_index];
        let mut measure = Measure {
            header_index: measure_index,
            track_index,
            start: header.start,
            key_signature: header.key_signature.clone(),
            ..Default::default()
        };
        let mut i = i;
        for voice_index in 0..MAX_VOICES {
            log::debug!("Parsing voice {voice_index}");
            let (inner, beat_count) = parse_int(i)?;
            let Ok(beat_count) = usize::try_from(beat_count) else {
                return Err(GpParseError::invalid(
                    i,
                    format!("negative beat count {beat_count}"),
                ));
            };
            i = inner;
            log::debug!("...with {beat_count} beats");
            // voices restart at the measure start
            let mut offset = 0.0;
            for _ in 0..beat_count {
                let (inner, record) =
                    context("beat", |i| self.parse_beat(i, &measure, track_index)).parse(i)?;
                i = inner;
                let start = (measure.start as f64 + offset).round() as i64;
                offset += record.length();
                record.fill(measure.beat_at(start), voice_index);
            }
        }
        measure.prune_empty_beats();
        measure.clef = self.clef_for(track_index);
        Ok((i, measure))
    }

    /// Staff clef of a track, low tuned strings outside percussion read in bass clef.
    fn clef_for(&self, track_index: usize) -> Clef {
        let Some(track) = self.song.tracks.get(track_index) else {
            return Clef::Treble;
        };
        let percussion = self
            .song
            .track_channel(track)
            .is_some_and(MidiChannel::is_percussion);
        if !percussion
            && track
                .strings
                .iter()
                .any(|(_, tuning)| *tuning <= BASS_CLEF_MAX_TUNING)
        {
            Clef::Bass
        } else {
            Clef::Treble
        }
    }

    fn parse_beat<'a>(
        &mut self,
        i: &'a [u8],
        measure: &Measure,
        track_index: usize,
    ) -> GpResult<'a, BeatRecord> {
        let version = self.context.version;
        let (mut i, flags) = parse_u8(i)?;
        log::debug!("Beat flags: {flags:08b}");
        let flags = BeatFlags::from_bits(flags);
        let mut beat = BeatRecord::default();

        // beat type
        if flags.status {
            let (inner, beat_type) = parse_u8(i)?;
            i = inner;
            beat.status = Some(beat_type & 0x02 == 0);
        }

        let (inner, duration) = parse_duration(flags)(i)?;
        beat.duration = duration;
        i = inner;

        let string_count = self.song.tracks[track_index].strings.len();

        // beat chords
        if flags.chord {
            let (inner, chord) = context("chord", parse_chord(string_count)).parse(i)?;
            i = inner;
            if string_count > 0 {
                beat.chord = Some(chord);
            }
        }

        // beat text
        if flags.text {
            let (inner, text) = parse_int_byte_sized_string(i)?;
            i = inner;
            log::debug!("Beat text: {text}");
            beat.text = Some(text);
        }

        let mut note_effect = NoteEffect::default();
        // beat effect
        if flags.effects {
            let scale = self.context.options.tremolo_bar;
            let (inner, ()) = context(
                "beat effects",
                parse_beat_effects(&mut beat.stroke, &mut note_effect, &scale, version),
            )
            .parse(i)?;
            i = inner;
            if note_effect.tremolo_bar.is_some() && scale.is_approximation() {
                self.notice_approximate_tremolo_bar(measure.header_index, track_index);
            }
        }

        // parse mix change
        if flags.mix_change {
            let (inner, ()) = context("mix change", |i| self.parse_mix_change(i)).parse(i)?;
            i = inner;
        }

        // parse notes
        let (inner, string_flags) = parse_u8(i)?;
        i = inner;
        log::debug!("Parsing notes for beat strings:{string_count}, flags:{string_flags:08b}");
        for string_index in StringMask::from_bits(string_flags).string_indexes() {
            let Some(&guitar_string) = self.song.tracks[track_index].strings.get(string_index)
            else {
                return Err(GpParseError::invalid(
                    i,
                    format!(
                        "note on string {} of a {string_count} string track",
                        string_index + 1
                    ),
                ));
            };
            let mut note = Note::new(note_effect.clone());
            let (inner, ()) = context("note", |i| {
                self.parse_note(i, &mut note, guitar_string, measure, track_index)
            })
            .parse(i)?;
            i = inner;
            beat.notes.push(note);
        }

        i = skip(i, 1)?;
        let (inner, read) = parse_u8(i)?;
        i = inner;
        if (read & 0x08) != 0 {
            i = skip(i, 1)?;
        }
        Ok((i, beat))
    }

    fn notice_approximate_tremolo_bar(&mut self, measure_index: usize, track_index: usize) {
        if !self.context.warned_tremolo_bar {
            log::warn!("Tremolo bar values are normalized with an approximate scale");
            self.context.warned_tremolo_bar = true;
        }
        let notice = DecodeNotice::ApproximateTremoloBar {
            measure_index,
            track_index,
        };
        if !self.song.notices.contains(&notice) {
            self.song.notices.push(notice);
        }
    }

    /// Get note value of tied note
    ///
    /// The measure being decoded is searched first, then the previous measures of the track.
    /// Beats are scanned by start across both voices, so a note of the other voice placed later
    /// in the same measure wins over an earlier one.
    fn get_tied_note_value(
        &self,
        string: i8,
        measure: &Measure,
        track_index: usize,
    ) -> Option<i16> {
        let previous = self
            .song
            .tracks
            .get(track_index)
            .into_iter()
            .flat_map(|track| track.measures.iter().rev());
        std::iter::once(measure)
            .chain(previous)
            .find_map(|m| last_note_on_string(m, string))
    }

    fn parse_mix_change<'a>(&mut self, i: &'a [u8]) -> GpResult<'a, ()> {
        log::debug!("Parsing mix change");
        let version = self.context.version;

        // instrument
        let (i, _) = parse_i8(i)?;
        let i = skip(i, 16)?;

        let (mut i, (volume, pan, chorus, reverb, phaser, tremolo)) =
            (parse_i8, parse_i8, parse_i8, parse_i8, parse_i8, parse_i8).parse(i)?;

        let (inner, tempo_name) = parse_int_byte_sized_string(i)?;
        log::debug!("Tempo name: {tempo_name}");
        i = inner;

        let (inner, tempo_value) = parse_int(i)?;
        i = inner;

        // one transition byte per changed level
        for level in [volume, pan, chorus, reverb, phaser, tremolo] {
            if level >= 0 {
                i = skip(i, 1)?;
            }
        }

        if tempo_value >= 0 {
            // the running tempo lands in the headers once the measure row is done
            self.context.tempo = Tempo {
                value: tempo_value,
                name: Some(tempo_name),
            };
            i = skip(i, 1)?;
            if version == GpVersion::GP5_10 {
                i = skip(i, 1)?;
            }
        }

        // apply to all tracks
        i = skip(i, 1)?;
        i = skip(i, 1)?;
        if version == GpVersion::GP5_10 {
            let (inner, _) = (parse_int_byte_sized_string, parse_int_byte_sized_string).parse(i)?;
            i = inner;
        }

        Ok((i, ()))
    }

    fn parse_note<'a>(
        &self,
        i: &'a [u8],
        note: &mut Note,
        guitar_string: (i32, i32),
        measure: &Measure,
        track_index: usize,
    ) -> GpResult<'a, ()> {
        log::debug!("Parsing note {guitar_string:?}");
        let (mut i, flags) = parse_u8(i)?;
        let flags = NoteFlags::from_bits(flags);
        let string = guitar_string.0 as i8;
        note.string = string;
        note.effect.heavy_accentuated_note = flags.heavy_accentuated;
        note.effect.ghost_note = flags.ghost;
        note.effect.accentuated_note = flags.accentuated;

        // note type
        if flags.kind_and_fret {
            let (inner, note_type) = parse_u8(i)?;
            i = inner;
            note.kind = NoteType::get_note_type(note_type);
        }

        // note velocity
        if flags.velocity {
            let (inner, velocity) = parse_i8(i)?;
            i = inner;
            note.velocity = convert_velocity(i16::from(velocity));
        }

        // note value
        if flags.kind_and_fret {
            let (inner, fret) = parse_i8(i)?;
            i = inner;

            let value = if note.is_tied() {
                self.get_tied_note_value(string, measure, track_index)
                    .unwrap_or(0)
            } else {
                i16::from(fret)
            };
            // value is between 0 and 99
            note.value = if (0..100).contains(&value) { value } else { 0 };
        }

        // fingering
        if flags.fingering {
            i = skip(i, 2)?;
        }

        // duration percent
        if flags.duration_percent {
            i = skip(i, 8)?;
        }

        // swap accidentals
        let (inner, swap) = parse_u8(i)?;
        i = inner;
        note.swap_accidentals = swap & 0x02 == 0x02;

        if flags.effects {
            let (inner, ()) = context("note effects", parse_note_effects(note)).parse(i)?;
            i = inner;
        }

        Ok((i, ()))
    }
}

/// Measure and track counts, both non negative.
fn parse_counts(i: &[u8]) -> GpResult<'_, (usize, usize)> {
    let (rest, (measure_count, track_count)) = (parse_int, parse_int).parse(i)?;
    match (usize::try_from(measure_count), usize::try_from(track_count)) {
        (Ok(measure_count), Ok(track_count)) => Ok((rest, (measure_count, track_count))),
        _ => Err(GpParseError::invalid(
            i,
            format!("negative count: {measure_count} measures, {track_count} tracks"),
        )),
    }
}

/// Value of the first note on `string` in the latest beat holding one.
fn last_note_on_string(measure: &Measure, string: i8) -> Option<i16> {
    measure.beats.iter().rev().find_map(|beat| {
        beat.voices
            .iter()
            .flat_map(|voice| voice.notes.iter())
            .find(|note| note.string == string)
            .map(|note| note.value)
    })
}
