use crate::error::{from_nom_error, GpParseError};
use crate::parser::flags::{BeatEffectFlags, BeatFlags, MeasureHeaderFlags, NoteEffectFlags};
use crate::parser::music_parser::MusicParser;
use crate::parser::primitive_parser::{
    parse_bool, parse_byte_size_string, parse_i8, parse_int, parse_int_byte_sized_string,
    parse_int_sized_string, parse_skipped_int_byte_string, parse_u8, skip, GpResult,
};
use crate::TabError;
use nom::bytes::complete::take;
use nom::combinator::{cond, map};
use nom::error::context;
use nom::multi::count;
use nom::Parser;
use serde::Serialize;
use std::fmt::Display;
use std::path::Path;

// GP5 docs thanks to Tuxguitar and <https://github.com/slundi/guitarpro> for the help

pub const MAX_VOICES: usize = 2;
pub const MAX_STRINGS: usize = 7;

pub const QUARTER_TIME: i64 = 960;
pub const QUARTER: u16 = 4;

pub const DURATION_EIGHTH: u8 = 8;
pub const DURATION_SIXTEENTH: u8 = 16;
pub const DURATION_THIRTY_SECOND: u8 = 32;
pub const DURATION_SIXTY_FOURTH: u8 = 64;

pub const BEND_EFFECT_MAX_POSITION_LENGTH: f32 = 12.0;

pub const SEMITONE_LENGTH: f32 = 1.0;
pub const GP_BEND_SEMITONE: f32 = 25.0;
pub const GP_BEND_POSITION: f32 = 60.0;

pub const CHANNEL_COUNT: usize = 64;
pub const PERCUSSION_CHANNEL: usize = 9;
pub const DEFAULT_PERCUSSION_BANK: u8 = 128;
pub const DEFAULT_BANK: u8 = 0;

/// Tunings at or below this MIDI value put the staff in bass clef.
pub const BASS_CLEF_MAX_TUNING: i32 = 34;

pub const MIN_VELOCITY: i16 = 15;
pub const VELOCITY_INCREMENT: i16 = 16;
pub const DEFAULT_VELOCITY: i16 = MIN_VELOCITY + VELOCITY_INCREMENT * 5; // FORTE

/// Tuplet divisor -> (enters, times)
const TUPLETS: [(i32, (u8, u8)); 9] = [
    (3, (3, 2)),
    (5, (5, 5)),
    (6, (6, 4)),
    (7, (7, 4)),
    (9, (9, 8)),
    (10, (10, 8)),
    (11, (11, 8)),
    (12, (12, 8)),
    (13, (13, 8)),
];

/// Convert Guitar Pro dynamic value to raw MIDI velocity
pub const fn convert_velocity(v: i16) -> i16 {
    MIN_VELOCITY + (VELOCITY_INCREMENT * v) - VELOCITY_INCREMENT
}

/// Negative key signatures are stored folded above the sharps.
pub const fn fold_key_signature(key: i8) -> i8 {
    if key < 0 {
        7i8.saturating_sub(key)
    } else {
        key
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Default, Serialize)]
pub enum GpVersion {
    #[default]
    GP5,
    GP5_10,
}

impl GpVersion {
    /// Binary index every version dependent read branches on.
    pub const fn index(self) -> usize {
        match self {
            GpVersion::GP5 => 0,
            GpVersion::GP5_10 => 1,
        }
    }

    pub const fn major(self) -> u8 {
        5
    }

    pub const fn minor(self) -> u8 {
        match self {
            GpVersion::GP5 => 0,
            GpVersion::GP5_10 => 10,
        }
    }

    /// Bytes of page setup before the header/footer strings.
    const fn page_setup_size(self) -> usize {
        match self {
            GpVersion::GP5 => 30,
            GpVersion::GP5_10 => 49,
        }
    }
}

impl Display for GpVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}.{:02}", self.major(), self.minor())
    }
}

/// Scale used to normalize tremolo bar points.
///
/// The defaults are a known approximation; callers with better values can override them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TremoloBarScale {
    pub max_position_length: f32,
    pub position_divisor: f32,
    /// Value divisor, indexed by `GpVersion::index`.
    ///
    /// Both versions default to 50, so the default scale does not depend on the version.
    pub value_divisors: [f32; 2],
}

impl Default for TremoloBarScale {
    fn default() -> Self {
        TremoloBarScale {
            max_position_length: BEND_EFFECT_MAX_POSITION_LENGTH,
            position_divisor: GP_BEND_POSITION,
            value_divisors: [GP_BEND_SEMITONE * 2.0, GP_BEND_SEMITONE * 2.0],
        }
    }
}

impl TremoloBarScale {
    pub fn is_approximation(&self) -> bool {
        *self == TremoloBarScale::default()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecoderOptions {
    pub tremolo_bar: TremoloBarScale,
}

/// Non fatal remarks collected while decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DecodeNotice {
    /// Tremolo bar points were normalized with the approximate default scale.
    ApproximateTremoloBar { measure_index: usize, track_index: usize },
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Song {
    pub version: GpVersion,
    pub song_info: SongInfo,
    pub lyrics: Lyrics,
    pub page_setup: PageSetup,
    pub tempo: Tempo,
    pub hide_tempo: Option<bool>,
    pub key_signature: i8,
    pub octave: i8,
    /// The 64 channel presets of the file
    pub midi_channels: Vec<MidiChannel>,
    /// Presets referenced by at least one track, in order of first reference
    pub channels: Vec<MidiChannel>,
    pub measure_headers: Vec<MeasureHeader>,
    pub tracks: Vec<Track>,
    pub notices: Vec<DecodeNotice>,
}

impl Song {
    /// Materialized channel used by a track.
    pub fn track_channel(&self, track: &Track) -> Option<&MidiChannel> {
        track
            .channel_id
            .and_then(|id| self.channels.iter().find(|c| c.id == Some(id)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelParameter {
    pub key: String,
    pub value: String,
}

impl ChannelParameter {
    pub fn new(key: &str, value: impl Display) -> Self {
        ChannelParameter {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MidiChannel {
    /// 1-based id assigned on first reference by a track
    pub id: Option<u8>,
    /// Position in the preset table
    pub channel_index: u8,
    pub instrument: i32,
    pub volume: i8,
    pub balance: i8,
    pub chorus: i8,
    pub reverb: i8,
    pub phaser: i8,
    pub tremolo: i8,
    pub bank: u8,
    pub parameters: Vec<ChannelParameter>,
}

impl MidiChannel {
    pub const fn is_percussion(&self) -> bool {
        self.bank == DEFAULT_PERCUSSION_BANK
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct PageSetup {
    pub title: String,
    pub subtitle: String,
    pub artist: String,
    pub album: String,
    pub words: String,
    pub music: String,
    pub word_and_music: String,
    pub copyright: String,
    pub page_number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Lyrics {
    pub track_choice: i32,
    pub from: i32,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct SongInfo {
    pub name: String,
    pub subtitle: String,
    pub artist: String,
    pub album: String,
    pub words: String,
    pub author: String,
    pub copyright: String,
    pub writer: String,
    pub instructions: String,
    pub notices: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Marker {
    pub title: String,
    pub color: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KeySignature {
    pub key: i8,
    pub is_minor: bool,
}

impl KeySignature {
    pub const fn new(key: i8, is_minor: bool) -> Self {
        KeySignature { key, is_minor }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum TripletFeel {
    #[default]
    None,
    Eighth,
    Sixteenth,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tempo {
    pub value: i32,
    pub name: Option<String>,
}

impl Tempo {
    const fn new(value: i32, name: Option<String>) -> Self {
        Tempo { value, name }
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Tempo {
            value: 120,
            name: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MeasureHeader {
    /// 1-based
    pub number: usize,
    pub start: i64,
    pub time_signature: TimeSignature,
    pub tempo: Tempo,
    pub marker: Option<Marker>,
    pub repeat_open: bool,
    pub repeat_alternative: u8,
    pub repeat_close: i8,
    pub triplet_feel: TripletFeel,
    pub key_signature: KeySignature,
    pub double_bar: bool,
}

impl Default for MeasureHeader {
    fn default() -> Self {
        MeasureHeader {
            number: 1,
            start: 0,
            time_signature: TimeSignature::default(),
            tempo: Tempo::default(),
            marker: None,
            repeat_open: false,
            repeat_alternative: 0,
            repeat_close: 0,
            triplet_feel: TripletFeel::None,
            key_signature: KeySignature::new(0, false),
            double_bar: false,
        }
    }
}

impl MeasureHeader {
    /// Length of the measure in time units.
    pub fn length(&self) -> i64 {
        let numerator = f64::from(self.time_signature.numerator);
        (numerator * self.time_signature.denominator.time_units()).round() as i64
    }
}

/// Cumulative start of each header, the first one starting at 0.
pub fn measure_starts(headers: &[MeasureHeader]) -> Vec<i64> {
    headers
        .iter()
        .scan(0, |start, header| {
            let current = *start;
            *start += header.length();
            Some(current)
        })
        .collect()
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize)]
pub struct TimeSignature {
    pub numerator: i8,
    pub denominator: Duration,
}

impl Default for TimeSignature {
    fn default() -> Self {
        TimeSignature {
            numerator: 4,
            denominator: Duration::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Duration {
    pub value: u16,
    pub dotted: bool,
    pub double_dotted: bool,
    pub tuplet_enters: u8,
    pub tuplet_times: u8,
}

impl Default for Duration {
    fn default() -> Self {
        Duration {
            value: QUARTER,
            dotted: false,
            double_dotted: false,
            tuplet_enters: 1,
            tuplet_times: 1,
        }
    }
}

impl Duration {
    /// Duration value from the exponent byte of a beat: `2^(exponent + 4) / 4`
    ///
    /// * *-2*: whole note
    /// * *-1*: half note
    /// * *0*: quarter note
    /// * *1*: eighth note
    /// * *2*: sixteenth note
    /// * *3*: thirty-second note
    pub fn value_from_exponent(exponent: i8) -> Option<u16> {
        let shift = i16::from(exponent) + 4;
        (2..=10).contains(&shift).then(|| (1u16 << shift) / 4)
    }

    /// (enters, times) for a tuplet divisor, (1, 1) when unknown.
    pub fn tuplet_for_divisor(divisor: i32) -> (u8, u8) {
        TUPLETS
            .iter()
            .find(|(d, _)| *d == divisor)
            .map_or((1, 1), |(_, tuplet)| *tuplet)
    }

    /// Time units covered by the duration, a whole note being `4 * QUARTER_TIME`.
    pub fn time_units(&self) -> f64 {
        if self.value == 0 || self.tuplet_enters == 0 {
            return 0.0;
        }
        let mut time = (QUARTER_TIME * 4) as f64 / f64::from(self.value);
        if self.dotted {
            time += time / 2.0;
        } else if self.double_dotted {
            time += (time / 4.0) * 3.0;
        }
        time * f64::from(self.tuplet_times) / f64::from(self.tuplet_enters)
    }

    pub fn time(&self) -> i64 {
        self.time_units().round() as i64
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BendPoint {
    pub position: u8,
    pub value: i8,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct BendEffect {
    pub points: Vec<BendPoint>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct TremoloBarEffect {
    pub points: Vec<BendPoint>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraceEffect {
    pub duration: u8,
    pub fret: u8,
    pub is_dead: bool,
    pub is_on_beat: bool,
    pub transition: GraceEffectTransition,
    pub velocity: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GraceEffectTransition {
    /// No transition
    None = 0,
    /// Slide from the grace note to the real one.
    Slide,
    /// Perform a bend from the grace note to the real one.
    Bend,
    /// Perform a hammer on.
    Hammer,
}

impl GraceEffectTransition {
    pub fn get_grace_effect_transition(value: i8) -> GraceEffectTransition {
        match value {
            0 => GraceEffectTransition::None,
            1 => GraceEffectTransition::Slide,
            2 => GraceEffectTransition::Bend,
            3 => GraceEffectTransition::Hammer,
            x => {
                log::debug!("Unknown grace transition {x}");
                GraceEffectTransition::None
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HarmonicType {
    Natural,
    Artificial,
    Tapped,
    Pinch,
    Semi,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HarmonicEffect {
    pub kind: HarmonicType,
    // tapped harmonic
    pub right_hand_fret: Option<i8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SlideType {
    IntoFromAbove,
    IntoFromBelow,
    ShiftSlideTo,
    LegatoSlideTo,
    OutDownwards,
    OutUpWards,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct TrillEffect {
    pub fret: i8,
    pub duration: Duration,
}

impl TrillEffect {
    const fn from_trill_period(period: i8) -> Option<u16> {
        match period {
            1 => Some(DURATION_SIXTEENTH as u16),
            2 => Some(DURATION_THIRTY_SECOND as u16),
            3 => Some(DURATION_SIXTY_FOURTH as u16),
            _ => None,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct TremoloPickingEffect {
    pub duration: Duration,
}

impl TremoloPickingEffect {
    const fn from_tremolo_value(value: u8) -> Option<u16> {
        match value {
            1 => Some(DURATION_EIGHTH as u16),
            2 => Some(DURATION_SIXTEENTH as u16),
            3 => Some(DURATION_THIRTY_SECOND as u16),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NoteType {
    Rest,
    Normal,
    Tie,
    Dead,
    Unknown(u8),
}

impl NoteType {
    pub const fn get_note_type(value: u8) -> NoteType {
        match value {
            0 => NoteType::Rest,
            1 => NoteType::Normal,
            2 => NoteType::Tie,
            3 => NoteType::Dead,
            _ => NoteType::Unknown(value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SlapEffect {
    #[default]
    None,
    Tapping,
    Slapping,
    Popping,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct NoteEffect {
    pub accentuated_note: bool,
    pub bend: Option<BendEffect>,
    pub ghost_note: bool,
    pub grace: Option<GraceEffect>,
    pub hammer: bool,
    pub harmonic: Option<HarmonicEffect>,
    pub heavy_accentuated_note: bool,
    pub let_ring: bool,
    pub palm_mute: bool,
    pub slide: bool,
    pub slide_type: Option<SlideType>,
    pub staccato: bool,
    pub tremolo_picking: Option<TremoloPickingEffect>,
    pub trill: Option<TrillEffect>,
    pub fade_in: bool,
    pub vibrato: bool,
    pub slap: SlapEffect,
    pub tremolo_bar: Option<TremoloBarEffect>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct Chord {
    pub name: String,
    pub first_fret: i32,
    /// Fret per string of the owning track, -1 when not played
    pub strings: Vec<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum BeatStrokeDirection {
    #[default]
    None,
    Up,
    Down,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct BeatStroke {
    pub direction: BeatStrokeDirection,
    pub value: u16,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct BeatEffects {
    pub stroke: BeatStroke,
    pub chord: Option<Chord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Note {
    pub value: i16,
    pub velocity: i16,
    pub string: i8,
    pub effect: NoteEffect,
    pub swap_accidentals: bool,
    pub kind: NoteType,
}

impl Note {
    pub const fn new(note_effect: NoteEffect) -> Self {
        Note {
            value: 0,
            velocity: DEFAULT_VELOCITY,
            string: 1,
            effect: note_effect,
            swap_accidentals: false,
            kind: NoteType::Normal,
        }
    }

    pub fn is_tied(&self) -> bool {
        self.kind == NoteType::Tie
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Voice {
    pub notes: Vec<Note>,
    pub duration: Duration,
    /// Nothing was written in this voice, as opposed to a rest
    pub empty: bool,
}

impl Default for Voice {
    fn default() -> Self {
        Voice {
            notes: vec![],
            duration: Duration::default(),
            empty: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Beat {
    pub start: i64,
    pub voices: Vec<Voice>,
    pub text: Option<String>,
    pub effect: BeatEffects,
}

impl Beat {
    pub fn new(start: i64) -> Self {
        Beat {
            start,
            voices: vec![Voice::default(); MAX_VOICES],
            text: None,
            effect: BeatEffects::default(),
        }
    }

    pub fn has_notes(&self) -> bool {
        self.voices.iter().any(|v| !v.notes.is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Clef {
    #[default]
    Treble,
    Bass,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Measure {
    pub key_signature: KeySignature,
    pub clef: Clef,
    pub start: i64,
    pub track_index: usize,
    pub header_index: usize,
    /// Ordered by start
    pub beats: Vec<Beat>,
}

impl Measure {
    /// Beat starting at `start`, created in order if missing.
    pub fn beat_at(&mut self, start: i64) -> &mut Beat {
        let index = match self.beats.binary_search_by_key(&start, |b| b.start) {
            Ok(index) => index,
            Err(index) => {
                self.beats.insert(index, Beat::new(start));
                index
            }
        };
        &mut self.beats[index]
    }

    /// Drop the beats without any note in any voice.
    pub fn prune_empty_beats(&mut self) {
        self.beats.retain(Beat::has_notes);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Track {
    pub number: i32,
    pub offset: i32,
    pub channel_id: Option<u8>,
    pub name: String,
    /// (string number, tuning)
    pub strings: Vec<(i32, i32)>,
    pub color: i32,
    pub measures: Vec<Measure>,
}

impl Default for Track {
    fn default() -> Self {
        Track {
            number: 1,
            offset: 0,
            channel_id: None,
            name: String::new(),
            strings: vec![],
            color: 0,
            measures: vec![],
        }
    }
}

pub fn parse_chord(string_count: usize) -> impl FnMut(&[u8]) -> GpResult<'_, Chord> {
    move |i| {
        log::debug!("Parsing chord for {string_count} strings");
        let mut chord = Chord {
            strings: vec![-1; string_count],
            ..Default::default()
        };
        // chord header, always the new format in GP5
        let (i, header) = parse_u8(i)?;
        log::debug!("Chord header {header:08b}");
        let mut i = skip(i, 16)?;
        let (inner, chord_name) = parse_byte_size_string(21)(i)?;
        i = skip(inner, 4)?;
        chord.name = chord_name;
        let (inner, first_fret) = parse_int(i)?;
        i = inner;
        chord.first_fret = first_fret;
        for c in 0..MAX_STRINGS {
            let (inner, fret) = parse_int(i)?;
            if let Some(string) = chord.strings.get_mut(c) {
                *string = fret;
            }
            i = inner;
        }
        i = skip(i, 32)?;
        Ok((i, chord))
    }
}

pub fn parse_note_effects(note: &mut Note) -> impl FnMut(&[u8]) -> GpResult<'_, ()> + '_ {
    move |i| {
        log::debug!("Parsing note effects");
        let mut i = i;
        let (inner, (flags1, flags2)) = (parse_u8, parse_u8).parse(i)?;
        i = inner;
        let flags = NoteEffectFlags::from_bits(flags1, flags2);
        note.effect.hammer = flags.hammer;
        note.effect.let_ring = flags.let_ring;

        note.effect.staccato = flags.staccato;
        note.effect.palm_mute = flags.palm_mute;
        note.effect.vibrato = flags.vibrato || note.effect.vibrato;

        if flags.bend {
            let (inner, bend_effect) = context("bend", parse_bend_effect).parse(i)?;
            i = inner;
            note.effect.bend = bend_effect;
        }

        if flags.grace {
            let (inner, grace_effect) = context("grace", parse_grace_effect).parse(i)?;
            i = inner;
            note.effect.grace = Some(grace_effect);
        }

        if flags.tremolo_picking {
            let (inner, tremolo_picking) = parse_tremolo_picking(i)?;
            i = inner;
            note.effect.tremolo_picking = tremolo_picking;
        }

        if flags.slide {
            let (inner, slide_type) = parse_slide_type(i)?;
            i = inner;
            note.effect.slide = true;
            note.effect.slide_type = slide_type;
        }

        if flags.harmonic {
            let (inner, harmonic_effect) = context("harmonic", parse_harmonic_effect).parse(i)?;
            i = inner;
            note.effect.harmonic = harmonic_effect;
        }

        if flags.trill {
            let (inner, trill_effect) = parse_trill_effect(i)?;
            i = inner;
            note.effect.trill = trill_effect;
        }

        Ok((i, ()))
    }
}

pub fn parse_trill_effect(i: &[u8]) -> GpResult<'_, Option<TrillEffect>> {
    log::debug!("Parsing trill effect");
    map((parse_i8, parse_i8), |(fret, period)| {
        TrillEffect::from_trill_period(period).map(|value| TrillEffect {
            fret,
            duration: Duration {
                value,
                ..Default::default()
            },
        })
    })
    .parse(i)
}

pub fn parse_harmonic_effect(i: &[u8]) -> GpResult<'_, Option<HarmonicEffect>> {
    let (mut i, harmonic_type) = parse_i8(i)?;
    log::debug!("Parsing harmonic effect {harmonic_type}");
    let harmonic = |kind| HarmonicEffect {
        kind,
        right_hand_fret: None,
    };
    let he = match harmonic_type {
        1 => Some(harmonic(HarmonicType::Natural)),
        2 => {
            // semitone, accidental, octave
            i = skip(i, 3)?;
            Some(harmonic(HarmonicType::Artificial))
        }
        3 => {
            let (inner, fret) = parse_i8(i)?;
            i = inner;
            Some(HarmonicEffect {
                kind: HarmonicType::Tapped,
                right_hand_fret: Some(fret),
            })
        }
        4 => Some(harmonic(HarmonicType::Pinch)),
        5 => Some(harmonic(HarmonicType::Semi)),
        x => {
            log::debug!("Unknown harmonic type {x}");
            None
        }
    };
    Ok((i, he))
}

pub fn parse_slide_type(i: &[u8]) -> GpResult<'_, Option<SlideType>> {
    log::debug!("Parsing slide type");
    map(parse_u8, |t| {
        if (t & 0x01) == 0x01 {
            Some(SlideType::ShiftSlideTo)
        } else if (t & 0x02) == 0x02 {
            Some(SlideType::LegatoSlideTo)
        } else if (t & 0x04) == 0x04 {
            Some(SlideType::OutDownwards)
        } else if (t & 0x08) == 0x08 {
            Some(SlideType::OutUpWards)
        } else if (t & 0x10) == 0x10 {
            Some(SlideType::IntoFromBelow)
        } else if (t & 0x20) == 0x20 {
            Some(SlideType::IntoFromAbove)
        } else {
            None
        }
    })
    .parse(i)
}

pub fn parse_tremolo_picking(i: &[u8]) -> GpResult<'_, Option<TremoloPickingEffect>> {
    log::debug!("Parsing tremolo picking");
    map(parse_u8, |tp| {
        TremoloPickingEffect::from_tremolo_value(tp).map(|value| TremoloPickingEffect {
            duration: Duration {
                value,
                ..Default::default()
            },
        })
    })
    .parse(i)
}

pub fn parse_grace_effect(i: &[u8]) -> GpResult<'_, GraceEffect> {
    log::debug!("Parsing grace effect");
    map(
        (parse_u8, parse_u8, parse_i8, parse_u8, parse_u8),
        |(fret, dynamic, transition, duration, flags)| GraceEffect {
            duration,
            fret,
            is_dead: (flags & 0x01) == 0x01,
            is_on_beat: (flags & 0x02) == 0x02,
            transition: GraceEffectTransition::get_grace_effect_transition(transition),
            velocity: convert_velocity(i16::from(dynamic)),
        },
    )
    .parse(i)
}

pub fn parse_beat_effects<'a>(
    stroke: &'a mut BeatStroke,
    note_effect: &'a mut NoteEffect,
    scale: &'a TremoloBarScale,
    version: GpVersion,
) -> impl FnMut(&[u8]) -> GpResult<'_, ()> + 'a {
    move |i| {
        log::debug!("Parsing beat effects");
        let mut i = i;
        let (inner, (flags1, flags2)) = (parse_u8, parse_u8).parse(i)?;
        i = inner;
        let flags = BeatEffectFlags::from_bits(flags1, flags2);

        note_effect.fade_in = flags.fade_in;
        note_effect.vibrato = flags.vibrato;

        if flags.slap {
            let (inner, effect) = parse_u8(i)?;
            i = inner;
            note_effect.slap = match effect {
                1 => SlapEffect::Tapping,
                2 => SlapEffect::Slapping,
                3 => SlapEffect::Popping,
                _ => SlapEffect::None,
            };
        }

        if flags.tremolo_bar {
            let (inner, effect) =
                context("tremolo bar", parse_tremolo_bar(scale, version)).parse(i)?;
            i = inner;
            note_effect.tremolo_bar = effect;
        }

        if flags.stroke {
            let (inner, (stroke_up, stroke_down)) = (parse_i8, parse_i8).parse(i)?;
            i = inner;
            if stroke_up > 0 {
                stroke.value = stroke_up as u16;
                stroke.direction = BeatStrokeDirection::Up;
            } else if stroke_down > 0 {
                stroke.value = stroke_down as u16;
                stroke.direction = BeatStrokeDirection::Down;
            }
        }

        if flags.pick_stroke {
            i = skip(i, 1)?;
        }

        Ok((i, ()))
    }
}

/// Points shared by bends and tremolo bars: 5 reserved bytes, a count, then (position, value, vibrato).
fn parse_points(i: &[u8]) -> GpResult<'_, Vec<(i32, i32)>> {
    let i = skip(i, 5)?;
    let (mut i, num_points) = parse_int(i)?;
    let Ok(num_points) = usize::try_from(num_points) else {
        return Err(GpParseError::invalid(i, format!("negative point count {num_points}")));
    };
    let mut points = Vec::new();
    for _ in 0..num_points {
        let (inner, (position, value, _vibrato)) = (parse_int, parse_int, parse_u8).parse(i)?;
        i = inner;
        points.push((position, value));
    }
    Ok((i, points))
}

/// A bend without points is no bend.
pub fn parse_bend_effect(i: &[u8]) -> GpResult<'_, Option<BendEffect>> {
    log::debug!("Parsing bend effect");
    let (i, raw_points) = parse_points(i)?;
    let points: Vec<BendPoint> = raw_points
        .into_iter()
        .map(|(position, value)| {
            let point_position =
                position as f32 * BEND_EFFECT_MAX_POSITION_LENGTH / GP_BEND_POSITION;
            let point_value = value as f32 * SEMITONE_LENGTH / GP_BEND_SEMITONE;
            BendPoint {
                position: point_position.round() as u8,
                value: point_value.round() as i8,
            }
        })
        .collect();
    let bend = (!points.is_empty()).then_some(BendEffect { points });
    Ok((i, bend))
}

pub fn parse_tremolo_bar(
    scale: &TremoloBarScale,
    version: GpVersion,
) -> impl FnMut(&[u8]) -> GpResult<'_, Option<TremoloBarEffect>> + '_ {
    move |i| {
        log::debug!("Parsing tremolo bar");
        let (i, raw_points) = parse_points(i)?;
        let value_divisor = scale.value_divisors[version.index()];
        let points: Vec<BendPoint> = raw_points
            .into_iter()
            .map(|(position, value)| {
                let point_position =
                    position as f32 * scale.max_position_length / scale.position_divisor;
                let point_value = value as f32 / value_divisor;
                BendPoint {
                    position: point_position.round() as u8,
                    value: point_value.round() as i8,
                }
            })
            .collect();
        let tremolo_bar = (!points.is_empty()).then_some(TremoloBarEffect { points });
        Ok((i, tremolo_bar))
    }
}

/// Read beat duration.
/// Duration is composed of byte signifying duration and an integer that maps to `Tuplet`.
///
/// If the tuplet flag is set, the tuplet divisor is read
pub fn parse_duration(flags: BeatFlags) -> impl FnMut(&[u8]) -> GpResult<'_, Duration> {
    move |i: &[u8]| {
        log::debug!("Parsing duration");
        let (mut i, exponent) = parse_i8(i)?;
        let Some(value) = Duration::value_from_exponent(exponent) else {
            return Err(GpParseError::invalid(
                i,
                format!("duration exponent {exponent} out of range"),
            ));
        };
        log::debug!("Duration value: {value}");
        let mut d = Duration {
            value,
            dotted: flags.dotted,
            ..Default::default()
        };

        if flags.tuplet {
            let (inner, i_tuplet) = parse_int(i)?;
            i = inner;
            let (enters, times) = Duration::tuplet_for_divisor(i_tuplet);
            d.tuplet_enters = enters;
            d.tuplet_times = times;
        }

        Ok((i, d))
    }
}

pub fn parse_color(i: &[u8]) -> GpResult<'_, i32> {
    log::debug!("Parsing RGB color");
    map(
        (parse_u8, parse_u8, parse_u8, parse_u8),
        |(r, g, b, _ignore)| i32::from(r) << 16 | i32::from(g) << 8 | i32::from(b),
    )
    .parse(i)
}

pub fn parse_marker(i: &[u8]) -> GpResult<'_, Marker> {
    log::debug!("Parsing marker");
    map((parse_int_byte_sized_string, parse_color), |(title, color)| {
        Marker { title, color }
    })
    .parse(i)
}

pub fn parse_triplet_feel(i: &[u8]) -> GpResult<'_, TripletFeel> {
    log::debug!("Parsing triplet feel");
    map(parse_i8, |triplet_feel| match triplet_feel {
        0 => TripletFeel::None,
        1 => TripletFeel::Eighth,
        2 => TripletFeel::Sixteenth,
        x => {
            log::debug!("Unknown triplet feel: {x}");
            TripletFeel::None
        }
    })
    .parse(i)
}

/// Parse measure header.
/// the time and key signatures are propagated to the next measure
pub fn parse_measure_header(
    number: usize,
    previous_time_signature: TimeSignature,
    previous_key_signature: KeySignature,
    song_tempo: i32,
) -> impl FnMut(&[u8]) -> GpResult<'_, MeasureHeader> {
    move |i: &[u8]| {
        log::debug!("Parsing measure header {number}");
        let (mut i, flags) = parse_u8(i)?;
        log::debug!("Flags: {flags:08b}");
        let flags = MeasureHeaderFlags::from_bits(flags);
        let mut mh = MeasureHeader {
            number,
            repeat_open: flags.repeat_open,
            double_bar: flags.double_bar,
            // propagate signatures
            time_signature: previous_time_signature.clone(),
            key_signature: previous_key_signature.clone(),
            ..Default::default()
        };
        mh.tempo.value = song_tempo; // value updated later when parsing beats

        // Numerator of the (key) signature
        if flags.numerator {
            log::debug!("Parsing numerator");
            let (inner, numerator) = parse_i8(i)?;
            if numerator <= 0 {
                return Err(GpParseError::invalid(i, format!("numerator {numerator}")));
            }
            i = inner;
            mh.time_signature.numerator = numerator;
        }

        // Denominator of the (key) signature
        if flags.denominator {
            log::debug!("Parsing denominator");
            let (inner, denominator_value) = parse_i8(i)?;
            if denominator_value <= 0 {
                return Err(GpParseError::invalid(
                    i,
                    format!("denominator {denominator_value}"),
                ));
            }
            i = inner;
            mh.time_signature.denominator = Duration {
                value: denominator_value as u16,
                ..Default::default()
            };
        }

        // End of repeat
        if flags.repeat_close {
            log::debug!("Parsing repeat close");
            let (inner, repeat_close) = parse_i8(i)?;
            i = inner;
            mh.repeat_close = repeat_close;
        }

        // Presence of a marker
        if flags.marker {
            let (inner, marker) = parse_marker(i)?;
            i = inner;
            mh.marker = Some(marker);
        }

        // Number of alternate ending
        if flags.repeat_alternative {
            log::debug!("Parsing repeat alternative");
            let (inner, alternative) = parse_u8(i)?;
            i = inner;
            mh.repeat_alternative = alternative;
        }

        // Tonality of the measure
        if flags.key_signature {
            log::debug!("Parsing key signature");
            let (inner, (key, is_minor)) = (parse_i8, parse_i8).parse(i)?;
            i = inner;
            mh.key_signature = KeySignature::new(fold_key_signature(key), is_minor != 0);
        }

        if flags.time_signature_changed() {
            log::debug!("Skip 4");
            i = skip(i, 4)?;
        }

        if !flags.repeat_alternative {
            log::debug!("Skip one");
            i = skip(i, 1)?;
        }

        let (inner, triplet_feel) = parse_triplet_feel(i)?;
        i = inner;
        mh.triplet_feel = triplet_feel;
        log::debug!("{mh:?}");

        Ok((i, mh))
    }
}

pub fn parse_measure_headers(
    measure_count: usize,
    song_tempo: i32,
    song_key_signature: i8,
) -> impl FnMut(&[u8]) -> GpResult<'_, Vec<MeasureHeader>> {
    move |i: &[u8]| {
        log::debug!("Parsing {measure_count} measure headers");
        let mut i = i;
        let mut previous_time_signature = TimeSignature::default();
        let mut previous_key_signature = KeySignature::new(song_key_signature, false);
        let mut headers = Vec::new();
        for index in 0..measure_count {
            // one byte in between each header
            if index > 0 {
                i = skip(i, 1)?;
            }
            let (rest, header) = context(
                "measure header",
                parse_measure_header(
                    index + 1,
                    previous_time_signature,
                    previous_key_signature,
                    song_tempo,
                ),
            )
            .parse(i)?;
            i = rest;
            // propagate signatures
            previous_time_signature = header.time_signature.clone();
            previous_key_signature = header.key_signature.clone();
            headers.push(header);
        }
        Ok((i, headers))
    }
}

pub fn parse_midi_channels(i: &[u8]) -> GpResult<'_, Vec<MidiChannel>> {
    log::debug!("Parsing midi channels");
    let mut channels = Vec::with_capacity(CHANNEL_COUNT);
    let mut i = i;
    for channel_index in 0..CHANNEL_COUNT {
        let (inner, channel) = parse_midi_channel(channel_index as u8)(i)?;
        i = inner;
        channels.push(channel);
    }
    Ok((i, channels))
}

pub fn parse_midi_channel(channel_index: u8) -> impl FnMut(&[u8]) -> GpResult<'_, MidiChannel> {
    move |i: &[u8]| {
        map(
            (
                parse_int,
                parse_i8,
                parse_i8,
                parse_i8,
                parse_i8,
                parse_i8,
                parse_i8,
                parse_u8,
                parse_u8,
            ),
            |(instrument, volume, balance, chorus, reverb, phaser, tremolo, _blank, _blank2)| {
                let bank = if usize::from(channel_index) == PERCUSSION_CHANNEL {
                    DEFAULT_PERCUSSION_BANK
                } else {
                    DEFAULT_BANK
                };
                MidiChannel {
                    id: None, // assigned at the track level
                    channel_index,
                    instrument: instrument.max(0),
                    volume,
                    balance,
                    chorus,
                    reverb,
                    phaser,
                    tremolo,
                    bank,
                    parameters: vec![],
                }
            },
        )
        .parse(i)
    }
}

/// Parse page setup, the tempo name closes the block.
pub fn parse_page_setup(
    version: GpVersion,
) -> impl FnMut(&[u8]) -> GpResult<'_, (PageSetup, String)> {
    move |i: &[u8]| {
        log::debug!("Parsing page setup");
        // page size, margins, proportion, header and footer flags
        let i = skip(i, version.page_setup_size())?;
        map(
            (
                parse_skipped_int_byte_string,
                parse_skipped_int_byte_string,
                parse_skipped_int_byte_string,
                parse_skipped_int_byte_string,
                parse_skipped_int_byte_string,
                parse_skipped_int_byte_string,
                parse_skipped_int_byte_string,
                parse_skipped_int_byte_string,
                parse_skipped_int_byte_string,
                parse_skipped_int_byte_string,
                parse_skipped_int_byte_string,
            ),
            |(
                title,
                subtitle,
                artist,
                album,
                words,
                music,
                word_and_music,
                copyright_1,
                copyright_2,
                page_number,
                tempo_name,
            )| {
                let page_setup = PageSetup {
                    title,
                    subtitle,
                    artist,
                    album,
                    words,
                    music,
                    word_and_music,
                    copyright: format!("{copyright_1}\n{copyright_2}"),
                    page_number,
                };
                (page_setup, tempo_name)
            },
        )
        .parse(i)
    }
}

/// Lyrics track, then the first line is kept and the four others are skipped.
pub fn parse_lyrics(i: &[u8]) -> GpResult<'_, Lyrics> {
    log::debug!("Parsing lyrics");
    map(
        (
            parse_int,
            parse_int,
            parse_int_sized_string,
            count((parse_int, parse_int_sized_string), 4),
        ),
        |(track_choice, from, text, _reserved)| Lyrics {
            track_choice,
            from,
            text,
        },
    )
    .parse(i)
}

/// Parse the version string from the file header.
///
/// 30 character string (not counting the byte announcing the real length of the string)
pub fn parse_gp_version(i: &[u8]) -> GpResult<'_, GpVersion> {
    log::debug!("Parsing GP version");
    let (rest, version_string) = parse_byte_size_string(30)(i)?;
    match version_string.as_str() {
        "FICHIER GUITAR PRO v5.00" => Ok((rest, GpVersion::GP5)),
        "FICHIER GUITAR PRO v5.10" => Ok((rest, GpVersion::GP5_10)),
        _ => {
            log::error!("Unsupported GP version: {version_string}");
            Err(GpParseError::unsupported_version(i, version_string))
        }
    }
}

fn parse_notices(i: &[u8]) -> GpResult<'_, Vec<String>> {
    let (i, notice_count) = parse_int(i)?;
    log::debug!("Notice count: {notice_count}");
    let Ok(notice_count) = usize::try_from(notice_count) else {
        return Err(GpParseError::invalid(i, format!("negative notice count {notice_count}")));
    };
    let mut i = i;
    let mut notices = Vec::new();
    for _ in 0..notice_count {
        let (inner, notice) = parse_int_byte_sized_string(i)?;
        i = inner;
        notices.push(notice);
    }
    Ok((i, notices))
}

/// Parse information about the piece of music.
fn parse_info(i: &[u8]) -> GpResult<'_, SongInfo> {
    log::debug!("Parsing song info");
    map(
        (
            parse_int_byte_sized_string,
            parse_int_byte_sized_string,
            parse_int_byte_sized_string,
            parse_int_byte_sized_string,
            parse_int_byte_sized_string,
            parse_int_byte_sized_string,
            parse_int_byte_sized_string,
            parse_int_byte_sized_string,
            parse_int_byte_sized_string,
            parse_notices,
        ),
        |(
            name,
            subtitle,
            artist,
            album,
            words,
            author,
            copyright,
            writer,
            instructions,
            notices,
        )| SongInfo {
            name,
            subtitle,
            artist,
            album,
            words,
            author,
            copyright,
            writer,
            instructions,
            notices,
        },
    )
    .parse(i)
}

/// Everything before the measure count: metadata and the channel table.
fn parse_song_header(version: GpVersion) -> impl FnMut(&[u8]) -> GpResult<'_, Song> {
    move |i: &[u8]| {
        map(
            (
                context("song info", parse_info),
                context("lyrics", parse_lyrics),
                context("page setup", parse_page_setup(version)),
                context("tempo", parse_int),
                cond(version >= GpVersion::GP5_10, parse_bool), // Tempo hide
                context("key signature", parse_i8),
                take(3usize),
                parse_i8, // Octave
                context("midi channels", parse_midi_channels),
            ),
            move |(
                song_info,
                lyrics,
                (page_setup, tempo_name),
                tempo,
                hide_tempo,
                key_signature,
                _reserved,
                octave,
                midi_channels,
            )| Song {
                version,
                song_info,
                lyrics,
                page_setup,
                tempo: Tempo::new(tempo, Some(tempo_name)),
                hide_tempo,
                key_signature: fold_key_signature(key_signature),
                octave,
                midi_channels,
                ..Default::default()
            },
        )
        .parse(i)
    }
}

/// Decode a Guitar Pro 5 buffer with the default options.
pub fn parse_gp_data(file_data: &[u8]) -> Result<Song, TabError> {
    parse_gp_data_with(file_data, &DecoderOptions::default())
}

pub fn parse_gp_data_with(file_data: &[u8], options: &DecoderOptions) -> Result<Song, TabError> {
    let buffer_len = file_data.len();
    let (rest, version) = parse_gp_version(file_data)
        .map_err(|err| from_nom_error(err, buffer_len, None))?;
    log::debug!("GP version {version}");

    let (rest, base_song) = parse_song_header(version)(rest).map_err(|err| {
        log::error!("Failed to parse GP header data");
        from_nom_error(err, buffer_len, Some(version))
    })?;

    // make parser and parse music data
    let mut parser = MusicParser::new(base_song, options.clone());
    let (_rest, ()) = parser.parse_music_data(rest).map_err(|err| {
        log::error!("Failed to parse music data: {err:?}");
        from_nom_error(err, buffer_len, Some(version))
    })?;
    Ok(parser.take_song())
}

/// Read the whole file then decode it.
pub fn parse_gp_file(file_path: impl AsRef<Path>) -> Result<Song, TabError> {
    let file_data = std::fs::read(file_path.as_ref())?;
    log::debug!("Read {} bytes from {:?}", file_data.len(), file_path.as_ref());
    parse_gp_data(&file_data)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gp_ordering() {
        assert!(GpVersion::GP5 < GpVersion::GP5_10);
        assert_eq!(GpVersion::GP5.index(), 0);
        assert_eq!(GpVersion::GP5_10.index(), 1);
        assert_eq!(GpVersion::GP5_10.to_string(), "v5.10");
    }

    #[test]
    fn duration_time_units() {
        let quarter = Duration::default();
        assert_eq!(quarter.time(), 960);

        let eighth = Duration {
            value: 8,
            ..Default::default()
        };
        assert_eq!(eighth.time(), 480);

        let dotted_quarter = Duration {
            dotted: true,
            ..Default::default()
        };
        assert_eq!(dotted_quarter.time(), 1440);

        let double_dotted_half = Duration {
            value: 2,
            double_dotted: true,
            ..Default::default()
        };
        assert_eq!(double_dotted_half.time(), 1920 + 1440);

        let triplet_eighth = Duration {
            value: 8,
            tuplet_enters: 3,
            tuplet_times: 2,
            ..Default::default()
        };
        assert_eq!(triplet_eighth.time(), 320);
    }

    #[test]
    fn zero_duration_has_no_length() {
        let broken = Duration {
            value: 0,
            ..Default::default()
        };
        assert_eq!(broken.time(), 0);
    }

    #[test]
    fn duration_exponent() {
        assert_eq!(Duration::value_from_exponent(-2), Some(1));
        assert_eq!(Duration::value_from_exponent(0), Some(4));
        assert_eq!(Duration::value_from_exponent(3), Some(32));
        assert_eq!(Duration::value_from_exponent(-3), None);
        assert_eq!(Duration::value_from_exponent(100), None);
    }

    #[test]
    fn tuplet_table() {
        assert_eq!(Duration::tuplet_for_divisor(3), (3, 2));
        assert_eq!(Duration::tuplet_for_divisor(5), (5, 5));
        assert_eq!(Duration::tuplet_for_divisor(7), (7, 4));
        assert_eq!(Duration::tuplet_for_divisor(13), (13, 8));
        assert_eq!(Duration::tuplet_for_divisor(4), (1, 1));
        assert_eq!(Duration::tuplet_for_divisor(-1), (1, 1));
    }

    #[test]
    fn measure_length_and_starts() {
        let four_four = MeasureHeader::default();
        assert_eq!(four_four.length(), 3840);

        let mut three_eight = MeasureHeader::default();
        three_eight.time_signature.numerator = 3;
        three_eight.time_signature.denominator.value = 8;
        assert_eq!(three_eight.length(), 1440);

        let starts = measure_starts(&[four_four.clone(), three_eight, four_four]);
        assert_eq!(starts, vec![0, 3840, 5280]);
        assert!(measure_starts(&[]).is_empty());
    }

    #[test]
    fn key_signature_folding() {
        assert_eq!(fold_key_signature(3), 3);
        assert_eq!(fold_key_signature(-1), 8);
        assert_eq!(fold_key_signature(-7), 14);
    }

    #[test]
    fn velocity_conversion() {
        assert_eq!(convert_velocity(1), 15);
        assert_eq!(convert_velocity(6), 95);
        assert_eq!(convert_velocity(8), 127);
    }

    #[test]
    fn beats_are_found_or_created_in_order() {
        let mut measure = Measure::default();
        measure.beat_at(960).text = Some("second".to_string());
        measure.beat_at(0).text = Some("first".to_string());
        assert_eq!(measure.beat_at(960).text.as_deref(), Some("second"));
        assert_eq!(measure.beats.len(), 2);
        assert_eq!(measure.beats[0].start, 0);
        assert_eq!(measure.beats[1].start, 960);
        assert_eq!(measure.beats[0].voices.len(), MAX_VOICES);
    }

    #[test]
    fn pruning_keeps_beats_with_notes() {
        let mut measure = Measure::default();
        measure.beat_at(0);
        measure.beat_at(480).voices[1]
            .notes
            .push(Note::new(NoteEffect::default()));
        measure.prune_empty_beats();
        assert_eq!(measure.beats.len(), 1);
        assert_eq!(measure.beats[0].start, 480);
    }

    #[test]
    fn parse_bend_points() {
        let mut data = vec![0u8; 5];
        data.extend(2i32.to_le_bytes());
        data.extend(0i32.to_le_bytes());
        data.extend(0i32.to_le_bytes());
        data.push(0);
        data.extend(60i32.to_le_bytes());
        data.extend(50i32.to_le_bytes());
        data.push(0);
        let (rest, bend) = parse_bend_effect(&data).unwrap();
        assert!(rest.is_empty());
        let bend = bend.unwrap();
        assert_eq!(
            bend.points,
            vec![
                BendPoint {
                    position: 0,
                    value: 0
                },
                BendPoint {
                    position: 12,
                    value: 2
                }
            ]
        );
    }

    #[test]
    fn bend_without_points_is_absent() {
        let mut data = vec![0u8; 5];
        data.extend(0i32.to_le_bytes());
        let (rest, bend) = parse_bend_effect(&data).unwrap();
        assert!(rest.is_empty());
        assert!(bend.is_none());
    }

    #[test]
    fn tremolo_bar_scale_is_tunable() {
        let mut data = vec![0u8; 5];
        data.extend(1i32.to_le_bytes());
        data.extend(30i32.to_le_bytes());
        data.extend((-100i32).to_le_bytes());
        data.push(0);

        let default_scale = TremoloBarScale::default();
        assert!(default_scale.is_approximation());
        let (_, bar) = parse_tremolo_bar(&default_scale, GpVersion::GP5)(&data).unwrap();
        assert_eq!(
            bar.unwrap().points,
            vec![BendPoint {
                position: 6,
                value: -2
            }]
        );

        let custom = TremoloBarScale {
            value_divisors: [50.0, 25.0],
            ..Default::default()
        };
        assert!(!custom.is_approximation());
        let (_, bar) = parse_tremolo_bar(&custom, GpVersion::GP5_10)(&data).unwrap();
        assert_eq!(bar.unwrap().points[0].value, -4);
    }

    #[test]
    fn default_tremolo_bar_scale_is_version_independent() {
        let default_scale = TremoloBarScale::default();
        assert_eq!(
            default_scale.value_divisors[GpVersion::GP5.index()],
            default_scale.value_divisors[GpVersion::GP5_10.index()]
        );

        let mut data = vec![0u8; 5];
        data.extend(2i32.to_le_bytes());
        for (position, value) in [(0i32, 0i32), (60, 150)] {
            data.extend(position.to_le_bytes());
            data.extend(value.to_le_bytes());
            data.push(0);
        }
        let (_, v5_00) = parse_tremolo_bar(&default_scale, GpVersion::GP5)(&data).unwrap();
        let (_, v5_10) = parse_tremolo_bar(&default_scale, GpVersion::GP5_10)(&data).unwrap();
        assert_eq!(v5_00, v5_10);
        assert_eq!(
            v5_00.unwrap().points[1],
            BendPoint {
                position: 12,
                value: 3
            }
        );
    }

    #[test]
    fn parse_grace() {
        let data = [3u8, 7, 1, 8, 0x03];
        let (rest, grace) = parse_grace_effect(&data).unwrap();
        assert!(rest.is_empty());
        assert_eq!(
            grace,
            GraceEffect {
                duration: 8,
                fret: 3,
                is_dead: true,
                is_on_beat: true,
                transition: GraceEffectTransition::Slide,
                velocity: 111,
            }
        );
    }

    #[test]
    fn parse_harmonics() {
        let (rest, he) = parse_harmonic_effect(&[2, 0, 0, 0, 9]).unwrap();
        assert_eq!(rest, &[9]);
        assert_eq!(he.unwrap().kind, HarmonicType::Artificial);

        let (rest, he) = parse_harmonic_effect(&[3, 12, 9]).unwrap();
        assert_eq!(rest, &[9]);
        assert_eq!(
            he,
            Some(HarmonicEffect {
                kind: HarmonicType::Tapped,
                right_hand_fret: Some(12)
            })
        );

        let (_, he) = parse_harmonic_effect(&[5]).unwrap();
        assert_eq!(he.unwrap().kind, HarmonicType::Semi);
        let (_, he) = parse_harmonic_effect(&[42]).unwrap();
        assert!(he.is_none());
    }

    #[test]
    fn parse_trill_and_tremolo_picking() {
        let (_, trill) = parse_trill_effect(&[5, 2]).unwrap();
        let trill = trill.unwrap();
        assert_eq!(trill.fret, 5);
        assert_eq!(trill.duration.value, 32);
        let (_, trill) = parse_trill_effect(&[5, 0]).unwrap();
        assert!(trill.is_none());

        let (_, tp) = parse_tremolo_picking(&[1]).unwrap();
        assert_eq!(tp.unwrap().duration.value, 8);
        let (_, tp) = parse_tremolo_picking(&[3]).unwrap();
        assert_eq!(tp.unwrap().duration.value, 32);
        let (_, tp) = parse_tremolo_picking(&[0]).unwrap();
        assert!(tp.is_none());
    }

    #[test]
    fn parse_unsupported_version() {
        let mut data = vec![24u8];
        data.extend(b"FICHIER GUITAR PRO v4.06");
        data.extend([0u8; 6]);
        let err = parse_gp_version(&data).unwrap_err();
        let nom::Err::Failure(err) = err else {
            panic!("expected failure");
        };
        assert_eq!(
            err.into_tab_error(data.len(), None),
            TabError::UnsupportedVersion {
                version: "FICHIER GUITAR PRO v4.06".to_string()
            }
        );
    }
}
