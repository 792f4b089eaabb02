//! Structured text walk over a decoded `Song`.

use std::fmt::Display;

use quick_xml::escape::escape;

use crate::parser::song_parser::{
    Beat, BendPoint, Measure, MeasureHeader, MidiChannel, Note, NoteEffect, Song, Track, Voice,
};

const INDENT: &str = "  ";

/// Indented XML writer, every text value is escaped.
struct XmlWriter {
    buffer: String,
    depth: usize,
}

impl XmlWriter {
    fn new() -> Self {
        let mut buffer = String::new();
        buffer.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\" ?>\n");
        XmlWriter { buffer, depth: 0 }
    }

    fn indent(&mut self) {
        for _ in 0..self.depth {
            self.buffer.push_str(INDENT);
        }
    }

    fn open(&mut self, tag: &str) {
        self.indent();
        self.buffer.push_str(&format!("<{tag}>\n"));
        self.depth += 1;
    }

    fn close(&mut self, tag: &str) {
        self.depth = self.depth.saturating_sub(1);
        self.indent();
        self.buffer.push_str(&format!("</{tag}>\n"));
    }

    fn leaf(&mut self, tag: &str, value: impl Display) {
        self.indent();
        let text = value.to_string();
        self.buffer
            .push_str(&format!("<{tag}>{}</{tag}>\n", escape(text.as_str())));
    }

    fn flag(&mut self, tag: &str, value: bool) {
        if value {
            self.indent();
            self.buffer.push_str(&format!("<{tag}/>\n"));
        }
    }

    fn finish(self) -> String {
        self.buffer
    }
}

/// Render the document as indented XML.
pub fn song_to_xml(song: &Song) -> String {
    let mut w = XmlWriter::new();
    w.open("TabFile");

    w.open("Version");
    w.leaf("Major", song.version.major());
    w.leaf("Minor", song.version.minor());
    w.close("Version");

    let info = &song.song_info;
    w.leaf("Title", &info.name);
    w.leaf("Subtitle", &info.subtitle);
    w.leaf("Artist", &info.artist);
    w.leaf("Album", &info.album);
    w.leaf("LyricsAuthor", &info.words);
    w.leaf("MusicAuthor", &info.author);
    w.leaf("Copyright", &info.copyright);
    w.leaf("Tab", &info.writer);
    w.leaf("Instructions", &info.instructions);

    if !info.notices.is_empty() {
        w.open("Comments");
        for comment in &info.notices {
            w.leaf("Comment", comment);
        }
        w.close("Comments");
    }

    w.open("LyricInfo");
    w.leaf("Track", song.lyrics.track_choice);
    w.leaf("From", song.lyrics.from);
    w.leaf("Lyric", &song.lyrics.text);
    w.close("LyricInfo");

    w.leaf("TempoValue", song.tempo.value);
    if let Some(name) = &song.tempo.name {
        w.leaf("TempoName", name);
    }
    w.leaf("KeySignature", song.key_signature);

    if !song.channels.is_empty() {
        w.open("Channels");
        for channel in &song.channels {
            write_channel(&mut w, channel);
        }
        w.close("Channels");
    }

    w.leaf("Measures", song.measure_headers.len());
    w.leaf("TrackCount", song.tracks.len());

    if !song.measure_headers.is_empty() {
        w.open("MeasureHeaders");
        for header in &song.measure_headers {
            write_measure_header(&mut w, header);
        }
        w.close("MeasureHeaders");
    }

    if !song.tracks.is_empty() {
        w.open("Tracks");
        for track in &song.tracks {
            write_track(&mut w, track);
        }
        w.close("Tracks");
    }

    w.close("TabFile");
    w.finish()
}

fn write_channel(w: &mut XmlWriter, channel: &MidiChannel) {
    w.open("Channel");
    if let Some(id) = channel.id {
        w.leaf("Id", id);
    }
    w.leaf("Index", channel.channel_index);
    w.leaf("Program", channel.instrument);
    w.leaf("Volume", channel.volume);
    w.leaf("Balance", channel.balance);
    w.leaf("Chorus", channel.chorus);
    w.leaf("Reverb", channel.reverb);
    w.leaf("Phaser", channel.phaser);
    w.leaf("Tremolo", channel.tremolo);
    w.leaf("Bank", channel.bank);
    w.leaf("IsPercussionChannel", channel.is_percussion());
    for parameter in &channel.parameters {
        w.open("ChannelParam");
        w.leaf("Key", &parameter.key);
        w.leaf("Value", &parameter.value);
        w.close("ChannelParam");
    }
    w.close("Channel");
}

fn write_measure_header(w: &mut XmlWriter, header: &MeasureHeader) {
    w.open("MeasureHeader");
    w.leaf("Number", header.number);
    w.leaf("Start", header.start);
    w.leaf(
        "TimeSignature",
        format!(
            "{}/{}",
            header.time_signature.numerator, header.time_signature.denominator.value
        ),
    );
    w.leaf("Tempo", header.tempo.value);
    w.leaf("KeySignature", header.key_signature.key);
    w.flag("Minor", header.key_signature.is_minor);
    w.flag("RepeatOpen", header.repeat_open);
    if header.repeat_close > 0 {
        w.leaf("RepeatClose", header.repeat_close);
    }
    if header.repeat_alternative > 0 {
        w.leaf("RepeatAlternative", header.repeat_alternative);
    }
    if let Some(marker) = &header.marker {
        w.open("Marker");
        w.leaf("Title", &marker.title);
        w.leaf("Color", format!("#{:06X}", marker.color));
        w.close("Marker");
    }
    w.leaf("TripletFeel", format!("{:?}", header.triplet_feel));
    w.flag("DoubleBar", header.double_bar);
    w.close("MeasureHeader");
}

fn write_track(w: &mut XmlWriter, track: &Track) {
    w.open("Track");
    w.leaf("Number", track.number);
    w.leaf("Name", &track.name);
    if let Some(channel_id) = track.channel_id {
        w.leaf("ChannelId", channel_id);
    }
    w.leaf("Offset", track.offset);
    w.leaf("Color", format!("#{:06X}", track.color));
    w.open("Strings");
    for (number, tuning) in &track.strings {
        w.open("String");
        w.leaf("Number", number);
        w.leaf("Tuning", tuning);
        w.close("String");
    }
    w.close("Strings");
    for measure in &track.measures {
        write_measure(w, measure);
    }
    w.close("Track");
}

fn write_measure(w: &mut XmlWriter, measure: &Measure) {
    w.open("Measure");
    w.leaf("Start", measure.start);
    w.leaf("Clef", format!("{:?}", measure.clef));
    w.leaf("KeySignature", measure.key_signature.key);
    for beat in &measure.beats {
        write_beat(w, beat);
    }
    w.close("Measure");
}

fn write_beat(w: &mut XmlWriter, beat: &Beat) {
    w.open("Beat");
    w.leaf("Start", beat.start);
    if let Some(text) = &beat.text {
        w.leaf("Text", text);
    }
    if let Some(chord) = &beat.effect.chord {
        w.open("Chord");
        w.leaf("Name", &chord.name);
        w.leaf("FirstFret", chord.first_fret);
        let frets: Vec<String> = chord.strings.iter().map(ToString::to_string).collect();
        w.leaf("Frets", frets.join(" "));
        w.close("Chord");
    }
    if beat.effect.stroke.value > 0 {
        w.leaf(
            "Stroke",
            format!(
                "{:?} {}",
                beat.effect.stroke.direction, beat.effect.stroke.value
            ),
        );
    }
    for voice in &beat.voices {
        write_voice(w, voice);
    }
    w.close("Beat");
}

fn write_voice(w: &mut XmlWriter, voice: &Voice) {
    if voice.empty {
        w.flag("EmptyVoice", true);
        return;
    }
    w.open("Voice");
    let duration = &voice.duration;
    w.leaf("Duration", duration.value);
    w.flag("Dotted", duration.dotted);
    if duration.tuplet_enters != 1 || duration.tuplet_times != 1 {
        w.leaf(
            "Tuplet",
            format!("{}:{}", duration.tuplet_enters, duration.tuplet_times),
        );
    }
    for note in &voice.notes {
        write_note(w, note);
    }
    w.close("Voice");
}

fn write_note(w: &mut XmlWriter, note: &Note) {
    w.open("Note");
    w.leaf("String", note.string);
    w.leaf("Fret", note.value);
    w.leaf("Velocity", note.velocity);
    w.leaf("Type", format!("{:?}", note.kind));
    w.flag("SwapAccidentals", note.swap_accidentals);
    write_note_effect(w, &note.effect);
    w.close("Note");
}

fn write_points(w: &mut XmlWriter, tag: &str, points: &[BendPoint]) {
    w.open(tag);
    for point in points {
        w.leaf("Point", format!("{}:{}", point.position, point.value));
    }
    w.close(tag);
}

fn write_note_effect(w: &mut XmlWriter, effect: &NoteEffect) {
    if *effect == NoteEffect::default() {
        return;
    }
    w.open("Effects");
    w.flag("Accentuated", effect.accentuated_note);
    w.flag("HeavyAccentuated", effect.heavy_accentuated_note);
    w.flag("Ghost", effect.ghost_note);
    w.flag("Hammer", effect.hammer);
    w.flag("LetRing", effect.let_ring);
    w.flag("PalmMute", effect.palm_mute);
    w.flag("Staccato", effect.staccato);
    w.flag("Vibrato", effect.vibrato);
    w.flag("FadeIn", effect.fade_in);
    if effect.slide {
        match effect.slide_type {
            Some(kind) => w.leaf("Slide", format!("{kind:?}")),
            None => w.flag("Slide", true),
        }
    }
    if let Some(bend) = &effect.bend {
        write_points(w, "Bend", &bend.points);
    }
    if let Some(tremolo_bar) = &effect.tremolo_bar {
        write_points(w, "TremoloBar", &tremolo_bar.points);
    }
    if let Some(grace) = &effect.grace {
        w.open("Grace");
        w.leaf("Fret", grace.fret);
        w.leaf("Duration", grace.duration);
        w.leaf("Velocity", grace.velocity);
        w.leaf("Transition", format!("{:?}", grace.transition));
        w.flag("Dead", grace.is_dead);
        w.flag("OnBeat", grace.is_on_beat);
        w.close("Grace");
    }
    if let Some(harmonic) = &effect.harmonic {
        w.leaf("Harmonic", format!("{:?}", harmonic.kind));
    }
    if let Some(trill) = &effect.trill {
        w.leaf("Trill", format!("{} {}", trill.fret, trill.duration.value));
    }
    if let Some(tremolo_picking) = &effect.tremolo_picking {
        w.leaf("TremoloPicking", tremolo_picking.duration.value);
    }
    if effect.slap != Default::default() {
        w.leaf("Slap", format!("{:?}", effect.slap));
    }
    w.close("Effects");
}
