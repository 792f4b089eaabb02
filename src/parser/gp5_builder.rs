//! Writes small GP5 buffers byte by byte for the decoder tests.

use crate::parser::song_parser::GpVersion;

pub const GUITAR_TUNING: [i32; 6] = [64, 59, 55, 50, 45, 40];
pub const BASS_TUNING: [i32; 4] = [43, 38, 33, 28];

pub struct Gp5Builder {
    version: GpVersion,
    bytes: Vec<u8>,
    track_written: bool,
}

impl Gp5Builder {
    pub fn new(version: GpVersion) -> Self {
        Gp5Builder {
            version,
            bytes: Vec::new(),
            track_written: false,
        }
    }

    pub fn build(&self) -> Vec<u8> {
        self.bytes.clone()
    }

    pub fn u8(&mut self, value: u8) -> &mut Self {
        self.bytes.push(value);
        self
    }

    pub fn i8(&mut self, value: i8) -> &mut Self {
        self.bytes.extend(value.to_le_bytes());
        self
    }

    pub fn int(&mut self, value: i32) -> &mut Self {
        self.bytes.extend(value.to_le_bytes());
        self
    }

    pub fn zeros(&mut self, count: usize) -> &mut Self {
        self.bytes.resize(self.bytes.len() + count, 0);
        self
    }

    /// Length byte then the text padded to `size`.
    pub fn byte_size_string(&mut self, text: &str, size: usize) -> &mut Self {
        self.u8(text.len() as u8);
        self.bytes.extend(text.as_bytes());
        self.zeros(size.saturating_sub(text.len()))
    }

    pub fn int_sized_string(&mut self, text: &str) -> &mut Self {
        self.int(text.len() as i32);
        self.bytes.extend(text.as_bytes());
        self
    }

    pub fn int_byte_sized_string(&mut self, text: &str) -> &mut Self {
        self.int(text.len() as i32 + 1);
        self.byte_size_string(text, 0)
    }

    pub fn version_string(&mut self, literal: &str) -> &mut Self {
        self.byte_size_string(literal, 30)
    }

    /// Everything up to the measure count: metadata, page setup and the channel table.
    pub fn song_header(&mut self, title: &str, tempo: i32, key: i8) -> &mut Self {
        let literal = match self.version {
            GpVersion::GP5 => "FICHIER GUITAR PRO v5.00",
            GpVersion::GP5_10 => "FICHIER GUITAR PRO v5.10",
        };
        self.version_string(literal);
        // info
        self.int_byte_sized_string(title);
        for field in ["sub", "artist", "album", "words", "music", "(c)", "tabber", "notes"] {
            self.int_byte_sized_string(field);
        }
        self.int(1).int_byte_sized_string("notice");
        // lyrics
        self.int(1).int(2).int_sized_string("la la");
        for _ in 0..4 {
            self.int(0).int_sized_string("");
        }
        // page setup
        self.zeros(match self.version {
            GpVersion::GP5 => 30,
            GpVersion::GP5_10 => 49,
        });
        for text in [
            "%TITLE%", "%SUBTITLE%", "%ARTIST%", "%ALBUM%", "Words by", "Music by", "W&M",
            "Copyright", "All rights", "Page %N%", "Moderate",
        ] {
            self.zeros(4).byte_size_string(text, 0);
        }
        self.int(tempo);
        if self.version == GpVersion::GP5_10 {
            self.u8(0);
        }
        self.i8(key).zeros(3).i8(0);
        self.channel_table()
    }

    fn channel_table(&mut self) -> &mut Self {
        for index in 0..64 {
            self.int(index).i8(13).i8(8).i8(0).i8(0).i8(0).i8(0).zeros(2);
        }
        self
    }

    /// Directions, master reverb, then both counts.
    pub fn counts(&mut self, measures: i32, tracks: i32) -> &mut Self {
        self.zeros(42).int(measures).int(tracks)
    }

    /// Header without any change, `index` is 0-based.
    pub fn plain_measure_header(&mut self, index: usize) -> &mut Self {
        self.measure_header_prefix(index).u8(0).zeros(1).u8(0)
    }

    pub fn time_signature_header(
        &mut self,
        index: usize,
        numerator: i8,
        denominator: i8,
    ) -> &mut Self {
        self.measure_header_prefix(index)
            .u8(0x03)
            .i8(numerator)
            .i8(denominator)
            .zeros(4)
            .zeros(1)
            .u8(0)
    }

    /// Separator byte in front of every header but the first.
    pub fn measure_header_prefix(&mut self, index: usize) -> &mut Self {
        if index > 0 {
            self.u8(0);
        }
        self
    }

    /// A track record, `gm_channel` is 1-based as in the file.
    pub fn track(
        &mut self,
        name: &str,
        tuning: &[i32],
        gm_channel_1: i32,
        gm_channel_2: i32,
    ) -> &mut Self {
        self.u8(0);
        if !self.track_written || self.version == GpVersion::GP5 {
            self.u8(0);
        }
        self.track_written = true;
        self.byte_size_string(name, 40);
        self.int(tuning.len() as i32);
        for s in 0..7 {
            self.int(tuning.get(s).copied().unwrap_or(0));
        }
        self.int(1) // port
            .int(gm_channel_1)
            .int(gm_channel_2)
            .int(24) // frets
            .int(0) // offset
            .u8(0xFF)
            .u8(0)
            .u8(0)
            .u8(0);
        match self.version {
            GpVersion::GP5 => self.zeros(44),
            GpVersion::GP5_10 => self
                .zeros(49)
                .int_byte_sized_string("")
                .int_byte_sized_string(""),
        }
    }

    pub fn end_tracks(&mut self) -> &mut Self {
        match self.version {
            GpVersion::GP5 => self.zeros(2),
            GpVersion::GP5_10 => self.zeros(1),
        }
    }

    pub fn voice(&mut self, beat_count: i32) -> &mut Self {
        self.int(beat_count)
    }

    /// Beat flags then the duration exponent, for beats without a status byte.
    pub fn beat_start(&mut self, flags: u8, exponent: i8) -> &mut Self {
        self.u8(flags).i8(exponent)
    }

    /// Bit for the 0-based `string_index` in the note mask.
    pub const fn string_bit(string_index: u8) -> u8 {
        1 << (6 - string_index)
    }

    /// Normal note carrying a fret and a velocity.
    pub fn fretted_note(&mut self, fret: i8, dynamic: i8) -> &mut Self {
        self.u8(0x30).u8(1).i8(dynamic).i8(fret).u8(0)
    }

    pub fn tied_note(&mut self) -> &mut Self {
        self.u8(0x20).u8(2).i8(0).u8(0)
    }

    pub fn beat_end(&mut self) -> &mut Self {
        self.zeros(1).u8(0)
    }

    /// A plain beat with one fretted note per `(string_index, fret)`.
    pub fn note_beat(&mut self, exponent: i8, notes: &[(u8, i8)]) -> &mut Self {
        self.beat_start(0, exponent);
        let mask = notes
            .iter()
            .fold(0u8, |mask, (string, _)| mask | Self::string_bit(*string));
        self.u8(mask);
        // notes are written from the highest bit down
        let mut ordered = notes.to_vec();
        ordered.sort_by_key(|(string, _)| *string);
        for (_, fret) in ordered {
            self.fretted_note(fret, 6);
        }
        self.beat_end()
    }

    /// Mix change record, negative levels and tempo stay unchanged.
    ///
    /// Transition bytes are written as 7 so a misaligned read shows up in the next field.
    pub fn mix_change(&mut self, levels: [i8; 6], tempo_name: &str, tempo: i32) -> &mut Self {
        self.i8(-1).zeros(16);
        for level in levels {
            self.i8(level);
        }
        self.int_byte_sized_string(tempo_name).int(tempo);
        for level in levels {
            if level >= 0 {
                self.u8(7);
            }
        }
        if tempo >= 0 {
            self.u8(7);
            if self.version == GpVersion::GP5_10 {
                self.u8(0);
            }
        }
        // apply to all tracks, reserved
        self.zeros(2);
        if self.version == GpVersion::GP5_10 {
            self.int_byte_sized_string("").int_byte_sized_string("");
        }
        self
    }

    /// A beat with a status byte and no note.
    pub fn rest_beat(&mut self, exponent: i8) -> &mut Self {
        self.u8(0x40).u8(0x02).i8(exponent).u8(0).beat_end()
    }

    /// Byte closing every measure of every track.
    pub fn end_measure(&mut self) -> &mut Self {
        self.u8(0)
    }
}
