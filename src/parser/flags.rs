//! Named views over the positional flag bytes of the GP5 format.
//!
//! Every flags byte is decoded once at the read site; the decoders only
//! look at the named fields afterwards.

const fn bit(flags: u8, mask: u8) -> bool {
    flags & mask == mask
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MeasureHeaderFlags {
    pub numerator: bool,
    pub denominator: bool,
    pub repeat_open: bool,
    pub repeat_close: bool,
    pub repeat_alternative: bool,
    pub marker: bool,
    pub key_signature: bool,
    pub double_bar: bool,
}

impl MeasureHeaderFlags {
    pub const fn from_bits(flags: u8) -> Self {
        MeasureHeaderFlags {
            numerator: bit(flags, 0x01),
            denominator: bit(flags, 0x02),
            repeat_open: bit(flags, 0x04),
            repeat_close: bit(flags, 0x08),
            repeat_alternative: bit(flags, 0x10),
            marker: bit(flags, 0x20),
            key_signature: bit(flags, 0x40),
            double_bar: bit(flags, 0x80),
        }
    }

    /// The time signature changes at this measure.
    pub const fn time_signature_changed(&self) -> bool {
        self.numerator || self.denominator
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BeatFlags {
    pub dotted: bool,
    pub chord: bool,
    pub text: bool,
    pub effects: bool,
    pub mix_change: bool,
    pub tuplet: bool,
    pub status: bool,
}

impl BeatFlags {
    pub const fn from_bits(flags: u8) -> Self {
        BeatFlags {
            dotted: bit(flags, 0x01),
            chord: bit(flags, 0x02),
            text: bit(flags, 0x04),
            effects: bit(flags, 0x08),
            mix_change: bit(flags, 0x10),
            tuplet: bit(flags, 0x20),
            status: bit(flags, 0x40),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BeatEffectFlags {
    pub vibrato: bool,
    pub fade_in: bool,
    pub slap: bool,
    pub stroke: bool,
    pub pick_stroke: bool,
    pub tremolo_bar: bool,
}

impl BeatEffectFlags {
    pub const fn from_bits(flags1: u8, flags2: u8) -> Self {
        BeatEffectFlags {
            vibrato: bit(flags1, 0x02),
            fade_in: bit(flags1, 0x10),
            slap: bit(flags1, 0x20),
            stroke: bit(flags1, 0x40),
            pick_stroke: bit(flags2, 0x02),
            tremolo_bar: bit(flags2, 0x04),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NoteFlags {
    pub duration_percent: bool,
    pub heavy_accentuated: bool,
    pub ghost: bool,
    pub effects: bool,
    pub velocity: bool,
    pub kind_and_fret: bool,
    pub accentuated: bool,
    pub fingering: bool,
}

impl NoteFlags {
    pub const fn from_bits(flags: u8) -> Self {
        NoteFlags {
            duration_percent: bit(flags, 0x01),
            heavy_accentuated: bit(flags, 0x02),
            ghost: bit(flags, 0x04),
            effects: bit(flags, 0x08),
            velocity: bit(flags, 0x10),
            kind_and_fret: bit(flags, 0x20),
            accentuated: bit(flags, 0x40),
            fingering: bit(flags, 0x80),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct NoteEffectFlags {
    pub bend: bool,
    pub hammer: bool,
    pub let_ring: bool,
    pub grace: bool,
    pub staccato: bool,
    pub palm_mute: bool,
    pub tremolo_picking: bool,
    pub slide: bool,
    pub harmonic: bool,
    pub trill: bool,
    pub vibrato: bool,
}

impl NoteEffectFlags {
    pub const fn from_bits(flags1: u8, flags2: u8) -> Self {
        NoteEffectFlags {
            bend: bit(flags1, 0x01),
            hammer: bit(flags1, 0x02),
            let_ring: bit(flags1, 0x08),
            grace: bit(flags1, 0x10),
            staccato: bit(flags2, 0x01),
            palm_mute: bit(flags2, 0x02),
            tremolo_picking: bit(flags2, 0x04),
            slide: bit(flags2, 0x08),
            harmonic: bit(flags2, 0x10),
            trill: bit(flags2, 0x20),
            vibrato: bit(flags2, 0x40),
        }
    }
}

/// Strings played by a beat, bit `i` stands for string index `6 - i`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StringMask(u8);

impl StringMask {
    pub const fn from_bits(flags: u8) -> Self {
        StringMask(flags)
    }

    /// Zero based string indexes, highest bit first.
    pub fn string_indexes(self) -> impl Iterator<Item = usize> {
        (0..7u8)
            .rev()
            .filter(move |b| self.0 & (1 << *b) != 0)
            .map(|b| usize::from(6 - b))
    }
}
