//! Ruxtab - Guitar Pro 5 tablature decoder
//!
//! This library provides:
//! - Decoding of Guitar Pro 5 (.gp5, v5.00 and v5.10) files into a `Song`
//! - A structured XML walk over the decoded document
//!
//! # Example
//!
//! ```no_run
//! use ruxtab::{parse_gp_file, song_to_xml};
//!
//! let song = parse_gp_file("song.gp5").unwrap();
//! println!("{}", song_to_xml(&song));
//! ```

pub mod error;
pub mod parser;
pub mod xml;

// Re-export main types for convenience
pub use error::TabError;
pub use parser::song_parser::{
    parse_gp_data, parse_gp_data_with, parse_gp_file, Beat, BeatEffects, Clef, DecodeNotice,
    DecoderOptions, Duration, GpVersion, Measure, MeasureHeader, MidiChannel, Note, NoteEffect,
    Song, Tempo, TimeSignature, Track, TremoloBarScale, Voice, QUARTER_TIME,
};
pub use xml::song_to_xml;
