use crate::AppError::ConfigError;
use clap::Parser;
use config::{Config, OutputFormat};
use ruxtab::{parse_gp_data_with, song_to_xml, TabError as LibTabError};
use std::io::{self, Write};
use std::path::PathBuf;

mod config;

fn main() {
    let result = main_result();
    std::process::exit(match result {
        Ok(()) => 0,
        Err(err) => {
            // use Display instead of Debug for user friendly error messages
            log::error!("{err}");
            1
        }
    });
}

pub fn main_result() -> Result<(), AppError> {
    // setup logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("ruxtab=info"))
        .init();

    // args
    let args = CliArgs::parse();

    // check if tab file exists
    if !args.tab_file.exists() {
        let err = ConfigError(format!("Tab file not found {:?}", args.tab_file));
        return Err(err);
    }

    // read local config
    let local_config = Config::read_config(args.config.as_deref())?;
    let options = local_config.decoder_options();

    let file_data = std::fs::read(&args.tab_file)?;
    let song = parse_gp_data_with(&file_data, &options)?;
    log::info!(
        "Decoded {:?} ({}): {} tracks, {} measures",
        args.tab_file,
        song.version,
        song.tracks.len(),
        song.measure_headers.len()
    );

    let format = args
        .format
        .or_else(|| local_config.get_output_format())
        .unwrap_or_default();
    let rendered = match format {
        OutputFormat::Xml => song_to_xml(&song),
        OutputFormat::Json => serde_json::to_string_pretty(&song)
            .map_err(|err| AppError::OtherError(format!("Could not serialize song {err}")))?,
    };

    match &args.output {
        Some(output) => {
            std::fs::write(output, rendered)?;
            log::info!("Written to {output:?}");
        }
        None => io::stdout().lock().write_all(rendered.as_bytes())?,
    }
    Ok(())
}

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct CliArgs {
    /// Path to the Guitar Pro 5 file to decode.
    tab_file: PathBuf,
    /// Output format, defaults to the configured one then xml.
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,
    /// Optional path to a config file instead of $HOME/.ruxtab/config.json.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Optional output file instead of stdout.
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    ConfigError(String),
    #[error("parsing error: {0}")]
    ParsingError(String),
    #[error("other error: {0}")]
    OtherError(String),
}

impl From<LibTabError> for AppError {
    fn from(error: LibTabError) -> Self {
        match error {
            LibTabError::ConfigError(s) => Self::ConfigError(s),
            LibTabError::IoError(s) => Self::OtherError(s),
            err @ (LibTabError::UnsupportedVersion { .. }
            | LibTabError::OutOfRange { .. }
            | LibTabError::InvalidValue { .. }) => Self::ParsingError(err.to_string()),
        }
    }
}

impl From<io::Error> for AppError {
    fn from(error: io::Error) -> Self {
        Self::OtherError(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_args() {
        let args = CliArgs::try_parse_from(["ruxtab", "song.gp5", "--format", "json"]).unwrap();
        assert_eq!(args.tab_file, PathBuf::from("song.gp5"));
        assert_eq!(args.format, Some(OutputFormat::Json));
        assert!(args.output.is_none());
        assert!(CliArgs::try_parse_from(["ruxtab"]).is_err());
        assert!(CliArgs::try_parse_from(["ruxtab", "a.gp5", "--format", "pdf"]).is_err());
    }

    #[test]
    fn decode_errors_map_to_parsing_errors() {
        let err = AppError::from(LibTabError::UnsupportedVersion {
            version: "FICHIER GUITAR PRO v3.00".to_string(),
        });
        assert!(matches!(err, AppError::ParsingError(_)));
        let err = AppError::from(LibTabError::ConfigError("bad".to_string()));
        assert!(matches!(err, AppError::ConfigError(_)));
    }
}
