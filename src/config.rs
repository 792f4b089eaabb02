use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use home::home_dir;
use ruxtab::{DecoderOptions, TabError, TremoloBarScale};
use serde::{Deserialize, Serialize};

#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Xml,
    Json,
}

/// Overrides for the tremolo bar normalization, unset fields keep the default scale.
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TremoloBarConfig {
    max_position_length: Option<f32>,
    position_divisor: Option<f32>,
    value_divisors: Option<[f32; 2]>,
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    output_format: Option<OutputFormat>,
    #[serde(default)]
    tremolo_bar: Option<TremoloBarConfig>,
}

impl Config {
    // folder placed in $HOME directory
    const FOLDER: &'static str = ".ruxtab";

    pub const fn get_output_format(&self) -> Option<OutputFormat> {
        self.output_format
    }

    pub fn decoder_options(&self) -> DecoderOptions {
        let mut tremolo_bar = TremoloBarScale::default();
        if let Some(overrides) = &self.tremolo_bar {
            if let Some(max_position_length) = overrides.max_position_length {
                tremolo_bar.max_position_length = max_position_length;
            }
            if let Some(position_divisor) = overrides.position_divisor {
                tremolo_bar.position_divisor = position_divisor;
            }
            if let Some(value_divisors) = overrides.value_divisors {
                tremolo_bar.value_divisors = value_divisors;
            }
        }
        DecoderOptions { tremolo_bar }
    }

    fn get_path() -> Option<PathBuf> {
        home_dir().map(|home| home.join(Self::FOLDER).join("config.json"))
    }

    /// Reads the explicit config file, else `$HOME/.ruxtab/config.json` when it exists.
    ///
    /// Nothing is ever written, a missing default file means default values.
    pub fn read_config(explicit_path: Option<&Path>) -> Result<Self, TabError> {
        let config_path = match explicit_path {
            Some(path) => {
                if !path.exists() {
                    return Err(TabError::ConfigError(format!(
                        "Config file not found {path:?}"
                    )));
                }
                path.to_path_buf()
            }
            None => match Self::get_path() {
                Some(path) if path.exists() => path,
                _ => {
                    log::debug!("No local configuration, using defaults");
                    return Ok(Config::default());
                }
            },
        };
        log::info!("Reading configuration {config_path:?}");
        let file = File::open(config_path)?;
        let reader = BufReader::new(file);
        let config: Config = serde_json::from_reader(reader).map_err(|err| {
            TabError::ConfigError(format!("Could not read local configuration {err:}"))
        })?;
        Ok(config)
    }
}
