use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app::HandInput;
use crate::interaction::{Command, SimMode};
use crate::world::HandId;

pub const COMMAND_LOG_FORMAT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HandInputRecord {
    pub hand: HandId,
    pub input: HandInput,
}

/// Everything fed into the pipeline on one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickRecord {
    pub tick: u64,
    #[serde(default)]
    pub mode: SimMode,
    #[serde(default)]
    pub inputs: Vec<HandInputRecord>,
    #[serde(default)]
    pub commands: Vec<Command>,
}

/// Replayable record of a run: the fixed step plus every tick's inputs and
/// submitted commands, in execution order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandLog {
    pub format_version: u32,
    pub fixed_dt: f32,
    #[serde(default)]
    pub ticks: Vec<TickRecord>,
    /// [`crate::world_digest`] after the last recorded tick, when known.
    #[serde(default)]
    pub final_digest: Option<String>,
}

#[derive(Debug, Error)]
pub enum CommandLogError {
    #[error("unsupported command log format version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },
    #[error("fixed_dt must be finite and positive, got {0}")]
    InvalidFixedDt(f32),
    #[error("ticks[{index}].commands[{command_index}] is stamped for tick {command_tick}, before its record tick {tick}")]
    CommandBeforeTick {
        index: usize,
        command_index: usize,
        tick: u64,
        command_tick: u64,
    },
    #[error("failed to encode command log: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to write command log {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl CommandLog {
    pub fn new(fixed_dt: f32) -> Self {
        Self {
            format_version: COMMAND_LOG_FORMAT_VERSION,
            fixed_dt,
            ticks: Vec::new(),
            final_digest: None,
        }
    }

    pub fn record(&mut self, record: TickRecord) {
        self.ticks.push(record);
    }

    pub fn command_count(&self) -> usize {
        self.ticks.iter().map(|record| record.commands.len()).sum()
    }

    pub fn validate(&self) -> Result<(), CommandLogError> {
        if self.format_version != COMMAND_LOG_FORMAT_VERSION {
            return Err(CommandLogError::UnsupportedVersion {
                found: self.format_version,
                expected: COMMAND_LOG_FORMAT_VERSION,
            });
        }
        if !self.fixed_dt.is_finite() || self.fixed_dt <= 0.0 {
            return Err(CommandLogError::InvalidFixedDt(self.fixed_dt));
        }
        for (index, record) in self.ticks.iter().enumerate() {
            for (command_index, command) in record.commands.iter().enumerate() {
                if command.tick < record.tick {
                    return Err(CommandLogError::CommandBeforeTick {
                        index,
                        command_index,
                        tick: record.tick,
                        command_tick: command.tick,
                    });
                }
            }
        }
        Ok(())
    }

    pub fn to_json_pretty(&self) -> Result<String, CommandLogError> {
        serde_json::to_string_pretty(self).map_err(CommandLogError::Encode)
    }

    pub fn write_to(&self, path: &Path) -> Result<(), CommandLogError> {
        let text = self.to_json_pretty()?;
        replace_file(path, &text).map_err(|source| CommandLogError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Stages the text beside `path` and renames it over the old log.
fn replace_file(path: &Path, text: &str) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut staging = path.as_os_str().to_owned();
    staging.push(".tmp");
    let staging = PathBuf::from(staging);
    fs::write(&staging, text)?;
    fs::rename(&staging, path).inspect_err(|_| {
        let _ = fs::remove_file(&staging);
    })
}
