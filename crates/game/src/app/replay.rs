use std::fs;
use std::path::Path;

use interaction_engine::{CommandLog, InteractionPipeline, ObjectStore, TickRecord};

use super::loop_runner::TickSource;

/// Feeds a recorded log back tick by tick, ignoring the live world.
pub(crate) struct ReplaySource {
    records: std::vec::IntoIter<TickRecord>,
}

impl ReplaySource {
    pub(crate) fn new(log: CommandLog) -> Self {
        Self {
            records: log.ticks.into_iter(),
        }
    }
}

impl TickSource for ReplaySource {
    fn next_record(
        &mut self,
        _tick: u64,
        _world: &ObjectStore,
        _pipeline: &InteractionPipeline,
    ) -> Option<TickRecord> {
        self.records.next()
    }
}

pub(crate) fn load_command_log(path: &Path) -> Result<CommandLog, String> {
    let raw = fs::read_to_string(path)
        .map_err(|error| format!("read command log '{}': {error}", path.display()))?;
    parse_command_log_json(&raw)
}

pub(crate) fn parse_command_log_json(raw: &str) -> Result<CommandLog, String> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    let log = match serde_path_to_error::deserialize::<_, CommandLog>(&mut deserializer) {
        Ok(log) => log,
        Err(error) => {
            let path = error.path().to_string();
            let source = error.into_inner();
            return if path.is_empty() || path == "." {
                Err(format!("parse command log json: {source}"))
            } else {
                Err(format!("parse command log json at {path}: {source}"))
            };
        }
    };
    log.validate()
        .map_err(|error| format!("validation failed: {error}"))?;
    Ok(log)
}

pub(crate) fn write_command_log(log: &CommandLog, path: &Path) -> Result<(), String> {
    log.write_to(path).map_err(|error| error.to_string())
}
