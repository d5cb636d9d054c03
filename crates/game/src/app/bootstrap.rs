use std::fs;
use std::path::{Path, PathBuf};

use interaction_engine::{CommandLog, InteractionConfig, LoopConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::{demo, replay};

const CONFIG_ENV_VAR: &str = "HANDSIM_CONFIG";
const TICKS_ENV_VAR: &str = "HANDSIM_TICKS";
const REPLAY_ENV_VAR: &str = "HANDSIM_REPLAY";
const RECORD_ENV_VAR: &str = "HANDSIM_RECORD";
const REALTIME_ENV_VAR: &str = "HANDSIM_REALTIME";
const DEFAULT_DEMO_TICKS: u64 = 900;

pub(crate) enum RunSource {
    Demo,
    Replay(CommandLog),
}

pub(crate) struct AppWiring {
    pub(crate) loop_config: LoopConfig,
    pub(crate) interaction: InteractionConfig,
    pub(crate) source: RunSource,
    pub(crate) record_path: Option<PathBuf>,
}

pub(crate) fn build_app() -> Result<AppWiring, String> {
    init_tracing();
    info!("=== handsim startup ===");

    let interaction = match env_path(CONFIG_ENV_VAR) {
        Some(path) => {
            let config = load_interaction_config(&path)?;
            info!(path = %path.display(), "interaction_config_loaded");
            config
        }
        None => demo::demo_config(),
    };
    let source = match env_path(REPLAY_ENV_VAR) {
        Some(path) => {
            let log = replay::load_command_log(&path)?;
            info!(
                path = %path.display(),
                ticks = log.ticks.len(),
                commands = log.command_count(),
                "command_log_loaded"
            );
            RunSource::Replay(log)
        }
        None => RunSource::Demo,
    };
    let explicit_ticks = parse_tick_limit(std::env::var(TICKS_ENV_VAR).ok().as_deref())?;
    // A replay runs to the end of its log unless told otherwise.
    let tick_limit = match source {
        RunSource::Demo => Some(explicit_ticks.unwrap_or(DEFAULT_DEMO_TICKS)),
        RunSource::Replay(_) => explicit_ticks,
    };
    let loop_config = LoopConfig {
        tick_limit,
        realtime: parse_flag(std::env::var(REALTIME_ENV_VAR).ok().as_deref()),
        ..LoopConfig::default()
    };

    Ok(AppWiring {
        loop_config,
        interaction,
        source,
        record_path: env_path(RECORD_ENV_VAR),
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn env_path(var: &str) -> Option<PathBuf> {
    std::env::var_os(var)
        .filter(|raw| !raw.is_empty())
        .map(PathBuf::from)
}

pub(crate) fn load_interaction_config(path: &Path) -> Result<InteractionConfig, String> {
    let raw = fs::read_to_string(path)
        .map_err(|error| format!("read config '{}': {error}", path.display()))?;
    parse_interaction_config_json(&raw)
}

pub(crate) fn parse_interaction_config_json(raw: &str) -> Result<InteractionConfig, String> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    let config = match serde_path_to_error::deserialize::<_, InteractionConfig>(&mut deserializer)
    {
        Ok(config) => config,
        Err(error) => {
            let path = error.path().to_string();
            let source = error.into_inner();
            return if path.is_empty() || path == "." {
                Err(format!("parse config json: {source}"))
            } else {
                Err(format!("parse config json at {path}: {source}"))
            };
        }
    };
    config
        .validate()
        .map_err(|error| format!("validation failed at tuning: {error}"))?;
    Ok(config)
}

fn parse_tick_limit(raw: Option<&str>) -> Result<Option<u64>, String> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(None),
        Some(value) => match value.parse::<u64>() {
            Ok(0) => Err(format!("{TICKS_ENV_VAR} must be at least 1")),
            Ok(ticks) => Ok(Some(ticks)),
            Err(error) => Err(format!("{TICKS_ENV_VAR}='{value}': {error}")),
        },
    }
}

fn parse_flag(raw: Option<&str>) -> bool {
    matches!(
        raw.map(str::trim),
        Some("1") | Some("true") | Some("yes") | Some("on")
    )
}
