use rivet::api::RivetResult;
use rivet::framework::TaskSchedulerDef;
use rivet::renderer::DriverDef;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use structopt::StructOpt;

#[derive(StructOpt, Debug, Clone)]
#[structopt(name = "demo", about = "Drives the render thread with producer threads and a worker pool")]
pub struct DemoArgs {
    /// Number of frames to render before shutting down
    #[structopt(long, default_value = "240")]
    pub frames: u64,

    /// Number of producer threads creating resources and recording draws
    #[structopt(long, default_value = "4")]
    pub producers: usize,

    /// Number of task scheduler workers. Overrides the config file.
    #[structopt(long)]
    pub workers: Option<usize>,

    /// RON file containing a `DemoConfig`
    #[structopt(long, parse(from_os_str))]
    pub config: Option<PathBuf>,

    /// Log frame statistics every this many frames
    #[structopt(long, default_value = "60")]
    pub log_interval: u64,
}

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
#[serde(default)]
pub struct DemoConfig {
    pub driver: DriverDef,
    pub scheduler: TaskSchedulerDef,
}

impl DemoConfig {
    pub fn load(path: &Path) -> RivetResult<Self> {
        let source = std::fs::read_to_string(path)?;
        let config = ron::de::from_str::<DemoConfig>(&source)
            .map_err(|e| format!("RON error in {}: {:?}", path.display(), e))?;
        Ok(config)
    }

    /// Load the config file if one was given, then apply command line overrides
    pub fn from_args(args: &DemoArgs) -> RivetResult<Self> {
        let mut config = match &args.config {
            Some(path) => DemoConfig::load(path)?,
            None => DemoConfig::default(),
        };

        if let Some(workers) = args.workers {
            config.scheduler.worker_count = Some(workers);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = ron::de::from_str::<DemoConfig>(
            "(driver: (gc_frequency_frames: 4), scheduler: (worker_count: Some(2)))",
        )
        .unwrap();

        assert_eq!(config.driver.gc_frequency_frames, 4);
        assert_eq!(
            config.driver.cache_time_to_keep_frames,
            DriverDef::default().cache_time_to_keep_frames
        );
        assert_eq!(config.scheduler.worker_count, Some(2));
        assert_eq!(config.scheduler.idle_sleep_micros, 200);
    }

    #[test]
    fn test_cli_overrides_config() {
        let args = DemoArgs::from_iter(&["demo", "--workers", "3", "--frames", "10"]);
        assert_eq!(args.frames, 10);
        assert_eq!(args.producers, 4);

        let config = DemoConfig::from_args(&args).unwrap();
        assert_eq!(config.scheduler.worker_count, Some(3));
    }

    #[test]
    fn test_missing_config_file_is_an_error() {
        let args = DemoArgs::from_iter(&["demo", "--config", "does/not/exist.ron"]);
        assert!(DemoConfig::from_args(&args).is_err());
    }
}
