use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use arc_swap::ArcSwap;
use notify::{watcher, DebouncedEvent, RecursiveMode, Watcher};

use common::*;

use crate::config::Config;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parsing(#[from] ron::de::Error),

    #[error("Failed to watch config file: {0}")]
    Notify(#[from] notify::Error),

    #[error("Path is not a file")]
    NotAFile,
}

type ConfigResult<T> = std::result::Result<T, ConfigError>;

pub enum ConfigType<'a> {
    String(&'a str),
    WatchedFile(&'a Path),
}

lazy_static! {
    /// Defaults until [init] swaps in a loaded config
    static ref CONFIG: ArcSwap<Config> = ArcSwap::from_pointee(Config::default());
}

/// Optional, [get] falls back to defaults if never called
pub fn init(cfg: ConfigType) -> ConfigResult<()> {
    // parse config and fail early
    let config = cfg.load()?;
    CONFIG.store(Arc::new(config));

    // watch directory for changes if requested
    if let ConfigType::WatchedFile(path) = cfg {
        let path = path.to_owned();
        let watch_dir = path.parent().ok_or(ConfigError::NotAFile)?.to_owned();
        let watch_file = path.file_name().ok_or(ConfigError::NotAFile)?.to_owned();

        let (tx, rx) = channel();
        let mut watcher = watcher(tx, Duration::from_secs(1)).map_err(ConfigError::Notify)?;
        watcher
            .watch(watch_dir, RecursiveMode::NonRecursive)
            .map_err(ConfigError::Notify)?;

        // start watcher thread
        thread::Builder::new()
            .name("cfg-watcher".to_owned())
            .spawn(move || {
                let _watcher = watcher; // keep alive
                let is_config =
                    |p: &PathBuf| p.file_name().map(|f| f == watch_file).unwrap_or(false);

                loop {
                    let reload = match rx.recv() {
                        Ok(e) => match e {
                            DebouncedEvent::Write(ref p) if is_config(p) => true,
                            DebouncedEvent::Remove(ref p) if is_config(p) => {
                                warn!("config was deleted");
                                true
                            }
                            DebouncedEvent::Rename(ref a, ref b)
                                if is_config(a) || is_config(b) =>
                            {
                                warn!("config was renamed");
                                true
                            }
                            _ => false,
                        },
                        Err(e) => {
                            warn!("error while watching config"; "error" => %e);
                            continue;
                        }
                    };

                    if reload {
                        info!("config was modified, reloading");

                        match ConfigType::WatchedFile(&path).load() {
                            Ok(config) => {
                                let old = CONFIG.swap(Arc::new(config));
                                debug!("swapped config instance"; "old" => ?Arc::as_ptr(&old));
                            }
                            Err(e) => {
                                warn!("failed to reload config"; "error" => %e);
                            }
                        }
                    }
                }
            })
            .expect("failed to spawn config watcher thread");
    }

    Ok(())
}

pub fn get() -> Arc<Config> {
    CONFIG.load_full()
}

impl ConfigType<'_> {
    fn load(&self) -> ConfigResult<Config> {
        let text: Cow<str> = match self {
            ConfigType::String(s) => Cow::Borrowed(*s),
            ConfigType::WatchedFile(path) => {
                if !path.is_file() {
                    return Err(ConfigError::NotAFile);
                }
                Cow::Owned(std::fs::read_to_string(path)?)
            }
        };

        let config = ron::from_str(&text)?;
        Ok(config)
    }
}
