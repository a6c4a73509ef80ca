use simplelog::{
    ColorChoice, CombinedLogger, Config, LevelFilter, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};
use std::fs::File;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("cannot create log file {path}: {source}")]
    File {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("a logger is already installed")]
    AlreadyInstalled,
}

/// 0 = warnings, 1 = info, 2 = debug, 3 and above = trace
pub fn level_for(verbosity: u8) -> LevelFilter {
    match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Terminal logger on stderr at the verbosity level; with `log_file`, everything from
/// debug up is also written to that file.
pub fn init_logger(verbosity: u8, log_file: Option<&str>) -> Result<(), LoggerError> {
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level_for(verbosity),
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    )];
    if let Some(path) = log_file {
        let file = File::create(path).map_err(|source| LoggerError::File {
            path: path.to_string(),
            source,
        })?;
        loggers.push(WriteLogger::new(LevelFilter::Debug, Config::default(), file));
    }
    CombinedLogger::init(loggers).map_err(|_| LoggerError::AlreadyInstalled)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels() {
        assert_eq!(level_for(0), LevelFilter::Warn);
        assert_eq!(level_for(1), LevelFilter::Info);
        assert_eq!(level_for(2), LevelFilter::Debug);
        assert_eq!(level_for(7), LevelFilter::Trace);
    }

    #[test]
    fn test_unwritable_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing_dir").join("run.log");
        let err = init_logger(0, path.to_str()).unwrap_err();
        assert!(matches!(err, LoggerError::File { .. }));
    }
}
