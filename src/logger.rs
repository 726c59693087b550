use crate::error::{Error, Result};
use chrono::Local;
use log::{LevelFilter, Log, Metadata, Record};
use once_cell::sync::OnceCell;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

const START_OF_LOG: &str = "------- Start of log -------";
const END_OF_LOG: &str = "-------- End of log --------";
const DATE_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

static LOGGER: OnceCell<SimulationLogger> = OnceCell::new();

/// Where and how much the simulation logs.
#[derive(Clone, Debug)]
pub struct LoggerConfig {
    /// The log of this run, overwritten by every run.
    pub run_log: PathBuf,
    /// A log that every run appends its start and end time to.
    pub persistent_log: PathBuf,
    pub level: LevelFilter,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            run_log: PathBuf::from("driver_model_log.txt"),
            persistent_log: PathBuf::from("driver_model_persistent_log.txt"),
            level: LevelFilter::Info,
        }
    }
}

/// A [Log] backend writing to a run log and a persistent log.
#[derive(Debug)]
pub struct SimulationLogger {
    run: Mutex<Option<BufWriter<File>>>,
    persistent_log: PathBuf,
    level: LevelFilter,
}

impl SimulationLogger {
    /// Opens the logs and marks the start of the run.
    pub fn open(config: &LoggerConfig) -> Result<Self> {
        let io_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source: std::io::Error| Error::Io { path, source }
        };
        let file = File::create(&config.run_log).map_err(io_err(&config.run_log))?;
        let mut run = BufWriter::new(file);
        writeln!(run, "{}", START_OF_LOG).map_err(io_err(&config.run_log))?;
        append_line(
            &config.persistent_log,
            &format!("Simulation started on: {}", local_date()),
        )
        .map_err(io_err(&config.persistent_log))?;
        Ok(Self {
            run: Mutex::new(Some(run)),
            persistent_log: config.persistent_log.clone(),
            level: config.level,
        })
    }

    /// Opens the logs and makes this the process wide logger.
    pub fn install(config: &LoggerConfig) -> Result<&'static SimulationLogger> {
        if LOGGER.get().is_some() {
            return Err(Error::LoggerAlreadySet);
        }
        LOGGER
            .set(Self::open(config)?)
            .map_err(|_| Error::LoggerAlreadySet)?;
        let logger = LOGGER.get().ok_or(Error::LoggerAlreadySet)?;
        log::set_logger(logger).map_err(|_| Error::LoggerAlreadySet)?;
        log::set_max_level(logger.level);
        Ok(logger)
    }

    /// The installed logger, if any.
    pub fn installed() -> Option<&'static SimulationLogger> {
        LOGGER.get()
    }

    /// Marks the end of the run and closes the run log. Later records are dropped.
    pub fn finish(&self) {
        let run = self.run.lock().ok().and_then(|mut run| run.take());
        if let Some(mut run) = run {
            let _ = writeln!(run, "{}", END_OF_LOG);
            let _ = run.flush();
            let _ = append_line(
                &self.persistent_log,
                &format!("Simulation ended on: {}", local_date()),
            );
        }
    }
}

impl Log for SimulationLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if let Ok(mut run) = self.run.lock() {
            if let Some(run) = run.as_mut() {
                let _ = writeln!(run, "[{}] {}", record.level(), record.args());
            }
        }
    }

    fn flush(&self) {
        if let Ok(mut run) = self.run.lock() {
            if let Some(run) = run.as_mut() {
                let _ = run.flush();
            }
        }
    }
}

fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", line)
}

/// The local date and time in `ctime` form, e.g. `Mon Oct 19 14:03:27 2026`.
fn local_date() -> String {
    Local::now().format(DATE_FORMAT).to_string()
}

#[cfg(test)]
mod test {
    use super::*;
    use log::Level;

    #[test]
    fn frames_the_run_log() {
        let dir = std::env::temp_dir().join(format!("tl-logger-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let config = LoggerConfig {
            run_log: dir.join("run.txt"),
            persistent_log: dir.join("persistent.txt"),
            level: LevelFilter::Info,
        };

        let logger = SimulationLogger::open(&config).unwrap();
        logger.log(
            &Record::builder()
                .level(Level::Warn)
                .args(format_args!("Veh 3: something odd"))
                .build(),
        );
        logger.log(
            &Record::builder()
                .level(Level::Debug)
                .args(format_args!("too chatty"))
                .build(),
        );
        logger.finish();
        logger.finish();

        let run = std::fs::read_to_string(&config.run_log).unwrap();
        assert_eq!(
            run.lines().collect::<Vec<_>>(),
            vec![START_OF_LOG, "[WARN] Veh 3: something odd", END_OF_LOG]
        );

        SimulationLogger::open(&config).unwrap().finish();
        let persistent = std::fs::read_to_string(&config.persistent_log).unwrap();
        let lines: Vec<_> = persistent.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("Simulation started on: "));
        assert!(lines[3].starts_with("Simulation ended on: "));
        let date = lines[0].trim_start_matches("Simulation started on: ");
        assert!(chrono::NaiveDateTime::parse_from_str(date, DATE_FORMAT).is_ok(), "{}", date);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
