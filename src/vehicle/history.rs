//! Per-step records of an ego vehicle and the trajectory log they are written to.

use super::ego::LaneChangeState;
use crate::error::{Error, Result};
use crate::lane::RelativeLane;
use crate::VehicleId;
use itertools::Itertools;
use std::fmt::Display;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// The columns of a trajectory log, in order.
const COLUMNS: [&str; 13] = [
    "time",
    "lane",
    "link",
    "lat. pos.",
    "pref. rel. lane",
    "vel.",
    "accel.",
    "des. accel.",
    "host accel.",
    "lc direction",
    "lane end dist",
    "leader id",
    "state",
];

/// Everything observed about or decided by an ego vehicle during one step.
/// Fields the host didn't send this step are `None`.
#[derive(Clone, Debug, Default)]
pub(crate) struct StepRecord {
    pub lane: Option<i64>,
    pub link: Option<i64>,
    pub lateral_position: Option<f64>,
    pub preferred_lane: Option<RelativeLane>,
    pub velocity: Option<f64>,
    pub acceleration: Option<f64>,
    pub desired_acceleration: Option<f64>,
    pub host_acceleration: Option<f64>,
    pub lane_change_direction: Option<RelativeLane>,
    pub lane_end_distance: Option<f64>,
    pub leader_id: Option<VehicleId>,
    pub state: Option<LaneChangeState>,
}

impl StepRecord {
    /// Fills in the fields missing from `self` with those of `older`.
    fn or(self, older: &StepRecord) -> StepRecord {
        StepRecord {
            lane: self.lane.or(older.lane),
            link: self.link.or(older.link),
            lateral_position: self.lateral_position.or(older.lateral_position),
            preferred_lane: self.preferred_lane.or(older.preferred_lane),
            velocity: self.velocity.or(older.velocity),
            acceleration: self.acceleration.or(older.acceleration),
            desired_acceleration: self.desired_acceleration.or(older.desired_acceleration),
            host_acceleration: self.host_acceleration.or(older.host_acceleration),
            lane_change_direction: self.lane_change_direction.or(older.lane_change_direction),
            lane_end_distance: self.lane_end_distance.or(older.lane_end_distance),
            leader_id: self.leader_id.or(older.leader_id),
            state: self.state.or(older.state),
        }
    }

    /// The cells of a log row after the time column, paired with their column names.
    fn cells(&self) -> [(&'static str, Option<String>); 12] {
        fn cell<T: Display>(value: Option<T>) -> Option<String> {
            value.map(|v| v.to_string())
        }
        [
            (COLUMNS[1], cell(self.lane)),
            (COLUMNS[2], cell(self.link)),
            (COLUMNS[3], cell(self.lateral_position)),
            (COLUMNS[4], cell(self.preferred_lane)),
            (COLUMNS[5], cell(self.velocity)),
            (COLUMNS[6], cell(self.acceleration)),
            (COLUMNS[7], cell(self.desired_acceleration)),
            (COLUMNS[8], cell(self.host_acceleration)),
            (COLUMNS[9], cell(self.lane_change_direction)),
            (COLUMNS[10], cell(self.lane_end_distance)),
            (COLUMNS[11], cell(self.leader_id)),
            (COLUMNS[12], cell(self.state)),
        ]
    }
}

/// A bounded history: the step in progress plus the latest known value of each field.
#[derive(Debug)]
pub(crate) struct History {
    /// The step in progress.
    current: StepRecord,
    /// The latest value of every field from completed steps.
    previous: StepRecord,
    /// The number of steps begun.
    samples: usize,
    /// Where completed steps are written, if anywhere.
    log: Option<TrajectoryLog>,
}

impl History {
    pub fn new(log: Option<TrajectoryLog>) -> Self {
        Self {
            current: StepRecord::default(),
            previous: StepRecord::default(),
            samples: 0,
            log,
        }
    }

    /// The number of steps begun so far.
    pub fn samples(&self) -> usize {
        self.samples
    }

    pub fn current_mut(&mut self) -> &mut StepRecord {
        &mut self.current
    }

    /// Reads a field from the step in progress, falling back to the latest completed value.
    pub fn latest<T>(&self, field: impl Fn(&StepRecord) -> Option<T>) -> Option<T> {
        field(&self.current).or_else(|| field(&self.previous))
    }

    /// Reads a field from the step in progress only.
    pub fn current<T>(&self, field: impl Fn(&StepRecord) -> Option<T>) -> Option<T> {
        field(&self.current)
    }

    /// Completes the step in progress, stamped with `time`, and begins a new one.
    pub fn begin_step(&mut self, time: f64) {
        if self.samples > 0 {
            self.complete_step(time);
        }
        self.samples += 1;
    }

    /// Completes the step in progress and closes the log.
    pub fn finish(&mut self, time: f64) {
        if self.samples > 0 {
            self.complete_step(time);
        }
        if let Some(log) = self.log.take() {
            let path = log.path.clone();
            if let Err(err) = log.finish() {
                log::warn!("Unable to finish trajectory log {}: {}", path.display(), err);
            }
        }
    }

    fn complete_step(&mut self, time: f64) {
        let record = std::mem::take(&mut self.current);
        if let Some(log) = &mut self.log {
            if let Err(err) = log.write(time, &record) {
                log::warn!("Unable to write trajectory log {}: {}", log.path.display(), err);
                self.log = None;
            }
        }
        self.previous = record.or(&self.previous);
    }
}

/// A text log of one ego vehicle's trajectory, written one step at a time.
#[derive(Debug)]
pub(crate) struct TrajectoryLog {
    id: VehicleId,
    path: PathBuf,
    writer: BufWriter<File>,
    rows: usize,
}

impl TrajectoryLog {
    /// Creates `vehicle<id>.txt` in `dir` and writes the header.
    pub fn create(dir: &Path, id: VehicleId) -> Result<Self> {
        let path = dir.join(format!("vehicle{}.txt", id));
        let io_err = |source| Error::Io {
            path: path.clone(),
            source,
        };
        let file = File::create(&path).map_err(io_err)?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "{}", COLUMNS.iter().join(", ")).map_err(io_err)?;
        Ok(Self {
            id,
            path,
            writer,
            rows: 0,
        })
    }

    fn write(&mut self, time: f64, record: &StepRecord) -> std::io::Result<()> {
        let cells = record.cells();
        let missing = cells.iter().filter(|(_, cell)| cell.is_none()).map(|(name, _)| name).join(", ");
        if !missing.is_empty() {
            log::warn!("Vehicle {} at t={}: no sample for {}", self.id, time, missing);
        }
        let row = std::iter::once(time.to_string())
            .chain(cells.into_iter().map(|(_, cell)| cell.unwrap_or_default()))
            .join(", ");
        writeln!(self.writer, "{}", row)?;
        self.rows += 1;
        Ok(())
    }

    fn finish(mut self) -> std::io::Result<()> {
        writeln!(self.writer, "samples: {}", self.rows)?;
        self.writer.flush()
    }
}
