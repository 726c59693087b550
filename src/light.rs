use crate::TrafficLightId;
use std::collections::HashMap;
use std::fmt;

pub use timing::{load_timing_file, parse_timing_table};

mod timing;

/// The signal heads known to the simulation, keyed by ID.
pub type TrafficLightSet = HashMap<TrafficLightId, TrafficLight>;

/// A fixed-cycle traffic light.
///
/// The phase cycle is red, then green, then amber, then red again.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrafficLight {
    /// The signal ID.
    id: TrafficLightId,
    /// The position of the stop line along the route, in m.
    position: f64,
    /// The duration of the red phase in s.
    red_duration: f64,
    /// The duration of the green phase in s.
    green_duration: f64,
    /// The duration of the amber phase in s.
    amber_duration: f64,
    /// Whether a fresh signal starts on red. Carried from the timing table
    /// for reporting only: the phase always comes from the host.
    starts_on_red: bool,
    /// The most recently observed phase.
    state: LightState,
    /// The simulation time at which the current phase started, in s.
    state_start_time: f64,
}

/// The phase of a traffic light.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LightState {
    /// No signal has been observed yet.
    #[default]
    NoSignal,
    Red,
    Amber,
    Green,
}

impl LightState {
    /// Maps the phase code sent by the host.
    pub fn from_code(code: i64) -> Self {
        match code {
            1 => Self::Red,
            2 => Self::Amber,
            3 => Self::Green,
            _ => Self::NoSignal,
        }
    }
}

impl TrafficLight {
    /// Creates a traffic light which starts on red.
    pub fn new(
        id: TrafficLightId,
        position: f64,
        red_duration: f64,
        green_duration: f64,
        amber_duration: f64,
    ) -> Self {
        Self {
            id,
            position,
            red_duration,
            green_duration,
            amber_duration,
            starts_on_red: true,
            state: LightState::NoSignal,
            state_start_time: 0.0,
        }
    }

    /// Creates a signal the host reports but which has no timing data.
    pub fn unconfigured(id: TrafficLightId) -> Self {
        Self::new(id, 0.0, 0.0, 0.0, 0.0)
    }

    /// Sets which phase a fresh signal starts in. Timing queries don't read
    /// this; they use the phase last reported by the host.
    pub fn with_starts_on_red(mut self, starts_on_red: bool) -> Self {
        self.starts_on_red = starts_on_red;
        self
    }

    pub fn id(&self) -> TrafficLightId {
        self.id
    }

    /// The position of the stop line along the route, in m.
    pub fn position(&self) -> f64 {
        self.position
    }

    pub fn red_duration(&self) -> f64 {
        self.red_duration
    }

    pub fn green_duration(&self) -> f64 {
        self.green_duration
    }

    pub fn amber_duration(&self) -> f64 {
        self.amber_duration
    }

    pub fn starts_on_red(&self) -> bool {
        self.starts_on_red
    }

    /// The most recently observed phase.
    pub fn state(&self) -> LightState {
        self.state
    }

    pub fn state_start_time(&self) -> f64 {
        self.state_start_time
    }

    /// Records the current phase. Repeated calls within a step overwrite.
    pub fn set_state(&mut self, state: LightState) {
        self.state = state;
    }

    /// Records when the current phase started. Repeated calls within a step overwrite.
    pub fn set_state_start_time(&mut self, time: f64) {
        self.state_start_time = time;
    }

    /// The time at which the signal next turns red.
    pub fn time_of_next_red(&self) -> f64 {
        let (r, g, a) = self.durations();
        self.offset_from_start(r + g + a, a, g + a)
    }

    /// The time at which the signal next turns green.
    pub fn time_of_next_green(&self) -> f64 {
        let (r, g, a) = self.durations();
        self.offset_from_start(r, a + r, g + a + r)
    }

    /// The time at which the signal last turned red.
    pub fn time_of_last_red(&self) -> f64 {
        let (r, g, _) = self.durations();
        self.offset_from_start(0.0, -g - r, -r)
    }

    /// The time at which the signal last turned green.
    pub fn time_of_last_green(&self) -> f64 {
        let (_, g, a) = self.durations();
        self.offset_from_start(-a - g, -g, 0.0)
    }

    /// The time at which the signal last turned amber.
    pub fn time_of_last_amber(&self) -> f64 {
        let (r, _, a) = self.durations();
        self.offset_from_start(-a, 0.0, -r - a)
    }

    fn durations(&self) -> (f64, f64, f64) {
        (self.red_duration, self.green_duration, self.amber_duration)
    }

    /// Adds the offset for the current phase to the phase start time.
    /// Before any phase has been observed the result is zero.
    fn offset_from_start(&self, if_red: f64, if_amber: f64, if_green: f64) -> f64 {
        let offset = match self.state {
            LightState::Red => if_red,
            LightState::Amber => if_amber,
            LightState::Green => if_green,
            LightState::NoSignal => return 0.0,
        };
        self.state_start_time + offset
    }
}

impl fmt::Display for TrafficLight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "id: {}, position: {}, red duration: {}, green duration: {}, amber duration: {}",
            self.id, self.position, self.red_duration, self.green_duration, self.amber_duration
        )
    }
}

/// The distance from a light to the one following it on the route (ID + 1),
/// if there is such a light.
pub(crate) fn distance_to_following(lights: &TrafficLightSet, light: &TrafficLight) -> Option<f64> {
    lights
        .get(&(light.id() + 1))
        .map(|next| next.position() - light.position())
}
