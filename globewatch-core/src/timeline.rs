//! Day-by-day displacement series with play/pause stepping.

use serde::{Deserialize, Serialize};

pub const PLAYBACK_SPEEDS: [f64; 4] = [0.5, 1.0, 2.0, 4.0];
const DEFAULT_SPEED_INDEX: usize = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelinePoint {
    /// ISO date, `YYYY-MM-DD`.
    pub date: String,
    pub label: String,
    pub displaced: u64,
    pub event: String,
    pub projected: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DisplacementTimeline {
    points: Vec<TimelinePoint>,
    index: usize,
    playing: bool,
    speed_index: usize,
    elapsed: f64,
}

impl Default for DisplacementTimeline {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl DisplacementTimeline {
    /// Starts paused on the latest observed point.
    pub fn new(points: Vec<TimelinePoint>) -> Self {
        let mut timeline = Self {
            points,
            index: 0,
            playing: false,
            speed_index: DEFAULT_SPEED_INDEX,
            elapsed: 0.0,
        };
        timeline.index = timeline.today_index();
        timeline
    }

    pub fn points(&self) -> &[TimelinePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current(&self) -> Option<&TimelinePoint> {
        self.points.get(self.index)
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn speed(&self) -> f64 {
        PLAYBACK_SPEEDS[self.speed_index]
    }

    /// Seconds between steps at the current speed.
    pub fn step_interval(&self) -> f64 {
        1.0 / self.speed()
    }

    /// Last point that is not a projection.
    pub fn today_index(&self) -> usize {
        self.points
            .iter()
            .rposition(|point| !point.projected)
            .unwrap_or(0)
    }

    pub fn seek(&mut self, index: usize) {
        self.index = index.min(self.points.len().saturating_sub(1));
        self.elapsed = 0.0;
    }

    /// Plays or pauses; playing from the last point starts over. Returns
    /// whether playback is now running.
    pub fn toggle_playback(&mut self) -> bool {
        if self.points.len() < 2 {
            self.playing = false;
            return false;
        }
        self.playing = !self.playing;
        self.elapsed = 0.0;
        if self.playing && self.index + 1 >= self.points.len() {
            self.index = 0;
        }
        self.playing
    }

    pub fn cycle_speed(&mut self) -> f64 {
        self.speed_index = (self.speed_index + 1) % PLAYBACK_SPEEDS.len();
        self.speed()
    }

    /// Steps one point per interval while playing and stops on the tick
    /// after the last point.
    pub fn advance(&mut self, delta_secs: f64) {
        if !self.playing || !delta_secs.is_finite() || delta_secs <= 0.0 {
            return;
        }
        self.elapsed += delta_secs;
        let interval = self.step_interval();
        while self.elapsed >= interval {
            self.elapsed -= interval;
            if self.index + 1 >= self.points.len() {
                self.playing = false;
                self.elapsed = 0.0;
                return;
            }
            self.index += 1;
        }
    }

    /// Position of the current point along the series, `[0, 1]`.
    pub fn progress(&self) -> f64 {
        match self.points.len() {
            0 | 1 => 0.0,
            len => self.index as f64 / (len - 1) as f64,
        }
    }

    pub fn max_displaced(&self) -> u64 {
        self.points
            .iter()
            .map(|point| point.displaced)
            .max()
            .unwrap_or(0)
    }

    pub fn reset(&mut self) {
        self.playing = false;
        self.elapsed = 0.0;
        self.speed_index = DEFAULT_SPEED_INDEX;
        self.index = self.today_index();
    }
}
