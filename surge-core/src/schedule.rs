use crate::Stage;
use std::time::Duration;

/// Piecewise-linear arrival-rate schedule.
///
/// Each stage ramps linearly from the previous target (or `start_rate` for the first stage) to
/// its own target over its duration. Rates are expressed per `time_unit` and converted to
/// iterations per second by [`RampingSchedule::rate_at`].
#[derive(Clone, Debug, PartialEq)]
pub struct RampingSchedule {
    start_rate: f64,
    time_unit: Duration,
    stages: Vec<Stage>,
}

impl RampingSchedule {
    pub fn new(start_rate: u32, time_unit: Duration, stages: &[Stage]) -> Self {
        Self {
            start_rate: start_rate as f64,
            time_unit,
            stages: stages.to_vec(),
        }
    }

    pub fn total_duration(&self) -> Duration {
        self.stages.iter().map(|s| s.duration).sum()
    }

    /// Iterations per second the schedule asks for at `elapsed` since scenario start.
    pub fn rate_at(&self, elapsed: Duration) -> f64 {
        self.units_at(elapsed) / self.time_unit.as_secs_f64()
    }

    /// Iterations the schedule asks for between scenario start and `elapsed`.
    pub fn iterations_until(&self, elapsed: Duration) -> f64 {
        let mut from = self.start_rate;
        let mut stage_start = Duration::ZERO;
        let mut units = 0.;

        for stage in &self.stages {
            if elapsed <= stage_start {
                break;
            }
            let to = stage.target as f64;
            let span = (elapsed.min(stage_start + stage.duration) - stage_start).as_secs_f64();
            let reached = if stage.duration.is_zero() {
                to
            } else {
                from + (to - from) * span / stage.duration.as_secs_f64()
            };
            units += (from + reached) / 2. * span;

            from = to;
            stage_start += stage.duration;
        }

        if elapsed > stage_start {
            units += from * (elapsed - stage_start).as_secs_f64();
        }

        units / self.time_unit.as_secs_f64()
    }

    fn units_at(&self, elapsed: Duration) -> f64 {
        let mut from = self.start_rate;
        let mut stage_start = Duration::ZERO;

        for stage in &self.stages {
            let stage_end = stage_start + stage.duration;
            let to = stage.target as f64;

            if elapsed < stage_end {
                if stage.duration.is_zero() {
                    return to;
                }
                let progress =
                    (elapsed - stage_start).as_secs_f64() / stage.duration.as_secs_f64();
                return from + (to - from) * progress;
            }

            from = to;
            stage_start = stage_end;
        }

        from
    }
}
