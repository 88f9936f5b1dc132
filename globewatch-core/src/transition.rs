use crate::camera::CameraState;

pub const TRANSITION_DURATION_SECS: f64 = 2.0;
pub const TRANSITION_STEPS: u32 = 60;

pub fn ease_out_cubic(t: f64) -> f64 {
    let t = if t.is_nan() { 1.0 } else { t.clamp(0.0, 1.0) };
    1.0 - (1.0 - t).powi(3)
}

/// Eased camera flight from `start` to `target` in a fixed number of steps.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    start: CameraState,
    target: CameraState,
    current: CameraState,
    steps: u32,
    current_step: u32,
    step_interval: f64,
    accumulator: f64,
}

impl Transition {
    pub fn new(start: CameraState, target: CameraState) -> Self {
        Self::with_timing(start, target, TRANSITION_DURATION_SECS, TRANSITION_STEPS)
    }

    pub fn with_timing(
        start: CameraState,
        target: CameraState,
        duration_secs: f64,
        steps: u32,
    ) -> Self {
        let steps = steps.max(1);
        let duration_secs = if duration_secs.is_finite() {
            duration_secs.max(0.0)
        } else {
            TRANSITION_DURATION_SECS
        };
        Self {
            start,
            target,
            current: start,
            steps,
            current_step: 0,
            step_interval: duration_secs / steps as f64,
            accumulator: 0.0,
        }
    }

    pub fn start(&self) -> CameraState {
        self.start
    }

    pub fn target(&self) -> CameraState {
        self.target
    }

    pub fn current(&self) -> CameraState {
        self.current
    }

    pub fn steps(&self) -> u32 {
        self.steps
    }

    pub fn current_step(&self) -> u32 {
        self.current_step
    }

    pub fn progress(&self) -> f64 {
        self.current_step as f64 / self.steps as f64
    }

    pub fn is_complete(&self) -> bool {
        self.current_step >= self.steps
    }

    pub fn step(&mut self) -> CameraState {
        if self.is_complete() {
            return self.current;
        }

        self.current_step += 1;
        self.current = if self.is_complete() {
            self.target
        } else {
            self.start.lerp(&self.target, ease_out_cubic(self.progress()))
        };
        self.current
    }

    /// Consumes elapsed seconds in whole steps; leftover time carries over.
    pub fn advance(&mut self, delta_secs: f64) -> CameraState {
        if self.step_interval <= 0.0 {
            while !self.is_complete() {
                self.step();
            }
            return self.current;
        }

        if delta_secs.is_finite() && delta_secs > 0.0 {
            self.accumulator += delta_secs;
        }
        while self.accumulator >= self.step_interval && !self.is_complete() {
            self.accumulator -= self.step_interval;
            self.step();
        }
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinates::Rotation;
    use proptest::prelude::*;

    fn flight() -> Transition {
        Transition::new(
            CameraState::new(Rotation::new(-15.0, 0.0), 1.0),
            CameraState::new(Rotation::new(25.0, 145.2708), 4.5),
        )
    }

    #[test]
    fn ease_out_cubic_endpoints() {
        assert_eq!(ease_out_cubic(0.0), 0.0);
        assert_eq!(ease_out_cubic(1.0), 1.0);
        assert!((ease_out_cubic(0.5) - 0.875).abs() < 1e-12);
        assert_eq!(ease_out_cubic(-3.0), 0.0);
        assert_eq!(ease_out_cubic(7.0), 1.0);
    }

    #[test]
    fn ease_out_decelerates() {
        let early = ease_out_cubic(0.1) - ease_out_cubic(0.0);
        let late = ease_out_cubic(1.0) - ease_out_cubic(0.9);
        assert!(early > late);
    }

    #[test]
    fn reaches_target_exactly_after_fixed_steps() {
        let mut transition = flight();
        for _ in 0..TRANSITION_STEPS - 1 {
            transition.step();
            assert!(!transition.is_complete());
        }
        let last = transition.step();
        assert!(transition.is_complete());
        assert_eq!(last, transition.target());
        assert_eq!(transition.step(), transition.target());
        assert_eq!(transition.current_step(), TRANSITION_STEPS);
    }

    #[test]
    fn advance_uses_fixed_step_interval() {
        let mut transition = flight();
        let interval = TRANSITION_DURATION_SECS / TRANSITION_STEPS as f64;

        transition.advance(interval * 0.5);
        assert_eq!(transition.current_step(), 0);
        transition.advance(interval * 0.6);
        assert_eq!(transition.current_step(), 1);
        transition.advance(interval * 10.0);
        assert_eq!(transition.current_step(), 11);

        transition.advance(TRANSITION_DURATION_SECS * 2.0);
        assert!(transition.is_complete());
        assert_eq!(transition.current(), transition.target());
    }

    #[test]
    fn zero_duration_completes_on_first_advance() {
        let mut transition = Transition::with_timing(
            CameraState::default(),
            CameraState::new(Rotation::new(10.0, 10.0), 2.0),
            0.0,
            60,
        );
        transition.advance(0.0);
        assert!(transition.is_complete());
    }

    #[test]
    fn zero_steps_is_treated_as_one() {
        let mut transition =
            Transition::with_timing(CameraState::default(), CameraState::default(), 1.0, 0);
        assert_eq!(transition.steps(), 1);
        transition.step();
        assert!(transition.is_complete());
    }

    proptest! {
        #[test]
        fn always_terminates_at_target(
            deltas in proptest::collection::vec(0.0f64..0.5, 1..400),
            pitch in -80.0f64..80.0,
            yaw in -540.0f64..540.0,
            zoom in 0.4f64..8.0,
        ) {
            let target = CameraState::new(Rotation::new(pitch, yaw), zoom);
            let mut transition = Transition::new(CameraState::default(), target);
            for delta in deltas {
                transition.advance(delta);
            }
            for _ in 0..TRANSITION_STEPS {
                transition.step();
            }
            prop_assert!(transition.is_complete());
            prop_assert_eq!(transition.current(), target);
        }
    }
}
