//! crates/haven_core/src/breathing.rs
//!
//! The breathing-exercise state machine. The machine is a pure transition
//! function over an explicit state value; it never sleeps or schedules
//! anything itself. An external driver (a 1 Hz ticker in the API layer, a
//! plain loop in tests) calls `tick` once per elapsed second.

/// The cycle order is fixed: inhale, hold, exhale, pause, then back to
/// inhale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Inhale,
    Hold,
    Exhale,
    Pause,
}

impl Phase {
    pub fn next(self) -> Phase {
        match self {
            Phase::Inhale => Phase::Hold,
            Phase::Hold => Phase::Exhale,
            Phase::Exhale => Phase::Pause,
            Phase::Pause => Phase::Inhale,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Inhale => "inhale",
            Phase::Hold => "hold",
            Phase::Exhale => "exhale",
            Phase::Pause => "pause",
        }
    }

    /// On-screen instruction for the phase, without the running count.
    pub fn instruction(self) -> &'static str {
        match self {
            Phase::Inhale => "Breathe in slowly...",
            Phase::Hold => "Hold your breath...",
            Phase::Exhale => "Breathe out gently...",
            Phase::Pause => "Rest...",
        }
    }
}

/// Raised when a session is started with an exercise id that is not in the
/// catalog. Silently defaulting would desynchronize the displayed
/// instructions from the actual timing, so this fails fast instead.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("unknown breathing exercise '{0}'")]
    UnknownExercise(String),
}

/// Static description of one breathing exercise: per-phase durations in
/// seconds plus the catalog metadata shown on the selection screen.
#[derive(Debug)]
pub struct ExerciseProfile {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub duration_label: &'static str,
    pub difficulty: &'static str,
    pub inhale: u32,
    pub hold: u32,
    pub exhale: u32,
    pub pause: u32,
}

impl ExerciseProfile {
    pub fn duration_of(&self, phase: Phase) -> u32 {
        match phase {
            Phase::Inhale => self.inhale,
            Phase::Hold => self.hold,
            Phase::Exhale => self.exhale,
            Phase::Pause => self.pause,
        }
    }
}

pub const DEFAULT_TOTAL_CYCLES: u32 = 5;

/// The exercise catalog.
pub static EXERCISES: [ExerciseProfile; 3] = [
    ExerciseProfile {
        id: "box-breathing",
        title: "4-4-4-4 Box Breathing",
        description: "Inhale 4, hold 4, exhale 4, pause 4",
        duration_label: "5 minutes",
        difficulty: "Beginner",
        inhale: 4,
        hold: 4,
        exhale: 4,
        pause: 4,
    },
    ExerciseProfile {
        id: "calming-breath",
        title: "4-7-8 Calming Breath",
        description: "Inhale 4, hold 7, exhale 8",
        duration_label: "3 minutes",
        difficulty: "Intermediate",
        inhale: 4,
        hold: 7,
        exhale: 8,
        pause: 2,
    },
    ExerciseProfile {
        id: "grounding",
        title: "5-4-3-2-1 Grounding",
        description: "Mindfulness technique using your senses",
        duration_label: "5 minutes",
        difficulty: "Beginner",
        inhale: 4,
        hold: 7,
        exhale: 8,
        pause: 2,
    },
];

/// Looks up an exercise by id, failing fast on an unknown one.
pub fn exercise(id: &str) -> Result<&'static ExerciseProfile, ConfigurationError> {
    EXERCISES
        .iter()
        .find(|e| e.id == id)
        .ok_or_else(|| ConfigurationError::UnknownExercise(id.to_string()))
}

/// Observable state of a running session, computed fresh on every tick.
#[derive(Debug, Clone, PartialEq)]
pub struct BreathingSnapshot {
    pub exercise_id: &'static str,
    pub phase: Phase,
    pub seconds_into_phase: u32,
    pub cycle: u32,
    pub total_cycles: u32,
    /// seconds_into_phase / phase duration, clamped to [0, 1].
    pub progress: f64,
}

#[derive(Debug, Clone, Copy)]
struct RunState {
    exercise: &'static ExerciseProfile,
    phase: Phase,
    seconds_into_phase: u32,
    cycle: u32,
    total_cycles: u32,
}

impl RunState {
    /// One second elapses. The counter is incremented and compared against
    /// the phase duration with a strict "exceeds" check, so a 4-second phase
    /// displays counts 1 through 4 and the wrap lands on the next tick as
    /// the new phase's first second. A pause-to-inhale wrap advances the
    /// cycle; when the cycle would exceed the total, the session is over and
    /// `None` is returned.
    fn advance(mut self) -> Option<RunState> {
        self.seconds_into_phase += 1;
        if self.seconds_into_phase > self.exercise.duration_of(self.phase) {
            if self.phase == Phase::Pause {
                self.cycle += 1;
            }
            self.phase = self.phase.next();
            self.seconds_into_phase = 1;
        }
        if self.cycle > self.total_cycles {
            return None;
        }
        Some(self)
    }

    fn snapshot(&self) -> BreathingSnapshot {
        let duration = self.exercise.duration_of(self.phase);
        BreathingSnapshot {
            exercise_id: self.exercise.id,
            phase: self.phase,
            seconds_into_phase: self.seconds_into_phase,
            cycle: self.cycle,
            total_cycles: self.total_cycles,
            progress: (f64::from(self.seconds_into_phase) / f64::from(duration)).clamp(0.0, 1.0),
        }
    }
}

/// The session machine itself: `Idle` or `Running`. Completion collapses
/// back to `Idle`; there is no persisted history.
#[derive(Debug)]
pub struct BreathingMachine {
    run: Option<RunState>,
}

impl BreathingMachine {
    pub fn new() -> Self {
        Self { run: None }
    }

    /// Starts a session from any state, resetting to the first second of the
    /// first inhale. An unknown exercise id leaves the previous state fully
    /// intact - the lookup happens before anything is replaced.
    pub fn start(&mut self, exercise_id: &str) -> Result<(), ConfigurationError> {
        let profile = exercise(exercise_id)?;
        self.run = Some(RunState {
            exercise: profile,
            phase: Phase::Inhale,
            seconds_into_phase: 0,
            cycle: 1,
            total_cycles: DEFAULT_TOTAL_CYCLES,
        });
        Ok(())
    }

    /// Discards in-progress phase and cycle state.
    pub fn stop(&mut self) {
        self.run = None;
    }

    /// Equivalent to `stop` followed by `start`; inherits `start`'s
    /// all-or-nothing behavior on an unknown id.
    pub fn restart(&mut self, exercise_id: &str) -> Result<(), ConfigurationError> {
        self.start(exercise_id)
    }

    /// Advances one second. Returns the fresh snapshot while running, or
    /// `None` once the machine is (or just became) idle.
    pub fn tick(&mut self) -> Option<BreathingSnapshot> {
        self.run = self.run.take().and_then(RunState::advance);
        self.snapshot()
    }

    pub fn is_running(&self) -> bool {
        self.run.is_some()
    }

    pub fn snapshot(&self) -> Option<BreathingSnapshot> {
        self.run.as_ref().map(RunState::snapshot)
    }
}

impl Default for BreathingMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(id: &str) -> BreathingMachine {
        let mut machine = BreathingMachine::new();
        machine.start(id).expect("exercise should exist");
        machine
    }

    #[test]
    fn first_tick_is_the_first_second_of_inhale() {
        let mut machine = started("box-breathing");
        let snap = machine.tick().unwrap();
        assert_eq!(snap.phase, Phase::Inhale);
        assert_eq!(snap.seconds_into_phase, 1);
        assert_eq!(snap.cycle, 1);
        assert_eq!(snap.progress, 0.25);
    }

    #[test]
    fn box_breathing_full_cycle_wraps_to_inhale_of_cycle_two() {
        let mut machine = started("box-breathing");
        // 4+4+4+4 ticks cover one full cycle...
        let mut snap = None;
        for _ in 0..16 {
            snap = machine.tick();
        }
        let snap = snap.unwrap();
        assert_eq!(snap.phase, Phase::Pause);
        assert_eq!(snap.seconds_into_phase, 4);
        assert_eq!(snap.cycle, 1);

        // ...and the wrap tick is the first second of the next cycle.
        let snap = machine.tick().unwrap();
        assert_eq!(snap.phase, Phase::Inhale);
        assert_eq!(snap.seconds_into_phase, 1);
        assert_eq!(snap.cycle, 2);
    }

    #[test]
    fn calming_breath_holds_for_seven() {
        let mut machine = started("calming-breath");
        for _ in 0..4 {
            machine.tick();
        }
        // Fifth second is the first second of the hold.
        let snap = machine.tick().unwrap();
        assert_eq!(snap.phase, Phase::Hold);
        assert_eq!(snap.seconds_into_phase, 1);
        for _ in 0..6 {
            machine.tick();
        }
        let snap = machine.snapshot().unwrap();
        assert_eq!(snap.phase, Phase::Hold);
        assert_eq!(snap.seconds_into_phase, 7);
        assert_eq!(snap.progress, 1.0);
    }

    #[test]
    fn session_ends_silently_after_the_last_cycle() {
        let mut machine = started("box-breathing");
        // Each cycle takes 16 ticks; the tick after cycle 5's last pause
        // second would open cycle 6 and instead ends the session.
        let mut ticks = 0;
        while machine.is_running() {
            machine.tick();
            ticks += 1;
            assert!(ticks <= 1000, "machine never completed");
        }
        assert_eq!(ticks, 5 * 16 + 1);
        assert!(machine.snapshot().is_none());
    }

    #[test]
    fn ticking_while_idle_stays_idle() {
        let mut machine = BreathingMachine::new();
        assert!(machine.tick().is_none());
        assert!(!machine.is_running());
    }

    #[test]
    fn unknown_exercise_fails_fast_and_preserves_state() {
        let mut machine = started("box-breathing");
        for _ in 0..6 {
            machine.tick();
        }
        let before = machine.snapshot();

        let err = machine.start("nonexistent").unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::UnknownExercise("nonexistent".to_string())
        );
        assert_eq!(machine.snapshot(), before);
    }

    #[test]
    fn start_resets_a_running_session() {
        let mut machine = started("box-breathing");
        for _ in 0..10 {
            machine.tick();
        }
        machine.start("calming-breath").unwrap();
        let snap = machine.tick().unwrap();
        assert_eq!(snap.exercise_id, "calming-breath");
        assert_eq!(snap.phase, Phase::Inhale);
        assert_eq!(snap.seconds_into_phase, 1);
        assert_eq!(snap.cycle, 1);
    }

    #[test]
    fn stop_discards_progress() {
        let mut machine = started("calming-breath");
        for _ in 0..9 {
            machine.tick();
        }
        machine.stop();
        assert!(!machine.is_running());
        assert!(machine.snapshot().is_none());
    }
}
