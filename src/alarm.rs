// alarm.rs

use std::io::{self, Write};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Audio output for the reminder alarm.
pub trait Sound {
    /// Starts the primary alarm sound. An error means the caller should fall back to beeps.
    fn start(&mut self) -> io::Result<()>;
    /// Silences the primary sound.
    fn stop(&mut self);
    /// One short fallback tone.
    fn beep(&mut self);
    /// True once the primary sound has died on its own with an error.
    fn failed(&mut self) -> bool {
        false
    }
}

/// Plays the alarm through an external player (`paplay`, `afplay`, ...)
/// and falls back to the terminal bell.
#[derive(Default)]
pub struct CommandSound {
    command: Option<Vec<String>>,
    child: Option<Child>,
}

impl CommandSound {
    pub fn new(command: Option<Vec<String>>) -> Self {
        Self {
            command: command.filter(|c| !c.is_empty()),
            child: None,
        }
    }
}

impl Sound for CommandSound {
    fn start(&mut self) -> io::Result<()> {
        self.stop();
        let (program, args) = self
            .command
            .as_ref()
            .and_then(|c| c.split_first())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no alarm command configured"))?;
        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        self.child = Some(child);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }

    fn beep(&mut self) {
        let mut out = io::stdout();
        let _ = out.write_all(b"\x07");
        let _ = out.flush();
    }

    fn failed(&mut self) -> bool {
        match self.child.as_mut().map(|c| c.try_wait()) {
            Some(Ok(Some(status))) if !status.success() => {
                warn!(%status, "alarm player exited with failure");
                self.child = None;
                true
            }
            Some(Err(e)) => {
                warn!(error = %e, "alarm player could not be polled");
                self.child = None;
                true
            }
            _ => false,
        }
    }
}

impl Drop for CommandSound {
    fn drop(&mut self) {
        self.stop();
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AlarmSettings {
    /// Primary sound is cut after this long.
    pub timeout: Duration,
    pub beep_count: u32,
    pub beep_gap: Duration,
}

impl Default for AlarmSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            beep_count: 20,
            beep_gap: Duration::from_millis(500),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlarmState {
    Idle,
    Playing { until: Instant },
    Beeping { remaining: u32, next_at: Instant },
}

/// The shared alarm channel. Driven by `tick` from the UI loop, so a stop
/// request always lands before the next beep is emitted.
pub struct Alarm<S> {
    sound: S,
    settings: AlarmSettings,
    state: AlarmState,
}

impl<S: Sound> Alarm<S> {
    pub fn new(sound: S, settings: AlarmSettings) -> Self {
        Self {
            sound,
            settings,
            state: AlarmState::Idle,
        }
    }

    pub fn state(&self) -> AlarmState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state != AlarmState::Idle
    }

    pub fn sound(&self) -> &S {
        &self.sound
    }

    pub fn ring(&mut self, now: Instant) {
        self.stop();
        match self.sound.start() {
            Ok(()) => {
                debug!("alarm sound playing");
                self.state = AlarmState::Playing {
                    until: now + self.settings.timeout,
                };
            }
            Err(e) => {
                debug!(error = %e, "alarm sound unavailable, using beep fallback");
                self.start_beeping(now);
            }
        }
    }

    fn start_beeping(&mut self, now: Instant) {
        self.state = if self.settings.beep_count == 0 {
            AlarmState::Idle
        } else {
            AlarmState::Beeping {
                remaining: self.settings.beep_count,
                next_at: now,
            }
        };
        self.tick(now);
    }

    pub fn tick(&mut self, now: Instant) {
        match self.state {
            AlarmState::Idle => {}
            AlarmState::Playing { until } => {
                if self.sound.failed() {
                    self.start_beeping(now);
                } else if now >= until {
                    debug!("alarm timed out");
                    self.stop();
                }
            }
            AlarmState::Beeping { remaining, next_at } => {
                if now < next_at {
                    return;
                }
                self.sound.beep();
                let remaining = remaining - 1;
                self.state = if remaining == 0 {
                    AlarmState::Idle
                } else {
                    AlarmState::Beeping {
                        remaining,
                        next_at: now + self.settings.beep_gap,
                    }
                };
            }
        }
    }

    pub fn stop(&mut self) {
        if let AlarmState::Playing { .. } = self.state {
            self.sound.stop();
        }
        self.state = AlarmState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        broken: bool,
        dies: bool,
        starts: u32,
        stops: u32,
        beeps: u32,
    }

    impl Sound for Recorder {
        fn start(&mut self) -> io::Result<()> {
            if self.broken {
                return Err(io::Error::other("no device"));
            }
            self.starts += 1;
            Ok(())
        }
        fn stop(&mut self) {
            self.stops += 1;
        }
        fn beep(&mut self) {
            self.beeps += 1;
        }
        fn failed(&mut self) -> bool {
            std::mem::take(&mut self.dies)
        }
    }

    fn settings() -> AlarmSettings {
        AlarmSettings {
            timeout: Duration::from_secs(30),
            beep_count: 3,
            beep_gap: Duration::from_millis(500),
        }
    }

    #[test]
    fn primary_sound_auto_stops_after_timeout() {
        let t0 = Instant::now();
        let mut alarm = Alarm::new(Recorder::default(), settings());
        alarm.ring(t0);
        assert!(matches!(alarm.state(), AlarmState::Playing { .. }));
        alarm.tick(t0 + Duration::from_secs(29));
        assert!(alarm.is_active());
        alarm.tick(t0 + Duration::from_secs(30));
        assert!(!alarm.is_active());
        assert_eq!(alarm.sound().stops, 1);
    }

    #[test]
    fn falls_back_to_bounded_beeps() {
        let t0 = Instant::now();
        let sound = Recorder {
            broken: true,
            ..Recorder::default()
        };
        let mut alarm = Alarm::new(sound, settings());
        alarm.ring(t0);
        assert_eq!(alarm.sound().beeps, 1);
        // not yet time for the next repetition
        alarm.tick(t0 + Duration::from_millis(100));
        assert_eq!(alarm.sound().beeps, 1);
        for i in 1..10 {
            alarm.tick(t0 + Duration::from_millis(500 * i));
        }
        assert_eq!(alarm.sound().beeps, 3);
        assert!(!alarm.is_active());
    }

    #[test]
    fn stop_cancels_remaining_beeps() {
        let t0 = Instant::now();
        let sound = Recorder {
            broken: true,
            ..Recorder::default()
        };
        let mut alarm = Alarm::new(sound, settings());
        alarm.ring(t0);
        alarm.stop();
        alarm.tick(t0 + Duration::from_secs(5));
        assert_eq!(alarm.sound().beeps, 1);
    }

    #[test]
    fn player_dying_switches_to_beeps() {
        let t0 = Instant::now();
        let mut alarm = Alarm::new(Recorder::default(), settings());
        alarm.ring(t0);
        alarm.sound.dies = true;
        alarm.tick(t0 + Duration::from_secs(1));
        assert!(matches!(alarm.state(), AlarmState::Beeping { remaining: 2, .. }));
        assert_eq!(alarm.sound().beeps, 1);
    }

    #[test]
    fn command_sound_without_command_refuses_to_start() {
        let mut sound = CommandSound::new(Some(vec![]));
        assert!(sound.start().is_err());
    }
}
