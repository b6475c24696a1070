#[cfg(feature = "cli")]
use std::sync::Mutex;
#[cfg(feature = "cli")]
use std::time::{Duration, Instant};
#[cfg(feature = "cli")]
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

/// One sample taken after a pipeline phase.
#[cfg(feature = "cli")]
#[derive(Debug, Clone)]
pub struct PhaseSample {
    pub phase: String,
    pub cpu_usage: f32,
    pub memory_mb: u64,
    /// Time since the previous sample
    pub duration: Duration,
}

#[cfg(feature = "cli")]
struct MonitorState {
    system: System,
    last_sample: Instant,
    peak_memory_mb: u64,
    samples: Vec<PhaseSample>,
}

/// 記錄每個 pipeline 階段的 CPU / 記憶體使用量
#[cfg(feature = "cli")]
pub struct SystemMonitor {
    state: Option<Mutex<MonitorState>>,
    pid: Option<Pid>,
    start_time: Instant,
}

#[cfg(feature = "cli")]
impl SystemMonitor {
    pub fn new(enabled: bool) -> Self {
        let pid = sysinfo::get_current_pid().ok();
        if pid.is_none() && enabled {
            tracing::warn!("Could not resolve current PID, process stats will be skipped");
        }

        let now = Instant::now();
        let state = enabled.then(|| {
            Mutex::new(MonitorState {
                system: System::new(),
                last_sample: now,
                peak_memory_mb: 0,
                samples: Vec::new(),
            })
        });

        Self {
            state,
            pid,
            start_time: now,
        }
    }

    /// Samples the current process and stores it under `phase`.
    pub fn sample(&self, phase: &str) -> Option<PhaseSample> {
        let pid = self.pid?;
        let mut state = self.state.as_ref()?.lock().ok()?;
        state.system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            true,
            ProcessRefreshKind::everything(),
        );

        let process = state.system.process(pid)?;
        let sample = PhaseSample {
            phase: phase.to_string(),
            cpu_usage: process.cpu_usage(),
            memory_mb: process.memory() / 1024 / 1024,
            duration: state.last_sample.elapsed(),
        };
        state.last_sample = Instant::now();
        state.peak_memory_mb = state.peak_memory_mb.max(sample.memory_mb);
        state.samples.push(sample.clone());
        Some(sample)
    }

    pub fn log_stats(&self, pipeline: &str, phase: &str) {
        if let Some(s) = self.sample(phase) {
            tracing::info!(
                "📊 {}/{} - CPU: {:.1}%, Memory: {}MB, Phase time: {:?}",
                pipeline,
                phase,
                s.cpu_usage,
                s.memory_mb,
                s.duration
            );
        }
    }

    pub fn log_final_stats(&self, pipeline: &str) {
        let Some(state) = self.state.as_ref().and_then(|s| s.lock().ok()) else {
            return;
        };
        let slowest = state
            .samples
            .iter()
            .max_by_key(|s| s.duration)
            .map(|s| s.phase.as_str())
            .unwrap_or("-");
        tracing::info!(
            "📊 {} finished - Total Time: {:?}, Peak Memory: {}MB, Slowest phase: {}",
            pipeline,
            self.start_time.elapsed(),
            state.peak_memory_mb,
            slowest
        );
    }

    pub fn is_enabled(&self) -> bool {
        self.state.is_some()
    }
}

#[cfg(feature = "cli")]
impl Default for SystemMonitor {
    fn default() -> Self {
        Self::new(false)
    }
}

#[cfg(not(feature = "cli"))]
#[derive(Default)]
pub struct SystemMonitor;

#[cfg(not(feature = "cli"))]
impl SystemMonitor {
    pub fn new(_enabled: bool) -> Self {
        Self
    }

    pub fn log_stats(&self, _pipeline: &str, _phase: &str) {}

    pub fn log_final_stats(&self, _pipeline: &str) {}

    pub fn is_enabled(&self) -> bool {
        false
    }
}

#[cfg(all(test, feature = "cli"))]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_monitor_takes_no_samples() {
        let monitor = SystemMonitor::new(false);
        assert!(!monitor.is_enabled());
        assert!(monitor.sample("extract").is_none());
        monitor.log_final_stats("generate");
    }
}
