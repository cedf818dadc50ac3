//! Configuration for the profiler

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::interrupt::InterruptOptions;

/// Configuration for the profiler
///
/// Holds the boot-time capability flags and where capture artifacts are
/// written. Everything else is passed as explicit call arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfilerConfig {
    /// Whether CPU captures are permitted
    cpu_enabled: bool,

    /// Whether memory captures are permitted
    mem_enabled: bool,

    /// Directory capture artifacts are created in
    output_dir: PathBuf,

    /// CPU sampling frequency in Hz
    sampling_frequency: i32,

    /// Which sessions an interrupt stops
    interrupt: InterruptOptions,
}

impl ProfilerConfig {
    /// Create a new builder for ProfilerConfig
    ///
    /// # Example
    ///
    /// ```
    /// use profiler_sessions::ProfilerConfig;
    ///
    /// let config = ProfilerConfig::builder()
    ///     .cpu_enabled(true)
    ///     .mem_enabled(false)
    ///     .build();
    /// ```
    pub fn builder() -> ProfilerConfigBuilder {
        ProfilerConfigBuilder::default()
    }

    /// Whether CPU captures are permitted
    pub fn cpu_enabled(&self) -> bool {
        self.cpu_enabled
    }

    /// Whether memory captures are permitted
    pub fn mem_enabled(&self) -> bool {
        self.mem_enabled
    }

    /// Directory artifacts are written to
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// CPU sampling frequency in Hz
    pub fn sampling_frequency(&self) -> i32 {
        self.sampling_frequency
    }

    /// Interrupt handling options
    pub fn interrupt(&self) -> InterruptOptions {
        self.interrupt
    }

    pub(crate) fn set_cpu_enabled(&mut self, enabled: bool) {
        self.cpu_enabled = enabled;
    }

    pub(crate) fn set_mem_enabled(&mut self, enabled: bool) {
        self.mem_enabled = enabled;
    }
}

impl Default for ProfilerConfig {
    /// Create a default configuration
    ///
    /// Default values:
    /// - cpu_enabled: true
    /// - mem_enabled: true
    /// - output_dir: current working directory
    /// - sampling_frequency: 100 Hz
    /// - interrupt: stop CPU capture only
    fn default() -> Self {
        Self {
            cpu_enabled: true,
            mem_enabled: true,
            output_dir: PathBuf::from("."),
            sampling_frequency: profiler_runtime::DEFAULT_FREQUENCY,
            interrupt: InterruptOptions::default(),
        }
    }
}

/// Builder for ProfilerConfig
#[derive(Debug, Clone, Default)]
pub struct ProfilerConfigBuilder {
    cpu_enabled: Option<bool>,
    mem_enabled: Option<bool>,
    output_dir: Option<PathBuf>,
    sampling_frequency: Option<i32>,
    interrupt: Option<InterruptOptions>,
}

impl ProfilerConfigBuilder {
    /// Permit or forbid CPU captures
    pub fn cpu_enabled(mut self, enabled: bool) -> Self {
        self.cpu_enabled = Some(enabled);
        self
    }

    /// Permit or forbid memory captures
    pub fn mem_enabled(mut self, enabled: bool) -> Self {
        self.mem_enabled = Some(enabled);
        self
    }

    /// Set the artifact directory
    ///
    /// # Arguments
    ///
    /// * `dir` - Existing directory artifacts are created in
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    /// Set the CPU sampling frequency in Hz
    pub fn sampling_frequency(mut self, frequency: i32) -> Self {
        self.sampling_frequency = Some(frequency);
        self
    }

    /// Set which sessions an interrupt stops
    pub fn interrupt(mut self, options: InterruptOptions) -> Self {
        self.interrupt = Some(options);
        self
    }

    /// Build the ProfilerConfig
    ///
    /// Uses default values for any options not explicitly set.
    pub fn build(self) -> ProfilerConfig {
        let default = ProfilerConfig::default();

        ProfilerConfig {
            cpu_enabled: self.cpu_enabled.unwrap_or(default.cpu_enabled),
            mem_enabled: self.mem_enabled.unwrap_or(default.mem_enabled),
            output_dir: self.output_dir.unwrap_or(default.output_dir),
            sampling_frequency: self
                .sampling_frequency
                .unwrap_or(default.sampling_frequency),
            interrupt: self.interrupt.unwrap_or(default.interrupt),
        }
    }
}
