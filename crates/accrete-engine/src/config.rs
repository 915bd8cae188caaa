//! World configuration, validation, and error types.
//!
//! [`KernelConfig`] is the builder-input for constructing a
//! [`KernelWorld`](crate::world::KernelWorld). [`KernelConfig::validate`]
//! checks every structural invariant up front and returns a
//! [`ConfigError`] rather than failing lazily mid-tick.

use std::collections::hash_map::DefaultHasher;
use std::error::Error;
use std::fmt;
use std::hash::Hasher;

use accrete_core::resource::ResourceDef;

/// Configuration for the dispatcher's adaptive command-skew backoff.
///
/// Generalizes the tick engine's consecutive-rollback-driven tolerance
/// widening to the dispatcher seam: consecutive handler failures for a
/// given command type widen that type's allowed `issuedAt`/step skew
/// tolerance before dispatch of that type is disabled, then decay it
/// back down after a quiet period.
#[derive(Clone, Debug)]
pub struct DispatchBackoff {
    /// Consecutive failures tolerated before dispatch of a command type
    /// is disabled. Default: 3.
    pub max_consecutive_failures: u32,
    /// Ticks of success after the last failure before the failure count
    /// for a command type resets. Default: 60.
    pub decay_rate: u64,
}

impl Default for DispatchBackoff {
    fn default() -> Self {
        Self {
            max_consecutive_failures: 3,
            decay_rate: 60,
        }
    }
}

/// Configuration for the Production Engine's per-tick invocation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProductionConfig {
    /// Minimum quantum of resource change applied per tick. Default:
    /// `1e-4`.
    pub apply_threshold: f64,
    /// Fixed step duration in milliseconds. Default: 100.
    pub step_size_ms: f64,
    /// Soft budget for one full tick, in milliseconds. Default: 100.
    pub tick_budget_ms: f64,
    /// Soft per-system budget within a tick, in milliseconds. Default: 16.
    pub system_budget_ms: f64,
}

impl Default for ProductionConfig {
    fn default() -> Self {
        Self {
            apply_threshold: accrete_production::DEFAULT_APPLY_THRESHOLD,
            step_size_ms: 100.0,
            tick_budget_ms: 100.0,
            system_budget_ms: 16.0,
        }
    }
}

/// Errors raised by [`KernelConfig::validate`].
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// No resources registered.
    NoResources,
    /// A resource definition failed validation.
    InvalidResource {
        /// Description of the validation failure.
        reason: String,
    },
    /// Ingress queue capacity is zero.
    IngressQueueZero,
    /// `apply_threshold` is non-finite or `<= 0`.
    InvalidApplyThreshold {
        /// The invalid value.
        value: f64,
    },
    /// `step_size_ms` is non-finite or `<= 0`.
    InvalidStepSize {
        /// The invalid value.
        value: f64,
    },
    /// A `DispatchBackoff` invariant was violated.
    InvalidBackoff {
        /// Description of which invariant was violated.
        reason: String,
    },
    /// `event_bus_soft_watermark >= event_bus_hard_watermark`.
    InvalidWatermarks {
        /// The configured soft watermark.
        soft: usize,
        /// The configured hard watermark.
        hard: usize,
    },
    /// Diagnostic timeline capacity is zero.
    DiagnosticTimelineZero,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoResources => write!(f, "no resources registered"),
            Self::InvalidResource { reason } => write!(f, "invalid resource definition: {reason}"),
            Self::IngressQueueZero => write!(f, "ingress queue capacity must be at least 1"),
            Self::InvalidApplyThreshold { value } => {
                write!(f, "apply_threshold must be finite and > 0, got {value}")
            }
            Self::InvalidStepSize { value } => {
                write!(f, "step_size_ms must be finite and > 0, got {value}")
            }
            Self::InvalidBackoff { reason } => write!(f, "invalid backoff configuration: {reason}"),
            Self::InvalidWatermarks { soft, hard } => {
                write!(f, "soft watermark {soft} must be less than hard watermark {hard}")
            }
            Self::DiagnosticTimelineZero => write!(f, "diagnostic timeline capacity must be at least 1"),
        }
    }
}

impl Error for ConfigError {}

/// Names a channel to register on the Event Bus at world construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelConfig {
    /// Stable channel name.
    pub name: String,
    /// Ring buffer capacity for this channel.
    pub capacity: usize,
    /// Entries at or above this count increment the soft-limited counter.
    pub soft_watermark: usize,
    /// Entries at or above this count increment the overflow counter and
    /// drop the publish.
    pub hard_watermark: usize,
}

/// Full configuration for a [`KernelWorld`](crate::world::KernelWorld).
#[derive(Clone, Debug)]
pub struct KernelConfig {
    /// Resources to register at construction.
    pub resources: Vec<ResourceDef>,
    /// Maximum commands the Priority Command Queue can buffer at once.
    pub max_ingress_queue: usize,
    /// Production Engine tuning.
    pub production: ProductionConfig,
    /// Dispatcher backoff tuning.
    pub backoff: DispatchBackoff,
    /// Event Bus channels to register.
    pub channels: Vec<ChannelConfig>,
    /// Diagnostic Timeline ring capacity. Default: 120.
    pub diagnostic_timeline_capacity: usize,
    /// Safety cap on `accumulatorMs`, expressed as a multiple of
    /// `step_size_ms`. Default: 5.0.
    pub max_accumulator_steps: f64,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            resources: Vec::new(),
            max_ingress_queue: 1024,
            production: ProductionConfig::default(),
            backoff: DispatchBackoff::default(),
            channels: Vec::new(),
            diagnostic_timeline_capacity: 120,
            max_accumulator_steps: 5.0,
        }
    }
}

impl KernelConfig {
    /// Checks every structural invariant up front, returning the first
    /// violation found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resources.is_empty() {
            return Err(ConfigError::NoResources);
        }
        for def in &self.resources {
            if def.id.is_empty() {
                return Err(ConfigError::InvalidResource {
                    reason: "resource id must not be empty".to_string(),
                });
            }
            if let Some(cap) = def.capacity {
                if !cap.is_finite() || cap < 0.0 {
                    return Err(ConfigError::InvalidResource {
                        reason: format!("resource '{}' has invalid capacity {cap}", def.id),
                    });
                }
            }
        }
        if self.max_ingress_queue == 0 {
            return Err(ConfigError::IngressQueueZero);
        }
        if !self.production.apply_threshold.is_finite() || self.production.apply_threshold <= 0.0 {
            return Err(ConfigError::InvalidApplyThreshold {
                value: self.production.apply_threshold,
            });
        }
        if !self.production.step_size_ms.is_finite() || self.production.step_size_ms <= 0.0 {
            return Err(ConfigError::InvalidStepSize {
                value: self.production.step_size_ms,
            });
        }
        if self.backoff.max_consecutive_failures == 0 {
            return Err(ConfigError::InvalidBackoff {
                reason: "max_consecutive_failures must be at least 1".to_string(),
            });
        }
        for channel in &self.channels {
            if channel.soft_watermark >= channel.hard_watermark {
                return Err(ConfigError::InvalidWatermarks {
                    soft: channel.soft_watermark,
                    hard: channel.hard_watermark,
                });
            }
            if channel.hard_watermark > channel.capacity {
                return Err(ConfigError::InvalidWatermarks {
                    soft: channel.soft_watermark,
                    hard: channel.hard_watermark,
                });
            }
        }
        if self.diagnostic_timeline_capacity == 0 {
            return Err(ConfigError::DiagnosticTimelineZero);
        }
        Ok(())
    }

    /// A deterministic hash of every field that affects how a recorded
    /// [`Command`](accrete_core::command::Command) sequence would
    /// replay: the resource roster and every production/backoff tuning
    /// value. Two configs with the same hash produce bit-identical
    /// replay behavior; two with different hashes may not, which is
    /// what lets a command log recorded against one config be rejected
    /// up front against a different one instead of silently misapplied.
    pub fn content_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        hasher.write_usize(self.resources.len());
        for def in &self.resources {
            hasher.write(def.id.as_bytes());
            hasher.write_u64(def.capacity.map(f64::to_bits).unwrap_or(u64::MAX));
            hasher.write_u8(def.initially_unlocked as u8);
            hasher.write_u8(def.initially_visible as u8);
            hasher.write_u8(def.track_rates as u8);
        }
        hasher.write_u64(self.production.apply_threshold.to_bits());
        hasher.write_u64(self.production.step_size_ms.to_bits());
        hasher.write_u64(self.production.tick_budget_ms.to_bits());
        hasher.write_u64(self.production.system_budget_ms.to_bits());
        hasher.write_u32(self.backoff.max_consecutive_failures);
        hasher.write_u64(self.backoff.decay_rate);
        hasher.write_u64(self.max_accumulator_steps.to_bits());
        hasher.finish()
    }
}
