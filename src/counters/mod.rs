//! Hardware performance counter capability layer.
//!
//! The counter subsystem is abstracted behind the [`CounterBackend`] /
//! [`CounterSet`] traits so the harness never touches platform code
//! directly. Two implementations exist: a Linux perf_event backend
//! ([`perf`]) and a fake backend ([`null`]) for environments without
//! hardware counters. Selection happens through run configuration, never
//! through conditional compilation at call sites.

pub mod null;
#[cfg(target_os = "linux")]
pub mod perf;

use crate::config::BackendChoice;
use crate::error::Result;

/// Separates counter groups in a request string.
pub const GROUP_DELIMITER: char = '!';

/// Separates event names within one counter group.
pub const EVENT_DELIMITER: char = ':';

/// Preset measured when the user asks for counters without naming any:
/// the cache-miss ladder from L1 down to the last level.
pub const DEFAULT_EVENTS: &str = "L1-dcache-load-misses:LLC-load-misses:cache-misses";

/// Opaque platform-specific identifier for one hardware event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EventCode {
    pub kind: u32,
    pub config: u64,
}

/// Outcome of resolving an event name against a backend.
#[derive(Debug, Clone)]
pub struct ResolvedEvent {
    pub code: EventCode,
    /// Canonical display name, used for metrics column headers.
    pub display: String,
    /// Long human description for terminal reports.
    pub description: String,
}

/// One requested event's slot in the flat per-event result array.
///
/// Slots exist for every requested event across all groups, indexed by
/// global event position; skipped events keep a zero value and carry the
/// failure that sidelined them.
#[derive(Debug, Clone)]
pub struct EventSlot {
    /// The event name exactly as requested.
    pub name: String,
    /// Canonical display name once resolved; falls back to the request.
    pub display: String,
    pub description: String,
    /// Resolution or add failure recorded for this event, if any.
    pub error: Option<String>,
    /// Measured counter value; zero when the event was skipped.
    pub value: i64,
}

impl EventSlot {
    pub fn new(name: &str) -> Self {
        EventSlot {
            name: name.to_string(),
            display: name.to_string(),
            description: String::new(),
            error: None,
            value: 0,
        }
    }
}

/// A set of events measured together over one execution of the workload.
pub trait CounterSet {
    /// Adds one resolved event to the set.
    fn add(&mut self, code: EventCode) -> Result<()>;

    /// Number of events actually added so far.
    fn active(&self) -> usize;

    /// Starts (and zeroes) all counters in the set.
    fn start(&mut self) -> Result<()>;

    /// Stops counting and reads the accumulated values, one per added
    /// event in add order.
    fn stop(&mut self) -> Result<Vec<i64>>;
}

/// Capability interface over a platform's counter subsystem.
pub trait CounterBackend {
    fn name(&self) -> &'static str;

    /// One-time library/platform initialization; failure is fatal.
    fn initialize(&mut self) -> Result<()>;

    /// Platform-reported number of counters measurable simultaneously.
    fn capacity(&self) -> usize;

    /// Resolves an event name to its platform identifier.
    fn resolve(&self, name: &str) -> Result<ResolvedEvent>;

    /// Creates an empty counter set.
    fn create_set(&self) -> Result<Box<dyn CounterSet>>;
}

/// Parses a counter request string into ordered groups of event names.
///
/// An empty or blank request means "no hardware counters"; empty segments
/// produced by stray delimiters are dropped.
pub fn parse_groups(spec: &str) -> Vec<Vec<String>> {
    spec.split(GROUP_DELIMITER)
        .filter_map(|group| {
            let events: Vec<String> = group
                .split(EVENT_DELIMITER)
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string)
                .collect();
            if events.is_empty() {
                None
            } else {
                Some(events)
            }
        })
        .collect()
}

/// Selects a backend per the run configuration.
pub fn backend_for(choice: BackendChoice) -> Result<Box<dyn CounterBackend>> {
    match choice {
        BackendChoice::Null => Ok(Box::new(null::NullBackend::new())),
        #[cfg(target_os = "linux")]
        BackendChoice::Auto | BackendChoice::Perf => Ok(Box::new(perf::PerfBackend::new())),
        #[cfg(not(target_os = "linux"))]
        BackendChoice::Auto => Ok(Box::new(null::NullBackend::new())),
        #[cfg(not(target_os = "linux"))]
        BackendChoice::Perf => Err(crate::error::counter_error(
            "the perf backend is only available on Linux",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_two_groups() {
        let groups = parse_groups("cycles:instructions!cache-misses");
        assert_eq!(
            groups,
            vec![
                vec!["cycles".to_string(), "instructions".to_string()],
                vec!["cache-misses".to_string()],
            ]
        );
    }

    #[test]
    fn test_parse_empty_request() {
        assert!(parse_groups("").is_empty());
        assert!(parse_groups("  ").is_empty());
    }

    #[test]
    fn test_parse_drops_stray_delimiters() {
        let groups = parse_groups("!cycles:!instructions!");
        assert_eq!(
            groups,
            vec![vec!["cycles".to_string()], vec!["instructions".to_string()]]
        );
    }

    #[test]
    fn test_default_preset_is_one_group() {
        let groups = parse_groups(DEFAULT_EVENTS);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 3);
    }
}
