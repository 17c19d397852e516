use async_trait::async_trait;

use super::LogTextProvider;
use crate::store::Severity;

/// Fallback when a provider has nothing better to say.
pub const FALLBACK_LINE: &str = "Working on it...";

const EARLY: &[&str] = &[
    "Reading the relevant sources",
    "Sketching out an approach",
    "Setting up the working environment",
    "Breaking the work into steps",
];

const MID: &[&str] = &[
    "Implementing the main path",
    "Wiring the pieces together",
    "Handling the edge cases",
    "Refining the initial draft",
];

const LATE: &[&str] = &[
    "Running the checks",
    "Cleaning up loose ends",
    "Reviewing the result",
    "Final polish",
];

/// Deterministic, dependency-free log text. The line is derived from the
/// progress value alone so repeated snapshots produce repeated lines.
pub struct CannedLogText;

#[async_trait]
impl LogTextProvider for CannedLogText {
    async fn flavor_line(&self, _title: &str, progress: u8) -> (String, Severity) {
        let band = match progress {
            0..=33 => EARLY,
            34..=66 => MID,
            _ => LATE,
        };
        let line = band
            .get(progress as usize % band.len())
            .copied()
            .unwrap_or(FALLBACK_LINE);
        (line.to_string(), Severity::Info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_same_progress_same_line() {
        let p = CannedLogText;
        let a = p.flavor_line("Task", 42).await;
        let b = p.flavor_line("Task", 42).await;
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_bands_cover_full_range() {
        let p = CannedLogText;
        for progress in 0..=100u8 {
            let (line, severity) = p.flavor_line("Task", progress).await;
            assert!(!line.is_empty());
            assert_eq!(severity, Severity::Info);
        }
    }
}
