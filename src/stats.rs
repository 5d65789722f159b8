//! Probe-length statistics.
//!
//! The probe length of a live entry is the number of slots (or chain
//! positions) a successful lookup inspects before it reaches the entry. A
//! histogram of probe lengths over every live entry is a direct measure of
//! how much memory a lookup touches, which is what the cache comparison is
//! about.

use core::fmt::Write;

/// Rows rendered individually by [`ProbeStats::render_histogram`]; longer
/// probes are folded into a final row.
const RENDERED_ROWS: usize = 32;

/// Histogram of probe lengths over the live entries of a map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeStats {
    /// `histogram[n]` counts entries reached after `n + 1` probes.
    histogram: Vec<usize>,
}

impl ProbeStats {
    /// Creates empty statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one entry reached after `probe_length` probes.
    pub fn record(&mut self, probe_length: usize) {
        debug_assert!(probe_length > 0);
        let bin = probe_length.max(1) - 1;
        if self.histogram.len() <= bin {
            self.histogram.resize(bin + 1, 0);
        }
        self.histogram[bin] += 1;
    }

    /// Number of entries recorded.
    pub fn entries(&self) -> usize {
        self.histogram.iter().sum()
    }

    /// Sum of the probe lengths of every recorded entry.
    pub fn total_probes(&self) -> usize {
        self.histogram
            .iter()
            .enumerate()
            .map(|(bin, count)| (bin + 1) * count)
            .sum()
    }

    /// Mean probe length, `0.0` when nothing was recorded.
    pub fn mean(&self) -> f64 {
        let entries = self.entries();
        if entries == 0 {
            0.0
        } else {
            self.total_probes() as f64 / entries as f64
        }
    }

    /// Longest recorded probe length, `0` when nothing was recorded.
    pub fn max(&self) -> usize {
        self.histogram
            .iter()
            .rposition(|&count| count != 0)
            .map_or(0, |bin| bin + 1)
    }

    /// The raw histogram: index `n` counts entries with probe length `n + 1`.
    pub fn histogram(&self) -> &[usize] {
        &self.histogram
    }

    /// Renders the histogram as horizontal bars, one row per probe length.
    pub fn render_histogram(&self) -> String {
        let mut out = String::new();
        let mut rows: Vec<(String, usize)> = self
            .histogram
            .iter()
            .take(RENDERED_ROWS)
            .enumerate()
            .map(|(bin, &count)| (format!("{:>3}", bin + 1), count))
            .collect();
        if self.histogram.len() > RENDERED_ROWS {
            let tail = self.histogram[RENDERED_ROWS..].iter().sum::<usize>();
            rows.push((format!("{:>2}+", RENDERED_ROWS + 1), tail));
        }

        let max = rows.iter().map(|(_, count)| *count).max().unwrap_or(0);
        if max == 0 {
            out.push_str("probe histogram: empty\n");
            return out;
        }

        let max_bar = 60usize;
        let total_units = max_bar * 8;
        let _ = writeln!(out, "probe histogram ({} entries):", self.entries());

        let make_bar = |count: usize| -> String {
            if count == 0 {
                return String::new();
            }
            let units = ((count as u128 * total_units as u128).div_ceil(max as u128)) as usize;
            let mut bar = "█".repeat(units / 8);
            let partial = match units % 8 {
                0 => None,
                1 => Some('▏'),
                2 => Some('▎'),
                3 => Some('▍'),
                4 => Some('▌'),
                5 => Some('▋'),
                6 => Some('▊'),
                _ => Some('▉'),
            };
            bar.extend(partial);
            bar
        };

        for (label, count) in rows {
            let _ = writeln!(out, "{label} | {:<max_bar$} {count}", make_bar(count));
        }
        out
    }
}

impl FromIterator<usize> for ProbeStats {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        let mut stats = ProbeStats::new();
        for probe_length in iter {
            stats.record(probe_length);
        }
        stats
    }
}
