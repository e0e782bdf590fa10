/// Rolling per device signal history behind the waterfall
///
/// Each update collapses the newest slice of the sample set into one row of
/// mean RSSI per device and pushes it onto a fixed length FIFO.

use std::collections::{HashMap, VecDeque};

use crate::sample::SampleTable;

/// Rows kept in the waterfall
pub const WATERFALL_LENGTH: usize = 100;
/// Value used for a device with no readings in the window
pub const FLOOR_DBM: f64 = -100.0;
/// Length of the device labels shown under the waterfall
pub const LABEL_LEN: usize = 5;

/// Trade off between how quickly the waterfall follows the feed and how
/// many readings go into each row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Responsiveness {
    #[default]
    Fast,
    Accurate,
}

impl Responsiveness {
    /// Width of the time slice each row is averaged over
    pub fn window(&self) -> f64 {
        match self {
            Self::Fast => 0.15,
            Self::Accurate => 0.3,
        }
    }
}

impl std::fmt::Display for Responsiveness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name: &'static str = match self {
            Self::Fast => "fast",
            Self::Accurate => "accurate",
        };

        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryConfig {
    pub length: usize,
    pub floor: f64,
    pub responsiveness: Responsiveness,
    /// Updates after construction that re-sample the device set instead of
    /// aggregating, so devices discovered a little late still get a column
    pub warm_up_updates: u32,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        HistoryConfig {
            length: WATERFALL_LENGTH,
            floor: FLOOR_DBM,
            responsiveness: Responsiveness::default(),
            warm_up_updates: 1,
        }
    }
}

/// What an update call did to the history
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Still warming up, the device set was sampled again
    Resampled,
    /// A new row was appended and the oldest dropped
    Appended,
}

/// Fixed length history of mean RSSI, one column per device
#[derive(Debug, Clone)]
pub struct WaterfallHistory {
    config: HistoryConfig,
    devices: Vec<String>,
    columns: HashMap<String, usize>,
    rows: VecDeque<Vec<f64>>,
    warm_up_left: u32,
}

impl WaterfallHistory {
    /// Create the history and sample the device set from `samples`
    pub fn new(samples: &SampleTable, config: HistoryConfig) -> Self {
        let mut history = WaterfallHistory {
            warm_up_left: config.warm_up_updates,
            config,
            devices: Vec::new(),
            columns: HashMap::new(),
            rows: VecDeque::new(),
        };

        history.sample_devices(samples);
        history
    }

    /// Take the device set from the samples and reset every row to the floor
    fn sample_devices(&mut self, samples: &SampleTable) {
        self.devices = samples.unique_devices();
        self.columns = self
            .devices
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();

        let width = self.devices.len();
        let floor = self.config.floor;
        self.rows = (0..self.config.length).map(|_| vec![floor; width]).collect();

        tracing::debug!("sampled {} devices", width);
    }

    /// Fold the current sample set into the history
    ///
    /// `samples` - the full current sample set, not just what arrived since
    /// the last call
    ///
    /// A warm up update only counts once it finds at least one device, a feed
    /// that has not started yet leaves the warm up untouched
    pub fn update(&mut self, samples: &SampleTable) -> UpdateOutcome {
        if self.warm_up_left > 0 {
            self.sample_devices(samples);
            if !self.devices.is_empty() {
                self.warm_up_left -= 1;
            }
            return UpdateOutcome::Resampled;
        }

        let row = self.aggregate(samples);
        self.push_row(row);
        UpdateOutcome::Appended
    }

    /// Mean RSSI per known device over the newest window of samples
    fn aggregate(&self, samples: &SampleTable) -> Vec<f64> {
        let mut sums = vec![(0.0, 0usize); self.devices.len()];

        for sample in samples.window(self.window()) {
            if sample.rssi.is_nan() {
                continue;
            }
            if let Some(&col) = self.columns.get(&sample.device_id) {
                sums[col].0 += sample.rssi;
                sums[col].1 += 1;
            }
        }

        sums.into_iter()
            .map(|(sum, count)| match count {
                0 => self.config.floor,
                n => sum / n as f64,
            })
            .collect()
    }

    fn push_row(&mut self, row: Vec<f64>) {
        self.rows.push_back(row);
        while self.rows.len() > self.config.length {
            self.rows.pop_front();
        }
    }

    #[cfg(test)]
    pub fn is_warming_up(&self) -> bool {
        self.warm_up_left > 0
    }

    /// Width of the time slice used for each row
    pub fn window(&self) -> f64 {
        self.config.responsiveness.window()
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    pub fn devices(&self) -> &[String] {
        &self.devices
    }

    #[cfg(test)]
    pub fn column(&self, device_id: &str) -> Option<usize> {
        self.columns.get(device_id).copied()
    }

    /// Device ids cut down to their first `len` characters
    pub fn labels(&self, len: usize) -> Vec<String> {
        self.devices.iter().map(|id| id.chars().take(len).collect()).collect()
    }

    /// Rows from oldest to newest
    pub fn rows(&self) -> impl ExactSizeIterator<Item = &[f64]> {
        self.rows.iter().map(|row| row.as_slice())
    }

    pub fn row(&self, index: usize) -> Option<&[f64]> {
        self.rows.get(index).map(|row| row.as_slice())
    }

    #[cfg(test)]
    pub fn latest_row(&self) -> Option<&[f64]> {
        self.rows.back().map(|row| row.as_slice())
    }

    #[cfg(test)]
    pub fn value(&self, row: usize, device_id: &str) -> Option<f64> {
        let col = self.column(device_id)?;
        self.rows.get(row).and_then(|r| r.get(col)).copied()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::Sample;

    const AA: &str = "AA:BB:CC:DD:EE:FF";
    const BB: &str = "11:22:33:44:55:66";

    fn table(samples: &[(f64, &str, f64)]) -> SampleTable {
        SampleTable::from(
            samples
                .iter()
                .map(|(t, id, rssi)| Sample::new(*t, id, *rssi))
                .collect::<Vec<_>>(),
        )
    }

    /// History that aggregates from the first update on
    fn warm_history(samples: &SampleTable) -> WaterfallHistory {
        let config = HistoryConfig { warm_up_updates: 0, ..Default::default() };
        WaterfallHistory::new(samples, config)
    }

    #[test]
    fn test_new_history_is_floor() {
        let history = WaterfallHistory::new(&table(&[(0.0, AA, -40.0)]), HistoryConfig::default());

        assert_eq!(history.len(), WATERFALL_LENGTH);
        assert_eq!(history.devices(), &[AA.to_string()]);
        assert!(history.rows().all(|row| row == [FLOOR_DBM]));
    }

    #[test]
    fn test_mean_over_window() {
        let samples = table(&[(0.0, AA, -40.0), (0.05, AA, -60.0)]);
        let mut history = warm_history(&samples);

        assert_eq!(history.update(&samples), UpdateOutcome::Appended);
        assert_eq!(history.latest_row(), Some(&[-50.0][..]));
    }

    #[test]
    fn test_device_without_samples_gets_floor() {
        let samples = table(&[(0.0, AA, -40.0), (0.0, BB, -70.0)]);
        let mut history = warm_history(&samples);

        let later = table(&[(0.0, AA, -40.0), (0.0, BB, -70.0), (1.0, AA, -30.0)]);
        history.update(&later);

        assert_eq!(history.value(WATERFALL_LENGTH - 1, AA), Some(-30.0));
        assert_eq!(history.value(WATERFALL_LENGTH - 1, BB), Some(FLOOR_DBM));
    }

    #[test]
    fn test_samples_outside_window_ignored() {
        let samples = table(&[(0.0, AA, -80.0), (0.2, AA, -40.0), (0.3, AA, -20.0)]);

        let mut fast = warm_history(&samples);
        fast.update(&samples);
        assert_eq!(fast.value(WATERFALL_LENGTH - 1, AA), Some(-30.0));

        let config = HistoryConfig {
            responsiveness: Responsiveness::Accurate,
            warm_up_updates: 0,
            ..Default::default()
        };
        let mut accurate = WaterfallHistory::new(&samples, config);
        accurate.update(&samples);
        let value = accurate.value(WATERFALL_LENGTH - 1, AA).unwrap();
        assert!((value - (-140.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn test_empty_update_is_all_floor() {
        let mut history = warm_history(&table(&[(0.0, AA, -40.0), (0.0, BB, -50.0)]));

        history.update(&SampleTable::new());
        assert_eq!(history.latest_row(), Some(&[FLOOR_DBM, FLOOR_DBM][..]));
    }

    #[test]
    fn test_no_devices() {
        let mut history = warm_history(&SampleTable::new());

        history.update(&table(&[(0.0, AA, -40.0)]));
        assert_eq!(history.len(), WATERFALL_LENGTH);
        assert_eq!(history.latest_row(), Some(&[][..]));
        assert_eq!(history.value(WATERFALL_LENGTH - 1, AA), None);
    }

    #[test]
    fn test_late_device_not_tracked() {
        let mut history = warm_history(&table(&[(0.0, AA, -40.0)]));

        history.update(&table(&[(0.0, AA, -40.0), (0.05, BB, -30.0)]));
        assert_eq!(history.devices().len(), 1);
        assert_eq!(history.column(BB), None);
        assert_eq!(history.latest_row(), Some(&[-40.0][..]));
    }

    #[test]
    fn test_nan_readings_skipped() {
        let samples = table(&[(0.0, AA, -40.0), (0.01, AA, f64::NAN)]);
        let mut history = warm_history(&samples);

        history.update(&samples);
        assert_eq!(history.latest_row(), Some(&[-40.0][..]));
    }

    #[test]
    fn test_length_constant() {
        let samples = table(&[(0.0, AA, -40.0)]);
        let mut history = warm_history(&samples);

        for _ in 0..250 {
            history.update(&samples);
            assert_eq!(history.len(), WATERFALL_LENGTH);
        }
    }

    #[test]
    fn test_fifo_eviction() {
        let mut history = warm_history(&table(&[(0.0, AA, -40.0)]));

        for i in 0..130 {
            history.update(&table(&[(i as f64, AA, -(i as f64))]));
        }

        // 130 rows pushed through a 100 row buffer leaves rows 30..130
        let rows: Vec<f64> = history.rows().map(|row| row[0]).collect();
        let expected: Vec<f64> = (30..130).map(|i| -(i as f64)).collect();
        assert_eq!(rows, expected);
    }

    #[test]
    fn test_partial_fill_keeps_newest_last() {
        let mut history = warm_history(&table(&[(0.0, AA, -40.0)]));

        for i in 0..3 {
            history.update(&table(&[(i as f64, AA, -50.0 - i as f64)]));
        }

        assert_eq!(history.row(WATERFALL_LENGTH - 4), Some(&[FLOOR_DBM][..]));
        assert_eq!(history.row(WATERFALL_LENGTH - 3), Some(&[-50.0][..]));
        assert_eq!(history.row(WATERFALL_LENGTH - 2), Some(&[-51.0][..]));
        assert_eq!(history.row(WATERFALL_LENGTH - 1), Some(&[-52.0][..]));
    }

    #[test]
    fn test_warm_up_resamples_once() {
        let mut history = WaterfallHistory::new(&SampleTable::new(), HistoryConfig::default());
        assert!(history.devices().is_empty());
        assert!(history.is_warming_up());

        let samples = table(&[(0.0, AA, -40.0), (0.05, BB, -60.0)]);
        assert_eq!(history.update(&samples), UpdateOutcome::Resampled);
        assert_eq!(history.devices().len(), 2);
        assert!(history.rows().all(|row| row == [FLOOR_DBM, FLOOR_DBM]));
        assert!(!history.is_warming_up());

        assert_eq!(history.update(&samples), UpdateOutcome::Appended);
        assert_eq!(history.latest_row(), Some(&[-40.0, -60.0][..]));
    }

    #[test]
    fn test_warm_up_waits_for_first_device() {
        let mut history = WaterfallHistory::new(&SampleTable::new(), HistoryConfig::default());

        // the feed has not delivered anything yet
        assert_eq!(history.update(&SampleTable::new()), UpdateOutcome::Resampled);
        assert_eq!(history.update(&SampleTable::new()), UpdateOutcome::Resampled);
        assert!(history.devices().is_empty());
        assert!(history.is_warming_up());

        let samples = table(&[(0.0, AA, -40.0)]);
        assert_eq!(history.update(&samples), UpdateOutcome::Resampled);
        assert_eq!(history.devices(), &[AA.to_string()]);
        assert!(!history.is_warming_up());

        assert_eq!(history.update(&samples), UpdateOutcome::Appended);
        assert_eq!(history.latest_row(), Some(&[-40.0][..]));
    }

    #[test]
    fn test_labels_truncated() {
        let history = warm_history(&table(&[(0.0, AA, -40.0), (0.0, "AB", -40.0)]));

        assert_eq!(history.labels(LABEL_LEN), vec!["AA:BB", "AB"]);
    }
}
