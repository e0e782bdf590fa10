/// Signal samples coming in from the collector and the table they are kept in
///
/// The collector writes one CSV record per reading with the header
/// `Time,MACID,RSSI`. Records are parsed on a reader thread and handed to
/// the display loop over a channel.

use serde::{Deserialize, Serialize};

use std::collections::HashSet;
use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use crate::error::Result;

/// A single RSSI reading for one device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    #[serde(rename = "Time")]
    pub time: f64,
    #[serde(rename = "MACID")]
    pub device_id: String,
    #[serde(rename = "RSSI")]
    pub rssi: f64,
}

impl Sample {
    #[cfg(test)]
    pub fn new(time: f64, device_id: &str, rssi: f64) -> Self {
        Sample { time, device_id: device_id.to_string(), rssi }
    }
}

/// The full current sample set the waterfall is recomputed from
#[derive(Debug, Clone, Default)]
pub struct SampleTable {
    samples: Vec<Sample>,
}

impl SampleTable {
    pub fn new() -> Self {
        SampleTable { samples: Vec::new() }
    }

    pub fn push(&mut self, sample: Sample) {
        self.samples.push(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Newest timestamp in the table, `None` when there is nothing usable
    pub fn latest_time(&self) -> Option<f64> {
        self.samples
            .iter()
            .map(|s| s.time)
            .filter(|t| !t.is_nan())
            .fold(None, |latest, t| match latest {
                Some(l) if l >= t => Some(l),
                _ => Some(t),
            })
    }

    /// Unique device ids in order of first appearance
    pub fn unique_devices(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut devices = Vec::new();

        for sample in self.samples.iter() {
            if seen.insert(sample.device_id.as_str()) {
                devices.push(sample.device_id.clone());
            }
        }

        devices
    }

    /// Samples no older than `width` before the newest one
    pub fn window(&self, width: f64) -> impl Iterator<Item = &Sample> {
        let cutoff = self.latest_time().map(|now| now - width);

        self.samples
            .iter()
            .filter(move |s| matches!(cutoff, Some(c) if s.time >= c))
    }

    /// Drop every sample older than `cutoff`
    ///
    /// returns the number of samples removed
    pub fn prune_before(&mut self, cutoff: f64) -> usize {
        let before = self.samples.len();
        self.samples.retain(|s| s.time >= cutoff);
        before - self.samples.len()
    }
}

impl From<Vec<Sample>> for SampleTable {
    fn from(samples: Vec<Sample>) -> Self {
        SampleTable { samples }
    }
}

impl Extend<Sample> for SampleTable {
    fn extend<T: IntoIterator<Item = Sample>>(&mut self, iter: T) {
        self.samples.extend(iter);
    }
}

/// Where the sample feed is read from
#[derive(Debug, Clone, PartialEq)]
pub enum InputSource {
    Stdin,
    File(PathBuf),
}

impl InputSource {
    fn open(&self) -> Result<Box<dyn Read + Send>> {
        let reader: Box<dyn Read + Send> = match self {
            Self::Stdin => Box::new(io::stdin()),
            Self::File(path) => Box::new(File::open(path)?),
        };

        Ok(reader)
    }
}

impl std::str::FromStr for InputSource {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "-" => Ok(Self::Stdin),
            path => Ok(Self::File(PathBuf::from(path))),
        }
    }
}

impl std::fmt::Display for InputSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdin => write!(f, "stdin"),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader)
}

/// Read a whole recorded feed, failing on the first bad record
pub fn read_samples<R: Read>(reader: R) -> Result<Vec<Sample>> {
    let mut samples = Vec::new();

    for record in csv_reader(reader).deserialize() {
        samples.push(record?);
    }

    Ok(samples)
}

pub fn load_samples(source: &InputSource) -> Result<Vec<Sample>> {
    read_samples(source.open()?)
}

/// Start a thread parsing the live feed and forwarding every sample
///
/// `source` - the feed to read
///
/// returns the receiving end of the sample channel and the thread handle
pub fn spawn_reader(source: InputSource) -> Result<(Receiver<Sample>, JoinHandle<()>)> {
    let reader = source.open()?;
    let (tx, rx): (Sender<Sample>, Receiver<Sample>) = mpsc::channel();

    let handle = thread::spawn(move || {
        for record in csv_reader(reader).deserialize::<Sample>() {
            match record {
                Ok(sample) => {
                    if tx.send(sample).is_err() {
                        tracing::debug!("sample receiver is dropped");
                        break;
                    }
                }
                Err(e) => tracing::warn!("skipping bad record from {}: {}", source, e),
            }
        }
        tracing::info!("sample feed {} closed", source);
    });

    Ok((rx, handle))
}
