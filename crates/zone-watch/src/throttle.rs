//! Time-or-distance sample gate
//!
//! A sample is evaluated if enough time has passed since the last evaluated
//! sample OR the device has moved far enough. Either condition suffices.

use crate::sensor::LocationSample;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct SampleThrottle {
    interval: Duration,
    min_distance_m: f64,
    last: Option<LocationSample>,
}

impl SampleThrottle {
    pub fn new(interval: Duration, min_distance_m: f64) -> Self {
        Self {
            interval,
            min_distance_m,
            last: None,
        }
    }

    /// Returns true and records the sample when it should be evaluated.
    ///
    /// Uses sample timestamps rather than the wall clock, so replayed or
    /// buffered samples are gated the same way as live ones. A sample whose
    /// timestamp runs backwards only passes on distance.
    pub fn should_evaluate(&mut self, sample: &LocationSample) -> bool {
        let accept = match &self.last {
            None => true,
            Some(last) => {
                let elapsed = (sample.timestamp - last.timestamp).to_std().unwrap_or(Duration::ZERO);
                elapsed >= self.interval || last.point.distance_m(&sample.point) >= self.min_distance_m
            }
        };
        if accept {
            self.last = Some(*sample);
        }
        accept
    }
}
