//! Time series: load factor as a function of pseudo-time

use serde::{Deserialize, Serialize};

use crate::error::{FEAError, FEAResult};

/// Load factor history λ(t)
///
/// Path series interpolate linearly between data points, are zero before
/// their first point and zero after their last one unless `use_last` holds
/// the final value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", try_from = "SeriesData")]
pub enum TimeSeries {
    Constant {
        factor: f64,
    },
    Linear {
        factor: f64,
    },
    /// Equally spaced values starting at `start_time`
    Path {
        values: Vec<f64>,
        dt: f64,
        #[serde(default)]
        start_time: f64,
        factor: f64,
        #[serde(default)]
        use_last: bool,
    },
    /// Values at explicit, non-decreasing times
    PathTime {
        times: Vec<f64>,
        values: Vec<f64>,
        factor: f64,
        #[serde(default)]
        use_last: bool,
    },
}

/// Unchecked wire form of [`TimeSeries`]
#[derive(Deserialize)]
#[serde(tag = "type")]
enum SeriesData {
    Constant {
        factor: f64,
    },
    Linear {
        factor: f64,
    },
    Path {
        values: Vec<f64>,
        dt: f64,
        #[serde(default)]
        start_time: f64,
        factor: f64,
        #[serde(default)]
        use_last: bool,
    },
    PathTime {
        times: Vec<f64>,
        values: Vec<f64>,
        factor: f64,
        #[serde(default)]
        use_last: bool,
    },
}

impl TryFrom<SeriesData> for TimeSeries {
    type Error = FEAError;

    fn try_from(data: SeriesData) -> FEAResult<Self> {
        let series = match data {
            SeriesData::Constant { factor } => TimeSeries::Constant { factor },
            SeriesData::Linear { factor } => TimeSeries::Linear { factor },
            SeriesData::Path {
                values,
                dt,
                start_time,
                factor,
                use_last,
            } => TimeSeries::Path {
                values,
                dt,
                start_time,
                factor,
                use_last,
            },
            SeriesData::PathTime {
                times,
                values,
                factor,
                use_last,
            } => TimeSeries::PathTime {
                times,
                values,
                factor,
                use_last,
            },
        };
        series.validate()?;
        Ok(series)
    }
}

impl Default for TimeSeries {
    fn default() -> Self {
        TimeSeries::Linear { factor: 1.0 }
    }
}

impl TimeSeries {
    pub fn constant(factor: f64) -> Self {
        TimeSeries::Constant { factor }
    }

    pub fn linear(factor: f64) -> Self {
        TimeSeries::Linear { factor }
    }

    pub fn path(values: Vec<f64>, dt: f64, factor: f64) -> FEAResult<Self> {
        let series = TimeSeries::Path {
            values,
            dt,
            start_time: 0.0,
            factor,
            use_last: false,
        };
        series.validate()?;
        Ok(series)
    }

    pub fn path_time(times: Vec<f64>, values: Vec<f64>, factor: f64) -> FEAResult<Self> {
        let series = TimeSeries::PathTime {
            times,
            values,
            factor,
            use_last: false,
        };
        series.validate()?;
        Ok(series)
    }

    /// Check the data of a path series
    pub fn validate(&self) -> FEAResult<()> {
        match self {
            TimeSeries::Constant { .. } | TimeSeries::Linear { .. } => Ok(()),
            TimeSeries::Path { values, dt, .. } => {
                if !(*dt > 0.0) {
                    return Err(FEAError::InvalidInput(format!("path series needs dt > 0, got {dt}")));
                }
                if values.is_empty() {
                    return Err(FEAError::InvalidInput("path series has no values".to_string()));
                }
                Ok(())
            }
            TimeSeries::PathTime { times, values, .. } => {
                if times.len() != values.len() || times.is_empty() {
                    return Err(FEAError::InvalidInput(format!(
                        "path series has {} times and {} values",
                        times.len(),
                        values.len()
                    )));
                }
                if times.windows(2).any(|w| !(w[1] >= w[0])) {
                    return Err(FEAError::InvalidInput(
                        "path series times must not decrease".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }

    /// Hold the last value past the end of a path series
    pub fn with_use_last(mut self, hold: bool) -> Self {
        match &mut self {
            TimeSeries::Path { use_last, .. } | TimeSeries::PathTime { use_last, .. } => {
                *use_last = hold
            }
            _ => {}
        }
        self
    }

    pub fn factor(&self, t: f64) -> f64 {
        match self {
            TimeSeries::Constant { factor } => *factor,
            TimeSeries::Linear { factor } => factor * t,
            TimeSeries::Path {
                values,
                dt,
                start_time,
                factor,
                use_last,
            } => {
                let s = (t - start_time) / dt;
                if s < 0.0 {
                    return 0.0;
                }
                let Some(last) = values.len().checked_sub(1) else {
                    return 0.0;
                };
                let k = s.floor() as usize;
                if k >= last {
                    // Exactly on the last point counts as inside
                    if (k == last && s - k as f64 <= 1e-12) || *use_last {
                        return factor * values[last];
                    }
                    return 0.0;
                }
                let frac = s - k as f64;
                factor * (values[k] + frac * (values[k + 1] - values[k]))
            }
            TimeSeries::PathTime {
                times,
                values,
                factor,
                use_last,
            } => {
                let Some(last) = times.len().min(values.len()).checked_sub(1) else {
                    return 0.0;
                };
                let times = &times[..=last];
                if t < times[0] {
                    return 0.0;
                }
                if t > times[last] {
                    return if *use_last { factor * values[last] } else { 0.0 };
                }
                let k = times.partition_point(|&ti| ti <= t).saturating_sub(1).min(last);
                if k == last {
                    return factor * values[last];
                }
                let span = times[k + 1] - times[k];
                let frac = if span > 0.0 { (t - times[k]) / span } else { 1.0 };
                factor * (values[k] + frac * (values[k + 1] - values[k]))
            }
        }
    }

    /// Largest |λ| over the data (the scale factor for analytic series)
    pub fn peak_factor(&self) -> f64 {
        match self {
            TimeSeries::Constant { factor } | TimeSeries::Linear { factor } => factor.abs(),
            TimeSeries::Path { values, factor, .. } | TimeSeries::PathTime { values, factor, .. } => {
                values.iter().fold(0.0f64, |m, v| m.max(v.abs())) * factor.abs()
            }
        }
    }

    /// Data spacing; the first interval for `PathTime`, zero for analytic series
    pub fn time_increment(&self) -> f64 {
        match self {
            TimeSeries::Path { dt, .. } => *dt,
            TimeSeries::PathTime { times, .. } if times.len() > 1 => times[1] - times[0],
            _ => 0.0,
        }
    }

    pub fn number_of_data_points(&self) -> usize {
        match self {
            TimeSeries::Path { values, .. } | TimeSeries::PathTime { values, .. } => values.len(),
            _ => 0,
        }
    }

    /// Time of the last data point, if any
    pub fn duration(&self) -> Option<f64> {
        match self {
            TimeSeries::Path {
                values,
                dt,
                start_time,
                ..
            } => Some(start_time + dt * values.len().saturating_sub(1) as f64),
            TimeSeries::PathTime { times, .. } => times.last().copied(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_linear_and_constant() {
        assert_relative_eq!(TimeSeries::linear(2.0).factor(0.25), 0.5);
        assert_relative_eq!(TimeSeries::constant(3.0).factor(100.0), 3.0);
    }

    #[test]
    fn test_path_interpolates_and_ends() {
        let s = TimeSeries::path(vec![0.0, 1.0, 3.0], 0.5, 2.0).unwrap();
        assert_relative_eq!(s.factor(0.25), 1.0);
        assert_relative_eq!(s.factor(0.75), 4.0);
        assert_relative_eq!(s.factor(1.0), 6.0);
        assert_relative_eq!(s.factor(1.2), 0.0);
        assert_relative_eq!(s.clone().with_use_last(true).factor(5.0), 6.0);
        assert_relative_eq!(s.peak_factor(), 6.0);
        assert_eq!(s.number_of_data_points(), 3);
    }

    #[test]
    fn test_path_time_lookup() {
        let s = TimeSeries::path_time(vec![0.0, 1.0, 4.0], vec![0.0, 2.0, -1.0], 1.0).unwrap();
        assert_relative_eq!(s.factor(0.5), 1.0);
        assert_relative_eq!(s.factor(2.5), 0.5);
        assert_relative_eq!(s.factor(4.0), -1.0);
        assert_relative_eq!(s.factor(-1.0), 0.0);
        assert_relative_eq!(s.factor(9.0), 0.0);
        assert_relative_eq!(s.time_increment(), 1.0);
    }

    #[test]
    fn test_path_validation() {
        assert!(TimeSeries::path(vec![1.0], 0.0, 1.0).is_err());
        assert!(TimeSeries::path_time(vec![0.0, 2.0, 1.0], vec![0.0; 3], 1.0).is_err());
        assert!(TimeSeries::path(Vec::new(), 0.1, 1.0).is_err());
    }

    #[test]
    fn test_malformed_path_data_is_rejected_on_read() {
        let short = r#"{"type":"PathTime","times":[0.0,1.0],"values":[0.0],"factor":1.0}"#;
        assert!(serde_json::from_str::<TimeSeries>(short).is_err());
        let empty = r#"{"type":"Path","values":[],"dt":0.1,"factor":1.0}"#;
        assert!(serde_json::from_str::<TimeSeries>(empty).is_err());

        let good = r#"{"type":"PathTime","times":[0.0,1.0],"values":[0.0,2.0],"factor":1.0}"#;
        let s: TimeSeries = serde_json::from_str(good).unwrap();
        assert_relative_eq!(s.factor(0.5), 1.0);
    }

    #[test]
    fn test_hand_built_bad_series_never_panics() {
        let empty = TimeSeries::Path {
            values: Vec::new(),
            dt: 0.1,
            start_time: 0.0,
            factor: 1.0,
            use_last: true,
        };
        assert!(empty.validate().is_err());
        assert_eq!(empty.factor(0.5), 0.0);
        assert_eq!(empty.duration(), Some(0.0));

        let ragged = TimeSeries::PathTime {
            times: vec![0.0, 1.0],
            values: vec![3.0],
            factor: 1.0,
            use_last: false,
        };
        assert!(ragged.validate().is_err());
        assert_relative_eq!(ragged.factor(0.0), 3.0);
        assert_eq!(ragged.factor(0.5), 0.0);
    }
}
