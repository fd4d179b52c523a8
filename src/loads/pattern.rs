//! Load patterns: reference loads scaled by a time series

use serde::{Deserialize, Serialize};

use super::{ElementLoad, NodalLoad, TimeSeries};

/// A group of reference loads sharing one time series
///
/// The contribution at time t is `gamma_f · series(t) · loads`. Patterns
/// are applied in insertion order. Single-point constraints owned by the
/// pattern live in the domain and are scaled by the same factor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadPattern {
    pub tag: usize,
    pub series: TimeSeries,
    /// Constant scale on top of the series
    pub gamma_f: f64,
    nodal_loads: Vec<NodalLoad>,
    element_loads: Vec<(usize, ElementLoad)>,
    sp_tags: Vec<usize>,
    #[serde(default)]
    current_factor: f64,
}

impl LoadPattern {
    pub fn new(tag: usize, series: TimeSeries) -> Self {
        Self {
            tag,
            series,
            gamma_f: 1.0,
            nodal_loads: Vec::new(),
            element_loads: Vec::new(),
            sp_tags: Vec::new(),
            current_factor: 0.0,
        }
    }

    pub fn with_gamma(mut self, gamma_f: f64) -> Self {
        self.gamma_f = gamma_f;
        self
    }

    pub fn load_factor(&self, t: f64) -> f64 {
        self.gamma_f * self.series.factor(t)
    }

    /// Factor used by the last application of the pattern
    pub fn current_factor(&self) -> f64 {
        self.current_factor
    }

    pub(crate) fn set_current_factor(&mut self, factor: f64) {
        self.current_factor = factor;
    }

    pub(crate) fn push_nodal_load(&mut self, load: NodalLoad) {
        self.nodal_loads.push(load);
    }

    pub(crate) fn push_element_load(&mut self, element: usize, load: ElementLoad) {
        self.element_loads.push((element, load));
    }

    pub(crate) fn push_sp(&mut self, tag: usize) {
        self.sp_tags.push(tag);
    }

    pub(crate) fn remove_sp(&mut self, tag: usize) {
        self.sp_tags.retain(|t| *t != tag);
    }

    pub fn nodal_loads(&self) -> &[NodalLoad] {
        &self.nodal_loads
    }

    pub fn element_loads(&self) -> &[(usize, ElementLoad)] {
        &self.element_loads
    }

    pub fn sp_tags(&self) -> &[usize] {
        &self.sp_tags
    }

    pub fn is_empty(&self) -> bool {
        self.nodal_loads.is_empty() && self.element_loads.is_empty() && self.sp_tags.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_factor_scales_series() {
        let p = LoadPattern::new(1, TimeSeries::linear(2.0)).with_gamma(1.5);
        assert_relative_eq!(p.load_factor(0.5), 1.5);
        assert!(p.is_empty());
    }
}
