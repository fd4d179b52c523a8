//! Section aggregator: a base section plus uncoupled uniaxial responses

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use super::{ResponseCode, Section, SectionBehavior};
use crate::error::{FEAError, FEAResult, TrialStatus};
use crate::materials::UniaxialMaterial;

/// Composes a base section with additional uniaxial force-deformation laws
///
/// Added responses are kept in canonical code order after the base codes.
/// The composed tangent is block diagonal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionAggregator {
    base: Option<Box<Section>>,
    additions: Vec<(ResponseCode, UniaxialMaterial)>,
}

impl SectionAggregator {
    /// Fails when a code appears twice, in the additions or in the base
    pub fn new(
        base: Option<Section>,
        mut additions: Vec<(ResponseCode, UniaxialMaterial)>,
    ) -> FEAResult<Self> {
        additions.sort_by_key(|(c, _)| *c);
        let mut seen = base.as_ref().map(Section::codes).unwrap_or_default();
        for (code, _) in &additions {
            if seen.contains(code) {
                return Err(FEAError::InvalidInput(format!(
                    "response code {code:?} aggregated twice"
                )));
            }
            seen.push(*code);
        }
        if seen.is_empty() {
            return Err(FEAError::InvalidInput("empty section aggregator".to_string()));
        }
        Ok(Self {
            base: base.map(Box::new),
            additions,
        })
    }

    pub fn base(&self) -> Option<&Section> {
        self.base.as_deref()
    }

    fn base_order(&self) -> usize {
        self.base.as_ref().map_or(0, |b| b.order())
    }
}

impl SectionBehavior for SectionAggregator {
    fn class_name(&self) -> &'static str {
        "SectionAggregator"
    }

    fn codes(&self) -> Vec<ResponseCode> {
        let mut codes = self.base.as_ref().map(|b| b.codes()).unwrap_or_default();
        codes.extend(self.additions.iter().map(|(c, _)| *c));
        codes
    }

    fn set_trial_deformation(&mut self, deformation: &DVector<f64>) -> TrialStatus {
        let nb = self.base_order();
        let mut status = TrialStatus::Ok;
        if let Some(base) = self.base.as_mut() {
            let e = deformation.rows(0, nb).into_owned();
            status = base.set_trial_deformation(&e);
        }
        for (k, (_, m)) in self.additions.iter_mut().enumerate() {
            status = status.and(m.set_trial_strain(deformation[nb + k], 0.0));
        }
        status
    }

    fn deformation(&self) -> DVector<f64> {
        let mut e: Vec<f64> = self
            .base
            .as_ref()
            .map(|b| b.deformation().iter().copied().collect())
            .unwrap_or_default();
        e.extend(self.additions.iter().map(|(_, m)| m.strain()));
        DVector::from_vec(e)
    }

    fn stress_resultant(&self) -> DVector<f64> {
        let mut s: Vec<f64> = self
            .base
            .as_ref()
            .map(|b| b.stress_resultant().iter().copied().collect())
            .unwrap_or_default();
        s.extend(self.additions.iter().map(|(_, m)| m.stress()));
        DVector::from_vec(s)
    }

    fn tangent(&self) -> DMatrix<f64> {
        block_diagonal(self.base.as_ref().map(|b| b.tangent()), &self.additions, |m| m.tangent())
    }

    fn initial_tangent(&self) -> DMatrix<f64> {
        block_diagonal(
            self.base.as_ref().map(|b| b.initial_tangent()),
            &self.additions,
            |m| m.initial_tangent(),
        )
    }

    fn commit_state(&mut self) {
        if let Some(b) = self.base.as_mut() {
            b.commit_state();
        }
        self.additions.iter_mut().for_each(|(_, m)| m.commit_state());
    }

    fn revert_to_last_commit(&mut self) {
        if let Some(b) = self.base.as_mut() {
            b.revert_to_last_commit();
        }
        self.additions.iter_mut().for_each(|(_, m)| m.revert_to_last_commit());
    }

    fn revert_to_start(&mut self) {
        if let Some(b) = self.base.as_mut() {
            b.revert_to_start();
        }
        self.additions.iter_mut().for_each(|(_, m)| m.revert_to_start());
    }

    fn area(&self) -> f64 {
        self.base.as_ref().map_or(0.0, |b| b.area())
    }

    fn linear_density(&self) -> f64 {
        self.base.as_ref().map_or(0.0, |b| b.linear_density())
    }
}

fn block_diagonal(
    base: Option<DMatrix<f64>>,
    additions: &[(ResponseCode, UniaxialMaterial)],
    modulus: impl Fn(&UniaxialMaterial) -> f64,
) -> DMatrix<f64> {
    let nb = base.as_ref().map_or(0, |k| k.nrows());
    let n = nb + additions.len();
    let mut k = DMatrix::zeros(n, n);
    if let Some(kb) = base {
        k.view_mut((0, 0), (nb, nb)).copy_from(&kb);
    }
    for (i, (_, m)) in additions.iter().enumerate() {
        k[(nb + i, nb + i)] = modulus(m);
    }
    k
}
