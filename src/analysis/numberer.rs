//! Node ordering for equation numbering

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::Domain;
use crate::math::reverse_cuthill_mckee;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Numberer {
    /// Ascending node tags
    Plain,
    /// Reverse Cuthill–McKee on the node graph
    #[default]
    Rcm,
}

impl Numberer {
    /// Node tags in equation order
    ///
    /// Two nodes are adjacent when they share an element or a multi-point
    /// constraint.
    pub fn order(&self, domain: &Domain) -> Vec<usize> {
        let tags: Vec<usize> = domain.nodes().map(|n| n.tag).collect();
        match self {
            Numberer::Plain => tags,
            Numberer::Rcm => {
                let index: BTreeMap<usize, usize> =
                    tags.iter().enumerate().map(|(i, t)| (*t, i)).collect();
                let mut adj = vec![Vec::new(); tags.len()];
                let mut connect = |group: &[usize]| {
                    let ids: Vec<usize> = group.iter().filter_map(|t| index.get(t).copied()).collect();
                    for &a in &ids {
                        for &b in &ids {
                            if a != b {
                                adj[a].push(b);
                            }
                        }
                    }
                };
                for e in domain.elements() {
                    connect(e.node_tags());
                }
                for mp in domain.mp_constraints() {
                    let mut group = vec![mp.constrained_node];
                    group.extend(mp.retained_nodes());
                    connect(&group);
                }
                reverse_cuthill_mckee(&adj).into_iter().map(|i| tags[i]).collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{ElasticBeam2d, Node};
    use crate::sections::CrossSectionProperties;
    use crate::transform::CrdTransf;

    fn chain(order: &[usize]) -> Domain {
        let mut d = Domain::new();
        for (i, t) in order.iter().enumerate() {
            d.add_node(Node::new(*t, &[i as f64, 0.0], 3).unwrap()).unwrap();
        }
        for (k, w) in order.windows(2).enumerate() {
            let props = CrossSectionProperties::new(1.0, 1.0, 1.0, 1.0, 1.0, 1.0);
            let e = ElasticBeam2d::new(k + 1, w[0], w[1], props, CrdTransf::linear_2d()).unwrap();
            d.add_element(e).unwrap();
        }
        d
    }

    #[test]
    fn test_rcm_follows_connectivity() {
        // tags scattered along the chain
        let d = chain(&[5, 1, 4, 2, 3]);
        assert_eq!(Numberer::Plain.order(&d), vec![1, 2, 3, 4, 5]);
        let rcm = Numberer::Rcm.order(&d);
        assert_eq!(rcm.len(), 5);
        let pos = |t: usize| rcm.iter().position(|x| *x == t).unwrap() as isize;
        for w in [5, 1, 4, 2, 3].windows(2) {
            assert_eq!((pos(w[0]) - pos(w[1])).abs(), 1);
        }
    }
}
