//! Eligibility Classifier: is partition routing worth attempting for a star?

use crate::catalog::PartitionCatalog;
use crate::core::Bgp;
use crate::routing::star_decomposer::Star;
use serde::Serialize;

/// Why a star is not routed at all.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Ineligible {
    /// Fetching a partition for one pattern never pays off
    SinglePattern,
    VariablePredicate,
    InfrequentPredicate { predicate: String },
}

/// Classifies `star` (a star of `bgp`) against `catalog`.
///
/// A star is eligible when it has at least two patterns, all with a bound
/// predicate, none of which is infrequent.
pub fn classify(star: &Star, bgp: &Bgp, catalog: &PartitionCatalog) -> Result<(), Ineligible> {
    if star.len() < 2 {
        return Err(Ineligible::SinglePattern);
    }

    for pattern in star.positions.iter().filter_map(|&i| bgp.patterns().get(i)) {
        match pattern.predicate_iri() {
            None => return Err(Ineligible::VariablePredicate),
            Some(predicate) if catalog.is_infrequent(predicate) => {
                return Err(Ineligible::InfrequentPredicate { predicate: predicate.to_string() });
            }
            Some(_) => {}
        }
    }

    Ok(())
}

pub fn is_eligible(star: &Star, bgp: &Bgp, catalog: &PartitionCatalog) -> bool {
    classify(star, bgp, catalog).is_ok()
}
