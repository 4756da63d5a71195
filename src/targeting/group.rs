// src/targeting/group.rs

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::targeting::predicate::TargetingPredicate;

#[derive(Error, Debug)]
pub enum TargetingError {
    #[error("click-through rate {0} is outside [0, 1]")]
    InvalidClickThroughRate(f64),
}

/// A named bundle of predicates guarding one advertisement's
/// eligibility, together with its CTR estimate. Built by the external
/// persistence layer per request and never mutated afterwards.
///
/// Predicate order carries no meaning; every predicate is evaluated
/// independently.
#[derive(Clone)]
pub struct TargetingGroup {
    id: String,
    content_id: String,
    click_through_rate: f64,
    predicates: Vec<Arc<dyn TargetingPredicate>>,
}

impl TargetingGroup {
    /// Rejects NaN, negative and > 1 CTR values up front so the ranking
    /// step never has to deal with them.
    pub fn new(
        id: &str,
        content_id: &str,
        click_through_rate: f64,
        predicates: Vec<Arc<dyn TargetingPredicate>>,
    ) -> Result<Self, TargetingError> {
        if click_through_rate.is_nan() || !(0.0..=1.0).contains(&click_through_rate) {
            return Err(TargetingError::InvalidClickThroughRate(click_through_rate));
        }
        Ok(Self {
            id: id.to_string(),
            content_id: content_id.to_string(),
            click_through_rate,
            predicates,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn content_id(&self) -> &str {
        &self.content_id
    }

    pub fn click_through_rate(&self) -> f64 {
        self.click_through_rate
    }

    pub fn predicates(&self) -> &[Arc<dyn TargetingPredicate>] {
        &self.predicates
    }
}

impl fmt::Debug for TargetingGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TargetingGroup")
            .field("id", &self.id)
            .field("content_id", &self.content_id)
            .field("click_through_rate", &self.click_through_rate)
            .field(
                "predicates",
                &self.predicates.iter().map(|p| p.name().to_string()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn rejects_out_of_range_ctr() {
        assert!(TargetingGroup::new("tg1", "c1", -0.1, Vec::new()).is_err());
        assert!(TargetingGroup::new("tg1", "c1", 1.01, Vec::new()).is_err());
        assert!(TargetingGroup::new("tg1", "c1", f64::NAN, Vec::new()).is_err());
    }

    #[test]
    fn accepts_boundary_ctr() {
        assert!(TargetingGroup::new("tg1", "c1", 0.0, Vec::new()).is_ok());
        assert!(TargetingGroup::new("tg1", "c1", 1.0, Vec::new()).is_ok());
    }

    proptest! {
        #[test]
        fn accepts_any_ctr_in_unit_interval(ctr in 0.0f64..=1.0) {
            let group = TargetingGroup::new("tg", "c", ctr, Vec::new()).unwrap();
            prop_assert_eq!(group.click_through_rate(), ctr);
        }
    }
}
