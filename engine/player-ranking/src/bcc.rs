//! Birdie Chances Created
//!
//! Synthetic metric built from GIR, approach strokes gained, proximity,
//! putting and scoring. The weights below are calibration constants.

use crate::config::CourseSetup;
use crate::metrics::{
    insert_at, ApproachMetric, ApproachStat, DistanceBucket, IndexRemap, Lie, MetricVector,
    PreBccVector, RoundMetric, BCC_INSERT_INDEX,
};

const GIR_WEIGHT: f64 = 0.40;
const APPROACH_WEIGHT: f64 = 0.30;
const PUTTING_WEIGHT: f64 = 0.25;
const SCORING_WEIGHT: f64 = 0.05;
const SCORING_CEILING: f64 = 74.0;
/// Feet of proximity that cost one unit of approach strokes gained
const PROXIMITY_DIVISOR: f64 = 30.0;
/// Fairway share assumed when driving accuracy is unknown
const DEFAULT_FAIRWAY_SHARE: f64 = 0.6;

/// Distance-weighted composite of one approach stat, split by lie
fn weighted_component(
    vector: &PreBccVector,
    stat: ApproachStat,
    bucket_weights: &[f64; 4],
    fairway_share: f64,
) -> f64 {
    DistanceBucket::ALL
        .iter()
        .zip(bucket_weights)
        .map(|(bucket, weight)| {
            let fairway = vector.approach(ApproachMetric::new(Lie::Fairway, *bucket, stat));
            let rough = vector.approach(ApproachMetric::new(Lie::Rough, *bucket, stat));
            weight * (fairway_share * fairway + (1.0 - fairway_share) * rough)
        })
        .sum()
}

/// Compute BCC from a pre-BCC vector
pub fn birdie_chances_created(vector: &PreBccVector, setup: &CourseSetup) -> f64 {
    let bucket_weights = setup.normalized();

    let accuracy = vector.round(RoundMetric::DrivingAccuracy);
    let fairway_share =
        if accuracy > 0.0 && accuracy <= 1.0 { accuracy } else { DEFAULT_FAIRWAY_SHARE };

    let gir = weighted_component(vector, ApproachStat::Gir, &bucket_weights, fairway_share);
    let approach_sg =
        weighted_component(vector, ApproachStat::StrokesGained, &bucket_weights, fairway_share);
    let proximity =
        weighted_component(vector, ApproachStat::Proximity, &bucket_weights, fairway_share);

    let putting = vector.round(RoundMetric::SgPutting);
    let scoring_average = vector.round(RoundMetric::ScoringAverage);
    // No scoring data means no scoring credit, not a 74-stroke bonus
    let scoring_term =
        if scoring_average > 0.0 { SCORING_CEILING - scoring_average } else { 0.0 };

    let value = GIR_WEIGHT * gir
        + APPROACH_WEIGHT * (approach_sg - proximity / PROXIMITY_DIVISOR)
        + PUTTING_WEIGHT * putting
        + SCORING_WEIGHT * scoring_term;

    if value.is_finite() {
        value
    } else {
        0.0
    }
}

/// Compute BCC and return the final vector with BCC inserted
pub fn insert_bcc(vector: &PreBccVector, setup: &CourseSetup) -> (MetricVector, IndexRemap) {
    let bcc = birdie_chances_created(vector, setup);
    insert_at(vector, BCC_INSERT_INDEX, bcc)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_even() -> CourseSetup {
        CourseSetup { under_100: 1.0, from_100_to_150: 1.0, from_150_to_200: 1.0, over_200: 1.0 }
    }

    fn fill(vector: &mut PreBccVector, stat: ApproachStat, fairway: f64, rough: f64) {
        for bucket in DistanceBucket::ALL {
            vector.0[ApproachMetric::new(Lie::Fairway, bucket, stat).pre_index()] = fairway;
            vector.0[ApproachMetric::new(Lie::Rough, bucket, stat).pre_index()] = rough;
        }
    }

    #[test]
    fn test_formula() {
        let mut vector = PreBccVector::zeroed();
        vector.0[RoundMetric::DrivingAccuracy.pre_index()] = 0.5;
        vector.0[RoundMetric::SgPutting.pre_index()] = 0.4;
        vector.0[RoundMetric::ScoringAverage.pre_index()] = 70.0;
        fill(&mut vector, ApproachStat::Gir, 0.8, 0.6);
        fill(&mut vector, ApproachStat::StrokesGained, 1.0, 0.0);
        fill(&mut vector, ApproachStat::Proximity, 30.0, 30.0);

        let bcc = birdie_chances_created(&vector, &setup_even());
        // gir 0.7, sg 0.5, prox 30
        let expected = 0.40 * 0.7 + 0.30 * (0.5 - 1.0) + 0.25 * 0.4 + 0.05 * 4.0;
        assert!((bcc - expected).abs() < 1e-12);
    }

    #[test]
    fn test_missing_accuracy_uses_default_split() {
        let mut vector = PreBccVector::zeroed();
        fill(&mut vector, ApproachStat::Gir, 1.0, 0.0);
        let bcc = birdie_chances_created(&vector, &setup_even());
        assert!((bcc - 0.40 * 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_missing_scoring_average_earns_nothing() {
        let vector = PreBccVector::zeroed();
        assert_eq!(birdie_chances_created(&vector, &setup_even()), 0.0);
    }

    #[test]
    fn test_insert_shifts_following_metrics() {
        let mut vector = PreBccVector::zeroed();
        for (i, v) in vector.0.iter_mut().enumerate() {
            *v = i as f64 + 100.0;
        }
        let (post, remap) = insert_bcc(&vector, &CourseSetup::default());
        assert_eq!(post.len(), vector.0.len() + 1);
        for pre in 0..vector.0.len() {
            assert_eq!(post.get(remap.post_index(pre)), vector.0[pre]);
        }
        assert_eq!(post.get(BCC_INSERT_INDEX + 1), vector.0[BCC_INSERT_INDEX]);
    }
}
