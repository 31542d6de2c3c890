//! Metric catalog and vector indexing
//!
//! Every slot in a player's metric vector maps to exactly one [`MetricKey`].
//! Two layouts exist: the pre-BCC layout produced by the averager and the
//! final layout with Birdie Chances Created inserted at [`BCC_INSERT_INDEX`].
//! The two are kept apart as distinct vector types so a position from one
//! layout can never be used against the other by accident.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Average shots per round used to convert per-shot strokes gained to per-round
pub const AVG_SHOTS_PER_ROUND: f64 = 18.0;

/// Position of Birdie Chances Created in the final vector
pub const BCC_INSERT_INDEX: usize = 14;

/// Ceiling used for every proximity metric (feet)
pub const PROXIMITY_CEILING: f64 = 60.0;

/// Ceiling used for scoring average
pub const SCORING_AVERAGE_CEILING: f64 = 74.0;

/// Ceiling used for poor shots per round
pub const POOR_SHOTS_CEILING: f64 = 20.0;

/// Which way a metric improves
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Direction {
    HigherIsBetter,
    /// Present values are transformed to `ceiling - raw` before scoring
    LowerIsBetter { ceiling: f64 },
}

/// Per-round metrics recorded in the historical round table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RoundMetric {
    SgTotal,
    DrivingDistance,
    DrivingAccuracy,
    SgT2g,
    SgApproach,
    SgAroundGreen,
    SgOffTee,
    SgPutting,
    GreensInRegulation,
    Scrambling,
    GreatShots,
    PoorShots,
    ScoringAverage,
    BirdiesOrBetter,
    FairwayProximity,
    RoughProximity,
}

impl RoundMetric {
    /// All round metrics in pre-BCC vector order
    pub const ALL: [RoundMetric; 16] = [
        RoundMetric::SgTotal,
        RoundMetric::DrivingDistance,
        RoundMetric::DrivingAccuracy,
        RoundMetric::SgT2g,
        RoundMetric::SgApproach,
        RoundMetric::SgAroundGreen,
        RoundMetric::SgOffTee,
        RoundMetric::SgPutting,
        RoundMetric::GreensInRegulation,
        RoundMetric::Scrambling,
        RoundMetric::GreatShots,
        RoundMetric::PoorShots,
        RoundMetric::ScoringAverage,
        RoundMetric::BirdiesOrBetter,
        RoundMetric::FairwayProximity,
        RoundMetric::RoughProximity,
    ];

    /// Column name in the round table
    pub fn field(&self) -> &'static str {
        match self {
            RoundMetric::SgTotal => "sg_total",
            RoundMetric::DrivingDistance => "driving_distance",
            RoundMetric::DrivingAccuracy => "driving_accuracy",
            RoundMetric::SgT2g => "sg_t2g",
            RoundMetric::SgApproach => "sg_approach",
            RoundMetric::SgAroundGreen => "sg_around_green",
            RoundMetric::SgOffTee => "sg_ott",
            RoundMetric::SgPutting => "sg_putting",
            RoundMetric::GreensInRegulation => "greens_in_regulation",
            RoundMetric::Scrambling => "scrambling",
            RoundMetric::GreatShots => "great_shots",
            RoundMetric::PoorShots => "poor_shots",
            RoundMetric::ScoringAverage => "scoring_average",
            RoundMetric::BirdiesOrBetter => "birdies_or_better",
            RoundMetric::FairwayProximity => "fairway_proximity",
            RoundMetric::RoughProximity => "rough_proximity",
        }
    }

    /// Display name, also used to reference the metric from configuration
    pub fn name(&self) -> &'static str {
        match self {
            RoundMetric::SgTotal => "SG Total",
            RoundMetric::DrivingDistance => "Driving Distance",
            RoundMetric::DrivingAccuracy => "Driving Accuracy",
            RoundMetric::SgT2g => "SG T2G",
            RoundMetric::SgApproach => "SG Approach",
            RoundMetric::SgAroundGreen => "SG Around Green",
            RoundMetric::SgOffTee => "SG OTT",
            RoundMetric::SgPutting => "SG Putting",
            RoundMetric::GreensInRegulation => "Greens in Regulation",
            RoundMetric::Scrambling => "Scrambling",
            RoundMetric::GreatShots => "Great Shots",
            RoundMetric::PoorShots => "Poor Shots",
            RoundMetric::ScoringAverage => "Scoring Average",
            RoundMetric::BirdiesOrBetter => "Birdies or Better",
            RoundMetric::FairwayProximity => "Fairway Proximity",
            RoundMetric::RoughProximity => "Rough Proximity",
        }
    }

    pub fn from_field(field: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|m| m.field() == field)
    }

    /// Stored as a 0-1 fraction
    pub fn is_percent(&self) -> bool {
        matches!(
            self,
            RoundMetric::DrivingAccuracy
                | RoundMetric::GreensInRegulation
                | RoundMetric::Scrambling
                | RoundMetric::BirdiesOrBetter
        )
    }

    pub fn is_putting(&self) -> bool {
        matches!(self, RoundMetric::SgPutting)
    }

    pub fn direction(&self) -> Direction {
        match self {
            RoundMetric::PoorShots => Direction::LowerIsBetter { ceiling: POOR_SHOTS_CEILING },
            RoundMetric::ScoringAverage => {
                Direction::LowerIsBetter { ceiling: SCORING_AVERAGE_CEILING }
            }
            RoundMetric::FairwayProximity | RoundMetric::RoughProximity => {
                Direction::LowerIsBetter { ceiling: PROXIMITY_CEILING }
            }
            _ => Direction::HigherIsBetter,
        }
    }

    /// Position in the pre-BCC vector
    pub fn pre_index(&self) -> usize {
        *self as usize
    }
}

/// Lie the approach shot was played from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Lie {
    Fairway,
    Rough,
}

impl Lie {
    pub const ALL: [Lie; 2] = [Lie::Fairway, Lie::Rough];

    pub fn field(&self) -> &'static str {
        match self {
            Lie::Fairway => "fairway",
            Lie::Rough => "rough",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Lie::Fairway => "FW",
            Lie::Rough => "Rough",
        }
    }
}

/// Approach distance bucket (yards)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DistanceBucket {
    Under100,
    From100To150,
    From150To200,
    Over200,
}

impl DistanceBucket {
    pub const ALL: [DistanceBucket; 4] = [
        DistanceBucket::Under100,
        DistanceBucket::From100To150,
        DistanceBucket::From150To200,
        DistanceBucket::Over200,
    ];

    pub fn field(&self) -> &'static str {
        match self {
            DistanceBucket::Under100 => "under_100",
            DistanceBucket::From100To150 => "100_150",
            DistanceBucket::From150To200 => "150_200",
            DistanceBucket::Over200 => "over_200",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DistanceBucket::Under100 => "<100",
            DistanceBucket::From100To150 => "100-150",
            DistanceBucket::From150To200 => "150-200",
            DistanceBucket::Over200 => ">200",
        }
    }
}

/// Statistic recorded per approach category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ApproachStat {
    Gir,
    StrokesGained,
    Proximity,
}

impl ApproachStat {
    pub const ALL: [ApproachStat; 3] =
        [ApproachStat::Gir, ApproachStat::StrokesGained, ApproachStat::Proximity];

    pub fn field(&self) -> &'static str {
        match self {
            ApproachStat::Gir => "gir",
            ApproachStat::StrokesGained => "sg",
            ApproachStat::Proximity => "proximity",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ApproachStat::Gir => "GIR",
            ApproachStat::StrokesGained => "SG",
            ApproachStat::Proximity => "Prox",
        }
    }
}

/// One approach-skill slot, e.g. fairway 150-200 proximity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ApproachMetric {
    pub lie: Lie,
    pub bucket: DistanceBucket,
    pub stat: ApproachStat,
}

impl ApproachMetric {
    pub fn new(lie: Lie, bucket: DistanceBucket, stat: ApproachStat) -> Self {
        Self { lie, bucket, stat }
    }

    /// All approach metrics in pre-BCC vector order (lie, then bucket, then stat)
    pub fn all() -> Vec<ApproachMetric> {
        let mut out = Vec::with_capacity(24);
        for lie in Lie::ALL {
            for bucket in DistanceBucket::ALL {
                for stat in ApproachStat::ALL {
                    out.push(ApproachMetric::new(lie, bucket, stat));
                }
            }
        }
        out
    }

    /// Category key in a player's approach table, e.g. `fairway_100_150`
    pub fn category(&self) -> String {
        format!("{}_{}", self.lie.field(), self.bucket.field())
    }

    /// Flat column name in the approach table, e.g. `fairway_100_150_gir`
    pub fn field(&self) -> String {
        format!("{}_{}", self.category(), self.stat.field())
    }

    pub fn name(&self) -> String {
        format!("Approach {} {} {}", self.bucket.label(), self.lie.label(), self.stat.label())
    }

    pub fn from_field(field: &str) -> Option<Self> {
        Self::all().into_iter().find(|m| m.field() == field)
    }

    pub fn direction(&self) -> Direction {
        match self.stat {
            ApproachStat::Proximity => Direction::LowerIsBetter { ceiling: PROXIMITY_CEILING },
            _ => Direction::HigherIsBetter,
        }
    }

    /// Position in the pre-BCC vector
    pub fn pre_index(&self) -> usize {
        let lie = self.lie as usize;
        let bucket = self.bucket as usize;
        let stat = self.stat as usize;
        RoundMetric::ALL.len() + lie * 12 + bucket * 3 + stat
    }
}

/// Any slot of the final metric vector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MetricKey {
    Round(RoundMetric),
    BirdieChancesCreated,
    Approach(ApproachMetric),
}

impl MetricKey {
    pub fn name(&self) -> String {
        match self {
            MetricKey::Round(m) => m.name().to_string(),
            MetricKey::BirdieChancesCreated => "Birdie Chances Created".to_string(),
            MetricKey::Approach(m) => m.name(),
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            MetricKey::Round(m) => m.direction(),
            MetricKey::BirdieChancesCreated => Direction::HigherIsBetter,
            MetricKey::Approach(m) => m.direction(),
        }
    }

    /// Scoring, birdie and par metrics get the superlinear outlier penalty
    pub fn is_scoring_family(&self) -> bool {
        matches!(
            self,
            MetricKey::Round(RoundMetric::ScoringAverage)
                | MetricKey::Round(RoundMetric::BirdiesOrBetter)
                | MetricKey::BirdieChancesCreated
        )
    }

    /// Map a raw (present) value into "higher is better" space.
    ///
    /// Zero means missing and stays zero so a player with no data is never
    /// promoted to the ceiling.
    pub fn transform(&self, raw: f64) -> f64 {
        if raw == 0.0 {
            return 0.0;
        }
        match self.direction() {
            Direction::HigherIsBetter => raw,
            Direction::LowerIsBetter { ceiling } => ceiling - raw,
        }
    }
}

impl fmt::Display for MetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Maps pre-BCC positions to final positions after one insertion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRemap {
    pub inserted_at: usize,
}

impl IndexRemap {
    pub fn post_index(&self, pre: usize) -> usize {
        if pre < self.inserted_at {
            pre
        } else {
            pre + 1
        }
    }
}

/// Metric values laid out in pre-BCC order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreBccVector(pub Vec<f64>);

impl PreBccVector {
    pub fn zeroed() -> Self {
        Self(vec![0.0; RoundMetric::ALL.len() + 24])
    }

    pub fn round(&self, metric: RoundMetric) -> f64 {
        self.0[metric.pre_index()]
    }

    pub fn approach(&self, metric: ApproachMetric) -> f64 {
        self.0[metric.pre_index()]
    }
}

/// Metric values laid out in final (post-BCC) order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricVector(pub Vec<f64>);

impl MetricVector {
    pub fn get(&self, index: usize) -> f64 {
        self.0.get(index).copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Insert `value` at `index`, returning a new vector and the remap table
pub fn insert_at(values: &PreBccVector, index: usize, value: f64) -> (MetricVector, IndexRemap) {
    let index = index.min(values.0.len());
    let mut out = Vec::with_capacity(values.0.len() + 1);
    out.extend_from_slice(&values.0[..index]);
    out.push(value);
    out.extend_from_slice(&values.0[index..]);
    (MetricVector(out), IndexRemap { inserted_at: index })
}

/// Ordered list of every metric in the final vector
#[derive(Debug, Clone)]
pub struct MetricCatalog {
    keys: Vec<MetricKey>,
    remap: IndexRemap,
}

impl MetricCatalog {
    pub fn standard() -> Self {
        let mut pre: Vec<MetricKey> =
            RoundMetric::ALL.iter().map(|m| MetricKey::Round(*m)).collect();
        pre.extend(ApproachMetric::all().into_iter().map(MetricKey::Approach));

        let remap = IndexRemap { inserted_at: BCC_INSERT_INDEX };
        let mut keys = pre;
        keys.insert(BCC_INSERT_INDEX, MetricKey::BirdieChancesCreated);
        Self { keys, remap }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> &[MetricKey] {
        &self.keys
    }

    pub fn key(&self, index: usize) -> Option<MetricKey> {
        self.keys.get(index).copied()
    }

    /// Final-vector position for a metric name
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.keys.iter().position(|k| k.name() == name)
    }

    /// Final-vector position for a key
    pub fn index_of_key(&self, key: MetricKey) -> Option<usize> {
        self.keys.iter().position(|k| *k == key)
    }

    pub fn round_index(&self, metric: RoundMetric) -> usize {
        self.remap.post_index(metric.pre_index())
    }
}

impl Default for MetricCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_names_are_unique() {
        let catalog = MetricCatalog::standard();
        let names: HashSet<String> = catalog.keys().iter().map(|k| k.name()).collect();
        assert_eq!(names.len(), catalog.len());
        assert_eq!(catalog.len(), 41);
    }

    #[test]
    fn test_bcc_sits_before_fairway_proximity() {
        let catalog = MetricCatalog::standard();
        assert_eq!(catalog.key(BCC_INSERT_INDEX), Some(MetricKey::BirdieChancesCreated));
        assert_eq!(
            catalog.key(BCC_INSERT_INDEX + 1),
            Some(MetricKey::Round(RoundMetric::FairwayProximity))
        );
        assert_eq!(catalog.round_index(RoundMetric::BirdiesOrBetter), 13);
        assert_eq!(catalog.round_index(RoundMetric::RoughProximity), 16);
    }

    #[test]
    fn test_approach_pre_index_matches_enumeration_order() {
        for (offset, metric) in ApproachMetric::all().into_iter().enumerate() {
            assert_eq!(metric.pre_index(), RoundMetric::ALL.len() + offset);
        }
    }

    #[test]
    fn test_insert_at_shifts_tail() {
        let pre = PreBccVector(vec![1.0, 2.0, 3.0]);
        let (post, remap) = insert_at(&pre, 1, 9.0);
        assert_eq!(post.0, vec![1.0, 9.0, 2.0, 3.0]);
        assert_eq!(remap.post_index(0), 0);
        assert_eq!(remap.post_index(1), 2);
        assert_eq!(remap.post_index(2), 3);
    }

    #[test]
    fn test_transform_lower_is_better() {
        let prox = MetricKey::Round(RoundMetric::FairwayProximity);
        assert_eq!(prox.transform(45.0), 15.0);
        assert_eq!(prox.transform(0.0), 0.0);
        assert_eq!(MetricKey::Round(RoundMetric::SgTotal).transform(1.2), 1.2);
    }

    #[test]
    fn test_field_lookup() {
        assert_eq!(RoundMetric::from_field("sg_putting"), Some(RoundMetric::SgPutting));
        assert_eq!(
            ApproachMetric::from_field("rough_over_200_sg"),
            Some(ApproachMetric::new(
                Lie::Rough,
                DistanceBucket::Over200,
                ApproachStat::StrokesGained
            ))
        );
        assert_eq!(RoundMetric::from_field("nope"), None);
    }
}
