//! Field ordering and rank assignment

use std::cmp::Ordering;
use tracing::debug;

use crate::models::PlayerScore;

/// Scores this close are ordered by the composite score
pub const CLOSE_SCORE_MARGIN: f64 = 0.05;
/// Players with identical scores share a rank only when WAR is this close
pub const SHARED_RANK_WAR_MARGIN: f64 = 0.01;

const COMPOSITE_SCORE_WEIGHT: f64 = 0.7;
const COMPOSITE_WAR_WEIGHT: f64 = 0.3;

/// Tie-break blend of refined score and WAR
pub fn composite_score(player: &PlayerScore) -> f64 {
    COMPOSITE_SCORE_WEIGHT * player.refined_weighted_score + COMPOSITE_WAR_WEIGHT * player.war
}

/// Ordering of two players; `Less` means `a` ranks ahead of `b`.
///
/// The "close" rule is not transitive, so this must not be handed to
/// `sort_by`.
pub fn compare(a: &PlayerScore, b: &PlayerScore) -> Ordering {
    let (sa, sb) = (a.refined_weighted_score, b.refined_weighted_score);
    if sa == sb {
        b.war.total_cmp(&a.war)
    } else if (sa - sb).abs() <= CLOSE_SCORE_MARGIN {
        composite_score(b).total_cmp(&composite_score(a))
    } else {
        sb.total_cmp(&sa)
    }
}

/// Identical scores with WAR this close share a rank
pub fn shares_rank(a: &PlayerScore, b: &PlayerScore) -> bool {
    a.refined_weighted_score == b.refined_weighted_score
        && (a.war - b.war).abs() < SHARED_RANK_WAR_MARGIN
}

/// Split a field into blocks of players that must share a rank.
///
/// Players are ordered by score, then WAR descending, then id. A new block
/// starts whenever the score changes or the WAR gap to the previous player
/// reaches the margin, so chained near-equal WARs end up together.
fn tie_blocks(mut players: Vec<PlayerScore>) -> Vec<Vec<PlayerScore>> {
    players.sort_by(|a, b| {
        b.refined_weighted_score
            .total_cmp(&a.refined_weighted_score)
            .then_with(|| b.war.total_cmp(&a.war))
            .then_with(|| a.id.cmp(&b.id))
    });

    let mut blocks: Vec<Vec<PlayerScore>> = Vec::new();
    for player in players {
        let tied = blocks
            .last()
            .and_then(|block| block.last())
            .is_some_and(|prev| shares_rank(prev, &player));
        match blocks.last_mut() {
            Some(block) if tied => block.push(player),
            _ => blocks.push(vec![player]),
        }
    }
    blocks
}

/// Stable insertion sort of tie blocks, compared by their leading player
fn insertion_sort(blocks: &mut [Vec<PlayerScore>]) {
    for i in 1..blocks.len() {
        let mut j = i;
        while j > 0 && compare(&blocks[j - 1][0], &blocks[j][0]) == Ordering::Greater {
            blocks.swap(j - 1, j);
            j -= 1;
        }
    }
}

/// Order the field and assign competition-style ranks (1, 1, 3)
pub fn rank_players(players: Vec<PlayerScore>) -> Vec<PlayerScore> {
    let mut blocks = tie_blocks(players);
    insertion_sort(&mut blocks);

    let mut ranked = Vec::with_capacity(blocks.iter().map(Vec::len).sum());
    for block in blocks {
        let rank = ranked.len() as u32 + 1;
        for mut player in block {
            player.rank = rank;
            ranked.push(player);
        }
    }

    debug!("Ranked {} players", ranked.len());
    ranked
}
