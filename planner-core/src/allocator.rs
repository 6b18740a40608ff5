use serde::{Deserialize, Serialize};

use crate::error::PlanError;

/// A topic to study, with its relative importance.
///
/// The weight is relative, not absolute hours: `{A: 8, B: 4}` and
/// `{A: 2, B: 1}` produce the same split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicInput {
    pub name: String,
    pub weight: f64,
}

impl TopicInput {
    pub fn new(name: impl Into<String>, weight: f64) -> Self {
        Self {
            name: name.into(),
            weight,
        }
    }
}

/// Hours assigned to one topic, plus its position in the study order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicAllocation {
    pub name: String,
    pub weight: f64,
    pub allocated_hours: f64,
    /// 0 for the most important topic. Topics are studied in this order.
    pub order_index: usize,
}

/// Split `total_budget_hours` across `topics` in proportion to their weights.
///
/// The result has one entry per input topic, in input order. Each entry's
/// `order_index` ranks it by descending weight; equal weights keep their input
/// order.
///
/// The allocations always sum to `total_budget_hours`: any floating-point drift
/// is folded into the last topic.
pub fn allocate(
    topics: &[TopicInput],
    total_budget_hours: f64,
) -> Result<Vec<TopicAllocation>, PlanError> {
    if topics.is_empty() {
        return Err(PlanError::EmptyTopicSet);
    }
    if !total_budget_hours.is_finite() || total_budget_hours < 0.0 {
        return Err(PlanError::InvalidBudget(format!(
            "total budget must be a non-negative number of hours, got {}",
            total_budget_hours
        )));
    }
    if let Some(bad) = topics
        .iter()
        .find(|t| !t.weight.is_finite() || t.weight <= 0.0)
    {
        return Err(PlanError::InvalidWeight {
            name: bad.name.clone(),
            weight: bad.weight,
        });
    }

    // Scale by the largest weight first so huge weights cannot overflow the sum.
    let max_weight = topics.iter().map(|t| t.weight).fold(0.0, f64::max);
    let shares: Vec<f64> = topics.iter().map(|t| t.weight / max_weight).collect();
    let share_sum: f64 = shares.iter().sum();
    let mut hours: Vec<f64> = shares
        .iter()
        .map(|share| total_budget_hours * (share / share_sum))
        .collect();

    let drift = total_budget_hours - hours.iter().sum::<f64>();
    if let Some(last) = hours.last_mut() {
        *last = (*last + drift).max(0.0);
    }

    let order = rank_by_weight(topics);

    Ok(topics
        .iter()
        .zip(hours)
        .zip(order)
        .map(|((topic, allocated_hours), order_index)| TopicAllocation {
            name: topic.name.clone(),
            weight: topic.weight,
            allocated_hours,
            order_index,
        })
        .collect())
}

/// Rank topics by descending weight. Returns, for each input position, its rank.
fn rank_by_weight(topics: &[TopicInput]) -> Vec<usize> {
    let mut by_weight: Vec<usize> = (0..topics.len()).collect();
    // sort_by is stable, so ties keep input order
    by_weight.sort_by(|&a, &b| topics[b].weight.total_cmp(&topics[a].weight));

    let mut rank = vec![0; topics.len()];
    for (position, &input_index) in by_weight.iter().enumerate() {
        rank[input_index] = position;
    }
    rank
}
