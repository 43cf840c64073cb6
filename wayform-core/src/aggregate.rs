//! Response aggregation
//!
//! Turns every recorded answer to one question into a [`QuestionSummary`].
//! Percentages use the number of respondents who answered that question as
//! the base, so optional and conditional questions are not diluted by
//! sessions that never saw them.

use crate::question::{Question, QuestionKind};
use crate::types::ResponseValue;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Frequency of one choice value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionCount {
    pub value: String,
    pub label: String,
    pub count: usize,
    /// Share of respondents to this question who picked it, 0–100
    pub percentage: f64,
}

/// One bar of a numeric histogram
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBucket {
    pub value: f64,
    pub count: usize,
}

/// Averaged score of a ranked option, budget category or activity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemScore {
    pub id: String,
    pub label: String,
    /// Mean rank (ranking) or mean amount/level (means)
    pub score: f64,
    /// Respondents that included this item
    pub responses: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuestionSummary {
    /// Nobody answered
    NoData,
    Choice {
        total: usize,
        options: Vec<OptionCount>,
    },
    Scale {
        total: usize,
        mean: f64,
        histogram: Vec<HistogramBucket>,
    },
    /// Sorted by ascending mean rank: most preferred first
    Ranking { total: usize, items: Vec<ItemScore> },
    /// Sorted by descending mean
    Means { total: usize, items: Vec<ItemScore> },
    Count { total: usize },
}

impl QuestionSummary {
    /// Number of answers the summary was built from
    pub fn total(&self) -> usize {
        match self {
            QuestionSummary::NoData => 0,
            QuestionSummary::Choice { total, .. }
            | QuestionSummary::Scale { total, .. }
            | QuestionSummary::Ranking { total, .. }
            | QuestionSummary::Means { total, .. }
            | QuestionSummary::Count { total } => *total,
        }
    }
}

/// Round half away from zero to `places` decimals
pub fn round_to(value: f64, places: u32) -> f64 {
    let factor = 10f64.powi(places as i32);
    (value * factor).round() / factor
}

/// Summarize all answers to `question`.
///
/// Answers whose shape does not fit the question kind are ignored.
pub fn aggregate(question: &Question, values: &[ResponseValue], decimal_places: u32) -> QuestionSummary {
    let values: Vec<&ResponseValue> = values
        .iter()
        .filter(|v| question.kind.accepts_shape(v) && !v.is_empty())
        .collect();
    let total = values.len();
    if total == 0 {
        return QuestionSummary::NoData;
    }

    match &question.kind {
        QuestionKind::SingleChoice { .. }
        | QuestionKind::MultipleChoice { .. }
        | QuestionKind::YesNo => choice_summary(&question.kind, &values, decimal_places),
        QuestionKind::Rating { .. } | QuestionKind::Nps | QuestionKind::NumericScale { .. } => {
            scale_summary(&values, decimal_places)
        }
        QuestionKind::DragRank { .. } => ranking_summary(&question.kind, &values, decimal_places),
        QuestionKind::BudgetAllocator { .. } | QuestionKind::ActivityInterest { .. } => {
            means_summary(&question.kind, &values, decimal_places)
        }
        QuestionKind::ShortText { .. }
        | QuestionKind::LongText { .. }
        | QuestionKind::Email { .. }
        | QuestionKind::MatrixRating { .. }
        | QuestionKind::Date
        | QuestionKind::Welcome { .. }
        | QuestionKind::ThankYou { .. }
        | QuestionKind::Instructions { .. }
        | QuestionKind::Statement { .. } => QuestionSummary::Count { total },
    }
}

fn choice_summary(kind: &QuestionKind, values: &[&ResponseValue], places: u32) -> QuestionSummary {
    let total = values.len();

    // Configured order first
    let mut known: Vec<(String, String)> = match kind {
        QuestionKind::YesNo => vec![
            ("true".to_string(), "Yes".to_string()),
            ("false".to_string(), "No".to_string()),
        ],
        _ => kind
            .options()
            .iter()
            .map(|o| (o.value.clone(), o.label.clone()))
            .collect(),
    };

    let mut counts: HashMap<String, usize> = HashMap::new();
    for value in values {
        match value {
            ResponseValue::List(items) => {
                let mut seen = std::collections::HashSet::new();
                for item in items.iter().filter(|i| seen.insert(i.as_str())) {
                    *counts.entry(item.clone()).or_default() += 1;
                }
            }
            other => *counts.entry(other.display_key()).or_default() += 1,
        }
    }

    let mut unknown: Vec<String> = counts
        .keys()
        .filter(|k| !known.iter().any(|(v, _)| v == *k))
        .cloned()
        .collect();
    unknown.sort();
    known.extend(unknown.into_iter().map(|v| (v.clone(), v)));

    let options = known
        .into_iter()
        .map(|(value, label)| {
            let count = counts.get(&value).copied().unwrap_or(0);
            OptionCount {
                percentage: round_to(count as f64 * 100.0 / total as f64, places),
                value,
                label,
                count,
            }
        })
        .collect();

    QuestionSummary::Choice { total, options }
}

fn scale_summary(values: &[&ResponseValue], places: u32) -> QuestionSummary {
    let numbers: Vec<f64> = values.iter().filter_map(|v| v.as_number()).collect();
    let total = numbers.len();
    let mean = numbers.iter().sum::<f64>() / total as f64;

    let mut histogram: Vec<HistogramBucket> = Vec::new();
    for n in &numbers {
        match histogram.iter_mut().find(|b| b.value == *n) {
            Some(bucket) => bucket.count += 1,
            None => histogram.push(HistogramBucket { value: *n, count: 1 }),
        }
    }
    histogram.sort_by(|a, b| a.value.partial_cmp(&b.value).unwrap_or(Ordering::Equal));

    QuestionSummary::Scale {
        total,
        mean: round_to(mean, places),
        histogram,
    }
}

/// Running sum and count per item id
type Tally = HashMap<String, (f64, usize)>;

fn ranking_summary(kind: &QuestionKind, values: &[&ResponseValue], places: u32) -> QuestionSummary {
    let mut tally = Tally::new();
    for items in values.iter().filter_map(|v| v.as_list()) {
        for (index, item) in items.iter().enumerate() {
            let entry = tally.entry(item.clone()).or_default();
            entry.0 += (index + 1) as f64;
            entry.1 += 1;
        }
    }

    let mut items = scores(tally, |id| kind.label_for(id).to_string(), places);
    items.sort_by(|a, b| {
        a.score
            .partial_cmp(&b.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.label.cmp(&b.label))
    });

    QuestionSummary::Ranking {
        total: values.len(),
        items,
    }
}

fn means_summary(kind: &QuestionKind, values: &[&ResponseValue], places: u32) -> QuestionSummary {
    let mut tally = Tally::new();
    for map in values.iter().filter_map(|v| v.as_map()) {
        for (key, amount) in map {
            let entry = tally.entry(key.clone()).or_default();
            entry.0 += amount;
            entry.1 += 1;
        }
    }

    let labels = kind.map_keys();
    let mut items = scores(
        tally,
        |id| {
            labels
                .iter()
                .find(|(key, _)| *key == id)
                .map(|(_, label)| label.to_string())
                .unwrap_or_else(|| id.to_string())
        },
        places,
    );
    items.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.label.cmp(&b.label))
    });

    QuestionSummary::Means {
        total: values.len(),
        items,
    }
}

fn scores(tally: Tally, label: impl Fn(&str) -> String, places: u32) -> Vec<ItemScore> {
    tally
        .into_iter()
        .map(|(id, (sum, count))| ItemScore {
            label: label(&id),
            score: round_to(sum / count as f64, places),
            responses: count,
            id,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::question::{Activity, BudgetCategory, ChoiceOption};
    use std::collections::BTreeMap;

    fn options() -> Vec<ChoiceOption> {
        vec![
            ChoiceOption::new("o1", "Beach", "beach"),
            ChoiceOption::new("o2", "Mountains", "mountains"),
            ChoiceOption::new("o3", "City", "city"),
        ]
    }

    #[test]
    fn test_no_responses_is_no_data() {
        let question = Question::new("q1", "Rate", 1, QuestionKind::Rating { rating_scale: 5 });
        assert_eq!(aggregate(&question, &[], 1), QuestionSummary::NoData);

        let text = Question::new("q2", "Notes", 2, QuestionKind::LongText {
            placeholder: None,
            max_character_count: None,
        });
        assert_eq!(
            aggregate(&text, &[ResponseValue::from("  ")], 1),
            QuestionSummary::NoData
        );
    }

    #[test]
    fn test_rating_mean_and_histogram() {
        let question = Question::new("q1", "Rate", 1, QuestionKind::Rating { rating_scale: 5 });
        let summary = aggregate(&question, &[ResponseValue::Number(4.0)], 1);
        assert_eq!(
            summary,
            QuestionSummary::Scale {
                total: 1,
                mean: 4.0,
                histogram: vec![HistogramBucket {
                    value: 4.0,
                    count: 1
                }],
            }
        );

        let values: Vec<ResponseValue> = [5.0, 4.0, 4.0, 10.0]
            .into_iter()
            .map(ResponseValue::Number)
            .collect();
        let nps = Question::new("q2", "Recommend", 2, QuestionKind::Nps);
        let QuestionSummary::Scale { mean, histogram, .. } = aggregate(&nps, &values, 1) else {
            panic!("expected scale summary");
        };
        assert_eq!(mean, 5.8);
        let order: Vec<f64> = histogram.iter().map(|b| b.value).collect();
        assert_eq!(order, vec![4.0, 5.0, 10.0]);
    }

    #[test]
    fn test_multiple_choice_percentages_use_respondents() {
        let question = Question::new("q1", "Where", 1, QuestionKind::MultipleChoice {
            options: options(),
        });
        let values = vec![
            ResponseValue::from(vec!["beach", "city"]),
            ResponseValue::from(vec!["beach"]),
            ResponseValue::from(vec!["mountains", "beach"]),
            ResponseValue::from(vec!["desert"]),
        ];
        let QuestionSummary::Choice { total, options } = aggregate(&question, &values, 1) else {
            panic!("expected choice summary");
        };
        assert_eq!(total, 4);

        let counts: Vec<(&str, usize)> = options.iter().map(|o| (o.value.as_str(), o.count)).collect();
        assert_eq!(
            counts,
            vec![("beach", 3), ("mountains", 1), ("city", 1), ("desert", 1)]
        );
        assert_eq!(options[0].percentage, 75.0);

        let picks: usize = options.iter().map(|o| o.count).sum();
        let percent_sum: f64 = options.iter().map(|o| o.percentage).sum();
        assert!(picks >= total);
        assert!((percent_sum / 100.0 * total as f64 - picks as f64).abs() < 1e-9);
    }

    #[test]
    fn test_yes_no_labels() {
        let question = Question::new("q1", "Again?", 1, QuestionKind::YesNo);
        let values = vec![
            ResponseValue::Bool(true),
            ResponseValue::Bool(true),
            ResponseValue::Bool(false),
        ];
        let QuestionSummary::Choice { options, .. } = aggregate(&question, &values, 1) else {
            panic!("expected choice summary");
        };
        assert_eq!(options[0].label, "Yes");
        assert_eq!(options[0].count, 2);
        assert_eq!(options[0].percentage, 66.7);
        assert_eq!(options[1].label, "No");
        assert_eq!(options[1].percentage, 33.3);
    }

    #[test]
    fn test_drag_rank_average_position() {
        let question = Question::new("q1", "Rank", 1, QuestionKind::DragRank { options: options() });
        let values = vec![
            ResponseValue::from(vec!["city", "beach", "mountains"]),
            ResponseValue::from(vec!["beach", "city"]),
        ];
        let QuestionSummary::Ranking { items, .. } = aggregate(&question, &values, 1) else {
            panic!("expected ranking summary");
        };
        // beach and city both average 1.5; tie broken by label
        let ranked: Vec<(&str, f64)> = items.iter().map(|i| (i.label.as_str(), i.score)).collect();
        assert_eq!(
            ranked,
            vec![("Beach", 1.5), ("City", 1.5), ("Mountains", 3.0)]
        );
    }

    #[test]
    fn test_budget_means_sorted_descending() {
        let question = Question::new("q1", "Budget", 1, QuestionKind::BudgetAllocator {
            categories: vec![
                BudgetCategory {
                    id: "food".into(),
                    label: "Food".into(),
                },
                BudgetCategory {
                    id: "lodging".into(),
                    label: "Lodging".into(),
                },
            ],
            total: 1000.0,
        });
        let a: BTreeMap<String, f64> =
            [("food".to_string(), 200.0), ("lodging".to_string(), 800.0)].into_iter().collect();
        let b: BTreeMap<String, f64> = [("food".to_string(), 400.0)].into_iter().collect();

        let QuestionSummary::Means { total, items } =
            aggregate(&question, &[a.into(), b.into()], 1)
        else {
            panic!("expected means summary");
        };
        assert_eq!(total, 2);
        assert_eq!(items[0].label, "Lodging");
        assert_eq!(items[0].score, 800.0);
        assert_eq!(items[1].label, "Food");
        assert_eq!(items[1].score, 300.0);
        assert_eq!(items[1].responses, 2);
    }

    #[test]
    fn test_activity_interest_means() {
        let question = Question::new("q1", "Interest", 1, QuestionKind::ActivityInterest {
            activities: vec![Activity {
                id: "hiking".into(),
                label: "Hiking".into(),
                category: Some("outdoor".into()),
            }],
            group_by_category: true,
        });
        let values: Vec<ResponseValue> = [4.0, 5.0, 5.0]
            .into_iter()
            .map(|n| BTreeMap::from([("hiking".to_string(), n)]).into())
            .collect();
        let QuestionSummary::Means { items, .. } = aggregate(&question, &values, 1) else {
            panic!("expected means summary");
        };
        assert_eq!(items[0].score, 4.7);
    }

    #[test]
    fn test_text_counts_only() {
        let question = Question::new("q1", "Email", 1, QuestionKind::Email { placeholder: None });
        let values = vec![ResponseValue::from("a@b.co"), ResponseValue::from("c@d.co")];
        assert_eq!(aggregate(&question, &values, 1), QuestionSummary::Count { total: 2 });
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(4.25, 1), 4.3);
        assert_eq!(round_to(2.0 / 3.0, 2), 0.67);
        assert_eq!(round_to(7.0, 0), 7.0);
    }
}
