//! Plain-text rendering of form analytics

use wayform_core::aggregate::ItemScore;
use wayform_core::{FormAnalytics, QuestionSummary};

pub fn print_analytics(analytics: &FormAnalytics) {
    let computed_at = analytics.computed_at.with_timezone(&chrono::Local);
    println!("Form: {}", analytics.form_id);
    println!("  Views:           {}", analytics.views);
    println!("  Submissions:     {}", analytics.submissions);
    println!("  Completion rate: {}%", analytics.completion_rate);
    if let Some(secs) = analytics.average_completion_secs {
        println!("  Avg. time:       {}", format_duration(secs));
    }
    if !analytics.drop_off.is_empty() {
        println!("  Drop-off:");
        for drop in &analytics.drop_off {
            println!("    after {}: {}", drop.question_id, drop.count);
        }
    }
    println!();

    for question in &analytics.questions {
        println!(
            "[{}] {} ({} responses)",
            question.kind,
            question.title,
            question.summary.total()
        );
        print_summary(&question.summary);
    }

    println!("---");
    println!("Computed {}", computed_at.format("%Y-%m-%d %H:%M:%S"));
}

fn print_summary(summary: &QuestionSummary) {
    match summary {
        QuestionSummary::NoData => println!("    (no responses)"),
        QuestionSummary::Choice { options, .. } => {
            for option in options {
                println!(
                    "    {:<24} {:>4}  {}%",
                    option.label, option.count, option.percentage
                );
            }
        }
        QuestionSummary::Scale {
            mean, histogram, ..
        } => {
            println!("    mean {}", mean);
            for bucket in histogram {
                println!("    {:>6}  {}", format_number(bucket.value), bucket.count);
            }
        }
        QuestionSummary::Ranking { items, .. } => print_items("avg. rank", items),
        QuestionSummary::Means { items, .. } => print_items("avg.", items),
        QuestionSummary::Count { .. } => {}
    }
}

fn print_items(score_label: &str, items: &[ItemScore]) {
    for (i, item) in items.iter().enumerate() {
        println!(
            "    {}. {:<24} {} {}",
            i + 1,
            item.label,
            score_label,
            format_number(item.score)
        );
    }
}

/// Integral values without a trailing `.0`
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

fn format_duration(secs: f64) -> String {
    let total = secs.round() as u64;
    if total >= 60 {
        format!("{}m {}s", total / 60, total % 60)
    } else {
        format!("{}s", total)
    }
}
