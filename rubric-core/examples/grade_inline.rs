//! Build a rubric in code and grade two submissions against it.
//!
//! Run with: cargo run -p rubric-core --example grade_inline

use rubric::{
    Comparator, Criterion, Evaluator, PassPolicy, Result, Rubric, Section, Value,
};

fn main() -> Result<()> {
    let rubric = Rubric::builder("reserve-check")
        .policy(PassPolicy::default().overall_min_pct(0.75))
        .section(
            Section::new("reserve")
                .criterion(
                    Criterion::new("claim.number", Comparator::exact())?.critical(true),
                )
                .criterion(
                    Criterion::new("claim.reserve", Comparator::percentage_tolerance(0.01))?
                        .weight(2.0),
                ),
        )
        .section(
            Section::new("narrative").min_correct(1).criterion(
                Criterion::new("claim.notes", Comparator::keyword_coverage(0.5))?
                    .describe("Mentions the liability finding"),
            ),
        )
        .build()?;

    let key = Value::from_json(
        r#"{"claim": {"number": "CLM-42", "reserve": 8000, "notes": "liability accepted by the insured driver"}}"#,
    )?;
    let submissions = [
        Value::from_json(r#"{"claim": {"number": "CLM-42", "reserve": "$8,050", "notes": "Driver liability accepted"}}"#)?,
        Value::from_json(r#"{"claim": {"number": "CLM-24", "reserve": 8000}}"#)?,
    ];

    let evaluator = Evaluator::new(&rubric, &key);
    for (i, report) in evaluator.evaluate_all(&submissions).iter().enumerate() {
        println!(
            "submission {}: {:.0}% -> {}",
            i + 1,
            report.overall.pct * 100.0,
            report.decision
        );
        for miss in report.misses() {
            println!("  {}: {}", miss.criterion_id, miss.verdict.detail.reason);
        }
    }

    Ok(())
}
