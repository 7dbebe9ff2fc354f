//! Inflation Engine CLI
//!
//! Command-line interface for running the full forecasting and budget
//! projection pipeline on a CPI inflation series.

use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use inflation_engine::analysis::{
    AffordabilityIndexCalculator, BudgetProjector, CategoryCostProjector,
};
use inflation_engine::forecasting::{
    EnsembleCombiner, ForecastSession, TimeSeriesForecastEngine, TrainingSpec,
    TrendSeasonalConfig,
};
use inflation_engine::series::{load_series_csv, Series};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "inflation_engine", about = "Inflation forecasting and budget projection")]
struct Args {
    /// Forecast horizon in months
    #[arg(long, default_value_t = 12)]
    horizon: usize,

    /// Current monthly income
    #[arg(long, default_value_t = 5000.0)]
    monthly_income: f64,

    /// Income growth rate per period
    #[arg(long, default_value_t = 0.0025)]
    income_growth_rate: f64,

    /// Optional CPI inflation CSV (date,value) to forecast from
    #[arg(long)]
    cpi_csv: Option<PathBuf>,

    /// Output CSV path for the budget projection
    #[arg(long, default_value = "budget_projection.csv")]
    output: PathBuf,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();

    println!("Inflation Engine v0.1.0");
    println!("=======================\n");

    let series = match &args.cpi_csv {
        Some(path) => load_series_csv(path)
            .map_err(|e| anyhow::anyhow!("{e}"))
            .with_context(|| format!("loading CPI series from {}", path.display()))?,
        None => demo_inflation_series(),
    };
    println!(
        "CPI inflation series: {} observations, last {}",
        series.len(),
        series.last_date().map(|d| d.to_string()).unwrap_or_default()
    );

    // Train all three model kinds, then blend
    let mut session = ForecastSession::new(TimeSeriesForecastEngine::default());
    let specs = vec![
        (
            "trend_seasonal".to_string(),
            TrainingSpec::TrendSeasonal(TrendSeasonalConfig::default()),
        ),
        ("autoregressive".to_string(), TrainingSpec::Autoregressive(None)),
        ("gradient_boosted".to_string(), TrainingSpec::GradientBoosted { lags: 3 }),
    ];
    for (name, outcome) in session.train_all(&series, &specs) {
        match outcome {
            Ok(()) => println!("  trained {name}"),
            Err(err) => println!("  {name} failed: {err}"),
        }
    }

    let forecasts = session.forecast_all(args.horizon);
    let weights = BTreeMap::from([
        ("trend_seasonal".to_string(), 0.5),
        ("autoregressive".to_string(), 0.3),
        ("gradient_boosted".to_string(), 0.2),
    ]);
    let blended = EnsembleCombiner::new().combine(&forecasts, &weights)?;

    println!("\nBlended inflation forecast ({} months):", blended.len());
    println!("{:>6} {:>10} {:>10} {:>10}", "Period", "Estimate", "Lower", "Upper");
    for point in &blended {
        println!(
            "{:>6} {:>10.3} {:>10.3} {:>10.3}",
            point.period, point.point_estimate, point.lower_bound, point.upper_bound
        );
    }

    // Project costs and budget over the blended forecast
    let current_costs = BTreeMap::from([
        ("Housing".to_string(), 1800.0),
        ("Food".to_string(), 600.0),
        ("Transportation".to_string(), 400.0),
        ("Healthcare".to_string(), 300.0),
        ("Entertainment".to_string(), 200.0),
        ("Utilities".to_string(), 150.0),
    ]);
    let projector = CategoryCostProjector::new();
    let costs = projector.project_costs(
        &current_costs,
        &blended,
        &CategoryCostProjector::default_sensitivities(),
    )?;

    let budget_projector = BudgetProjector::new();
    let budget =
        budget_projector.project_budget(args.monthly_income, &costs, args.income_growth_rate)?;

    println!("\nBudget projection:");
    println!(
        "{:>6} {:>12} {:>12} {:>12} {:>10}",
        "Period", "Income", "Expenses", "Surplus", "Savings%"
    );
    for row in &budget {
        println!(
            "{:>6} {:>12.2} {:>12.2} {:>12.2} {:>10}",
            row.period,
            row.projected_income,
            row.projected_expense_total,
            row.surplus_deficit,
            row.savings_rate_percent
                .map(|r| format!("{r:.1}"))
                .unwrap_or_else(|| "n/a".to_string()),
        );
    }

    println!("\nRecommendations:");
    for recommendation in budget_projector.generate_recommendations(&budget) {
        println!("  - {recommendation}");
    }

    // Affordability at the final projected period
    if let Some(last) = budget.last() {
        let calculator = AffordabilityIndexCalculator::new();
        let record = calculator.affordability_record(
            "demo",
            last.period,
            last.projected_income,
            last.projected_expense_total,
        )?;
        println!("\nAffordability (final period):");
        println!("{}", serde_json::to_string_pretty(&record)?);
    }

    // Write full budget projection to CSV
    let mut file = File::create(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;
    writeln!(file, "Period,Income,ExpenseTotal,SurplusDeficit,SavingsRatePct")?;
    for row in &budget {
        writeln!(
            file,
            "{},{:.2},{:.2},{:.2},{}",
            row.period,
            row.projected_income,
            row.projected_expense_total,
            row.surplus_deficit,
            row.savings_rate_percent
                .map(|r| format!("{r:.4}"))
                .unwrap_or_default(),
        )?;
    }
    println!("\nFull results written to: {}", args.output.display());

    Ok(())
}

/// Built-in monthly CPI inflation demo series (2016-2023)
///
/// Mild upward drift with a yearly seasonal swing, enough structure for
/// all three model kinds to fit against.
fn demo_inflation_series() -> Series {
    let pairs: Vec<(NaiveDate, f64)> = (0..96)
        .map(|i| {
            let year = 2016 + (i / 12) as i32;
            let month = (i % 12) as u32 + 1;
            let seasonal = (f64::from(month) * std::f64::consts::TAU / 12.0).sin() * 0.4;
            let drift = 0.015 * i as f64;
            (
                NaiveDate::from_ymd_opt(year, month, 1).expect("valid demo date"),
                2.2 + drift + seasonal,
            )
        })
        .collect();
    Series::from_pairs(&pairs).expect("demo series is valid")
}
