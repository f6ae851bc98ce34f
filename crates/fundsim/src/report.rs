//! Text and JSON rendering of engine results

use std::fmt::Write;

use fundsim_core::model::{FundMetrics, FundSimulationResult};
use fundsim_core::sensitivity::{Realism, SensitivityReport, TargetScenario};
use jiff::Timestamp;
use serde::Serialize;

use crate::format::{
    format_adjustment, format_compact_currency, format_currency_short, format_multiple,
    format_percentage,
};

/// JSON envelope: the payload plus when it was produced
#[derive(Debug, Serialize)]
pub struct Envelope<'a, T: Serialize> {
    pub generated_at: Timestamp,
    pub scenario: &'a str,
    pub result: &'a T,
}

pub fn to_json<T: Serialize>(scenario: &str, result: &T, at: Timestamp) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&Envelope {
        generated_at: at,
        scenario,
        result,
    })
}

fn header(out: &mut String, title: &str, scenario: &str, at: Timestamp) {
    let _ = writeln!(out, "{title}: {scenario}");
    let _ = writeln!(out, "Generated {}", at.strftime("%Y-%m-%d %H:%M:%S UTC"));
    let _ = writeln!(out);
}

fn write_metrics(out: &mut String, m: &FundMetrics) {
    let _ = writeln!(out, "  Trials              {}", m.num_trials);
    let _ = writeln!(out, "  MOIC                {}", format_multiple(m.average_moic));
    let _ = writeln!(out, "  IRR                 {}", format_percentage(m.average_irr));
    let _ = writeln!(out, "  Success rate        {}", format_percentage(m.success_rate));
    let _ = writeln!(
        out,
        "  Paid in             {}",
        format_currency_short(m.total_paid_in)
    );
    let _ = writeln!(
        out,
        "  Distributed         {}",
        format_currency_short(m.average_distributed)
    );
    if let Some(invested) = m.average_total_invested {
        let _ = writeln!(out, "  Total invested      {}", format_currency_short(invested));
    }
    if let Some(recycled) = m.average_recycled_capital {
        let _ = writeln!(out, "  Recycled capital    {}", format_currency_short(recycled));
    }
    if !m.moic_percentiles.is_empty() {
        let cells: Vec<String> = m
            .moic_percentiles
            .iter()
            .map(|(p, v)| format!("P{:.0} {}", p * 100.0, format_multiple(*v)))
            .collect();
        let _ = writeln!(out, "  MOIC distribution   {}", cells.join("  "));
        let _ = writeln!(
            out,
            "  MOIC range          {} .. {}",
            format_multiple(m.min_moic),
            format_multiple(m.max_moic)
        );
    }
}

/// Render a fund simulation result
#[must_use]
pub fn render_simulation(scenario: &str, result: &FundSimulationResult, at: Timestamp) -> String {
    let mut out = String::new();
    header(&mut out, "Fund simulation", scenario, at);
    write_metrics(&mut out, &result.metrics);

    if !result.warnings.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Warnings ({} parameters clamped):", result.warnings.len());
        for w in &result.warnings {
            let _ = writeln!(
                out,
                "  {} {}: {} -> {}",
                w.investment, w.field, w.value, w.clamped_to
            );
        }
    }
    out
}

fn write_scenario(out: &mut String, s: &TargetScenario) {
    let realism = match s.achievability.realism {
        Realism::Realistic => "realistic",
        Realism::Optimistic => "optimistic",
    };
    let _ = writeln!(
        out,
        "Target {}  score {:.0}/100 ({realism})",
        format_multiple(s.target_moic),
        s.achievability.score
    );

    let _ = writeln!(out, "  Single-parameter adjustments:");
    for r in &s.single_parameter {
        if r.achievable {
            let _ = writeln!(
                out,
                "    {:<18} {} {:>7}  -> {}",
                r.family.label(),
                r.family.direction(),
                format_adjustment(r.adjustment_percent),
                format_multiple(r.metrics.average_moic)
            );
        } else {
            let _ = writeln!(
                out,
                "    {:<18} not achievable (needs {})",
                r.family.label(),
                format_adjustment(r.required_percent)
            );
            for reason in &r.bound_violations {
                let _ = writeln!(out, "      - {reason}");
            }
        }
    }
    for family in &s.suppressed_families {
        let _ = writeln!(
            out,
            "    {:<18} suppressed (exhausted at a lower target)",
            family.label()
        );
    }

    if s.mixed_options.is_empty() {
        let _ = writeln!(out, "  No mixed option reaches this target");
    } else {
        let _ = writeln!(out, "  Mixed options:");
        for (i, opt) in s.mixed_options.iter().enumerate() {
            let parts: Vec<String> = opt.adjustments.iter().map(ToString::to_string).collect();
            let _ = writeln!(
                out,
                "    {}. {} (total {}) -> {}: {}",
                i + 1,
                opt.approach.label(),
                format_adjustment(opt.total_adjustment),
                format_multiple(opt.metrics.average_moic),
                parts.join(", ")
            );
        }
    }

    let _ = writeln!(out, "  Score factors:");
    for f in &s.achievability.factors {
        let _ = writeln!(
            out,
            "    {:<20} {:>5.1} x {:.2}  {}",
            f.name, f.value, f.weight, f.explanation
        );
    }
}

/// Render a sensitivity report
#[must_use]
pub fn render_sensitivity(scenario: &str, report: &SensitivityReport, at: Timestamp) -> String {
    let mut out = String::new();
    header(&mut out, "Sensitivity analysis", scenario, at);
    let _ = writeln!(out, "Baseline:");
    write_metrics(&mut out, &report.baseline);
    let _ = writeln!(
        out,
        "  Fund size           {}",
        format_compact_currency(report.baseline.total_paid_in)
    );
    let _ = writeln!(out, "  Re-simulations      {}", report.simulations_run);

    for scenario in &report.scenarios {
        let _ = writeln!(out);
        write_scenario(&mut out, scenario);
    }
    out
}
