use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use std::io::Write;

use choicetype_core::Classification;

use crate::simulate::SimulationRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Console,
    Json,
    Markdown,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClassificationCounts {
    pub calm: usize,
    pub steady: usize,
    pub quick: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub attempts: Vec<SimulationRecord>,
    pub classifications: ClassificationCounts,
    pub average_correct: f64,
    pub final_balance: u32,
}

impl SimulationReport {
    #[must_use]
    pub fn new(attempts: Vec<SimulationRecord>, final_balance: u32) -> Self {
        let mut classifications = ClassificationCounts::default();
        for record in &attempts {
            match record.classification {
                Classification::Calm => classifications.calm += 1,
                Classification::Steady => classifications.steady += 1,
                Classification::Quick => classifications.quick += 1,
            }
        }
        let total: u32 = attempts.iter().map(|r| r.correct).sum();
        #[allow(clippy::cast_precision_loss)]
        let average_correct = if attempts.is_empty() {
            0.0
        } else {
            f64::from(total) / attempts.len() as f64
        };
        Self {
            attempts,
            classifications,
            average_correct,
            final_balance,
        }
    }
}

pub fn write_report<W: Write>(out: &mut W, report: &SimulationReport, format: ReportFormat) -> Result<()> {
    match format {
        ReportFormat::Console => generate_console_report(out, report),
        ReportFormat::Json => generate_json_report(out, report),
        ReportFormat::Markdown => generate_markdown_report(out, report),
    }
}

pub fn generate_console_report<W: Write>(out: &mut W, report: &SimulationReport) -> Result<()> {
    writeln!(out, "{}", "📊 Simulation Summary".bright_cyan().bold())?;
    writeln!(out, "{}", "=====================".cyan())?;
    writeln!(out, "Attempts: {}", report.attempts.len())?;
    writeln!(out, "Average correct: {:.1}", report.average_correct)?;
    writeln!(
        out,
        "Calm: {}  Steady: {}  Quick: {}",
        report.classifications.calm, report.classifications.steady, report.classifications.quick
    )?;
    writeln!(out, "Final balance: {}", report.final_balance)?;
    writeln!(out)?;

    for record in &report.attempts {
        let raised = if record.new_max > record.previous_max {
            format!("balance {} → {}", record.previous_max, record.new_max).green()
        } else {
            format!("balance {}", record.new_max).normal()
        };
        writeln!(
            out,
            "#{:<3} {} {:<7} {:>2} correct  {}",
            record.attempt,
            record.script,
            record.classification.as_str().bold(),
            record.correct,
            raised
        )?;
    }
    Ok(())
}

pub fn generate_json_report<W: Write>(out: &mut W, report: &SimulationReport) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, report)?;
    writeln!(out)?;
    Ok(())
}

pub fn generate_markdown_report<W: Write>(out: &mut W, report: &SimulationReport) -> Result<()> {
    writeln!(out, "# Choice Type Simulation\n")?;
    writeln!(out, "## Summary\n")?;
    writeln!(out, "- **Attempts**: {}", report.attempts.len())?;
    writeln!(out, "- **Average correct**: {:.1}", report.average_correct)?;
    writeln!(
        out,
        "- **Calm / Steady / Quick**: {} / {} / {}",
        report.classifications.calm, report.classifications.steady, report.classifications.quick
    )?;
    writeln!(out, "- **Final balance**: {}\n", report.final_balance)?;

    writeln!(out, "## Attempts\n")?;
    writeln!(out, "| # | Picks | Type | Correct | A | B | C | Balance |")?;
    writeln!(out, "|---|-------|------|---------|---|---|---|---------|")?;
    for r in &report.attempts {
        writeln!(
            out,
            "| {} | `{}` | {} | {} | {} | {} | {} | {} |",
            r.attempt,
            r.script,
            r.classification,
            r.correct,
            r.count_a,
            r.count_b,
            r.count_c,
            r.new_max
        )?;
    }
    Ok(())
}
