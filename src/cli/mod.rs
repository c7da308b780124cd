//! Command-line interface
//!
//! Trains the pipeline on a CSV table and classifies records either from a
//! comma-separated argument or through interactive prompts.

use clap::{Parser, Subcommand};
use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::config::PipelineConfig;
use crate::data::{
    feature_prompt, is_binary_feature, FeatureTable, FeatureVector, Outcome, FEATURE_NAMES,
    INTEGER_FEATURES, N_FEATURES,
};
use crate::inference::Predictor;
use crate::pipeline::{TrainingPipeline, TrainingSummary};

// ─── Styling helpers ───────────────────────────────────────────────────────────

const W: usize = 58; // box inner width

fn dim(s: &str) -> ColoredString   { s.truecolor(100, 100, 100) }
fn accent(s: &str) -> ColoredString { s.truecolor(120, 170, 255) }
fn muted(s: &str) -> ColoredString  { s.truecolor(140, 140, 140) }
fn ok(s: &str) -> ColoredString     { s.truecolor(100, 210, 120) }

fn line_box_top()    { println!("  {}", dim("┌─────────────────────────────────────────────────────────┐")); }
fn line_box_bottom() { println!("  {}", dim("└─────────────────────────────────────────────────────────┘")); }
fn line_box_sep()    { println!("  {}", dim("├─────────────────────────────────────────────────────────┤")); }

fn line_box(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let pad = W.saturating_sub(visible_len);
    println!("  {}  {}{} {}", dim("│"), content, " ".repeat(pad), dim("│"));
}

fn line_box_center(content: &str) {
    let visible_len = strip_ansi(content).chars().count();
    let total_pad = W.saturating_sub(visible_len);
    let left = total_pad / 2;
    let right = total_pad - left;
    println!("  {}  {}{}{} {}", dim("│"), " ".repeat(left), content, " ".repeat(right), dim("│"));
}

fn line_box_empty() { line_box(""); }

fn strip_ansi(s: &str) -> String {
    let mut out = String::new();
    let mut in_escape = false;
    for c in s.chars() {
        if c == '\x1b' { in_escape = true; continue; }
        if in_escape { if c == 'm' { in_escape = false; } continue; }
        out.push(c);
    }
    out
}

fn kv(key: &str, val: &str) -> String {
    format!("{} {}", muted(key), val.white())
}

fn step_run(msg: &str) {
    print!("  {} {}... ", accent("›"), msg);
}

fn step_done(detail: &str) {
    println!("{} {}", ok("done"), dim(detail));
}

fn section(title: &str) {
    println!();
    println!("  {}", title.white().bold());
    println!("  {}", dim(&"─".repeat(56)));
}

// ─── CLI definition ────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "preterm")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Term / preterm pregnancy outcome classifier")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train the pipeline and report the selected model
    Train {
        /// Input CSV table
        #[arg(short, long)]
        data: PathBuf,

        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Train, then classify records
    Classify {
        /// Input CSV table
        #[arg(short, long)]
        data: PathBuf,

        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Comma-separated record of the 15 features in canonical order
        #[arg(short, long)]
        record: Option<String>,

        /// Print the prediction as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the default configuration as JSON
    Config,
}

// ─── Shared steps ──────────────────────────────────────────────────────────────

fn load_config(path: Option<&Path>) -> anyhow::Result<PipelineConfig> {
    match path {
        Some(p) => Ok(PipelineConfig::from_json_file(p)?),
        None => Ok(PipelineConfig::default()),
    }
}

fn train(data_path: &Path, config: PipelineConfig, quiet: bool) -> anyhow::Result<(TrainingPipeline, TrainingSummary)> {
    if !quiet { step_run("Loading table"); }
    let start = Instant::now();
    let table = FeatureTable::from_csv(data_path, &config.table)?;
    if !quiet { step_done(&format!("{} rows in {:?}", table.n_rows(), start.elapsed())); }

    if !quiet { step_run("Training"); }
    let mut pipeline = TrainingPipeline::new(config);
    let summary = pipeline.fit(&table)?;
    if !quiet { step_done(&format!("{:.2}s", summary.duration_secs)); }

    Ok((pipeline, summary))
}

fn print_summary(summary: &TrainingSummary) {
    let params = summary.best_params;
    let depth = params
        .max_depth
        .map_or_else(|| "None".to_string(), |d| d.to_string());
    let synthetic: usize = summary.n_synthetic.values().sum();

    println!();
    line_box_top();
    line_box_center(&format!("{}", "Model selected".white().bold()));
    line_box_sep();
    line_box(&kv("Train rows        ", &summary.train_rows.to_string()));
    line_box(&kv("Held-out rows     ", &summary.test_rows.to_string()));
    line_box(&kv("Synthetic rows    ", &synthetic.to_string()));
    line_box(&kv("Trials            ", &summary.n_trials.to_string()));
    line_box_empty();
    line_box(&kv("n_estimators      ", &params.n_estimators.to_string()));
    line_box(&kv("max_depth         ", &depth));
    line_box(&kv("min_samples_split ", &params.min_samples_split.to_string()));
    line_box(&kv("CV accuracy       ", &format!("{:.4}", summary.best_cv_accuracy)));
    line_box_bottom();
    println!();
}

fn render_outcome(outcome: Outcome, json: bool) -> String {
    if json {
        serde_json::json!({ "prediction": outcome.to_string() }).to_string()
    } else {
        let label = match outcome {
            Outcome::Term => ok("Term"),
            Outcome::Preterm => "Preterm".yellow().bold(),
        };
        format!("  {} {}", muted("Classified as:"), label)
    }
}

/// Interactive results are spaced from the prompts; JSON lines are not
fn render_interactive_outcome(outcome: Outcome, json: bool) -> String {
    if json {
        render_outcome(outcome, true)
    } else {
        format!("\n{}\n", render_outcome(outcome, false))
    }
}

// ─── Commands ──────────────────────────────────────────────────────────────────

pub fn cmd_train(data_path: &Path, config_path: Option<&Path>) -> anyhow::Result<()> {
    section("Train");
    let config = load_config(config_path)?;
    let (_, summary) = train(data_path, config, false)?;
    print_summary(&summary);
    Ok(())
}

pub fn cmd_classify(
    data_path: &Path,
    config_path: Option<&Path>,
    record: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let quiet = json;

    if !quiet { section("Classify"); }
    let (pipeline, summary) = train(data_path, config, quiet)?;
    if !quiet { print_summary(&summary); }
    let predictor = pipeline.into_predictor()?;

    match record {
        Some(r) => {
            let vector = FeatureVector::parse_csv_record(r)?;
            println!("{}", render_outcome(predictor.predict_vector(&vector)?, json));
            Ok(())
        }
        None => classify_interactive(&predictor, json),
    }
}

pub fn cmd_config() -> anyhow::Result<()> {
    println!("{}", PipelineConfig::default().to_json()?);
    Ok(())
}

// ─── Interactive classification ────────────────────────────────────────────────

fn parse_field(index: usize, input: &str) -> Result<f64, String> {
    let input = input.trim();
    if INTEGER_FEATURES.contains(&index) {
        return input
            .parse::<i64>()
            .map(|v| v as f64)
            .map_err(|_| format!("{} must be a whole number", FEATURE_NAMES[index]));
    }

    let value = input
        .parse::<f64>()
        .map_err(|_| format!("{} must be a number", FEATURE_NAMES[index]))?;
    if !value.is_finite() {
        return Err(format!("{} must be finite", FEATURE_NAMES[index]));
    }
    if is_binary_feature(index) && value != 0.0 && value != 1.0 {
        return Err(format!("{} must be 0 or 1", FEATURE_NAMES[index]));
    }
    Ok(value)
}

fn prompt_record(theme: &dialoguer::theme::ColorfulTheme) -> anyhow::Result<FeatureVector> {
    use dialoguer::Input;

    let mut values = Vec::with_capacity(N_FEATURES);
    for index in 0..N_FEATURES {
        let raw: String = Input::with_theme(theme)
            .with_prompt(feature_prompt(index))
            .validate_with(move |s: &String| parse_field(index, s).map(|_| ()))
            .interact_text()?;
        values.push(parse_field(index, &raw).map_err(anyhow::Error::msg)?);
    }
    Ok(FeatureVector::from_slice(&values)?)
}

fn classify_interactive(predictor: &Predictor, json: bool) -> anyhow::Result<()> {
    use dialoguer::{theme::ColorfulTheme, Confirm};

    let theme = ColorfulTheme {
        prompt_prefix: dialoguer::console::style("  ?".to_string()).for_stderr().color256(111),
        prompt_style: dialoguer::console::Style::new().for_stderr().white().bold(),
        ..ColorfulTheme::default()
    };

    loop {
        if !json { section("New record"); }
        let record = prompt_record(&theme)?;
        println!("{}", render_interactive_outcome(predictor.predict_vector(&record)?, json));

        let again = Confirm::with_theme(&theme)
            .with_prompt("Classify another record")
            .default(false)
            .interact()?;
        if !again {
            break;
        }
    }

    Ok(())
}

// ─── Help ──────────────────────────────────────────────────────────────────────

pub fn show_help() {
    section("Commands");

    let cmds: &[(&str, &str)] = &[
        ("preterm train -d data.csv", "Train and report the selected model"),
        ("preterm classify -d data.csv", "Train, then prompt for records"),
        ("preterm classify -d data.csv -r \"v1,..,v15\"", "Classify one record"),
        ("preterm classify ... --json", "Machine-readable output"),
        ("preterm config", "Print the default configuration"),
    ];

    for (cmd, desc) in cmds {
        println!("  {:<46} {}", cmd.white(), muted(desc));
    }

    section("Features (canonical order)");
    for (i, name) in FEATURE_NAMES.iter().enumerate() {
        println!("  {:>2}  {}", dim(&i.to_string()), name);
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_field_integer() {
        assert_eq!(parse_field(1, " 2 "), Ok(2.0));
        assert!(parse_field(1, "2.5").is_err());
    }

    #[test]
    fn test_parse_field_flag() {
        assert_eq!(parse_field(4, "1"), Ok(1.0));
        assert!(parse_field(4, "2").is_err());
    }

    #[test]
    fn test_parse_field_continuous() {
        assert_eq!(parse_field(11, "0.25"), Ok(0.25));
        assert!(parse_field(11, "abc").is_err());
        assert!(parse_field(11, "NaN").is_err());
    }

    #[test]
    fn test_json_outcome_is_a_single_line() {
        let line = render_interactive_outcome(Outcome::Preterm, true);
        assert_eq!(line, r#"{"prediction":"Preterm"}"#);
        assert!(!line.contains('\n'));

        let framed = render_interactive_outcome(Outcome::Term, false);
        assert!(framed.starts_with('\n') && framed.ends_with('\n'));
        assert!(strip_ansi(&framed).contains("Classified as: Term"));
    }

    #[test]
    fn test_strip_ansi() {
        let colored = format!("{}", "x".red());
        assert_eq!(strip_ansi(&colored), "x");
    }

    #[test]
    fn test_cli_parses_classify() {
        let cli = Cli::try_parse_from([
            "preterm", "classify", "-d", "t.csv", "-r", "1,2,3", "--json",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Classify { record, json, .. }) => {
                assert_eq!(record.as_deref(), Some("1,2,3"));
                assert!(json);
            }
            _ => panic!("expected classify"),
        }
    }
}
