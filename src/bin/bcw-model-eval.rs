//! Developer utility to score a saved model against the bundled dataset.

use std::path::PathBuf;

use bcw_trainer::config::DEFAULT_LOCAL_PATH;
use bcw_trainer::dataset::load_data;
use bcw_trainer::ml::metrics::{ConfusionMatrix, accuracy, precision_recall_by_class};
use bcw_trainer::publisher::load_model;

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

#[derive(Debug, Clone)]
struct CliOptions {
    model_path: PathBuf,
    top: usize,
}

#[derive(Debug, Clone)]
struct Misclassified {
    row: usize,
    truth: String,
    predicted: String,
    confidence: f64,
}

fn run() -> Result<(), String> {
    let options = parse_args(std::env::args().skip(1).collect())?;
    let model = load_model(&options.model_path).map_err(|err| err.to_string())?;
    let (table, targets) = load_data().map_err(|err| err.to_string())?;
    if model.feature_names != table.feature_names {
        return Err(format!(
            "Model features do not match the bundled dataset ({} vs {} columns)",
            model.feature_names.len(),
            table.feature_names.len()
        ));
    }

    let predicted = model
        .predict(table.values.view())
        .map_err(|err| err.to_string())?;
    let proba = model
        .predict_proba(table.values.view())
        .map_err(|err| err.to_string())?;
    let classes = model.class_names();
    let cm = ConfusionMatrix::from_predictions(classes.len(), &targets.labels, &predicted);

    let mut misclassified = Vec::new();
    for (row, (&truth, &pred)) in targets.labels.iter().zip(&predicted).enumerate() {
        if truth == pred {
            continue;
        }
        let confidence = if pred == 1 { proba[row] } else { 1.0 - proba[row] };
        misclassified.push(Misclassified {
            row,
            truth: classes[truth].clone(),
            predicted: classes[pred].clone(),
            confidence,
        });
    }

    println!("model: {}", options.model_path.display());
    println!("accuracy: {:.4}", accuracy(&cm));
    for (idx, stats) in precision_recall_by_class(&cm).iter().enumerate() {
        println!(
            "class {:>2} {:<10}  precision={:.3}  recall={:.3}  f1={:.3}  support={}",
            idx,
            classes[idx],
            stats.precision,
            stats.recall,
            stats.f1(),
            stats.support
        );
    }
    println!("confusion matrix (rows=true, cols=pred):");
    for truth in 0..cm.n_classes {
        let mut row = String::new();
        for pred in 0..cm.n_classes {
            row.push_str(&format!("{:6}", cm.get(truth, pred)));
        }
        println!("{row}");
    }

    if !misclassified.is_empty() {
        println!();
        println!("Top misclassified rows (highest confidence):");
        misclassified.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        for item in misclassified.iter().take(options.top) {
            println!(
                "- row {:>3}  truth={}  pred={}  conf={:.3}",
                item.row, item.truth, item.predicted, item.confidence
            );
        }
    }
    Ok(())
}

fn parse_args(args: Vec<String>) -> Result<CliOptions, String> {
    let mut model_path = PathBuf::from(DEFAULT_LOCAL_PATH);
    let mut top = 10usize;

    let mut idx = 0usize;
    while idx < args.len() {
        match args[idx].as_str() {
            "-h" | "--help" => return Err(help_text()),
            "--model" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--model requires a value".to_string())?;
                model_path = PathBuf::from(value);
            }
            "--top" => {
                idx += 1;
                let value = args.get(idx).ok_or_else(|| "--top requires a value".to_string())?;
                top = value
                    .parse::<usize>()
                    .map_err(|_| format!("Invalid --top value: {value}"))?;
            }
            unknown => return Err(format!("Unknown argument: {unknown}\n\n{}", help_text())),
        }
        idx += 1;
    }

    Ok(CliOptions { model_path, top })
}

fn help_text() -> String {
    [
        "bcw-model-eval",
        "",
        "Usage:",
        "  bcw-model-eval [--model <model.joblib>] [--top <n>]",
        "",
        "Options:",
        "  --model <path>  Saved pipeline (default: model.joblib).",
        "  --top <n>       Misclassified rows to list (default: 10).",
    ]
    .join("\n")
}
