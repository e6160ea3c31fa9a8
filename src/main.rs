use anyhow::Context;
use clap::Parser;
use graphbridge::{SessionConfig, SourceGraph, TranslateSession, TranslatorRegistry, batch};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "graphbridge", about = "Translate source dataflow graphs into IR graphs", version)]
struct Cli {
    /// Source graph files (JSON).
    #[arg(required = true)]
    models: Vec<PathBuf>,

    /// Session configuration file (JSON).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose logging (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn print_model(model: &graphbridge::IrModel) {
    println!("{}", model.summary());
    for (node, fw) in model.passthrough_nodes() {
        match &fw.failed_conversion {
            Some(reason) => println!("  framework {} ({}): {}", node.friendly_name, fw.op_type, reason),
            None => println!("  framework {} ({})", node.friendly_name, fw.op_type),
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match &cli.config {
        Some(path) => SessionConfig::from_file(path)?,
        None => SessionConfig::default(),
    };
    let models = cli
        .models
        .iter()
        .map(|path| SourceGraph::from_file(path).with_context(|| format!("cannot load '{}'", path.display())))
        .collect::<anyhow::Result<Vec<_>>>()?;

    // Translators are supplied by embedders; the CLI reports what would stay untranslated.
    let registry = TranslatorRegistry::new();

    if let [model] = models.as_slice() {
        let mut config = config;
        if let Some(name) = &model.name {
            config.model_name = name.clone();
        }
        let mut session = TranslateSession::new(model, &registry, config);
        let ir = session.converted_model().context("translation failed")?;
        print_model(ir);
        return Ok(());
    }

    let mut failed = 0;
    for (path, outcome) in cli.models.iter().zip(batch::translate_all(&models, &registry, &config)) {
        match outcome {
            Ok(ir) => print_model(&ir),
            Err(err) => {
                failed += 1;
                eprintln!("{}: {}", path.display(), err);
            }
        }
    }
    if failed > 0 {
        anyhow::bail!("{} of {} models failed to translate", failed, models.len());
    }
    Ok(())
}
