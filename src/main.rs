use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use leakscan::analyzer::analyze;
use leakscan::extractor::extraction_path;
use leakscan::language::Language;
use leakscan::protocol::{AnalysisResult, WarningKind};
use leakscan::report::{format_bytes, share_text, ReportGenerator};

#[derive(Parser)]
#[command(name = "leakscan")]
#[command(about = "Heuristic multi-language memory-leak and unsafe-usage analyzer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a source file for leaks, double frees and unsafe calls
    Analyze {
        /// Source file to scan
        #[arg(short, long)]
        file: PathBuf,

        /// Language (auto-detected from the extension if not specified)
        #[arg(short, long)]
        language: Option<String>,

        /// Output directory for reports
        #[arg(short, long, default_value = "logs")]
        output_dir: PathBuf,

        /// Print the condensed share summary to stdout
        #[arg(short, long)]
        share: bool,

        /// Enable verbose logging
        #[arg(short, long)]
        verbose: bool,
    },

    /// List supported languages and their extraction paths
    Languages,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            file,
            language,
            output_dir,
            share,
            verbose,
        } => run_analyze(file, language, output_dir, share, verbose).await?,
        Commands::Languages => list_languages(),
    }

    Ok(())
}

async fn run_analyze(
    file: PathBuf,
    language: Option<String>,
    output_dir: PathBuf,
    share: bool,
    verbose: bool,
) -> Result<()> {
    init_logging(verbose);

    let language = match language {
        // parsing never fails; unknown names take the generic path
        Some(name) => name.parse::<Language>().unwrap_or(Language::Other),
        None => Language::from_path(&file),
    };
    info!("Language: {}", language);

    let source = std::fs::read_to_string(&file)
        .with_context(|| format!("Failed to read source file: {}", file.display()))?;

    info!("Analyzing {} ({} bytes)", file.display(), source.len());
    let result = analyze(&source, language)?;

    print_summary(&result, language);

    let report_gen = ReportGenerator::new(output_dir);
    let session_dir = report_gen.generate(&result, language).await?;
    println!("Reports written to: {}", session_dir.display());

    if share {
        println!("\n{}", share_text(&result, language));
    }

    Ok(())
}

fn list_languages() {
    println!("\nSupported languages:\n");
    for language in Language::all() {
        println!("  {:<12} {}", language.to_string(), extraction_path(*language));
    }
    println!("\nAny other language name falls back to the generic line-scan path.\n");
}

fn print_summary(result: &AnalysisResult, language: Language) {
    let stats = result.stats();

    println!("\n╔════════════════════════════════════════════╗");
    println!("║           Memory Analysis Summary          ║");
    println!("╚════════════════════════════════════════════╝");
    println!("\nLanguage: {}", language);
    println!("Allocations: {}", stats.allocation_count);
    println!("Frees: {}", stats.free_count);
    println!("Leaks: {}", stats.leak_count);
    println!("Warnings: {}", stats.warning_count);
    println!("Leaked bytes: {}", format_bytes(stats.leaked_bytes));

    if !result.leaks.is_empty() {
        println!("\n⚠️  Suspected leaks:");
        for leak in &result.leaks {
            println!(
                "   • {} (line {}, {}, {}) - {}",
                leak.variable,
                leak.line,
                leak.primitive,
                format_bytes(leak.size_bytes),
                leak.suggestion
            );
        }
    } else {
        println!("\n✅ No leaks detected");
    }

    let anomaly: Vec<_> = result
        .warnings
        .iter()
        .filter(|w| w.kind != WarningKind::UnsafeFunction)
        .collect();
    if !anomaly.is_empty() {
        println!("\n⚠️  Free anomalies:");
        for warning in anomaly {
            println!("   • line {}: {}", warning.line, warning.message);
        }
    }

    let unsafe_calls: Vec<_> = result
        .warnings
        .iter()
        .filter(|w| w.kind == WarningKind::UnsafeFunction)
        .collect();
    if !unsafe_calls.is_empty() {
        println!("\n⚠️  Unsafe function usage:");
        for warning in unsafe_calls {
            println!("   • line {}: {}", warning.line, warning.message);
        }
    }

    println!();
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let filter = if verbose {
        "leakscan=debug"
    } else {
        "leakscan=info"
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
