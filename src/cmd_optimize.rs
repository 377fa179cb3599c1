use anyhow::{Context, Result};
use camino::Utf8PathBuf;
use clap::Parser;

use crate::ai::{AiService, OpenAiService};
use crate::dockerfile::Dockerfile;
use crate::dockerignore::Dockerignore;
use crate::package_json::PackageJson;
use crate::project::{OptimizationAction, OptimizationReport, Project};

#[derive(Parser, Default)]
pub struct OptimizeArgs {
    /// Path to the Dockerfile
    #[arg(long, default_value = "Dockerfile", value_name = "PATH")]
    dockerfile: Utf8PathBuf,

    /// Path to the .dockerignore file
    #[arg(long, default_value = ".dockerignore", value_name = "PATH")]
    dockerignore: Utf8PathBuf,

    /// Path to package.json
    ///
    /// When not given, package.json and src/package.json are tried.
    #[arg(long, value_name = "PATH")]
    package_json: Option<Utf8PathBuf>,

    /// Directory to save the optimized files to
    #[arg(long, default_value = "shrinkah.optimized", value_name = "PATH")]
    output_dir: Utf8PathBuf,

    /// OpenAI API key, enabling the AI-powered optimizations
    #[arg(
        long,
        env = "OPENAI_API_KEY",
        hide_env_values = true,
        value_name = "KEY"
    )]
    openai_api_key: Option<String>,

    /// Print the report as JSON instead of text
    #[arg(long)]
    json: bool,
}

pub fn run(args: &OptimizeArgs) -> Result<()> {
    let dockerfile_text = std::fs::read_to_string(&args.dockerfile)
        .with_context(|| format!("reading Dockerfile at {}", args.dockerfile))?;
    let dockerfile = Dockerfile::parse(&dockerfile_text)
        .with_context(|| format!("parsing {}", args.dockerfile))?;
    tracing::info!(path = %args.dockerfile, stages = dockerfile.stage_count(), "loaded Dockerfile");

    let dockerignore = if args.dockerignore.is_file() {
        tracing::info!(path = %args.dockerignore, "loaded .dockerignore");
        Some(
            std::fs::read_to_string(&args.dockerignore)
                .with_context(|| format!("reading {}", args.dockerignore))?,
        )
    } else {
        tracing::info!(path = %args.dockerignore, "no .dockerignore found");
        None
    };

    let package_json = load_package_json(args)?;

    let oracle = match args.openai_api_key.as_deref() {
        Some(key) => {
            tracing::info!("AI-powered optimizations enabled");
            Some(OpenAiService::new(key)?)
        }
        None => {
            tracing::info!("no OpenAI API key provided; proceeding without AI-powered optimizations");
            None
        }
    };

    let project = Project::new(dockerfile, Dockerignore::new(dockerignore), package_json);
    let report = project.optimize(oracle.as_ref().map(|o| o as &dyn AiService));

    write_optimized_files(&args.output_dir, &report)
        .with_context(|| format!("writing optimized files to {}", args.output_dir))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report).context("serializing report")?);
    } else {
        print_report(&report);
    }

    Ok(())
}

/// Load package.json from the given path, or try the conventional
/// locations. A missing manifest just disables the rules that need it.
fn load_package_json(args: &OptimizeArgs) -> Result<Option<PackageJson>> {
    let candidates = match &args.package_json {
        Some(path) => vec![path.clone()],
        None => vec![
            Utf8PathBuf::from("package.json"),
            Utf8PathBuf::from("src/package.json"),
        ],
    };

    for path in &candidates {
        if !path.is_file() {
            continue;
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading package.json at {path}"))?;
        let parsed =
            PackageJson::parse(&contents).with_context(|| format!("parsing {path}"))?;
        tracing::info!(path = %path, "loaded package.json");
        return Ok(Some(parsed));
    }

    tracing::info!("no package.json found");
    Ok(None)
}

fn write_optimized_files(output_dir: &Utf8PathBuf, report: &OptimizationReport) -> Result<()> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("creating output directory {output_dir}"))?;

    let modified = &report.modified_project;
    let mut files = vec![
        ("Dockerfile", modified.dockerfile.as_str()),
        (".dockerignore", modified.dockerignore.as_str()),
    ];
    if let Some(package_json) = &modified.package_json {
        files.push(("package.json", package_json.as_str()));
    }

    for (name, contents) in files {
        let path = output_dir.join(name);
        std::fs::write(&path, contents).with_context(|| format!("writing {path}"))?;
        tracing::info!(path = %path, "saved optimized file");
    }

    Ok(())
}

fn print_report(report: &OptimizationReport) {
    if !report.actions_taken.is_empty() {
        println!("Actions taken:");
        for action in &report.actions_taken {
            print_note(action);
        }
        println!();
    }

    if !report.recommendations.is_empty() {
        println!("Recommendations:");
        for recommendation in &report.recommendations {
            print_note(recommendation);
        }
        println!();
    }

    if report.actions_taken.is_empty() && report.recommendations.is_empty() {
        println!("Docker image is already optimized; no further actions were taken.");
    }
}

fn print_note(note: &OptimizationAction) {
    match note.line {
        Some(line) => println!("- [{}:{}] {}", note.filename, line, note.title),
        None => println!("- [{}] {}", note.filename, note.title),
    }
    for line in note.description.lines() {
        println!("    {line}");
    }
}
