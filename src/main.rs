//! litoverlay - render and check enriched chapters

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::{LevelFilter, debug};

use litoverlay::rules::{HINT_CONFIG_PATH, MEDIA_CONFIG_PATH, load_hint_rules, load_media_rules};
use litoverlay::{AudioSession, Reader, RuleOutcome, RuleStore, TooltipController, decode_text};

#[derive(Parser)]
#[command(name = "litoverlay")]
#[command(version, about = "Media and hint overlays for HTML chapters", long_about = None)]
#[command(after_help = "EXAMPLES:
    litoverlay render chapters/03.html          Render chapter 3 to stdout
    litoverlay render 03.html -o out/03.html    Render to a file
    litoverlay check chapters                   Report every rule's outcome")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// App root holding config/media-rules.json and config/hint-rules.json
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Media rules file (defaults to <ROOT>/config/media-rules.json)
    #[arg(long, global = true)]
    media: Option<PathBuf>,

    /// Hint rules file (defaults to <ROOT>/config/hint-rules.json)
    #[arg(long, global = true)]
    hints: Option<PathBuf>,

    /// Encoding of chapter files that aren't UTF-8 (defaults to windows-1251)
    #[arg(long, global = true, value_name = "LABEL")]
    encoding: Option<String>,

    /// Log every rule as it is applied
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Inject hints and media into one chapter
    Render {
        /// Chapter HTML fragment
        #[arg(value_name = "CHAPTER")]
        chapter: PathBuf,

        /// Chapter number (defaults to the file stem, e.g. 03.html -> 3)
        #[arg(short = 'n', long)]
        number: Option<u32>,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Report anchors and missing media for every chapter in a directory
    Check {
        #[arg(value_name = "CHAPTER_DIR")]
        dir: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        LevelFilter::Debug
    } else if cli.quiet {
        LevelFilter::Error
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let rules = RuleStore::new(
        load_media_rules(cli.media.clone().unwrap_or_else(|| cli.root.join(MEDIA_CONFIG_PATH))),
        load_hint_rules(cli.hints.clone().unwrap_or_else(|| cli.root.join(HINT_CONFIG_PATH))),
    );
    let reader = Reader::new(rules, AudioSession::new(), TooltipController::new(false));

    let result = match &cli.command {
        Command::Render {
            chapter,
            number,
            output,
        } => render(&reader, &cli, chapter, *number, output.as_deref()),
        Command::Check { dir } => check(&reader, &cli, dir),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn render(
    reader: &Reader,
    cli: &Cli,
    chapter: &Path,
    number: Option<u32>,
    output: Option<&Path>,
) -> Result<bool, String> {
    let number = match number {
        Some(n) => n,
        None => chapter_number(chapter)
            .ok_or_else(|| format!("cannot infer chapter number from {}, pass -n", chapter.display()))?,
    };
    let html = read_chapter(chapter, cli.encoding.as_deref())?;

    let probe = |path: &str| asset_exists(&cli.root, path);
    let rendered = reader.render_chapter_with_probe(&html, number, &probe);
    debug!("Chapter {number}: {}", rendered.title);

    match output {
        Some(path) => fs::write(path, &rendered.html).map_err(|e| format!("{}: {e}", path.display()))?,
        None => println!("{}", rendered.html),
    }
    Ok(true)
}

fn check(reader: &Reader, cli: &Cli, dir: &Path) -> Result<bool, String> {
    let root = cli.root.as_path();
    let mut chapters: Vec<(u32, PathBuf)> = fs::read_dir(dir)
        .map_err(|e| format!("{}: {e}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.extension().is_some_and(|ext| ext == "html"))
        .filter_map(|p| chapter_number(&p).map(|n| (n, p)))
        .collect();
    chapters.sort();

    let mut ok = true;
    for (number, path) in &chapters {
        let html = read_chapter(path, cli.encoding.as_deref())?;
        let probe = |p: &str| asset_exists(root, p);
        let rendered = reader.render_chapter_with_probe(&html, *number, &probe);

        println!("{} ({})", path.display(), rendered.title);
        for result in &rendered.report.results {
            let status = match &result.outcome {
                RuleOutcome::Applied => "ok".to_string(),
                RuleOutcome::AnchorNotFound => "anchor not found".to_string(),
                RuleOutcome::SpansMarkup => "text spans markup".to_string(),
                RuleOutcome::MediaCreationFailed(reason) | RuleOutcome::Invalid(reason) => reason.clone(),
            };
            println!("  {:<24} {status}", result.rule);
        }
        ok &= rendered.report.failures().next().is_none();

        for (index, rule) in reader.rules().media_for_chapter(*number).into_iter().enumerate() {
            for src in rule.src.iter().filter(|s| !asset_exists(root, s)) {
                println!("  {:<24} missing source {src}", rule.media_id(index));
                ok = false;
            }
        }
    }

    let known: Vec<u32> = chapters.iter().map(|(n, _)| *n).collect();
    for rule in reader.rules().media() {
        if !known.contains(&rule.chapter) {
            println!("rule for chapter {} has no chapter file: {:?}", rule.chapter, rule.anchor);
            ok = false;
        }
    }

    Ok(ok)
}

fn read_chapter(path: &Path, encoding: Option<&str>) -> Result<String, String> {
    let bytes = fs::read(path).map_err(|e| format!("{}: {e}", path.display()))?;
    Ok(decode_text(&bytes, encoding).into_owned())
}

/// `03.html` -> 3
fn chapter_number(path: &Path) -> Option<u32> {
    path.file_stem()?.to_str()?.parse().ok()
}

fn asset_exists(root: &Path, path: &str) -> bool {
    if path.starts_with("http://") || path.starts_with("https://") {
        return true;
    }
    let relative = path.trim_start_matches("./").trim_start_matches('/');
    root.join(relative).is_file()
}
