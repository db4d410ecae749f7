//! jigcut: cut an image into interlocking jigsaw pieces.
//!
//! Decodes the image, cuts it, and writes one PNG per piece plus the
//! outline (`outline.svg`), a manifest (`manifest.json`) and optionally a
//! board backdrop (`backdrop.png`) into the output directory.
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin jigcut -- [OPTIONS] <IMAGE>
//! ```

#![allow(clippy::print_stderr)]

use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::mpsc;
use std::thread;

use clap::{ArgAction, Parser};
use jigcut_core::{
    BackdropOptions, Puzzle, PuzzleConfig, PuzzleEvent, backdrop, build_puzzle, decode_rgba,
};
use jigcut_export::{SvgMetadata, piece_file_name, to_manifest_json, to_svg};

/// Cut an image into interlocking jigsaw pieces.
#[derive(Parser)]
#[command(name = "jigcut", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image: PathBuf,

    /// Number of piece rows.
    #[arg(long)]
    rows: Option<u32>,

    /// Number of piece columns.
    #[arg(long)]
    cols: Option<u32>,

    /// Curve seed; reuse the seed from a manifest to reproduce a cut.
    #[arg(long, allow_hyphen_values = true)]
    seed: Option<f64>,

    /// Output directory (created if missing).
    #[arg(long, short, default_value = "pieces")]
    out: PathBuf,

    /// Cutting worker count (defaults to available parallelism).
    #[arg(long, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    workers: Option<usize>,

    /// Check every piece stays near its cell.
    #[arg(long)]
    validate: bool,

    /// Base configuration as JSON; the flags above override it.
    #[arg(long, value_name = "JSON")]
    config_json: Option<String>,

    /// Also write `backdrop.png`.
    #[arg(long)]
    backdrop: bool,

    /// More logging (-v debug, -vv trace). `RUST_LOG` takes precedence.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn config(&self) -> Result<PuzzleConfig, String> {
        let mut config = match &self.config_json {
            Some(json) => serde_json::from_str(json)
                .map_err(|e| format!("--config-json: {e}"))?,
            None => PuzzleConfig::default(),
        };
        if let Some(rows) = self.rows {
            config.rows = rows;
        }
        if let Some(cols) = self.cols {
            config.cols = cols;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        if self.workers.is_some() {
            config.workers = self.workers;
        }
        config.validate_regions |= self.validate;
        Ok(config)
    }

    const fn log_level(&self) -> log::LevelFilter {
        match self.verbose {
            0 => log::LevelFilter::Info,
            1 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}

/// Log cutting progress until the sender side is dropped.
fn spawn_progress_logger(rx: mpsc::Receiver<PuzzleEvent>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        for event in rx {
            match event {
                PuzzleEvent::Progress { completed, total } => {
                    log::info!("cut {completed}/{total} pieces");
                }
                PuzzleEvent::CuttingFinished => log::info!("cutting finished"),
                other => log::debug!("{other:?}"),
            }
        }
    })
}

fn write_pieces(puzzle: &Puzzle, out: &Path) -> Result<(), Box<dyn Error>> {
    for piece in &puzzle.pieces {
        let cell = piece.cell();
        let path = out.join(piece_file_name(cell.row, cell.col));
        piece.image().save(&path)?;
        log::trace!("wrote {}", path.display());
    }
    Ok(())
}

fn run(cli: &Cli) -> Result<(), Box<dyn Error>> {
    let config = cli.config()?;

    let bytes = std::fs::read(&cli.image)
        .map_err(|e| format!("reading {}: {e}", cli.image.display()))?;
    let image = decode_rgba(&bytes)?;
    log::info!(
        "{}: {}x{}, cutting {}x{}",
        cli.image.display(),
        image.width(),
        image.height(),
        config.rows,
        config.cols
    );
    let source = cli.backdrop.then(|| image.clone());

    let (tx, rx) = mpsc::channel();
    let logger = spawn_progress_logger(rx);
    let result = build_puzzle(image, &config, Some(&tx));
    drop(tx);
    if logger.join().is_err() {
        log::warn!("progress logger panicked");
    }
    let puzzle = result?;
    log::info!("seed {}", puzzle.seed);

    std::fs::create_dir_all(&cli.out)?;
    write_pieces(&puzzle, &cli.out)?;

    // Record the seed actually used so the file reproduces this cut.
    let used = PuzzleConfig {
        seed: Some(puzzle.seed),
        ..config
    };
    let config_json = serde_json::to_string(&used)?;
    let title = cli
        .image
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("puzzle");
    let description = format!(
        "{}x{} jigsaw, seed {}",
        puzzle.shape.rows(),
        puzzle.shape.cols(),
        puzzle.seed
    );
    let svg = to_svg(
        &puzzle.path,
        &SvgMetadata {
            title: Some(title),
            description: Some(&description),
            config_json: Some(&config_json),
        },
    );
    std::fs::write(cli.out.join("outline.svg"), svg)?;
    std::fs::write(cli.out.join("manifest.json"), to_manifest_json(&puzzle)?)?;

    if let Some(source) = source {
        let board = backdrop(&source, &puzzle.path, &BackdropOptions::default())?;
        board.save(cli.out.join("backdrop.png"))?;
    }

    log::info!(
        "wrote {} pieces to {}",
        puzzle.pieces.len(),
        cli.out.display()
    );
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .parse_default_env()
        .init();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            eprintln!("jigcut: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("jigcut").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_override_config_json() {
        let cli = parse(&[
            "img.png",
            "--rows",
            "5",
            "--seed",
            "-3.5",
            "--validate",
            "--config-json",
            r#"{"rows": 2, "cols": 7, "corner_radius": 4.0}"#,
        ]);
        let config = cli.config().unwrap();
        assert_eq!((config.rows, config.cols), (5, 7));
        assert_eq!(config.seed, Some(-3.5));
        assert!(config.validate_regions);
        assert!((config.corner_radius - 4.0).abs() < f64::EPSILON);
    }

    #[test]
    fn defaults_without_flags() {
        let cli = parse(&["img.png"]);
        assert_eq!(cli.config().unwrap(), PuzzleConfig::default());
        assert_eq!(cli.out, PathBuf::from("pieces"));
        assert_eq!(cli.log_level(), log::LevelFilter::Info);
    }

    #[test]
    fn bad_config_json_is_reported() {
        let cli = parse(&["img.png", "--config-json", "{nope"]);
        assert!(cli.config().unwrap_err().starts_with("--config-json"));
    }

    #[test]
    fn zero_workers_rejected_by_parser() {
        let result = Cli::try_parse_from(["jigcut", "img.png", "--workers", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn verbosity_counts() {
        assert_eq!(parse(&["-vv", "img.png"]).log_level(), log::LevelFilter::Trace);
    }
}
