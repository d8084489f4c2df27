use cad_text_common::{Point2, ReferencePattern, TextItem};
use cad_text_rust::{cli, config, converter, error, scanner, session, workspace};
use clap::Parser;
use cli::{Cli, Commands, ExportFormat};
use config::Config;
use converter::OdaConverter;
use dialoguer::Select;
use error::{CadTextError, Result};
use indicatif::{ProgressBar, ProgressStyle};
use scanner::{DrawingInfo, DrawingKind};
use session::Session;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use workspace::Workspace;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_warning() => {
            eprintln!("⚠ {}", e);
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("❌ {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "cad_text=debug,cad_text_rust=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(path) = cli.converter {
        config.converter_path = path;
    }

    match cli.command {
        Commands::List { folder } => {
            let mut session = Session::new();
            let drawings = session.load_folder(&folder)?;
            println!("📂 {} ({}件)\n", folder.display(), drawings.len());
            for (i, drawing) in drawings.iter().enumerate() {
                let kind = match drawing.kind {
                    DrawingKind::Dwg => "DWG",
                    DrawingKind::Dxf => "DXF",
                };
                println!("  [{}] {} ({})", i, drawing.file_name, kind);
            }
        }

        Commands::Preview { file, json } => {
            let drawing = DrawingInfo::from_path(&file)?;
            let workspace = Workspace::create(&config.work_root())?;
            let converter = OdaConverter::from_config(&config);

            let mut session = Session::new();
            let items = session.preview_drawing(&converter, &workspace, &drawing).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(items)?);
            } else {
                println!("📄 {} - 検出文字 {}件\n", drawing.file_name, items.len());
                print_items(items);
            }
        }

        Commands::Run { folder, sample, anchor, threshold, output, format } => {
            println!("🚀 cad-text - 一括抽出\n");
            let threshold = threshold.unwrap_or(config.threshold);
            let workspace = Workspace::create(&config.work_root())?;
            let converter = OdaConverter::from_config(&config);
            let mut session = Session::new();

            // 1. 図面一覧
            println!("[1/4] 図面をスキャン中...");
            let drawings = session.load_folder(&folder)?;
            println!("✔ {}件の図面を検出\n", drawings.len());
            let sample = match sample {
                Some(path) => DrawingInfo::from_path(&path)?,
                None => drawings
                    .first()
                    .cloned()
                    .ok_or_else(|| CadTextError::NoDrawingsFound(folder.display().to_string()))?,
            };

            // 2. 見本図面のプレビューと特徴文字の選択
            println!("[2/4] 見本図面を読み込み中... ({})", sample.file_name);
            let items = session.preview_drawing(&converter, &workspace, &sample).await?;
            if items.is_empty() {
                return Err(CadTextError::AnchorOutOfRange { index: anchor.unwrap_or(0), len: 0 });
            }
            let index = match anchor {
                Some(index) => index,
                None => select_anchor_interactive(items)?,
            };
            let pattern = session.select_anchor(index, threshold)?;
            println!(
                "✔ 特徴を設定: 画層 {} 位置 {} 閾値 {}\n",
                pattern.layer, pattern.position, pattern.threshold
            );

            // 3-4. 一括抽出と出力
            let output = output.unwrap_or_else(|| folder.clone());
            run_batch(&mut session, &converter, &workspace, format, &output, 3).await?;
        }

        Commands::Extract { folder, layer, x, y, threshold, output, format } => {
            println!("🚀 cad-text - 一括抽出\n");
            let threshold = threshold.unwrap_or(config.threshold);
            config::validate_threshold(threshold)?;
            let workspace = Workspace::create(&config.work_root())?;
            let converter = OdaConverter::from_config(&config);
            let mut session = Session::new();

            println!("[1/4] 図面をスキャン中...");
            let drawings = session.load_folder(&folder)?;
            println!("✔ {}件の図面を検出\n", drawings.len());

            println!("[2/4] 特徴を設定...");
            session.set_reference(ReferencePattern::new(layer, Point2::new(x, y), threshold));
            if let Some(pattern) = session.reference() {
                println!(
                    "✔ 画層 {} 位置 {} 閾値 {}\n",
                    pattern.layer, pattern.position, pattern.threshold
                );
            }

            let output = output.unwrap_or_else(|| folder.clone());
            run_batch(&mut session, &converter, &workspace, format, &output, 3).await?;
        }

        Commands::Config { set_converter, set_threshold, set_timeout, show } => {
            let mut changed = false;

            if let Some(path) = set_converter {
                config.converter_path = path;
                changed = true;
            }
            if let Some(threshold) = set_threshold {
                config.set_threshold(threshold)?;
                changed = true;
            }
            if let Some(secs) = set_timeout {
                config.timeout_seconds = secs;
                changed = true;
            }

            if changed {
                config.validate()?;
                config.save()?;
                println!("✔ 設定を保存しました: {}", Config::config_path()?.display());
            }

            if show || !changed {
                println!("設定:");
                println!("  変換ツール: {}", config.converter_path.display());
                println!("  出力形式: {} {}", config.output_version, config.output_type);
                println!("  監査: {}", if config.audit { "有効" } else { "無効" });
                println!("  タイムアウト: {}秒", config.timeout_seconds);
                println!("  距離閾値: {}", config.threshold);
                println!("  作業フォルダ: {}", config.work_root().display());
            }
        }
    }

    Ok(())
}

async fn run_batch(
    session: &mut Session,
    converter: &OdaConverter,
    workspace: &Workspace,
    format: ExportFormat,
    output: &Path,
    step: usize,
) -> Result<()> {
    println!("[{}/4] 一括抽出中...", step);
    let pb = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::with_template("  {bar:30.cyan/blue} {pos}/{len} {msg}") {
        pb.set_style(style);
    }
    let report = session
        .batch_process(converter, workspace, |done, total, name| {
            pb.set_length(total as u64);
            pb.set_position(done as u64);
            pb.set_message(name.to_string());
        })
        .await;
    pb.finish_and_clear();
    let report = report?;

    println!(
        "✔ {}件中 {}件で一致\n",
        report.scanned,
        report.results.len()
    );
    if !report.failures.is_empty() {
        println!("⚠ {}件の図面をスキップしました:", report.failures.len());
        for failure in &report.failures {
            println!("  - {}: {}", failure.file_name, failure.message);
        }
        println!();
    }

    println!("[{}/4] 結果を出力中...", step + 1);
    if report.results.is_empty() {
        println!("一致する図面がないため出力しません");
        return Ok(());
    }
    let path: PathBuf = session.export(format, output)?;
    println!("✔ {}出力: {}", format, path.display());

    println!("\n✅ 完了");
    Ok(())
}

fn print_items(items: &[TextItem]) {
    for (i, item) in items.iter().enumerate() {
        println!("  [{}] {} {}", i, item.display_label(), item.position);
    }
}

fn select_anchor_interactive(items: &[TextItem]) -> Result<usize> {
    let labels: Vec<String> = items
        .iter()
        .map(|item| format!("{} {}", item.display_label(), item.position))
        .collect();

    Select::new()
        .with_prompt("特徴文字を選択してください")
        .items(&labels)
        .default(0)
        .interact()
        .map_err(|e| CadTextError::Interactive(e.to_string()))
}
