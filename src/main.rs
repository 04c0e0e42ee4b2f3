use card_scan::{cli, config, convert, cropper, error, export, identify, pipeline, progress, scanner, session};
use card_scan_common::{AppState, Command};
use clap::Parser;
use cli::{Cli, Commands};
use config::Config;
use error::Result;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("\n✖ {}", e.user_message());
        tracing::debug!("詳細: {:?}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "card_scan=debug,card_scan_common=debug"
    } else {
        "card_scan=warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;

    match cli.command {
        Commands::Scan { paths, output } => {
            println!("🃏 card-scan - カード識別\n");

            let images = scanner::collect_images(&paths)?;
            println!("✔ {}枚の画像を検出\n", images.len());

            let pipeline = build_pipeline(&config)?;
            let pb = progress::spinner();
            let scan = pipeline
                .run(&images, |phase| progress::report(&pb, phase))
                .await?;

            let mut app = AppState::new();
            app.apply(Command::StartScan(scan))?;
            let Some(scan) = app.scan() else {
                return Ok(());
            };

            println!(
                "\n{}件のカードを検出（報告総数 {}件、切り出し {}件）",
                scan.detections.len(),
                scan.total_detected,
                scan.cropped_count()
            );
            for (i, d) in scan.detections.iter().enumerate() {
                println!("{}", session::format_detection_line(i, d, false));
            }

            if let Some(output_dir) = output {
                let summary = export::export_scan(scan, &output_dir)?;
                println!("\n✔ 結果を保存: {}", summary.scan_file.display());
                println!("✔ 切り出し画像: {}件", summary.crop_files.len());
            }

            println!("\n✅ 完了");
        }

        Commands::Session { paths } => {
            let pipeline = build_pipeline(&config)?;
            session::Session::new(pipeline).run(paths).await?;
        }

        Commands::Crop { image, bbox, output } => {
            let bytes = std::fs::read(&image)
                .map_err(|e| error::CardScanError::ImageLoad(format!("{}: {}", image.display(), e)))?;
            let decoded = cropper::decode_image(&bytes)?;
            let (rect, data_url) = cropper::crop_to_data_url(&decoded, &bbox, config.jpeg_quality)?;
            std::fs::write(&output, cropper::decode_data_url(&data_url)?)?;

            println!(
                "✔ {}x{} @ ({}, {}) を切り出し: {}",
                rect.width,
                rect.height,
                rect.x,
                rect.y,
                output.display()
            );
        }

        Commands::Config { set_api_key, set_model, show } => {
            let mut config = config;

            if let Some(key) = set_api_key {
                config.set_api_key(key)?;
                println!("✔ APIキーを設定しました");
            }

            if let Some(model) = set_model {
                config.set_model(model)?;
                println!("✔ モデルを設定しました");
            }

            if show {
                println!("設定: {}", Config::config_path()?.display());
                println!("  モデル: {}", config.model);
                println!("  APIエンドポイント: {}", config.api_base);
                println!("  タイムアウト: {}秒", config.timeout_seconds);
                println!("  JPEG品質: {}", config.jpeg_quality);
                println!(
                    "  APIキー: {}",
                    if config.get_api_key().is_ok() { "設定済み" } else { "未設定" }
                );
            }
        }
    }

    Ok(())
}

fn build_pipeline(
    config: &Config,
) -> Result<pipeline::ScanPipeline<identify::GeminiClient, convert::CommandConverter>> {
    let client = identify::GeminiClient::from_config(config)?;
    Ok(pipeline::ScanPipeline::new(client, convert::CommandConverter::default())
        .with_jpeg_quality(config.jpeg_quality))
}
