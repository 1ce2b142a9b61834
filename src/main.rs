use clap::{Parser, Subcommand};
use reelgen_lib::client::{
    self, GenerationController, GenerationOptions, GenerationState, HttpGenerationApi, NoticeLevel,
};
use reelgen_lib::storage::SqliteSlots;
use reelgen_lib::upstream::InferenceClient;
use reelgen_lib::{server, AppConfig, AppError, GenerationResult, GenerationStatus, VideoLibrary};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "reelgen", version, about = "Generate videos from text prompts")]
struct Cli {
    /// Base URL of the reelgen server used by client commands.
    #[arg(long, global = true, env = "REELGEN_SERVER_URL")]
    server: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API.
    Serve,
    /// Submit a prompt and wait for the video.
    Generate {
        prompt: String,
        #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u32).range(3..=30))]
        duration: u32,
        #[arg(long, default_value = "standard")]
        quality: String,
        #[arg(long, default_value = "realistic")]
        style: String,
    },
    /// List stored videos, newest first.
    List,
    /// Show one stored video.
    Show { id: String },
    /// Download a stored video.
    Download {
        id: String,
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Delete a stored video.
    Delete { id: String },
    /// Delete all stored videos.
    Clear,
    /// Print the server's service description.
    Info,
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env();
    if let Some(url) = cli.server.clone() {
        config.client.server_url = url;
    }

    if let Err(e) = run(cli.command, config).await {
        log::error!("{}", e);
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

async fn run(command: Command, config: AppConfig) -> Result<(), AppError> {
    match command {
        Command::Serve => serve(config).await,
        Command::Generate {
            prompt,
            duration,
            quality,
            style,
        } => {
            let options = GenerationOptions {
                duration,
                quality,
                style,
            };
            generate(&config, prompt, options).await
        }
        Command::List => {
            let library = open_library(&config).await?;
            print_gallery(&library.load().await);
            Ok(())
        }
        Command::Show { id } => {
            let library = open_library(&config).await?;
            let video = library.get(&id).await.ok_or(AppError::NotFound(id))?;
            print_details(&video);
            Ok(())
        }
        Command::Download { id, dir } => {
            let library = open_library(&config).await?;
            let video = library.get(&id).await.ok_or(AppError::NotFound(id))?;
            let dir = match dir {
                Some(dir) => dir,
                None => dirs::download_dir()
                    .or_else(|| dirs::home_dir().map(|h| h.join("Downloads")))
                    .ok_or_else(|| AppError::Internal("Cannot determine download directory".into()))?,
            };
            let path =
                client::download_video(&reqwest::Client::new(), &video.video_url, &video.prompt, &dir)
                    .await?;
            println!("Video download complete: {}", path.display());
            Ok(())
        }
        Command::Delete { id } => {
            let library = open_library(&config).await?;
            if library.remove(&id).await {
                println!("Deleted {}", id);
                Ok(())
            } else {
                Err(AppError::Internal(format!("failed to delete {}", id)))
            }
        }
        Command::Clear => {
            let library = open_library(&config).await?;
            if library.clear().await {
                println!("Library cleared");
                Ok(())
            } else {
                Err(AppError::Internal("failed to clear library".into()))
            }
        }
        Command::Info => {
            let api = HttpGenerationApi::new(
                &config.client.server_url,
                Duration::from_secs(config.client.request_timeout_secs),
            );
            let info = api.service_info().await?;
            println!("{}", serde_json::to_string_pretty(&info)?);
            Ok(())
        }
    }
}

async fn serve(config: AppConfig) -> Result<(), AppError> {
    if config.upstream.api_key.is_none() {
        log::warn!("UPSTREAM_API_KEY is not set; upstream calls will be unauthenticated");
    }
    let inference = Arc::new(InferenceClient::new(config.upstream.clone())?);

    let shutdown = CancellationToken::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::info!("Shutdown requested");
            trigger.cancel();
        }
    });

    server::start(&config.server, inference, shutdown).await
}

async fn open_library(config: &AppConfig) -> Result<VideoLibrary, AppError> {
    let slots = SqliteSlots::open(&config.client.db_path).await?;
    Ok(VideoLibrary::new(Arc::new(slots)).with_capacity(config.client.library_capacity))
}

async fn generate(
    config: &AppConfig,
    prompt: String,
    options: GenerationOptions,
) -> Result<(), AppError> {
    let api = Arc::new(HttpGenerationApi::new(
        &config.client.server_url,
        Duration::from_secs(config.client.request_timeout_secs),
    ));
    let library = open_library(config).await?;
    let mut controller = GenerationController::new(api, library)
        .await
        .with_progress_tick(Duration::from_millis(config.client.progress_tick_ms));
    controller.set_prompt(prompt);
    controller.set_options(options);

    let cancel = controller.cancel_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let mut updates = controller.subscribe();
    let renderer = tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let state = updates.borrow_and_update().clone();
            if state.status != GenerationStatus::Processing {
                break;
            }
            render_progress(&state);
        }
    });

    let outcome = controller.submit().await;
    renderer.abort();

    for notice in controller.take_notices() {
        match notice.level {
            NoticeLevel::Error => eprintln!("✗ {}", notice.text),
            NoticeLevel::Success => println!("✓ {}", notice.text),
            NoticeLevel::Info => println!("• {}", notice.text),
        }
    }

    let video = outcome?;
    print_details(&video);
    Ok(())
}

fn render_progress(state: &GenerationState) {
    println!("[{:>3}%] {}", state.progress, state.message);
}

fn print_gallery(videos: &[GenerationResult]) {
    if videos.is_empty() {
        println!("No videos yet. Generate one with `reelgen generate \"<prompt>\"`.");
        return;
    }
    for video in videos {
        let prompt: String = video.prompt.chars().take(60).collect();
        println!(
            "{}  {:<10}  {:>3}s  {}  {}",
            video.id,
            video.status.as_str(),
            video.duration,
            video.created_at,
            prompt
        );
    }
}

fn print_details(video: &GenerationResult) {
    println!("id:        {}", video.id);
    println!("prompt:    {}", video.prompt);
    println!("status:    {}", video.status);
    println!("video:     {}", video.video_url);
    if let Some(thumb) = &video.thumbnail_url {
        println!("thumbnail: {}", thumb);
    }
    println!("duration:  {}s ({}, {})", video.duration, video.quality, video.style);
    println!("created:   {}", video.created_at);
    if let Some(secs) = video.metadata.processing_time {
        println!("took:      {}s", secs);
    }
}
