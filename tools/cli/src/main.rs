//! OrgShare CLI - Command line interface for organization media sharing.
//!
//! This tool authorizes against Google, uploads media into Drive folders,
//! manages those folders and provisions new organizations.

mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use orgshare_common::Organization;
use orgshare_google::drive::{DriveClient, ProgressFn, UploadMetadata, UploadSource};
use orgshare_google::oauth::{ConsentFlow, TokenCache, DRIVE_FILE_SCOPE, YOUTUBE_SCOPE};
use orgshare_google::{Provisioner, YouTubeClient};

use crate::config::Settings;

#[derive(Parser)]
#[command(name = "orgshare")]
#[command(about = "OrgShare - Drive uploads and YouTube playlists for organizations")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Settings file (default: <config dir>/orgshare/config.json).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print and open the Google consent URL.
    Authorize {
        /// Do not try to open a browser.
        #[arg(long)]
        no_browser: bool,
    },

    /// Exchange an authorization code for a refresh token.
    Exchange {
        /// Code from the consent redirect.
        code: String,
    },

    /// Obtain an access token and show its expiry.
    Token {
        /// Use the YouTube credentials.
        #[arg(long)]
        youtube: bool,

        /// Print the access token itself.
        #[arg(long)]
        show: bool,
    },

    /// List the contents of a Drive folder.
    List {
        /// Folder ID.
        folder: String,

        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Upload a file into a Drive folder.
    Upload {
        /// Local file to upload.
        #[arg(short, long)]
        file: PathBuf,

        /// Destination folder ID.
        #[arg(short = 'd', long)]
        folder: String,

        /// Name in Drive (default: the file name).
        #[arg(short, long)]
        title: Option<String>,

        /// Description stored with the file.
        #[arg(long)]
        description: Option<String>,

        /// MIME type (default: guessed from the extension).
        #[arg(long)]
        content_type: Option<String>,
    },

    /// Delete a Drive file.
    DeleteFile {
        /// File ID.
        id: String,
    },

    /// Delete a Drive folder and its immediate children.
    DeleteFolder {
        /// Folder ID.
        id: String,
    },

    /// Give an account writer access to a folder.
    Share {
        /// Folder ID.
        folder: String,

        /// Account email.
        email: String,
    },

    /// Make a Drive file readable by anyone with the link.
    MakePublic {
        /// File ID.
        id: String,
    },

    /// Create an organization's folders and playlists.
    Provision {
        /// Organization name.
        #[arg(short, long)]
        name: String,

        /// Organization contact email.
        #[arg(short, long)]
        email: String,

        /// Account receiving writer access (default: from settings).
        #[arg(long)]
        share_with: Option<String>,
    },

    /// List the videos of a playlist.
    PlaylistVideos {
        /// Playlist ID.
        playlist: String,

        /// Maximum number of videos (1-50).
        #[arg(short, long)]
        max_results: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;

    match cli.command {
        Commands::Authorize { no_browser } => cmd_authorize(&settings, no_browser),

        Commands::Exchange { code } => cmd_exchange(&settings, &code).await,

        Commands::Token { youtube, show } => cmd_token(&settings, youtube, show).await,

        Commands::List { folder, json } => cmd_list(&settings, &folder, json).await,

        Commands::Upload {
            file,
            folder,
            title,
            description,
            content_type,
        } => {
            let metadata = UploadMetadata { title, description };
            cmd_upload(&settings, &file, &folder, metadata, content_type).await
        }

        Commands::DeleteFile { id } => cmd_delete_file(&settings, &id).await,

        Commands::DeleteFolder { id } => cmd_delete_folder(&settings, &id).await,

        Commands::Share { folder, email } => cmd_share(&settings, &folder, &email).await,

        Commands::MakePublic { id } => cmd_make_public(&settings, &id).await,

        Commands::Provision {
            name,
            email,
            share_with,
        } => cmd_provision(&settings, &name, &email, share_with).await,

        Commands::PlaylistVideos {
            playlist,
            max_results,
        } => cmd_playlist_videos(&settings, &playlist, max_results).await,
    }
}

fn consent_flow(settings: &Settings) -> Result<ConsentFlow> {
    let drive = &settings.drive;
    ConsentFlow::new(
        drive.client_id.clone(),
        drive.client_secret.clone(),
        settings.redirect_url.clone(),
    )
    .context("Invalid OAuth client settings")
}

fn drive_tokens(settings: &Settings) -> Result<TokenCache> {
    TokenCache::new(settings.drive_credentials()).context("Drive credentials are incomplete")
}

fn youtube_tokens(settings: &Settings) -> Result<TokenCache> {
    TokenCache::new(settings.youtube_credentials()).context("YouTube credentials are incomplete")
}

async fn drive_client(settings: &Settings) -> Result<DriveClient> {
    let token = drive_tokens(settings)?
        .get_valid_token()
        .await
        .context("Failed to obtain an access token")?;
    DriveClient::new(token).context("Failed to create Drive client")
}

/// Print the consent URL and try to open it.
fn cmd_authorize(settings: &Settings, no_browser: bool) -> Result<()> {
    let flow = consent_flow(settings)?;
    let state = format!("orgshare-{}", chrono::Utc::now().timestamp_millis());
    let url = flow
        .authorization_url(&[DRIVE_FILE_SCOPE, YOUTUBE_SCOPE], &state)
        .context("Failed to build consent URL")?;

    println!("Visit this URL to grant access:");
    println!("  {}", url);
    println!("\nThen run: orgshare exchange <code>");

    if !no_browser {
        if let Err(e) = open::that(url.as_str()) {
            info!("Could not open a browser: {}", e);
        }
    }

    Ok(())
}

/// Trade an authorization code for a refresh token.
async fn cmd_exchange(settings: &Settings, code: &str) -> Result<()> {
    let flow = consent_flow(settings)?;
    let grant = flow
        .exchange_code(code)
        .await
        .context("Failed to exchange authorization code")?;

    println!("Authorization complete!");
    println!(
        "  Refresh token: {}",
        grant.refresh_token.as_deref().unwrap_or_default()
    );
    println!("\nStore it as GOOGLE_REFRESH_TOKEN or in the settings file.");

    Ok(())
}

/// Refresh an access token and report when it expires.
async fn cmd_token(settings: &Settings, youtube: bool, show: bool) -> Result<()> {
    let cache = if youtube {
        youtube_tokens(settings)?
    } else {
        drive_tokens(settings)?
    };

    let token = cache
        .get_valid_token()
        .await
        .context("Failed to obtain an access token")?;

    println!("Access token obtained.");
    if let Some(expires_at) = cache.cached_expiry().await {
        println!("  Expires: {}", expires_at.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    if show {
        println!("  Token: {}", token);
    }

    Ok(())
}

/// List folder contents.
async fn cmd_list(settings: &Settings, folder: &str, json: bool) -> Result<()> {
    let drive = drive_client(settings).await?;
    let files = drive
        .list_files(folder)
        .await
        .context("Failed to list folder")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&files)?);
        return Ok(());
    }

    if files.is_empty() {
        println!("Folder is empty.");
    } else {
        println!("Contents of {}:", folder);
        for file in files {
            if file.is_folder() {
                println!("  [DIR]  {}/  ({})", file.name, file.id);
            } else {
                let size_str = file
                    .size_bytes()
                    .map(|s| format!("{} bytes", s))
                    .unwrap_or_default();
                println!("  [FILE] {} ({})  ({})", file.name, size_str, file.id);
            }
        }
    }

    Ok(())
}

/// Upload a local file.
async fn cmd_upload(
    settings: &Settings,
    file: &Path,
    folder: &str,
    metadata: UploadMetadata,
    content_type: Option<String>,
) -> Result<()> {
    let content_type = content_type.unwrap_or_else(|| content_type_for(file).to_string());
    let source = UploadSource::from_path(file, content_type)
        .await
        .context("Failed to read source file")?;

    let drive = drive_client(settings).await?;
    let progress: ProgressFn = Arc::new(|percent| {
        eprint!("\rUploading... {:>3}%", percent);
        let _ = std::io::stderr().flush();
    });

    let uploaded = drive
        .upload(&source, folder, &metadata, Some(progress))
        .await;
    eprintln!();
    let uploaded = uploaded.context("Upload failed")?;

    println!("File uploaded successfully!");
    println!("  ID: {}", uploaded.id);
    println!("  Name: {}", uploaded.name);
    if let Some(link) = &uploaded.web_view_link {
        println!("  Link: {}", link);
    }

    Ok(())
}

/// Delete a file.
async fn cmd_delete_file(settings: &Settings, id: &str) -> Result<()> {
    let drive = drive_client(settings).await?;
    drive
        .delete_file(id)
        .await
        .context("Failed to delete file")?;

    println!("Deleted {}", id);
    Ok(())
}

/// Delete a folder with its children.
async fn cmd_delete_folder(settings: &Settings, id: &str) -> Result<()> {
    let drive = drive_client(settings).await?;
    drive
        .delete_folder(id)
        .await
        .context("Failed to delete folder")?;

    println!("Deleted folder {}", id);
    Ok(())
}

/// Share a folder with an account.
async fn cmd_share(settings: &Settings, folder: &str, email: &str) -> Result<()> {
    let drive = drive_client(settings).await?;
    drive
        .share_folder_with_account(folder, email)
        .await
        .context("Failed to share folder")?;

    println!("Shared {} with {}", folder, email);
    Ok(())
}

/// Make a file public.
async fn cmd_make_public(settings: &Settings, id: &str) -> Result<()> {
    let drive = drive_client(settings).await?;
    drive
        .set_file_public(id)
        .await
        .context("Failed to make file public")?;

    println!("{} is now readable by anyone with the link", id);
    Ok(())
}

/// Provision a new organization.
async fn cmd_provision(
    settings: &Settings,
    name: &str,
    email: &str,
    share_with: Option<String>,
) -> Result<()> {
    let org = Organization::new(name, email).context("Invalid organization")?;
    let share_with = share_with
        .or_else(|| settings.share_with.clone())
        .context("No account to share with; pass --share-with or set ORGSHARE_SHARE_WITH")?;

    let youtube = YouTubeClient::new(Arc::new(youtube_tokens(settings)?))
        .context("Failed to create YouTube client")?;
    let provisioner = Provisioner::new(Arc::new(drive_tokens(settings)?), youtube);

    info!("Provisioning {}", org.name());
    let provisioned = provisioner
        .provision(&org, &share_with)
        .await
        .context("Failed to provision organization")?;

    println!("{}", serde_json::to_string_pretty(&provisioned)?);
    Ok(())
}

/// List a playlist's videos.
async fn cmd_playlist_videos(
    settings: &Settings,
    playlist: &str,
    max_results: Option<u32>,
) -> Result<()> {
    let youtube = YouTubeClient::new(Arc::new(youtube_tokens(settings)?))
        .context("Failed to create YouTube client")?;
    let videos = youtube
        .playlist_videos(playlist, max_results)
        .await
        .context("Failed to fetch playlist")?;

    println!("{}", serde_json::to_string_pretty(&videos)?);
    Ok(())
}

/// MIME type for common media extensions.
fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());

    match extension.as_deref() {
        Some("mp4") | Some("m4v") => "video/mp4",
        Some("mov") => "video/quicktime",
        Some("webm") => "video/webm",
        Some("mkv") => "video/x-matroska",
        Some("avi") => "video/x-msvideo",
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}
