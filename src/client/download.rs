use crate::error::AppError;
use futures_util::StreamExt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// `ai-video-<first 30 prompt chars>.mp4`, with anything but ASCII alphanumerics as `-`.
pub fn download_file_name(prompt: &str) -> String {
    let stem: String = prompt
        .chars()
        .take(30)
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    format!("ai-video-{}.mp4", stem)
}

/// Stream the media at `video_url` into `dir`, returning the written path.
pub async fn download_video(
    http: &reqwest::Client,
    video_url: &str,
    prompt: &str,
    dir: &Path,
) -> Result<PathBuf, AppError> {
    let resp = http.get(video_url).send().await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(AppError::Api {
            status: status.as_u16(),
            message: "Failed to download video".into(),
        });
    }

    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(download_file_name(prompt));
    let partial = path.with_extension("mp4.part");

    let written = match write_body(resp, &partial).await {
        Ok(written) => written,
        Err(e) => {
            if let Err(cleanup) = tokio::fs::remove_file(&partial).await {
                log::warn!("Failed to remove {}: {}", partial.display(), cleanup);
            }
            return Err(e);
        }
    };
    tokio::fs::rename(&partial, &path).await?;

    log::info!("Downloaded {} bytes to {}", written, path.display());
    Ok(path)
}

// Any existing file at the final path is untouched until the body is complete.
async fn write_body(resp: reqwest::Response, partial: &Path) -> Result<u64, AppError> {
    let mut file = tokio::fs::File::create(partial).await?;
    let mut stream = resp.bytes_stream();
    let mut written: u64 = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        written += chunk.len() as u64;
        file.write_all(&chunk).await?;
    }
    file.flush().await?;
    Ok(written)
}
