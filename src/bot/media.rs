//! Telegram media retrieval. Photos ride the long-timeout media client;
//! timeouts are surfaced distinctly so the user gets a specific message.

use crate::app::App;
use crate::errors::{AppError, AppResult};
use teloxide::prelude::*;
use teloxide::types::{FileId, PhotoSize};
use tracing::debug;

/// Pick the largest rendition Telegram offers for an uploaded photo
pub fn largest_photo(photos: &[PhotoSize]) -> Option<&PhotoSize> {
    photos.iter().max_by_key(|p| p.width * p.height)
}

/// Download a photo by file id and store it in the upload directory,
/// returning the saved path
pub async fn download_and_save_photo(app: &App, file_id: FileId) -> AppResult<String> {
    let file = app.bot.get_file(file_id).await?;
    let url = format!(
        "https://api.telegram.org/file/bot{}/{}",
        app.bot.token(),
        file.path
    );

    let response = app.media_client.get(&url).send().await?;
    if !response.status().is_success() {
        return Err(AppError::Network(format!(
            "file download returned status {}",
            response.status()
        )));
    }

    let bytes = response.bytes().await?;
    debug!(size = bytes.len(), "Photo downloaded");

    let path = app.lifecycle.save_photo(&bytes, "jpg").await?;
    debug!(path = %path, "Photo saved");
    Ok(path)
}
