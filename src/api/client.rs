use std::path::Path;

use bytes::BytesMut;
use futures::StreamExt;
use reqwest::{Client, Response};
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use url::Url;

use crate::domain::Result;

/// Size of the slices written to disk and reported as progress
pub const CHUNK_SIZE: usize = 4096;

#[derive(Debug, Clone, Default)]
pub struct Downloader {
    client: Client,
}

impl Downloader {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    async fn request(&self, url: &str) -> Result<Response> {
        let url = Url::parse(url)?;
        tracing::debug!("GET {}", url);

        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response)
    }

    /// Stream `url` into `destination`.
    ///
    /// `on_progress(downloaded, total)` fires after every chunk written. When the
    /// server does not announce a length the body is written in one go and the
    /// callback never fires. If the transfer fails after `destination` was
    /// created, the partial file is removed.
    pub async fn download<F>(&self, url: &str, destination: &Path, mut on_progress: F) -> Result<()>
    where
        F: FnMut(u64, u64),
    {
        let response = self.request(url).await?;
        let mut file = File::create(destination).await?;

        if let Err(e) = write_body(response, &mut file, &mut on_progress).await {
            drop(file);
            if tokio::fs::remove_file(destination).await.is_ok() {
                tracing::debug!("removed partial download {}", destination.display());
            }
            return Err(e);
        }

        tracing::debug!("downloaded {} to {}", url, destination.display());
        Ok(())
    }
}

async fn write_body<F>(response: Response, file: &mut File, on_progress: &mut F) -> Result<()>
where
    F: FnMut(u64, u64),
{
    match response.content_length() {
        None => {
            let body = response.bytes().await?;
            file.write_all(&body).await?;
        }
        Some(total) => {
            let mut stream = response.bytes_stream();
            let mut pending = BytesMut::new();
            let mut downloaded = 0u64;

            while let Some(chunk) = stream.next().await {
                pending.extend_from_slice(&chunk?);

                while pending.len() >= CHUNK_SIZE {
                    let piece = pending.split_to(CHUNK_SIZE);
                    file.write_all(&piece).await?;
                    downloaded += piece.len() as u64;
                    on_progress(downloaded, total);
                }
            }

            if !pending.is_empty() {
                file.write_all(&pending).await?;
                downloaded += pending.len() as u64;
                on_progress(downloaded, total);
            }
        }
    }

    file.sync_all().await?;
    Ok(())
}
