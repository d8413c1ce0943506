//! Streaming HTTP downloads for the dataset and model files

use std::path::Path;
use std::time::Duration;

use reqwest::Client;
use tokio::io::AsyncWriteExt;

use crate::error::{Result, SearchError};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest silence tolerated between two reads of a response
const READ_TIMEOUT: Duration = Duration::from_secs(120);

/// Client for large downloads: bounded connect and per-read waits, no total deadline
pub(crate) fn download_client() -> Result<Client> {
    client_with_timeouts(CONNECT_TIMEOUT, READ_TIMEOUT)
}

pub(crate) fn client_with_timeouts(connect: Duration, read: Duration) -> Result<Client> {
    Ok(Client::builder()
        .connect_timeout(connect)
        .read_timeout(read)
        .build()?)
}

/// Stream `url` into `dest`, returning the number of bytes written
pub(crate) async fn fetch_to(client: &Client, url: &str, dest: &Path) -> Result<u64> {
    let mut response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(SearchError::Download {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let mut file = tokio::fs::File::create(dest).await?;
    let mut written = 0u64;
    while let Some(chunk) = response.chunk().await? {
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[tokio::test]
    async fn test_stalled_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept the connection and never answer
        let stall = std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            std::thread::sleep(Duration::from_secs(2));
            drop(stream);
        });

        let dir = tempfile::tempdir().unwrap();
        let client =
            client_with_timeouts(Duration::from_secs(1), Duration::from_millis(200)).unwrap();
        let url = format!("http://{}/data.tsv", addr);

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            fetch_to(&client, &url, &dir.path().join("data.tsv")),
        )
        .await
        .expect("read timeout should end the request first");

        match result {
            Err(SearchError::Http(_)) => {}
            other => panic!("Expected timeout, got {:?}", other),
        }
        stall.join().unwrap();
    }

    #[tokio::test]
    async fn test_error_status_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/missing.zip")
            .with_status(404)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let client = download_client().unwrap();
        let url = format!("{}/missing.zip", server.url());

        let err = fetch_to(&client, &url, &dir.path().join("missing.zip"))
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::Download { status: 404, .. }));
        assert!(err.to_string().contains("missing.zip"));
    }
}
