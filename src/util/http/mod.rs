use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use once_cell::sync::{Lazy, OnceCell};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::Semaphore;

use crate::logging::Logger;

/// FinMind 免費帳號有流量限制，同時最多 2 個請求
static SEMAPHORE: Lazy<Semaphore> = Lazy::new(|| Semaphore::new(2));

static CLIENT: OnceCell<Client> = OnceCell::new();

static LOGGER: Lazy<Logger> = Lazy::new(|| Logger::new("http"));

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// HTTP 請求失敗時的最大重試次數。
const MAX_RETRIES: u32 = 3;

fn get_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .brotli(true)
            .gzip(true)
            .zstd(true)
            .connect_timeout(Duration::from_secs(8))
            .timeout(Duration::from_secs(30))
            .tcp_nodelay(true)
            .tcp_keepalive(Duration::from_secs(60))
            .http2_keep_alive_interval(Duration::from_secs(30))
            .http2_keep_alive_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(90))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|why| anyhow!("Failed to create reqwest client: {:?}", why))
    })
}

/// 以 GET 取得 JSON 並反序列化成 `RES`
pub async fn get_json<RES: DeserializeOwned>(url: &str) -> Result<RES> {
    let response = get(url).await?;
    let status = response.status();
    if status != StatusCode::OK {
        let body = response.text().await.unwrap_or_default();
        return Err(anyhow!("GET:{} returned {} {}", url, status, body));
    }

    response
        .json::<RES>()
        .await
        .map_err(|why| anyhow!("Error parsing response JSON from {}: {:?}", url, why))
}

/// 送出 GET，連線層級的失敗會以指數退避重試
async fn get(url: &str) -> Result<Response> {
    let client = get_client()?;
    let mut last_error = String::new();

    for attempt in 1..=MAX_RETRIES {
        let permit = SEMAPHORE.acquire().await;
        let start = Instant::now();
        let res = client.get(url).send().await;
        let elapsed = start.elapsed().as_millis();
        drop(permit);

        match res {
            Ok(response) => {
                LOGGER.info(format!("Attempt {} GET:{} {} ms", attempt, url, elapsed));
                return Ok(response);
            }
            Err(why) => {
                last_error = format!("{:?}", why);
                LOGGER.error(format!(
                    "Attempt {} GET:{} failed because {:?}. {} ms",
                    attempt, url, why, elapsed
                ));
                if attempt < MAX_RETRIES {
                    tokio::time::sleep(Duration::from_secs(2u64.pow(attempt))).await;
                }
            }
        }
    }

    Err(anyhow!(
        "Failed to GET {} after {} attempts; last error: {}",
        url,
        MAX_RETRIES,
        last_error
    ))
}
