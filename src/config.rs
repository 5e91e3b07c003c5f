use std::{collections::HashMap, env, path::PathBuf, str::FromStr};

use anyhow::Result;
use config::{Config as config_config, File as config_file};
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::logging;

const CONFIG_PATH: &str = "app.json";

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
pub struct App {
    #[serde(default)]
    pub postgresql: PostgreSQL,
    #[serde(default)]
    pub finmind: FinMind,
    #[serde(default)]
    pub calibration: Calibration,
}

const POSTGRESQL_HOST: &str = "POSTGRESQL_HOST";
const POSTGRESQL_PORT: &str = "POSTGRESQL_PORT";
const POSTGRESQL_USER: &str = "POSTGRESQL_USER";
const POSTGRESQL_PASSWORD: &str = "POSTGRESQL_PASSWORD";
const POSTGRESQL_DB: &str = "POSTGRESQL_DB";

#[derive(Serialize, Deserialize, Default, Debug, Clone)]
pub struct PostgreSQL {
    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: i32,
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub db: String,
}

const FINMIND_BASE_URL: &str = "FINMIND_BASE_URL";
const FINMIND_TOKEN: &str = "FINMIND_TOKEN";

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FinMind {
    #[serde(default = "default_finmind_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub token: String,
}

impl Default for FinMind {
    fn default() -> Self {
        FinMind {
            base_url: default_finmind_base_url(),
            token: String::new(),
        }
    }
}

fn default_finmind_base_url() -> String {
    "https://api.finmindtrade.com/api/v4/data".to_string()
}

const OUTSTANDING_SHARES: &str = "OUTSTANDING_SHARES";

/// 各股票的校正參數
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Calibration {
    /// 流通在外股數，key 為股票代號。FinMind 沒有稅後淨利時以 EPS × 股數回推
    #[serde(default = "default_outstanding_shares")]
    pub outstanding_shares: HashMap<String, Decimal>,
}

impl Calibration {
    pub fn outstanding_shares(&self, symbol: &str) -> Option<Decimal> {
        self.outstanding_shares.get(symbol).copied()
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Calibration {
            outstanding_shares: default_outstanding_shares(),
        }
    }
}

/// 台積電約 259 億股
fn default_outstanding_shares() -> HashMap<String, Decimal> {
    HashMap::from([("2330".to_string(), Decimal::from(25_900_000_000_i64))])
}

pub static SETTINGS: Lazy<App> = Lazy::new(|| {
    App::get().unwrap_or_else(|why| {
        logging::error_console(format!("Failed to load config because {:?}", why));
        App::from_env()
    })
});

impl App {
    fn get() -> Result<Self> {
        let config_path = config_path();
        if config_path.exists() {
            let config: App = config_config::builder()
                .add_source(config_file::from(config_path))
                .build()?
                .try_deserialize()?;
            return Ok(config.override_with_env());
        }

        Ok(App::from_env())
    }

    /// 從 env 中讀取設定值
    fn from_env() -> Self {
        App::default().override_with_env()
    }

    /// 將來至於 env 的設定值覆蓋掉 json 上的設定值
    fn override_with_env(mut self) -> Self {
        if let Ok(host) = env::var(POSTGRESQL_HOST) {
            self.postgresql.host = host;
        }

        if let Ok(port) = env::var(POSTGRESQL_PORT) {
            self.postgresql.port = i32::from_str(&port).unwrap_or(5432);
        }

        if self.postgresql.port == 0 {
            self.postgresql.port = 5432;
        }

        if let Ok(user) = env::var(POSTGRESQL_USER) {
            self.postgresql.user = user;
        }

        if let Ok(password) = env::var(POSTGRESQL_PASSWORD) {
            self.postgresql.password = password;
        }

        if let Ok(db) = env::var(POSTGRESQL_DB) {
            self.postgresql.db = db;
        }

        if let Ok(base_url) = env::var(FINMIND_BASE_URL) {
            self.finmind.base_url = base_url;
        }

        if let Ok(token) = env::var(FINMIND_TOKEN) {
            self.finmind.token = token;
        }

        if let Ok(shares) = env::var(OUTSTANDING_SHARES) {
            self.calibration.override_with_json(&shares);
        }

        self
    }
}

impl Calibration {
    /// 以 JSON 物件覆蓋 (或新增) 個股股數，例如 {"2330":25900000000}
    fn override_with_json(&mut self, json: &str) {
        match serde_json::from_str::<HashMap<String, Decimal>>(json) {
            Ok(shares) => self.outstanding_shares.extend(shares),
            Err(why) => {
                logging::error_file_async(format!(
                    "Failed to serde_json because: {:?} \r\n {}",
                    why, json
                ));
            }
        }
    }
}

/// 回傳設定檔的路徑
fn config_path() -> PathBuf {
    PathBuf::from(CONFIG_PATH)
}
