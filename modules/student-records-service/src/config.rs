use std::env;
use std::path::PathBuf;

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_DATA_DIR: &str = "./student_data";
const DEFAULT_JSON_FILE: &str = "rp_student_data.json";
const DEFAULT_CSV_FILE: &str = "rp_student_data.csv";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub json_file: String,
    pub csv_file: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary key lookup. Unset or blank keys use
    /// the default; an unparseable port is logged and replaced by the default.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match get("STUDENT_RECORDS_PORT") {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                log::warn!(
                    "STUDENT_RECORDS_PORT={:?} is not a valid port, using {}",
                    raw,
                    DEFAULT_PORT
                );
                DEFAULT_PORT
            }),
            None => DEFAULT_PORT,
        };

        Self {
            host: get("STUDENT_RECORDS_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            data_dir: get("STUDENT_RECORDS_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            json_file: get("STUDENT_RECORDS_JSON_FILE")
                .unwrap_or_else(|| DEFAULT_JSON_FILE.to_string()),
            csv_file: get("STUDENT_RECORDS_CSV_FILE")
                .unwrap_or_else(|| DEFAULT_CSV_FILE.to_string()),
        }
    }

    pub fn json_path(&self) -> PathBuf {
        self.data_dir.join(&self.json_file)
    }

    pub fn csv_path(&self) -> PathBuf {
        self.data_dir.join(&self.csv_file)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
