use std::path::PathBuf;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://catalog.db?mode=rwc";
const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Process configuration, read from the environment after `.env` is applied.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub database_url: String,
    pub log_dir: PathBuf,
    pub max_connections: u32,
    /// `.env` file that was loaded, if any.
    pub env_file: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let env_file = dotenv::dotenv().ok();
        let mut config = Self::from_lookup(|key| std::env::var(key).ok());
        config.env_file = env_file;
        config
    }

    pub fn from_lookup<F>(get: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| get(key).filter(|v| !v.trim().is_empty());
        AppConfig {
            database_url: non_empty("DATABASE_URL")
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            log_dir: non_empty("COURSESEED_LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR)),
            max_connections: non_empty("COURSESEED_MAX_CONNECTIONS")
                .and_then(|v| v.trim().parse::<u32>().ok())
                .filter(|n| *n > 0)
                .unwrap_or(DEFAULT_MAX_CONNECTIONS),
            env_file: None,
        }
    }

    /// 启动信息，显示在日志面板
    pub fn session_info(&self) -> Vec<String> {
        let mut info = Vec::new();
        if let Ok(dir) = std::env::current_dir() {
            info.push(format!("当前工作目录: {}", dir.display()));
        }
        match &self.env_file {
            Some(path) => info.push(format!("✓ 找到 .env 文件: {}", path.display())),
            None => info.push("⚠ 未找到 .env 文件，使用系统环境变量".to_string()),
        }
        info.push(format!("数据库: {}", self.database_url));
        info
    }
}
