use crate::pip::PresenceCheck;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// 覆盖 `pip` 可执行文件的环境变量
pub const PIP_BIN_ENV: &str = "LIAN_PIP_BIN";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// pip 可执行文件
    pub pip: String,
    /// 每次调用前附加的参数，例如 `python3` 配合 `["-m", "pip"]`
    pub pip_args: Vec<String>,
    /// 安装前的存在性检查方式
    pub presence_check: PresenceCheck,
    /// 启动时加载已安装包列表
    pub refresh_on_start: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pip: "pip".to_string(),
            pip_args: Vec::new(),
            presence_check: PresenceCheck::default(),
            refresh_on_start: true,
        }
    }
}

impl Config {
    pub fn config_path() -> PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".config/lian-pip/config.toml")
    }

    pub fn load_or_default() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_path())?;

        // 可执行文件优先级：环境变量 > 配置文件
        if let Ok(bin) = std::env::var(PIP_BIN_ENV) {
            if !bin.trim().is_empty() {
                config.pip = bin.trim().to_string();
            }
        }
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("解析配置文件失败: {}", path.display()))?;
            log::info!("已加载配置文件 {}", path.display());
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }
}
