//! pip 封装模块 — 查询、安装、卸载

pub mod error;
pub mod operation;
pub mod parser;
pub mod presence;
pub mod runner;
pub mod types;

// 重新导出常用类型和函数
pub use error::PipError;
pub use operation::{run_operation, OperationEvent, OperationPhase, OperationRequest};
pub use presence::PresenceCheck;
pub use runner::{terminate_running_child, ProcessRunner, SystemRunner};
pub use types::{CommandOutput, InstalledPackages, PackageDetail, PackageRecord, StreamLine};

use crate::config::Config;
use error::Result;
use parser::parse_freeze_list;
use std::sync::Arc;

#[derive(Clone)]
pub struct Pip {
    runner: Arc<dyn ProcessRunner>,
    presence: PresenceCheck,
    label: String,
}

impl std::fmt::Debug for Pip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pip")
            .field("label", &self.label)
            .field("presence", &self.presence)
            .finish()
    }
}

impl Pip {
    pub fn new(runner: Arc<dyn ProcessRunner>, presence: PresenceCheck, label: impl Into<String>) -> Self {
        Self {
            runner,
            presence,
            label: label.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let runner = SystemRunner::new(config.pip.clone(), config.pip_args.clone());
        let mut label = config.pip.clone();
        for arg in &config.pip_args {
            label.push(' ');
            label.push_str(arg);
        }
        Self::new(Arc::new(runner), config.presence_check, label)
    }

    /// 显示用的命令名，例如 `python3 -m pip`
    pub fn name(&self) -> &str {
        &self.label
    }

    pub fn presence(&self) -> PresenceCheck {
        self.presence
    }

    // ===== 查询 =====

    /// 获取已安装包列表 (pip list --format=freeze)
    /// 非零退出时：解析不到任何包返回错误，否则返回部分列表并附带警告
    pub fn list_installed(&self) -> Result<InstalledPackages> {
        let output = self.runner.run_capture(&["list", "--format=freeze"])?;
        let packages = parse_freeze_list(&output.stdout);
        if output.success() {
            return Ok(InstalledPackages {
                packages,
                warning: None,
            });
        }
        let reason = output
            .first_error_line()
            .map(str::to_string)
            .unwrap_or_else(|| format!("pip list 退出码 {:?}", output.code));
        if packages.is_empty() {
            return Err(PipError::Execution(reason));
        }
        log::warn!("pip list 非零退出，仍解析到 {} 个包: {}", packages.len(), reason);
        Ok(InstalledPackages {
            packages,
            warning: Some(reason),
        })
    }

    /// 获取包详情 (pip show)
    pub fn describe(&self, name: &str) -> Result<PackageDetail> {
        let output = self.runner.run_capture(&["show", name])?;
        // 与卸载前的已安装检查使用同一判定
        if !presence::is_installed(&output) {
            return Err(PipError::NotFound(name.to_string()));
        }
        Ok(PackageDetail::new(output.stdout))
    }

    // ===== 变更前检查 =====

    /// 包是否存在于索引中（按配置的检查方式）
    pub fn is_available(&self, name: &str) -> Result<bool> {
        match self.presence.args(name) {
            Some(args) => {
                let output = self.runner.run_capture(&args)?;
                Ok(self.presence.is_available(&output))
            }
            None => Ok(true),
        }
    }

    /// 包当前是否已安装 (pip show)
    pub fn is_installed(&self, name: &str) -> Result<bool> {
        let output = self.runner.run_capture(&["show", name])?;
        Ok(presence::is_installed(&output))
    }

    // ===== 流式变更 =====

    /// 执行安装命令（流式输出）
    pub fn install_streaming(&self, name: &str, sink: &mut dyn FnMut(StreamLine)) -> Result<Option<i32>> {
        self.runner.run_streamed(&["install", name], sink)
    }

    /// 执行卸载命令（流式输出）
    pub fn uninstall_streaming(&self, name: &str, sink: &mut dyn FnMut(StreamLine)) -> Result<Option<i32>> {
        self.runner.run_streamed(&["uninstall", "-y", name], sink)
    }
}
