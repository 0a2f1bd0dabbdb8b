//! pip 调用相关错误类型

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipError {
    /// 可执行文件不存在或无权限执行
    #[error("无法启动 {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// 包不存在于索引中，或当前未安装（正常结果，不是故障）
    #[error("包 '{0}' 未找到")]
    NotFound(String),

    /// 其他子进程交互失败
    #[error("执行失败: {0}")]
    Execution(String),
}

impl PipError {
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, PipError>;
