//! pip 相关数据类型定义

/// 单次阻塞执行的完整输出
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// 退出码；被信号终止时为 None
    pub code: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// stderr 第一条非空行，用于错误提示
    pub fn first_error_line(&self) -> Option<&str> {
        self.stderr.lines().map(str::trim).find(|l| !l.is_empty())
    }
}

/// 流式执行时产生的一条输出
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamLine {
    Stdout(String),
    Stderr(String),
    /// 以 `\r` 结尾的就地刷新行（进度条），不写入日志
    Progress(String),
}

/// 已安装包（来自 `pip list --format=freeze`）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageRecord {
    pub name: String,
}

/// `pip list` 的结果。pip 非零退出但仍输出了部分列表时，`warning` 为 stderr 首行
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstalledPackages {
    pub packages: Vec<PackageRecord>,
    pub warning: Option<String>,
}

/// 包详情：`pip show` 的原始输出，原样保存
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageDetail {
    pub raw: String,
}

impl PackageDetail {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    /// 按 `Key: value` 拆分各行，仅用于渲染着色，不修改 raw。
    /// 无冒号的续行返回空 key。
    pub fn fields(&self) -> Vec<(&str, &str)> {
        self.raw
            .lines()
            .map(|line| match line.split_once(':') {
                Some((key, value)) if !key.is_empty() && !key.starts_with(' ') => {
                    (key, value.trim_start())
                }
                _ => ("", line),
            })
            .collect()
    }
}
