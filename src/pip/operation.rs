//! 安装 / 卸载操作的状态机
//!
//! ```text
//! Idle -> Checking -> NotEligible
//!                  -> Eligible -> Executing -> Completed
//! Checking / Executing 中的任何启动或 I/O 错误 -> Failed
//! ```
//!
//! `run_operation` 在工作线程中运行，所有结果通过 `emit` 回调送出，
//! 由调用方转发到 UI 线程。

use super::types::StreamLine;
use super::Pip;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Install,
    Uninstall,
}

impl OperationKind {
    pub fn verb(&self) -> &'static str {
        match self {
            OperationKind::Install => "安装",
            OperationKind::Uninstall => "卸载",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRequest {
    pub kind: OperationKind,
    pub name: String,
}

impl OperationRequest {
    pub fn install(name: impl Into<String>) -> Self {
        Self {
            kind: OperationKind::Install,
            name: name.into(),
        }
    }

    pub fn uninstall(name: impl Into<String>) -> Self {
        Self {
            kind: OperationKind::Uninstall,
            name: name.into(),
        }
    }

    pub fn describe(&self) -> String {
        format!("{} {}", self.kind.verb(), self.name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationPhase {
    Idle,
    Checking,
    NotEligible,
    Eligible,
    Executing,
    Completed,
    Failed,
}

impl OperationPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OperationPhase::NotEligible | OperationPhase::Completed | OperationPhase::Failed
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            OperationPhase::Idle => "空闲",
            OperationPhase::Checking => "检查中",
            OperationPhase::NotEligible => "已跳过",
            OperationPhase::Eligible => "已确认",
            OperationPhase::Executing => "执行中",
            OperationPhase::Completed => "已完成",
            OperationPhase::Failed => "失败",
        }
    }
}

/// 工作线程送往 UI 线程的事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationEvent {
    Phase(OperationPhase),
    /// 本程序生成的说明性消息
    Notice(String),
    /// pip 的一行输出
    Output(String),
    /// 进度条刷新，只显示在状态栏
    Progress(String),
    /// 请求刷新已安装包列表
    RefreshRequested,
}

/// 执行一次安装或卸载，返回最终状态
pub fn run_operation(
    pip: &Pip,
    request: &OperationRequest,
    emit: &mut dyn FnMut(OperationEvent),
) -> OperationPhase {
    let name = request.name.as_str();
    let verb = request.kind.verb();

    emit(OperationEvent::Phase(OperationPhase::Checking));
    let eligible = match request.kind {
        OperationKind::Install => pip.is_available(name),
        OperationKind::Uninstall => pip.is_installed(name),
    };
    match eligible {
        Ok(true) => {}
        Ok(false) => {
            let msg = match request.kind {
                OperationKind::Install => format!("包 '{}' 未找到。", name),
                OperationKind::Uninstall => format!("包 '{}' 未安装。", name),
            };
            emit(OperationEvent::Notice(msg));
            emit(OperationEvent::Phase(OperationPhase::NotEligible));
            return OperationPhase::NotEligible;
        }
        Err(e) => {
            log::warn!("run_operation: 检查 {} 失败: {}", name, e);
            return fail(emit, format!("检查包 '{}' 时出错: {}", name, e));
        }
    }

    emit(OperationEvent::Phase(OperationPhase::Eligible));
    emit(OperationEvent::Notice(format!("包 '{}' 已找到，开始{}...", name, verb)));
    emit(OperationEvent::Phase(OperationPhase::Executing));

    let mut sink = |line: StreamLine| match line {
        StreamLine::Stdout(text) => emit(OperationEvent::Output(text)),
        StreamLine::Stderr(text) => emit(OperationEvent::Output(format!("⚠ {}", text))),
        StreamLine::Progress(text) => emit(OperationEvent::Progress(text)),
    };
    let result = match request.kind {
        OperationKind::Install => pip.install_streaming(name, &mut sink),
        OperationKind::Uninstall => pip.uninstall_streaming(name, &mut sink),
    };

    match result {
        Ok(code) => {
            let msg = match code {
                Some(0) => format!("--- {}完成 ---", verb),
                Some(c) => format!("--- {}结束（退出码 {}）---", verb, c),
                None => format!("--- {}结束（进程被信号终止）---", verb),
            };
            emit(OperationEvent::Notice(msg));
            emit(OperationEvent::Phase(OperationPhase::Completed));
            emit(OperationEvent::RefreshRequested);
            OperationPhase::Completed
        }
        Err(e) => {
            log::warn!("run_operation: {} {} 失败: {}", verb, name, e);
            fail(emit, format!("{}失败: {}", verb, e))
        }
    }
}

fn fail(emit: &mut dyn FnMut(OperationEvent), msg: String) -> OperationPhase {
    emit(OperationEvent::Notice(msg));
    emit(OperationEvent::Phase(OperationPhase::Failed));
    OperationPhase::Failed
}
