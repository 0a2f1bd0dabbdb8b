use super::input::InputBox;
use crate::config::Config;
use crate::pip::{
    InstalledPackages, OperationEvent, OperationPhase, OperationRequest, PackageDetail,
    PackageRecord, Pip, PipError,
};
use std::collections::VecDeque;

// ========== 枚举 ==========

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Focus {
    Packages,
    Input,
}

/// 详情面板内容
#[derive(Debug, Clone, PartialEq)]
pub enum DetailView {
    Empty,
    Package { name: String, detail: PackageDetail },
    Message(String),
}

// ========== 事件 ==========

/// 后台线程送回 UI 线程的事件，只在主循环中处理
#[derive(Debug)]
pub enum AppEvent {
    /// `generation` 为发起刷新时的序号，过期结果直接丢弃
    PackagesLoaded {
        generation: u64,
        result: Result<InstalledPackages, PipError>,
    },
    DetailLoaded {
        name: String,
        result: Result<PackageDetail, PipError>,
    },
    Operation(OperationEvent),
}

// ========== 操作日志 ==========

/// 只追加的操作日志，进程生命周期内不截断
#[derive(Debug, Default)]
pub struct OperationLog {
    lines: Vec<String>,
}

impl OperationLog {
    /// 追加一行；内嵌换行会拆成多行
    pub fn append(&mut self, text: impl Into<String>) {
        let text = text.into();
        if text.contains('\n') {
            self.lines.extend(text.lines().map(str::to_string));
        } else {
            self.lines.push(text);
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

// ========== 操作队列 ==========

/// 提交变更请求的结果
#[derive(Debug, Clone, PartialEq)]
pub enum Submission {
    /// 立即开始
    Started(OperationRequest),
    /// 排队，值为队列中的位置（从 1 开始）
    Queued(usize),
    /// 相同请求正在执行或已在队列中
    Duplicate,
}

/// 同一时刻只运行一个安装/卸载，其余按提交顺序排队
#[derive(Debug)]
pub struct OperationQueue {
    active: Option<OperationRequest>,
    phase: OperationPhase,
    pending: VecDeque<OperationRequest>,
}

impl OperationQueue {
    pub fn new() -> Self {
        Self {
            active: None,
            phase: OperationPhase::Idle,
            pending: VecDeque::new(),
        }
    }

    pub fn submit(&mut self, request: OperationRequest) -> Submission {
        if self.active.as_ref() == Some(&request) || self.pending.contains(&request) {
            return Submission::Duplicate;
        }
        if self.active.is_none() {
            self.active = Some(request.clone());
            self.phase = OperationPhase::Idle;
            Submission::Started(request)
        } else {
            self.pending.push_back(request);
            Submission::Queued(self.pending.len())
        }
    }

    pub fn set_phase(&mut self, phase: OperationPhase) {
        self.phase = phase;
    }

    /// 当前操作已结束，取出下一个要启动的请求
    pub fn finish(&mut self) -> Option<OperationRequest> {
        self.active = self.pending.pop_front();
        self.phase = OperationPhase::Idle;
        self.active.clone()
    }

    pub fn active(&self) -> Option<&OperationRequest> {
        self.active.as_ref()
    }

    pub fn phase(&self) -> OperationPhase {
        self.phase
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// 处理操作事件后需要主循环继续做的事
#[derive(Debug, Default, PartialEq)]
pub struct Followup {
    pub refresh: bool,
    pub next: Option<OperationRequest>,
}

// ========== App ==========

pub struct App {
    pub config: Config,
    pub pip: Pip,
    pub focus: Focus,
    pub packages: Vec<PackageRecord>,
    pub selected: usize,
    pub loading: bool,
    /// 最近一次发起的列表刷新序号
    pub refresh_generation: u64,
    pub input: InputBox,
    pub detail: DetailView,
    pub detail_scroll: usize,
    pub log: OperationLog,
    /// 距离日志末尾的行数，0 表示跟随最新输出
    pub log_offset: usize,
    pub queue: OperationQueue,
    pub progress: String,
    pub should_quit: bool,
}

impl App {
    pub fn new(config: Config, pip: Pip) -> Self {
        Self {
            config,
            pip,
            focus: Focus::Packages,
            packages: Vec::new(),
            selected: 0,
            loading: false,
            refresh_generation: 0,
            input: InputBox::new(),
            detail: DetailView::Empty,
            detail_scroll: 0,
            log: OperationLog::default(),
            log_offset: 0,
            queue: OperationQueue::new(),
            progress: String::new(),
            should_quit: false,
        }
    }

    // ===== UI 接口 =====

    /// 列表中当前选中的包名
    pub fn selected_package(&self) -> Option<&str> {
        self.packages.get(self.selected).map(|p| p.name.as_str())
    }

    /// 输入框中的包名
    pub fn entered_package(&self) -> &str {
        self.input.content()
    }

    pub fn append_log(&mut self, line: impl Into<String>) {
        let before = self.log.len();
        self.log.append(line);
        // 用户往回翻看时保持视图不动
        if self.log_offset > 0 {
            self.log_offset += self.log.len() - before;
        }
    }

    pub fn show_detail(&mut self, detail: DetailView) {
        self.detail = detail;
        self.detail_scroll = 0;
    }

    /// 替换包列表，尽量保持原来选中的包
    pub fn set_packages(&mut self, packages: Vec<PackageRecord>) {
        let previous = self.selected_package().map(str::to_string);
        self.packages = packages;
        self.selected = previous
            .and_then(|name| self.packages.iter().position(|p| p.name == name))
            .unwrap_or(0)
            .min(self.packages.len().saturating_sub(1));
    }

    // ===== 选择与滚动 =====

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.packages.len() {
            self.selected += 1;
        }
    }

    pub fn scroll_log_up(&mut self, lines: usize) {
        self.log_offset = (self.log_offset + lines).min(self.log.len());
    }

    pub fn scroll_log_down(&mut self, lines: usize) {
        self.log_offset = self.log_offset.saturating_sub(lines);
    }

    pub fn follow_log(&mut self) {
        self.log_offset = 0;
    }

    // ===== 事件处理 =====

    /// 开始一次新的列表刷新，返回其序号
    pub fn begin_refresh(&mut self) -> u64 {
        self.refresh_generation += 1;
        self.loading = true;
        self.refresh_generation
    }

    pub fn on_packages_loaded(&mut self, generation: u64, result: Result<InstalledPackages, PipError>) {
        if generation != self.refresh_generation {
            log::debug!(
                "丢弃过期的包列表结果 #{}（最新 #{}）",
                generation,
                self.refresh_generation
            );
            return;
        }
        self.loading = false;
        match result {
            Ok(listed) => {
                log::debug!("已加载 {} 个已安装包", listed.packages.len());
                self.set_packages(listed.packages);
                if let Some(warning) = listed.warning {
                    self.append_log(format!("包列表可能不完整: {}", warning));
                }
            }
            Err(e) => {
                self.set_packages(Vec::new());
                self.append_log(format!("更新包列表时出错: {}", e));
            }
        }
    }

    pub fn on_detail_loaded(&mut self, name: String, result: Result<PackageDetail, PipError>) {
        match result {
            Ok(detail) => self.show_detail(DetailView::Package { name, detail }),
            Err(e) => {
                let msg = if e.is_not_found() {
                    format!("包 '{}' 的信息未找到。", name)
                } else {
                    format!("获取包 '{}' 的信息时出错: {}", name, e)
                };
                self.append_log(msg.clone());
                self.show_detail(DetailView::Message(msg));
            }
        }
    }

    pub fn on_operation_event(&mut self, event: OperationEvent) -> Followup {
        let mut followup = Followup::default();
        match event {
            OperationEvent::Phase(phase) => {
                self.queue.set_phase(phase);
                if phase.is_terminal() {
                    self.progress.clear();
                    followup.next = self.queue.finish();
                }
            }
            OperationEvent::Notice(text) | OperationEvent::Output(text) => self.append_log(text),
            OperationEvent::Progress(text) => self.progress = text,
            OperationEvent::RefreshRequested => followup.refresh = true,
        }
        followup
    }
}
