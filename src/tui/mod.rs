mod console;
pub mod input;
mod layout;
mod packages;
pub mod state;
mod tasks;
mod theme;

use crate::config::Config;
use crate::pip::Pip;
use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Frame, Terminal};
use state::{App, AppEvent, Focus};
use std::io;
use tokio::sync::mpsc;

/// 日志翻页行数
const LOG_PAGE: usize = 10;

pub async fn run(config: Config) -> Result<()> {
    // 终端初始化
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let pip = Pip::from_config(&config);
    let mut app = App::new(config, pip);
    let (tx, mut rx) = mpsc::channel(256);

    app.append_log(format!(
        "使用 {}（安装前检查方式: {}）",
        app.pip.name(),
        app.pip.presence().label()
    ));
    if app.config.refresh_on_start {
        tasks::spawn_refresh_task(&mut app, &tx);
    }

    let result = run_loop(&mut terminal, &mut app, &tx, &mut rx);

    // 结束仍在运行的 pip 子进程
    crate::pip::terminate_running_child();

    // 恢复终端
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    tx: &mpsc::Sender<AppEvent>,
    rx: &mut mpsc::Receiver<AppEvent>,
) -> Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        // 处理按键
        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_key(key, app, tx);
                }
            }
        }

        // 处理后台事件（界面状态只在这里修改）
        while let Ok(event) = rx.try_recv() {
            match event {
                AppEvent::PackagesLoaded { generation, result } => {
                    app.on_packages_loaded(generation, result)
                }
                AppEvent::DetailLoaded { name, result } => app.on_detail_loaded(name, result),
                AppEvent::Operation(event) => {
                    let followup = app.on_operation_event(event);
                    if followup.refresh {
                        tasks::spawn_refresh_task(app, tx);
                    }
                    if let Some(next) = followup.next {
                        tasks::spawn_operation_task(app, tx, next);
                    }
                }
            }
        }

        if app.should_quit {
            if let Some(active) = app.queue.active() {
                log::warn!("退出时仍有操作在进行: {}", active.describe());
            }
            return Ok(());
        }
    }
}

fn handle_key(key: crossterm::event::KeyEvent, app: &mut App, tx: &mpsc::Sender<AppEvent>) {
    // 全局按键
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.should_quit = true;
        }
        KeyCode::Tab => {
            app.focus = match app.focus {
                Focus::Packages => Focus::Input,
                Focus::Input => Focus::Packages,
            };
        }
        KeyCode::PageUp => app.scroll_log_up(LOG_PAGE),
        KeyCode::PageDown => app.scroll_log_down(LOG_PAGE),
        KeyCode::End => app.follow_log(),
        // 委托给当前焦点处理
        _ => {
            let consumed = match app.focus {
                Focus::Packages => packages::handle_packages_key(key, app, tx),
                Focus::Input => console::handle_input_key(key, app, tx),
            };
            if !consumed && app.focus == Focus::Packages {
                match key.code {
                    KeyCode::Char('f') => app.follow_log(),
                    KeyCode::Char('J') => console::scroll_detail(app, true),
                    KeyCode::Char('K') => console::scroll_detail(app, false),
                    _ => {}
                }
            }
        }
    }
}

fn ui(f: &mut Frame, app: &App) {
    let chunks = layout::main_layout(f.area());

    let mut title = format!("lian-pip v{}  ·  {}", env!("CARGO_PKG_VERSION"), app.pip.name());
    if let Some(active) = app.queue.active() {
        title.push_str(&format!(
            "  ·  {} [{}]",
            active.describe(),
            app.queue.phase().label()
        ));
        if app.queue.pending_len() > 0 {
            title.push_str(&format!("  ·  排队 {}", app.queue.pending_len()));
        }
    }
    layout::render_header(f, &title, chunks[0]);

    let (left, right) = layout::body_layout(chunks[1]);
    packages::render_packages(f, app, left);
    console::render_console(f, app, right);

    let footer = if !app.progress.is_empty() {
        app.progress.clone()
    } else {
        match app.focus {
            Focus::Packages => {
                "↑↓ 选择  Enter/d 信息  x 卸载  i 输入包名  r 刷新  PgUp/PgDn 日志  End/f 跟随  J/K 详情  q 退出"
                    .to_string()
            }
            Focus::Input => "Enter 安装  Ctrl+E 行尾  Esc/Tab 返回列表  End 跟随日志  Ctrl+C 退出".to_string(),
        }
    };
    layout::render_footer(f, &footer, chunks[2]);
}
