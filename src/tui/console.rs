//! 右侧面板：包名输入框、详情、操作日志

use super::input::render_input_box;
use super::layout;
use super::state::{App, AppEvent, DetailView, Focus};
use super::tasks;
use super::theme::{BLUE, BRIGHT_WHITE, DIM, PINK, WARN};
use crate::pip::parser::validate_package_name;
use crate::pip::OperationRequest;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    Frame,
};
use tokio::sync::mpsc;

/// 处理输入框焦点下的按键，返回 true 表示已消费该按键
pub fn handle_input_key(key: KeyEvent, app: &mut App, tx: &mpsc::Sender<AppEvent>) -> bool {
    match key.code {
        KeyCode::Esc => {
            app.focus = Focus::Packages;
            true
        }
        KeyCode::Enter => {
            submit_install(app, tx);
            true
        }
        KeyCode::Backspace => {
            app.input.delete_back();
            true
        }
        KeyCode::Delete => {
            app.input.delete_forward();
            true
        }
        KeyCode::Left => {
            app.input.move_left();
            true
        }
        KeyCode::Right => {
            app.input.move_right();
            true
        }
        KeyCode::Home => {
            app.input.move_home();
            true
        }
        // End 是全局的“跟随日志”
        KeyCode::Char('e') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.input.move_end();
            true
        }
        KeyCode::Char(c) => {
            if key.modifiers.contains(KeyModifiers::CONTROL) {
                return false;
            }
            app.input.insert(c);
            true
        }
        _ => false,
    }
}

fn submit_install(app: &mut App, tx: &mpsc::Sender<AppEvent>) {
    let name = match validate_package_name(app.entered_package()) {
        Ok(name) => name.to_string(),
        Err(msg) => {
            app.append_log(format!("{}，请输入要安装的包名。", msg));
            return;
        }
    };
    app.input.clear();
    tasks::submit_operation(app, tx, OperationRequest::install(name));
}

/// 详情面板滚动（Shift+J / Shift+K）
pub fn scroll_detail(app: &mut App, down: bool) {
    let total = match &app.detail {
        DetailView::Package { detail, .. } => detail.raw.lines().count(),
        _ => 0,
    };
    if down {
        app.detail_scroll = (app.detail_scroll + 1).min(total.saturating_sub(1));
    } else {
        app.detail_scroll = app.detail_scroll.saturating_sub(1);
    }
}

pub fn render_console(f: &mut Frame, app: &App, area: Rect) {
    let chunks = layout::console_layout(area);
    render_input_box(
        f,
        &app.input,
        "安装:",
        app.focus == Focus::Input,
        chunks[0],
    );
    render_detail(f, app, chunks[1]);
    render_log(f, app, chunks[2]);
}

fn render_detail(f: &mut Frame, app: &App, area: Rect) {
    let (title, lines) = match &app.detail {
        DetailView::Empty => (
            "包信息".to_string(),
            vec![Line::from(Span::styled(
                "在列表中选择一个包并按 Enter 查看信息",
                Style::default().fg(DIM),
            ))],
        ),
        DetailView::Message(msg) => (
            "包信息".to_string(),
            vec![Line::from(Span::styled(msg.clone(), Style::default().fg(BRIGHT_WHITE)))],
        ),
        DetailView::Package { name, detail } => {
            let lines: Vec<Line> = detail
                .fields()
                .into_iter()
                .map(|(key, value)| {
                    if key.is_empty() {
                        Line::from(Span::styled(value.to_string(), Style::default().fg(Color::White)))
                    } else {
                        Line::from(vec![
                            Span::styled(
                                format!("{}: ", key),
                                Style::default().fg(PINK).add_modifier(Modifier::BOLD),
                            ),
                            Span::styled(value.to_string(), Style::default().fg(Color::White)),
                        ])
                    }
                })
                .collect();
            (format!("包信息 - {}", name), lines)
        }
    };

    let scroll = app
        .detail_scroll
        .min(layout::max_scroll(lines.len(), layout::inner_height(area)));
    layout::render_scrollable_content(f, &title, lines, scroll, Color::Yellow, area);
}

fn render_log(f: &mut Frame, app: &App, area: Rect) {
    if app.log.is_empty() {
        let placeholder = vec![Line::from(Span::styled("暂无操作", Style::default().fg(DIM)))];
        layout::render_scrollable_content(f, "操作日志", placeholder, 0, Color::Green, area);
        return;
    }
    // 预先按面板宽度折行，滚动位置按屏幕行计算
    let width = layout::inner_width(area);
    let lines: Vec<Line> = app
        .log
        .lines()
        .iter()
        .flat_map(|line| {
            let style = if line.starts_with('⚠') {
                Style::default().fg(WARN)
            } else if line.starts_with("==>") || line.starts_with("---") {
                Style::default().fg(BLUE).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::White)
            };
            layout::wrap_rows(line, width)
                .into_iter()
                .map(move |row| Line::from(Span::styled(row, style)))
        })
        .collect();

    let title = if app.log_offset > 0 {
        "操作日志（已暂停跟随，按 f 回到底部）".to_string()
    } else {
        "操作日志".to_string()
    };
    let scroll = layout::tail_scroll(lines.len(), layout::inner_height(area), app.log_offset);
    layout::render_scrollable_content(f, &title, lines, scroll, Color::Green, area);
}
