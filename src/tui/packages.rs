//! 左侧已安装包列表

use super::state::{App, AppEvent, Focus};
use super::tasks;
use super::theme::{BLUE, BRIGHT_WHITE, DIM, PINK, SEL_BG};
use crate::pip::OperationRequest;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState},
    Frame,
};
use tokio::sync::mpsc;

/// 处理列表焦点下的按键，返回 true 表示已消费该按键
pub fn handle_packages_key(key: KeyEvent, app: &mut App, tx: &mpsc::Sender<AppEvent>) -> bool {
    match key.code {
        KeyCode::Char('q') => {
            app.should_quit = true;
            true
        }
        KeyCode::Up | KeyCode::Char('k') => {
            app.select_prev();
            true
        }
        KeyCode::Down | KeyCode::Char('j') => {
            app.select_next();
            true
        }
        KeyCode::Home => {
            app.selected = 0;
            true
        }
        KeyCode::Char('G') => {
            app.selected = app.packages.len().saturating_sub(1);
            true
        }
        KeyCode::Enter | KeyCode::Char('d') => {
            match app.selected_package().map(str::to_string) {
                Some(name) => tasks::spawn_describe_task(app, tx, name),
                None => app.append_log("请先在列表中选择一个包以查看信息。"),
            }
            true
        }
        KeyCode::Char('x') => {
            match app.selected_package().map(str::to_string) {
                Some(name) => tasks::submit_operation(app, tx, OperationRequest::uninstall(name)),
                None => app.append_log("请先在列表中选择要卸载的包。"),
            }
            true
        }
        KeyCode::Char('r') => {
            tasks::spawn_refresh_task(app, tx);
            true
        }
        KeyCode::Char('i') | KeyCode::Char('/') => {
            app.focus = Focus::Input;
            true
        }
        _ => false,
    }
}

/// 渲染已安装包列表
pub fn render_packages(f: &mut Frame, app: &App, area: Rect) {
    let focused = app.focus == Focus::Packages;
    let title = if app.loading {
        " 已安装的包（加载中...） ".to_string()
    } else {
        format!(" 已安装的包 ({}) ", app.packages.len())
    };

    let block = Block::default()
        .title(Span::styled(
            title,
            Style::default().fg(PINK).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if focused { Color::Yellow } else { Color::DarkGray }));

    if app.packages.is_empty() {
        let hint = if app.loading { "正在读取..." } else { "没有已安装的包，按 r 刷新" };
        let paragraph = ratatui::widgets::Paragraph::new(Line::from(Span::styled(
            hint,
            Style::default().fg(DIM),
        )))
        .block(block);
        f.render_widget(paragraph, area);
        return;
    }

    let items: Vec<ListItem> = app
        .packages
        .iter()
        .map(|pkg| ListItem::new(Line::from(Span::styled(pkg.name.clone(), Style::default().fg(BLUE)))))
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(SEL_BG)
                .fg(BRIGHT_WHITE)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▸ ");

    let mut state = ListState::default().with_selected(Some(app.selected));
    f.render_stateful_widget(list, area, &mut state);
}
