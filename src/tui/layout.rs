use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Margin, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap},
    Frame,
};

/// 标准三段式布局：Header(3) + Content(弹性) + Footer(3)
pub fn main_layout(area: Rect) -> Vec<Rect> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(0),
            Constraint::Length(3),
        ])
        .split(area)
        .to_vec()
}

/// 内容区：左侧包列表 (1/3) + 右侧输入/详情/日志 (2/3)
pub fn body_layout(area: Rect) -> (Rect, Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 3), Constraint::Ratio(2, 3)])
        .split(area);
    (chunks[0], chunks[1])
}

/// 右侧：输入框(3) + 详情(40%) + 日志(剩余)
pub fn console_layout(area: Rect) -> Vec<Rect> {
    Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Percentage(40),
            Constraint::Min(0),
        ])
        .split(area)
        .to_vec()
}

/// 渲染通用 header
pub fn render_header(f: &mut Frame, title: &str, area: Rect) {
    let header = Paragraph::new(title)
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Center);
    f.render_widget(header, area);
}

/// 渲染通用 footer
pub fn render_footer(f: &mut Frame, text: &str, area: Rect) {
    let footer = Paragraph::new(format!(" {}", text))
        .style(Style::default().fg(Color::Green))
        .block(Block::default().borders(Borders::ALL))
        .alignment(Alignment::Left);
    f.render_widget(footer, area);
}

/// 渲染带滚动条的内容区域，`scroll_offset` 为首个可见行
pub fn render_scrollable_content(
    f: &mut Frame,
    title: &str,
    lines: Vec<Line<'_>>,
    scroll_offset: usize,
    border_color: Color,
    area: Rect,
) {
    let block = Block::default()
        .title(format!(" {} ", title))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));

    let inner = block.inner(area);
    f.render_widget(block, area);

    // 内部水平边距
    let padded = inner.inner(Margin {
        horizontal: 1,
        vertical: 0,
    });

    let total_lines = lines.len();
    let visible_height = padded.height as usize;
    let actual_scroll = scroll_offset.min(max_scroll(total_lines, visible_height));

    let visible_content: Vec<Line> = lines
        .into_iter()
        .skip(actual_scroll)
        .take(visible_height)
        .collect();

    let paragraph = Paragraph::new(visible_content).wrap(Wrap { trim: false });

    f.render_widget(paragraph, padded);

    // 滚动条
    if total_lines > visible_height {
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("↑"))
            .end_symbol(Some("↓"));

        let mut scrollbar_state = ScrollbarState::new(total_lines).position(actual_scroll);

        f.render_stateful_widget(
            scrollbar,
            area.inner(Margin {
                horizontal: 0,
                vertical: 1,
            }),
            &mut scrollbar_state,
        );
    }
}

/// 可滚动的最大首行位置
pub fn max_scroll(total_lines: usize, visible_height: usize) -> usize {
    total_lines.saturating_sub(visible_height)
}

/// 把“距离末尾的行数”换算成首个可见行
pub fn tail_scroll(total_lines: usize, visible_height: usize, offset_from_end: usize) -> usize {
    max_scroll(total_lines, visible_height).saturating_sub(offset_from_end)
}

/// 面板内部可用列数（去掉左右边框和水平边距）
pub fn inner_width(area: Rect) -> usize {
    area.width.saturating_sub(4) as usize
}

/// 按显示宽度把一行切成若干屏幕行，宽字符算两列
pub fn wrap_rows(text: &str, width: usize) -> Vec<String> {
    if width == 0 || Span::raw(text).width() <= width {
        return vec![text.to_string()];
    }
    let mut rows = Vec::new();
    let mut row = String::new();
    let mut used = 0;
    let mut buf = [0u8; 4];
    for ch in text.chars() {
        let w = Span::raw(&*ch.encode_utf8(&mut buf)).width();
        if used + w > width && !row.is_empty() {
            rows.push(std::mem::take(&mut row));
            used = 0;
        }
        row.push(ch);
        used += w;
    }
    if !row.is_empty() {
        rows.push(row);
    }
    rows
}

/// 面板内部可见行数（去掉上下边框）
pub fn inner_height(area: Rect) -> usize {
    area.height.saturating_sub(2) as usize
}
