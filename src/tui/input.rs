use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

/// 通用文本输入框组件，支持 UTF-8 (中英文)
#[derive(Debug, Clone, Default)]
pub struct InputBox {
    /// 输入内容
    content: String,
    /// 光标位置（按字符计数，非字节）
    cursor: usize,
}

impl InputBox {
    pub fn new() -> Self {
        Self::default()
    }

    /// 在光标处插入字符
    pub fn insert(&mut self, c: char) {
        let byte_pos = self.char_to_byte_pos(self.cursor);
        self.content.insert(byte_pos, c);
        self.cursor += 1;
    }

    /// Backspace: 删除光标前的字符
    pub fn delete_back(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let start = self.char_to_byte_pos(self.cursor);
            let end = self.char_to_byte_pos(self.cursor + 1);
            self.content.drain(start..end);
        }
    }

    /// Delete: 删除光标后的字符
    pub fn delete_forward(&mut self) {
        if self.cursor < self.content.chars().count() {
            let start = self.char_to_byte_pos(self.cursor);
            let end = self.char_to_byte_pos(self.cursor + 1);
            self.content.drain(start..end);
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    /// 光标右移
    pub fn move_right(&mut self) {
        let char_count = self.content.chars().count();
        if self.cursor < char_count {
            self.cursor += 1;
        }
    }

    /// 光标移到行首
    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.content.chars().count();
    }

    pub fn clear(&mut self) {
        self.content.clear();
        self.cursor = 0;
    }

    /// 获取内容
    pub fn content(&self) -> &str {
        &self.content
    }

    /// 获取光标位置
    pub fn cursor_pos(&self) -> usize {
        self.cursor
    }

    /// 字符位置 → 字节位置
    fn char_to_byte_pos(&self, char_pos: usize) -> usize {
        self.content
            .char_indices()
            .nth(char_pos)
            .map(|(i, _)| i)
            .unwrap_or(self.content.len())
    }
}

/// 渲染输入框
pub fn render_input_box(
    f: &mut Frame,
    input: &InputBox,
    label: &str,
    focused: bool,
    area: Rect,
) {
    let border_color = if focused { Color::Yellow } else { Color::DarkGray };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));

    // 构建显示内容：label + 输入文本 + 光标
    let chars: Vec<char> = input.content().chars().collect();
    let cursor_pos = input.cursor_pos().min(chars.len());
    let before: String = chars[..cursor_pos].iter().collect();
    let cursor_char = chars
        .get(cursor_pos)
        .map(|c| c.to_string())
        .unwrap_or_else(|| " ".to_string());
    let after: String = chars.iter().skip(cursor_pos + 1).collect();

    let mut spans = vec![
        Span::styled(
            format!("{label} "),
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(before, Style::default().fg(Color::White)),
    ];

    if focused {
        spans.push(Span::styled(
            cursor_char,
            Style::default()
                .fg(Color::Black)
                .bg(Color::White),
        ));
    } else {
        spans.push(Span::styled(cursor_char, Style::default().fg(Color::White)));
    }

    spans.push(Span::styled(after, Style::default().fg(Color::White)));

    let paragraph = Paragraph::new(Line::from(spans)).block(block);
    f.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(text: &str) -> InputBox {
        let mut input = InputBox::new();
        for c in text.chars() {
            input.insert(c);
        }
        input
    }

    #[test]
    fn editing_is_utf8_safe() {
        let mut input = typed("包requests");
        input.move_home();
        input.delete_forward();
        assert_eq!(input.content(), "requests");

        input.move_end();
        input.insert('库');
        input.delete_back();
        input.delete_back();
        assert_eq!(input.content(), "request");
        assert_eq!(input.cursor_pos(), 7);
    }

    #[test]
    fn insert_in_the_middle() {
        let mut input = typed("nmpy");
        input.move_home();
        input.move_right();
        input.insert('u');
        assert_eq!(input.content(), "numpy");
        assert_eq!(input.cursor_pos(), 2);
    }

    #[test]
    fn cursor_stays_in_bounds() {
        let mut input = typed("ab");
        input.move_right();
        assert_eq!(input.cursor_pos(), 2);
        input.delete_forward();
        assert_eq!(input.content(), "ab");
        input.move_home();
        input.move_left();
        input.delete_back();
        assert_eq!(input.cursor_pos(), 0);
        input.clear();
        assert_eq!(input.content(), "");
    }
}
