use ratatui::{
    layout::Rect,
    style::Color,
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

fn keybind(key: &'static str, pad: usize, what: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::raw("  "),
        Span::styled(key, Style::default().fg(Color::Magenta)),
        Span::raw(format!("{:pad$}{what}", "")),
    ])
}

pub fn draw_help(area: Rect, f: &mut Frame, base_url: &str) {
    let p = Paragraph::new(vec![
        Line::from("Keybinds:"),
        keybind("Ctrl-C", 6, "Quit"),
        keybind("Tab", 9, "Switch tabs"),
        keybind("Ctrl-D", 6, "Run demo inference"),
        keybind("F5", 10, "Check backend health"),
        keybind("Ctrl-E", 6, "Export current result as JSON"),
        keybind("Ctrl-Y", 6, "Copy session id to clipboard"),
        Line::from(""),
        Line::from("Upload view:"),
        keybind("drop", 8, "Drag a file onto the terminal to select it"),
        keybind("Enter", 7, "Select the typed path, or analyze the selected file"),
        keybind("Esc", 9, "Clear the path input"),
        Line::from(""),
        Line::from("Review view:"),
        keybind("Enter", 7, "Submit supplementary text"),
        keybind("Esc", 9, "Back to upload (discards the session)"),
        Line::from(""),
        Line::from("Backend:"),
        Line::from(vec![
            Span::raw("  "),
            Span::styled(base_url.to_string(), Style::default().fg(Color::Cyan)),
        ]),
    ])
    .block(Block::default().borders(Borders::ALL).title("Help"));
    f.render_widget(p, area);
}
