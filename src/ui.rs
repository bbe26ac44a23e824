use crate::about;
use crate::app::BridgeApp;
use crate::session::{EditField, FieldEditor, Mode, SceneListEditor, StatusLine};
use crate::state::LinkState;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;

const BORDER_COLOR: Color = Color::Indexed(36);
const HIGHLIGHT_COLOR: Color = Color::Indexed(202);
const SELECTED_COLOR: Color = Color::Indexed(8);
const SPINNER: [&str; 4] = ["∙∙∙", "●∙∙", "∙●∙", "∙∙●"];

pub const FETCH_ROW_LABEL: &str = "[get scenes from LedFx Api]";

pub fn draw(frame: &mut Frame<'_>, app: &BridgeApp) {
    let header = about::about();
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(header.len() as u16 + 2),
            Constraint::Length(1),
            Constraint::Min(4),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(frame.area());

    let banner = Paragraph::new(
        header
            .into_iter()
            .map(|line| Line::from(Span::styled(line, Style::default().fg(HIGHLIGHT_COLOR))))
            .collect::<Vec<_>>(),
    )
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(BORDER_COLOR)),
    );
    frame.render_widget(banner, rows[0]);

    frame.render_widget(Paragraph::new(receive_line(app)), rows[1]);
    draw_settings(frame, app, rows[2]);
    frame.render_widget(Paragraph::new(status_line(app)), rows[3]);
    frame.render_widget(Paragraph::new(footer_line(app)), rows[4]);
}

fn receive_line(app: &BridgeApp) -> Line<'static> {
    let (spinner, color) = match app.runtime.link() {
        LinkState::Receiving => (SPINNER[app.spinner_tick % SPINNER.len()], Color::Green),
        LinkState::Idle => (SPINNER[0], Color::Red),
    };
    Line::from(vec![
        Span::styled(format!(" {} ", spinner), Style::default().fg(color)),
        Span::raw(format!(
            "{:03} => {}",
            app.runtime.channel_value,
            app.registry.active()
        )),
    ])
}

fn draw_settings(frame: &mut Frame<'_>, app: &BridgeApp, area: Rect) {
    let marker = if !app.store.from_file() {
        " (not saved)"
    } else if app.session.dirty() {
        " (changed)"
    } else {
        ""
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(BORDER_COLOR))
        .title(format!("Settings:{}", marker));

    let lines = match app.session.mode() {
        Mode::EditingSceneList(list) => scene_list_lines(list),
        Mode::Browsing => settings_lines(app, None),
        Mode::EditingField(editor) => settings_lines(app, Some(editor)),
    };
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn settings_lines(app: &BridgeApp, editor: Option<&FieldEditor>) -> Vec<Line<'static>> {
    let selected = app.session.selected();
    EditField::ALL
        .iter()
        .map(|field| {
            let is_selected = *field == selected;
            let label_style = if is_selected {
                Style::default().bg(SELECTED_COLOR)
            } else {
                Style::default()
            };
            let mut spans = vec![Span::styled(format!(" {:<12}", field.label()), label_style)];

            match editor.filter(|e| e.field == *field) {
                Some(editor) => {
                    spans.push(Span::styled(
                        format!("{}_", editor.buffer),
                        Style::default()
                            .fg(HIGHLIGHT_COLOR)
                            .add_modifier(Modifier::BOLD),
                    ));
                    if let Some(error) = &editor.error {
                        spans.push(Span::styled(
                            format!("  {}", error),
                            Style::default().fg(Color::Red),
                        ));
                    }
                }
                None => spans.push(Span::raw(field.display_value(&app.store, &app.registry))),
            }
            Line::from(spans)
        })
        .collect()
}

fn scene_list_lines(list: &SceneListEditor) -> Vec<Line<'static>> {
    let row_style = |row: usize| {
        if row == list.cursor {
            Style::default().bg(SELECTED_COLOR)
        } else {
            Style::default()
        }
    };

    let mut fetch = vec![Span::styled(format!(" {}", FETCH_ROW_LABEL), row_style(0))];
    if list.fetching {
        fetch.push(Span::styled("  fetching...", Style::default().fg(HIGHLIGHT_COLOR)));
    } else if !list.candidates.is_empty() {
        fetch.push(Span::styled(
            format!("  {} available", list.candidates.len()),
            Style::default().fg(HIGHLIGHT_COLOR),
        ));
    }

    let mut lines = vec![Line::from(fetch)];
    lines.extend(list.staged.iter().enumerate().map(|(i, id)| {
        Line::from(Span::styled(format!(" {:03} {}", i + 1, id), row_style(i + 1)))
    }));
    lines
}

fn status_line(app: &BridgeApp) -> Line<'static> {
    match app.session.status() {
        Some(StatusLine::Info(message)) => Line::from(Span::raw(format!(" {}", message))),
        Some(StatusLine::Error(message)) => Line::from(Span::styled(
            format!(" {}", message),
            Style::default().fg(Color::Red),
        )),
        None => Line::default(),
    }
}

fn footer_line(app: &BridgeApp) -> Line<'static> {
    let help = match app.session.mode() {
        Mode::Browsing => "↑/↓ select  Enter edit  q quit",
        Mode::EditingField(_) => "Enter confirm  Esc cancel  ↑/↓ step  Tab clear",
        Mode::EditingSceneList(_) => {
            "↑/↓ move  PgUp/PgDn reorder  Del remove  Enter fetch  Ctrl+S commit  Esc cancel"
        }
    };
    Line::from(Span::styled(
        format!(" {}", help),
        Style::default().fg(BORDER_COLOR),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::EventBridge;
    use crate::config::ConfigStore;
    use crate::ledfx::SceneQueue;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn render(app: &BridgeApp) -> String {
        let mut terminal = Terminal::new(TestBackend::new(90, 20)).unwrap();
        terminal.draw(|f| draw(f, app)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn test_renders_defaults() {
        let store = ConfigStore::with_defaults("config.json");
        let (queue, _rx) = SceneQueue::channel();
        let app = BridgeApp::new(store, EventBridge::new(1), queue);

        let screen = render(&app);
        assert!(screen.contains("000 => OFF"));
        assert!(screen.contains("Settings: (not saved)"));
        assert!(screen.contains("Universe"));
        assert!(screen.contains("0 Scenes"));
    }
}
