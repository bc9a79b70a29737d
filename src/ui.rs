use std::time::Instant;

use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use crate::app::{App, EditState, FormField, Screen};
use crate::term::CANNED_OUTPUT;
use crate::toast::ToastKind;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    match app.screen {
        Screen::Profile => match app.edit_state {
            EditState::Viewing => render_profile_card(app, frame, body_area),
            EditState::Editing => render_edit_form(app, frame, body_area),
        },
        Screen::Terminal => render_terminal(app, frame, body_area),
    }

    render_footer(app, frame, footer_area);

    // Toasts sit on top of everything
    render_toasts(app, frame, area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let heading = match app.screen {
        Screen::Profile => app.page_title(),
        Screen::Terminal => "Terminal",
    };

    let title = Line::from(vec![
        Span::styled(
            format!(" {} ", heading),
            Style::default().fg(Color::Cyan).bold(),
        ),
        Span::raw(" "),
        Span::styled(
            format!("profile-tui v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints: Vec<Span> = match (app.screen, app.edit_state) {
        (Screen::Profile, EditState::Viewing) => vec![
            Span::styled(" e ", key_style),
            Span::styled(" edit ", label_style),
            Span::styled(" t ", key_style),
            Span::styled(" terminal ", label_style),
            Span::styled(" q ", key_style),
            Span::styled(" quit ", label_style),
        ],
        (Screen::Profile, EditState::Editing) => vec![
            Span::styled(" Tab ", key_style),
            Span::styled(" field ", label_style),
            Span::styled(" Enter ", key_style),
            Span::styled(" next/confirm ", label_style),
            Span::styled(" Ctrl-S ", key_style),
            Span::styled(" save ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" cancel ", label_style),
        ],
        (Screen::Terminal, _) => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" run ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" back ", label_style),
        ],
    };

    let footer = Paragraph::new(Line::from(hints));
    frame.render_widget(footer, area);
}

fn render_profile_card(app: &App, frame: &mut Frame, area: Rect) {
    let label = Style::default().fg(Color::DarkGray);

    let card_avatar = app
        .avatar_images
        .iter()
        .find(|i| !i.is_preview)
        .map(|i| i.src.as_str())
        .unwrap_or("");

    let lines = vec![
        Line::default(),
        Line::from(vec![
            Span::styled("  Full name  ", label),
            Span::raw(app.profile.full_name.clone()),
        ]),
        Line::from(vec![
            Span::styled("  Username   ", label),
            Span::raw(app.profile.username.clone()),
        ]),
        Line::from(vec![
            Span::styled("  Email      ", label),
            Span::raw(app.profile.email.clone()),
        ]),
        Line::from(vec![
            Span::styled("  Bio        ", label),
            Span::raw(app.profile.bio.clone()),
        ]),
        Line::from(vec![
            Span::styled("  Avatar     ", label),
            Span::styled(truncated(card_avatar, 60), Style::default().fg(Color::Blue)),
        ]),
    ];

    let card = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title(" Profile "));
    frame.render_widget(card, area);
}

fn render_edit_form(app: &App, frame: &mut Frame, area: Rect) {
    let [form_area, preview_area] =
        Layout::horizontal([Constraint::Percentage(60), Constraint::Percentage(40)]).areas(area);

    let [name_area, user_area, email_area, bio_area, avatar_area, submit_area, error_area, _rest] =
        Layout::vertical([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(1),
            Constraint::Min(0),
        ])
        .areas(form_area);

    render_input(app, frame, name_area, FormField::FullName, "Full name");
    render_input(app, frame, user_area, FormField::Username, "Username");
    render_input(app, frame, email_area, FormField::Email, "Email");

    let bio_title = format!("Bio ({} chars)", app.bio_char_count());
    render_input(app, frame, bio_area, FormField::Bio, &bio_title);
    render_input(
        app,
        frame,
        avatar_area,
        FormField::Avatar,
        "Avatar file (max 2MB, Enter to preview)",
    );

    render_submit_button(app, frame, submit_area);

    if let Some(error) = &app.form_error {
        let line = Paragraph::new(Span::styled(
            format!(" {} ", error),
            Style::default().fg(Color::White).bg(Color::Red),
        ));
        frame.render_widget(line, error_area);
    }

    render_avatar_preview(app, frame, preview_area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect, field: FormField, title: &str) {
    let focused = app.focused_field == field;
    let text = app.field_text(field).cloned().unwrap_or_default();

    let border_style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let line = if focused {
        cursor_line(&text, app.field_cursor)
    } else {
        Line::from(Span::raw(text))
    };

    let input = Paragraph::new(line).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(border_style)
            .title(format!(" {} ", title)),
    );
    frame.render_widget(input, area);
}

/// Split the text at the cursor and render the character under it reversed.
fn cursor_line(text: &str, cursor: usize) -> Line<'static> {
    let byte_pos = text
        .char_indices()
        .nth(cursor)
        .map(|(i, _)| i)
        .unwrap_or(text.len());
    let (before, rest) = text.split_at(byte_pos);

    let mut chars = rest.chars();
    let under = chars.next();
    let after: String = chars.collect();

    let mut spans = vec![Span::raw(before.to_string())];
    match under {
        Some(c) => spans.push(Span::styled(
            c.to_string(),
            Style::default().add_modifier(Modifier::REVERSED),
        )),
        None => spans.push(Span::styled(
            " ",
            Style::default().add_modifier(Modifier::REVERSED),
        )),
    }
    spans.push(Span::raw(after));

    Line::from(spans)
}

fn render_submit_button(app: &App, frame: &mut Frame, area: Rect) {
    let focused = app.focused_field == FormField::Submit;

    let (label, style) = if app.submit_in_flight() {
        let dots = ".".repeat(app.animation_frame as usize + 1);
        (
            format!(" Updating{} ", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::DIM),
        )
    } else {
        (
            " Save Changes ".to_string(),
            Style::default().fg(Color::Black).bg(Color::Cyan).bold(),
        )
    };

    let border_style = if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let button = Paragraph::new(Span::styled(label, style))
        .block(Block::default().borders(Borders::ALL).border_style(border_style));
    frame.render_widget(button, area);
}

fn render_avatar_preview(app: &App, frame: &mut Frame, area: Rect) {
    let preview = app.avatar_images.iter().find(|i| i.is_preview);

    let lines = match preview {
        Some(img) if !img.src.is_empty() => vec![
            Line::default(),
            Line::from(Span::styled(
                format!("  {}", truncated(&img.src, 48)),
                Style::default().fg(Color::Blue),
            )),
            Line::default(),
            Line::from(Span::styled(
                format!("  data URL, {} chars", img.src.chars().count()),
                Style::default().fg(Color::DarkGray),
            )),
        ],
        _ => vec![
            Line::default(),
            Line::from(Span::styled(
                "  no image selected",
                Style::default().fg(Color::DarkGray),
            )),
        ],
    };

    let panel = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title(" Avatar preview "));
    frame.render_widget(panel, area);
}

fn render_terminal(app: &App, frame: &mut Frame, area: Rect) {
    let prompt_style = Style::default().fg(Color::Green).bold();
    let mut lines: Vec<Line> = vec![Line::default()];

    if app.term.output_visible {
        lines.push(Line::from(vec![
            Span::styled(" $ ", prompt_style),
            Span::raw(app.term.last_command.clone()),
        ]));
        for out in CANNED_OUTPUT {
            lines.push(Line::from(Span::raw(format!("   {}", out))));
        }
        lines.push(Line::default());
    }

    // Live input line: typed text, then the caret, then the placeholder
    // only while nothing is typed
    let mut input = vec![
        Span::styled(" $ ", prompt_style),
        Span::raw(app.term.line.clone()),
        Span::styled("█", Style::default().fg(Color::Green)),
    ];
    if app.term.placeholder_visible() {
        input.push(Span::styled(
            " type a command and press Enter",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::DIM),
        ));
    }
    lines.push(Line::from(input));

    let pane = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title(" demo terminal "));
    frame.render_widget(pane, area);
}

fn render_toasts(app: &App, frame: &mut Frame, area: Rect) {
    let now = Instant::now();

    for (idx, toast) in app.toasts.iter().enumerate() {
        let y = area.y + 1 + idx as u16;
        if y >= area.bottom().saturating_sub(1) {
            break;
        }

        let text = format!(" {} ", toast.message);
        let width = (text.chars().count() as u16).min(area.width.saturating_sub(2));
        let x = area.right().saturating_sub(width + 1);
        let rect = Rect::new(x, y, width, 1);

        let mut style = match toast.kind {
            ToastKind::Success => Style::default().bg(Color::Black).fg(Color::White),
            ToastKind::Error => Style::default().bg(Color::Red).fg(Color::White),
        };
        if toast.is_fading(now) {
            style = style.add_modifier(Modifier::DIM);
        }

        frame.render_widget(Clear, rect);
        frame.render_widget(Paragraph::new(text).style(style), rect);
    }
}

fn truncated(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_chars).collect();
        format!("{}…", cut)
    }
}
