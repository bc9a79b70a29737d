use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::api::{AvatarUpload, ProfileUpdate};
use crate::app::{App, EditState, FormField, Screen};
use crate::avatar;
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick(),
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global quit, works everywhere
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match app.screen {
        Screen::Profile => handle_profile_key(app, key),
        Screen::Terminal => handle_terminal_key(app, key),
    }
}

fn handle_profile_key(app: &mut App, key: KeyEvent) {
    match app.edit_state {
        EditState::Viewing => handle_viewing(app, key),
        EditState::Editing => handle_editing(app, key),
    }
}

fn handle_viewing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('e') | KeyCode::Enter => app.enter_edit(),
        KeyCode::Char('t') => app.screen = Screen::Terminal,
        _ => {}
    }
}

fn handle_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.cancel_edit(),

        // Submit from anywhere in the form
        KeyCode::Char('s') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            start_submit(app);
        }

        KeyCode::Tab | KeyCode::Down => {
            app.focus_field(app.focused_field.next());
        }
        KeyCode::BackTab | KeyCode::Up => {
            app.focus_field(app.focused_field.prev());
        }

        KeyCode::Enter => match app.focused_field {
            FormField::Submit => start_submit(app),
            FormField::Avatar => select_avatar(app),
            field => app.focus_field(field.next()),
        },

        KeyCode::Backspace => {
            let cursor = app.field_cursor;
            if cursor > 0 {
                if let Some(text) = app.field_text_mut(app.focused_field) {
                    let byte_pos = char_to_byte_index(text, cursor - 1);
                    text.remove(byte_pos);
                    app.field_cursor = cursor - 1;
                }
            }
        }
        KeyCode::Delete => {
            let cursor = app.field_cursor;
            if let Some(text) = app.field_text_mut(app.focused_field) {
                if cursor < text.chars().count() {
                    let byte_pos = char_to_byte_index(text, cursor);
                    text.remove(byte_pos);
                }
            }
        }
        KeyCode::Left => {
            app.field_cursor = app.field_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app
                .field_text(app.focused_field)
                .map(|t| t.chars().count())
                .unwrap_or(0);
            app.field_cursor = (app.field_cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.field_cursor = 0;
        }
        KeyCode::End => {
            app.field_cursor = app
                .field_text(app.focused_field)
                .map(|t| t.chars().count())
                .unwrap_or(0);
        }
        KeyCode::Char(c) => {
            if key.modifiers.contains(KeyModifiers::CONTROL) {
                return;
            }
            let cursor = app.field_cursor;
            if let Some(text) = app.field_text_mut(app.focused_field) {
                let byte_pos = char_to_byte_index(text, cursor);
                text.insert(byte_pos, c);
                app.field_cursor = cursor + 1;
            }
        }
        _ => {}
    }
}

/// While the terminal pane is showing, every key lands in its line input; the
/// only way out is Esc. Non-character keys fall through untouched.
fn handle_terminal_key(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.screen = Screen::Profile,
        KeyCode::Backspace => app.term.backspace(),
        KeyCode::Enter => app.term.submit(),
        KeyCode::Char(c) => {
            if key.modifiers.contains(KeyModifiers::CONTROL) {
                return;
            }
            app.term.type_char(c);
        }
        _ => {}
    }
}

/// Validate the typed avatar path and, if it passes, kick off the background
/// decode that feeds the preview. Replacing a still-running decode is fine:
/// the generation check in `apply_avatar_decode` drops the stale result.
fn select_avatar(app: &mut App) {
    if let Some((generation, path)) = app.confirm_avatar() {
        let task = tokio::spawn(async move { avatar::read_data_url(&path).await });
        app.avatar_task = Some((generation, task));
    }
}

/// Spawn the profile submission. At most one can be in flight; its presence
/// keeps the submit control disabled until `finish_submit` runs.
fn start_submit(app: &mut App) {
    if app.submit_in_flight() {
        return;
    }

    let client = app.client.clone();
    let draft = app.draft.clone();
    let avatar_path = app.avatar_selection.clone();

    app.submit_task = Some(tokio::spawn(async move {
        let avatar = match avatar_path {
            Some(path) => {
                let bytes = tokio::fs::read(&path).await?;
                let file_name = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("avatar")
                    .to_string();
                Some(AvatarUpload { file_name, bytes })
            }
            None => None,
        };

        client
            .update_profile(ProfileUpdate {
                full_name: draft.full_name,
                username: draft.username,
                email: draft.email,
                bio: draft.bio,
                avatar,
            })
            .await
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn test_app() -> App {
        App::with_config(Config::new())
    }

    #[test]
    fn ctrl_c_quits_from_any_screen() {
        let mut app = test_app();
        app.screen = Screen::Terminal;
        handle_key(
            &mut app,
            KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL),
        );
        assert!(app.should_quit);
    }

    #[test]
    fn terminal_ignores_non_character_keys() {
        let mut app = test_app();
        app.screen = Screen::Terminal;
        app.term.type_char('l');
        app.term.submit();

        for code in [KeyCode::F(5), KeyCode::Up, KeyCode::Left, KeyCode::PageDown] {
            handle_key(&mut app, key(code));
        }

        assert!(app.term.line.is_empty());
        assert!(app.term.output_visible);
    }

    #[test]
    fn terminal_keys_drive_the_line_buffer() {
        let mut app = test_app();
        app.screen = Screen::Terminal;

        for c in ['l', 's'] {
            handle_key(&mut app, key(KeyCode::Char(c)));
        }
        handle_key(&mut app, key(KeyCode::Backspace));
        handle_key(&mut app, key(KeyCode::Char('s')));
        handle_key(&mut app, key(KeyCode::Enter));

        assert_eq!(app.term.last_command, "ls");
        assert!(app.term.output_visible);
    }

    #[test]
    fn esc_leaves_the_terminal_without_touching_the_buffer() {
        let mut app = test_app();
        app.screen = Screen::Terminal;
        handle_key(&mut app, key(KeyCode::Char('x')));
        handle_key(&mut app, key(KeyCode::Esc));

        assert_eq!(app.screen, Screen::Profile);
        assert_eq!(app.term.line, "x");
    }

    #[test]
    fn editing_inserts_at_cursor_utf8_safely() {
        let mut app = test_app();
        app.enter_edit();
        app.focus_field(FormField::FullName);

        for c in ['é', 'b'] {
            handle_key(&mut app, key(KeyCode::Char(c)));
        }
        handle_key(&mut app, key(KeyCode::Left));
        handle_key(&mut app, key(KeyCode::Char('a')));

        assert_eq!(app.draft.full_name, "éab");
        assert_eq!(app.field_cursor, 2);
    }

    #[test]
    fn tab_cycles_form_fields() {
        let mut app = test_app();
        app.enter_edit();
        assert_eq!(app.focused_field, FormField::FullName);

        handle_key(&mut app, key(KeyCode::Tab));
        assert_eq!(app.focused_field, FormField::Username);

        handle_key(&mut app, key(KeyCode::BackTab));
        assert_eq!(app.focused_field, FormField::FullName);
    }

    #[test]
    fn esc_cancels_editing() {
        let mut app = test_app();
        app.enter_edit();
        handle_key(&mut app, key(KeyCode::Char('x')));
        handle_key(&mut app, key(KeyCode::Esc));

        assert_eq!(app.edit_state, EditState::Viewing);
        assert_eq!(app.draft.full_name, "");
    }

    #[tokio::test]
    async fn submit_is_rejected_while_in_flight() {
        use crate::api::UpdatedUser;

        let mut app = test_app();
        app.enter_edit();
        app.focus_field(FormField::Submit);

        // Plant a sentinel in-flight task; Enter must not replace it
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        app.submit_task = Some(tokio::spawn(async move {
            rx.await.ok();
            Ok(UpdatedUser {
                avatar: None,
                username: Some("sentinel".to_string()),
            })
        }));

        handle_key(&mut app, key(KeyCode::Enter));
        assert!(app.submit_in_flight());
        tx.send(()).ok();

        let user = app.submit_task.take().unwrap().await.unwrap().unwrap();
        assert_eq!(user.username.as_deref(), Some("sentinel"));
    }
}
