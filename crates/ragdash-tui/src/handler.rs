use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use crate::app::{App, ChatView, InputMode, Screen, SettingsField, View};
use crate::input::LineInput;
use crate::tui::AppEvent;

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize => {}
        AppEvent::Tick => app.tick_animation(),
    }
    app.poll_tasks().await;
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    // An open alert swallows the key that dismisses it
    if app.notice.take().is_some() {
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => {
            app.should_quit = true;
            return;
        }
        KeyCode::Tab => {
            app.switch_to(app.screen().next());
            return;
        }
        KeyCode::BackTab => {
            app.switch_to(app.screen().prev());
            return;
        }
        KeyCode::Char(c @ '1'..='5') => {
            let idx = c as usize - '1' as usize;
            app.switch_to(Screen::ALL[idx]);
            return;
        }
        _ => {}
    }

    match app.screen() {
        Screen::Chat => handle_chat_normal(app, key),
        Screen::Analytics => handle_analytics_normal(app, key),
        Screen::Documents => handle_documents_normal(app, key),
        Screen::Settings => handle_settings_normal(app, key),
        Screen::Dashboard => {
            if key.code == KeyCode::Char('r') {
                app.reload();
            }
        }
    }
}

fn handle_chat_normal(app: &mut App, key: KeyEvent) {
    let View::Chat(chat) = &mut app.view else {
        return;
    };

    match key.code {
        KeyCode::Char('i') | KeyCode::Enter => {
            // Input stays disabled while a request is in flight
            if !chat.session.is_pending() {
                app.input_mode = InputMode::Editing;
            }
        }
        KeyCode::Esc => {
            app.cancel_chat();
        }
        KeyCode::Char('j') | KeyCode::Down => scroll_chat(chat, 1),
        KeyCode::Char('k') | KeyCode::Up => scroll_chat(chat, -1),
        KeyCode::PageDown | KeyCode::Char('d') => scroll_chat(chat, 10),
        KeyCode::PageUp | KeyCode::Char('u') => scroll_chat(chat, -10),
        KeyCode::Char('G') | KeyCode::End => chat.follow = true,
        KeyCode::Char('g') | KeyCode::Home => {
            chat.follow = false;
            chat.scroll = 0;
        }
        _ => {}
    }
}

fn scroll_chat(chat: &mut ChatView, delta: i32) {
    let target = (chat.scroll as i32 + delta).clamp(0, chat.max_scroll as i32) as u16;
    chat.scroll = target;
    // Scrolling back to the bottom resumes following new messages
    chat.follow = target >= chat.max_scroll;
}

fn handle_analytics_normal(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Char('r') {
        app.reload();
        return;
    }
    let View::Analytics(analytics) = &mut app.view else {
        return;
    };
    let len = analytics.clusters.ready().map(Vec::len).unwrap_or(0);
    if len == 0 {
        return;
    }

    match key.code {
        KeyCode::Char('j') | KeyCode::Down => {
            let i = analytics.cluster_state.selected().unwrap_or(0);
            analytics.cluster_state.select(Some((i + 1).min(len - 1)));
        }
        KeyCode::Char('k') | KeyCode::Up => {
            let i = analytics.cluster_state.selected().unwrap_or(0);
            analytics.cluster_state.select(Some(i.saturating_sub(1)));
        }
        _ => {}
    }
}

fn handle_documents_normal(app: &mut App, key: KeyEvent) {
    if key.code == KeyCode::Char('r') {
        app.reload();
        return;
    }
    let View::Documents(documents) = &mut app.view else {
        return;
    };
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => documents.scroll = documents.scroll.saturating_add(1),
        KeyCode::Char('k') | KeyCode::Up => documents.scroll = documents.scroll.saturating_sub(1),
        _ => {}
    }
}

fn handle_settings_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('r') => app.reload(),
        KeyCode::Char('s') => {
            app.start_config_update();
        }
        KeyCode::Char('g') => {
            app.start_ingest();
        }
        KeyCode::Char('h') => app.toggle_hyde(),
        _ => {
            let View::Settings(settings) = &mut app.view else {
                return;
            };
            match key.code {
                KeyCode::Char('j') | KeyCode::Down => {
                    settings.selected = (settings.selected + 1).min(SettingsField::ALL.len() - 1);
                }
                KeyCode::Char('k') | KeyCode::Up => {
                    settings.selected = settings.selected.saturating_sub(1);
                }
                KeyCode::Char('i') | KeyCode::Enter => {
                    app.input_mode = InputMode::Editing;
                }
                _ => {}
            }
        }
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match app.screen() {
        Screen::Chat => handle_chat_editing(app, key),
        Screen::Settings => handle_settings_editing(app, key),
        _ => app.input_mode = InputMode::Normal,
    }
}

fn handle_chat_editing(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            if app.submit_chat() {
                app.input_mode = InputMode::Normal;
            }
        }
        _ => {
            let View::Chat(chat) = &mut app.view else {
                return;
            };
            if !chat.session.is_pending() {
                edit_line(&mut chat.input, key);
            }
        }
    }
}

fn handle_settings_editing(app: &mut App, key: KeyEvent) {
    let View::Settings(settings) = &mut app.view else {
        return;
    };
    let field = settings.selected_field();

    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            app.input_mode = InputMode::Normal;
            if field == SettingsField::IngestPath {
                app.start_ingest();
            }
        }
        _ => edit_line(settings.field_mut(field), key),
    }
}

fn edit_line(input: &mut LineInput, key: KeyEvent) {
    match key.code {
        KeyCode::Backspace => input.backspace(),
        KeyCode::Delete => input.delete(),
        KeyCode::Left => input.left(),
        KeyCode::Right => input.right(),
        KeyCode::Home => input.home(),
        KeyCode::End => input.end(),
        KeyCode::Char(c) => input.insert(c),
        _ => {}
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let delta = match mouse.kind {
        MouseEventKind::ScrollDown => 3,
        MouseEventKind::ScrollUp => -3,
        _ => return,
    };

    match &mut app.view {
        View::Chat(chat) => scroll_chat(chat, delta),
        View::Documents(documents) => {
            documents.scroll = (documents.scroll as i32 + delta).max(0) as u16;
        }
        _ => {}
    }
}
