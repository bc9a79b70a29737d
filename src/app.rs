use std::path::PathBuf;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use anyhow::Result;
use tokio::task::JoinHandle;

use crate::api::{ProfileClient, UpdatedUser};
use crate::avatar;
use crate::config::Config;
use crate::term::TermPane;
use crate::toast::{self, Toast, ToastKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Profile,
    Terminal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditState {
    Viewing,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    FullName,
    Username,
    Email,
    Bio,
    Avatar,
    Submit,
}

impl FormField {
    pub fn next(self) -> Self {
        match self {
            FormField::FullName => FormField::Username,
            FormField::Username => FormField::Email,
            FormField::Email => FormField::Bio,
            FormField::Bio => FormField::Avatar,
            FormField::Avatar => FormField::Submit,
            FormField::Submit => FormField::FullName,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            FormField::FullName => FormField::Submit,
            FormField::Username => FormField::FullName,
            FormField::Email => FormField::Username,
            FormField::Bio => FormField::Email,
            FormField::Avatar => FormField::Bio,
            FormField::Submit => FormField::Avatar,
        }
    }
}

/// The profile as last confirmed by the server (or config defaults).
#[derive(Debug, Clone, Default)]
pub struct Profile {
    pub full_name: String,
    pub username: String,
    pub email: String,
    pub bio: String,
}

/// In-progress form edits. Thrown away on cancel, promoted to `Profile` on a
/// successful submit.
#[derive(Debug, Clone, Default)]
pub struct Draft {
    pub full_name: String,
    pub username: String,
    pub email: String,
    pub bio: String,
    pub avatar_path: String,
}

impl Draft {
    fn from_profile(profile: &Profile) -> Self {
        Self {
            full_name: profile.full_name.clone(),
            username: profile.username.clone(),
            email: profile.email.clone(),
            bio: profile.bio.clone(),
            avatar_path: String::new(),
        }
    }
}

/// A rendered avatar image slot. The preview slot always follows avatar
/// updates; other slots follow only when their label matches the updated
/// username.
#[derive(Debug, Clone)]
pub struct AvatarImage {
    pub is_preview: bool,
    pub alt: String,
    pub src: String,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub screen: Screen,
    pub edit_state: EditState,

    // Profile form state
    pub profile: Profile,
    pub draft: Draft,
    pub focused_field: FormField,
    pub field_cursor: usize,
    pub form_error: Option<String>,

    // Avatar selection: the validated path goes with the next submit, the
    // generation counter keeps stale preview decodes from clobbering newer
    // ones (last-write-wins).
    pub avatar_selection: Option<PathBuf>,
    pub avatar_generation: u64,
    pub avatar_task: Option<(u64, JoinHandle<Result<String>>)>,
    pub avatar_images: Vec<AvatarImage>,

    // In-flight submission; its presence is the disabled submit control
    pub submit_task: Option<JoinHandle<Result<UpdatedUser>>>,

    // Toast stack
    pub toasts: Vec<Toast>,

    // Animation state
    pub animation_frame: u8,

    // Demo terminal pane
    pub term: TermPane,

    // API
    pub client: ProfileClient,
}

impl App {
    pub fn new() -> Result<Self> {
        let config = Config::load().unwrap_or_else(|_| Config::new());
        Ok(Self::with_config(config))
    }

    pub fn with_config(config: Config) -> Self {
        let client = ProfileClient::new(&config.api_url());

        let profile = Profile {
            full_name: config.full_name.unwrap_or_default(),
            username: config.username.unwrap_or_default(),
            email: config.email.unwrap_or_default(),
            bio: config.bio.unwrap_or_default(),
        };

        let initial_avatar = config.avatar.unwrap_or_default();
        let avatar_images = vec![
            AvatarImage {
                is_preview: true,
                alt: "avatar preview".to_string(),
                src: initial_avatar.clone(),
            },
            AvatarImage {
                is_preview: false,
                alt: profile.username.clone(),
                src: initial_avatar,
            },
        ];

        let draft = Draft::from_profile(&profile);

        Self {
            should_quit: false,
            screen: Screen::Profile,
            edit_state: EditState::Viewing,

            profile,
            draft,
            focused_field: FormField::FullName,
            field_cursor: 0,
            form_error: None,

            avatar_selection: None,
            avatar_generation: 0,
            avatar_task: None,
            avatar_images,

            submit_task: None,

            toasts: Vec::new(),

            animation_frame: 0,

            term: TermPane::new(),

            client,
        }
    }

    // Page heading: "Profile" while viewing, "Edit Profile" while editing.
    pub fn page_title(&self) -> &'static str {
        match self.edit_state {
            EditState::Viewing => "Profile",
            EditState::Editing => "Edit Profile",
        }
    }

    pub fn enter_edit(&mut self) {
        self.edit_state = EditState::Editing;
        self.draft = Draft::from_profile(&self.profile);
        self.focused_field = FormField::FullName;
        self.field_cursor = self.draft.full_name.chars().count();
        self.form_error = None;
    }

    /// Discards unsaved edits and the pending avatar selection; the preview
    /// keeps whatever it last showed.
    pub fn cancel_edit(&mut self) {
        self.edit_state = EditState::Viewing;
        self.draft = Draft::from_profile(&self.profile);
        self.avatar_selection = None;
        self.form_error = None;
    }

    pub fn focus_field(&mut self, field: FormField) {
        self.focused_field = field;
        self.field_cursor = self
            .field_text(field)
            .map(|t| t.chars().count())
            .unwrap_or(0);
    }

    pub fn field_text(&self, field: FormField) -> Option<&String> {
        match field {
            FormField::FullName => Some(&self.draft.full_name),
            FormField::Username => Some(&self.draft.username),
            FormField::Email => Some(&self.draft.email),
            FormField::Bio => Some(&self.draft.bio),
            FormField::Avatar => Some(&self.draft.avatar_path),
            FormField::Submit => None,
        }
    }

    pub fn field_text_mut(&mut self, field: FormField) -> Option<&mut String> {
        match field {
            FormField::FullName => Some(&mut self.draft.full_name),
            FormField::Username => Some(&mut self.draft.username),
            FormField::Email => Some(&mut self.draft.email),
            FormField::Bio => Some(&mut self.draft.bio),
            FormField::Avatar => Some(&mut self.draft.avatar_path),
            FormField::Submit => None,
        }
    }

    /// Live bio character count, purely informational.
    pub fn bio_char_count(&self) -> usize {
        self.draft.bio.chars().count()
    }

    /// Validate the typed avatar path. A rejected file surfaces a blocking
    /// form error and clears the selection entirely; an accepted one bumps
    /// the generation and hands back what the caller should decode.
    pub fn confirm_avatar(&mut self) -> Option<(u64, PathBuf)> {
        if self.draft.avatar_path.is_empty() {
            return None;
        }

        let path = PathBuf::from(&self.draft.avatar_path);
        match avatar::validate_selection(&path) {
            Ok(()) => {
                self.form_error = None;
                self.avatar_generation += 1;
                self.avatar_selection = Some(path.clone());
                Some((self.avatar_generation, path))
            }
            Err(e) => {
                self.form_error = Some(e.to_string());
                self.avatar_selection = None;
                self.draft.avatar_path.clear();
                if self.focused_field == FormField::Avatar {
                    self.field_cursor = 0;
                }
                None
            }
        }
    }

    /// Apply a finished preview decode. Results from superseded selections
    /// are dropped so the latest selection always wins.
    pub fn apply_avatar_decode(&mut self, generation: u64, result: Result<String>) {
        if generation != self.avatar_generation {
            return;
        }
        match result {
            Ok(data_url) => {
                if let Some(preview) = self.avatar_images.iter_mut().find(|i| i.is_preview) {
                    preview.src = data_url;
                }
            }
            Err(e) => self.form_error = Some(e.to_string()),
        }
    }

    pub fn submit_in_flight(&self) -> bool {
        self.submit_task.is_some()
    }

    /// Apply the outcome of a finished submission. The in-flight flag is
    /// already released by the caller taking the task; both branches only
    /// touch UI state, so the submit control can never stay stuck.
    pub fn finish_submit(&mut self, outcome: Result<UpdatedUser>) {
        match outcome {
            Ok(user) => {
                self.push_toast("Update success", ToastKind::Success);

                if let Some(avatar_url) = user.avatar.as_deref() {
                    let username = user.username.clone().unwrap_or_default();
                    self.refresh_avatar_images(avatar_url, &username, now_millis());
                }

                self.profile = Profile {
                    full_name: self.draft.full_name.clone(),
                    username: self.draft.username.clone(),
                    email: self.draft.email.clone(),
                    bio: self.draft.bio.clone(),
                };
                self.avatar_selection = None;
                self.edit_state = EditState::Viewing;
            }
            Err(e) => {
                // Stay in Editing so the user can retry
                self.push_toast(e.to_string(), ToastKind::Error);
            }
        }
    }

    /// Point every matching avatar slot at the new URL with a cache-busting
    /// query parameter.
    pub fn refresh_avatar_images(&mut self, url: &str, username: &str, ts: u128) {
        for img in &mut self.avatar_images {
            if img.is_preview || img.alt == username {
                img.src = format!("{}?v={}", url, ts);
            }
        }
    }

    pub fn push_toast(&mut self, message: impl Into<String>, kind: ToastKind) {
        self.toasts.push(Toast::new(message, kind));
    }

    /// Collect finished background work and fold it into app state. Taking
    /// the submit task out before awaiting it is what re-enables the submit
    /// control, so it is released on every exit path.
    pub async fn reap_tasks(&mut self) {
        if self
            .submit_task
            .as_ref()
            .map(|t| t.is_finished())
            .unwrap_or(false)
        {
            if let Some(task) = self.submit_task.take() {
                let outcome = match task.await {
                    Ok(outcome) => outcome,
                    Err(e) => Err(anyhow::anyhow!("Something went wrong: {}", e)),
                };
                self.finish_submit(outcome);
            }
        }

        if self
            .avatar_task
            .as_ref()
            .map(|(_, t)| t.is_finished())
            .unwrap_or(false)
        {
            if let Some((generation, task)) = self.avatar_task.take() {
                if let Ok(result) = task.await {
                    self.apply_avatar_decode(generation, result);
                }
            }
        }
    }

    /// Periodic tick: expire toasts, advance the submit spinner.
    pub fn tick(&mut self) {
        toast::prune(&mut self.toasts, Instant::now());
        if self.submit_in_flight() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }
}

fn now_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    fn test_app() -> App {
        let config = Config {
            username: Some("bob".to_string()),
            full_name: Some("Bob Jones".to_string()),
            ..Config::new()
        };
        App::with_config(config)
    }

    #[test]
    fn edit_then_cancel_restores_viewing_state() {
        let mut app = test_app();
        assert_eq!(app.edit_state, EditState::Viewing);
        assert_eq!(app.page_title(), "Profile");

        app.enter_edit();
        assert_eq!(app.edit_state, EditState::Editing);
        assert_eq!(app.page_title(), "Edit Profile");

        app.draft.full_name = "Somebody Else".to_string();
        app.cancel_edit();

        assert_eq!(app.edit_state, EditState::Viewing);
        assert_eq!(app.page_title(), "Profile");
        assert_eq!(app.draft.full_name, "Bob Jones");
        assert!(app.avatar_selection.is_none());
    }

    #[test]
    fn oversized_avatar_is_rejected_and_cleared() {
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.png");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(&vec![0u8; (avatar::MAX_AVATAR_BYTES + 1) as usize])
            .unwrap();

        let mut app = test_app();
        app.enter_edit();
        let preview_before = app.avatar_images[0].src.clone();
        app.draft.avatar_path = path.to_string_lossy().into_owned();

        assert!(app.confirm_avatar().is_none());
        assert_eq!(app.form_error.as_deref(), Some("File must be less than 2MB"));
        assert!(app.avatar_selection.is_none());
        assert!(app.draft.avatar_path.is_empty());
        assert_eq!(app.avatar_images[0].src, preview_before);
    }

    #[test]
    fn valid_avatar_bumps_generation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pic.png");
        std::fs::write(&path, b"tiny").unwrap();

        let mut app = test_app();
        app.enter_edit();
        app.draft.avatar_path = path.to_string_lossy().into_owned();

        let (generation, selected) = app.confirm_avatar().unwrap();
        assert_eq!(generation, 1);
        assert_eq!(selected, path);
        assert_eq!(app.avatar_selection.as_deref(), Some(path.as_path()));
        assert!(app.form_error.is_none());
    }

    #[test]
    fn stale_avatar_decode_is_dropped() {
        let mut app = test_app();
        app.avatar_generation = 2;

        app.apply_avatar_decode(1, Ok("data:image/png;base64,OLD".to_string()));
        assert_ne!(app.avatar_images[0].src, "data:image/png;base64,OLD");

        app.apply_avatar_decode(2, Ok("data:image/png;base64,NEW".to_string()));
        assert_eq!(app.avatar_images[0].src, "data:image/png;base64,NEW");
    }

    #[test]
    fn failed_submit_keeps_editing_and_reports_detail() {
        let mut app = test_app();
        app.enter_edit();

        app.finish_submit(Err(anyhow!("Username taken")));

        assert_eq!(app.edit_state, EditState::Editing);
        assert_eq!(app.toasts.len(), 1);
        assert_eq!(app.toasts[0].message, "Username taken");
        assert_eq!(app.toasts[0].kind, ToastKind::Error);
    }

    #[test]
    fn successful_submit_returns_to_viewing_and_updates_avatars() {
        let mut app = test_app();
        app.enter_edit();
        app.draft.full_name = "Robert Jones".to_string();

        app.finish_submit(Ok(UpdatedUser {
            avatar: Some("/a.png".to_string()),
            username: Some("bob".to_string()),
        }));

        assert_eq!(app.edit_state, EditState::Viewing);
        assert_eq!(app.profile.full_name, "Robert Jones");
        assert_eq!(app.toasts[0].message, "Update success");
        assert_eq!(app.toasts[0].kind, ToastKind::Success);

        // Preview slot and the "bob"-labeled slot both got the busted URL
        for img in &app.avatar_images {
            assert!(img.src.starts_with("/a.png?v="), "src = {}", img.src);
        }
    }

    #[test]
    fn avatar_refresh_skips_unrelated_labels() {
        let mut app = test_app();
        app.avatar_images.push(AvatarImage {
            is_preview: false,
            alt: "alice".to_string(),
            src: "/old.png".to_string(),
        });

        app.refresh_avatar_images("/a.png", "bob", 1234);

        assert_eq!(app.avatar_images[0].src, "/a.png?v=1234"); // preview
        assert_eq!(app.avatar_images[1].src, "/a.png?v=1234"); // alt == "bob"
        assert_eq!(app.avatar_images[2].src, "/old.png"); // alt == "alice"
    }

    #[tokio::test]
    async fn reaping_a_failed_submit_releases_the_control() {
        let mut app = test_app();
        app.enter_edit();

        app.submit_task = Some(tokio::spawn(async { Err(anyhow!("Username taken")) }));
        while !app.submit_task.as_ref().is_some_and(|t| t.is_finished()) {
            tokio::task::yield_now().await;
        }

        app.reap_tasks().await;

        assert!(!app.submit_in_flight());
        assert_eq!(app.edit_state, EditState::Editing);
        assert_eq!(app.toasts[0].message, "Username taken");
    }

    #[tokio::test]
    async fn reaping_a_successful_submit_releases_the_control() {
        let mut app = test_app();
        app.enter_edit();

        app.submit_task = Some(tokio::spawn(async { Ok(UpdatedUser::default()) }));
        while !app.submit_task.as_ref().is_some_and(|t| t.is_finished()) {
            tokio::task::yield_now().await;
        }

        app.reap_tasks().await;

        assert!(!app.submit_in_flight());
        assert_eq!(app.edit_state, EditState::Viewing);
        assert_eq!(app.toasts[0].message, "Update success");
    }

    #[test]
    fn bio_count_uses_chars_not_bytes() {
        let mut app = test_app();
        app.draft.bio = "héllo".to_string();
        assert_eq!(app.bio_char_count(), 5);
    }

    #[test]
    fn field_focus_puts_cursor_at_end() {
        let mut app = test_app();
        app.enter_edit();
        app.draft.email = "bob@example.com".to_string();
        app.focus_field(FormField::Email);
        assert_eq!(app.field_cursor, 15);

        app.focus_field(FormField::Submit);
        assert_eq!(app.field_cursor, 0);
    }
}
