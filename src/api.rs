use anyhow::{anyhow, Result};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;

/// Draft of the profile form, as it goes over the wire.
#[derive(Debug, Clone)]
pub struct ProfileUpdate {
    pub full_name: String,
    pub username: String,
    pub email: String,
    pub bio: String,
    pub avatar: Option<AvatarUpload>,
}

#[derive(Debug, Clone)]
pub struct AvatarUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Success body: `{ "user": { "avatar": ..., "username": ... } }`.
/// Every field is optional; the server is free to omit any of them.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdatedUser {
    pub avatar: Option<String>,
    pub username: Option<String>,
}

#[derive(Deserialize)]
struct UpdateResponse {
    user: Option<UpdatedUser>,
}

/// Failure body: `{ "detail": "..." }`, used verbatim when present.
#[derive(Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ProfileClient {
    client: Client,
    base_url: String,
}

impl ProfileClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Submit the profile form as multipart. Non-2xx responses become an
    /// error carrying the server's `detail` text when it sent one.
    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<UpdatedUser> {
        let url = format!("{}/api/v1/update-profile", self.base_url);

        let mut form = Form::new()
            .text("full_name", update.full_name)
            .text("username", update.username)
            .text("email", update.email)
            .text("bio", update.bio);

        if let Some(avatar) = update.avatar {
            form = form.part("avatar", Part::bytes(avatar.bytes).file_name(avatar.file_name));
        }

        let response = self.client.post(&url).multipart(form).send().await?;

        if !response.status().is_success() {
            let detail = response
                .json::<ErrorBody>()
                .await
                .ok()
                .and_then(|body| body.detail)
                .unwrap_or_else(|| "Profile update failed".to_string());
            return Err(anyhow!(detail));
        }

        let body: UpdateResponse = response.json().await?;
        Ok(body.user.unwrap_or_default())
    }
}
