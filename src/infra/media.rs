use anyhow::{anyhow, Result};
use url::Url;

use crate::domain::engagement::Comment;
use crate::domain::post::Post;
use crate::domain::user::UserSummary;

/// Turns stored media refs (`uploads/abc.png`) into URLs clients can fetch.
/// Without a base URL refs are returned as stored and no URL is attached.
#[derive(Clone, Debug, Default)]
pub struct MediaUrls {
    base: Option<Url>,
}

impl MediaUrls {
    pub fn new(base: Option<&str>) -> Result<Self> {
        let base = match base {
            Some(raw) => {
                let mut raw = raw.trim().to_string();
                if !raw.ends_with('/') {
                    raw.push('/');
                }
                let url = Url::parse(&raw).map_err(|err| anyhow!("invalid MEDIA_BASE_URL: {}", err))?;
                if url.cannot_be_a_base() {
                    return Err(anyhow!("invalid MEDIA_BASE_URL: not a base URL"));
                }
                Some(url)
            }
            None => None,
        };
        Ok(Self { base })
    }

    pub fn resolve(&self, media_ref: &str) -> Option<String> {
        let base = self.base.as_ref()?;
        if let Ok(absolute) = Url::parse(media_ref) {
            if matches!(absolute.scheme(), "http" | "https") {
                return Some(absolute.to_string());
            }
        }
        base.join(media_ref.trim_start_matches('/'))
            .ok()
            .map(|url| url.to_string())
    }

    pub fn decorate_user(&self, user: &mut UserSummary) {
        user.profile_picture_url = user
            .profile_picture_ref
            .as_deref()
            .and_then(|media_ref| self.resolve(media_ref));
    }

    pub fn decorate_post(&self, post: &mut Post) {
        post.image_url = post
            .image_ref
            .as_deref()
            .and_then(|media_ref| self.resolve(media_ref));
        self.decorate_user(&mut post.author);
    }

    pub fn decorate_comment(&self, comment: &mut Comment) {
        self.decorate_user(&mut comment.author);
    }
}
