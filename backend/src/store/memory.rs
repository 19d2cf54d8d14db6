// src/store/memory.rs

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{UserStore, taken};
use crate::{
    config::{ADMIN_PROFILE, DEFAULT_PROFILE},
    error::AppError,
    models::{
        comment::Comment,
        like::Like,
        post::{Page, Post},
        profile::Profile,
        user::{NewUser, User},
    },
};

#[derive(Debug, Default)]
struct Tables {
    profiles: Vec<Profile>,
    users: BTreeMap<i64, User>,
    posts: Vec<Post>,
    likes: Vec<Like>,
    comments: Vec<Comment>,
    /// (user_id, following)
    follows: BTreeSet<(i64, i64)>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn live_users(&self) -> impl Iterator<Item = &User> {
        self.users.values().filter(|u| u.deleted_at.is_none())
    }

    fn clash(&self, nick: &str, email: &str, except: Option<i64>) -> Option<AppError> {
        let mut nick_clash = false;
        let mut email_clash = false;
        for user in self.live_users().filter(|u| Some(u.id) != except) {
            nick_clash |= user.nick == nick;
            email_clash |= user.email == email;
        }

        if nick_clash {
            Some(taken("nick"))
        } else if email_clash {
            Some(taken("email"))
        } else {
            None
        }
    }

    fn live_post(&self, post_id: i64) -> bool {
        self.posts
            .iter()
            .any(|p| p.id == post_id && p.deleted_at.is_none())
    }
}

/// In-process [`UserStore`] seeded with the `admin` and `user` profiles.
///
/// Backs the integration tests and local runs without a database. The
/// `add_*` helpers stand in for the post/follow features served elsewhere.
#[derive(Debug)]
pub struct MemoryUserStore {
    tables: RwLock<Tables>,
}

impl Default for MemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryUserStore {
    pub fn new() -> Self {
        let tables = Tables {
            profiles: vec![
                Profile {
                    id: 1,
                    profile: ADMIN_PROFILE.to_string(),
                },
                Profile {
                    id: 2,
                    profile: DEFAULT_PROFILE.to_string(),
                },
            ],
            ..Default::default()
        };
        Self {
            tables: RwLock::new(tables),
        }
    }

    /// Adds a post with an explicit creation time.
    pub async fn add_post_at(&self, user_id: i64, content: &str, at: DateTime<Utc>) -> Post {
        let mut tables = self.tables.write().await;
        let post = Post {
            id: tables.next_id(),
            user_id,
            content: content.to_string(),
            created_at: at,
            updated_at: at,
            deleted_at: None,
        };
        tables.posts.push(post.clone());
        post
    }

    pub async fn add_post(&self, user_id: i64, content: &str) -> Post {
        self.add_post_at(user_id, content, Utc::now()).await
    }

    /// Records that `user_id` follows `following`.
    pub async fn add_follow(&self, user_id: i64, following: i64) {
        self.tables.write().await.follows.insert((user_id, following));
    }

    pub async fn add_like(&self, user_id: i64, post_id: i64) -> Like {
        let mut tables = self.tables.write().await;
        let like = Like {
            id: tables.next_id(),
            user_id,
            post_id,
            created_at: Utc::now(),
        };
        tables.likes.push(like.clone());
        like
    }

    pub async fn add_comment(&self, user_id: i64, post_id: i64, content: &str) -> Comment {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let comment = Comment {
            id: tables.next_id(),
            post_id,
            user_id,
            content: content.to_string(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        tables.comments.push(comment.clone());
        comment
    }

    /// Reads a user row regardless of its soft-delete marker.
    pub async fn raw_user(&self, id: i64) -> Option<User> {
        self.tables.read().await.users.get(&id).cloned()
    }
}

fn newest_first<T>(items: &mut [T], key: impl Fn(&T) -> (DateTime<Utc>, i64)) {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn profile(&self, id: i64) -> Result<Option<Profile>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.profiles.iter().find(|p| p.id == id).cloned())
    }

    async fn profile_by_name(&self, name: &str) -> Result<Option<Profile>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.profiles.iter().find(|p| p.profile == name).cloned())
    }

    async fn create_user(&self, new: NewUser) -> Result<User, AppError> {
        let mut tables = self.tables.write().await;
        if let Some(err) = tables.clash(&new.nick, &new.email, None) {
            return Err(err);
        }

        let now = Utc::now();
        let user = User {
            id: tables.next_id(),
            profile_id: new.profile_id,
            nick: new.nick,
            name: new.name,
            email: new.email,
            password: new.password,
            description: new.description,
            image: None,
            mime: None,
            enabled: new.enabled,
            verified: new.verified,
            verification_email_token: new.verification_email_token,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: i64) -> Result<Option<User>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.live_users().find(|u| u.id == id).cloned())
    }

    async fn find_by_login(&self, login: &str) -> Result<Option<User>, AppError> {
        let tables = self.tables.read().await;
        let by_nick = tables.live_users().find(|u| u.nick == login);
        Ok(by_nick
            .or_else(|| tables.live_users().find(|u| u.email == login))
            .cloned())
    }

    async fn find_by_verification_token(&self, token: &str) -> Result<Option<User>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .live_users()
            .find(|u| u.verification_email_token.as_deref() == Some(token))
            .cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.live_users().cloned().collect())
    }

    async fn nick_taken(&self, nick: &str, except: Option<i64>) -> Result<bool, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .live_users()
            .any(|u| u.nick == nick && Some(u.id) != except))
    }

    async fn email_taken(&self, email: &str, except: Option<i64>) -> Result<bool, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .live_users()
            .any(|u| u.email == email && Some(u.id) != except))
    }

    async fn save_user(&self, user: &User) -> Result<User, AppError> {
        let mut tables = self.tables.write().await;
        if let Some(err) = tables.clash(&user.nick, &user.email, Some(user.id)) {
            return Err(err);
        }

        let stored = tables
            .users
            .get_mut(&user.id)
            .filter(|u| u.deleted_at.is_none())
            .ok_or(AppError::NotFound("User not found".to_string()))?;

        let created_at = stored.created_at;
        *stored = User {
            created_at,
            updated_at: Utc::now(),
            deleted_at: None,
            ..user.clone()
        };
        Ok(stored.clone())
    }

    async fn soft_delete_user(&self, id: i64) -> Result<Option<User>, AppError> {
        let mut tables = self.tables.write().await;
        let Some(user) = tables.users.get_mut(&id).filter(|u| u.deleted_at.is_none()) else {
            return Ok(None);
        };
        user.deleted_at = Some(Utc::now());
        Ok(Some(user.clone()))
    }

    async fn posts_by_user(&self, user_id: i64, page: Option<Page>) -> Result<Vec<Post>, AppError> {
        let tables = self.tables.read().await;
        let mut posts: Vec<Post> = tables
            .posts
            .iter()
            .filter(|p| p.user_id == user_id && p.deleted_at.is_none())
            .cloned()
            .collect();
        newest_first(&mut posts, |p| (p.created_at, p.id));

        Ok(match page {
            Some(page) => posts
                .into_iter()
                .skip(page.offset as usize)
                .take(page.limit as usize)
                .collect(),
            None => posts,
        })
    }

    async fn followers(&self, user_id: i64) -> Result<Vec<User>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .live_users()
            .filter(|u| tables.follows.contains(&(u.id, user_id)))
            .cloned()
            .collect())
    }

    async fn following(&self, user_id: i64) -> Result<Vec<User>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .live_users()
            .filter(|u| tables.follows.contains(&(user_id, u.id)))
            .cloned()
            .collect())
    }

    async fn likes_by_user(&self, user_id: i64) -> Result<Vec<Like>, AppError> {
        let tables = self.tables.read().await;
        let mut likes: Vec<Like> = tables
            .likes
            .iter()
            .filter(|l| l.user_id == user_id && tables.live_post(l.post_id))
            .cloned()
            .collect();
        newest_first(&mut likes, |l| (l.created_at, l.id));
        Ok(likes)
    }

    async fn comments_by_user(&self, user_id: i64) -> Result<Vec<Comment>, AppError> {
        let tables = self.tables.read().await;
        let mut comments: Vec<Comment> = tables
            .comments
            .iter()
            .filter(|c| c.user_id == user_id && c.deleted_at.is_none())
            .cloned()
            .collect();
        newest_first(&mut comments, |c| (c.created_at, c.id));
        Ok(comments)
    }
}
