//! crates/echo_core/src/accounts.rs
//!
//! Registration and the signed-in landing view.

use tracing::info;

use crate::domain::{Category, CurrentUser, NewUser, User};
use crate::ports::{DatabaseService, PortError, PortResult};
use crate::recommend::{recommend, Feed};

/// Creates a user and, in the same store transaction, the preference record
/// holding the categories picked at sign-up.
///
/// All validation problems are reported together as `PortError::Validation`.
pub async fn register(db: &dyn DatabaseService, new_user: NewUser) -> PortResult<User> {
    let new_user = NewUser {
        username: new_user.username.trim().to_string(),
        email: new_user.email.trim().to_string(),
        display_name: new_user
            .display_name
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty()),
        category_ids: new_user.category_ids,
    };

    let mut errors = Vec::new();
    if new_user.username.is_empty() || new_user.email.is_empty() {
        errors.push("Username and email are required.".to_string());
    }
    if !new_user.username.is_empty() && db.username_taken(&new_user.username).await? {
        errors.push("This username is already taken.".to_string());
    }
    if !new_user.email.is_empty() && db.email_taken(&new_user.email).await? {
        errors.push("This email is already registered.".to_string());
    }
    if !errors.is_empty() {
        return Err(PortError::Validation(errors));
    }

    let user = db.create_user_with_preference(&new_user).await?;
    info!(user_id = %user.id, username = %user.username, "User registered");
    Ok(user)
}

#[derive(Debug, Clone)]
pub struct Dashboard {
    pub name: String,
    pub email: String,
    pub preferred_categories: Vec<Category>,
    pub feed: Feed,
}

pub async fn dashboard(db: &dyn DatabaseService, user: &User) -> PortResult<Dashboard> {
    let current = CurrentUser::Authenticated(user.clone());
    let (preference, feed) =
        futures::try_join!(db.get_preference(user.id), recommend(db, &current))?;

    let preferred_categories = match preference {
        Some(preference) if !preference.category_ids.is_empty() => {
            db.get_categories(&preference.category_ids).await?
        }
        _ => Vec::new(),
    };

    Ok(Dashboard {
        name: user.greeting_name().to_string(),
        email: user.email.clone(),
        preferred_categories,
        feed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryStore;
    use crate::recommend::FeedSource;

    fn sign_up(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            ..NewUser::default()
        }
    }

    #[tokio::test]
    async fn registration_creates_preference_in_the_same_step() {
        let store = InMemoryStore::new();
        let economy = store.add_category("Economy").await.unwrap();

        let user = register(
            &store,
            NewUser {
                category_ids: vec![economy.id, 999],
                ..sign_up("teste", "teste@example.com")
            },
        )
        .await
        .unwrap();

        let preference = store.get_preference(user.id).await.unwrap().unwrap();
        assert_eq!(preference.category_ids, vec![economy.id]);
    }

    #[tokio::test]
    async fn registration_without_categories_still_gets_a_preference() {
        let store = InMemoryStore::new();
        let user = register(&store, sign_up("plain", "plain@example.com"))
            .await
            .unwrap();

        let preference = store.get_preference(user.id).await.unwrap().unwrap();
        assert!(preference.category_ids.is_empty());
    }

    #[tokio::test]
    async fn duplicate_username_and_email_are_both_reported() {
        let store = InMemoryStore::new();
        register(&store, sign_up("Maria", "maria@example.com"))
            .await
            .unwrap();

        let err = register(&store, sign_up("maria", "MARIA@example.com"))
            .await
            .unwrap_err();

        match err {
            PortError::Validation(messages) => assert_eq!(messages.len(), 2),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn missing_fields_are_rejected() {
        let store = InMemoryStore::new();
        let err = register(&store, sign_up("  ", "x@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::Validation(_)));
    }

    #[tokio::test]
    async fn dashboard_lists_preferred_categories_and_feed() {
        let store = InMemoryStore::new();
        let tech = store.add_category("Tech").await.unwrap();
        let user = register(
            &store,
            NewUser {
                display_name: Some("Fialho".to_string()),
                category_ids: vec![tech.id],
                ..sign_up("fialho", "fialho@example.com")
            },
        )
        .await
        .unwrap();
        store
            .publish("chips", Some(tech.id), chrono::Utc::now())
            .await;

        let view = dashboard(&store, &user).await.unwrap();

        assert_eq!(view.name, "Fialho");
        assert_eq!(view.preferred_categories, vec![tech]);
        assert_eq!(view.feed.source, FeedSource::Preferences);
        assert_eq!(view.feed.articles.len(), 1);
    }
}
