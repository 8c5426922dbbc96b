//! Meal hats: named, shareable households
//!
//! A user's own household is keyed by their email. Additional hats are
//! households keyed by `~` plus the name; anyone who knows the name can join
//! one. The
//! hats a user has created or joined are listed under
//! `users/<userKey>/mealHats`.

use crate::household::error::{HouseholdError, HouseholdResult};
use crate::household::key::HouseholdKey;
use crate::storage::TreeStore;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Stored at `K/profile`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HatProfile {
    pub name: String,
    /// Email of the user who created the hat
    pub owner: String,
}

/// One entry of a user's hat list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MealHat {
    pub key: HouseholdKey,
    pub name: String,
}

async fn profile(store: &TreeStore, key: &HouseholdKey) -> HouseholdResult<Option<HatProfile>> {
    Ok(store.get_record(&key.child("profile")?).await?)
}

async fn remember(store: &TreeStore, user: &HouseholdKey, hat: &MealHat) -> HouseholdResult<()> {
    let path = user.user_root()?.child("mealHats")?.child(hat.key.as_str())?;
    store.set_record(&path, hat).await?;
    Ok(())
}

/// The user's own household first, then every hat they created or joined
pub async fn list_hats(
    store: &TreeStore,
    user: &HouseholdKey,
    email: &str,
) -> HouseholdResult<Vec<MealHat>> {
    let mut hats = vec![MealHat {
        key: user.clone(),
        name: email.to_string(),
    }];

    if let Some(Value::Object(map)) = store.get(&user.user_root()?.child("mealHats")?).await {
        let mut joined: Vec<MealHat> = map
            .into_iter()
            .filter_map(|(key, raw)| match serde_json::from_value::<MealHat>(raw) {
                Ok(hat) => Some(hat),
                Err(e) => {
                    tracing::warn!(hat = %key, error = %e, "Skipping malformed hat entry");
                    None
                }
            })
            .filter(|hat| hat.key != *user)
            .collect();
        joined.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        hats.extend(joined);
    }

    Ok(hats)
}

/// Create a hat named `name` owned by `email`
pub async fn create_hat(
    store: &TreeStore,
    user: &HouseholdKey,
    email: &str,
    name: &str,
) -> HouseholdResult<MealHat> {
    let key = HouseholdKey::from_name(name)?;
    if store.get(&key.root()).await.is_some() {
        return Err(HouseholdError::HatExists(key.to_string()));
    }

    let hat = MealHat {
        key: key.clone(),
        name: name.trim().to_string(),
    };
    store
        .set_record(
            &key.child("profile")?,
            &HatProfile {
                name: hat.name.clone(),
                owner: email.to_string(),
            },
        )
        .await?;
    remember(store, user, &hat).await?;

    tracing::info!(hat = %key, owner = %email, "Meal hat created");
    Ok(hat)
}

/// Add an existing hat to the user's list. `shared_name` may be the hat's
/// key or the name it was created with.
pub async fn join_hat(
    store: &TreeStore,
    user: &HouseholdKey,
    shared_name: &str,
) -> HouseholdResult<MealHat> {
    let candidates = [
        HouseholdKey::parse(shared_name).ok(),
        HouseholdKey::from_name(shared_name).ok(),
    ];

    for key in candidates.into_iter().flatten().filter(HouseholdKey::is_hat) {
        if let Some(found) = profile(store, &key).await? {
            let hat = MealHat {
                key,
                name: found.name,
            };
            remember(store, user, &hat).await?;
            tracing::info!(hat = %hat.key, user = %user, "Meal hat joined");
            return Ok(hat);
        }
    }

    Err(HouseholdError::HatNotFound(shared_name.to_string()))
}

/// True if `key` is the user's own household or a hat on their list
pub async fn can_open(store: &TreeStore, user: &HouseholdKey, key: &HouseholdKey) -> HouseholdResult<bool> {
    if key == user {
        return Ok(true);
    }
    let path = user.user_root()?.child("mealHats")?.child(key.as_str())?;
    Ok(store.get(&path).await.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StoreConfig;
    use tempfile::tempdir;

    async fn create_store() -> (TreeStore, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let store = TreeStore::open(StoreConfig::new(dir.path())).await.unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn test_create_list_join() {
        let (store, _dir) = create_store().await;
        let alice = HouseholdKey::from_email("alice@example.com").unwrap();
        let bob = HouseholdKey::from_email("bob@example.com").unwrap();

        let hat = create_hat(&store, &alice, "alice@example.com", "Smith Family")
            .await
            .unwrap();
        assert_eq!(hat.key.as_str(), "~Smith Family");

        let hats = list_hats(&store, &alice, "alice@example.com").await.unwrap();
        assert_eq!(hats.len(), 2);
        assert_eq!(hats[0].key, alice);
        assert_eq!(hats[1], hat);

        assert!(!can_open(&store, &bob, &hat.key).await.unwrap());
        let joined = join_hat(&store, &bob, "Smith Family").await.unwrap();
        assert_eq!(joined, hat);
        assert!(can_open(&store, &bob, &hat.key).await.unwrap());
        assert!(can_open(&store, &bob, &bob).await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_and_unknown_hats() {
        let (store, _dir) = create_store().await;
        let alice = HouseholdKey::from_email("alice@example.com").unwrap();

        create_hat(&store, &alice, "alice@example.com", "cabin").await.unwrap();
        assert!(matches!(
            create_hat(&store, &alice, "alice@example.com", "cabin").await,
            Err(HouseholdError::HatExists(_))
        ));
        assert!(matches!(
            join_hat(&store, &alice, "nowhere").await,
            Err(HouseholdError::HatNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_hat_cannot_claim_a_user_household() {
        let (store, _dir) = create_store().await;
        let mallory = HouseholdKey::from_email("mallory@evil.com").unwrap();
        let bob = HouseholdKey::from_email("bob@example.com").unwrap();
        store
            .set(&bob.child("schemaVersion").unwrap(), serde_json::json!(2))
            .await
            .unwrap();

        let hat = create_hat(&store, &mallory, "mallory@evil.com", "bob@example.com")
            .await
            .unwrap();
        assert_ne!(hat.key, bob);
        assert!(!can_open(&store, &mallory, &bob).await.unwrap());
        assert!(store.get(&bob.child("profile").unwrap()).await.is_none());

        // A plain household key is never joinable, even by its exact key
        assert!(matches!(
            join_hat(&store, &mallory, bob.as_str()).await,
            Err(HouseholdError::HatNotFound(_))
        ));
        assert!(!can_open(&store, &mallory, &bob).await.unwrap());
    }

    #[tokio::test]
    async fn test_create_rejects_key_with_existing_data() {
        let (store, _dir) = create_store().await;
        let alice = HouseholdKey::from_email("alice@example.com").unwrap();
        let key = HouseholdKey::from_name("cabin").unwrap();
        store
            .set(&key.child("meals").unwrap(), serde_json::json!({"m1": {"title": "Stew"}}))
            .await
            .unwrap();

        assert!(matches!(
            create_hat(&store, &alice, "alice@example.com", "cabin").await,
            Err(HouseholdError::HatExists(_))
        ));
    }
}
