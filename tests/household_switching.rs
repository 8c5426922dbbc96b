//! Two sessions sharing a store: switching households, listener cleanup and
//! isolation between households.

use mealhat::auth::{SessionManager, StaticIdentityProvider};
use mealhat::household::{create_hat, join_hat, WorkspaceSettings};
use mealhat::planner::{Collection, Ingredient, Meal};
use mealhat::storage::{StoreConfig, TreeStore};
use std::sync::Arc;
use tempfile::tempdir;

async fn setup() -> (tempfile::TempDir, Arc<TreeStore>, SessionManager) {
    let dir = tempdir().unwrap();
    let store = Arc::new(TreeStore::open(StoreConfig::new(dir.path())).await.unwrap());
    let sessions = SessionManager::new(
        Arc::clone(&store),
        None,
        Arc::new(StaticIdentityProvider),
        WorkspaceSettings::default(),
    );
    (dir, store, sessions)
}

#[tokio::test]
async fn switching_releases_previous_listeners() {
    let (_dir, store, sessions) = setup().await;
    let alice = sessions.login("alice@example.com").await.unwrap();

    let per_household = Collection::ALL.len();
    assert_eq!(alice.workspace.listener_count().await, per_household);
    assert_eq!(store.listener_count(), per_household);

    let hat = create_hat(&store, &alice.user, &alice.email, "Cabin").await.unwrap();
    for _ in 0..3 {
        assert!(alice.switch(&store, hat.key.clone()).await.unwrap());
        assert!(alice.switch(&store, alice.user.clone()).await.unwrap());
    }

    assert_eq!(alice.workspace.listener_count().await, per_household);
    assert_eq!(store.listener_count(), per_household);

    // Re-opening the active household is a no-op
    assert!(!alice.switch(&store, alice.user.clone()).await.unwrap());
    assert_eq!(store.listener_count(), per_household);
}

#[tokio::test]
async fn households_do_not_bleed_into_each_other() {
    let (_dir, store, sessions) = setup().await;
    let alice = sessions.login("alice@example.com").await.unwrap();
    let bob = sessions.login("bob@example.com").await.unwrap();

    alice
        .workspace
        .add_meal(Meal::new("", "Tacos", 7).ingredient(Ingredient::new("tortillas").quantity(8.0)))
        .await
        .unwrap();

    assert_eq!(alice.workspace.meals().await.unwrap().len(), 1);
    assert!(bob.workspace.meals().await.unwrap().is_empty());

    // Bob cannot open Alice's household without joining a hat
    assert!(bob.switch(&store, alice.user.clone()).await.is_err());

    let hat = create_hat(&store, &alice.user, &alice.email, "Shared Kitchen").await.unwrap();
    alice.switch(&store, hat.key.clone()).await.unwrap();
    assert!(alice.workspace.meals().await.unwrap().is_empty());

    join_hat(&store, &bob.user, "Shared Kitchen").await.unwrap();
    bob.switch(&store, hat.key.clone()).await.unwrap();

    bob.workspace
        .add_meal(Meal::new("", "Chili", 10))
        .await
        .unwrap();

    // Alice sees Bob's meal through the store listener
    let mut seen = false;
    for _ in 0..50 {
        let titles: Vec<String> = alice
            .workspace
            .meals()
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.title)
            .collect();
        if titles == vec!["Chili".to_string()] {
            seen = true;
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    assert!(seen, "shared household change was not delivered");

    // Switching back shows only Alice's own meals again
    alice.switch(&store, alice.user.clone()).await.unwrap();
    let titles: Vec<String> = alice
        .workspace
        .meals()
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.title)
        .collect();
    assert_eq!(titles, vec!["Tacos".to_string()]);
}

#[tokio::test]
async fn logout_releases_all_listeners() {
    let (_dir, store, sessions) = setup().await;
    let alice = sessions.login("alice@example.com").await.unwrap();
    let bob = sessions.login("bob@example.com").await.unwrap();

    assert!(sessions.logout(&alice.id).await);
    assert_eq!(alice.workspace.listener_count().await, 0);
    assert!(alice.workspace.household().await.is_none());
    assert_eq!(store.listener_count(), Collection::ALL.len());

    assert!(!sessions.logout(&alice.id).await);
    assert!(sessions.require(Some(&alice.id)).await.is_err());

    sessions.close_all().await;
    assert_eq!(bob.workspace.listener_count().await, 0);
    assert_eq!(store.listener_count(), 0);
    assert_eq!(sessions.count().await, 0);
}

#[tokio::test]
async fn login_reopens_most_recent_household() {
    let (_dir, store, sessions) = setup().await;
    let alice = sessions.login("alice@example.com").await.unwrap();
    let hat = create_hat(&store, &alice.user, &alice.email, "Cabin").await.unwrap();
    alice.switch(&store, hat.key.clone()).await.unwrap();
    sessions.logout(&alice.id).await;

    let again = sessions.login("alice@example.com").await.unwrap();
    assert_eq!(again.workspace.household().await, Some(hat.key));
}
