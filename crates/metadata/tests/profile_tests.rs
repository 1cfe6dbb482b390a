//! Integration tests for the user profile store.

mod common;

use common::run_metadata_test_both;
use herald_core::Contact;
use herald_metadata::{UserProfileRepo, UserProfileRow};
use time::OffsetDateTime;

fn contact(handle: &str, email: Option<&str>) -> Contact {
    Contact {
        handle: handle.to_string(),
        email: email.map(str::to_string),
        display_name: Some(format!("{handle} display")),
    }
}

#[tokio::test]
async fn test_profile_crud() {
    run_metadata_test_both(|store| async move {
        assert!(store.get_user_profile("alice").await.unwrap().is_none());

        let fetched_at = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let row = UserProfileRow::from_contact(&contact("alice", Some("a@example.com")), fetched_at);
        store.put_user_profile(&row).await.unwrap();

        let stored = store.get_user_profile("alice").await.unwrap().expect("profile");
        assert_eq!(stored, row);
        assert_eq!(Contact::from(stored).email(), Some("a@example.com"));

        assert!(store.delete_user_profile("alice").await.unwrap());
        assert!(!store.delete_user_profile("alice").await.unwrap());
        assert!(store.get_user_profile("alice").await.unwrap().is_none());
    })
    .await;
}

#[tokio::test]
async fn test_profile_upsert_replaces_fields() {
    run_metadata_test_both(|store| async move {
        let fetched_at = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        store
            .put_user_profile(&UserProfileRow::from_contact(&contact("bob", None), fetched_at))
            .await
            .unwrap();
        store
            .put_user_profile(&UserProfileRow::from_contact(
                &contact("bob", Some("bob@example.com")),
                fetched_at,
            ))
            .await
            .unwrap();

        let stored = store.get_user_profile("bob").await.unwrap().expect("profile");
        assert_eq!(stored.email.as_deref(), Some("bob@example.com"));
    })
    .await;
}
