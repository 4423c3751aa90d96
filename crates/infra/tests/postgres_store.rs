//! Runs against a real database only when `DATABASE_URL` is set; otherwise
//! every test returns early.

use beacon_auth::store::{CredentialStore, StoreError};
use beacon_auth::{
    NewAssignment, NewPermission, NewRole, NewTenant, NewUserRecord, User, UserChanges,
};
use beacon_core::TenantId;
use beacon_infra::PostgresCredentialStore;
use uuid::Uuid;

async fn store() -> Option<PostgresCredentialStore> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set; skipping");
        return None;
    };
    let store = PostgresCredentialStore::connect(&url).await.unwrap();
    store.migrate().await.unwrap();
    Some(store)
}

/// Unique per run so tests can share one database.
fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::now_v7().simple())
}

async fn user(store: &PostgresCredentialStore, email: &str, home: Option<TenantId>) -> User {
    store
        .insert_user(NewUserRecord {
            name: "Pat".to_string(),
            email: email.to_string(),
            password_hash: "$argon2id$not-a-real-hash".to_string(),
            home_tenant_id: home,
            is_system_admin: false,
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn emails_are_unique_regardless_of_case() {
    let Some(store) = store().await else { return };
    let local = unique("pat");
    let created = user(&store, &format!("{local}@Example.com"), None).await;
    assert_eq!(created.email, format!("{local}@example.com"));

    let found = store
        .find_user_by_email(&format!("{}@EXAMPLE.COM", local.to_uppercase()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, created.id);

    let dup = store
        .insert_user(NewUserRecord {
            name: "Other".to_string(),
            email: format!("{local}@example.com"),
            password_hash: "x".to_string(),
            home_tenant_id: None,
            is_system_admin: false,
        })
        .await
        .unwrap_err();
    assert!(matches!(dup, StoreError::Conflict(_)));
}

#[tokio::test]
async fn one_active_assignment_per_slot_but_regrant_after_revoke() {
    let Some(store) = store().await else { return };
    let tenant = store.create_tenant(NewTenant::new(unique("tenant"))).await.unwrap();
    let role = store.create_role(NewRole::new(unique("role"), None)).await.unwrap();
    let who = user(&store, &format!("{}@example.com", unique("u")), Some(tenant.id)).await;
    let grant = NewAssignment {
        user_id: who.id,
        role_id: role.id,
        tenant_id: Some(tenant.id),
        assigned_by: who.id,
    };

    store.insert_assignment(grant).await.unwrap();
    let err = store.insert_assignment(grant).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));

    // The global slot is separate from the tenant slot.
    store
        .insert_assignment(NewAssignment { tenant_id: None, ..grant })
        .await
        .unwrap();

    let revoked = store
        .deactivate_assignments(who.id, role.id, Some(tenant.id))
        .await
        .unwrap();
    assert_eq!(revoked.len(), 1);
    store.insert_assignment(grant).await.unwrap();

    let history = store.assignments_for_user(who.id).await.unwrap();
    assert_eq!(history.len(), 3);
    assert_eq!(history.iter().filter(|r| r.is_active).count(), 2);
}

#[tokio::test]
async fn granting_a_permission_twice_is_a_no_op() {
    let Some(store) = store().await else { return };
    let role = store.create_role(NewRole::new(unique("role"), None)).await.unwrap();
    let permission = store
        .create_permission(NewPermission::new(unique("res"), "read", None))
        .await
        .unwrap();

    assert!(store.grant_permission(role.id, permission.id).await.unwrap());
    assert!(!store.grant_permission(role.id, permission.id).await.unwrap());
    let linked = store.permissions_for_roles(&[role.id]).await.unwrap();
    assert_eq!(linked.len(), 1);
}

#[tokio::test]
async fn deleting_a_user_keeps_their_assignment_history() {
    let Some(store) = store().await else { return };
    let role = store.create_role(NewRole::new(unique("role"), None)).await.unwrap();
    let who = user(&store, &format!("{}@example.com", unique("u")), None).await;
    store
        .insert_assignment(NewAssignment {
            user_id: who.id,
            role_id: role.id,
            tenant_id: None,
            assigned_by: who.id,
        })
        .await
        .unwrap();

    assert!(store.delete_user(who.id).await.unwrap());
    assert!(!store.delete_user(who.id).await.unwrap());
    assert!(store.get_user(who.id).await.unwrap().is_none());
    assert_eq!(store.assignments_for_user(who.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn updates_and_listing_follow_the_home_tenant() {
    let Some(store) = store().await else { return };
    let t1 = store.create_tenant(NewTenant::new(unique("t1"))).await.unwrap();
    let t2 = store.create_tenant(NewTenant::new(unique("t2"))).await.unwrap();
    let first = user(&store, &format!("{}@example.com", unique("a")), Some(t1.id)).await;
    let second = user(&store, &format!("{}@example.com", unique("b")), Some(t1.id)).await;

    let listed: Vec<_> = store
        .list_users(Some(t1.id))
        .await
        .unwrap()
        .into_iter()
        .map(|u| u.id)
        .collect();
    assert_eq!(listed.len(), 2);
    assert!(listed.contains(&first.id) && listed.contains(&second.id));

    let moved = store
        .update_user(
            second.id,
            UserChanges {
                name: Some("Moved".into()),
                home_tenant_id: Some(t2.id),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(moved.name, "Moved");
    assert_eq!(moved.email, second.email);
    assert_eq!(moved.home_tenant_id, Some(t2.id));
    assert_eq!(store.list_users(Some(t1.id)).await.unwrap().len(), 1);

    let taken = UserChanges { email: Some(first.email.clone()), ..Default::default() };
    let err = store.update_user(second.id, taken).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));

    let nowhere = UserChanges { home_tenant_id: Some(TenantId::new()), ..Default::default() };
    let err = store.update_user(second.id, nowhere).await.unwrap_err();
    assert!(matches!(err, StoreError::NotFound(_)));
}
