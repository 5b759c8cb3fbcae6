mod common;

use std::collections::HashSet;

use common::test_authority;
use mongodb::bson::oid::ObjectId;
use todo_server::db::{UserProfile, UserStore};
use todo_server::error::TodoApiError;

#[actix_web::test]
async fn test_fresh_token_authenticates_its_user() {
    let (authority, _) = test_authority();
    let (alice, alice_token) = authority
        .register("alice@example.com", "secret123")
        .await
        .unwrap();
    let (bob, bob_token) = authority
        .register("bob@example.com", "secret123")
        .await
        .unwrap();

    let auth = authority.authenticate(&alice_token).await.unwrap();
    assert_eq!(auth.user, alice);
    assert_eq!(auth.token, alice_token);

    let auth = authority.authenticate(&bob_token).await.unwrap();
    assert_eq!(auth.user, bob);
}

#[actix_web::test]
async fn test_register_then_revoke_scenario() {
    let (authority, _) = test_authority();
    let (user, t1) = authority
        .register("a@example.com", "secret123")
        .await
        .unwrap();

    let auth = authority.authenticate(&t1).await.unwrap();
    assert_eq!(auth.user.email, "a@example.com");

    authority.remove_token(&user, &t1).await.unwrap();

    let result = authority.authenticate(&t1).await;
    assert!(matches!(result, Err(TodoApiError::Authentication)));
}

#[actix_web::test]
async fn test_revoking_one_token_keeps_the_others() {
    let (authority, _) = test_authority();
    let (user, t1) = authority
        .register("a@example.com", "secret123")
        .await
        .unwrap();
    let t2 = authority.generate_auth_token(&user).await.unwrap();

    assert_ne!(t1, t2);
    assert!(authority.authenticate(&t1).await.is_ok());
    assert!(authority.authenticate(&t2).await.is_ok());

    authority.remove_token(&user, &t1).await.unwrap();

    assert!(authority.authenticate(&t1).await.is_err());
    assert!(authority.authenticate(&t2).await.is_ok());

    authority.remove_token(&user, &t2).await.unwrap();
    assert!(authority.authenticate(&t2).await.is_err());
}

#[actix_web::test]
async fn test_tokens_issued_back_to_back_are_unique() {
    let (authority, store) = test_authority();
    let (user, first) = authority
        .register("a@example.com", "secret123")
        .await
        .unwrap();

    let mut tokens = HashSet::from([first]);
    for _ in 0..10 {
        tokens.insert(authority.generate_auth_token(&user).await.unwrap());
    }
    assert_eq!(tokens.len(), 11);

    let stored = store.find_user_by_id(&user.id).await.unwrap().unwrap();
    assert_eq!(stored.tokens.len(), 11);
}

#[actix_web::test]
async fn test_find_by_credentials() {
    let (authority, _) = test_authority();
    let (user, _) = authority
        .register("a@example.com", "secret123")
        .await
        .unwrap();

    let found = authority
        .find_by_credentials(" a@example.com ", "secret123")
        .await
        .unwrap();
    assert_eq!(found.id, user.id);
}

#[actix_web::test]
async fn test_bad_credentials_fail_identically() {
    let (authority, _) = test_authority();
    authority
        .register("a@example.com", "secret123")
        .await
        .unwrap();

    let wrong_password = authority
        .find_by_credentials("a@example.com", "wrongpass")
        .await
        .unwrap_err();
    let unknown_email = authority
        .find_by_credentials("nouser@example.com", "anything")
        .await
        .unwrap_err();

    assert!(matches!(wrong_password, TodoApiError::Authentication));
    assert!(matches!(unknown_email, TodoApiError::Authentication));
    assert_eq!(wrong_password.to_string(), unknown_email.to_string());
}

#[actix_web::test]
async fn test_tampered_token_is_rejected() {
    let (authority, _) = test_authority();
    let (_, token) = authority
        .register("a@example.com", "secret123")
        .await
        .unwrap();

    for (index, current) in token.char_indices() {
        let replacement = if current == 'A' { 'B' } else { 'A' };
        let mut tampered = token.clone();
        tampered.replace_range(index..index + 1, &replacement.to_string());

        let result = authority.authenticate(&tampered).await;
        assert!(
            matches!(result, Err(TodoApiError::Authentication)),
            "tampering at byte {index} was accepted"
        );
    }
}

#[actix_web::test]
async fn test_login_issues_an_additional_token() {
    let (authority, _) = test_authority();
    let (_, registered) = authority
        .register("a@example.com", "secret123")
        .await
        .unwrap();

    let (profile, logged_in) = authority.login("a@example.com", "secret123").await.unwrap();
    assert_eq!(profile.email, "a@example.com");
    assert_ne!(registered, logged_in);
    assert!(authority.authenticate(&registered).await.is_ok());
    assert!(authority.authenticate(&logged_in).await.is_ok());
}

#[actix_web::test]
async fn test_register_validation() {
    let (authority, store) = test_authority();

    let short_password = authority.register("a@example.com", "123").await;
    assert!(matches!(short_password, Err(TodoApiError::Validation(_))));

    let bad_email = authority.register("not-an-email", "secret123").await;
    assert!(matches!(bad_email, Err(TodoApiError::Validation(_))));

    authority
        .register("a@example.com", "secret123")
        .await
        .unwrap();
    let duplicate = authority.register(" a@example.com", "secret456").await;
    assert!(matches!(duplicate, Err(TodoApiError::Validation(_))));
    assert_eq!(store.user_count(), 1);
}

#[actix_web::test]
async fn test_token_from_other_secret_is_rejected() {
    let (authority, _) = test_authority();
    let (other, _) = {
        let store = todo_server::db::MemoryStore::new();
        let config = todo_server::config::AuthConfig {
            jwt_secret: "abcdefghijabcdefghijabcdefghijab".to_string(),
            bcrypt_cost: 4,
        };
        let authority =
            todo_server::session::SessionAuthority::new(std::sync::Arc::new(store.clone()), &config)
                .unwrap();
        (authority, store)
    };
    let (_, foreign) = other
        .register("a@example.com", "secret123")
        .await
        .unwrap();

    let result = authority.authenticate(&foreign).await;
    assert!(matches!(result, Err(TodoApiError::Authentication)));
}

#[actix_web::test]
async fn test_concurrent_logins_each_store_a_token() {
    let (authority, store) = test_authority();
    let (user, first) = authority
        .register("a@example.com", "secret123")
        .await
        .unwrap();

    let logins = (0..20).map(|_| authority.login("a@example.com", "secret123"));
    let results = futures_util::future::join_all(logins).await;

    let mut tokens = HashSet::from([first]);
    for result in results {
        let (profile, token) = result.unwrap();
        assert_eq!(profile.id, user.id);
        tokens.insert(token);
    }
    assert_eq!(tokens.len(), 21);

    for token in &tokens {
        let auth = authority.authenticate(token).await.unwrap();
        assert_eq!(auth.user.id, user.id);
    }

    let stored = store.find_user_by_id(&user.id).await.unwrap().unwrap();
    assert_eq!(stored.tokens.len(), tokens.len());
}

#[actix_web::test]
async fn test_failed_revocation_keeps_token_valid() {
    let (authority, _) = test_authority();
    let (_, token) = authority
        .register("a@example.com", "secret123")
        .await
        .unwrap();
    let missing = UserProfile {
        id: ObjectId::new(),
        email: "missing@example.com".to_string(),
    };

    let result = authority.remove_token(&missing, &token).await;
    assert!(matches!(result, Err(TodoApiError::Persistence(_))));

    assert!(authority.authenticate(&token).await.is_ok());
}
