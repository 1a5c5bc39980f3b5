mod common;

mod verification_flow {
    use crate::common::*;
    use fleetgate::app::{
        db,
        domain::{Email, Role},
        error::AppError,
        provisioning::RetryPolicy,
        verification::{self, PendingAccount},
    };
    use time::Duration;

    fn pending() -> PendingAccount {
        PendingAccount {
            display_name: "Bob".to_string(),
            password_hash: None,
        }
    }

    fn bob() -> Email {
        Email::new("bob@acme.com").unwrap()
    }

    async fn users_with_email(pool: &sqlx::SqlitePool, email: &str) -> i64 {
        sqlx::query_scalar("SELECT count(*) FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn resend_invalidates_the_old_token() {
        let pool = test_pool().await;
        let t1 = verification::issue_verification(&pool, &bob(), &pending(), Duration::hours(24))
            .await
            .unwrap();
        let t2 = verification::resend_verification(&pool, &bob(), Duration::hours(24))
            .await
            .unwrap();
        assert_ne!(t1.token, t2.token);

        let err = verification::consume_verification(&pool, &t1.token, Duration::days(30), RetryPolicy::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(ref r) if r == "invalid_or_expired"));

        let consumed = verification::consume_verification(&pool, &t2.token, Duration::days(30), RetryPolicy::default())
            .await
            .unwrap();
        assert!(consumed.account.created);
        assert_eq!(users_with_email(&pool, "bob@acme.com").await, 1);
    }

    #[tokio::test]
    async fn reissue_supersedes_older_tokens() {
        let pool = test_pool().await;
        let t1 = verification::issue_verification(&pool, &bob(), &pending(), Duration::hours(24))
            .await
            .unwrap();
        let t2 = verification::issue_verification(&pool, &bob(), &pending(), Duration::hours(24))
            .await
            .unwrap();

        let err = verification::consume_verification(&pool, &t1.token, Duration::days(30), RetryPolicy::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(ref r) if r == "invalid_or_expired"));

        verification::consume_verification(&pool, &t2.token, Duration::days(30), RetryPolicy::default())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn token_is_consumed_at_most_once() {
        let pool = test_pool().await;
        let issued = verification::issue_verification(&pool, &bob(), &pending(), Duration::hours(24))
            .await
            .unwrap();

        verification::consume_verification(&pool, &issued.token, Duration::days(30), RetryPolicy::default())
            .await
            .unwrap();
        let err = verification::consume_verification(&pool, &issued.token, Duration::days(30), RetryPolicy::default())
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::NotFound(ref r) if r == "invalid_or_expired"));
        assert_eq!(users_with_email(&pool, "bob@acme.com").await, 1);
    }

    #[tokio::test]
    async fn expired_token_fails_expired() {
        let pool = test_pool().await;
        let issued = verification::issue_verification(&pool, &bob(), &pending(), Duration::hours(24))
            .await
            .unwrap();
        expire_token(&pool, &issued.token).await;

        let err = verification::consume_verification(&pool, &issued.token, Duration::days(30), RetryPolicy::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Expired(ref r) if r == "expired"));
        assert_eq!(users_with_email(&pool, "bob@acme.com").await, 0);

        // Nothing pending any more, so resend has nothing to rotate.
        let err = verification::resend_verification(&pool, &bob(), Duration::hours(24))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(ref r) if r == "not_found"));
    }

    #[tokio::test]
    async fn unknown_token_is_invalid() {
        let pool = test_pool().await;
        let err = verification::consume_verification(&pool, "deadbeef", Duration::days(30), RetryPolicy::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(ref r) if r == "invalid_or_expired"));
    }

    #[tokio::test]
    async fn resend_without_pending_token_is_not_found() {
        let pool = test_pool().await;
        let err = verification::resend_verification(&pool, &bob(), Duration::hours(24))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(ref r) if r == "not_found"));
    }

    #[tokio::test]
    async fn consuming_links_to_matching_company_and_opens_session() {
        let pool = test_pool().await;
        let (acme, _) = company_with_owner(&pool, "Acme", "owner@acme.com").await;
        let issued = verification::issue_verification(&pool, &bob(), &pending(), Duration::hours(24))
            .await
            .unwrap();

        let consumed = verification::consume_verification(&pool, &issued.token, Duration::days(30), RetryPolicy::default())
            .await
            .unwrap();

        assert_eq!(consumed.account.company_id, Some(acme));
        assert_eq!(consumed.account.role, Role::Member);
        let session = db::sessions::find_valid(&pool, &consumed.session_id).await.unwrap().unwrap();
        assert_eq!(session.user_id, consumed.account.user_id.as_str());
    }

    #[tokio::test]
    async fn signup_for_existing_account_is_refused() {
        let pool = test_pool().await;
        create_user(&pool, "bob@acme.com", false).await;

        let err = verification::issue_verification(&pool, &bob(), &pending(), Duration::hours(24))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Auth(_)));
    }

    #[tokio::test]
    async fn reserved_domain_is_refused() {
        let pool = test_pool().await;
        let email = Email::new("system@fleetgate.invalid").unwrap();

        let err = verification::issue_verification(&pool, &email, &pending(), Duration::hours(24))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn cleanup_removes_only_expired_unconsumed_tokens() {
        let pool = test_pool().await;
        let stale = verification::issue_verification(&pool, &bob(), &pending(), Duration::hours(24))
            .await
            .unwrap();
        let fresh = verification::issue_verification(
            &pool,
            &Email::new("alice@acme.com").unwrap(),
            &pending(),
            Duration::hours(24),
        )
        .await
        .unwrap();
        expire_token(&pool, &stale.token).await;

        let removed = verification::cleanup_expired(&pool).await.unwrap();

        assert_eq!(removed, 1);
        assert!(db::verification_tokens::find_by_token(&pool, &stale.token).await.unwrap().is_none());
        assert!(db::verification_tokens::find_by_token(&pool, &fresh.token).await.unwrap().is_some());
    }
}
