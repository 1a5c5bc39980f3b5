mod common;

mod promote_to_admin {
    use crate::common::*;
    use fleetgate::app::{
        audit::actions,
        db,
        domain::Role,
        error::AppError,
        provisioning,
    };

    #[tokio::test]
    async fn exact_contact_email_match_becomes_admin() {
        let pool = test_pool().await;
        let operator = create_user(&pool, "ops@platform.com", true).await;
        // Operator sets the company up for a customer; nobody holds admin yet.
        let acme = create_company(&pool, &operator, "Acme", "boss@acme.com").await;
        assert!(db::memberships::list_for_company(&pool, &acme).await.unwrap().is_empty());
        let boss = create_user(&pool, "boss@acme.com", false).await;

        let outcome = provisioning::promote_to_admin(&pool, Some(&boss), &boss).await.unwrap();

        assert!(!outcome.already_admin);
        assert_eq!(outcome.role, Role::Admin);
        assert_eq!(outcome.company_id, acme.as_str());
        assert_eq!(db::memberships::find_role(&pool, &acme, &boss).await.unwrap(), Some(Role::Admin));
        assert!(fleetgate::app::authz::authorize(&pool, &boss, &acme, "settings", "edit").await);
        assert_eq!(audit_count(&pool, actions::PROMOTE_TO_ADMIN).await, 1);

        let company = db::companies::find_by_id(&pool, &acme).await.unwrap().unwrap();
        assert_eq!(company.owner_user_id, boss.as_str());
    }

    #[tokio::test]
    async fn claimed_company_is_locked_to_its_new_owner() {
        let pool = test_pool().await;
        let operator = create_user(&pool, "ops@platform.com", true).await;
        let acme = create_company(&pool, &operator, "Acme", "boss@acme.com").await;
        let boss = create_user(&pool, "boss@acme.com", false).await;
        provisioning::promote_to_admin(&pool, Some(&boss), &boss).await.unwrap();

        let err = fleetgate::app::memberships::assign_role(&pool, &operator, &acme, &boss, Role::Viewer)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref r) if r == "owner_role_locked"));

        // Repointing the contact address does not hand the company to someone else.
        fleetgate::app::companies::update_settings(
            &pool,
            &boss,
            &acme,
            fleetgate::app::companies::SettingsUpdate {
                name: None,
                contact_email: Some(fleetgate::app::domain::Email::new("colleague@acme.com").unwrap()),
            },
        )
        .await
        .unwrap();
        let colleague = create_user(&pool, "colleague@acme.com", false).await;
        let err = provisioning::promote_to_admin(&pool, Some(&colleague), &colleague)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref r) if r == "company_has_admin"));
    }

    #[tokio::test]
    async fn operator_creating_for_own_address_becomes_owner_admin() {
        let pool = test_pool().await;
        let operator = create_user(&pool, "ops@platform.com", true).await;
        let internal = create_company(&pool, &operator, "Platform", "ops@platform.com").await;

        assert_eq!(
            db::memberships::find_role(&pool, &internal, &operator).await.unwrap(),
            Some(Role::Admin)
        );
    }

    #[tokio::test]
    async fn second_call_reports_already_admin_without_writing() {
        let pool = test_pool().await;
        let operator = create_user(&pool, "ops@platform.com", true).await;
        let acme = create_company(&pool, &operator, "Acme", "boss@acme.com").await;
        let boss = create_user(&pool, "boss@acme.com", false).await;

        provisioning::promote_to_admin(&pool, Some(&boss), &boss).await.unwrap();
        let grants = db::permission_grants::count_for_company(&pool, &acme).await.unwrap();
        let audits = audit_total(&pool).await;

        let outcome = provisioning::promote_to_admin(&pool, Some(&boss), &boss).await.unwrap();

        assert!(outcome.already_admin);
        assert_eq!(outcome.company_id, acme.as_str());
        assert_eq!(db::memberships::list_for_company(&pool, &acme).await.unwrap().len(), 1);
        assert_eq!(db::permission_grants::count_for_company(&pool, &acme).await.unwrap(), grants);
        assert_eq!(audit_total(&pool).await, audits);
    }

    #[tokio::test]
    async fn company_with_another_admin_is_a_conflict() {
        let pool = test_pool().await;
        let (acme, owner) = company_with_owner(&pool, "Acme", "owner@acme.com").await;
        fleetgate::app::companies::update_settings(
            &pool,
            &owner,
            &acme,
            fleetgate::app::companies::SettingsUpdate {
                name: None,
                contact_email: Some(fleetgate::app::domain::Email::new("claimer@acme.com").unwrap()),
            },
        )
        .await
        .unwrap();
        let claimer = create_user(&pool, "claimer@acme.com", false).await;

        let err = provisioning::promote_to_admin(&pool, Some(&claimer), &claimer)
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Conflict(ref r) if r == "company_has_admin"));
        assert_eq!(db::memberships::find_role(&pool, &acme, &owner).await.unwrap(), Some(Role::Admin));
        assert_eq!(db::memberships::find_role(&pool, &acme, &claimer).await.unwrap(), None);
        assert_eq!(audit_count(&pool, actions::PROMOTE_TO_ADMIN).await, 0);
    }

    #[tokio::test]
    async fn domain_match_alone_is_not_enough() {
        let pool = test_pool().await;
        let _ = company_with_owner(&pool, "Acme", "owner@acme.com").await;
        let colleague = create_user(&pool, "colleague@acme.com", false).await;

        let err = provisioning::promote_to_admin(&pool, Some(&colleague), &colleague)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(ref r) if r == "no_matching_company"));
    }

    #[tokio::test]
    async fn global_override_is_preserved() {
        let pool = test_pool().await;
        let other = create_user(&pool, "someone@platform.com", true).await;
        let acme = create_company(&pool, &other, "Acme", "ops@acme.com").await;
        let operator = create_user(&pool, "ops@acme.com", true).await;

        provisioning::promote_to_admin(&pool, Some(&operator), &operator).await.unwrap();

        let user = db::users::find_by_id(&pool, &operator).await.unwrap().unwrap();
        assert!(user.global_override);

        let detail: String = sqlx::query_scalar("SELECT detail FROM audit_log WHERE action = ?")
            .bind(actions::PROMOTE_TO_ADMIN)
            .fetch_one(&pool)
            .await
            .unwrap();
        let detail: serde_json::Value = serde_json::from_str(&detail).unwrap();
        assert_eq!(detail["global_override_preserved"], true);
        assert_eq!(detail["company_id"], acme.as_str());
        assert!(detail["duration_ms"].is_u64());
    }

    #[tokio::test]
    async fn unknown_principal_is_not_found() {
        let pool = test_pool().await;
        let err = provisioning::promote_to_admin(&pool, None, &fleetgate::app::domain::UserId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}

mod provision_account {
    use crate::common::*;
    use fleetgate::app::{
        audit::actions,
        db,
        domain::{Email, Role},
        provisioning::{self, AccountDetails, RetryPolicy},
    };

    fn details(email: &str) -> AccountDetails {
        AccountDetails {
            email: Email::new(email).unwrap(),
            display_name: "New Hire".to_string(),
            password_hash: None,
        }
    }

    #[tokio::test]
    async fn links_to_company_sharing_the_email_domain() {
        let pool = test_pool().await;
        let (acme, _) = company_with_owner(&pool, "Acme", "owner@acme.com").await;

        let account = provisioning::provision_standalone(&pool, None, &details("driver@acme.com"), RetryPolicy::default())
            .await
            .unwrap();

        assert!(account.created);
        assert!(account.membership_created);
        assert_eq!(account.company_id, Some(acme.clone()));
        assert_eq!(account.role, Role::Member);
        assert_eq!(
            db::memberships::find_role(&pool, &acme, &account.user_id).await.unwrap(),
            Some(Role::Member)
        );
        assert_eq!(audit_count(&pool, actions::PROVISION_ACCOUNT).await, 1);
    }

    #[tokio::test]
    async fn no_matching_domain_leaves_principal_without_tenant() {
        let pool = test_pool().await;
        let _ = company_with_owner(&pool, "Acme", "owner@acme.com").await;

        let account = provisioning::provision_standalone(&pool, None, &details("solo@gmail.com"), RetryPolicy::default())
            .await
            .unwrap();

        assert!(account.created);
        assert_eq!(account.company_id, None);
        assert_eq!(account.role, Role::User);
        assert!(db::memberships::first_for_user(&pool, &account.user_id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn repeated_provisioning_returns_the_same_principal() {
        let pool = test_pool().await;
        let _ = company_with_owner(&pool, "Acme", "owner@acme.com").await;

        let first = provisioning::provision_standalone(&pool, None, &details("driver@acme.com"), RetryPolicy::default())
            .await
            .unwrap();
        let audits = audit_total(&pool).await;
        let second = provisioning::provision_standalone(&pool, None, &details("driver@acme.com"), RetryPolicy::default())
            .await
            .unwrap();

        assert_eq!(first.user_id, second.user_id);
        assert!(!second.created);
        assert!(!second.membership_created);
        assert_eq!(second.role, Role::Member);
        assert_eq!(audit_total(&pool).await, audits);
    }

    #[tokio::test]
    async fn existing_higher_role_is_kept() {
        let pool = test_pool().await;
        let (acme, _) = company_with_owner(&pool, "Acme", "owner@acme.com").await;
        let manager = create_user(&pool, "manager@acme.com", false).await;
        add_member(&pool, &acme, &manager, Role::Manager).await;

        let account = provisioning::provision_standalone(&pool, None, &details("manager@acme.com"), RetryPolicy::default())
            .await
            .unwrap();

        assert_eq!(account.user_id, manager);
        assert_eq!(account.role, Role::Manager);
        assert_eq!(
            db::memberships::find_role(&pool, &acme, &manager).await.unwrap(),
            Some(Role::Manager)
        );
    }
}
