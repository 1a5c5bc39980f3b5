mod common;

mod membership_store {
    use crate::common::*;
    use fleetgate::app::{
        audit::actions,
        db,
        domain::{CompanyId, Role, UserId},
        error::AppError,
        memberships,
    };

    async fn membership_rows(pool: &sqlx::SqlitePool, company: &CompanyId, user: &UserId) -> i64 {
        sqlx::query_scalar("SELECT count(*) FROM memberships WHERE company_id = ? AND user_id = ?")
            .bind(company.as_str())
            .bind(user.as_str())
            .fetch_one(pool)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn add_membership_is_idempotent() {
        let pool = test_pool().await;
        let (acme, _) = company_with_owner(&pool, "Acme", "owner@acme.com").await;
        let user = create_user(&pool, "driver@acme.com", false).await;

        memberships::add_membership(&pool, None, &acme, &user, Role::Member).await.unwrap();
        memberships::add_membership(&pool, None, &acme, &user, Role::Member).await.unwrap();

        assert_eq!(membership_rows(&pool, &acme, &user).await, 1);
        assert_eq!(
            db::memberships::find_role(&pool, &acme, &user).await.unwrap(),
            Some(Role::Member)
        );
    }

    #[tokio::test]
    async fn role_change_overwrites_and_is_audited_once_per_call() {
        let pool = test_pool().await;
        let (acme, _) = company_with_owner(&pool, "Acme", "owner@acme.com").await;
        let user = create_user(&pool, "driver@acme.com", false).await;

        memberships::add_membership(&pool, None, &acme, &user, Role::Viewer).await.unwrap();
        let updated = memberships::add_membership(&pool, None, &acme, &user, Role::Manager)
            .await
            .unwrap();

        assert_eq!(updated.role(), Some(Role::Manager));
        assert_eq!(audit_count(&pool, actions::ADD_MEMBERSHIP).await, 1);
        assert_eq!(audit_count(&pool, actions::UPDATE_MEMBERSHIP).await, 1);
    }

    #[tokio::test]
    async fn owner_cannot_be_downgraded_or_removed() {
        let pool = test_pool().await;
        let (acme, owner) = company_with_owner(&pool, "Acme", "owner@acme.com").await;

        let err = memberships::add_membership(&pool, None, &acme, &owner, Role::Viewer)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref r) if r == "owner_role_locked"));

        let err = memberships::remove_membership(&pool, &owner, &acme, &owner)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref r) if r == "owner_role_locked"));

        assert_eq!(
            db::memberships::find_role(&pool, &acme, &owner).await.unwrap(),
            Some(Role::Admin)
        );
    }

    #[tokio::test]
    async fn user_role_is_not_a_membership_role() {
        let pool = test_pool().await;
        let (acme, _) = company_with_owner(&pool, "Acme", "owner@acme.com").await;
        let user = create_user(&pool, "driver@acme.com", false).await;

        let err = memberships::add_membership(&pool, None, &acme, &user, Role::User)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(membership_rows(&pool, &acme, &user).await, 0);
    }

    #[tokio::test]
    async fn unknown_company_or_user_is_not_found() {
        let pool = test_pool().await;
        let (acme, _) = company_with_owner(&pool, "Acme", "owner@acme.com").await;
        let user = create_user(&pool, "driver@acme.com", false).await;

        let err = memberships::add_membership(&pool, None, &CompanyId::new(), &user, Role::Member)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let err = memberships::add_membership(&pool, None, &acme, &UserId::new(), Role::Member)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn assign_role_requires_users_edit() {
        let pool = test_pool().await;
        let (acme, _) = company_with_owner(&pool, "Acme", "owner@acme.com").await;
        let viewer = create_user(&pool, "viewer@acme.com", false).await;
        let target = create_user(&pool, "new@acme.com", false).await;
        add_member(&pool, &acme, &viewer, Role::Viewer).await;

        let err = memberships::assign_role(&pool, &viewer, &acme, &target, Role::Viewer)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
    }

    #[tokio::test]
    async fn manager_cannot_hand_out_admin() {
        let pool = test_pool().await;
        let (acme, owner) = company_with_owner(&pool, "Acme", "owner@acme.com").await;
        let manager = create_user(&pool, "manager@acme.com", false).await;
        let target = create_user(&pool, "new@acme.com", false).await;
        add_member(&pool, &acme, &manager, Role::Manager).await;

        let err = memberships::assign_role(&pool, &manager, &acme, &manager, Role::Admin)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden));

        memberships::assign_role(&pool, &manager, &acme, &target, Role::Member)
            .await
            .unwrap();
        memberships::assign_role(&pool, &owner, &acme, &target, Role::Admin)
            .await
            .unwrap();

        // Target now outranks the manager.
        let err = memberships::remove_membership(&pool, &manager, &acme, &target)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
    }

    #[tokio::test]
    async fn remove_membership_revokes_access() {
        let pool = test_pool().await;
        let (acme, owner) = company_with_owner(&pool, "Acme", "owner@acme.com").await;
        let member = create_user(&pool, "member@acme.com", false).await;
        add_member(&pool, &acme, &member, Role::Member).await;
        assert!(fleetgate::app::authz::authorize(&pool, &member, &acme, "vehicles", "view").await);

        memberships::remove_membership(&pool, &owner, &acme, &member).await.unwrap();

        assert!(!fleetgate::app::authz::authorize(&pool, &member, &acme, "vehicles", "view").await);
        assert_eq!(audit_count(&pool, actions::REMOVE_MEMBERSHIP).await, 1);

        let err = memberships::remove_membership(&pool, &owner, &acme, &member)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn list_members_requires_users_view() {
        let pool = test_pool().await;
        let (acme, owner) = company_with_owner(&pool, "Acme", "owner@acme.com").await;
        let outsider = create_user(&pool, "x@other.com", false).await;

        let members = memberships::list_members(&pool, &owner, &acme).await.unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].user_id, owner.as_str());

        let err = memberships::list_members(&pool, &outsider, &acme).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
    }
}

mod tenant_selector {
    use crate::common::*;
    use fleetgate::app::{
        audit::actions,
        domain::{CompanyId, Role},
        error::AppError,
        tenant,
    };

    #[tokio::test]
    async fn ordinary_principal_uses_oldest_membership() {
        let pool = test_pool().await;
        let (acme, owner) = company_with_owner(&pool, "Acme", "owner@acme.com").await;

        assert_eq!(tenant::current_tenant(&pool, &owner).await.unwrap(), Some(acme));

        let loner = create_user(&pool, "loner@nowhere.com", false).await;
        assert_eq!(tenant::current_tenant(&pool, &loner).await.unwrap(), None);
    }

    #[tokio::test]
    async fn ordinary_principal_cannot_switch() {
        let pool = test_pool().await;
        let (acme, _) = company_with_owner(&pool, "Acme", "owner@acme.com").await;
        let (globex, _) = company_with_owner(&pool, "Globex", "owner@globex.com").await;
        let member = create_user(&pool, "member@acme.com", false).await;
        add_member(&pool, &acme, &member, Role::Member).await;

        let err = tenant::set_active_tenant(&pool, &member, Some(&globex)).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden));
        assert_eq!(tenant::current_tenant(&pool, &member).await.unwrap(), Some(acme));
        assert_eq!(audit_count(&pool, actions::SWITCH_TENANT).await, 0);
    }

    #[tokio::test]
    async fn override_principal_switches_and_clears() {
        let pool = test_pool().await;
        let (acme, _) = company_with_owner(&pool, "Acme", "owner@acme.com").await;
        let (globex, _) = company_with_owner(&pool, "Globex", "owner@globex.com").await;
        let operator = create_user(&pool, "ops@platform.com", true).await;

        assert_eq!(tenant::current_tenant(&pool, &operator).await.unwrap(), None);

        tenant::set_active_tenant(&pool, &operator, Some(&acme)).await.unwrap();
        assert_eq!(tenant::current_tenant(&pool, &operator).await.unwrap(), Some(acme));

        tenant::set_active_tenant(&pool, &operator, Some(&globex)).await.unwrap();
        assert_eq!(tenant::current_tenant(&pool, &operator).await.unwrap(), Some(globex));

        tenant::set_active_tenant(&pool, &operator, None).await.unwrap();
        assert_eq!(tenant::current_tenant(&pool, &operator).await.unwrap(), None);

        assert_eq!(audit_count(&pool, actions::SWITCH_TENANT).await, 3);
    }

    #[tokio::test]
    async fn switching_to_unknown_company_is_not_found() {
        let pool = test_pool().await;
        let operator = create_user(&pool, "ops@platform.com", true).await;

        let err = tenant::set_active_tenant(&pool, &operator, Some(&CompanyId::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
