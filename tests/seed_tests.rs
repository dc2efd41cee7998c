//! Integration tests for database seeding.

use anyhow::Result;
use marketplace::{
    models::user::Role,
    payments::PaymentGateway,
    repositories::{CategoryRepository, TenantRepository, UserRepository},
    seeds::{self, ADMIN_USERNAME, PLACEHOLDER_STRIPE_ACCOUNT},
};

#[path = "test_utils/mod.rs"]
mod test_utils;
use test_utils::{FakePaymentGateway, setup_test_db, test_config};

#[tokio::test]
async fn category_seed_is_idempotent() -> Result<()> {
    let db = setup_test_db().await?;

    let first = seeds::seed_categories(&db).await?;
    let second = seeds::seed_categories(&db).await?;
    assert_eq!(first, second);

    let tree = CategoryRepository::new(&db).list_tree().await?;
    assert_eq!(
        tree.iter().map(|node| node.subcategories.len() + 1).sum::<usize>(),
        first
    );

    let business = tree
        .iter()
        .find(|node| node.category.slug == "business-money")
        .unwrap();
    assert_eq!(business.category.color.as_deref(), Some("#FFB347"));
    assert!(
        business
            .subcategories
            .iter()
            .any(|sub| sub.slug == "accounting")
    );
    Ok(())
}

#[tokio::test]
async fn admin_is_skipped_without_credentials() -> Result<()> {
    let db = setup_test_db().await?;

    let created = seeds::seed_admin(&db, &test_config(), None).await?;
    assert!(!created);
    Ok(())
}

#[tokio::test]
async fn admin_is_seeded_once_with_placeholder_account() -> Result<()> {
    let db = setup_test_db().await?;
    let mut config = test_config();
    config.admin_email = Some("admin@example.com".to_string());
    config.admin_password = Some("admin-password".to_string());

    assert!(seeds::seed_admin(&db, &config, None).await?);
    assert!(!seeds::seed_admin(&db, &config, None).await?);

    let admin = UserRepository::new(&db)
        .find_by_email("admin@example.com")
        .await?
        .unwrap();
    assert_eq!(admin.username, ADMIN_USERNAME);
    assert!(admin.has_role(Role::SuperAdmin));

    let tenant = TenantRepository::new(&db)
        .find_by_slug(ADMIN_USERNAME)
        .await?
        .unwrap();
    assert_eq!(tenant.stripe_account_id, PLACEHOLDER_STRIPE_ACCOUNT);
    assert!(tenant.stripe_details_submitted);
    Ok(())
}

#[tokio::test]
async fn admin_uses_the_gateway_when_available() -> Result<()> {
    let db = setup_test_db().await?;
    let mut config = test_config();
    config.admin_email = Some("admin@example.com".to_string());
    config.admin_password = Some("admin-password".to_string());
    let gateway = FakePaymentGateway::default();

    seeds::run(&db, &config, Some(&gateway as &dyn PaymentGateway)).await?;

    assert_eq!(gateway.accounts_created(), 1);
    let tenant = TenantRepository::new(&db)
        .find_by_slug(ADMIN_USERNAME)
        .await?
        .unwrap();
    assert_eq!(tenant.stripe_account_id, "acct_fake_1");
    Ok(())
}
