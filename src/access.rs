//! Access predicates for seller and admin operations.
//!
//! These are pure functions over already-loaded rows so handlers can load
//! what they need once and decide without further queries.

use uuid::Uuid;

use crate::models::{product, tenant, user};
use crate::models::user::Role;

/// Whether the user holds the `super-admin` role
pub fn is_super_admin(user: Option<&user::Model>) -> bool {
    user.is_some_and(|user| user.has_role(Role::SuperAdmin))
}

/// Super-admins may always create products; sellers only once their
/// payment details are submitted.
pub fn can_create_product(user: &user::Model, tenant: Option<&tenant::Model>) -> bool {
    if is_super_admin(Some(user)) {
        return true;
    }
    tenant.is_some_and(|tenant| tenant.stripe_details_submitted)
}

/// Super-admins, or members of the tenant that owns the product
pub fn can_manage_product(
    user: &user::Model,
    member_tenant_ids: &[Uuid],
    product: &product::Model,
) -> bool {
    is_super_admin(Some(user)) || member_tenant_ids.contains(&product.tenant_id)
}

/// Categories, tags, orders and reviews are administered by super-admins only
pub fn can_administer_catalog(user: &user::Model) -> bool {
    is_super_admin(Some(user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::product::RefundPolicy;
    use crate::models::user::roles_to_json;
    use chrono::Utc;

    fn user(roles: &[Role]) -> user::Model {
        user::Model {
            id: Uuid::new_v4(),
            email: "seller@example.com".to_string(),
            username: "seller".to_string(),
            password_hash: String::new(),
            roles: roles_to_json(roles),
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    fn tenant(details_submitted: bool) -> tenant::Model {
        tenant::Model {
            id: Uuid::new_v4(),
            name: "seller".to_string(),
            slug: "seller".to_string(),
            image_id: None,
            stripe_account_id: "acct_1".to_string(),
            stripe_details_submitted: details_submitted,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    fn product(tenant_id: Uuid) -> product::Model {
        product::Model {
            id: Uuid::new_v4(),
            tenant_id,
            name: "Brushes".to_string(),
            description: None,
            price_cents: 500,
            category_id: None,
            image_id: None,
            refund_policy: RefundPolicy::default(),
            content: None,
            is_private: false,
            is_archived: false,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    #[test]
    fn super_admin_detection() {
        assert!(is_super_admin(Some(&user(&[Role::SuperAdmin]))));
        assert!(!is_super_admin(Some(&user(&[Role::Admin, Role::User]))));
        assert!(!is_super_admin(None));
    }

    #[test]
    fn product_creation_requires_submitted_details() {
        let seller = user(&[Role::User]);
        assert!(!can_create_product(&seller, Some(&tenant(false))));
        assert!(can_create_product(&seller, Some(&tenant(true))));
        assert!(!can_create_product(&seller, None));
        assert!(can_create_product(&user(&[Role::SuperAdmin]), None));
    }

    #[test]
    fn product_management_follows_membership() {
        let seller = user(&[Role::User]);
        let owned = tenant(true);
        let listing = product(owned.id);

        assert!(can_manage_product(&seller, &[owned.id], &listing));
        assert!(!can_manage_product(&seller, &[Uuid::new_v4()], &listing));
        assert!(can_manage_product(&user(&[Role::SuperAdmin]), &[], &listing));
    }
}
