//! Database seeding
//!
//! Inserts the default category tree and, when admin credentials are
//! configured, a super-admin account with its own storefront. Seeding is
//! idempotent: rows that already exist are left untouched.

use anyhow::{Context, Result};
use sea_orm::DatabaseConnection;

use crate::auth::hash_password;
use crate::config::AppConfig;
use crate::models::user::Role;
use crate::payments::PaymentGateway;
use crate::repositories::category::NewCategory;
use crate::repositories::user::NewAccount;
use crate::repositories::{CategoryRepository, UserRepository};

/// Username (and storefront slug) of the seeded super-admin
pub const ADMIN_USERNAME: &str = "admin";

/// Connected account used when no payment gateway is available while seeding
pub const PLACEHOLDER_STRIPE_ACCOUNT: &str = "acct_seed_placeholder";

struct CategorySeed {
    name: &'static str,
    slug: &'static str,
    color: Option<&'static str>,
    subcategories: &'static [(&'static str, &'static str)],
}

const CATEGORIES: &[CategorySeed] = &[
    CategorySeed {
        name: "All",
        slug: "all",
        color: None,
        subcategories: &[],
    },
    CategorySeed {
        name: "Business & Money",
        slug: "business-money",
        color: Some("#FFB347"),
        subcategories: &[
            ("Accounting", "accounting"),
            ("Entrepreneurship", "entrepreneurship"),
            ("Gigs & Side Projects", "gigs-side-projects"),
            ("Investing", "investing"),
            ("Management & Leadership", "management-leadership"),
            ("Marketing & Sales", "marketing-sales"),
            ("Networking, Careers & Jobs", "networking-careers-jobs"),
            ("Personal Finance", "personal-finance"),
            ("Real Estate", "real-estate"),
        ],
    },
    CategorySeed {
        name: "Software Development",
        slug: "software-development",
        color: Some("#7EC8E3"),
        subcategories: &[
            ("Web Development", "web-development"),
            ("Mobile Development", "mobile-development"),
            ("Game Development", "game-development"),
            ("Programming Languages", "programming-languages"),
            ("DevOps", "devops"),
        ],
    },
    CategorySeed {
        name: "Writing & Publishing",
        slug: "writing-publishing",
        color: Some("#D8B5FF"),
        subcategories: &[
            ("Fiction", "fiction"),
            ("Non-Fiction", "non-fiction"),
            ("Blogging", "blogging"),
            ("Copywriting", "copywriting"),
            ("Self-Publishing", "self-publishing"),
        ],
    },
    CategorySeed {
        name: "Other",
        slug: "other",
        color: None,
        subcategories: &[],
    },
    CategorySeed {
        name: "Education",
        slug: "education",
        color: Some("#FFE066"),
        subcategories: &[
            ("Online Courses", "online-courses"),
            ("Tutoring", "tutoring"),
            ("Test Preparation", "test-preparation"),
            ("Language Learning", "language-learning"),
        ],
    },
    CategorySeed {
        name: "Self Improvement",
        slug: "self-improvement",
        color: Some("#96E6B3"),
        subcategories: &[
            ("Productivity", "productivity"),
            ("Personal Development", "personal-development"),
            ("Mindfulness", "mindfulness"),
            ("Career Growth", "career-growth"),
        ],
    },
    CategorySeed {
        name: "Fitness & Health",
        slug: "fitness-health",
        color: Some("#FF9AA2"),
        subcategories: &[
            ("Workout Plans", "workout-plans"),
            ("Nutrition", "nutrition"),
            ("Mental Health", "mental-health"),
            ("Yoga", "yoga"),
        ],
    },
    CategorySeed {
        name: "Design",
        slug: "design",
        color: Some("#B5B9FF"),
        subcategories: &[
            ("UI/UX", "ui-ux"),
            ("Graphic Design", "graphic-design"),
            ("3D Modeling", "3d-modeling"),
            ("Typography", "typography"),
        ],
    },
    CategorySeed {
        name: "Drawing & Painting",
        slug: "drawing-painting",
        color: Some("#FFCAB0"),
        subcategories: &[
            ("Watercolor", "watercolor"),
            ("Acrylic", "acrylic"),
            ("Oil", "oil"),
            ("Pastel", "pastel"),
            ("Charcoal", "charcoal"),
        ],
    },
    CategorySeed {
        name: "Music",
        slug: "music",
        color: Some("#FFD700"),
        subcategories: &[
            ("Songwriting", "songwriting"),
            ("Music Production", "music-production"),
            ("Music Theory", "music-theory"),
            ("Music History", "music-history"),
        ],
    },
    CategorySeed {
        name: "Photography",
        slug: "photography",
        color: Some("#FF6B6B"),
        subcategories: &[
            ("Portrait", "portrait"),
            ("Landscape", "landscape"),
            ("Street Photography", "street-photography"),
            ("Nature", "nature"),
            ("Macro", "macro"),
        ],
    },
];

/// Insert the default category tree. Returns how many categories exist afterwards.
pub async fn seed_categories(db: &DatabaseConnection) -> Result<usize> {
    let repo = CategoryRepository::new(db);
    let mut total = 0;

    for seed in CATEGORIES {
        let parent = repo
            .ensure(NewCategory {
                name: seed.name.to_string(),
                slug: seed.slug.to_string(),
                color: seed.color.map(str::to_string),
                parent_id: None,
            })
            .await
            .with_context(|| format!("Failed to seed category '{}'", seed.slug))?;
        total += 1;

        for (name, slug) in seed.subcategories {
            repo.ensure(NewCategory {
                name: name.to_string(),
                slug: slug.to_string(),
                color: None,
                parent_id: Some(parent.id),
            })
            .await
            .with_context(|| format!("Failed to seed category '{slug}'"))?;
            total += 1;
        }
    }

    tracing::info!(categories = total, "Seeded category tree");
    Ok(total)
}

/// Insert the configured super-admin, unless the email is already registered.
///
/// Returns `true` when a new account was created.
pub async fn seed_admin(
    db: &DatabaseConnection,
    config: &AppConfig,
    payments: Option<&dyn PaymentGateway>,
) -> Result<bool> {
    let (Some(email), Some(password)) = (
        config.admin_email.as_deref(),
        config.admin_password.as_deref(),
    ) else {
        tracing::info!("No admin credentials configured; skipping super-admin seed");
        return Ok(false);
    };

    let users = UserRepository::new(db);
    if users.find_by_email(email).await?.is_some() {
        tracing::info!(%email, "Super-admin already exists, skipping");
        return Ok(false);
    }

    let stripe_account_id = match payments {
        Some(gateway) => gateway
            .create_connected_account()
            .await
            .context("Failed to create connected account for super-admin")?,
        None => {
            tracing::warn!("No payment gateway configured; using a placeholder account");
            PLACEHOLDER_STRIPE_ACCOUNT.to_string()
        }
    };

    let password_hash = hash_password(password).context("Failed to hash admin password")?;
    let (user, tenant) = users
        .register(NewAccount {
            email: email.to_string(),
            username: ADMIN_USERNAME.to_string(),
            password_hash,
            roles: vec![Role::SuperAdmin],
            stripe_account_id,
            stripe_details_submitted: true,
        })
        .await
        .context("Failed to create super-admin")?;

    tracing::info!(user_id = %user.id, tenant_slug = %tenant.slug, "Seeded super-admin");
    Ok(true)
}

/// Run every seed step
pub async fn run(
    db: &DatabaseConnection,
    config: &AppConfig,
    payments: Option<&dyn PaymentGateway>,
) -> Result<()> {
    seed_categories(db).await?;
    seed_admin(db, config, payments).await?;
    Ok(())
}
