//! Idempotent table and index initialization.

use sqlx::PgPool;
use tracing::info;

use super::error::{Constraint, StoreError};

const TABLES: &[(&str, &str)] = &[
    (
        "users",
        "CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            name TEXT,
            email TEXT,
            family_id UUID,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    ),
    (
        "families",
        "CREATE TABLE IF NOT EXISTS families (
            id UUID PRIMARY KEY,
            name TEXT NOT NULL,
            invite_code TEXT NOT NULL,
            owner_id TEXT NOT NULL,
            settings JSONB,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    ),
    (
        "family_members",
        "CREATE TABLE IF NOT EXISTS family_members (
            id UUID PRIMARY KEY,
            family_id UUID NOT NULL REFERENCES families(id) ON DELETE CASCADE,
            user_id TEXT,
            name TEXT NOT NULL,
            relationship TEXT NOT NULL,
            color TEXT NOT NULL,
            is_default BOOLEAN NOT NULL DEFAULT FALSE,
            preferences JSONB,
            metadata JSONB,
            module_permissions JSONB,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            created_by TEXT NOT NULL
        )",
    ),
    (
        "healthcare_providers",
        "CREATE TABLE IF NOT EXISTS healthcare_providers (
            id UUID PRIMARY KEY,
            family_id UUID NOT NULL REFERENCES families(id) ON DELETE CASCADE,
            provider_name TEXT NOT NULL,
            portal_url TEXT NOT NULL,
            specialty TEXT NOT NULL,
            family_member_ids UUID[] NOT NULL DEFAULT '{}',
            login_username TEXT,
            notes TEXT,
            last_used TIMESTAMPTZ,
            auto_detected BOOLEAN NOT NULL DEFAULT FALSE,
            quick_add_data JSONB,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            created_by TEXT NOT NULL,
            CONSTRAINT healthcare_providers_members_present CHECK (cardinality(family_member_ids) > 0)
        )",
    ),
    (
        "todos",
        "CREATE TABLE IF NOT EXISTS todos (
            id UUID PRIMARY KEY,
            family_id UUID NOT NULL REFERENCES families(id) ON DELETE CASCADE,
            description TEXT NOT NULL,
            assigned_member_ids UUID[] NOT NULL DEFAULT '{}',
            completed BOOLEAN NOT NULL DEFAULT FALSE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            completed_at TIMESTAMPTZ
        )",
    ),
];

/// Plain lookup indexes, safe to drop and recreate
const LOOKUP_INDEXES: &[(&str, &str)] = &[
    ("families_owner_id_idx", "ON families (owner_id)"),
    ("family_members_family_id_idx", "ON family_members (family_id)"),
    ("family_members_user_id_idx", "ON family_members (user_id) WHERE user_id IS NOT NULL"),
    ("family_members_created_at_idx", "ON family_members (created_at)"),
    ("healthcare_providers_family_id_idx", "ON healthcare_providers (family_id)"),
    (
        "healthcare_providers_member_ids_idx",
        "ON healthcare_providers USING GIN (family_member_ids)",
    ),
    ("healthcare_providers_last_used_idx", "ON healthcare_providers (last_used DESC)"),
    ("todos_family_id_idx", "ON todos (family_id)"),
    ("users_family_id_idx", "ON users (family_id) WHERE family_id IS NOT NULL"),
];

pub fn table_names() -> Vec<&'static str> {
    TABLES.iter().map(|(name, _)| *name).collect()
}

/// Create every table and index. Running it again is a no-op.
pub async fn initialize_indexes(pool: &PgPool) -> Result<(), StoreError> {
    for (table, ddl) in TABLES {
        sqlx::query(ddl).execute(pool).await?;
        info!("Table ready: {}", table);
    }

    let unique = [
        format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS {} ON families (invite_code)",
            Constraint::INVITE_CODE_INDEX
        ),
        format!(
            "CREATE UNIQUE INDEX IF NOT EXISTS {} ON family_members (family_id, user_id) \
             WHERE user_id IS NOT NULL",
            Constraint::MEMBER_USER_INDEX
        ),
    ];
    for ddl in &unique {
        sqlx::query(ddl).execute(pool).await?;
    }

    for (name, definition) in LOOKUP_INDEXES {
        let ddl = format!("CREATE INDEX IF NOT EXISTS {name} {definition}");
        sqlx::query(&ddl).execute(pool).await?;
    }

    info!(
        "All indexes initialized ({} unique, {} lookup)",
        unique.len(),
        LOOKUP_INDEXES.len()
    );
    Ok(())
}

/// Drop the lookup indexes. Unique constraints stay in place.
pub async fn drop_indexes(pool: &PgPool) -> Result<(), StoreError> {
    for (name, _) in LOOKUP_INDEXES {
        sqlx::query(&format!("DROP INDEX IF EXISTS {name}"))
            .execute(pool)
            .await?;
    }
    info!("Dropped {} lookup indexes", LOOKUP_INDEXES.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_collection_has_a_family_index() {
        for table in ["family_members", "healthcare_providers", "todos"] {
            let needle = format!("ON {table} (family_id)");
            assert!(
                LOOKUP_INDEXES.iter().any(|(_, def)| *def == needle),
                "missing family_id index on {table}"
            );
        }
    }

    #[test]
    fn providers_must_serve_someone() {
        let (_, ddl) = TABLES
            .iter()
            .find(|(name, _)| *name == "healthcare_providers")
            .expect("providers table");
        assert!(ddl.contains("CHECK (cardinality(family_member_ids) > 0)"));
    }

    #[test]
    fn table_ddl_is_idempotent() {
        assert!(TABLES.iter().all(|(_, ddl)| ddl.starts_with("CREATE TABLE IF NOT EXISTS")));
    }
}
