use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use super::error::StoreError;
use super::ids::{id_to_string, new_id, parse_id, parse_references};
use super::models::{
    Family, FamilyMember, FamilyMemberRow, FamilyMemberUpdate, FamilyRow, FamilyUpdate,
    HealthcareProvider, NewFamily, NewFamilyMember, NewProvider, NewTodo, ProviderChanges,
    ProviderRow, Todo, TodoRow, TodoUpdate,
};
use super::store::{FamilyStore, StoreResult};
use crate::auth::AuthUser;

const MEMBER_COLUMNS: &str = "id, family_id, user_id, name, relationship, color, is_default, \
     preferences, metadata, module_permissions, created_at, updated_at, created_by";

const PROVIDER_COLUMNS: &str = "id, family_id, provider_name, portal_url, specialty, \
     family_member_ids, login_username, notes, last_used, auto_detected, quick_add_data, \
     created_at, updated_at, created_by";

const TODO_COLUMNS: &str =
    "id, family_id, description, assigned_member_ids, completed, created_at, updated_at, completed_at";

/// PostgreSQL implementation of [`FamilyStore`]
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    timeout: Duration,
}

impl PgStore {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run one storage call under the configured deadline
    async fn bounded<T, F>(&self, call: F) -> StoreResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(self.timeout)),
        }
    }

    /// Conditional pointer write. Succeeds only while the user has no family
    /// or points at one that no longer exists.
    async fn link_user(
        tx: &mut Transaction<'_, Postgres>,
        user: &AuthUser,
        family_id: Uuid,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            "INSERT INTO users (id, name, email, family_id, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, NOW(), NOW()) \
             ON CONFLICT (id) DO UPDATE SET family_id = EXCLUDED.family_id, updated_at = NOW() \
             WHERE users.family_id IS NULL \
                OR NOT EXISTS (SELECT 1 FROM families f WHERE f.id = users.family_id)",
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(family_id)
        .execute(&mut **tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::AlreadyLinked);
        }
        Ok(())
    }

    async fn insert_member_in(
        tx: &mut Transaction<'_, Postgres>,
        family_id: Uuid,
        member: NewFamilyMember,
    ) -> StoreResult<FamilyMemberRow> {
        let sql = format!(
            "INSERT INTO family_members (id, family_id, user_id, name, relationship, color, is_default, \
             preferences, metadata, module_permissions, created_at, updated_at, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW(), NOW(), $11) \
             RETURNING {MEMBER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, FamilyMemberRow>(&sql)
            .bind(new_id())
            .bind(family_id)
            .bind(member.user_id)
            .bind(member.name)
            .bind(member.relationship.as_str())
            .bind(member.color)
            .bind(member.is_default)
            .bind(member.preferences.map(Json))
            .bind(member.metadata.map(Json))
            .bind(member.module_permissions.map(Json))
            .bind(member.created_by)
            .fetch_one(&mut **tx)
            .await?;
        Ok(row)
    }
}

fn required_id(id: &str) -> StoreResult<Uuid> {
    parse_id(id).ok_or_else(|| StoreError::InvalidReference(id.to_string()))
}

#[async_trait]
impl FamilyStore for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        self.bounded(async {
            sqlx::query("SELECT 1").execute(&self.pool).await?;
            Ok(())
        })
        .await
    }

    async fn user_family_id(&self, user_id: &str) -> StoreResult<Option<String>> {
        self.bounded(async {
            let family_id: Option<Option<Uuid>> =
                sqlx::query_scalar("SELECT family_id FROM users WHERE id = $1")
                    .bind(user_id)
                    .fetch_optional(&self.pool)
                    .await?;
            Ok(family_id.flatten().map(id_to_string))
        })
        .await
    }

    async fn create_family(
        &self,
        family: NewFamily,
        owner: &AuthUser,
        owner_member: Option<NewFamilyMember>,
    ) -> StoreResult<(Family, Option<FamilyMember>)> {
        self.bounded(async {
            let mut tx = self.pool.begin().await?;

            let row = sqlx::query_as::<_, FamilyRow>(
                "INSERT INTO families (id, name, invite_code, owner_id, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, NOW(), NOW()) \
                 RETURNING id, name, invite_code, owner_id, settings, created_at, updated_at",
            )
            .bind(new_id())
            .bind(&family.name)
            .bind(&family.invite_code)
            .bind(&family.owner_id)
            .fetch_one(&mut *tx)
            .await?;

            Self::link_user(&mut tx, owner, row.id).await?;

            let member = match owner_member {
                Some(member) => Some(Self::insert_member_in(&mut tx, row.id, member).await?),
                None => None,
            };

            tx.commit().await?;
            Ok((Family::from(row), member.map(FamilyMember::from)))
        })
        .await
    }

    async fn join_family(
        &self,
        family_id: &str,
        user: &AuthUser,
        member: NewFamilyMember,
    ) -> StoreResult<FamilyMember> {
        let family_id = required_id(family_id)?;
        self.bounded(async {
            let mut tx = self.pool.begin().await?;
            Self::link_user(&mut tx, user, family_id).await?;
            let row = Self::insert_member_in(&mut tx, family_id, member).await?;
            tx.commit().await?;
            Ok(FamilyMember::from(row))
        })
        .await
    }

    async fn family_by_id(&self, family_id: &str) -> StoreResult<Option<Family>> {
        let Some(family_id) = parse_id(family_id) else {
            return Ok(None);
        };
        self.bounded(async {
            let row = sqlx::query_as::<_, FamilyRow>(
                "SELECT id, name, invite_code, owner_id, settings, created_at, updated_at \
                 FROM families WHERE id = $1",
            )
            .bind(family_id)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row.map(Family::from))
        })
        .await
    }

    async fn family_by_invite_code(&self, code: &str) -> StoreResult<Option<Family>> {
        self.bounded(async {
            let row = sqlx::query_as::<_, FamilyRow>(
                "SELECT id, name, invite_code, owner_id, settings, created_at, updated_at \
                 FROM families WHERE invite_code = $1",
            )
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row.map(Family::from))
        })
        .await
    }

    async fn update_family(&self, family_id: &str, update: &FamilyUpdate) -> StoreResult<Option<Family>> {
        let Some(family_id) = parse_id(family_id) else {
            return Ok(None);
        };
        self.bounded(async {
            let mut qb = QueryBuilder::<Postgres>::new("UPDATE families SET updated_at = NOW()");
            if let Some(name) = &update.name {
                qb.push(", name = ").push_bind(name.clone());
            }
            if let Some(settings) = &update.settings {
                qb.push(", settings = ").push_bind(Json(settings.clone()));
            }
            qb.push(" WHERE id = ").push_bind(family_id);
            qb.push(" RETURNING id, name, invite_code, owner_id, settings, created_at, updated_at");

            let row = qb.build_query_as::<FamilyRow>().fetch_optional(&self.pool).await?;
            Ok(row.map(Family::from))
        })
        .await
    }

    async fn replace_invite_code(&self, family_id: &str, code: &str) -> StoreResult<Option<Family>> {
        let Some(family_id) = parse_id(family_id) else {
            return Ok(None);
        };
        self.bounded(async {
            let row = sqlx::query_as::<_, FamilyRow>(
                "UPDATE families SET invite_code = $2, updated_at = NOW() WHERE id = $1 \
                 RETURNING id, name, invite_code, owner_id, settings, created_at, updated_at",
            )
            .bind(family_id)
            .bind(code)
            .fetch_optional(&self.pool)
            .await?;
            Ok(row.map(Family::from))
        })
        .await
    }

    async fn list_members(&self, family_id: &str) -> StoreResult<Vec<FamilyMember>> {
        let Some(family_id) = parse_id(family_id) else {
            return Ok(Vec::new());
        };
        self.bounded(async {
            let sql = format!(
                "SELECT {MEMBER_COLUMNS} FROM family_members WHERE family_id = $1 ORDER BY created_at ASC"
            );
            let rows = sqlx::query_as::<_, FamilyMemberRow>(&sql)
                .bind(family_id)
                .fetch_all(&self.pool)
                .await?;
            Ok(rows.into_iter().map(FamilyMember::from).collect())
        })
        .await
    }

    async fn member_by_id(&self, family_id: &str, member_id: &str) -> StoreResult<Option<FamilyMember>> {
        let (Some(family_id), Some(member_id)) = (parse_id(family_id), parse_id(member_id)) else {
            return Ok(None);
        };
        self.bounded(async {
            let sql = format!("SELECT {MEMBER_COLUMNS} FROM family_members WHERE id = $1 AND family_id = $2");
            let row = sqlx::query_as::<_, FamilyMemberRow>(&sql)
                .bind(member_id)
                .bind(family_id)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row.map(FamilyMember::from))
        })
        .await
    }

    async fn member_by_user(&self, family_id: &str, user_id: &str) -> StoreResult<Option<FamilyMember>> {
        let Some(family_id) = parse_id(family_id) else {
            return Ok(None);
        };
        self.bounded(async {
            let sql = format!(
                "SELECT {MEMBER_COLUMNS} FROM family_members WHERE family_id = $1 AND user_id = $2 \
                 ORDER BY is_default DESC, created_at ASC LIMIT 1"
            );
            let row = sqlx::query_as::<_, FamilyMemberRow>(&sql)
                .bind(family_id)
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row.map(FamilyMember::from))
        })
        .await
    }

    async fn insert_member(&self, family_id: &str, member: NewFamilyMember) -> StoreResult<FamilyMember> {
        let family_id = required_id(family_id)?;
        self.bounded(async {
            let mut tx = self.pool.begin().await?;
            let row = Self::insert_member_in(&mut tx, family_id, member).await?;
            tx.commit().await?;
            Ok(FamilyMember::from(row))
        })
        .await
    }

    async fn update_member(
        &self,
        family_id: &str,
        member_id: &str,
        update: &FamilyMemberUpdate,
    ) -> StoreResult<Option<FamilyMember>> {
        let (Some(family_id), Some(member_id)) = (parse_id(family_id), parse_id(member_id)) else {
            return Ok(None);
        };
        self.bounded(async {
            let mut qb = QueryBuilder::<Postgres>::new("UPDATE family_members SET updated_at = NOW()");
            if let Some(name) = &update.name {
                qb.push(", name = ").push_bind(name.clone());
            }
            if let Some(relationship) = update.relationship {
                qb.push(", relationship = ").push_bind(relationship.as_str());
            }
            if let Some(color) = &update.color {
                qb.push(", color = ").push_bind(color.clone());
            }
            if let Some(preferences) = &update.preferences {
                qb.push(", preferences = ").push_bind(Json(preferences.clone()));
            }
            if let Some(metadata) = &update.metadata {
                qb.push(", metadata = ").push_bind(Json(metadata.clone()));
            }
            if let Some(permissions) = &update.module_permissions {
                qb.push(", module_permissions = ").push_bind(Json(permissions.clone()));
            }
            qb.push(" WHERE id = ").push_bind(member_id);
            qb.push(" AND family_id = ").push_bind(family_id);
            qb.push(" RETURNING ").push(MEMBER_COLUMNS);

            let row = qb.build_query_as::<FamilyMemberRow>().fetch_optional(&self.pool).await?;
            Ok(row.map(FamilyMember::from))
        })
        .await
    }

    async fn delete_member(&self, family_id: &str, member_id: &str) -> StoreResult<bool> {
        let (Some(family_id), Some(member_id)) = (parse_id(family_id), parse_id(member_id)) else {
            return Ok(false);
        };
        self.bounded(async {
            let mut tx = self.pool.begin().await?;

            let served: Vec<(String, i32)> = sqlx::query_as(
                "SELECT provider_name, cardinality(family_member_ids) FROM healthcare_providers \
                 WHERE family_id = $2 AND $1 = ANY(family_member_ids) \
                 ORDER BY provider_name FOR UPDATE",
            )
            .bind(member_id)
            .bind(family_id)
            .fetch_all(&mut *tx)
            .await?;
            if let Some((provider_name, _)) = served.into_iter().find(|(_, members)| *members == 1) {
                tx.rollback().await?;
                return Err(StoreError::SoleProviderMember(provider_name));
            }

            let deleted = sqlx::query("DELETE FROM family_members WHERE id = $1 AND family_id = $2")
                .bind(member_id)
                .bind(family_id)
                .execute(&mut *tx)
                .await?
                .rows_affected();
            if deleted == 0 {
                tx.rollback().await?;
                return Ok(false);
            }

            sqlx::query(
                "UPDATE healthcare_providers \
                 SET family_member_ids = array_remove(family_member_ids, $1), updated_at = NOW() \
                 WHERE family_id = $2 AND $1 = ANY(family_member_ids)",
            )
            .bind(member_id)
            .bind(family_id)
            .execute(&mut *tx)
            .await?;

            sqlx::query(
                "UPDATE todos \
                 SET assigned_member_ids = array_remove(assigned_member_ids, $1), updated_at = NOW() \
                 WHERE family_id = $2 AND $1 = ANY(assigned_member_ids)",
            )
            .bind(member_id)
            .bind(family_id)
            .execute(&mut *tx)
            .await?;

            tx.commit().await?;
            Ok(true)
        })
        .await
    }

    async fn set_default_member(&self, family_id: &str, member_id: &str, user_id: &str) -> StoreResult<bool> {
        let (Some(family_id), Some(member_id)) = (parse_id(family_id), parse_id(member_id)) else {
            return Ok(false);
        };
        self.bounded(async {
            let updated: Vec<Uuid> = sqlx::query_scalar(
                "UPDATE family_members SET is_default = (id = $2), updated_at = NOW() \
                 WHERE family_id = $1 AND (id = $2 OR user_id = $3) \
                   AND EXISTS (SELECT 1 FROM family_members t WHERE t.id = $2 AND t.family_id = $1) \
                 RETURNING id",
            )
            .bind(family_id)
            .bind(member_id)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
            Ok(updated.contains(&member_id))
        })
        .await
    }

    async fn list_providers(&self, family_id: &str) -> StoreResult<Vec<HealthcareProvider>> {
        let Some(family_id) = parse_id(family_id) else {
            return Ok(Vec::new());
        };
        self.bounded(async {
            let sql = format!(
                "SELECT {PROVIDER_COLUMNS} FROM healthcare_providers WHERE family_id = $1 \
                 ORDER BY provider_name ASC"
            );
            let rows = sqlx::query_as::<_, ProviderRow>(&sql)
                .bind(family_id)
                .fetch_all(&self.pool)
                .await?;
            Ok(rows.into_iter().map(HealthcareProvider::from).collect())
        })
        .await
    }

    async fn providers_for_member(&self, family_id: &str, member_id: &str) -> StoreResult<Vec<HealthcareProvider>> {
        let (Some(family_id), Some(member_id)) = (parse_id(family_id), parse_id(member_id)) else {
            return Ok(Vec::new());
        };
        self.bounded(async {
            let sql = format!(
                "SELECT {PROVIDER_COLUMNS} FROM healthcare_providers \
                 WHERE family_id = $1 AND $2 = ANY(family_member_ids) ORDER BY provider_name ASC"
            );
            let rows = sqlx::query_as::<_, ProviderRow>(&sql)
                .bind(family_id)
                .bind(member_id)
                .fetch_all(&self.pool)
                .await?;
            Ok(rows.into_iter().map(HealthcareProvider::from).collect())
        })
        .await
    }

    async fn recent_providers(&self, family_id: &str, limit: i64) -> StoreResult<Vec<HealthcareProvider>> {
        let Some(family_id) = parse_id(family_id) else {
            return Ok(Vec::new());
        };
        self.bounded(async {
            let sql = format!(
                "SELECT {PROVIDER_COLUMNS} FROM healthcare_providers \
                 WHERE family_id = $1 AND last_used IS NOT NULL ORDER BY last_used DESC LIMIT $2"
            );
            let rows = sqlx::query_as::<_, ProviderRow>(&sql)
                .bind(family_id)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?;
            Ok(rows.into_iter().map(HealthcareProvider::from).collect())
        })
        .await
    }

    async fn provider_by_id(&self, family_id: &str, provider_id: &str) -> StoreResult<Option<HealthcareProvider>> {
        let (Some(family_id), Some(provider_id)) = (parse_id(family_id), parse_id(provider_id)) else {
            return Ok(None);
        };
        self.bounded(async {
            let sql = format!("SELECT {PROVIDER_COLUMNS} FROM healthcare_providers WHERE id = $1 AND family_id = $2");
            let row = sqlx::query_as::<_, ProviderRow>(&sql)
                .bind(provider_id)
                .bind(family_id)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row.map(HealthcareProvider::from))
        })
        .await
    }

    async fn insert_provider(&self, family_id: &str, provider: NewProvider) -> StoreResult<HealthcareProvider> {
        let family_id = required_id(family_id)?;
        let member_ids = parse_references(&provider.family_member_ids)?;
        self.bounded(async {
            let sql = format!(
                "INSERT INTO healthcare_providers (id, family_id, provider_name, portal_url, specialty, \
                 family_member_ids, login_username, notes, auto_detected, quick_add_data, \
                 created_at, updated_at, created_by) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW(), NOW(), $11) \
                 RETURNING {PROVIDER_COLUMNS}"
            );
            let row = sqlx::query_as::<_, ProviderRow>(&sql)
                .bind(new_id())
                .bind(family_id)
                .bind(provider.provider_name)
                .bind(provider.portal_url)
                .bind(provider.specialty.as_str())
                .bind(member_ids)
                .bind(provider.login_username)
                .bind(provider.notes)
                .bind(provider.auto_detected)
                .bind(provider.quick_add_data.map(Json))
                .bind(provider.created_by)
                .fetch_one(&self.pool)
                .await?;
            Ok(HealthcareProvider::from(row))
        })
        .await
    }

    async fn update_provider(
        &self,
        family_id: &str,
        provider_id: &str,
        changes: ProviderChanges,
    ) -> StoreResult<Option<HealthcareProvider>> {
        let (Some(family_id), Some(provider_id)) = (parse_id(family_id), parse_id(provider_id)) else {
            return Ok(None);
        };
        let member_ids = changes
            .family_member_ids
            .as_deref()
            .map(parse_references)
            .transpose()?;
        self.bounded(async {
            let mut qb = QueryBuilder::<Postgres>::new("UPDATE healthcare_providers SET updated_at = NOW()");
            if let Some(name) = changes.provider_name {
                qb.push(", provider_name = ").push_bind(name);
            }
            if let Some(url) = changes.portal_url {
                qb.push(", portal_url = ").push_bind(url);
            }
            if let Some(specialty) = changes.specialty {
                qb.push(", specialty = ").push_bind(specialty.as_str());
            }
            if let Some(ids) = member_ids {
                qb.push(", family_member_ids = ").push_bind(ids);
            }
            if let Some(username) = changes.login_username {
                qb.push(", login_username = ").push_bind(username);
            }
            if let Some(notes) = changes.notes {
                qb.push(", notes = ").push_bind(notes);
            }
            if let Some(auto_detected) = changes.auto_detected {
                qb.push(", auto_detected = ").push_bind(auto_detected);
            }
            if let Some(quick_add) = changes.quick_add_data {
                qb.push(", quick_add_data = ").push_bind(Json(quick_add));
            }
            qb.push(" WHERE id = ").push_bind(provider_id);
            qb.push(" AND family_id = ").push_bind(family_id);
            qb.push(" RETURNING ").push(PROVIDER_COLUMNS);

            let row = qb.build_query_as::<ProviderRow>().fetch_optional(&self.pool).await?;
            Ok(row.map(HealthcareProvider::from))
        })
        .await
    }

    async fn delete_provider(&self, family_id: &str, provider_id: &str) -> StoreResult<bool> {
        let (Some(family_id), Some(provider_id)) = (parse_id(family_id), parse_id(provider_id)) else {
            return Ok(false);
        };
        self.bounded(async {
            let deleted = sqlx::query("DELETE FROM healthcare_providers WHERE id = $1 AND family_id = $2")
                .bind(provider_id)
                .bind(family_id)
                .execute(&self.pool)
                .await?
                .rows_affected();
            Ok(deleted > 0)
        })
        .await
    }

    async fn mark_provider_used(&self, family_id: &str, provider_id: &str) -> StoreResult<Option<HealthcareProvider>> {
        let (Some(family_id), Some(provider_id)) = (parse_id(family_id), parse_id(provider_id)) else {
            return Ok(None);
        };
        self.bounded(async {
            let sql = format!(
                "UPDATE healthcare_providers SET last_used = NOW(), updated_at = NOW() \
                 WHERE id = $1 AND family_id = $2 RETURNING {PROVIDER_COLUMNS}"
            );
            let row = sqlx::query_as::<_, ProviderRow>(&sql)
                .bind(provider_id)
                .bind(family_id)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row.map(HealthcareProvider::from))
        })
        .await
    }

    async fn list_todos(&self, family_id: &str) -> StoreResult<Vec<Todo>> {
        let Some(family_id) = parse_id(family_id) else {
            return Ok(Vec::new());
        };
        self.bounded(async {
            let sql = format!("SELECT {TODO_COLUMNS} FROM todos WHERE family_id = $1 ORDER BY created_at DESC");
            let rows = sqlx::query_as::<_, TodoRow>(&sql)
                .bind(family_id)
                .fetch_all(&self.pool)
                .await?;
            Ok(rows.into_iter().map(Todo::from).collect())
        })
        .await
    }

    async fn active_todo_count(&self, family_id: &str) -> StoreResult<i64> {
        let Some(family_id) = parse_id(family_id) else {
            return Ok(0);
        };
        self.bounded(async {
            let count: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM todos WHERE family_id = $1 AND NOT completed")
                    .bind(family_id)
                    .fetch_one(&self.pool)
                    .await?;
            Ok(count)
        })
        .await
    }

    async fn todo_by_id(&self, family_id: &str, todo_id: &str) -> StoreResult<Option<Todo>> {
        let (Some(family_id), Some(todo_id)) = (parse_id(family_id), parse_id(todo_id)) else {
            return Ok(None);
        };
        self.bounded(async {
            let sql = format!("SELECT {TODO_COLUMNS} FROM todos WHERE id = $1 AND family_id = $2");
            let row = sqlx::query_as::<_, TodoRow>(&sql)
                .bind(todo_id)
                .bind(family_id)
                .fetch_optional(&self.pool)
                .await?;
            Ok(row.map(Todo::from))
        })
        .await
    }

    async fn insert_todo(&self, family_id: &str, todo: NewTodo) -> StoreResult<Todo> {
        let family_id = required_id(family_id)?;
        let assigned = parse_references(&todo.assigned_member_ids)?;
        self.bounded(async {
            let sql = format!(
                "INSERT INTO todos (id, family_id, description, assigned_member_ids, completed, created_at, updated_at) \
                 VALUES ($1, $2, $3, $4, FALSE, NOW(), NOW()) RETURNING {TODO_COLUMNS}"
            );
            let row = sqlx::query_as::<_, TodoRow>(&sql)
                .bind(new_id())
                .bind(family_id)
                .bind(todo.description)
                .bind(assigned)
                .fetch_one(&self.pool)
                .await?;
            Ok(Todo::from(row))
        })
        .await
    }

    async fn update_todo(&self, family_id: &str, todo_id: &str, update: &TodoUpdate) -> StoreResult<Option<Todo>> {
        let (Some(family_id), Some(todo_id)) = (parse_id(family_id), parse_id(todo_id)) else {
            return Ok(None);
        };
        let assigned = update
            .assigned_member_ids
            .as_deref()
            .map(parse_references)
            .transpose()?;
        self.bounded(async {
            let mut qb = QueryBuilder::<Postgres>::new("UPDATE todos SET updated_at = NOW()");
            if let Some(description) = &update.description {
                qb.push(", description = ").push_bind(description.clone());
            }
            if let Some(ids) = assigned {
                qb.push(", assigned_member_ids = ").push_bind(ids);
            }
            qb.push(" WHERE id = ").push_bind(todo_id);
            qb.push(" AND family_id = ").push_bind(family_id);
            qb.push(" RETURNING ").push(TODO_COLUMNS);

            let row = qb.build_query_as::<TodoRow>().fetch_optional(&self.pool).await?;
            Ok(row.map(Todo::from))
        })
        .await
    }

    async fn complete_todo(&self, family_id: &str, todo_id: &str) -> StoreResult<Option<Todo>> {
        let (Some(family_uuid), Some(todo_uuid)) = (parse_id(family_id), parse_id(todo_id)) else {
            return Ok(None);
        };
        let completed = self
            .bounded(async {
                let sql = format!(
                    "UPDATE todos SET completed = TRUE, completed_at = NOW(), updated_at = NOW() \
                     WHERE id = $1 AND family_id = $2 AND NOT completed RETURNING {TODO_COLUMNS}"
                );
                let row = sqlx::query_as::<_, TodoRow>(&sql)
                    .bind(todo_uuid)
                    .bind(family_uuid)
                    .fetch_optional(&self.pool)
                    .await?;
                Ok(row.map(Todo::from))
            })
            .await?;

        match completed {
            Some(todo) => Ok(Some(todo)),
            None => self.todo_by_id(family_id, todo_id).await,
        }
    }

    async fn delete_todo(&self, family_id: &str, todo_id: &str) -> StoreResult<bool> {
        let (Some(family_id), Some(todo_id)) = (parse_id(family_id), parse_id(todo_id)) else {
            return Ok(false);
        };
        self.bounded(async {
            let deleted = sqlx::query("DELETE FROM todos WHERE id = $1 AND family_id = $2")
                .bind(todo_id)
                .bind(family_id)
                .execute(&self.pool)
                .await?
                .rows_affected();
            Ok(deleted > 0)
        })
        .await
    }
}
