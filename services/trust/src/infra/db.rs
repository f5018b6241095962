use anyhow::Context as _;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, SqlErr, TransactionError, TransactionTrait,
    sea_query::Expr,
};
use uuid::Uuid;

use warden_domain::device::{DeviceStatus, Fingerprint};
use warden_domain::id::{DeviceId, SessionId, UserId};
use warden_domain::pagination::PageRequest;
use warden_domain::session::SessionStatus;
use warden_trust_schema::{devices, sessions, step_up_codes};

use crate::domain::repository::{CodeRepository, DeviceRepository, SessionRepository};
use crate::domain::types::{Device, Session, SessionTransition, StepUpCode};
use crate::error::TrustServiceError;

// ── Device repository ────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbDeviceRepository {
    pub db: DatabaseConnection,
}

impl DeviceRepository for DbDeviceRepository {
    async fn find(&self, id: DeviceId) -> Result<Option<Device>, TrustServiceError> {
        let model = devices::Entity::find()
            .filter(devices::Column::Uuid.eq(id.0))
            .one(&self.db)
            .await
            .context("find device")?;
        model.map(device_from_model).transpose()
    }

    async fn list_by_user(&self, user_id: UserId) -> Result<Vec<Device>, TrustServiceError> {
        let models = devices::Entity::find()
            .filter(devices::Column::UserId.eq(user_id.0))
            .order_by_desc(devices::Column::CreatedAt)
            .all(&self.db)
            .await
            .context("list devices by user")?;
        models.into_iter().map(device_from_model).collect()
    }

    async fn create(&self, device: &Device) -> Result<(), TrustServiceError> {
        let fp = &device.fingerprint;
        devices::ActiveModel {
            uuid: Set(device.id.0),
            user_id: Set(device.user_id.0),
            status: Set(device.status.as_str().to_owned()),
            browser: Set(fp.browser.clone()),
            browser_version: Set(fp.browser_version.clone()),
            platform: Set(fp.platform.clone()),
            platform_version: Set(fp.platform_version.clone()),
            device: Set(fp.device.clone()),
            device_type: Set(fp.device_type.clone()),
            mobile: Set(fp.mobile),
            robot: Set(fp.robot),
            ip: Set(fp.ip.clone()),
            source: Set(fp.source.clone()),
            created_at: Set(device.created_at),
            updated_at: Set(device.updated_at),
            verified_at: Set(device.verified_at),
            hijacked_at: Set(device.hijacked_at),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .context("create device")?;
        Ok(())
    }

    async fn transition(
        &self,
        id: DeviceId,
        from: DeviceStatus,
        to: DeviceStatus,
        at: DateTime<Utc>,
    ) -> Result<bool, TrustServiceError> {
        let mut update = devices::Entity::update_many()
            .col_expr(devices::Column::Status, Expr::value(to.as_str()))
            .col_expr(devices::Column::UpdatedAt, Expr::value(at));
        update = match to {
            DeviceStatus::Verified => {
                update.col_expr(devices::Column::VerifiedAt, Expr::value(Some(at)))
            }
            DeviceStatus::Hijacked => {
                update.col_expr(devices::Column::HijackedAt, Expr::value(Some(at)))
            }
            DeviceStatus::Active => update,
        };
        let result = update
            .filter(devices::Column::Uuid.eq(id.0))
            .filter(devices::Column::Status.eq(from.as_str()))
            .exec(&self.db)
            .await
            .context("transition device")?;
        Ok(result.rows_affected == 1)
    }

    async fn delete(&self, id: DeviceId) -> Result<bool, TrustServiceError> {
        let result = devices::Entity::delete_many()
            .filter(devices::Column::Uuid.eq(id.0))
            .exec(&self.db)
            .await
            .context("delete device")?;
        Ok(result.rows_affected > 0)
    }
}

fn device_from_model(model: devices::Model) -> Result<Device, TrustServiceError> {
    let status = model
        .status
        .parse::<DeviceStatus>()
        .context("decode device status")?;
    Ok(Device {
        id: DeviceId(model.uuid),
        user_id: UserId(model.user_id),
        status,
        fingerprint: Fingerprint {
            browser: model.browser,
            browser_version: model.browser_version,
            platform: model.platform,
            platform_version: model.platform_version,
            device: model.device,
            device_type: model.device_type,
            mobile: model.mobile,
            robot: model.robot,
            ip: model.ip,
            source: model.source,
        },
        created_at: model.created_at,
        updated_at: model.updated_at,
        verified_at: model.verified_at,
        hijacked_at: model.hijacked_at,
    })
}

// ── Session repository ───────────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbSessionRepository {
    pub db: DatabaseConnection,
}

impl SessionRepository for DbSessionRepository {
    async fn find(&self, id: SessionId) -> Result<Option<Session>, TrustServiceError> {
        let model = sessions::Entity::find()
            .filter(sessions::Column::Uuid.eq(id.0))
            .one(&self.db)
            .await
            .context("find session")?;
        model.map(session_from_model).transpose()
    }

    async fn list_by_user(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> Result<Vec<Session>, TrustServiceError> {
        let models = sessions::Entity::find()
            .filter(sessions::Column::UserId.eq(user_id.0))
            .order_by_desc(sessions::Column::CreatedAt)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .context("list sessions by user")?;
        models.into_iter().map(session_from_model).collect()
    }

    async fn list_by_device(&self, device_id: DeviceId) -> Result<Vec<Session>, TrustServiceError> {
        let models = sessions::Entity::find()
            .filter(sessions::Column::DeviceUuid.eq(device_id.0))
            .order_by_desc(sessions::Column::CreatedAt)
            .all(&self.db)
            .await
            .context("list sessions by device")?;
        models.into_iter().map(session_from_model).collect()
    }

    async fn find_open(
        &self,
        device_id: DeviceId,
        user_id: UserId,
    ) -> Result<Option<Session>, TrustServiceError> {
        let model = sessions::Entity::find()
            .filter(sessions::Column::DeviceUuid.eq(device_id.0))
            .filter(sessions::Column::UserId.eq(user_id.0))
            .filter(sessions::Column::Status.ne(SessionStatus::Finished.as_str()))
            .order_by_desc(sessions::Column::CreatedAt)
            .one(&self.db)
            .await
            .context("find open session")?;
        model.map(session_from_model).transpose()
    }

    async fn create(&self, session: &Session) -> Result<(), TrustServiceError> {
        sessions::ActiveModel {
            uuid: Set(session.id.0),
            device_uuid: Set(session.device_id.0),
            user_id: Set(session.user_id.0),
            status: Set(session.status.as_str().to_owned()),
            created_at: Set(session.created_at),
            last_activity_at: Set(session.last_activity_at),
            finished_at: Set(session.finished_at),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .context("create session")?;
        Ok(())
    }

    async fn touch(&self, id: SessionId, at: DateTime<Utc>) -> Result<bool, TrustServiceError> {
        let result = sessions::Entity::update_many()
            .col_expr(sessions::Column::LastActivityAt, Expr::value(at))
            .filter(sessions::Column::Uuid.eq(id.0))
            .filter(sessions::Column::Status.eq(SessionStatus::Active.as_str()))
            .exec(&self.db)
            .await
            .context("touch session")?;
        Ok(result.rows_affected == 1)
    }

    async fn transition(&self, transition: &SessionTransition) -> Result<bool, TrustServiceError> {
        let won = self
            .db
            .transaction::<_, bool, DbErr>(|txn| {
                let t = transition.clone();
                Box::pin(async move {
                    let mut update = sessions::Entity::update_many()
                        .col_expr(sessions::Column::Status, Expr::value(t.to.as_str()));
                    if t.to == SessionStatus::Finished {
                        update = update.col_expr(sessions::Column::FinishedAt, Expr::value(Some(t.at)));
                    }
                    if t.to == SessionStatus::Active {
                        update = update.col_expr(sessions::Column::LastActivityAt, Expr::value(t.at));
                    }
                    let result = update
                        .filter(sessions::Column::Uuid.eq(t.id.0))
                        .filter(sessions::Column::Status.eq(t.from.as_str()))
                        .exec(txn)
                        .await?;
                    if result.rows_affected == 0 {
                        return Ok(false);
                    }
                    if t.revoke_codes {
                        revoke_codes(txn, &[t.id.0], t.at).await?;
                    }
                    Ok(true)
                })
            })
            .await
            .context("transition session")?;
        Ok(won)
    }

    async fn finish_all_for_device(
        &self,
        device_id: DeviceId,
        at: DateTime<Utc>,
    ) -> Result<Vec<Session>, TrustServiceError> {
        let models = self
            .db
            .transaction::<_, Vec<sessions::Model>, DbErr>(move |txn| {
                Box::pin(async move {
                    let models = sessions::Entity::find()
                        .filter(sessions::Column::DeviceUuid.eq(device_id.0))
                        .filter(sessions::Column::Status.ne(SessionStatus::Finished.as_str()))
                        .lock_exclusive()
                        .all(txn)
                        .await?;
                    if models.is_empty() {
                        return Ok(models);
                    }
                    let ids: Vec<Uuid> = models.iter().map(|m| m.uuid).collect();
                    sessions::Entity::update_many()
                        .col_expr(
                            sessions::Column::Status,
                            Expr::value(SessionStatus::Finished.as_str()),
                        )
                        .col_expr(sessions::Column::FinishedAt, Expr::value(Some(at)))
                        .filter(sessions::Column::Uuid.is_in(ids.clone()))
                        .exec(txn)
                        .await?;
                    revoke_codes(txn, &ids, at).await?;
                    Ok(models)
                })
            })
            .await
            .context("finish device sessions")?;

        models
            .into_iter()
            .map(|m| Ok(session_from_model(m)?.moved_to(SessionStatus::Finished, at)))
            .collect()
    }
}

fn session_from_model(model: sessions::Model) -> Result<Session, TrustServiceError> {
    let status = model
        .status
        .parse::<SessionStatus>()
        .context("decode session status")?;
    Ok(Session {
        id: SessionId(model.uuid),
        device_id: DeviceId(model.device_uuid),
        user_id: UserId(model.user_id),
        status,
        created_at: model.created_at,
        last_activity_at: model.last_activity_at,
        finished_at: model.finished_at,
    })
}

// ── Step-up code repository ──────────────────────────────────────────────────

#[derive(Clone)]
pub struct DbCodeRepository {
    pub db: DatabaseConnection,
}

const REPLACE_ATTEMPTS: usize = 3;

impl DbCodeRepository {
    async fn revoke_and_insert(&self, code: &StepUpCode) -> Result<(), TransactionError<DbErr>> {
        self.db
            .transaction::<_, (), DbErr>(|txn| {
                let code = code.clone();
                Box::pin(async move {
                    revoke_codes(txn, &[code.subject_id], code.issued_at).await?;
                    step_up_codes::ActiveModel {
                        id: Set(code.id),
                        subject_id: Set(code.subject_id),
                        code: Set(code.code),
                        issued_at: Set(code.issued_at),
                        expires_at: Set(code.expires_at),
                        consumed_at: Set(None),
                    }
                    .insert(txn)
                    .await?;
                    Ok(())
                })
            })
            .await
    }
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

impl CodeRepository for DbCodeRepository {
    /// Revokes and inserts in one transaction. Concurrent replaces for one
    /// subject collide on the outstanding-code unique index; the loser
    /// retries and supersedes the winner's code.
    async fn replace(&self, code: &StepUpCode) -> Result<(), TrustServiceError> {
        for _ in 0..REPLACE_ATTEMPTS {
            match self.revoke_and_insert(code).await {
                Err(TransactionError::Transaction(e)) if is_unique_violation(&e) => {
                    tracing::debug!(subject_id = %code.subject_id, "concurrent step-up code replace, retrying");
                }
                result => {
                    result.context("replace step-up code")?;
                    return Ok(());
                }
            }
        }
        Err(TrustServiceError::Internal(anyhow::anyhow!(
            "step-up code replace for {} kept conflicting",
            code.subject_id
        )))
    }

    async fn find_outstanding(
        &self,
        subject_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<Option<StepUpCode>, TrustServiceError> {
        let model = step_up_codes::Entity::find()
            .filter(step_up_codes::Column::SubjectId.eq(subject_id))
            .filter(step_up_codes::Column::ConsumedAt.is_null())
            .filter(step_up_codes::Column::ExpiresAt.gt(now))
            .order_by_desc(step_up_codes::Column::IssuedAt)
            .one(&self.db)
            .await
            .context("find outstanding step-up code")?;
        Ok(model.map(code_from_model))
    }

    async fn consume(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, TrustServiceError> {
        let result = step_up_codes::Entity::update_many()
            .col_expr(step_up_codes::Column::ConsumedAt, Expr::value(Some(at)))
            .filter(step_up_codes::Column::Id.eq(id))
            .filter(step_up_codes::Column::ConsumedAt.is_null())
            .filter(step_up_codes::Column::ExpiresAt.gt(at))
            .exec(&self.db)
            .await
            .context("consume step-up code")?;
        Ok(result.rows_affected == 1)
    }

    async fn consume_all(
        &self,
        subject_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<u64, TrustServiceError> {
        let revoked = revoke_codes(&self.db, &[subject_id], at)
            .await
            .context("revoke step-up codes")?;
        Ok(revoked)
    }
}

async fn revoke_codes<C: ConnectionTrait>(
    conn: &C,
    subject_ids: &[Uuid],
    at: DateTime<Utc>,
) -> Result<u64, DbErr> {
    let result = step_up_codes::Entity::update_many()
        .col_expr(step_up_codes::Column::ConsumedAt, Expr::value(Some(at)))
        .filter(step_up_codes::Column::SubjectId.is_in(subject_ids.to_vec()))
        .filter(step_up_codes::Column::ConsumedAt.is_null())
        .exec(conn)
        .await?;
    Ok(result.rows_affected)
}

fn code_from_model(model: step_up_codes::Model) -> StepUpCode {
    StepUpCode {
        id: model.id,
        subject_id: model.subject_id,
        code: model.code,
        issued_at: model.issued_at,
        expires_at: model.expires_at,
        consumed_at: model.consumed_at,
    }
}
