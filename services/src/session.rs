//! Attendance-session lifecycle: start, stop, QR reissue.
//!
//! A session moves `active -> stopped` and the transition is terminal. There
//! is no expiry sweep: a stale token self-invalidates at verification time,
//! and stopping a session deletes its stored token so the payload is also
//! revoked server-side.

use chrono::{DateTime, Utc};
use common::config::AppConfig;
use db::models::{active_qr_token, attendance_session, course};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set, TransactionTrait,
};
use tracing::info;

use crate::error::AppError;
use crate::geo;
use crate::qr_token::{Geofence, QrToken, TokenSigner};

#[derive(Debug, Clone)]
pub struct StartSession {
    pub title: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Defaults to the configured geofence radius (50 m).
    pub radius_m: Option<f64>,
    /// Defaults to the configured QR validity window (300 s).
    pub validity_seconds: Option<i64>,
}

pub struct SessionService;

impl SessionService {
    pub async fn start(
        db: &DatabaseConnection,
        signer: &TokenSigner,
        faculty_id: i64,
        course_id: i64,
        params: StartSession,
        now: DateTime<Utc>,
    ) -> Result<(attendance_session::Model, QrToken), AppError> {
        if params.title.trim().is_empty() {
            return Err(AppError::Validation("title must not be empty".into()));
        }
        if !geo::coordinates_in_range(params.latitude, params.longitude) {
            return Err(AppError::Validation(
                "geofence center must be a valid coordinate pair".into(),
            ));
        }
        let radius_m = params
            .radius_m
            .unwrap_or_else(|| AppConfig::global().geofence_default_radius_m);
        if !radius_m.is_finite() || radius_m <= 0.0 {
            return Err(AppError::Validation(
                "geofence radius must be a positive number of meters".into(),
            ));
        }
        let validity_seconds = params
            .validity_seconds
            .unwrap_or_else(|| AppConfig::global().qr_validity_seconds);
        if validity_seconds <= 0 {
            return Err(AppError::Validation(
                "validity window must be a positive number of seconds".into(),
            ));
        }

        let course = course::Entity::find_by_id(course_id)
            .one(db)
            .await?
            .ok_or(AppError::NotFound("course"))?;
        if course.faculty_id != faculty_id {
            return Err(AppError::Forbidden(
                "only the course owner may start a session".into(),
            ));
        }
        if !course.active {
            return Err(AppError::Validation("course is not active".into()));
        }

        let txn = db.begin().await?;

        let session = attendance_session::ActiveModel {
            course_id: Set(course_id),
            faculty_id: Set(faculty_id),
            title: Set(params.title.trim().to_owned()),
            latitude: Set(params.latitude),
            longitude: Set(params.longitude),
            radius_m: Set(radius_m),
            active: Set(true),
            present_count: Set(0),
            started_at: Set(now),
            ended_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let token = signer.issue(
            session.id,
            course_id,
            faculty_id,
            Some(Geofence {
                lat: session.latitude,
                lon: session.longitude,
                radius_m: session.radius_m,
            }),
            validity_seconds,
            now,
        );
        persist_token(&txn, &token, &session).await?;

        txn.commit().await?;

        info!(session_id = session.id, course_id, "attendance session started");
        Ok((session, token))
    }

    pub async fn stop(
        db: &DatabaseConnection,
        faculty_id: i64,
        session_id: i64,
        now: DateTime<Utc>,
    ) -> Result<attendance_session::Model, AppError> {
        let session = owned_session(db, faculty_id, session_id).await?;
        if !session.active {
            return Err(AppError::Validation("session is already stopped".into()));
        }

        let txn = db.begin().await?;

        // Revoke the outstanding token; scans against it now fail as expired.
        active_qr_token::Entity::delete_by_id(session_id)
            .exec(&txn)
            .await?;

        let mut active: attendance_session::ActiveModel = session.into();
        active.active = Set(false);
        active.ended_at = Set(Some(now));
        active.updated_at = Set(now);
        let stopped = active.update(&txn).await?;

        txn.commit().await?;

        info!(session_id, "attendance session stopped");
        Ok(stopped)
    }

    /// Issues a fresh token for an active session, replacing the stored copy.
    /// The previous payload keeps a valid MAC until it expires, but the scan
    /// path checks the stored copy, so it is dead the moment this commits.
    pub async fn reissue_qr(
        db: &DatabaseConnection,
        signer: &TokenSigner,
        faculty_id: i64,
        session_id: i64,
        validity_seconds: Option<i64>,
        now: DateTime<Utc>,
    ) -> Result<QrToken, AppError> {
        let session = owned_session(db, faculty_id, session_id).await?;
        if !session.active {
            return Err(AppError::Validation("session is not active".into()));
        }
        let validity_seconds =
            validity_seconds.unwrap_or_else(|| AppConfig::global().qr_validity_seconds);
        if validity_seconds <= 0 {
            return Err(AppError::Validation(
                "validity window must be a positive number of seconds".into(),
            ));
        }

        let token = signer.issue(
            session.id,
            session.course_id,
            session.faculty_id,
            Some(Geofence {
                lat: session.latitude,
                lon: session.longitude,
                radius_m: session.radius_m,
            }),
            validity_seconds,
            now,
        );

        let txn = db.begin().await?;
        persist_token(&txn, &token, &session).await?;
        txn.commit().await?;

        Ok(token)
    }
}

/// Loads a session and enforces that the caller owns it.
pub(crate) async fn owned_session(
    db: &DatabaseConnection,
    faculty_id: i64,
    session_id: i64,
) -> Result<attendance_session::Model, AppError> {
    let session = attendance_session::Entity::find_by_id(session_id)
        .one(db)
        .await?
        .ok_or(AppError::NotFound("session"))?;
    if session.faculty_id != faculty_id {
        return Err(AppError::Forbidden(
            "only the session owner may manage it".into(),
        ));
    }
    Ok(session)
}

/// Replaces the stored token for a session. The session id is the table's
/// primary key, so delete-then-insert leaves exactly one live copy.
async fn persist_token<C: ConnectionTrait>(
    conn: &C,
    token: &QrToken,
    session: &attendance_session::Model,
) -> Result<(), AppError> {
    active_qr_token::Entity::delete_by_id(token.session_id)
        .exec(conn)
        .await?;

    active_qr_token::ActiveModel {
        session_id: Set(token.session_id),
        course_id: Set(token.course_id),
        faculty_id: Set(token.faculty_id),
        issued_at: Set(token.issued_at),
        expires_at: Set(token.expires_at),
        latitude: Set(session.latitude),
        longitude: Set(session.longitude),
        radius_m: Set(session.radius_m),
        signature: Set(token.signature.clone()),
    }
    .insert(conn)
    .await?;

    Ok(())
}

/// Loads the stored token copy for a session, if any.
pub(crate) async fn stored_token(
    db: &DatabaseConnection,
    session_id: i64,
) -> Result<Option<active_qr_token::Model>, AppError> {
    Ok(active_qr_token::Entity::find()
        .filter(active_qr_token::Column::SessionId.eq(session_id))
        .one(db)
        .await?)
}
