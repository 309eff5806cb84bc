use sea_orm::entity::prelude::*;

/// Server-side copy of the currently issued QR token for a session.
///
/// Verification itself is stateless; this row exists so stopping a session
/// (or reissuing) revokes the outstanding token. The session id is the
/// primary key, so at most one token is live per session.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, serde::Serialize)]
#[sea_orm(table_name = "active_qr_tokens")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub session_id: i64,
    pub course_id: i64,
    pub faculty_id: i64,
    /// Milliseconds since the Unix epoch, matching the QR payload fields.
    pub issued_at: i64,
    pub expires_at: i64,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_m: f64,
    pub signature: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::attendance_session::Entity",
        from = "Column::SessionId",
        to = "super::attendance_session::Column::Id"
    )]
    Session,
}

impl Related<super::attendance_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Session.def()
    }
    fn via() -> Option<RelationDef> {
        None
    }
}

impl ActiveModelBehavior for ActiveModel {}
