//! The moderation capability shared by users, projects and comments.
//!
//! Targets are addressed by a closed set of reference types rather than by
//! open-ended dynamic dispatch. Each model implements `Moderatable` to say how
//! its restriction fields are set and cleared; for users the restriction is a
//! suspension, for projects and comments it is hiding.

use crate::audit::Resource;
use crate::error::{Error, Result};
use crate::orm::{comments, projects, users};
use chrono::NaiveDateTime;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait,
    EntityTrait, QueryFilter,
};
use serde::{Deserialize, Serialize};

/// Anything a user can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum ReportableRef {
    User(i32),
    Project(i32),
    Comment(i32),
}

impl ReportableRef {
    pub fn parse(kind: &str, id: i32) -> Result<Self> {
        match kind {
            "user" => Ok(Self::User(id)),
            "project" => Ok(Self::Project(id)),
            "comment" => Ok(Self::Comment(id)),
            _ => Err(Error::Validation(format!(
                "Invalid reportable type: {}",
                kind
            ))),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::User(_) => "user",
            Self::Project(_) => "project",
            Self::Comment(_) => "comment",
        }
    }

    pub fn id(&self) -> i32 {
        match *self {
            Self::User(id) | Self::Project(id) | Self::Comment(id) => id,
        }
    }

    pub fn resource(&self) -> Resource {
        Resource::new(self.kind(), self.id())
    }

    /// Whether the referenced row exists.
    pub async fn exists<C>(&self, conn: &C) -> Result<bool>
    where
        C: ConnectionTrait,
    {
        let found = match *self {
            Self::User(id) => users::Entity::find_by_id(id).one(conn).await?.is_some(),
            Self::Project(id) => projects::Entity::find_by_id(id).one(conn).await?.is_some(),
            Self::Comment(id) => comments::Entity::find_by_id(id).one(conn).await?.is_some(),
        };
        Ok(found)
    }

    /// Sets the target's `is_reported` flag. Fails with `NotFound` if the row is gone.
    pub async fn set_reported<C>(&self, conn: &C, reported: bool) -> Result<()>
    where
        C: ConnectionTrait,
    {
        let rows = match *self {
            Self::User(id) => {
                users::Entity::update_many()
                    .col_expr(users::Column::IsReported, Expr::value(reported))
                    .filter(users::Column::Id.eq(id))
                    .exec(conn)
                    .await?
                    .rows_affected
            }
            Self::Project(id) => {
                projects::Entity::update_many()
                    .col_expr(projects::Column::IsReported, Expr::value(reported))
                    .filter(projects::Column::Id.eq(id))
                    .exec(conn)
                    .await?
                    .rows_affected
            }
            Self::Comment(id) => {
                comments::Entity::update_many()
                    .col_expr(comments::Column::IsReported, Expr::value(reported))
                    .filter(comments::Column::Id.eq(id))
                    .exec(conn)
                    .await?
                    .rows_affected
            }
        };

        if rows == 0 {
            return Err(Error::NotFound(self.label()));
        }
        Ok(())
    }

    fn label(&self) -> &'static str {
        match self {
            Self::User(_) => "User",
            Self::Project(_) => "Project",
            Self::Comment(_) => "Comment",
        }
    }
}

/// Content that can be hidden. Users are suspended instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum ContentRef {
    Project(i32),
    Comment(i32),
}

impl From<ContentRef> for ReportableRef {
    fn from(content: ContentRef) -> Self {
        match content {
            ContentRef::Project(id) => ReportableRef::Project(id),
            ContentRef::Comment(id) => ReportableRef::Comment(id),
        }
    }
}

/// Restriction fields common to every moderatable model.
pub trait Moderatable: Sized {
    type Entity: EntityTrait<Model = Self>;
    type Active: ActiveModelTrait<Entity = Self::Entity>;

    /// Name used in `NotFound` errors.
    const LABEL: &'static str;
    const ID: <Self::Entity as EntityTrait>::Column;
    /// `is_suspended` for users, `is_hidden` for content.
    const FLAG: <Self::Entity as EntityTrait>::Column;

    fn target(&self) -> ReportableRef;
    /// The user who should hear about moderation of this row.
    fn owner_id(&self) -> i32;
    /// Hidden for content, suspended for users.
    fn is_restricted(&self) -> bool;
    /// Sets the flag together with reason, actor and timestamp.
    fn restrict(self, reason: &str, actor_id: i32, at: NaiveDateTime) -> Self::Active;
    /// Clears the flag together with reason, actor and timestamp.
    fn lift(self) -> Self::Active;
}

/// Loads a moderatable row or fails with `NotFound`.
pub async fn find<M, C>(conn: &C, id: i32) -> Result<M>
where
    M: Moderatable,
    C: ConnectionTrait,
{
    M::Entity::find()
        .filter(M::ID.eq(id))
        .one(conn)
        .await?
        .ok_or(Error::NotFound(M::LABEL))
}

/// Writes `change` only while the row's flag still reads `expected`.
///
/// Returns the updated row, or `None` when the flag had already flipped,
/// e.g. under a concurrent action on the same target.
pub async fn transition<M, C>(
    conn: &C,
    id: i32,
    expected: bool,
    change: M::Active,
) -> Result<Option<M>>
where
    M: Moderatable,
    C: ConnectionTrait,
{
    let updated = M::Entity::update_many()
        .set(change)
        .filter(M::ID.eq(id))
        .filter(M::FLAG.eq(expected))
        .exec(conn)
        .await?;

    if updated.rows_affected == 0 {
        return Ok(None);
    }

    Ok(Some(find(conn, id).await?))
}

impl Moderatable for users::Model {
    type Entity = users::Entity;
    type Active = users::ActiveModel;

    const LABEL: &'static str = "User";
    const ID: users::Column = users::Column::Id;
    const FLAG: users::Column = users::Column::IsSuspended;

    fn target(&self) -> ReportableRef {
        ReportableRef::User(self.id)
    }

    fn owner_id(&self) -> i32 {
        self.id
    }

    fn is_restricted(&self) -> bool {
        self.is_suspended
    }

    fn restrict(self, reason: &str, actor_id: i32, at: NaiveDateTime) -> Self::Active {
        let mut active: users::ActiveModel = self.into();
        active.is_suspended = Set(true);
        active.suspended_reason = Set(Some(reason.to_string()));
        active.suspended_by = Set(Some(actor_id));
        active.suspended_at = Set(Some(at));
        active
    }

    fn lift(self) -> Self::Active {
        let mut active: users::ActiveModel = self.into();
        active.is_suspended = Set(false);
        active.suspended_reason = Set(None);
        active.suspended_by = Set(None);
        active.suspended_at = Set(None);
        active
    }
}

impl Moderatable for projects::Model {
    type Entity = projects::Entity;
    type Active = projects::ActiveModel;

    const LABEL: &'static str = "Project";
    const ID: projects::Column = projects::Column::Id;
    const FLAG: projects::Column = projects::Column::IsHidden;

    fn target(&self) -> ReportableRef {
        ReportableRef::Project(self.id)
    }

    fn owner_id(&self) -> i32 {
        self.owner_id
    }

    fn is_restricted(&self) -> bool {
        self.is_hidden
    }

    fn restrict(self, reason: &str, actor_id: i32, at: NaiveDateTime) -> Self::Active {
        let mut active: projects::ActiveModel = self.into();
        active.is_hidden = Set(true);
        active.hidden_reason = Set(Some(reason.to_string()));
        active.hidden_by = Set(Some(actor_id));
        active.hidden_at = Set(Some(at));
        active
    }

    fn lift(self) -> Self::Active {
        let mut active: projects::ActiveModel = self.into();
        active.is_hidden = Set(false);
        active.hidden_reason = Set(None);
        active.hidden_by = Set(None);
        active.hidden_at = Set(None);
        active
    }
}

impl Moderatable for comments::Model {
    type Entity = comments::Entity;
    type Active = comments::ActiveModel;

    const LABEL: &'static str = "Comment";
    const ID: comments::Column = comments::Column::Id;
    const FLAG: comments::Column = comments::Column::IsHidden;

    fn target(&self) -> ReportableRef {
        ReportableRef::Comment(self.id)
    }

    fn owner_id(&self) -> i32 {
        self.user_id
    }

    fn is_restricted(&self) -> bool {
        self.is_hidden
    }

    fn restrict(self, reason: &str, actor_id: i32, at: NaiveDateTime) -> Self::Active {
        let mut active: comments::ActiveModel = self.into();
        active.is_hidden = Set(true);
        active.hidden_reason = Set(Some(reason.to_string()));
        active.hidden_by = Set(Some(actor_id));
        active.hidden_at = Set(Some(at));
        active
    }

    fn lift(self) -> Self::Active {
        let mut active: comments::ActiveModel = self.into();
        active.is_hidden = Set(false);
        active.hidden_reason = Set(None);
        active.hidden_by = Set(None);
        active.hidden_at = Set(None);
        active
    }
}
