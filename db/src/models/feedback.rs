// db/models/feedback.rs
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::entity::prelude::*;
use sea_orm::{PaginatorTrait, QueryOrder};
use serde::{Deserialize, Serialize};

/// One generated feedback message, as sent to a student.
///
/// Rows are only ever inserted; the table is an audit trail.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "feedbacks")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub email: String,
    pub physics: i64,
    pub chemistry: i64,
    pub maths: i64,
    pub cs: i64,
    pub english: i64,
    #[sea_orm(column_type = "Text")]
    pub feedback: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Insert payload for [`Model::create`].
#[derive(Debug, Clone)]
pub struct NewFeedback {
    pub name: String,
    pub email: String,
    pub physics: i64,
    pub chemistry: i64,
    pub maths: i64,
    pub cs: i64,
    pub english: i64,
    pub feedback: String,
}

impl Model {
    pub async fn create(db: &DatabaseConnection, new: NewFeedback) -> Result<Self, DbErr> {
        let active_model = ActiveModel {
            id: NotSet,
            name: Set(new.name),
            email: Set(new.email),
            physics: Set(new.physics),
            chemistry: Set(new.chemistry),
            maths: Set(new.maths),
            cs: Set(new.cs),
            english: Set(new.english),
            feedback: Set(new.feedback),
        };
        active_model.insert(db).await
    }

    /// All stored feedback, newest first.
    pub async fn find_all(db: &DatabaseConnection) -> Result<Vec<Self>, DbErr> {
        Entity::find().order_by_desc(Column::Id).all(db).await
    }

    pub async fn find_by_email(db: &DatabaseConnection, email: &str) -> Result<Vec<Self>, DbErr> {
        Entity::find()
            .filter(Column::Email.eq(email))
            .order_by_desc(Column::Id)
            .all(db)
            .await
    }

    pub async fn count(db: &DatabaseConnection) -> Result<u64, DbErr> {
        Entity::find().count(db).await
    }
}
