use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "provider_cache")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub provider: String,
    pub name: String,
    pub season: i32,
    /// `|`-delimited episode numbers, e.g. `|1|2|`
    pub episodes: String,
    pub show_id: i64,
    #[sea_orm(column_type = "Text")]
    pub url: String,
    /// Unix seconds
    pub time: i64,
    pub quality: i32,
    pub release_group: String,
    pub version: i32,
    pub seeders: i64,
    pub leechers: i64,
    pub size: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
