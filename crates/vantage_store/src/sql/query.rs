//constants

const INSERT_CACHE_INDEX: &str = include_str!("scripts/insert_cache_index.sql");
const GET_CACHE_ENTRY: &str = include_str!("scripts/get_cache_entry.sql");
const GET_CACHE_INDEX: &str = include_str!("scripts/get_cache_index.sql");
const INSERT_PROFILE_COLUMN: &str = include_str!("scripts/insert_profile_column.sql");
const INSERT_DRIFT_COLUMN: &str = include_str!("scripts/insert_drift_column.sql");
const INSERT_FAIRNESS_GROUP: &str = include_str!("scripts/insert_fairness_group.sql");
const DELETE_CACHE_INDEX: &str = include_str!("scripts/delete_cache_index.sql");
const DELETE_PROFILES: &str = include_str!("scripts/delete_profiles.sql");
const DELETE_DRIFT: &str = include_str!("scripts/delete_drift.sql");
const DELETE_FAIRNESS: &str = include_str!("scripts/delete_fairness.sql");

pub enum Queries {
    InsertCacheIndex,
    GetCacheEntry,
    GetCacheIndex,
    InsertProfileColumn,
    InsertDriftColumn,
    InsertFairnessGroup,
    DeleteCacheIndex,
    DeleteProfiles,
    DeleteDrift,
    DeleteFairness,
}

impl Queries {
    pub fn get_query(&self) -> SqlQuery {
        match self {
            // load sql file from scripts/
            Queries::InsertCacheIndex => SqlQuery::new(INSERT_CACHE_INDEX),
            Queries::GetCacheEntry => SqlQuery::new(GET_CACHE_ENTRY),
            Queries::GetCacheIndex => SqlQuery::new(GET_CACHE_INDEX),
            Queries::InsertProfileColumn => SqlQuery::new(INSERT_PROFILE_COLUMN),
            Queries::InsertDriftColumn => SqlQuery::new(INSERT_DRIFT_COLUMN),
            Queries::InsertFairnessGroup => SqlQuery::new(INSERT_FAIRNESS_GROUP),
            Queries::DeleteCacheIndex => SqlQuery::new(DELETE_CACHE_INDEX),
            Queries::DeleteProfiles => SqlQuery::new(DELETE_PROFILES),
            Queries::DeleteDrift => SqlQuery::new(DELETE_DRIFT),
            Queries::DeleteFairness => SqlQuery::new(DELETE_FAIRNESS),
        }
    }
}

pub struct SqlQuery {
    pub sql: String,
}

impl SqlQuery {
    fn new(sql: &str) -> Self {
        Self {
            sql: sql.to_string(),
        }
    }
}
