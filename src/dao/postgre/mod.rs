pub use self::types::{DataBase, PoolOption, PoolType, QueryResult};

mod record;
mod types;
