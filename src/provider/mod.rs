pub use self::{
    client::Client,
    database::DatabasePool,
    datastore::{
        fetch_json, fetch_json_optional, store_json, Datastore,
        MemoryDatastore, StoredRecord,
    },
    grpc::Grpc,
};

mod client;
mod database;
mod datastore;
mod grpc;
