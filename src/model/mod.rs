pub use self::{
    record::{Record, RecordType},
    table::Table,
};

mod record;
mod table;
