pub mod accounts;
pub mod calculate;
pub mod claims;
pub mod crossings;
pub mod rewards;
pub mod unclaimed;
