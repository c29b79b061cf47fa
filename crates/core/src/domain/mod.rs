pub mod call;
pub mod row;
