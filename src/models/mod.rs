pub mod rows;
pub mod schema;
