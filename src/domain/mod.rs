pub mod entities;
pub mod resolver;
pub mod value_objects;
