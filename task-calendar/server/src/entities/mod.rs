//! `SeaORM` entities for the task store.

pub mod task;
