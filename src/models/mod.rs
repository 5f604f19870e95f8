//! Domain model module declarations.

pub mod action_item;
pub mod agenda;
pub mod meeting;
pub mod turn;
