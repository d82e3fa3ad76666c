// src/kanban.rs

pub mod board;

pub use board::{BoardColumn, BoardMode, BoardView, CardClick, DropOutcome, KanbanBoard};
