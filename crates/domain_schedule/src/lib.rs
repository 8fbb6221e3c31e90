pub mod config;
pub mod di;
pub mod dto;
pub mod id;
pub mod ruz_api;
pub mod schedule;
pub mod time;
pub mod usecases;
pub mod view;
