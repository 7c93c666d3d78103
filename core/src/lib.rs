pub mod db;
pub mod evolution;
pub mod models;
pub mod pokeapi;
pub mod service;
