//! Event check-in server.
//!
//! Kiosks post the QR payload of a ticket to `POST /scan`; the server admits
//! the holder while the ticket still has allowance, counting each admission
//! and logging it as a scan event in the same transaction. Signed-in staff
//! can browse the scan history, per-type tallies and the ticket list.

pub mod config;
pub mod extractors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
pub mod utils;
