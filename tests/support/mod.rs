#![allow(dead_code)]

pub mod invoices;
pub mod order_server;
pub mod port;
pub mod wait;
