#![allow(dead_code)]

pub mod stock;
