#![allow(dead_code)]

pub mod input_builder;
pub mod mock_ops;
