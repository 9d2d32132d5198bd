#![allow(clippy::enum_variant_names)]

pub mod services;
pub mod snapshot;
