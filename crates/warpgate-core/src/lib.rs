#![forbid(unsafe_code)]

//! Core: input events, animation primitives, and the warp speed curve.

pub mod animation;
pub mod event;
pub mod warp;
