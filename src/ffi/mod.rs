//! Native-layout bindings to wgpu-native structs
//!
//! These are generated during build time from build_support/structs.json and
//! checked against the native header. Fields are private; every read and
//! write goes through the generated accessors.

#![allow(non_upper_case_globals)]
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
#![allow(clippy::all)]

// Include the generated bindings
include!(concat!(env!("OUT_DIR"), "/bindings.rs"));

/// Header the bindings were compiled against.
pub const HEADER_PATH: &str = env!("WGPUJ_HEADER_PATH");

/// An enumerated tag outside its closed set of values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("{value} is not a valid {enum_name} tag")]
pub struct UnknownTag {
    pub enum_name: &'static str,
    pub value: u32,
}
