//! wgpuj - native-layout struct bindings for wgpu-native
//!
//! Each struct of the native header is generated at build time as a
//! `#[repr(C)]` type with private fields and plain accessors:
//!
//! - `T::create_heap()` returns a zeroed value. Values move, so they are for
//!   building and inspecting data on the Rust side.
//! - `T::create_direct()` returns a [`Direct`] allocation whose address is
//!   stable until it is dropped; that pointer is what native calls receive.
//!
//! Layouts are asserted at compile time against the struct IDL and can be
//! checked against the compiled native header with [`ffi::verify_all`].

mod convert;
mod direct;
pub mod ffi;
pub mod layout;

pub use direct::{AllocError, Direct, DirectArray};
pub use ffi::{
    LoadOp, StoreOp, UnknownTag, WGPUColor, WGPUExtent3d, WGPULoadOp, WGPUOrigin3d,
    WGPUPassChannel_Color, WGPUPassChannel_f32, WGPUPassChannel_u32, WGPUStoreOp,
};
pub use layout::{LayoutError, NativeStruct};
