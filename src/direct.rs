//! Direct memory for native structs.
//!
//! A [`Direct`] owns one zeroed struct in its own allocation, so its address
//! stays fixed for as long as the owner lives, however the owner is moved.
//! [`DirectArray`] does the same for a run of contiguous structs. Both free
//! their memory on drop.

use std::alloc::{self, Layout};
use std::fmt;
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::ptr::NonNull;

use crate::layout::NativeStruct;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocError {
    #[error("failed to allocate {size} bytes (align {align}) of direct memory for {name}")]
    OutOfMemory {
        name: &'static str,
        size: usize,
        align: usize,
    },
    #[error("direct array of {len} {name} exceeds the address space")]
    CapacityOverflow { name: &'static str, len: usize },
}

/// One native struct in direct memory.
///
/// Not `Send` or `Sync`: callers serialize access themselves.
pub struct Direct<T: NativeStruct> {
    ptr: NonNull<T>,
    _owns: PhantomData<T>,
}

impl<T: NativeStruct> Direct<T> {
    /// Allocates a zeroed `T`. Zero-sized types own no allocation.
    pub fn new() -> Result<Self, AllocError> {
        let layout = Layout::new::<T>();
        if layout.size() == 0 {
            return Ok(Self {
                ptr: NonNull::dangling(),
                _owns: PhantomData,
            });
        }
        // SAFETY: `layout` is not zero-sized.
        let raw = unsafe { alloc::alloc_zeroed(layout) };
        let ptr = NonNull::new(raw.cast::<T>()).ok_or(AllocError::OutOfMemory {
            name: T::LAYOUT.name,
            size: layout.size(),
            align: layout.align(),
        })?;
        log::trace!("allocated {} at {:p}", T::LAYOUT.name, ptr);
        Ok(Self {
            ptr,
            _owns: PhantomData,
        })
    }

    /// Copies `value` into a new allocation.
    pub fn from_value(value: T) -> Result<Self, AllocError> {
        let mut direct = Self::new()?;
        *direct = value;
        Ok(direct)
    }

    /// Copies the struct out of direct memory.
    pub fn get(&self) -> T {
        **self
    }

    /// Address to hand to native calls. Valid until `self` is dropped.
    pub fn as_ptr(&self) -> *const T {
        self.ptr.as_ptr()
    }

    pub fn as_mut_ptr(&mut self) -> *mut T {
        self.ptr.as_ptr()
    }

    /// Frees the memory now rather than at the end of the scope.
    pub fn release(self) {
        drop(self);
    }
}

impl<T: NativeStruct> Deref for Direct<T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: `ptr` is a live, initialised allocation owned by `self`.
        unsafe { self.ptr.as_ref() }
    }
}

impl<T: NativeStruct> DerefMut for Direct<T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: as above, and `&mut self` guarantees exclusive access.
        unsafe { self.ptr.as_mut() }
    }
}

impl<T: NativeStruct> Drop for Direct<T> {
    fn drop(&mut self) {
        let layout = Layout::new::<T>();
        if layout.size() == 0 {
            return;
        }
        log::trace!("releasing {} at {:p}", T::LAYOUT.name, self.ptr);
        // SAFETY: allocated in `new` with this exact layout; `T: Copy` has no
        // destructor to run.
        unsafe { alloc::dealloc(self.ptr.as_ptr().cast::<u8>(), layout) };
    }
}

impl<T: NativeStruct + fmt::Debug> fmt::Debug for Direct<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Direct").field(&**self).finish()
    }
}

/// A contiguous run of native structs in direct memory.
///
/// An empty array owns no allocation and hands native code a null pointer.
/// Arrays of zero-sized types own no allocation either.
pub struct DirectArray<T: NativeStruct> {
    ptr: NonNull<T>,
    len: usize,
    layout: Layout,
    _owns: PhantomData<T>,
}

impl<T: NativeStruct> DirectArray<T> {
    /// Allocates `len` zeroed structs.
    pub fn new(len: usize) -> Result<Self, AllocError> {
        let layout = Layout::array::<T>(len).map_err(|_| AllocError::CapacityOverflow {
            name: T::LAYOUT.name,
            len,
        })?;
        if layout.size() == 0 {
            return Ok(Self {
                ptr: NonNull::dangling(),
                len,
                layout,
                _owns: PhantomData,
            });
        }

        // SAFETY: `layout` is not zero-sized.
        let raw = unsafe { alloc::alloc_zeroed(layout) };
        let ptr = NonNull::new(raw.cast::<T>()).ok_or(AllocError::OutOfMemory {
            name: T::LAYOUT.name,
            size: layout.size(),
            align: layout.align(),
        })?;
        log::trace!("allocated {} x {} at {:p}", len, T::LAYOUT.name, ptr);
        Ok(Self {
            ptr,
            len,
            layout,
            _owns: PhantomData,
        })
    }

    /// Copies `values` into a new allocation.
    pub fn from_slice(values: &[T]) -> Result<Self, AllocError> {
        let mut array = Self::new(values.len())?;
        array.copy_from_slice(values);
        Ok(array)
    }

    /// Null when empty.
    pub fn as_ptr(&self) -> *const T {
        if self.len == 0 {
            std::ptr::null()
        } else {
            self.ptr.as_ptr()
        }
    }

    /// Null when empty.
    pub fn as_mut_ptr(&mut self) -> *mut T {
        if self.len == 0 {
            std::ptr::null_mut()
        } else {
            self.ptr.as_ptr()
        }
    }
}

impl<T: NativeStruct> Deref for DirectArray<T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        // SAFETY: `len` initialised elements, or a dangling pointer with
        // `len == 0`, which is valid for empty slices.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }
}

impl<T: NativeStruct> DerefMut for DirectArray<T> {
    fn deref_mut(&mut self) -> &mut [T] {
        // SAFETY: as above, and `&mut self` guarantees exclusive access.
        unsafe { std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len) }
    }
}

impl<T: NativeStruct> Drop for DirectArray<T> {
    fn drop(&mut self) {
        if self.layout.size() == 0 {
            return;
        }
        log::trace!("releasing {} x {} at {:p}", self.len, T::LAYOUT.name, self.ptr);
        // SAFETY: allocated in `new` with `self.layout`.
        unsafe { alloc::dealloc(self.ptr.as_ptr().cast::<u8>(), self.layout) };
    }
}

impl<T: NativeStruct + fmt::Debug> fmt::Debug for DirectArray<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ffi::{WGPULoadOp, WGPUOrigin3d, WGPUPassChannel_Color, WGPUPassChannel_u32};
    use crate::LoadOp;

    /// A zero-sized struct, which owns no memory in either container.
    #[derive(Debug, Clone, Copy)]
    struct Marker;

    // SAFETY: `Marker` has no bytes.
    unsafe impl bytemuck::Zeroable for Marker {}

    impl NativeStruct for Marker {
        const LAYOUT: &'static crate::layout::StructLayout = &crate::layout::StructLayout {
            name: "Marker",
            size: 0,
            align: 1,
            fields: &[],
        };

        fn probe_native() -> crate::layout::ProbedLayout {
            crate::layout::ProbedLayout::from_words(&[0, 1])
        }
    }

    fn origin(x: u32, y: u32, z: u32) -> WGPUOrigin3d {
        let mut origin = WGPUOrigin3d::create_heap();
        origin.set_x(x);
        origin.set_y(y);
        origin.set_z(z);
        origin
    }

    #[test]
    fn new_instance_is_zeroed() {
        let origin = Direct::<WGPUOrigin3d>::new().unwrap();
        assert_eq!((origin.x(), origin.y(), origin.z()), (0, 0, 0));
    }

    #[test]
    fn address_is_stable_across_moves() {
        let mut first = Direct::<WGPUPassChannel_u32>::new().unwrap();
        first.set_clear_value(42);
        let address = first.as_ptr();

        let moved = first;
        let holder = vec![moved];
        assert_eq!(holder[0].as_ptr(), address);
        assert_eq!(holder[0].clear_value(), 42);
    }

    #[test]
    fn pointer_sees_accessor_writes() {
        let mut direct = Direct::from_value(origin(1, 2, 3)).unwrap();
        // SAFETY: `direct` is alive for the whole block.
        let read = unsafe { *direct.as_ptr() };
        assert_eq!((read.x(), read.y(), read.z()), (1, 2, 3));

        // SAFETY: exclusive access through `&mut direct`.
        unsafe { (*direct.as_mut_ptr()).set_y(20) };
        assert_eq!(direct.get().y(), 20);
    }

    #[test]
    fn values_are_copied_not_shared() {
        let mut heap = origin(5, 6, 7);
        let direct = Direct::from_value(heap).unwrap();
        heap.set_x(50);
        assert_eq!(direct.x(), 5);
    }

    #[test]
    fn releasing_leaves_other_instances_intact() {
        let mut guard = Direct::<WGPUPassChannel_Color>::new().unwrap();
        guard.set_load_op(LoadOp::Load);
        guard.set_clear_value({
            let mut color = crate::ffi::WGPUColor::create_heap();
            color.set_g(0.5);
            color
        });
        guard.set_read_only(true);

        for round in 0..64 {
            let mut victim = Direct::from_value(origin(round, round, round)).unwrap();
            victim.set_z(u32::MAX);
            if round % 2 == 0 {
                victim.release();
            }
            let array = DirectArray::from_slice(&[origin(1, 1, 1); 3]).unwrap();
            drop(array);
        }

        assert_eq!(guard.load_op(), WGPULoadOp::LOAD);
        assert_eq!(guard.clear_value().g(), 0.5);
        assert!(guard.read_only());
    }

    #[test]
    fn array_elements_are_contiguous() {
        let mut array = DirectArray::<WGPUOrigin3d>::new(3).unwrap();
        for (i, element) in array.iter_mut().enumerate() {
            element.set_x(i as u32);
        }

        let base = array.as_ptr();
        for i in 0..3 {
            // SAFETY: `i < len`.
            let element = unsafe { *base.add(i) };
            assert_eq!(element.x(), i as u32);
        }
        assert_eq!(array.len(), 3);
    }

    #[test]
    fn empty_array_is_null() {
        let mut array = DirectArray::<WGPUOrigin3d>::new(0).unwrap();
        assert!(array.as_ptr().is_null());
        assert!(array.as_mut_ptr().is_null());
        assert!(array.is_empty());
    }

    #[test]
    fn oversized_array_reports_overflow() {
        let err = DirectArray::<WGPUOrigin3d>::new(usize::MAX).unwrap_err();
        assert_eq!(
            err,
            AllocError::CapacityOverflow {
                name: "WGPUOrigin3d",
                len: usize::MAX
            }
        );
    }

    #[test]
    fn debug_shows_contents() {
        let direct = Direct::from_value(origin(1, 2, 3)).unwrap();
        assert_eq!(
            format!("{:?}", direct),
            "Direct(WGPUOrigin3d { x: 1, y: 2, z: 3 })"
        );
    }

    #[test]
    fn zero_sized_struct_skips_the_allocator() {
        let marker = Direct::<Marker>::new().unwrap();
        assert_eq!(marker.as_ptr(), NonNull::<Marker>::dangling().as_ptr().cast_const());
        let copy: Marker = marker.get();
        assert_eq!(format!("{:?}", copy), "Marker");
        marker.release();

        let from_value = Direct::from_value(Marker).unwrap();
        drop(from_value);
    }

    #[test]
    fn zero_sized_array_keeps_its_length() {
        let mut array = DirectArray::<Marker>::new(4).unwrap();
        assert_eq!(array.len(), 4);
        assert!(!array.as_mut_ptr().is_null());
        assert_eq!(array.iter().count(), 4);
        drop(array);

        let empty = DirectArray::<Marker>::new(0).unwrap();
        assert!(empty.as_ptr().is_null());
    }

    #[test]
    fn array_releases_with_its_allocation_layout() {
        let array = DirectArray::<WGPUPassChannel_Color>::new(5).unwrap();
        assert_eq!(array.layout, Layout::array::<WGPUPassChannel_Color>(5).unwrap());
        assert_eq!(array.layout.size(), 5 * 48);
        drop(array);
    }
}
