/// Stack and heap boundaries, for free-memory estimation.
pub trait MemoryLayout {
    /// Current stack pointer.
    fn stack_pointer(&self) -> usize;

    /// First address above static data and any dynamic allocations.
    fn heap_end(&self) -> usize;
}

#[cfg(target_arch = "avr")]
mod avr {
    use super::MemoryLayout;
    use crate::hal::Mcu;

    // SPL/SPH in data space
    const SP_ADDR: *const u16 = 0x5D as *const u16;

    extern "C" {
        static __heap_start: u8;
    }

    impl MemoryLayout for Mcu {
        #[inline(always)]
        fn stack_pointer(&self) -> usize {
            usize::from(unsafe { core::ptr::read_volatile(SP_ADDR) })
        }

        // No allocator is linked, so the heap never grows past its start.
        fn heap_end(&self) -> usize {
            unsafe { core::ptr::addr_of!(__heap_start) as usize }
        }
    }
}
