//! Lumen boot image
//!
//! Limine entry point for x86_64. Brings up the serial console, heap,
//! interrupts and input devices, then hands the framebuffer to the
//! scheduler and never returns.

#![no_std]
#![no_main]
#![feature(abi_x86_interrupt)]
#![feature(alloc_error_handler)]

extern crate alloc;

mod arch;

use core::alloc::Layout;
use core::panic::PanicInfo;
use limine::request::{
    ExecutableFileRequest, FramebufferRequest, HhdmRequest, MemoryMapRequest,
    RequestsEndMarker, RequestsStartMarker,
};
use limine::BaseRevision;

use lumen_kernel::{programs, KernelConfig, Scheduler};

use arch::display::LimineDisplay;
use arch::HardwareDevices;

// ============================================================================
// Limine Protocol Requests
// ============================================================================

#[used]
#[unsafe(link_section = ".requests_start_marker")]
static _START_MARKER: RequestsStartMarker = RequestsStartMarker::new();

#[used]
#[unsafe(link_section = ".requests")]
static BASE_REVISION: BaseRevision = BaseRevision::new();

#[used]
#[unsafe(link_section = ".requests")]
static FRAMEBUFFER_REQUEST: FramebufferRequest = FramebufferRequest::new();

#[used]
#[unsafe(link_section = ".requests")]
static MEMORY_MAP_REQUEST: MemoryMapRequest = MemoryMapRequest::new();

/// Higher half direct map offset for physical memory access
#[used]
#[unsafe(link_section = ".requests")]
static HHDM_REQUEST: HhdmRequest = HhdmRequest::new();

/// Our own image; carries the kernel command line
#[used]
#[unsafe(link_section = ".requests")]
static EXECUTABLE_FILE_REQUEST: ExecutableFileRequest = ExecutableFileRequest::new();

#[used]
#[unsafe(link_section = ".requests_end_marker")]
static _END_MARKER: RequestsEndMarker = RequestsEndMarker::new();

// ============================================================================
// Kernel Entry Point
// ============================================================================

/// Called by Limine. Boot order:
/// 1. Serial port (logging before anything else)
/// 2. Heap (the logger and every process allocate)
/// 3. Framebuffer and configuration
/// 4. PS/2 mouse, IDT + PIC, PIT
/// 5. Scheduler and the boot session
#[no_mangle]
pub unsafe extern "C" fn kmain() -> ! {
    if !BASE_REVISION.is_supported() {
        arch::halt_loop();
    }

    arch::serial::init();
    crate::serial_println!("{} booting", lumen_kernel::VERSION);

    init_heap();
    lumen_kernel::logger::set_writer(arch::serial::print);
    lumen_kernel::log!(
        "[HEAP] Initialized: used={} KB free={} KB",
        arch::heap::used() / 1024,
        arch::heap::free() / 1024
    );

    let Some(display) = FRAMEBUFFER_REQUEST
        .get_response()
        .and_then(|response| response.framebuffers().next())
        .and_then(|fb| {
            LimineDisplay::new(
                fb.addr(),
                fb.width() as u32,
                fb.height() as u32,
                fb.pitch() as usize,
                fb.bpp(),
            )
        })
    else {
        lumen_kernel::log_error!("[BOOT] No usable 32 bpp framebuffer");
        arch::halt_loop();
    };
    let (width, height) = lumen_kernel::graphics::Display::size(&display);
    lumen_kernel::log!("[BOOT] Framebuffer {}x{}", width, height);

    let mut config = KernelConfig::with_screen(width, height);
    if let Some(cmdline) = EXECUTABLE_FILE_REQUEST
        .get_response()
        .and_then(|response| core::str::from_utf8(response.file().cmdline()).ok())
    {
        let applied = config.apply_cmdline(cmdline);
        lumen_kernel::log!("[BOOT] Command line '{}' ({} setting(s) applied)", cmdline, applied);
    }

    arch::mouse::init(width, height);
    arch::interrupts::init();
    arch::pit::init(config.tick_hz);
    lumen_kernel::log!("[BOOT] PIT at {} Hz", config.tick_hz);

    let mut scheduler = match Scheduler::new(display, config) {
        Ok(scheduler) => scheduler,
        Err(e) => {
            lumen_kernel::log_error!("[BOOT] Scheduler init failed: {}", e);
            arch::halt_loop();
        }
    };
    if let Err(e) = programs::start_session(scheduler.table_mut()) {
        lumen_kernel::log_error!("[BOOT] Session start failed: {}", e);
    }

    scheduler.run(&mut HardwareDevices::new())
}

/// Place the heap using the memory map. Runs before anything allocates, so
/// it only reports through the serial macros.
fn init_heap() {
    let Some(mmap) = MEMORY_MAP_REQUEST.get_response() else {
        crate::serial_println!("[HEAP] ERROR: no memory map from bootloader");
        arch::halt_loop();
    };
    let hhdm_offset = HHDM_REQUEST.get_response().map_or(0, |r| r.offset());

    let Some((phys, size)) = arch::heap::choose_region(mmap.entries()) else {
        crate::serial_println!("[HEAP] ERROR: no usable memory region");
        arch::halt_loop();
    };
    crate::serial_println!(
        "[HEAP] phys {:#x}, {} MB (HHDM {:#x})",
        phys,
        size / 1024 / 1024,
        hhdm_offset
    );
    unsafe {
        arch::heap::init(hhdm_offset, phys, size);
    }
}

#[alloc_error_handler]
fn alloc_error(layout: Layout) -> ! {
    crate::serial_println!("\n!!! ALLOC ERROR !!!");
    crate::serial_println!("layout: size={}, align={}", layout.size(), layout.align());
    arch::halt_loop();
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    crate::serial_println!("\n!!! KERNEL PANIC !!!");
    crate::serial_println!("{}", info);
    arch::halt_loop();
}
