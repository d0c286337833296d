//! Source text and data for the bundled demonstration programs (bootloader,
//! paragraph search, fault handler).
//!
//! These programs are external collaborators, out of scope for this crate
//! to reimplement; it supplies only what the engine needs to host them — an
//! assemblable bootloader-area source and a paragraph-search text prefetch
//! terminated by EOT — not a reimplementation of their original logic.

use vn1801_core::memory::reserved;

/// EOT byte terminating a prefetched paragraph-search text block.
pub const EOT: u8 = 0x04;

/// Where the bundled fault handler is assembled, within the boot area but
/// past the end of `BOOTLOADER_SOURCE` (one word), leaving room for a
/// larger bootloader without overlap.
pub const FAULT_HANDLER_ORIGIN: i32 = reserved::BOOT_AREA_START + 10;

/// Minimal bootloader-area program: halts immediately, leaving the engine
/// idle and waiting for a user program to be loaded at 100 (`HLT` from boot
/// returns to idle with buttons re-enabled). A full bootloader would
/// additionally drive the front end's file-dialog/button plumbing, which is
/// out of scope here.
pub const BOOTLOADER_SOURCE: &str = "\
/ Minimal bootloader: idle immediately, waiting for a program load.
HLT
";

/// Minimal machine-fault handler: records that a fault occurred (by setting
/// R0 to a sentinel) and returns control to the bootloader. A full fault
/// handler would present the fault to the front end; that UI coupling is
/// out of scope here.
pub const FAULT_HANDLER_SOURCE: &str = "\
/ Minimal fault handler: flag the fault in R0, then halt back to boot.
AIR 0,1
HLT
";

/// Default paragraph text for the bundled paragraph-search demo.
pub const DEFAULT_PARAGRAPH: &str =
    "This is a test. It is fun. This simulator executes it fast.";

/// Default search word for the bundled paragraph-search demo: searching
/// " is" in the default paragraph finds it at sentence 1, word 2 — "is" is
/// the second word of "This is a test.".
pub const DEFAULT_SEARCH_WORD: &str = " is";

/// Render `text` as the byte sequence the loader prefetches to memory,
/// terminated by EOT.
#[must_use]
pub fn paragraph_bytes(text: &str) -> Vec<u8> {
    let mut bytes: Vec<u8> = text.bytes().collect();
    bytes.push(EOT);
    bytes
}
