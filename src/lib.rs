/// Use mimalloc as the global allocator.
/// Parsing allocates one record per hostname; large blocklists carry
/// millions of them.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

pub mod common;
pub mod hosts;
