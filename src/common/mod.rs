pub mod io;

/// Name used as the prefix of every diagnostic.
pub const TOOL_NAME: &str = "hostpress";

/// Reset SIGPIPE to default behavior (SIG_DFL).
/// Rust ignores SIGPIPE by default, which turns `hostpress in - | head`
/// into a write error instead of a quiet exit. Call at the start of main().
#[inline]
pub fn reset_sigpipe() {
    #[cfg(unix)]
    unsafe {
        libc::signal(libc::SIGPIPE, libc::SIG_DFL);
    }
}

/// Format an IO error message without the "(os error N)" suffix.
/// Rust's Display impl appends " (os error 2)"; operators expect the
/// plain "No such file or directory".
pub fn io_error_msg(e: &std::io::Error) -> String {
    if let Some(raw) = e.raw_os_error() {
        let os_err = std::io::Error::from_raw_os_error(raw);
        let msg = format!("{}", os_err);
        msg.replace(&format!(" (os error {})", raw), "")
    } else {
        format!("{}", e)
    }
}
