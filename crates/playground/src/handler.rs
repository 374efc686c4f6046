/// Installs the `color_eyre` panic and error report hooks.
///
/// Reports carry a span trace and, when `RUST_BACKTRACE` is set, a backtrace.
pub fn install() {
    let panic_section = "This is a bug in the playground scripts.";
    let (panic_hook, eyre_hook) =
        color_eyre::config::HookBuilder::default().panic_section(panic_section).into_hooks();
    panic_hook.install();
    if let Err(e) = eyre_hook.install() {
        debug!("failed to install eyre error hook: {e}");
    }
}
