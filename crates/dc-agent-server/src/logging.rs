use std::io::Write;

/// Filter directive for the logger: an explicit level wins over the debug flag.
pub fn log_filter(debug: bool, level: Option<&str>) -> String {
    match level.map(str::trim).filter(|level| !level.is_empty()) {
        Some(level) => level.to_string(),
        None if debug => "debug".to_string(),
        None => "info".to_string(),
    }
}

/// Initialize `env_logger` with timestamped, module-qualified lines.
///
/// `level` accepts the usual `RUST_LOG` directive syntax, e.g.
/// `warn,dc_agent_loop=debug`.
pub fn init_logging(debug: bool, level: Option<&str>) {
    env_logger::Builder::new()
        .parse_filters(&log_filter(debug, level))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {} [{}] {} - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
                record.level(),
                record.target(),
                record.module_path().unwrap_or("unknown"),
                record.args()
            )
        })
        .init();
}
