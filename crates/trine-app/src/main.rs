use trine_engine::driver;
use trine_engine::logging::{init_logging, LoggingConfig};

fn main() {
    init_logging(LoggingConfig::default());
    log::info!("hello-triangle {}", env!("CARGO_PKG_VERSION"));

    std::process::exit(driver::run());
}
