use log::LevelFilter;

fn main() -> anyhow::Result<()> {
    // The check takes no arguments and reads no environment, not even for
    // logging: every run behaves the same way.
    let logger = env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .build();
    leakcheck::logging::init_with(logger);

    leakcheck::LeakCheck::new().run()
}
