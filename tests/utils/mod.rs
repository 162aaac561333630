use log::LevelFilter;

pub(crate) fn init_logs() {
    let env = env_logger::Builder::new()
        .filter_module("leakcheck", LevelFilter::Info)
        .format_timestamp(None)
        .is_test(true)
        .build();
    leakcheck::logging::init_with(env);
}
