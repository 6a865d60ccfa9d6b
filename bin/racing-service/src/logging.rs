//! Terminal plus rotating-file logging, matching the rest of the source
//! repository's combined-logger convention.
pub fn init() {
    std::fs::create_dir_all("logs").expect("create logs directory");
    let config = simplelog::ConfigBuilder::new()
        .set_location_level(log::LevelFilter::Off)
        .set_target_level(log::LevelFilter::Off)
        .set_thread_level(log::LevelFilter::Off)
        .build();
    let time = std::time::SystemTime::now().duration_since(std::time::UNIX_EPOCH).expect("time moves forward").as_secs();
    let file = simplelog::WriteLogger::new(
        log::LevelFilter::Debug,
        config.clone(),
        std::fs::File::create(format!("logs/racing-service-{time}.log")).expect("create log file"),
    );
    let term = simplelog::TermLogger::new(log::LevelFilter::Info, config, simplelog::TerminalMode::Mixed, simplelog::ColorChoice::Auto);
    simplelog::CombinedLogger::init(vec![term, file]).expect("initialize logger");
}
