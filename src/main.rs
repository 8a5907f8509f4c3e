use clap::Parser;
use phylolayers::app::{AppConfig, PhyloLayersApp};

fn main() {
    let _ = env_logger::builder().format_timestamp(None).try_init();

    let config = AppConfig::parse();
    if let Err(err) = PhyloLayersApp::run(&config) {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
