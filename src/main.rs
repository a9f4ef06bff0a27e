use h2oci::cli::{Args, Runner};
use h2oci::{GatewayConfig, logging};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse_args();

    let config = match GatewayConfig::from_args(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    logging::init(args.verbose, args.log_format);

    Runner::new(config).run().await?;
    Ok(())
}
