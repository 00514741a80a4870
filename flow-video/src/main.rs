use clap::Parser;
use flow_video::{exit_code, logging::init_logging, run, Args};
use std::process::ExitCode;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let _guard = match init_logging(&args.logging_config()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("flow-video: {:#}", e);
            return ExitCode::from(2);
        }
    };

    match run(&args).await {
        Ok(report) => {
            for output in report.outputs() {
                println!("{}", output.display());
            }
            info!(
                "Rendered {} video(s) into {:?}",
                report.video_count(),
                args.output_dir_path
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}
