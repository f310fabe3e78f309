use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use veriface_cli::cli::{Cli, Commands};
use veriface_cli::engine;
use veriface_cli::errors::CliResult;
use veriface_cli::output::{render_error, render_precompute, render_register, render_verify};
use veriface_core::{identity_folder, run_registration, RegistrationConfig, VerifyRequest};

/// Exit code for a completed verification whose decision was "not verified".
const NOT_VERIFIED_EXIT: u8 = 10;

fn main() -> ExitCode {
    let cli = Cli::parse();
    let mode = cli.output_mode();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            render_error(&err, mode);
            err.exit_code()
        }
    }
}

fn run(cli: Cli) -> CliResult<ExitCode> {
    let mode = cli.output_mode();
    let mut settings = engine::resolve_settings(cli.config.as_deref())?;

    match cli.command {
        Commands::Verify(args) => {
            settings.apply_overrides(
                args.users_dir,
                args.model,
                &args.backends,
                args.landmark_model,
                args.encoder_model,
            );
            if args.no_cache {
                settings.use_cache = false;
            }
            if args.threshold.is_some() {
                settings.distance_threshold = args.threshold;
            }

            let verifier = engine::build_verifier(&settings)?;
            let folder = identity_folder(&settings.users_dir, &args.user);

            let mut request = VerifyRequest::new(args.image, folder);
            request.model_name = Some(settings.model_name.clone());
            request.detector_backends = Some(settings.backends.clone());
            request.distance_threshold = settings.distance_threshold;
            request.use_cache = settings.use_cache;

            let outcome = verifier.verify(&request)?;
            render_verify(&outcome, mode)?;
            if outcome.verified {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::from(NOT_VERIFIED_EXIT))
            }
        }
        Commands::Register(args) => {
            settings.apply_overrides(
                args.users_dir,
                None,
                &[],
                args.landmark_model,
                args.encoder_model,
            );

            let outcome = run_registration(&RegistrationConfig {
                user: args.user.clone(),
                image: args.image,
                base_dir: settings.users_dir.clone(),
            })?;
            render_register(&outcome, mode)?;

            if args.precompute {
                let report = engine::precompute(&settings, &args.user)?;
                render_precompute(&report, mode)?;
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Precompute(args) => {
            settings.apply_overrides(
                args.users_dir,
                args.model,
                &args.backends,
                args.landmark_model,
                args.encoder_model,
            );

            let report = engine::precompute(&settings, &args.user)?;
            render_precompute(&report, mode)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(env_filter);

    let registry = tracing_subscriber::registry().with(fmt_layer);
    if tracing::subscriber::set_global_default(registry).is_err() {
        // Already initialised (tests).
    }
}
