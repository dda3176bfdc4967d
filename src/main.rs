use casebook::cli::{Cli, Commands, GlobalOpts};
use casebook::core::{Config, Project};
use clap::Parser;
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> Result<()> {
    // Reset SIGPIPE to default behavior (terminate silently) for proper Unix piping.
    // Without this, piping to `head`, `grep -q`, etc. causes a panic on broken pipe.
    #[cfg(unix)]
    {
        unsafe {
            libc::signal(libc::SIGPIPE, libc::SIG_DFL);
        }
    }
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))?;

    let cli = Cli::parse();
    let mut global = cli.global;
    let project = Project::locate(global.project.as_deref()).ok();
    let config = Config::load(project.as_ref());
    init_tracing(&global, &config);
    global.apply_config(&config);

    match cli.command {
        Commands::Init(args) => casebook::cli::commands::init::run(args),
        Commands::Call(args) => casebook::cli::commands::call::run(args, &global),
        Commands::Batch(args) => casebook::cli::commands::batch::run(args, &global),
        Commands::New(cmd) => casebook::cli::commands::new::run(cmd, &global),
        Commands::Cases(args) => casebook::cli::commands::cases::run(args, &global),
        Commands::Team(cmd) => cmd.run(&global),
        Commands::Completions(args) => casebook::cli::commands::completions::run(args),
    }
}

/// Logs go to stderr; CASEBOOK_LOG wins over config `log_level`, `--verbose` over both
fn init_tracing(global: &GlobalOpts, config: &Config) {
    let filter = if global.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_new(config.log_filter()).unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
