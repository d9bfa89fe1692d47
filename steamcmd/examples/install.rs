//! Install or update a Steam application, answering prompts from the terminal.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example install -- --app 740 --apps-dir /srv/games --anonymous
//! cargo run --example install -- --app 740 --update /srv/games/740
//! ```
//!
//! Without `--anonymous` the example asks for a Steam username and password
//! first. Steam Guard codes are asked for when SteamCMD wants one.

use std::env;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use steamcmd::{App, AppId, Installer, Question};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut builder = Installer::builder()
        .steamcmd_dir(&args.steamcmd_dir)
        .apps_dir(&args.apps_dir)
        .anonymous(args.anonymous);
    if let Some(timeout) = args.timeout {
        builder = builder.timeout(Duration::from_secs(timeout));
    }
    let installer = builder.build();

    let handle = match &args.update {
        Some(dir) => {
            println!("Updating app {} in {}...", args.app, dir.display());
            installer.update(&App::new(args.app, dir))?
        }
        None => {
            println!("Installing app {}...", args.app);
            installer.install(args.app)?
        }
    };

    let outcome = handle.run_with(ask_terminal).await?;

    println!();
    println!("Done!");
    println!("  App: {}", outcome.app);
    println!("  Exit code: {}", outcome.exit.code());
    println!("  Questions answered: {}", outcome.questions_asked());
    println!("  Total time: {:?}", outcome.elapsed);

    Ok(())
}

fn ask_terminal(question: &Question) -> String {
    if question.sensitive {
        print!("{} (input is shown) ", question);
    } else {
        print!("{} ", question);
    }
    let _ = io::stdout().flush();

    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line).is_err() {
        return String::new();
    }
    line.trim_end().to_string()
}

/// Simple argument parser
struct Args {
    app: AppId,
    steamcmd_dir: PathBuf,
    apps_dir: PathBuf,
    update: Option<PathBuf>,
    anonymous: bool,
    timeout: Option<u64>,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = env::args().collect();
        let mut app = AppId::default();
        let mut steamcmd_dir = PathBuf::from(steamcmd::process::DEFAULT_STEAMCMD_DIR);
        let mut apps_dir = PathBuf::from(steamcmd::process::DEFAULT_APPS_DIR);
        let mut update = None;
        let mut anonymous = false;
        let mut timeout = None;

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--app" | "-a" => {
                    i += 1;
                    if i < args.len() {
                        app = AppId::from_str_lossy(&args[i]);
                    }
                }
                "--steamcmd-dir" => {
                    i += 1;
                    if i < args.len() {
                        steamcmd_dir = PathBuf::from(&args[i]);
                    }
                }
                "--apps-dir" => {
                    i += 1;
                    if i < args.len() {
                        apps_dir = PathBuf::from(&args[i]);
                    }
                }
                "--update" | "-u" => {
                    i += 1;
                    if i < args.len() {
                        update = Some(PathBuf::from(&args[i]));
                    }
                }
                "--anonymous" => anonymous = true,
                "--timeout" | "-t" => {
                    i += 1;
                    if i < args.len() {
                        timeout = args[i].parse().ok();
                    }
                }
                "--help" | "-h" => {
                    Self::print_help();
                    std::process::exit(0);
                }
                _ => {}
            }
            i += 1;
        }

        if app.is_unset() {
            eprintln!("Error: --app is required");
            Self::print_help();
            std::process::exit(1);
        }

        Self {
            app,
            steamcmd_dir,
            apps_dir,
            update,
            anonymous,
            timeout,
        }
    }

    fn print_help() {
        println!("Usage: install [OPTIONS] --app <ID>");
        println!();
        println!("Options:");
        println!("  -a, --app <ID>             Steam application id");
        println!("      --steamcmd-dir <DIR>   SteamCMD directory (default: /opt/steam/cmd)");
        println!("      --apps-dir <DIR>       Applications directory (default: /opt/steam/apps)");
        println!("  -u, --update <DIR>         Update the app installed in DIR");
        println!("      --anonymous            Log in anonymously");
        println!("  -t, --timeout <SECS>       Give up after SECS seconds");
        println!("      --help                 Print help");
    }
}
