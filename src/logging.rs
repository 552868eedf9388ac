use std::env;

use colored::{ColoredString, Colorize};
use log::{Level, LevelFilter};

/// The crates of this workspace, each logged under its own tag
const LOCAL_TARGETS: [(&str, &str); 5] = [
    ("radiobot", "BOT"),
    ("radiobot_core", "CORE"),
    ("radiobot_radio", "RADIO"),
    ("radiobot_impls", "NODE"),
    ("radiobot_server", "SERVER"),
];

/// Logs to stdout. The workspace crates log at the level in `RADIOBOT_LOG`
/// (info when unset), other crates only log warnings and errors.
pub fn init_logger() {
    let level = local_level();

    let dispatch = LOCAL_TARGETS
        .iter()
        .fold(fern::Dispatch::new().level(LevelFilter::Warn), |d, (name, _)| {
            d.level_for(*name, level)
        });

    dispatch
        .format(|out, message, record| {
            out.finish(format_args!(
                "{:^5} {} {:^8} {}",
                level_badge(record.level()),
                chrono::Local::now().format("%H:%M:%S").to_string().bright_black(),
                target_tag(record.target()),
                message
            ))
        })
        .chain(std::io::stdout())
        .apply()
        .expect("logging is initialized")
}

fn local_level() -> LevelFilter {
    env::var("RADIOBOT_LOG")
        .ok()
        .and_then(|value| value.trim().parse().ok())
        .unwrap_or(LevelFilter::Info)
}

fn target_tag(target: &str) -> ColoredString {
    let module = target.split("::").next().unwrap_or_default();

    let Some((_, tag)) = LOCAL_TARGETS.iter().find(|(name, _)| *name == module) else {
        return module.clear();
    };

    match *tag {
        "BOT" => tag.bright_cyan(),
        "CORE" => tag.blue(),
        "RADIO" => tag.bright_purple(),
        "NODE" => tag.yellow(),
        _ => tag.bright_green(),
    }
}

fn level_badge(level: Level) -> ColoredString {
    match level {
        Level::Error => " ERR ".black().on_red().bold(),
        Level::Warn => " WRN ".black().on_yellow().bold(),
        Level::Info => " INF ".black().on_blue().bold(),
        Level::Debug => " DBG ".white().on_black(),
        Level::Trace => " TRC ".dimmed(),
    }
}
