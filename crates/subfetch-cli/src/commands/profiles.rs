use crate::config::{AppConfig, config_path};

/// Print configured profiles, one per line.
pub fn run(config: &AppConfig) {
    if config.profiles.is_empty() {
        match config_path() {
            Some(path) => println!("No profiles configured. Add some to {}.", path.display()),
            None => println!("No profiles configured."),
        }
        return;
    }

    for line in format_profiles(config) {
        println!("{line}");
    }
}

fn format_profiles(config: &AppConfig) -> Vec<String> {
    let width = config
        .profiles
        .iter()
        .map(|p| p.name.len())
        .max()
        .unwrap_or(0);

    config
        .profiles
        .iter()
        .map(|p| format!("{:<width$}  {}  {}", p.name, p.dir.display(), p.url))
        .collect()
}
