use log::info;
use regex::{Captures, Regex};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::error::{LauncherError, Result};
use super::install::{client_jar_path, natives_dir};
use super::version::{load_version, Argument, Features, VersionJson};

#[cfg(windows)]
pub const CLASSPATH_SEPARATOR: &str = ";";
#[cfg(not(windows))]
pub const CLASSPATH_SEPARATOR: &str = ":";

/// Player and runtime settings for one launch
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchOptions {
    pub username: String,
    pub uuid: String,
    pub token: String,
    pub session_id: String,
    /// `legacy` for offline players
    pub user_type: String,
    /// Java binary, plain `java` when unset
    pub executable_path: Option<PathBuf>,
    /// Extra JVM flags placed before the version's own
    pub jvm_arguments: Vec<String>,
    pub launcher_name: String,
    pub launcher_version: String,
    /// Working game directory, defaults to the install directory
    pub game_directory: Option<PathBuf>,
    pub demo: bool,
    pub resolution: Option<(u32, u32)>,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            username: String::new(),
            uuid: String::new(),
            token: String::new(),
            session_id: String::new(),
            user_type: "legacy".to_string(),
            executable_path: None,
            jvm_arguments: Vec::new(),
            launcher_name: env!("CARGO_PKG_NAME").to_string(),
            launcher_version: env!("CARGO_PKG_VERSION").to_string(),
            game_directory: None,
            demo: false,
            resolution: None,
        }
    }
}

impl LaunchOptions {
    fn features(&self) -> Features {
        Features {
            is_demo_user: self.demo,
            has_custom_resolution: self.resolution.is_some(),
        }
    }
}

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\$\{([A-Za-z0-9_]+)\}").expect("valid placeholder pattern"))
}

/// Replace `${name}` placeholders; unknown names are left untouched
pub fn substitute(template: &str, values: &HashMap<&str, String>) -> String {
    placeholder_regex()
        .replace_all(template, |caps: &Captures| match values.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Classpath entries: libraries in declaration order, then the client jar
pub fn classpath(game_dir: &Path, version: &VersionJson, features: &Features) -> Vec<PathBuf> {
    let libraries_dir = game_dir.join("libraries");
    let mut seen = HashSet::new();

    version
        .libraries
        .iter()
        .filter(|l| l.is_allowed(features) && !l.is_native_only())
        .filter_map(|l| l.artifact_path())
        .map(|path| libraries_dir.join(path))
        .chain(std::iter::once(client_jar_path(game_dir, version)))
        .filter(|path| seen.insert(path.clone()))
        .collect()
}

fn placeholder_values(
    game_dir: &Path,
    version: &VersionJson,
    options: &LaunchOptions,
    features: &Features,
) -> HashMap<&'static str, String> {
    let classpath = classpath(game_dir, version, features)
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(CLASSPATH_SEPARATOR);
    let assets_root = game_dir.join("assets");
    let game_directory = options
        .game_directory
        .clone()
        .unwrap_or_else(|| game_dir.to_path_buf());
    let (width, height) = options.resolution.unwrap_or_default();

    HashMap::from([
        ("natives_directory", natives_dir(game_dir, &version.id).display().to_string()),
        ("launcher_name", options.launcher_name.clone()),
        ("launcher_version", options.launcher_version.clone()),
        ("classpath", classpath),
        ("classpath_separator", CLASSPATH_SEPARATOR.to_string()),
        ("library_directory", game_dir.join("libraries").display().to_string()),
        ("auth_player_name", options.username.clone()),
        ("version_name", version.id.clone()),
        ("game_directory", game_directory.display().to_string()),
        (
            "game_assets",
            assets_root.join("virtual").join("legacy").display().to_string(),
        ),
        ("assets_root", assets_root.display().to_string()),
        ("assets_index_name", version.asset_index_id().to_string()),
        ("auth_uuid", options.uuid.clone()),
        ("auth_access_token", options.token.clone()),
        ("auth_session", options.session_id.clone()),
        ("user_type", options.user_type.clone()),
        (
            "version_type",
            version.version_type.clone().unwrap_or_else(|| "release".to_string()),
        ),
        ("user_properties", "{}".to_string()),
        ("resolution_width", width.to_string()),
        ("resolution_height", height.to_string()),
        ("clientid", String::new()),
        ("auth_xuid", String::new()),
    ])
}

fn expand(arguments: &[Argument], features: &Features, values: &HashMap<&str, String>) -> Vec<String> {
    arguments
        .iter()
        .flat_map(|argument| argument.values(features))
        .map(|value| substitute(value, values))
        .collect()
}

/// Build the full command line for an installed version
pub fn build_command(game_dir: &Path, version_id: &str, options: &LaunchOptions) -> Result<Vec<String>> {
    let version = load_version(game_dir, version_id)?;
    command_for(game_dir, &version, options)
}

/// Command line for already-loaded version metadata
pub fn command_for(game_dir: &Path, version: &VersionJson, options: &LaunchOptions) -> Result<Vec<String>> {
    let main_class = version
        .main_class
        .clone()
        .ok_or_else(|| LauncherError::MissingMainClass(version.id.clone()))?;
    if let Some(major) = version.java_version.as_ref().and_then(|j| j.major_version) {
        info!("Version {} expects Java {}", version.id, major);
    }
    let features = options.features();
    let values = placeholder_values(game_dir, version, options, &features);

    let java = options
        .executable_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "java".to_string());
    let mut command = vec![java];
    command.extend(options.jvm_arguments.iter().cloned());

    let modern = version.arguments.as_ref();
    match modern.filter(|args| !args.jvm.is_empty()) {
        Some(args) => command.extend(expand(&args.jvm, &features, &values)),
        None => {
            command.push(substitute("-Djava.library.path=${natives_directory}", &values));
            command.push("-cp".to_string());
            command.push(values["classpath"].clone());
        }
    }

    command.push(main_class);

    let mut gated_demo = false;
    let mut gated_resolution = false;
    if let Some(args) = modern {
        command.extend(expand(&args.game, &features, &values));
        gated_demo = args.game.iter().any(|a| a.uses_feature("is_demo_user"));
        gated_resolution = args.game.iter().any(|a| a.uses_feature("has_custom_resolution"));
    }
    if let Some(legacy) = &version.minecraft_arguments {
        command.extend(legacy.split_whitespace().map(|arg| substitute(arg, &values)));
    }

    if options.demo && !gated_demo {
        command.push("--demo".to_string());
    }
    if let Some((width, height)) = options.resolution.filter(|_| !gated_resolution) {
        command.extend([
            "--width".to_string(),
            width.to_string(),
            "--height".to_string(),
            height.to_string(),
        ]);
    }

    Ok(command)
}
