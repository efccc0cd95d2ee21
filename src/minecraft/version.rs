use log::debug;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{LauncherError, Result};

/// Version metadata (`versions/<id>/<id>.json`)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionJson {
    pub id: String,
    #[serde(default)]
    pub inherits_from: Option<String>,
    #[serde(default, rename = "type")]
    pub version_type: Option<String>,
    #[serde(default)]
    pub main_class: Option<String>,
    /// Space separated game arguments used before 1.13
    #[serde(default)]
    pub minecraft_arguments: Option<String>,
    #[serde(default)]
    pub arguments: Option<Arguments>,
    #[serde(default)]
    pub libraries: Vec<Library>,
    #[serde(default)]
    pub asset_index: Option<AssetIndexRef>,
    #[serde(default)]
    pub assets: Option<String>,
    #[serde(default)]
    pub downloads: Option<VersionDownloads>,
    #[serde(default)]
    pub release_time: Option<String>,
    #[serde(default)]
    pub java_version: Option<JavaVersion>,
    /// Version whose client jar is used, set by some modded versions
    #[serde(default)]
    pub jar: Option<String>,
}

impl VersionJson {
    /// Id of the version providing the client jar
    pub fn jar_id(&self) -> &str {
        self.jar.as_deref().unwrap_or(&self.id)
    }

    /// Name of the asset index, `legacy` for very old versions
    pub fn asset_index_id(&self) -> &str {
        self.asset_index
            .as_ref()
            .map(|index| index.id.as_str())
            .or(self.assets.as_deref())
            .unwrap_or("legacy")
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Arguments {
    #[serde(default)]
    pub game: Vec<Argument>,
    #[serde(default)]
    pub jvm: Vec<Argument>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Argument {
    Plain(String),
    Conditional { rules: Vec<Rule>, value: ArgumentValue },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ArgumentValue {
    One(String),
    Many(Vec<String>),
}

impl Argument {
    /// Values of this argument that apply with the given features
    pub fn values(&self, features: &Features) -> Vec<&str> {
        match self {
            Argument::Plain(value) => vec![value.as_str()],
            Argument::Conditional { rules, value } => {
                if !rules_allow(rules, features) {
                    return Vec::new();
                }
                match value {
                    ArgumentValue::One(v) => vec![v.as_str()],
                    ArgumentValue::Many(vs) => vs.iter().map(String::as_str).collect(),
                }
            }
        }
    }

    /// Whether this argument is gated on the named feature
    pub fn uses_feature(&self, feature: &str) -> bool {
        match self {
            Argument::Plain(_) => false,
            Argument::Conditional { rules, .. } => rules.iter().any(|rule| {
                rule.features
                    .as_ref()
                    .map_or(false, |features| features.contains_key(feature))
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Disallow,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Rule {
    pub action: RuleAction,
    #[serde(default)]
    pub os: Option<OsRule>,
    #[serde(default)]
    pub features: Option<HashMap<String, bool>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OsRule {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arch: Option<String>,
}

/// Launch features that rules can test for
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Features {
    pub is_demo_user: bool,
    pub has_custom_resolution: bool,
}

impl Features {
    fn enabled(&self, name: &str) -> bool {
        match name {
            "is_demo_user" => self.is_demo_user,
            "has_custom_resolution" => self.has_custom_resolution,
            _ => false,
        }
    }
}

/// Name the version metadata uses for the running OS
pub fn current_os_name() -> &'static str {
    match std::env::consts::OS {
        "macos" => "osx",
        other => other,
    }
}

fn os_matches(os: &OsRule) -> bool {
    if let Some(name) = &os.name {
        if name != current_os_name() {
            return false;
        }
    }
    if let Some(arch) = &os.arch {
        let matches = match arch.as_str() {
            "x86" => cfg!(target_arch = "x86"),
            other => other == std::env::consts::ARCH,
        };
        if !matches {
            return false;
        }
    }
    true
}

impl Rule {
    fn matches(&self, features: &Features) -> bool {
        if let Some(os) = &self.os {
            if !os_matches(os) {
                return false;
            }
        }
        if let Some(required) = &self.features {
            if required
                .iter()
                .any(|(name, wanted)| features.enabled(name) != *wanted)
            {
                return false;
            }
        }
        true
    }
}

/// Evaluate a rule list; the last matching rule decides
pub fn rules_allow(rules: &[Rule], features: &Features) -> bool {
    if rules.is_empty() {
        return true;
    }

    let mut allowed = false;
    for rule in rules {
        if rule.matches(features) {
            allowed = rule.action == RuleAction::Allow;
        }
    }
    allowed
}

#[derive(Debug, Clone, Deserialize)]
pub struct Library {
    pub name: String,
    #[serde(default)]
    pub downloads: Option<LibraryDownloads>,
    /// Maven repository base for libraries without download info
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub natives: Option<HashMap<String, String>>,
    #[serde(default)]
    pub rules: Option<Vec<Rule>>,
    #[serde(default)]
    pub extract: Option<Extract>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LibraryDownloads {
    #[serde(default)]
    pub artifact: Option<Artifact>,
    #[serde(default)]
    pub classifiers: Option<HashMap<String, Artifact>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Artifact {
    #[serde(default)]
    pub path: Option<String>,
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Extract {
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetIndexRef {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VersionDownloads {
    #[serde(default)]
    pub client: Option<Artifact>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JavaVersion {
    #[serde(default)]
    pub major_version: Option<u32>,
}

/// Convert `group:artifact:version[:classifier][@ext]` to a repository path
pub fn maven_path(name: &str) -> Option<String> {
    let (coords, ext) = match name.split_once('@') {
        Some((coords, ext)) => (coords, ext),
        None => (name, "jar"),
    };

    let parts: Vec<&str> = coords.split(':').collect();
    let (group, artifact, version, classifier) = match parts.as_slice() {
        [g, a, v] => (*g, *a, *v, None),
        [g, a, v, c] => (*g, *a, *v, Some(*c)),
        _ => return None,
    };

    let file = match classifier {
        Some(c) => format!("{}-{}-{}.{}", artifact, version, c, ext),
        None => format!("{}-{}.{}", artifact, version, ext),
    };
    Some(format!(
        "{}/{}/{}/{}",
        group.replace('.', "/"),
        artifact,
        version,
        file
    ))
}

impl Library {
    pub fn is_allowed(&self, features: &Features) -> bool {
        self.rules
            .as_deref()
            .map_or(true, |rules| rules_allow(rules, features))
    }

    /// Classifier of the native jar for this OS, if the library has one
    pub fn native_classifier(&self) -> Option<String> {
        let arch = if cfg!(target_pointer_width = "64") { "64" } else { "32" };
        self.natives
            .as_ref()?
            .get(current_os_name())
            .map(|classifier| classifier.replace("${arch}", arch))
    }

    /// Relative path of the main artifact under `libraries/`
    pub fn artifact_path(&self) -> Option<String> {
        self.downloads
            .as_ref()
            .and_then(|d| d.artifact.as_ref())
            .and_then(|a| a.path.clone())
            .or_else(|| maven_path(&self.name))
    }

    /// Download descriptor of the native jar, if any
    pub fn native_artifact(&self) -> Option<(String, &Artifact)> {
        let classifier = self.native_classifier()?;
        let artifact = self
            .downloads
            .as_ref()?
            .classifiers
            .as_ref()?
            .get(&classifier)?;
        let path = match &artifact.path {
            Some(path) => path.clone(),
            None => maven_path(&format!("{}:{}", self.name, classifier))?,
        };
        Some((path, artifact))
    }

    /// Whether the library only carries natives and no classpath jar
    pub fn is_native_only(&self) -> bool {
        self.natives.is_some()
            && self
                .downloads
                .as_ref()
                .map_or(true, |d| d.artifact.is_none())
    }
}

/// Path of the metadata file for `version_id`
pub fn version_json_path(game_dir: &Path, version_id: &str) -> PathBuf {
    game_dir
        .join("versions")
        .join(version_id)
        .join(format!("{}.json", version_id))
}

/// Read an installed version's metadata without resolving inheritance
pub fn read_version_value(game_dir: &Path, version_id: &str) -> Result<Value> {
    let path = version_json_path(game_dir, version_id);
    if !path.exists() {
        return Err(LauncherError::VersionNotFound(version_id.to_string()));
    }
    let content = fs::read_to_string(&path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Merge a child version into the version it inherits from.
///
/// Top-level lists are child entries first, nested lists (the argument
/// lists) parent entries first, anything else is taken from the child,
/// one level deep for objects such as `assetIndex`.
pub fn merge_inherited(parent: Value, child: Value) -> Value {
    let (Value::Object(mut merged), Value::Object(child)) = (parent, child) else {
        return Value::Null;
    };

    for (key, value) in child {
        let value = match (value, merged.remove(&key)) {
            (Value::Array(mut items), Some(Value::Array(parent_items))) => {
                items.extend(parent_items);
                Value::Array(items)
            }
            (Value::Object(nested), Some(Value::Object(mut parent_nested))) => {
                for (nested_key, nested_value) in nested {
                    match (nested_value, parent_nested.get_mut(&nested_key)) {
                        (Value::Array(items), Some(Value::Array(parent_items))) => {
                            parent_items.extend(items)
                        }
                        (nested_value, _) => {
                            parent_nested.insert(nested_key, nested_value);
                        }
                    }
                }
                Value::Object(parent_nested)
            }
            (value, _) => value,
        };
        merged.insert(key, value);
    }

    Value::Object(merged)
}

/// Load an installed version with its `inheritsFrom` chain resolved
pub fn load_version(game_dir: &Path, version_id: &str) -> Result<VersionJson> {
    let mut seen = HashSet::new();
    let value = resolve_value(game_dir, version_id, &mut seen)?;
    Ok(serde_json::from_value(value)?)
}

fn resolve_value(game_dir: &Path, version_id: &str, seen: &mut HashSet<String>) -> Result<Value> {
    if !seen.insert(version_id.to_string()) {
        return Err(LauncherError::InheritanceLoop(version_id.to_string()));
    }

    let value = read_version_value(game_dir, version_id)?;
    let parent_id = value
        .get("inheritsFrom")
        .and_then(Value::as_str)
        .map(str::to_string);
    match parent_id {
        Some(parent_id) => {
            debug!("Version {} inherits from {}", version_id, parent_id);
            let parent = resolve_value(game_dir, &parent_id, seen)?;
            let parent_jar = parent
                .get("jar")
                .and_then(Value::as_str)
                .unwrap_or(&parent_id)
                .to_string();

            let mut merged = merge_inherited(parent, value);
            if let Value::Object(map) = &mut merged {
                // The client jar comes from the root of the chain
                map.entry("jar").or_insert(Value::String(parent_jar));
            }
            Ok(merged)
        }
        None => Ok(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn rules(value: Value) -> Vec<Rule> {
        serde_json::from_value(value).unwrap()
    }

    fn write_version(dir: &Path, value: &Value) {
        let id = value["id"].as_str().unwrap();
        let path = version_json_path(dir, id);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, value.to_string()).unwrap();
    }

    #[test]
    fn maven_paths() {
        assert_eq!(
            maven_path("org.lwjgl:lwjgl:3.3.1").as_deref(),
            Some("org/lwjgl/lwjgl/3.3.1/lwjgl-3.3.1.jar")
        );
        assert_eq!(
            maven_path("org.lwjgl:lwjgl:3.3.1:natives-linux").as_deref(),
            Some("org/lwjgl/lwjgl/3.3.1/lwjgl-3.3.1-natives-linux.jar")
        );
        assert_eq!(
            maven_path("net.example:thing:1.0@zip").as_deref(),
            Some("net/example/thing/1.0/thing-1.0.zip")
        );
        assert_eq!(maven_path("broken"), None);
    }

    #[test]
    fn empty_rule_list_allows() {
        assert!(rules_allow(&[], &Features::default()));
    }

    #[test]
    fn last_matching_rule_wins() {
        let os = current_os_name();
        let list = rules(json!([
            {"action": "allow"},
            {"action": "disallow", "os": {"name": os}}
        ]));
        assert!(!rules_allow(&list, &Features::default()));

        let list = rules(json!([
            {"action": "allow"},
            {"action": "disallow", "os": {"name": "not-an-os"}}
        ]));
        assert!(rules_allow(&list, &Features::default()));

        let list = rules(json!([{"action": "allow", "os": {"name": "not-an-os"}}]));
        assert!(!rules_allow(&list, &Features::default()));
    }

    #[test]
    fn feature_rules_need_enabled_features() {
        let list = rules(json!([
            {"action": "allow", "features": {"has_custom_resolution": true}}
        ]));
        assert!(!rules_allow(&list, &Features::default()));
        assert!(rules_allow(
            &list,
            &Features {
                has_custom_resolution: true,
                ..Features::default()
            }
        ));

        let unknown = rules(json!([
            {"action": "allow", "features": {"has_quick_plays_support": true}}
        ]));
        assert!(!rules_allow(&unknown, &Features::default()));
    }

    #[test]
    fn conditional_arguments_expand_lists() {
        let args: Vec<Argument> = serde_json::from_value(json!([
            "--username",
            {"rules": [{"action": "allow", "features": {"is_demo_user": true}}], "value": "--demo"},
            {"rules": [{"action": "allow"}], "value": ["--width", "${resolution_width}"]}
        ]))
        .unwrap();

        let features = Features::default();
        let values: Vec<&str> = args.iter().flat_map(|a| a.values(&features)).collect();
        assert_eq!(values, ["--username", "--width", "${resolution_width}"]);
        assert!(args[1].uses_feature("is_demo_user"));
        assert!(!args[0].uses_feature("is_demo_user"));
    }

    #[test]
    fn native_classifier_substitutes_arch() {
        let library: Library = serde_json::from_value(json!({
            "name": "org.lwjgl.lwjgl:lwjgl-platform:2.9.4",
            "natives": {
                "linux": "natives-linux-${arch}",
                "osx": "natives-osx-${arch}",
                "windows": "natives-windows-${arch}"
            }
        }))
        .unwrap();

        let classifier = library.native_classifier().unwrap();
        assert!(!classifier.contains("${arch}"));
        assert!(classifier.starts_with("natives-"));
        assert!(library.is_native_only());
    }

    #[test]
    fn inherited_version_merges_lists() {
        let dir = TempDir::new().unwrap();
        write_version(
            dir.path(),
            &json!({
                "id": "1.20.4",
                "type": "release",
                "mainClass": "net.minecraft.client.main.Main",
                "libraries": [{"name": "com.mojang:base:1.0"}],
                "arguments": {"game": ["--username", "${auth_player_name}"], "jvm": ["-cp", "${classpath}"]},
                "assetIndex": {"id": "12", "url": "https://example.invalid/12.json"}
            }),
        );
        write_version(
            dir.path(),
            &json!({
                "id": "fabric-1.20.4",
                "inheritsFrom": "1.20.4",
                "mainClass": "net.fabricmc.loader.impl.launch.knot.KnotClient",
                "libraries": [{"name": "net.fabricmc:loader:0.15.0", "url": "https://maven.fabricmc.net/"}],
                "arguments": {"game": [], "jvm": ["-DFabricMcEmu=net.minecraft.client.main.Main"]}
            }),
        );

        let version = load_version(dir.path(), "fabric-1.20.4").unwrap();
        assert_eq!(version.id, "fabric-1.20.4");
        assert_eq!(
            version.main_class.as_deref(),
            Some("net.fabricmc.loader.impl.launch.knot.KnotClient")
        );
        let names: Vec<_> = version.libraries.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, ["net.fabricmc:loader:0.15.0", "com.mojang:base:1.0"]);

        let jvm: Vec<&str> = version
            .arguments
            .as_ref()
            .unwrap()
            .jvm
            .iter()
            .flat_map(|a| a.values(&Features::default()))
            .collect();
        assert_eq!(jvm, ["-cp", "${classpath}", "-DFabricMcEmu=net.minecraft.client.main.Main"]);
        assert_eq!(version.asset_index_id(), "12");
        assert_eq!(version.jar_id(), "1.20.4");
        assert_eq!(version.version_type.as_deref(), Some("release"));
    }

    #[test]
    fn inherited_version_overrides_nested_fields() {
        let dir = TempDir::new().unwrap();
        write_version(
            dir.path(),
            &json!({
                "id": "1.20.4",
                "mainClass": "net.minecraft.client.main.Main",
                "assetIndex": {"id": "12", "url": "https://example.invalid/12.json"},
                "javaVersion": {"component": "java-runtime-gamma", "majorVersion": 17}
            }),
        );
        write_version(
            dir.path(),
            &json!({
                "id": "snapshot-1.20.5",
                "inheritsFrom": "1.20.4",
                "assetIndex": {"id": "13"},
                "javaVersion": {"majorVersion": 21}
            }),
        );

        let version = load_version(dir.path(), "snapshot-1.20.5").unwrap();
        assert_eq!(version.asset_index_id(), "13");
        let asset_index = version.asset_index.as_ref().unwrap();
        assert_eq!(asset_index.url, "https://example.invalid/12.json");
        assert_eq!(version.java_version.as_ref().unwrap().major_version, Some(21));
    }

    #[test]
    fn inheritance_cycle_is_an_error() {
        let dir = TempDir::new().unwrap();
        write_version(dir.path(), &json!({"id": "a", "inheritsFrom": "b"}));
        write_version(dir.path(), &json!({"id": "b", "inheritsFrom": "a"}));

        assert!(matches!(
            load_version(dir.path(), "a"),
            Err(LauncherError::InheritanceLoop(_))
        ));
    }

    #[test]
    fn missing_version_is_reported() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            load_version(dir.path(), "1.0"),
            Err(LauncherError::VersionNotFound(id)) if id == "1.0"
        ));
    }
}
